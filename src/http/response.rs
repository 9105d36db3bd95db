use thiserror::Error;

use crate::http::headers::HttpHeaders;
use crate::http::status::HttpStatus;

/// Headers the server sets on responses.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResponseHeader {
    Allow,
    Connection,
    ContentEncoding,
    ContentLength,
    ContentSecurityPolicy,
    ContentType,
    Date,
    Server,
    Vary,
    XContentTypeOptions,
}

impl ResponseHeader {
    pub fn as_str(self) -> &'static str {
        match self {
            ResponseHeader::Allow => "Allow",
            ResponseHeader::Connection => "Connection",
            ResponseHeader::ContentEncoding => "Content-Encoding",
            ResponseHeader::ContentLength => "Content-Length",
            ResponseHeader::ContentSecurityPolicy => "Content-Security-Policy",
            ResponseHeader::ContentType => "Content-Type",
            ResponseHeader::Date => "Date",
            ResponseHeader::Server => "Server",
            ResponseHeader::Vary => "Vary",
            ResponseHeader::XContentTypeOptions => "X-Content-Type-Options",
        }
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
#[error("header {name} value contains a line break")]
pub struct HeaderError {
    pub name: &'static str,
}

#[derive(Debug)]
pub struct HttpResponse {
    pub status: HttpStatus,
    pub headers: HttpHeaders,
    pub body: Vec<u8>,
}

impl Default for HttpResponse {
    fn default() -> Self {
        Self::new()
    }
}

impl HttpResponse {
    pub fn new() -> Self {
        Self {
            status: HttpStatus::Ok,
            headers: HttpHeaders::new(),
            body: Vec::new(),
        }
    }

    /// Sets a header, refusing values that would split the header block.
    pub fn set_header(&mut self, h: ResponseHeader, value: &str) -> Result<(), HeaderError> {
        if value.contains(['\r', '\n']) {
            return Err(HeaderError { name: h.as_str() });
        }
        self.headers.set_raw(h.as_str(), value);
        Ok(())
    }

    pub fn header(&self, h: ResponseHeader) -> Option<&str> {
        self.headers.get(h.as_str())
    }

    pub fn is_html(&self) -> bool {
        self.header(ResponseHeader::ContentType)
            .is_some_and(|ct| ct.starts_with("text/html"))
    }

    /// Status line and header block, terminated by the empty line.
    pub fn build_headers(&self) -> String {
        // HTTP/1.1 <status> <reason>\r\n
        // <header_name>: <header_value>\r\n
        // ...
        // \r\n
        format!(
            "HTTP/1.1 {} {}\r\n{}\r\n",
            self.status.code(),
            self.status.reason(),
            self.headers.stringify(),
        )
    }
}
