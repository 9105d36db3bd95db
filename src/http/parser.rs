//! Incremental HTTP/1.x request parser.
//!
//! Bytes are fed as they arrive from the socket. The parser keeps whatever
//! it could not consume yet and advances through the request line, the
//! header block and the body as far as the buffered data allows.

use crate::config::config;
use crate::http::request::HttpRequest;
use crate::http::status::HttpStatus;
use crate::http::*;

/// Progress reported by [`Parser::feed`].
#[derive(PartialEq, Debug)]
pub enum ParserOk {
    /// More bytes are needed.
    Incomplete,
    /// Request line and headers are parsed. Reported once, before the body,
    /// so the request can be validated early.
    HeadersDone,
    /// The whole request, body included, is parsed.
    Done,
}

// Kept apart from HTTP status codes, mapped with `into_http_status`.
#[derive(PartialEq, Debug)]
pub enum ParserError {
    Malformed,
    HeadersTooLarge,
    PayloadTooLarge,
    UriTooLong,
    HttpVersionNotSupported,
}

impl ParserError {
    pub fn into_http_status(self) -> HttpStatus {
        match self {
            ParserError::Malformed => HttpStatus::BadRequest,
            ParserError::HeadersTooLarge => HttpStatus::RequestHeaderFieldsTooLarge,
            ParserError::PayloadTooLarge => HttpStatus::PayloadTooLarge,
            ParserError::UriTooLong => HttpStatus::UriTooLong,
            ParserError::HttpVersionNotSupported => HttpStatus::HttpVersionNotSupported,
        }
    }
}

#[derive(PartialEq, PartialOrd, Debug)]
enum ParserState {
    RequestLine,
    Headers,
    Body,
    Done,
}

pub struct Parser {
    buf: Vec<u8>,
    state: ParserState,
    content_length: usize,
}

impl Default for Parser {
    fn default() -> Self {
        Self::new()
    }
}

fn find(haystack: &[u8], needle: &[u8]) -> Option<usize> {
    haystack.windows(needle.len()).position(|w| w == needle)
}

impl Parser {
    pub fn new() -> Self {
        Self {
            buf: Vec::new(),
            state: ParserState::RequestLine,
            content_length: 0,
        }
    }

    fn parse_request_line(&mut self, req: &mut HttpRequest) -> Result<bool, ParserError> {
        let Some(line_end) = find(&self.buf, b"\r\n") else {
            if self.buf.len() > config().max_path_size + HTTP_METHOD_MAX_LEN + 16 {
                return Err(ParserError::UriTooLong);
            }
            return Ok(false);
        };

        // METHOD SP request-target SP HTTP/major.minor
        let line = std::str::from_utf8(&self.buf[..line_end]).map_err(|_| ParserError::Malformed)?;
        let parts: Vec<&str> = line.split(' ').collect();
        let [method, uri, version] = parts[..] else {
            return Err(ParserError::Malformed);
        };

        if method.len() > HTTP_METHOD_MAX_LEN {
            return Err(ParserError::Malformed);
        }
        let method = match http_method_from_str(method) {
            HttpMethod::Unknown => return Err(ParserError::Malformed),
            m => m,
        };

        if uri.is_empty() {
            return Err(ParserError::Malformed);
        }
        if uri.len() > config().max_path_size {
            return Err(ParserError::UriTooLong);
        }

        let (major, minor) = version
            .strip_prefix("HTTP/")
            .and_then(|v| v.split_once('.'))
            .and_then(|(maj, min)| Some((maj.parse::<u8>().ok()?, min.parse::<u8>().ok()?)))
            .ok_or(ParserError::Malformed)?;
        if major != 1 || minor > 1 {
            return Err(ParserError::HttpVersionNotSupported);
        }

        req.method = method;
        req.uri = uri.to_string();
        req.http_version = (major, minor);

        self.buf.drain(..line_end + 2);
        self.state = ParserState::Headers;
        Ok(true)
    }

    fn parse_headers(&mut self, req: &mut HttpRequest) -> Result<bool, ParserError> {
        // An empty header block leaves only the terminating CRLF.
        let (block_end, consumed) = if self.buf.starts_with(b"\r\n") {
            (0, 2)
        } else {
            match find(&self.buf, b"\r\n\r\n") {
                Some(end) => (end, end + 4),
                None => {
                    if self.buf.len() > config().max_header_size {
                        return Err(ParserError::HeadersTooLarge);
                    }
                    return Ok(false);
                }
            }
        };

        if block_end > config().max_header_size {
            return Err(ParserError::HeadersTooLarge);
        }

        let block = std::str::from_utf8(&self.buf[..block_end]).map_err(|_| ParserError::Malformed)?;
        for line in block.split("\r\n").filter(|l| !l.is_empty()) {
            let (name, value) = line.split_once(':').ok_or(ParserError::Malformed)?;
            // No whitespace allowed between the field name and the colon.
            if name.is_empty() || name.ends_with([' ', '\t']) {
                return Err(ParserError::Malformed);
            }
            req.headers.set_raw(name, value.trim());
        }

        if req.http_version == (1, 1) && req.headers.get("Host").is_none() {
            return Err(ParserError::Malformed);
        }

        self.content_length = match req.content_length() {
            Some(v) => v.trim().parse::<usize>().map_err(|_| ParserError::Malformed)?,
            None => 0,
        };
        if self.content_length > config().max_body_size {
            return Err(ParserError::PayloadTooLarge);
        }

        self.buf.drain(..consumed);
        self.state = ParserState::Body;
        Ok(true)
    }

    fn parse_body(&mut self, req: &mut HttpRequest) -> bool {
        let missing = self.content_length - req.body.len();
        let take = missing.min(self.buf.len());
        req.body.extend(self.buf.drain(..take));

        if req.body.len() == self.content_length {
            self.state = ParserState::Done;
            return true;
        }
        false
    }

    /// Appends `data` and parses as far as possible.
    ///
    /// Feeding an empty slice resumes parsing of already buffered bytes,
    /// which the caller does after handling [`ParserOk::HeadersDone`].
    pub fn feed(&mut self, data: &[u8], req: &mut HttpRequest) -> Result<ParserOk, ParserError> {
        if self.state < ParserState::Body && self.buf.len() + data.len() > config().max_header_size + config().max_path_size {
            return Err(ParserError::HeadersTooLarge);
        }
        self.buf.extend_from_slice(data);

        loop {
            match self.state {
                ParserState::RequestLine => {
                    if !self.parse_request_line(req)? {
                        return Ok(ParserOk::Incomplete);
                    }
                }
                ParserState::Headers => {
                    if !self.parse_headers(req)? {
                        return Ok(ParserOk::Incomplete);
                    }
                    return Ok(ParserOk::HeadersDone);
                }
                ParserState::Body => {
                    if !self.parse_body(req) {
                        return Ok(ParserOk::Incomplete);
                    }
                }
                ParserState::Done => return Ok(ParserOk::Done),
            }
        }
    }
}
