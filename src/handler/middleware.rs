use flate2::Compression;
use flate2::write::{DeflateEncoder, GzEncoder};
use std::io::Write;
use std::time::SystemTime;

use crate::config::ServerConfig;
use crate::http::request::HttpRequest;
use crate::http::response::{HeaderError, HttpResponse, ResponseHeader};

/// Content codings the server can produce.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompressionAlgorithm {
    Gzip,
    Deflate,
}

impl CompressionAlgorithm {
    pub fn as_str(&self) -> &str {
        match self {
            CompressionAlgorithm::Gzip => "gzip",
            CompressionAlgorithm::Deflate => "deflate",
        }
    }
}

/// First coding in `Accept-Encoding` the server supports.
pub fn negotiate(req: &HttpRequest) -> Option<CompressionAlgorithm> {
    req.accepted_encodings()
        .into_iter()
        .find_map(|coding| match coding.to_ascii_lowercase().as_str() {
            "gzip" | "x-gzip" | "*" => Some(CompressionAlgorithm::Gzip),
            "deflate" => Some(CompressionAlgorithm::Deflate),
            _ => None,
        })
}

fn is_compressible(content_type: &str) -> bool {
    content_type.starts_with("text/")
        || content_type.starts_with("application/json")
        || content_type.starts_with("application/xml")
        || content_type.starts_with("image/svg+xml")
}

/// Applies the per-request response policy: the CSP header on HTML pages,
/// `nosniff`, and body compression.
pub fn apply(req: &HttpRequest, res: &mut HttpResponse, policy: &str) -> Result<(), HeaderError> {
    security_headers(res, policy)?;

    let compressible = res
        .header(ResponseHeader::ContentType)
        .is_some_and(is_compressible);
    if !compressible || res.body.is_empty() {
        return Ok(());
    }
    res.set_header(ResponseHeader::Vary, "Accept-Encoding")?;

    let Some(algo) = negotiate(req) else {
        return Ok(());
    };
    match compress_body(&res.body, algo) {
        Ok(body) => {
            res.body = body;
            res.set_header(ResponseHeader::ContentEncoding, algo.as_str())?;
        }
        Err(err) => tracing::warn!(error = %err, algorithm = algo.as_str(), "compression failed, sending identity"),
    }
    Ok(())
}

/// The CSP header on HTML bodies, `nosniff` on everything.
pub fn security_headers(res: &mut HttpResponse, policy: &str) -> Result<(), HeaderError> {
    if res.is_html() {
        res.set_header(ResponseHeader::ContentSecurityPolicy, policy)?;
    }
    res.set_header(ResponseHeader::XContentTypeOptions, "nosniff")?;
    Ok(())
}

/// Headers every response carries, error responses included.
pub fn standard_headers(res: &mut HttpResponse, cfg: &ServerConfig) -> Result<(), HeaderError> {
    res.set_header(ResponseHeader::Server, &cfg.server_name)?;
    res.set_header(ResponseHeader::Date, &httpdate::fmt_http_date(SystemTime::now()))?;
    res.set_header(ResponseHeader::Connection, "close")?;
    res.set_header(ResponseHeader::ContentLength, &res.body.len().to_string())?;
    Ok(())
}

fn compress_body(body: &[u8], algo: CompressionAlgorithm) -> std::io::Result<Vec<u8>> {
    match algo {
        CompressionAlgorithm::Gzip => {
            let mut e = GzEncoder::new(Vec::new(), Compression::default());
            e.write_all(body)?;
            e.finish()
        }
        CompressionAlgorithm::Deflate => {
            let mut e = DeflateEncoder::new(Vec::new(), Compression::default());
            e.write_all(body)?;
            e.finish()
        }
    }
}
