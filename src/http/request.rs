use crate::http::HttpMethod;
use crate::http::headers::HttpHeaders;

#[derive(Debug)]
pub struct HttpRequest {
    pub method: HttpMethod,
    pub uri: String,
    pub http_version: (u8, u8),

    pub headers: HttpHeaders,
    pub body: Vec<u8>,
}

impl Default for HttpRequest {
    fn default() -> Self {
        Self::new()
    }
}

impl HttpRequest {
    pub fn new() -> Self {
        Self {
            method: HttpMethod::Unknown,
            uri: String::new(),
            http_version: (0, 0),
            headers: HttpHeaders::new(),
            body: Vec::new(),
        }
    }

    /// Request target without query string or fragment.
    pub fn path(&self) -> &str {
        let end = self.uri.find(['?', '#']).unwrap_or(self.uri.len());
        &self.uri[..end]
    }

    pub fn content_length(&self) -> Option<&str> {
        self.headers.get("Content-Length")
    }

    /// Content codings listed in `Accept-Encoding`, in order, without
    /// those disabled with `q=0`.
    pub fn accepted_encodings(&self) -> Vec<&str> {
        let Some(header) = self.headers.get("Accept-Encoding") else {
            return Vec::new();
        };
        header
            .split(',')
            .filter_map(|item| {
                let mut parts = item.split(';').map(str::trim);
                let coding = parts.next().filter(|c| !c.is_empty())?;
                let disabled = parts.any(|p| {
                    p.strip_prefix("q=")
                        .and_then(|q| q.parse::<f32>().ok())
                        .is_some_and(|q| q == 0.0)
                });
                (!disabled).then_some(coding)
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn path_strips_query_and_fragment() {
        let mut req = HttpRequest::new();
        req.uri = "/index.html?lang=en#top".to_string();
        assert_eq!(req.path(), "/index.html");
    }

    #[test]
    fn accepted_encodings_skips_q_zero() {
        let mut req = HttpRequest::new();
        req.headers.set_raw("Accept-Encoding", "gzip;q=0, deflate, br;q=0.5");
        assert_eq!(req.accepted_encodings(), vec!["deflate", "br"]);
    }
}
