//! HTTP headers abstraction for [`HttpRequest`](crate::http::request::HttpRequest) and
//! [`HttpResponse`](crate::http::response::HttpResponse)
//!
//! Headers are stored in an ordered map to preserve insertion order, keyed by
//! the lowercased name so lookups are case-insensitive. The name as first
//! set is kept for serialization.
//!
//! No validation happens here. [`HttpResponse`](crate::http::response::HttpResponse)
//! refuses values containing line breaks before they reach this map.

use indexmap::IndexMap;

#[derive(Debug, Default)]
pub struct HttpHeaders {
    headers: IndexMap<String, (String, String)>,
}

impl HttpHeaders {
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets `name`, replacing any previous value in place.
    pub fn set_raw(&mut self, name: &str, value: &str) {
        let key = name.to_ascii_lowercase();
        match self.headers.get_mut(&key) {
            Some(entry) => entry.1 = value.to_string(),
            None => {
                self.headers.insert(key, (name.to_string(), value.to_string()));
            }
        }
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.headers
            .get(&name.to_ascii_lowercase())
            .map(|(_, value)| value.as_str())
    }

    pub fn len(&self) -> usize {
        self.headers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.headers.is_empty()
    }

    pub fn stringify(&self) -> String {
        let mut result = String::new();
        for (name, value) in self.headers.values() {
            result.push_str(name);
            result.push_str(": ");
            result.push_str(value);
            result.push_str("\r\n");
        }
        result
    }
}
