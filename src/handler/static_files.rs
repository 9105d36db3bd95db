use std::io::ErrorKind::*;
use std::path::{Component, Path, PathBuf};

use crate::handler::responses;
use crate::handler::script_nonce::inject_script_nonce;
use crate::http::response::{HttpResponse, ResponseHeader};
use crate::nonce::Nonce;

const INDEX_FILE: &str = "index.html";

/// Serves `path` from `root`. HTML pages get `nonce` on their script tags.
pub fn serve(path: &str, root: &str, nonce: &Nonce) -> HttpResponse {
    let Some(relative) = sanitize_path(path) else {
        tracing::debug!(path, "rejected static path");
        return responses::forbidden();
    };
    let full_path = Path::new(root).join(relative);
    tracing::debug!(path = %full_path.display(), "serving static file");

    let body = match std::fs::read(&full_path) {
        Ok(body) => body,
        Err(err) => {
            return match err.kind() {
                NotFound => responses::not_found(),
                PermissionDenied => responses::forbidden(),
                // directories without a trailing slash
                IsADirectory => responses::not_found(),
                _ => {
                    tracing::error!(path = %full_path.display(), error = %err, "failed to read static file");
                    responses::internal_server_error()
                }
            };
        }
    };

    let mime = guess_mime(&full_path);
    let body = if mime.starts_with("text/html") {
        match String::from_utf8(body) {
            Ok(html) => inject_script_nonce(&html, nonce).into_bytes(),
            Err(err) => err.into_bytes(),
        }
    } else {
        body
    };

    let mut response = HttpResponse::new();
    response
        .headers
        .set_raw(ResponseHeader::ContentLength.as_str(), &body.len().to_string());
    response.headers.set_raw(ResponseHeader::ContentType.as_str(), mime);
    response.body = body;
    response
}

/// Maps a request path onto a path relative to the static root.
///
/// Returns `None` for paths that could leave the root: `..` segments,
/// backslashes and NUL bytes. `/` and paths ending in `/` resolve to
/// `index.html`.
fn sanitize_path(path: &str) -> Option<PathBuf> {
    if path.contains(['\\', '\0']) {
        return None;
    }

    let mut relative = PathBuf::new();
    for component in Path::new(path.trim_start_matches('/')).components() {
        match component {
            Component::Normal(segment) => relative.push(segment),
            Component::CurDir => {}
            Component::ParentDir | Component::RootDir | Component::Prefix(_) => return None,
        }
    }

    if path.ends_with('/') || relative.as_os_str().is_empty() {
        relative.push(INDEX_FILE);
    }
    Some(relative)
}

fn guess_mime(path: &Path) -> &'static str {
    match path.extension().and_then(|e| e.to_str()) {
        Some("htm") | Some("html") => "text/html; charset=utf-8",
        Some("css") => "text/css",
        Some("js") | Some("mjs") => "text/javascript",
        Some("png") => "image/png",
        Some("jpg") | Some("jpeg") => "image/jpeg",
        Some("gif") => "image/gif",
        Some("svg") => "image/svg+xml",
        Some("ico") => "image/x-icon",
        Some("webp") => "image/webp",
        Some("woff2") => "font/woff2",
        Some("json") => "application/json",
        Some("xml") => "application/xml",
        Some("txt") => "text/plain",
        Some("pdf") => "application/pdf",
        _ => "application/octet-stream",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::http::status::HttpStatus;

    #[test]
    fn root_maps_to_index() {
        assert_eq!(sanitize_path("/"), Some(PathBuf::from("index.html")));
        assert_eq!(sanitize_path("/docs/"), Some(PathBuf::from("docs/index.html")));
        assert_eq!(sanitize_path("/./app.js"), Some(PathBuf::from("app.js")));
    }

    #[test]
    fn traversal_is_rejected() {
        assert_eq!(sanitize_path("/../etc/passwd"), None);
        assert_eq!(sanitize_path("/a/../../b"), None);
        assert_eq!(sanitize_path("/a\\..\\b"), None);
    }

    #[test]
    fn html_pages_carry_the_nonce() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("index.html"), "<script>boot()</script>").unwrap();

        let res = serve("/", dir.path().to_str().unwrap(), &Nonce::from_token("feed"));
        assert_eq!(res.status, HttpStatus::Ok);
        assert_eq!(res.body, b"<script nonce=\"feed\">boot()</script>");
        assert_eq!(res.header(ResponseHeader::ContentLength), Some("36"));
        assert!(res.is_html());
    }

    #[test]
    fn scripts_are_served_untouched() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("app.js"), "let s = '<script>';").unwrap();

        let res = serve("/app.js", dir.path().to_str().unwrap(), &Nonce::from_token("feed"));
        assert_eq!(res.body, b"let s = '<script>';");
        assert_eq!(res.header(ResponseHeader::ContentType), Some("text/javascript"));
    }

    #[test]
    fn missing_file_is_404() {
        let dir = tempfile::tempdir().unwrap();
        let res = serve("/nope.html", dir.path().to_str().unwrap(), &Nonce::from_token("x"));
        assert_eq!(res.status, HttpStatus::NotFound);
    }
}
