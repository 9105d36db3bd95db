mod middleware;
mod responses;
mod router;
mod script_nonce;
mod static_files;

pub use script_nonce::inject_script_nonce;

use crate::config::{ServerConfig, config};
use crate::http::HttpMethod;
use crate::http::request::HttpRequest;
use crate::http::response::HttpResponse;
use crate::http::status::HttpStatus;
use crate::nonce::Nonce;

pub fn handle_request(req: &HttpRequest) -> HttpResponse {
    respond(req, config())
}

pub fn handle_error(err: HttpStatus) -> HttpResponse {
    respond_error(err, config())
}

/// Error page for a request that could not be parsed or validated. It gets
/// the same policy as routed pages, or none if the policy cannot be built.
pub fn respond_error(err: HttpStatus, cfg: &ServerConfig) -> HttpResponse {
    let mut res = responses::any_error(err);
    match cfg.csp.header_value(&Nonce::generate(), cfg.development) {
        Ok(policy) => {
            if let Err(err) = middleware::security_headers(&mut res, &policy) {
                tracing::error!(error = %err, "cannot set response headers");
                res = responses::internal_server_error();
            }
        }
        Err(err) => tracing::error!(error = %err, "cannot build Content-Security-Policy"),
    }
    finish(res, cfg)
}

/// Answers `req` with a fresh nonce shared by the policy header and the
/// page's script tags.
///
/// A policy that fails to build is never replaced by a partial one: the
/// request gets a 500 without a page.
pub fn respond(req: &HttpRequest, cfg: &ServerConfig) -> HttpResponse {
    let nonce = Nonce::generate();
    let policy = match cfg.csp.header_value(&nonce, cfg.development) {
        Ok(policy) => policy,
        Err(err) => {
            tracing::error!(error = %err, uri = %req.uri, "cannot build Content-Security-Policy");
            return finish(responses::internal_server_error(), cfg);
        }
    };

    let mut res = router::route(req, cfg, &nonce);
    if let Err(err) = middleware::apply(req, &mut res, &policy) {
        tracing::error!(error = %err, uri = %req.uri, "cannot set response headers");
        res = responses::internal_server_error();
    }

    let mut res = finish(res, cfg);
    if req.method == HttpMethod::Head {
        res.body.clear();
    }
    tracing::debug!(method = ?req.method, uri = %req.uri, status = res.status.code(), "request handled");
    res
}

fn finish(mut res: HttpResponse, cfg: &ServerConfig) -> HttpResponse {
    match middleware::standard_headers(&mut res, cfg) {
        Ok(()) => res,
        Err(err) => {
            tracing::error!(error = %err, "invalid configured header value");
            responses::internal_server_error()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::csp::DirectiveValue;
    use crate::http::response::ResponseHeader;

    fn config_with_site(dir: &tempfile::TempDir) -> ServerConfig {
        std::fs::write(
            dir.path().join("index.html"),
            "<html><script>boot()</script></html>",
        )
        .unwrap();
        ServerConfig {
            static_files_root: dir.path().to_str().unwrap().to_string(),
            ..ServerConfig::default()
        }
    }

    fn get(uri: &str) -> HttpRequest {
        let mut req = HttpRequest::new();
        req.method = HttpMethod::Get;
        req.uri = uri.to_string();
        req.http_version = (1, 1);
        req
    }

    fn nonce_of(policy: &str) -> &str {
        let start = policy.find("'nonce-").unwrap() + "'nonce-".len();
        let len = policy[start..].find('\'').unwrap();
        &policy[start..start + len]
    }

    #[test]
    fn page_and_header_share_the_nonce() {
        let dir = tempfile::tempdir().unwrap();
        let cfg = config_with_site(&dir);

        let res = respond(&get("/"), &cfg);
        assert_eq!(res.status, HttpStatus::Ok);
        let policy = res.header(ResponseHeader::ContentSecurityPolicy).unwrap();
        let nonce = nonce_of(policy);
        assert_eq!(nonce.len(), 32);

        let body = String::from_utf8(res.body.clone()).unwrap();
        assert!(body.contains(&format!("<script nonce=\"{nonce}\">")));
    }

    #[test]
    fn each_response_gets_a_new_nonce() {
        let dir = tempfile::tempdir().unwrap();
        let cfg = config_with_site(&dir);

        let a = respond(&get("/"), &cfg);
        let b = respond(&get("/"), &cfg);
        assert_ne!(
            nonce_of(a.header(ResponseHeader::ContentSecurityPolicy).unwrap()),
            nonce_of(b.header(ResponseHeader::ContentSecurityPolicy).unwrap())
        );
    }

    #[test]
    fn broken_policy_yields_500_without_policy() {
        let dir = tempfile::tempdir().unwrap();
        let mut cfg = config_with_site(&dir);
        cfg.csp
            .directives
            .insert("imgSrc".to_string(), DirectiveValue::from("x; script-src *"));

        let res = respond(&get("/"), &cfg);
        assert_eq!(res.status, HttpStatus::InternalServerError);
        assert_eq!(res.header(ResponseHeader::ContentSecurityPolicy), None);
    }

    #[test]
    fn head_keeps_length_but_drops_body() {
        let dir = tempfile::tempdir().unwrap();
        let cfg = config_with_site(&dir);
        let mut req = get("/");
        req.method = HttpMethod::Head;

        let res = respond(&req, &cfg);
        assert!(res.body.is_empty());
        assert_ne!(res.header(ResponseHeader::ContentLength), Some("0"));
    }

    #[test]
    fn unparsable_request_page_carries_the_policy() {
        let cfg = ServerConfig::default();
        let res = respond_error(HttpStatus::UriTooLong, &cfg);
        assert_eq!(res.status, HttpStatus::UriTooLong);
        let policy = res.header(ResponseHeader::ContentSecurityPolicy).unwrap();
        assert!(policy.starts_with("base-uri 'self'; object-src 'none'"));
        assert_eq!(res.header(ResponseHeader::XContentTypeOptions), Some("nosniff"));
    }

    #[test]
    fn post_is_not_allowed() {
        let dir = tempfile::tempdir().unwrap();
        let cfg = config_with_site(&dir);
        let mut req = get("/");
        req.method = HttpMethod::Post;

        let res = respond(&req, &cfg);
        assert_eq!(res.status, HttpStatus::MethodNotAllowed);
        assert_eq!(res.header(ResponseHeader::Allow), Some("GET, HEAD"));
    }
}
