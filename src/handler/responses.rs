use crate::http::response::{HttpResponse, ResponseHeader};
use crate::http::status::HttpStatus;

const HTML_CONTENT_TYPE: &str = "text/html; charset=utf-8";

fn error_page(status: HttpStatus) -> HttpResponse {
    let mut res = HttpResponse::new();
    res.status = status;
    let body = format!("<h1>{} {}</h1>", status.code(), status.reason()).into_bytes();

    res.headers
        .set_raw(ResponseHeader::ContentLength.as_str(), &body.len().to_string());
    res.headers
        .set_raw(ResponseHeader::ContentType.as_str(), HTML_CONTENT_TYPE);

    res.body = body;
    res
}

pub fn forbidden() -> HttpResponse {
    error_page(HttpStatus::Forbidden)
}

pub fn not_found() -> HttpResponse {
    error_page(HttpStatus::NotFound)
}

pub fn method_not_allowed() -> HttpResponse {
    let mut res = error_page(HttpStatus::MethodNotAllowed);
    res.headers.set_raw(ResponseHeader::Allow.as_str(), "GET, HEAD");
    res
}

pub fn internal_server_error() -> HttpResponse {
    error_page(HttpStatus::InternalServerError)
}

pub fn any_error(err: HttpStatus) -> HttpResponse {
    match err {
        HttpStatus::MethodNotAllowed => method_not_allowed(),
        status => error_page(status),
    }
}
