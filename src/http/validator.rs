use crate::config::config;
use crate::http::HttpMethod;
use crate::http::HttpVersion;
use crate::http::request::HttpRequest;
use crate::http::status::HttpStatus;

#[derive(Debug, PartialEq, Eq)]
pub enum ValidatorError {
    UnknownVersion,
    HttpVersionNotSupported,
    PayloadTooLarge,
    MalformedHeaderField,
    MissingContentLength,
    BodyNotAllowed,
    MandatoryBody,
}

impl ValidatorError {
    pub fn into_http_status(self) -> HttpStatus {
        match self {
            ValidatorError::UnknownVersion => HttpStatus::BadRequest,
            ValidatorError::HttpVersionNotSupported => HttpStatus::HttpVersionNotSupported,
            ValidatorError::PayloadTooLarge => HttpStatus::PayloadTooLarge,
            ValidatorError::MalformedHeaderField => HttpStatus::BadRequest,
            ValidatorError::MandatoryBody => HttpStatus::BadRequest,
            ValidatorError::BodyNotAllowed => HttpStatus::BadRequest,
            ValidatorError::MissingContentLength => HttpStatus::LengthRequired,
        }
    }
}

pub struct Validator;

impl Validator {
    fn validate_http_version(v: (u8, u8)) -> Result<(), ValidatorError> {
        let version = HttpVersion::from_pair(v).ok_or(ValidatorError::UnknownVersion)?;
        if version <= config().http_version {
            Ok(())
        } else {
            Err(ValidatorError::HttpVersionNotSupported)
        }
    }

    fn validate_http_method(
        content_length: Option<usize>,
        method: HttpMethod,
    ) -> Result<(), ValidatorError> {
        match method {
            HttpMethod::Get | HttpMethod::Head => match content_length {
                Some(n) if n > 0 => Err(ValidatorError::BodyNotAllowed),
                _ => Ok(()),
            },

            HttpMethod::Post | HttpMethod::Put => match content_length {
                None => Err(ValidatorError::MissingContentLength),
                Some(0) => Err(ValidatorError::MandatoryBody),
                Some(_) => Ok(()),
            },
            _ => Ok(()),
        }
    }

    /// Checks a request whose headers are parsed, before its body is read.
    pub fn validate_request(req: &HttpRequest) -> Result<(), ValidatorError> {
        Self::validate_http_version(req.http_version)?;

        let content_length = req
            .content_length()
            .map(|v| v.trim().parse::<usize>())
            .transpose()
            .map_err(|_| ValidatorError::MalformedHeaderField)?;

        Self::validate_http_method(content_length, req.method)?;

        if content_length.is_some_and(|n| n > config().max_body_size) {
            return Err(ValidatorError::PayloadTooLarge);
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request(method: HttpMethod, content_length: Option<&str>) -> HttpRequest {
        let mut req = HttpRequest::new();
        req.method = method;
        req.uri = "/".to_string();
        req.http_version = (1, 1);
        if let Some(len) = content_length {
            req.headers.set_raw("Content-Length", len);
        }
        req
    }

    #[test]
    fn get_with_body_is_rejected() {
        let req = request(HttpMethod::Get, Some("3"));
        assert_eq!(Validator::validate_request(&req), Err(ValidatorError::BodyNotAllowed));
    }

    #[test]
    fn post_needs_content_length() {
        let req = request(HttpMethod::Post, None);
        assert_eq!(
            Validator::validate_request(&req).map_err(ValidatorError::into_http_status),
            Err(HttpStatus::LengthRequired)
        );
    }

    #[test]
    fn post_with_empty_body_is_rejected() {
        let req = request(HttpMethod::Post, Some("0"));
        assert_eq!(Validator::validate_request(&req), Err(ValidatorError::MandatoryBody));
    }

    #[test]
    fn plain_get_passes() {
        assert_eq!(Validator::validate_request(&request(HttpMethod::Get, None)), Ok(()));
    }
}
