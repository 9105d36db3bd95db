use crate::config::ServerConfig;
use crate::handler::responses;
use crate::handler::static_files;
use crate::http::HttpMethod;
use crate::http::request::HttpRequest;
use crate::http::response::HttpResponse;
use crate::nonce::Nonce;

pub fn route(req: &HttpRequest, cfg: &ServerConfig, nonce: &Nonce) -> HttpResponse {
    match req.method {
        HttpMethod::Get | HttpMethod::Head => {
            static_files::serve(req.path(), &cfg.static_files_root, nonce)
        }
        _ => responses::method_not_allowed(),
    }
}
