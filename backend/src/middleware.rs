use actix_cors::Cors;
use actix_web::{error::InternalError, web};

use crate::api_error::ApiError;

pub fn cors_middleware() -> Cors {
    Cors::default()
        .allow_any_origin()
        .allow_any_method()
        .allow_any_header()
        .max_age(3600)
}

/// Malformed JSON bodies come back in the same envelope as every other error.
pub fn json_config() -> web::JsonConfig {
    web::JsonConfig::default()
        .limit(256 * 1024)
        .error_handler(|err, _req| {
            let api_error = ApiError::bad_request(err.to_string());
            let response = actix_web::ResponseError::error_response(&api_error);
            InternalError::from_response(err, response).into()
        })
}

pub fn query_config() -> web::QueryConfig {
    web::QueryConfig::default().error_handler(|err, _req| {
        let api_error = ApiError::bad_request(err.to_string());
        let response = actix_web::ResponseError::error_response(&api_error);
        InternalError::from_response(err, response).into()
    })
}
