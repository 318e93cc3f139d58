use actix_web::error::JsonPayloadError;
use actix_web::HttpRequest;

use crate::server::handler::ApiError;

/// Convert errors of the json extractor into [ApiError::InvalidJson]
pub(crate) fn json_extractor_error(err: JsonPayloadError, _req: &HttpRequest) -> actix_web::Error {
    ApiError::InvalidJson(err).into()
}
