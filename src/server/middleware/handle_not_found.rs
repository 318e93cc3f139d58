use actix_web::dev::ServiceResponse;
use actix_web::middleware::ErrorHandlerResponse;
use actix_web::ResponseError;

use crate::server::handler::ApiError;

/// Replace the plain 404 responses of actix with an `ApiErrorResponse`
///
/// Responses produced by an [ApiError] (for example [ApiError::ProfileNotFound]) are kept.
pub(crate) fn handle_not_found<B>(
    res: ServiceResponse<B>,
) -> actix_web::Result<ErrorHandlerResponse<B>> {
    let is_api_error = res
        .response()
        .error()
        .is_some_and(|err| err.as_error::<ApiError>().is_some());

    if is_api_error {
        return Ok(ErrorHandlerResponse::Response(res.map_into_left_body()));
    }

    let (req, _) = res.into_parts();
    let res = ServiceResponse::new(req, ApiError::NotFound.error_response());

    Ok(ErrorHandlerResponse::Response(res.map_into_right_body()))
}
