use std::path::Path as StdPath;

use actix_web::http::header::{CacheControl, CacheDirective};
use actix_web::web::{Data, Path};
use actix_web::{get, HttpResponse};
use log::error;
use rorm::{query, Database, FieldAccess, Model};
use tokio::fs::read;

use crate::models::Image;
use crate::server::handler::{ApiError, ApiErrorResponse, ApiResult, PathId};
use crate::server::RuntimeSettings;

/// Guess the content type of a stored image by its extension
pub(crate) fn content_type(file_name: &str) -> &'static str {
    let extension = StdPath::new(file_name)
        .extension()
        .and_then(|ext| ext.to_str())
        .unwrap_or_default();

    match extension {
        "png" => "image/png",
        "jpg" | "jpeg" => "image/jpeg",
        "gif" => "image/gif",
        "webp" => "image/webp",
        _ => "application/octet-stream",
    }
}

/// Retrieve the content of an image
#[utoipa::path(
    tag = "Status messages",
    context_path = "/api/v1",
    responses(
        (status = 200, description = "The raw image"),
        (status = 404, description = "Image not found", body = ApiErrorResponse),
        (status = 500, description = "Server error", body = ApiErrorResponse),
    ),
    params(PathId),
    security(("session_cookie" = []))
)]
#[get("/images/{id}")]
pub async fn get_image(
    path: Path<PathId>,
    settings: Data<RuntimeSettings>,
    db: Data<Database>,
) -> ApiResult<HttpResponse> {
    let (file_name,) = query!(db.as_ref(), (Image::F.file_name,))
        .condition(Image::F.id.equals(path.id))
        .optional()
        .await?
        .ok_or(ApiError::ImageNotFound)?;

    let content = read(settings.media_path.join(&file_name))
        .await
        .map_err(|e| {
            error!("Image expected in '{file_name}' couldn't be read: {e}");
            ApiError::InternalServerError
        })?;

    Ok(HttpResponse::Ok()
        .content_type(content_type(&file_name))
        .insert_header(CacheControl(vec![
            CacheDirective::Private,
            CacheDirective::MaxAge(3600),
        ]))
        .body(content))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn known_extensions() {
        assert_eq!(content_type("a.png"), "image/png");
        assert_eq!(content_type("a.jpeg"), "image/jpeg");
        assert_eq!(content_type("a.jpg"), "image/jpeg");
        assert_eq!(content_type("a"), "application/octet-stream");
        assert_eq!(content_type("a.exe"), "application/octet-stream");
    }
}
