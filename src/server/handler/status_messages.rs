//! Status messages and their images

use std::ffi::OsStr;
use std::path::{Path as StdPath, PathBuf};

use actix_toolbox::tb_middleware::Session;
use actix_web::web::{Data, Json, Path};
use actix_web::{delete, get, post, put, HttpResponse};
use base64::prelude::BASE64_STANDARD;
use base64::Engine;
use chrono::{DateTime, NaiveDateTime, Utc};
use itertools::Itertools;
use log::{debug, error, warn};
use rorm::conditions::DynamicCollection;
use rorm::fields::types::ForeignModelByField;
use rorm::{insert, query, update, Database, FieldAccess, Model};
use serde::{Deserialize, Serialize};
use tokio::fs::{remove_file, write};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::graph::{feed_order, FeedItem};
use crate::models::{Image, ImageInsert, Profile, StatusMessage, StatusMessageInsert};
use crate::server::handler::{ApiError, ApiErrorResponse, ApiResult, PathId, PathUuid};
use crate::server::RuntimeSettings;

/// The maximum length of a status message in characters
pub(crate) const MAX_MESSAGE_LENGTH: usize = 2048;

/// The maximum size of a single decoded image in bytes
pub(crate) const MAX_IMAGE_SIZE: usize = 5_000_000;

pub(crate) fn validate_message(message: &str) -> ApiResult<()> {
    if message.trim().is_empty() || message.chars().count() > MAX_MESSAGE_LENGTH {
        return Err(ApiError::InvalidMessage);
    }
    Ok(())
}

/// An uploaded image that has been decoded but not yet written to disk
#[derive(Debug)]
pub(crate) struct DecodedImage {
    pub(crate) original_name: String,
    pub(crate) file_name: String,
    pub(crate) data: Vec<u8>,
}

/// Decode a base64 image upload and choose the name it's stored under
pub(crate) fn decode_image(upload: &ImageUpload) -> ApiResult<DecodedImage> {
    let original_name = StdPath::new(&upload.file_name)
        .file_name()
        .and_then(OsStr::to_str)
        .filter(|name| !name.is_empty() && name.len() <= 255)
        .ok_or(ApiError::InvalidImage)?
        .to_string();

    // Inputs that are larger than the limit after decoding can be rejected early
    if upload.data.len() / 4 * 3 > MAX_IMAGE_SIZE + 3 {
        return Err(ApiError::ImageTooLarge);
    }

    let data = BASE64_STANDARD
        .decode(upload.data.as_bytes())
        .map_err(|_| ApiError::InvalidImage)?;

    if data.is_empty() {
        return Err(ApiError::InvalidImage);
    }

    if data.len() > MAX_IMAGE_SIZE {
        return Err(ApiError::ImageTooLarge);
    }

    let extension = StdPath::new(&original_name)
        .extension()
        .and_then(OsStr::to_str)
        .filter(|ext| ext.len() <= 8 && ext.chars().all(|c| c.is_ascii_alphanumeric()))
        .map(|ext| format!(".{}", ext.to_ascii_lowercase()))
        .unwrap_or_default();

    Ok(DecodedImage {
        original_name,
        file_name: format!("{}{extension}", Uuid::new_v4()),
        data,
    })
}

/// Remove image files from disk, failures are only logged
pub(crate) async fn remove_files(paths: &[PathBuf]) {
    for path in paths {
        if let Err(err) = remove_file(path).await {
            warn!(
                "Image file '{}' could not be removed and may leak: {err}",
                path.display()
            );
        }
    }
}

/// An image attached to a status message
#[derive(Serialize, Deserialize, ToSchema, Clone, Debug)]
pub struct ImageResponse {
    #[schema(example = 42)]
    pub(crate) id: i64,
    #[schema(example = "beach.jpg")]
    pub(crate) original_name: String,
    #[schema(example = "/api/v1/images/42")]
    pub(crate) url: String,
}

impl From<Image> for ImageResponse {
    fn from(value: Image) -> Self {
        Self {
            id: value.id,
            original_name: value.original_name,
            url: format!("/api/v1/images/{}", value.id),
        }
    }
}

/// A single status message
#[derive(Serialize, Deserialize, ToSchema, Clone, Debug)]
pub struct StatusMessageResponse {
    #[schema(example = 1337)]
    pub(crate) id: i64,
    pub(crate) profile: Uuid,
    #[schema(example = "Hello there!")]
    pub(crate) message: String,
    pub(crate) created_at: DateTime<Utc>,
    pub(crate) images: Vec<ImageResponse>,
}

impl FeedItem for StatusMessageResponse {
    fn feed_id(&self) -> i64 {
        self.id
    }

    fn feed_timestamp(&self) -> NaiveDateTime {
        self.created_at.naive_utc()
    }
}

/// Load all status messages of a profile with their images, newest first
pub(crate) async fn load_status_messages(
    db: &Database,
    profile: Uuid,
) -> ApiResult<Vec<StatusMessageResponse>> {
    load_status_messages_of(db, &[profile]).await
}

/// Load the status messages of several profiles with their images, newest first
///
/// Images and messages are fetched with one query each.
pub(crate) async fn load_status_messages_of(
    db: &Database,
    profiles: &[Uuid],
) -> ApiResult<Vec<StatusMessageResponse>> {
    if profiles.is_empty() {
        return Ok(Vec::new());
    }

    let mut images = query!(db, Image)
        .condition(DynamicCollection::or(
            profiles
                .iter()
                .map(|profile| Image::F.status_message.profile.equals(profile.as_ref()))
                .collect(),
        ))
        .all()
        .await?
        .into_iter()
        .map(|image| (*image.status_message.key(), image))
        .into_group_map();

    let mut messages: Vec<_> = query!(db, StatusMessage)
        .condition(DynamicCollection::or(
            profiles
                .iter()
                .map(|profile| StatusMessage::F.profile.equals(profile.as_ref()))
                .collect(),
        ))
        .all()
        .await?
        .into_iter()
        .map(|message| StatusMessageResponse {
            images: images
                .remove(&message.id)
                .unwrap_or_default()
                .into_iter()
                .sorted_by_key(|image| image.id)
                .map(ImageResponse::from)
                .collect(),
            id: message.id,
            profile: *message.profile.key(),
            message: message.message,
            created_at: DateTime::from_naive_utc_and_offset(message.created_at, Utc),
        })
        .collect();

    messages.sort_by(feed_order);

    Ok(messages)
}

/// The status messages of a profile
#[derive(Serialize, ToSchema)]
pub struct GetStatusMessagesResponse {
    pub(crate) status_messages: Vec<StatusMessageResponse>,
}

/// Retrieve the status messages of a profile
///
/// The messages are sorted newest first.
#[utoipa::path(
    tag = "Status messages",
    context_path = "/api/v1",
    responses(
        (status = 200, description = "Returns the status messages", body = GetStatusMessagesResponse),
        (status = 400, description = "Client error", body = ApiErrorResponse),
        (status = 404, description = "Profile not found", body = ApiErrorResponse),
        (status = 500, description = "Server error", body = ApiErrorResponse),
    ),
    params(PathUuid),
    security(("session_cookie" = []))
)]
#[get("/profiles/{uuid}/status")]
pub async fn get_status_messages(
    path: Path<PathUuid>,
    db: Data<Database>,
) -> ApiResult<Json<GetStatusMessagesResponse>> {
    query!(db.as_ref(), (Profile::F.uuid,))
        .condition(Profile::F.uuid.equals(path.uuid))
        .optional()
        .await?
        .ok_or(ApiError::ProfileNotFound)?;

    let status_messages = load_status_messages(db.as_ref(), path.uuid).await?;

    Ok(Json(GetStatusMessagesResponse { status_messages }))
}

/// A single image of a new status message
#[derive(Deserialize, ToSchema)]
pub struct ImageUpload {
    /// The name of the uploaded file
    #[schema(example = "beach.jpg")]
    pub(crate) file_name: String,
    /// Base64 encoded content of the file
    #[schema(example = "iVBORw0KGgo=")]
    pub(crate) data: String,
}

/// The request to create a new status message
#[derive(Deserialize, ToSchema)]
pub struct CreateStatusMessageRequest {
    #[schema(example = "Hello there!")]
    message: String,
    #[serde(default)]
    images: Vec<ImageUpload>,
}

/// The response after a status message was created
#[derive(Serialize, ToSchema)]
pub struct CreateStatusMessageResponse {
    #[schema(example = 1337)]
    id: i64,
}

/// Post a new status message with optional images
///
/// The message and all of its images are stored together. If one image is invalid
/// nothing is stored.
#[utoipa::path(
    tag = "Status messages",
    context_path = "/api/v1",
    responses(
        (status = 200, description = "Status message has been created", body = CreateStatusMessageResponse),
        (status = 400, description = "Client error", body = ApiErrorResponse),
        (status = 413, description = "An image is too large", body = ApiErrorResponse),
        (status = 500, description = "Server error", body = ApiErrorResponse),
    ),
    request_body = CreateStatusMessageRequest,
    security(("session_cookie" = []))
)]
#[post("/profiles/me/status")]
pub async fn create_status_message(
    req: Json<CreateStatusMessageRequest>,
    settings: Data<RuntimeSettings>,
    db: Data<Database>,
    session: Session,
) -> ApiResult<Json<CreateStatusMessageResponse>> {
    let profile: Uuid = session.get("profile")?.ok_or(ApiError::SessionCorrupt)?;

    validate_message(&req.message)?;

    let images = req
        .images
        .iter()
        .map(decode_image)
        .collect::<ApiResult<Vec<_>>>()?;

    let mut tx = db.start_transaction().await?;

    query!(&mut tx, (Profile::F.uuid,))
        .condition(Profile::F.uuid.equals(profile))
        .optional()
        .await?
        .ok_or(ApiError::SessionCorrupt)?;

    let id = insert!(&mut tx, StatusMessageInsert)
        .return_primary_key()
        .single(&StatusMessageInsert {
            profile: ForeignModelByField::Key(profile),
            message: req.message.clone(),
        })
        .await?;

    let mut written = Vec::with_capacity(images.len());
    for image in images {
        let path = settings.media_path.join(&image.file_name);
        if let Err(err) = write(&path, &image.data).await {
            error!("Image could not be saved to '{}': {err}", path.display());
            remove_files(&written).await;
            return Err(ApiError::InternalServerError);
        }
        written.push(path);

        if let Err(err) = insert!(&mut tx, ImageInsert)
            .single(&ImageInsert {
                status_message: ForeignModelByField::Key(id),
                file_name: image.file_name,
                original_name: image.original_name,
            })
            .await
        {
            remove_files(&written).await;
            return Err(err.into());
        }
    }

    if let Err(err) = tx.commit().await {
        remove_files(&written).await;
        return Err(err.into());
    }

    debug!("Created status message {id} with {} images", written.len());

    Ok(Json(CreateStatusMessageResponse { id }))
}

/// The request to change the text of a status message
#[derive(Deserialize, ToSchema)]
pub struct UpdateStatusMessageRequest {
    #[schema(example = "General Kenobi!")]
    message: String,
}

/// Change the text of one of your own status messages
#[utoipa::path(
    tag = "Status messages",
    context_path = "/api/v1",
    responses(
        (status = 200, description = "Status message has been updated"),
        (status = 400, description = "Client error", body = ApiErrorResponse),
        (status = 403, description = "Not your status message", body = ApiErrorResponse),
        (status = 404, description = "Status message not found", body = ApiErrorResponse),
        (status = 500, description = "Server error", body = ApiErrorResponse),
    ),
    params(PathId),
    request_body = UpdateStatusMessageRequest,
    security(("session_cookie" = []))
)]
#[put("/status/{id}")]
pub async fn update_status_message(
    path: Path<PathId>,
    req: Json<UpdateStatusMessageRequest>,
    db: Data<Database>,
    session: Session,
) -> ApiResult<HttpResponse> {
    let profile: Uuid = session.get("profile")?.ok_or(ApiError::SessionCorrupt)?;

    validate_message(&req.message)?;

    let mut tx = db.start_transaction().await?;

    let (owner,) = query!(&mut tx, (StatusMessage::F.profile,))
        .condition(StatusMessage::F.id.equals(path.id))
        .optional()
        .await?
        .ok_or(ApiError::StatusMessageNotFound)?;

    if *owner.key() != profile {
        return Err(ApiError::MissingPrivileges);
    }

    update!(&mut tx, StatusMessage)
        .condition(StatusMessage::F.id.equals(path.id))
        .set(StatusMessage::F.message, req.message.clone())
        .exec()
        .await?;

    tx.commit().await?;

    Ok(HttpResponse::Ok().finish())
}

/// Delete one of your own status messages
///
/// All images of the status message are deleted as well.
#[utoipa::path(
    tag = "Status messages",
    context_path = "/api/v1",
    responses(
        (status = 200, description = "Status message has been deleted"),
        (status = 400, description = "Client error", body = ApiErrorResponse),
        (status = 403, description = "Not your status message", body = ApiErrorResponse),
        (status = 404, description = "Status message not found", body = ApiErrorResponse),
        (status = 500, description = "Server error", body = ApiErrorResponse),
    ),
    params(PathId),
    security(("session_cookie" = []))
)]
#[delete("/status/{id}")]
pub async fn delete_status_message(
    path: Path<PathId>,
    settings: Data<RuntimeSettings>,
    db: Data<Database>,
    session: Session,
) -> ApiResult<HttpResponse> {
    let profile: Uuid = session.get("profile")?.ok_or(ApiError::SessionCorrupt)?;

    let mut tx = db.start_transaction().await?;

    let (owner,) = query!(&mut tx, (StatusMessage::F.profile,))
        .condition(StatusMessage::F.id.equals(path.id))
        .optional()
        .await?
        .ok_or(ApiError::StatusMessageNotFound)?;

    if *owner.key() != profile {
        return Err(ApiError::MissingPrivileges);
    }

    let files: Vec<PathBuf> = query!(&mut tx, (Image::F.file_name,))
        .condition(Image::F.status_message.equals(path.id))
        .all()
        .await?
        .into_iter()
        .map(|(file_name,)| settings.media_path.join(file_name))
        .collect();

    // Images are removed by the cascade of the foreign key
    rorm::delete!(&mut tx, StatusMessage)
        .condition(StatusMessage::F.id.equals(path.id))
        .await?;

    tx.commit().await?;

    remove_files(&files).await;

    Ok(HttpResponse::Ok().finish())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn upload(file_name: &str, data: &[u8]) -> ImageUpload {
        ImageUpload {
            file_name: file_name.to_string(),
            data: BASE64_STANDARD.encode(data),
        }
    }

    #[test]
    fn messages_must_have_content() {
        assert!(validate_message("Hello there!").is_ok());
        assert!(validate_message(" \n ").is_err());
        assert!(validate_message(&"a".repeat(MAX_MESSAGE_LENGTH)).is_ok());
        assert!(validate_message(&"a".repeat(MAX_MESSAGE_LENGTH + 1)).is_err());
    }

    #[test]
    fn decoded_images_get_a_generated_name() {
        let image = decode_image(&upload("../../etc/Beach.JPG", b"not really a jpeg")).unwrap();

        assert_eq!(image.original_name, "Beach.JPG");
        assert_eq!(image.data, b"not really a jpeg");
        assert!(image.file_name.ends_with(".jpg"));
        assert!(!image.file_name.contains('/'));
        assert!(Uuid::parse_str(image.file_name.trim_end_matches(".jpg")).is_ok());
    }

    #[test]
    fn odd_extensions_are_dropped() {
        let image = decode_image(&upload("photo.j$g", b"data")).unwrap();
        assert!(Uuid::parse_str(&image.file_name).is_ok());
    }

    #[test]
    fn invalid_uploads_are_rejected() {
        let bad_base64 = ImageUpload {
            file_name: "a.png".to_string(),
            data: "!!!".to_string(),
        };
        assert!(matches!(
            decode_image(&bad_base64),
            Err(ApiError::InvalidImage)
        ));
        assert!(matches!(
            decode_image(&upload("", b"data")),
            Err(ApiError::InvalidImage)
        ));
        assert!(matches!(
            decode_image(&upload("empty.png", b"")),
            Err(ApiError::InvalidImage)
        ));
    }

    #[test]
    fn large_images_are_rejected() {
        let data = vec![0u8; MAX_IMAGE_SIZE + 1];
        assert!(matches!(
            decode_image(&upload("big.png", &data)),
            Err(ApiError::ImageTooLarge)
        ));

        let data = vec![0u8; MAX_IMAGE_SIZE];
        assert!(decode_image(&upload("ok.png", &data)).is_ok());
    }
}
