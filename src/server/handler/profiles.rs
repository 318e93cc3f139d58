//! Handlers for viewing and editing profiles

use std::collections::HashMap;

use actix_toolbox::tb_middleware::Session;
use actix_web::web::{Data, Json, Path};
use actix_web::{get, put, HttpResponse};
use chrono::{DateTime, Utc};
use rorm::conditions::DynamicCollection;
use rorm::{query, update, Database, FieldAccess, Model};
use serde::{Deserialize, Serialize};
use url::Url;
use utoipa::ToSchema;
use uuid::Uuid;

use crate::models::Profile;
use crate::server::handler::status_messages::load_status_messages;
use crate::server::handler::{ApiError, ApiErrorResponse, ApiResult, PathUuid, StatusMessageResponse};

/// Reject empty or whitespace-only values of required profile fields
pub(crate) fn validate_field(name: &'static str, value: &str) -> ApiResult<()> {
    if value.trim().is_empty() {
        return Err(ApiError::InvalidProfileField(name));
    }
    Ok(())
}

/// Checks that an email address has a non-empty local part and a dotted domain
pub(crate) fn validate_email(address: &str) -> ApiResult<()> {
    let Some((local, domain)) = address.trim().split_once('@') else {
        return Err(ApiError::InvalidEmailAddress);
    };

    if local.is_empty()
        || domain.contains('@')
        || domain.starts_with('.')
        || domain.ends_with('.')
        || !domain.contains('.')
        || address.chars().any(char::is_whitespace)
    {
        return Err(ApiError::InvalidEmailAddress);
    }

    Ok(())
}

/// Checks a profile image url.
///
/// Only absolute http and https urls with a host are accepted. An empty value
/// removes the image, so `None` is returned for it.
pub(crate) fn validate_image_url(url: &str) -> ApiResult<Option<String>> {
    let url = url.trim();
    if url.is_empty() {
        return Ok(None);
    }

    if url.len() > 1024 {
        return Err(ApiError::InvalidProfileImageUrl);
    }

    let parsed = Url::parse(url).map_err(|_| ApiError::InvalidProfileImageUrl)?;
    if !matches!(parsed.scheme(), "http" | "https")
        || parsed.host_str().map_or(true, str::is_empty)
    {
        return Err(ApiError::InvalidProfileImageUrl);
    }

    Ok(Some(url.to_string()))
}

/// A single profile
#[derive(Serialize, Deserialize, ToSchema, Clone, Debug)]
pub struct ProfileResponse {
    pub(crate) uuid: Uuid,
    #[schema(example = "Herbert")]
    pub(crate) first_name: String,
    #[schema(example = "Schmidt")]
    pub(crate) last_name: String,
    #[schema(example = "Boston")]
    pub(crate) city: String,
    #[schema(example = "herbert@example.com")]
    pub(crate) email_address: String,
    pub(crate) profile_image_url: Option<String>,
    pub(crate) created_at: DateTime<Utc>,
}

impl From<Profile> for ProfileResponse {
    fn from(value: Profile) -> Self {
        Self {
            uuid: value.uuid,
            first_name: value.first_name,
            last_name: value.last_name,
            city: value.city,
            email_address: value.email_address,
            profile_image_url: value.profile_image_url,
            created_at: DateTime::from_naive_utc_and_offset(value.created_at, Utc),
        }
    }
}

/// A list of profiles
#[derive(Serialize, ToSchema)]
pub struct GetProfilesResponse {
    pub(crate) profiles: Vec<ProfileResponse>,
}

/// A profile together with its status messages
///
/// `status_messages` are sorted newest first.
#[derive(Serialize, ToSchema)]
pub struct ProfileDetailResponse {
    #[serde(flatten)]
    profile: ProfileResponse,
    status_messages: Vec<StatusMessageResponse>,
}

/// Load the profiles with the given uuids.
///
/// The result is in the order of `uuids`, unknown uuids are skipped.
pub(crate) async fn load_profiles(
    db: &Database,
    uuids: &[Uuid],
) -> ApiResult<Vec<ProfileResponse>> {
    if uuids.is_empty() {
        return Ok(Vec::new());
    }

    let mut profiles: HashMap<Uuid, Profile> = query!(db, Profile)
        .condition(DynamicCollection::or(
            uuids
                .iter()
                .map(|uuid| Profile::F.uuid.equals(*uuid))
                .collect(),
        ))
        .all()
        .await?
        .into_iter()
        .map(|profile| (profile.uuid, profile))
        .collect();

    Ok(uuids
        .iter()
        .filter_map(|uuid| profiles.remove(uuid))
        .map(ProfileResponse::from)
        .collect())
}

/// Retrieve all profiles
#[utoipa::path(
    tag = "Profiles",
    context_path = "/api/v1",
    responses(
        (status = 200, description = "Returns all profiles", body = GetProfilesResponse),
        (status = 400, description = "Client error", body = ApiErrorResponse),
        (status = 500, description = "Server error", body = ApiErrorResponse),
    ),
    security(("session_cookie" = []))
)]
#[get("/profiles")]
pub async fn get_all_profiles(db: Data<Database>) -> ApiResult<Json<GetProfilesResponse>> {
    let profiles = query!(db.as_ref(), Profile)
        .all()
        .await?
        .into_iter()
        .map(ProfileResponse::from)
        .collect();

    Ok(Json(GetProfilesResponse { profiles }))
}

/// Retrieve a single profile with its status messages
#[utoipa::path(
    tag = "Profiles",
    context_path = "/api/v1",
    responses(
        (status = 200, description = "Returns the requested profile", body = ProfileDetailResponse),
        (status = 400, description = "Client error", body = ApiErrorResponse),
        (status = 404, description = "Profile not found", body = ApiErrorResponse),
        (status = 500, description = "Server error", body = ApiErrorResponse),
    ),
    params(PathUuid),
    security(("session_cookie" = []))
)]
#[get("/profiles/{uuid}")]
pub async fn get_profile(
    path: Path<PathUuid>,
    db: Data<Database>,
) -> ApiResult<Json<ProfileDetailResponse>> {
    let profile = query!(db.as_ref(), Profile)
        .condition(Profile::F.uuid.equals(path.uuid))
        .optional()
        .await?
        .ok_or(ApiError::ProfileNotFound)?;

    let status_messages = load_status_messages(db.as_ref(), profile.uuid).await?;

    Ok(Json(ProfileDetailResponse {
        profile: profile.into(),
        status_messages,
    }))
}

/// Retrieve the profile of the currently logged-in account
#[utoipa::path(
    tag = "Profiles",
    context_path = "/api/v1",
    responses(
        (status = 200, description = "Returns the own profile", body = ProfileResponse),
        (status = 400, description = "Client error", body = ApiErrorResponse),
        (status = 500, description = "Server error", body = ApiErrorResponse),
    ),
    security(("session_cookie" = []))
)]
#[get("/profiles/me")]
pub async fn get_my_profile(
    db: Data<Database>,
    session: Session,
) -> ApiResult<Json<ProfileResponse>> {
    let uuid: Uuid = session.get("profile")?.ok_or(ApiError::SessionCorrupt)?;

    let profile = query!(db.as_ref(), Profile)
        .condition(Profile::F.uuid.equals(uuid))
        .optional()
        .await?
        .ok_or(ApiError::SessionCorrupt)?;

    Ok(Json(profile.into()))
}

/// Update profile request data
///
/// All parameter are optional, but at least one of them is required.
#[derive(Deserialize, ToSchema)]
pub struct UpdateProfileRequest {
    #[schema(example = "Cambridge")]
    city: Option<String>,
    #[schema(example = "herbert@example.org")]
    email_address: Option<String>,
    /// An empty string removes the profile image
    #[schema(example = "https://example.org/herbert.png")]
    profile_image_url: Option<String>,
}

/// Updates the profile of the currently logged-in account
///
/// All parameter are optional, but at least one of them is required.
#[utoipa::path(
    tag = "Profiles",
    context_path = "/api/v1",
    responses(
        (status = 200, description = "Profile has been updated"),
        (status = 400, description = "Client error", body = ApiErrorResponse),
        (status = 500, description = "Server error", body = ApiErrorResponse),
    ),
    request_body = UpdateProfileRequest,
    security(("session_cookie" = []))
)]
#[put("/profiles/me")]
pub async fn update_my_profile(
    req: Json<UpdateProfileRequest>,
    db: Data<Database>,
    session: Session,
) -> ApiResult<HttpResponse> {
    let uuid: Uuid = session.get("profile")?.ok_or(ApiError::SessionCorrupt)?;

    if let Some(city) = &req.city {
        validate_field("city", city)?;
    }

    if let Some(email_address) = &req.email_address {
        validate_email(email_address)?;
    }

    let profile_image_url = req
        .profile_image_url
        .as_deref()
        .map(validate_image_url)
        .transpose()?;

    update!(db.as_ref(), Profile)
        .condition(Profile::F.uuid.equals(uuid))
        .begin_dyn_set()
        .set_if(Profile::F.city, req.city.clone())
        .set_if(Profile::F.email_address, req.email_address.clone())
        .set_if(Profile::F.profile_image_url, profile_image_url)
        .finish_dyn_set()
        .map_err(|_| ApiError::EmptyJson)?
        .exec()
        .await?;

    Ok(HttpResponse::Ok().finish())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn required_fields_must_not_be_blank() {
        assert!(validate_field("city", "Boston").is_ok());
        assert!(matches!(
            validate_field("city", "   "),
            Err(ApiError::InvalidProfileField("city"))
        ));
        assert!(validate_field("first_name", "").is_err());
    }

    #[test]
    fn profile_image_urls() {
        assert_eq!(
            validate_image_url("https://example.com/herbert.png").unwrap(),
            Some("https://example.com/herbert.png".to_string())
        );
        assert_eq!(
            validate_image_url(" http://example.com/a.jpg ").unwrap(),
            Some("http://example.com/a.jpg".to_string())
        );

        for invalid in [
            "herbert.png",
            "example.com/herbert.png",
            "javascript:alert(1)",
            "ftp://example.com/herbert.png",
            "file:///etc/passwd",
            "https://",
        ] {
            assert!(
                matches!(
                    validate_image_url(invalid),
                    Err(ApiError::InvalidProfileImageUrl)
                ),
                "{invalid} should be rejected"
            );
        }
    }

    #[test]
    fn empty_image_url_clears_the_image() {
        assert_eq!(validate_image_url("").unwrap(), None);
        assert_eq!(validate_image_url("   ").unwrap(), None);
    }

    #[test]
    fn email_addresses() {
        assert!(validate_email("herbert@example.com").is_ok());
        assert!(validate_email("h.schmidt@mail.example.org").is_ok());

        for invalid in [
            "",
            "herbert",
            "@example.com",
            "herbert@",
            "herbert@localhost",
            "herbert@.com",
            "herbert@example.",
            "her bert@example.com",
            "a@b@example.com",
        ] {
            assert!(
                matches!(validate_email(invalid), Err(ApiError::InvalidEmailAddress)),
                "{invalid} should be rejected"
            );
        }
    }
}
