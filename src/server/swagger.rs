//! This module holds the definition of the swagger declaration

use utoipa::openapi::security::{ApiKey, ApiKeyValue, SecurityScheme};
use utoipa::{Modify, OpenApi};

use crate::server::handler;

struct CookieSecurity;

impl Modify for CookieSecurity {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        if let Some(components) = openapi.components.as_mut() {
            components.add_security_scheme(
                "session_cookie",
                SecurityScheme::ApiKey(ApiKey::Cookie(ApiKeyValue::new("id"))),
            )
        }
    }
}

/// Helper struct for the openapi definitions.
#[derive(OpenApi)]
#[openapi(
    paths(
        handler::register_account,
        handler::delete_me,
        handler::set_password,
        handler::login,
        handler::logout,
        handler::get_version,
        handler::get_all_profiles,
        handler::get_profile,
        handler::get_my_profile,
        handler::update_my_profile,
        handler::get_status_messages,
        handler::create_status_message,
        handler::update_status_message,
        handler::delete_status_message,
        handler::get_image,
        handler::get_friends,
        handler::add_friend,
        handler::delete_friend,
        handler::get_suggestions,
        handler::get_feed,
    ),
    components(schemas(
        handler::AccountRegistrationRequest,
        handler::ApiErrorResponse,
        handler::ApiStatusCode,
        handler::LoginRequest,
        handler::SetPasswordRequest,
        handler::VersionResponse,
        handler::ProfileResponse,
        handler::GetProfilesResponse,
        handler::ProfileDetailResponse,
        handler::UpdateProfileRequest,
        handler::ImageResponse,
        handler::ImageUpload,
        handler::StatusMessageResponse,
        handler::GetStatusMessagesResponse,
        handler::CreateStatusMessageRequest,
        handler::CreateStatusMessageResponse,
        handler::UpdateStatusMessageRequest,
        handler::GetFriendsResponse,
        handler::GetSuggestionsResponse,
        handler::FeedEntry,
        handler::GetFeedResponse,
    )),
    modifiers(&CookieSecurity)
)]
pub struct ApiDoc;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn openapi_contains_all_routes() {
        let doc = ApiDoc::openapi();
        let paths = &doc.paths.paths;

        for path in [
            "/api/version",
            "/api/v1/accounts/register",
            "/api/v1/auth/login",
            "/api/v1/profiles",
            "/api/v1/profiles/{uuid}",
            "/api/v1/profiles/me/feed",
            "/api/v1/profiles/me/suggestions",
            "/api/v1/profiles/me/friends/{uuid}",
            "/api/v1/status/{id}",
            "/api/v1/images/{id}",
        ] {
            assert!(paths.contains_key(path), "{path} is missing");
        }
    }
}
