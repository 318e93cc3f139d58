//! This module holds the handler of minifb

use std::fmt::{Display, Formatter};

use actix_toolbox::tb_middleware::actix_session::{SessionGetError, SessionInsertError};
use actix_web::body::BoxBody;
use actix_web::error::JsonPayloadError;
use actix_web::http::StatusCode;
use actix_web::HttpResponse;
use log::{debug, error, trace};
use serde::{Deserialize, Serialize};
use serde_repr::Serialize_repr;
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;

pub use crate::server::handler::accounts::*;
pub use crate::server::handler::auth::*;
pub use crate::server::handler::feed::*;
pub use crate::server::handler::friends::*;
pub use crate::server::handler::images::*;
pub use crate::server::handler::profiles::*;
pub use crate::server::handler::status_messages::*;
pub use crate::server::handler::version::*;

pub mod accounts;
pub mod auth;
pub mod feed;
pub mod friends;
pub mod images;
pub mod profiles;
pub mod status_messages;
pub mod version;

/// The result that is used throughout the complete api.
pub type ApiResult<T> = Result<T, ApiError>;

/// The uuid in a path
#[derive(Deserialize, IntoParams)]
pub struct PathUuid {
    pub(crate) uuid: Uuid,
}

/// The id in a path
#[derive(Deserialize, IntoParams)]
pub struct PathId {
    #[param(example = 1337)]
    pub(crate) id: i64,
}

/// The status codes of [ApiErrorResponse]
///
/// `1xxx` are client errors, `2xxx` are server errors.
#[derive(Serialize_repr, ToSchema, Debug, Copy, Clone, PartialEq, Eq)]
#[repr(u16)]
pub enum ApiStatusCode {
    /// The session is not logged in
    Unauthenticated = 1000,
    /// Wrong username or password
    LoginFailed = 1001,
    /// The username is taken
    UsernameAlreadyOccupied = 1002,
    /// The username is invalid
    InvalidUsername = 1003,
    /// The password is invalid
    InvalidPassword = 1004,
    /// A required profile field is empty
    InvalidProfileField = 1005,
    /// The email address is malformed
    InvalidEmailAddress = 1006,
    /// An update contained no values
    EmptyJson = 1007,
    /// The body couldn't be parsed
    InvalidJson = 1008,
    /// The requested profile doesn't exist
    ProfileNotFound = 1009,
    /// The requested status message doesn't exist
    StatusMessageNotFound = 1010,
    /// The requested image doesn't exist
    ImageNotFound = 1011,
    /// The action is only allowed for the owner
    MissingPrivileges = 1012,
    /// The text of a status message is invalid
    InvalidMessage = 1013,
    /// An uploaded image couldn't be decoded
    InvalidImage = 1014,
    /// An uploaded image is too large
    ImageTooLarge = 1015,
    /// No route matched the request
    NotFound = 1016,
    /// The profile image url is not a http(s) url
    InvalidProfileImageUrl = 1017,

    /// Unspecified server error
    InternalServerError = 2000,
    /// The database returned an error
    DatabaseError = 2001,
    /// The session store returned an error
    SessionError = 2002,
}

/// The body of every error response
#[derive(Serialize, ToSchema)]
pub struct ApiErrorResponse {
    #[schema(example = "Error message is here")]
    message: String,
    #[schema(example = 1000)]
    status_code: ApiStatusCode,
}

impl ApiErrorResponse {
    pub(crate) fn new(status_code: ApiStatusCode, message: String) -> Self {
        Self {
            message,
            status_code,
        }
    }
}

/// This enum holds all possible error types that can occur in the API
#[derive(Debug)]
pub enum ApiError {
    /// The user is not allowed to access the resource
    Unauthenticated,
    /// Login was not successful. Can be caused by incorrect username / password
    LoginFailed,
    /// The username is already occupied
    UsernameAlreadyOccupied,
    /// The username is empty
    InvalidUsername,
    /// The password is empty
    InvalidPassword,
    /// The named profile field is empty
    InvalidProfileField(&'static str),
    /// The email address is malformed
    InvalidEmailAddress,
    /// An update request didn't contain any value
    EmptyJson,
    /// The json body couldn't be parsed
    InvalidJson(JsonPayloadError),
    /// The profile doesn't exist
    ProfileNotFound,
    /// The status message doesn't exist
    StatusMessageNotFound,
    /// The image doesn't exist
    ImageNotFound,
    /// The executing user doesn't own the resource
    MissingPrivileges,
    /// The message of a status message is empty or too long
    InvalidMessage,
    /// The image data is not valid base64
    InvalidImage,
    /// The image exceeds the size limit
    ImageTooLarge,
    /// No route matched
    NotFound,
    /// The profile image url is not a http(s) url
    InvalidProfileImageUrl,

    /// The session contains a uuid which doesn't belong to any account
    SessionCorrupt,
    /// Unspecified internal error
    InternalServerError,
    /// All errors that are thrown by the database
    DatabaseError(rorm::Error),
    /// An invalid hash is retrieved from the database
    InvalidHash(argon2::password_hash::Error),
    /// Error inserting into the session
    SessionInsert(SessionInsertError),
    /// Error retrieving data from the session
    SessionGet(SessionGetError),
}

impl Display for ApiError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            ApiError::Unauthenticated => write!(f, "Unauthenticated"),
            ApiError::LoginFailed => write!(f, "The login was not successful"),
            ApiError::UsernameAlreadyOccupied => write!(f, "Username is already occupied"),
            ApiError::InvalidUsername => write!(f, "Invalid username"),
            ApiError::InvalidPassword => write!(f, "Invalid password"),
            ApiError::InvalidProfileField(field) => write!(f, "The field {field} must not be empty"),
            ApiError::InvalidEmailAddress => write!(f, "Invalid email address"),
            ApiError::EmptyJson => write!(f, "At least one parameter is required"),
            ApiError::InvalidJson(err) => write!(f, "Invalid json: {err}"),
            ApiError::ProfileNotFound => write!(f, "Profile not found"),
            ApiError::StatusMessageNotFound => write!(f, "Status message not found"),
            ApiError::ImageNotFound => write!(f, "Image not found"),
            ApiError::MissingPrivileges => write!(f, "Missing privileges"),
            ApiError::InvalidMessage => {
                write!(f, "The message must not be empty or longer than 2048 characters")
            }
            ApiError::InvalidImage => write!(f, "The image data is not valid base64"),
            ApiError::ImageTooLarge => write!(f, "The image is too large"),
            ApiError::NotFound => write!(f, "Not found"),
            ApiError::InvalidProfileImageUrl => {
                write!(f, "The profile image url must be a http or https url")
            }
            ApiError::SessionCorrupt => write!(f, "Corrupt session"),
            ApiError::InternalServerError
            | ApiError::InvalidHash(_)
            | ApiError::SessionInsert(_)
            | ApiError::SessionGet(_) => write!(f, "Internal server error"),
            ApiError::DatabaseError(_) => write!(f, "Database error occurred"),
        }
    }
}

impl ApiError {
    /// The http status and the [ApiStatusCode] this error is answered with
    pub(crate) fn status(&self) -> (StatusCode, ApiStatusCode) {
        match self {
            ApiError::Unauthenticated => (StatusCode::UNAUTHORIZED, ApiStatusCode::Unauthenticated),
            ApiError::LoginFailed => (StatusCode::BAD_REQUEST, ApiStatusCode::LoginFailed),
            ApiError::UsernameAlreadyOccupied => (
                StatusCode::BAD_REQUEST,
                ApiStatusCode::UsernameAlreadyOccupied,
            ),
            ApiError::InvalidUsername => (StatusCode::BAD_REQUEST, ApiStatusCode::InvalidUsername),
            ApiError::InvalidPassword => (StatusCode::BAD_REQUEST, ApiStatusCode::InvalidPassword),
            ApiError::InvalidProfileField(_) => {
                (StatusCode::BAD_REQUEST, ApiStatusCode::InvalidProfileField)
            }
            ApiError::InvalidEmailAddress => {
                (StatusCode::BAD_REQUEST, ApiStatusCode::InvalidEmailAddress)
            }
            ApiError::EmptyJson => (StatusCode::BAD_REQUEST, ApiStatusCode::EmptyJson),
            ApiError::InvalidJson(_) => (StatusCode::BAD_REQUEST, ApiStatusCode::InvalidJson),
            ApiError::ProfileNotFound => (StatusCode::NOT_FOUND, ApiStatusCode::ProfileNotFound),
            ApiError::StatusMessageNotFound => {
                (StatusCode::NOT_FOUND, ApiStatusCode::StatusMessageNotFound)
            }
            ApiError::ImageNotFound => (StatusCode::NOT_FOUND, ApiStatusCode::ImageNotFound),
            ApiError::MissingPrivileges => {
                (StatusCode::FORBIDDEN, ApiStatusCode::MissingPrivileges)
            }
            ApiError::InvalidMessage => (StatusCode::BAD_REQUEST, ApiStatusCode::InvalidMessage),
            ApiError::InvalidImage => (StatusCode::BAD_REQUEST, ApiStatusCode::InvalidImage),
            ApiError::ImageTooLarge => (StatusCode::PAYLOAD_TOO_LARGE, ApiStatusCode::ImageTooLarge),
            ApiError::NotFound => (StatusCode::NOT_FOUND, ApiStatusCode::NotFound),
            ApiError::InvalidProfileImageUrl => (
                StatusCode::BAD_REQUEST,
                ApiStatusCode::InvalidProfileImageUrl,
            ),
            ApiError::SessionCorrupt | ApiError::SessionInsert(_) | ApiError::SessionGet(_) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                ApiStatusCode::SessionError,
            ),
            ApiError::InternalServerError | ApiError::InvalidHash(_) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                ApiStatusCode::InternalServerError,
            ),
            ApiError::DatabaseError(_) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                ApiStatusCode::DatabaseError,
            ),
        }
    }
}

impl actix_web::ResponseError for ApiError {
    fn status_code(&self) -> StatusCode {
        self.status().0
    }

    fn error_response(&self) -> HttpResponse<BoxBody> {
        match self {
            ApiError::Unauthenticated => trace!("Unauthenticated"),
            ApiError::LoginFailed => debug!("Login request failed"),
            ApiError::InvalidJson(err) => debug!("Received invalid json: {err}"),
            ApiError::SessionCorrupt => error!("Session contains an unknown account"),
            ApiError::DatabaseError(err) => error!("Database error: {err}"),
            ApiError::InvalidHash(err) => error!("Got invalid password hash from db: {err}"),
            ApiError::SessionInsert(err) => error!("Session insert error: {err}"),
            ApiError::SessionGet(err) => error!("Session get error: {err}"),
            ApiError::InternalServerError => error!("Internal server error"),
            _ => debug!("{self}"),
        }

        let (status, code) = self.status();
        HttpResponse::build(status).json(ApiErrorResponse::new(code, self.to_string()))
    }
}

/// Check whether the database rejected a write because of a unique constraint
pub(crate) fn is_unique_violation(err: &rorm::Error) -> bool {
    match err {
        rorm::Error::SqlxError(sqlx::Error::Database(err)) => err.is_unique_violation(),
        _ => false,
    }
}

impl From<rorm::Error> for ApiError {
    fn from(value: rorm::Error) -> Self {
        Self::DatabaseError(value)
    }
}

impl From<argon2::password_hash::Error> for ApiError {
    fn from(value: argon2::password_hash::Error) -> Self {
        Self::InvalidHash(value)
    }
}

impl From<SessionInsertError> for ApiError {
    fn from(value: SessionInsertError) -> Self {
        Self::SessionInsert(value)
    }
}

impl From<SessionGetError> for ApiError {
    fn from(value: SessionGetError) -> Self {
        Self::SessionGet(value)
    }
}

#[cfg(test)]
mod tests {
    use actix_web::ResponseError;

    use super::*;

    #[test]
    fn status_codes_serialize_as_numbers() {
        let body = ApiErrorResponse::new(ApiStatusCode::ProfileNotFound, "x".to_string());
        let json = serde_json::to_value(body).unwrap();
        assert_eq!(json["status_code"], 1009);
        assert_eq!(json["message"], "x");
    }

    #[test]
    fn missing_entities_are_not_found() {
        for err in [
            ApiError::ProfileNotFound,
            ApiError::StatusMessageNotFound,
            ApiError::ImageNotFound,
            ApiError::NotFound,
        ] {
            assert_eq!(err.status_code(), StatusCode::NOT_FOUND);
        }
    }

    #[test]
    fn validation_errors_are_client_errors() {
        assert_eq!(
            ApiError::InvalidProfileField("city").status(),
            (StatusCode::BAD_REQUEST, ApiStatusCode::InvalidProfileField)
        );
        assert_eq!(
            ApiError::InvalidProfileField("city").to_string(),
            "The field city must not be empty"
        );
        assert_eq!(
            ApiError::MissingPrivileges.status_code(),
            StatusCode::FORBIDDEN
        );
    }

    #[derive(Debug)]
    struct ConstraintError {
        unique: bool,
    }

    impl Display for ConstraintError {
        fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
            write!(f, "constraint violated")
        }
    }

    impl std::error::Error for ConstraintError {}

    impl sqlx::error::DatabaseError for ConstraintError {
        fn message(&self) -> &str {
            "constraint violated"
        }

        fn as_error(&self) -> &(dyn std::error::Error + Send + Sync + 'static) {
            self
        }

        fn as_error_mut(&mut self) -> &mut (dyn std::error::Error + Send + Sync + 'static) {
            self
        }

        fn into_error(self: Box<Self>) -> Box<dyn std::error::Error + Send + Sync + 'static> {
            self
        }

        fn kind(&self) -> sqlx::error::ErrorKind {
            if self.unique {
                sqlx::error::ErrorKind::UniqueViolation
            } else {
                sqlx::error::ErrorKind::ForeignKeyViolation
            }
        }
    }

    #[test]
    fn unique_violations_are_detected() {
        let unique =
            rorm::Error::SqlxError(sqlx::Error::from(ConstraintError { unique: true }));
        assert!(is_unique_violation(&unique));

        let other = rorm::Error::SqlxError(sqlx::Error::from(ConstraintError { unique: false }));
        assert!(!is_unique_violation(&other));

        assert!(!is_unique_violation(&rorm::Error::DecodeError(
            "bad row".to_string()
        )));
    }

    #[test]
    fn invalid_image_urls_are_client_errors() {
        assert_eq!(
            ApiError::InvalidProfileImageUrl.status(),
            (StatusCode::BAD_REQUEST, ApiStatusCode::InvalidProfileImageUrl)
        );
    }

    #[test]
    fn server_errors_hide_details() {
        let err = ApiError::InternalServerError;
        assert_eq!(err.status_code(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(err.to_string(), "Internal server error");
    }
}
