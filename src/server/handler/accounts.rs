//! All handlers for the account endpoints live in here

use actix_toolbox::tb_middleware::Session;
use actix_web::web::{Data, Json};
use actix_web::{delete, post, HttpResponse};
use argon2::password_hash::{Error, SaltString};
use argon2::{Argon2, PasswordHash, PasswordHasher, PasswordVerifier};
use log::info;
use rand::thread_rng;
use rorm::fields::types::ForeignModelByField;
use rorm::{insert, query, update, Database, FieldAccess, Model};
use serde::Deserialize;
use utoipa::ToSchema;
use uuid::Uuid;

use crate::models::{Account, AccountInsert, Image, ProfileInsert};
use crate::server::handler::profiles::{validate_email, validate_field, validate_image_url};
use crate::server::handler::status_messages::remove_files;
use crate::server::handler::{is_unique_violation, ApiError, ApiErrorResponse, ApiResult};
use crate::server::RuntimeSettings;

/// The content to register a new account together with its profile
#[derive(Debug, Deserialize, ToSchema)]
pub struct AccountRegistrationRequest {
    #[schema(example = "user123")]
    username: String,
    #[schema(example = "super-secure-password")]
    password: String,
    #[schema(example = "Herbert")]
    first_name: String,
    #[schema(example = "Schmidt")]
    last_name: String,
    #[schema(example = "Boston")]
    city: String,
    #[schema(example = "herbert@example.com")]
    email_address: String,
    #[schema(example = "https://example.com/herbert.png")]
    profile_image_url: Option<String>,
}

/// Register a new account
///
/// The profile of the account is created in the same step.
#[utoipa::path(
    tag = "Accounts",
    responses(
        (status = 200, description = "Account got created"),
        (status = 400, description = "Client error", body = ApiErrorResponse),
        (status = 500, description = "Server error", body = ApiErrorResponse),
    ),
    request_body = AccountRegistrationRequest,
)]
#[post("/api/v1/accounts/register")]
pub async fn register_account(
    req: Json<AccountRegistrationRequest>,
    db: Data<Database>,
) -> ApiResult<HttpResponse> {
    if req.username.is_empty() {
        return Err(ApiError::InvalidUsername);
    }

    if req.password.is_empty() {
        return Err(ApiError::InvalidPassword);
    }

    validate_field("first_name", &req.first_name)?;
    validate_field("last_name", &req.last_name)?;
    validate_field("city", &req.city)?;
    validate_email(&req.email_address)?;
    let profile_image_url = req
        .profile_image_url
        .as_deref()
        .map(validate_image_url)
        .transpose()?
        .flatten();

    let mut tx = db.start_transaction().await?;

    if query!(&mut tx, (Account::F.uuid,))
        .condition(Account::F.username.equals(&req.username))
        .optional()
        .await?
        .is_some()
    {
        return Err(ApiError::UsernameAlreadyOccupied);
    }

    let salt = SaltString::generate(&mut thread_rng());
    let password_hash = Argon2::default()
        .hash_password(req.password.as_bytes(), &salt)?
        .to_string();

    let uuid = Uuid::new_v4();
    insert!(&mut tx, AccountInsert)
        .single(&AccountInsert {
            uuid,
            username: req.username.clone(),
            password_hash,
            last_login: None,
        })
        .await
        .map_err(|err| {
            // A concurrent registration took the username after the check above
            if is_unique_violation(&err) {
                ApiError::UsernameAlreadyOccupied
            } else {
                ApiError::DatabaseError(err)
            }
        })?;

    insert!(&mut tx, ProfileInsert)
        .single(&ProfileInsert {
            uuid: Uuid::new_v4(),
            account: ForeignModelByField::Key(uuid),
            first_name: req.first_name.clone(),
            last_name: req.last_name.clone(),
            city: req.city.clone(),
            email_address: req.email_address.clone(),
            profile_image_url,
        })
        .await?;

    tx.commit().await?;

    info!("Registered account {}", req.username);

    Ok(HttpResponse::Ok().finish())
}

/// Deletes the currently logged-in account
///
/// The profile, its friendships, status messages and images are deleted as well.
#[utoipa::path(
    tag = "Accounts",
    context_path = "/api/v1",
    responses(
        (status = 200, description = "Deleted the currently logged-in account"),
        (status = 400, description = "Client error", body = ApiErrorResponse),
        (status = 500, description = "Server error", body = ApiErrorResponse),
    ),
    security(("session_cookie" = []))
)]
#[delete("/accounts/me")]
pub async fn delete_me(
    settings: Data<RuntimeSettings>,
    db: Data<Database>,
    session: Session,
) -> ApiResult<HttpResponse> {
    let uuid: Uuid = session.get("uuid")?.ok_or(ApiError::SessionCorrupt)?;
    let profile: Uuid = session.get("profile")?.ok_or(ApiError::SessionCorrupt)?;

    let mut tx = db.start_transaction().await?;

    let files: Vec<_> = query!(&mut tx, (Image::F.file_name,))
        .condition(Image::F.status_message.profile.equals(profile.as_ref()))
        .all()
        .await?
        .into_iter()
        .map(|(file_name,)| settings.media_path.join(file_name))
        .collect();

    rorm::delete!(&mut tx, Account)
        .condition(Account::F.uuid.equals(uuid))
        .await?;

    tx.commit().await?;

    // Clear the current session
    session.purge();

    remove_files(&files).await;

    Ok(HttpResponse::Ok().finish())
}

/// The set password request data
///
/// The parameter `new_password` must not be empty
#[derive(Deserialize, ToSchema)]
pub struct SetPasswordRequest {
    #[schema(example = "super-secure-password")]
    old_password: String,
    #[schema(example = "ultra-secure-password!!11!")]
    new_password: String,
}

/// Sets a new password for the currently logged-in account
#[utoipa::path(
    tag = "Accounts",
    context_path = "/api/v1",
    responses(
        (status = 200, description = "New password has been set"),
        (status = 400, description = "Client error", body = ApiErrorResponse),
        (status = 500, description = "Server error", body = ApiErrorResponse),
    ),
    request_body = SetPasswordRequest,
    security(("session_cookie" = []))
)]
#[post("/accounts/me/setPassword")]
pub async fn set_password(
    req: Json<SetPasswordRequest>,
    db: Data<Database>,
    session: Session,
) -> ApiResult<HttpResponse> {
    let uuid: Uuid = session.get("uuid")?.ok_or(ApiError::SessionCorrupt)?;

    if req.new_password.is_empty() {
        return Err(ApiError::InvalidPassword);
    }

    let mut tx = db.start_transaction().await?;

    let (pw_hash,) = query!(&mut tx, (Account::F.password_hash,))
        .condition(Account::F.uuid.equals(uuid))
        .optional()
        .await?
        .ok_or(ApiError::SessionCorrupt)?;

    Argon2::default()
        .verify_password(req.old_password.as_bytes(), &PasswordHash::new(&pw_hash)?)
        .map_err(|e| match e {
            Error::Password => ApiError::LoginFailed,
            _ => ApiError::InvalidHash(e),
        })?;

    let salt = SaltString::generate(&mut thread_rng());
    let password_hash = Argon2::default()
        .hash_password(req.new_password.as_bytes(), &salt)?
        .to_string();

    update!(&mut tx, Account)
        .condition(Account::F.uuid.equals(uuid))
        .set(Account::F.password_hash, password_hash)
        .exec()
        .await?;

    tx.commit().await?;

    Ok(HttpResponse::Ok().finish())
}
