//! This module holds the server definition

use std::net::SocketAddr;
use std::path::PathBuf;

use actix_toolbox::tb_middleware::{
    setup_logging_mw, DBSessionStore, LoggingMiddlewareConfig, PersistentSession,
    SessionMiddleware,
};
use actix_web::cookie::time::Duration;
use actix_web::cookie::Key;
use actix_web::http::StatusCode;
use actix_web::middleware::{Compress, ErrorHandlers};
use actix_web::web::{scope, Data, JsonConfig, PayloadConfig};
use actix_web::{App, HttpServer};
use base64::prelude::BASE64_STANDARD;
use base64::Engine;
use log::info;
use rorm::Database;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use crate::config::Config;
use crate::server::error::StartServerError;
use crate::server::handler::{
    add_friend, create_status_message, delete_friend, delete_me, delete_status_message,
    get_all_profiles, get_feed, get_friends, get_image, get_my_profile, get_profile,
    get_status_messages, get_suggestions, get_version, login, logout, register_account,
    set_password, update_my_profile, update_status_message,
};
use crate::server::middleware::{handle_not_found, json_extractor_error, AuthenticationRequired};
use crate::server::swagger::ApiDoc;

pub mod error;
pub mod handler;
pub mod middleware;
pub mod swagger;

/// The maximum size of a json body.
///
/// Status messages carry their images base64 encoded, so this has to be larger
/// than a few images.
const JSON_LIMIT: usize = 32 * 1024 * 1024;

/// Settings that are needed by the handlers at runtime
pub struct RuntimeSettings {
    /// The directory image files are stored in
    pub media_path: PathBuf,
}

/// Start the minifb server
///
/// **Parameter**:
/// - `config`: Reference to a [Config] struct
/// - `db`: [Database]
pub async fn start_server(config: &Config, db: Database) -> Result<(), StartServerError> {
    let s_addr = SocketAddr::new(config.server.listen_address, config.server.listen_port);

    let key = Key::try_from(BASE64_STANDARD.decode(&config.server.secret_key)?.as_slice())?;

    let media_path = PathBuf::from(&config.server.media_path);
    if !media_path.is_dir() {
        return Err(StartServerError::InvalidMediaPath(
            config.server.media_path.clone(),
        ));
    }
    let settings = Data::new(RuntimeSettings { media_path });

    let session_ttl = Duration::hours(config.server.session_ttl_hours);

    info!("Starting to listen on {}", s_addr);

    HttpServer::new(move || {
        App::new()
            .app_data(PayloadConfig::default())
            .app_data(
                JsonConfig::default()
                    .limit(JSON_LIMIT)
                    .error_handler(json_extractor_error),
            )
            .app_data(settings.clone())
            .app_data(Data::new(db.clone()))
            .wrap(setup_logging_mw(LoggingMiddlewareConfig::default()))
            .wrap(
                SessionMiddleware::builder(DBSessionStore::new(db.clone()), key.clone())
                    .session_lifecycle(PersistentSession::session_ttl(
                        PersistentSession::default(),
                        session_ttl,
                    ))
                    .build(),
            )
            .wrap(Compress::default())
            .wrap(ErrorHandlers::new().handler(StatusCode::NOT_FOUND, handle_not_found))
            .service(SwaggerUi::new("/docs/{_:.*}").url("/api-doc/openapi.json", ApiDoc::openapi()))
            .service(get_version)
            .service(register_account)
            .service(scope("/api/v1/auth").service(login).service(logout))
            .service(
                scope("/api/v1")
                    .wrap(AuthenticationRequired)
                    .service(delete_me)
                    .service(set_password)
                    .service(get_all_profiles)
                    // Routes below /profiles/me have to be registered before /profiles/{uuid}
                    .service(get_my_profile)
                    .service(update_my_profile)
                    .service(get_feed)
                    .service(get_suggestions)
                    .service(create_status_message)
                    .service(add_friend)
                    .service(delete_friend)
                    .service(get_profile)
                    .service(get_status_messages)
                    .service(get_friends)
                    .service(update_status_message)
                    .service(delete_status_message)
                    .service(get_image),
            )
    })
    .bind(s_addr)?
    .run()
    .await?;

    Ok(())
}
