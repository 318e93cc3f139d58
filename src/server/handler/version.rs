use actix_web::get;
use actix_web::web::Json;
use serde::Serialize;
use utoipa::ToSchema;

/// The version of the api mounted under `/api/v1`
pub const API_VERSION: u8 = 1;

/// The version data for clients
#[derive(Serialize, ToSchema)]
pub struct VersionResponse {
    #[schema(example = 1)]
    api_version: u8,
    #[schema(example = "0.1.0")]
    server_version: &'static str,
}

/// This endpoint is for clients to detect which api version this server currently supports
#[utoipa::path(
    tag = "Version",
    responses(
        (status = 200, description = "The supported api version", body = VersionResponse)
    ),
)]
#[get("/api/version")]
pub async fn get_version() -> Json<VersionResponse> {
    Json(VersionResponse {
        api_version: API_VERSION,
        server_version: env!("CARGO_PKG_VERSION"),
    })
}
