//! Friendships between profiles and friend suggestions

use std::collections::HashSet;

use actix_toolbox::tb_middleware::Session;
use actix_web::web::{Data, Json, Path};
use actix_web::{delete, get, post, HttpResponse};
use log::debug;
use rorm::fields::types::ForeignModelByField;
use rorm::{and, insert, or, query, Database, FieldAccess, Model};
use serde::Serialize;
use utoipa::ToSchema;
use uuid::Uuid;

use crate::graph::{self, Connect};
use crate::models::{Friend, FriendInsert, Profile};
use crate::server::handler::profiles::load_profiles;
use crate::server::handler::{is_unique_violation, ApiError, ApiErrorResponse, ApiResult, PathUuid, ProfileResponse};

/// Retrieve the uuids of all friends of a profile.
///
/// The friendship table is searched in both directions.
pub(crate) async fn load_neighbors(db: &Database, profile: Uuid) -> ApiResult<Vec<Uuid>> {
    let outgoing = query!(db, (Friend::F.profile1, Friend::F.profile2))
        .condition(Friend::F.profile1.equals(profile.as_ref()))
        .all()
        .await?;

    let incoming = query!(db, (Friend::F.profile1, Friend::F.profile2))
        .condition(Friend::F.profile2.equals(profile.as_ref()))
        .all()
        .await?;

    let edges = outgoing
        .into_iter()
        .chain(incoming)
        .map(|(a, b)| (*a.key(), *b.key()));

    Ok(graph::neighbors(profile, edges))
}

/// The friends of a profile
#[derive(Serialize, ToSchema)]
pub struct GetFriendsResponse {
    friends: Vec<ProfileResponse>,
}

/// Retrieve the friends of a profile
#[utoipa::path(
    tag = "Friends",
    context_path = "/api/v1",
    responses(
        (status = 200, description = "Returns the friends of the profile", body = GetFriendsResponse),
        (status = 400, description = "Client error", body = ApiErrorResponse),
        (status = 404, description = "Profile not found", body = ApiErrorResponse),
        (status = 500, description = "Server error", body = ApiErrorResponse),
    ),
    params(PathUuid),
    security(("session_cookie" = []))
)]
#[get("/profiles/{uuid}/friends")]
pub async fn get_friends(
    path: Path<PathUuid>,
    db: Data<Database>,
) -> ApiResult<Json<GetFriendsResponse>> {
    query!(db.as_ref(), (Profile::F.uuid,))
        .condition(Profile::F.uuid.equals(path.uuid))
        .optional()
        .await?
        .ok_or(ApiError::ProfileNotFound)?;

    let neighbors = load_neighbors(db.as_ref(), path.uuid).await?;
    let friends = load_profiles(db.as_ref(), &neighbors).await?;

    Ok(Json(GetFriendsResponse { friends }))
}

/// Add a profile as friend
///
/// Friendships are mutual. Adding yourself or an existing friend does nothing.
#[utoipa::path(
    tag = "Friends",
    context_path = "/api/v1",
    responses(
        (status = 200, description = "Nothing to do, the profiles are already friends"),
        (status = 201, description = "Friendship has been created"),
        (status = 400, description = "Client error", body = ApiErrorResponse),
        (status = 404, description = "Profile not found", body = ApiErrorResponse),
        (status = 500, description = "Server error", body = ApiErrorResponse),
    ),
    params(PathUuid),
    security(("session_cookie" = []))
)]
#[post("/profiles/me/friends/{uuid}")]
pub async fn add_friend(
    path: Path<PathUuid>,
    db: Data<Database>,
    session: Session,
) -> ApiResult<HttpResponse> {
    let profile: Uuid = session.get("profile")?.ok_or(ApiError::SessionCorrupt)?;
    let target = path.uuid;

    let mut tx = db.start_transaction().await?;

    query!(&mut tx, (Profile::F.uuid,))
        .condition(Profile::F.uuid.equals(target))
        .optional()
        .await?
        .ok_or(ApiError::ProfileNotFound)?;

    let existing = query!(&mut tx, (Friend::F.profile1, Friend::F.profile2))
        .condition(or!(
            and!(
                Friend::F.profile1.equals(profile.as_ref()),
                Friend::F.profile2.equals(target.as_ref())
            ),
            and!(
                Friend::F.profile1.equals(target.as_ref()),
                Friend::F.profile2.equals(profile.as_ref())
            )
        ))
        .all()
        .await?;

    let edges = existing.into_iter().map(|(a, b)| (*a.key(), *b.key()));
    let Connect::Insert(profile1, profile2) = graph::connect(profile, target, edges) else {
        return Ok(HttpResponse::Ok().finish());
    };

    let pair = graph::pair_key(profile1, profile2);
    if let Err(err) = insert!(&mut tx, FriendInsert)
        .single(&FriendInsert {
            profile1: ForeignModelByField::Key(profile1),
            profile2: ForeignModelByField::Key(profile2),
            pair: pair.clone(),
        })
        .await
    {
        if is_unique_violation(&err) {
            debug!("Friendship {pair} was created by a concurrent request");
            return Ok(HttpResponse::Ok().finish());
        }
        return Err(err.into());
    }

    tx.commit().await?;

    Ok(HttpResponse::Created().finish())
}

/// Remove a profile from your friends
#[utoipa::path(
    tag = "Friends",
    context_path = "/api/v1",
    responses(
        (status = 200, description = "The profiles are no longer friends"),
        (status = 400, description = "Client error", body = ApiErrorResponse),
        (status = 500, description = "Server error", body = ApiErrorResponse),
    ),
    params(PathUuid),
    security(("session_cookie" = []))
)]
#[delete("/profiles/me/friends/{uuid}")]
pub async fn delete_friend(
    path: Path<PathUuid>,
    db: Data<Database>,
    session: Session,
) -> ApiResult<HttpResponse> {
    let profile: Uuid = session.get("profile")?.ok_or(ApiError::SessionCorrupt)?;
    let target = path.uuid;

    let mut tx = db.start_transaction().await?;

    for (a, b) in [(profile, target), (target, profile)] {
        rorm::delete!(&mut tx, Friend)
            .condition(and!(
                Friend::F.profile1.equals(a.as_ref()),
                Friend::F.profile2.equals(b.as_ref())
            ))
            .await?;
    }

    tx.commit().await?;

    Ok(HttpResponse::Ok().finish())
}

/// Profiles that could be added as friend
#[derive(Serialize, ToSchema)]
pub struct GetSuggestionsResponse {
    suggestions: Vec<ProfileResponse>,
}

/// Retrieve friend suggestions
///
/// Every profile that is neither you nor one of your friends is suggested.
#[utoipa::path(
    tag = "Friends",
    context_path = "/api/v1",
    responses(
        (status = 200, description = "Returns the suggested profiles", body = GetSuggestionsResponse),
        (status = 400, description = "Client error", body = ApiErrorResponse),
        (status = 500, description = "Server error", body = ApiErrorResponse),
    ),
    security(("session_cookie" = []))
)]
#[get("/profiles/me/suggestions")]
pub async fn get_suggestions(
    db: Data<Database>,
    session: Session,
) -> ApiResult<Json<GetSuggestionsResponse>> {
    let profile: Uuid = session.get("profile")?.ok_or(ApiError::SessionCorrupt)?;

    let neighbors = load_neighbors(db.as_ref(), profile).await?;
    let all_profiles = query!(db.as_ref(), Profile).all().await?;

    let suggested: HashSet<Uuid> =
        graph::suggestions(profile, all_profiles.iter().map(|p| p.uuid), &neighbors)
            .into_iter()
            .collect();

    Ok(Json(GetSuggestionsResponse {
        suggestions: all_profiles
            .into_iter()
            .filter(|p| suggested.contains(&p.uuid))
            .map(ProfileResponse::from)
            .collect(),
    }))
}
