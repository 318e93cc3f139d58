//! The news feed

use std::collections::HashMap;

use actix_toolbox::tb_middleware::Session;
use actix_web::get;
use actix_web::web::{Data, Json};
use itertools::Itertools;
use rorm::Database;
use serde::Serialize;
use utoipa::ToSchema;
use uuid::Uuid;

use crate::graph;
use crate::server::handler::friends::load_neighbors;
use crate::server::handler::profiles::load_profiles;
use crate::server::handler::status_messages::load_status_messages_of;
use crate::server::handler::{ApiError, ApiErrorResponse, ApiResult, ProfileResponse, StatusMessageResponse};

/// A status message in the feed together with its author
#[derive(Serialize, ToSchema, Debug)]
pub struct FeedEntry {
    #[serde(flatten)]
    status_message: StatusMessageResponse,
    #[schema(example = "Herbert")]
    first_name: String,
    #[schema(example = "Schmidt")]
    last_name: String,
    profile_image_url: Option<String>,
}

/// The news feed of a profile
#[derive(Serialize, ToSchema)]
pub struct GetFeedResponse {
    feed: Vec<FeedEntry>,
}

/// Merge the status messages of all members into one feed.
///
/// Messages are grouped by their author, so every member is one source of the merge.
fn assemble_feed(
    status_messages: Vec<StatusMessageResponse>,
    authors: Vec<ProfileResponse>,
) -> Vec<FeedEntry> {
    let authors: HashMap<Uuid, ProfileResponse> =
        authors.into_iter().map(|p| (p.uuid, p)).collect();

    let sources = status_messages
        .into_iter()
        .map(|status_message| (status_message.profile, status_message))
        .into_group_map()
        .into_values();

    graph::merge_feed(sources)
        .into_iter()
        .filter_map(|status_message| {
            let author = authors.get(&status_message.profile)?;
            Some(FeedEntry {
                first_name: author.first_name.clone(),
                last_name: author.last_name.clone(),
                profile_image_url: author.profile_image_url.clone(),
                status_message,
            })
        })
        .collect()
}

/// Retrieve the news feed
///
/// The feed contains the status messages of yourself and all your friends, newest first.
/// Messages posted at the same time are ordered by their id, the higher id first.
#[utoipa::path(
    tag = "Feed",
    context_path = "/api/v1",
    responses(
        (status = 200, description = "Returns the news feed", body = GetFeedResponse),
        (status = 400, description = "Client error", body = ApiErrorResponse),
        (status = 500, description = "Server error", body = ApiErrorResponse),
    ),
    security(("session_cookie" = []))
)]
#[get("/profiles/me/feed")]
pub async fn get_feed(db: Data<Database>, session: Session) -> ApiResult<Json<GetFeedResponse>> {
    let profile: Uuid = session.get("profile")?.ok_or(ApiError::SessionCorrupt)?;

    let mut members = load_neighbors(db.as_ref(), profile).await?;
    members.push(profile);

    let status_messages = load_status_messages_of(db.as_ref(), &members).await?;
    let authors = load_profiles(db.as_ref(), &members).await?;

    Ok(Json(GetFeedResponse {
        feed: assemble_feed(status_messages, authors),
    }))
}

#[cfg(test)]
mod tests {
    use chrono::{DateTime, TimeZone, Utc};

    use super::*;

    fn profile(uuid: Uuid, first_name: &str) -> ProfileResponse {
        ProfileResponse {
            uuid,
            first_name: first_name.to_string(),
            last_name: "Schmidt".to_string(),
            city: "Boston".to_string(),
            email_address: "a@example.com".to_string(),
            profile_image_url: None,
            created_at: at(0),
        }
    }

    fn at(minute: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 10, 21, 12, minute, 0).unwrap()
    }

    fn status(id: i64, profile: Uuid, minute: u32) -> StatusMessageResponse {
        StatusMessageResponse {
            id,
            profile,
            message: format!("message {id}"),
            created_at: at(minute),
            images: vec![],
        }
    }

    #[test]
    fn feed_merges_authors_newest_first() {
        let me = Uuid::new_v4();
        let friend = Uuid::new_v4();

        let feed = assemble_feed(
            vec![
                status(2, friend, 10),
                status(1, me, 1),
                status(4, me, 30),
                status(3, friend, 10),
            ],
            vec![profile(me, "Herbert"), profile(friend, "Erna")],
        );

        let ids: Vec<_> = feed.iter().map(|e| e.status_message.id).collect();
        assert_eq!(ids, vec![4, 3, 2, 1]);
        assert_eq!(feed[0].first_name, "Herbert");
        assert_eq!(feed[1].first_name, "Erna");
    }

    #[test]
    fn feed_entries_are_flat() {
        let me = Uuid::new_v4();
        let feed = assemble_feed(vec![status(7, me, 5)], vec![profile(me, "Herbert")]);

        let json = serde_json::to_value(&feed[0]).unwrap();
        assert_eq!(json["id"], 7);
        assert_eq!(json["first_name"], "Herbert");
        assert_eq!(json["message"], "message 7");
    }

    #[test]
    fn messages_of_unknown_authors_are_skipped() {
        let me = Uuid::new_v4();
        let stranger = Uuid::new_v4();

        let feed = assemble_feed(
            vec![status(1, me, 1), status(2, stranger, 2)],
            vec![profile(me, "Herbert")],
        );

        let ids: Vec<_> = feed.iter().map(|e| e.status_message.id).collect();
        assert_eq!(ids, vec![1]);
    }

    #[test]
    fn empty_feed() {
        let me = Uuid::new_v4();
        assert!(assemble_feed(vec![], vec![profile(me, "Herbert")]).is_empty());
    }
}
