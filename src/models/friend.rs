use rorm::fields::types::ForeignModel;
use rorm::{Model, Patch};

use crate::models::Profile;

/// An undirected friendship between two profiles
///
/// Only one row exists per pair. It is stored with the smaller uuid in `profile1`,
/// but lookups must always check both columns. `pair` is unique, so concurrent
/// inserts of the same pair can't both succeed.
#[derive(Model)]
pub struct Friend {
    /// Primary key of this friend pair
    #[rorm(id)]
    pub id: i64,

    /// One side of the friendship
    #[rorm(on_update = "Cascade", on_delete = "Cascade")]
    pub profile1: ForeignModel<Profile>,

    /// The other side of the friendship
    #[rorm(on_update = "Cascade", on_delete = "Cascade")]
    pub profile2: ForeignModel<Profile>,

    /// Both profiles as `"{smaller}:{larger}"`, see [pair_key](crate::graph::pair_key)
    #[rorm(unique, max_length = 73)]
    pub pair: String,

    /// The point in time the friendship was created
    #[rorm(auto_create_time)]
    pub created_at: chrono::NaiveDateTime,
}

#[derive(Patch)]
#[rorm(model = "Friend")]
pub(crate) struct FriendInsert {
    pub profile1: ForeignModel<Profile>,
    pub profile2: ForeignModel<Profile>,
    pub pair: String,
}
