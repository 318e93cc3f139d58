use rorm::fields::types::{BackRef, ForeignModel};
use rorm::{field, Model, Patch};
use uuid::Uuid;

use crate::models::{Account, StatusMessage};

/// The public profile of an account
#[derive(Model)]
pub struct Profile {
    /// Primary key of the profile
    #[rorm(primary_key)]
    pub uuid: Uuid,

    /// The account owning this profile
    #[rorm(unique, on_delete = "Cascade", on_update = "Cascade")]
    pub account: ForeignModel<Account>,

    /// First name of the owner
    #[rorm(max_length = 255)]
    pub first_name: String,

    /// Last name of the owner
    #[rorm(max_length = 255)]
    pub last_name: String,

    /// The city the owner lives in
    #[rorm(max_length = 255)]
    pub city: String,

    /// Email address of the owner
    #[rorm(max_length = 255)]
    pub email_address: String,

    /// An optional url pointing to a profile picture
    #[rorm(max_length = 1024)]
    pub profile_image_url: Option<String>,

    /// The status messages posted by this profile
    pub status_messages: BackRef<field!(StatusMessage::F.profile)>,

    /// The point in time the profile was created
    #[rorm(auto_create_time)]
    pub created_at: chrono::NaiveDateTime,
}

#[derive(Patch)]
#[rorm(model = "Profile")]
pub(crate) struct ProfileInsert {
    pub(crate) uuid: Uuid,
    pub(crate) account: ForeignModel<Account>,
    pub(crate) first_name: String,
    pub(crate) last_name: String,
    pub(crate) city: String,
    pub(crate) email_address: String,
    pub(crate) profile_image_url: Option<String>,
}
