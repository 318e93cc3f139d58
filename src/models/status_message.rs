use rorm::fields::types::{BackRef, ForeignModel};
use rorm::{field, Model, Patch};

use crate::models::Profile;

/// A status message posted by a profile
#[derive(Model)]
pub struct StatusMessage {
    /// The primary key of a status message
    #[rorm(id)]
    pub id: i64,

    /// The profile that posted the message
    #[rorm(on_delete = "Cascade", on_update = "Cascade")]
    pub profile: ForeignModel<Profile>,

    /// The text of the message
    #[rorm(max_length = 2048)]
    pub message: String,

    /// The images attached to this message
    pub images: BackRef<field!(Image::F.status_message)>,

    /// The timestamp when the message was posted
    #[rorm(auto_create_time)]
    pub created_at: chrono::NaiveDateTime,
}

#[derive(Patch)]
#[rorm(model = "StatusMessage")]
pub(crate) struct StatusMessageInsert {
    pub(crate) profile: ForeignModel<Profile>,
    pub(crate) message: String,
}

/// An image attached to a status message
///
/// The file itself lives in the media directory of the server.
#[derive(Model)]
pub struct Image {
    /// The primary key of an image
    #[rorm(id)]
    pub id: i64,

    /// The status message this image belongs to
    #[rorm(on_delete = "Cascade", on_update = "Cascade")]
    pub status_message: ForeignModel<StatusMessage>,

    /// Name of the file in the media directory
    #[rorm(max_length = 255)]
    pub file_name: String,

    /// The name of the file as it was uploaded
    #[rorm(max_length = 255)]
    pub original_name: String,

    /// The timestamp of the upload
    #[rorm(auto_create_time)]
    pub created_at: chrono::NaiveDateTime,
}

#[derive(Patch)]
#[rorm(model = "Image")]
pub(crate) struct ImageInsert {
    pub(crate) status_message: ForeignModel<StatusMessage>,
    pub(crate) file_name: String,
    pub(crate) original_name: String,
}
