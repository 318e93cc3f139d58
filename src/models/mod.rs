//! All the database models live here.

pub use account::*;
pub use friend::*;
pub use profile::*;
pub use status_message::*;

mod account;
mod friend;
mod profile;
mod status_message;

#[cfg(test)]
mod tests {
    use rorm::imr::{Annotation, Field, ReferentialAction};
    use rorm::Model;

    use super::*;

    fn column(model: rorm::imr::Model, name: &str) -> Field {
        model
            .fields
            .into_iter()
            .find(|field| field.name == name)
            .unwrap_or_else(|| panic!("column {name} is missing"))
    }

    fn on_delete(field: &Field) -> Option<ReferentialAction> {
        field.annotations.iter().find_map(|annotation| match annotation {
            Annotation::ForeignKey(foreign_key) => Some(foreign_key.on_delete),
            _ => None,
        })
    }

    fn is_unique(field: &Field) -> bool {
        field
            .annotations
            .iter()
            .any(|annotation| matches!(annotation, Annotation::Unique))
    }

    #[test]
    fn deleting_a_status_message_deletes_its_images() {
        let field = column(Image::get_imr(), "status_message");
        assert_eq!(on_delete(&field), Some(ReferentialAction::Cascade));
    }

    #[test]
    fn deleting_a_profile_deletes_its_posts_and_friendships() {
        let field = column(StatusMessage::get_imr(), "profile");
        assert_eq!(on_delete(&field), Some(ReferentialAction::Cascade));

        for name in ["profile1", "profile2"] {
            let field = column(Friend::get_imr(), name);
            assert_eq!(on_delete(&field), Some(ReferentialAction::Cascade));
        }
    }

    #[test]
    fn deleting_an_account_deletes_its_profile() {
        let field = column(Profile::get_imr(), "account");
        assert_eq!(on_delete(&field), Some(ReferentialAction::Cascade));
        assert!(is_unique(&field));
    }

    #[test]
    fn friend_pairs_and_usernames_are_unique() {
        assert!(is_unique(&column(Friend::get_imr(), "pair")));
        assert!(is_unique(&column(Account::get_imr(), "username")));
        assert!(!is_unique(&column(Friend::get_imr(), "profile1")));
    }
}
