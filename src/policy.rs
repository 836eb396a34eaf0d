//! The single decision point for every privileged operation.
//!
//! Handlers load whatever club the operation targets, then ask [`decide`]
//! before touching the store. Nothing here performs I/O.

use crate::models::{Club, Role};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operation {
    CreateEvent,
    EditEvent,
    EditClub,
    UploadImage,
    ListAllClubs,
    SetVerification,
    ReadContacts,
}

/// The authenticated account performing a request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Caller {
    pub id: String,
    pub role: Role,
}

impl From<&Club> for Caller {
    fn from(club: &Club) -> Self {
        Caller {
            id: club.id.clone(),
            role: club.role(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum Denial {
    #[error("the {0} does not exist")]
    NotFound(&'static str),
    #[error("only the owning club or an administrator may do this")]
    NotOwner,
    #[error("administrator role required")]
    AdminOnly,
    #[error("the club has not been verified by an administrator")]
    Unverified,
}

/// `target` is the club the operation acts on: the club an event is created
/// for, the owner of an edited event, or the edited profile. Operations that
/// have no target club ignore it.
pub fn decide(op: Operation, caller: &Caller, target: Option<&Club>) -> Result<(), Denial> {
    match op {
        Operation::CreateEvent | Operation::EditEvent | Operation::EditClub => {
            let club = target.ok_or(Denial::NotFound("club"))?;
            match caller.role {
                Role::Admin => Ok(()),
                Role::Club if caller.id != club.id => Err(Denial::NotOwner),
                Role::Club if !club.is_effectively_verified() => Err(Denial::Unverified),
                Role::Club => Ok(()),
            }
        }
        Operation::UploadImage => match caller.role {
            Role::Club | Role::Admin => Ok(()),
        },
        Operation::ListAllClubs | Operation::SetVerification | Operation::ReadContacts => {
            match caller.role {
                Role::Admin => Ok(()),
                Role::Club => Err(Denial::AdminOnly),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn club(id: &str, role: Role, verified: bool) -> Club {
        Club {
            id: id.to_string(),
            slug: id.to_string(),
            email: format!("{id}@uni.edu"),
            password_hash: String::new(),
            club_name: id.to_string(),
            description: None,
            logo_url: None,
            banner_url: None,
            role: role.as_str().to_string(),
            is_verified: verified,
            rejection_reason: None,
        }
    }

    fn caller(c: &Club) -> Caller {
        Caller::from(c)
    }

    #[test]
    fn unverified_club_cannot_post_for_itself() {
        let c = club("chess", Role::Club, false);
        assert_eq!(
            decide(Operation::CreateEvent, &caller(&c), Some(&c)),
            Err(Denial::Unverified)
        );
    }

    #[test]
    fn verified_club_posts_for_itself() {
        let c = club("chess", Role::Club, true);
        assert_eq!(decide(Operation::CreateEvent, &caller(&c), Some(&c)), Ok(()));
    }

    #[test]
    fn admin_is_treated_as_verified() {
        let admin = club("root", Role::Admin, false);
        assert_eq!(
            decide(Operation::CreateEvent, &caller(&admin), Some(&admin)),
            Ok(())
        );
        assert_eq!(
            decide(Operation::EditClub, &caller(&admin), Some(&admin)),
            Ok(())
        );
    }

    #[test]
    fn admin_acts_on_other_clubs() {
        let admin = club("root", Role::Admin, true);
        let pending = club("chess", Role::Club, false);
        for op in [Operation::CreateEvent, Operation::EditEvent, Operation::EditClub] {
            assert_eq!(decide(op, &caller(&admin), Some(&pending)), Ok(()));
        }
    }

    #[test]
    fn clubs_cannot_touch_each_other() {
        let chess = club("chess", Role::Club, true);
        let jazz = club("jazz", Role::Club, true);
        for op in [Operation::CreateEvent, Operation::EditEvent, Operation::EditClub] {
            assert_eq!(decide(op, &caller(&chess), Some(&jazz)), Err(Denial::NotOwner));
        }
    }

    #[test]
    fn missing_target_is_not_found() {
        let chess = club("chess", Role::Club, true);
        assert_eq!(
            decide(Operation::CreateEvent, &caller(&chess), None),
            Err(Denial::NotFound("club"))
        );
    }

    #[test]
    fn unverified_club_cannot_edit_its_profile() {
        let c = club("chess", Role::Club, false);
        assert_eq!(
            decide(Operation::EditClub, &caller(&c), Some(&c)),
            Err(Denial::Unverified)
        );
    }

    #[test]
    fn uploads_only_need_an_account() {
        let c = club("chess", Role::Club, false);
        assert_eq!(decide(Operation::UploadImage, &caller(&c), None), Ok(()));
    }

    #[test]
    fn admin_only_operations() {
        let c = club("chess", Role::Club, true);
        let admin = club("root", Role::Admin, true);
        for op in [
            Operation::ListAllClubs,
            Operation::SetVerification,
            Operation::ReadContacts,
        ] {
            assert_eq!(decide(op, &caller(&c), None), Err(Denial::AdminOnly));
            assert_eq!(decide(op, &caller(&admin), None), Ok(()));
        }
    }
}
