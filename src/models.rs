use crate::schema::*;
use chrono::{NaiveDate, NaiveDateTime};
use diesel::prelude::*;
use std::{fmt, str::FromStr};

/// Account role stored in `users.role`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    Club,
    Admin,
}

impl Role {
    pub fn as_str(self) -> &'static str {
        match self {
            Role::Club => "club",
            Role::Admin => "admin",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Role {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "club" => Ok(Role::Club),
            "admin" => Ok(Role::Admin),
            other => Err(format!("unknown role `{other}`")),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LocationType {
    OnCampus,
    OffCampus,
}

impl LocationType {
    pub fn as_str(self) -> &'static str {
        match self {
            LocationType::OnCampus => "on-campus",
            LocationType::OffCampus => "off-campus",
        }
    }
}

impl FromStr for LocationType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "on-campus" => Ok(LocationType::OnCampus),
            "off-campus" => Ok(LocationType::OffCampus),
            other => Err(format!(
                "invalid location type `{other}`, expected `on-campus` or `off-campus`"
            )),
        }
    }
}

/// A club account. The store calls these rows `users`; admins live in the same table.
#[derive(Debug, Clone, PartialEq, Queryable, Insertable, Identifiable, AsChangeset)]
#[diesel(table_name = users, treat_none_as_null = true)]
pub struct Club {
    pub id: String,
    pub slug: String,
    pub email: String,
    pub password_hash: String,
    pub club_name: String,
    pub description: Option<String>,
    pub logo_url: Option<String>,
    pub banner_url: Option<String>,
    pub role: String,
    pub is_verified: bool,
    pub rejection_reason: Option<String>,
}

impl Club {
    /// Unrecognised roles degrade to the least privileged one.
    pub fn role(&self) -> Role {
        self.role.parse().unwrap_or(Role::Club)
    }

    pub fn is_admin(&self) -> bool {
        self.role() == Role::Admin
    }

    /// Admins count as verified for every permission check.
    pub fn is_effectively_verified(&self) -> bool {
        self.is_verified || self.is_admin()
    }
}

#[derive(Debug, Clone, PartialEq, Queryable, Insertable, Identifiable, AsChangeset)]
#[diesel(table_name = events, treat_none_as_null = true)]
pub struct Event {
    pub id: String,
    pub slug: String,
    pub title: String,
    pub description: String,
    pub cover_image: Option<String>,
    /// Comma separated, see [`crate::patch::encode_tags`].
    pub tags: String,
    pub date: NaiveDate,
    pub start_time: String,
    pub end_time: String,
    pub duration: f64,
    pub location_type: String,
    pub location: String,
    pub is_registration_open: bool,
    pub registration_link: Option<String>,
    pub capacity: Option<i32>,
    pub likes: i32,
    pub club_id: String,
}

/// An event joined with its owning club, if the relation resolved.
pub type EventWithOwner = (Event, Option<Club>);

#[derive(Debug, Clone, PartialEq, Queryable, Insertable)]
#[diesel(table_name = contacts)]
pub struct Contact {
    pub id: String,
    pub email: String,
    pub message: String,
    pub date: NaiveDateTime,
}
