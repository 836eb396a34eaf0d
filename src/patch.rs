//! Field-level partial updates.
//!
//! Every patch field is optional. A present field overwrites the stored value,
//! an absent one leaves it alone; nothing is ever implicitly nulled.

use crate::models::{Club, Event, LocationType};
use chrono::NaiveDate;
use itertools::Itertools;

pub trait Patch<T> {
    fn apply(self, target: &mut T);
}

fn set<T>(slot: &mut T, value: Option<T>) {
    if let Some(value) = value {
        *slot = value;
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct EventPatch {
    pub title: Option<String>,
    pub description: Option<String>,
    pub cover_image: Option<String>,
    pub tags: Option<Vec<String>>,
    pub date: Option<NaiveDate>,
    pub start_time: Option<String>,
    pub end_time: Option<String>,
    pub duration: Option<f64>,
    pub location_type: Option<LocationType>,
    pub location: Option<String>,
    pub is_registration_open: Option<bool>,
    pub registration_link: Option<String>,
    pub capacity: Option<i32>,
}

impl Patch<Event> for EventPatch {
    fn apply(self, event: &mut Event) {
        set(&mut event.title, self.title);
        set(&mut event.description, self.description);
        set(&mut event.cover_image, self.cover_image.map(Some));
        set(&mut event.tags, self.tags.as_deref().map(encode_tags));
        set(&mut event.date, self.date);
        set(&mut event.start_time, self.start_time);
        set(&mut event.end_time, self.end_time);
        set(&mut event.duration, self.duration);
        set(
            &mut event.location_type,
            self.location_type.map(|l| l.as_str().to_string()),
        );
        set(&mut event.location, self.location);
        set(&mut event.is_registration_open, self.is_registration_open);
        set(&mut event.registration_link, self.registration_link.map(Some));
        set(&mut event.capacity, self.capacity.map(Some));
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ClubPatch {
    pub club_name: Option<String>,
    pub email: Option<String>,
    pub description: Option<String>,
    pub logo_url: Option<String>,
    pub banner_url: Option<String>,
}

impl Patch<Club> for ClubPatch {
    fn apply(self, club: &mut Club) {
        set(&mut club.club_name, self.club_name);
        set(&mut club.email, self.email);
        set(&mut club.description, self.description.map(Some));
        set(&mut club.logo_url, self.logo_url.map(Some));
        set(&mut club.banner_url, self.banner_url.map(Some));
    }
}

/// An administrator's verification decision.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Verification {
    Approve,
    Reject { reason: Option<String> },
}

impl Patch<Club> for Verification {
    fn apply(self, club: &mut Club) {
        match self {
            Verification::Approve => {
                club.is_verified = true;
                club.rejection_reason = None;
            }
            Verification::Reject { reason } => {
                club.is_verified = false;
                club.rejection_reason = Some(reason.unwrap_or_default());
            }
        }
    }
}

/// Everything that may change on a stored club after creation.
#[derive(Debug, Clone, PartialEq)]
pub enum ClubChange {
    Profile(ClubPatch),
    Verification(Verification),
}

impl Patch<Club> for ClubChange {
    fn apply(self, club: &mut Club) {
        match self {
            ClubChange::Profile(p) => p.apply(club),
            ClubChange::Verification(v) => v.apply(club),
        }
    }
}

/// Tags are persisted comma separated; commas inside a tag become spaces.
pub fn encode_tags(tags: &[String]) -> String {
    tags.iter()
        .map(|t| t.replace(',', " ").trim().to_string())
        .filter(|t| !t.is_empty())
        .join(",")
}

pub fn decode_tags(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .map(String::from)
        .collect()
}

/// Lowercases, drops everything but `[a-z0-9-]` and whitespace, then
/// collapses whitespace runs into single hyphens.
pub fn generate_slug(text: &str) -> String {
    text.trim()
        .to_lowercase()
        .chars()
        .filter(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || *c == '-' || c.is_whitespace())
        .collect::<String>()
        .split_whitespace()
        .join("-")
}
