//! External response shapes, assembled from stored rows without any I/O.

use crate::{
    models::{Club, Contact, Event},
    patch::decode_tags,
    week::DATE_FORMAT,
};
use axum::Json;
use chrono::{TimeZone, Utc};
use serde::Serialize;

pub const UNKNOWN_CLUB: &str = "Unknown";

/// Success wrapper shared by every data-carrying response.
#[derive(Debug, Serialize)]
pub struct Envelope<T> {
    pub success: bool,
    pub data: T,
}

pub fn envelope<T: Serialize>(data: T) -> Json<Envelope<T>> {
    Json(Envelope {
        success: true,
        data,
    })
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EventResponse {
    pub id: String,
    pub slug: String,
    pub title: String,
    pub description: String,
    #[serde(rename = "clubID")]
    pub club_id: String,
    pub club_name: String,
    pub date: String,
    pub start_time: String,
    pub end_time: String,
    pub duration: f64,
    pub location: String,
    pub location_type: String,
    pub cover_image: Option<String>,
    pub tags: Vec<String>,
    pub is_registration_open: bool,
    pub registration_link: Option<String>,
    pub capacity: Option<i32>,
    pub likes: i32,
}

impl EventResponse {
    pub fn from_event(event: Event, owner: Option<&Club>) -> EventResponse {
        EventResponse {
            club_name: owner
                .map(|c| c.club_name.clone())
                .unwrap_or_else(|| UNKNOWN_CLUB.to_string()),
            date: event.date.format(DATE_FORMAT).to_string(),
            tags: decode_tags(&event.tags),
            id: event.id,
            slug: event.slug,
            title: event.title,
            description: event.description,
            club_id: event.club_id,
            start_time: event.start_time,
            end_time: event.end_time,
            duration: event.duration,
            location: event.location,
            location_type: event.location_type,
            cover_image: event.cover_image,
            is_registration_open: event.is_registration_open,
            registration_link: event.registration_link,
            capacity: event.capacity,
            likes: event.likes,
        }
    }
}

impl From<(Event, Option<Club>)> for EventResponse {
    fn from((event, owner): (Event, Option<Club>)) -> Self {
        EventResponse::from_event(event, owner.as_ref())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ClubResponse {
    pub id: String,
    pub slug: String,
    pub email: String,
    pub club_name: String,
    pub description: Option<String>,
    pub logo_url: Option<String>,
    pub banner_url: Option<String>,
    pub role: String,
    pub is_verified: bool,
    pub rejection_reason: Option<String>,
}

impl From<Club> for ClubResponse {
    fn from(club: Club) -> Self {
        ClubResponse {
            id: club.id,
            slug: club.slug,
            email: club.email,
            club_name: club.club_name,
            description: club.description,
            logo_url: club.logo_url,
            banner_url: club.banner_url,
            role: club.role,
            is_verified: club.is_verified,
            rejection_reason: club.rejection_reason,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ContactResponse {
    pub email: String,
    pub message: String,
    pub date: String,
}

impl From<Contact> for ContactResponse {
    fn from(c: Contact) -> Self {
        ContactResponse {
            email: c.email,
            message: c.message,
            date: Utc.from_utc_datetime(&c.date).to_rfc3339(),
        }
    }
}
