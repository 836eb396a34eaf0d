//! Persistence gateway.
//!
//! Request handling only ever sees `Arc<dyn Store>`; the backend is chosen once
//! at startup. Both backends apply patches through [`crate::patch::Patch`] so
//! their update semantics cannot drift apart.

use crate::{
    models::{Club, Contact, Event, EventWithOwner, Role},
    patch::{ClubChange, EventPatch},
};
use async_trait::async_trait;
use chrono::{NaiveDate, NaiveDateTime};

mod memory;
mod pg;

pub use memory::MemoryStore;
pub use pg::{connect_to_db, DbPool, PgStore};

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// A uniqueness constraint rejected the write.
    #[error("{0}")]
    Conflict(String),
    #[error("database error: {0}")]
    Database(#[from] diesel::result::Error),
    #[error("failed to acquire a database connection: {0}")]
    Pool(String),
}

pub type StoreResult<T> = Result<T, StoreError>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SlugKind {
    Club,
    Event,
}

/// Which clubs a listing returns. `None` fields do not filter.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ClubFilter {
    pub role: Option<Role>,
    pub verified: Option<bool>,
    /// Case-insensitive substring of the name or description.
    pub search: Option<String>,
}

impl ClubFilter {
    /// The public directory: verified club accounts only.
    pub fn directory(search: Option<String>) -> Self {
        ClubFilter {
            role: Some(Role::Club),
            verified: Some(true),
            search: search.filter(|s| !s.trim().is_empty()),
        }
    }

    pub fn matches(&self, club: &Club) -> bool {
        if self.role.map_or(false, |r| club.role() != r) {
            return false;
        }
        if self.verified.map_or(false, |v| club.is_verified != v) {
            return false;
        }
        match &self.search {
            Some(needle) => {
                let needle = needle.to_lowercase();
                club.club_name.to_lowercase().contains(&needle)
                    || club
                        .description
                        .as_deref()
                        .map_or(false, |d| d.to_lowercase().contains(&needle))
            }
            None => true,
        }
    }
}

#[async_trait]
pub trait Store: Send + Sync {
    /// Fails with [`StoreError::Conflict`] when the email is already registered.
    async fn insert_club(&self, club: Club) -> StoreResult<Club>;
    async fn club(&self, id: &str) -> StoreResult<Option<Club>>;
    async fn club_by_email(&self, email: &str) -> StoreResult<Option<Club>>;
    /// Ordered by club name.
    async fn clubs(&self, filter: &ClubFilter) -> StoreResult<Vec<Club>>;
    /// Applies the change atomically; `None` if the club does not exist.
    async fn update_club(&self, id: &str, change: ClubChange) -> StoreResult<Option<Club>>;
    async fn slug_taken(&self, kind: SlugKind, slug: &str) -> StoreResult<bool>;

    async fn insert_event(&self, event: Event) -> StoreResult<Event>;
    async fn event(&self, id: &str) -> StoreResult<Option<EventWithOwner>>;
    /// Events with `start <= date < end`, ordered by date then start time.
    async fn events_between(
        &self,
        start: NaiveDate,
        end: NaiveDate,
    ) -> StoreResult<Vec<EventWithOwner>>;
    async fn events_for_club(&self, club_id: &str) -> StoreResult<Vec<EventWithOwner>>;
    async fn update_event(
        &self,
        id: &str,
        patch: EventPatch,
    ) -> StoreResult<Option<EventWithOwner>>;
    /// Relative adjustment, never below zero. Returns the new count.
    async fn adjust_likes(&self, id: &str, delta: i32) -> StoreResult<Option<i32>>;

    async fn insert_contact(&self, contact: Contact) -> StoreResult<Contact>;
    /// Newest first.
    async fn contacts_since(&self, since: NaiveDateTime) -> StoreResult<Vec<Contact>>;
}
