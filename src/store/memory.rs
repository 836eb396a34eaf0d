use super::{ClubFilter, SlugKind, Store, StoreError, StoreResult};
use crate::{
    models::{Club, Contact, Event, EventWithOwner},
    patch::{ClubChange, EventPatch, Patch},
    week,
};
use async_trait::async_trait;
use chrono::{NaiveDate, NaiveDateTime};
use std::collections::HashMap;
use tokio::sync::RwLock;

#[derive(Default)]
struct Tables {
    clubs: HashMap<String, Club>,
    events: HashMap<String, Event>,
    contacts: Vec<Contact>,
}

impl Tables {
    fn with_owner(&self, event: &Event) -> EventWithOwner {
        (event.clone(), self.clubs.get(&event.club_id).cloned())
    }

    fn email_taken(&self, email: &str, except: Option<&str>) -> bool {
        self.clubs
            .values()
            .any(|c| c.email == email && Some(c.id.as_str()) != except)
    }
}

fn by_schedule(a: &EventWithOwner, b: &EventWithOwner) -> std::cmp::Ordering {
    (a.0.date, &a.0.start_time).cmp(&(b.0.date, &b.0.start_time))
}

/// Process-local store, used when no database is configured.
#[derive(Default)]
pub struct MemoryStore {
    tables: RwLock<Tables>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl Store for MemoryStore {
    async fn insert_club(&self, club: Club) -> StoreResult<Club> {
        let mut tables = self.tables.write().await;
        if tables.email_taken(&club.email, None) {
            return Err(StoreError::Conflict("Email already registered".into()));
        }
        if tables.clubs.values().any(|c| c.slug == club.slug) {
            return Err(StoreError::Conflict("club slug already in use".into()));
        }
        tables.clubs.insert(club.id.clone(), club.clone());
        Ok(club)
    }

    async fn club(&self, id: &str) -> StoreResult<Option<Club>> {
        Ok(self.tables.read().await.clubs.get(id).cloned())
    }

    async fn club_by_email(&self, email: &str) -> StoreResult<Option<Club>> {
        Ok(self
            .tables
            .read()
            .await
            .clubs
            .values()
            .find(|c| c.email == email)
            .cloned())
    }

    async fn clubs(&self, filter: &ClubFilter) -> StoreResult<Vec<Club>> {
        let tables = self.tables.read().await;
        let mut clubs: Vec<Club> = tables
            .clubs
            .values()
            .filter(|c| filter.matches(c))
            .cloned()
            .collect();
        clubs.sort_by(|a, b| a.club_name.cmp(&b.club_name));
        Ok(clubs)
    }

    async fn update_club(&self, id: &str, change: ClubChange) -> StoreResult<Option<Club>> {
        let mut tables = self.tables.write().await;
        let Some(mut club) = tables.clubs.get(id).cloned() else {
            return Ok(None);
        };
        change.apply(&mut club);
        if tables.email_taken(&club.email, Some(id)) {
            return Err(StoreError::Conflict("Email already registered".into()));
        }
        tables.clubs.insert(club.id.clone(), club.clone());
        Ok(Some(club))
    }

    async fn slug_taken(&self, kind: SlugKind, slug: &str) -> StoreResult<bool> {
        let tables = self.tables.read().await;
        Ok(match kind {
            SlugKind::Club => tables.clubs.values().any(|c| c.slug == slug),
            SlugKind::Event => tables.events.values().any(|e| e.slug == slug),
        })
    }

    async fn insert_event(&self, event: Event) -> StoreResult<Event> {
        let mut tables = self.tables.write().await;
        if !tables.clubs.contains_key(&event.club_id) {
            return Err(StoreError::Conflict(format!(
                "club `{}` does not exist",
                event.club_id
            )));
        }
        if tables.events.values().any(|e| e.slug == event.slug) {
            return Err(StoreError::Conflict("event slug already in use".into()));
        }
        tables.events.insert(event.id.clone(), event.clone());
        Ok(event)
    }

    async fn event(&self, id: &str) -> StoreResult<Option<EventWithOwner>> {
        let tables = self.tables.read().await;
        Ok(tables.events.get(id).map(|e| tables.with_owner(e)))
    }

    async fn events_between(
        &self,
        start: NaiveDate,
        end: NaiveDate,
    ) -> StoreResult<Vec<EventWithOwner>> {
        let tables = self.tables.read().await;
        let mut events: Vec<_> = tables
            .events
            .values()
            .filter(|e| week::contains((start, end), e.date))
            .map(|e| tables.with_owner(e))
            .collect();
        events.sort_by(by_schedule);
        Ok(events)
    }

    async fn events_for_club(&self, club_id: &str) -> StoreResult<Vec<EventWithOwner>> {
        let tables = self.tables.read().await;
        let mut events: Vec<_> = tables
            .events
            .values()
            .filter(|e| e.club_id == club_id)
            .map(|e| tables.with_owner(e))
            .collect();
        events.sort_by(by_schedule);
        Ok(events)
    }

    async fn update_event(
        &self,
        id: &str,
        patch: EventPatch,
    ) -> StoreResult<Option<EventWithOwner>> {
        let mut tables = self.tables.write().await;
        let Some(event) = tables.events.get_mut(id) else {
            return Ok(None);
        };
        patch.apply(event);
        let event = event.clone();
        Ok(Some(tables.with_owner(&event)))
    }

    async fn adjust_likes(&self, id: &str, delta: i32) -> StoreResult<Option<i32>> {
        let mut tables = self.tables.write().await;
        Ok(tables.events.get_mut(id).map(|e| {
            e.likes = e.likes.saturating_add(delta).max(0);
            e.likes
        }))
    }

    async fn insert_contact(&self, contact: Contact) -> StoreResult<Contact> {
        self.tables.write().await.contacts.push(contact.clone());
        Ok(contact)
    }

    async fn contacts_since(&self, since: NaiveDateTime) -> StoreResult<Vec<Contact>> {
        let tables = self.tables.read().await;
        let mut contacts: Vec<Contact> = tables
            .contacts
            .iter()
            .filter(|c| c.date >= since)
            .cloned()
            .collect();
        contacts.sort_by(|a, b| b.date.cmp(&a.date));
        Ok(contacts)
    }
}
