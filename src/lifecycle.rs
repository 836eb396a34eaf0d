//! Creation and mutation of clubs, events and contact messages.
//!
//! Every privileged operation loads its target, asks [`policy::decide`] and
//! only then hands a validated value to the store.

use crate::{
    auth,
    error::{AppError, AppResult},
    models::{Club, Contact, Event, EventWithOwner, LocationType, Role},
    patch::{encode_tags, generate_slug, ClubChange, ClubPatch, EventPatch, Verification},
    policy::{self, Caller, Operation},
    store::{SlugKind, Store},
    week::parse_date,
};
use anyhow::Context;
use chrono::{Duration, NaiveDate, Utc};
use nanoid::nanoid;
use serde::Deserialize;

const SLUG_SUFFIX_LEN: usize = 6;
const SLUG_SUFFIX_ALPHABET: [char; 36] = [
    'a', 'b', 'c', 'd', 'e', 'f', 'g', 'h', 'i', 'j', 'k', 'l', 'm', 'n', 'o', 'p', 'q', 'r',
    's', 't', 'u', 'v', 'w', 'x', 'y', 'z', '0', '1', '2', '3', '4', '5', '6', '7', '8', '9',
];
const SLUG_ATTEMPTS: usize = 8;

#[derive(Debug, Deserialize)]
pub struct SignupRequest {
    pub email: String,
    pub password: String,
    #[serde(alias = "clubName")]
    pub club_name: String,
    pub description: Option<String>,
    #[serde(alias = "logoUrl")]
    pub logo_url: Option<String>,
    #[serde(alias = "bannerUrl")]
    pub banner_url: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    #[serde(alias = "username")]
    pub email: String,
    pub password: String,
}

#[derive(Debug, Deserialize)]
pub struct EventCreateRequest {
    pub title: String,
    pub description: String,
    #[serde(alias = "clubId", alias = "clubID")]
    pub club_id: String,
    pub date: String,
    #[serde(alias = "startTime")]
    pub start_time: String,
    #[serde(alias = "endTime")]
    pub end_time: String,
    pub duration: f64,
    #[serde(alias = "locationType")]
    pub location_type: String,
    pub location: String,
    #[serde(alias = "coverImage")]
    pub cover_image: Option<String>,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(
        default,
        alias = "isRegistrationRequired",
        alias = "isRegistrationOpen"
    )]
    pub is_registration_open: bool,
    #[serde(alias = "registrationLink")]
    pub registration_link: Option<String>,
    pub capacity: Option<i32>,
}

#[derive(Debug, Default, Deserialize)]
pub struct EventUpdateRequest {
    pub title: Option<String>,
    pub description: Option<String>,
    pub date: Option<String>,
    #[serde(alias = "startTime")]
    pub start_time: Option<String>,
    #[serde(alias = "endTime")]
    pub end_time: Option<String>,
    pub duration: Option<f64>,
    #[serde(alias = "locationType")]
    pub location_type: Option<String>,
    pub location: Option<String>,
    #[serde(alias = "coverImage")]
    pub cover_image: Option<String>,
    pub tags: Option<Vec<String>>,
    #[serde(alias = "isRegistrationRequired", alias = "isRegistrationOpen")]
    pub is_registration_open: Option<bool>,
    #[serde(alias = "registrationLink")]
    pub registration_link: Option<String>,
    pub capacity: Option<i32>,
}

#[derive(Debug, Default, Deserialize)]
pub struct ClubUpdateRequest {
    #[serde(alias = "clubName")]
    pub club_name: Option<String>,
    pub email: Option<String>,
    pub description: Option<String>,
    #[serde(alias = "logoUrl")]
    pub logo_url: Option<String>,
    #[serde(alias = "bannerUrl")]
    pub banner_url: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct StatusUpdateRequest {
    #[serde(alias = "isVerified")]
    pub is_verified: bool,
    #[serde(alias = "rejectionReason")]
    pub rejection_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct ContactRequest {
    pub email: String,
    pub message: String,
}

fn check_email(email: &str) -> AppResult<()> {
    match email.split_once('@') {
        Some((user, domain)) if !user.is_empty() && !domain.is_empty() => Ok(()),
        _ => Err(AppError::bad_request("invalid email address")),
    }
}

fn required(field: &'static str, value: &str) -> AppResult<()> {
    if value.trim().is_empty() {
        return Err(AppError::bad_request(format!("`{field}` must not be empty")));
    }
    Ok(())
}

fn date(raw: &str) -> AppResult<NaiveDate> {
    parse_date(raw).ok_or_else(|| AppError::bad_request("invalid date, expected YYYY-MM-DD"))
}

fn location_type(raw: &str) -> AppResult<LocationType> {
    raw.parse::<LocationType>().map_err(AppError::bad_request)
}

fn duration(hours: f64) -> AppResult<f64> {
    if !hours.is_finite() || hours < 0.0 {
        return Err(AppError::bad_request("`duration` must be a non-negative number of hours"));
    }
    Ok(hours)
}

fn capacity(seats: i32) -> AppResult<i32> {
    if seats < 0 {
        return Err(AppError::bad_request("`capacity` must not be negative"));
    }
    Ok(seats)
}

impl EventUpdateRequest {
    /// Validates every present field; nothing is applied if one is invalid.
    pub fn into_patch(self) -> AppResult<EventPatch> {
        if let Some(title) = &self.title {
            required("title", title)?;
        }
        Ok(EventPatch {
            title: self.title,
            description: self.description,
            cover_image: self.cover_image,
            tags: self.tags,
            date: self.date.as_deref().map(date).transpose()?,
            start_time: self.start_time,
            end_time: self.end_time,
            duration: self.duration.map(duration).transpose()?,
            location_type: self.location_type.as_deref().map(location_type).transpose()?,
            location: self.location,
            is_registration_open: self.is_registration_open,
            registration_link: self.registration_link,
            capacity: self.capacity.map(capacity).transpose()?,
        })
    }
}

impl ClubUpdateRequest {
    pub fn into_patch(self) -> AppResult<ClubPatch> {
        if let Some(name) = &self.club_name {
            required("club_name", name)?;
        }
        if let Some(email) = &self.email {
            check_email(email)?;
        }
        Ok(ClubPatch {
            club_name: self.club_name,
            email: self.email,
            description: self.description,
            logo_url: self.logo_url,
            banner_url: self.banner_url,
        })
    }
}

/// Checks an operation that has no target club.
pub fn authorize(caller: &Club, op: Operation) -> AppResult<()> {
    Ok(policy::decide(op, &Caller::from(caller), None)?)
}

async fn unique_slug(
    store: &dyn Store,
    kind: SlugKind,
    source: &str,
    fallback: &str,
) -> AppResult<String> {
    let mut base = generate_slug(source);
    if base.is_empty() {
        base = fallback.to_string();
    }
    if !store.slug_taken(kind, &base).await? {
        return Ok(base);
    }

    for _ in 0..SLUG_ATTEMPTS {
        let candidate = format!(
            "{base}-{}",
            nanoid!(SLUG_SUFFIX_LEN, &SLUG_SUFFIX_ALPHABET)
        );
        if !store.slug_taken(kind, &candidate).await? {
            return Ok(candidate);
        }
    }
    Err(anyhow::anyhow!("no free slug found for `{base}`").into())
}

async fn new_account(
    store: &dyn Store,
    email: String,
    password: &str,
    club_name: String,
    role: Role,
) -> AppResult<Club> {
    let password_hash = auth::hash_password(password).context("failed to hash password")?;
    let slug = unique_slug(store, SlugKind::Club, &club_name, "club").await?;

    Ok(Club {
        id: nanoid!(),
        slug,
        email,
        password_hash,
        club_name,
        description: None,
        logo_url: None,
        banner_url: None,
        role: role.as_str().to_string(),
        is_verified: role == Role::Admin,
        rejection_reason: None,
    })
}

/// New clubs always start as unverified `club` accounts.
pub async fn register_club(store: &dyn Store, req: SignupRequest) -> AppResult<Club> {
    let email = req.email.trim().to_string();
    check_email(&email)?;
    required("password", &req.password)?;
    required("club_name", &req.club_name)?;

    if store.club_by_email(&email).await?.is_some() {
        return Err(AppError::Conflict("Email already registered".into()));
    }

    let mut club = new_account(
        store,
        email,
        &req.password,
        req.club_name.trim().to_string(),
        Role::Club,
    )
    .await?;
    club.description = req.description;
    club.logo_url = req.logo_url;
    club.banner_url = req.banner_url;

    let club = store.insert_club(club).await?;
    tracing::info!(club = %club.id, slug = %club.slug, "club registered");
    Ok(club)
}

/// Makes sure the configured administrator account exists.
pub async fn bootstrap_admin(store: &dyn Store, email: &str, password: &str) -> AppResult<Club> {
    if let Some(existing) = store.club_by_email(email).await? {
        if !existing.is_admin() {
            tracing::warn!(email, "bootstrap admin email belongs to a club account");
        }
        return Ok(existing);
    }

    let admin = new_account(
        store,
        email.to_string(),
        password,
        "Administrator".to_string(),
        Role::Admin,
    )
    .await?;
    let admin = store.insert_club(admin).await?;
    tracing::info!(admin = %admin.id, "administrator account created");
    Ok(admin)
}

pub async fn authenticate(store: &dyn Store, req: &LoginRequest) -> AppResult<Club> {
    let invalid = || AppError::unauthorized("Incorrect email or password");

    let club = store
        .club_by_email(req.email.trim())
        .await?
        .ok_or_else(invalid)?;
    let valid = auth::verify_password(&req.password, &club.password_hash)
        .context("stored password hash is malformed")?;
    if !valid {
        return Err(invalid());
    }
    Ok(club)
}

pub async fn create_event(
    store: &dyn Store,
    caller: &Club,
    req: EventCreateRequest,
) -> AppResult<EventWithOwner> {
    let owner = store.club(&req.club_id).await?;
    policy::decide(Operation::CreateEvent, &Caller::from(caller), owner.as_ref())?;

    required("title", &req.title)?;
    let date = date(&req.date)?;
    let location_type = location_type(&req.location_type)?;
    let duration = duration(req.duration)?;
    let capacity = req.capacity.map(capacity).transpose()?;

    let slug = unique_slug(
        store,
        SlugKind::Event,
        &format!("{} {}", req.title, req.date.trim()),
        "event",
    )
    .await?;

    let event = store
        .insert_event(Event {
            id: nanoid!(),
            slug,
            title: req.title,
            description: req.description,
            cover_image: req.cover_image,
            tags: encode_tags(&req.tags),
            date,
            start_time: req.start_time,
            end_time: req.end_time,
            duration,
            location_type: location_type.as_str().to_string(),
            location: req.location,
            is_registration_open: req.is_registration_open,
            registration_link: req.registration_link,
            capacity,
            likes: 0,
            club_id: req.club_id,
        })
        .await?;

    tracing::info!(event = %event.id, club = %event.club_id, by = %caller.id, "event created");
    Ok((event, owner))
}

pub async fn update_event(
    store: &dyn Store,
    caller: &Club,
    id: &str,
    req: EventUpdateRequest,
) -> AppResult<EventWithOwner> {
    let (_, owner) = store
        .event(id)
        .await?
        .ok_or_else(|| AppError::not_found("Event not found"))?;
    policy::decide(Operation::EditEvent, &Caller::from(caller), owner.as_ref())?;

    let patch = req.into_patch()?;
    let updated = store
        .update_event(id, patch)
        .await?
        .ok_or_else(|| AppError::not_found("Event not found"))?;

    tracing::info!(event = %id, by = %caller.id, "event edited");
    Ok(updated)
}

pub async fn update_club(
    store: &dyn Store,
    caller: &Club,
    id: &str,
    req: ClubUpdateRequest,
) -> AppResult<Club> {
    let target = store.club(id).await?;
    policy::decide(Operation::EditClub, &Caller::from(caller), target.as_ref())?;

    let patch = req.into_patch()?;
    let club = store
        .update_club(id, ClubChange::Profile(patch))
        .await?
        .ok_or_else(|| AppError::not_found("Club not found"))?;

    tracing::info!(club = %id, by = %caller.id, "club profile edited");
    Ok(club)
}

pub async fn set_verification(
    store: &dyn Store,
    caller: &Club,
    id: &str,
    req: StatusUpdateRequest,
) -> AppResult<Club> {
    authorize(caller, Operation::SetVerification)?;

    let decision = if req.is_verified {
        Verification::Approve
    } else {
        Verification::Reject {
            reason: req.rejection_reason,
        }
    };
    let club = store
        .update_club(id, ClubChange::Verification(decision))
        .await?
        .ok_or_else(|| AppError::not_found("Club not found"))?;

    tracing::info!(
        club = %id,
        verified = club.is_verified,
        by = %caller.id,
        "verification decided"
    );
    Ok(club)
}

/// Returns the new like count.
pub async fn toggle_like(store: &dyn Store, id: &str, liked: bool) -> AppResult<i32> {
    let delta = if liked { 1 } else { -1 };
    store
        .adjust_likes(id, delta)
        .await?
        .ok_or_else(|| AppError::not_found("Event not found"))
}

pub async fn submit_contact(store: &dyn Store, req: ContactRequest) -> AppResult<Contact> {
    let email = req.email.trim().to_string();
    check_email(&email)?;
    required("message", &req.message)?;

    let contact = store
        .insert_contact(Contact {
            id: nanoid!(),
            email,
            message: req.message,
            date: Utc::now().naive_utc(),
        })
        .await?;
    tracing::debug!(contact = %contact.id, "contact message received");
    Ok(contact)
}

pub async fn recent_contacts(store: &dyn Store, caller: &Club, days: i64) -> AppResult<Vec<Contact>> {
    authorize(caller, Operation::ReadContacts)?;
    let since = Utc::now().naive_utc() - Duration::days(days);
    Ok(store.contacts_since(since).await?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryStore;

    fn signup(email: &str, name: &str) -> SignupRequest {
        SignupRequest {
            email: email.into(),
            password: "correct horse".into(),
            club_name: name.into(),
            description: Some("We meet on Fridays".into()),
            logo_url: None,
            banner_url: None,
        }
    }

    fn new_event(club_id: &str, title: &str, date: &str) -> EventCreateRequest {
        EventCreateRequest {
            title: title.into(),
            description: "All welcome".into(),
            club_id: club_id.into(),
            date: date.into(),
            start_time: "18:00".into(),
            end_time: "20:00".into(),
            duration: 2.0,
            location_type: "on-campus".into(),
            location: "Hall B".into(),
            cover_image: None,
            tags: vec![],
            is_registration_open: false,
            registration_link: None,
            capacity: None,
        }
    }

    async fn admin(store: &MemoryStore) -> Club {
        bootstrap_admin(store, "admin@uni.edu", "admin-pass").await.unwrap()
    }

    #[tokio::test]
    async fn signup_starts_unverified() {
        let store = MemoryStore::new();
        let club = register_club(&store, signup("a@b.edu", "Test Club")).await.unwrap();
        assert_eq!(club.role(), Role::Club);
        assert!(!club.is_verified);
        assert_eq!(club.slug, "test-club");
        assert_ne!(club.password_hash, "correct horse");
    }

    #[tokio::test]
    async fn duplicate_email_is_a_conflict() {
        let store = MemoryStore::new();
        register_club(&store, signup("a@b.edu", "One")).await.unwrap();
        let err = register_club(&store, signup("a@b.edu", "Two")).await.unwrap_err();
        assert!(matches!(err, AppError::Conflict(_)));
    }

    #[tokio::test]
    async fn colliding_slugs_get_a_suffix() {
        let store = MemoryStore::new();
        let first = register_club(&store, signup("a@b.edu", "Chess Club")).await.unwrap();
        let second = register_club(&store, signup("c@d.edu", "Chess  Club")).await.unwrap();
        assert_eq!(first.slug, "chess-club");
        assert!(second.slug.starts_with("chess-club-"));
        assert_eq!(second.slug.len(), "chess-club-".len() + SLUG_SUFFIX_LEN);
    }

    #[tokio::test]
    async fn login_checks_the_password() {
        let store = MemoryStore::new();
        register_club(&store, signup("a@b.edu", "Test Club")).await.unwrap();
        let ok = LoginRequest {
            email: "a@b.edu".into(),
            password: "correct horse".into(),
        };
        assert!(authenticate(&store, &ok).await.is_ok());

        let bad = LoginRequest {
            email: "a@b.edu".into(),
            password: "wrong".into(),
        };
        assert!(matches!(
            authenticate(&store, &bad).await,
            Err(AppError::Unauthorized(_))
        ));
    }

    #[tokio::test]
    async fn verification_unlocks_event_creation() {
        let store = MemoryStore::new();
        let root = admin(&store).await;
        let club = register_club(&store, signup("a@b.edu", "Test Club")).await.unwrap();

        let denied = create_event(&store, &club, new_event(&club.id, "Mixer", "2026-01-14"))
            .await
            .unwrap_err();
        assert!(matches!(denied, AppError::Forbidden(_)));

        let approve = StatusUpdateRequest {
            is_verified: true,
            rejection_reason: None,
        };
        let club = set_verification(&store, &root, &club.id, approve).await.unwrap();
        assert!(club.is_verified);

        let (event, owner) =
            create_event(&store, &club, new_event(&club.id, "Mixer", "2026-01-14"))
                .await
                .unwrap();
        assert_eq!(event.slug, "mixer-2026-01-14");
        assert_eq!(event.likes, 0);
        assert_eq!(owner.unwrap().club_name, "Test Club");
    }

    #[tokio::test]
    async fn rejection_records_the_reason() {
        let store = MemoryStore::new();
        let root = admin(&store).await;
        let club = register_club(&store, signup("a@b.edu", "Test Club")).await.unwrap();
        let reject = StatusUpdateRequest {
            is_verified: false,
            rejection_reason: Some("no faculty advisor".into()),
        };
        let club = set_verification(&store, &root, &club.id, reject).await.unwrap();
        assert!(!club.is_verified);
        assert_eq!(club.rejection_reason.as_deref(), Some("no faculty advisor"));
    }

    #[tokio::test]
    async fn clubs_cannot_verify_themselves() {
        let store = MemoryStore::new();
        let club = register_club(&store, signup("a@b.edu", "Test Club")).await.unwrap();
        let approve = StatusUpdateRequest {
            is_verified: true,
            rejection_reason: None,
        };
        assert!(matches!(
            set_verification(&store, &club, &club.id, approve).await,
            Err(AppError::Forbidden(_))
        ));
    }

    #[tokio::test]
    async fn event_for_missing_club_is_not_found() {
        let store = MemoryStore::new();
        let root = admin(&store).await;
        let err = create_event(&store, &root, new_event("nope", "Mixer", "2026-01-14"))
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::NotFound(_)));
    }

    #[tokio::test]
    async fn invalid_event_fields_are_rejected() {
        let store = MemoryStore::new();
        let root = admin(&store).await;

        let mut req = new_event(&root.id, "Mixer", "2026-13-01");
        assert!(matches!(
            create_event(&store, &root, req).await,
            Err(AppError::BadRequest(_))
        ));

        req = new_event(&root.id, "Mixer", "2026-01-14");
        req.location_type = "moon".into();
        assert!(matches!(
            create_event(&store, &root, req).await,
            Err(AppError::BadRequest(_))
        ));

        req = new_event(&root.id, "Mixer", "2026-01-14");
        req.duration = -1.0;
        assert!(matches!(
            create_event(&store, &root, req).await,
            Err(AppError::BadRequest(_))
        ));
    }

    #[tokio::test]
    async fn invalid_patch_writes_nothing() {
        let store = MemoryStore::new();
        let root = admin(&store).await;
        let (event, _) = create_event(&store, &root, new_event(&root.id, "Mixer", "2026-01-14"))
            .await
            .unwrap();

        let req = EventUpdateRequest {
            title: Some("Renamed".into()),
            capacity: Some(-3),
            ..Default::default()
        };
        assert!(matches!(
            update_event(&store, &root, &event.id, req).await,
            Err(AppError::BadRequest(_))
        ));
        let (stored, _) = store.event(&event.id).await.unwrap().unwrap();
        assert_eq!(stored.title, "Mixer");
    }

    #[tokio::test]
    async fn other_clubs_cannot_edit_an_event() {
        let store = MemoryStore::new();
        let root = admin(&store).await;
        let owner = register_club(&store, signup("a@b.edu", "Owner")).await.unwrap();
        let other = register_club(&store, signup("c@d.edu", "Other")).await.unwrap();
        for id in [&owner.id, &other.id] {
            let approve = StatusUpdateRequest {
                is_verified: true,
                rejection_reason: None,
            };
            set_verification(&store, &root, id, approve).await.unwrap();
        }
        let other = store.club(&other.id).await.unwrap().unwrap();
        let (event, _) = create_event(&store, &root, new_event(&owner.id, "Mixer", "2026-01-14"))
            .await
            .unwrap();

        let req = EventUpdateRequest {
            title: Some("Hijacked".into()),
            ..Default::default()
        };
        assert!(matches!(
            update_event(&store, &other, &event.id, req).await,
            Err(AppError::Forbidden(_))
        ));
    }

    #[tokio::test]
    async fn likes_for_unknown_events_are_not_found() {
        let store = MemoryStore::new();
        assert!(matches!(
            toggle_like(&store, "missing", true).await,
            Err(AppError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn contacts_are_windowed_and_admin_only() {
        let store = MemoryStore::new();
        let root = admin(&store).await;
        let club = register_club(&store, signup("a@b.edu", "Test Club")).await.unwrap();
        submit_contact(
            &store,
            ContactRequest {
                email: "visitor@uni.edu".into(),
                message: "How do I join?".into(),
            },
        )
        .await
        .unwrap();

        assert_eq!(recent_contacts(&store, &root, 7).await.unwrap().len(), 1);
        assert!(matches!(
            recent_contacts(&store, &club, 7).await,
            Err(AppError::Forbidden(_))
        ));
    }

    #[tokio::test]
    async fn contacts_outside_the_window_are_left_out() {
        let store = MemoryStore::new();
        let root = admin(&store).await;
        let now = Utc::now().naive_utc();
        for (id, age) in [
            ("stale", Duration::days(8)),
            ("yesterday", Duration::days(1)),
            ("fresh", Duration::hours(2)),
        ] {
            store
                .insert_contact(Contact {
                    id: id.into(),
                    email: "visitor@uni.edu".into(),
                    message: format!("sent {id}"),
                    date: now - age,
                })
                .await
                .unwrap();
        }

        let ids: Vec<_> = recent_contacts(&store, &root, 7)
            .await
            .unwrap()
            .into_iter()
            .map(|c| c.id)
            .collect();
        assert_eq!(ids, vec!["fresh", "yesterday"]);
    }

    #[test]
    fn create_request_accepts_frontend_names() {
        let req: EventCreateRequest = serde_json::from_value(serde_json::json!({
            "title": "Mixer",
            "description": "All welcome",
            "clubId": "c1",
            "date": "2026-01-14",
            "startTime": "18:00",
            "endTime": "20:00",
            "duration": 2,
            "locationType": "off-campus",
            "location": "Downtown",
            "isRegistrationRequired": true,
            "registrationLink": "https://forms.example/mixer"
        }))
        .unwrap();
        assert_eq!(req.club_id, "c1");
        assert!(req.is_registration_open);
        assert!(req.tags.is_empty());
        assert_eq!(req.capacity, None);
    }
}
