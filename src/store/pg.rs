use super::{ClubFilter, SlugKind, Store, StoreError, StoreResult};
use crate::{
    models::{Club, Contact, Event, EventWithOwner},
    patch::{ClubChange, EventPatch, Patch},
    schema::{contacts, events, users},
};
use async_trait::async_trait;
use chrono::{NaiveDate, NaiveDateTime};
use diesel::{
    pg::Pg,
    prelude::*,
    result::{DatabaseErrorKind, Error as DieselError},
    sql_types::Integer,
};
use diesel_async::{
    pooled_connection::{deadpool::Pool, AsyncDieselConnectionManager},
    scoped_futures::ScopedFutureExt,
    AsyncConnection, AsyncPgConnection, RunQueryDsl,
};
use std::fmt::Display;

pub type DbPool = Pool<AsyncPgConnection>;

pub fn connect_to_db(db_url: &str) -> anyhow::Result<DbPool> {
    let db_config = AsyncDieselConnectionManager::<AsyncPgConnection>::new(db_url);
    Pool::builder(db_config)
        .build()
        .map_err(|e| anyhow::anyhow!("failed to build database pool: {e}"))
}

diesel::sql_function!(fn greatest(a: Integer, b: Integer) -> Integer);

fn pool_error(e: impl Display) -> StoreError {
    StoreError::Pool(e.to_string())
}

fn into_store_error(e: DieselError) -> StoreError {
    match e {
        DieselError::DatabaseError(DatabaseErrorKind::UniqueViolation, info) => {
            StoreError::Conflict(match info.constraint_name() {
                Some("users_email_key") => "Email already registered".to_string(),
                Some(name) if name.ends_with("slug_key") => "slug already in use".to_string(),
                _ => "value already in use".to_string(),
            })
        }
        other => StoreError::Database(other),
    }
}

/// `%` and `_` in user input match themselves.
fn like_pattern(search: &str) -> String {
    let escaped = search
        .replace('\\', "\\\\")
        .replace('%', "\\%")
        .replace('_', "\\_");
    format!("%{escaped}%")
}

pub struct PgStore {
    pool: DbPool,
}

impl PgStore {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl Store for PgStore {
    async fn insert_club(&self, club: Club) -> StoreResult<Club> {
        let mut conn = self.pool.get().await.map_err(pool_error)?;

        diesel::insert_into(users::table)
            .values(&club)
            .on_conflict(users::email)
            .do_nothing()
            .get_result::<Club>(&mut *conn)
            .await
            .optional()
            .map_err(into_store_error)?
            .ok_or_else(|| StoreError::Conflict("Email already registered".into()))
    }

    async fn club(&self, id: &str) -> StoreResult<Option<Club>> {
        let mut conn = self.pool.get().await.map_err(pool_error)?;

        Ok(users::table
            .find(id)
            .first::<Club>(&mut *conn)
            .await
            .optional()?)
    }

    async fn club_by_email(&self, email: &str) -> StoreResult<Option<Club>> {
        let mut conn = self.pool.get().await.map_err(pool_error)?;

        Ok(users::table
            .filter(users::email.eq(email))
            .first::<Club>(&mut *conn)
            .await
            .optional()?)
    }

    async fn clubs(&self, filter: &ClubFilter) -> StoreResult<Vec<Club>> {
        let mut conn = self.pool.get().await.map_err(pool_error)?;

        let mut query: users::BoxedQuery<'_, Pg> = users::table.into_boxed();
        if let Some(role) = filter.role {
            query = query.filter(users::role.eq(role.as_str()));
        }
        if let Some(verified) = filter.verified {
            query = query.filter(users::is_verified.eq(verified));
        }
        if let Some(search) = &filter.search {
            let pattern = like_pattern(search);
            query = query.filter(
                users::club_name
                    .ilike(pattern.clone())
                    .or(users::description.ilike(pattern)),
            );
        }

        Ok(query
            .order(users::club_name.asc())
            .load::<Club>(&mut *conn)
            .await?)
    }

    async fn update_club(&self, id: &str, change: ClubChange) -> StoreResult<Option<Club>> {
        let mut pooled = self.pool.get().await.map_err(pool_error)?;
        let conn: &mut AsyncPgConnection = &mut pooled;
        let id = id.to_string();

        conn.transaction::<_, DieselError, _>(|conn| {
            async move {
                let Some(mut club) = users::table
                    .find(&id)
                    .for_update()
                    .first::<Club>(conn)
                    .await
                    .optional()?
                else {
                    return Ok(None);
                };

                change.apply(&mut club);

                let club = diesel::update(users::table.find(&id))
                    .set(&club)
                    .get_result::<Club>(conn)
                    .await?;
                Ok(Some(club))
            }
            .scope_boxed()
        })
        .await
        .map_err(into_store_error)
    }

    async fn slug_taken(&self, kind: SlugKind, slug: &str) -> StoreResult<bool> {
        let mut conn = self.pool.get().await.map_err(pool_error)?;

        let count: i64 = match kind {
            SlugKind::Club => {
                users::table
                    .filter(users::slug.eq(slug))
                    .count()
                    .get_result(&mut *conn)
                    .await?
            }
            SlugKind::Event => {
                events::table
                    .filter(events::slug.eq(slug))
                    .count()
                    .get_result(&mut *conn)
                    .await?
            }
        };
        Ok(count > 0)
    }

    async fn insert_event(&self, event: Event) -> StoreResult<Event> {
        let mut conn = self.pool.get().await.map_err(pool_error)?;

        diesel::insert_into(events::table)
            .values(&event)
            .get_result::<Event>(&mut *conn)
            .await
            .map_err(into_store_error)
    }

    async fn event(&self, id: &str) -> StoreResult<Option<EventWithOwner>> {
        let mut conn = self.pool.get().await.map_err(pool_error)?;

        Ok(events::table
            .left_join(users::table)
            .filter(events::id.eq(id))
            .first::<(Event, Option<Club>)>(&mut *conn)
            .await
            .optional()?)
    }

    async fn events_between(
        &self,
        start: NaiveDate,
        end: NaiveDate,
    ) -> StoreResult<Vec<EventWithOwner>> {
        let mut conn = self.pool.get().await.map_err(pool_error)?;

        Ok(events::table
            .left_join(users::table)
            .filter(events::date.ge(start).and(events::date.lt(end)))
            .order((events::date.asc(), events::start_time.asc()))
            .load::<(Event, Option<Club>)>(&mut *conn)
            .await?)
    }

    async fn events_for_club(&self, club_id: &str) -> StoreResult<Vec<EventWithOwner>> {
        let mut conn = self.pool.get().await.map_err(pool_error)?;

        Ok(events::table
            .left_join(users::table)
            .filter(events::club_id.eq(club_id))
            .order((events::date.asc(), events::start_time.asc()))
            .load::<(Event, Option<Club>)>(&mut *conn)
            .await?)
    }

    async fn update_event(
        &self,
        id: &str,
        patch: EventPatch,
    ) -> StoreResult<Option<EventWithOwner>> {
        let mut pooled = self.pool.get().await.map_err(pool_error)?;
        let conn: &mut AsyncPgConnection = &mut pooled;
        let id = id.to_string();

        conn.transaction::<_, DieselError, _>(|conn| {
            async move {
                let Some(mut event) = events::table
                    .find(&id)
                    .for_update()
                    .first::<Event>(conn)
                    .await
                    .optional()?
                else {
                    return Ok(None);
                };

                patch.apply(&mut event);

                let event = diesel::update(events::table.find(&id))
                    .set(&event)
                    .get_result::<Event>(conn)
                    .await?;
                let owner = users::table
                    .find(&event.club_id)
                    .first::<Club>(conn)
                    .await
                    .optional()?;
                Ok(Some((event, owner)))
            }
            .scope_boxed()
        })
        .await
        .map_err(into_store_error)
    }

    async fn adjust_likes(&self, id: &str, delta: i32) -> StoreResult<Option<i32>> {
        let mut conn = self.pool.get().await.map_err(pool_error)?;

        // relative update, so concurrent likes cannot overwrite each other
        Ok(diesel::update(events::table.find(id))
            .set(events::likes.eq(greatest(events::likes + delta, 0)))
            .returning(events::likes)
            .get_result::<i32>(&mut *conn)
            .await
            .optional()?)
    }

    async fn insert_contact(&self, contact: Contact) -> StoreResult<Contact> {
        let mut conn = self.pool.get().await.map_err(pool_error)?;

        diesel::insert_into(contacts::table)
            .values(&contact)
            .execute(&mut *conn)
            .await?;
        Ok(contact)
    }

    async fn contacts_since(&self, since: NaiveDateTime) -> StoreResult<Vec<Contact>> {
        let mut conn = self.pool.get().await.map_err(pool_error)?;

        Ok(contacts::table
            .filter(contacts::date.ge(since))
            .order(contacts::date.desc())
            .load::<Contact>(&mut *conn)
            .await?)
    }
}
