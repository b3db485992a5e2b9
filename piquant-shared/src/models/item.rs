/// Item model and database operations
///
/// Items are the rated content records: descriptive fields, one image, one
/// owner, and the vote bookkeeping (two membership sets plus their derived
/// counters, persisted denormalized for cheap reads).
///
/// # Schema
///
/// ```sql
/// CREATE TABLE items (
///     id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
///     owner_id UUID NOT NULL REFERENCES users(id),
///     name VARCHAR(255) NOT NULL,
///     manufacturer VARCHAR(255) NOT NULL,
///     description TEXT NOT NULL,
///     main_category VARCHAR(100) NOT NULL,
///     heat_level INTEGER NOT NULL,
///     image_url VARCHAR(512) NOT NULL,
///     likes INTEGER NOT NULL DEFAULT 0,
///     dislikes INTEGER NOT NULL DEFAULT 0,
///     users_liked UUID[] NOT NULL DEFAULT '{}',
///     users_disliked UUID[] NOT NULL DEFAULT '{}',
///     created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
///     updated_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
/// );
/// ```
///
/// # Concurrency
///
/// Vote transitions are the one read-modify-write in the system and run as a
/// transaction holding a `FOR UPDATE` row lock, so two concurrent votes on
/// the same item serialize instead of overwriting each other.
///
/// Owner-gated writes (`update_owned`, `delete_owned`) assert ownership in
/// the same statement that mutates (`WHERE id = $1 AND owner_id = $2`);
/// since owners are immutable there is no check-then-write window.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use uuid::Uuid;

use crate::auth::ownership::Owned;
use crate::vote::{self, VoteAction, VoteTally};

/// Columns selected whenever a full item row is fetched
const ITEM_COLUMNS: &str = "id, owner_id, name, manufacturer, description, main_category, \
                            heat_level, image_url, likes, dislikes, users_liked, \
                            users_disliked, created_at, updated_at";

/// Item record
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Item {
    /// Unique item id
    pub id: Uuid,

    /// Id of the creating user; immutable, gates update and delete
    pub owner_id: Uuid,

    /// Display name
    pub name: String,

    /// Producing manufacturer
    pub manufacturer: String,

    /// Free-form description
    pub description: String,

    /// Primary category label
    pub main_category: String,

    /// Perceived heat, 0 (mild) to 10 (volcanic)
    pub heat_level: i32,

    /// Public URL of the backing image file; derived, never client-supplied
    pub image_url: String,

    /// Like counter, always `users_liked.len()`
    pub likes: i32,

    /// Dislike counter, always `users_disliked.len()`
    pub dislikes: i32,

    /// Users currently holding a like
    pub users_liked: Vec<Uuid>,

    /// Users currently holding a dislike
    pub users_disliked: Vec<Uuid>,

    /// When the item was created
    pub created_at: DateTime<Utc>,

    /// When the item was last updated
    pub updated_at: DateTime<Utc>,
}

/// Input for creating a new item
///
/// Votes start empty; `owner_id` and `image_url` are filled in by the
/// server, never taken from the request body.
#[derive(Debug, Clone)]
pub struct CreateItem {
    /// Owning user (the authenticated creator)
    pub owner_id: Uuid,

    /// Display name
    pub name: String,

    /// Producing manufacturer
    pub manufacturer: String,

    /// Free-form description
    pub description: String,

    /// Primary category label
    pub main_category: String,

    /// Perceived heat
    pub heat_level: i32,

    /// Public URL of the already-stored image file
    pub image_url: String,
}

/// Input for updating an item's descriptive fields
///
/// Only non-`None` fields are written. Vote state and ownership are not
/// updatable through this path.
#[derive(Debug, Clone, Default)]
pub struct UpdateItem {
    /// New display name
    pub name: Option<String>,

    /// New manufacturer
    pub manufacturer: Option<String>,

    /// New description
    pub description: Option<String>,

    /// New category
    pub main_category: Option<String>,

    /// New heat level
    pub heat_level: Option<i32>,

    /// New image URL (set when the request replaced the image)
    pub image_url: Option<String>,
}

impl Owned for Item {
    fn owner_id(&self) -> Uuid {
        self.owner_id
    }
}

impl Item {
    /// The item's current vote state as a pure tally
    pub fn vote_tally(&self) -> VoteTally {
        VoteTally::new(self.users_liked.clone(), self.users_disliked.clone())
    }

    /// Creates a new item with empty vote state
    pub async fn create(pool: &PgPool, data: CreateItem) -> Result<Self, sqlx::Error> {
        let item = sqlx::query_as::<_, Item>(&format!(
            r#"
            INSERT INTO items (owner_id, name, manufacturer, description, main_category,
                               heat_level, image_url)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            RETURNING {ITEM_COLUMNS}
            "#
        ))
        .bind(data.owner_id)
        .bind(data.name)
        .bind(data.manufacturer)
        .bind(data.description)
        .bind(data.main_category)
        .bind(data.heat_level)
        .bind(data.image_url)
        .fetch_one(pool)
        .await?;

        Ok(item)
    }

    /// Finds an item by id
    pub async fn find_by_id(pool: &PgPool, id: Uuid) -> Result<Option<Self>, sqlx::Error> {
        let item = sqlx::query_as::<_, Item>(&format!(
            "SELECT {ITEM_COLUMNS} FROM items WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(pool)
        .await?;

        Ok(item)
    }

    /// Lists all items, newest first
    pub async fn list(pool: &PgPool) -> Result<Vec<Self>, sqlx::Error> {
        let items = sqlx::query_as::<_, Item>(&format!(
            "SELECT {ITEM_COLUMNS} FROM items ORDER BY created_at DESC"
        ))
        .fetch_all(pool)
        .await?;

        Ok(items)
    }

    /// Updates an item's descriptive fields, asserting ownership in the write
    ///
    /// The `owner_id` predicate makes the statement a no-op for anyone but
    /// the owner, so the ownership check and the mutation cannot race.
    ///
    /// # Returns
    ///
    /// The updated item, or `None` when no row matched — the item is gone or
    /// owned by someone else. Callers that already verified ownership can
    /// treat `None` as not-found.
    pub async fn update_owned(
        pool: &PgPool,
        id: Uuid,
        owner_id: Uuid,
        data: UpdateItem,
    ) -> Result<Option<Self>, sqlx::Error> {
        let item = sqlx::query_as::<_, Item>(&format!(
            r#"
            UPDATE items
            SET name          = COALESCE($3, name),
                manufacturer  = COALESCE($4, manufacturer),
                description   = COALESCE($5, description),
                main_category = COALESCE($6, main_category),
                heat_level    = COALESCE($7, heat_level),
                image_url     = COALESCE($8, image_url),
                updated_at    = NOW()
            WHERE id = $1 AND owner_id = $2
            RETURNING {ITEM_COLUMNS}
            "#
        ))
        .bind(id)
        .bind(owner_id)
        .bind(data.name)
        .bind(data.manufacturer)
        .bind(data.description)
        .bind(data.main_category)
        .bind(data.heat_level)
        .bind(data.image_url)
        .fetch_optional(pool)
        .await?;

        Ok(item)
    }

    /// Deletes an item, asserting ownership in the delete
    ///
    /// # Returns
    ///
    /// `true` if a row was deleted. The caller is responsible for retiring
    /// the backing image file afterwards (best-effort).
    pub async fn delete_owned(
        pool: &PgPool,
        id: Uuid,
        owner_id: Uuid,
    ) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("DELETE FROM items WHERE id = $1 AND owner_id = $2")
            .bind(id)
            .bind(owner_id)
            .execute(pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    /// Applies one vote action as an atomic read-modify-write
    ///
    /// Locks the row (`FOR UPDATE`), runs the pure vote state machine on the
    /// current membership sets, and writes the new sets and counters back
    /// before committing. Concurrent votes on the same item serialize on the
    /// row lock, so none are lost.
    ///
    /// # Returns
    ///
    /// The item after the transition, or `None` for an unknown id.
    pub async fn apply_vote(
        pool: &PgPool,
        id: Uuid,
        voter_id: Uuid,
        action: VoteAction,
    ) -> Result<Option<Self>, sqlx::Error> {
        let mut tx = pool.begin().await?;

        let item = sqlx::query_as::<_, Item>(&format!(
            "SELECT {ITEM_COLUMNS} FROM items WHERE id = $1 FOR UPDATE"
        ))
        .bind(id)
        .fetch_optional(&mut *tx)
        .await?;

        let Some(item) = item else {
            tx.rollback().await?;
            return Ok(None);
        };

        let tally = vote::apply(item.vote_tally(), voter_id, action);

        let updated = sqlx::query_as::<_, Item>(&format!(
            r#"
            UPDATE items
            SET likes = $2, dislikes = $3, users_liked = $4, users_disliked = $5,
                updated_at = NOW()
            WHERE id = $1
            RETURNING {ITEM_COLUMNS}
            "#
        ))
        .bind(id)
        .bind(tally.likes())
        .bind(tally.dislikes())
        .bind(&tally.users_liked)
        .bind(&tally.users_disliked)
        .fetch_one(&mut *tx)
        .await?;

        tx.commit().await?;

        Ok(Some(updated))
    }
}
