use std::collections::BTreeSet;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::Row;
use tokio::sync::Mutex;

use roomie_core::auth::Caller;
use roomie_core::domain::room::{
    order_for_listing, GenderPreference, Room, RoomDraft, RoomFilters, RoomId, RoomPatch,
    RoomStatus, Selector,
};
use roomie_core::errors::StoreError;

use super::{ensure_patch_has_fields, not_found, select_target, RepositoryError, RoomStore};
use crate::DbPool;

const ROOM_COLUMNS: &str = "id, location, rent_amount, amenities, description, contact,
    gender_pref, spots_available, owner_identity, status, created_at, updated_at, expires_at";

pub struct SqlRoomStore {
    pool: DbPool,
    ttl_days: i64,
    // SQLite allows one writer; holding this keeps select-then-update atomic across tasks.
    mutation_lock: Mutex<()>,
}

impl SqlRoomStore {
    pub fn new(pool: DbPool, ttl_days: i64) -> Self {
        Self { pool, ttl_days, mutation_lock: Mutex::new(()) }
    }

    pub fn pool(&self) -> &DbPool {
        &self.pool
    }
}

fn unavailable(error: sqlx::Error) -> StoreError {
    StoreError::from(RepositoryError::Database(error))
}

fn decode_error(column: &str, error: impl std::fmt::Display) -> RepositoryError {
    RepositoryError::Decode(format!("{column}: {error}"))
}

fn parse_timestamp(column: &str, value: &str) -> Result<DateTime<Utc>, RepositoryError> {
    DateTime::parse_from_rfc3339(value)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|error| decode_error(column, error))
}

fn row_to_room(row: &sqlx::sqlite::SqliteRow) -> Result<Room, RepositoryError> {
    let id: i64 = row.try_get("id")?;
    let location: String = row.try_get("location")?;
    let rent_amount: String = row.try_get("rent_amount")?;
    let amenities: String = row.try_get("amenities")?;
    let description: Option<String> = row.try_get("description")?;
    let contact: Option<String> = row.try_get("contact")?;
    let gender_pref: String = row.try_get("gender_pref")?;
    let spots_available: Option<i64> = row.try_get("spots_available")?;
    let owner_identity: String = row.try_get("owner_identity")?;
    let status: String = row.try_get("status")?;
    let created_at: String = row.try_get("created_at")?;
    let updated_at: String = row.try_get("updated_at")?;
    let expires_at: String = row.try_get("expires_at")?;

    Ok(Room {
        id: RoomId(u64::try_from(id).map_err(|error| decode_error("id", error))?),
        location,
        rent_amount: Decimal::from_str(&rent_amount)
            .map_err(|error| decode_error("rent_amount", error))?,
        amenities: serde_json::from_str::<BTreeSet<String>>(&amenities)
            .map_err(|error| decode_error("amenities", error))?,
        description,
        contact,
        gender_pref: GenderPreference::from_str(&gender_pref)
            .map_err(|error| decode_error("gender_pref", error))?,
        spots_available: spots_available
            .map(u32::try_from)
            .transpose()
            .map_err(|error| decode_error("spots_available", error))?,
        owner_identity,
        status: RoomStatus::from_str(&status).map_err(|error| decode_error("status", error))?,
        created_at: parse_timestamp("created_at", &created_at)?,
        updated_at: parse_timestamp("updated_at", &updated_at)?,
        expires_at: parse_timestamp("expires_at", &expires_at)?,
    })
}

fn encode_amenities(amenities: &BTreeSet<String>) -> Result<String, StoreError> {
    serde_json::to_string(amenities)
        .map_err(|error| StoreError::from(decode_error("amenities", error)))
}

#[async_trait::async_trait]
impl RoomStore for SqlRoomStore {
    async fn find(&self, filters: &RoomFilters) -> Result<Vec<Room>, StoreError> {
        // Owner and status narrow in SQL; synonym-aware matching happens on the decoded rows.
        let rows = match &filters.owner_identity {
            Some(owner) => {
                sqlx::query(&format!(
                    "SELECT {ROOM_COLUMNS} FROM rooms WHERE status = 'active' AND owner_identity = ?"
                ))
                .bind(owner)
                .fetch_all(&self.pool)
                .await
            }
            None => {
                sqlx::query(&format!("SELECT {ROOM_COLUMNS} FROM rooms WHERE status = 'active'"))
                    .fetch_all(&self.pool)
                    .await
            }
        }
        .map_err(unavailable)?;

        let mut rooms = Vec::with_capacity(rows.len());
        for row in &rows {
            let room = row_to_room(row)?;
            if filters.matches(&room) {
                rooms.push(room);
            }
        }
        order_for_listing(&mut rooms, filters.limit);
        Ok(rooms)
    }

    async fn add(&self, draft: RoomDraft, owner: &Caller) -> Result<Room, StoreError> {
        // Built with a placeholder id; SQLite assigns the real one.
        let mut room =
            Room::create(RoomId(0), draft, owner.identity.clone(), Utc::now(), self.ttl_days)?;
        let amenities = encode_amenities(&room.amenities)?;

        let _guard = self.mutation_lock.lock().await;
        let result = sqlx::query(
            "INSERT INTO rooms (location, rent_amount, amenities, description, contact,
                                gender_pref, spots_available, owner_identity, status,
                                created_at, updated_at, expires_at)
             VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(&room.location)
        .bind(room.rent_amount.to_string())
        .bind(amenities)
        .bind(&room.description)
        .bind(&room.contact)
        .bind(room.gender_pref.as_str())
        .bind(room.spots_available.map(i64::from))
        .bind(&room.owner_identity)
        .bind(room.status.as_str())
        .bind(room.created_at.to_rfc3339())
        .bind(room.updated_at.to_rfc3339())
        .bind(room.expires_at.to_rfc3339())
        .execute(&self.pool)
        .await
        .map_err(unavailable)?;

        let id = u64::try_from(result.last_insert_rowid())
            .map_err(|error| StoreError::from(decode_error("id", error)))?;
        room.id = RoomId(id);
        tracing::debug!(event_name = "db.room.inserted", room_id = %room.id, "room inserted");
        Ok(room)
    }

    async fn edit(
        &self,
        selector: &Selector,
        patch: &RoomPatch,
        caller: &Caller,
    ) -> Result<Room, StoreError> {
        let _guard = self.mutation_lock.lock().await;
        let mut tx = self.pool.begin().await.map_err(unavailable)?;

        let candidates = load_candidates(&mut tx, selector).await?;
        let mut room = select_target(&candidates, selector, caller)?.clone();
        ensure_patch_has_fields(patch)?;
        room.apply(patch, Utc::now())?;
        let amenities = encode_amenities(&room.amenities)?;

        let result = sqlx::query(
            "UPDATE rooms
             SET location = ?, rent_amount = ?, amenities = ?, description = ?, contact = ?,
                 gender_pref = ?, spots_available = ?, updated_at = ?
             WHERE id = ? AND status = 'active'",
        )
        .bind(&room.location)
        .bind(room.rent_amount.to_string())
        .bind(amenities)
        .bind(&room.description)
        .bind(&room.contact)
        .bind(room.gender_pref.as_str())
        .bind(room.spots_available.map(i64::from))
        .bind(room.updated_at.to_rfc3339())
        .bind(room.id.0 as i64)
        .execute(&mut *tx)
        .await
        .map_err(unavailable)?;

        if result.rows_affected() == 0 {
            return Err(not_found(selector));
        }
        tx.commit().await.map_err(unavailable)?;
        Ok(room)
    }

    async fn delete(&self, selector: &Selector, caller: &Caller) -> Result<RoomId, StoreError> {
        let _guard = self.mutation_lock.lock().await;
        let mut tx = self.pool.begin().await.map_err(unavailable)?;

        let candidates = load_candidates(&mut tx, selector).await?;
        let id = select_target(&candidates, selector, caller)?.id;

        let result = sqlx::query(
            "UPDATE rooms SET status = 'deleted', updated_at = ?
             WHERE id = ? AND status = 'active'",
        )
        .bind(Utc::now().to_rfc3339())
        .bind(id.0 as i64)
        .execute(&mut *tx)
        .await
        .map_err(unavailable)?;

        if result.rows_affected() == 0 {
            return Err(not_found(selector));
        }
        tx.commit().await.map_err(unavailable)?;
        Ok(id)
    }

    async fn get(&self, id: RoomId) -> Result<Option<Room>, StoreError> {
        let row = sqlx::query(&format!(
            "SELECT {ROOM_COLUMNS} FROM rooms WHERE id = ? AND status = 'active'"
        ))
        .bind(id.0 as i64)
        .fetch_optional(&self.pool)
        .await
        .map_err(unavailable)?;

        match row {
            Some(ref r) => Ok(Some(row_to_room(r)?)),
            None => Ok(None),
        }
    }

    async fn ping(&self) -> Result<(), StoreError> {
        crate::connection::ping(&self.pool).await.map_err(unavailable)
    }
}

async fn load_candidates(
    tx: &mut sqlx::Transaction<'_, sqlx::Sqlite>,
    selector: &Selector,
) -> Result<Vec<Room>, StoreError> {
    let rows = match selector {
        Selector::Id(id) => {
            sqlx::query(&format!(
                "SELECT {ROOM_COLUMNS} FROM rooms WHERE id = ? AND status = 'active'"
            ))
            .bind(id.0 as i64)
            .fetch_all(&mut **tx)
            .await
        }
        Selector::Match(_) => {
            sqlx::query(&format!("SELECT {ROOM_COLUMNS} FROM rooms WHERE status = 'active'"))
                .fetch_all(&mut **tx)
                .await
        }
    }
    .map_err(unavailable)?;

    rows.iter().map(|row| row_to_room(row).map_err(StoreError::from)).collect()
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeSet;

    use rust_decimal::Decimal;

    use roomie_core::auth::Caller;
    use roomie_core::domain::room::{GenderPreference, RoomDraft, RoomFilters, RoomId, Selector};

    use crate::repositories::{RoomStore, SqlRoomStore};
    use crate::{connect_with_settings, migrations};

    async fn store() -> SqlRoomStore {
        let pool = connect_with_settings("sqlite::memory:", 1, 30).await.expect("connect");
        migrations::run_pending(&pool).await.expect("migrate");
        SqlRoomStore::new(pool, 30)
    }

    #[tokio::test]
    async fn rows_round_trip_every_column() {
        let store = store().await;
        let owner = Caller::new("+919800000001");
        let draft = RoomDraft {
            amenities: BTreeSet::from(["Wi-Fi".to_string(), "AC".to_string()]),
            description: Some("Near the metro".to_string()),
            contact: Some("9800000001".to_string()),
            gender_pref: GenderPreference::Female,
            spots_available: Some(2),
            ..RoomDraft::new("Indiranagar, Bengaluru", Decimal::new(1_850_050, 2))
        };

        let added = store.add(draft, &owner).await.expect("add");
        let loaded = store.get(added.id).await.expect("get").expect("active room");

        assert_eq!(added.id, RoomId(1));
        assert_eq!(loaded.rent_amount, Decimal::new(1_850_050, 2));
        assert_eq!(loaded.amenities, BTreeSet::from(["ac".to_string(), "wifi".to_string()]));
        assert_eq!(loaded.gender_pref, GenderPreference::Female);
        assert_eq!(loaded.spots_available, Some(2));
        assert_eq!(loaded.description.as_deref(), Some("Near the metro"));
    }

    #[tokio::test]
    async fn tombstoned_rows_are_hidden_and_ids_keep_growing() {
        let store = store().await;
        let owner = Caller::new("alice");

        let first = store
            .add(RoomDraft::new("Whitefield", Decimal::from(11_000)), &owner)
            .await
            .expect("add first");
        store.delete(&Selector::Id(first.id), &owner).await.expect("delete");
        let second = store
            .add(RoomDraft::new("Whitefield", Decimal::from(11_000)), &owner)
            .await
            .expect("add second");

        assert_eq!(second.id, RoomId(2));
        let found = store.find(&RoomFilters::default()).await.expect("find");
        assert_eq!(found.iter().map(|room| room.id).collect::<Vec<_>>(), vec![RoomId(2)]);
    }
}
