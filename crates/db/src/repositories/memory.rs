use std::collections::BTreeMap;

use chrono::Utc;
use tokio::sync::RwLock;

use roomie_core::auth::Caller;
use roomie_core::domain::room::{
    order_for_listing, Room, RoomDraft, RoomFilters, RoomId, RoomPatch, Selector,
};
use roomie_core::errors::StoreError;

use super::{ensure_patch_has_fields, select_target, RoomStore};

/// Rooms keyed by id. `next_id` only grows, so tombstoned ids are never handed out again.
#[derive(Default)]
struct RoomArena {
    rooms: BTreeMap<RoomId, Room>,
    next_id: u64,
}

pub struct InMemoryRoomStore {
    arena: RwLock<RoomArena>,
    ttl_days: i64,
}

impl Default for InMemoryRoomStore {
    fn default() -> Self {
        Self::new(30)
    }
}

impl InMemoryRoomStore {
    pub fn new(ttl_days: i64) -> Self {
        Self { arena: RwLock::new(RoomArena::default()), ttl_days }
    }

    /// Every room ever stored, tombstones included.
    pub async fn len_including_deleted(&self) -> usize {
        self.arena.read().await.rooms.len()
    }
}

#[async_trait::async_trait]
impl RoomStore for InMemoryRoomStore {
    async fn find(&self, filters: &RoomFilters) -> Result<Vec<Room>, StoreError> {
        let arena = self.arena.read().await;
        let mut rooms: Vec<Room> =
            arena.rooms.values().filter(|room| filters.matches(room)).cloned().collect();
        order_for_listing(&mut rooms, filters.limit);
        Ok(rooms)
    }

    async fn add(&self, draft: RoomDraft, owner: &Caller) -> Result<Room, StoreError> {
        draft.validate()?;

        let mut arena = self.arena.write().await;
        let id = RoomId(arena.next_id + 1);
        let room = Room::create(id, draft, owner.identity.clone(), Utc::now(), self.ttl_days)?;
        arena.next_id = id.0;
        arena.rooms.insert(id, room.clone());
        Ok(room)
    }

    async fn edit(
        &self,
        selector: &Selector,
        patch: &RoomPatch,
        caller: &Caller,
    ) -> Result<Room, StoreError> {
        let mut arena = self.arena.write().await;
        let id = select_target(arena.rooms.values(), selector, caller)?.id;
        ensure_patch_has_fields(patch)?;

        let Some(room) = arena.rooms.get_mut(&id) else {
            return Err(super::not_found(selector));
        };
        // Apply to a copy so a rejected patch leaves the stored room untouched.
        let mut updated = room.clone();
        updated.apply(patch, Utc::now())?;
        *room = updated.clone();
        Ok(updated)
    }

    async fn delete(&self, selector: &Selector, caller: &Caller) -> Result<RoomId, StoreError> {
        let mut arena = self.arena.write().await;
        let id = select_target(arena.rooms.values(), selector, caller)?.id;

        match arena.rooms.get_mut(&id) {
            Some(room) => {
                room.tombstone(Utc::now());
                Ok(id)
            }
            None => Err(super::not_found(selector)),
        }
    }

    async fn get(&self, id: RoomId) -> Result<Option<Room>, StoreError> {
        let arena = self.arena.read().await;
        Ok(arena.rooms.get(&id).filter(|room| room.is_active()).cloned())
    }

    async fn ping(&self) -> Result<(), StoreError> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use rust_decimal::Decimal;

    use roomie_core::auth::Caller;
    use roomie_core::domain::room::{RoomDraft, RoomFilters, RoomId, RoomPatch, Selector};
    use roomie_core::errors::StoreError;

    use crate::repositories::{InMemoryRoomStore, RoomStore};

    #[tokio::test]
    async fn ids_are_monotonic_and_never_reused() {
        let store = InMemoryRoomStore::default();
        let owner = Caller::new("alice");

        let first = store.add(RoomDraft::new("HSR Layout", Decimal::from(9_000)), &owner).await;
        let first = first.expect("add first");
        store.delete(&Selector::Id(first.id), &owner).await.expect("delete first");
        let second = store
            .add(RoomDraft::new("BTM Layout", Decimal::from(8_000)), &owner)
            .await
            .expect("add second");

        assert_eq!(first.id, RoomId(1));
        assert_eq!(second.id, RoomId(2));
        assert_eq!(store.len_including_deleted().await, 2);
        assert_eq!(store.get(first.id).await.expect("get"), None);
    }

    #[tokio::test]
    async fn rejected_patch_leaves_room_unchanged() {
        let store = InMemoryRoomStore::default();
        let owner = Caller::new("alice");
        let room = store
            .add(RoomDraft::new("Koramangala", Decimal::from(12_000)), &owner)
            .await
            .expect("add");

        let patch = RoomPatch { rent_amount: Some(Decimal::from(-5)), ..RoomPatch::default() };
        let error = store.edit(&Selector::Id(room.id), &patch, &owner).await.expect_err("negative");
        assert!(matches!(error, StoreError::Invalid(_)));

        let stored = store.get(room.id).await.expect("get").expect("still active");
        assert_eq!(stored.rent_amount, Decimal::from(12_000));
    }

    #[tokio::test]
    async fn invalid_draft_does_not_consume_an_id() {
        let store = InMemoryRoomStore::default();
        let owner = Caller::new("alice");

        let rejected = store.add(RoomDraft::new("  ", Decimal::from(5_000)), &owner).await;
        assert!(matches!(rejected, Err(StoreError::Invalid(_))));

        let room = store
            .add(RoomDraft::new("Powai", Decimal::from(20_000)), &owner)
            .await
            .expect("add");
        assert_eq!(room.id, RoomId(1));
        assert_eq!(store.find(&RoomFilters::default()).await.expect("find").len(), 1);
    }
}
