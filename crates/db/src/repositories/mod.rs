use async_trait::async_trait;
use thiserror::Error;

use roomie_core::auth::Caller;
use roomie_core::domain::room::{Room, RoomDraft, RoomFilters, RoomId, RoomPatch, Selector};
use roomie_core::errors::{DomainError, StoreError};

pub mod memory;
pub mod room;

pub use memory::InMemoryRoomStore;
pub use room::SqlRoomStore;

#[derive(Debug, Error)]
pub enum RepositoryError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
    #[error("decode error: {0}")]
    Decode(String),
}

impl From<RepositoryError> for StoreError {
    fn from(error: RepositoryError) -> Self {
        StoreError::Unavailable(error.to_string())
    }
}

/// Persistent collection of room listings. Each operation is atomic per record; mutations are
/// serialized store-wide while finds may run concurrently.
#[async_trait]
pub trait RoomStore: Send + Sync {
    /// Active rooms matching every filter, newest first, truncated to `filters.limit`.
    async fn find(&self, filters: &RoomFilters) -> Result<Vec<Room>, StoreError>;

    async fn add(&self, draft: RoomDraft, owner: &Caller) -> Result<Room, StoreError>;

    async fn edit(
        &self,
        selector: &Selector,
        patch: &RoomPatch,
        caller: &Caller,
    ) -> Result<Room, StoreError>;

    /// Tombstones the selected room. A second delete of the same room answers `NotFound`.
    async fn delete(&self, selector: &Selector, caller: &Caller) -> Result<RoomId, StoreError>;

    /// Active room by id.
    async fn get(&self, id: RoomId) -> Result<Option<Room>, StoreError>;

    async fn ping(&self) -> Result<(), StoreError>;
}

/// Picks the single active room `selector` names and checks that `caller` may modify it.
///
/// Ownership is checked before anything about the requested change, so a non-owner always
/// sees `Forbidden`.
pub(crate) fn select_target<'a, I>(
    rooms: I,
    selector: &Selector,
    caller: &Caller,
) -> Result<&'a Room, StoreError>
where
    I: IntoIterator<Item = &'a Room>,
{
    let mut matches = rooms.into_iter().filter(|room| {
        room.is_active()
            && match selector {
                Selector::Id(id) => room.id == *id,
                Selector::Match(fields) => fields.matches(room),
            }
    });

    let target = matches.next().ok_or_else(|| not_found(selector))?;
    let extra = matches.count();
    if extra > 0 {
        return Err(StoreError::Ambiguous { count: extra + 1 });
    }

    if !caller.can_modify(&target.owner_identity) {
        return Err(StoreError::Forbidden { id: target.id });
    }
    Ok(target)
}

pub(crate) fn not_found(selector: &Selector) -> StoreError {
    StoreError::NotFound { selector: selector.to_string() }
}

pub(crate) fn ensure_patch_has_fields(patch: &RoomPatch) -> Result<(), StoreError> {
    if patch.is_empty() {
        return Err(StoreError::Invalid(DomainError::InvariantViolation(
            "edit must change at least one field".to_string(),
        )));
    }
    Ok(())
}
