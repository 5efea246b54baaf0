use std::sync::Arc;

use tracing::warn;

use roomie_core::auth::Caller;
use roomie_core::domain::room::{Room, RoomFilters, RoomId, Selector, SelectorFields};
use roomie_core::errors::IntentError;
use roomie_db::RoomStore;

use crate::intent::TargetSlots;

/// Decides which room an edit or delete applies to before anything is mutated.
///
/// - An explicit id passes through; the store answers `NotFound` or `Forbidden`.
/// - A field selector needs a location or a rent, and is matched only against active rooms
///   the caller may modify. One match becomes `Selector::Id` and several are ambiguous.
///   With no match of its own, the selector is still ambiguous if it hits two or more active
///   rooms of other owners; otherwise it passes through for the store to report.
#[derive(Clone)]
pub struct TargetGuard {
    store: Arc<dyn RoomStore>,
}

impl TargetGuard {
    pub fn new(store: Arc<dyn RoomStore>) -> Self {
        Self { store }
    }

    pub async fn check(&self, target: TargetSlots, caller: &Caller) -> Result<Selector, IntentError> {
        self.check_selector(target.into_selector(), caller).await
    }

    pub async fn check_selector(
        &self,
        selector: Selector,
        caller: &Caller,
    ) -> Result<Selector, IntentError> {
        let fields = match selector {
            Selector::Id(id) => return Ok(Selector::Id(id)),
            Selector::Match(fields) => fields,
        };

        let modifiable = match self.modifiable_rooms(caller).await {
            Some(rooms) => rooms,
            None if fields.is_distinguishing() => return Ok(Selector::Match(fields)),
            None => return Err(IntentError::AmbiguousTarget { candidates: Vec::new() }),
        };

        if !fields.is_distinguishing() {
            return Err(IntentError::AmbiguousTarget { candidates: ids(&modifiable) });
        }

        let matching: Vec<Room> =
            modifiable.into_iter().filter(|room| fields.matches(room)).collect();
        if matching.is_empty() {
            return if self.active_matches(&fields, caller).await > 1 {
                Err(IntentError::AmbiguousTarget { candidates: Vec::new() })
            } else {
                Ok(Selector::Match(fields))
            };
        }
        match matching.as_slice() {
            [only] => Ok(Selector::Id(only.id)),
            _ => Err(IntentError::AmbiguousTarget { candidates: ids(&matching) }),
        }
    }

    /// Active rooms of any owner the selector matches. Their ids are never shown.
    async fn active_matches(&self, fields: &SelectorFields, caller: &Caller) -> usize {
        let filters = RoomFilters { location: fields.location.clone(), ..RoomFilters::default() };
        match self.store.find(&filters).await {
            Ok(rooms) => rooms.iter().filter(|room| fields.matches(room)).count(),
            Err(error) => {
                warn!(
                    event_name = "agent.guard.lookup_failed",
                    caller = %caller.identity,
                    error = %error,
                    "could not count matching rooms"
                );
                0
            }
        }
    }

    async fn modifiable_rooms(&self, caller: &Caller) -> Option<Vec<Room>> {
        let filters = RoomFilters {
            owner_identity: (!caller.operator).then(|| caller.identity.clone()),
            ..RoomFilters::default()
        };
        match self.store.find(&filters).await {
            Ok(rooms) => Some(
                rooms.into_iter().filter(|room| caller.can_modify(&room.owner_identity)).collect(),
            ),
            Err(error) => {
                warn!(
                    event_name = "agent.guard.lookup_failed",
                    caller = %caller.identity,
                    error = %error,
                    "could not list modifiable rooms"
                );
                None
            }
        }
    }
}

fn ids(rooms: &[Room]) -> Vec<RoomId> {
    let mut ids: Vec<RoomId> = rooms.iter().map(|room| room.id).collect();
    ids.sort();
    ids
}
