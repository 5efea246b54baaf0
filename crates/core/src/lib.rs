pub mod audit;
pub mod auth;
pub mod config;
pub mod domain;
pub mod errors;
pub mod normalize;

pub use auth::{AuthCredential, AuthGate, Caller};
pub use domain::room::{
    GenderPreference, Room, RoomDraft, RoomFilters, RoomId, RoomPatch, RoomStatus, Selector,
    SelectorFields,
};
pub use errors::{AuthError, DomainError, IntentError, StoreError, ToolError};
