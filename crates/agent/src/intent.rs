use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tracing::{debug, warn};

use roomie_core::auth::Caller;
use roomie_core::config::{ListingsConfig, ResolverConfig};
use roomie_core::domain::room::{
    RoomDraft, RoomFilters, RoomId, RoomPatch, Selector, SelectorFields,
};
use roomie_core::errors::IntentError;
use roomie_db::RoomStore;

use crate::conversation::RuleBasedParser;
use crate::guardrails::TargetGuard;

/// A fully resolved request, ready for the store.
#[derive(Clone, Debug, PartialEq)]
pub enum StructuredRequest {
    FindRoom { filters: RoomFilters },
    AddRoom { fields: RoomDraft },
    EditRoom { target: Selector, fields: RoomPatch },
    DeleteRoom { target: Selector },
    Help,
    Unrecognized { text: String },
}

impl StructuredRequest {
    pub fn kind(&self) -> &'static str {
        match self {
            Self::FindRoom { .. } => "find_room",
            Self::AddRoom { .. } => "add_room",
            Self::EditRoom { .. } => "edit_room",
            Self::DeleteRoom { .. } => "delete_room",
            Self::Help => "help",
            Self::Unrecognized { .. } => "unrecognized",
        }
    }
}

/// What a message names as the room to change, before the guard has looked at the store.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct TargetSlots {
    pub room_id: Option<RoomId>,
    pub fields: SelectorFields,
}

impl TargetSlots {
    pub fn by_id(id: RoomId) -> Self {
        Self { room_id: Some(id), fields: SelectorFields::default() }
    }

    pub fn into_selector(self) -> Selector {
        match self.room_id {
            Some(id) => Selector::Id(id),
            None => Selector::Match(self.fields),
        }
    }
}

/// Raw parser output: slots as the message stated them, nothing checked yet.
#[derive(Clone, Debug, PartialEq)]
pub enum ParsedIntent {
    Find { filters: RoomFilters, mine: bool },
    /// Every slot is optional here; the resolver reports what an add is missing.
    Add { fields: RoomPatch },
    Edit { target: TargetSlots, fields: RoomPatch },
    Delete { target: TargetSlots },
    Help,
    Unrecognized,
}

#[async_trait]
pub trait IntentParser: Send + Sync {
    async fn parse(&self, text: &str) -> ParsedIntent;
}

pub struct IntentResolver {
    parser: Arc<dyn IntentParser>,
    guard: TargetGuard,
    listings: ListingsConfig,
    timeout_ms: u64,
}

impl IntentResolver {
    pub fn new(
        parser: Arc<dyn IntentParser>,
        store: Arc<dyn RoomStore>,
        resolver: &ResolverConfig,
        listings: ListingsConfig,
    ) -> Self {
        Self { parser, guard: TargetGuard::new(store), listings, timeout_ms: resolver.timeout_ms }
    }

    /// Resolver backed by the keyword rules only.
    pub fn rule_based(
        store: Arc<dyn RoomStore>,
        resolver: &ResolverConfig,
        listings: ListingsConfig,
    ) -> Self {
        Self::new(Arc::new(RuleBasedParser::new()), store, resolver, listings)
    }

    pub fn guard(&self) -> &TargetGuard {
        &self.guard
    }

    pub fn listings(&self) -> &ListingsConfig {
        &self.listings
    }

    pub async fn resolve(
        &self,
        text: &str,
        caller: &Caller,
    ) -> Result<StructuredRequest, IntentError> {
        let parsed =
            tokio::time::timeout(Duration::from_millis(self.timeout_ms), self.parser.parse(text))
                .await
                .map_err(|_| {
                    warn!(
                        event_name = "agent.intent.timeout",
                        timeout_ms = self.timeout_ms,
                        "intent parser did not answer in time"
                    );
                    IntentError::ResolutionTimeout { timeout_ms: self.timeout_ms }
                })?;

        let request = match parsed {
            ParsedIntent::Find { mut filters, mine } => {
                if mine {
                    filters.owner_identity = Some(caller.identity.clone());
                }
                filters.limit = Some(self.listings.clamp_limit(filters.limit));
                StructuredRequest::FindRoom { filters }
            }
            ParsedIntent::Add { fields } => StructuredRequest::AddRoom { fields: draft_from(fields)? },
            ParsedIntent::Edit { target, fields } => {
                if fields.is_empty() {
                    return Err(IntentError::missing(["fields"]));
                }
                let target = self.guard.check(target, caller).await?;
                StructuredRequest::EditRoom { target, fields }
            }
            ParsedIntent::Delete { target } => {
                let target = self.guard.check(target, caller).await?;
                StructuredRequest::DeleteRoom { target }
            }
            ParsedIntent::Help => StructuredRequest::Help,
            ParsedIntent::Unrecognized => {
                StructuredRequest::Unrecognized { text: text.trim().to_string() }
            }
        };

        debug!(
            event_name = "agent.intent.resolved",
            intent = request.kind(),
            caller = %caller.identity,
            "message resolved"
        );
        Ok(request)
    }
}

fn draft_from(fields: RoomPatch) -> Result<RoomDraft, IntentError> {
    let location = fields.location.filter(|location| !location.trim().is_empty());
    let mut missing = Vec::new();
    if location.is_none() {
        missing.push("location");
    }
    if fields.rent_amount.is_none() {
        missing.push("rent_amount");
    }

    match (location, fields.rent_amount) {
        (Some(location), Some(rent_amount)) => Ok(RoomDraft {
            amenities: fields.amenities.unwrap_or_default(),
            description: fields.description,
            contact: fields.contact,
            gender_pref: fields.gender_pref.unwrap_or_default(),
            spots_available: fields.spots_available,
            ..RoomDraft::new(location, rent_amount)
        }),
        _ => Err(IntentError::missing(missing)),
    }
}
