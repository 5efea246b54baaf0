//! Chat replies for store outcomes and errors.
//!
//! Everything here is pure formatting. A room id is printed only when the caller may modify
//! that room or typed the id themselves, so searching never reveals other owners' handles.

use roomie_core::auth::Caller;
use roomie_core::domain::room::{Room, RoomId, RoomPatch, Selector};
use roomie_core::errors::{IntentError, StoreError};

#[derive(Clone, Debug, PartialEq)]
pub enum Outcome {
    Found(Vec<Room>),
    Added(Room),
    Edited { room: Room, patch: RoomPatch },
    Deleted(RoomId),
    Help,
    Unrecognized { text: String },
}

#[derive(Clone, Copy, Debug, Default)]
pub struct ResponseFormatter;

impl ResponseFormatter {
    pub fn new() -> Self {
        Self
    }

    pub fn outcome(
        &self,
        caller: &Caller,
        supplied: Option<&Selector>,
        outcome: &Outcome,
    ) -> String {
        match outcome {
            Outcome::Found(rooms) => self.found(caller, supplied, rooms),
            Outcome::Added(room) => format!(
                "✅ **Success! Your room is listed with ID: `{}`**\n\n{}\n\
                 Use this ID to edit or delete the listing later.",
                room.id,
                card(room, true)
            ),
            Outcome::Edited { room, patch } => format!(
                "✅ **Success!** For room `{}`, updated: {}.",
                room.id,
                changed_fields(patch).join(", ")
            ),
            Outcome::Deleted(id) => format!("✅ **Success!** Room listing `{id}` has been deleted."),
            Outcome::Help => self.help(),
            Outcome::Unrecognized { text } => format!(
                "🤔 I couldn't tell what you want to do with \"{text}\".\n\
                 Try `Find rooms in Koramangala under 15k`, or send `help` for more examples."
            ),
        }
    }

    fn found(&self, caller: &Caller, supplied: Option<&Selector>, rooms: &[Room]) -> String {
        if rooms.is_empty() {
            return "🔍 **No matching rooms found.** Try different filters.".to_string();
        }

        let mut lines = vec![format!(
            "🏠 **Room Finder Results** (showing {} result(s))\n",
            rooms.len()
        )];
        for room in rooms {
            let show_id = caller.can_modify(&room.owner_identity)
                || matches!(supplied, Some(Selector::Id(id)) if *id == room.id);
            lines.push(card(room, show_id));
        }
        lines.join("\n")
    }

    pub fn store_error(&self, supplied: Option<&Selector>, error: &StoreError) -> String {
        let named = match supplied {
            Some(selector) => format!("`{selector}`"),
            None => "that room".to_string(),
        };
        match error {
            StoreError::NotFound { .. } => {
                format!("❌ Error: no active room matches {named}. It may have been deleted.")
            }
            StoreError::Forbidden { id } => {
                let room = match supplied {
                    Some(Selector::Id(supplied_id)) if supplied_id == id => format!("room `{id}`"),
                    _ => "that room".to_string(),
                };
                format!("❌ Permission Denied: you can only change your own listings, not {room}.")
            }
            StoreError::Ambiguous { count } => format!(
                "⚠️ {count} rooms match {named}. Please give the room ID or add the rent to pick one."
            ),
            StoreError::Invalid(error) => format!("❌ {error}"),
            StoreError::Unavailable(_) => {
                "⚠️ The room service is temporarily unavailable. Please try again in a moment."
                    .to_string()
            }
        }
    }

    pub fn intent_error(&self, error: &IntentError) -> String {
        match error {
            IntentError::MissingFields { fields } => {
                let fields: Vec<String> =
                    fields.iter().map(|field| field.replace('_', " ")).collect();
                format!("To continue, please provide: **{}**.", fields.join(", "))
            }
            IntentError::AmbiguousTarget { candidates } if candidates.is_empty() => {
                "⚠️ Which room do you mean? Please give its room ID, or its location and rent."
                    .to_string()
            }
            IntentError::AmbiguousTarget { candidates } => {
                let ids: Vec<String> = candidates.iter().map(|id| format!("`{id}`")).collect();
                format!(
                    "⚠️ That matches more than one of your rooms: {}. Tell me which one by its ID.",
                    ids.join(", ")
                )
            }
            IntentError::ResolutionTimeout { .. } => {
                "⏳ That took too long to understand. Nothing was changed, so please send it again."
                    .to_string()
            }
        }
    }

    pub fn help(&self) -> String {
        [
            "👋 **Welcome to the RoomieMatch Assistant!**",
            "",
            "**🔎 How to Search:**",
            "• `Find rooms in Koramangala under 15k`",
            "• `HSR layout me 10k se kam ka PG dikhao`",
            "• `Show my listings`",
            "",
            "**✍️ How to List a Room:**",
            "• `Add a room in Indiranagar for 18000 with wifi and AC, girls only`",
            "• `Mere paas room hai Marathahalli mein, 11k kiraya`",
            "",
            "**✏️ How to Manage a Listing:**",
            "Use the room ID you got when you listed it.",
            "• `Change rent of R015 to 18000`",
            "• `R015 hata do`",
        ]
        .join("\n")
    }
}

fn card(room: &Room, show_id: bool) -> String {
    let mut lines = Vec::with_capacity(10);
    if show_id {
        lines.push(format!("**ID:** `{}`", room.id));
    }
    let amenities = room.amenities.iter().cloned().collect::<Vec<_>>().join(", ");
    lines.push(format!("**Location:** {}", room.location));
    lines.push(format!("**Rent:** ₹{}/month", room.rent_amount));
    lines.push(format!("**Gender Pref:** {}", room.gender_pref.label()));
    let spots = room.spots_available.map(|spots| spots.to_string());
    lines.push(format!("**Spots Available:** {}", or_dash(spots)));
    lines.push(format!("**Amenities:** {}", or_dash((!amenities.is_empty()).then_some(amenities))));
    lines.push(format!("**Contact:** {}", or_dash(room.contact.clone())));
    lines.push(format!(
        "**Posted:** {}  •  **Expires:** {}",
        room.created_at.format("%Y-%m-%d"),
        room.expires_at.format("%Y-%m-%d")
    ));
    if let Some(description) = &room.description {
        lines.push(format!("**About:** {description}"));
    }
    lines.push("---".to_string());
    lines.join("\n")
}

fn or_dash(value: Option<String>) -> String {
    value.unwrap_or_else(|| "—".to_string())
}

fn changed_fields(patch: &RoomPatch) -> Vec<&'static str> {
    [
        ("location", patch.location.is_some()),
        ("rent", patch.rent_amount.is_some()),
        ("amenities", patch.amenities.is_some()),
        ("description", patch.description.is_some()),
        ("contact", patch.contact.is_some()),
        ("gender preference", patch.gender_pref.is_some()),
        ("spots available", patch.spots_available.is_some()),
    ]
    .into_iter()
    .filter_map(|(name, present)| present.then_some(name))
    .collect()
}
