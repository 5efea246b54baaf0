use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Duration, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::errors::DomainError;
use crate::normalize::{canonical_amenity, canonical_location, location_contains};

/// Public listing id. Rendered as `R001`; the numeric part is monotonic and never reused.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct RoomId(pub u64);

impl fmt::Display for RoomId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "R{:03}", self.0)
    }
}

impl FromStr for RoomId {
    type Err = DomainError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let trimmed = value.trim().trim_start_matches('#');
        let digits = trimmed
            .strip_prefix('R')
            .or_else(|| trimmed.strip_prefix('r'))
            .unwrap_or(trimmed);

        if digits.is_empty() || !digits.chars().all(|c| c.is_ascii_digit()) {
            return Err(DomainError::InvariantViolation(format!("`{value}` is not a room id")));
        }

        digits
            .parse::<u64>()
            .map(RoomId)
            .map_err(|_| DomainError::InvariantViolation(format!("`{value}` is not a room id")))
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RoomStatus {
    Active,
    Deleted,
}

impl RoomStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Active => "active",
            Self::Deleted => "deleted",
        }
    }
}

impl FromStr for RoomStatus {
    type Err = DomainError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "active" => Ok(Self::Active),
            "deleted" => Ok(Self::Deleted),
            other => Err(DomainError::InvariantViolation(format!("unknown room status `{other}`"))),
        }
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GenderPreference {
    #[default]
    Any,
    Male,
    Female,
}

impl GenderPreference {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Any => "any",
            Self::Male => "male",
            Self::Female => "female",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Self::Any => "Any",
            Self::Male => "Male",
            Self::Female => "Female",
        }
    }

    /// A listing open to `Any` accepts every seeker; otherwise the preferences must agree.
    pub fn accepts(&self, seeker: GenderPreference) -> bool {
        matches!(self, Self::Any) || matches!(seeker, Self::Any) || *self == seeker
    }
}

impl FromStr for GenderPreference {
    type Err = DomainError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "any" | "anyone" | "all" | "unisex" => Ok(Self::Any),
            "male" | "m" | "boys" | "men" | "gents" => Ok(Self::Male),
            "female" | "f" | "girls" | "women" | "ladies" => Ok(Self::Female),
            other => Err(DomainError::InvariantViolation(format!(
                "gender_pref must be male, female or any (got `{other}`)"
            ))),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Room {
    pub id: RoomId,
    pub location: String,
    pub rent_amount: Decimal,
    pub amenities: BTreeSet<String>,
    pub description: Option<String>,
    pub contact: Option<String>,
    pub gender_pref: GenderPreference,
    pub spots_available: Option<u32>,
    pub owner_identity: String,
    pub status: RoomStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

impl Room {
    /// Builds an active room from a validated draft.
    pub fn create(
        id: RoomId,
        draft: RoomDraft,
        owner_identity: impl Into<String>,
        now: DateTime<Utc>,
        ttl_days: i64,
    ) -> Result<Self, DomainError> {
        draft.validate()?;
        Ok(Self {
            id,
            location: draft.location.trim().to_string(),
            rent_amount: draft.rent_amount,
            amenities: canonical_amenities(&draft.amenities),
            description: non_empty(draft.description),
            contact: non_empty(draft.contact),
            gender_pref: draft.gender_pref,
            spots_available: draft.spots_available,
            owner_identity: owner_identity.into(),
            status: RoomStatus::Active,
            created_at: now,
            updated_at: now,
            expires_at: now + Duration::days(ttl_days.max(1)),
        })
    }

    pub fn is_active(&self) -> bool {
        self.status == RoomStatus::Active
    }

    pub fn is_owned_by(&self, identity: &str) -> bool {
        self.owner_identity == identity
    }

    /// Applies only the fields present in `patch`; returns the names of the fields that changed.
    pub fn apply(
        &mut self,
        patch: &RoomPatch,
        now: DateTime<Utc>,
    ) -> Result<Vec<&'static str>, DomainError> {
        patch.validate()?;
        let mut changed = Vec::new();

        if let Some(location) = &patch.location {
            self.location = location.trim().to_string();
            changed.push("location");
        }
        if let Some(rent_amount) = patch.rent_amount {
            self.rent_amount = rent_amount;
            changed.push("rent_amount");
        }
        if let Some(amenities) = &patch.amenities {
            self.amenities = canonical_amenities(amenities);
            changed.push("amenities");
        }
        if let Some(description) = &patch.description {
            self.description = non_empty(Some(description.clone()));
            changed.push("description");
        }
        if let Some(contact) = &patch.contact {
            self.contact = non_empty(Some(contact.clone()));
            changed.push("contact");
        }
        if let Some(gender_pref) = patch.gender_pref {
            self.gender_pref = gender_pref;
            changed.push("gender_pref");
        }
        if let Some(spots_available) = patch.spots_available {
            self.spots_available = Some(spots_available);
            changed.push("spots_available");
        }

        if !changed.is_empty() {
            self.updated_at = now;
        }
        Ok(changed)
    }

    pub fn tombstone(&mut self, now: DateTime<Utc>) {
        self.status = RoomStatus::Deleted;
        self.updated_at = now;
    }
}

/// Fields supplied when listing a new room.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct RoomDraft {
    pub location: String,
    pub rent_amount: Decimal,
    #[serde(default)]
    pub amenities: BTreeSet<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub contact: Option<String>,
    #[serde(default)]
    pub gender_pref: GenderPreference,
    #[serde(default)]
    pub spots_available: Option<u32>,
}

impl RoomDraft {
    pub fn new(location: impl Into<String>, rent_amount: Decimal) -> Self {
        Self { location: location.into(), rent_amount, ..Self::default() }
    }

    pub fn validate(&self) -> Result<(), DomainError> {
        if self.location.trim().is_empty() {
            return Err(DomainError::InvariantViolation("location must not be empty".to_string()));
        }
        validate_rent(self.rent_amount)
    }
}

/// Partial update; `None` leaves the stored value untouched.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct RoomPatch {
    #[serde(default)]
    pub location: Option<String>,
    #[serde(default)]
    pub rent_amount: Option<Decimal>,
    #[serde(default)]
    pub amenities: Option<BTreeSet<String>>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub contact: Option<String>,
    #[serde(default)]
    pub gender_pref: Option<GenderPreference>,
    #[serde(default)]
    pub spots_available: Option<u32>,
}

impl RoomPatch {
    pub fn is_empty(&self) -> bool {
        self.location.is_none()
            && self.rent_amount.is_none()
            && self.amenities.is_none()
            && self.description.is_none()
            && self.contact.is_none()
            && self.gender_pref.is_none()
            && self.spots_available.is_none()
    }

    pub fn validate(&self) -> Result<(), DomainError> {
        if let Some(location) = &self.location {
            if location.trim().is_empty() {
                return Err(DomainError::InvariantViolation(
                    "location must not be empty".to_string(),
                ));
            }
        }
        if let Some(rent_amount) = self.rent_amount {
            validate_rent(rent_amount)?;
        }
        Ok(())
    }
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct RoomFilters {
    /// City, area or pincode; matched as a whole phrase of the listing's location.
    #[serde(default)]
    pub location: Option<String>,
    #[serde(default)]
    pub min_rent: Option<Decimal>,
    #[serde(default)]
    pub max_rent: Option<Decimal>,
    #[serde(default)]
    pub amenities: BTreeSet<String>,
    #[serde(default)]
    pub gender_pref: Option<GenderPreference>,
    #[serde(default)]
    pub owner_identity: Option<String>,
    #[serde(default)]
    pub limit: Option<usize>,
}

impl RoomFilters {
    pub fn matches(&self, room: &Room) -> bool {
        if !room.is_active() {
            return false;
        }
        if let Some(location) = &self.location {
            if !location_contains(&room.location, location) {
                return false;
            }
        }
        if let Some(min_rent) = self.min_rent {
            if room.rent_amount < min_rent {
                return false;
            }
        }
        if let Some(max_rent) = self.max_rent {
            if room.rent_amount > max_rent {
                return false;
            }
        }
        if !self.amenities.is_empty() {
            let wanted = canonical_amenities(&self.amenities);
            if !wanted.is_subset(&room.amenities) {
                return false;
            }
        }
        if let Some(gender_pref) = self.gender_pref {
            if !room.gender_pref.accepts(gender_pref) {
                return false;
            }
        }
        if let Some(owner_identity) = &self.owner_identity {
            if !room.is_owned_by(owner_identity) {
                return false;
            }
        }
        true
    }

    pub fn is_unconstrained(&self) -> bool {
        self.location.is_none()
            && self.min_rent.is_none()
            && self.max_rent.is_none()
            && self.amenities.is_empty()
            && self.gender_pref.is_none()
            && self.owner_identity.is_none()
    }
}

/// Orders rooms newest first, ties broken by ascending id, then truncates to `limit`.
pub fn order_for_listing(rooms: &mut Vec<Room>, limit: Option<usize>) {
    rooms.sort_by(|left, right| {
        right.created_at.cmp(&left.created_at).then_with(|| left.id.cmp(&right.id))
    });
    if let Some(limit) = limit {
        rooms.truncate(limit);
    }
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct SelectorFields {
    #[serde(default)]
    pub location: Option<String>,
    #[serde(default)]
    pub rent_amount: Option<Decimal>,
}

impl SelectorFields {
    pub fn is_distinguishing(&self) -> bool {
        self.location.as_deref().map(|value| !canonical_location(value).is_empty()).unwrap_or(false)
            || self.rent_amount.is_some()
    }

    pub fn matches(&self, room: &Room) -> bool {
        if !room.is_active() || !self.is_distinguishing() {
            return false;
        }
        if let Some(location) = &self.location {
            if !location_contains(&room.location, location) {
                return false;
            }
        }
        if let Some(rent_amount) = self.rent_amount {
            if room.rent_amount != rent_amount {
                return false;
            }
        }
        true
    }
}

/// Identifies the one room an edit or delete applies to.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Selector {
    Id(RoomId),
    Match(SelectorFields),
}

impl fmt::Display for Selector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Id(id) => write!(f, "{id}"),
            Self::Match(fields) => {
                let mut parts = Vec::new();
                if let Some(location) = &fields.location {
                    parts.push(format!("location \"{location}\""));
                }
                if let Some(rent_amount) = fields.rent_amount {
                    parts.push(format!("rent ₹{rent_amount}"));
                }
                if parts.is_empty() {
                    write!(f, "an unspecified room")
                } else {
                    write!(f, "{}", parts.join(", "))
                }
            }
        }
    }
}

fn validate_rent(rent_amount: Decimal) -> Result<(), DomainError> {
    if rent_amount < Decimal::ZERO {
        return Err(DomainError::InvariantViolation(
            "rent_amount must be a non-negative number".to_string(),
        ));
    }
    Ok(())
}

fn canonical_amenities(amenities: &BTreeSet<String>) -> BTreeSet<String> {
    amenities.iter().map(|amenity| canonical_amenity(amenity)).filter(|a| !a.is_empty()).collect()
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.map(|v| v.trim().to_string()).filter(|v| !v.is_empty())
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeSet;

    use chrono::{Duration, Utc};
    use rust_decimal::Decimal;

    use super::{
        order_for_listing, GenderPreference, Room, RoomDraft, RoomFilters, RoomId, RoomPatch,
        RoomStatus, SelectorFields,
    };
    use crate::errors::DomainError;

    fn room(id: u64, location: &str, rent: i64) -> Room {
        Room::create(
            RoomId(id),
            RoomDraft::new(location, Decimal::from(rent)),
            "+919800000001",
            Utc::now(),
            30,
        )
        .expect("valid draft")
    }

    #[test]
    fn room_ids_render_and_parse() {
        assert_eq!(RoomId(7).to_string(), "R007");
        assert_eq!(RoomId(1234).to_string(), "R1234");
        assert_eq!("r015".parse::<RoomId>().expect("lowercase"), RoomId(15));
        assert_eq!("R5".parse::<RoomId>().expect("short"), RoomId(5));
        assert_eq!("42".parse::<RoomId>().expect("bare"), RoomId(42));
        assert!("room".parse::<RoomId>().is_err());
        assert!("R".parse::<RoomId>().is_err());
    }

    #[test]
    fn negative_rent_is_rejected() {
        let draft = RoomDraft::new("Koramangala", Decimal::from(-1));
        let error = draft.validate().expect_err("negative rent");
        assert!(matches!(
            error,
            DomainError::InvariantViolation(message) if message.contains("rent_amount")
        ));
    }

    #[test]
    fn patch_applies_only_present_fields() {
        let mut listing = room(1, "Koramangala", 12_000);
        let before = listing.clone();
        let patch = RoomPatch { rent_amount: Some(Decimal::from(15_000)), ..RoomPatch::default() };

        let changed = listing.apply(&patch, Utc::now()).expect("patch applies");

        assert_eq!(changed, vec!["rent_amount"]);
        assert_eq!(listing.rent_amount, Decimal::from(15_000));
        assert_eq!(listing.location, before.location);
        assert_eq!(listing.amenities, before.amenities);
        assert_eq!(listing.id, before.id);
    }

    #[test]
    fn filters_are_conjunctive_and_skip_tombstones() {
        let mut listing = room(1, "Koramangala, Bengaluru", 12_000);
        listing.amenities = BTreeSet::from(["wifi".to_string(), "ac".to_string()]);

        let filters = RoomFilters {
            location: Some("koramangala".to_string()),
            max_rent: Some(Decimal::from(15_000)),
            amenities: BTreeSet::from(["Wi-Fi".to_string()]),
            ..RoomFilters::default()
        };
        assert!(filters.matches(&listing));

        let too_cheap = RoomFilters { max_rent: Some(Decimal::from(10_000)), ..filters.clone() };
        assert!(!too_cheap.matches(&listing));

        listing.status = RoomStatus::Deleted;
        assert!(!filters.matches(&listing));
    }

    #[test]
    fn pincode_is_matched_as_a_whole_word_of_the_location() {
        let listing = room(1, "Koramangala, Bengaluru 560034", 12_000);
        let by_pincode =
            RoomFilters { location: Some("560034".to_string()), ..RoomFilters::default() };
        assert!(by_pincode.matches(&listing));

        let partial = RoomFilters { location: Some("56003".to_string()), ..RoomFilters::default() };
        assert!(!partial.matches(&listing));
    }

    #[test]
    fn gender_any_listing_accepts_everyone() {
        assert!(GenderPreference::Any.accepts(GenderPreference::Female));
        assert!(GenderPreference::Female.accepts(GenderPreference::Any));
        assert!(!GenderPreference::Female.accepts(GenderPreference::Male));
    }

    #[test]
    fn listing_order_is_newest_first_with_id_tiebreak() {
        let now = Utc::now();
        let mut older = room(1, "Indiranagar", 18_000);
        older.created_at = now - Duration::days(1);
        let mut tied_high = room(3, "HSR Layout", 9_000);
        tied_high.created_at = now;
        let mut tied_low = room(2, "BTM Layout", 8_000);
        tied_low.created_at = now;

        let mut rooms = vec![older, tied_high, tied_low];
        order_for_listing(&mut rooms, None);

        let ids: Vec<_> = rooms.iter().map(|room| room.id).collect();
        assert_eq!(ids, vec![RoomId(2), RoomId(3), RoomId(1)]);
    }

    #[test]
    fn selector_without_fields_matches_nothing() {
        let listing = room(1, "Koramangala", 12_000);
        assert!(!SelectorFields::default().matches(&listing));
        assert!(SelectorFields { location: Some("Koramangala".to_string()), rent_amount: None }
            .matches(&listing));
    }
}
