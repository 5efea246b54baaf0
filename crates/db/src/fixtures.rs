use std::collections::BTreeSet;

use rust_decimal::Decimal;

use roomie_core::auth::Caller;
use roomie_core::domain::room::{GenderPreference, RoomDraft, RoomFilters};
use roomie_core::errors::StoreError;

use crate::repositories::RoomStore;

/// Owner recorded on every demo listing. Never a real phone number.
pub const DEMO_OWNER_IDENTITY: &str = "demo-seed";

/// Deterministic listings for local runs and end-to-end checks.
const SEED_ROOMS: &[SeedRoomContract] = &[
    SeedRoomContract {
        key: "marathahalli-single",
        location: "Marathahalli, Bengaluru",
        rent: 10_500,
        gender_pref: GenderPreference::Any,
        amenities: &["wifi", "geyser"],
        description: "Spacious single room in a 2BHK apartment. Close to IT parks.",
        spots_available: 1,
    },
    SeedRoomContract {
        key: "indiranagar-1bhk",
        location: "Indiranagar, Bengaluru",
        rent: 18_000,
        gender_pref: GenderPreference::Female,
        amenities: &["wifi", "ac", "washing machine", "balcony"],
        description: "Luxurious 1BHK near the metro station. Fully furnished.",
        spots_available: 1,
    },
    SeedRoomContract {
        key: "hsr-shared",
        location: "HSR Layout, Bengaluru",
        rent: 8_000,
        gender_pref: GenderPreference::Male,
        amenities: &["wifi", "meals", "power backup"],
        description: "Twin sharing in a managed PG, breakfast and dinner included.",
        spots_available: 2,
    },
];

struct SeedRoomContract {
    key: &'static str,
    location: &'static str,
    rent: i64,
    gender_pref: GenderPreference,
    amenities: &'static [&'static str],
    description: &'static str,
    spots_available: u32,
}

impl SeedRoomContract {
    fn draft(&self) -> RoomDraft {
        RoomDraft {
            amenities: self.amenities.iter().map(|amenity| amenity.to_string()).collect(),
            description: Some(self.description.to_string()),
            gender_pref: self.gender_pref,
            spots_available: Some(self.spots_available),
            ..RoomDraft::new(self.location, Decimal::from(self.rent))
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SeedResult {
    pub rooms_seeded: Vec<&'static str>,
    pub already_present: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VerificationResult {
    pub all_present: bool,
    pub checks: Vec<(&'static str, bool)>,
}

pub struct DemoSeedDataset;

impl DemoSeedDataset {
    pub fn len() -> usize {
        SEED_ROOMS.len()
    }

    /// Adds the demo listings unless the demo owner already has active rooms.
    pub async fn load(store: &dyn RoomStore) -> Result<SeedResult, StoreError> {
        let existing = store.find(&demo_owner_filter()).await?;
        if !existing.is_empty() {
            return Ok(SeedResult { rooms_seeded: Vec::new(), already_present: true });
        }

        let owner = Caller::new(DEMO_OWNER_IDENTITY);
        let mut rooms_seeded = Vec::with_capacity(SEED_ROOMS.len());
        for seed in SEED_ROOMS {
            store.add(seed.draft(), &owner).await?;
            rooms_seeded.push(seed.key);
        }
        Ok(SeedResult { rooms_seeded, already_present: false })
    }

    /// Checks every demo listing is present with its contracted rent and amenities.
    pub async fn verify(store: &dyn RoomStore) -> Result<VerificationResult, StoreError> {
        let rooms = store.find(&demo_owner_filter()).await?;

        let checks = SEED_ROOMS
            .iter()
            .map(|seed| {
                let expected = seed.draft();
                let wanted: BTreeSet<String> = expected.amenities.clone();
                let present = rooms.iter().any(|room| {
                    room.location == expected.location
                        && room.rent_amount == expected.rent_amount
                        && room.amenities == wanted
                        && room.gender_pref == expected.gender_pref
                });
                (seed.key, present)
            })
            .collect::<Vec<_>>();

        let all_present = checks.iter().all(|(_, present)| *present);
        Ok(VerificationResult { all_present, checks })
    }
}

fn demo_owner_filter() -> RoomFilters {
    RoomFilters { owner_identity: Some(DEMO_OWNER_IDENTITY.to_string()), ..RoomFilters::default() }
}
