//! Text normalization shared by filters, selectors and the intent parsers.
//!
//! Locations and amenities arrive in many spellings ("Bangalore", "blr", "Koramangla",
//! "wi-fi", "A/C"). Everything is lowered, stripped of punctuation and mapped onto one
//! canonical spelling before comparison.

use std::collections::BTreeSet;

/// City spellings (including Devanagari) mapped to their canonical name.
const CITY_SYNONYMS: &[(&str, &str)] = &[
    ("bangalore", "bengaluru"),
    ("banglore", "bengaluru"),
    ("bengalooru", "bengaluru"),
    ("blr", "bengaluru"),
    ("बेंगलुरु", "bengaluru"),
    ("बैंगलोर", "bengaluru"),
    ("bombay", "mumbai"),
    ("bom", "mumbai"),
    ("मुंबई", "mumbai"),
    ("new delhi", "delhi"),
    ("ncr", "delhi"),
    ("दिल्ली", "delhi"),
    ("gurgaon", "gurugram"),
    ("ggn", "gurugram"),
    ("poona", "pune"),
    ("पुणे", "pune"),
    ("madras", "chennai"),
    ("calcutta", "kolkata"),
    ("hyd", "hyderabad"),
    ("secunderabad", "hyderabad"),
];

/// Neighbourhood spellings mapped to their canonical name.
const AREA_SYNONYMS: &[(&str, &str)] = &[
    ("koramangla", "koramangala"),
    ("kormangala", "koramangala"),
    ("koramangala block", "koramangala"),
    ("कोरमंगला", "koramangala"),
    ("indira nagar", "indiranagar"),
    ("indranagar", "indiranagar"),
    ("hsr", "hsr layout"),
    ("btm", "btm layout"),
    ("marathalli", "marathahalli"),
    ("marthahalli", "marathahalli"),
    ("whitefeild", "whitefield"),
    ("e city", "electronic city"),
    ("ecity", "electronic city"),
    ("bellandur lake", "bellandur"),
    ("andheri e", "andheri east"),
    ("andheri w", "andheri west"),
    ("powai lake", "powai"),
    ("hinjewadi phase", "hinjewadi"),
    ("hitech city", "hitec city"),
    ("hi tech city", "hitec city"),
];

/// Amenity spellings mapped to canonical tags.
const AMENITY_SYNONYMS: &[(&str, &str)] = &[
    ("wifi", "wifi"),
    ("wi fi", "wifi"),
    ("wi-fi", "wifi"),
    ("internet", "wifi"),
    ("broadband", "wifi"),
    ("ac", "ac"),
    ("a c", "ac"),
    ("a/c", "ac"),
    ("air conditioning", "ac"),
    ("air conditioner", "ac"),
    ("aircon", "ac"),
    ("geyser", "geyser"),
    ("hot water", "geyser"),
    ("washing machine", "washing machine"),
    ("washer", "washing machine"),
    ("laundry", "washing machine"),
    ("parking", "parking"),
    ("car parking", "parking"),
    ("bike parking", "parking"),
    ("balcony", "balcony"),
    ("furnished", "furnished"),
    ("fully furnished", "furnished"),
    ("semi furnished", "semi furnished"),
    ("attached bathroom", "attached bathroom"),
    ("attached washroom", "attached bathroom"),
    ("attached bath", "attached bathroom"),
    ("power backup", "power backup"),
    ("inverter", "power backup"),
    ("meals", "meals"),
    ("food", "meals"),
    ("khana", "meals"),
    ("tiffin", "meals"),
    ("gym", "gym"),
    ("fridge", "fridge"),
    ("refrigerator", "fridge"),
    ("housekeeping", "housekeeping"),
    ("cleaning", "housekeeping"),
    ("security", "security"),
    ("lift", "lift"),
    ("elevator", "lift"),
    ("tv", "tv"),
];

/// Lowercases, drops punctuation and underscores, and collapses whitespace.
pub fn cleanup(text: &str) -> String {
    let mut cleaned = String::with_capacity(text.len());
    for character in text.trim().chars() {
        if character.is_alphanumeric() || is_combining_mark(character) {
            cleaned.extend(character.to_lowercase());
        } else {
            cleaned.push(' ');
        }
    }
    cleaned.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Canonical form of a location: cleaned, with city and area synonyms replaced.
pub fn canonical_location(text: &str) -> String {
    let cleaned = cleanup(text);
    let replaced = replace_phrases(&cleaned, AREA_SYNONYMS);
    replace_phrases(&replaced, CITY_SYNONYMS)
}

/// Canonical amenity tag, or the cleaned text when no synonym is known.
pub fn canonical_amenity(text: &str) -> String {
    let cleaned = cleanup(&text.replace('/', ""));
    let spaced = cleanup(text);
    AMENITY_SYNONYMS
        .iter()
        .find(|(alias, _)| cleanup(alias) == spaced || cleanup(&alias.replace('/', "")) == cleaned)
        .map(|(_, canonical)| (*canonical).to_string())
        .unwrap_or(spaced)
}

/// Amenity tags mentioned anywhere inside free text, longest alias first.
pub fn amenities_in(text: &str) -> Vec<String> {
    let haystack = format!(" {} ", cleanup(text));
    let mut aliases: Vec<&(&str, &str)> = AMENITY_SYNONYMS.iter().collect();
    aliases.sort_by_key(|(alias, _)| std::cmp::Reverse(alias.len()));

    let mut consumed = haystack.clone();
    let mut found = Vec::new();
    for (alias, canonical) in aliases {
        let needle = format!(" {} ", cleanup(alias));
        if needle.trim().is_empty() || !consumed.contains(&needle) {
            continue;
        }
        consumed = consumed.replace(&needle, " ");
        if !found.iter().any(|existing: &String| existing == canonical) {
            found.push((*canonical).to_string());
        }
    }
    found.sort();
    found
}

/// Whether `needle` names the same place as (a whole-word part of) `haystack`.
pub fn location_contains(haystack: &str, needle: &str) -> bool {
    let needle = canonical_location(needle);
    if needle.is_empty() {
        return true;
    }
    let haystack = format!(" {} ", canonical_location(haystack));
    haystack.contains(&format!(" {needle} "))
}

/// Known place names (canonical) found in free text, longest first.
pub fn known_places_in(text: &str) -> Vec<String> {
    let canonical = format!(" {} ", canonical_location(text));
    let mut places: Vec<&str> = CITY_SYNONYMS
        .iter()
        .chain(AREA_SYNONYMS.iter())
        .map(|(_, place)| *place)
        .chain(CITIES.iter().copied())
        .chain(KNOWN_PLACES.iter().copied())
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect();
    places.sort_by_key(|place| std::cmp::Reverse(place.len()));

    let mut found: Vec<String> = Vec::new();
    for place in places {
        if canonical.contains(&format!(" {place} "))
            && !found.iter().any(|existing| existing.contains(place))
        {
            found.push(place.to_string());
        }
    }
    found
}

/// Whether a canonical place names a whole city rather than a neighbourhood.
pub fn is_city(place: &str) -> bool {
    CITIES.contains(&place)
}

/// Title-cases a canonical place for display ("hsr layout" -> "HSR Layout").
pub fn display_place(place: &str) -> String {
    place
        .split_whitespace()
        .map(|word| match word {
            "hsr" | "btm" => word.to_ascii_uppercase(),
            _ => {
                let mut chars = word.chars();
                match chars.next() {
                    Some(first) => first.to_uppercase().chain(chars).collect(),
                    None => String::new(),
                }
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}

const CITIES: &[&str] = &[
    "bengaluru",
    "mumbai",
    "delhi",
    "gurugram",
    "noida",
    "pune",
    "chennai",
    "kolkata",
    "hyderabad",
];

const KNOWN_PLACES: &[&str] = &[
    "koramangala",
    "indiranagar",
    "hsr layout",
    "btm layout",
    "marathahalli",
    "whitefield",
    "electronic city",
    "bellandur",
    "jayanagar",
    "jp nagar",
    "hebbal",
    "yelahanka",
    "malleshwaram",
    "banashankari",
    "sarjapur",
    "andheri east",
    "andheri west",
    "powai",
    "bandra",
    "hinjewadi",
    "kothrud",
    "baner",
    "viman nagar",
    "hitec city",
    "gachibowli",
    "madhapur",
    "cyber city",
    "saket",
    "lajpat nagar",
];

fn replace_phrases(text: &str, table: &[(&str, &str)]) -> String {
    let mut padded = format!(" {text} ");
    let mut entries: Vec<&(&str, &str)> = table.iter().collect();
    entries.sort_by_key(|(alias, _)| std::cmp::Reverse(alias.len()));
    for (alias, canonical) in entries {
        let needle = format!(" {} ", cleanup(alias));
        // "hsr" -> "hsr layout" must not fire on text that already says "hsr layout".
        if canonical.starts_with(*alias) && padded.contains(&format!(" {canonical} ")) {
            continue;
        }
        if padded.contains(&needle) {
            padded = padded.replace(&needle, &format!(" {canonical} "));
        }
    }
    padded.split_whitespace().collect::<Vec<_>>().join(" ")
}

pub fn is_combining_mark(character: char) -> bool {
    // Devanagari vowel signs and nasalisation marks are not alphanumeric.
    matches!(character, '\u{0900}'..='\u{0903}' | '\u{093A}'..='\u{094F}' | '\u{0962}'..='\u{0963}')
}

#[cfg(test)]
mod tests {
    use super::{
        amenities_in, canonical_amenity, canonical_location, cleanup, display_place, is_city,
        known_places_in, location_contains,
    };

    #[test]
    fn cleanup_strips_punctuation_and_case() {
        assert_eq!(cleanup("  Koramangala,   5th Block!! "), "koramangala 5th block");
        assert_eq!(cleanup("HSR_Layout"), "hsr layout");
    }

    #[test]
    fn city_and_area_synonyms_are_canonicalized() {
        assert_eq!(canonical_location("Koramangla, Bangalore"), "koramangala bengaluru");
        assert_eq!(canonical_location("HSR"), "hsr layout");
        assert_eq!(canonical_location("बैंगलोर"), "bengaluru");
    }

    #[test]
    fn location_matching_is_whole_word() {
        assert!(location_contains("Koramangala, Bengaluru", "koramangala"));
        assert!(location_contains("Koramangala, Bengaluru", "Bangalore"));
        assert!(location_contains("HSR Layout", "hsr"));
        assert!(!location_contains("Koramangala", "mangala"));
        assert!(!location_contains("Indiranagar", "Koramangala"));
    }

    #[test]
    fn amenity_aliases_collapse() {
        assert_eq!(canonical_amenity("Wi-Fi"), "wifi");
        assert_eq!(canonical_amenity("A/C"), "ac");
        assert_eq!(canonical_amenity("Fully Furnished"), "furnished");
        assert_eq!(canonical_amenity("Rooftop"), "rooftop");
    }

    #[test]
    fn amenities_are_found_in_free_text() {
        let found = amenities_in("room with wifi, A/C and attached washroom; khana bhi milega");
        assert_eq!(found, vec!["ac", "attached bathroom", "meals", "wifi"]);
    }

    #[test]
    fn known_places_prefer_longest_match() {
        let places = known_places_in("flat in HSR layout near Koramangala, blr");
        assert!(places.contains(&"hsr layout".to_string()));
        assert!(places.contains(&"koramangala".to_string()));
        assert!(places.contains(&"bengaluru".to_string()));
        assert_eq!(display_place("hsr layout"), "HSR Layout");
        assert!(is_city("bengaluru"));
        assert!(!is_city("koramangala"));
    }
}
