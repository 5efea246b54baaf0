use std::collections::BTreeSet;
use std::str::FromStr;

use async_trait::async_trait;
use rust_decimal::Decimal;

use roomie_core::domain::room::{GenderPreference, RoomFilters, RoomId, RoomPatch, SelectorFields};
use roomie_core::normalize::{
    amenities_in, display_place, is_city, is_combining_mark, known_places_in,
};

use crate::intent::{IntentParser, ParsedIntent, TargetSlots};

const DELETE_PHRASES: &[&str] = &[
    "delete",
    "remove",
    "unlist",
    "take down",
    "hatao",
    "hata do",
    "hatado",
    "band karo",
    "हटाओ",
    "हटा दो",
    "डिलीट",
];

const EDIT_PHRASES: &[&str] = &[
    "edit",
    "update",
    "change",
    "modify",
    "set",
    "badlo",
    "badal do",
    "badal",
    "बदलो",
    "बदल दो",
    "अपडेट",
];

const ADD_PHRASES: &[&str] = &[
    "add",
    "post",
    "list my",
    "list a",
    "list this",
    "rent out",
    "have a room",
    "have a flat",
    "have a pg",
    "paas room hai",
    "paas ek room hai",
    "daalo",
    "dalo",
    "daal do",
    "dal do",
    "जोड़ो",
    "डालो",
];

const FIND_PHRASES: &[&str] = &[
    "find",
    "search",
    "show",
    "looking for",
    "look for",
    "need a room",
    "need room",
    "want a room",
    "any room",
    "dikhao",
    "dikha do",
    "chahiye",
    "dhundo",
    "dhoondo",
    "dhoondho",
    "batao",
    "दिखाओ",
    "चाहिए",
    "ढूंढो",
];

const HELP_PHRASES: &[&str] =
    &["help", "madad", "commands", "what can you do", "how does this work", "how to use", "मदद"];

const OWN_LISTING_PHRASES: &[&str] = &[
    "my listings",
    "my listing",
    "my rooms",
    "my room",
    "my ads",
    "mere rooms",
    "mere room",
    "meri listing",
    "meri listings",
    "mera room",
    "मेरे रूम",
];

/// "kar do" only reads as an edit when the message also names a room or its rent.
const DO_IT_PHRASES: &[&str] = &["kar do", "kardo", "karo", "कर दो"];
const RENT_WORDS: &[&str] = &["rent", "kiraya", "kiraaya", "price", "किराया"];

const MAX_BEFORE: &[&str] = &["under", "below", "upto", "within", "max", "maximum", "budget"];
const MIN_BEFORE: &[&str] = &["above", "over", "min", "minimum", "least", "starting"];
const MAX_AFTER: &[&str] = &["tak", "तक", "se kam", "ke andar", "andar", "or less", "max"];
const MIN_AFTER: &[&str] =
    &["se upar", "se zyada", "se jyada", "upar", "zyada", "plus", "or more", "and above"];

const COUNT_WORDS: &[&str] = &[
    "spot",
    "spots",
    "bed",
    "beds",
    "seat",
    "seats",
    "people",
    "persons",
    "log",
    "vacancy",
    "vacancies",
    "sharing",
];

/// Skipped when looking for what a delete phrase removes.
const REMOVAL_FILLERS: &[&str] =
    &["the", "a", "an", "my", "this", "that", "its", "se", "ka", "ki", "ke", "ko", "bhi"];

const CURRENCY_WORDS: &[&str] = &["rs", "inr", "rupees"];

const RESULT_WORDS: &[&str] = &["rooms", "listings", "results", "options"];

/// Words that never belong to a place name picked up after "in", "at" or "near".
const STOP_WORDS: &[&str] = &[
    "a", "an", "the", "my", "me", "i", "is", "are", "of", "on", "by", "for", "with", "and",
    "to", "from", "in", "at", "near", "around", "under", "below", "above", "over", "upto",
    "budget", "rent", "kiraya", "price", "per", "month", "room", "rooms", "flat", "flats", "pg",
    "bhk", "single", "double", "sharing", "only", "please", "available", "mein", "ka", "ki",
    "ke", "ko", "se", "tak", "wala", "wali", "wale", "pe", "par", "hai", "metro", "station",
    "girls", "boys", "ladies", "gents",
];

const FEMALE_WORDS: &[&str] = &[
    "female",
    "females",
    "girl",
    "girls",
    "lady",
    "ladies",
    "woman",
    "women",
    "ladki",
    "ladkiyan",
    "ladkiyon",
    "महिला",
    "लड़कियों",
];
const MALE_WORDS: &[&str] =
    &["male", "males", "boy", "boys", "gents", "men", "ladka", "ladke", "ladkon", "लड़कों", "पुरुष"];
const ANY_GENDER_WORDS: &[&str] = &["unisex", "anyone", "coed"];

/// Bare numbers below this are counts, floors or block numbers, never a monthly rent.
const MIN_BARE_RENT: i64 = 500;

/// Deterministic keyword and slot rules for room messages.
///
/// Precedence is edit, then delete, then add, and removing an amenity is never a delete.
/// Help wins only when the message carries no place or amount; anything else that mentions
/// a place or an amount is read as a search.
#[derive(Clone, Debug, Default)]
pub struct RuleBasedParser;

impl RuleBasedParser {
    pub fn new() -> Self {
        Self
    }

    pub fn parse_text(&self, text: &str) -> ParsedIntent {
        let message = Message::new(text);
        match message.classify() {
            Kind::Delete => ParsedIntent::Delete { target: message.delete_target() },
            Kind::Edit => message.edit(),
            Kind::Add => ParsedIntent::Add { fields: message.patch() },
            Kind::Find => ParsedIntent::Find {
                filters: message.filters(),
                mine: message.has_any(OWN_LISTING_PHRASES),
            },
            Kind::Help => ParsedIntent::Help,
            Kind::Unknown => ParsedIntent::Unrecognized,
        }
    }
}

#[async_trait]
impl IntentParser for RuleBasedParser {
    async fn parse(&self, text: &str) -> ParsedIntent {
        self.parse_text(text)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Kind {
    Delete,
    Edit,
    Add,
    Find,
    Help,
    Unknown,
}

/// A rent mentioned in the message. `start..end` are the word positions it spans.
#[derive(Clone, Copy, Debug, PartialEq)]
struct Amount {
    value: Decimal,
    start: usize,
    end: usize,
}

struct Message {
    words: Vec<String>,
    text: String,
    padded: String,
    description: Option<String>,
}

impl Message {
    fn new(raw: &str) -> Self {
        let (description, remainder) = split_quoted(raw);
        let words = prepare(&remainder).split_whitespace().map(str::to_string).collect();
        Self::from_words(words, description)
    }

    fn from_words(words: Vec<String>, description: Option<String>) -> Self {
        let text = words.join(" ");
        let padded = format!(" {text} ");
        Self { words, text, padded, description }
    }

    fn slice(&self, range: std::ops::Range<usize>, description: Option<String>) -> Self {
        Self::from_words(self.words[range].to_vec(), description)
    }

    fn has_any(&self, phrases: &[&str]) -> bool {
        phrases.iter().any(|phrase| self.padded.contains(&format!(" {phrase} ")))
    }

    fn follows(&self, position: usize, phrases: &[&str]) -> bool {
        let rest = format!(" {} ", self.words.get(position..).unwrap_or_default().join(" "));
        phrases.iter().any(|phrase| rest.starts_with(&format!(" {phrase} ")))
    }

    fn classify(&self) -> Kind {
        // A patch replaces the whole amenity list, so "remove the AC" has no safe reading.
        if self.removes_amenity() {
            return Kind::Unknown;
        }
        let deletes = self.has_any(DELETE_PHRASES);
        if self.has_any(EDIT_PHRASES)
            || (!deletes
                && self.has_any(DO_IT_PHRASES)
                && (self.room_id().is_some() || self.has_any(RENT_WORDS)))
        {
            return Kind::Edit;
        }
        if deletes {
            return Kind::Delete;
        }
        if self.has_any(ADD_PHRASES) {
            return Kind::Add;
        }

        let has_slots = self.search_location().is_some() || !self.amounts().is_empty();
        if self.has_any(HELP_PHRASES) && !has_slots && !self.has_any(OWN_LISTING_PHRASES) {
            return Kind::Help;
        }
        if self.has_any(FIND_PHRASES) || self.has_any(OWN_LISTING_PHRASES) || has_slots {
            return Kind::Find;
        }
        Kind::Unknown
    }

    /// Word spans `(start, end)` where any of `phrases` occurs.
    fn phrase_spans(&self, phrases: &[&str]) -> Vec<(usize, usize)> {
        let mut spans = Vec::new();
        for start in 0..self.words.len() {
            for phrase in phrases {
                let parts: Vec<&str> = phrase.split_whitespace().collect();
                let end = start + parts.len();
                let found = self.words.get(start..end).is_some_and(|window| {
                    window.iter().zip(&parts).all(|(word, part)| word.as_str() == *part)
                });
                if found {
                    spans.push((start, end));
                }
            }
        }
        spans
    }

    /// "remove the AC" or "AC hatao": the thing removed is an amenity, not a room.
    fn removes_amenity(&self) -> bool {
        self.phrase_spans(DELETE_PHRASES)
            .into_iter()
            .any(|(start, end)| self.amenity_after(end) || self.amenity_before(start))
    }

    fn amenity_after(&self, position: usize) -> bool {
        let mut index = position;
        while self.words.get(index).is_some_and(|word| REMOVAL_FILLERS.contains(&word.as_str())) {
            index += 1;
        }
        self.names_amenity(index..index + 1)
            || (self.names_amenity(index..index + 2) && !self.names_amenity(index + 1..index + 2))
    }

    fn amenity_before(&self, position: usize) -> bool {
        let mut index = position;
        while index > 0 && REMOVAL_FILLERS.contains(&self.words[index - 1].as_str()) {
            index -= 1;
        }
        let Some(near) = index.checked_sub(1) else {
            return false;
        };
        self.names_amenity(near..near + 1)
            || (near > 0
                && self.names_amenity(near - 1..near + 1)
                && !self.names_amenity(near - 1..near))
    }

    fn names_amenity(&self, range: std::ops::Range<usize>) -> bool {
        self.words.get(range).is_some_and(|words| !amenities_in(&words.join(" ")).is_empty())
    }

    fn amounts(&self) -> Vec<Amount> {
        let mut amounts = Vec::new();
        let mut index = 0;
        while index < self.words.len() {
            let Some((number, suffix)) = split_number(&self.words[index]) else {
                index += 1;
                continue;
            };
            if number.chars().filter(char::is_ascii_digit).count() >= 10 {
                index += 1;
                continue;
            }

            let (multiplier, end) = match multiplier(suffix) {
                Some(multiplier) => (Some(multiplier), index + 1),
                None if suffix.is_empty() || CURRENCY_WORDS.contains(&suffix) => {
                    match self.words.get(index + 1).and_then(|next| multiplier(next)) {
                        Some(multiplier) => (Some(multiplier), index + 2),
                        None => (None, index + 1),
                    }
                }
                None => {
                    index += 1;
                    continue;
                }
            };

            let counts_something =
                self.words.get(end).is_some_and(|next| COUNT_WORDS.contains(&next.as_str()));
            let Ok(base) = Decimal::from_str(number) else {
                index = end;
                continue;
            };
            let value = base * multiplier.unwrap_or(Decimal::ONE);
            let plausible = multiplier.is_some() || value >= Decimal::from(MIN_BARE_RENT);
            if plausible && !counts_something {
                amounts.push(Amount { value: value.normalize(), start: index, end });
            }
            index = end;
        }
        amounts
    }

    fn first_amount(&self) -> Option<Decimal> {
        self.amounts().first().map(|amount| amount.value)
    }

    /// `(min_rent, max_rent)` for a search. A bare amount is a budget ceiling.
    fn rent_bounds(&self) -> (Option<Decimal>, Option<Decimal>) {
        let amounts = self.amounts();
        if let [first, second, ..] = amounts.as_slice() {
            let joined = self.words[first.end..second.start].join(" ");
            if self.has_any(&["between"]) || matches!(joined.as_str(), "to" | "and" | "se" | "-")
            {
                return (
                    Some(first.value.min(second.value)),
                    Some(first.value.max(second.value)),
                );
            }
        }

        let (mut min_rent, mut max_rent) = (None, None);
        for amount in &amounts {
            let before = self.word_before(amount.start);
            let before_pair = (self.word_before(amount.start.saturating_sub(1)), before);
            let is_min = MIN_BEFORE.contains(&before)
                || matches!(before_pair, ("more", "than") | ("at", "least"))
                || self.follows(amount.end, MIN_AFTER);
            let is_max = MAX_BEFORE.contains(&before)
                || matches!(before_pair, ("less", "than") | ("up", "to"))
                || self.follows(amount.end, MAX_AFTER);

            if is_min && !is_max {
                min_rent.get_or_insert(amount.value);
            } else {
                max_rent.get_or_insert(amount.value);
            }
        }
        (min_rent, max_rent)
    }

    fn word_before(&self, position: usize) -> &str {
        match position.checked_sub(1).and_then(|index| self.words.get(index)) {
            Some(word) if word == "rs" || word == "inr" => self.word_before(position - 1),
            Some(word) => word.as_str(),
            None => "",
        }
    }

    /// "from 9000 to 9500" or "9000 se 9500": the current rent and the new one.
    fn rent_change(&self) -> Option<(Decimal, Decimal)> {
        let amounts = self.amounts();
        let [old, new, ..] = amounts.as_slice() else {
            return None;
        };
        let from_to = self.word_before(old.start) == "from" && self.word_before(new.start) == "to";
        let hinglish = self.words.get(old.end).is_some_and(|word| word == "se")
            && new.start == old.end + 1;
        (from_to || hinglish).then_some((old.value, new.value))
    }

    fn room_id(&self) -> Option<RoomId> {
        self.words.iter().enumerate().find_map(|(index, word)| {
            let tagged = word.len() > 1
                && word.starts_with('r')
                && word[1..].chars().all(|character| character.is_ascii_digit());
            let after_label = index > 0
                && matches!(self.words[index - 1].as_str(), "room" | "id" | "listing")
                && word.chars().all(|character| character.is_ascii_digit())
                && word.len() <= 3;
            if tagged || after_label {
                RoomId::from_str(word).ok()
            } else {
                None
            }
        })
    }

    fn spots(&self) -> Option<u32> {
        self.words.windows(2).find_map(|pair| match pair {
            [count, unit] if COUNT_WORDS.contains(&unit.as_str()) => count.parse().ok(),
            _ => None,
        })
    }

    fn contact(&self) -> Option<String> {
        self.words.iter().find_map(|word| {
            let all_digits = word.chars().all(|character| character.is_ascii_digit());
            match word.len() {
                10 if all_digits => Some(word.clone()),
                12 if all_digits && word.starts_with("91") => Some(format!("+{word}")),
                _ => None,
            }
        })
    }

    fn gender(&self) -> Option<GenderPreference> {
        if self.has_any(&["any gender"]) {
            return Some(GenderPreference::Any);
        }
        self.words.iter().find_map(|word| {
            let word = word.as_str();
            if FEMALE_WORDS.contains(&word) {
                Some(GenderPreference::Female)
            } else if MALE_WORDS.contains(&word) {
                Some(GenderPreference::Male)
            } else if ANY_GENDER_WORDS.contains(&word) {
                Some(GenderPreference::Any)
            } else {
                None
            }
        })
    }

    fn amenities(&self) -> BTreeSet<String> {
        amenities_in(&self.text).into_iter().collect()
    }

    fn places(&self) -> (Vec<String>, Vec<String>) {
        known_places_in(&self.text).into_iter().partition(|place| !is_city(place))
    }

    /// Most specific place named: a neighbourhood if there is one, else a city.
    fn search_location(&self) -> Option<String> {
        let (areas, cities) = self.places();
        areas
            .into_iter()
            .next()
            .or_else(|| cities.into_iter().next())
            .or_else(|| self.place_phrase())
    }

    /// Every known place named, neighbourhoods first, for storing on a listing.
    fn listing_location(&self) -> Option<String> {
        let (areas, cities) = self.places();
        if areas.is_empty() && cities.is_empty() {
            return self.place_phrase().map(|phrase| display_place(&phrase));
        }
        let parts: Vec<String> =
            areas.iter().chain(cities.iter()).map(|place| display_place(place)).collect();
        Some(parts.join(", "))
    }

    /// Unknown place names: words after "in", "at" or "near", or the word before "mein".
    fn place_phrase(&self) -> Option<String> {
        let usable = |word: &String| {
            !STOP_WORDS.contains(&word.as_str())
                && !word.chars().any(|character| character.is_ascii_digit())
                && !self.is_keyword(word)
        };

        for (index, word) in self.words.iter().enumerate() {
            match word.as_str() {
                "in" | "at" | "near" | "around" => {
                    let phrase: Vec<&str> = self.words[index + 1..]
                        .iter()
                        .take_while(|candidate| usable(candidate))
                        .take(3)
                        .map(String::as_str)
                        .collect();
                    if !phrase.is_empty() {
                        return Some(phrase.join(" "));
                    }
                }
                "mein" | "me" | "में" if index > 0 && usable(&self.words[index - 1]) => {
                    return Some(self.words[index - 1].clone());
                }
                _ => {}
            }
        }
        None
    }

    fn is_keyword(&self, word: &str) -> bool {
        [DELETE_PHRASES, EDIT_PHRASES, ADD_PHRASES, FIND_PHRASES, HELP_PHRASES]
            .iter()
            .any(|phrases| phrases.contains(&word))
    }

    fn limit(&self) -> Option<usize> {
        self.words.windows(2).find_map(|pair| match pair {
            [count, unit] if RESULT_WORDS.contains(&unit.as_str()) => {
                count.parse::<usize>().ok().filter(|count| *count > 0)
            }
            _ => None,
        })
    }

    fn filters(&self) -> RoomFilters {
        let (min_rent, max_rent) = self.rent_bounds();
        RoomFilters {
            location: self.search_location(),
            min_rent,
            max_rent,
            amenities: self.amenities(),
            gender_pref: self.gender(),
            owner_identity: None,
            limit: self.limit(),
        }
    }

    fn patch(&self) -> RoomPatch {
        let amenities = self.amenities();
        RoomPatch {
            location: self.listing_location(),
            rent_amount: self.first_amount(),
            amenities: (!amenities.is_empty()).then_some(amenities),
            description: self.description.clone(),
            contact: self.contact(),
            gender_pref: self.gender(),
            spots_available: self.spots(),
        }
    }

    fn selector_fields(&self) -> SelectorFields {
        SelectorFields { location: self.search_location(), rent_amount: self.first_amount() }
    }

    fn delete_target(&self) -> TargetSlots {
        match self.room_id() {
            Some(id) => TargetSlots::by_id(id),
            None => TargetSlots { room_id: None, fields: self.selector_fields() },
        }
    }

    /// Splits an edit into the room it names and the change it asks for.
    fn edit(&self) -> ParsedIntent {
        if let Some(id) = self.room_id() {
            return ParsedIntent::Edit { target: TargetSlots::by_id(id), fields: self.patch() };
        }

        if let Some((old_rent, new_rent)) = self.rent_change() {
            let fields = RoomPatch { location: None, rent_amount: Some(new_rent), ..self.patch() };
            let target = TargetSlots {
                room_id: None,
                fields: SelectorFields {
                    location: self.search_location(),
                    rent_amount: Some(old_rent),
                },
            };
            return ParsedIntent::Edit { target, fields };
        }

        if let Some(split) = self.split_point() {
            let head = self.slice(0..split, None);
            let tail = self.slice(split + 1..self.words.len(), self.description.clone());
            return ParsedIntent::Edit {
                target: TargetSlots { room_id: None, fields: head.selector_fields() },
                fields: tail.patch(),
            };
        }

        // No marker: the place names the room and everything else is the change.
        let fields = RoomPatch { location: None, ..self.patch() };
        let target = TargetSlots {
            room_id: None,
            fields: SelectorFields { location: self.search_location(), rent_amount: None },
        };
        ParsedIntent::Edit { target, fields }
    }

    fn split_point(&self) -> Option<usize> {
        self.words.iter().enumerate().skip(1).find_map(|(index, word)| {
            let marker = matches!(word.as_str(), "set" | "to" | "ko");
            let previous = self.words[index - 1].as_str();
            let infinitive = matches!(previous, "want" | "need" | "like" | "going" | "have" | "up");
            (marker && !infinitive && index + 1 < self.words.len()).then_some(index)
        })
    }
}

/// Pulls the first quoted span out as a description; the rest is parsed for slots.
fn split_quoted(raw: &str) -> (Option<String>, String) {
    for (open, close) in [('"', '"'), ('“', '”')] {
        let Some(start) = raw.find(open) else {
            continue;
        };
        let after = start + open.len_utf8();
        let Some(length) = raw[after..].find(close) else {
            continue;
        };
        let quoted = raw[after..after + length].trim();
        if quoted.is_empty() {
            continue;
        }
        let remainder = format!("{} {}", &raw[..start], &raw[after + length + close.len_utf8()..]);
        return (Some(quoted.to_string()), remainder);
    }
    (None, raw.to_string())
}

/// Lowercases and strips punctuation, keeping decimal points and digit grouping intact
/// ("₹12,500" -> "12500", "7.5k" stays "7.5k", "#12" -> "r12").
fn prepare(text: &str) -> String {
    let characters: Vec<char> = text.chars().collect();
    let mut prepared = String::with_capacity(text.len());
    for (index, character) in characters.iter().copied().enumerate() {
        let previous_digit = index > 0 && characters[index - 1].is_ascii_digit();
        let next_digit = characters.get(index + 1).is_some_and(|next| next.is_ascii_digit());
        match character {
            ',' if previous_digit && next_digit => {}
            '.' if previous_digit && next_digit => prepared.push('.'),
            '#' if next_digit => prepared.push_str(" r"),
            character if character.is_alphanumeric() || is_combining_mark(character) => {
                prepared.extend(character.to_lowercase());
            }
            _ => prepared.push(' '),
        }
    }
    prepared
}

/// Splits "12.5k" into ("12.5", "k"). "rs500" and "inr500" lose their currency prefix.
fn split_number(word: &str) -> Option<(&str, &str)> {
    let word = ["rs", "inr"]
        .iter()
        .find_map(|prefix| {
            word.strip_prefix(prefix).filter(|rest| rest.starts_with(|c: char| c.is_ascii_digit()))
        })
        .unwrap_or(word);
    if !word.starts_with(|character: char| character.is_ascii_digit()) {
        return None;
    }
    let split = word
        .find(|character: char| !(character.is_ascii_digit() || character == '.'))
        .unwrap_or(word.len());
    Some(word.split_at(split))
}

fn multiplier(word: &str) -> Option<Decimal> {
    match word {
        "k" | "thousand" | "hazar" | "hazaar" | "hajar" | "हजार" | "हज़ार" => {
            Some(Decimal::from(1_000))
        }
        "lakh" | "lakhs" | "lac" | "l" => Some(Decimal::from(100_000)),
        _ => None,
    }
}
