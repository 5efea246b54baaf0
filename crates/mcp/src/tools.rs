//! MCP tools for RoomieMatch
//!
//! One static table describes every tool: its name, its description, and its arguments. The
//! JSON schema advertised by `tools/list` and the validation applied to `tools/call` are both
//! derived from that table, so they cannot drift apart.
//!
//! Validation never stops at the first problem. Every offending field is collected (nested
//! ones as `fields.rent_amount`) and reported together in `ToolError::InvalidArguments`.

use std::collections::BTreeSet;
use std::str::FromStr;

use rmcp::model::JsonObject;
use rust_decimal::Decimal;
use serde_json::{json, Map, Value};

use roomie_core::domain::room::{
    GenderPreference, RoomDraft, RoomFilters, RoomId, RoomPatch, Selector, SelectorFields,
};
use roomie_core::errors::ToolError;
use roomie_core::normalize::canonical_amenity;

pub const FIND_ROOM: &str = "find_room";
pub const ADD_ROOM: &str = "add_room";
pub const EDIT_ROOM: &str = "edit_room";
pub const DELETE_ROOM: &str = "delete_room";
pub const CHAT_ROOM_REQUEST: &str = "chat_room_request";
pub const GET_HELP: &str = "get_help";
pub const VALIDATE: &str = "validate";

/// All tool names
pub const ALL_TOOL_NAMES: &[&str] =
    &[FIND_ROOM, ADD_ROOM, EDIT_ROOM, DELETE_ROOM, CHAT_ROOM_REQUEST, GET_HELP, VALIDATE];

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ArgKind {
    Text,
    /// Non-negative rupee amount.
    Amount,
    /// Non-negative whole number.
    Count,
    /// Positive whole number; clamped to the configured maximum later.
    Limit,
    /// Set of amenity tags.
    Tags,
    Gender,
    YesNo,
    RoomId,
    /// `{location?, rent_amount?}`
    Selector,
    /// Partial room update.
    Fields,
}

#[derive(Clone, Copy, Debug)]
pub struct ArgSpec {
    pub name: &'static str,
    pub kind: ArgKind,
    pub required: bool,
    pub description: &'static str,
}

impl ArgSpec {
    const fn optional(name: &'static str, kind: ArgKind, description: &'static str) -> Self {
        Self { name, kind, required: false, description }
    }

    const fn required(name: &'static str, kind: ArgKind, description: &'static str) -> Self {
        Self { name, kind, required: true, description }
    }
}

#[derive(Clone, Copy, Debug)]
pub struct ToolSpec {
    pub name: &'static str,
    pub description: &'static str,
    pub args: &'static [ArgSpec],
    /// Arguments of which exactly one must be present.
    pub exactly_one_of: &'static [&'static str],
}

impl ToolSpec {
    pub fn input_schema(&self) -> JsonObject {
        let mut schema = object_schema(self.args);
        if !self.exactly_one_of.is_empty() {
            let alternatives: Vec<Value> =
                self.exactly_one_of.iter().map(|name| json!({ "required": [name] })).collect();
            schema.insert("oneOf".to_string(), Value::Array(alternatives));
        }
        schema
    }
}

const SELECTOR_ARGS: &[ArgSpec] = &[
    ArgSpec::optional("location", ArgKind::Text, "Location of the room to pick"),
    ArgSpec::optional("rent_amount", ArgKind::Amount, "Monthly rent of the room to pick"),
];

const PATCH_ARGS: &[ArgSpec] = &[
    ArgSpec::optional("location", ArgKind::Text, "New location"),
    ArgSpec::optional("rent_amount", ArgKind::Amount, "New monthly rent in rupees"),
    ArgSpec::optional("amenities", ArgKind::Tags, "Replacement set of amenities"),
    ArgSpec::optional("description", ArgKind::Text, "New free-text description"),
    ArgSpec::optional("contact", ArgKind::Text, "New contact details"),
    ArgSpec::optional("gender_pref", ArgKind::Gender, "Who may take the room"),
    ArgSpec::optional("spots_available", ArgKind::Count, "Number of open spots"),
];

const TARGET_ARGS: [ArgSpec; 2] = [
    ArgSpec::optional("room_id", ArgKind::RoomId, "Room ID such as R001"),
    ArgSpec::optional(
        "selector",
        ArgKind::Selector,
        "Pick one of your rooms by location and/or rent instead of by ID",
    ),
];

static TOOLS: &[ToolSpec] = &[
    ToolSpec {
        name: FIND_ROOM,
        description: "Search active room listings by location, rent range, amenities, and \
                      gender preference. Set mine to \"yes\" to list only your own rooms.",
        args: &[
            ArgSpec::optional("location", ArgKind::Text, "Area or city, e.g. Koramangala"),
            ArgSpec::optional("min_rent", ArgKind::Amount, "Lowest monthly rent in rupees"),
            ArgSpec::optional("max_rent", ArgKind::Amount, "Highest monthly rent in rupees"),
            ArgSpec::optional("amenities", ArgKind::Tags, "Amenities every result must have"),
            ArgSpec::optional("gender_pref", ArgKind::Gender, "Seeker's gender"),
            ArgSpec::optional("mine", ArgKind::YesNo, "Only rooms you listed"),
            ArgSpec::optional("limit", ArgKind::Limit, "Maximum number of results"),
        ],
        exactly_one_of: &[],
    },
    ToolSpec {
        name: ADD_ROOM,
        description: "List a new room. Returns the room ID needed to edit or delete it later.",
        args: &[
            ArgSpec::required("location", ArgKind::Text, "Area and city of the room"),
            ArgSpec::required("rent_amount", ArgKind::Amount, "Monthly rent in rupees"),
            ArgSpec::optional("amenities", ArgKind::Tags, "Amenities such as wifi, ac, parking"),
            ArgSpec::optional("description", ArgKind::Text, "Free-text description"),
            ArgSpec::optional("contact", ArgKind::Text, "How seekers should get in touch"),
            ArgSpec::optional("gender_pref", ArgKind::Gender, "Who may take the room"),
            ArgSpec::optional("spots_available", ArgKind::Count, "Number of open spots"),
        ],
        exactly_one_of: &[],
    },
    ToolSpec {
        name: EDIT_ROOM,
        description: "Change fields of one of your listings, chosen by room_id or selector.",
        args: &[
            TARGET_ARGS[0],
            TARGET_ARGS[1],
            ArgSpec::required("fields", ArgKind::Fields, "Fields to change"),
        ],
        exactly_one_of: &["room_id", "selector"],
    },
    ToolSpec {
        name: DELETE_ROOM,
        description: "Remove one of your listings, chosen by room_id or selector.",
        args: &TARGET_ARGS,
        exactly_one_of: &["room_id", "selector"],
    },
    ToolSpec {
        name: CHAT_ROOM_REQUEST,
        description: "Handle a free-text message in English or Hinglish, e.g. \
                      \"HSR layout me 10k se kam ka PG dikhao\".",
        args: &[ArgSpec::required("text", ArgKind::Text, "The user's message")],
        exactly_one_of: &[],
    },
    ToolSpec {
        name: GET_HELP,
        description: "Example commands for searching, listing, and managing rooms.",
        args: &[],
        exactly_one_of: &[],
    },
    ToolSpec {
        name: VALIDATE,
        description: "Connection handshake. Returns the identity this server is bound to.",
        args: &[],
        exactly_one_of: &[],
    },
];

pub fn tool_specs() -> &'static [ToolSpec] {
    TOOLS
}

pub fn find_spec(name: &str) -> Option<&'static ToolSpec> {
    TOOLS.iter().find(|spec| spec.name == name)
}

/// A tool call whose arguments passed validation.
#[derive(Clone, Debug, PartialEq)]
pub enum ToolCall {
    FindRoom { filters: RoomFilters, mine: bool },
    AddRoom { draft: RoomDraft },
    EditRoom { target: Selector, fields: RoomPatch },
    DeleteRoom { target: Selector },
    ChatRoomRequest { text: String },
    GetHelp,
    Validate,
}

/// Validates `arguments` against the named tool. Missing arguments count as `{}`.
pub fn parse_call(name: &str, arguments: Option<&JsonObject>) -> Result<ToolCall, ToolError> {
    let spec =
        find_spec(name).ok_or_else(|| ToolError::UnknownTool { name: name.to_string() })?;
    let empty = JsonObject::new();
    let mut args = ArgReader::new(arguments.unwrap_or(&empty), spec.args, "");

    let call = match spec.name {
        FIND_ROOM => find_room(&mut args),
        ADD_ROOM => add_room(&mut args),
        EDIT_ROOM => {
            let target = args.target();
            let fields = args.patch("fields");
            target.zip(fields).map(|(target, fields)| ToolCall::EditRoom { target, fields })
        }
        DELETE_ROOM => args.target().map(|target| ToolCall::DeleteRoom { target }),
        CHAT_ROOM_REQUEST => {
            args.required_text("text").map(|text| ToolCall::ChatRoomRequest { text })
        }
        GET_HELP => Some(ToolCall::GetHelp),
        _ => Some(ToolCall::Validate),
    };

    let invalid = args.finish();
    match call {
        Some(call) if invalid.is_empty() => Ok(call),
        _ => Err(ToolError::InvalidArguments { fields: invalid }),
    }
}

fn find_room(args: &mut ArgReader<'_>) -> Option<ToolCall> {
    let location = args.text("location");
    let min_rent = args.amount("min_rent");
    let max_rent = args.amount("max_rent");
    let amenities = args.tags("amenities");
    let gender_pref = args.gender("gender_pref");
    let mine = args.yes_no("mine");
    let limit = args.limit("limit");

    if matches!((min_rent, max_rent), (Some(min), Some(max)) if min > max) {
        args.reject("max_rent");
    }

    Some(ToolCall::FindRoom {
        filters: RoomFilters {
            location,
            min_rent,
            max_rent,
            amenities: amenities.unwrap_or_default(),
            gender_pref,
            owner_identity: None,
            limit,
        },
        mine: mine.unwrap_or(false),
    })
}

fn add_room(args: &mut ArgReader<'_>) -> Option<ToolCall> {
    let location = args.required_text("location");
    let rent_amount = args.required_amount("rent_amount");
    let amenities = args.tags("amenities");
    let description = args.text("description");
    let contact = args.text("contact");
    let gender_pref = args.gender("gender_pref");
    let spots_available = args.count("spots_available");

    Some(ToolCall::AddRoom {
        draft: RoomDraft {
            amenities: amenities.unwrap_or_default(),
            description,
            contact,
            gender_pref: gender_pref.unwrap_or_default(),
            spots_available,
            ..RoomDraft::new(location?, rent_amount?)
        },
    })
}

fn object_schema(args: &[ArgSpec]) -> JsonObject {
    let mut properties = Map::new();
    for arg in args {
        let mut property = kind_schema(arg.kind);
        property.insert("description".to_string(), Value::from(arg.description));
        properties.insert(arg.name.to_string(), Value::Object(property));
    }
    let required: Vec<&str> =
        args.iter().filter(|arg| arg.required).map(|arg| arg.name).collect();

    let mut schema = Map::new();
    schema.insert("type".to_string(), json!("object"));
    schema.insert("properties".to_string(), Value::Object(properties));
    if !required.is_empty() {
        schema.insert("required".to_string(), json!(required));
    }
    schema.insert("additionalProperties".to_string(), json!(false));
    schema
}

fn kind_schema(kind: ArgKind) -> JsonObject {
    let schema = match kind {
        ArgKind::Text => json!({ "type": "string" }),
        ArgKind::Amount => json!({ "type": "number", "minimum": 0 }),
        ArgKind::Count => json!({ "type": "integer", "minimum": 0 }),
        ArgKind::Limit => json!({ "type": "integer", "minimum": 1 }),
        ArgKind::Tags => {
            json!({ "type": "array", "items": { "type": "string" }, "uniqueItems": true })
        }
        ArgKind::Gender => json!({ "type": "string", "enum": ["any", "male", "female"] }),
        ArgKind::YesNo => json!({ "type": "string", "enum": ["yes", "no"] }),
        ArgKind::RoomId => json!({ "type": "string", "pattern": "^[#Rr]?[0-9]+$" }),
        ArgKind::Selector => return object_schema(SELECTOR_ARGS),
        ArgKind::Fields => {
            let mut schema = object_schema(PATCH_ARGS);
            schema.insert("minProperties".to_string(), json!(1));
            return schema;
        }
    };
    match schema {
        Value::Object(schema) => schema,
        _ => JsonObject::new(),
    }
}

/// Reads typed values out of one JSON object, remembering every field that was wrong.
struct ArgReader<'a> {
    object: &'a JsonObject,
    allowed: &'static [ArgSpec],
    prefix: &'static str,
    invalid: Vec<String>,
}

impl<'a> ArgReader<'a> {
    fn new(object: &'a JsonObject, allowed: &'static [ArgSpec], prefix: &'static str) -> Self {
        Self { object, allowed, prefix, invalid: Vec::new() }
    }

    fn reject(&mut self, name: &str) {
        let path = format!("{}{name}", self.prefix);
        if !self.invalid.contains(&path) {
            self.invalid.push(path);
        }
    }

    /// `null` counts as absent.
    fn value(&self, name: &str) -> Option<&'a Value> {
        self.object.get(name).filter(|value| !value.is_null())
    }

    fn read<T>(&mut self, name: &str, convert: impl FnOnce(&'a Value) -> Option<T>) -> Option<T> {
        let value = self.value(name)?;
        let converted = convert(value);
        if converted.is_none() {
            self.reject(name);
        }
        converted
    }

    fn required<T>(
        &mut self,
        name: &str,
        read: impl FnOnce(&mut Self, &str) -> Option<T>,
    ) -> Option<T> {
        let before = self.invalid.len();
        let value = read(self, name);
        if value.is_none() && self.invalid.len() == before {
            self.reject(name);
        }
        value
    }

    /// Blank strings count as absent.
    fn text(&mut self, name: &str) -> Option<String> {
        self.read(name, |value| value.as_str().map(|text| text.trim().to_string()))
            .filter(|text| !text.is_empty())
    }

    fn required_text(&mut self, name: &str) -> Option<String> {
        self.required(name, Self::text)
    }

    fn amount(&mut self, name: &str) -> Option<Decimal> {
        self.read(name, |value| {
            let amount = match value {
                Value::Number(number) => decimal(&number.to_string()),
                Value::String(text) => decimal(text.trim()),
                _ => None,
            }?;
            (!amount.is_sign_negative()).then_some(amount)
        })
    }

    fn required_amount(&mut self, name: &str) -> Option<Decimal> {
        self.required(name, Self::amount)
    }

    fn count(&mut self, name: &str) -> Option<u32> {
        self.read(name, |value| value.as_u64().and_then(|count| u32::try_from(count).ok()))
    }

    fn limit(&mut self, name: &str) -> Option<usize> {
        self.read(name, |value| {
            value.as_u64().filter(|limit| *limit > 0).and_then(|limit| usize::try_from(limit).ok())
        })
    }

    /// An array of strings, or one comma-separated string.
    fn tags(&mut self, name: &str) -> Option<BTreeSet<String>> {
        self.read(name, |value| {
            let raw: Vec<&str> = match value {
                Value::Array(items) => {
                    items.iter().map(Value::as_str).collect::<Option<Vec<_>>>()?
                }
                Value::String(text) => text.split(',').collect(),
                _ => return None,
            };
            Some(
                raw.into_iter()
                    .map(canonical_amenity)
                    .filter(|amenity| !amenity.is_empty())
                    .collect(),
            )
        })
    }

    fn gender(&mut self, name: &str) -> Option<GenderPreference> {
        self.read(name, |value| value.as_str()?.parse::<GenderPreference>().ok())
    }

    fn yes_no(&mut self, name: &str) -> Option<bool> {
        self.read(name, |value| match value {
            Value::Bool(flag) => Some(*flag),
            Value::String(text) => match text.trim().to_ascii_lowercase().as_str() {
                "yes" | "y" | "true" => Some(true),
                "no" | "n" | "false" => Some(false),
                _ => None,
            },
            _ => None,
        })
    }

    fn room_id(&mut self, name: &str) -> Option<RoomId> {
        self.read(name, |value| match value {
            Value::String(text) => text.trim().parse::<RoomId>().ok(),
            Value::Number(number) => number.as_u64().map(RoomId),
            _ => None,
        })
    }

    fn object(&mut self, name: &str) -> Option<&'a JsonObject> {
        self.read(name, Value::as_object)
    }

    /// Exactly one of `room_id` and `selector`.
    fn target(&mut self) -> Option<Selector> {
        let has_id = self.value("room_id").is_some();
        let has_selector = self.value("selector").is_some();
        if has_id == has_selector {
            self.reject("room_id");
            self.reject("selector");
            return None;
        }

        if has_id {
            return self.room_id("room_id").map(Selector::Id);
        }
        let object = self.object("selector")?;
        let mut nested = ArgReader::new(object, SELECTOR_ARGS, "selector.");
        let fields = SelectorFields {
            location: nested.text("location"),
            rent_amount: nested.amount("rent_amount"),
        };
        let invalid = nested.finish();
        if invalid.is_empty() {
            Some(Selector::Match(fields))
        } else {
            self.invalid.extend(invalid);
            None
        }
    }

    /// A non-empty partial update under `name`.
    fn patch(&mut self, name: &str) -> Option<RoomPatch> {
        let object = self.required(name, Self::object)?;
        let mut nested = ArgReader::new(object, PATCH_ARGS, "fields.");
        let patch = RoomPatch {
            location: nested.text("location"),
            rent_amount: nested.amount("rent_amount"),
            amenities: nested.tags("amenities"),
            description: nested.text("description"),
            contact: nested.text("contact"),
            gender_pref: nested.gender("gender_pref"),
            spots_available: nested.count("spots_available"),
        };
        let invalid = nested.finish();
        if !invalid.is_empty() {
            self.invalid.extend(invalid);
            return None;
        }
        if patch.is_empty() {
            self.reject(name);
            return None;
        }
        Some(patch)
    }

    /// Offending paths, with unknown keys last.
    fn finish(mut self) -> Vec<String> {
        let unknown: Vec<String> = self
            .object
            .keys()
            .filter(|key| !self.allowed.iter().any(|arg| arg.name == key.as_str()))
            .cloned()
            .collect();
        for key in unknown {
            self.reject(&key);
        }
        self.invalid
    }
}

fn decimal(text: &str) -> Option<Decimal> {
    Decimal::from_str(text).ok().or_else(|| Decimal::from_scientific(text).ok())
}

#[cfg(test)]
mod tests {
    use rust_decimal::Decimal;
    use serde_json::{json, Value};

    use roomie_core::domain::room::{GenderPreference, RoomId, Selector, SelectorFields};
    use roomie_core::errors::ToolError;

    use super::*;

    fn args(value: Value) -> JsonObject {
        match value {
            Value::Object(object) => object,
            other => panic!("expected an object, got {other}"),
        }
    }

    fn invalid_fields(name: &str, value: Value) -> Vec<String> {
        match parse_call(name, Some(&args(value))) {
            Err(ToolError::InvalidArguments { fields }) => fields,
            other => panic!("expected invalid arguments, got {other:?}"),
        }
    }

    #[test]
    fn test_tool_counts() {
        assert_eq!(tool_specs().len(), ALL_TOOL_NAMES.len());
        for name in ALL_TOOL_NAMES {
            assert!(find_spec(name).is_some(), "{name} is registered");
        }
    }

    #[test]
    fn schemas_mark_required_arguments() {
        let schema = find_spec(ADD_ROOM).expect("add_room").input_schema();
        assert_eq!(schema["type"], "object");
        assert_eq!(schema["required"], json!(["location", "rent_amount"]));
        assert_eq!(schema["additionalProperties"], json!(false));
        assert_eq!(schema["properties"]["rent_amount"]["minimum"], json!(0));

        let edit = find_spec(EDIT_ROOM).expect("edit_room").input_schema();
        assert_eq!(edit["oneOf"], json!([{ "required": ["room_id"] }, { "required": ["selector"] }]));
        assert_eq!(edit["properties"]["fields"]["minProperties"], json!(1));
        assert!(edit["properties"]["selector"]["properties"]["location"].is_object());

        let help = find_spec(GET_HELP).expect("get_help").input_schema();
        assert!(help.get("required").is_none());
    }

    #[test]
    fn unknown_tool_is_reported_by_name() {
        assert_eq!(
            parse_call("book_room", None),
            Err(ToolError::UnknownTool { name: "book_room".to_string() })
        );
    }

    #[test]
    fn add_room_reports_every_offending_field() {
        let fields = invalid_fields(
            ADD_ROOM,
            json!({ "rent_amount": -5, "gender_pref": "robots", "pets": true }),
        );
        assert_eq!(fields, vec!["location", "rent_amount", "gender_pref", "pets"]);
    }

    #[test]
    fn add_room_accepts_numeric_strings_and_tag_strings() {
        let call = parse_call(
            ADD_ROOM,
            Some(&args(json!({
                "location": " Koramangala, Bengaluru ",
                "rent_amount": "12000",
                "amenities": "WiFi, AC",
                "gender_pref": "girls",
                "spots_available": 2
            }))),
        )
        .expect("valid add");
        let ToolCall::AddRoom { draft } = call else {
            panic!("expected add, got {call:?}");
        };
        assert_eq!(draft.location, "Koramangala, Bengaluru");
        assert_eq!(draft.rent_amount, Decimal::from(12_000));
        assert_eq!(draft.gender_pref, GenderPreference::Female);
        assert_eq!(draft.spots_available, Some(2));
        assert_eq!(draft.amenities.len(), 2);
    }

    #[test]
    fn edit_room_reports_nested_paths() {
        let fields = invalid_fields(
            EDIT_ROOM,
            json!({ "room_id": "R001", "fields": { "rent_amount": -1, "colour": "blue" } }),
        );
        assert_eq!(fields, vec!["fields.rent_amount", "fields.colour"]);
    }

    #[test]
    fn edit_room_needs_a_non_empty_patch() {
        let fields = invalid_fields(EDIT_ROOM, json!({ "room_id": "R001", "fields": {} }));
        assert_eq!(fields, vec!["fields"]);

        let fields = invalid_fields(EDIT_ROOM, json!({ "room_id": "R001" }));
        assert_eq!(fields, vec!["fields"]);
    }

    #[test]
    fn exactly_one_target_is_required() {
        let neither = invalid_fields(DELETE_ROOM, json!({}));
        assert_eq!(neither, vec!["room_id", "selector"]);

        let both = invalid_fields(
            DELETE_ROOM,
            json!({ "room_id": "R001", "selector": { "location": "HSR" } }),
        );
        assert_eq!(both, vec!["room_id", "selector"]);

        let bad_id = invalid_fields(DELETE_ROOM, json!({ "room_id": "room one" }));
        assert_eq!(bad_id, vec!["room_id"]);
    }

    #[test]
    fn delete_by_id_or_selector() {
        let by_id = parse_call(DELETE_ROOM, Some(&args(json!({ "room_id": "#7" }))));
        assert_eq!(by_id, Ok(ToolCall::DeleteRoom { target: Selector::Id(RoomId(7)) }));

        let by_fields = parse_call(
            DELETE_ROOM,
            Some(&args(json!({ "selector": { "location": "HSR Layout", "rent_amount": 9000 } }))),
        );
        assert_eq!(
            by_fields,
            Ok(ToolCall::DeleteRoom {
                target: Selector::Match(SelectorFields {
                    location: Some("HSR Layout".to_string()),
                    rent_amount: Some(Decimal::from(9_000)),
                }),
            })
        );

        let bad_selector =
            invalid_fields(DELETE_ROOM, json!({ "selector": { "rent_amount": "cheap" } }));
        assert_eq!(bad_selector, vec!["selector.rent_amount"]);
    }

    #[test]
    fn find_room_parses_filters() {
        let call = parse_call(
            FIND_ROOM,
            Some(&args(json!({
                "location": "Koramangala",
                "max_rent": 15000,
                "mine": "yes",
                "limit": 3,
                "gender_pref": null
            }))),
        )
        .expect("valid find");
        let ToolCall::FindRoom { filters, mine } = call else {
            panic!("expected find, got {call:?}");
        };
        assert!(mine);
        assert_eq!(filters.location.as_deref(), Some("Koramangala"));
        assert_eq!(filters.max_rent, Some(Decimal::from(15_000)));
        assert_eq!(filters.limit, Some(3));
        assert_eq!(filters.gender_pref, None);
    }

    #[test]
    fn find_room_rejects_inverted_range_and_bad_enums() {
        let fields = invalid_fields(
            FIND_ROOM,
            json!({ "min_rent": 20000, "max_rent": 10000, "mine": "maybe", "limit": 0 }),
        );
        assert_eq!(fields, vec!["mine", "limit", "max_rent"]);
    }

    #[test]
    fn chat_request_needs_text() {
        assert_eq!(invalid_fields(CHAT_ROOM_REQUEST, json!({ "text": "   " })), vec!["text"]);
        assert_eq!(invalid_fields(CHAT_ROOM_REQUEST, json!({ "text": 42 })), vec!["text"]);
        assert_eq!(
            parse_call(CHAT_ROOM_REQUEST, Some(&args(json!({ "text": " help " })))),
            Ok(ToolCall::ChatRoomRequest { text: "help".to_string() })
        );
    }

    #[test]
    fn argument_free_tools_reject_extras() {
        assert_eq!(parse_call(GET_HELP, None), Ok(ToolCall::GetHelp));
        assert_eq!(parse_call(VALIDATE, Some(&JsonObject::new())), Ok(ToolCall::Validate));
        assert_eq!(invalid_fields(VALIDATE, json!({ "verbose": true })), vec!["verbose"]);
    }
}
