//! Integration tests for the RoomieMatch MCP tools
//!
//! These drive the dispatcher end to end against the in-memory store:
//! - authentication before anything else
//! - the add / find / delete lifecycle
//! - ownership and ambiguity checks for structured and free-text requests
//! - argument validation errors

use std::sync::Arc;

use secrecy::SecretString;
use serde_json::{json, Value};

use roomie_agent::IntentResolver;
use roomie_core::audit::{AuditOutcome, InMemoryAuditSink};
use roomie_core::config::AppConfig;
use roomie_core::errors::{AuthError, ToolError};
use roomie_core::{AuthCredential, AuthGate, RoomFilters, RoomId};
use roomie_db::{connect_with_settings, InMemoryRoomStore, RoomStore, SqlRoomStore};
use roomie_mcp::{McpError, ToolDispatcher, ToolReply};

const TOKEN: &str = "s3cret-token";

struct Harness {
    dispatcher: ToolDispatcher,
    store: Arc<dyn RoomStore>,
    audit: InMemoryAuditSink,
}

fn harness(bound_identity: Option<&str>) -> Harness {
    harness_with_store(bound_identity, Arc::new(InMemoryRoomStore::default()))
}

fn harness_with_store(bound_identity: Option<&str>, store: Arc<dyn RoomStore>) -> Harness {
    let config = AppConfig::default();
    let audit = InMemoryAuditSink::default();
    let gate = AuthGate::new(
        &SecretString::from(TOKEN.to_string()),
        bound_identity.map(str::to_string),
        vec!["ops".to_string()],
    );
    let resolver =
        IntentResolver::rule_based(Arc::clone(&store), &config.resolver, config.listings);
    let dispatcher =
        ToolDispatcher::new(gate, Arc::clone(&store), resolver, Arc::new(audit.clone()));
    Harness { dispatcher, store, audit }
}

fn as_identity(identity: &str) -> AuthCredential {
    AuthCredential::new(TOKEN, Some(identity.to_string()))
}

fn object(value: Value) -> serde_json::Map<String, Value> {
    match value {
        Value::Object(object) => object,
        other => panic!("expected an object, got {other}"),
    }
}

impl Harness {
    async fn call(&self, identity: &str, tool: &str, arguments: Value) -> ToolReply {
        self.dispatcher
            .call(&as_identity(identity), tool, Some(&object(arguments)))
            .await
            .unwrap_or_else(|error| panic!("{tool} failed at protocol level: {error}"))
    }

    async fn active_rooms(&self) -> usize {
        self.store.find(&RoomFilters::default()).await.expect("find").len()
    }
}

#[tokio::test]
async fn wrong_token_is_rejected_and_nothing_changes() {
    let harness = harness(None);
    let arguments = object(json!({ "location": "Koramangala, Bengaluru", "rent_amount": 12000 }));

    let error = harness
        .dispatcher
        .call(
            &AuthCredential::new("guess", Some("alice".to_string())),
            "add_room",
            Some(&arguments),
        )
        .await
        .expect_err("wrong token");
    assert!(matches!(error, McpError::Unauthorized(AuthError::InvalidToken)));
    assert_eq!(error.error_code(), -32001);

    let missing = harness
        .dispatcher
        .call(&AuthCredential::default(), "add_room", Some(&arguments))
        .await
        .expect_err("no token");
    assert!(matches!(missing, McpError::Unauthorized(AuthError::InvalidToken)));

    assert_eq!(harness.active_rooms().await, 0);
    let events = harness.audit.events();
    assert_eq!(events.len(), 2);
    assert!(events.iter().all(|event| event.outcome == AuditOutcome::Rejected));
}

#[tokio::test]
async fn bound_identity_must_match() {
    let harness = harness(Some("+919800000001"));

    let error = harness
        .dispatcher
        .call(&as_identity("+919800000002"), "get_help", None)
        .await
        .expect_err("other identity");
    assert!(matches!(error, McpError::Unauthorized(AuthError::IdentityMismatch)));

    let handshake = harness.call("+91 98000 00001", "validate", json!({})).await;
    assert_eq!(handshake, ToolReply::ok("+919800000001"));
}

#[tokio::test]
async fn koramangala_add_find_delete_find() {
    let harness = harness(None);

    let added = harness
        .call(
            "alice",
            "add_room",
            json!({ "location": "Koramangala, Bengaluru", "rent_amount": 12000 }),
        )
        .await;
    assert!(!added.is_error, "{}", added.text);
    assert!(added.text.contains("`R001`"));

    let found = harness.call("bob", "find_room", json!({ "location": "Koramangala" })).await;
    assert!(found.text.contains("showing 1 result(s)"), "{}", found.text);
    assert!(found.text.contains("₹12000/month"));
    assert!(!found.text.contains("R001"), "ids of other owners stay hidden");

    let deleted = harness.call("alice", "delete_room", json!({ "room_id": "R001" })).await;
    assert!(!deleted.is_error);
    assert!(deleted.text.contains("has been deleted"));

    let after = harness.call("bob", "find_room", json!({ "location": "Koramangala" })).await;
    assert!(after.text.contains("No matching rooms found"));

    let again = harness.call("alice", "delete_room", json!({ "room_id": "R001" })).await;
    assert!(again.is_error);
    assert!(again.text.contains("no active room"));

    assert_eq!(
        harness.audit.event_types(),
        vec!["room.added", "room.deleted", "delete_room.failed"]
    );
    let trail = harness.audit.trail_for(RoomId(1));
    assert_eq!(trail.len(), 2);
    assert!(trail.iter().all(|event| event.actor == "alice"));
}

#[tokio::test]
async fn chat_requests_follow_the_same_lifecycle() {
    let harness = harness(None);

    let added = harness
        .call(
            "alice",
            "chat_room_request",
            json!({ "text": "Add a room in Koramangala, Bengaluru for 12000 with wifi" }),
        )
        .await;
    assert!(!added.is_error, "{}", added.text);

    let found = harness
        .call("bob", "chat_room_request", json!({ "text": "Find rooms in Koramangala under 15k" }))
        .await;
    assert!(found.text.contains("showing 1 result(s)"), "{}", found.text);

    let deleted =
        harness.call("alice", "chat_room_request", json!({ "text": "delete R001" })).await;
    assert!(!deleted.is_error, "{}", deleted.text);
    assert_eq!(harness.active_rooms().await, 0);
}

#[tokio::test]
async fn non_owners_are_forbidden_but_operators_are_not() {
    let harness = harness(None);
    harness
        .call("alice", "add_room", json!({ "location": "HSR Layout", "rent_amount": 9000 }))
        .await;

    let edit = harness
        .call(
            "mallory",
            "edit_room",
            json!({ "room_id": "R001", "fields": { "location": "Somewhere else" } }),
        )
        .await;
    assert!(edit.is_error);
    assert!(edit.text.contains("Permission Denied"));

    let delete = harness.call("mallory", "delete_room", json!({ "room_id": "R001" })).await;
    assert!(delete.is_error);
    assert!(delete.text.contains("Permission Denied"));

    let operator = harness
        .call("ops", "edit_room", json!({ "room_id": "R001", "fields": { "rent_amount": 9500 } }))
        .await;
    assert!(!operator.is_error, "{}", operator.text);
    assert_eq!(harness.active_rooms().await, 1);
}

#[tokio::test]
async fn ambiguous_selector_changes_nothing() {
    let harness = harness(None);
    for rent in [12000, 14000] {
        harness
            .call("alice", "add_room", json!({ "location": "Koramangala", "rent_amount": rent }))
            .await;
    }

    let reply = harness
        .call("alice", "delete_room", json!({ "selector": { "location": "koramangala" } }))
        .await;
    assert!(reply.is_error);
    assert!(reply.text.contains("`R001`, `R002`"), "{}", reply.text);
    assert_eq!(harness.active_rooms().await, 2);

    let narrowed = harness
        .call(
            "alice",
            "edit_room",
            json!({
                "selector": { "location": "koramangala", "rent_amount": 14000 },
                "fields": { "rent_amount": 13500 }
            }),
        )
        .await;
    assert!(!narrowed.is_error, "{}", narrowed.text);
    assert!(narrowed.text.contains("For room `R002`, updated: rent"));
}

#[tokio::test]
async fn invalid_arguments_list_every_field() {
    let harness = harness(None);
    let error = harness
        .dispatcher
        .call(
            &as_identity("alice"),
            "edit_room",
            Some(&object(json!({ "fields": { "rent_amount": -10 }, "colour": "red" }))),
        )
        .await
        .expect_err("invalid");

    assert_eq!(error.error_code(), -32602);
    let McpError::Tool(ToolError::InvalidArguments { fields }) = error else {
        panic!("expected invalid arguments, got {error:?}");
    };
    assert_eq!(fields, vec!["room_id", "selector", "fields.rent_amount", "colour"]);
    assert_eq!(harness.active_rooms().await, 0);
}

#[tokio::test]
async fn unknown_tool_is_a_protocol_error() {
    let harness = harness(None);
    let error = harness
        .dispatcher
        .call(&as_identity("alice"), "book_room", None)
        .await
        .expect_err("unknown");
    assert!(matches!(
        error,
        McpError::Tool(ToolError::UnknownTool { ref name }) if name == "book_room"
    ));
    assert_eq!(error.error_code(), -32602);
}

#[tokio::test]
async fn missing_add_fields_are_asked_for() {
    let harness = harness(None);
    let reply = harness
        .call("alice", "chat_room_request", json!({ "text": "I want to list my room" }))
        .await;
    assert!(reply.is_error);
    assert!(reply.text.contains("please provide"), "{}", reply.text);
    assert_eq!(harness.active_rooms().await, 0);
}

#[tokio::test]
async fn mine_lists_only_the_callers_rooms_with_ids() {
    let harness = harness(None);
    for (owner, rent) in [("alice", 9000), ("bob", 9500)] {
        harness
            .call(owner, "add_room", json!({ "location": "HSR Layout", "rent_amount": rent }))
            .await;
    }

    let mine = harness.call("bob", "find_room", json!({ "mine": "yes" })).await;
    assert!(mine.text.contains("showing 1 result(s)"), "{}", mine.text);
    assert!(mine.text.contains("`R002`"));
    assert!(!mine.text.contains("R001"));
}

#[tokio::test]
async fn unreachable_store_is_an_internal_error_without_details() {
    let pool = connect_with_settings("sqlite::memory:", 1, 5).await.expect("pool should connect");
    let harness = harness_with_store(None, Arc::new(SqlRoomStore::new(pool.clone(), 30)));
    pool.close().await;

    let error = harness
        .dispatcher
        .call(&as_identity("alice"), "find_room", Some(&object(json!({ "location": "HSR" }))))
        .await
        .expect_err("store is down");

    assert_eq!(error.error_code(), -32603);
    assert!(matches!(error, McpError::Internal(_)));
    assert!(error.to_string().contains("temporarily unavailable"), "{error}");
    assert!(!error.to_string().contains("closed"), "{error}");

    let events = harness.audit.events();
    assert_eq!(events.len(), 1);
    assert_eq!(events[0].event_type, "find_room.failed");
    assert_eq!(events[0].outcome, AuditOutcome::Failed);
}
