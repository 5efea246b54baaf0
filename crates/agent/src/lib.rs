//! Intent resolution for room-listing messages.
//!
//! This crate turns a free-text chat message into a [`StructuredRequest`] the store can
//! execute, and turns store outcomes back into chat replies:
//! - `conversation` holds the deterministic keyword and slot rules (English, Hinglish and
//!   Devanagari vocabulary)
//! - `llm` holds the model-backed parser and its HTTP client
//! - `guardrails` holds the [`TargetGuard`] that decides which room an edit or delete names
//! - `intent` ties a parser and the guard together in the [`IntentResolver`]
//! - `reply` renders outcomes as Markdown
//!
//! # Safety Principle
//!
//! A language model is only ever a translator. It never decides which room is modified or
//! who may modify it; the guard and the store make those decisions deterministically.

pub mod conversation;
pub mod guardrails;
pub mod intent;
pub mod llm;
pub mod reply;

pub use conversation::RuleBasedParser;
pub use guardrails::TargetGuard;
pub use intent::{IntentParser, IntentResolver, ParsedIntent, StructuredRequest, TargetSlots};
pub use llm::{HttpLlmClient, LlmClient, LlmIntentParser};
pub use reply::{Outcome, ResponseFormatter};
