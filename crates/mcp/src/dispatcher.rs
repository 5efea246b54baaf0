use std::sync::Arc;

use rmcp::model::JsonObject;
use tracing::{error, info, warn};
use uuid::Uuid;

use roomie_agent::{IntentResolver, Outcome, ResponseFormatter, StructuredRequest};
use roomie_core::audit::{AuditEvent, AuditSink, ListingChange};
use roomie_core::auth::{AuthCredential, AuthGate, Caller};
use roomie_core::errors::{IntentError, StoreError};
use roomie_db::RoomStore;

use crate::tools::{self, ToolCall};
use crate::{McpError, McpResult};

/// Text returned to the chat agent. `is_error` marks replies for failed requests; they are
/// still ordinary tool results, not protocol errors.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ToolReply {
    pub text: String,
    pub is_error: bool,
}

impl ToolReply {
    pub fn ok(text: impl Into<String>) -> Self {
        Self { text: text.into(), is_error: false }
    }

    pub fn error(text: impl Into<String>) -> Self {
        Self { text: text.into(), is_error: true }
    }
}

/// Routes validated tool calls to the resolver and the store.
///
/// Structured edits and deletes pass through the same [`TargetGuard`](roomie_agent::TargetGuard)
/// as free-text ones, so a selector can never pick a room the caller could not name by id.
#[derive(Clone)]
pub struct ToolDispatcher {
    gate: AuthGate,
    store: Arc<dyn RoomStore>,
    resolver: Arc<IntentResolver>,
    formatter: ResponseFormatter,
    audit: Arc<dyn AuditSink>,
}

impl ToolDispatcher {
    pub fn new(
        gate: AuthGate,
        store: Arc<dyn RoomStore>,
        resolver: IntentResolver,
        audit: Arc<dyn AuditSink>,
    ) -> Self {
        Self {
            gate,
            store,
            resolver: Arc::new(resolver),
            formatter: ResponseFormatter::new(),
            audit,
        }
    }

    pub fn gate(&self) -> &AuthGate {
        &self.gate
    }

    pub fn store(&self) -> &Arc<dyn RoomStore> {
        &self.store
    }

    /// Authorizes `credential`, then dispatches. A rejected call never reaches the store.
    pub async fn call(
        &self,
        credential: &AuthCredential,
        tool: &str,
        arguments: Option<&JsonObject>,
    ) -> McpResult<ToolReply> {
        let correlation_id = Uuid::new_v4().to_string();
        let caller = match self.gate.authorize(credential) {
            Ok(caller) => caller,
            Err(rejection) => {
                warn!(
                    event_name = "mcp.auth.rejected",
                    correlation_id = %correlation_id,
                    tool,
                    reason = %rejection,
                    "tool call rejected"
                );
                self.audit.emit(AuditEvent::auth_rejected(
                    tool,
                    credential.identity.as_deref(),
                    &correlation_id,
                ));
                return Err(rejection.into());
            }
        };

        self.dispatch_with(&caller, tool, arguments, correlation_id).await
    }

    /// Dispatches for a caller that has already been authorized.
    pub async fn dispatch(
        &self,
        caller: &Caller,
        tool: &str,
        arguments: Option<&JsonObject>,
    ) -> McpResult<ToolReply> {
        self.dispatch_with(caller, tool, arguments, Uuid::new_v4().to_string()).await
    }

    async fn dispatch_with(
        &self,
        caller: &Caller,
        tool: &str,
        arguments: Option<&JsonObject>,
        correlation_id: String,
    ) -> McpResult<ToolReply> {
        let call = tools::parse_call(tool, arguments).map_err(|rejection| {
            warn!(
                event_name = "mcp.tool.invalid",
                correlation_id = %correlation_id,
                tool,
                error = %rejection,
                "tool call rejected before dispatch"
            );
            rejection
        })?;

        info!(
            event_name = "mcp.tool.called",
            correlation_id = %correlation_id,
            tool,
            caller = %caller.identity,
            "dispatching tool call"
        );

        let reply = match call {
            ToolCall::FindRoom { mut filters, mine } => {
                if mine {
                    filters.owner_identity = Some(caller.identity.clone());
                }
                filters.limit = Some(self.resolver.listings().clamp_limit(filters.limit));
                self.execute(caller, StructuredRequest::FindRoom { filters }, &correlation_id)
                    .await?
            }
            ToolCall::AddRoom { draft } => {
                self.execute(caller, StructuredRequest::AddRoom { fields: draft }, &correlation_id)
                    .await?
            }
            ToolCall::EditRoom { target, fields } => {
                match self.resolver.guard().check_selector(target, caller).await {
                    Ok(target) => {
                        let request = StructuredRequest::EditRoom { target, fields };
                        self.execute(caller, request, &correlation_id).await?
                    }
                    Err(rejection) => self.intent_rejected(caller, &rejection, &correlation_id),
                }
            }
            ToolCall::DeleteRoom { target } => {
                match self.resolver.guard().check_selector(target, caller).await {
                    Ok(target) => {
                        let request = StructuredRequest::DeleteRoom { target };
                        self.execute(caller, request, &correlation_id).await?
                    }
                    Err(rejection) => self.intent_rejected(caller, &rejection, &correlation_id),
                }
            }
            ToolCall::ChatRoomRequest { text } => match self.resolver.resolve(&text, caller).await {
                Ok(request) => self.execute(caller, request, &correlation_id).await?,
                Err(rejection) => self.intent_rejected(caller, &rejection, &correlation_id),
            },
            ToolCall::GetHelp => ToolReply::ok(self.formatter.help()),
            ToolCall::Validate => {
                ToolReply::ok(self.gate.bound_identity().unwrap_or(&caller.identity))
            }
        };

        Ok(reply)
    }

    /// Runs a resolved request. Refusals are chat replies; an unreachable store is the one
    /// store failure that becomes a protocol error, with a generic message.
    async fn execute(
        &self,
        caller: &Caller,
        request: StructuredRequest,
        correlation_id: &str,
    ) -> McpResult<ToolReply> {
        let kind = request.kind();
        let supplied = match &request {
            StructuredRequest::EditRoom { target, .. }
            | StructuredRequest::DeleteRoom { target } => Some(target.clone()),
            _ => None,
        };

        let result = match request {
            StructuredRequest::FindRoom { filters } => {
                self.store.find(&filters).await.map(Outcome::Found)
            }
            StructuredRequest::AddRoom { fields } => {
                self.store.add(fields, caller).await.map(Outcome::Added)
            }
            StructuredRequest::EditRoom { target, fields } => {
                let edited = self.store.edit(&target, &fields, caller).await;
                edited.map(|room| Outcome::Edited { room, patch: fields })
            }
            StructuredRequest::DeleteRoom { target } => {
                self.store.delete(&target, caller).await.map(Outcome::Deleted)
            }
            StructuredRequest::Help => Ok(Outcome::Help),
            StructuredRequest::Unrecognized { text } => Ok(Outcome::Unrecognized { text }),
        };

        match result {
            Ok(outcome) => {
                self.record_mutation(caller, kind, &outcome, correlation_id);
                Ok(ToolReply::ok(self.formatter.outcome(caller, supplied.as_ref(), &outcome)))
            }
            Err(failure) => {
                self.store_failed(caller, kind, &failure, correlation_id);
                let text = self.formatter.store_error(supplied.as_ref(), &failure);
                if failure.is_caller_fault() {
                    Ok(ToolReply::error(text))
                } else {
                    Err(McpError::Internal(text))
                }
            }
        }
    }

    fn record_mutation(
        &self,
        caller: &Caller,
        kind: &str,
        outcome: &Outcome,
        correlation_id: &str,
    ) {
        let (room_id, change) = match outcome {
            Outcome::Added(room) => (room.id, ListingChange::Added),
            Outcome::Edited { room, .. } => (room.id, ListingChange::Edited),
            Outcome::Deleted(id) => (*id, ListingChange::Deleted),
            _ => return,
        };
        info!(
            event_name = change.event_type(),
            correlation_id,
            room_id = %room_id,
            caller = %caller.identity,
            "listing changed"
        );
        self.audit.emit(AuditEvent::listing_changed(
            change,
            room_id,
            caller.identity.clone(),
            correlation_id,
            kind,
        ));
    }

    fn store_failed(
        &self,
        caller: &Caller,
        kind: &str,
        failure: &StoreError,
        correlation_id: &str,
    ) {
        if failure.is_caller_fault() {
            warn!(
                event_name = "mcp.store.rejected",
                correlation_id,
                intent = kind,
                caller = %caller.identity,
                error = %failure,
                "store refused request"
            );
        } else {
            error!(
                event_name = "mcp.store.unavailable",
                correlation_id,
                intent = kind,
                error = %failure,
                "room store failed"
            );
        }

        self.audit.emit(AuditEvent::listing_refused(
            kind,
            failure,
            caller.identity.clone(),
            correlation_id,
        ));
    }

    fn intent_rejected(
        &self,
        caller: &Caller,
        rejection: &IntentError,
        correlation_id: &str,
    ) -> ToolReply {
        info!(
            event_name = "mcp.intent.rejected",
            correlation_id,
            caller = %caller.identity,
            reason = %rejection,
            "request needs clarification"
        );
        ToolReply::error(self.formatter.intent_error(rejection))
    }
}

