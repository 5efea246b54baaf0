use std::collections::BTreeSet;
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{anyhow, bail, Context, Result};
use async_trait::async_trait;
use rust_decimal::Decimal;
use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;
use serde_json::json;
use tracing::warn;

use roomie_core::config::{LlmConfig, LlmProvider};
use roomie_core::domain::room::{
    GenderPreference, RoomFilters, RoomId, RoomPatch, SelectorFields,
};
use roomie_core::normalize::canonical_amenity;

use crate::conversation::RuleBasedParser;
use crate::intent::{IntentParser, ParsedIntent, TargetSlots};

#[async_trait]
pub trait LlmClient: Send + Sync {
    async fn complete(&self, prompt: &str) -> Result<String>;
}

/// Chat-completions client for OpenAI and for Ollama's OpenAI-compatible endpoint.
pub struct HttpLlmClient {
    client: reqwest::Client,
    endpoint: String,
    api_key: Option<SecretString>,
    model: String,
}

impl HttpLlmClient {
    pub fn from_config(config: &LlmConfig) -> Result<Self> {
        let base_url = config.base_url.clone().unwrap_or_else(|| match config.provider {
            LlmProvider::OpenAi => "https://api.openai.com".to_string(),
            LlmProvider::Ollama => "http://localhost:11434".to_string(),
        });
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .context("failed to build llm http client")?;

        Ok(Self {
            client,
            endpoint: format!("{}/v1/chat/completions", base_url.trim_end_matches('/')),
            api_key: config.api_key.clone(),
            model: config.model.clone(),
        })
    }
}

#[derive(Deserialize)]
struct ChatCompletion {
    choices: Vec<ChatChoice>,
}

#[derive(Deserialize)]
struct ChatChoice {
    message: ChatMessage,
}

#[derive(Deserialize)]
struct ChatMessage {
    content: String,
}

#[async_trait]
impl LlmClient for HttpLlmClient {
    async fn complete(&self, prompt: &str) -> Result<String> {
        let body = json!({
            "model": self.model,
            "temperature": 0,
            "messages": [
                { "role": "system", "content": SYSTEM_PROMPT },
                { "role": "user", "content": prompt },
            ],
        });

        let mut request = self.client.post(&self.endpoint).json(&body);
        if let Some(api_key) = &self.api_key {
            request = request.bearer_auth(api_key.expose_secret());
        }

        let response = request.send().await.context("llm request failed")?;
        if !response.status().is_success() {
            let status = response.status();
            warn!(event_name = "agent.llm.http_error", status = %status, "llm returned an error");
            bail!("llm returned {status}");
        }

        let completion: ChatCompletion =
            response.json().await.context("llm response was not a chat completion")?;
        completion
            .choices
            .into_iter()
            .next()
            .map(|choice| choice.message.content)
            .ok_or_else(|| anyhow!("llm returned no choices"))
    }
}

const SYSTEM_PROMPT: &str = "You classify messages about rental room listings in India. \
Messages may mix English and Hindi, romanized or in Devanagari. \
Reply with one JSON object and nothing else.";

fn build_prompt(text: &str) -> String {
    format!(
        r#"Classify the message into one intent: find, add, edit, delete, help or unrecognized.
Return JSON with these keys (omit keys that are not mentioned):
{{"intent": "...", "room_id": "R001", "location": "...", "min_rent": 0, "max_rent": 0,
  "rent_amount": 0, "amenities": ["wifi"], "gender": "male|female|any", "spots": 1,
  "description": "...", "contact": "...", "mine": false,
  "target": {{"location": "...", "rent_amount": 0}}}}
For edit, "target" describes the room as it is now and the other keys describe the change.
Rents are monthly amounts in rupees as plain numbers (15k = 15000).

Message: {text}"#
    )
}

#[derive(Debug, Default, Deserialize)]
struct IntentPayload {
    intent: String,
    #[serde(default)]
    room_id: Option<String>,
    #[serde(default)]
    location: Option<String>,
    #[serde(default)]
    min_rent: Option<Decimal>,
    #[serde(default)]
    max_rent: Option<Decimal>,
    #[serde(default)]
    rent_amount: Option<Decimal>,
    #[serde(default)]
    amenities: Vec<String>,
    #[serde(default)]
    gender: Option<String>,
    #[serde(default)]
    spots: Option<u32>,
    #[serde(default)]
    description: Option<String>,
    #[serde(default)]
    contact: Option<String>,
    #[serde(default)]
    mine: bool,
    #[serde(default)]
    target: Option<TargetPayload>,
}

#[derive(Debug, Default, Deserialize)]
struct TargetPayload {
    #[serde(default)]
    location: Option<String>,
    #[serde(default)]
    rent_amount: Option<Decimal>,
}

impl IntentPayload {
    fn gender(&self) -> Result<Option<GenderPreference>> {
        self.gender
            .as_deref()
            .filter(|value| !value.trim().is_empty())
            .map(GenderPreference::from_str)
            .transpose()
            .map_err(|error| anyhow!(error))
    }

    fn canonical_amenities(&self) -> BTreeSet<String> {
        self.amenities.iter().map(|amenity| canonical_amenity(amenity)).collect()
    }

    fn patch(&self) -> Result<RoomPatch> {
        let amenities = self.canonical_amenities();
        Ok(RoomPatch {
            location: non_blank(&self.location),
            rent_amount: self.rent_amount,
            amenities: (!self.amenities.is_empty()).then_some(amenities),
            description: non_blank(&self.description),
            contact: non_blank(&self.contact),
            gender_pref: self.gender()?,
            spots_available: self.spots,
        })
    }

    fn target(&self, fallback_to_fields: bool) -> Result<TargetSlots> {
        if let Some(room_id) = self.room_id.as_deref().filter(|value| !value.trim().is_empty()) {
            let id = RoomId::from_str(room_id).map_err(|error| anyhow!(error))?;
            return Ok(TargetSlots::by_id(id));
        }
        let fields = match &self.target {
            Some(target) => SelectorFields {
                location: non_blank(&target.location),
                rent_amount: target.rent_amount,
            },
            None if fallback_to_fields => SelectorFields {
                location: non_blank(&self.location),
                rent_amount: self.rent_amount,
            },
            None => SelectorFields::default(),
        };
        Ok(TargetSlots { room_id: None, fields })
    }

    fn into_intent(self) -> Result<ParsedIntent> {
        let intent = match self.intent.trim().to_ascii_lowercase().as_str() {
            "find" | "search" => ParsedIntent::Find {
                filters: RoomFilters {
                    location: non_blank(&self.location),
                    min_rent: self.min_rent,
                    max_rent: self.max_rent.or(self.rent_amount),
                    amenities: self.canonical_amenities(),
                    gender_pref: self.gender()?,
                    owner_identity: None,
                    limit: None,
                },
                mine: self.mine,
            },
            "add" => ParsedIntent::Add { fields: self.patch()? },
            "edit" | "update" => {
                ParsedIntent::Edit { target: self.target(false)?, fields: self.patch()? }
            }
            "delete" | "remove" => ParsedIntent::Delete { target: self.target(true)? },
            "help" => ParsedIntent::Help,
            "unrecognized" | "unknown" | "other" => ParsedIntent::Unrecognized,
            other => bail!("unknown intent `{other}`"),
        };
        Ok(intent)
    }
}

fn non_blank(value: &Option<String>) -> Option<String> {
    value.as_deref().map(str::trim).filter(|value| !value.is_empty()).map(str::to_string)
}

/// The JSON object inside a model reply, tolerating code fences and chatter around it.
fn parse_reply(reply: &str) -> Result<ParsedIntent> {
    let start = reply.find('{').ok_or_else(|| anyhow!("no json object in reply"))?;
    let end = reply.rfind('}').ok_or_else(|| anyhow!("unterminated json object in reply"))?;
    if end < start {
        bail!("unterminated json object in reply");
    }
    let payload: IntentPayload =
        serde_json::from_str(&reply[start..=end]).context("reply is not an intent payload")?;
    payload.into_intent()
}

/// Asks a language model for the intent. Client failures and unusable replies fall back to
/// the keyword rules, so a message always gets a parse.
pub struct LlmIntentParser {
    client: Arc<dyn LlmClient>,
    fallback: RuleBasedParser,
}

impl LlmIntentParser {
    pub fn new(client: Arc<dyn LlmClient>) -> Self {
        Self { client, fallback: RuleBasedParser::new() }
    }
}

#[async_trait]
impl IntentParser for LlmIntentParser {
    async fn parse(&self, text: &str) -> ParsedIntent {
        let reply = match self.client.complete(&build_prompt(text)).await {
            Ok(reply) => reply,
            Err(error) => {
                warn!(
                    event_name = "agent.llm.fallback",
                    reason = "client_error",
                    error = %error,
                    "llm unavailable, using keyword rules"
                );
                return self.fallback.parse_text(text);
            }
        };

        match parse_reply(&reply) {
            Ok(intent) => intent,
            Err(error) => {
                warn!(
                    event_name = "agent.llm.fallback",
                    reason = "malformed_reply",
                    error = %error,
                    "llm reply unusable, using keyword rules"
                );
                self.fallback.parse_text(text)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeSet;
    use std::sync::Arc;

    use anyhow::{anyhow, Result};
    use async_trait::async_trait;
    use rust_decimal::Decimal;

    use roomie_core::domain::room::{GenderPreference, RoomId};

    use super::{LlmClient, LlmIntentParser};
    use crate::intent::{IntentParser, ParsedIntent, TargetSlots};

    struct CannedClient(&'static str);

    #[async_trait]
    impl LlmClient for CannedClient {
        async fn complete(&self, _prompt: &str) -> Result<String> {
            Ok(self.0.to_string())
        }
    }

    struct FailingClient;

    #[async_trait]
    impl LlmClient for FailingClient {
        async fn complete(&self, _prompt: &str) -> Result<String> {
            Err(anyhow!("connection refused"))
        }
    }

    #[tokio::test]
    async fn fenced_json_reply_becomes_a_find() {
        let parser = LlmIntentParser::new(Arc::new(CannedClient(
            "```json\n{\"intent\": \"find\", \"location\": \"Koramangala\", \"max_rent\": 15000, \
             \"amenities\": [\"Wi-Fi\"], \"gender\": \"girls\"}\n```",
        )));

        let ParsedIntent::Find { filters, mine } = parser.parse("anything").await else {
            panic!("expected a find");
        };
        assert_eq!(filters.location.as_deref(), Some("Koramangala"));
        assert_eq!(filters.max_rent, Some(Decimal::from(15_000)));
        assert_eq!(filters.amenities, BTreeSet::from(["wifi".to_string()]));
        assert_eq!(filters.gender_pref, Some(GenderPreference::Female));
        assert!(!mine);
    }

    #[tokio::test]
    async fn edit_reply_separates_target_from_change() {
        let parser = LlmIntentParser::new(Arc::new(CannedClient(
            r#"{"intent": "edit", "rent_amount": 9500, "target": {"location": "HSR", "rent_amount": 9000}}"#,
        )));

        let ParsedIntent::Edit { target, fields } = parser.parse("anything").await else {
            panic!("expected an edit");
        };
        assert_eq!(target.room_id, None);
        assert_eq!(target.fields.location.as_deref(), Some("HSR"));
        assert_eq!(target.fields.rent_amount, Some(Decimal::from(9_000)));
        assert_eq!(fields.rent_amount, Some(Decimal::from(9_500)));
        assert_eq!(fields.location, None);
    }

    #[tokio::test]
    async fn delete_reply_with_room_id() {
        let parser = LlmIntentParser::new(Arc::new(CannedClient(
            r#"{"intent": "delete", "room_id": "r012"}"#,
        )));
        assert_eq!(
            parser.parse("anything").await,
            ParsedIntent::Delete { target: TargetSlots::by_id(RoomId(12)) }
        );
    }

    #[tokio::test]
    async fn malformed_reply_falls_back_to_rules() {
        let parser = LlmIntentParser::new(Arc::new(CannedClient("Sure! Here you go: find rooms")));
        assert_eq!(
            parser.parse("Delete R002").await,
            ParsedIntent::Delete { target: TargetSlots::by_id(RoomId(2)) }
        );

        let parser =
            LlmIntentParser::new(Arc::new(CannedClient(r#"{"intent": "teleport"}"#)));
        assert_eq!(parser.parse("help").await, ParsedIntent::Help);
    }

    #[tokio::test]
    async fn client_error_falls_back_to_rules() {
        let parser = LlmIntentParser::new(Arc::new(FailingClient));
        let ParsedIntent::Find { filters, .. } =
            parser.parse("Koramangala mein 12 hazar tak room chahiye").await
        else {
            panic!("expected a find");
        };
        assert_eq!(filters.max_rent, Some(Decimal::from(12_000)));
    }
}
