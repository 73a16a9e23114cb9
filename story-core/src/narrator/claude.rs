//! Claude-backed narrator.
//!
//! Talks to the Anthropic Messages API directly and forces a single
//! `write_story_segment` tool call, so every beat comes back as structured
//! JSON instead of free text.

use super::{NarrativeError, NarrativeGenerator, NarrativeRequest, NarrativeSegment};
use crate::choice::{Choice, ChoiceId};
use crate::state::{integer_lenient, GameState};
use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue, CONTENT_TYPE};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::collections::BTreeMap;
use std::time::Duration;

const API_BASE: &str = "https://api.anthropic.com/v1";
const API_VERSION: &str = "2023-06-01";
const DEFAULT_MODEL: &str = "claude-sonnet-4-20250514";
const SEGMENT_TOOL: &str = "write_story_segment";

/// Generation settings for the narrator.
#[derive(Debug, Clone)]
pub struct NarratorConfig {
    /// The model to use (defaults to claude-sonnet-4-20250514).
    pub model: Option<String>,

    /// Maximum tokens per beat.
    pub max_tokens: usize,

    /// Temperature for generation.
    pub temperature: Option<f32>,

    /// Extra instructions appended to the system prompt.
    pub custom_system_prompt: Option<String>,
}

impl Default for NarratorConfig {
    fn default() -> Self {
        Self {
            model: None,
            max_tokens: 2048,
            temperature: Some(0.9),
            custom_system_prompt: None,
        }
    }
}

/// Narrator backed by the Claude API.
#[derive(Clone)]
pub struct ClaudeNarrator {
    client: reqwest::Client,
    api_key: String,
    config: NarratorConfig,
}

impl ClaudeNarrator {
    /// Create a narrator with an API key.
    pub fn new(api_key: impl Into<String>) -> Result<Self, NarrativeError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(120))
            .connect_timeout(Duration::from_secs(30))
            .build()
            .map_err(|e| NarrativeError::Config(format!("Failed to build HTTP client: {e}")))?;
        Ok(Self {
            client,
            api_key: api_key.into(),
            config: NarratorConfig::default(),
        })
    }

    /// Create a narrator from the ANTHROPIC_API_KEY environment variable.
    pub fn from_env() -> Result<Self, NarrativeError> {
        let api_key = std::env::var("ANTHROPIC_API_KEY").map_err(|_| NarrativeError::NoApiKey)?;
        Self::new(api_key)
    }

    /// Configure the narrator.
    pub fn with_config(mut self, config: NarratorConfig) -> Self {
        self.config = config;
        self
    }

    /// The model requests will use.
    pub fn model(&self) -> &str {
        self.config.model.as_deref().unwrap_or(DEFAULT_MODEL)
    }

    fn build_headers(&self) -> Result<HeaderMap, NarrativeError> {
        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        headers.insert(
            "x-api-key",
            HeaderValue::from_str(&self.api_key)
                .map_err(|e| NarrativeError::Config(format!("Invalid API key: {e}")))?,
        );
        headers.insert("anthropic-version", HeaderValue::from_static(API_VERSION));
        Ok(headers)
    }

    fn build_system_prompt(&self, request: &NarrativeRequest) -> String {
        let mut prompt = String::new();
        prompt.push_str(include_str!("prompts/narrator_base.txt"));
        prompt.push_str("\n\n");
        prompt.push_str(include_str!("prompts/consequences.txt"));

        if let Some(ref custom) = self.config.custom_system_prompt {
            prompt.push_str("\n\n## Additional Instructions\n");
            prompt.push_str(custom);
        }

        prompt.push_str("\n\n## Story Settings\n");
        prompt.push_str(&format!("**Genre:** {}\n", request.genre));
        prompt.push_str(&format!(
            "**Length:** {} (at most {} beats)\n",
            request.length.as_str(),
            request.length.max_steps()
        ));
        prompt.push_str(&format!("**Challenge:** {}\n", request.challenge.as_str()));
        prompt
    }

    fn build_user_message(&self, request: &NarrativeRequest) -> String {
        if request.is_opening() {
            return format!(
                "Begin a new {} story. Establish the protagonist, the setting, and an \
                 inciting incident, then offer the first choices.",
                request.genre
            );
        }

        let mut message = String::new();
        if let Some(step) = request.current_step {
            message.push_str(&format!(
                "Continue the story after beat {step} of {}.\n",
                request.length.max_steps()
            ));
        }
        if let Some(ref choice) = request.previous_choice {
            message.push_str(&format!("The player chose: \"{choice}\"\n"));
        }
        if let Some(ref state) = request.game_state {
            let state_json = serde_json::to_string_pretty(state).unwrap_or_default();
            message.push_str("\nCurrent game state:\n```json\n");
            message.push_str(&state_json);
            message.push_str("\n```\n");
        }
        message
    }

    fn build_api_request(&self, request: &NarrativeRequest) -> ApiRequest {
        ApiRequest {
            model: self.model().to_string(),
            max_tokens: self.config.max_tokens,
            system: self.build_system_prompt(request),
            messages: vec![ApiMessage {
                role: "user",
                content: self.build_user_message(request),
            }],
            temperature: self.config.temperature,
            tools: vec![segment_tool()],
            tool_choice: ApiToolChoice {
                r#type: "tool",
                name: SEGMENT_TOOL,
            },
        }
    }
}

#[async_trait]
impl NarrativeGenerator for ClaudeNarrator {
    async fn generate(&self, request: &NarrativeRequest) -> Result<NarrativeSegment, NarrativeError> {
        let headers = self.build_headers()?;
        let body = self.build_api_request(request);

        let response = self
            .client
            .post(format!("{API_BASE}/messages"))
            .headers(headers)
            .json(&body)
            .send()
            .await
            .map_err(|e| NarrativeError::Network(e.to_string()))?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let message = response.text().await.unwrap_or_default();
            return Err(NarrativeError::Api { status, message });
        }

        let api_response: ApiResponse = response
            .json()
            .await
            .map_err(|e| NarrativeError::Parse(e.to_string()))?;

        let input = api_response
            .content
            .into_iter()
            .find_map(|block| match block {
                ApiContent::ToolUse { name, input } if name == SEGMENT_TOOL => Some(input),
                _ => None,
            })
            .ok_or_else(|| NarrativeError::Parse(format!("response did not call {SEGMENT_TOOL}")))?;

        parse_segment(input)
    }
}

/// Convert the tool input into a segment.
///
/// Choice ids, text and slugs are parsed strictly. Trait deltas and the
/// optional game state go through the lenient boundary.
fn parse_segment(input: Value) -> Result<NarrativeSegment, NarrativeError> {
    let raw: RawSegment =
        serde_json::from_value(input).map_err(|e| NarrativeError::Parse(e.to_string()))?;

    Ok(NarrativeSegment {
        story_text: raw.story_text,
        choices: raw.choices.into_iter().map(RawChoice::into_choice).collect(),
        game_state: raw.game_state.as_ref().map(GameState::from_json_lenient),
        is_ending: raw.is_ending,
        ending_type: raw.ending_type,
    })
}

fn segment_tool() -> ApiTool {
    ApiTool {
        name: SEGMENT_TOOL,
        description: "Submit the next beat of the story with the choices offered to the player.",
        input_schema: json!({
            "type": "object",
            "properties": {
                "story_text": {
                    "type": "string",
                    "description": "The narrative for this beat."
                },
                "choices": {
                    "type": "array",
                    "maxItems": 4,
                    "items": {
                        "type": "object",
                        "properties": {
                            "id": { "type": "string", "enum": ["A", "B", "C", "D"] },
                            "text": { "type": "string" },
                            "slug": { "type": "string", "description": "snake_case identifier" },
                            "consequences": {
                                "type": "array",
                                "items": { "type": "string" }
                            },
                            "traits_impact": {
                                "type": "object",
                                "additionalProperties": { "type": "integer", "minimum": -3, "maximum": 3 }
                            }
                        },
                        "required": ["id", "text", "slug"]
                    }
                },
                "is_ending": { "type": "boolean" },
                "ending_type": { "type": "string" },
                "game_state": {
                    "type": "object",
                    "description": "Opening beat only: starting flags, relationships, inventory and personalityTraits."
                }
            },
            "required": ["story_text", "choices", "is_ending"]
        }),
    }
}

#[derive(Debug, Deserialize)]
struct RawSegment {
    story_text: String,
    #[serde(default)]
    choices: Vec<RawChoice>,
    #[serde(default)]
    is_ending: bool,
    #[serde(default)]
    ending_type: Option<String>,
    #[serde(default)]
    game_state: Option<Value>,
}

#[derive(Debug, Deserialize)]
struct RawChoice {
    id: ChoiceId,
    text: String,
    slug: String,
    #[serde(default)]
    consequences: Vec<String>,
    #[serde(default)]
    traits_impact: BTreeMap<String, Value>,
}

impl RawChoice {
    fn into_choice(self) -> Choice {
        let traits_impact = self
            .traits_impact
            .into_iter()
            .filter_map(|(name, delta)| match integer_lenient(&delta) {
                Some(delta) => Some((name, delta)),
                None => {
                    tracing::warn!(choice = %self.id, trait_name = %name, %delta, "dropping non-numeric trait delta");
                    None
                }
            })
            .collect();
        Choice {
            id: self.id,
            text: self.text,
            slug: self.slug,
            consequences: self.consequences,
            traits_impact,
        }
    }
}

// ============================================================================
// Internal API types
// ============================================================================

#[derive(Debug, Serialize)]
struct ApiRequest {
    model: String,
    max_tokens: usize,
    system: String,
    messages: Vec<ApiMessage>,
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
    tools: Vec<ApiTool>,
    tool_choice: ApiToolChoice,
}

#[derive(Debug, Serialize)]
struct ApiMessage {
    role: &'static str,
    content: String,
}

#[derive(Debug, Serialize)]
struct ApiTool {
    name: &'static str,
    description: &'static str,
    input_schema: Value,
}

#[derive(Debug, Serialize)]
struct ApiToolChoice {
    r#type: &'static str,
    name: &'static str,
}

#[derive(Debug, Deserialize)]
struct ApiResponse {
    content: Vec<ApiContent>,
}

#[derive(Debug, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum ApiContent {
    ToolUse {
        name: String,
        input: Value,
    },
    #[serde(other)]
    Other,
}
