//! LLM integration for chat replies and generated content
//!
//! This module handles communication with the Claude API and adapts it to the
//! `ContentGenerator` contract (fail open for text, fail closed for records).

use reqwest::Client;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, error, warn};
use url::Url;

use crate::config::AppConfig;
use crate::generator::{
  ContentGenerator, CHAT_EMPTY_REPLY, CHAT_ERROR_REPLY, MISSING_KEY_REPLY, TIP_EMPTY, TIP_FALLBACK,
  TIP_MISSING_KEY,
};
use crate::models::{DevotionalContent, Message, Persona, Role, UserProfile, WorkoutPlan};

/// ---------------------------------------------------------------------------
/// Configuration
/// ---------------------------------------------------------------------------

pub const DEFAULT_CLAUDE_BASE_URL: &str = "https://api.anthropic.com";
pub const DEFAULT_CLAUDE_MODEL: &str = "claude-sonnet-4-20250514";
const API_VERSION: &str = "2023-06-01";
const MESSAGES_PATH: &str = "v1/messages";

const CHAT_MAX_TOKENS: u32 = 1024;
const TIP_MAX_TOKENS: u32 = 120;
const PLAN_MAX_TOKENS: u32 = 4096;
const DEVOTIONAL_MAX_TOKENS: u32 = 1024;

const CHAT_TEMPERATURE: f32 = 0.7;

/// ---------------------------------------------------------------------------
/// Error Types
/// ---------------------------------------------------------------------------

#[derive(Error, Debug)]
pub enum LlmError {
  #[error("API key not configured")]
  MissingApiKey,

  #[error("Invalid API base URL: {0}")]
  InvalidBaseUrl(String),

  #[error("Request failed: {0}")]
  Request(String),

  #[error("API error: {0}")]
  Api(String),

  #[error("Parse error: {0}")]
  Parse(String),
}

/// ---------------------------------------------------------------------------
/// Claude API Types
/// ---------------------------------------------------------------------------

#[derive(Debug, Serialize)]
struct ClaudeRequest {
  model: String,
  max_tokens: u32,
  system: String,
  messages: Vec<ClaudeMessage>,
  #[serde(skip_serializing_if = "Option::is_none")]
  temperature: Option<f32>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ClaudeMessage {
  role: String,
  content: String,
}

impl ClaudeMessage {
  pub fn user(content: impl Into<String>) -> Self {
    Self {
      role: "user".to_string(),
      content: content.into(),
    }
  }
}

#[derive(Debug, Deserialize)]
struct ClaudeResponse {
  content: Vec<ContentBlock>,
  usage: Usage,
}

#[derive(Debug, Deserialize)]
struct ContentBlock {
  #[serde(rename = "type")]
  content_type: String,
  text: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct Usage {
  pub input_tokens: u32,
  pub output_tokens: u32,
}

#[derive(Debug, Deserialize)]
struct ClaudeErrorResponse {
  error: ClaudeErrorDetail,
}

#[derive(Debug, Deserialize)]
struct ClaudeErrorDetail {
  message: String,
}

/// ---------------------------------------------------------------------------
/// Claude Client
/// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
pub struct ClaudeClient {
  client: Client,
  api_key: String,
  model: String,
  endpoint: Url,
}

impl ClaudeClient {
  pub fn new(api_key: impl Into<String>, model: impl Into<String>, base_url: &str) -> Result<Self, LlmError> {
    // `join` replaces the last segment unless the base ends in a slash
    let base = if base_url.ends_with('/') {
      base_url.to_string()
    } else {
      format!("{}/", base_url)
    };
    let endpoint = Url::parse(&base)
      .and_then(|base| base.join(MESSAGES_PATH))
      .map_err(|e| LlmError::InvalidBaseUrl(format!("{}: {}", base_url, e)))?;

    Ok(Self {
      client: Client::new(),
      api_key: api_key.into(),
      model: model.into(),
      endpoint,
    })
  }

  /// Build a client from configuration; fails when no API key is set
  pub fn from_config(config: &AppConfig) -> Result<Self, LlmError> {
    let api_key = config.anthropic_api_key.clone().ok_or(LlmError::MissingApiKey)?;
    Self::new(api_key, &config.claude_model, &config.claude_base_url)
  }

  /// Call Claude with a system prompt and a conversation
  pub async fn complete(
    &self,
    system_prompt: &str,
    messages: Vec<ClaudeMessage>,
    max_tokens: u32,
    temperature: Option<f32>,
  ) -> Result<(String, Usage), LlmError> {
    let request = ClaudeRequest {
      model: self.model.clone(),
      max_tokens,
      system: system_prompt.to_string(),
      messages,
      temperature,
    };

    let response = self
      .client
      .post(self.endpoint.clone())
      .header("x-api-key", &self.api_key)
      .header("anthropic-version", API_VERSION)
      .header("content-type", "application/json")
      .json(&request)
      .send()
      .await
      .map_err(|e| LlmError::Request(e.to_string()))?;

    let status = response.status();
    let body = response
      .text()
      .await
      .map_err(|e| LlmError::Request(e.to_string()))?;

    if !status.is_success() {
      if let Ok(error_resp) = serde_json::from_str::<ClaudeErrorResponse>(&body) {
        return Err(LlmError::Api(error_resp.error.message));
      }
      return Err(LlmError::Api(format!("HTTP {}: {}", status, body)));
    }

    let claude_response: ClaudeResponse =
      serde_json::from_str(&body).map_err(|e| LlmError::Parse(e.to_string()))?;

    // Extract text from the first text content block
    let text = claude_response
      .content
      .iter()
      .find(|c| c.content_type == "text")
      .and_then(|c| c.text.clone())
      .ok_or_else(|| LlmError::Parse("No text content in response".to_string()))?;

    debug!(
      input_tokens = claude_response.usage.input_tokens,
      output_tokens = claude_response.usage.output_tokens,
      "Claude completion"
    );

    Ok((text, claude_response.usage))
  }

  /// Ask for a JSON record and parse it
  async fn complete_json<T: serde::de::DeserializeOwned>(
    &self,
    system_prompt: &str,
    user_message: String,
    max_tokens: u32,
  ) -> Result<T, LlmError> {
    let (response_text, _usage) = self
      .complete(system_prompt, vec![ClaudeMessage::user(user_message)], max_tokens, None)
      .await?;

    let json_str = extract_json(&response_text)?;
    serde_json::from_str(&json_str).map_err(|e| LlmError::Parse(format!("{}: {}", e, json_str)))
  }
}

/// ---------------------------------------------------------------------------
/// Prompts
/// ---------------------------------------------------------------------------

const GENERIC_SYSTEM_PROMPT: &str = "You are a high-performance assistant.";

fn persona_prompt(persona: Persona) -> &'static str {
  match persona {
    Persona::Nutri => include_str!("prompts/nutri_system.txt"),
    Persona::Psych => include_str!("prompts/psych_system.txt"),
    Persona::Coach => include_str!("prompts/coach_system.txt"),
    _ => GENERIC_SYSTEM_PROMPT,
  }
}

fn system_prompt_for(persona: Persona, profile: Option<&UserProfile>) -> String {
  match profile {
    Some(profile) => format!("{}\n\n{}", persona_prompt(persona), profile.context_summary()),
    None => persona_prompt(persona).to_string(),
  }
}

/// Map a transcript plus the new message to API messages.
///
/// The API expects the conversation to open with a user turn, so seeded
/// assistant greetings ahead of the first user message are dropped.
fn build_conversation(transcript: &[Message], message: &str) -> Vec<ClaudeMessage> {
  transcript
    .iter()
    .skip_while(|m| m.role == Role::Assistant)
    .map(|m| ClaudeMessage {
      role: match m.role {
        Role::User => "user".to_string(),
        Role::Assistant => "assistant".to_string(),
      },
      content: m.text.clone(),
    })
    .chain(std::iter::once(ClaudeMessage::user(message)))
    .collect()
}

/// Extract JSON from Claude's response (handles markdown code blocks)
fn extract_json(text: &str) -> Result<String, LlmError> {
  // Try direct parse first
  if text.trim().starts_with('{') {
    return Ok(text.trim().to_string());
  }

  // Look for JSON in code blocks
  if let Some(start) = text.find("```json") {
    let start = start + 7;
    if let Some(end) = text[start..].find("```") {
      return Ok(text[start..start + end].trim().to_string());
    }
  }

  // Look for plain code blocks
  if let Some(start) = text.find("```") {
    let start = start + 3;
    // Skip language identifier if present
    let content_start = text[start..]
      .find('\n')
      .map(|i| start + i + 1)
      .unwrap_or(start);
    if let Some(end) = text[content_start..].find("```") {
      return Ok(text[content_start..content_start + end].trim().to_string());
    }
  }

  // Last resort: find first { to last }
  if let (Some(start), Some(end)) = (text.find('{'), text.rfind('}')) {
    if start < end {
      return Ok(text[start..=end].to_string());
    }
  }

  Err(LlmError::Parse("Could not extract JSON from response".to_string()))
}

/// ---------------------------------------------------------------------------
/// Content Generator
/// ---------------------------------------------------------------------------

/// `ContentGenerator` backed by Claude. Without a client (no API key) every
/// call degrades to its fixed fallback.
#[derive(Debug, Clone)]
pub struct ClaudeGenerator {
  client: Option<ClaudeClient>,
}

impl ClaudeGenerator {
  pub fn new(client: Option<ClaudeClient>) -> Self {
    Self { client }
  }

  pub fn from_config(config: &AppConfig) -> Self {
    match ClaudeClient::from_config(config) {
      Ok(client) => Self::new(Some(client)),
      Err(e) => {
        warn!(error = %e, "Content generator disabled");
        Self::new(None)
      }
    }
  }

  pub fn is_configured(&self) -> bool {
    self.client.is_some()
  }
}

impl ContentGenerator for ClaudeGenerator {
  async fn converse(
    &self,
    message: &str,
    transcript: &[Message],
    persona: Persona,
    profile: Option<&UserProfile>,
  ) -> String {
    let Some(client) = &self.client else {
      return MISSING_KEY_REPLY.to_string();
    };

    let system = system_prompt_for(persona, profile);
    let conversation = build_conversation(transcript, message);

    match client
      .complete(&system, conversation, CHAT_MAX_TOKENS, Some(CHAT_TEMPERATURE))
      .await
    {
      Ok((text, _)) if !text.trim().is_empty() => text,
      Ok(_) => CHAT_EMPTY_REPLY.to_string(),
      Err(e) => {
        error!(error = %e, %persona, "Chat completion failed");
        CHAT_ERROR_REPLY.to_string()
      }
    }
  }

  async fn daily_tip(&self, profile: Option<&UserProfile>) -> String {
    let Some(client) = &self.client else {
      return TIP_MISSING_KEY.to_string();
    };

    let context = profile
      .map(|p| format!(" For {}, who is working towards {}.", p.name, p.goals_joined(" and ")))
      .unwrap_or_default();
    let prompt = format!(
      "Write one short, punchy, motivating sentence about high human performance, mixing physical and mental health.{}",
      context
    );

    match client
      .complete(GENERIC_SYSTEM_PROMPT, vec![ClaudeMessage::user(prompt)], TIP_MAX_TOKENS, None)
      .await
    {
      Ok((text, _)) if !text.trim().is_empty() => text.trim().to_string(),
      Ok(_) => TIP_EMPTY.to_string(),
      Err(e) => {
        warn!(error = %e, "Daily tip generation failed");
        TIP_FALLBACK.to_string()
      }
    }
  }

  async fn generate_plan(&self, profile: &UserProfile) -> Option<WorkoutPlan> {
    let client = self.client.as_ref()?;

    let user_message = format!(
      "Create a complete weekly training routine (7 days, Monday to Sunday) optimized for this profile.\n\n{}",
      profile.context_summary()
    );

    match client
      .complete_json::<WorkoutPlan>(include_str!("prompts/plan_system.txt"), user_message, PLAN_MAX_TOKENS)
      .await
    {
      Ok(mut plan) => {
        if let Err(e) = plan.validate_shape() {
          warn!(error = %e, "Generated plan rejected");
          return None;
        }
        plan.recompute_all();
        Some(plan)
      }
      Err(e) => {
        error!(error = %e, "Workout plan generation failed");
        None
      }
    }
  }

  async fn generate_devotional(&self, profile: Option<&UserProfile>) -> Option<DevotionalContent> {
    let client = self.client.as_ref()?;

    let mut user_message =
      "Write a short biblical devotional focused on high spiritual performance.".to_string();
    if let Some(profile) = profile {
      user_message.push_str(&format!("\n\nAdapt it for someone pursuing: {}", profile.goals_joined(", ")));
    }

    match client
      .complete_json::<DevotionalContent>(
        include_str!("prompts/devotional_system.txt"),
        user_message,
        DEVOTIONAL_MAX_TOKENS,
      )
      .await
    {
      Ok(content) => Some(content),
      Err(e) => {
        error!(error = %e, "Devotional generation failed");
        None
      }
    }
  }
}

/// ---------------------------------------------------------------------------
/// Tests
/// ---------------------------------------------------------------------------
