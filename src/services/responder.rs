//! AI response generation: prompt assembly, the external model call, and
//! the never-failing parse of its output.

use serde::{Deserialize, Serialize};

use crate::models::internal::{CollectedInfo, Intent, Message, SenderType};

/// Character cap applied to replies when the model output has to be used raw.
pub const SMS_CHAR_LIMIT: usize = 300;

const MAX_OUTPUT_TOKENS: u32 = 256;
const TEMPERATURE: f32 = 0.7;

#[derive(Debug, thiserror::Error)]
pub enum ResponderError {
    #[error("HTTP error: {0}")]
    HttpError(#[from] reqwest::Error),
    #[error("API error: {status} - {message}")]
    ApiError { status: u16, message: String },
    #[error("Invalid response: {0}")]
    InvalidResponse(String),
}

/// One structured reply from the responder, ready to apply to a conversation.
#[derive(Debug, Clone)]
pub struct AiReply {
    pub response: String,
    pub intent: Intent,
    pub confidence: f32,
    /// Fields newly learned this turn, and nothing else.
    pub extracted: CollectedInfo,
    /// The caller's collected info with this turn's extractions merged in.
    pub collected_info: CollectedInfo,
}

/// Everything the prompt needs to know about the business and the thread.
#[derive(Debug, Clone)]
pub struct ResponseContext {
    pub business_name: String,
    pub assistant_name: String,
    pub services: Vec<String>,
    pub pricing_notes: Option<String>,
    pub business_hours: Option<String>,
    pub collected_info: CollectedInfo,
    /// Prior turns, oldest first, excluding the message being answered.
    pub history: Vec<Message>,
}

#[derive(Clone)]
pub struct AiResponder {
    client: reqwest::Client,
    base_url: String,
    api_key: String,
    model: String,
}

impl AiResponder {
    pub fn new(base_url: String, api_key: String, model: String) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url,
            api_key,
            model,
        }
    }

    /// One customer message + context in, one structured reply out.
    pub async fn respond(
        &self,
        context: &ResponseContext,
        new_message: &str,
    ) -> Result<AiReply, ResponderError> {
        let request = GenerateRequest {
            system_instruction: SystemInstruction {
                parts: vec![Part {
                    text: build_system_instruction(context),
                }],
            },
            contents: build_transcript(&context.history, new_message),
            generation_config: GenerationConfig {
                temperature: TEMPERATURE,
                max_output_tokens: MAX_OUTPUT_TOKENS,
            },
        };

        let url = format!(
            "{}/v1beta/models/{}:generateContent?key={}",
            self.base_url, self.model, self.api_key
        );

        let response = self.client.post(url).json(&request).send().await?;

        if !response.status().is_success() {
            return Err(ResponderError::ApiError {
                status: response.status().as_u16(),
                message: response.text().await.unwrap_or_default(),
            });
        }

        let generated: GenerateResponse = response.json().await?;
        let raw = generated
            .candidates
            .into_iter()
            .next()
            .map(|c| {
                c.content
                    .parts
                    .into_iter()
                    .map(|p| p.text)
                    .collect::<Vec<_>>()
                    .join("")
            })
            .ok_or_else(|| ResponderError::InvalidResponse("no candidates".to_string()))?;

        Ok(parse_model_output(&raw, &context.collected_info, SMS_CHAR_LIMIT))
    }
}

/// Missed-call greeting. Pure template substitution, no model call: this runs
/// inline with call handling and must be fast and deterministic.
pub fn render_greeting(business_name: &str, assistant_name: &str) -> String {
    format!(
        "Hi, this is {} with {}. Sorry we missed your call! How can we help you today?",
        assistant_name, business_name
    )
}

fn build_system_instruction(context: &ResponseContext) -> String {
    let mut lines = Vec::new();

    lines.push(format!(
        "You are {}, the SMS assistant for {}.",
        context.assistant_name, context.business_name
    ));

    if !context.services.is_empty() {
        lines.push(format!("Services offered: {}.", context.services.join(", ")));
    }

    match &context.pricing_notes {
        Some(notes) => lines.push(format!(
            "If asked about pricing, you may share: {}",
            notes
        )),
        None => lines.push(
            "If asked about pricing, do not quote numbers; offer a callback instead.".to_string(),
        ),
    }

    if let Some(hours) = &context.business_hours {
        lines.push(format!("Business hours: {}.", hours));
    }

    let missing = context.collected_info.missing();
    if !missing.is_empty() {
        lines.push(format!(
            "Still to learn from the customer: {}.",
            missing
                .iter()
                .map(|f| f.question())
                .collect::<Vec<_>>()
                .join(" ")
        ));
    }

    if !context.collected_info.is_empty() {
        let known: Vec<String> = context
            .collected_info
            .iter()
            .map(|(f, v)| format!("{}={}", f.as_str(), v))
            .collect();
        lines.push(format!("Already known: {}.", known.join(", ")));
    }

    lines.push(
        "Reply ONLY with a JSON object: {\"response\": \"<short SMS-length reply>\", \
         \"intent\": \"greeting|inquiry|scheduling|objection|information|offtopic|goodbye\", \
         \"confidence\": <0-1>, \"extracted\": {<only newly learned fields>}}"
            .to_string(),
    );

    lines.join("\n")
}

/// Prior turns become the model's alternating-role transcript: customer turns
/// as `user`, assistant turns as `model`; the new message is the final turn.
fn build_transcript(history: &[Message], new_message: &str) -> Vec<Content> {
    let mut contents: Vec<Content> = history
        .iter()
        .map(|m| Content {
            role: match m.sender_type {
                SenderType::Customer => "user",
                SenderType::Ai | SenderType::Human => "model",
            }
            .to_string(),
            parts: vec![Part {
                text: m.content.clone(),
            }],
        })
        .collect();

    contents.push(Content {
        role: "user".to_string(),
        parts: vec![Part {
            text: new_message.to_string(),
        }],
    });

    contents
}

/// Parses raw model output into a reply. Never fails: malformed output
/// degrades to a truncated raw-text reply with conservative defaults.
pub fn parse_model_output(raw: &str, existing: &CollectedInfo, sms_limit: usize) -> AiReply {
    let fallback = || AiReply {
        response: truncate_sms(raw, sms_limit),
        intent: Intent::Inquiry,
        confidence: 0.5,
        extracted: CollectedInfo::new(),
        collected_info: existing.clone(),
    };

    let Some(parsed) = first_json_object(raw) else {
        return fallback();
    };

    let response = match parsed.get("response").and_then(|v| v.as_str()) {
        Some(text) if !text.trim().is_empty() => text.trim().to_string(),
        _ => return fallback(),
    };

    let intent = parsed
        .get("intent")
        .and_then(|v| v.as_str())
        .map(Intent::parse_or_inquiry)
        .unwrap_or(Intent::Inquiry);

    let confidence = parsed
        .get("confidence")
        .and_then(|v| v.as_f64())
        .map(|c| c.clamp(0.0, 1.0) as f32)
        .unwrap_or(0.8);

    let extracted = match parsed.get("extracted").and_then(|v| v.as_object()) {
        Some(map) => CollectedInfo::from_raw(
            map.iter()
                .filter_map(|(k, v)| v.as_str().map(|s| (k.as_str(), s))),
        ),
        None => CollectedInfo::new(),
    };

    let mut collected_info = existing.clone();
    collected_info.merge(&extracted);

    AiReply {
        response,
        intent,
        confidence,
        extracted,
        collected_info,
    }
}

/// Finds the first balanced, parseable JSON object substring.
fn first_json_object(raw: &str) -> Option<serde_json::Value> {
    let bytes = raw.as_bytes();

    for start in 0..bytes.len() {
        if bytes[start] != b'{' {
            continue;
        }

        let mut depth = 0usize;
        let mut in_string = false;
        let mut escaped = false;

        for (offset, &b) in bytes[start..].iter().enumerate() {
            if in_string {
                if escaped {
                    escaped = false;
                } else if b == b'\\' {
                    escaped = true;
                } else if b == b'"' {
                    in_string = false;
                }
                continue;
            }

            match b {
                b'"' => in_string = true,
                b'{' => depth += 1,
                b'}' => {
                    depth -= 1;
                    if depth == 0 {
                        let candidate = &raw[start..start + offset + 1];
                        if let Ok(value) = serde_json::from_str::<serde_json::Value>(candidate) {
                            if value.is_object() {
                                return Some(value);
                            }
                        }
                        break;
                    }
                }
                _ => {}
            }
        }
    }

    None
}

fn truncate_sms(raw: &str, limit: usize) -> String {
    raw.trim().chars().take(limit).collect()
}

// Request/Response models (Gemini-style generateContent)
#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateRequest {
    system_instruction: SystemInstruction,
    contents: Vec<Content>,
    generation_config: GenerationConfig,
}

#[derive(Serialize)]
struct SystemInstruction {
    parts: Vec<Part>,
}

#[derive(Serialize, Deserialize)]
struct Content {
    role: String,
    parts: Vec<Part>,
}

#[derive(Serialize, Deserialize)]
struct Part {
    text: String,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerationConfig {
    temperature: f32,
    max_output_tokens: u32,
}

#[derive(Deserialize)]
struct GenerateResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Deserialize)]
struct Candidate {
    content: CandidateContent,
}

#[derive(Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<Part>,
}
