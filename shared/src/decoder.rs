//! Best-effort decoding of agent invocation payloads.
//!
//! The agent runtime has been observed to answer in two shapes: a sequence of
//! payload chunks (SDK invocations) and a raw event-stream body (signed HTTP
//! invocations). Neither shape is fully documented, so decoding never fails:
//! every problem is recorded as a diagnostic line and the decoder degrades to
//! whatever text it could recover, or the raw payload.

use base64::alphabet;
use base64::engine::general_purpose::{GeneralPurpose, GeneralPurposeConfig, STANDARD};
use base64::engine::DecodePaddingMode;
use base64::Engine;
use serde_json::Value;
use tracing::debug;

/// Answer returned for an empty or whitespace-only event-stream body.
pub const EMPTY_RESPONSE: &str = "Empty response received from Bedrock agent";

const MESSAGE_TYPE_MARKER: &str = ":message-type";
const FINAL_RESPONSE_MARKER: &str = "finalResponse";
const NOISE_FRAGMENTS: [&str; 2] = ["{input:{value:", ",source:null}}"];
const PREVIEW_CHARS: usize = 50;

/// Accepts unpadded input and non-canonical trailing bits.
const LENIENT: GeneralPurpose = GeneralPurpose::new(
    &alphabet::STANDARD,
    GeneralPurposeConfig::new()
        .with_decode_padding_mode(DecodePaddingMode::Indifferent)
        .with_decode_allow_trailing_bits(true),
);

/// The `bytes` field of a payload chunk.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChunkBytes {
    /// Already-decoded bytes, as delivered by the SDK.
    Raw(Vec<u8>),
    /// A base64 string, possibly missing its padding.
    Encoded(String),
}

/// One payload chunk of a streamed agent answer.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Chunk {
    pub bytes: Option<ChunkBytes>,
    pub text: Option<String>,
}

impl Chunk {
    pub fn raw(bytes: impl Into<Vec<u8>>) -> Self {
        Self {
            bytes: Some(ChunkBytes::Raw(bytes.into())),
            text: None,
        }
    }

    pub fn encoded(data: impl Into<String>) -> Self {
        Self {
            bytes: Some(ChunkBytes::Encoded(data.into())),
            text: None,
        }
    }

    pub fn text(text: impl Into<String>) -> Self {
        Self {
            bytes: None,
            text: Some(text.into()),
        }
    }

    /// Build a chunk from a JSON envelope, either `{"chunk": {...}}` or the bare chunk object.
    ///
    /// A string `bytes` value is treated as base64; an array of integers as raw bytes.
    pub fn from_json(value: &Value) -> Option<Self> {
        let body = value.get("chunk").unwrap_or(value).as_object()?;

        let bytes = match body.get("bytes") {
            Some(Value::String(s)) => Some(ChunkBytes::Encoded(s.clone())),
            Some(Value::Array(items)) => Some(ChunkBytes::Raw(
                items
                    .iter()
                    .filter_map(|v| v.as_u64())
                    .filter_map(|v| u8::try_from(v).ok())
                    .collect(),
            )),
            Some(other) => Some(ChunkBytes::Encoded(other.to_string())),
            None => None,
        };
        let text = body.get("text").map(value_text);

        if bytes.is_none() && text.is_none() {
            return None;
        }
        Some(Self { bytes, text })
    }
}

/// The payload shapes the decoder understands.
#[derive(Debug, Clone, Copy)]
pub enum AgentPayload<'a> {
    /// Chunk sequence from a streaming SDK invocation.
    Chunks(&'a [Chunk]),
    /// Whole event-stream body from a signed HTTP invocation.
    EventStream(&'a str),
}

/// Result of decoding: the answer text plus every diagnostic recorded on the way.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DecodedResponse {
    pub primary_text: String,
    pub diagnostics: Vec<String>,
}

impl DecodedResponse {
    /// Diagnostics joined into a single block, suitable for a trace panel.
    pub fn trace_text(&self) -> String {
        self.diagnostics.join("\n")
    }

    /// The answer, or `placeholder` when nothing but whitespace was recovered.
    pub fn text_or<'a>(&'a self, placeholder: &'a str) -> &'a str {
        if self.primary_text.trim().is_empty() {
            placeholder
        } else {
            &self.primary_text
        }
    }
}

/// Decode an agent payload into a single answer string.
pub fn decode(payload: AgentPayload<'_>) -> DecodedResponse {
    match payload {
        AgentPayload::Chunks(chunks) => decode_chunks(chunks),
        AgentPayload::EventStream(raw) => decode_event_stream(raw),
    }
}

#[derive(Default)]
struct Diagnostics(Vec<String>);

impl Diagnostics {
    fn note(&mut self, line: impl Into<String>) {
        let line = line.into();
        debug!("{}", line);
        self.0.push(line);
    }
}

fn decode_chunks(chunks: &[Chunk]) -> DecodedResponse {
    let mut notes = Diagnostics::default();
    let mut answer = String::new();

    for (idx, chunk) in chunks.iter().enumerate() {
        match (&chunk.bytes, &chunk.text) {
            (Some(bytes), _) => {
                if let Some(fragment) = decode_chunk_bytes(idx, bytes, &mut notes) {
                    answer.push_str(&fragment);
                }
            }
            (None, Some(text)) => answer.push_str(text),
            (None, None) => notes.note(format!("chunk {}: no bytes or text field", idx)),
        }
    }

    notes.note(format!(
        "decoded {} chunk(s) into {} character(s)",
        chunks.len(),
        answer.chars().count()
    ));

    DecodedResponse {
        primary_text: answer,
        diagnostics: notes.0,
    }
}

fn decode_chunk_bytes(idx: usize, bytes: &ChunkBytes, notes: &mut Diagnostics) -> Option<String> {
    let decoded = match bytes {
        ChunkBytes::Raw(raw) => utf8_ignoring_errors(raw),
        ChunkBytes::Encoded(data) => {
            let candidate = data.trim();
            if !is_base64_alphabet(candidate) {
                notes.note(format!(
                    "chunk {}: skipping non-base64 data: {}",
                    idx,
                    preview(candidate)
                ));
                return None;
            }

            match LENIENT.decode(with_padding(candidate)) {
                Ok(raw) => utf8_ignoring_errors(&raw),
                Err(e) => {
                    notes.note(format!("chunk {}: base64 decode failed: {}", idx, e));
                    return None;
                }
            }
        }
    };

    Some(fragment_from_decoded(&decoded))
}

/// Pick the answer text out of a decoded chunk body.
fn fragment_from_decoded(decoded: &str) -> String {
    match serde_json::from_str::<Value>(decoded) {
        Ok(Value::Object(map)) => {
            if let Some(text) = map.get("text") {
                return value_text(text);
            }
            if let Some(completion) = map.get("completion") {
                return value_text(completion);
            }
            map.values()
                .filter_map(Value::as_str)
                .find(|s| s.chars().count() > 5)
                .map(String::from)
                .unwrap_or_default()
        }
        Ok(Value::String(s)) => s,
        Ok(other) => other.to_string(),
        Err(_) => decoded.to_string(),
    }
}

fn decode_event_stream(raw: &str) -> DecodedResponse {
    let mut notes = Diagnostics::default();

    if raw.trim().is_empty() {
        notes.note("event stream body is empty");
        return DecodedResponse {
            primary_text: EMPTY_RESPONSE.to_string(),
            diagnostics: notes.0,
        };
    }

    let segments: Vec<&str> = raw.split(MESSAGE_TYPE_MARKER).collect();
    notes.note(format!("split event stream into {} segment(s)", segments.len()));

    let extracted = first_bytes_segment(&segments, &mut notes)
        .or_else(|| last_bytes_segment(&segments, &mut notes))
        .or_else(|| final_response_text(raw, &mut notes))
        .or_else(|| whole_body_text(raw, &mut notes));

    let primary_text = match extracted {
        Some(text) => strip_noise(&text),
        None => {
            notes.note("no decoding strategy matched, returning raw body");
            raw.to_string()
        }
    };

    notes.note(format!(
        "extracted answer of {} character(s)",
        primary_text.chars().count()
    ));

    DecodedResponse {
        primary_text,
        diagnostics: notes.0,
    }
}

/// The quoted value following a `bytes` key, i.e. the fourth `"`-separated field.
fn bytes_field(segment: &str) -> Option<&str> {
    if !segment.contains("bytes") {
        return None;
    }
    segment.split('"').nth(3)
}

fn first_bytes_segment(segments: &[&str], notes: &mut Diagnostics) -> Option<String> {
    for (idx, segment) in segments.iter().enumerate() {
        let Some(candidate) = bytes_field(segment) else {
            continue;
        };

        let decoded = match STANDARD.decode(candidate) {
            Ok(raw) => raw,
            Err(e) => {
                notes.note(format!("segment {}: base64 decode failed: {}", idx, e));
                continue;
            }
        };

        match String::from_utf8(decoded) {
            Ok(text) if !text.is_empty() => {
                notes.note(format!("segment {}: found answer in bytes field", idx));
                return Some(text);
            }
            Ok(_) => notes.note(format!("segment {}: bytes field decoded to nothing", idx)),
            Err(e) => notes.note(format!("segment {}: invalid UTF-8: {}", idx, e)),
        }
    }
    None
}

fn last_bytes_segment(segments: &[&str], notes: &mut Diagnostics) -> Option<String> {
    let candidate = segments.last().and_then(|segment| bytes_field(segment))?;

    match LENIENT.decode(with_padding(candidate)) {
        Ok(raw) => {
            let text = utf8_ignoring_errors(&raw);
            if text.is_empty() {
                None
            } else {
                notes.note("recovered answer from last segment");
                Some(text)
            }
        }
        Err(e) => {
            notes.note(format!("last segment: base64 decode failed: {}", e));
            None
        }
    }
}

fn final_response_text(raw: &str, notes: &mut Diagnostics) -> Option<String> {
    let idx = raw.find(FINAL_RESPONSE_MARKER)?;
    let rest = &raw[idx + FINAL_RESPONSE_MARKER.len()..];
    let rest = rest.trim_start_matches(|c: char| c == '"' || c == ':' || c.is_whitespace());

    let Some(end) = rest.find("\"}") else {
        notes.note("finalResponse found without a closing \"}");
        return None;
    };
    let slice = &rest[..end + 2];

    match serde_json::from_str::<Value>(slice) {
        Ok(parsed) => {
            notes.note("found answer in finalResponse");
            Some(match parsed.get("text") {
                Some(text) => value_text(text),
                None => parsed.to_string(),
            })
        }
        Err(e) => {
            notes.note(format!(
                "finalResponse is not valid JSON ({}): {}",
                e,
                preview(slice)
            ));
            None
        }
    }
}

fn whole_body_text(raw: &str, notes: &mut Diagnostics) -> Option<String> {
    let parsed = match serde_json::from_str::<Value>(raw) {
        Ok(parsed) => parsed,
        Err(e) => {
            notes.note(format!("body is not JSON: {}", e));
            return None;
        }
    };

    let found = ["completion", "output", "text"]
        .iter()
        .find_map(|key| parsed.get(*key))
        .or_else(|| parsed.get(FINAL_RESPONSE_MARKER).and_then(|f| f.get("text")));

    if found.is_some() {
        notes.note("found answer in JSON body");
    }
    found.map(value_text)
}

/// Remove quote characters and known artifacts of the source format.
fn strip_noise(text: &str) -> String {
    NOISE_FRAGMENTS
        .iter()
        .fold(text.replace('"', ""), |acc, noise| acc.replace(noise, ""))
}

fn value_text(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

fn is_base64_alphabet(data: &str) -> bool {
    data.chars()
        .all(|c| c.is_ascii_alphanumeric() || matches!(c, '+' | '/' | '='))
}

fn with_padding(data: &str) -> String {
    let mut padded = data.to_string();
    let missing = padded.len() % 4;
    if missing != 0 {
        padded.push_str(&"=".repeat(4 - missing));
    }
    padded
}

fn utf8_ignoring_errors(raw: &[u8]) -> String {
    raw.utf8_chunks().map(|chunk| chunk.valid()).collect()
}

fn preview(data: &str) -> String {
    data.chars().take(PREVIEW_CHARS).collect()
}
