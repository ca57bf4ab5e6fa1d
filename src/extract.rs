//! Turning completion text into validated structured records.
//!
//! Providers are asked for a fenced JSON object; [`FencedJsonProcessor`]
//! strips the fence, parses the interior and optionally validates it against
//! a JSON Schema. Anything that goes wrong here is an [`Error::Parse`], so the
//! item is re-dispatched on a later round instead of poisoning the batch.

use crate::{Error, Result};
use jsonschema::{Draft, JSONSchema};
use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::Value;

/// Interprets one completion's text as a structured record.
pub trait ResultProcessor: Send + Sync {
    fn process(&self, content: &str) -> Result<Value>;
}

/// First fenced code block: optional language tag, then the body.
static FENCE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?s)```[a-zA-Z0-9_+-]*[ \t]*\r?\n(.*?)```").expect("fence regex"));

/// Default processor: Markdown fence -> JSON parse -> optional schema check.
#[derive(Debug)]
pub struct FencedJsonProcessor {
    schema: Option<JSONSchema>,
}

impl FencedJsonProcessor {
    /// Fence stripping and JSON parsing only, no schema validation.
    pub fn new() -> Self {
        Self { schema: None }
    }

    /// Validate every parsed payload against `schema` (Draft 7).
    pub fn with_schema(schema: &Value) -> Result<Self> {
        let compiled = JSONSchema::options()
            .with_draft(Draft::Draft7)
            .compile(schema)
            .map_err(|e| Error::config(format!("invalid result schema: {e}")))?;
        Ok(Self {
            schema: Some(compiled),
        })
    }

    fn check(&self, payload: &Value) -> Result<()> {
        let schema = match &self.schema {
            Some(s) => s,
            None => return Ok(()),
        };
        if let Err(errors) = schema.validate(payload) {
            let msgs: Vec<String> = errors.map(|e| e.to_string()).collect();
            return Err(Error::parse(format!(
                "payload failed schema validation: {}",
                msgs.join("; ")
            )));
        }
        Ok(())
    }
}

impl Default for FencedJsonProcessor {
    fn default() -> Self {
        Self::new()
    }
}

impl ResultProcessor for FencedJsonProcessor {
    fn process(&self, content: &str) -> Result<Value> {
        let body = fenced_body(content);
        let payload: Value = serde_json::from_str(body)
            .map_err(|e| Error::parse(format!("payload is not valid JSON: {e}")))?;
        self.check(&payload)?;
        Ok(payload)
    }
}

/// Body of the first fenced block, or the whole text when the model skipped
/// the fence.
fn fenced_body(content: &str) -> &str {
    FENCE
        .captures(content)
        .and_then(|c| c.get(1))
        .map(|m| m.as_str())
        .unwrap_or(content)
        .trim()
}
