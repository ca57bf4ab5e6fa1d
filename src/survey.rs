//! Research-paper survey domain: the paper work item, its summarization
//! prompt, and the typed summary record the sweep produces.

use crate::types::message::Prompt;
use crate::types::work::WorkItem;
use crate::{Error, Result};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use serde_json::Value;

const SYSTEM_PROMPT: &str = "You will play the role of a researcher in multi-agent \
reinforcement learning. You will be given the title of a paper from the field. Go through \
the paper and assign it a topic of no more than two words, then describe the problem it \
addresses, the solution it proposes, the benchmarks it uses, the challenges in multi-agent \
RL it tackles, and future work that could extend it.";

/// A paper to be summarized, identified by its title.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Paper {
    pub title: String,
}

impl Paper {
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
        }
    }
}

impl WorkItem for Paper {
    fn title(&self) -> &str {
        &self.title
    }

    fn prompt(&self) -> Prompt {
        let user = format!(
            "Paper title is {}.\n\
             Reply with a single fenced JSON object of this exact shape:\n\
             ```json\n\
             {{\"title\": \"<title of the paper>\", \"topic\": \"<topic, not a copy of the title>\", \
             \"problem\": \"\", \"solution\": \"\", \"benchmarks\": \"\", \"challenges\": \"\"}}\n\
             ```",
            self.title
        );
        Prompt::new(SYSTEM_PROMPT, user)
    }
}

/// Structured summary the model is asked to produce for one paper.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct PaperSummary {
    pub title: String,
    pub topic: String,
    pub problem: String,
    pub solution: String,
    pub benchmarks: String,
    pub challenges: String,
}

/// JSON Schema for [`PaperSummary`], suitable for
/// [`FencedJsonProcessor::with_schema`](crate::extract::FencedJsonProcessor::with_schema).
pub fn summary_schema() -> Result<Value> {
    let schema = schemars::schema_for!(PaperSummary);
    serde_json::to_value(&schema)
        .map_err(|e| Error::internal(format!("summary schema does not serialize: {e}")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::extract::{FencedJsonProcessor, ResultProcessor};

    #[test]
    fn test_prompt_carries_title_and_shape() {
        let paper = Paper::new("Emergent Tool Use From Multi-Agent Autocurricula");
        let prompt = paper.prompt();
        assert!(prompt.system.contains("reinforcement learning"));
        assert!(prompt
            .user
            .contains("Paper title is Emergent Tool Use From Multi-Agent Autocurricula"));
        assert!(prompt.user.contains("```json"));
    }

    #[test]
    fn test_schema_requires_all_fields() {
        let schema = summary_schema().unwrap();
        let required = schema["required"].as_array().unwrap();
        for field in [
            "title",
            "topic",
            "problem",
            "solution",
            "benchmarks",
            "challenges",
        ] {
            assert!(required.iter().any(|v| v == field), "missing {field}");
        }
    }

    #[test]
    fn test_processor_accepts_complete_summary() {
        let processor = FencedJsonProcessor::with_schema(&summary_schema().unwrap()).unwrap();
        let content = "```json\n{\"title\": \"T\", \"topic\": \"credit assignment\", \
                       \"problem\": \"p\", \"solution\": \"s\", \"benchmarks\": \"SMAC\", \
                       \"challenges\": \"c\"}\n```";
        let payload = processor.process(content).unwrap();
        let summary: PaperSummary = serde_json::from_value(payload).unwrap();
        assert_eq!(summary.benchmarks, "SMAC");
    }

    #[test]
    fn test_processor_rejects_partial_summary() {
        let processor = FencedJsonProcessor::with_schema(&summary_schema().unwrap()).unwrap();
        let content = "```json\n{\"title\": \"T\"}\n```";
        assert!(processor.process(content).is_err());
    }
}
