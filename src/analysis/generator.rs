use super::heuristics;
use super::prompts::DimensionPrompt;
use crate::error::GenerateError;
use async_trait::async_trait;

/// Turns a dimension prompt into raw model text. Implementations return the
/// JSON-bearing text unparsed; the analyzer validates it.
#[async_trait]
pub trait TextGenerator: Send + Sync {
    fn name(&self) -> &str;

    async fn generate(&self, prompt: &DimensionPrompt) -> Result<String, GenerateError>;
}

/// Offline generator. Scores come from snapshot heuristics, so the same
/// snapshot always produces the same text.
#[derive(Debug, Clone, Copy, Default)]
pub struct SimulatedGenerator;

#[async_trait]
impl TextGenerator for SimulatedGenerator {
    fn name(&self) -> &str {
        "simulated"
    }

    async fn generate(&self, prompt: &DimensionPrompt) -> Result<String, GenerateError> {
        let response = heuristics::assess(prompt.dimension, &prompt.facts);
        serde_json::to_string_pretty(&response).map_err(|e| GenerateError::Malformed(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::facts::SnapshotFacts;
    use crate::analysis::response::parse_response;
    use crate::models::report::Dimension;
    use std::sync::Arc;

    #[tokio::test]
    async fn simulated_output_parses_like_live_output() {
        let prompt = DimensionPrompt {
            dimension: Dimension::Documentation,
            text: String::new(),
            facts: Arc::new(SnapshotFacts::default()),
        };

        let text = SimulatedGenerator.generate(&prompt).await.unwrap();
        let parsed = parse_response(Dimension::Documentation, &text).unwrap();
        let again = parse_response(
            Dimension::Documentation,
            &SimulatedGenerator.generate(&prompt).await.unwrap(),
        )
        .unwrap();

        assert_eq!(parsed, again);
        assert_eq!(parsed.score, 1.0);
    }
}
