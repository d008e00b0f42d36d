use crate::error::GenerateError;
use crate::models::report::{Dimension, Level, Recommendation};
use regex::Regex;
use serde::{Deserialize, Serialize};

/// The JSON object every generator is asked to produce for one dimension.
/// The simulated generator serializes this directly; live responses are
/// parsed back into it.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DimensionResponse {
    pub score: f64,
    pub findings: Vec<String>,
    pub recommendations: Vec<Recommendation>,
}

#[derive(Deserialize)]
struct RawResponse {
    score: RawScore,
    #[serde(default, alias = "issues", alias = "observations")]
    findings: Vec<String>,
    #[serde(default, alias = "suggestions")]
    recommendations: Vec<RawRecommendation>,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum RawScore {
    Number(f64),
    Text(String),
}

#[derive(Deserialize)]
#[serde(untagged)]
enum RawRecommendation {
    Title(String),
    Detailed {
        #[serde(alias = "task", alias = "action")]
        title: String,
        #[serde(default)]
        category: Option<String>,
        #[serde(default)]
        effort: Option<String>,
        #[serde(default)]
        impact: Option<String>,
        #[serde(default)]
        priority: Option<String>,
    },
}

/// Parse generator output for `dimension`. Surrounding prose and code fences
/// are tolerated; the object between the first `{` and the last `}` is used.
pub fn parse_response(dimension: Dimension, text: &str) -> Result<DimensionResponse, GenerateError> {
    let (Some(start), Some(end)) = (text.find('{'), text.rfind('}')) else {
        return Err(GenerateError::Malformed("no JSON object in response".to_string()));
    };
    if end < start {
        return Err(GenerateError::Malformed("no JSON object in response".to_string()));
    }

    let raw: RawResponse = serde_json::from_str(&text[start..=end])
        .map_err(|e| GenerateError::Malformed(format!("invalid JSON: {e}")))?;

    let score = match raw.score {
        RawScore::Number(n) => n,
        RawScore::Text(s) => score_from_text(&s)
            .ok_or_else(|| GenerateError::Malformed(format!("unreadable score {s:?}")))?,
    };
    if !score.is_finite() || !(0.0..=10.0).contains(&score) {
        return Err(GenerateError::Malformed(format!("score {score} outside 0-10")));
    }

    let findings: Vec<String> = raw
        .findings
        .into_iter()
        .map(|f| f.trim().to_string())
        .filter(|f| !f.is_empty())
        .collect();
    if findings.is_empty() {
        return Err(GenerateError::Malformed(
            "score is not backed by any finding".to_string(),
        ));
    }

    let recommendations = raw
        .recommendations
        .into_iter()
        .filter_map(|r| to_recommendation(dimension, r))
        .collect();

    Ok(DimensionResponse {
        score,
        findings,
        recommendations,
    })
}

fn to_recommendation(dimension: Dimension, raw: RawRecommendation) -> Option<Recommendation> {
    let level = |value: Option<String>| {
        value
            .as_deref()
            .and_then(Level::parse)
            .unwrap_or(Level::Medium)
    };

    let recommendation = match raw {
        RawRecommendation::Title(title) => Recommendation {
            title: title.trim().to_string(),
            category: dimension.label().to_string(),
            effort: Level::Medium,
            impact: Level::Medium,
            priority: Level::Medium,
        },
        RawRecommendation::Detailed {
            title,
            category,
            effort,
            impact,
            priority,
        } => Recommendation {
            title: title.trim().to_string(),
            category: category
                .map(|c| c.trim().to_string())
                .filter(|c| !c.is_empty())
                .unwrap_or_else(|| dimension.label().to_string()),
            effort: level(effort),
            impact: level(impact),
            priority: level(priority),
        },
    };

    (!recommendation.title.is_empty()).then_some(recommendation)
}

/// First number in strings like `"7/10"` or `"Good (8.5)"`.
fn score_from_text(text: &str) -> Option<f64> {
    let number = Regex::new(r"\d+(?:\.\d+)?").ok()?;
    number.find(text)?.as_str().parse().ok()
}
