//! Multi-dimension repository assessment.
//!
//! A snapshot is reduced to [`facts::SnapshotFacts`], turned into one prompt
//! per [`Dimension`], run through a [`TextGenerator`] and parsed back into
//! scored results. Live failures degrade one dimension at a time to the
//! simulated generator; they never abort the run.

pub mod facts;
pub mod generator;
pub mod heuristics;
pub mod live;
pub mod prompts;
pub mod response;

use crate::error::{AnalysisError, GenerateError};
use crate::models::report::{
    AnalysisDimensionResult, AnalysisReport, Dimension, DimensionSource, Recommendation, ReportSource,
    ReportSummary,
};
use crate::models::snapshot::RepositorySnapshot;
use facts::SnapshotFacts;
use generator::{SimulatedGenerator, TextGenerator};
use live::{ChatCompletionsGenerator, LiveSettings};
use log::{error, info, warn};
use prompts::DimensionPrompt;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

const STRENGTH_THRESHOLD: f64 = 7.0;
const IMPROVEMENT_THRESHOLD: f64 = 6.0;
const MAX_AREAS: usize = 5;
const COMMON_RECOMMENDATIONS: usize = 3;
const PRIORITY_ACTIONS: usize = 3;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AnalysisMode {
    #[default]
    Simulated,
    Live,
}

impl FromStr for AnalysisMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "simulated" => Ok(AnalysisMode::Simulated),
            "live" => Ok(AnalysisMode::Live),
            other => Err(format!("unknown analysis mode '{other}' (expected simulated or live)")),
        }
    }
}

impl fmt::Display for AnalysisMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            AnalysisMode::Simulated => "simulated",
            AnalysisMode::Live => "live",
        })
    }
}

pub struct Analyzer {
    simulated: SimulatedGenerator,
    live: Option<Arc<dyn TextGenerator>>,
}

impl Analyzer {
    pub fn new(live: Option<Arc<dyn TextGenerator>>) -> Self {
        Self {
            simulated: SimulatedGenerator,
            live,
        }
    }

    /// Live analysis is available only when an API key is configured.
    pub fn from_settings(settings: &LiveSettings) -> Result<Self, GenerateError> {
        let live = match ChatCompletionsGenerator::from_settings(settings) {
            Some(generator) => {
                let generator = generator?;
                info!(
                    "Live analysis enabled ({} / {})",
                    settings.provider.name(),
                    settings.model
                );
                Some(Arc::new(generator) as Arc<dyn TextGenerator>)
            }
            None => {
                info!("No API key configured; live analysis disabled");
                None
            }
        };
        Ok(Self::new(live))
    }

    pub fn live_available(&self) -> bool {
        self.live.is_some()
    }

    pub async fn analyze(
        &self,
        snapshot: &RepositorySnapshot,
        mode: AnalysisMode,
    ) -> Result<AnalysisReport, AnalysisError> {
        if snapshot.is_empty() {
            return Err(AnalysisError::EmptySnapshot);
        }
        let live = match mode {
            AnalysisMode::Simulated => None,
            AnalysisMode::Live => Some(self.live.as_ref().ok_or_else(|| {
                AnalysisError::Config("no API key configured for the live provider".to_string())
            })?),
        };

        let facts = Arc::new(SnapshotFacts::from_snapshot(snapshot));
        let mut results = BTreeMap::new();

        for prompt in prompts::build_prompts(snapshot, facts) {
            let result = match live {
                Some(generator) => match run(generator.as_ref(), &prompt).await {
                    Ok(response) => Some(to_result(&prompt, response, DimensionSource::Live, None)),
                    Err(e) => {
                        warn!(
                            "{} analysis via {} failed, using simulated result: {e}",
                            prompt.dimension,
                            generator.name()
                        );
                        self.simulate(&prompt, Some(e.to_string())).await
                    }
                },
                None => self.simulate(&prompt, None).await,
            };
            if let Some(result) = result {
                results.insert(prompt.dimension, result);
            }
        }

        let report = aggregate(snapshot.root.clone(), results);
        info!(
            "Analysis of {} complete: overall {:.1}, confidence {:.2}, source {:?}",
            report.repository, report.overall_score, report.confidence, report.source
        );
        Ok(report)
    }

    async fn simulate(
        &self,
        prompt: &DimensionPrompt,
        degraded_reason: Option<String>,
    ) -> Option<AnalysisDimensionResult> {
        let source = if degraded_reason.is_some() {
            DimensionSource::Degraded
        } else {
            DimensionSource::Simulated
        };
        match run(&self.simulated, prompt).await {
            Ok(response) => Some(to_result(prompt, response, source, degraded_reason)),
            Err(e) => {
                error!("Dropping {} from the report: {e}", prompt.dimension);
                None
            }
        }
    }
}

async fn run(
    generator: &dyn TextGenerator,
    prompt: &DimensionPrompt,
) -> Result<response::DimensionResponse, GenerateError> {
    let text = generator.generate(prompt).await?;
    response::parse_response(prompt.dimension, &text)
}

fn to_result(
    prompt: &DimensionPrompt,
    response: response::DimensionResponse,
    source: DimensionSource,
    degraded_reason: Option<String>,
) -> AnalysisDimensionResult {
    AnalysisDimensionResult {
        dimension: prompt.dimension,
        score: round1(response.score),
        findings: response.findings,
        recommendations: response.recommendations,
        source,
        degraded_reason,
    }
}

/// Fold per-dimension results into a report. Missing dimensions lower
/// `confidence` instead of being scored as zero.
pub fn aggregate(
    repository: String,
    dimensions: BTreeMap<Dimension, AnalysisDimensionResult>,
) -> AnalysisReport {
    let expected = Dimension::ALL.len();
    let overall_score = if dimensions.is_empty() {
        0.0
    } else {
        round1(dimensions.values().map(|d| d.score).sum::<f64>() / dimensions.len() as f64)
    };
    let confidence = (dimensions.len() as f64 / expected as f64 * 100.0).round() / 100.0;

    let degraded_dimensions: Vec<Dimension> = dimensions
        .values()
        .filter(|d| d.source == DimensionSource::Degraded)
        .map(|d| d.dimension)
        .collect();
    let all_live = dimensions.len() == expected
        && dimensions.values().all(|d| d.source == DimensionSource::Live);
    let source = if all_live {
        ReportSource::LiveApi
    } else {
        ReportSource::Simulated
    };

    let summary = summarize(&dimensions);

    AnalysisReport {
        id: uuid::Uuid::new_v4(),
        generated_at: chrono::Utc::now(),
        repository,
        overall_score,
        dimensions,
        source,
        confidence,
        degraded_dimensions,
        summary,
    }
}

pub fn summarize(dimensions: &BTreeMap<Dimension, AnalysisDimensionResult>) -> ReportSummary {
    let strengths = dimensions
        .values()
        .filter(|d| d.score >= STRENGTH_THRESHOLD)
        .map(|d| format!("Strong {} ({:.1}/10)", d.dimension.label(), d.score))
        .collect();

    let mut areas_for_improvement: Vec<String> = dimensions
        .values()
        .filter(|d| d.score < IMPROVEMENT_THRESHOLD)
        .map(|d| format!("Improve {} ({:.1}/10)", d.dimension.label(), d.score))
        .collect();

    // Most frequent recommendation titles; ties keep first-seen order.
    let mut counts: Vec<(&str, usize)> = Vec::new();
    for rec in dimensions.values().flat_map(|d| &d.recommendations) {
        match counts.iter_mut().find(|(title, _)| *title == rec.title) {
            Some((_, n)) => *n += 1,
            None => counts.push((rec.title.as_str(), 1)),
        }
    }
    counts.sort_by(|a, b| b.1.cmp(&a.1));
    for (title, _) in counts.into_iter().take(COMMON_RECOMMENDATIONS) {
        if !areas_for_improvement.iter().any(|a| a == title) {
            areas_for_improvement.push(title.to_string());
        }
    }
    areas_for_improvement.truncate(MAX_AREAS);

    let mut ranked: Vec<&Recommendation> = dimensions.values().flat_map(|d| &d.recommendations).collect();
    ranked.sort_by(|a, b| {
        b.priority
            .cmp(&a.priority)
            .then(b.impact.cmp(&a.impact))
            .then(a.effort.cmp(&b.effort))
    });
    let mut priority_actions: Vec<String> = Vec::new();
    for rec in ranked {
        let action = format!(
            "[{}] {} ({}; effort {}, impact {})",
            rec.priority, rec.title, rec.category, rec.effort, rec.impact
        );
        if !priority_actions.contains(&action) {
            priority_actions.push(action);
        }
        if priority_actions.len() == PRIORITY_ACTIONS {
            break;
        }
    }
    if priority_actions.is_empty() {
        priority_actions.push("Continue maintaining current quality standards".to_string());
    }

    ReportSummary {
        strengths,
        areas_for_improvement,
        priority_actions,
    }
}

pub fn round1(value: f64) -> f64 {
    (value * 10.0).round() / 10.0
}
