use async_trait::async_trait;
use git2::{Repository, Signature};
use repolens_lib::analysis::generator::TextGenerator;
use repolens_lib::analysis::prompts::DimensionPrompt;
use repolens_lib::error::{AnalysisError, GenerateError};
use repolens_lib::models::report::{Dimension, DimensionSource, ReportSource};
use repolens_lib::{collect, AnalysisMode, Analyzer, CollectOptions, ReportStore};
use std::fs;
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tempfile::TempDir;

fn create_repo(files: &[(&str, &str)]) -> TempDir {
    let temp_dir = tempfile::tempdir().expect("create temp dir");
    let repo = Repository::init(temp_dir.path()).expect("init git repo");
    repo.remote("origin", "https://github.com/example/site.git")
        .expect("add remote");

    let mut index = repo.index().expect("open git index");
    for (relative, contents) in files {
        let absolute = temp_dir.path().join(relative);
        fs::create_dir_all(absolute.parent().expect("parent")).expect("create dirs");
        fs::write(&absolute, contents).expect("write file");
        index.add_path(Path::new(relative)).expect("add file");
    }
    index.write().expect("write git index");
    let tree_id = index.write_tree().expect("write tree");
    let tree = repo.find_tree(tree_id).expect("find tree");
    let signature = Signature::now("Test User", "test@example.com").expect("signature");
    repo.commit(Some("HEAD"), &signature, &signature, "init", &tree, &[])
        .expect("commit");

    temp_dir
}

fn static_site() -> TempDir {
    create_repo(&[
        ("index.html", "<!doctype html><html><body><h1>Hi</h1></body></html>\n"),
        (
            "package.json",
            r#"{ "name": "site", "dependencies": { "@primer/css": "17.0.1" } }"#,
        ),
    ])
}

struct FailingGenerator {
    calls: AtomicUsize,
}

#[async_trait]
impl TextGenerator for FailingGenerator {
    fn name(&self) -> &str {
        "failing"
    }

    async fn generate(&self, _prompt: &DimensionPrompt) -> Result<String, GenerateError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Err(GenerateError::Timeout)
    }
}

struct EchoGenerator;

#[async_trait]
impl TextGenerator for EchoGenerator {
    fn name(&self) -> &str {
        "echo"
    }

    async fn generate(&self, prompt: &DimensionPrompt) -> Result<String, GenerateError> {
        Ok(format!(
            "Sure! ```json\n{{\"score\": 9, \"findings\": [\"reviewed {}\"], \"recommendations\": [\"Keep it up\"]}}\n```",
            prompt.dimension
        ))
    }
}

/// Answers like [`EchoGenerator`] except for one dimension, which times out.
struct FlakyGenerator {
    failing: Dimension,
}

#[async_trait]
impl TextGenerator for FlakyGenerator {
    fn name(&self) -> &str {
        "flaky"
    }

    async fn generate(&self, prompt: &DimensionPrompt) -> Result<String, GenerateError> {
        if prompt.dimension == self.failing {
            return Err(GenerateError::Timeout);
        }
        EchoGenerator.generate(prompt).await
    }
}

#[tokio::test]
async fn simulated_analysis_covers_every_dimension_within_bounds() {
    let tmp = static_site();
    let snapshot = collect(tmp.path(), &CollectOptions::default()).expect("collect snapshot");

    assert_eq!(snapshot.git_info.remotes[0].name, "origin");
    assert_eq!(snapshot.dependencies["npm"]["@primer/css"], "17.0.1");

    let report = Analyzer::new(None)
        .analyze(&snapshot, AnalysisMode::Simulated)
        .await
        .expect("analyze");

    assert_eq!(report.dimensions.len(), Dimension::ALL.len());
    assert!((0.0..=10.0).contains(&report.overall_score));
    assert_eq!(report.source, ReportSource::Simulated);
    assert_eq!(report.confidence, 1.0);
    assert!(report.degraded_dimensions.is_empty());
    assert!(report
        .dimensions
        .values()
        .all(|d| !d.findings.is_empty() && d.source == DimensionSource::Simulated));
}

#[tokio::test]
async fn undocumented_static_site_scores_documentation_below_security() {
    let tmp = static_site();
    let snapshot = collect(tmp.path(), &CollectOptions::default()).expect("collect snapshot");

    let report = Analyzer::new(None)
        .analyze(&snapshot, AnalysisMode::Simulated)
        .await
        .expect("analyze");

    let documentation = report.score(Dimension::Documentation).expect("documentation");
    let security = report.score(Dimension::Security).expect("security");
    assert!(documentation < security, "{documentation} >= {security}");
    assert!(report
        .summary
        .areas_for_improvement
        .iter()
        .any(|a| a.contains("Documentation")));
}

#[tokio::test]
async fn simulated_analysis_is_deterministic() {
    let tmp = create_repo(&[
        ("README.md", "# Demo\n\n## Setup\n\nRun it.\n"),
        ("src/main.py", "# TODO: tidy\nprint('hi')\n"),
        ("tests/test_main.py", "def test_ok():\n    assert True\n"),
        ("requirements.txt", "flask==2.3.2\n"),
    ]);
    let snapshot = collect(tmp.path(), &CollectOptions::default()).expect("collect snapshot");
    let analyzer = Analyzer::new(None);

    let first = analyzer.analyze(&snapshot, AnalysisMode::Simulated).await.expect("first");
    let second = analyzer.analyze(&snapshot, AnalysisMode::Simulated).await.expect("second");

    assert_ne!(first.id, second.id);
    assert_eq!(first.overall_score, second.overall_score);
    assert_eq!(first.dimensions, second.dimensions);
    assert_eq!(first.summary, second.summary);
}

#[tokio::test]
async fn failing_live_generator_degrades_every_dimension() {
    let tmp = static_site();
    let snapshot = collect(tmp.path(), &CollectOptions::default()).expect("collect snapshot");
    let generator = Arc::new(FailingGenerator {
        calls: AtomicUsize::new(0),
    });

    let report = Analyzer::new(Some(generator.clone()))
        .analyze(&snapshot, AnalysisMode::Live)
        .await
        .expect("analysis survives live failures");

    assert_eq!(generator.calls.load(Ordering::SeqCst), Dimension::ALL.len());
    assert_eq!(report.source, ReportSource::Simulated);
    assert_eq!(report.degraded_dimensions, Dimension::ALL.to_vec());
    assert!(report.dimensions.values().all(|d| {
        d.source == DimensionSource::Degraded && d.degraded_reason.as_deref() == Some("request timed out")
    }));

    let simulated = Analyzer::new(None)
        .analyze(&snapshot, AnalysisMode::Simulated)
        .await
        .expect("simulated");
    assert_eq!(report.overall_score, simulated.overall_score);
}

#[tokio::test]
async fn live_generator_output_is_parsed_from_prose() {
    let tmp = static_site();
    let snapshot = collect(tmp.path(), &CollectOptions::default()).expect("collect snapshot");

    let report = Analyzer::new(Some(Arc::new(EchoGenerator)))
        .analyze(&snapshot, AnalysisMode::Live)
        .await
        .expect("analyze");

    assert_eq!(report.source, ReportSource::LiveApi);
    assert_eq!(report.overall_score, 9.0);
    let security = &report.dimensions[&Dimension::Security];
    assert_eq!(security.findings, vec!["reviewed security".to_string()]);
    assert_eq!(security.recommendations[0].category, "Security");
}

#[tokio::test]
async fn one_degraded_dimension_marks_the_whole_report_simulated() {
    let tmp = static_site();
    let snapshot = collect(tmp.path(), &CollectOptions::default()).expect("collect snapshot");

    let report = Analyzer::new(Some(Arc::new(FlakyGenerator {
        failing: Dimension::Security,
    })))
    .analyze(&snapshot, AnalysisMode::Live)
    .await
    .expect("analyze");

    assert_eq!(report.source, ReportSource::Simulated);
    assert_eq!(report.degraded_dimensions, vec![Dimension::Security]);
    assert_eq!(report.confidence, 1.0);
    assert_eq!(report.dimensions.len(), Dimension::ALL.len());

    let security = &report.dimensions[&Dimension::Security];
    assert_eq!(security.source, DimensionSource::Degraded);
    assert_eq!(security.degraded_reason.as_deref(), Some("request timed out"));
    assert!(report
        .dimensions
        .values()
        .filter(|d| d.dimension != Dimension::Security)
        .all(|d| d.source == DimensionSource::Live && d.score == 9.0));
}

#[tokio::test]
async fn live_mode_without_generator_is_a_config_error() {
    let tmp = static_site();
    let snapshot = collect(tmp.path(), &CollectOptions::default()).expect("collect snapshot");

    let err = Analyzer::new(None)
        .analyze(&snapshot, AnalysisMode::Live)
        .await
        .unwrap_err();
    assert!(matches!(err, AnalysisError::Config(_)));
}

#[tokio::test]
async fn empty_repository_is_rejected() {
    let tmp = tempfile::tempdir().expect("create temp dir");
    fs::create_dir_all(tmp.path().join("empty")).expect("create dir");
    let snapshot = collect(tmp.path(), &CollectOptions::default()).expect("collect snapshot");

    let err = Analyzer::new(None)
        .analyze(&snapshot, AnalysisMode::Simulated)
        .await
        .unwrap_err();
    assert!(matches!(err, AnalysisError::EmptySnapshot));
}

#[tokio::test]
async fn store_round_trips_latest_report_across_reopen() {
    let tmp = static_site();
    let report_path = tmp.path().join(".repolens").join("analysis_report.json");
    let store = ReportStore::open(&report_path).expect("open store");
    assert!(store.load_latest().expect("load").is_none());

    let snapshot = collect(tmp.path(), &CollectOptions::default()).expect("collect snapshot");
    let report = Analyzer::new(None)
        .analyze(&snapshot, AnalysisMode::Simulated)
        .await
        .expect("analyze");
    store.save(&report).expect("save");

    let latest = store.load_latest().expect("load").expect("report present");
    assert_eq!(latest.id, report.id);

    let reopened = ReportStore::open(&report_path).expect("reopen store");
    let persisted = reopened.load_latest().expect("load").expect("report persisted");
    assert_eq!(persisted.id, report.id);
    assert_eq!(persisted.dimensions.len(), report.dimensions.len());

    // The store directory itself is excluded from later snapshots.
    let again = collect(tmp.path(), &CollectOptions::default()).expect("collect snapshot");
    assert!(again.structure.keys().all(|p| !p.starts_with(".repolens")));
}
