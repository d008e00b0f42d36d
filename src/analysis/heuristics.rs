//! Deterministic per-dimension assessment derived from [`SnapshotFacts`].
//!
//! Each rule adjusts a dimension's base score and records the observation
//! behind the adjustment, so every score is explained by its findings.

use super::facts::SnapshotFacts;
use super::response::DimensionResponse;
use crate::models::report::{Dimension, Level, Recommendation};

const QUALITY_BASE: f64 = 5.0;
const SECURITY_BASE: f64 = 8.0;
const STACK_BASE: f64 = 5.0;
const ARCHITECTURE_BASE: f64 = 4.0;
const DOCUMENTATION_BASE: f64 = 1.0;

const LARGE_DEPENDENCY_FOOTPRINT: usize = 150;
const DEEP_NESTING: usize = 6;

struct Assessment {
    dimension: Dimension,
    score: f64,
    findings: Vec<String>,
    recommendations: Vec<Recommendation>,
}

impl Assessment {
    fn new(dimension: Dimension, base: f64) -> Self {
        Self {
            dimension,
            score: base,
            findings: Vec::new(),
            recommendations: Vec::new(),
        }
    }

    fn adjust(&mut self, delta: f64, finding: impl Into<String>) {
        self.score += delta;
        self.findings.push(finding.into());
    }

    fn note(&mut self, finding: impl Into<String>) {
        self.findings.push(finding.into());
    }

    fn recommend(&mut self, title: &str, effort: Level, impact: Level, priority: Level) {
        self.recommendations.push(Recommendation {
            title: title.to_string(),
            category: self.dimension.label().to_string(),
            effort,
            impact,
            priority,
        });
    }

    fn finish(self) -> DimensionResponse {
        DimensionResponse {
            score: ((self.score.clamp(0.0, 10.0)) * 10.0).round() / 10.0,
            findings: self.findings,
            recommendations: self.recommendations,
        }
    }
}

pub fn assess(dimension: Dimension, facts: &SnapshotFacts) -> DimensionResponse {
    match dimension {
        Dimension::Quality => quality(facts),
        Dimension::Security => security(facts),
        Dimension::Stack => stack(facts),
        Dimension::Architecture => architecture(facts),
        Dimension::Documentation => documentation(facts),
    }
}

fn quality(facts: &SnapshotFacts) -> DimensionResponse {
    let mut a = Assessment::new(Dimension::Quality, QUALITY_BASE);
    a.note(format!(
        "{} source files across {} recognized languages",
        facts.source_file_count,
        facts.languages.len()
    ));

    if facts.test_file_count > 0 {
        a.adjust(1.5, format!("{} test files detected", facts.test_file_count));
    } else {
        a.adjust(-1.0, "No automated tests detected");
        a.recommend("Implement a unit testing framework", Level::Medium, Level::High, Level::High);
    }

    if facts.workflow_count > 0 {
        a.adjust(1.0, format!("{} CI workflow(s) run on the repository", facts.workflow_count));
    } else {
        a.note("No CI workflow runs checks on changes");
        a.recommend("Add a CI workflow that runs tests and checks", Level::Low, Level::Medium, Level::Medium);
    }

    if facts.has_lint_config {
        a.adjust(1.0, "Linter or formatter configuration present");
    } else {
        a.note("No linter or formatter configuration found");
        a.recommend("Add code quality checks to the workflow", Level::Low, Level::Medium, Level::Medium);
    }

    if facts.has_gitignore {
        a.adjust(0.5, ".gitignore keeps build output out of version control");
    } else {
        a.note("No .gitignore at the repository root");
        a.recommend("Add a .gitignore for generated files", Level::Low, Level::Low, Level::Low);
    }

    if facts.todo_count > 0 {
        let penalty = ((facts.todo_count / 5) as f64 * 0.5).min(1.5);
        a.adjust(-penalty, format!("{} TODO/FIXME markers in code comments", facts.todo_count));
        if facts.todo_count >= 5 {
            a.recommend("Triage outstanding TODO/FIXME markers", Level::Medium, Level::Low, Level::Low);
        }
    }

    a.finish()
}

fn security(facts: &SnapshotFacts) -> DimensionResponse {
    let mut a = Assessment::new(Dimension::Security, SECURITY_BASE);

    if facts.secret_locations.is_empty() {
        a.note(format!(
            "No hard-coded credentials found in {} text files",
            facts.text_file_count
        ));
    } else {
        let count = facts.secret_locations.len();
        let penalty = (2.5 + 0.5 * (count - 1) as f64).min(5.0);
        a.adjust(-penalty, format!("{count} possible hard-coded credential(s)"));
        for location in facts.secret_locations.iter().take(3) {
            a.note(format!("Possible secret at {location}"));
        }
        a.recommend("Remove hard-coded credentials and rotate them", Level::Medium, Level::High, Level::High);
    }

    if !facts.env_files.is_empty() {
        a.adjust(-1.5, format!("Environment file committed: {}", facts.env_files.join(", ")));
        a.recommend("Stop committing .env files and add them to .gitignore", Level::Low, Level::High, Level::High);
    }

    if facts.dependency_count == 0 {
        a.note("No third-party dependencies declared");
    } else if facts.lockfiles.is_empty() {
        a.adjust(
            -1.0,
            format!("{} dependencies declared without a lockfile", facts.dependency_count),
        );
        a.recommend("Commit a lockfile to pin dependency versions", Level::Low, Level::Medium, Level::Medium);
    } else {
        a.adjust(0.5, format!("Dependency versions pinned by {}", facts.lockfiles.join(", ")));
    }

    if facts.has_dependabot {
        a.adjust(0.5, "Automated dependency updates configured");
    } else if facts.dependency_count > 0 {
        a.recommend("Enable automated dependency update pull requests", Level::Low, Level::Medium, Level::Low);
    }

    if facts.has_security_policy {
        a.adjust(0.5, "Security policy describes how to report vulnerabilities");
    } else {
        a.recommend("Publish a SECURITY.md with a disclosure process", Level::Low, Level::Low, Level::Low);
    }

    a.finish()
}

fn stack(facts: &SnapshotFacts) -> DimensionResponse {
    let mut a = Assessment::new(Dimension::Stack, STACK_BASE);

    match facts.languages.len() {
        0 => a.note("No recognized programming languages"),
        1..=4 => {
            let names: Vec<&str> = facts.languages.iter().copied().collect();
            a.adjust(1.0, format!("Focused language mix: {}", names.join(", ")));
        }
        n => {
            a.note(format!("Broad mix of {n} languages"));
            a.recommend("Consolidate on fewer languages and toolchains", Level::High, Level::Medium, Level::Low);
        }
    }

    if facts.manifests.is_empty() {
        a.note("No package manifest declares the project's dependencies");
        a.recommend("Declare dependencies in a package manifest", Level::Low, Level::Medium, Level::Medium);
    } else {
        a.adjust(1.0, format!("Package manifests: {}", facts.manifests.join(", ")));
    }

    if !facts.lockfiles.is_empty() {
        a.adjust(1.0, "Builds are reproducible from a committed lockfile");
    } else if !facts.manifests.is_empty() {
        a.note("Builds resolve dependency versions at install time");
    }

    if facts.workflow_count > 0 {
        a.adjust(1.0, format!("GitHub Actions automation ({} workflows)", facts.workflow_count));
    }

    if facts.dependency_count > LARGE_DEPENDENCY_FOOTPRINT {
        a.adjust(-1.0, format!("Large dependency footprint ({} packages)", facts.dependency_count));
        a.recommend("Audit and prune unused dependencies", Level::Medium, Level::Medium, Level::Low);
    } else if facts.dependency_count > 0 {
        a.adjust(0.5, format!("{} declared dependencies", facts.dependency_count));
    }

    a.finish()
}

fn architecture(facts: &SnapshotFacts) -> DimensionResponse {
    let mut a = Assessment::new(Dimension::Architecture, ARCHITECTURE_BASE);

    match &facts.source_dir {
        Some(dir) => a.adjust(1.5, format!("Source code organized under {dir}/")),
        None => {
            a.note("Source files live at the repository root");
            a.recommend("Move code into a dedicated source directory", Level::Medium, Level::Medium, Level::Low);
        }
    }

    if facts.has_test_dir {
        a.adjust(1.0, "Tests kept in a separate directory");
    }

    if facts.top_level_dirs.len() >= 2 {
        a.adjust(
            1.0,
            format!("{} top-level directories separate concerns", facts.top_level_dirs.len()),
        );
    }

    if !facts.manifests.is_empty() && facts.top_level_dirs.iter().any(|d| d == ".github" || d == "config") {
        a.adjust(0.5, "Build and automation configuration kept apart from code");
    }

    match facts.max_depth {
        0 => {
            a.note("Flat layout: every file sits at the repository root");
            a.recommend(
                "Introduce a component-based layout as the project grows",
                Level::High,
                Level::Medium,
                Level::Low,
            );
        }
        d if d > DEEP_NESTING => {
            a.adjust(-0.5, format!("Deeply nested tree ({d} levels)"));
            a.recommend("Flatten deeply nested directories", Level::Medium, Level::Low, Level::Low);
        }
        d => a.adjust(1.0, format!("Moderate nesting depth ({d} levels)")),
    }

    a.finish()
}

fn documentation(facts: &SnapshotFacts) -> DimensionResponse {
    let mut a = Assessment::new(Dimension::Documentation, DOCUMENTATION_BASE);

    match &facts.readme_path {
        Some(path) => {
            a.adjust(
                2.0,
                format!(
                    "{path} present ({} characters, {} sections)",
                    facts.readme_chars, facts.readme_sections
                ),
            );
            if facts.readme_chars >= 500 {
                a.adjust(1.0, "README covers more than a one-line description");
            } else {
                a.note("README is minimal");
                a.recommend(
                    "Expand the README with setup instructions and usage examples",
                    Level::Low,
                    Level::Medium,
                    Level::High,
                );
            }
            if facts.readme_chars >= 2000 {
                a.adjust(1.0, "README is detailed");
            }
            if facts.readme_sections >= 3 {
                a.adjust(1.0, "README is organized into sections");
            }
        }
        None => {
            a.note("No README found");
            a.recommend(
                "Add a README describing purpose, setup and usage",
                Level::Low,
                Level::High,
                Level::High,
            );
        }
    }

    if facts.has_license {
        a.adjust(1.0, "License file present");
    } else {
        a.recommend("Add a LICENSE file", Level::Low, Level::Medium, Level::Medium);
    }

    if facts.has_contributing {
        a.adjust(1.0, "Contributing guidelines present");
    } else {
        a.recommend("Create contributing guidelines", Level::Low, Level::Low, Level::Low);
    }

    if facts.has_docs_dir {
        a.adjust(1.0, "Dedicated docs directory");
    } else {
        a.recommend("Add API or architecture documentation under docs/", Level::Medium, Level::Medium, Level::Low);
    }

    if facts.has_changelog {
        a.adjust(0.5, "Changelog tracks releases");
    }

    a.finish()
}
