use super::facts::{detect_language, is_code_language, redact_secrets, secret_patterns, SnapshotFacts};
use regex::Regex;
use crate::models::report::Dimension;
use crate::models::snapshot::RepositorySnapshot;
use std::fmt::Write;
use std::sync::Arc;

/// Characters of a single file included in a prompt.
pub const EXCERPT_CHARS: usize = 2000;
const TREE_LINES: usize = 200;
const COMMIT_LINES: usize = 5;

/// One dimension's request to a [`TextGenerator`](super::generator::TextGenerator).
/// `text` is the natural-language prompt sent to live models; `facts` carries
/// the same snapshot for the simulated path.
#[derive(Debug, Clone)]
pub struct DimensionPrompt {
    pub dimension: Dimension,
    pub text: String,
    pub facts: Arc<SnapshotFacts>,
}

pub fn build_prompts(snapshot: &RepositorySnapshot, facts: Arc<SnapshotFacts>) -> Vec<DimensionPrompt> {
    let context = render_context(snapshot);
    let patterns = secret_patterns();
    Dimension::ALL
        .iter()
        .map(|dimension| DimensionPrompt {
            dimension: *dimension,
            text: render_prompt(*dimension, snapshot, &facts, &context, &patterns),
            facts: facts.clone(),
        })
        .collect()
}

fn render_prompt(
    dimension: Dimension,
    snapshot: &RepositorySnapshot,
    facts: &SnapshotFacts,
    context: &str,
    patterns: &[Regex],
) -> String {
    let mut prompt = String::new();
    let _ = writeln!(
        prompt,
        "You are reviewing the repository \"{}\" for {}.\n",
        facts.repository_name,
        focus(dimension)
    );
    prompt.push_str(context);

    let excerpts = select_excerpts(dimension, snapshot, facts);
    if !excerpts.is_empty() {
        prompt.push_str("\nFILE EXCERPTS:\n");
        for path in excerpts {
            let Some(text) = snapshot.text(path) else {
                continue;
            };
            // Excerpts leave the machine in live mode.
            let text = redact_secrets(text, patterns);
            let excerpt: String = text.chars().take(EXCERPT_CHARS).collect();
            let truncated = if excerpt.len() < text.len() { " (truncated)" } else { "" };
            let _ = writeln!(prompt, "--- {path}{truncated} ---\n{excerpt}");
        }
    }

    prompt.push_str("\nEvaluate:\n");
    for (index, item) in rubric(dimension).iter().enumerate() {
        let _ = writeln!(prompt, "{}. {item}", index + 1);
    }

    prompt.push_str(
        "\nRespond with a single JSON object and nothing else:\n\
         {\"score\": <number from 0 to 10>, \"findings\": [\"<specific observation>\", ...], \
         \"recommendations\": [{\"title\": \"...\", \"category\": \"...\", \
         \"effort\": \"low|medium|high\", \"impact\": \"low|medium|high\", \"priority\": \"low|medium|high\"}]}\n\
         Every score must be supported by at least one finding.\n",
    );
    prompt
}

/// Structure, dependencies and git history, shared by every dimension.
fn render_context(snapshot: &RepositorySnapshot) -> String {
    let mut out = String::new();
    let _ = writeln!(
        out,
        "REPOSITORY STRUCTURE ({} files):\n{}\n",
        snapshot.file_count(),
        snapshot.render_tree(TREE_LINES)
    );

    out.push_str("DEPENDENCIES:\n");
    if snapshot.dependencies.is_empty() {
        out.push_str("(none declared)\n");
    }
    for (ecosystem, packages) in &snapshot.dependencies {
        let list: Vec<String> = packages
            .iter()
            .map(|(name, version)| format!("{name} {version}"))
            .collect();
        let _ = writeln!(out, "{ecosystem}: {}", list.join(", "));
    }

    if !snapshot.workflows.is_empty() {
        let _ = writeln!(out, "\nCI WORKFLOWS: {}", snapshot.workflows.join(", "));
    }

    let git = &snapshot.git_info;
    if !git.is_empty() {
        out.push_str("\nGIT:\n");
        if let Some(branch) = git.current_branch() {
            let _ = writeln!(out, "Branch: {branch}");
        }
        for remote in &git.remotes {
            let _ = writeln!(out, "Remote {}: {}", remote.name, remote.url);
        }
        for commit in git.recent_commits.iter().take(COMMIT_LINES) {
            let _ = writeln!(out, "{} {} ({})", commit.id, commit.summary, commit.author);
        }
    }

    out
}

fn select_excerpts<'a>(
    dimension: Dimension,
    snapshot: &'a RepositorySnapshot,
    facts: &'a SnapshotFacts,
) -> Vec<&'a str> {
    let mut paths: Vec<&str> = Vec::new();
    let is_code = |path: &str| detect_language(path).map(is_code_language).unwrap_or(false);

    match dimension {
        Dimension::Quality => {
            paths.extend(snapshot.files().filter(|p| is_code(*p)).take(5));
        }
        Dimension::Security => {
            paths.extend(facts.manifests.iter().map(String::as_str));
            paths.extend(snapshot.workflows.iter().map(String::as_str));
            paths.extend(
                facts
                    .secret_locations
                    .iter()
                    .filter_map(|loc| loc.rsplit_once(':').map(|(path, _)| path)),
            );
            paths.dedup();
            paths.truncate(6);
        }
        Dimension::Stack => {
            paths.extend(facts.manifests.iter().map(String::as_str));
            paths.extend(snapshot.workflows.iter().map(String::as_str));
            paths.truncate(5);
        }
        Dimension::Architecture => {
            paths.extend(facts.manifests.iter().map(String::as_str).take(1));
            paths.extend(
                snapshot
                    .files()
                    .filter(|p| is_entry_point(p))
                    .take(3),
            );
        }
        Dimension::Documentation => {
            paths.extend(facts.readme_path.as_deref());
            paths.extend(
                snapshot
                    .files()
                    .filter(|p| p.ends_with(".md") && Some(*p) != facts.readme_path.as_deref())
                    .take(4),
            );
        }
    }

    paths
}

fn is_entry_point(path: &str) -> bool {
    let name = path.rsplit('/').next().unwrap_or(path);
    let stem = name.split('.').next().unwrap_or(name);
    matches!(stem, "main" | "index" | "app" | "lib" | "server") && detect_language(path).is_some()
}

fn focus(dimension: Dimension) -> &'static str {
    match dimension {
        Dimension::Quality => "code quality",
        Dimension::Security => "security risks",
        Dimension::Stack => "its technology stack",
        Dimension::Architecture => "its architecture and organization",
        Dimension::Documentation => "documentation quality",
    }
}

fn rubric(dimension: Dimension) -> &'static [&'static str] {
    match dimension {
        Dimension::Quality => &[
            "Code organization and structure",
            "Naming conventions and readability",
            "Error handling",
            "Test coverage and testing practices",
            "Code duplication and maintainability",
        ],
        Dimension::Security => &[
            "Hard-coded secrets and credentials",
            "Dependency vulnerabilities and version pinning",
            "Insecure configuration",
            "Exposure of sensitive files",
            "Security tooling and disclosure policy",
        ],
        Dimension::Stack => &[
            "Languages and frameworks in use",
            "Dependency health and freshness",
            "Build and CI tooling",
            "Consistency of the toolchain",
            "Modernization opportunities",
        ],
        Dimension::Architecture => &[
            "Overall project structure",
            "Separation of concerns",
            "Modularity and component boundaries",
            "Scalability of the layout",
            "Configuration management",
        ],
        Dimension::Documentation => &[
            "README completeness",
            "Setup and usage instructions",
            "API or code documentation",
            "Contribution guidelines",
            "License and changelog",
        ],
    }
}
