use anyhow::Context;
use clap::{Args, Parser, Subcommand};
use repolens_lib::models::report::AnalysisReport;
use repolens_lib::{collect, server, AnalysisMode, Analyzer, Config, ReportStore};
use std::path::{Path, PathBuf};

#[derive(Parser)]
#[command(name = "repolens", version, about = "Collect, score and serve repository health reports")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Start the HTTP API and dashboard
    Serve(ServeArgs),
    /// Analyze the repository once and print the report
    Analyze(AnalyzeArgs),
}

#[derive(Args)]
struct ServeArgs {
    /// Repository root (overrides REPOLENS_ROOT)
    #[arg(long)]
    path: Option<PathBuf>,
}

#[derive(Args)]
struct AnalyzeArgs {
    /// Repository root (overrides REPOLENS_ROOT)
    #[arg(long)]
    path: Option<PathBuf>,

    /// simulated or live (defaults to the configured mode)
    #[arg(long)]
    mode: Option<AnalysisMode>,

    /// Print the full report as JSON
    #[arg(long)]
    json: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    match Cli::parse().command {
        Command::Serve(args) => {
            let config = Config::load(args.path).context("loading configuration")?;
            server::serve(config).await
        }
        Command::Analyze(args) => analyze_once(args).await,
    }
}

async fn analyze_once(args: AnalyzeArgs) -> anyhow::Result<()> {
    let config = Config::load(args.path).context("loading configuration")?;
    let mode = args.mode.unwrap_or(config.default_mode);

    let root = config.repo_root.clone();
    let options = config.collect.clone();
    let snapshot = tokio::task::spawn_blocking(move || collect(&root, &options))
        .await
        .context("collection task panicked")??;

    let analyzer = Analyzer::from_settings(&config.live)?;
    let report = analyzer.analyze(&snapshot, mode).await?;

    let store = ReportStore::open(&config.report_path)
        .with_context(|| format!("opening report store at {}", config.report_path.display()))?;
    store.save(&report)?;

    if args.json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        print_report(&report, store.path());
    }
    Ok(())
}

fn print_report(report: &AnalysisReport, saved_to: &Path) {
    println!("Repository: {}", report.repository);
    println!(
        "Overall score: {:.1}/10  (source: {:?}, confidence {:.0}%)",
        report.overall_score,
        report.source,
        report.confidence * 100.0
    );
    println!();

    for result in report.dimensions.values() {
        let marker = if report.degraded_dimensions.contains(&result.dimension) {
            " [degraded]"
        } else {
            ""
        };
        println!("{}: {:.1}/10{marker}", result.dimension.label(), result.score);
        for finding in &result.findings {
            println!("  - {finding}");
        }
        for rec in &result.recommendations {
            println!(
                "  > {} (priority {}, effort {}, impact {})",
                rec.title, rec.priority, rec.effort, rec.impact
            );
        }
        println!();
    }

    let summary = &report.summary;
    for (heading, items) in [
        ("Strengths", &summary.strengths),
        ("Areas for improvement", &summary.areas_for_improvement),
        ("Priority actions", &summary.priority_actions),
    ] {
        println!("{heading}:");
        for item in items {
            println!("  * {item}");
        }
    }

    println!();
    println!("Report saved to {}", saved_to.display());
}
