use chrono::Local;
use clap::{Args, Parser, Subcommand};
use prodmatch::detect::orb::REASON_NO_FEATURES;
use prodmatch::{
    default_report_path, BatchMatchReport, ColorGateVerdict, Config, DetectorMetrics, Engine,
    PairMatchResult,
};
use std::fs;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use tracing_subscriber::EnvFilter;

const SCHEMA_JSON: &str = include_str!(concat!(env!("CARGO_MANIFEST_DIR"), "/config.schema.json"));
const EXAMPLE_JSON: &str =
    include_str!(concat!(env!("CARGO_MANIFEST_DIR"), "/config.example.json"));

/// Config file picked up from the working directory when `--config` is absent.
const DEFAULT_CONFIG: &str = "prodmatch.json";

#[derive(Parser, Debug)]
#[command(author, version, about = "Decide whether product photos show the same item")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Match a query image against one image (pair mode) or a directory (batch mode).
    Match(MatchArgs),
    /// Print an example configuration and exit.
    Config {
        /// Print the JSON schema instead.
        #[arg(long)]
        schema: bool,
        /// Print the built-in defaults instead.
        #[arg(long, conflicts_with = "schema")]
        defaults: bool,
    },
}

#[derive(Args, Debug)]
struct MatchArgs {
    /// Reference product photo.
    query: PathBuf,
    /// Candidate image, or a directory of candidate images.
    target: PathBuf,
    /// JSON configuration file [default: prodmatch.json when present].
    #[arg(short, long, value_name = "FILE")]
    config: Option<PathBuf>,
    /// Write a JSON report (batch mode) and print the summary.
    #[arg(long)]
    report: bool,
    /// Output path for the JSON report or pair result.
    #[arg(short, long, value_name = "FILE")]
    output: Option<PathBuf>,
    /// Log pipeline details to stderr.
    #[arg(long)]
    debug: bool,
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    match run(cli) {
        Ok(true) => ExitCode::SUCCESS,
        Ok(false) => ExitCode::from(1),
        Err(err) => {
            eprintln!("error: {err}");
            ExitCode::from(2)
        }
    }
}

/// Returns whether a match was found.
fn run(cli: Cli) -> Result<bool, Box<dyn std::error::Error>> {
    match cli.command {
        Command::Config { schema, defaults } => {
            if schema {
                println!("{SCHEMA_JSON}");
            } else if defaults {
                println!("{}", Config::default().to_json_pretty()?);
            } else {
                println!("{EXAMPLE_JSON}");
            }
            Ok(true)
        }
        Command::Match(args) => run_match(args),
    }
}

fn init_tracing(debug: bool) -> Result<(), Box<dyn std::error::Error>> {
    let directive = if debug { "prodmatch=debug" } else { "prodmatch=warn" };
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive(directive.parse()?))
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
    Ok(())
}

fn load_config(path: Option<&Path>) -> Result<Config, Box<dyn std::error::Error>> {
    let config = match path {
        Some(path) => Config::load(path)?,
        None if Path::new(DEFAULT_CONFIG).is_file() => Config::load(DEFAULT_CONFIG)?,
        None => Config::default(),
    };
    Ok(config)
}

fn run_match(args: MatchArgs) -> Result<bool, Box<dyn std::error::Error>> {
    init_tracing(args.debug)?;
    let engine = Engine::new(load_config(args.config.as_deref())?)?;
    tracing::debug!(
        query = %args.query.display(),
        target = %args.target.display(),
        "starting match"
    );

    if args.target.is_dir() {
        let report = if args.report {
            let output = args
                .output
                .clone()
                .unwrap_or_else(|| default_report_path(&Local::now()));
            let report = engine.generate_report(&args.query, &args.target, &output)?;
            println!("report written to {}", output.display());
            report
        } else {
            engine.match_batch(&args.query, &args.target)?
        };
        print_batch(&report, args.report);
        return Ok(report.summary.matched_count > 0);
    }

    let result = engine.match_pair(&args.query, &args.target);
    print_pair(&result);
    if let Some(output) = &args.output {
        if let Some(parent) = output.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)?;
        }
        fs::write(output, serde_json::to_string_pretty(&result)?)?;
    }
    if let Some(err) = &result.error {
        return Err(err.clone().into());
    }
    Ok(result.matched)
}

fn print_pair(result: &PairMatchResult) {
    let verdict = if result.matched { "MATCH" } else { "NO MATCH" };
    match &result.failure_reason {
        Some(reason) => println!("{verdict}: {} vote(s), {reason}", result.vote_count),
        None => println!("{verdict}: {} vote(s)", result.vote_count),
    }
    if let Some(gate) = &result.color_gate {
        print_gate(gate);
    }
    for verdict in result.detectors.values() {
        let mark = if verdict.matched { "yes" } else { "no" };
        let line = format!("  {:<5} {:<3} {}", verdict.kind.as_str(), mark, describe(&verdict.metrics));
        match &verdict.reason {
            Some(reason) => println!("{line} [{reason}]"),
            None => println!("{line}"),
        }
    }
}

fn print_gate(gate: &ColorGateVerdict) {
    println!(
        "  color {:<3} corr {:.3}, median deltaE {:.2}",
        if gate.passed { "yes" } else { "no" },
        gate.histogram_correlation,
        gate.median_delta_e
    );
}

fn describe(metrics: &DetectorMetrics) -> String {
    match metrics {
        DetectorMetrics::Phash {
            distance: Some(distance),
            threshold,
        } => format!("distance {distance} (max {threshold})"),
        DetectorMetrics::Phash {
            distance: None,
            threshold,
        } => format!("distance n/a (max {threshold})"),
        DetectorMetrics::Orb(stats) => format!(
            "good {} of {}, inliers {} ratio {:.2} (good >= {}, ratio >= {:.2})",
            stats.good_matches,
            stats.total_matches,
            stats.inliers,
            stats.inlier_ratio,
            stats.good_threshold,
            stats.inlier_threshold
        ),
        DetectorMetrics::Ncc { score, threshold } => {
            format!("score {score:.3} (min {threshold:.2})")
        }
    }
}

fn print_batch(report: &BatchMatchReport, with_summary: bool) {
    println!("candidates: {}", report.candidate_count);
    match report.best_result() {
        Some(best) => println!(
            "best: {} ({} vote(s), {})",
            best.filename,
            best.result.vote_count,
            if best.result.matched { "match" } else { "no match" }
        ),
        None => println!("best: none"),
    }
    if !with_summary {
        return;
    }
    let summary = &report.summary;
    println!("matched: {}", summary.matched_count);
    println!("color mismatches: {}", summary.color_mismatches);
    if !summary.failure_reasons.is_empty() {
        println!("failure reasons:");
        for (reason, count) in &summary.failure_reasons {
            println!("  {reason}: {count}");
        }
    }
    let featureless = report
        .results
        .iter()
        .filter(|entry| {
            entry
                .result
                .detectors
                .values()
                .any(|v| v.reason.as_deref() == Some(REASON_NO_FEATURES))
        })
        .count();
    if featureless > 0 {
        println!("candidates without features: {featureless}");
    }
}

#[cfg(test)]
mod tests {
    use super::{Cli, Command, EXAMPLE_JSON, SCHEMA_JSON};
    use clap::Parser;
    use prodmatch::Config;

    #[test]
    fn example_config_matches_defaults() {
        let cfg = Config::from_json_str(EXAMPLE_JSON).unwrap();
        assert_eq!(cfg, Config::default());
    }

    #[test]
    fn schema_is_valid_json() {
        let schema: serde_json::Value = serde_json::from_str(SCHEMA_JSON).unwrap();
        assert_eq!(schema["additionalProperties"], serde_json::Value::Bool(false));
        assert!(schema["properties"]["orb"]["properties"]["rescueMinInliers"].is_object());
    }

    #[test]
    fn match_arguments_parse() {
        let cli = Cli::try_parse_from([
            "prodmatch", "match", "q.png", "dir", "--report", "--debug", "-o", "out.json",
        ])
        .unwrap();
        match cli.command {
            Command::Match(args) => {
                assert!(args.report && args.debug);
                assert!(args.config.is_none());
                assert_eq!(args.output.as_deref(), Some(std::path::Path::new("out.json")));
            }
            other => panic!("unexpected command {other:?}"),
        }
    }
}
