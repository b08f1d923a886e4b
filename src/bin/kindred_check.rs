use std::path::PathBuf;

use anyhow::{bail, Context, Result};
use serde::Serialize;
use tracing_subscriber::EnvFilter;

use kindred_rs::config::DedupOverrides;
use kindred_rs::persistence::{JsonFileSource, SqliteSource};
use kindred_rs::{
    AnalysisReport, ConfigOverrides, DedupOptions, Kindred, KindredConfig, PersonId,
    QueryScope, ResearchPriority, SnapshotSource,
};

#[derive(Debug, Default)]
struct CheckArgs {
    snapshot: Option<PathBuf>,
    sqlite: Option<PathBuf>,
    config: Option<PathBuf>,
    surname: Option<String>,
    threshold: Option<f64>,
    person: Option<String>,
}

#[derive(Debug, Serialize)]
struct CheckReport {
    #[serde(flatten)]
    report: AnalysisReport,
    #[serde(skip_serializing_if = "Option::is_none")]
    research_priorities: Option<Vec<ResearchPriority>>,
}

fn parse_args() -> Result<CheckArgs> {
    let mut parsed = CheckArgs::default();
    let mut args = std::env::args().skip(1);

    while let Some(arg) = args.next() {
        match arg.as_str() {
            "--snapshot" => parsed.snapshot = args.next().map(PathBuf::from),
            "--sqlite" => parsed.sqlite = args.next().map(PathBuf::from),
            "--config" => parsed.config = args.next().map(PathBuf::from),
            "--surname" => parsed.surname = args.next(),
            "--person" => parsed.person = args.next(),
            "--threshold" => {
                let value = args.next().context("--threshold needs a value")?;
                parsed.threshold = Some(
                    value
                        .parse()
                        .with_context(|| format!("invalid threshold {:?}", value))?,
                );
            }
            "--help" | "-h" => {
                print_help();
                std::process::exit(0);
            }
            other => bail!("unknown argument {:?} (see --help)", other),
        }
    }

    Ok(parsed)
}

fn print_help() {
    println!(
        r#"kindred_check - Duplicate and consistency report for a family-tree snapshot

USAGE:
    kindred_check (--snapshot <JSON> | --sqlite <DB>) [OPTIONS]

OPTIONS:
    --snapshot <PATH>   JSON snapshot document
    --sqlite <PATH>     SQLite family-tree cache (opened read-only)
    --config <PATH>     TOML configuration file
    --surname <TEXT>    Only look for duplicates among persons with this surname
    --threshold <F>     Duplicate match threshold 0.0-1.0 (default: 0.75)
    --person <ID>       Limit validation to this person and add research priorities
    -h, --help          Print help

ENVIRONMENT:
    KINDRED_DEDUP__THRESHOLD=0.8   Override any config value
    RUST_LOG=debug                 Log verbosity (default: info)"#
    );
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let args = parse_args()?;

    let overrides = ConfigOverrides {
        dedup: args.threshold.map(|threshold| DedupOverrides {
            threshold: Some(threshold),
            ..DedupOverrides::default()
        }),
        timeline: None,
    };
    let config = KindredConfig::load(args.config.as_deref(), overrides)?;

    let source: Box<dyn SnapshotSource> = match (&args.snapshot, &args.sqlite) {
        (Some(path), None) => Box::new(JsonFileSource::new(path)),
        (None, Some(path)) => Box::new(SqliteSource::new(path)),
        _ => bail!("exactly one of --snapshot or --sqlite is required (see --help)"),
    };
    let kindred = Kindred::load(source.as_ref(), &QueryScope::All, config)?;
    tracing::info!(persons = kindred.snapshot().len(), "snapshot loaded");

    let report = match (&args.person, &args.surname) {
        (None, None) => CheckReport {
            report: kindred.run_all()?,
            research_priorities: None,
        },
        (person, surname) => {
            let person = person.as_deref().map(PersonId::from);
            let mut options = DedupOptions::default();
            options.surname_filter = surname.clone();

            let report = AnalysisReport {
                persons: kindred.snapshot().len(),
                relationships: kindred.snapshot().relationships().len(),
                duplicate_clusters: kindred.find_duplicate_clusters(&options)?,
                relationship_issues: kindred.validate_relationships(person.as_ref())?,
                timeline_issues: kindred.validate_timeline(person.as_ref())?,
            };
            let research_priorities = person
                .as_ref()
                .map(|root| kindred.source_coverage(root))
                .transpose()?;
            CheckReport {
                report,
                research_priorities,
            }
        }
    };

    println!("{}", serde_json::to_string_pretty(&report)?);
    Ok(())
}
