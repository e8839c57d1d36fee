use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;
use tracing_subscriber::EnvFilter;

use folio_lib::core::types::{Item, OutcomeStatus, TextMode};
use folio_lib::pipeline::{Pipeline, PipelineConfig};

/// Align TEI transcriptions to IIIF manifests and write augmented
/// manifests for the search site's viewer.
#[derive(Debug, Parser)]
#[command(name = "folio", version)]
struct Args {
    /// Item collection produced by the normalization step.
    #[arg(long, default_value = "data/items.json")]
    items: PathBuf,
    /// Directory receiving augmented manifests.
    #[arg(long, default_value = "public/manifests")]
    out: PathBuf,
    /// Max items processed concurrently.
    #[arg(long, default_value_t = 4)]
    concurrency: usize,
    /// Strip TEI markup from annotation bodies.
    #[arg(long)]
    plain_text: bool,
    /// Write the full batch report as JSON to this path.
    #[arg(long)]
    report: Option<PathBuf>,
}

fn init_tracing() {
    let filter = EnvFilter::try_from_env("FOLIO_LOG").unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(filter).init();
}

#[tokio::main]
async fn main() -> ExitCode {
    init_tracing();
    let args = Args::parse();

    let raw = match std::fs::read_to_string(&args.items) {
        Ok(raw) => raw,
        Err(err) => {
            eprintln!("cannot read items file {}: {err}", args.items.display());
            return ExitCode::FAILURE;
        }
    };
    let items: Vec<Item> = match serde_json::from_str(&raw) {
        Ok(items) => items,
        Err(err) => {
            eprintln!("cannot parse items file {}: {err}", args.items.display());
            return ExitCode::FAILURE;
        }
    };

    let config = PipelineConfig {
        output_dir: args.out,
        concurrency: args.concurrency,
        text_mode: if args.plain_text {
            TextMode::Plain
        } else {
            TextMode::Markup
        },
    };
    let pipeline = match Pipeline::new(config) {
        Ok(pipeline) => pipeline,
        Err(err) => {
            eprintln!("cannot initialize pipeline: {err}");
            return ExitCode::FAILURE;
        }
    };

    let report = match pipeline.run(&items).await {
        Ok(report) => report,
        Err(err) => {
            eprintln!("batch aborted: {err}");
            return ExitCode::FAILURE;
        }
    };

    for item in &report.items {
        match item.status {
            OutcomeStatus::Skipped => {
                let reason = item.skip_reason.as_deref().unwrap_or("skipped");
                println!("~ {:<32} {reason}", item.slug);
            }
            _ => {
                for outcome in &item.outcomes {
                    match outcome.status {
                        OutcomeStatus::Success => println!(
                            "+ {:<32} {} matched, {} chunks / {} canvases unmatched -> {}",
                            item.slug,
                            outcome.matched_pages,
                            outcome.unmatched_chunks,
                            outcome.unmatched_canvases,
                            outcome.output_path.as_deref().unwrap_or("?"),
                        ),
                        _ => {
                            let detail = outcome
                                .error
                                .as_ref()
                                .map(|error| error.message.clone())
                                .unwrap_or_else(|| "unknown failure".to_string());
                            println!(
                                "! {:<32} {} at {}: {detail}",
                                item.slug, outcome.manifest_url, outcome.stage
                            );
                        }
                    }
                }
            }
        }
    }
    for collision in &report.collisions {
        println!(
            "! collision on {} (slugs: {})",
            collision.path,
            collision.slugs.join(", ")
        );
    }
    let (succeeded, failed, skipped) = report.counts();
    println!("{succeeded} succeeded, {failed} failed, {skipped} skipped");

    if let Some(path) = args.report {
        match serde_json::to_string_pretty(&report) {
            Ok(json) => {
                if let Err(err) = std::fs::write(&path, json) {
                    eprintln!("cannot write report {}: {err}", path.display());
                    return ExitCode::FAILURE;
                }
            }
            Err(err) => {
                eprintln!("cannot serialize report: {err}");
                return ExitCode::FAILURE;
            }
        }
    }

    ExitCode::SUCCESS
}
