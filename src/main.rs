// Demo: train on synthetic recordings, then score a fresh one and print the
// report as JSON. The HTTP service lives in the `hipot-server` binary.
use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;
use tracing::error;

use hipot_analyzer::{logging, synthetic, Analyzer, AnalyzerConfig};

#[derive(Parser, Debug)]
#[command(name = "hipot-analyzer")]
#[command(about = "Train a hipot baseline on synthetic sessions and analyze one")]
#[command(version)]
struct Args {
    /// Configuration file (JSON); defaults apply when absent
    #[arg(short, long, env = "HIPOT_CONFIG")]
    config: Option<PathBuf>,

    /// Restore model and baseline from this checkpoint instead of training
    #[arg(long)]
    load: Option<PathBuf>,

    /// Write the resulting checkpoint here
    #[arg(long)]
    save: Option<PathBuf>,

    /// Number of synthetic training sessions
    #[arg(long, default_value_t = 3)]
    sessions: usize,

    /// Samples per synthetic session
    #[arg(long, default_value_t = 200)]
    length: usize,

    /// Seed of the first synthetic session
    #[arg(long, default_value_t = 42)]
    seed: u64,
}

fn run(args: Args) -> hipot_analyzer::Result<()> {
    let config = AnalyzerConfig::load(args.config.as_deref())?;
    let analyzer = Analyzer::new(config)?;

    match &args.load {
        Some(path) => analyzer.load_checkpoint(path)?,
        None => {
            let sessions: Vec<_> = (0..args.sessions as u64)
                .map(|i| synthetic::sample_session(args.seed + i, args.length))
                .collect();
            let summary = analyzer.train(&sessions)?;
            println!(
                "trained {} epochs, final loss {:.6}",
                summary.outcome.epochs_completed, summary.outcome.final_loss
            );
        }
    }

    let probe = synthetic::sample_session(args.seed + args.sessions as u64, args.length);
    let report = analyzer.analyze(&probe)?;
    let json = serde_json::to_string_pretty(&report)
        .map_err(|e| hipot_analyzer::AnalyzerError::Persistence(e.into()))?;
    println!("{json}");

    if let Some(path) = &args.save {
        analyzer.save_checkpoint(path)?;
    }
    analyzer.shutdown();
    Ok(())
}

fn main() -> ExitCode {
    logging::init_tracing();
    match run(Args::parse()) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!(error = %e, "hipot-analyzer failed");
            eprintln!("error: {e}");
            ExitCode::FAILURE
        }
    }
}
