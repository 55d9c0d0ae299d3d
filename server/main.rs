/// hipot-analyzer service
///
/// JSON endpoints over the analyzer, served by a synchronous tiny_http
/// server with one thread per request.
///
/// Run with:
///   cargo run --bin hipot-server --release -- --addr 127.0.0.1:5000

mod handlers;
mod routes;
mod wire;

use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;
use tiny_http::Server;
use tracing::{error, info};

use hipot_analyzer::{logging, Analyzer, AnalyzerConfig};

#[derive(Parser, Debug)]
#[command(name = "hipot-server")]
#[command(about = "HTTP service for hipot session analysis")]
#[command(version)]
struct Args {
    /// Address to listen on
    #[arg(short, long, default_value = "127.0.0.1:5000", env = "HIPOT_ADDR")]
    addr: String,

    /// Configuration file (JSON); defaults apply when absent
    #[arg(short, long, env = "HIPOT_CONFIG")]
    config: Option<PathBuf>,

    /// Checkpoint restored at startup when the file exists
    #[arg(long, env = "HIPOT_CHECKPOINT")]
    checkpoint: Option<PathBuf>,
}

fn main() -> ExitCode {
    logging::init_tracing();
    let args = Args::parse();

    let analyzer = match build_analyzer(&args) {
        Ok(a) => a,
        Err(e) => {
            error!(error = %e, "startup failed");
            return ExitCode::FAILURE;
        }
    };

    let server = match Server::http(args.addr.as_str()) {
        Ok(s) => s,
        Err(e) => {
            error!(addr = %args.addr, error = %e, "failed to bind HTTP server");
            return ExitCode::FAILURE;
        }
    };
    info!(addr = %args.addr, initialized = analyzer.is_initialized(), "listening");

    // Training requests block for their whole run, so each request gets its
    // own thread.
    for request in server.incoming_requests() {
        let analyzer = analyzer.clone();
        std::thread::spawn(move || {
            routes::dispatch(request, analyzer);
        });
    }

    analyzer.shutdown();
    ExitCode::SUCCESS
}

fn build_analyzer(args: &Args) -> hipot_analyzer::Result<Analyzer> {
    let mut config = AnalyzerConfig::load(args.config.as_deref())?;
    if config.analysis.checkpoint_path.is_none() {
        config.analysis.checkpoint_path = args.checkpoint.clone();
    }
    let analyzer = Analyzer::new(config)?;
    if let Some(path) = args.checkpoint.as_deref().filter(|p| p.exists()) {
        analyzer.load_checkpoint(path)?;
    }
    Ok(analyzer)
}
