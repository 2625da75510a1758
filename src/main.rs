//! qgen · question generator CLI and HTTP API
//!
//! Commands:
//!   qgen generate --domain <tag> --count N --difficulty D [--seed S]
//!   qgen review --out review.csv
//!   qgen flag --id <question id> --note "..."
//!   qgen serve
//!
//! Important env variables:
//!   PORT             : u16 (default 3000)
//!   QGEN_CONFIG_PATH : path to TOML config ([pipeline], [storage], [explanations])
//!   QGEN_STORE_PATH  : JSON-lines store file (in-memory if unset)
//!   QGEN_SEED        : default batch seed
//!   QGEN_WORKERS     : batch worker threads
//!   LOG_LEVEL        : tracing filter, e.g. "debug" or full directives
//!   LOG_FORMAT       : "pretty" (default) or "json"

use std::fs::File;
use std::io::BufWriter;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use clap::{Parser, Subcommand};
use tokio::net::TcpListener;
use tracing::{info, instrument};

use qgen::review::export_csv;
use qgen::routes::build_router;
use qgen::state::AppState;
use qgen::telemetry;

#[derive(Parser, Debug)]
#[command(name = "qgen", version, about = "Generate and verify multiple-choice pattern questions")]
struct Cli {
  #[command(subcommand)]
  command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
  /// Generate a batch, persist accepted questions and print the summary.
  Generate {
    /// numeric_sequence, letter_sequence, cipher_code or visual_pattern.
    #[arg(long)]
    domain: String,
    #[arg(long, default_value_t = 10)]
    count: usize,
    #[arg(long, default_value_t = 2)]
    difficulty: u8,
    #[arg(long)]
    seed: Option<u64>,
    /// Also print the accepted questions as JSON lines.
    #[arg(long)]
    print: bool,
  },
  /// Write flagged questions to a CSV sheet for human review.
  Review {
    #[arg(long, default_value = "review.csv")]
    out: PathBuf,
  },
  /// Mark a stored question for human review.
  Flag {
    #[arg(long)]
    id: String,
    #[arg(long)]
    note: String,
  },
  /// Serve the HTTP API.
  Serve,
}

#[instrument(level = "info", skip_all)]
fn main() -> Result<(), Box<dyn std::error::Error>> {
  telemetry::init_tracing();
  let cli = Cli::parse();

  let state = Arc::new(AppState::from_env()?);

  match cli.command {
    Command::Generate { domain, count, difficulty, seed, print } => {
      let report = state.pipeline.generate_batch_seeded(&domain, count, difficulty, seed)?;
      let s = report.summary;
      println!(
        "seed={} accepted-confirmed={} accepted-flagged={} discarded-after-retries={} failed={}",
        report.seed, s.confirmed, s.flagged, s.discarded, s.failed
      );
      for failure in &report.failures {
        println!("failure item={} id={} kind={:?} detail={}", failure.index, failure.id, failure.kind, failure.detail);
      }
      if print {
        for q in &report.accepted {
          println!("{}", serde_json::to_string(q)?);
        }
      }
    }
    Command::Review { out } => {
      let questions = state.store().all();
      let rows = export_csv(&questions, BufWriter::new(File::create(&out)?))?;
      info!(target: "qgen", path = %out.display(), rows, "Review sheet written");
      println!("{rows} question(s) written to {}", out.display());
    }
    Command::Flag { id, note } => match state.store().flag(&id, &note)? {
      Some(_) => println!("{id} flagged for review"),
      None => return Err(format!("no question with id {id}").into()),
    },
    Command::Serve => serve(state)?,
  }
  Ok(())
}

#[tokio::main]
async fn serve(state: Arc<AppState>) -> Result<(), Box<dyn std::error::Error>> {
  let app = build_router(state);

  // Read port from env or default to 3000.
  let addr: SocketAddr = std::env::var("PORT")
    .ok()
    .and_then(|p| p.parse::<u16>().ok())
    .map(|port| SocketAddr::from(([0, 0, 0, 0], port)))
    .unwrap_or_else(|| SocketAddr::from(([0, 0, 0, 0], 3000)));

  let listener = TcpListener::bind(addr).await?;
  info!(target: "qgen", %addr, "HTTP server listening");
  axum::serve(listener, app)
    .with_graceful_shutdown(async {
      let _ = tokio::signal::ctrl_c().await;
    })
    .await?;
  Ok(())
}
