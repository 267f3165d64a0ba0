//! # Web QA CLI (`wqa`)
//!
//! ## Commands
//!
//! | Command | Description |
//! |---------|-------------|
//! | `wqa run "<text>" --ask "<q>"` | Ingest the URLs in `<text>`, then answer each question |
//! | `wqa chat` | Interactive session: paste URLs or ask questions |
//! | `wqa serve` | Start the JSON HTTP API |
//!
//! ## Examples
//!
//! ```bash
//! # One-shot
//! wqa run "Compare https://example.com and https://example.org" --ask "what is this url about"
//!
//! # Interactive, with JSON progress on stderr
//! wqa --progress json chat
//!
//! # API server with a config file
//! wqa --config ./config/wqa.toml serve
//! ```

use anyhow::Result;
use clap::{Parser, Subcommand};
use std::io::Write;
use std::path::PathBuf;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing_subscriber::EnvFilter;

use web_qa::config::{self, Config};
use web_qa::corpus::{CorpusManager, Session};
use web_qa::models::Role;
use web_qa::progress::{ProgressMode, ProgressReporter};
use web_qa::server;

/// Web QA: answer questions about web pages, citing the pages.
#[derive(Parser)]
#[command(
    name = "wqa",
    about = "Web QA: fetch web pages and answer questions about them with citations",
    version
)]
struct Cli {
    /// Path to configuration file (TOML). Built-in defaults apply when omitted.
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Progress output on stderr. Defaults to `human` on a terminal, `off` otherwise.
    #[arg(long, global = true, value_enum)]
    progress: Option<ProgressMode>,

    /// Log debug output to stderr (overridden by RUST_LOG).
    #[arg(long, short, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Ingest the URLs found in TEXT, print a summary, then answer each question.
    Run {
        /// Free-form text containing up to `corpus.max_urls` URLs.
        text: String,

        /// Question to answer after ingestion. Repeatable.
        #[arg(long = "ask")]
        questions: Vec<String>,
    },

    /// Interactive session on stdin.
    ///
    /// Lines containing `http` are ingested as a new batch; other lines are
    /// questions. `/sources`, `/reset` and `/quit` are built in.
    Chat,

    /// Start the JSON HTTP API on `[server].bind`.
    Serve,
}

fn init_logging(verbose: bool) {
    let default_level = if verbose { "debug" } else { "warn" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenv::dotenv().ok();
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let cfg = match &cli.config {
        Some(path) => config::load_config(path)?,
        None => Config::minimal(),
    };
    let reporter = cli
        .progress
        .unwrap_or_else(ProgressMode::default_for_tty)
        .reporter();

    match cli.command {
        Commands::Run { text, questions } => {
            let manager = CorpusManager::from_config(&cfg)?;
            let mut session = Session::new();
            let summary = manager
                .ingest_batch(&mut session, &text, reporter.as_ref())
                .await;
            println!("{}", summary.trim_end());
            for question in questions {
                let answer = manager.answer(&session.corpus(), &question).await;
                println!("\nQ: {}\n{}", question, answer.trim_end());
            }
        }
        Commands::Chat => {
            let manager = CorpusManager::from_config(&cfg)?;
            run_chat(&manager, reporter.as_ref()).await?;
        }
        Commands::Serve => {
            server::run_server(&cfg).await?;
        }
    }

    Ok(())
}

async fn run_chat(manager: &CorpusManager, reporter: &dyn ProgressReporter) -> Result<()> {
    println!("Paste URLs to analyze, then ask questions. /sources, /reset, /quit.");
    let mut session = manager.reset();
    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    loop {
        print!("> ");
        std::io::stdout().flush()?;
        let Some(line) = lines.next_line().await? else {
            break;
        };
        let input = line.trim();
        match input {
            "" => continue,
            "/quit" | "/exit" => break,
            "/reset" => {
                session = manager.reset();
                println!("Session reset. Please provide new URLs to analyze.");
            }
            "/sources" => print_sources(&session),
            _ => {
                let reply = manager.respond(&mut session, input, reporter).await;
                println!("{}\n", reply.trim_end());
            }
        }
    }

    let asked = session
        .history()
        .iter()
        .filter(|t| t.role == Role::User)
        .count();
    println!("Bye ({} inputs this session).", asked);
    Ok(())
}

fn print_sources(session: &Session) {
    let corpus = session.corpus();
    if corpus.is_empty() {
        println!("No sources yet.");
        return;
    }
    for (i, doc) in corpus.documents().iter().enumerate() {
        println!("{}. {} ({} words)\n   {}", i + 1, doc.title, doc.word_count(), doc.url);
    }
    println!("Ingested this session: {} urls", session.ingested_urls().len());
}
