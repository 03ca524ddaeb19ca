//! `couchctl`: a small command-line front end to the CouchDB client.
//!
//! Connection settings come from flags or the same environment variables
//! [`client::ClientConfig::from_env`] reads. Feed commands print one JSON
//! line per event until interrupted with Ctrl-C, then report how the feed
//! ended.

mod telemetry;

use std::path::PathBuf;
use std::time::Duration;

use anyhow::{bail, Context};
use clap::{Parser, Subcommand};
use client::{ClientConfig, Feed, FeedEnd, Options, Server};
use serde::Serialize;
use serde_json::Value;
use tracing::{info, warn};

#[derive(Debug, Parser)]
#[command(name = "couchctl", version, about)]
struct Cli {
    /// Server URL.
    #[arg(long, env = "COUCHDB_URL", default_value = client::config::DEFAULT_URL)]
    url: String,

    /// User name for Basic authentication.
    #[arg(long, env = "COUCHDB_USER")]
    user: Option<String>,

    /// Password for Basic authentication.
    #[arg(long, env = "COUCHDB_PASSWORD", hide_env_values = true)]
    password: Option<String>,

    /// Per-request timeout in seconds; 0 disables it.
    #[arg(long, env = "COUCHDB_TIMEOUT_SECS", default_value_t = 30)]
    timeout: u64,

    /// Write logs as JSON lines.
    #[arg(long)]
    json_logs: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Print the server's welcome document.
    Info,
    /// List databases.
    Dbs,
    /// Follow database creations and deletions.
    DbUpdates {
        /// Resume after this sequence, or `now`.
        #[arg(long)]
        since: Option<String>,
    },
    /// Follow document changes in one database.
    Changes {
        db: String,
        /// Resume after this sequence, or `now`.
        #[arg(long)]
        since: Option<String>,
        /// Include each changed document in its event.
        #[arg(long)]
        include_docs: bool,
    },
    /// Delete the documents listed in a JSON file (an array of objects
    /// carrying `_id` and `_rev`).
    DeleteMany {
        db: String,
        file: PathBuf,
        /// Delete every document or none of them.
        #[arg(long)]
        all_or_nothing: bool,
    },
}

impl Cli {
    fn config(&self) -> ClientConfig {
        ClientConfig {
            url: self.url.clone(),
            timeout: (self.timeout > 0).then(|| Duration::from_secs(self.timeout)),
            username: self.user.clone(),
            password: self.password.clone(),
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let telemetry = telemetry::init(cli.json_logs)?;

    let result = run(&cli).await;
    telemetry.shutdown();
    result
}

async fn run(cli: &Cli) -> anyhow::Result<()> {
    let server = Server::connect(&cli.config()).context("invalid connection settings")?;

    match &cli.command {
        Command::Info => {
            let info = server.info().await.context("fetching server info")?;
            println!("{}", serde_json::to_string_pretty(&info)?);
        }
        Command::Dbs => {
            for name in server.all_dbs().await.context("listing databases")? {
                println!("{name}");
            }
        }
        Command::DbUpdates { since } => {
            let options = since_option(Options::new(), since.as_deref());
            let feed = server
                .db_updates_feed(&options)
                .await
                .context("opening the _db_updates feed")?;
            follow(feed).await?;
        }
        Command::Changes {
            db,
            since,
            include_docs,
        } => {
            let db = server
                .database(db, None)
                .await
                .with_context(|| format!("opening database '{db}'"))?;
            let mut options = since_option(Options::new(), since.as_deref());
            if *include_docs {
                options.insert("include_docs", true);
            }
            let feed = db
                .changes_feed(&options)
                .await
                .context("opening the _changes feed")?;
            follow(feed).await?;
        }
        Command::DeleteMany {
            db,
            file,
            all_or_nothing,
        } => {
            let text = std::fs::read_to_string(file)
                .with_context(|| format!("reading {}", file.display()))?;
            let docs: Value = serde_json::from_str(&text)
                .with_context(|| format!("parsing {}", file.display()))?;
            let db = server
                .database(db, None)
                .await
                .with_context(|| format!("opening database '{db}'"))?;

            let results = if *all_or_nothing {
                db.must_delete_many(docs).await
            } else {
                db.delete_many(docs).await
            }
            .context("deleting documents")?;

            let failed = results.iter().filter(|r| !r.is_success()).count();
            for result in &results {
                println!("{}", serde_json::to_string(result)?);
            }
            info!(deleted = results.len() - failed, failed, "bulk delete finished");
            if failed > 0 {
                bail!("{failed} of {} documents were not deleted", results.len());
            }
        }
    }
    Ok(())
}

fn since_option(options: Options, since: Option<&str>) -> Options {
    match since {
        Some(since) => options.with("since", since),
        None => options,
    }
}

/// Prints every event until Ctrl-C or until the feed stops on its own.
async fn follow<E: Serialize>(mut feed: Feed<E>) -> anyhow::Result<()> {
    loop {
        tokio::select! {
            event = feed.next() => match event {
                Some(event) => println!("{}", serde_json::to_string(&event)?),
                None => break,
            },
            _ = tokio::signal::ctrl_c() => {
                info!("interrupted");
                break;
            }
        }
    }

    match feed.close().await {
        FeedEnd::Failed(err) => Err(err).context("feed failed"),
        FeedEnd::Completed { last_seq } => {
            info!(%last_seq, "feed completed");
            Ok(())
        }
        FeedEnd::Eof => {
            warn!("server ended the feed");
            Ok(())
        }
        FeedEnd::Closed => Ok(()),
    }
}
