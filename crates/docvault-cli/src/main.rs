//! Docvault CLI: operate a document store and run reconciliation.
//!
//! Configuration comes from the environment (and `.env`); see `Config::from_env`.

use anyhow::Context;
use bytes::Bytes;
use clap::{Parser, Subcommand, ValueEnum};
use docvault_cli::{
    build_reconciliation, build_store, init_telemetry, print_json, upload_file_name,
};
use docvault_core::constants::PDF_CONTENT_TYPE;
use docvault_core::{Config, FileType};
use std::path::PathBuf;
use std::time::Duration;
use uuid::Uuid;

#[derive(Parser)]
#[command(name = "docvault", about = "Session-scoped PDF document store")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run one reconciliation now and print its report
    Sweep {
        /// Which pass to run
        #[arg(long, value_enum, default_value = "all")]
        pass: SweepPass,
        /// Override the orphan grace window, in seconds
        #[arg(long)]
        grace_secs: Option<u64>,
    },
    /// Run reconciliation on its interval until Ctrl-C
    Serve,
    /// Upload a PDF
    Upload {
        /// Path to the PDF
        file: PathBuf,
        /// Existing session to attach to; a new one is created if absent or expired
        #[arg(long)]
        session: Option<Uuid>,
        /// File type (pay_slip, salary_slip, form_16); inferred from the name if omitted
        #[arg(long)]
        file_type: Option<FileType>,
    },
    /// Fetch a document by its retrieval URL
    Fetch {
        /// Retrieval URL returned by upload
        url: String,
        /// Where to write the bytes
        #[arg(long, short)]
        output: PathBuf,
    },
    /// Show the most recent document of a session
    Latest {
        session: Uuid,
    },
    /// List the documents of a session, newest first
    List {
        session: Uuid,
    },
    /// Delete a document by its retrieval URL
    Delete {
        url: String,
    },
    /// Session operations
    Session {
        #[command(subcommand)]
        sub: SessionCommands,
    },
    /// Check the metadata store and blob backend
    Health,
}

#[derive(Subcommand)]
enum SessionCommands {
    /// Create an empty session
    Create {
        /// Lifetime in hours; defaults to SESSION_TTL_HOURS
        #[arg(long)]
        ttl_hours: Option<u64>,
    },
    /// Report whether a session is live
    Status { id: Uuid },
    /// Delete a session with all of its documents now
    Expire { id: Uuid },
}

#[derive(Clone, Copy, ValueEnum)]
enum SweepPass {
    All,
    Sessions,
    Orphans,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let config = Config::from_env().context("Failed to load configuration")?;
    init_telemetry(config.json_logs());

    let store = build_store(&config).await?;

    match cli.command {
        Commands::Sweep { pass, grace_secs } => {
            let reconciliation = build_reconciliation(&config, store);
            match pass {
                SweepPass::All if grace_secs.is_none() => {
                    print_json(&reconciliation.run_once().await?)?;
                }
                SweepPass::All => {
                    let sessions_reaped = reconciliation.reap_expired_sessions().await?;
                    let orphans = sweep_orphans(&reconciliation, grace_secs).await?;
                    print_json(&serde_json::json!({
                        "sessions_reaped": sessions_reaped,
                        "orphans": orphans,
                    }))?;
                }
                SweepPass::Sessions => {
                    let sessions_reaped = reconciliation.reap_expired_sessions().await?;
                    print_json(&serde_json::json!({ "sessions_reaped": sessions_reaped }))?;
                }
                SweepPass::Orphans => {
                    print_json(&sweep_orphans(&reconciliation, grace_secs).await?)?;
                }
            }
        }
        Commands::Serve => {
            let reconciliation = build_reconciliation(&config, store);
            let handle = reconciliation.start();

            tokio::signal::ctrl_c()
                .await
                .context("Failed to listen for Ctrl-C")?;
            tracing::info!("Shutdown signal received");
            handle.shutdown().await;
        }
        Commands::Upload {
            file,
            session,
            file_type,
        } => {
            let data = tokio::fs::read(&file)
                .await
                .with_context(|| format!("Failed to read {}", file.display()))?;
            let handle = store
                .upload(session, &upload_file_name(&file), file_type, Bytes::from(data))
                .await?;
            print_json(&handle)?;
        }
        Commands::Fetch { url, output } => {
            let data = store.fetch_by_url(&url).await?;
            tokio::fs::write(&output, &data)
                .await
                .with_context(|| format!("Failed to write {}", output.display()))?;
            print_json(&serde_json::json!({
                "url": url,
                "bytes": data.len(),
                "contentType": PDF_CONTENT_TYPE,
                "output": output.display().to_string(),
            }))?;
        }
        Commands::Latest { session } => {
            print_json(&store.latest_document(session).await?)?;
        }
        Commands::List { session } => {
            print_json(&store.list_documents(session).await?)?;
        }
        Commands::Delete { url } => {
            store.delete_by_url(&url).await?;
            print_json(&serde_json::json!({ "success": true, "url": url }))?;
        }
        Commands::Session { sub } => match sub {
            SessionCommands::Create { ttl_hours } => {
                let ttl = match ttl_hours {
                    Some(hours) => Duration::from_secs(hours.saturating_mul(3600)),
                    None => store.settings().session_ttl,
                };
                let id = store.create_session(ttl).await?;
                print_json(&serde_json::json!({ "sessionId": id }))?;
            }
            SessionCommands::Status { id } => {
                let live = store.is_live(id).await?;
                print_json(&serde_json::json!({ "sessionId": id, "live": live }))?;
            }
            SessionCommands::Expire { id } => {
                let documents = store.expire_session(id).await?;
                print_json(&serde_json::json!({ "sessionId": id, "documentsRemoved": documents }))?;
            }
        },
        Commands::Health => {
            store.health().await?;
            print_json(&serde_json::json!({ "status": "ok" }))?;
        }
    }

    Ok(())
}

async fn sweep_orphans(
    reconciliation: &docvault_services::ReconciliationService,
    grace_secs: Option<u64>,
) -> anyhow::Result<docvault_services::OrphanSweepReport> {
    let report = match grace_secs {
        Some(secs) => {
            reconciliation
                .sweep_orphan_blobs_with_grace(Duration::from_secs(secs))
                .await?
        }
        None => reconciliation.sweep_orphan_blobs().await?,
    };
    Ok(report)
}
