use std::io::{self, Write};
use std::path::PathBuf;

use clap::{Parser, Subcommand};

use memos_sync::config::{ImportConfig, MemosConfig, PurgeConfig, parse_cutoff};
use memos_sync::confirm::{Confirm, Preset, StdinConfirm};
use memos_sync::memos::MemosClient;
use memos_sync::pipeline::Pipeline;
use memos_sync::pipeline::classify::{CutoffPolicy, DuplicatePolicy, Policy};
use memos_sync::pipeline::execute::ExecuteOptions;
use memos_sync::source::{FeedFileSource, HttpMediaFetcher};

#[derive(Parser, Debug)]
#[command(
    name = "memos-sync",
    version,
    about = "Bulk maintenance and import for a Memos server"
)]
struct Cli {
    /// Report what would change without touching the server.
    #[arg(long, global = true)]
    dry_run: bool,

    /// Operator override: delete without asking for confirmation.
    ///
    /// Live runs normally stop and ask before the first delete. Use this only
    /// for unattended runs where the preview has already been checked.
    #[arg(long, global = true)]
    yes: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Delete memos whose content repeats on the same day, keeping the oldest.
    Dedupe,
    /// Delete memos created before a cutoff.
    Purge {
        /// RFC 3339 cutoff; overrides CUTOFF_DATE.
        #[arg(long)]
        cutoff: Option<String>,
    },
    /// Create memos from an exported social feed.
    Import {
        /// JSON feed export; overrides IMPORT_FEED_PATH.
        #[arg(long)]
        feed: Option<PathBuf>,

        /// Maximum scroll batches to read; overrides MAX_SCROLLS.
        #[arg(long)]
        max_batches: Option<usize>,
    },
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    if let Err(err) = dotenvy::dotenv() {
        if !err.not_found() {
            writeln!(io::stderr(), "warning: could not read .env: {err}")?;
        }
    }
    memos_sync::init_logger();

    let cli = Cli::parse();

    let mut memos_config = MemosConfig::from_env()?;
    memos_config.dry_run |= cli.dry_run;
    let options = ExecuteOptions {
        dry_run: memos_config.dry_run,
        delay: memos_config.delete_delay,
    };
    log::info!("connecting to {}", memos_config.base_url);

    let mut confirm: Box<dyn Confirm> = if cli.yes {
        if !options.dry_run {
            log::warn!("--yes given, deletions will not be confirmed");
        }
        Box::new(Preset::yes())
    } else {
        Box::new(StdinConfirm)
    };

    match cli.command {
        Command::Dedupe => {
            let client = MemosClient::new(memos_config)?;
            let mut pipeline = Pipeline::new(&client, options, io::stdout());
            pipeline
                .run(Policy::Duplicates(DuplicatePolicy), confirm.as_mut())
                .await?;
        }
        Command::Purge { cutoff } => {
            let cutoff = match cutoff {
                Some(raw) => parse_cutoff(&raw)?,
                None => PurgeConfig::from_env()?.cutoff,
            };
            log::info!("deleting memos created before {}", cutoff.to_rfc3339());

            let client = MemosClient::new(memos_config)?;
            let mut pipeline = Pipeline::new(&client, options, io::stdout());
            pipeline
                .run(Policy::Cutoff(CutoffPolicy::new(cutoff)), confirm.as_mut())
                .await?;
        }
        Command::Import { feed, max_batches } => {
            let mut import_config = ImportConfig::from_env();
            if let Some(feed) = feed {
                import_config.feed_path = Some(feed);
            }
            if let Some(max_batches) = max_batches {
                import_config.max_batches = max_batches;
            }
            let Some(feed_path) = import_config.feed_path.clone() else {
                writeln!(
                    io::stderr(),
                    "error: no feed given. Pass --feed or set IMPORT_FEED_PATH."
                )?;
                std::process::exit(2);
            };

            let client = MemosClient::new(memos_config)?
                .with_video_upload_timeout(import_config.video_upload_timeout);
            let media = HttpMediaFetcher::new(&import_config)?;
            let mut source = FeedFileSource::open(&feed_path).await?;

            let mut pipeline = Pipeline::new(&client, options, io::stdout());
            pipeline
                .run_import(&mut source, &media, import_config.max_batches)
                .await?;
        }
    }

    Ok(())
}
