//! Tabkit - command-line access to browser tabs, bookmarks and history.
//!
//! Every command prints JSON on stdout. Logs go to stderr.

mod commands;

use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::process::ExitCode;
use tabkit_core::{CancellationToken, Preferences, TabkitError};
use tracing::{debug, Level};
use tracing_subscriber::FmtSubscriber;

#[derive(Parser, Debug)]
#[command(name = "tabkit")]
#[command(about = "Read browser session files, tab databases and history")]
struct Args {
    /// Enable debug logging
    #[arg(short, long, global = true)]
    debug: bool,

    /// Preferences file (JSON)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Decode a mozLz4 session file
    Decode {
        file: PathBuf,

        /// Print the flattened tab list instead of the whole document
        #[arg(long)]
        tabs: bool,
    },

    /// List open tabs grouped by device
    Tabs {
        /// Synced-tabs database (defaults to Safari's CloudTabs.db)
        #[arg(long)]
        remote_db: Option<PathBuf>,

        /// This machine's name in the synced-tabs database
        #[arg(long)]
        device_name: Option<String>,

        /// Read local tabs from a session file instead of the scripting bridge
        #[arg(long)]
        session: Option<PathBuf>,

        /// Application whose windows are enumerated
        #[arg(long, default_value = "Safari")]
        browser: String,

        /// Rank tabs against this query
        #[arg(short, long)]
        query: Option<String>,
    },

    /// List bookmarks from a places database
    Bookmarks {
        /// Places database (defaults to the first profile of --browser-dir)
        #[arg(long)]
        db: Option<PathBuf>,

        /// Profile directory name used when --db is absent
        #[arg(long, default_value = "Firefox")]
        browser_dir: String,

        #[arg(short, long)]
        query: Option<String>,

        /// Only bookmarks whose folder title contains this text
        #[arg(long)]
        folder: Option<String>,

        #[arg(long)]
        limit: Option<u32>,
    },

    /// List recent history from a places database
    History {
        #[arg(long)]
        db: Option<PathBuf>,

        #[arg(long, default_value = "Firefox")]
        browser_dir: String,

        #[arg(short, long)]
        query: Option<String>,

        /// Substring filter applied by the database before ranking
        #[arg(long)]
        filter: Option<String>,

        #[arg(long)]
        limit: Option<u32>,
    },

    /// List workspaces from a places database
    Workspaces {
        #[arg(long)]
        db: Option<PathBuf>,

        #[arg(long, default_value = "zen")]
        browser_dir: String,
    },
}

#[tokio::main]
async fn main() -> ExitCode {
    let args = Args::parse();

    // Set up logging
    let log_level = if args.debug { Level::DEBUG } else { Level::WARN };
    FmtSubscriber::builder()
        .with_max_level(log_level)
        .with_target(false)
        .with_thread_ids(false)
        .with_writer(std::io::stderr)
        .compact()
        .init();

    match run(args).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("Error: {:#}", err);
            let code = err
                .downcast_ref::<TabkitError>()
                .map(TabkitError::exit_code)
                .unwrap_or(1);
            ExitCode::from(code as u8)
        }
    }
}

async fn run(args: Args) -> anyhow::Result<()> {
    let prefs = match &args.config {
        Some(path) => Preferences::load(path)?,
        None => Preferences::default(),
    };
    debug!("Preferences: {:?}", prefs);

    let cancel = CancellationToken::new();
    let on_interrupt = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            debug!("Interrupt received, cancelling");
            on_interrupt.cancel();
        }
    });

    let output = match args.command {
        Command::Decode { file, tabs } => commands::decode(&file, tabs).await?,
        Command::Tabs {
            remote_db,
            device_name,
            session,
            browser,
            query,
        } => {
            let options = commands::TabsOptions {
                remote_db,
                device_name,
                session,
                browser,
                query,
            };
            commands::tabs(&prefs, options, &cancel).await?
        }
        Command::Bookmarks {
            db,
            browser_dir,
            query,
            folder,
            limit,
        } => {
            let db = commands::places_db(db, &browser_dir)?;
            let options = commands::BookmarkOptions {
                query,
                folder,
                limit,
            };
            commands::bookmarks(&prefs, &db, options, &cancel).await?
        }
        Command::History {
            db,
            browser_dir,
            query,
            filter,
            limit,
        } => {
            let db = commands::places_db(db, &browser_dir)?;
            commands::history(
                &prefs,
                &db,
                query.as_deref(),
                filter.as_deref(),
                limit,
                &cancel,
            )
            .await?
        }
        Command::Workspaces { db, browser_dir } => {
            let db = commands::places_db(db, &browser_dir)?;
            commands::workspaces(&prefs, &db, &cancel).await?
        }
    };

    println!("{}", serde_json::to_string_pretty(&output)?);
    Ok(())
}
