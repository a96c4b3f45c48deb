use std::path::Path;

use anyhow::{Context, Result};
use chrono::{Local, Utc};
use clap::Parser;
use tracing_subscriber::EnvFilter;

use bl_cli::commands::feed::ManualArgs;
use bl_cli::commands::{backup, events, feed, history, stats, status, util};
use bl_cli::{Cli, Commands, Config, SideArg};

/// Load config and open database, ensuring the parent directory exists.
fn open_database(config_path: Option<&Path>) -> Result<(bl_db::Database, Config)> {
    let config = Config::load_from(config_path).context("failed to load configuration")?;
    tracing::debug!(?config, "loaded configuration");

    if let Some(parent) = config.database_path.parent() {
        std::fs::create_dir_all(parent).context("failed to create database directory")?;
    }

    let db = bl_db::Database::open(&config.database_path)
        .with_context(|| format!("failed to open {}", config.database_path.display()))?;
    Ok((db, config))
}

/// IANA name of the local zone, for labelling JSON output.
fn local_zone_name() -> String {
    iana_time_zone::get_timezone().unwrap_or_else(|err| {
        tracing::debug!(%err, "could not determine local time zone name");
        "local".to_string()
    })
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize tracing with verbose flag support
    let filter = if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::from_default_env()
    };
    // Use try_init to avoid panic if tracing is already initialized (e.g., in tests)
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init();

    let Some(command) = &cli.command else {
        // No subcommand, show help
        use clap::CommandFactory;
        Cli::command().print_help()?;
        println!();
        return Ok(());
    };

    let (mut db, config) = open_database(cli.config.as_deref())?;
    let now_ms = Utc::now().timestamp_millis();
    let tz = Local;
    let mut stdout = std::io::stdout().lock();

    match command {
        Commands::Status => status::run(&mut stdout, &db, now_ms, &tz)?,
        Commands::Start { side } => {
            feed::start(&mut stdout, &mut db, side.and_then(SideArg::side), now_ms, &tz)?;
        }
        Commands::Stop => feed::stop(&mut stdout, &mut db, now_ms)?,
        Commands::Feed { side } => {
            feed::toggle(&mut stdout, &mut db, side.and_then(SideArg::side), now_ms, &tz)?;
        }
        Commands::Log { kind, notes } => {
            events::log(&mut stdout, &mut db, (*kind).into(), notes, now_ms, &tz)?;
        }
        Commands::Manual {
            start,
            end,
            date,
            side,
            notes,
        } => {
            let args = ManualArgs {
                date: date.as_deref(),
                start,
                end,
                side: side.and_then(SideArg::side),
                notes,
            };
            feed::manual(&mut stdout, &mut db, &args, now_ms, &tz)?;
        }
        Commands::Undo => events::undo(&mut stdout, &mut db, &tz)?,
        Commands::Delete { id } => events::delete(&mut stdout, &mut db, *id)?,
        Commands::Edit(args) => events::edit(&mut stdout, &mut db, args, now_ms, &tz)?,
        Commands::History { limit, json } => {
            let limit = limit.unwrap_or(config.history_limit);
            history::run(&mut stdout, &db, limit, *json, now_ms, &tz)?;
        }
        Commands::Stats { view, json } => {
            stats::run(&mut stdout, &db, *view, *json, &tz, &local_zone_name())?;
        }
        Commands::Export { output } => {
            let today = util::local_today(now_ms, &tz)?;
            backup::export(&mut stdout, &db, &config, output.as_deref(), today)?;
        }
        Commands::Import { file } => backup::import(&mut stdout, &mut db, file)?,
        Commands::Clear { yes } => events::clear(&mut stdout, &mut db, *yes)?,
    }

    Ok(())
}
