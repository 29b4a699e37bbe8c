use clap::Parser;
use link_anime::cli::{Args, Command, LinkArgs};
use link_anime::config::AppConfig;
use link_anime::error::AppError;
use link_anime::history::{HistoryEntry, MemoryLedger, SqliteLedger};
use link_anime::linker::LinkResult;
use link_anime::logging;
use link_anime::output::{
    display_history, display_json, display_link_result, display_parse_result,
    display_undo_result, display_unlink_result,
};
use link_anime::parser::parse_release_name;
use link_anime::progress::{ProgressSink, TerminalProgress};
use link_anime::service::LinkService;
use serde::Serialize;
use std::io::{self, Write};
use tracing::{debug, error, info};

#[derive(Serialize)]
struct UndoOutput<'a> {
    preview: bool,
    entry: &'a HistoryEntry,
    result: &'a LinkResult,
}

fn main() {
    // Load .env file if present (silently ignore if not found)
    let _ = dotenvy::dotenv();

    let args = Args::parse();

    logging::init(args.verbose);

    if let Err(e) = run(args) {
        error!("{}", e);
        eprintln!("\nError: {}", e.detailed_message());
        std::process::exit(e.exit_code().into());
    }
}

fn run(args: Args) -> Result<(), AppError> {
    let config = args.dirs.apply(AppConfig::from_env());
    debug!(?config, "Configuration resolved");

    // Verbose and JSON modes leave stderr to tracing
    let progress = if args.json || args.verbose > 0 {
        TerminalProgress::silent()
    } else {
        TerminalProgress::new()
    };

    let stdout = io::stdout();
    let mut out = stdout.lock();

    match &args.command {
        Command::Parse { names } => {
            let results: Vec<_> = names.iter().map(|n| parse_release_name(n)).collect();
            if args.json {
                match results.as_slice() {
                    [single] => display_json(single, &mut out)?,
                    all => display_json(&all, &mut out)?,
                }
            } else {
                for (i, (name, result)) in names.iter().zip(&results).enumerate() {
                    if i > 0 {
                        writeln!(out)?;
                    }
                    display_parse_result(name, result, &mut out)?;
                }
            }
        }

        Command::Link(link) => run_link(link, link.dry, &config, &progress, args.json, &mut out)?,

        Command::Preview(link) => run_link(link, true, &config, &progress, args.json, &mut out)?,

        Command::Undo { dry } => {
            let service = open_service(&config)?;
            let (result, entry) = if *dry {
                service.undo_preview()?
            } else {
                service.undo()?
            };
            info!("Undo of history entry {} finished", entry.id);

            if args.json {
                let output = UndoOutput {
                    preview: *dry,
                    entry: &entry,
                    result: &result,
                };
                display_json(&output, &mut out)?;
            } else {
                display_undo_result(&result, &entry, *dry, &mut out)?;
            }
        }

        Command::History { limit } => {
            let entries = open_service(&config)?.history(*limit)?;
            if args.json {
                display_json(&entries, &mut out)?;
            } else {
                display_history(&entries, &mut out)?;
            }
        }

        Command::Unlink { target } => {
            let result = open_service(&config)?.unlink(target)?;
            if args.json {
                display_json(&result, &mut out)?;
            } else {
                display_unlink_result(&result, &mut out)?;
            }
        }
    }

    Ok(())
}

fn run_link(
    link: &LinkArgs,
    dry_run: bool,
    config: &AppConfig,
    progress: &TerminalProgress,
    json: bool,
    out: &mut impl Write,
) -> Result<(), AppError> {
    let request = link.to_request()?.dry_run(dry_run);
    info!(
        "Linking {:?} as {} {:?} (season {})",
        request.source, request.media_type, request.name, request.season
    );

    let sink: &dyn ProgressSink = progress;
    let result = if dry_run {
        // Dry runs never touch the ledger, so the database is not opened
        LinkService::new(MemoryLedger::new(), config.link_config()).preview(&request, Some(sink))?
    } else {
        open_service(config)?.link(&request, Some(sink))?
    };

    if json {
        display_json(&result, out)?;
    } else {
        display_link_result(&result, dry_run, out)?;
    }
    Ok(())
}

fn open_service(config: &AppConfig) -> Result<LinkService<SqliteLedger>, AppError> {
    let ledger = SqliteLedger::open(&config.data_dir).map_err(|source| AppError::LedgerOpen {
        data_dir: config.data_dir.clone(),
        source,
    })?;
    Ok(LinkService::new(ledger, config.link_config()))
}
