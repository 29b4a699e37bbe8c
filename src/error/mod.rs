mod codes;

pub use codes::ExitCode;

use crate::history::LedgerError;
use crate::linker::LinkError;
use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum AppError {
    #[error(transparent)]
    Link(#[from] LinkError),

    #[error("Cannot open history database in {data_dir}: {source}")]
    LedgerOpen {
        data_dir: PathBuf,
        #[source]
        source: LedgerError,
    },

    #[error("Invalid arguments: {0}")]
    InvalidArguments(String),

    #[error("Failed to display output: {0}")]
    Output(#[from] std::io::Error),
}

impl AppError {
    pub fn exit_code(&self) -> ExitCode {
        match self {
            AppError::Link(err) => match err.root() {
                LinkError::InvalidRequest(_) => ExitCode::InvalidArguments,
                LinkError::SourceNotFound { .. } | LinkError::SourceUnreadable { .. } => {
                    ExitCode::SourceNotFound
                }
                LinkError::DestinationCreateFailed { .. } => ExitCode::DestinationError,
                LinkError::NoHistoryToUndo => ExitCode::NoHistory,
                LinkError::TargetNotFound(_) => ExitCode::TargetNotFound,
                LinkError::Ledger(_) => ExitCode::LedgerError,
                LinkError::SeasonFailed { .. } => ExitCode::GeneralError,
            },
            AppError::LedgerOpen { .. } => ExitCode::LedgerError,
            AppError::InvalidArguments(_) => ExitCode::InvalidArguments,
            AppError::Output(_) => ExitCode::GeneralError,
        }
    }

    pub fn detailed_message(&self) -> String {
        match self {
            AppError::Link(err) => link_message(err),

            AppError::LedgerOpen { data_dir, source } => {
                format!(
                    "Cannot open the history database:\n  {}\n  {}\n\n\
                     Check that the data directory is writable, or set LA_DATA_DIR \
                     (or --data-dir) to another location.",
                    data_dir.display(),
                    source
                )
            }

            AppError::InvalidArguments(message) => {
                format!("{}\n\nRun with --help for usage.", message)
            }

            AppError::Output(e) => format!("Failed to display output: {}", e),
        }
    }
}

fn link_message(err: &LinkError) -> String {
    match err {
        LinkError::InvalidRequest(message) => {
            format!("Invalid link request: {}\n\nRun with --help for usage.", message)
        }

        LinkError::SourceNotFound { name, download_dir } => {
            format!(
                "Source not found:\n  {}\n\n\
                 Searched in {} (also trying dots and spaces interchanged).\n\
                 Check the name, or point LA_DOWNLOAD_DIR (or --download-dir) at the right place.",
                name,
                download_dir.display()
            )
        }

        LinkError::SourceUnreadable { path, source } => {
            format!(
                "Cannot read source:\n  {}\n  {}\n\n\
                 Check file permissions.",
                path.display(),
                source
            )
        }

        LinkError::DestinationCreateFailed { path, source } => {
            format!(
                "Cannot create destination directory:\n  {}\n  {}\n\n\
                 Check that the library is mounted and writable.",
                path.display(),
                source
            )
        }

        LinkError::SeasonFailed { season, source } => {
            format!(
                "Season {} failed:\n{}\n\n\
                 Seasons linked before the failure were kept and recorded in history.",
                season,
                link_message(source)
            )
        }

        LinkError::NoHistoryToUndo => {
            "There is nothing to undo: the history is empty.".to_string()
        }

        LinkError::TargetNotFound(path) => {
            format!(
                "Target directory does not exist:\n  {}\n\n\
                 Please verify the path and try again.",
                path.display()
            )
        }

        LinkError::Ledger(e) => {
            format!(
                "History database error:\n  {}\n\n\
                 The database may be locked by another process or corrupted.",
                e
            )
        }
    }
}
