pub mod classifier;
pub mod cli;
pub mod config;
pub mod error;
pub mod history;
pub mod linker;
pub mod logging;
pub mod output;
pub mod parser;
pub mod platform;
pub mod progress;
pub mod service;

pub use classifier::{find_season_dirs, season_number_of, SeasonDirMap, VideoClassifier};
pub use config::AppConfig;
pub use error::{AppError, ExitCode};
pub use history::{
    HistoryEntry, Ledger, LedgerError, LinkedFileRecord, MemoryLedger, NewHistoryEntry,
    SqliteLedger,
};
pub use linker::{
    unlink, FileStatus, LinkConfig, LinkEngine, LinkError, LinkRequest, LinkResult, MediaType,
};
pub use parser::{parse_release_name, ParseResult, SeasonRule};
pub use progress::{ChannelSink, ProgressEvent, ProgressSink, TerminalProgress};
pub use service::LinkService;
