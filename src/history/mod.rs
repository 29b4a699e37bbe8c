mod memory;
mod sqlite;
mod store;
mod types;

pub use memory::MemoryLedger;
pub use sqlite::{SqliteLedger, DATABASE_FILE};
pub use store::{Ledger, LedgerError};
pub use types::*;
