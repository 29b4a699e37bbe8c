//! Entry point for callers that may run operations concurrently.

use parking_lot::Mutex;
use std::path::Path;
use tracing::debug;

use crate::history::{HistoryEntry, Ledger};
use crate::linker::{self, LinkConfig, LinkEngine, LinkError, LinkRequest, LinkResult};
use crate::parser::{parse_release_name, ParseResult};
use crate::progress::ProgressSink;

/// Owns a ledger and serializes every filesystem-mutating operation.
///
/// Dry-runs, previews and reads do not take the write lock.
pub struct LinkService<L: Ledger> {
    ledger: L,
    config: LinkConfig,
    write_lock: Mutex<()>,
}

impl<L: Ledger> LinkService<L> {
    pub fn new(ledger: L, config: LinkConfig) -> Self {
        Self {
            ledger,
            config,
            write_lock: Mutex::new(()),
        }
    }

    pub fn config(&self) -> &LinkConfig {
        &self.config
    }

    pub fn ledger(&self) -> &L {
        &self.ledger
    }

    fn engine(&self) -> LinkEngine<'_> {
        LinkEngine::new(&self.ledger)
    }

    pub fn parse(&self, raw: &str) -> ParseResult {
        parse_release_name(raw)
    }

    pub fn link(
        &self,
        request: &LinkRequest,
        sink: Option<&dyn ProgressSink>,
    ) -> Result<LinkResult, LinkError> {
        if request.dry_run {
            return self.engine().link(request, &self.config, sink);
        }

        let _guard = self.write_lock.lock();
        debug!("Write lock acquired for link");
        self.engine().link(request, &self.config, sink)
    }

    /// Link with `dry_run` forced on
    pub fn preview(
        &self,
        request: &LinkRequest,
        sink: Option<&dyn ProgressSink>,
    ) -> Result<LinkResult, LinkError> {
        let request = request.clone().dry_run(true);
        self.engine().link(&request, &self.config, sink)
    }

    pub fn undo(&self) -> Result<(LinkResult, HistoryEntry), LinkError> {
        let _guard = self.write_lock.lock();
        debug!("Write lock acquired for undo");
        self.engine().undo(&self.config)
    }

    pub fn undo_preview(&self) -> Result<(LinkResult, HistoryEntry), LinkError> {
        self.engine().undo_preview()
    }

    pub fn history(&self, limit: usize) -> Result<Vec<HistoryEntry>, LinkError> {
        self.engine().history(limit)
    }

    pub fn unlink(&self, target: &Path) -> Result<LinkResult, LinkError> {
        let _guard = self.write_lock.lock();
        debug!("Write lock acquired for unlink");
        linker::unlink(target, &self.config)
    }
}
