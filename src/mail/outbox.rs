//! Directory-backed mailer.

use super::{Mailer, Message};
use crate::{Error, Result};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::instrument;

/// Writes each message into its own numbered subdirectory.
///
/// Layout per message: `<dir>/<n>/message.json` holding the headers and
/// attachment metadata, plus one file per attachment.
#[derive(Debug, Clone)]
pub struct OutboxMailer {
    dir: PathBuf,
}

impl OutboxMailer {
    /// Creates a mailer writing into `dir` (created on first send).
    #[must_use]
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// Returns the outbox directory.
    #[must_use]
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn next_slot(&self) -> Result<PathBuf> {
        fs::create_dir_all(&self.dir).map_err(|e| Error::operation("create_outbox", e))?;
        let used = fs::read_dir(&self.dir)
            .map_err(|e| Error::operation("read_outbox", e))?
            .filter_map(std::result::Result::ok)
            .filter_map(|entry| entry.file_name().to_str()?.parse::<u64>().ok())
            .max();
        let slot = self.dir.join(used.map_or(1, |n| n + 1).to_string());
        fs::create_dir(&slot).map_err(|e| Error::operation("create_outbox_message", e))?;
        Ok(slot)
    }
}

impl Mailer for OutboxMailer {
    #[instrument(skip(self, message), fields(outbox = %self.dir.display(), attachments = message.attachments.len()))]
    fn send(&self, message: &Message) -> Result<()> {
        let slot = self.next_slot()?;

        for attachment in &message.attachments {
            let name = Path::new(&attachment.filename)
                .file_name()
                .ok_or_else(|| {
                    Error::InvalidInput(format!("invalid attachment name: {}", attachment.filename))
                })?;
            fs::write(slot.join(name), &attachment.content)
                .map_err(|e| Error::operation("write_attachment", e))?;
        }

        let headers = serde_json::to_vec_pretty(message)
            .map_err(|e| Error::operation("serialize_message", e))?;
        fs::write(slot.join("message.json"), headers)
            .map_err(|e| Error::operation("write_message", e))?;

        tracing::info!(path = %slot.display(), to = ?message.to, "Queued message in outbox");
        Ok(())
    }
}
