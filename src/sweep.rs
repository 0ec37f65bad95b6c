//! The sweep run: move what fits from the source folder into the
//! destination, purge marked files, report quota.
//!
//! Fatal conditions come back as [`RunError`]; per-file transfer problems
//! are written to stderr and the run moves on.

use crate::console::Console;
use crate::error::RunError;
use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use gdrive::{Client, DriveFile, ListQuery, Quota};
use std::io::Write;
use std::thread;
use std::time::Duration;

/// Owned files whose name starts with this are deleted during cleanup.
pub const DELETION_MARKER: &str = "#@__";

/// Upper bound on repeated reparent calls after a successful move.
pub const REPARENT_REPEAT_CAP: usize = 1000;

/// Default delay in milliseconds before quota checks and deletions.
pub const DEFAULT_PACE_MS: u64 = 20;

/// Positional inputs of a run.
#[derive(Debug, Clone, Default)]
pub struct Inputs {
    /// Base64-encoded service account key.
    pub credentials: String,
    /// Folder whose files are copied.
    pub source_id: String,
    /// Folder receiving the copies.
    pub destination_id: String,
    /// Folder the originals are moved to.
    pub trash_id: String,
    /// Label printed next to the quota output.
    pub label: String,
}

/// Tally of the transfer phase.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TransferSummary {
    /// Files copied to the destination.
    pub copied: usize,
    /// Files left alone because of their size.
    pub skipped: usize,
    /// Files whose fetch or copy failed.
    pub failed: usize,
    /// Originals that could not be moved to trash after copying.
    pub unmoved: usize,
    /// Bytes copied.
    pub bytes: i64,
}

impl TransferSummary {
    /// Files considered.
    pub fn total(&self) -> usize {
        self.copied + self.skipped + self.failed
    }
}

/// Decode the credential input, registering both forms as secrets first.
pub fn unlock_credentials<O: Write, E: Write>(
    raw: &str,
    console: &mut Console<O, E>,
) -> Result<String, RunError> {
    if raw.is_empty() {
        return Err(RunError::MissingInput("credentials"));
    }
    console.add_mask(raw)?;

    let decoded = STANDARD.decode(raw)?;
    let decoded = String::from_utf8_lossy(&decoded).into_owned();
    let secret = decoded
        .strip_suffix('\n')
        .unwrap_or(decoded.as_str())
        .to_string();

    console.add_mask(&secret)?;
    Ok(secret)
}

/// Run a full sweep.
///
/// `connect` turns the decoded key into an authorized client; `main` builds
/// a real Drive client there, tests plug in a mock.
pub fn run<O, E, F>(
    inputs: &Inputs,
    pace: Duration,
    console: &mut Console<O, E>,
    connect: F,
) -> Result<TransferSummary, RunError>
where
    O: Write,
    E: Write,
    F: FnOnce(&str) -> gdrive::Result<Client>,
{
    let secret = unlock_credentials(&inputs.credentials, console)?;
    let client = connect(&secret).map_err(RunError::Credentials)?;
    drop(secret);
    log::info!("Authenticated");

    let sweep = Sweep::new(&client, inputs, pace);

    sweep.probe_quota()?;
    console.print(&format!("[drive-{}]  ", inputs.label))?;

    let summary = sweep.transfer(console)?;
    log::info!(
        "Transfer done: {} of {} files copied ({} bytes), {} skipped, {} failed, {} not moved",
        summary.copied,
        summary.total(),
        summary.bytes,
        summary.skipped,
        summary.failed,
        summary.unmoved
    );

    let deleted = sweep.cleanup(console)?;
    log::info!("Cleanup done: {} marked files deleted", deleted);

    sweep.report(console)?;
    Ok(summary)
}

/// One run's view of the drive.
pub struct Sweep<'a> {
    client: &'a Client,
    source_id: &'a str,
    destination_id: &'a str,
    trash_id: &'a str,
    pace: Duration,
}

impl<'a> Sweep<'a> {
    /// Bind a client to the folders named in `inputs`.
    pub fn new(client: &'a Client, inputs: &'a Inputs, pace: Duration) -> Self {
        Self {
            client,
            source_id: &inputs.source_id,
            destination_id: &inputs.destination_id,
            trash_id: &inputs.trash_id,
            pace,
        }
    }

    fn throttle(&self) {
        if !self.pace.is_zero() {
            thread::sleep(self.pace);
        }
    }

    /// Fetch the current quota. Failure is fatal.
    pub fn probe_quota(&self) -> Result<Quota, RunError> {
        self.client.quota().map_err(RunError::Quota)
    }

    // =========================================================================
    // Transfer
    // =========================================================================

    /// Copy every file of the source folder that fits into the remaining
    /// quota, moving each copied original to trash.
    pub fn transfer<O: Write, E: Write>(
        &self,
        console: &mut Console<O, E>,
    ) -> Result<TransferSummary, RunError> {
        let files = self
            .client
            .list_all(&ListQuery::InParents(self.source_id.to_string()))
            .map_err(RunError::Listing)?;

        let mut summary = TransferSummary::default();
        if files.is_empty() {
            return Ok(summary);
        }

        console.line("Copying:")?;
        for file in &files {
            self.throttle();
            let quota = self.probe_quota()?;
            self.transfer_one(file, quota.free(), console, &mut summary)?;
        }

        Ok(summary)
    }

    fn transfer_one<O: Write, E: Write>(
        &self,
        file: &DriveFile,
        free: i64,
        console: &mut Console<O, E>,
        summary: &mut TransferSummary,
    ) -> Result<(), RunError> {
        let size = file.size_bytes();
        if size <= 0 || size >= free {
            log::debug!("Skipping {} [{} / {}]", file.name, size, free);
            summary.skipped += 1;
            return Ok(());
        }

        if let Err(err) = self.client.copy_into(file.id(), self.destination_id) {
            log::debug!("{}: {}", err.category(), err.category().advice());
            console.error(&err.to_string())?;
            console.error(&format!("File error {}  [{} / {}]", file.name, size, free))?;
            summary.failed += 1;
            return Ok(());
        }

        console.line(&format!("Copied {} ({})", file.name, file.id()))?;
        summary.copied += 1;
        summary.bytes += size;

        match self
            .client
            .reparent(file.id(), self.trash_id, self.source_id)
        {
            Ok(_) => {
                let repeats = self.reinforce_reparent(file.id());
                log::debug!("Reparent of {} repeated {} times", file.id(), repeats);
            }
            Err(err) => {
                console.error(&err.to_string())?;
                summary.unmoved += 1;
            }
        }

        Ok(())
    }

    /// Repeat the source-to-trash reparent until it fails or the cap is hit.
    ///
    /// Returns how many repeats succeeded. The move already happened; this
    /// is best-effort reinforcement and its outcome does not matter.
    pub fn reinforce_reparent(&self, id: &str) -> usize {
        let mut repeats = 0;
        while repeats < REPARENT_REPEAT_CAP {
            if self
                .client
                .reparent(id, self.trash_id, self.source_id)
                .is_err()
            {
                break;
            }
            repeats += 1;
        }
        repeats
    }

    // =========================================================================
    // Cleanup
    // =========================================================================

    /// Delete owned files carrying the deletion marker and list the rest.
    ///
    /// Returns the number of deleted files. A failed deletion is fatal.
    pub fn cleanup<O: Write, E: Write>(
        &self,
        console: &mut Console<O, E>,
    ) -> Result<usize, RunError> {
        self.throttle();
        let files = self
            .client
            .list_all(&ListQuery::OwnedByMe)
            .map_err(RunError::Listing)?;

        if !self.source_id.is_empty() {
            console.print(&format!("[{}]  ", self.source_id))?;
        }
        console.line("Files:")?;

        let mut deleted = 0;
        for file in &files {
            if file.name.starts_with(DELETION_MARKER) {
                console.line(&format!("Erasing ###  {} ({})", file.name, file.id()))?;
                self.throttle();
                self.client.delete(file.id()).map_err(RunError::Delete)?;
                deleted += 1;
            } else {
                console.line(&format!("{} ({})", file.name, file.id()))?;
            }
        }

        Ok(deleted)
    }

    // =========================================================================
    // Report
    // =========================================================================

    /// Print usage, free space and total in GiB. Fails if the drive is full.
    pub fn report<O: Write, E: Write>(&self, console: &mut Console<O, E>) -> Result<(), RunError> {
        let quota = self.probe_quota()?;

        console.line(&format!("Used: {}", gib(quota.used())))?;
        console.line(&format!("Free: {}", gib(quota.free())))?;
        console.line(&format!("Total: {}", gib(quota.total())))?;

        if quota.is_exhausted() {
            return Err(RunError::QuotaExhausted);
        }

        console.print("\n\n")?;
        Ok(())
    }
}

/// Format a byte count in GiB with two decimals, using `f32` arithmetic.
pub fn gib(bytes: i64) -> String {
    format!("{:.2}", bytes as f32 / 1024.0 / 1024.0 / 1024.0)
}
