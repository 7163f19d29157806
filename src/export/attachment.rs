//! Extract attachments from every message in a mailbox session.
//!
//! For each message (ascending sequence index) the structure is fetched, the
//! candidate parts are classified, and every accepted part is named, fetched,
//! decoded and written to `<dir>/<uid>-<section>.<ext>`. Part and message
//! failures are recorded in the [`ExtractionReport`] and the run continues.

use std::fs::File;
use std::io::Write;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::error::{ExtractError, ResolutionError, Result};
use crate::mime::classify::{extractable_parts, TraversalDepth};
use crate::mime::decode::decode;
use crate::mime::extension::resolve_extension;
use crate::model::attachment::ExtractionTarget;
use crate::model::structure::{BodyPart, PartPath};
use crate::session::{MailboxSession, MessageCursor, MessageRef};

use super::report::{ExtractionReport, Failure, WrittenFile};

/// Section number the running counter starts at. Section 1 of a typical
/// message is its first text part, so the first attachment is assumed to
/// live at section 2.
pub const DEFAULT_FIRST_PART: u32 = 2;

/// How the body of an accepted part is addressed when fetching it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PartAddressing {
    /// Per-message counter starting at `first`, advanced once per accepted
    /// part (whether or not that part is written successfully). Only correct
    /// when the accepted parts are exactly the top-level sections from
    /// `first` onwards, which holds for the usual "text + attachments"
    /// layout.
    RunningCounter { first: u32 },

    /// Use the section path the part occupies in the structure.
    Structural,
}

impl Default for PartAddressing {
    fn default() -> Self {
        Self::RunningCounter {
            first: DEFAULT_FIRST_PART,
        }
    }
}

/// Parameters of an extraction run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExtractOptions {
    /// Directory attachments are written to. Created if missing.
    pub destination_dir: PathBuf,
    /// Also save parts with an `inline` disposition.
    pub include_inline: bool,
    /// Delete each fully processed message, then expunge once at the end.
    /// A message with any accepted part that failed to extract is kept on
    /// the server, so only messages whose attachments are all on disk are
    /// removed.
    pub delete_after: bool,
    pub traversal: TraversalDepth,
    pub addressing: PartAddressing,
}

impl ExtractOptions {
    /// Options with the historical defaults: inline parts included, messages
    /// deleted, direct children only, running counter from section 2.
    pub fn new(destination_dir: impl Into<PathBuf>) -> Self {
        Self {
            destination_dir: destination_dir.into(),
            include_inline: true,
            delete_after: true,
            traversal: TraversalDepth::default(),
            addressing: PartAddressing::default(),
        }
    }

    pub fn include_inline(mut self, include_inline: bool) -> Self {
        self.include_inline = include_inline;
        self
    }

    pub fn delete_after(mut self, delete_after: bool) -> Self {
        self.delete_after = delete_after;
        self
    }

    pub fn traversal(mut self, traversal: TraversalDepth) -> Self {
        self.traversal = traversal;
        self
    }

    pub fn addressing(mut self, addressing: PartAddressing) -> Self {
        self.addressing = addressing;
        self
    }

    /// Reject options no run can honor. Section 0 is the whole message
    /// header and body, never a part.
    pub fn validate(&self) -> Result<()> {
        if let PartAddressing::RunningCounter { first: 0 } = self.addressing {
            return Err(ExtractError::Config(
                "running counter must start at section 1 or later".into(),
            ));
        }
        Ok(())
    }
}

/// Run [`extract_attachments`] and close the session afterwards, whatever the
/// outcome.
///
/// A failure to close after a successful run is logged, not returned, so the
/// report of what was written is not lost.
pub fn run<S: MailboxSession + ?Sized>(
    session: &mut S,
    options: &ExtractOptions,
    progress: &dyn Fn(usize, usize) -> bool,
) -> Result<ExtractionReport> {
    let result = extract_attachments(session, options, progress);
    if let Err(e) = session.close() {
        warn!(error = %e, "Failed to close mailbox session");
    }
    result
}

/// Save attachments from every message in the session.
///
/// The progress callback receives `(processed, total)` before each message
/// and should return `true` to continue or `false` to cancel. Cancellation
/// only happens between messages, so a message is never half-processed.
///
/// Errors returned from here are fatal (invalid options, destination not
/// creatable, session closed). Everything scoped to one message or part ends up in
/// [`ExtractionReport::failures`].
pub fn extract_attachments<S: MailboxSession + ?Sized>(
    session: &mut S,
    options: &ExtractOptions,
    progress: &dyn Fn(usize, usize) -> bool,
) -> Result<ExtractionReport> {
    options.validate()?;
    let dir = options.destination_dir.as_path();
    std::fs::create_dir_all(dir).map_err(|e| ExtractError::io(dir, e))?;

    let total = session.message_count()?;
    let mut report = ExtractionReport {
        messages_total: total,
        ..Default::default()
    };
    info!(messages = total, dir = %dir.display(), "Extracting attachments");

    let mut cursor = MessageCursor::new();
    let mut processed = 0usize;
    while let Some(message) = cursor.advance(&*session) {
        if !progress(processed, total as usize) {
            debug!("Extraction cancelled at {processed}/{total}");
            report.cancelled = true;
            break;
        }
        process_message(session, message, options, &mut report)?;
        processed += 1;
    }
    let _ = progress(processed, total as usize);

    if options.delete_after {
        match session.expunge() {
            Ok(()) => {
                report.expunged = true;
                info!(deleted = report.messages_deleted, "Expunged mailbox");
            }
            Err(e) if e.is_fatal() => return Err(e),
            Err(e) => {
                warn!(error = %e, "Expunge failed");
                report.expunge_error = Some(e.to_string());
            }
        }
    }

    Ok(report)
}

/// Walk one message. Returns `Err` only for fatal errors.
fn process_message<S: MailboxSession + ?Sized>(
    session: &mut S,
    message: MessageRef,
    options: &ExtractOptions,
    report: &mut ExtractionReport,
) -> Result<()> {
    let structure = match session.fetch_structure(message.index) {
        Ok(structure) => structure,
        Err(e) if e.is_fatal() => return Err(e),
        Err(e) => {
            warn!(index = message.index, uid = message.uid, error = %e, "Skipping message");
            report.failures.push(Failure::new(message, None, &e));
            return Ok(());
        }
    };
    report.messages_processed += 1;

    let mut next_section = match options.addressing {
        PartAddressing::RunningCounter { first } => Some(first),
        PartAddressing::Structural => None,
    };
    let mut failed_parts = 0usize;

    for part in extractable_parts(&structure, options.traversal, options.include_inline) {
        let section = match options.addressing {
            PartAddressing::RunningCounter { .. } => match next_section {
                Some(n) => {
                    next_section = n.checked_add(1);
                    PartPath::single(n)
                }
                None => {
                    let e = ExtractError::Resolution {
                        section: part.section.to_string(),
                        source: ResolutionError::CounterExhausted,
                    };
                    warn!(uid = message.uid, error = %e, "Cannot address part");
                    report
                        .failures
                        .push(Failure::new(message, Some(part.section.to_string()), &e));
                    failed_parts += 1;
                    continue;
                }
            },
            PartAddressing::Structural => part.section.clone(),
        };

        match extract_part(session, message, part, &section, &options.destination_dir) {
            Ok(written) => {
                debug!(path = %written.path.display(), bytes = written.bytes, "Saved attachment");
                report.written.push(written);
            }
            Err(e) if e.is_fatal() => return Err(e),
            Err(e) => {
                warn!(
                    uid = message.uid,
                    section = %section,
                    error = %e,
                    "Failed to extract part"
                );
                report
                    .failures
                    .push(Failure::new(message, Some(section.to_string()), &e));
                failed_parts += 1;
            }
        }
    }

    if options.delete_after {
        if failed_parts > 0 {
            info!(
                uid = message.uid,
                failed = failed_parts,
                "Keeping message with unextracted parts"
            );
        } else {
            match session.delete_message(message.index) {
                Ok(()) => report.messages_deleted += 1,
                Err(e) if e.is_fatal() => return Err(e),
                Err(e) => {
                    warn!(uid = message.uid, error = %e, "Failed to mark message deleted");
                    report.failures.push(Failure::new(message, None, &e));
                }
            }
        }
    }

    Ok(())
}

/// Name, fetch, decode and write a single accepted part.
fn extract_part<S: MailboxSession + ?Sized>(
    session: &mut S,
    message: MessageRef,
    part: &BodyPart,
    section: &PartPath,
    dir: &Path,
) -> Result<WrittenFile> {
    let extension = resolve_extension(part).map_err(|source| ExtractError::Resolution {
        section: section.to_string(),
        source,
    })?;

    let raw = session.fetch_part_body(message.index, section)?;
    let payload = decode(&raw, part.encoding)?;

    let target = ExtractionTarget {
        path: dir.join(ExtractionTarget::file_name(message.uid, section, &extension)),
        extension,
        section: section.clone(),
        payload,
    };
    write_target(&target)?;

    Ok(WrittenFile {
        message,
        section: target.section.to_string(),
        path: target.path,
        bytes: target.payload.len() as u64,
    })
}

/// Write the payload in one go. The file handle is closed when it goes out
/// of scope; a partially written file is removed.
fn write_target(target: &ExtractionTarget) -> Result<()> {
    let written = File::create(&target.path).and_then(|mut file| {
        file.write_all(&target.payload)?;
        file.flush()
    });

    if let Err(e) = written {
        if target.path.exists() {
            let _ = std::fs::remove_file(&target.path);
        }
        return Err(ExtractError::io(&target.path, e));
    }
    Ok(())
}
