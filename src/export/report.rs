//! Outcome of an extraction run.

use std::path::PathBuf;

use serde::Serialize;

use crate::error::ExtractError;
use crate::session::MessageRef;

/// What happened during one call to
/// [`extract_attachments`](super::attachment::extract_attachments).
#[derive(Debug, Default, Serialize)]
pub struct ExtractionReport {
    /// Messages in the mailbox when the run started.
    pub messages_total: u32,
    /// Messages whose structure was fetched and whose parts were walked.
    pub messages_processed: u32,
    /// Messages marked for deletion.
    pub messages_deleted: u32,
    pub written: Vec<WrittenFile>,
    pub failures: Vec<Failure>,
    /// Whether the final expunge ran successfully.
    pub expunged: bool,
    pub expunge_error: Option<String>,
    /// Set when the progress callback asked to stop early.
    pub cancelled: bool,
}

/// One attachment saved to disk.
#[derive(Debug, Clone, Serialize)]
pub struct WrittenFile {
    pub message: MessageRef,
    /// Section the body was fetched from.
    pub section: String,
    pub path: PathBuf,
    pub bytes: u64,
}

/// A message- or part-scoped failure that did not stop the run.
#[derive(Debug, Clone, Serialize)]
pub struct Failure {
    pub message: MessageRef,
    /// `None` when the whole message failed (e.g. its structure fetch).
    pub section: Option<String>,
    pub kind: FailureKind,
    pub reason: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum FailureKind {
    Fetch,
    Resolution,
    Decode,
    Io,
    Mailbox,
    Other,
}

impl From<&ExtractError> for FailureKind {
    fn from(error: &ExtractError) -> Self {
        match error {
            ExtractError::Fetch { .. } => Self::Fetch,
            ExtractError::Resolution { .. } => Self::Resolution,
            ExtractError::Decode(_) => Self::Decode,
            ExtractError::Io { .. } => Self::Io,
            ExtractError::Mailbox { .. } => Self::Mailbox,
            _ => Self::Other,
        }
    }
}

impl Failure {
    pub fn new(message: MessageRef, section: Option<String>, error: &ExtractError) -> Self {
        Self {
            message,
            section,
            kind: FailureKind::from(error),
            reason: error.to_string(),
        }
    }
}

impl ExtractionReport {
    /// Total decoded bytes written.
    pub fn bytes_written(&self) -> u64 {
        self.written.iter().map(|f| f.bytes).sum()
    }

    /// Number of failures of a given kind.
    pub fn count(&self, kind: FailureKind) -> usize {
        self.failures.iter().filter(|f| f.kind == kind).count()
    }

    /// `true` if nothing failed and the run was not cancelled.
    pub fn is_clean(&self) -> bool {
        self.failures.is_empty() && self.expunge_error.is_none() && !self.cancelled
    }

    /// One-line description of what kept the run from being clean, or `None`
    /// if it was.
    pub fn problem_summary(&self) -> Option<String> {
        let mut problems = Vec::new();
        if !self.failures.is_empty() {
            problems.push(format!("{} failure(s)", self.failures.len()));
        }
        if self.expunge_error.is_some() {
            problems.push("expunge failed".to_string());
        }
        if self.cancelled {
            problems.push("cancelled".to_string());
        }
        if problems.is_empty() {
            None
        } else {
            Some(problems.join(", "))
        }
    }
}
