//! Mailbox sessions: the interface the extractor needs from a mailbox.
//!
//! Messages are addressed by their 1-based sequence index. A session owns the
//! UID of every message so callers can build names that stay stable across
//! runs.

pub mod imap;
pub mod memory;

use serde::Serialize;

use crate::error::Result;
use crate::model::structure::{MessageStructure, PartPath};

/// An open connection to a mailbox.
///
/// Implementations are stateful and non-reentrant: one outstanding request at
/// a time. After [`close`](MailboxSession::close) every operation returns
/// [`ExtractError::SessionClosed`](crate::error::ExtractError::SessionClosed).
pub trait MailboxSession {
    /// Number of messages in the selected mailbox.
    fn message_count(&self) -> Result<u32>;

    /// UID of the message at `index` (1-based), if there is one.
    fn uid(&self, index: u32) -> Option<u32>;

    /// Fetch the body structure of a message.
    fn fetch_structure(&mut self, index: u32) -> Result<MessageStructure>;

    /// Fetch the raw, still transfer-encoded body of one section.
    fn fetch_part_body(&mut self, index: u32, section: &PartPath) -> Result<Vec<u8>>;

    /// Mark a message for deletion. Nothing is removed until [`expunge`](Self::expunge).
    fn delete_message(&mut self, index: u32) -> Result<()>;

    /// Permanently remove every message marked for deletion.
    fn expunge(&mut self) -> Result<()>;

    /// Release the connection. Calling it again is a no-op.
    fn close(&mut self) -> Result<()>;

    fn is_closed(&self) -> bool;
}

/// A message address: sequence index plus UID.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct MessageRef {
    pub index: u32,
    pub uid: u32,
}

/// Explicit position in a session's message list.
///
/// Each caller holds its own cursor, so several sessions (or several passes
/// over the same one) never share traversal state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MessageCursor {
    next: u32,
}

impl Default for MessageCursor {
    fn default() -> Self {
        Self { next: 1 }
    }
}

impl MessageCursor {
    pub fn new() -> Self {
        Self::default()
    }

    /// Move the cursor so the next message returned is `index` (1-based).
    pub fn seek(&mut self, index: u32) {
        self.next = index.max(1);
    }

    /// Index the next call to [`advance`](Self::advance) will return.
    pub fn position(&self) -> u32 {
        self.next
    }

    /// Return the next message, or `None` once the mailbox is exhausted.
    ///
    /// Messages without a known UID fall back to their sequence index.
    pub fn advance<S: MailboxSession + ?Sized>(&mut self, session: &S) -> Option<MessageRef> {
        let count = session.message_count().ok()?;
        if self.next > count {
            return None;
        }
        let index = self.next;
        self.next += 1;
        Some(MessageRef {
            index,
            uid: session.uid(index).unwrap_or(index),
        })
    }
}
