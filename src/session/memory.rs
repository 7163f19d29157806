//! In-memory mailbox.
//!
//! Holds pre-built structures and raw section bodies for the test suite.
//! Individual structure fetches can be made to fail, and the whole mailbox
//! can be made read-only so flag stores and expunges are rejected.

use std::collections::BTreeMap;

use tracing::debug;

use crate::error::{ExtractError, Result};
use crate::model::structure::{MessageStructure, PartPath};

use super::MailboxSession;

/// One stored message.
#[derive(Debug, Clone)]
pub struct MemoryMessage {
    pub uid: u32,
    pub structure: MessageStructure,
    bodies: BTreeMap<PartPath, Vec<u8>>,
    deleted: bool,
    structure_unavailable: bool,
}

impl MemoryMessage {
    pub fn new(uid: u32, structure: MessageStructure) -> Self {
        Self {
            uid,
            structure,
            bodies: BTreeMap::new(),
            deleted: false,
            structure_unavailable: false,
        }
    }

    /// Attach the raw (transfer-encoded) body of a section.
    pub fn with_body(mut self, section: PartPath, raw: impl Into<Vec<u8>>) -> Self {
        self.bodies.insert(section, raw.into());
        self
    }

    /// Make every structure fetch for this message fail.
    pub fn structure_unavailable(mut self) -> Self {
        self.structure_unavailable = true;
        self
    }
}

/// A mailbox that lives entirely in memory.
#[derive(Debug, Default)]
pub struct MemoryMailbox {
    messages: Vec<MemoryMessage>,
    expunge_count: usize,
    read_only: bool,
    closed: bool,
}

impl MemoryMailbox {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, message: MemoryMessage) {
        self.messages.push(message);
    }

    pub fn with_message(mut self, message: MemoryMessage) -> Self {
        self.push(message);
        self
    }

    /// Reject `STORE` and `EXPUNGE` the way a server does for a mailbox
    /// selected with `EXAMINE`.
    pub fn read_only(mut self) -> Self {
        self.read_only = true;
        self
    }

    /// UIDs of every message still in the mailbox, in sequence order.
    pub fn uids(&self) -> Vec<u32> {
        self.messages.iter().map(|m| m.uid).collect()
    }

    /// UIDs currently flagged for deletion but not yet expunged.
    pub fn deleted_uids(&self) -> Vec<u32> {
        self.messages
            .iter()
            .filter(|m| m.deleted)
            .map(|m| m.uid)
            .collect()
    }

    /// How many times [`expunge`](MailboxSession::expunge) ran.
    pub fn expunge_count(&self) -> usize {
        self.expunge_count
    }

    fn ensure_open(&self) -> Result<()> {
        if self.closed {
            Err(ExtractError::SessionClosed)
        } else {
            Ok(())
        }
    }

    fn message_mut(&mut self, index: u32) -> Result<&mut MemoryMessage> {
        self.ensure_open()?;
        index
            .checked_sub(1)
            .and_then(|i| self.messages.get_mut(i as usize))
            .ok_or_else(|| ExtractError::fetch(index, "no such message"))
    }
}

impl MailboxSession for MemoryMailbox {
    fn message_count(&self) -> Result<u32> {
        self.ensure_open()?;
        Ok(self.messages.len() as u32)
    }

    fn uid(&self, index: u32) -> Option<u32> {
        let i = index.checked_sub(1)?;
        self.messages.get(i as usize).map(|m| m.uid)
    }

    fn fetch_structure(&mut self, index: u32) -> Result<MessageStructure> {
        let message = self.message_mut(index)?;
        if message.structure_unavailable {
            return Err(ExtractError::fetch(index, "structure unavailable"));
        }
        Ok(message.structure.clone())
    }

    fn fetch_part_body(&mut self, index: u32, section: &PartPath) -> Result<Vec<u8>> {
        let message = self.message_mut(index)?;
        message
            .bodies
            .get(section)
            .cloned()
            .ok_or_else(|| ExtractError::fetch(index, format!("no body for section {section}")))
    }

    fn delete_message(&mut self, index: u32) -> Result<()> {
        let read_only = self.read_only;
        let message = self.message_mut(index)?;
        if read_only {
            return Err(ExtractError::mailbox("STORE \\Deleted", "mailbox is read-only"));
        }
        message.deleted = true;
        Ok(())
    }

    fn expunge(&mut self) -> Result<()> {
        self.ensure_open()?;
        if self.read_only {
            return Err(ExtractError::mailbox("EXPUNGE", "mailbox is read-only"));
        }
        let before = self.messages.len();
        self.messages.retain(|m| !m.deleted);
        self.expunge_count += 1;
        debug!(removed = before - self.messages.len(), "Expunged memory mailbox");
        Ok(())
    }

    fn close(&mut self) -> Result<()> {
        self.closed = true;
        Ok(())
    }

    fn is_closed(&self) -> bool {
        self.closed
    }
}
