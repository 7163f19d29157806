//! `mailsnatch`: save attachments from an IMAP mailbox to disk.
//!
//! This crate walks each message's body structure, picks out attachment and
//! inline parts, names them from their MIME subtype or declared filename,
//! decodes their transfer encoding and writes the raw bytes to a directory.
//! Processed messages can be deleted and the mailbox expunged afterwards.

pub mod config;
pub mod error;
pub mod export;
pub mod mime;
pub mod model;
pub mod session;

pub use error::{ExtractError, Result};
pub use export::attachment::{extract_attachments, run, ExtractOptions, PartAddressing};
pub use export::report::ExtractionReport;
pub use mime::classify::TraversalDepth;
pub use session::MailboxSession;
