//! Writing attachments to disk and reporting what happened.

pub mod attachment;
pub mod report;
