//! Core data model types: message structure, body parts, extraction targets.

pub mod attachment;
pub mod structure;
