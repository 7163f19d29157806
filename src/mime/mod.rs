//! MIME handling: part classification, extension resolution, transfer decoding.

pub mod classify;
pub mod decode;
pub mod extension;
