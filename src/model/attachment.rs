//! Extraction targets.
//!
//! A target lives only between decoding a part and writing it to disk.

use std::path::PathBuf;

use super::structure::PartPath;

/// Where and what to write for a single accepted part.
#[derive(Debug, Clone)]
pub struct ExtractionTarget {
    /// Full destination path: `<dir>/<uid>-<section>.<extension>`.
    pub path: PathBuf,

    /// Resolved, sanitized extension (without the dot).
    pub extension: String,

    /// Section the body was fetched from.
    pub section: PartPath,

    /// Decoded bytes to write, with no wrapping format.
    pub payload: Vec<u8>,
}

impl ExtractionTarget {
    /// Build the file name for a part of message `uid`.
    pub fn file_name(uid: u32, section: &PartPath, extension: &str) -> String {
        format!("{uid}-{}.{extension}", section.file_stem())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_file_name() {
        assert_eq!(
            ExtractionTarget::file_name(1042, &PartPath::single(2), "jpg"),
            "1042-2.jpg"
        );
        assert_eq!(
            ExtractionTarget::file_name(7, &PartPath::from_segments(vec![2, 1]), "pdf"),
            "7-2_1.pdf"
        );
    }
}
