//! File extension resolution for body parts.
//!
//! The extension comes from the MIME subtype first, because some phone mail
//! clients do not send real filenames for attachments. Subtypes longer than
//! four characters (`octet-stream`, vendor types from mobile clients) are not
//! trusted, and the extension of the declared filename is used instead.

use crate::error::ResolutionError;
use crate::model::structure::BodyPart;

/// Subtypes longer than this fall back to the declared filename.
pub const MAX_SUBTYPE_EXTENSION_LEN: usize = 4;

/// Longest extension kept after sanitizing.
const MAX_EXTENSION_LEN: usize = 16;

/// Derive a safe, lower-case file extension for `part`.
///
/// - `jpeg` becomes `jpg`; every other short subtype is used as-is.
/// - Long subtypes use the last `.`-separated segment of the first
///   disposition parameter's value (normally `filename`). A part with no
///   disposition parameters cannot be named and yields
///   [`ResolutionError::MissingFilename`].
pub fn resolve_extension(part: &BodyPart) -> Result<String, ResolutionError> {
    let subtype = part.subtype.to_lowercase();

    let raw = if subtype.chars().count() > MAX_SUBTYPE_EXTENSION_LEN {
        let (_, value) = part
            .disposition_params
            .first()
            .ok_or_else(|| ResolutionError::MissingFilename {
                subtype: subtype.clone(),
            })?;
        value
            .rsplit('.')
            .next()
            .unwrap_or(value.as_str())
            .to_lowercase()
    } else if subtype == "jpeg" {
        "jpg".to_string()
    } else {
        subtype
    };

    let ext = sanitize_extension(&raw);
    if ext.is_empty() {
        return Err(ResolutionError::EmptyExtension);
    }
    Ok(ext)
}

/// Make an extension safe to append to a file name.
///
/// Anything other than ASCII alphanumerics, `-` and `_` becomes `_`, so a
/// hostile filename parameter cannot smuggle path separators into the output
/// path. Surrounding whitespace is dropped and the result is truncated.
fn sanitize_extension(s: &str) -> String {
    s.trim()
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || c == '-' || c == '_' {
                c
            } else {
                '_'
            }
        })
        .take(MAX_EXTENSION_LEN)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::structure::PrimaryType;

    fn image(subtype: &str) -> BodyPart {
        BodyPart::leaf(PrimaryType::Image, subtype)
    }

    #[test]
    fn test_jpeg_becomes_jpg() {
        assert_eq!(resolve_extension(&image("jpeg")).unwrap(), "jpg");
        assert_eq!(resolve_extension(&image("JPEG")).unwrap(), "jpg");
    }

    #[test]
    fn test_short_subtype_used_directly() {
        assert_eq!(resolve_extension(&image("png")).unwrap(), "png");
        assert_eq!(resolve_extension(&image("GIF")).unwrap(), "gif");
        let pdf = BodyPart::leaf(PrimaryType::Application, "pdf");
        assert_eq!(resolve_extension(&pdf).unwrap(), "pdf");
    }

    #[test]
    fn test_long_subtype_uses_filename_extension() {
        let part = BodyPart::leaf(PrimaryType::Application, "octet-stream")
            .with_param("filename", "photo.HEIC");
        assert_eq!(resolve_extension(&part).unwrap(), "heic");
    }

    #[test]
    fn test_long_subtype_takes_first_parameter() {
        let part = BodyPart::leaf(PrimaryType::Image, "x-vendor-image")
            .with_param("filename", "IMG_0001.tar.GZ")
            .with_param("size", "12.345");
        assert_eq!(resolve_extension(&part).unwrap(), "gz");
    }

    #[test]
    fn test_long_subtype_without_params_fails() {
        let part = BodyPart::leaf(PrimaryType::Application, "octet-stream");
        assert_eq!(
            resolve_extension(&part),
            Err(ResolutionError::MissingFilename {
                subtype: "octet-stream".into()
            })
        );
    }

    #[test]
    fn test_filename_without_dot_uses_whole_name() {
        let part =
            BodyPart::leaf(PrimaryType::Application, "octet-stream").with_param("filename", "README");
        assert_eq!(resolve_extension(&part).unwrap(), "readme");
    }

    #[test]
    fn test_hostile_filename_is_sanitized() {
        let part = BodyPart::leaf(PrimaryType::Application, "octet-stream")
            .with_param("filename", "x.evil/../../etc");
        assert_eq!(resolve_extension(&part).unwrap(), "_etc");

        let part = BodyPart::leaf(PrimaryType::Application, "octet-stream")
            .with_param("filename", "trailing.");
        assert_eq!(resolve_extension(&part), Err(ResolutionError::EmptyExtension));
    }

    #[test]
    fn test_empty_subtype_is_error() {
        assert_eq!(
            resolve_extension(&image("")),
            Err(ResolutionError::EmptyExtension)
        );
    }
}
