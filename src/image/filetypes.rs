/// Supported image types: extension table and magic-byte prefixes
use crate::error::{VaultError, VaultResult};

pub const MIME_JPEG: &str = "image/jpeg";
pub const MIME_PNG: &str = "image/png";
pub const MIME_TIFF: &str = "image/tiff";

const EXT_TYPES: &[(&str, &str)] = &[
    ("jpg", MIME_JPEG),
    ("jpeg", MIME_JPEG),
    ("png", MIME_PNG),
    ("tif", MIME_TIFF),
    ("tiff", MIME_TIFF),
];

const MAGIC_PREFIXES: &[(&str, &[u8])] = &[
    (MIME_JPEG, &[0xFF, 0xD8]),
    (MIME_PNG, &[0x89, 0x50, 0x4E, 0x47, 0x0D, 0x0A, 0x1A, 0x0A]),
    (MIME_TIFF, &[0x49, 0x49, 0x2A, 0x00]),
    (MIME_TIFF, &[0x4D, 0x4D, 0x00, 0x2A]),
];

/// Resolve the MIME type from the lowercased filename extension.
pub fn mime_for_filename(filename: &str) -> VaultResult<&'static str> {
    let ext = filename
        .rsplit_once('.')
        .map(|(_, ext)| ext.to_ascii_lowercase())
        .unwrap_or_default();

    EXT_TYPES
        .iter()
        .find(|(known, _)| *known == ext)
        .map(|(_, mime)| *mime)
        .ok_or_else(|| VaultError::UnsupportedType(format!("extension {ext:?}")))
}

/// Whether the body starts with one of the magic-byte prefixes registered
/// for the MIME type.
pub fn magic_matches(mime: &str, body: &[u8]) -> bool {
    MAGIC_PREFIXES
        .iter()
        .any(|(known, prefix)| *known == mime && body.starts_with(prefix))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extension_lookup() {
        assert_eq!(mime_for_filename("photo.jpg").unwrap(), MIME_JPEG);
        assert_eq!(mime_for_filename("photo.JPEG").unwrap(), MIME_JPEG);
        assert_eq!(mime_for_filename("scan.png").unwrap(), MIME_PNG);
        assert_eq!(mime_for_filename("scan.tif").unwrap(), MIME_TIFF);
        assert_eq!(mime_for_filename("scan.TIFF").unwrap(), MIME_TIFF);
    }

    #[test]
    fn test_unknown_extension_rejected() {
        for name in ["document.pdf", "archive.tar.gz", "noextension", "photo."] {
            let err = mime_for_filename(name).unwrap_err();
            assert!(matches!(err, VaultError::UnsupportedType(_)), "{name}");
        }
    }

    #[test]
    fn test_magic_prefixes() {
        assert!(magic_matches(MIME_JPEG, &[0xFF, 0xD8, 0xFF, 0xE0]));
        assert!(magic_matches(
            MIME_PNG,
            &[0x89, 0x50, 0x4E, 0x47, 0x0D, 0x0A, 0x1A, 0x0A, 0x00]
        ));
        assert!(magic_matches(MIME_TIFF, &[0x49, 0x49, 0x2A, 0x00, 0x08]));
        assert!(magic_matches(MIME_TIFF, &[0x4D, 0x4D, 0x00, 0x2A, 0x08]));

        assert!(!magic_matches(MIME_PNG, &[0xFF, 0xD8, 0xFF, 0xE0]));
        assert!(!magic_matches(MIME_JPEG, &[0x89, 0x50]));
        assert!(!magic_matches(MIME_JPEG, &[]));
    }
}
