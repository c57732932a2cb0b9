/// Sniff a file extension from leading magic bytes.
pub fn detect_extension(bytes: &[u8]) -> Option<&'static str> {
    match bytes {
        [0xFF, 0xD8, 0xFF, ..] => Some("jpg"),
        [0x89, 0x50, 0x4E, 0x47, ..] => Some("png"),
        [0x52, 0x49, 0x46, 0x46, _, _, _, _, 0x57, 0x45, 0x42, 0x50, ..] => Some("webp"),
        [_, _, _, _, 0x66, 0x74, 0x79, 0x70, ..] => Some("mp4"),
        _ => None,
    }
}

/// MIME type for an image extension, used when inlining local files as
/// `data:` URLs.
pub fn image_mime_for(bytes: &[u8]) -> &'static str {
    match detect_extension(bytes) {
        Some("jpg") => "image/jpeg",
        Some("webp") => "image/webp",
        Some("png") => "image/png",
        _ => {
            tracing::warn!(
                "Unrecognized image format (first 4 bytes: {:02X?}), falling back to image/png",
                &bytes[..bytes.len().min(4)]
            );
            "image/png"
        }
    }
}

/// Extension taken from the last path segment of a URL, ignoring the query.
pub fn extension_from_url(url: &str) -> Option<String> {
    let path = url.split(['?', '#']).next()?;
    let file = path.rsplit('/').next()?;
    let (_, ext) = file.rsplit_once('.')?;
    let ext = ext.to_ascii_lowercase();
    (!ext.is_empty() && ext.len() <= 5 && ext.chars().all(|c| c.is_ascii_alphanumeric()))
        .then_some(ext)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_detect_png() {
        assert_eq!(
            detect_extension(&[0x89, 0x50, 0x4E, 0x47, 0x0D, 0x0A]),
            Some("png")
        );
    }

    #[test]
    fn test_detect_jpeg() {
        assert_eq!(detect_extension(&[0xFF, 0xD8, 0xFF, 0xE0]), Some("jpg"));
    }

    #[test]
    fn test_detect_mp4() {
        assert_eq!(
            detect_extension(&[0x00, 0x00, 0x00, 0x20, 0x66, 0x74, 0x79, 0x70, 0x69, 0x73]),
            Some("mp4")
        );
    }

    #[test]
    fn test_unknown_image_falls_back_to_png() {
        assert_eq!(image_mime_for(&[0x00, 0x01, 0x02, 0x03]), "image/png");
        assert_eq!(image_mime_for(&[]), "image/png");
    }

    #[test]
    fn test_extension_from_url() {
        assert_eq!(
            extension_from_url("https://oss.example/a/b/result.JPG?Expires=1&sig=x").as_deref(),
            Some("jpg")
        );
        assert_eq!(extension_from_url("https://oss.example/a/noext"), None);
        assert_eq!(extension_from_url("https://oss.example/a.b/"), None);
    }
}
