//! Saving inline `data:image/...;base64,...` payloads to disk.
//!
//! Every payload is decoded as a real image before it is written, so a
//! truncated or corrupt payload is rejected here rather than leaving a broken
//! file in the output directory.

use crate::error::PersistError;
use crate::utils::preview;
use base64::{Engine as _, engine::general_purpose::STANDARD};
use image::{DynamicImage, ImageFormat};
use regex::Regex;
use std::path::{Path, PathBuf};
use std::sync::LazyLock;

/// Prefix every inline image source starts with
pub const INLINE_IMAGE_PREFIX: &str = "data:image";

static INLINE_IMAGE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?s)^data:image/(\w+);base64,(.*)$").expect("inline image pattern is valid")
});

/// Returns true if `source` looks like an inline image payload
pub fn is_inline_image(source: &str) -> bool {
    source.starts_with(INLINE_IMAGE_PREFIX)
}

/// A parsed inline image payload
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InlineImage<'a> {
    /// Format identifier from the media type, e.g. `webp` in `image/webp`
    pub format: &'a str,
    /// Base64 text following the `base64,` marker
    pub data: &'a str,
}

impl<'a> InlineImage<'a> {
    pub fn parse(source: &'a str) -> Result<Self, PersistError> {
        if !is_inline_image(source) {
            return Err(PersistError::NotInlineImage {
                preview: preview(source),
            });
        }

        let captures = INLINE_IMAGE_RE
            .captures(source)
            .ok_or_else(|| PersistError::Malformed {
                preview: preview(source),
            })?;

        match (captures.get(1), captures.get(2)) {
            (Some(format), Some(data)) => Ok(Self {
                format: format.as_str(),
                data: data.as_str(),
            }),
            _ => Err(PersistError::Malformed {
                preview: preview(source),
            }),
        }
    }

    /// Raw image bytes. Line breaks inside the base64 text are ignored.
    pub fn decode(&self) -> Result<Vec<u8>, PersistError> {
        let compact: String = self
            .data
            .chars()
            .filter(|c| !c.is_ascii_whitespace())
            .collect();
        Ok(STANDARD.decode(compact)?)
    }

    /// Format the image is written in. Formats outside the allow-list are
    /// stored as PNG.
    pub fn output_format(&self) -> ImageFormat {
        match self.format.to_ascii_lowercase().as_str() {
            "jpeg" => ImageFormat::Jpeg,
            "png" => ImageFormat::Png,
            "webp" => ImageFormat::WebP,
            _ => ImageFormat::Png,
        }
    }
}

/// Writes decoded page images into a single output directory
#[derive(Debug, Clone)]
pub struct ImagePersister {
    output_dir: PathBuf,
}

impl ImagePersister {
    pub fn new(output_dir: impl Into<PathBuf>) -> Self {
        Self {
            output_dir: output_dir.into(),
        }
    }

    pub fn output_dir(&self) -> &Path {
        &self.output_dir
    }

    /// Decode `payload` and write it to `<output_dir>/<file_name>`,
    /// overwriting any existing file.
    ///
    /// Failures are logged and reported as `false`; nothing is propagated.
    pub fn persist(&self, payload: &str, file_name: &str) -> bool {
        match self.try_persist(payload, file_name) {
            Ok(path) => {
                ::log::debug!("Wrote {}", path.display());
                true
            }
            Err(e @ PersistError::NotInlineImage { .. }) => {
                ::log::error!("Source is not an inline image: {}", e);
                false
            }
            Err(e @ PersistError::Base64(_)) => {
                ::log::error!(
                    "Failed to decode payload for {} ({}...): {}",
                    file_name,
                    preview(payload),
                    e
                );
                false
            }
            Err(e) => {
                ::log::error!("Failed to save image {}: {}", file_name, e);
                false
            }
        }
    }

    fn try_persist(&self, payload: &str, file_name: &str) -> Result<PathBuf, PersistError> {
        let inline = InlineImage::parse(payload)?;
        let bytes = inline.decode()?;
        let image = image::load_from_memory(&bytes)?;

        let format = inline.output_format();
        let path = self.output_dir.join(file_name);
        encodable(image, format).save_with_format(&path, format)?;

        Ok(path)
    }
}

/// Convert to a pixel layout the target encoder accepts
fn encodable(image: DynamicImage, format: ImageFormat) -> DynamicImage {
    match format {
        ImageFormat::Jpeg => DynamicImage::ImageRgb8(image.into_rgb8()),
        ImageFormat::WebP => DynamicImage::ImageRgba8(image.into_rgba8()),
        _ => image,
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use image::{Rgba, RgbaImage};
    use std::io::Cursor;

    /// Build a `data:image/<tag>;base64,...` payload from a solid-colour image
    pub(crate) fn inline_payload(
        tag: &str,
        encode_as: ImageFormat,
        width: u32,
        height: u32,
        seed: u8,
    ) -> String {
        let img = DynamicImage::ImageRgba8(RgbaImage::from_pixel(
            width,
            height,
            Rgba([seed, 255 - seed, seed / 2, 255]),
        ));
        let img = match encode_as {
            ImageFormat::Jpeg => DynamicImage::ImageRgb8(img.into_rgb8()),
            _ => img,
        };
        let mut buf = Vec::new();
        img.write_to(&mut Cursor::new(&mut buf), encode_as)
            .expect("encode test image");
        format!("data:image/{};base64,{}", tag, STANDARD.encode(&buf))
    }

    fn written_format_and_size(path: &Path) -> (ImageFormat, u32, u32) {
        let bytes = std::fs::read(path).expect("read written file");
        let format = image::guess_format(&bytes).expect("recognisable format");
        let img = image::load_from_memory(&bytes).expect("decodable image");
        (format, img.width(), img.height())
    }

    #[test]
    fn test_parse_inline_image() {
        let parsed = InlineImage::parse("data:image/webp;base64,AAAA").unwrap();
        assert_eq!(parsed.format, "webp");
        assert_eq!(parsed.data, "AAAA");
    }

    #[test]
    fn test_parse_rejects_other_sources() {
        assert!(matches!(
            InlineImage::parse("https://example.com/page1.webp"),
            Err(PersistError::NotInlineImage { .. })
        ));
        assert!(matches!(
            InlineImage::parse("data:text/plain;base64,AAAA"),
            Err(PersistError::NotInlineImage { .. })
        ));
        assert!(matches!(
            InlineImage::parse("data:image/svg+xml;utf8,<svg/>"),
            Err(PersistError::Malformed { .. })
        ));
    }

    #[test]
    fn test_output_format_allow_list() {
        let format_of = |tag: &str| {
            let source = format!("data:image/{tag};base64,");
            InlineImage::parse(&source).unwrap().output_format()
        };
        assert_eq!(format_of("jpeg"), ImageFormat::Jpeg);
        assert_eq!(format_of("PNG"), ImageFormat::Png);
        assert_eq!(format_of("WebP"), ImageFormat::WebP);
        assert_eq!(format_of("bmp"), ImageFormat::Png);
        assert_eq!(format_of("gif"), ImageFormat::Png);
        assert_eq!(format_of("jpg"), ImageFormat::Png);
    }

    #[test]
    fn test_decode_ignores_line_breaks() {
        let parsed = InlineImage::parse("data:image/png;base64,aGVs\nbG8=").unwrap();
        assert_eq!(parsed.decode().unwrap(), b"hello");
    }

    #[test]
    fn test_persist_keeps_pixel_dimensions() {
        let dir = tempfile::tempdir().unwrap();
        let persister = ImagePersister::new(dir.path());

        for (tag, format) in [
            ("png", ImageFormat::Png),
            ("jpeg", ImageFormat::Jpeg),
            ("webp", ImageFormat::WebP),
        ] {
            let payload = inline_payload(tag, format, 31, 17, 90);
            let name = format!("page_{tag}.webp");
            assert!(persister.persist(&payload, &name), "persist {tag}");

            let (written, width, height) = written_format_and_size(&dir.path().join(&name));
            assert_eq!(written, format);
            assert_eq!((width, height), (31, 17));
        }
    }

    #[test]
    fn test_persist_unlisted_format_falls_back_to_png() {
        let dir = tempfile::tempdir().unwrap();
        let persister = ImagePersister::new(dir.path());
        let payload = inline_payload("bmp", ImageFormat::Bmp, 8, 12, 10);

        assert!(persister.persist(&payload, "page_0001.webp"));

        let (written, width, height) = written_format_and_size(&dir.path().join("page_0001.webp"));
        assert_eq!(written, ImageFormat::Png);
        assert_eq!((width, height), (8, 12));
    }

    #[test]
    fn test_persist_rejects_non_inline_sources_without_writing() {
        let dir = tempfile::tempdir().unwrap();
        let persister = ImagePersister::new(dir.path());

        for source in ["", "https://cdn.example.com/p1.webp", "blob:https://example.com/1"] {
            assert!(!persister.persist(source, "page_0001.webp"));
        }
        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 0);
    }

    #[test]
    fn test_persist_rejects_bad_base64_and_corrupt_images() {
        let dir = tempfile::tempdir().unwrap();
        let persister = ImagePersister::new(dir.path());

        assert!(!persister.persist("data:image/png;base64,@@not base64@@", "a.webp"));

        let full = inline_payload("png", ImageFormat::Png, 20, 20, 1);
        let (header, data) = full.split_at(full.find(",").unwrap() + 1);
        let keep = (data.len() / 2) - (data.len() / 2) % 4;
        let truncated = format!("{}{}", header, &data[..keep]);
        assert!(!persister.persist(&truncated, "b.webp"));

        let not_an_image = format!("data:image/png;base64,{}", STANDARD.encode(b"plain text"));
        assert!(!persister.persist(&not_an_image, "c.webp"));

        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 0);
    }

    #[test]
    fn test_persist_overwrites_existing_file() {
        let dir = tempfile::tempdir().unwrap();
        let persister = ImagePersister::new(dir.path());

        assert!(persister.persist(&inline_payload("png", ImageFormat::Png, 4, 4, 0), "p.webp"));
        assert!(persister.persist(&inline_payload("png", ImageFormat::Png, 6, 3, 0), "p.webp"));

        let (_, width, height) = written_format_and_size(&dir.path().join("p.webp"));
        assert_eq!((width, height), (6, 3));
    }

    #[test]
    fn test_persist_reports_missing_directory_as_failure() {
        let dir = tempfile::tempdir().unwrap();
        let persister = ImagePersister::new(dir.path().join("missing"));
        let payload = inline_payload("png", ImageFormat::Png, 4, 4, 0);

        assert!(!persister.persist(&payload, "page_0001.webp"));
    }
}
