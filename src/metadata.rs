use crate::constants::{EXIF_WRITABLE_EXTENSIONS, METADATA_TAG_SEPARATOR};
use crate::error::{Error, Result};
use crate::utils;
use anyhow::Context as _;
use exif::experimental::Writer;
use exif::{Context, Field, In, Tag, Value};
use img_parts::{Bytes, DynImage, ImageEXIF};
use std::fs;
use std::io::{self, Cursor};
use std::path::Path;

/// Windows keyword field, not named by the exif crate
const XP_KEYWORDS: Tag = Tag(Context::Tiff, 0x9c9e);

/// Fields rebuilt by the writer or owned by this module
const REPLACED_TAGS: &[Tag] = &[
    Tag::ImageDescription,
    XP_KEYWORDS,
    Tag::ExifIFDPointer,
    Tag::GPSInfoIFDPointer,
    Tag::InteropIFDPointer,
    Tag::JPEGInterchangeFormat,
    Tag::JPEGInterchangeFormatLength,
    Tag::StripOffsets,
    Tag::StripByteCounts,
    Tag::TileOffsets,
    Tag::TileByteCounts,
];

/// Embed `tags` into the image at `file_path`.
///
/// Keywords go to `ImageDescription` (UTF-8, joined with `"; "`) and to the Windows
/// `XPKeywords` field (UTF-16LE). Other primary-image fields already present are
/// written back unchanged.
///
/// Best effort: unsupported formats, unreadable files and corrupt EXIF blocks all
/// come back as [`Error::MetadataWriteSkipped`] and leave the file untouched.
pub fn embed_tags(file_path: &Path, tags: &[String]) -> Result<()> {
    let skip = |reason: String| Error::MetadataWriteSkipped {
        path: file_path.to_path_buf(),
        reason,
    };

    let ext = utils::get_extension(file_path).unwrap_or_default();
    if !EXIF_WRITABLE_EXTENSIONS.contains(&ext.as_str()) {
        return Err(skip(format!("no writable EXIF block for .{} files", ext)));
    }

    let data = fs::read(file_path).map_err(|e| skip(format!("cannot read file: {}", e)))?;
    let mut image = DynImage::from_bytes(Bytes::from(data))
        .map_err(|e| skip(format!("cannot parse image container: {}", e)))?
        .ok_or_else(|| skip("unrecognized image container".to_string()))?;

    let exif = build_exif(image.exif(), tags).map_err(|e| skip(format!("cannot build EXIF block: {}", e)))?;
    image.set_exif(Some(Bytes::from(exif)));

    write_atomically(file_path, image).map_err(|e| skip(format!("cannot write file: {}", e)))
}

/// Read back the keywords stored in `ImageDescription`; empty when there are none
pub fn read_tags(file_path: &Path) -> anyhow::Result<Vec<String>> {
    let data = fs::read(file_path)
        .with_context(|| format!("Failed to read image: {}", file_path.display()))?;

    let image = match DynImage::from_bytes(Bytes::from(data))
        .with_context(|| format!("Failed to parse image: {}", file_path.display()))?
    {
        Some(image) => image,
        None => return Ok(Vec::new()),
    };

    let raw = match image.exif() {
        Some(raw) => raw,
        None => return Ok(Vec::new()),
    };

    let exif = exif::Reader::new()
        .read_raw(raw.to_vec())
        .context("Failed to parse EXIF block")?;

    let tags = match exif.get_field(Tag::ImageDescription, In::PRIMARY) {
        Some(Field {
            value: Value::Ascii(parts),
            ..
        }) => parts
            .iter()
            .flat_map(|part| {
                String::from_utf8_lossy(part)
                    .split(';')
                    .map(|t| t.trim().to_string())
                    .filter(|t| !t.is_empty())
                    .collect::<Vec<_>>()
            })
            .collect(),
        _ => Vec::new(),
    };

    Ok(tags)
}

fn build_exif(existing: Option<Bytes>, tags: &[String]) -> std::result::Result<Vec<u8>, exif::Error> {
    let preserved: Vec<Field> = match existing {
        Some(raw) => exif::Reader::new()
            .read_raw(raw.to_vec())?
            .fields()
            .filter(|f| f.ifd_num == In::PRIMARY)
            .filter(|f| !REPLACED_TAGS.contains(&f.tag))
            .filter(|f| !matches!(f.value, Value::Unknown(..)))
            .cloned()
            .collect(),
        None => Vec::new(),
    };

    let joined = tags.join(METADATA_TAG_SEPARATOR);
    let description = Field {
        tag: Tag::ImageDescription,
        ifd_num: In::PRIMARY,
        value: Value::Ascii(vec![joined.as_bytes().to_vec()]),
    };
    let keywords = Field {
        tag: XP_KEYWORDS,
        ifd_num: In::PRIMARY,
        value: Value::Byte(utf16le_nul_terminated(&joined)),
    };

    let mut writer = Writer::new();
    for field in &preserved {
        writer.push_field(field);
    }
    writer.push_field(&description);
    writer.push_field(&keywords);

    let mut buf = Cursor::new(Vec::new());
    writer.write(&mut buf, false)?;
    Ok(buf.into_inner())
}

fn utf16le_nul_terminated(text: &str) -> Vec<u8> {
    text.encode_utf16()
        .chain(std::iter::once(0))
        .flat_map(|unit| unit.to_le_bytes())
        .collect()
}

/// Encode next to the target, then rename over it
fn write_atomically(path: &Path, image: DynImage) -> io::Result<()> {
    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };

    let mut tmp = tempfile::NamedTempFile::new_in(dir)?;
    image.encoder().write_to(&mut tmp)?;
    tmp.as_file().sync_all()?;
    if let Ok(meta) = fs::metadata(path) {
        tmp.as_file().set_permissions(meta.permissions())?;
    }
    tmp.persist(path).map_err(|e| e.error)?;
    Ok(())
}
