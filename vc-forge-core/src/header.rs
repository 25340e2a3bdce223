//! Source image header probing.
//!
//! Reads the content id and internal title from the fixed header offsets
//! of a Wii disc image. Supported containers:
//! - Plain ISO/GCM images (header at 0x0)
//! - WBFS containers (header at 0x200)
//! - NASOS images (`WII5` at 0x1182800, `WII9` at 0x1FB5000)

use std::fs::File;
use std::io::SeekFrom;
use std::path::Path;

use thiserror::Error;

use crate::ReadSeek;
use crate::region::Region;

/// Errors raised while probing a source image header.
#[derive(Debug, Error)]
pub enum HeaderError {
    /// I/O error while reading the image
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The header did not contain a usable content id
    #[error("invalid content id: {0}")]
    InvalidContentId(String),

    /// The image is too small to contain a header at the expected offset
    #[error("image too small: expected at least {expected} bytes, got {actual}")]
    TooSmall { expected: u64, actual: u64 },
}

/// Length of a content id in bytes.
pub const CONTENT_ID_LEN: usize = 6;

/// Fixed-length identifier read from a source image header.
///
/// The first four characters identify the title family; the fourth
/// character doubles as the region code.
#[derive(Debug, Clone, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
pub struct ContentId(String);

impl ContentId {
    /// Parse and validate a content id string.
    ///
    /// Must be exactly six ASCII alphanumeric characters with an
    /// alphabetic first character.
    pub fn parse(s: &str) -> Result<Self, HeaderError> {
        let s = s.trim();
        if s.len() != CONTENT_ID_LEN {
            return Err(HeaderError::InvalidContentId(format!(
                "expected {CONTENT_ID_LEN} characters, got {:?}",
                s
            )));
        }
        let mut chars = s.chars();
        let first = chars.next().unwrap_or('\0');
        if !first.is_ascii_alphabetic() || !s.chars().all(|c| c.is_ascii_alphanumeric()) {
            return Err(HeaderError::InvalidContentId(s.to_string()));
        }
        Ok(Self(s.to_ascii_uppercase()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// The four-character title-family prefix.
    pub fn prefix(&self) -> &str {
        &self.0[..4]
    }

    /// The embedded region character (fourth character).
    pub fn region_char(&self) -> char {
        self.0.as_bytes()[3] as char
    }

    /// The region encoded in this id.
    pub fn region(&self) -> Region {
        Region::from_id_char(self.region_char())
    }

    /// A copy of this id with the region character replaced.
    pub fn with_region_char(&self, c: char) -> ContentId {
        let mut bytes = self.0.clone().into_bytes();
        bytes[3] = c.to_ascii_uppercase() as u8;
        // Safe: we replaced one ASCII byte with another ASCII byte.
        ContentId(String::from_utf8(bytes).unwrap_or_else(|_| self.0.clone()))
    }
}

impl std::fmt::Display for ContentId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl std::str::FromStr for ContentId {
    type Err = HeaderError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

/// Container formats whose header offset we know.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContainerKind {
    Iso,
    Wbfs,
    NasosWii5,
    NasosWii9,
}

impl ContainerKind {
    /// Byte offset of the disc header inside this container.
    pub fn header_offset(&self) -> u64 {
        match self {
            Self::Iso => 0x0,
            Self::Wbfs => 0x200,
            Self::NasosWii5 => 0x1182800,
            Self::NasosWii9 => 0x1FB5000,
        }
    }

    /// Whether the source must be expanded to a flat image before use.
    pub fn is_compressed(&self) -> bool {
        !matches!(self, Self::Iso)
    }
}

/// Information probed from a source image header.
#[derive(Debug, Clone)]
pub struct SourceHeader {
    pub content_id: ContentId,
    /// Internal title from the header, trimmed; may be empty.
    pub internal_title: String,
    pub container: ContainerKind,
    /// The first four raw header bytes, carried verbatim into the
    /// generated metadata's reserved field.
    pub raw_id_bytes: [u8; 4],
}

impl SourceHeader {
    pub fn region(&self) -> Region {
        self.content_id.region()
    }
}

/// Probe a source image file for its header.
pub fn probe_file(path: &Path) -> Result<SourceHeader, HeaderError> {
    let mut file = File::open(path)?;
    probe_header(&mut file)
}

/// Probe a source image for its content id and internal title.
///
/// Detects the container by magic bytes, seeks to the container's fixed
/// header offset, and reads the 0x60-byte disc header found there.
pub fn probe_header(reader: &mut dyn ReadSeek) -> Result<SourceHeader, HeaderError> {
    let mut magic = [0u8; 4];
    reader.seek(SeekFrom::Start(0))?;
    reader.read_exact(&mut magic)?;

    let container = match &magic {
        b"WBFS" => ContainerKind::Wbfs,
        b"WII5" => ContainerKind::NasosWii5,
        b"WII9" => ContainerKind::NasosWii9,
        _ => ContainerKind::Iso,
    };

    let offset = container.header_offset();
    let end = reader.seek(SeekFrom::End(0))?;
    if end < offset + 0x60 {
        return Err(HeaderError::TooSmall {
            expected: offset + 0x60,
            actual: end,
        });
    }

    reader.seek(SeekFrom::Start(offset))?;
    let mut header = [0u8; 0x60];
    reader.read_exact(&mut header)?;

    let id_str = std::str::from_utf8(&header[..CONTENT_ID_LEN])
        .map_err(|_| HeaderError::InvalidContentId(hex_string(&header[..CONTENT_ID_LEN])))?;
    let content_id = ContentId::parse(id_str)?;

    // Internal title: 0x20..0x60, NUL-terminated ASCII.
    let title_bytes = &header[0x20..0x60];
    let title_end = title_bytes
        .iter()
        .position(|&b| b == 0)
        .unwrap_or(title_bytes.len());
    let internal_title = String::from_utf8_lossy(&title_bytes[..title_end])
        .trim()
        .to_string();

    let mut raw_id_bytes = [0u8; 4];
    raw_id_bytes.copy_from_slice(&header[..4]);

    Ok(SourceHeader {
        content_id,
        internal_title,
        container,
        raw_id_bytes,
    })
}

fn hex_string(bytes: &[u8]) -> String {
    bytes.iter().map(|b| format!("{b:02X}")).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    fn iso_with_header(id: &str, title: &str) -> Vec<u8> {
        let mut data = vec![0u8; 0x100];
        data[..id.len()].copy_from_slice(id.as_bytes());
        data[0x20..0x20 + title.len()].copy_from_slice(title.as_bytes());
        data
    }

    #[test]
    fn probes_plain_iso() {
        let data = iso_with_header("RMCE01", "MARIO KART WII");
        let header = probe_header(&mut Cursor::new(data)).unwrap();
        assert_eq!(header.content_id.as_str(), "RMCE01");
        assert_eq!(header.internal_title, "MARIO KART WII");
        assert_eq!(header.container, ContainerKind::Iso);
        assert_eq!(&header.raw_id_bytes, b"RMCE");
    }

    #[test]
    fn probes_wbfs_container() {
        let mut data = vec![0u8; 0x300];
        data[..4].copy_from_slice(b"WBFS");
        data[0x200..0x206].copy_from_slice(b"RMGP01");
        data[0x220..0x220 + 5].copy_from_slice(b"MARIO");
        let header = probe_header(&mut Cursor::new(data)).unwrap();
        assert_eq!(header.content_id.as_str(), "RMGP01");
        assert_eq!(header.container, ContainerKind::Wbfs);
        assert_eq!(header.region(), Region::Europe);
    }

    #[test]
    fn rejects_non_ascii_id() {
        let mut data = vec![0u8; 0x100];
        data[..6].copy_from_slice(&[0xFF, 0xFE, 0x41, 0x41, 0x41, 0x41]);
        assert!(matches!(
            probe_header(&mut Cursor::new(data)),
            Err(HeaderError::InvalidContentId(_))
        ));
    }

    #[test]
    fn rejects_truncated_image() {
        let data = vec![0u8; 0x20];
        assert!(matches!(
            probe_header(&mut Cursor::new(data)),
            Err(HeaderError::TooSmall { .. })
        ));
    }

    #[test]
    fn content_id_accessors() {
        let id = ContentId::parse("RMCE01").unwrap();
        assert_eq!(id.prefix(), "RMCE");
        assert_eq!(id.region_char(), 'E');
        assert_eq!(id.region(), Region::Usa);
        assert_eq!(id.with_region_char('P').as_str(), "RMCP01");
    }

    #[test]
    fn content_id_rejects_bad_shapes() {
        assert!(ContentId::parse("RMCE0").is_err());
        assert!(ContentId::parse("1MCE01").is_err());
        assert!(ContentId::parse("RMC-01").is_err());
    }
}
