//! On-disk format of the embedding cache.
//!
//! ```text
//! +--------+---------+-----------+------------------+--------+
//! | "STRE" | version | body len  | bincode body     | crc32  |
//! | 4 B    | u32 LE  | u64 LE    | body len bytes   | u32 LE |
//! +--------+---------+-----------+------------------+--------+
//! ```
//!
//! The checksum covers the body only. Files are written to a sibling path
//! and renamed into place, so readers never see a partial artifact.

use std::ffi::OsString;
use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use byteorder::{ByteOrder, LittleEndian, WriteBytesExt};
use serde::{Deserialize, Serialize};

use crate::error::{Result, StrataError};

/// File magic.
pub const MAGIC: &[u8; 4] = b"STRE";

/// Current format version.
pub const FORMAT_VERSION: u32 = 1;

const HEADER_LEN: usize = 4 + 4 + 8;
const TRAILER_LEN: usize = 4;

/// Decoded artifact body.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CacheBody {
    /// Number of embedded records.
    pub rows: u64,
    /// Vector length.
    pub dim: u64,
    /// Fingerprint of the corpus the vectors were computed from.
    pub fingerprint: u32,
    /// Row-major `rows × dim` values.
    pub data: Vec<f32>,
}

/// CRC32 over a sequence of texts. Each text is followed by a zero byte so
/// that moving characters across a text boundary changes the result.
pub fn fingerprint<'a, I>(texts: I) -> u32
where
    I: IntoIterator<Item = &'a str>,
{
    let mut hasher = crc32fast::Hasher::new();
    for text in texts {
        hasher.update(text.as_bytes());
        hasher.update(&[0]);
    }
    hasher.finalize()
}

/// Write an artifact atomically.
pub fn write(path: &Path, body: &CacheBody) -> Result<()> {
    let encoded =
        bincode::serialize(body).map_err(|e| StrataError::serialization(e.to_string()))?;
    let checksum = crc32fast::hash(&encoded);

    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)?;
    }
    let tmp = temp_path(path);
    {
        let mut writer = BufWriter::new(File::create(&tmp)?);
        writer.write_all(MAGIC)?;
        writer.write_u32::<LittleEndian>(FORMAT_VERSION)?;
        writer.write_u64::<LittleEndian>(encoded.len() as u64)?;
        writer.write_all(&encoded)?;
        writer.write_u32::<LittleEndian>(checksum)?;
        writer.flush()?;
        writer.get_ref().sync_all()?;
    }
    fs::rename(&tmp, path).inspect_err(|_| {
        let _ = fs::remove_file(&tmp);
    })?;
    Ok(())
}

/// Read and verify an artifact.
pub fn read(path: &Path) -> Result<CacheBody> {
    let bytes = fs::read(path)?;
    if bytes.len() < HEADER_LEN + TRAILER_LEN {
        return Err(StrataError::serialization("artifact is truncated"));
    }
    if &bytes[..4] != MAGIC {
        return Err(StrataError::serialization("bad magic"));
    }
    let version = LittleEndian::read_u32(&bytes[4..8]);
    if version != FORMAT_VERSION {
        return Err(StrataError::serialization(format!(
            "unsupported format version {version}"
        )));
    }
    let body_len = usize::try_from(LittleEndian::read_u64(&bytes[8..16]))
        .map_err(|_| StrataError::serialization("body length does not fit in memory"))?;
    let expected_len = HEADER_LEN
        .checked_add(body_len)
        .and_then(|n| n.checked_add(TRAILER_LEN))
        .ok_or_else(|| StrataError::serialization("body length overflows"))?;
    if bytes.len() != expected_len {
        return Err(StrataError::serialization("length mismatch"));
    }

    let body = &bytes[HEADER_LEN..HEADER_LEN + body_len];
    let stored = LittleEndian::read_u32(&bytes[HEADER_LEN + body_len..]);
    if crc32fast::hash(body) != stored {
        return Err(StrataError::serialization("checksum mismatch"));
    }

    let decoded: CacheBody =
        bincode::deserialize(body).map_err(|e| StrataError::serialization(e.to_string()))?;
    let values = decoded
        .rows
        .checked_mul(decoded.dim)
        .ok_or_else(|| StrataError::serialization("matrix shape overflows"))?;
    if decoded.data.len() as u64 != values {
        return Err(StrataError::serialization(format!(
            "expected {values} values for {}x{}, found {}",
            decoded.rows,
            decoded.dim,
            decoded.data.len()
        )));
    }
    Ok(decoded)
}

fn temp_path(path: &Path) -> PathBuf {
    let mut name = OsString::from(path.as_os_str());
    name.push(".tmp");
    PathBuf::from(name)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn body() -> CacheBody {
        CacheBody {
            rows: 2,
            dim: 3,
            fingerprint: fingerprint(["a", "b"]),
            data: vec![0.1, -2.5, f32::MIN_POSITIVE, 1e-30, 3.0, 0.0],
        }
    }

    #[test]
    fn test_write_then_read() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("embeddings.bin");
        write(&path, &body()).unwrap();

        let read_back = read(&path).unwrap();
        assert_eq!(read_back, body());
        for (a, b) in read_back.data.iter().zip(&body().data) {
            assert_eq!(a.to_bits(), b.to_bits());
        }
        assert!(!temp_path(&path).exists());
    }

    #[test]
    fn test_corruption_detected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("embeddings.bin");
        write(&path, &body()).unwrap();

        let mut bytes = fs::read(&path).unwrap();
        let middle = HEADER_LEN + 3;
        bytes[middle] ^= 0xFF;
        fs::write(&path, &bytes).unwrap();
        assert!(read(&path).is_err());

        fs::write(&path, b"STRE").unwrap();
        assert!(read(&path).is_err());

        fs::write(&path, b"not an artifact at all").unwrap();
        assert!(read(&path).is_err());
    }

    #[test]
    fn test_oversized_length_header() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("embeddings.bin");
        write(&path, &body()).unwrap();

        let mut bytes = fs::read(&path).unwrap();
        LittleEndian::write_u64(&mut bytes[8..16], u64::MAX);
        fs::write(&path, &bytes).unwrap();
        assert!(matches!(read(&path), Err(StrataError::Serialization(_))));
    }

    #[test]
    fn test_overflowing_shape() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("embeddings.bin");
        let huge = CacheBody {
            rows: u64::MAX,
            dim: 2,
            ..body()
        };
        write(&path, &huge).unwrap();
        assert!(read(&path).unwrap_err().to_string().contains("shape"));
    }

    #[test]
    fn test_fingerprint_sensitive_to_boundaries() {
        assert_eq!(fingerprint(["ab", "c"]), fingerprint(["ab", "c"]));
        assert_ne!(fingerprint(["ab", "c"]), fingerprint(["a", "bc"]));
    }
}
