//! Content hashing and the dedup gate
//!
//! Calculates the SHA-256 of the original upload bytes and looks the
//! digest up in the catalog before any transcoding work is done.

use sha2::{Digest, Sha256};
use std::io::{self, Read, Seek, SeekFrom};

use crate::db::AssetCatalog;
use crate::models::AssetRecord;

const CHUNK_SIZE: usize = 64 * 1024;

/// Dedup gate result
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HashResult {
    /// No live record has this hash - continue processing
    Unique(String),
    /// Content already stored - short-circuit with the existing record
    Duplicate(AssetRecord),
}

/// Hash a seekable stream in chunks, then rewind it for downstream decoding
pub fn hash_reader<R: Read + Seek>(reader: &mut R) -> io::Result<String> {
    let mut hasher = Sha256::new();
    let mut buffer = vec![0u8; CHUNK_SIZE];

    loop {
        let bytes_read = reader.read(&mut buffer)?;
        if bytes_read == 0 {
            break;
        }
        hasher.update(&buffer[..bytes_read]);
    }

    reader.seek(SeekFrom::Start(0))?;

    Ok(format!("{:x}", hasher.finalize()))
}

/// Hash an in-memory buffer
pub fn hash_bytes(data: &[u8]) -> String {
    format!("{:x}", Sha256::digest(data))
}

/// Look up an existing live record for this hash
///
/// Not atomic with the later insert; see `AssetCatalog::insert_if_absent`.
pub async fn check_duplicate(catalog: &dyn AssetCatalog, hash: &str) -> sqlx::Result<HashResult> {
    match catalog.find_by_hash(hash).await? {
        Some(existing) => {
            tracing::debug!(hash = %hash, asset_id = existing.id, "Dedup gate hit");
            Ok(HashResult::Duplicate(existing))
        }
        None => Ok(HashResult::Unique(hash.to_string())),
    }
}
