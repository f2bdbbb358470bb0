use crate::models::ExtractedEntry;
use crate::services::metadata::MetadataBuilder;
use std::fs::File;
use std::io::{self, BufReader, Read, Seek, Write};
use std::path::{Component, Path};
use thiserror::Error;
use zip::ZipArchive;

/// Member suffixes eligible for extraction, matched case-insensitively
pub const ALLOWED_EXTENSIONS: [&str; 4] = [".txt", ".jpg", ".jpeg", ".png"];

const COPY_BUFFER_SIZE: usize = 64 * 1024;

#[derive(Error, Debug)]
pub enum ArchiveError {
    /// The container could not be opened, parsed or decompressed
    #[error("Invalid or corrupted zip file: {0}")]
    Corrupt(String),

    /// Writing into the staging directory failed
    #[error("{0}")]
    Io(#[from] io::Error),
}

pub fn is_allowed(name: &str) -> bool {
    let lower = name.to_lowercase();
    ALLOWED_EXTENSIONS.iter().any(|ext| lower.ends_with(ext))
}

/// Extracts the allow-listed members of the ZIP at `archive_path` into `staging_dir`.
///
/// Blocking; run it on the blocking pool.
pub fn extract_allowed(
    archive_path: &Path,
    staging_dir: &Path,
) -> Result<Vec<ExtractedEntry>, ArchiveError> {
    let file = File::open(archive_path).map_err(|e| {
        ArchiveError::Corrupt(format!("Cannot open {}: {}", archive_path.display(), e))
    })?;
    extract_from(BufReader::new(file), staging_dir)
}

/// Same as [`extract_allowed`] over any seekable reader.
pub fn extract_from<R: Read + Seek>(
    reader: R,
    staging_dir: &Path,
) -> Result<Vec<ExtractedEntry>, ArchiveError> {
    let mut archive =
        ZipArchive::new(reader).map_err(|e| ArchiveError::Corrupt(e.to_string()))?;

    let mut extracted = Vec::new();
    for index in 0..archive.len() {
        // Any failure locating or parsing a member (truncated data included) is corruption.
        let mut member = archive
            .by_index(index)
            .map_err(|e| ArchiveError::Corrupt(e.to_string()))?;
        let name = member.name().to_string();

        if member.is_dir() || !is_allowed(&name) {
            tracing::debug!("Skipping archive member: {}", name);
            continue;
        }

        // enclosed_name rejects absolute names and names climbing above the root;
        // interior `..` passes it, so those are refused separately.
        let Some(relative) = member
            .enclosed_name()
            .map(|p| p.to_path_buf())
            .filter(|p| !p.components().any(|c| c == Component::ParentDir))
        else {
            tracing::warn!("Refusing to extract unsafe archive member: {}", name);
            continue;
        };
        let target = staging_dir.join(&relative);
        if !target.starts_with(staging_dir) {
            tracing::warn!("Refusing to extract unsafe archive member: {}", name);
            continue;
        }

        if let Some(parent) = target.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let mut out = File::create(&target)?;
        let size = copy_member(&mut member, &mut out, &name)?;
        out.flush()?;

        let content_type = MetadataBuilder::content_type(&target);
        let category = MetadataBuilder::category(&content_type);
        tracing::info!("Extracted: {} ({} bytes)", name, size);

        extracted.push(ExtractedEntry {
            name,
            path: target,
            content_type,
            category,
        });
    }

    Ok(extracted)
}

/// Read failures come from decompression and count as corruption; write failures are I/O.
fn copy_member(
    reader: &mut impl Read,
    writer: &mut impl Write,
    name: &str,
) -> Result<u64, ArchiveError> {
    let mut buffer = vec![0u8; COPY_BUFFER_SIZE];
    let mut written = 0u64;

    loop {
        let n = match reader.read(&mut buffer) {
            Ok(0) => break,
            Ok(n) => n,
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e) => {
                return Err(ArchiveError::Corrupt(format!(
                    "Failed to read member {}: {}",
                    name, e
                )));
            }
        };
        writer.write_all(&buffer[..n])?;
        written += n as u64;
    }

    Ok(written)
}
