//! Streaming ZIP assembly with a memory-to-disk spill

use crate::error::Result;
use crate::types::{AssetReference, ImageFormat};
use crate::utils::{UniqueNames, sanitize_entry_name, split_extension};
use std::io::{self, Read, Seek, SeekFrom, Write};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use tempfile::{SpooledData, SpooledTempFile};
use zip::write::FileOptions;
use zip::{CompressionMethod, ZipWriter};

/// Name of the failure report entry
pub const REPORT_ENTRY_NAME: &str = "_download_report.txt";

/// Finished archive, either still in memory or spilled to a temporary file
#[derive(Debug)]
pub enum ArchiveBody {
    /// The archive stayed under the spill threshold
    InMemory(Vec<u8>),
    /// The archive crossed the threshold and lives in an anonymous temporary file,
    /// positioned at the start
    OnDisk {
        /// Temporary file holding the archive
        file: std::fs::File,
        /// Archive length in bytes
        len: u64,
    },
}

impl ArchiveBody {
    /// Archive length in bytes
    pub fn len(&self) -> u64 {
        match self {
            ArchiveBody::InMemory(bytes) => bytes.len() as u64,
            ArchiveBody::OnDisk { len, .. } => *len,
        }
    }

    /// Whether the archive is empty (never true for a finished archive)
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Whether the archive spilled to disk
    pub fn is_on_disk(&self) -> bool {
        matches!(self, ArchiveBody::OnDisk { .. })
    }

    /// Read the whole archive into memory
    pub fn into_bytes(self) -> Result<Vec<u8>> {
        match self {
            ArchiveBody::InMemory(bytes) => Ok(bytes),
            ArchiveBody::OnDisk { mut file, len } => {
                let mut bytes = Vec::with_capacity(len as usize);
                file.read_to_end(&mut bytes)?;
                Ok(bytes)
            }
        }
    }
}

/// Spooled archive storage that flags the move from memory to disk
struct SpillStorage {
    inner: SpooledTempFile,
    threshold: usize,
    spilled: Arc<AtomicBool>,
}

impl SpillStorage {
    fn observe(&self) {
        if self.inner.is_rolled() && !self.spilled.swap(true, Ordering::Relaxed) {
            tracing::info!(
                threshold = self.threshold,
                "archive exceeded in-memory threshold, spilling to disk"
            );
        }
    }
}

impl Write for SpillStorage {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        let written = self.inner.write(buf)?;
        self.observe();
        Ok(written)
    }

    fn flush(&mut self) -> io::Result<()> {
        self.inner.flush()
    }
}

impl Seek for SpillStorage {
    fn seek(&mut self, pos: SeekFrom) -> io::Result<u64> {
        self.inner.seek(pos)
    }
}

/// Incremental archive writer
///
/// Entries are written as soon as they arrive and the caller drops the asset
/// bytes right after. The backing storage starts in memory and moves to a
/// temporary file once it grows past the spill threshold; entries already
/// written move with it.
pub struct ArchiveWriter {
    zip: ZipWriter<SpillStorage>,
    names: UniqueNames,
    fallback_format: ImageFormat,
    spilled: Arc<AtomicBool>,
}

impl ArchiveWriter {
    /// Create a writer that spills past `spill_threshold` bytes
    ///
    /// `fallback_format` supplies the extension when an asset's content type is
    /// missing or unrecognised.
    pub fn new(spill_threshold: usize, fallback_format: ImageFormat) -> Self {
        let spilled = Arc::new(AtomicBool::new(false));
        let storage = SpillStorage {
            inner: SpooledTempFile::new(spill_threshold),
            threshold: spill_threshold,
            spilled: spilled.clone(),
        };
        Self {
            zip: ZipWriter::new(storage),
            names: UniqueNames::new(),
            fallback_format,
            spilled,
        }
    }

    /// Write one downloaded asset, returning the entry name used
    pub fn add_asset(
        &mut self,
        reference: &AssetReference,
        bytes: &[u8],
        content_type: Option<&str>,
    ) -> Result<String> {
        let extension = content_type
            .and_then(ImageFormat::from_content_type)
            .unwrap_or(self.fallback_format)
            .extension();

        let sanitized = sanitize_entry_name(&reference.name);
        let (stem, _) = split_extension(&sanitized);
        let stem = if stem.is_empty() {
            sanitize_entry_name(&reference.id)
        } else {
            stem.to_string()
        };
        let entry_name = format!("{}.{}", self.names.claim(&stem), extension);

        // Image formats are already compressed
        let options = FileOptions::default()
            .compression_method(CompressionMethod::Stored)
            .large_file(bytes.len() as u64 >= u32::MAX as u64);
        self.zip.start_file(entry_name.as_str(), options)?;
        self.zip.write_all(bytes)?;

        Ok(entry_name)
    }

    /// Write the failure report entry
    pub fn add_report(&mut self, report: &str) -> Result<()> {
        let options = FileOptions::default().compression_method(CompressionMethod::Deflated);
        self.zip.start_file(REPORT_ENTRY_NAME, options)?;
        self.zip.write_all(report.as_bytes())?;
        Ok(())
    }

    /// Whether the backing storage has moved to disk
    ///
    /// Counts everything written so far, ZIP headers included.
    pub fn is_spilled(&self) -> bool {
        self.spilled.load(Ordering::Relaxed)
    }

    /// Write the central directory and hand back the archive
    pub fn finish(mut self) -> Result<ArchiveBody> {
        let SpillStorage { mut inner, .. } = self.zip.finish()?;
        let len = inner.seek(SeekFrom::End(0))?;
        inner.seek(SeekFrom::Start(0))?;

        Ok(match inner.into_inner() {
            SpooledData::InMemory(cursor) => ArchiveBody::InMemory(cursor.into_inner()),
            SpooledData::OnDisk(file) => ArchiveBody::OnDisk { file, len },
        })
    }
}
