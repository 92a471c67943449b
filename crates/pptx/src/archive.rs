//! ZIP archive helpers for presentation packages.
//!
//! Every archive written here uses Deflate and a fixed timestamp, so the
//! output bytes depend only on entry names, order and contents.

use pptsync_core::{Error, Result};
use std::io::{Cursor, Read, Seek, Write};
use zip::write::FileOptions;
use zip::{CompressionMethod, DateTime, ZipArchive, ZipWriter};

const EMBEDDINGS_PREFIX: &str = "ppt/embeddings/";
const SLIDES_PREFIX: &str = "ppt/slides/";

/// How a package part is treated during transformation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PartKind {
    /// `ppt/embeddings/*.xlsx`: rebuilt from the master workbook.
    EmbeddedWorkbook,
    /// `ppt/slides/*.xml`: placeholder substitution.
    SlideMarkup,
    /// Everything else, copied byte-for-byte.
    Passthrough,
}

impl PartKind {
    /// Classify a part by its archive path.
    pub fn classify(path: &str) -> Self {
        if path.starts_with(EMBEDDINGS_PREFIX) && path.ends_with(".xlsx") {
            PartKind::EmbeddedWorkbook
        } else if path.starts_with(SLIDES_PREFIX) && path.ends_with(".xml") {
            PartKind::SlideMarkup
        } else {
            PartKind::Passthrough
        }
    }
}

/// Options shared by every entry this crate writes.
pub fn entry_options() -> FileOptions {
    FileOptions::default()
        .compression_method(CompressionMethod::Deflated)
        .last_modified_time(DateTime::default())
        .unix_permissions(0o644)
}

/// Open an archive over in-memory bytes.
pub fn open(bytes: &[u8]) -> Result<ZipArchive<Cursor<&[u8]>>> {
    ZipArchive::new(Cursor::new(bytes)).map_err(|e| Error::ZipError(format!("Failed to open ZIP: {}", e)))
}

/// Read the full contents of the entry at `index`, with its name.
pub fn read_entry<R: Read + Seek>(archive: &mut ZipArchive<R>, index: usize) -> Result<(String, bool, Vec<u8>)> {
    let mut file = archive
        .by_index(index)
        .map_err(|e| Error::ZipError(format!("Failed to read entry #{}: {}", index, e)))?;
    let name = file.name().to_string();
    let is_dir = file.is_dir();

    let mut data = Vec::with_capacity(file.size() as usize);
    file.read_to_end(&mut data)
        .map_err(|e| Error::ZipError(format!("Failed to read '{}': {}", name, e)))?;

    Ok((name, is_dir, data))
}

/// Read a named part as UTF-8 text, `None` when the part does not exist.
pub fn read_text<R: Read + Seek>(archive: &mut ZipArchive<R>, path: &str) -> Result<Option<String>> {
    let mut file = match archive.by_name(path) {
        Ok(file) => file,
        Err(zip::result::ZipError::FileNotFound) => return Ok(None),
        Err(e) => return Err(Error::ZipError(format!("Failed to open '{}': {}", path, e))),
    };

    let mut content = String::new();
    file.read_to_string(&mut content)
        .map_err(|e| Error::ZipError(format!("Failed to read '{}': {}", path, e)))?;
    Ok(Some(content))
}

/// Archive writer producing in-memory bytes.
pub struct PackageWriter {
    zip: ZipWriter<Cursor<Vec<u8>>>,
}

impl PackageWriter {
    pub fn new() -> Self {
        Self {
            zip: ZipWriter::new(Cursor::new(Vec::new())),
        }
    }

    /// Append a file entry.
    pub fn write_file(&mut self, name: &str, data: &[u8]) -> Result<()> {
        self.zip
            .start_file(name, entry_options())
            .map_err(|e| Error::ZipError(format!("Failed to start '{}': {}", name, e)))?;
        self.zip
            .write_all(data)
            .map_err(|e| Error::ZipError(format!("Failed to write '{}': {}", name, e)))
    }

    /// Append a directory entry.
    pub fn write_directory(&mut self, name: &str) -> Result<()> {
        self.zip
            .add_directory(name, entry_options())
            .map_err(|e| Error::ZipError(format!("Failed to add directory '{}': {}", name, e)))
    }

    /// Finish the archive and return its bytes.
    pub fn finish(mut self) -> Result<Vec<u8>> {
        let cursor = self
            .zip
            .finish()
            .map_err(|e| Error::ZipError(format!("Failed to finish ZIP: {}", e)))?;
        Ok(cursor.into_inner())
    }
}

impl Default for PackageWriter {
    fn default() -> Self {
        Self::new()
    }
}

/// Re-pack an archive with this crate's entry options, keeping entry order.
pub fn normalize(bytes: &[u8]) -> Result<Vec<u8>> {
    let mut archive = open(bytes)?;
    let mut writer = PackageWriter::new();

    for i in 0..archive.len() {
        let (name, is_dir, data) = read_entry(&mut archive, i)?;
        if is_dir {
            writer.write_directory(&name)?;
        } else {
            writer.write_file(&name, &data)?;
        }
    }

    writer.finish()
}
