//! Package transformation: one pass over every part of a presentation.

use crate::archive::{self, PackageWriter, PartKind};
use crate::document::PresentationDocument;
use pptsync_core::{Error, MarkerIndex, PlaceholderSubstitutor, Result, TransformConfig, Workbook};
use pptsync_xlsx::EmbeddedObjectRewriter;
use std::collections::HashSet;
use std::fs;
use std::path::{Component, Path, PathBuf};
use walkdir::WalkDir;

/// Rewrites a presentation package against a master workbook.
///
/// Embedded workbooks are rebuilt from their marker ranges, slide markup has
/// its placeholders substituted, and every other part is copied unchanged.
pub struct PackageTransformer<'a, W: Workbook + ?Sized> {
    master: &'a W,
    rewriter: EmbeddedObjectRewriter<'a, W>,
    substitutor: PlaceholderSubstitutor,
    config: TransformConfig,
    scratch_parent: Option<PathBuf>,
}

impl<'a, W: Workbook + ?Sized> PackageTransformer<'a, W> {
    pub fn new(master: &'a W, index: &'a MarkerIndex) -> Self {
        Self {
            master,
            rewriter: EmbeddedObjectRewriter::new(master, index),
            substitutor: PlaceholderSubstitutor::new(),
            config: TransformConfig::default(),
            scratch_parent: None,
        }
    }

    pub fn with_config(mut self, config: TransformConfig) -> Self {
        self.config = config;
        self
    }

    /// Create staged scratch directories under `parent` instead of the
    /// system temporary directory.
    pub fn with_scratch_parent(mut self, parent: impl Into<PathBuf>) -> Self {
        self.scratch_parent = Some(parent.into());
        self
    }

    /// Transform a package and parse the result into a typed document.
    pub fn transform(&self, package: &[u8]) -> Result<PresentationDocument> {
        let bytes = self.transform_to_bytes(package)?;
        PresentationDocument::from_bytes(bytes).map_err(|e| {
            log::error!("Failed to parse transformed presentation: {}", e);
            e
        })
    }

    /// Transform a package, returning the new archive bytes.
    pub fn transform_to_bytes(&self, package: &[u8]) -> Result<Vec<u8>> {
        let result = if self.config.use_staged_directory {
            self.transform_staged(package)
        } else {
            self.transform_streaming(package)
        };

        result.map_err(|e| {
            log::error!("An error occurred while transforming the presentation: {}", e);
            e
        })
    }

    /// Entry-by-entry, archive to archive.
    fn transform_streaming(&self, package: &[u8]) -> Result<Vec<u8>> {
        let mut input = archive::open(package)?;
        let mut output = PackageWriter::new();

        for i in 0..input.len() {
            let (name, is_dir, data) = archive::read_entry(&mut input, i)?;
            if is_dir {
                output.write_directory(&name)?;
                continue;
            }
            let data = self.process_part(&name, data)?;
            output.write_file(&name, &data)?;
        }

        output.finish()
    }

    /// Extract to a scratch directory, rewrite parts in place, re-archive.
    ///
    /// The scratch directory is removed when it goes out of scope, on the
    /// error path as well.
    fn transform_staged(&self, package: &[u8]) -> Result<Vec<u8>> {
        let mut builder = tempfile::Builder::new();
        builder.prefix("pptsync_");
        let scratch = match &self.scratch_parent {
            Some(parent) => builder.tempdir_in(parent)?,
            None => builder.tempdir()?,
        };
        let root = scratch.path();
        log::debug!("Staging package in {}", root.display());

        let order = extract(package, root)?;

        for (name, is_dir) in &order {
            if *is_dir || PartKind::classify(name) == PartKind::Passthrough {
                continue;
            }
            let path = staged_path(root, name)?;
            let data = fs::read(&path)?;
            let updated = self.process_part(name, data)?;
            fs::write(&path, updated)?;
        }

        let bytes = rearchive(root, &order)?;

        if let Err(e) = scratch.close() {
            log::warn!("Failed to remove scratch directory: {}", e);
        }
        Ok(bytes)
    }

    /// Bytes to write for one file part.
    fn process_part(&self, name: &str, data: Vec<u8>) -> Result<Vec<u8>> {
        match PartKind::classify(name) {
            PartKind::EmbeddedWorkbook => Ok(self.rewrite_embedded(name, data)),
            PartKind::SlideMarkup => {
                let markup = String::from_utf8(data)
                    .map_err(|e| Error::EncodingError(format!("Slide '{}' is not UTF-8: {}", name, e)))?;
                Ok(self.substitutor.substitute(&markup, self.master).into_bytes())
            }
            PartKind::Passthrough => Ok(data),
        }
    }

    /// Replacement bytes for an embedded workbook, or the original on no-op.
    fn rewrite_embedded(&self, name: &str, original: Vec<u8>) -> Vec<u8> {
        let Some(rewritten) = self.rewriter.rewrite(name, &original) else {
            return original;
        };

        match archive::normalize(&rewritten) {
            Ok(bytes) => bytes,
            Err(e) => {
                log::error!("Failed to modify '{}': {}", name, e);
                original
            }
        }
    }
}

/// Extract every entry under `root`, returning entry names in archive order.
fn extract(package: &[u8], root: &Path) -> Result<Vec<(String, bool)>> {
    let mut input = archive::open(package)?;
    let mut order = Vec::with_capacity(input.len());

    for i in 0..input.len() {
        let (name, is_dir, data) = archive::read_entry(&mut input, i)?;
        let path = staged_path(root, &name)?;
        if is_dir {
            fs::create_dir_all(&path)?;
        } else {
            if let Some(parent) = path.parent() {
                fs::create_dir_all(parent)?;
            }
            fs::write(&path, &data)?;
        }
        order.push((name, is_dir));
    }

    Ok(order)
}

/// Walk the scratch directory and archive its files in the original order.
fn rearchive(root: &Path, order: &[(String, bool)]) -> Result<Vec<u8>> {
    let mut on_disk = staged_files(root)?;

    let mut output = PackageWriter::new();
    for (name, is_dir) in order {
        if *is_dir {
            output.write_directory(name)?;
            continue;
        }
        if !on_disk.remove(name.as_str()) {
            return Err(Error::ZipError(format!("Staged part '{}' disappeared", name)));
        }
        let data = fs::read(staged_path(root, name)?)?;
        output.write_file(name, &data)?;
    }

    let mut extra: Vec<String> = on_disk.into_iter().collect();
    extra.sort();
    for name in extra {
        log::warn!("Archiving unexpected staged file '{}'", name);
        let data = fs::read(staged_path(root, &name)?)?;
        output.write_file(&name, &data)?;
    }

    output.finish()
}

/// `/`-separated relative paths of every file under the scratch root.
fn staged_files(root: &Path) -> Result<HashSet<String>> {
    let mut files = HashSet::new();
    for entry in WalkDir::new(root).follow_links(false) {
        let entry = entry.map_err(|e| Error::IoError(e.into()))?;
        if !entry.file_type().is_file() {
            continue;
        }
        let Ok(relative) = entry.path().strip_prefix(root) else {
            continue;
        };
        let name: Vec<String> = relative
            .components()
            .map(|c| c.as_os_str().to_string_lossy().into_owned())
            .collect();
        files.insert(name.join("/"));
    }
    Ok(files)
}

/// Location of an archive entry under the scratch root, rejecting names
/// that would escape it.
fn staged_path(root: &Path, name: &str) -> Result<PathBuf> {
    let relative = Path::new(name.trim_end_matches('/'));
    let escapes = relative
        .components()
        .any(|c| !matches!(c, Component::Normal(_)));
    if name.is_empty() || escapes {
        return Err(Error::ZipError(format!("Unsafe entry name '{}'", name)));
    }
    Ok(root.join(relative))
}
