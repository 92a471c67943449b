//! Typed view of a presentation package.
//!
//! Parsed from the transformed archive so that later steps (persistence,
//! native chart refresh) work with slides and charts rather than raw bytes.

use crate::archive::{self, PartKind};
use pptsync_core::{Error, PlaceholderSubstitutor, PlaceholderToken, Result};
use quick_xml::events::Event;
use quick_xml::Reader;
use serde::Serialize;
use std::io::{Read, Seek};
use std::path::Path;
use zip::ZipArchive;

const PRESENTATION_PART: &str = "ppt/presentation.xml";
const PRESENTATION_RELS: &str = "ppt/_rels/presentation.xml.rels";

/// A slide, in presentation order.
#[derive(Debug, Clone, Serialize)]
pub struct SlideDocument {
    /// 1-based slide number.
    pub number: usize,

    /// Part name, e.g. `ppt/slides/slide1.xml`.
    pub path: String,

    /// Text of each non-empty paragraph.
    pub paragraphs: Vec<String>,

    /// Chart parts referenced by the slide.
    pub charts: Vec<String>,
}

/// A chart part and the embedded workbook backing its data.
#[derive(Debug, Clone, Serialize)]
pub struct ChartDocument {
    pub path: String,

    /// Embedded workbook part targeted by the chart's package relationship.
    pub embedding: Option<String>,
}

/// A presentation package together with its parsed structure.
#[derive(Debug, Clone)]
pub struct PresentationDocument {
    bytes: Vec<u8>,
    parts: Vec<String>,
    slides: Vec<SlideDocument>,
    charts: Vec<ChartDocument>,
}

impl PresentationDocument {
    /// Parse a package archive.
    pub fn from_bytes(bytes: Vec<u8>) -> Result<Self> {
        let mut archive = archive::open(&bytes)?;
        let mut parts = Vec::with_capacity(archive.len());
        for i in 0..archive.len() {
            let file = archive
                .by_index(i)
                .map_err(|e| Error::ZipError(format!("Failed to read entry #{}: {}", i, e)))?;
            parts.push(file.name().to_string());
        }

        let slide_order = get_slide_order(&mut archive)?;
        let mut slides = Vec::with_capacity(slide_order.len());
        for (idx, slide_path) in slide_order.iter().enumerate() {
            slides.push(parse_slide(&mut archive, slide_path, idx + 1)?);
        }

        let mut chart_paths: Vec<String> = parts
            .iter()
            .filter(|p| p.starts_with("ppt/charts/") && !p.contains("/_rels/") && p.ends_with(".xml"))
            .cloned()
            .collect();
        chart_paths.sort();
        let mut charts = Vec::with_capacity(chart_paths.len());
        for path in &chart_paths {
            charts.push(parse_chart(&mut archive, path)?);
        }

        log::debug!(
            "Parsed presentation: {} parts, {} slides, {} charts",
            parts.len(),
            slides.len(),
            charts.len()
        );
        drop(archive);

        Ok(Self {
            bytes,
            parts,
            slides,
            charts,
        })
    }

    /// Read and parse a package from a file.
    pub fn open(path: &Path) -> Result<Self> {
        Self::from_bytes(std::fs::read(path)?)
    }

    /// Package archive bytes.
    pub fn to_bytes(&self) -> &[u8] {
        &self.bytes
    }

    /// Write the package archive to a file.
    pub fn save(&self, path: &Path) -> Result<()> {
        std::fs::write(path, &self.bytes)?;
        log::info!("Presentation saved to {}", path.display());
        Ok(())
    }

    /// Part names in archive order.
    pub fn parts(&self) -> &[String] {
        &self.parts
    }

    pub fn slides(&self) -> &[SlideDocument] {
        &self.slides
    }

    pub fn charts(&self) -> &[ChartDocument] {
        &self.charts
    }

    /// Embedded workbook parts, in archive order.
    pub fn embedded_workbooks(&self) -> Vec<&str> {
        self.parts
            .iter()
            .filter(|p| PartKind::classify(p) == PartKind::EmbeddedWorkbook)
            .map(String::as_str)
            .collect()
    }

    /// The chart whose data lives in the given embedded workbook.
    pub fn chart_for_embedding(&self, embedding: &str) -> Option<&ChartDocument> {
        self.charts
            .iter()
            .find(|c| c.embedding.as_deref() == Some(embedding))
    }

    /// Charts with no embedded workbook in the package (linked or broken data).
    pub fn charts_missing_embedding(&self) -> Vec<&ChartDocument> {
        self.charts
            .iter()
            .filter(|c| match &c.embedding {
                Some(target) => !self.parts.iter().any(|p| p == target),
                None => true,
            })
            .collect()
    }

    /// Placeholder tokens still present in slide text, with their slide number.
    pub fn unresolved_placeholders(&self) -> Vec<(usize, PlaceholderToken)> {
        let substitutor = PlaceholderSubstitutor::new();
        let mut tokens = Vec::new();
        for slide in &self.slides {
            for paragraph in &slide.paragraphs {
                for token in substitutor.find_tokens(paragraph) {
                    tokens.push((slide.number, token));
                }
            }
        }
        tokens
    }
}

/// A relationship entry from a `.rels` part.
#[derive(Debug, Clone, PartialEq, Eq)]
struct Relationship {
    id: String,
    rel_type: String,
    target: String,
}

/// Slide part names in presentation order.
///
/// Uses the `sldIdLst` order from `presentation.xml`, falling back to the
/// slide number in the relationship id or target.
fn get_slide_order<R: Read + Seek>(archive: &mut ZipArchive<R>) -> Result<Vec<String>> {
    let rels_content = archive::read_text(archive, PRESENTATION_RELS)?
        .ok_or_else(|| Error::ZipError(format!("File not found in archive '{}'", PRESENTATION_RELS)))?;
    let rels: Vec<Relationship> = parse_relationships(&rels_content)?
        .into_iter()
        .filter(|r| is_slide_relationship(&r.rel_type))
        .collect();

    let listed = match archive::read_text(archive, PRESENTATION_PART)? {
        Some(xml) => slide_id_list(&xml)?,
        None => Vec::new(),
    };

    let mut slides: Vec<(String, Option<usize>)> = rels
        .iter()
        .map(|r| {
            let order = listed
                .iter()
                .position(|id| *id == r.id)
                .map(|pos| pos + 1)
                .or_else(|| extract_slide_number(&r.target).map(|n| n + listed.len()));
            (resolve_target(PRESENTATION_PART, &r.target), order)
        })
        .collect();

    slides.sort_by(|a, b| match (a.1, b.1) {
        (Some(na), Some(nb)) => na.cmp(&nb),
        (Some(_), None) => std::cmp::Ordering::Less,
        (None, Some(_)) => std::cmp::Ordering::Greater,
        (None, None) => a.0.cmp(&b.0),
    });

    Ok(slides.into_iter().map(|(path, _)| path).collect())
}

fn is_slide_relationship(rel_type: &str) -> bool {
    rel_type.ends_with("/slide")
}

/// Relationship ids of `<p:sldId r:id="..."/>` entries, in document order.
fn slide_id_list(xml: &str) -> Result<Vec<String>> {
    let mut ids = Vec::new();
    let mut reader = Reader::from_str(xml);
    reader.trim_text(true);

    loop {
        match reader.read_event() {
            Ok(Event::Empty(ref e)) | Ok(Event::Start(ref e)) if local_name(e.name().as_ref()) == b"sldId" => {
                for attr in e.attributes().flatten() {
                    // The namespaced `r:id`, not the numeric `id`.
                    let key = attr.key.as_ref();
                    if key != b"id" && local_name(key) == b"id" {
                        ids.push(String::from_utf8_lossy(&attr.value).to_string());
                    }
                }
            }
            Ok(Event::Eof) => break,
            Err(e) => {
                return Err(Error::XmlError(format!("Error parsing presentation: {}", e)));
            }
            _ => {}
        }
    }

    Ok(ids)
}

fn parse_relationships(xml: &str) -> Result<Vec<Relationship>> {
    let mut rels = Vec::new();
    let mut reader = Reader::from_str(xml);
    reader.trim_text(true);

    loop {
        match reader.read_event() {
            Ok(Event::Empty(ref e)) | Ok(Event::Start(ref e)) if e.name().as_ref() == b"Relationship" => {
                let mut rel = Relationship {
                    id: String::new(),
                    rel_type: String::new(),
                    target: String::new(),
                };

                for attr in e.attributes().flatten() {
                    let value = String::from_utf8_lossy(&attr.value).to_string();
                    match attr.key.as_ref() {
                        b"Id" => rel.id = value,
                        b"Type" => rel.rel_type = value,
                        b"Target" => rel.target = value,
                        _ => {}
                    }
                }

                rels.push(rel);
            }
            Ok(Event::Eof) => break,
            Err(e) => {
                return Err(Error::XmlError(format!("Error parsing relationships: {}", e)));
            }
            _ => {}
        }
    }

    Ok(rels)
}

/// Relationships of a part, empty when it has no `.rels` part.
fn part_relationships<R: Read + Seek>(archive: &mut ZipArchive<R>, part: &str) -> Result<Vec<Relationship>> {
    match archive::read_text(archive, &rels_for_part(part))? {
        Some(xml) => parse_relationships(&xml),
        None => Ok(Vec::new()),
    }
}

fn parse_slide<R: Read + Seek>(archive: &mut ZipArchive<R>, slide_path: &str, number: usize) -> Result<SlideDocument> {
    let content = archive::read_text(archive, slide_path)?
        .ok_or_else(|| Error::ZipError(format!("File not found in archive '{}'", slide_path)))?;

    let charts = part_relationships(archive, slide_path)?
        .into_iter()
        .filter(|r| r.rel_type.ends_with("/chart"))
        .map(|r| resolve_target(slide_path, &r.target))
        .collect();

    Ok(SlideDocument {
        number,
        path: slide_path.to_string(),
        paragraphs: extract_paragraphs(&content),
        charts,
    })
}

fn parse_chart<R: Read + Seek>(archive: &mut ZipArchive<R>, chart_path: &str) -> Result<ChartDocument> {
    let embedding = part_relationships(archive, chart_path)?
        .into_iter()
        .find(|r| r.rel_type.ends_with("/package"))
        .map(|r| resolve_target(chart_path, &r.target));

    Ok(ChartDocument {
        path: chart_path.to_string(),
        embedding,
    })
}

/// Text of each non-empty `<a:p>` paragraph in slide XML.
fn extract_paragraphs(xml_content: &str) -> Vec<String> {
    let mut paragraphs = Vec::new();
    let mut reader = Reader::from_str(xml_content);
    reader.trim_text(false);

    let mut in_paragraph = false;
    let mut in_text = false;
    let mut current_text = String::new();

    loop {
        match reader.read_event() {
            Ok(Event::Start(ref e)) => match local_name(e.name().as_ref()) {
                b"p" => {
                    in_paragraph = true;
                    current_text.clear();
                }
                b"t" if in_paragraph => in_text = true,
                _ => {}
            },
            Ok(Event::Text(ref e)) if in_text => {
                let text = e.unescape().unwrap_or_default();
                current_text.push_str(&text);
            }
            Ok(Event::End(ref e)) => match local_name(e.name().as_ref()) {
                b"t" => in_text = false,
                b"p" => {
                    in_paragraph = false;
                    let text = current_text.trim();
                    if !text.is_empty() {
                        paragraphs.push(text.to_string());
                    }
                    current_text.clear();
                }
                _ => {}
            },
            Ok(Event::Eof) => break,
            Err(e) => {
                log::warn!("XML parsing error (continuing): {}", e);
            }
            _ => {}
        }
    }

    paragraphs
}

/// Extract the local name from a potentially namespaced XML element name.
fn local_name(name: &[u8]) -> &[u8] {
    if let Some(pos) = name.iter().position(|&b| b == b':') {
        &name[pos + 1..]
    } else {
        name
    }
}

/// Extract a slide number from a string like "rId2" or "slides/slide3.xml".
fn extract_slide_number(s: &str) -> Option<usize> {
    let s = s.trim_end_matches(".xml").trim_end_matches(".rels");

    let digits: String = s.chars().rev().take_while(|c| c.is_ascii_digit()).collect();
    if digits.is_empty() {
        return None;
    }
    let digits: String = digits.chars().rev().collect();
    digits.parse().ok()
}

/// `.rels` part holding the relationships of `part`.
fn rels_for_part(part: &str) -> String {
    match part.rsplit_once('/') {
        Some((dir, file_name)) => format!("{}/_rels/{}.rels", dir, file_name),
        None => format!("_rels/{}.rels", part),
    }
}

/// Resolve a relationship target against the directory of its source part.
fn resolve_target(source_part: &str, target: &str) -> String {
    let target = target.split('#').next().unwrap_or(target);
    let joined = match target.strip_prefix('/') {
        Some(absolute) => absolute.to_string(),
        None => {
            let base_dir = source_part.rsplit_once('/').map(|(dir, _)| dir).unwrap_or("");
            format!("{}/{}", base_dir, target)
        }
    };

    let mut segments: Vec<&str> = Vec::new();
    for segment in joined.split('/') {
        match segment {
            "" | "." => {}
            ".." => {
                segments.pop();
            }
            other => segments.push(other),
        }
    }
    segments.join("/")
}
