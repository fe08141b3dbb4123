//! Normalized TXT label codec.
//!
//! One plain-text file per image, one record per line:
//!
//! ```text
//! <class_id> <x1_norm> <y1_norm> [<x2_norm> <y2_norm> ...]
//! ```
//!
//! Coordinates are pixel values divided by the image width (x) or height (y),
//! written with fixed 6-decimal precision. Label files live in a `labels/`
//! directory next to the image, named after the image's file stem.

use std::fmt::Write as _;
use std::path::{Path, PathBuf};

use crate::format::error::FormatError;
use crate::model::{Label, Point, Taxonomy};

/// Directory name holding per-image label files.
pub const LABEL_DIR: &str = "labels";

/// Label file path for an image: `<image_parent>/labels/<stem>.txt`.
pub fn label_path(image_path: &Path) -> PathBuf {
    let parent = image_path.parent().unwrap_or_else(|| Path::new(""));
    let stem = image_path
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or("unknown");
    parent.join(LABEL_DIR).join(format!("{}.txt", stem))
}

/// Read the class taxonomy from a text listing.
///
/// An unreadable file surfaces the error without producing a taxonomy, so
/// the caller's previous taxonomy stays in effect.
pub fn read_taxonomy(path: &Path) -> Result<Taxonomy, FormatError> {
    let content = std::fs::read_to_string(path)?;
    let taxonomy = Taxonomy::parse(&content);
    log::info!("Loaded {} classes from {:?}", taxonomy.len(), path);
    Ok(taxonomy)
}

/// Read committed labels from a label file, denormalizing by the image
/// dimensions. A missing file yields an empty set; malformed lines are
/// skipped individually, never fatal to the rest of the file.
pub fn read_labels(
    path: &Path,
    image_width: u32,
    image_height: u32,
) -> Result<Vec<Label>, FormatError> {
    if image_width == 0 || image_height == 0 {
        return Err(FormatError::missing_dimensions(path.display().to_string()));
    }
    if !path.exists() {
        return Ok(Vec::new());
    }

    let content = std::fs::read_to_string(path)?;
    let mut labels = Vec::new();
    for (line_no, line) in content.lines().enumerate() {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        match parse_label_line(line, image_width, image_height) {
            Some(label) => labels.push(label),
            None => {
                log::warn!("Skipping malformed record at {:?}:{}", path, line_no + 1);
            }
        }
    }
    log::debug!("Read {} labels from {:?}", labels.len(), path);
    Ok(labels)
}

/// Write all complete committed labels, overwriting any existing file.
///
/// When there is nothing to write the file is deleted instead: an image with
/// zero labels must not leave a stale label file behind.
pub fn write_labels(
    path: &Path,
    labels: &[Label],
    image_width: u32,
    image_height: u32,
) -> Result<(), FormatError> {
    if image_width == 0 || image_height == 0 {
        return Err(FormatError::missing_dimensions(path.display().to_string()));
    }

    let complete: Vec<&Label> = labels.iter().filter(|l| l.is_complete()).collect();
    if complete.is_empty() {
        if path.exists() {
            std::fs::remove_file(path)?;
            log::debug!("Removed stale label file {:?}", path);
        }
        return Ok(());
    }

    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    let mut out = String::new();
    for label in &complete {
        let _ = write!(out, "{}", label.class_id());
        for p in label.points() {
            let _ = write!(
                out,
                " {:.6} {:.6}",
                p.x / image_width as f32,
                p.y / image_height as f32
            );
        }
        out.push('\n');
    }
    std::fs::write(path, out)?;
    log::debug!("Wrote {} labels to {:?}", complete.len(), path);
    Ok(())
}

/// Parse one record: class id, then pixel points taken in pairs. Records
/// with fewer than one class token and one coordinate pair are rejected.
fn parse_label_line(line: &str, image_width: u32, image_height: u32) -> Option<Label> {
    let parts: Vec<&str> = line.split_whitespace().collect();
    if parts.len() < 3 {
        return None;
    }

    let class_id: u32 = parts[0].parse().ok()?;
    let mut points = Vec::new();
    for pair in parts[1..].chunks_exact(2) {
        let x: f32 = pair[0].parse().ok()?;
        let y: f32 = pair[1].parse().ok()?;
        points.push(Point::new(
            x * image_width as f32,
            y * image_height as f32,
        ));
    }
    if points.is_empty() {
        return None;
    }
    Some(Label::from_parts(class_id, points))
}
