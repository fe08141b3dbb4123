//! Image source handling: folder scanning and dimension probing.

use std::path::{Path, PathBuf};

use crate::format::FormatError;

/// Recognized image file extensions (lowercase).
pub const IMAGE_EXTENSIONS: &[&str] = &["jpg", "jpeg", "png", "bmp", "tiff"];

/// Scan a directory (non-recursively) for image files.
///
/// The result is sorted by full path, lexicographic ascending; this order is
/// the canonical navigation order for the session.
pub fn scan_folder(dir: &Path) -> Result<Vec<PathBuf>, FormatError> {
    if !dir.is_dir() {
        return Err(FormatError::bad_path(dir));
    }

    let mut images: Vec<PathBuf> = std::fs::read_dir(dir)?
        .filter_map(|e| e.ok())
        .map(|e| e.path())
        .filter(|p| p.is_file() && has_image_extension(p))
        .collect();
    images.sort();

    log::info!("Found {} images in {:?}", images.len(), dir);
    Ok(images)
}

/// Probe an image's pixel dimensions without decoding the full file.
pub fn image_dimensions(path: &Path) -> Result<(u32, u32), FormatError> {
    Ok(image::image_dimensions(path)?)
}

fn has_image_extension(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_ascii_lowercase())
        .is_some_and(|e| IMAGE_EXTENSIONS.contains(&e.as_str()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scan_sorted_and_filtered() {
        let dir = tempfile::tempdir().unwrap();
        for name in ["b.png", "a.JPG", "notes.txt", "c.jpeg"] {
            std::fs::write(dir.path().join(name), b"").unwrap();
        }
        std::fs::create_dir(dir.path().join("sub")).unwrap();
        std::fs::write(dir.path().join("sub/d.png"), b"").unwrap();

        let images = scan_folder(dir.path()).unwrap();
        let names: Vec<_> = images
            .iter()
            .map(|p| p.file_name().unwrap().to_str().unwrap())
            .collect();
        // Non-recursive, extension-filtered, path-sorted.
        assert_eq!(names, vec!["a.JPG", "b.png", "c.jpeg"]);
    }

    #[test]
    fn test_scan_missing_dir_errors() {
        let dir = tempfile::tempdir().unwrap();
        assert!(scan_folder(&dir.path().join("nope")).is_err());
    }
}
