//! Photo library.
//!
//! A directory of images. The camera writes into it as well.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use super::{CaptureError, CapturedImage};
use crate::module::define::IMAGE_EXTENSIONS;

/// Directory backed photo library.
#[derive(Debug, Clone)]
pub struct Library {
    dir: PathBuf,
}

impl Library {
    pub fn new(dir: PathBuf) -> Self {
        Self { dir }
    }

    /// List images in the library, sorted by path.
    pub fn list(&self) -> io::Result<Vec<PathBuf>> {
        let mut images: Vec<PathBuf> = fs::read_dir(&self.dir)?
            .filter_map(|entry| entry.ok().map(|e| e.path()))
            .filter(|path| path.is_file() && is_image(path))
            .collect();
        images.sort();
        Ok(images)
    }

    /// Resolve a selection into a captured image.
    ///
    /// A bare file name is looked up in the library; anything with a directory
    /// component is taken as given.
    pub fn pick(&self, selection: Option<&str>) -> Result<CapturedImage, CaptureError> {
        let selection = match selection.map(str::trim) {
            None | Some("") => return Err(CaptureError::Cancelled),
            Some(s) => s,
        };
        let candidate = Path::new(selection);
        let path = match candidate.components().count() > 1 || candidate.is_absolute() {
            true => candidate.to_path_buf(),
            false => self.dir.join(candidate),
        };

        if !path.is_file() {
            return Err(CaptureError::Failed(format!(
                "{} does not exist",
                path.display()
            )));
        }
        if !is_image(&path) {
            return Err(CaptureError::Failed(format!(
                "{} is not an image",
                path.display()
            )));
        }
        Ok(CapturedImage::LocalFile(path))
    }
}

/// Whether the path carries one of the accepted image extensions.
pub fn is_image(path: &Path) -> bool {
    path.extension()
        .map(|ext| ext.to_string_lossy().to_lowercase())
        .map(|ext| IMAGE_EXTENSIONS.contains(&ext.as_str()))
        .unwrap_or(false)
}
