//! Path Operations Module
//!
//! This module handles path operations for directories and files.

use std::path::PathBuf;

/// Join Paths
///
/// This function takes a slice of strings as input and joins them into a single path string.
/// It uses the PathBuf type to handle platform-specific separators and conversions.
/// Non UTF-8 components are replaced lossily.
pub fn join(paths: &[&str]) -> String {
    let mut path: PathBuf = PathBuf::new();
    for p in paths {
        path.push(p);
    }
    path.to_string_lossy().into_owned()
}

pub mod dir {
    //! Directory Operations Submodule
    //!
    //! This submodule provides functions for directory operations.

    use std::fs;
    use std::io;
    use std::path::Path;

    use super::{AppDir, AppPath};
    use crate::module::define;

    /// Create Directory from Path List
    ///
    /// Joins the list with `join` and creates the directory and its parents.
    /// It returns `Some(path)` if the directory creation succeeds, or `None` if it fails.
    pub fn create_dir_from_path_list(paths: &[&str]) -> Option<String> {
        let path = super::join(paths);
        match fs::create_dir_all(Path::new(&path)) {
            Ok(_) => Some(path),
            Err(e) => {
                log::debug!("Can't create {}: {}", path, e);
                None
            }
        }
    }

    /// Create Subdirectory in Either Directory
    ///
    /// Creates `name` under `dir1`. If that is not possible (missing or read-only parent),
    /// the subdirectory is created under `dir2` instead.
    pub fn create_subdir_in_either_dir(dir1: &str, dir2: &str, name: &str) -> Option<String> {
        if Path::new(dir1).is_dir() {
            if let Some(path) = create_dir_from_path_list(&[dir1, name]) {
                return Some(path);
            }
        }
        create_dir_from_path_list(&[dir2, name])
    }

    /// Create Data Directory
    ///
    /// The data directory lives in the user's local data directory, or in the
    /// system temporary directory when that is not available.
    pub fn create_data_dir() -> io::Result<String> {
        let persistent = dirs::data_local_dir()
            .map(|p| p.to_string_lossy().into_owned())
            .unwrap_or_default();
        let ephemeral = std::env::temp_dir().to_string_lossy().into_owned();
        create_subdir_in_either_dir(&persistent, &ephemeral, define::system::NAME)
            .ok_or_else(|| io::Error::new(io::ErrorKind::Other, "Can't create data dir."))
    }

    /// Create Application Subdirectories and Paths
    ///
    /// Creates the image and log subdirectories inside `data_dir`. The image
    /// directory is the default photo library; `library_dir` overrides it when non-empty.
    pub fn create_app_sub_dir(data_dir: &str, library_dir: &str) -> io::Result<AppPath> {
        let missing = |what: &str| {
            io::Error::new(io::ErrorKind::Other, format!("Can't create {} dir.", what))
        };
        let img_dir = match library_dir.is_empty() {
            true => create_dir_from_path_list(&[data_dir, define::path::IMG_DIR]),
            false => create_dir_from_path_list(&[library_dir]),
        }
        .ok_or_else(|| missing("image"))?;
        let log_dir = create_dir_from_path_list(&[data_dir, define::path::LOG_DIR])
            .ok_or_else(|| missing("log"))?;
        Ok(AppPath {
            dir: AppDir {
                data: data_dir.to_string(),
                img: img_dir,
                log: log_dir,
            },
        })
    }
}

/// Paths of Resources
///
/// This struct represents the paths of the resources used by the application.
#[derive(Debug, Clone)]
pub struct AppPath {
    /// Directories Paths
    pub dir: AppDir,
}

/// Paths of Directories
#[derive(Debug, Clone)]
pub struct AppDir {
    /// Data Directory Path
    pub data: String,
    /// Image Directory Path, also the photo library
    pub img: String,
    /// Log Directory Path
    pub log: String,
}
