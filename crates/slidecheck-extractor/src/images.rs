//! Optional directory of pre-rendered slide images

use crate::error::ExtractionError;
use std::path::{Path, PathBuf};

/// File names tried for slide `n`, in order
fn candidate_names(n: usize) -> [String; 7] {
    [
        format!("slide{}.png", n),
        format!("slide{}.jpg", n),
        format!("slide{}.jpeg", n),
        format!("Slide{}.png", n),
        format!("Slide{}.jpg", n),
        format!("slide_{}.png", n),
        format!("slide_{}.jpg", n),
    ]
}

/// Check that `dir` exists and is a directory
pub fn validate_image_dir(dir: &Path) -> Result<(), ExtractionError> {
    if !dir.exists() {
        return Err(ExtractionError::ImageDirNotFound(dir.to_path_buf()));
    }
    if !dir.is_dir() {
        return Err(ExtractionError::ImageDirNotDirectory(dir.to_path_buf()));
    }
    Ok(())
}

/// First existing render of slide `n` in `dir`
pub fn find_slide_image(dir: &Path, n: usize) -> Option<PathBuf> {
    candidate_names(n)
        .into_iter()
        .map(|name| dir.join(name))
        .find(|path| path.is_file())
}
