//! Pre-flight validation for uploads.
//!
//! Rejections here happen before any network call is made.

use thiserror::Error;

/// Maximum accepted upload size (2 GiB).
pub const MAX_UPLOAD_BYTES: u64 = 2 * 1024 * 1024 * 1024;

/// File extensions accepted for upload.
const VIDEO_EXTENSIONS: &[&str] = &["mp4", "mov", "avi", "mkv", "webm", "m4v"];

/// Validation failures detected before submission.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ValidationError {
    #[error("file not found: {0}")]
    FileNotFound(String),

    #[error("unsupported file type: {0} (expected a video file)")]
    UnsupportedFileType(String),

    #[error("file too large: {size} bytes (max {max})")]
    FileTooLarge { size: u64, max: u64 },

    #[error("epsilon {0} out of range (0.04-0.20)")]
    EpsilonOutOfRange(f64),

    #[error("video strength {0} out of range (1.0-2.0)")]
    StrengthOutOfRange(f64),

    #[error("every_n_frames {0} out of range (1-30)")]
    FrameStrideOutOfRange(u32),
}

/// Check that a file name and size are acceptable for upload.
pub fn validate_video_file(file_name: &str, size: u64) -> Result<(), ValidationError> {
    let extension = file_name
        .rsplit_once('.')
        .map(|(_, ext)| ext.to_ascii_lowercase());

    match extension {
        Some(ext) if VIDEO_EXTENSIONS.contains(&ext.as_str()) => {}
        _ => return Err(ValidationError::UnsupportedFileType(file_name.to_string())),
    }

    if size > MAX_UPLOAD_BYTES {
        return Err(ValidationError::FileTooLarge {
            size,
            max: MAX_UPLOAD_BYTES,
        });
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_common_video_extensions() {
        assert!(validate_video_file("clip.mp4", 1024).is_ok());
        assert!(validate_video_file("clip.MOV", 1024).is_ok());
        assert!(validate_video_file("a.b.webm", 1024).is_ok());
    }

    #[test]
    fn rejects_non_video_files() {
        assert!(matches!(
            validate_video_file("notes.txt", 10),
            Err(ValidationError::UnsupportedFileType(_))
        ));
        assert!(matches!(
            validate_video_file("no_extension", 10),
            Err(ValidationError::UnsupportedFileType(_))
        ));
    }

    #[test]
    fn rejects_oversized_files() {
        assert!(validate_video_file("clip.mp4", MAX_UPLOAD_BYTES).is_ok());
        assert!(matches!(
            validate_video_file("clip.mp4", MAX_UPLOAD_BYTES + 1),
            Err(ValidationError::FileTooLarge { .. })
        ));
    }
}
