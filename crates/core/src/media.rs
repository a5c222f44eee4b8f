//! Upload and download media helpers.

use std::path::Path;

/// Upload size ceiling when none is configured (10 MiB).
pub const DEFAULT_MAX_UPLOAD_BYTES: usize = 10 * 1024 * 1024;

/// MIME types accepted for source images.
pub const ALLOWED_IMAGE_TYPES: &[&str] = &["image/jpeg", "image/jpg", "image/png"];

/// Whether a declared upload MIME type is an accepted source image.
pub fn is_allowed_image_type(content_type: &str) -> bool {
    let essence = content_type
        .split(';')
        .next()
        .unwrap_or("")
        .trim()
        .to_ascii_lowercase();
    ALLOWED_IMAGE_TYPES.contains(&essence.as_str())
}

/// File extension used when storing an upload of the given MIME type.
pub fn extension_for_image_type(content_type: &str) -> &'static str {
    if content_type.to_ascii_lowercase().contains("png") {
        "png"
    } else {
        "jpg"
    }
}

/// Guess a Content-Type from a file extension.
pub fn content_type_for_extension(path: &str) -> &'static str {
    let ext = path.rsplit('.').next().unwrap_or("").to_lowercase();
    match ext.as_str() {
        "mp4" | "m4v" => "video/mp4",
        "webm" => "video/webm",
        "mov" => "video/quicktime",
        "jpg" | "jpeg" => "image/jpeg",
        "png" => "image/png",
        _ => "application/octet-stream",
    }
}

/// Derive a `.mp4` download name from an uploaded image filename.
pub fn video_filename_for(upload_filename: &str) -> String {
    let stem = Path::new(upload_filename)
        .file_stem()
        .and_then(|s| s.to_str())
        .filter(|s| !s.is_empty())
        .unwrap_or("video");
    format!("{stem}.mp4")
}
