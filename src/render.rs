//! HTML rendering for the watch route
//!
//! Known video and audio types get a page with an inline player pointed
//! at the object's streaming URL; everything else gets a download landing
//! page with the file name and a human-readable size. Templates are
//! plain `&str` constants with `%NAME%` placeholders.

use crate::models::FileDescriptor;

/// MIME types rendered with an inline `<video>` player
const VIDEO_FORMATS: &[&str] = &[
    "video/mp4",
    "video/avi",
    "video/ogg",
    "video/h264",
    "video/h265",
    "video/x-matroska",
];

/// MIME types rendered with an inline `<audio>` player
const AUDIO_FORMATS: &[&str] = &[
    "audio/mpeg",
    "audio/mp4",
    "audio/x-mpegurl",
    "audio/vnd.wav",
];

/// Extension fallbacks used when the store recorded no MIME type
const MIME_BY_EXTENSION: &[(&str, &str)] = &[
    ("mp4", "video/mp4"),
    ("mkv", "video/x-matroska"),
    ("avi", "video/avi"),
    ("ogv", "video/ogg"),
    ("mp3", "audio/mpeg"),
    ("m4a", "audio/mp4"),
    ("m3u8", "audio/x-mpegurl"),
    ("wav", "audio/vnd.wav"),
    ("jpg", "image/jpeg"),
    ("jpeg", "image/jpeg"),
    ("png", "image/png"),
    ("gif", "image/gif"),
    ("pdf", "application/pdf"),
    ("txt", "text/plain"),
    ("json", "application/json"),
    ("zip", "application/zip"),
];

/// Units for [`human_size`], each step 1024 times the previous
const SIZE_UNITS: &[&str] = &["Bytes", "KB", "MB", "GB", "TB", "PB", "EB"];

const PLAYER_PAGE: &str = r#"<!DOCTYPE html>
<html>
<head>
    <meta charset="utf-8">
    <title>%HEADING%</title>
    <style>
        body { font-family: Arial, sans-serif; margin: 40px; background: #111; color: #eee; }
        h1 { font-size: 1.2em; font-weight: normal; }
        %TAG% { width: 100%; max-width: 960px; outline: none; }
    </style>
</head>
<body>
    <h1>%HEADING%</h1>
    <%TAG% controls src="%SRC%">Your browser cannot play %NAME%.</%TAG%>
</body>
</html>
"#;

const DOWNLOAD_PAGE: &str = r#"<!DOCTYPE html>
<html>
<head>
    <meta charset="utf-8">
    <title>%HEADING%</title>
    <style>
        body { font-family: Arial, sans-serif; margin: 40px; background: #111; color: #eee; }
        h1 { font-size: 1.2em; font-weight: normal; }
        a { color: #4ea1ff; }
    </style>
</head>
<body>
    <h1>%HEADING%</h1>
    <p>%NAME% (%SIZE%)</p>
    <p><a href="%SRC%" download="%NAME%">Download</a></p>
</body>
</html>
"#;

/// Render the watch page for one object
///
/// Known video types get a `<video>` player headed "Watch", known audio
/// types an `<audio>` player headed "Listen", and anything else a
/// download landing page headed "Download". The media source URL is
/// `{public_url}/{object_id}/{name}`, which the gateway serves as a
/// streaming media route.
pub fn watch_page(descriptor: &FileDescriptor, object_id: i64, public_url: &str) -> String {
    let name = display_name(descriptor, object_id);
    let mime = resolve_mime(descriptor, &name).to_ascii_lowercase();
    let src = format!(
        "{}/{}/{}",
        public_url.trim_end_matches('/'),
        object_id,
        name
    );

    if VIDEO_FORMATS.contains(&mime.as_str()) {
        player_page("Watch", "video", &name, &src)
    } else if AUDIO_FORMATS.contains(&mime.as_str()) {
        player_page("Listen", "audio", &name, &src)
    } else {
        let escaped = html_escape(&name);
        DOWNLOAD_PAGE
            .replace("%HEADING%", &format!("Download {}", escaped))
            .replace("%NAME%", &escaped)
            .replace("%SIZE%", &human_size(descriptor.size))
            .replace("%SRC%", &html_escape(&src))
    }
}

fn player_page(verb: &str, tag: &str, name: &str, src: &str) -> String {
    let escaped = html_escape(name);
    PLAYER_PAGE
        .replace("%HEADING%", &format!("{} {}", verb, escaped))
        .replace("%NAME%", &escaped)
        .replace("%TAG%", tag)
        .replace("%SRC%", &html_escape(src))
}

/// Pick a display name for the object, synthesizing one when the store
/// recorded none
pub fn display_name(descriptor: &FileDescriptor, object_id: i64) -> String {
    match &descriptor.file_name {
        Some(name) if !name.trim().is_empty() => name.clone(),
        _ => format!("file-{}.bin", object_id),
    }
}

/// Resolve the object's MIME type, guessing from the display name's
/// extension when the store recorded none
pub fn resolve_mime(descriptor: &FileDescriptor, display_name: &str) -> String {
    match &descriptor.mime_type {
        Some(mime) if !mime.trim().is_empty() => mime.clone(),
        _ => guess_mime(display_name).to_string(),
    }
}

/// Guess a MIME type from a file name's extension
///
/// Unknown or missing extensions fall back to `application/octet-stream`.
pub fn guess_mime(file_name: &str) -> &'static str {
    let extension = match file_name.rsplit_once('.') {
        Some((_, ext)) => ext.to_ascii_lowercase(),
        None => return "application/octet-stream",
    };
    MIME_BY_EXTENSION
        .iter()
        .find(|(ext, _)| *ext == extension)
        .map(|(_, mime)| *mime)
        .unwrap_or("application/octet-stream")
}

/// Format a byte count for the download page, e.g. `2.38 MB`
pub fn human_size(bytes: u64) -> String {
    let mut size = bytes as f64;
    let mut unit = 0;
    while size >= 1024.0 && unit < SIZE_UNITS.len() - 1 {
        size /= 1024.0;
        unit += 1;
    }
    format!("{:.2} {}", size, SIZE_UNITS[unit])
}

fn html_escape(text: &str) -> String {
    text.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
}
