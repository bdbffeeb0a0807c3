//! Extension-based MIME guessing and MIME classification.

pub const DIRECTORY: &str = "inode/directory";
pub const SYMLINK: &str = "inode/symlink";
pub const UNKNOWN: &str = "application/octet-stream";

// ---------------------------------------------------------------------------
// Extension tables
// ---------------------------------------------------------------------------

const TEXT_TYPES: &[(&str, &str)] = &[
    ("txt", "text/plain"),
    ("log", "text/plain"),
    ("md", "text/markdown"),
    ("markdown", "text/markdown"),
    ("rst", "text/x-rst"),
    ("csv", "text/csv"),
    ("tsv", "text/tab-separated-values"),
    ("html", "text/html"),
    ("htm", "text/html"),
    ("css", "text/css"),
    ("xml", "application/xml"),
    ("json", "application/json"),
    ("js", "text/javascript"),
    ("mjs", "text/javascript"),
    ("ts", "text/x-typescript"),
    ("yaml", "application/yaml"),
    ("yml", "application/yaml"),
    ("toml", "application/toml"),
    ("ini", "text/plain"),
    ("cfg", "text/plain"),
    ("rs", "text/x-rust"),
    ("py", "text/x-python"),
    ("go", "text/x-go"),
    ("c", "text/x-c"),
    ("h", "text/x-c"),
    ("cc", "text/x-c++"),
    ("cpp", "text/x-c++"),
    ("hpp", "text/x-c++"),
    ("java", "text/x-java"),
    ("rb", "text/x-ruby"),
    ("sh", "application/x-sh"),
    ("sql", "application/sql"),
];

const IMAGE_TYPES: &[(&str, &str)] = &[
    ("jpg", "image/jpeg"),
    ("jpeg", "image/jpeg"),
    ("png", "image/png"),
    ("gif", "image/gif"),
    ("bmp", "image/bmp"),
    ("tif", "image/tiff"),
    ("tiff", "image/tiff"),
    ("webp", "image/webp"),
    ("ico", "image/vnd.microsoft.icon"),
    ("svg", "image/svg+xml"),
    ("heic", "image/heic"),
    ("heif", "image/heif"),
    ("psd", "image/vnd.adobe.photoshop"),
];

const AUDIO_TYPES: &[(&str, &str)] = &[
    ("mp3", "audio/mpeg"),
    ("wav", "audio/wav"),
    ("flac", "audio/flac"),
    ("aac", "audio/aac"),
    ("ogg", "audio/ogg"),
    ("oga", "audio/ogg"),
    ("opus", "audio/opus"),
    ("m4a", "audio/mp4"),
    ("wma", "audio/x-ms-wma"),
    ("aiff", "audio/aiff"),
    ("mid", "audio/midi"),
    ("midi", "audio/midi"),
];

const VIDEO_TYPES: &[(&str, &str)] = &[
    ("mp4", "video/mp4"),
    ("m4v", "video/mp4"),
    ("mov", "video/quicktime"),
    ("avi", "video/x-msvideo"),
    ("mkv", "video/x-matroska"),
    ("wmv", "video/x-ms-wmv"),
    ("webm", "video/webm"),
    ("flv", "video/x-flv"),
    ("mpg", "video/mpeg"),
    ("mpeg", "video/mpeg"),
    ("3gp", "video/3gpp"),
];

const ARCHIVE_TYPES: &[(&str, &str)] = &[
    ("zip", "application/zip"),
    ("jar", "application/java-archive"),
    ("tar", "application/x-tar"),
    ("gz", "application/gzip"),
    ("tgz", "application/gzip"),
    ("bz2", "application/x-bzip2"),
    ("xz", "application/x-xz"),
    ("zst", "application/zstd"),
    ("7z", "application/x-7z-compressed"),
    ("rar", "application/vnd.rar"),
    ("iso", "application/x-iso9660-image"),
    ("dmg", "application/x-apple-diskimage"),
];

const DOCUMENT_TYPES: &[(&str, &str)] = &[
    ("pdf", "application/pdf"),
    ("doc", "application/msword"),
    (
        "docx",
        "application/vnd.openxmlformats-officedocument.wordprocessingml.document",
    ),
    ("xls", "application/vnd.ms-excel"),
    (
        "xlsx",
        "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet",
    ),
    ("ppt", "application/vnd.ms-powerpoint"),
    (
        "pptx",
        "application/vnd.openxmlformats-officedocument.presentationml.presentation",
    ),
    ("odt", "application/vnd.oasis.opendocument.text"),
    ("rtf", "application/rtf"),
    ("epub", "application/epub+zip"),
    ("wasm", "application/wasm"),
];

const ALL_TYPES: &[&[(&str, &str)]] = &[
    TEXT_TYPES,
    IMAGE_TYPES,
    AUDIO_TYPES,
    VIDEO_TYPES,
    ARCHIVE_TYPES,
    DOCUMENT_TYPES,
];

/// Archive MIME types that do not share a common prefix
const ARCHIVE_MIMES: &[&str] = &[
    "application/zip",
    "application/java-archive",
    "application/x-tar",
    "application/gzip",
    "application/x-gzip",
    "application/x-bzip2",
    "application/x-xz",
    "application/zstd",
    "application/x-7z-compressed",
    "application/vnd.rar",
    "application/x-rar-compressed",
    "application/x-iso9660-image",
    "application/x-apple-diskimage",
];

/// Non-`text/*` MIME types whose content is still text
const TEXTUAL_MIMES: &[&str] = &[
    "application/json",
    "application/xml",
    "application/yaml",
    "application/toml",
    "application/javascript",
    "application/x-sh",
    "application/sql",
];

// ---------------------------------------------------------------------------
// Lookup and classification
// ---------------------------------------------------------------------------

/// Guesses a MIME type from a file extension (without the dot).
pub fn from_extension(extension: &str) -> &'static str {
    let extension = extension.to_ascii_lowercase();
    ALL_TYPES
        .iter()
        .flat_map(|table| table.iter())
        .find(|(ext, _)| *ext == extension)
        .map(|(_, mime)| *mime)
        .unwrap_or(UNKNOWN)
}

fn essence(mime: &str) -> String {
    mime.split(';')
        .next()
        .unwrap_or_default()
        .trim()
        .to_ascii_lowercase()
}

pub fn is_text(mime: &str) -> bool {
    let mime = essence(mime);
    mime.starts_with("text/") || TEXTUAL_MIMES.contains(&mime.as_str())
}

pub fn is_image(mime: &str) -> bool {
    essence(mime).starts_with("image/")
}

pub fn is_pdf(mime: &str) -> bool {
    essence(mime) == "application/pdf"
}

pub fn is_audio(mime: &str) -> bool {
    essence(mime).starts_with("audio/")
}

pub fn is_video(mime: &str) -> bool {
    essence(mime).starts_with("video/")
}

pub fn is_archive(mime: &str) -> bool {
    ARCHIVE_MIMES.contains(&essence(mime).as_str())
}
