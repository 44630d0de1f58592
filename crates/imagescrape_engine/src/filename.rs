use std::collections::HashSet;

use sha2::{Digest, Sha256};
use url::Url;

const MAX_STEM_CHARS: usize = 60;
const FALLBACK_STEM: &str = "image";
const FALLBACK_EXTENSION: &str = "img";

const IMAGE_EXTENSIONS: &[&str] = &[
    "jpg", "jpeg", "png", "gif", "webp", "bmp", "svg", "ico", "tif", "tiff", "avif",
];

/// Windows-safe, deterministic stem for an image URL: `{last_segment}--{short_hash(url)}`.
pub fn image_file_stem(url: &str) -> String {
    let segment = Url::parse(url)
        .ok()
        .and_then(|u| {
            u.path_segments()
                .and_then(|mut segments| segments.rfind(|s| !s.is_empty()).map(str::to_string))
        })
        .unwrap_or_default();
    let without_ext = match segment.rsplit_once('.') {
        Some((stem, ext)) if is_image_extension(ext) => stem.to_string(),
        _ => segment,
    };
    format!("{}--{}", sanitize_stem(&without_ext), short_hash(url))
}

/// Lowercase image extension from the URL path, if it names one.
pub fn extension_from_url(url: &str) -> Option<String> {
    let parsed = Url::parse(url).ok()?;
    let last = parsed.path_segments()?.rfind(|s| !s.is_empty())?;
    let (_, ext) = last.rsplit_once('.')?;
    let ext = ext.to_ascii_lowercase();
    is_image_extension(&ext).then_some(ext)
}

pub fn extension_from_content_type(content_type: &str) -> Option<&'static str> {
    let ct = content_type.split(';').next()?.trim().to_ascii_lowercase();
    let ext = match ct.as_str() {
        "image/jpeg" | "image/jpg" | "image/pjpeg" => "jpg",
        "image/png" => "png",
        "image/gif" => "gif",
        "image/webp" => "webp",
        "image/bmp" => "bmp",
        "image/svg+xml" => "svg",
        "image/x-icon" | "image/vnd.microsoft.icon" => "ico",
        "image/tiff" => "tiff",
        "image/avif" => "avif",
        _ => return None,
    };
    Some(ext)
}

/// Extension for the written file: URL first, then Content-Type, then a neutral fallback.
pub fn choose_extension(url: &str, content_type: Option<&str>) -> String {
    extension_from_url(url)
        .or_else(|| {
            content_type
                .and_then(extension_from_content_type)
                .map(str::to_string)
        })
        .unwrap_or_else(|| FALLBACK_EXTENSION.to_string())
}

pub fn is_image_extension(ext: &str) -> bool {
    IMAGE_EXTENSIONS.iter().any(|known| known.eq_ignore_ascii_case(ext))
}

/// Hands out stems that are unique within one batch, case-insensitively.
/// A repeated stem gets `_2`, `_3`, ... appended.
#[derive(Debug, Default)]
pub struct FilenameAllocator {
    taken: HashSet<String>,
}

impl FilenameAllocator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn allocate(&mut self, stem: &str) -> String {
        if self.taken.insert(stem.to_lowercase()) {
            return stem.to_string();
        }
        let mut n = 2usize;
        loop {
            let candidate = format!("{stem}_{n}");
            if self.taken.insert(candidate.to_lowercase()) {
                return candidate;
            }
            n += 1;
        }
    }
}

fn sanitize_stem(input: &str) -> String {
    let cleaned: String = input
        .chars()
        .map(|c| if is_forbidden(c) { '_' } else { c })
        .collect();
    let cleaned = cleaned.trim_matches(&['_', ' ', '.'][..]);

    // Collapse multiple underscores
    let mut compacted = String::with_capacity(cleaned.len());
    let mut prev_underscore = false;
    for c in cleaned.chars() {
        if c == '_' {
            if !prev_underscore {
                compacted.push(c);
            }
            prev_underscore = true;
        } else {
            compacted.push(c);
            prev_underscore = false;
        }
    }

    let mut final_name: String = compacted.chars().take(MAX_STEM_CHARS).collect();
    if final_name.is_empty() {
        final_name = FALLBACK_STEM.to_string();
    }
    if is_reserved_windows_name(&final_name) {
        final_name.push('_');
    }
    final_name
}

fn is_forbidden(c: char) -> bool {
    matches!(c,
        '\\' | '/' | ':' | '*' | '?' | '"' | '<' | '>' | '|' | '%' | '\0'..='\u{1F}'
    )
}

fn is_reserved_windows_name(name: &str) -> bool {
    const RESERVED: &[&str] = &[
        "CON", "PRN", "AUX", "NUL", "COM1", "COM2", "COM3", "COM4", "COM5", "COM6", "COM7", "COM8",
        "COM9", "LPT1", "LPT2", "LPT3", "LPT4", "LPT5", "LPT6", "LPT7", "LPT8", "LPT9",
    ];
    RESERVED.iter().any(|r| r.eq_ignore_ascii_case(name))
}

fn short_hash(input: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(input.as_bytes());
    let digest = hasher.finalize();
    let mut hex = String::with_capacity(8);
    for byte in digest.iter().take(4) {
        use std::fmt::Write;
        let _ = write!(&mut hex, "{byte:02x}");
    }
    hex
}
