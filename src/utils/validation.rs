use std::path::Path;

const MAX_FILENAME_BYTES: usize = 200;
const FALLBACK_FILENAME: &str = "upload";

/// Reduces a client-supplied filename to something safe to embed in a temp file name.
///
/// Only the final path component survives, reserved characters become `_`,
/// leading dots are dropped and the result is capped on a char boundary.
pub fn sanitize_filename(filename: &str) -> String {
    // Client paths may use either separator regardless of our platform
    let last = filename.rsplit(['/', '\\']).next().unwrap_or("");
    let name = Path::new(last)
        .file_name()
        .and_then(|n| n.to_str())
        .unwrap_or("");

    if filename.contains("..") || filename.contains('/') || filename.contains('\\') {
        tracing::warn!("Path components stripped from upload filename: {}", filename);
    }

    let sanitized: String = name
        .chars()
        .map(|c| {
            if c.is_control()
                || c == '/'
                || c == '\\'
                || c == ':'
                || c == '*'
                || c == '?'
                || c == '"'
                || c == '<'
                || c == '>'
                || c == '|'
                || c == ';'
            {
                '_'
            } else {
                c
            }
        })
        .collect();

    let sanitized = sanitized.trim().trim_start_matches('.');

    let sanitized = if sanitized.len() > MAX_FILENAME_BYTES {
        let mut end = MAX_FILENAME_BYTES;
        while !sanitized.is_char_boundary(end) {
            end -= 1;
        }
        &sanitized[..end]
    } else {
        sanitized
    };

    if sanitized.is_empty() {
        FALLBACK_FILENAME.to_string()
    } else {
        sanitized.to_string()
    }
}

/// Builds a `Content-Disposition: attachment` value with an ASCII fallback and an RFC 5987 name.
pub fn attachment_disposition(filename: &str) -> String {
    use percent_encoding::{NON_ALPHANUMERIC, utf8_percent_encode};

    let ascii_filename = filename
        .chars()
        .filter(|c| c.is_ascii() && !c.is_control() && *c != '"' && *c != '\\' && *c != ';')
        .take(64)
        .collect::<String>();

    if ascii_filename == filename {
        return format!("attachment; filename=\"{}\"", filename);
    }

    let fallback_filename = if ascii_filename.is_empty() {
        "output.pdf"
    } else {
        &ascii_filename
    };
    let encoded_filename = utf8_percent_encode(filename, NON_ALPHANUMERIC).to_string();

    format!(
        "attachment; filename=\"{}\"; filename*=UTF-8''{}",
        fallback_filename, encoded_filename
    )
}
