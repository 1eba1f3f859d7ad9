/// Lowercased extension of the last path component, with a leading dot
/// (e.g. ".rb"). `None` when the file name has no usable extension.
///
/// An extension is usable if it:
/// - Is non-empty
/// - Is at most 10 characters long
/// - Belongs to the file name, not a parent directory
pub fn file_extension(path: &str) -> Option<String> {
    let file_name = path.rsplit('/').next().unwrap_or(path);
    match file_name.rsplit_once('.') {
        Some((_, ext)) if !ext.is_empty() && ext.len() <= 10 => {
            Some(format!(".{}", ext.to_ascii_lowercase()))
        }
        _ => None,
    }
}

/// Normalize a configured extension to the form returned by [`file_extension`]
pub fn normalize_extension(ext: &str) -> String {
    let ext = ext.trim().to_ascii_lowercase();
    if ext.starts_with('.') { ext } else { format!(".{}", ext) }
}
