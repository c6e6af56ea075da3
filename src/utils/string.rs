//! String utility functions for safe UTF-8 text manipulation

/// Safely truncate a string at a character boundary, adding ellipsis if truncated.
///
/// Unlike naive byte slicing (`&s[..n]`), this function ensures we don't slice
/// in the middle of a multi-byte UTF-8 character, which would cause a panic.
///
/// # Arguments
/// * `s` - The string to truncate
/// * `max_chars` - Maximum number of UTF-8 characters (not bytes) to keep
///
/// # Returns
/// A new String that is either the original string (if <= max_chars) or
/// truncated at the nearest character boundary with "..." appended.
///
/// # Examples
/// ```
/// use fitscore_core::utils::string::truncate_at_char_boundary;
///
/// assert_eq!(truncate_at_char_boundary("hello world", 5), "hello...");
/// assert_eq!(truncate_at_char_boundary("hello", 10), "hello");
/// ```
pub fn truncate_at_char_boundary(s: &str, max_chars: usize) -> String {
    let char_count = s.chars().count();

    if char_count <= max_chars {
        s.to_string()
    } else {
        // Take exactly max_chars characters and append ellipsis
        let truncated: String = s.chars().take(max_chars).collect();
        format!("{}...", truncated)
    }
}
