//! Path resolution and string truncation helpers.

use std::path::PathBuf;

/// Get the Webpilot data directory (e.g. `~/.webpilot/`).
pub fn get_data_path() -> PathBuf {
    let home = home_dir().unwrap_or_else(|| PathBuf::from("."));
    home.join(".webpilot")
}

/// Truncate a string to `max_len` characters, adding "..." if truncated.
/// Unicode-safe.
pub fn truncate_string(s: &str, max_len: usize) -> String {
    if s.chars().count() <= max_len {
        s.to_string()
    } else {
        let truncated: String = s.chars().take(max_len.saturating_sub(3)).collect();
        format!("{}...", truncated)
    }
}

/// First `max_chars` characters of `s`, without any suffix.
pub fn take_chars(s: &str, max_chars: usize) -> &str {
    match s.char_indices().nth(max_chars) {
        Some((idx, _)) => &s[..idx],
        None => s,
    }
}

/// Expand `~` to the home directory in a path string.
pub fn expand_home(path: &str) -> PathBuf {
    let home = || home_dir().unwrap_or_else(|| PathBuf::from("."));
    if path == "~" {
        home()
    } else if let Some(rest) = path.strip_prefix("~/") {
        home().join(rest)
    } else {
        PathBuf::from(path)
    }
}

fn home_dir() -> Option<PathBuf> {
    dirs_next::home_dir()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_truncate_short_string() {
        assert_eq!(truncate_string("hello", 10), "hello");
    }

    #[test]
    fn test_truncate_long_string() {
        let result = truncate_string("hello world, this is a long string", 15);
        assert_eq!(result, "hello world,...");
    }

    #[test]
    fn test_truncate_unicode() {
        assert_eq!(truncate_string("Привет, мир!", 6), "При...");
    }

    #[test]
    fn test_take_chars() {
        assert_eq!(take_chars("abcdef", 3), "abc");
        assert_eq!(take_chars("ab", 3), "ab");
        assert_eq!(take_chars("žluťoučký", 4), "žluť");
        assert_eq!(take_chars("", 0), "");
    }

    #[test]
    fn test_expand_home_tilde() {
        let expanded = expand_home("~/profiles/chrome");
        assert!(!expanded.starts_with("~"));
        assert!(expanded.ends_with("profiles/chrome"));
    }

    #[test]
    fn test_expand_home_bare_tilde() {
        assert!(!expand_home("~").to_string_lossy().contains('~'));
    }

    #[test]
    fn test_expand_home_absolute() {
        assert_eq!(expand_home("/opt/chrome"), PathBuf::from("/opt/chrome"));
    }

    #[test]
    fn test_data_path_ends_with_webpilot() {
        assert!(get_data_path().ends_with(".webpilot"));
    }
}
