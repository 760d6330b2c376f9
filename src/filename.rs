//! Deterministic destination naming.
//!
//! Every saved file is named `{lecture:03}_{item:03}_{original-name}` so a
//! rerun maps each remote item to the same path and can skip existing
//! files. Names coming off scraped attributes are sanitized before they
//! touch the filesystem.

use std::path::{Path, PathBuf};

/// Replaces filesystem-hostile characters in a single path component.
///
/// Path separators, reserved punctuation, and control characters become
/// underscores; leading and trailing whitespace is trimmed. An input that
/// sanitizes to nothing falls back to `unnamed` so a destination path is
/// always produced.
#[must_use]
pub fn sanitize_filename(name: &str) -> String {
    let sanitized: String = name
        .trim()
        .chars()
        .map(|c| match c {
            '/' | '\\' | ':' | '*' | '?' | '"' | '<' | '>' | '|' => '_',
            c if c.is_control() => '_',
            c => c,
        })
        .collect();
    if sanitized.is_empty() {
        "unnamed".to_string()
    } else {
        sanitized
    }
}

/// Joins zero-padded 3-digit indices with `_`, keeping a trailing `_` as
/// the separator before the item name. `[1, 12]` becomes `001_012_`.
#[must_use]
pub fn file_prefix(indices: &[usize]) -> String {
    let mut prefix = String::new();
    for index in indices {
        prefix.push_str(&format!("{index:03}_"));
    }
    prefix
}

/// Builds the destination path for one downloadable item inside a course
/// directory: `{dir}/{lecture:03}_{item:03}_{sanitized-name}`.
#[must_use]
pub fn destination_path(dir: &Path, lecture: usize, item: usize, name: &str) -> PathBuf {
    let filename = format!(
        "{}{}",
        file_prefix(&[lecture, item]),
        sanitize_filename(name)
    );
    dir.join(filename)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sanitize_replaces_separators_and_reserved() {
        assert_eq!(sanitize_filename("a/b\\c:d*e?f\"g<h>i|j"), "a_b_c_d_e_f_g_h_i_j");
    }

    #[test]
    fn test_sanitize_replaces_control_characters() {
        assert_eq!(sanitize_filename("a\tb\nc"), "a_b_c");
    }

    #[test]
    fn test_sanitize_trims_whitespace() {
        assert_eq!(sanitize_filename("  worksheet.pdf  "), "worksheet.pdf");
    }

    #[test]
    fn test_sanitize_empty_falls_back() {
        assert_eq!(sanitize_filename(""), "unnamed");
        assert_eq!(sanitize_filename("   "), "unnamed");
    }

    #[test]
    fn test_sanitize_keeps_unicode() {
        assert_eq!(sanitize_filename("1강 자료.pdf"), "1강 자료.pdf");
    }

    #[test]
    fn test_file_prefix_zero_pads_and_joins() {
        assert_eq!(file_prefix(&[0]), "000_");
        assert_eq!(file_prefix(&[1, 12]), "001_012_");
        assert_eq!(file_prefix(&[123, 4]), "123_004_");
    }

    #[test]
    fn test_file_prefix_empty() {
        assert_eq!(file_prefix(&[]), "");
    }

    #[test]
    fn test_file_prefix_does_not_truncate_wide_indices() {
        assert_eq!(file_prefix(&[1000]), "1000_");
    }

    #[test]
    fn test_destination_path_is_deterministic() {
        let dir = Path::new("/out/My Course");
        let first = destination_path(dir, 2, 5, "Intro Video.mp4");
        let second = destination_path(dir, 2, 5, "Intro Video.mp4");
        assert_eq!(first, second);
        assert_eq!(first, Path::new("/out/My Course/002_005_Intro Video.mp4"));
    }
}
