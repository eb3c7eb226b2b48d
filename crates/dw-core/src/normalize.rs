//! Application identity normalization.
//!
//! Raw window titles and process names are noisy: the same application shows
//! up as `chrome.exe`, `C:\...\chrome.exe`, or `Google Chrome - New Tab`
//! depending on the capture path. Aggregation merges on the normalized key
//! produced here; the display label is derived separately and chosen once
//! per key by the aggregator.

/// Maximum length of a display label, in characters.
pub const MAX_LABEL_LEN: usize = 80;

/// Title separator substrings, checked in order.
const SEPARATORS: [&str; 4] = [" - ", " | ", " — ", " :: "];

/// Substring aliases collapsing process-name variants to one canonical key.
///
/// Matched by containment in declaration order; broader patterns must come
/// after the specific ones that contain them.
const ALIASES: [(&str, &str); 26] = [
    ("chrome", "chrome"),
    ("msedge", "edge"),
    ("microsoft edge", "edge"),
    ("brave", "brave"),
    ("firefox", "firefox"),
    ("opera", "opera"),
    ("code", "vscode"),
    ("visual studio code", "vscode"),
    ("winword", "word"),
    ("word", "word"),
    ("excel", "excel"),
    ("powerpnt", "powerpoint"),
    ("powerpoint", "powerpoint"),
    ("outlook", "outlook"),
    ("teams", "teams"),
    ("slack", "slack"),
    ("discord", "discord"),
    ("explorer", "explorer"),
    ("notepad", "notepad"),
    ("notepad++", "notepad++"),
    ("pycharm", "pycharm"),
    ("idea64", "intellij"),
    ("studio64", "android-studio"),
    ("zoom", "zoom"),
    ("whatsapp", "whatsapp"),
    ("telegram", "telegram"),
];

/// Derives the canonical application key for a raw `(title, process)` pair.
///
/// The process name is preferred over the window title when both are
/// present. Missing or empty identity maps to `"unknown"`.
#[must_use]
pub fn normalize_key(title: Option<&str>, process: Option<&str>) -> String {
    let Some(raw) = coalesce(process, title) else {
        return "unknown".to_string();
    };

    let cut = cut_separator(raw).replace('\u{200b}', "");
    let mut name = cut.trim().to_lowercase();
    if let Some(stripped) = name.strip_suffix(".exe") {
        name = stripped.to_string();
    }
    let base = name.rsplit(['\\', '/']).next().unwrap_or(&name);

    for (pattern, key) in ALIASES {
        if base.contains(pattern) {
            return key.to_string();
        }
    }

    base.split_whitespace()
        .next()
        .map_or_else(|| "unknown".to_string(), str::to_string)
}

/// Derives a human-readable label from a raw window title or process name.
///
/// Uses the same separator set as [`normalize_key`] but prefers the shortest
/// path-free segment, which is usually the app name rather than the document
/// title. Truncated to [`MAX_LABEL_LEN`] characters; missing input maps to
/// `"Unknown"`.
#[must_use]
pub fn display_label(raw: Option<&str>) -> String {
    let Some(raw) = raw.map(str::trim).filter(|s| !s.is_empty()) else {
        return "Unknown".to_string();
    };

    let mut label = raw;
    for sep in SEPARATORS {
        if raw.contains(sep) {
            label = raw
                .split(sep)
                .filter(|part| !part.contains('/') && !part.contains('\\'))
                .min_by_key(|part| part.len())
                .unwrap_or(raw);
            break;
        }
    }

    label.chars().take(MAX_LABEL_LEN).collect()
}

fn coalesce<'a>(process: Option<&'a str>, title: Option<&'a str>) -> Option<&'a str> {
    process
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .or_else(|| title.map(str::trim).filter(|s| !s.is_empty()))
}

/// Cuts the raw string at the first separator found.
///
/// The side under 8 characters is assumed to be the trailing app-name suffix
/// and kept; otherwise the left side is kept, since most window titles put
/// the document name first. The heuristic occasionally picks the wrong side
/// for unusual title formats; that is accepted best-effort behavior.
fn cut_separator(raw: &str) -> &str {
    for sep in SEPARATORS {
        if raw.contains(sep) {
            let last = raw.rsplit(sep).next().unwrap_or(raw);
            let first = raw.split(sep).next().unwrap_or(raw);
            return if last.chars().count() < 8 { last } else { first };
        }
    }
    raw
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn process_variants_collapse_to_one_key() {
        assert_eq!(
            normalize_key(Some("chrome.exe"), None),
            normalize_key(Some("Google Chrome - New Tab"), Some("chrome.exe")),
        );
        assert_eq!(normalize_key(Some("chrome.exe"), None), "chrome");
    }

    #[test]
    fn paths_and_suffixes_are_stripped() {
        assert_eq!(
            normalize_key(None, Some(r"C:\Program Files\Mozilla\firefox.exe")),
            "firefox"
        );
        assert_eq!(normalize_key(None, Some("/usr/bin/telegram")), "telegram");
        assert_eq!(normalize_key(None, Some("WINWORD.EXE")), "word");
    }

    #[test]
    fn short_suffix_after_separator_wins() {
        // "Word" is under 8 chars, so the trailing side is kept.
        assert_eq!(normalize_key(Some("Document.docx — Word"), None), "word");
        // The long right side loses to the left side.
        assert_eq!(
            normalize_key(Some("main.rs :: myproject-editor"), None),
            "main.rs"
        );
    }

    #[test]
    fn unmatched_names_fall_back_to_first_token() {
        assert_eq!(normalize_key(Some("gimp image editor"), None), "gimp");
    }

    #[test]
    fn missing_identity_is_unknown() {
        assert_eq!(normalize_key(None, None), "unknown");
        assert_eq!(normalize_key(Some(""), Some("   ")), "unknown");
        assert_eq!(display_label(None), "Unknown");
        assert_eq!(display_label(Some("  ")), "Unknown");
    }

    #[test]
    fn display_prefers_shortest_path_free_segment() {
        assert_eq!(display_label(Some("Document.docx — Word")), "Word");
        assert_eq!(
            display_label(Some("src/main.rs - myproject - Code")),
            "Code"
        );
        assert_eq!(display_label(Some("plain title")), "plain title");
    }

    #[test]
    fn display_truncates_long_titles() {
        let long = "x".repeat(200);
        assert_eq!(display_label(Some(&long)).chars().count(), MAX_LABEL_LEN);
    }
}
