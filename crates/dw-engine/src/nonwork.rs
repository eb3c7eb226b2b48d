//! Non-work context classification.

use regex::{Regex, RegexBuilder};

/// Matches window titles and process names against non-work patterns.
///
/// A whitelist entry matching anywhere in the text exempts it regardless of
/// the patterns.
#[derive(Debug)]
pub struct NonWorkMatcher {
    patterns: Vec<Regex>,
    whitelist: Vec<String>,
}

impl NonWorkMatcher {
    /// Compiles the given patterns case-insensitively.
    pub fn new(patterns: &[String], whitelist: &[String]) -> Result<Self, regex::Error> {
        let patterns = patterns
            .iter()
            .map(|pattern| RegexBuilder::new(pattern).case_insensitive(true).build())
            .collect::<Result<Vec<_>, _>>()?;
        let whitelist = whitelist.iter().map(|s| s.to_lowercase()).collect();
        Ok(Self {
            patterns,
            whitelist,
        })
    }

    /// Whether the text looks like non-work content.
    #[must_use]
    pub fn is_non_work(&self, text: &str) -> bool {
        if text.is_empty() {
            return false;
        }
        let lower = text.to_lowercase();
        if self.whitelist.iter().any(|entry| lower.contains(entry)) {
            return false;
        }
        self.patterns.iter().any(|pattern| pattern.is_match(text))
    }
}

/// The default pattern set: streaming/social domains plus bare keywords to
/// catch titles without URLs.
#[must_use]
pub fn default_patterns() -> Vec<String> {
    [
        // domains
        r"facebook\.com",
        r"instagram\.com",
        r"twitter\.com|x\.com",
        r"youtube\.com",
        r"netflix\.com",
        r"tiktok\.com",
        r"primevideo\.com",
        r"hotstar\.com",
        r"spotify\.com",
        r"gaana\.com",
        r"wynk\.in",
        // generic keywords
        r"\byoutube\b",
        r"\bfacebook\b",
        r"\binstagram\b",
        r"\btwitter\b",
        r"\bx\b",
        r"\bnetflix\b",
        r"\btiktok\b",
        r"\bprime video\b",
        r"\bhotstar\b",
        r"\bspotify\b",
        r"\bsoundcloud\b",
    ]
    .into_iter()
    .map(String::from)
    .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn matcher(whitelist: &[&str]) -> NonWorkMatcher {
        let whitelist: Vec<String> = whitelist.iter().map(|s| (*s).to_string()).collect();
        NonWorkMatcher::new(&default_patterns(), &whitelist).expect("default patterns compile")
    }

    #[test]
    fn default_patterns_flag_streaming_titles() {
        let m = matcher(&[]);
        assert!(m.is_non_work("Lo-fi beats - YouTube - Google Chrome"));
        assert!(m.is_non_work("netflix.com/browse"));
        assert!(!m.is_non_work("main.rs - myproject - Code"));
        assert!(!m.is_non_work(""));
    }

    #[test]
    fn whitelist_overrides_patterns() {
        let m = matcher(&["conference talk"]);
        assert!(!m.is_non_work("Conference Talk - YouTube"));
        assert!(m.is_non_work("Cat videos - YouTube"));
    }

    #[test]
    fn invalid_pattern_is_rejected() {
        let result = NonWorkMatcher::new(&["(unclosed".to_string()], &[]);
        assert!(result.is_err());
    }
}
