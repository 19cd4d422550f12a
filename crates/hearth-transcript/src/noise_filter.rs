//! Status-line noise filtering for pane-capture candidates (§4.2).
//!
//! The REPL's screen often carries chrome below the actual response — token
//! counters, context-usage bars, a trailing prompt line. These patterns must
//! be stripped before a pane-capture candidate is fingerprinted, or every
//! capture would fingerprint differently purely due to a ticking counter.

use regex::Regex;

pub struct NoiseFilter {
    patterns: Vec<Regex>,
}

impl NoiseFilter {
    pub fn new(patterns: &[String]) -> Result<Self, regex::Error> {
        let compiled = patterns
            .iter()
            .map(|p| Regex::new(p))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self { patterns: compiled })
    }

    pub fn default_patterns() -> Self {
        let defaults = [
            r"(?i)^\s*\d+\s*(tokens?|k)\s*(used|remaining)?\s*$",
            r"(?i)^\s*context:\s*\d+%.*$",
            r"^\s*[─━=_-]{4,}\s*$",
            r"(?i)^\s*\[\d+/\d+\]\s*$",
        ];
        Self::new(&defaults.iter().map(|s| s.to_string()).collect::<Vec<_>>())
            .expect("default status-line patterns are valid regexes")
    }

    /// Strip every line matching a configured pattern, then trim. Returns
    /// `None` if nothing remains after filtering (pure chrome).
    pub fn clean(&self, raw: &str) -> Option<String> {
        let kept: Vec<&str> = raw
            .lines()
            .filter(|line| !self.patterns.iter().any(|p| p.is_match(line)))
            .collect();

        let joined = kept.join("\n");
        let trimmed = joined.trim();
        if trimmed.is_empty() {
            None
        } else {
            Some(trimmed.to_string())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strips_token_counter_line() {
        let filter = NoiseFilter::default_patterns();
        let raw = "the actual response\n1234 tokens used\n";
        assert_eq!(filter.clean(raw), Some("the actual response".to_string()));
    }

    #[test]
    fn pure_chrome_yields_none() {
        let filter = NoiseFilter::default_patterns();
        let raw = "context: 42%\n1000 tokens remaining\n";
        assert_eq!(filter.clean(raw), None);
    }

    #[test]
    fn pane_capture_safety_property() {
        // P4: status-line pattern followed by assistant tail survives cleanly.
        let filter = NoiseFilter::default_patterns();
        let raw = "context: 55%\nhere is the assistant tail";
        assert_eq!(filter.clean(raw), Some("here is the assistant tail".to_string()));
    }
}
