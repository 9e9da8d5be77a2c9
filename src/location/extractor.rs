//! Pattern-based place extraction from user queries
//!
//! This is a best-effort heuristic: an ordered list of prepositional
//! patterns in Swedish and English, first match wins. False positives and
//! negatives are expected and acceptable; downstream geocoding simply
//! fails soft when the captured text is not a real place.

use regex::Regex;

/// Ordered match rules. List order is priority order: the first pattern
/// that matches wins, even if a later pattern would match a different span.
const PATTERNS: &[&str] = &[
    r"från\s+([A-ZÅÄÖ][a-zåäö]+(?:\s+[A-ZÅÄÖ][a-zåäö]+)*)",
    r"\bfrom\s+([A-Z][a-z]+(?:\s+[A-Z][a-z]+)*)",
    r"\bvid\s+([A-ZÅÄÖ][a-zåäö]+(?:\s+[A-ZÅÄÖ][a-zåäö]+)*)",
    r"nära\s+([A-ZÅÄÖ][a-zåäö]+(?:\s+[A-ZÅÄÖ][a-zåäö]+)*)",
    r"\bnear\s+([A-Z][a-z]+(?:\s+[A-Z][a-z]+)*)",
    r"\bi\s+([A-ZÅÄÖ][a-zåäö]+(?:\s+[A-ZÅÄÖ][a-zåäö]+)*)",
    r"\bin\s+([A-Z][a-z]+(?:\s+[A-Z][a-z]+)*)",
    r"\bat\s+([A-Z][a-z]+(?:\s+[A-Z][a-z]+)*)",
    r"([A-ZÅÄÖ][a-zåäö]+(?:\s+[A-ZÅÄÖ][a-zåäö]+)*)\s+(?:area|område|district|stadsdel)",
];

/// Interrogative/command words that the capitalization heuristic picks up
/// at sentence starts but that are never places.
const STOPLIST: &[&str] = &[
    "visa", "vilka", "vad", "hitta", "show", "which", "what", "find",
];

/// A capture ends at the first trailing conjunction: "X eller Y" and
/// "X or Y" keep only X.
const CONJUNCTIONS: &[&str] = &[" eller", " or", ","];

/// Recognizer that pulls a candidate place name out of a free-text query
pub struct LocationExtractor {
    patterns: Vec<Regex>,
}

impl LocationExtractor {
    #[must_use]
    pub fn new() -> Self {
        let patterns = PATTERNS
            .iter()
            .map(|p| Regex::new(p).expect("static extraction pattern"))
            .collect();
        Self { patterns }
    }

    /// Extract a candidate place name, or `None` if no pattern matches.
    #[must_use]
    pub fn extract(&self, query: &str) -> Option<String> {
        for pattern in &self.patterns {
            let Some(captures) = pattern.captures(query) else {
                continue;
            };
            let mut place = captures.get(1).map_or("", |m| m.as_str()).trim();

            for conjunction in CONJUNCTIONS {
                if let Some(idx) = place.find(conjunction) {
                    place = place[..idx].trim();
                }
            }

            if place.is_empty() {
                continue;
            }
            let lowered = place.to_lowercase();
            if STOPLIST.contains(&lowered.as_str()) {
                continue;
            }
            return Some(place.to_string());
        }

        None
    }
}

impl Default for LocationExtractor {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn extract(query: &str) -> Option<String> {
        LocationExtractor::new().extract(query)
    }

    #[test]
    fn test_swedish_patterns() {
        assert_eq!(
            extract("5 skyddsrum från Ångströmlaboratoriet").as_deref(),
            Some("Ångströmlaboratoriet")
        );
        assert_eq!(
            extract("Vilka är de närmaste skyddsrummen från Centralstationen?").as_deref(),
            Some("Centralstationen")
        );
        assert_eq!(
            extract("Jag är vid Uppsala Slott").as_deref(),
            Some("Uppsala Slott")
        );
        assert_eq!(extract("Skyddsrum nära Fyrishov").as_deref(), Some("Fyrishov"));
        assert_eq!(
            extract("Finns det skyddsrum i Gottsunda?").as_deref(),
            Some("Gottsunda")
        );
    }

    #[test]
    fn test_english_patterns() {
        assert_eq!(
            extract("Find 3 shelters from Central Station").as_deref(),
            Some("Central Station")
        );
        assert_eq!(
            extract("Shelters near Resecentrum").as_deref(),
            Some("Resecentrum")
        );
        assert_eq!(
            extract("Show me shelters in Centrum").as_deref(),
            Some("Centrum")
        );
    }

    #[test]
    fn test_no_location() {
        assert_eq!(extract("Hur många skyddsrum finns det?"), None);
        assert_eq!(extract("How many shelters exist?"), None);
        assert_eq!(extract("What is the largest shelter?"), None);
        assert_eq!(extract("Visa alla skyddsrum"), None);
        assert_eq!(extract("Show me all shelters"), None);
        assert_eq!(extract("5 skyddsrum"), None);
    }

    #[test]
    fn test_first_match_wins_and_conjunction_trimmed() {
        assert_eq!(
            extract("från Centralstationen eller Uppsala Slott").as_deref(),
            Some("Centralstationen")
        );
        assert_eq!(
            extract("Find shelters from Kungsgatan or Luthagen").as_deref(),
            Some("Kungsgatan")
        );
    }

    #[test]
    fn test_area_suffix_pattern() {
        assert_eq!(
            extract("skyddsrum i närheten av Gottsunda området?").as_deref(),
            Some("Gottsunda")
        );
        assert_eq!(extract("shelters in the Luthagen area"), Some("Luthagen".to_string()));
    }
}
