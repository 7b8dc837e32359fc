use regex::Regex;
use std::sync::OnceLock;

/// EAN-13, UPC-A and EAN-8, in the order they are tried.
const BARCODE_PATTERNS: [&str; 3] = [r"\b\d{13}\b", r"\b\d{12}\b", r"\b\d{8}\b"];

fn patterns() -> &'static [Regex] {
    static PATTERNS: OnceLock<Vec<Regex>> = OnceLock::new();
    PATTERNS.get_or_init(|| {
        BARCODE_PATTERNS
            .iter()
            .filter_map(|p| Regex::new(p).ok())
            .collect()
    })
}

/// Finds a barcode number in recognized text. Longer formats win over
/// shorter ones regardless of where they appear.
pub fn extract_barcode_from_text(text: &str) -> Option<String> {
    patterns()
        .iter()
        .find_map(|re| re.find(text))
        .map(|m| m.as_str().to_string())
}
