// Classification Helpers

use once_cell::sync::Lazy;
use regex::Regex;

use crate::domain::{CallNumber, ConsolidatedRecord};

/// Value of MARC 084 $2 marking an RVK notation
pub const RVK_SCHEME: &str = "rvk";

/// Placeholder used when the publication date carries no usable year
pub const UNKNOWN_YEAR: &str = "YYYY";

static YEAR_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(18|19|20)\d\d").expect("year pattern is valid"));

pub fn validate_rvk(notation: &str) -> bool {
    // Two capital letters, a space, then digits (e.g. "SU 680", "LB 15080")
    let mut parts = notation.trim().splitn(2, ' ');
    let letters = parts.next().unwrap_or_default();
    let digits = parts.next().unwrap_or_default().trim();
    !letters.is_empty()
        && letters.len() <= 2
        && letters.chars().all(|c| c.is_ascii_uppercase())
        && !digits.is_empty()
        && digits.chars().all(|c| c.is_ascii_digit())
}

/// First year between 1800 and 2099 appearing anywhere in free-text imprint data.
pub fn extract_year(publication_date: &str) -> Option<&str> {
    YEAR_PATTERN.find(publication_date).map(|m| m.as_str())
}

/// `"{notation without spaces} {year}"` from the first consolidated code.
pub fn synthesize_call_number(
    record: &ConsolidatedRecord,
    publication_date: Option<&str>,
) -> CallNumber {
    let Some(code) = record.unique_codes.first() else {
        return CallNumber { prefix: None };
    };

    let notation: String = code.notation.chars().filter(|c| !c.is_whitespace()).collect();
    let year = publication_date
        .and_then(extract_year)
        .unwrap_or(UNKNOWN_YEAR);

    CallNumber {
        prefix: Some(format!("{} {}", notation, year)),
    }
}
