//! Core record types shared by every stage of the resolution pipeline.

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;

use super::errors::{FailureKind, LookupError};

/// A remote service the pipeline talks to.
///
/// The three bibliographic catalogues are listed in query order, which is
/// also the order their classification codes are merged in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SourceName {
    /// Deutsche Nationalbibliothek SRU
    Dnb,
    /// Bibliotheksverbund Bayern SRU
    B3Kat,
    /// swisscovery (SLSP) SRU
    Slsp,
    /// RVK classification label API
    Rvk,
}

impl SourceName {
    /// Bibliographic sources in query order.
    pub const BIBLIOGRAPHIC: [SourceName; 3] =
        [SourceName::Dnb, SourceName::B3Kat, SourceName::Slsp];

    pub const ALL: [SourceName; 4] = [
        SourceName::Dnb,
        SourceName::B3Kat,
        SourceName::Slsp,
        SourceName::Rvk,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            SourceName::Dnb => "dnb",
            SourceName::B3Kat => "b3kat",
            SourceName::Slsp => "slsp",
            SourceName::Rvk => "rvk",
        }
    }
}

impl fmt::Display for SourceName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Label used when the label service answers without a label.
pub const UNKNOWN_LABEL: &str = "Unknown";

/// An RVK notation with its resolved label.
///
/// Equality covers both parts: the same notation with two different labels
/// is two distinct codes.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ClassificationCode {
    pub notation: String,
    pub label: Option<String>,
}

impl ClassificationCode {
    pub fn new(notation: impl Into<String>, label: impl Into<String>) -> Self {
        Self {
            notation: notation.into(),
            label: Some(label.into()),
        }
    }

    pub fn unlabelled(notation: impl Into<String>) -> Self {
        Self {
            notation: notation.into(),
            label: None,
        }
    }
}

impl fmt::Display for ClassificationCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.label {
            Some(label) => write!(f, "{} | {}", self.notation, label),
            None => f.write_str(&self.notation),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SourceFailure {
    pub kind: FailureKind,
    pub message: String,
}

impl From<&LookupError> for SourceFailure {
    fn from(e: &LookupError) -> Self {
        Self {
            kind: e.kind(),
            message: e.to_string(),
        }
    }
}

/// What one bibliographic source said about one ISBN.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SourceResult {
    pub source: SourceName,
    pub title: Option<String>,
    pub author: Option<String>,
    pub codes: Vec<ClassificationCode>,
    pub error: Option<SourceFailure>,
}

impl SourceResult {
    pub fn found(
        source: SourceName,
        title: Option<String>,
        author: Option<String>,
        codes: Vec<ClassificationCode>,
    ) -> Self {
        Self {
            source,
            title,
            author,
            codes,
            error: None,
        }
    }

    pub fn failed(source: SourceName, error: &LookupError) -> Self {
        Self {
            source,
            title: None,
            author: None,
            codes: Vec::new(),
            error: Some(error.into()),
        }
    }
}

/// Per-record outcome of querying the bibliographic sources.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", content = "sources", rename_all = "snake_case")]
pub enum SourceLookup {
    /// The input row had no usable ISBN; nothing was queried.
    NoIsbn,
    Queried(Vec<SourceResult>),
}

impl SourceLookup {
    pub fn results(&self) -> &[SourceResult] {
        match self {
            SourceLookup::NoIsbn => &[],
            SourceLookup::Queried(results) => results,
        }
    }

    pub fn result_for(&self, source: SourceName) -> Option<&SourceResult> {
        self.results().iter().find(|r| r.source == source)
    }
}

/// Non-fatal data-quality warning attached to an output record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CautionFlag {
    NoIsbn,
    NoClassificationFound,
    TitleMismatch,
}

impl CautionFlag {
    pub fn as_str(&self) -> &'static str {
        match self {
            CautionFlag::NoIsbn => "no ISBN",
            CautionFlag::NoClassificationFound => "no RVK found",
            CautionFlag::TitleMismatch => "title mismatch",
        }
    }
}

impl fmt::Display for CautionFlag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One merged view per input record. Built once by the consolidator.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ConsolidatedRecord {
    pub title: Option<String>,
    pub author: Option<String>,
    /// Deduplicated, first-seen order preserved
    pub unique_codes: Vec<ClassificationCode>,
    pub cautions: BTreeSet<CautionFlag>,
}

impl ConsolidatedRecord {
    pub fn has_caution(&self, flag: CautionFlag) -> bool {
        self.cautions.contains(&flag)
    }

    pub fn cautions_text(&self) -> String {
        self.cautions
            .iter()
            .map(CautionFlag::as_str)
            .collect::<Vec<_>>()
            .join(", ")
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CallNumber {
    pub prefix: Option<String>,
}

/// One row of the input table.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct InputRecord {
    /// Raw ISBN cell, possibly a `;`-separated list
    pub isbn_list: String,
    /// Reference title used for mismatch detection
    pub title: Option<String>,
    pub publication_date: Option<String>,
    /// Every original cell, written back unchanged on export
    pub columns: Vec<String>,
}

impl InputRecord {
    pub fn new(
        isbn_list: impl Into<String>,
        title: Option<&str>,
        publication_date: Option<&str>,
    ) -> Self {
        Self {
            isbn_list: isbn_list.into(),
            title: title.map(str::to_string),
            publication_date: publication_date.map(str::to_string),
            columns: Vec::new(),
        }
    }

    /// First non-empty entry of the ISBN list.
    pub fn isbn(&self) -> Option<&str> {
        self.isbn_list
            .split(';')
            .map(str::trim)
            .find(|isbn| !isbn.is_empty())
    }
}

/// The result row emitted for exactly one input row.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OutputRecord {
    pub isbn: Option<String>,
    pub consolidated: ConsolidatedRecord,
    pub call_number: CallNumber,
    pub lookup: SourceLookup,
}

impl OutputRecord {
    pub fn has_title_from(&self, source: SourceName) -> bool {
        self.lookup
            .result_for(source)
            .is_some_and(|r| r.title.is_some())
    }

    pub fn has_codes_from(&self, source: SourceName) -> bool {
        self.lookup
            .result_for(source)
            .is_some_and(|r| !r.codes.is_empty())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_first_non_empty_isbn_is_used() {
        let record = InputRecord::new(" ; 978-3-1; 978-3-2", None, None);
        assert_eq!(record.isbn(), Some("978-3-1"));
    }

    #[test]
    fn test_blank_isbn_list_yields_none() {
        assert_eq!(InputRecord::new("", None, None).isbn(), None);
        assert_eq!(InputRecord::new(" ;  ; ", None, None).isbn(), None);
    }

    #[test]
    fn test_codes_with_differing_labels_are_distinct() {
        let a = ClassificationCode::new("AB 123", "Label1");
        let b = ClassificationCode::new("AB 123", "Label2");
        assert_ne!(a, b);
        assert_eq!(a, ClassificationCode::new("AB 123", "Label1"));
    }

    #[test]
    fn test_cautions_text_is_ordered() {
        let mut record = ConsolidatedRecord::default();
        record.cautions.insert(CautionFlag::TitleMismatch);
        record.cautions.insert(CautionFlag::NoClassificationFound);
        assert_eq!(record.cautions_text(), "no RVK found, title mismatch");
    }
}
