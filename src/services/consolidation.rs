//! Metadata consolidator
//!
//! Merges the per-source answers for one record into a single view.

use std::collections::HashSet;

use crate::domain::{
    CautionFlag, ClassificationCode, ConsolidatedRecord, SourceLookup, SourceName, SourceResult,
};

/// Title preference: B3Kat, then swisscovery, then DNB. This intentionally
/// differs from the query order; keep the two separate.
pub const TITLE_PRIORITY: [SourceName; 3] = [SourceName::B3Kat, SourceName::Slsp, SourceName::Dnb];

/// Author preference; DNB authors are never used.
pub const AUTHOR_PRIORITY: [SourceName; 2] = [SourceName::B3Kat, SourceName::Slsp];

/// Codes are merged in query order, so the first code of the first source wins ties.
pub const CODE_ORDER: [SourceName; 3] = SourceName::BIBLIOGRAPHIC;

pub fn consolidate(lookup: &SourceLookup, reference_title: Option<&str>) -> ConsolidatedRecord {
    let results = match lookup {
        SourceLookup::NoIsbn => {
            return ConsolidatedRecord {
                cautions: [CautionFlag::NoIsbn].into_iter().collect(),
                ..Default::default()
            };
        }
        SourceLookup::Queried(results) => results,
    };

    let title = first_present(results, &TITLE_PRIORITY, |r| r.title.as_deref());
    let author = first_present(results, &AUTHOR_PRIORITY, |r| r.author.as_deref());

    let unique_codes = dedup_codes(
        CODE_ORDER
            .iter()
            .filter_map(|source| results.iter().find(|r| r.source == *source))
            .flat_map(|r| r.codes.iter().cloned()),
    );

    let mut record = ConsolidatedRecord {
        title,
        author,
        unique_codes,
        ..Default::default()
    };

    if record.unique_codes.is_empty() {
        record.cautions.insert(CautionFlag::NoClassificationFound);
    }
    if let Some(title) = &record.title
        && reference_title != Some(title.as_str())
    {
        record.cautions.insert(CautionFlag::TitleMismatch);
    }

    record
}

/// Ordered-unique set of codes; the first occurrence of each
/// (notation, label) pair is kept.
pub fn dedup_codes(codes: impl IntoIterator<Item = ClassificationCode>) -> Vec<ClassificationCode> {
    let mut seen = HashSet::new();
    codes
        .into_iter()
        .filter(|code| seen.insert(code.clone()))
        .collect()
}

fn first_present<'a>(
    results: &'a [SourceResult],
    priority: &[SourceName],
    field: impl Fn(&'a SourceResult) -> Option<&'a str>,
) -> Option<String> {
    priority
        .iter()
        .filter_map(|source| results.iter().find(|r| r.source == *source))
        .find_map(&field)
        .map(str::to_string)
}
