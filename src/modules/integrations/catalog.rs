//! Static registry of the services the resolver queries.
//!
//! Templates carry a single `{isbn}` or `{notation}` placeholder. A new SRU
//! source only needs a row here as long as it answers in MARCXML.

use std::collections::HashMap;

use crate::domain::SourceName;

const DNB_TEMPLATE: &str = "https://services.dnb.de/sru/dnb?version=1.1&operation=searchRetrieve&query=marcxml.isbn={isbn}&recordSchema=MARC21-xml&maximumRecords=1";
const B3KAT_TEMPLATE: &str = "http://bvbr.bib-bvb.de:5661/bvb01sru?version=1.1&recordSchema=marcxml&operation=searchRetrieve&query=marcxml.isbn={isbn}&maximumRecords=1";
const SLSP_TEMPLATE: &str = "https://swisscovery.slsp.ch/view/sru/41SLSP_NETWORK?version=1.2&operation=searchRetrieve&recordSchema=marcxml&query=alma.isbn={isbn}&maximumRecords=1";
const RVK_TEMPLATE: &str = "https://rvk.uni-regensburg.de/api_neu/json/node/{notation}?json";

const ISBN_PLACEHOLDER: &str = "{isbn}";
const NOTATION_PLACEHOLDER: &str = "{notation}";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResponseFormat {
    /// SRU searchRetrieve response wrapping MARCXML records
    MarcXml,
    /// RVK node JSON
    RvkJson,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Endpoint {
    pub template: String,
    pub format: ResponseFormat,
}

impl Endpoint {
    pub fn new(template: impl Into<String>, format: ResponseFormat) -> Self {
        Self {
            template: template.into(),
            format,
        }
    }

    pub fn resolve_isbn(&self, isbn: &str) -> String {
        self.template
            .replace(ISBN_PLACEHOLDER, &urlencoding::encode(isbn))
    }

    /// Spaces in the notation become `+`, everything else is percent-encoded.
    pub fn resolve_notation(&self, notation: &str) -> String {
        let encoded = notation
            .split_whitespace()
            .map(|part| urlencoding::encode(part).into_owned())
            .collect::<Vec<_>>()
            .join("+");
        self.template.replace(NOTATION_PLACEHOLDER, &encoded)
    }
}

#[derive(Debug, Clone)]
pub struct EndpointCatalog {
    endpoints: HashMap<SourceName, Endpoint>,
}

impl Default for EndpointCatalog {
    fn default() -> Self {
        Self::empty()
            .with(SourceName::Dnb, Endpoint::new(DNB_TEMPLATE, ResponseFormat::MarcXml))
            .with(SourceName::B3Kat, Endpoint::new(B3KAT_TEMPLATE, ResponseFormat::MarcXml))
            .with(SourceName::Slsp, Endpoint::new(SLSP_TEMPLATE, ResponseFormat::MarcXml))
            .with(SourceName::Rvk, Endpoint::new(RVK_TEMPLATE, ResponseFormat::RvkJson))
    }
}

impl EndpointCatalog {
    pub fn empty() -> Self {
        Self {
            endpoints: HashMap::new(),
        }
    }

    /// Register or replace the endpoint of a source.
    pub fn with(mut self, source: SourceName, endpoint: Endpoint) -> Self {
        self.endpoints.insert(source, endpoint);
        self
    }

    /// Point every source at `base_url`, keeping the public query strings.
    /// Paths become `/dnb`, `/b3kat`, `/slsp` and `/rvk/{notation}`.
    pub fn rooted_at(base_url: &str) -> Self {
        let base = base_url.trim_end_matches('/');
        let sru = |name: &str| {
            Endpoint::new(
                format!(
                    "{}/{}?operation=searchRetrieve&query=isbn={{isbn}}&maximumRecords=1",
                    base, name
                ),
                ResponseFormat::MarcXml,
            )
        };
        Self::empty()
            .with(SourceName::Dnb, sru("dnb"))
            .with(SourceName::B3Kat, sru("b3kat"))
            .with(SourceName::Slsp, sru("slsp"))
            .with(
                SourceName::Rvk,
                Endpoint::new(format!("{}/rvk/{{notation}}?json", base), ResponseFormat::RvkJson),
            )
    }

    pub fn get(&self, source: SourceName) -> Option<&Endpoint> {
        self.endpoints.get(&source)
    }

    /// Configured bibliographic sources in query order.
    pub fn bibliographic_sources(&self) -> Vec<SourceName> {
        SourceName::BIBLIOGRAPHIC
            .into_iter()
            .filter(|s| self.endpoints.contains_key(s))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_isbn_substitution() {
        let catalog = EndpointCatalog::default();
        let url = catalog
            .get(SourceName::Dnb)
            .unwrap()
            .resolve_isbn("978-3-16-148410-0");
        assert!(url.contains("query=marcxml.isbn=978-3-16-148410-0&"));
        assert!(url.ends_with("maximumRecords=1"));
    }

    #[test]
    fn test_notation_spaces_become_plus() {
        let catalog = EndpointCatalog::default();
        let url = catalog.get(SourceName::Rvk).unwrap().resolve_notation("SU 680");
        assert_eq!(
            url,
            "https://rvk.uni-regensburg.de/api_neu/json/node/SU+680?json"
        );
    }

    #[test]
    fn test_bibliographic_sources_keep_query_order() {
        let catalog = EndpointCatalog::default();
        assert_eq!(
            catalog.bibliographic_sources(),
            vec![SourceName::Dnb, SourceName::B3Kat, SourceName::Slsp]
        );
        assert_eq!(
            EndpointCatalog::empty()
                .with(SourceName::Slsp, Endpoint::new("x", ResponseFormat::MarcXml))
                .with(SourceName::Dnb, Endpoint::new("y", ResponseFormat::MarcXml))
                .bibliographic_sources(),
            vec![SourceName::Dnb, SourceName::Slsp]
        );
    }
}
