//! SRU catalogue lookups (DNB, B3Kat, swisscovery) returning MARCXML.

use crate::domain::{LookupError, ParseError, SourceName};
use crate::modules::cataloguing_pro::marc::{CatalogEntry, parse_catalog_entry};
use crate::services::fetcher::QueryExecutor;

use super::catalog::{Endpoint, ResponseFormat};

/// Query one SRU catalogue for `isbn` and parse the first record.
pub async fn fetch_by_isbn(
    executor: &QueryExecutor,
    source: SourceName,
    endpoint: &Endpoint,
    isbn: &str,
) -> Result<CatalogEntry, LookupError> {
    if endpoint.format != ResponseFormat::MarcXml {
        return Err(ParseError(format!("{} does not serve MARCXML", source)).into());
    }

    let url = endpoint.resolve_isbn(isbn);
    let body = executor.fetch(source, &url).await?;
    let entry = parse_catalog_entry(&body)?;

    tracing::debug!(
        "{} ISBN {}: title={:?}, {} RVK notation(s)",
        source,
        isbn,
        entry.title,
        entry.notations.len()
    );

    Ok(entry)
}
