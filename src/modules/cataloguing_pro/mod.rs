// Professional Cataloguing Module
// Handles MARCXML parsing, RVK classification and call-number synthesis

pub mod classification;
pub mod marc;

pub use classification::{extract_year, synthesize_call_number};
pub use marc::{CatalogEntry, parse_catalog_entry};
