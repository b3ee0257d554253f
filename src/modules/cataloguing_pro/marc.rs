// MARC Record Parser
// Reads MARCXML (MARC 21 slim), bare or wrapped in an SRU searchRetrieve response.

use quick_xml::events::{BytesStart, Event};
use quick_xml::reader::Reader;

use crate::domain::ParseError;

use super::classification::RVK_SCHEME;

const TITLE_TAG: &str = "245";
const CLASSIFICATION_TAG: &str = "084";
const TITLE_SEPARATOR: &str = " : ";
const AUTHOR_SEPARATOR: &str = "; ";

#[derive(Debug, Clone, Default, PartialEq)]
pub struct MarcRecord {
    pub leader: String,
    pub fields: Vec<MarcField>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct MarcField {
    pub tag: String,
    pub subfields: Vec<(String, String)>,
}

impl MarcField {
    /// Values of every subfield with this code, in document order
    pub fn values<'a>(&'a self, code: &'a str) -> impl Iterator<Item = &'a str> + 'a {
        self.subfields
            .iter()
            .filter(move |(c, _)| c == code)
            .map(|(_, v)| v.as_str())
    }

    pub fn first<'a>(&'a self, code: &'a str) -> Option<&'a str> {
        self.values(code).next()
    }
}

impl MarcRecord {
    pub fn datafields<'a>(&'a self, tag: &'a str) -> impl Iterator<Item = &'a MarcField> + 'a {
        self.fields.iter().filter(move |f| f.tag == tag)
    }
}

/// Title, author and RVK notations pulled from one bibliographic record.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CatalogEntry {
    pub title: Option<String>,
    pub author: Option<String>,
    pub notations: Vec<String>,
}

/// Parse the first MARC record in `xml`.
///
/// A response without any record yields an empty `MarcRecord`. Only markup
/// that is not well-formed is an error.
pub fn parse_marc_xml(xml: &[u8]) -> Result<MarcRecord, ParseError> {
    let mut reader = Reader::from_reader(xml);
    reader.trim_text(true);

    let mut record = MarcRecord::default();
    let mut buf = Vec::new();

    let mut current_field: Option<MarcField> = None;
    let mut current_code: Option<String> = None;
    let mut in_leader = false;
    let mut text = String::new();
    let mut seen_content = false;
    let mut depth: usize = 0;

    loop {
        match reader.read_event_into(&mut buf) {
            Ok(Event::Start(e)) => {
                depth += 1;
                match e.local_name().as_ref() {
                    b"datafield" => {
                        current_field = Some(MarcField {
                            tag: attribute(&e, b"tag").unwrap_or_default(),
                            subfields: Vec::new(),
                        });
                        seen_content = true;
                    }
                    b"subfield" => {
                        current_code = Some(attribute(&e, b"code").unwrap_or_default());
                        text.clear();
                    }
                    b"leader" => {
                        in_leader = true;
                        text.clear();
                    }
                    b"controlfield" => seen_content = true,
                    _ => {}
                }
            }
            Ok(Event::Empty(e)) => {
                // <subfield code="a"/> carries an empty value
                if e.local_name().as_ref() == b"subfield"
                    && let Some(field) = current_field.as_mut()
                {
                    field
                        .subfields
                        .push((attribute(&e, b"code").unwrap_or_default(), String::new()));
                }
            }
            Ok(Event::Text(e)) => {
                if current_code.is_some() || in_leader {
                    let unescaped = e
                        .unescape()
                        .map_err(|err| ParseError(format!("XML entity error: {}", err)))?;
                    text.push_str(&unescaped);
                }
            }
            Ok(Event::CData(e)) => {
                if current_code.is_some() || in_leader {
                    text.push_str(&String::from_utf8_lossy(&e.into_inner()));
                }
            }
            Ok(Event::End(e)) => {
                depth = depth.saturating_sub(1);
                match e.local_name().as_ref() {
                    b"subfield" => {
                        if let (Some(code), Some(field)) =
                            (current_code.take(), current_field.as_mut())
                        {
                            field.subfields.push((code, text.trim().to_string()));
                        }
                        text.clear();
                    }
                    b"datafield" => {
                        if let Some(field) = current_field.take() {
                            record.fields.push(field);
                        }
                    }
                    b"leader" => {
                        record.leader = text.trim().to_string();
                        in_leader = false;
                        text.clear();
                    }
                    // SRU responses nest the MARC record inside an outer <record>;
                    // the first inner record that closes is the one we keep.
                    b"record" if seen_content => break,
                    _ => {}
                }
            }
            Ok(Event::Eof) => {
                if depth > 0 {
                    return Err(ParseError("unexpected end of document".to_string()));
                }
                break;
            }
            Err(e) => return Err(ParseError(format!("XML parse error: {}", e))),
            _ => (),
        }
        buf.clear();
    }

    Ok(record)
}

fn attribute(e: &BytesStart<'_>, key: &[u8]) -> Option<String> {
    e.attributes()
        .flatten()
        .find(|a| a.key.as_ref() == key)
        .map(|a| String::from_utf8_lossy(&a.value).trim().to_string())
}

/// Title from 245 $a and $b, author from 245 $c, notations from every 084
/// field whose $2 is exactly `rvk`.
pub fn catalog_entry(record: &MarcRecord) -> CatalogEntry {
    let title_field = record.datafields(TITLE_TAG).next();

    let title = title_field
        .map(|f| {
            f.subfields
                .iter()
                .filter(|(code, _)| code == "a" || code == "b")
                .map(|(_, v)| v.trim())
                .filter(|v| !v.is_empty())
                .collect::<Vec<_>>()
                .join(TITLE_SEPARATOR)
                .trim()
                .to_string()
        })
        .filter(|t| !t.is_empty());

    let author = title_field
        .map(|f| {
            f.values("c")
                .map(str::trim)
                .filter(|v| !v.is_empty())
                .collect::<Vec<_>>()
                .join(AUTHOR_SEPARATOR)
                .trim()
                .to_string()
        })
        .filter(|a| !a.is_empty());

    let notations = record
        .datafields(CLASSIFICATION_TAG)
        .filter(|f| f.values("2").any(|scheme| scheme == RVK_SCHEME))
        .filter_map(|f| f.first("a"))
        .map(str::trim)
        .filter(|n| !n.is_empty())
        .map(str::to_string)
        .collect();

    CatalogEntry {
        title,
        author,
        notations,
    }
}

/// Parse a raw catalogue response straight into a `CatalogEntry`.
pub fn parse_catalog_entry(xml: &[u8]) -> Result<CatalogEntry, ParseError> {
    parse_marc_xml(xml).map(|record| catalog_entry(&record))
}
