use std::io::Read;

use crate::domain::{ImportError, InputRecord};

/// Header names of the input columns the pipeline reads.
#[derive(Debug, Clone)]
pub struct ColumnNames {
    pub isbn: String,
    pub title: String,
    pub publication_date: String,
}

impl Default for ColumnNames {
    fn default() -> Self {
        Self {
            isbn: "ISBN".to_string(),
            title: "Title".to_string(),
            publication_date: "Publication Date".to_string(),
        }
    }
}

/// Parsed input: the original header row plus one record per data row.
#[derive(Debug, Clone, Default)]
pub struct InputTable {
    pub headers: Vec<String>,
    pub records: Vec<InputRecord>,
}

/// Read an input table. The ISBN column is mandatory; title and date columns
/// are optional and read as absent when the header lacks them.
pub fn read_input<R: Read>(reader: R, columns: &ColumnNames) -> Result<InputTable, ImportError> {
    let mut rdr = csv::ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .from_reader(reader);

    let headers: Vec<String> = rdr.headers()?.iter().map(|h| h.trim().to_string()).collect();
    let position = |name: &str| headers.iter().position(|h| h == name);

    let isbn_idx =
        position(&columns.isbn).ok_or_else(|| ImportError::MissingColumn(columns.isbn.clone()))?;
    let title_idx = position(&columns.title);
    let date_idx = position(&columns.publication_date);

    if title_idx.is_none() {
        tracing::warn!(
            "Input has no '{}' column, title mismatch checks will flag every found title",
            columns.title
        );
    }

    let mut records = Vec::new();
    for row in rdr.records() {
        let row = row?;
        let cell = |idx: Option<usize>| {
            idx.and_then(|i| row.get(i))
                .map(str::trim)
                .filter(|s| !s.is_empty())
        };

        let mut record = InputRecord::new(
            row.get(isbn_idx).unwrap_or_default(),
            cell(title_idx),
            cell(date_idx),
        );
        record.columns = (0..headers.len())
            .map(|i| row.get(i).unwrap_or_default().to_string())
            .collect();
        records.push(record);
    }

    tracing::info!("Read {} input records", records.len());
    Ok(InputTable { headers, records })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_read_input_keeps_all_columns() {
        let csv = "Shelf,ISBN,Title,Publication Date\n\
                   A1,978-3-1; 978-3-2,Example,1999\n\
                   A2,,Without ISBN,\n";
        let table = read_input(csv.as_bytes(), &ColumnNames::default()).unwrap();

        assert_eq!(table.headers, vec!["Shelf", "ISBN", "Title", "Publication Date"]);
        assert_eq!(table.records.len(), 2);

        let first = &table.records[0];
        assert_eq!(first.isbn(), Some("978-3-1"));
        assert_eq!(first.title.as_deref(), Some("Example"));
        assert_eq!(first.publication_date.as_deref(), Some("1999"));
        assert_eq!(first.columns, vec!["A1", "978-3-1; 978-3-2", "Example", "1999"]);

        let second = &table.records[1];
        assert_eq!(second.isbn(), None);
        assert_eq!(second.publication_date, None);
    }

    #[test]
    fn test_custom_column_names() {
        let csv = "isbn13,Titel,Jahr\n9783161484100,Buch,2001\n";
        let columns = ColumnNames {
            isbn: "isbn13".to_string(),
            title: "Titel".to_string(),
            publication_date: "Jahr".to_string(),
        };
        let table = read_input(csv.as_bytes(), &columns).unwrap();
        assert_eq!(table.records[0].isbn(), Some("9783161484100"));
        assert_eq!(table.records[0].title.as_deref(), Some("Buch"));
    }

    #[test]
    fn test_missing_isbn_column_is_an_error() {
        let csv = "Title\nSomething\n";
        let err = read_input(csv.as_bytes(), &ColumnNames::default()).unwrap_err();
        assert!(matches!(err, ImportError::MissingColumn(ref c) if c == "ISBN"));
    }

    #[test]
    fn test_short_rows_are_padded() {
        let csv = "ISBN,Title,Publication Date\n978-3-1\n";
        let table = read_input(csv.as_bytes(), &ColumnNames::default()).unwrap();
        assert_eq!(table.records[0].title, None);
        assert_eq!(table.records[0].columns, vec!["978-3-1", "", ""]);
    }
}
