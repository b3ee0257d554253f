use std::io::Write;

use serde::Serialize;

use crate::domain::{
    ClassificationCode, ExportError, InputRecord, OutputRecord, SourceLookup, SourceName,
};

/// Columns appended after the original input columns.
pub const RESULT_COLUMNS: [&str; 11] = [
    "consolidated_title",
    "author",
    "unique_rvk_notations",
    "call_number_prefix",
    "cautions",
    "has_dnb_title",
    "has_b3kat_title",
    "has_slsp_title",
    "has_dnb_rvk",
    "has_b3kat_rvk",
    "has_slsp_rvk",
];

/// `notation | label` pairs joined by `"; "`.
pub fn format_codes(codes: &[ClassificationCode]) -> String {
    codes
        .iter()
        .map(ClassificationCode::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}

fn flag(value: bool) -> &'static str {
    if value { "true" } else { "false" }
}

/// Write the result table: every input row with its original cells, followed
/// by the result columns. `inputs` and `outputs` are paired by position.
pub fn write_results<W: Write>(
    writer: W,
    headers: &[String],
    inputs: &[InputRecord],
    outputs: &[OutputRecord],
) -> Result<(), ExportError> {
    let mut wtr = csv::Writer::from_writer(writer);

    wtr.write_record(
        headers
            .iter()
            .map(String::as_str)
            .chain(RESULT_COLUMNS.iter().copied()),
    )?;

    for (input, output) in inputs.iter().zip(outputs) {
        let consolidated = &output.consolidated;
        let mut row: Vec<String> = input.columns.clone();
        row.resize(headers.len(), String::new());

        row.push(consolidated.title.clone().unwrap_or_default());
        row.push(consolidated.author.clone().unwrap_or_default());
        row.push(format_codes(&consolidated.unique_codes));
        row.push(output.call_number.prefix.clone().unwrap_or_default());
        row.push(consolidated.cautions_text());
        for source in SourceName::BIBLIOGRAPHIC {
            row.push(flag(output.has_title_from(source)).to_string());
        }
        for source in SourceName::BIBLIOGRAPHIC {
            row.push(flag(output.has_codes_from(source)).to_string());
        }

        wtr.write_record(&row)?;
    }

    wtr.flush()?;
    Ok(())
}

#[derive(Serialize)]
struct AuditEntry<'a> {
    row: usize,
    isbn: Option<&'a str>,
    lookup: &'a SourceLookup,
    cautions: Vec<&'static str>,
}

/// Dump every record's per-source results as pretty JSON.
pub fn write_audit<W: Write>(writer: W, outputs: &[OutputRecord]) -> Result<(), ExportError> {
    let entries: Vec<AuditEntry<'_>> = outputs
        .iter()
        .enumerate()
        .map(|(row, output)| AuditEntry {
            row: row + 1,
            isbn: output.isbn.as_deref(),
            lookup: &output.lookup,
            cautions: output
                .consolidated
                .cautions
                .iter()
                .map(|c| c.as_str())
                .collect(),
        })
        .collect();

    serde_json::to_writer_pretty(writer, &entries)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{CallNumber, CautionFlag, ConsolidatedRecord, SourceResult};

    fn sample_output() -> OutputRecord {
        let code = ClassificationCode::new("AB 123", "Label1");
        OutputRecord {
            isbn: Some("978-3-1".to_string()),
            consolidated: ConsolidatedRecord {
                title: Some("Example".to_string()),
                author: None,
                unique_codes: vec![code.clone(), ClassificationCode::new("CD 4", "Label2")],
                cautions: Default::default(),
            },
            call_number: CallNumber {
                prefix: Some("AB123 1999".to_string()),
            },
            lookup: SourceLookup::Queried(vec![
                SourceResult::found(SourceName::Dnb, None, None, vec![code]),
                SourceResult::found(SourceName::B3Kat, Some("Example".to_string()), None, vec![]),
            ]),
        }
    }

    #[test]
    fn test_write_results_appends_result_columns() {
        let headers = vec!["ISBN".to_string(), "Title".to_string()];
        let mut input = InputRecord::new("978-3-1", Some("Example"), None);
        input.columns = vec!["978-3-1".to_string(), "Example".to_string()];

        let mut buf = Vec::new();
        write_results(&mut buf, &headers, &[input], &[sample_output()]).unwrap();
        let text = String::from_utf8(buf).unwrap();
        let mut lines = text.lines();

        assert_eq!(
            lines.next().unwrap(),
            "ISBN,Title,consolidated_title,author,unique_rvk_notations,call_number_prefix,cautions,\
             has_dnb_title,has_b3kat_title,has_slsp_title,has_dnb_rvk,has_b3kat_rvk,has_slsp_rvk"
        );
        assert_eq!(
            lines.next().unwrap(),
            "978-3-1,Example,Example,,AB 123 | Label1; CD 4 | Label2,AB123 1999,,\
             false,true,false,true,false,false"
        );
    }

    #[test]
    fn test_audit_lists_cautions_and_sources() {
        let mut output = sample_output();
        output.consolidated.cautions.insert(CautionFlag::TitleMismatch);

        let mut buf = Vec::new();
        write_audit(&mut buf, &[output]).unwrap();
        let json: serde_json::Value = serde_json::from_slice(&buf).unwrap();

        assert_eq!(json[0]["row"], 1);
        assert_eq!(json[0]["cautions"][0], "title mismatch");
        assert_eq!(json[0]["lookup"]["status"], "queried");
        assert_eq!(json[0]["lookup"]["sources"][0]["source"], "dnb");
    }
}
