//! Spreadsheet export: records to a single-sheet `.xlsx` workbook.
//!
//! The sheet has one bold header row (नाम, उमेर, लिङ्ग, जाति) and one row per
//! record in extraction order. Age is written as a number so spreadsheet
//! filters and sorts work on it; every other column is text.

use crate::error::Pdf2XlsxError;
use crate::output::PersonRecord;
use rust_xlsxwriter::{Format, Workbook, Worksheet, XlsxError};
use std::path::Path;
use tracing::{debug, info};

/// Suggested download/output file name.
pub const DEFAULT_FILE_NAME: &str = "extracted_data.xlsx";

/// Name of the only worksheet.
pub const SHEET_NAME: &str = "Extracted Data";

/// MIME type for `.xlsx` payloads.
pub const XLSX_MIME_TYPE: &str =
    "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet";

/// Column headers, in column order.
pub const HEADERS: [&str; 4] = ["नाम", "उमेर", "लिङ्ग", "जाति"];

const COLUMN_WIDTHS: [f64; 4] = [28.0, 8.0, 10.0, 16.0];

fn xlsx_err(context: &str) -> impl Fn(XlsxError) -> Pdf2XlsxError + '_ {
    move |e| Pdf2XlsxError::SpreadsheetFailed(format!("{context}: {e}"))
}

/// Build the workbook in memory and return the `.xlsx` bytes.
///
/// An empty slice yields a workbook with only the header row; callers that
/// must not produce a file for zero records check for that before calling.
pub fn records_to_xlsx(records: &[PersonRecord]) -> Result<Vec<u8>, Pdf2XlsxError> {
    let mut workbook = Workbook::new();
    let worksheet = workbook.add_worksheet();
    worksheet
        .set_name(SHEET_NAME)
        .map_err(xlsx_err("Failed to set worksheet name"))?;

    write_sheet(worksheet, records)?;

    let bytes = workbook
        .save_to_buffer()
        .map_err(xlsx_err("Failed to serialise workbook"))?;
    debug!("Built workbook: {} rows, {} bytes", records.len(), bytes.len());
    Ok(bytes)
}

fn write_sheet(worksheet: &mut Worksheet, records: &[PersonRecord]) -> Result<(), Pdf2XlsxError> {
    let header_format = Format::new().set_bold();

    for (col, (header, width)) in HEADERS.iter().zip(COLUMN_WIDTHS).enumerate() {
        let col = col as u16;
        worksheet
            .write_string_with_format(0, col, *header, &header_format)
            .map_err(xlsx_err("Failed to write header"))?;
        worksheet
            .set_column_width(col, width)
            .map_err(xlsx_err("Failed to set column width"))?;
    }
    worksheet
        .set_freeze_panes(1, 0)
        .map_err(xlsx_err("Failed to freeze header row"))?;

    for (idx, record) in records.iter().enumerate() {
        let row = idx as u32 + 1;
        worksheet
            .write_string(row, 0, &record.name)
            .map_err(xlsx_err("Failed to write name"))?;
        worksheet
            .write_number(row, 1, record.age)
            .map_err(xlsx_err("Failed to write age"))?;
        worksheet
            .write_string(row, 2, record.sex.as_str())
            .map_err(xlsx_err("Failed to write sex"))?;
        worksheet
            .write_string(row, 3, &record.caste)
            .map_err(xlsx_err("Failed to write caste"))?;
    }
    Ok(())
}

/// Write the workbook to `path`.
///
/// The bytes go to a sibling `.tmp` file first and are renamed into place,
/// so a failed run never leaves a truncated spreadsheet behind.
pub fn write_xlsx(records: &[PersonRecord], path: &Path) -> Result<(), Pdf2XlsxError> {
    let bytes = records_to_xlsx(records)?;

    let write_failed = |source: std::io::Error| Pdf2XlsxError::OutputWriteFailed {
        path: path.to_path_buf(),
        source,
    };

    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent).map_err(write_failed)?;
    }

    let tmp = path.with_extension("xlsx.tmp");
    std::fs::write(&tmp, &bytes).map_err(write_failed)?;
    if let Err(e) = std::fs::rename(&tmp, path) {
        let _ = std::fs::remove_file(&tmp);
        return Err(write_failed(e));
    }

    info!("Wrote {} records to {}", records.len(), path.display());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::output::Sex;
    use calamine::{Data, Reader, Xlsx};
    use std::io::Cursor;

    fn record(name: &str, age: u32, sex: Sex, caste: &str) -> PersonRecord {
        PersonRecord {
            name: name.into(),
            age,
            sex,
            caste: caste.into(),
            remainder: String::new(),
        }
    }

    fn read_sheet(bytes: Vec<u8>) -> Vec<Vec<Data>> {
        let mut workbook: Xlsx<_> = Xlsx::new(Cursor::new(bytes)).expect("valid xlsx");
        assert_eq!(workbook.sheet_names(), vec![SHEET_NAME.to_string()]);
        let range = workbook.worksheet_range(SHEET_NAME).expect("sheet exists");
        range.rows().map(|r| r.to_vec()).collect()
    }

    fn cell_str(cell: &Data) -> String {
        match cell {
            Data::String(s) => s.clone(),
            other => panic!("expected string cell, got {other:?}"),
        }
    }

    fn cell_num(cell: &Data) -> f64 {
        match cell {
            Data::Float(f) => *f,
            Data::Int(i) => *i as f64,
            other => panic!("expected numeric cell, got {other:?}"),
        }
    }

    #[test]
    fn header_and_rows_round_trip() {
        let records = vec![
            record("राम शर्मा", 34, Sex::Male, "शर्मा"),
            record("सीता थापा", 45, Sex::Female, "थापा"),
        ];
        let rows = read_sheet(records_to_xlsx(&records).unwrap());

        assert_eq!(rows.len(), 3);
        let header: Vec<String> = rows[0].iter().map(cell_str).collect();
        assert_eq!(header, HEADERS);

        assert_eq!(cell_str(&rows[1][0]), "राम शर्मा");
        assert_eq!(cell_num(&rows[1][1]), 34.0);
        assert_eq!(cell_str(&rows[1][2]), "पुरुष");
        assert_eq!(cell_str(&rows[1][3]), "शर्मा");

        assert_eq!(cell_str(&rows[2][2]), "महिला");
        assert_eq!(cell_num(&rows[2][1]), 45.0);
    }

    #[test]
    fn empty_caste_is_kept_as_blank_cell() {
        let rows = read_sheet(records_to_xlsx(&[record("", 20, Sex::Male, "")]).unwrap());
        assert_eq!(rows.len(), 2);
        assert!(matches!(rows[1][0], Data::String(ref s) if s.is_empty()) || rows[1][0] == Data::Empty);
        assert_eq!(cell_num(&rows[1][1]), 20.0);
    }

    #[test]
    fn write_xlsx_replaces_file_atomically() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join(DEFAULT_FILE_NAME);

        write_xlsx(&[record("राम शर्मा", 34, Sex::Male, "शर्मा")], &path).unwrap();
        assert!(path.exists());
        assert!(!path.with_extension("xlsx.tmp").exists());

        let bytes = std::fs::read(&path).unwrap();
        assert!(bytes.starts_with(b"PK"), "xlsx is a zip container");
    }

    #[test]
    fn mime_type_is_openxml() {
        assert!(XLSX_MIME_TYPE.ends_with("spreadsheetml.sheet"));
        assert!(DEFAULT_FILE_NAME.ends_with(".xlsx"));
    }
}
