//! Export of the current result set: UTF-8 CSV (with BOM) or an xlsx workbook.
//!
//! The format follows the file extension. Percent columns hold `value × 100`.

use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

use rust_xlsxwriter::{Format, Workbook};

use crate::domain::ReturnRecord;
use crate::error::ExportError;

/// Byte-order mark so spreadsheet tools detect UTF-8 names.
const UTF8_BOM: &[u8] = b"\xEF\xBB\xBF";

const HEADERS: [&str; 9] = [
    "Rank",
    "Ticker",
    "Name",
    "Latest Return (%)",
    "Latest Date",
    "Avg Return (%)",
    "Data Points",
    "First Date",
    "Last Date",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExportFormat {
    Csv,
    Xlsx,
}

impl ExportFormat {
    pub fn from_path(path: &Path) -> Result<Self, ExportError> {
        let ext = path
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| e.to_ascii_lowercase());
        match ext.as_deref() {
            Some("csv") => Ok(ExportFormat::Csv),
            Some("xlsx") => Ok(ExportFormat::Xlsx),
            _ => Err(ExportError::UnsupportedFormat(path.to_path_buf())),
        }
    }
}

/// Write `records` to `path`, choosing the format from the extension.
pub fn export_records(records: &[ReturnRecord], path: &Path) -> Result<ExportFormat, ExportError> {
    let format = ExportFormat::from_path(path)?;
    if records.is_empty() {
        return Err(ExportError::Empty);
    }
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)?;
        }
    }
    match format {
        ExportFormat::Csv => write_csv(records, path)?,
        ExportFormat::Xlsx => write_xlsx(records, path)?,
    }
    tracing::info!(path = %path.display(), rows = records.len(), ?format, "exported result set");
    Ok(format)
}

fn csv_row(rank: usize, r: &ReturnRecord) -> [String; 9] {
    [
        rank.to_string(),
        r.ticker.clone(),
        r.name.clone(),
        format!("{:.4}", r.latest_return_pct()),
        r.latest_date.to_string(),
        format!("{:.4}", r.avg_return_pct()),
        r.data_points.to_string(),
        r.first_date.to_string(),
        r.last_date.to_string(),
    ]
}

fn write_csv_to<W: Write>(records: &[ReturnRecord], mut out: W) -> Result<(), ExportError> {
    out.write_all(UTF8_BOM)?;
    let mut wtr = csv::Writer::from_writer(out);
    wtr.write_record(HEADERS)?;
    for (i, r) in records.iter().enumerate() {
        wtr.write_record(csv_row(i + 1, r))?;
    }
    wtr.flush()?;
    Ok(())
}

/// Render the CSV export in memory, BOM included.
pub fn export_csv_string(records: &[ReturnRecord]) -> Result<String, ExportError> {
    let mut buf = Vec::new();
    write_csv_to(records, &mut buf)?;
    String::from_utf8(buf).map_err(|e| {
        ExportError::Io(std::io::Error::new(std::io::ErrorKind::InvalidData, e))
    })
}

fn write_csv(records: &[ReturnRecord], path: &Path) -> Result<(), ExportError> {
    let file = File::create(path)?;
    write_csv_to(records, BufWriter::new(file))
}

fn write_xlsx(records: &[ReturnRecord], path: &Path) -> Result<(), ExportError> {
    let mut workbook = Workbook::new();
    let bold = Format::new().set_bold();
    let pct = Format::new().set_num_format("0.00");

    let sheet = workbook.add_worksheet();
    sheet.set_name("Rankings")?;
    for (col, header) in HEADERS.iter().enumerate() {
        sheet.write_string_with_format(0, col as u16, *header, &bold)?;
    }
    for (i, r) in records.iter().enumerate() {
        let row = (i + 1) as u32;
        sheet.write_number(row, 0, (i + 1) as f64)?;
        sheet.write_string(row, 1, r.ticker.as_str())?;
        sheet.write_string(row, 2, r.name.as_str())?;
        sheet.write_number_with_format(row, 3, r.latest_return_pct(), &pct)?;
        sheet.write_string(row, 4, r.latest_date.to_string())?;
        sheet.write_number_with_format(row, 5, r.avg_return_pct(), &pct)?;
        sheet.write_number(row, 6, f64::from(r.data_points))?;
        sheet.write_string(row, 7, r.first_date.to_string())?;
        sheet.write_string(row, 8, r.last_date.to_string())?;
    }
    sheet.set_column_width(2, 24)?;
    workbook.save(path)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn records() -> Vec<ReturnRecord> {
        let d = NaiveDate::from_ymd_opt(2024, 6, 28).unwrap();
        vec![
            ReturnRecord {
                ticker: "2330".into(),
                name: "台積電".into(),
                latest_return: 0.0123,
                latest_date: d,
                avg_return: 0.004,
                data_points: 6,
                first_date: NaiveDate::from_ymd_opt(2024, 1, 31).unwrap(),
                last_date: d,
            },
            ReturnRecord {
                ticker: "0050".into(),
                name: "Yuanta, Taiwan 50".into(),
                latest_return: -0.05,
                latest_date: d,
                avg_return: -0.01,
                data_points: 6,
                first_date: NaiveDate::from_ymd_opt(2024, 1, 31).unwrap(),
                last_date: d,
            },
        ]
    }

    #[test]
    fn format_from_extension() {
        assert_eq!(ExportFormat::from_path(Path::new("a.CSV")).unwrap(), ExportFormat::Csv);
        assert_eq!(ExportFormat::from_path(Path::new("a.xlsx")).unwrap(), ExportFormat::Xlsx);
        assert!(matches!(
            ExportFormat::from_path(Path::new("a.txt")),
            Err(ExportError::UnsupportedFormat(_))
        ));
        assert!(ExportFormat::from_path(Path::new("noext")).is_err());
    }

    #[test]
    fn csv_has_bom_header_and_percentages() {
        let text = export_csv_string(&records()).unwrap();
        assert!(text.starts_with('\u{feff}'));
        let mut lines = text.trim_start_matches('\u{feff}').lines();
        assert_eq!(
            lines.next().unwrap(),
            "Rank,Ticker,Name,Latest Return (%),Latest Date,Avg Return (%),Data Points,First Date,Last Date"
        );
        assert_eq!(
            lines.next().unwrap(),
            "1,2330,台積電,1.2300,2024-06-28,0.4000,6,2024-01-31,2024-06-28"
        );
        // Commas in names are quoted.
        assert!(lines.next().unwrap().starts_with("2,0050,\"Yuanta, Taiwan 50\",-5.0000"));
    }

    #[test]
    fn csv_file_written() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out").join("rank.csv");
        assert_eq!(export_records(&records(), &path).unwrap(), ExportFormat::Csv);
        let bytes = std::fs::read(&path).unwrap();
        assert!(bytes.starts_with(UTF8_BOM));
    }

    #[test]
    fn xlsx_file_written() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("rank.xlsx");
        assert_eq!(export_records(&records(), &path).unwrap(), ExportFormat::Xlsx);
        let bytes = std::fs::read(&path).unwrap();
        // xlsx is a zip container.
        assert!(bytes.starts_with(b"PK"));
    }

    #[test]
    fn empty_set_not_exported() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("rank.csv");
        assert!(matches!(export_records(&[], &path), Err(ExportError::Empty)));
        assert!(!path.exists());
    }

    #[test]
    fn unwritable_path_is_io_error() {
        let dir = tempfile::tempdir().unwrap();
        // A directory where the file should be.
        let path = dir.path().join("taken.csv");
        std::fs::create_dir(&path).unwrap();
        assert!(matches!(export_records(&records(), &path), Err(ExportError::Io(_))));
    }
}
