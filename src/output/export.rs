//! Final table exporters
//!
//! Writes the final table as CSV, JSON or XLSX:
//! - Columns are the union of all row keys, sorted
//! - Lists are joined with `"; "` in CSV and XLSX, arrays in JSON
//! - Null is an empty cell in CSV and XLSX, `null` in JSON

use crate::config::{JobSpec, OutputFormat};
use crate::data::{FieldValue, Row};
use crate::engine::RunOutcome;
use crate::output::traits::Exporter;
use crate::{ExtractorError, Result};
use chrono::{DateTime, Utc};
use rust_xlsxwriter::{Format, Workbook};
use std::collections::BTreeSet;
use std::fs::File;
use std::io::BufWriter;
use std::path::{Path, PathBuf};

/// Sorted union of the keys of all rows
pub fn table_columns(rows: &[Row]) -> Vec<String> {
    rows.iter()
        .flat_map(|row| row.keys().cloned())
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect()
}

/// File name (without extension) of an exported table
///
/// ```
/// use chrono::{TimeZone, Utc};
/// use web_extractor::output::output_file_stem;
///
/// let at = Utc.with_ymd_and_hms(2024, 3, 9, 14, 5, 0).unwrap();
/// assert_eq!(
///     output_file_stem("shop", "catalog", "ProductDetail", at, "1a2b3c4"),
///     "shop_catalog_ProductDetail_20240309_140500_1a2b3c4"
/// );
/// ```
pub fn output_file_stem(
    site: &str,
    job: &str,
    entity: &str,
    at: DateTime<Utc>,
    commit: &str,
) -> String {
    format!(
        "{}_{}_{}_{}_{}",
        site,
        job,
        entity,
        at.format("%Y%m%d_%H%M%S"),
        commit
    )
}

/// CSV exporter
#[derive(Debug, Clone, Copy, Default)]
pub struct CsvExporter;

impl Exporter for CsvExporter {
    fn format(&self) -> OutputFormat {
        OutputFormat::Csv
    }

    fn write(&self, columns: &[String], rows: &[Row], path: &Path) -> Result<()> {
        let mut writer = csv::Writer::from_path(path)?;
        writer.write_record(columns)?;
        for row in rows {
            writer.write_record(
                columns
                    .iter()
                    .map(|c| row.get(c).map(FieldValue::to_cell).unwrap_or_default()),
            )?;
        }
        writer.flush()?;
        Ok(())
    }
}

/// JSON exporter, one object per row
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonExporter;

impl Exporter for JsonExporter {
    fn format(&self) -> OutputFormat {
        OutputFormat::Json
    }

    fn write(&self, columns: &[String], rows: &[Row], path: &Path) -> Result<()> {
        let records: Vec<serde_json::Map<String, serde_json::Value>> = rows
            .iter()
            .map(|row| {
                columns
                    .iter()
                    .map(|c| -> std::result::Result<_, serde_json::Error> {
                        let value = row.get(c).unwrap_or(&FieldValue::Null);
                        Ok((c.clone(), serde_json::to_value(value)?))
                    })
                    .collect::<std::result::Result<_, serde_json::Error>>()
            })
            .collect::<std::result::Result<_, _>>()?;

        let writer = BufWriter::new(File::create(path)?);
        serde_json::to_writer_pretty(writer, &records)?;
        Ok(())
    }
}

/// Excel exporter, a single worksheet with a bold header row
#[derive(Debug, Clone, Copy, Default)]
pub struct XlsxExporter;

impl Exporter for XlsxExporter {
    fn format(&self) -> OutputFormat {
        OutputFormat::Xlsx
    }

    fn write(&self, columns: &[String], rows: &[Row], path: &Path) -> Result<()> {
        if columns.len() > u16::MAX as usize {
            return Err(ExtractorError::Output(format!(
                "{} columns exceed the worksheet limit",
                columns.len()
            )));
        }

        let mut workbook = Workbook::new();
        let worksheet = workbook.add_worksheet();
        let header = Format::new().set_bold();

        for (col, name) in columns.iter().enumerate() {
            worksheet.write_string_with_format(0, col as u16, name.as_str(), &header)?;
        }

        for (index, row) in rows.iter().enumerate() {
            let line = index as u32 + 1;
            for (col, name) in columns.iter().enumerate() {
                let col = col as u16;
                match row.get(name) {
                    None | Some(FieldValue::Null) => {}
                    Some(FieldValue::Integer(i)) => {
                        worksheet.write_number(line, col, *i as f64)?;
                    }
                    Some(FieldValue::Float(x)) => {
                        worksheet.write_number(line, col, *x)?;
                    }
                    Some(value) => {
                        worksheet.write_string(line, col, value.to_cell())?;
                    }
                }
            }
        }

        workbook.save(path)?;
        Ok(())
    }
}

/// The exporter for a format
pub fn exporter_for(format: OutputFormat) -> Box<dyn Exporter> {
    match format {
        OutputFormat::Csv => Box::new(CsvExporter),
        OutputFormat::Json => Box::new(JsonExporter),
        OutputFormat::Xlsx => Box::new(XlsxExporter),
    }
}

/// Writes the final table once per configured format
///
/// # Arguments
///
/// * `job` - The job that ran (output directory, formats, naming)
/// * `outcome` - The finished run
/// * `commit` - Short commit hash used in the file names
///
/// # Returns
///
/// * `Ok(paths)` - Files written; empty when the final table has no rows
/// * `Err(ExtractorError)` - Creating the directory or writing a file failed
pub fn export_final_table(
    job: &JobSpec,
    outcome: &RunOutcome,
    commit: &str,
) -> Result<Vec<PathBuf>> {
    if !outcome.has_output() {
        tracing::warn!(
            "No output produced: entity '{}' has no rows",
            outcome.final_entity
        );
        return Ok(Vec::new());
    }

    std::fs::create_dir_all(&job.output.dir)?;
    let stem = output_file_stem(
        &job.site.name,
        &job.name,
        &outcome.final_entity,
        outcome.finished_at,
        commit,
    );
    let columns = table_columns(&outcome.final_table);

    let mut written = Vec::new();
    for format in &job.output.formats {
        let exporter = exporter_for(*format);
        let path = job
            .output
            .dir
            .join(format!("{}.{}", stem, exporter.format().extension()));
        exporter.write(&columns, &outcome.final_table, &path)?;
        tracing::info!(
            "Saved {} rows to {}",
            outcome.final_table.len(),
            path.display()
        );
        written.push(path);
    }
    Ok(written)
}
