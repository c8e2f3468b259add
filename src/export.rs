//! Selection output: CSV export and the on-screen table.

use crate::error::{Result, SelectionError};
use crate::models::ColumnMapping;
use crate::selector::SelectionResult;
use comfy_table::presets::UTF8_FULL_CONDENSED;
use comfy_table::{Attribute, Cell, CellAlignment, ContentArrangement, Table};
use std::io::Write;
use std::path::Path;
use tempfile::NamedTempFile;

/// Write the selected records as CSV with the required columns in fixed order.
pub fn write_selection<W: Write>(
    result: &SelectionResult,
    columns: &ColumnMapping,
    output: W,
) -> Result<()> {
    let mut writer = csv::Writer::from_writer(output);
    writer.write_record(columns.labels())?;
    for record in result.records() {
        writer.write_record(record.output_fields())?;
    }
    writer.flush().map_err(|e| SelectionError::Csv(e.into()))?;
    Ok(())
}

/// Write every selection to its path, or none of them.
///
/// Each file is staged as a temporary file next to its destination and only
/// renamed into place once all of them rendered successfully.
pub fn write_selection_files(
    outputs: &[(&SelectionResult, &Path)],
    columns: &ColumnMapping,
) -> Result<()> {
    let mut staged = Vec::with_capacity(outputs.len());
    for &(result, path) in outputs {
        let dir = match path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent,
            _ => Path::new("."),
        };
        let mut file = NamedTempFile::new_in(dir).map_err(|source| SelectionError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        write_selection(result, columns, &mut file)?;
        staged.push((file, result, path));
    }

    for (file, result, path) in staged {
        file.persist(path).map_err(|err| SelectionError::Io {
            path: path.to_path_buf(),
            source: err.error,
        })?;
        tracing::info!(
            cohort = result.cohort.label(),
            path = %path.display(),
            rows = result.len(),
            "Wrote selection"
        );
    }
    Ok(())
}

/// Table of the selected students for terminal display.
pub fn selection_table(result: &SelectionResult, columns: &ColumnMapping) -> Table {
    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL_CONDENSED)
        .set_content_arrangement(ContentArrangement::Dynamic)
        .set_header(
            columns
                .labels()
                .iter()
                .map(|label| Cell::new(label).add_attribute(Attribute::Bold)),
        );

    for record in result.records() {
        table.add_row(record.output_fields());
    }

    // Score
    if let Some(column) = table.column_mut(4) {
        column.set_cell_alignment(CellAlignment::Right);
    }
    table
}
