//! Roster loading: CSV reading, required-column validation and cohort split.

use crate::error::{Result, SelectionError};
use crate::models::{parse_score, Cohort, ColumnMapping, StudentRecord};
use std::fs::File;
use std::io::Read;
use std::path::Path;

const UTF8_BOM: char = '\u{feff}';

/// Typed records read from one upload.
#[derive(Debug, Clone)]
pub struct Roster {
    pub records: Vec<StudentRecord>,
    /// Input columns that are not part of the required set
    pub ignored_columns: Vec<String>,
}

/// The two cohorts of a roster, in input order.
#[derive(Debug, Clone, Default)]
pub struct CohortSplit {
    pub paralympic: Vec<StudentRecord>,
    pub olympic: Vec<StudentRecord>,
}

impl Roster {
    pub fn split_cohorts(&self, standard_category: &str) -> CohortSplit {
        let (olympic, paralympic): (Vec<StudentRecord>, Vec<StudentRecord>) = self
            .records
            .iter()
            .cloned()
            .partition(|record| record.cohort(standard_category) == Cohort::Olympic);

        tracing::info!(
            paralympic = paralympic.len(),
            olympic = olympic.len(),
            "Split roster into cohorts"
        );
        CohortSplit {
            paralympic,
            olympic,
        }
    }
}

/// Header positions of the required columns.
struct ColumnLayout {
    grade: usize,
    name: usize,
    school: usize,
    municipality: usize,
    score: usize,
    time: usize,
    disability_category: usize,
    teacher: usize,
}

impl ColumnLayout {
    /// Resolve every required label, reporting all missing ones at once.
    fn resolve(columns: &ColumnMapping, headers: &[String]) -> Result<Self> {
        let missing: Vec<String> = columns
            .labels()
            .iter()
            .filter(|label| !headers.iter().any(|header| header == *label))
            .map(|label| label.to_string())
            .collect();
        if !missing.is_empty() {
            return Err(SelectionError::MissingColumns { columns: missing });
        }

        // First occurrence wins when a label is repeated
        let position = |label: &str| headers.iter().position(|header| header == label).unwrap_or(0);
        Ok(Self {
            grade: position(&columns.grade),
            name: position(&columns.name),
            school: position(&columns.school),
            municipality: position(&columns.municipality),
            score: position(&columns.score),
            time: position(&columns.time),
            disability_category: position(&columns.disability_category),
            teacher: position(&columns.teacher),
        })
    }

    /// Rows with every required cell blank, such as spreadsheet trailers.
    fn is_blank(&self, row: &csv::StringRecord) -> bool {
        [
            self.grade,
            self.name,
            self.school,
            self.municipality,
            self.score,
            self.time,
            self.disability_category,
            self.teacher,
        ]
        .iter()
        .all(|&index| row.get(index).map_or(true, |value| value.trim().is_empty()))
    }

    fn build_record(&self, row: &csv::StringRecord, line: u64) -> Result<StudentRecord> {
        let cell = |index: usize| row.get(index).unwrap_or("");
        let optional_cell = |index: usize| {
            let value = cell(index);
            (!value.is_empty()).then(|| value.to_string())
        };

        // Blank scores are kept and rank last; only non-numeric text is fatal
        let score_text = cell(self.score);
        let score = if score_text.trim().is_empty() {
            None
        } else {
            let score = parse_score(score_text).ok_or_else(|| SelectionError::InvalidScore {
                line,
                value: score_text.to_string(),
            })?;
            Some(score)
        };

        Ok(StudentRecord {
            grade: cell(self.grade).to_string(),
            name: cell(self.name).to_string(),
            school: cell(self.school).to_string(),
            municipality: cell(self.municipality).to_string(),
            score,
            score_text: score_text.to_string(),
            raw_time: optional_cell(self.time),
            disability_category: optional_cell(self.disability_category),
            teacher: cell(self.teacher).to_string(),
        })
    }
}

pub struct RosterReader<'a> {
    columns: &'a ColumnMapping,
}

impl<'a> RosterReader<'a> {
    pub fn new(columns: &'a ColumnMapping) -> Self {
        Self { columns }
    }

    pub fn read_file(&self, path: &Path) -> Result<Roster> {
        let file = File::open(path).map_err(|source| SelectionError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let roster = self.read(file)?;
        tracing::info!(
            path = %path.display(),
            records = roster.records.len(),
            "Loaded roster"
        );
        Ok(roster)
    }

    /// Read a roster from any CSV source. Nothing is returned unless every row parses.
    pub fn read<R: Read>(&self, input: R) -> Result<Roster> {
        let mut reader = csv::ReaderBuilder::new()
            .has_headers(true)
            .flexible(true)
            .trim(csv::Trim::None)
            .from_reader(input);

        let headers: Vec<String> = reader
            .headers()?
            .iter()
            .enumerate()
            .map(|(index, header)| {
                if index == 0 {
                    header.trim_start_matches(UTF8_BOM).to_string()
                } else {
                    header.to_string()
                }
            })
            .collect();
        if headers.is_empty() {
            return Err(SelectionError::EmptyInput);
        }

        let layout = ColumnLayout::resolve(self.columns, &headers)?;
        let required = self.columns.labels();
        let ignored_columns: Vec<String> = headers
            .iter()
            .filter(|header| !required.contains(&header.as_str()))
            .cloned()
            .collect();
        if !ignored_columns.is_empty() {
            tracing::debug!(columns = ?ignored_columns, "Ignoring extra input columns");
        }

        let mut records = Vec::new();
        let mut blank_rows = 0usize;
        for (index, row) in reader.records().enumerate() {
            let row = row?;
            if layout.is_blank(&row) {
                blank_rows += 1;
                continue;
            }
            let line = row
                .position()
                .map(|position| position.line())
                .unwrap_or(index as u64 + 2);
            records.push(layout.build_record(&row, line)?);
        }

        if blank_rows > 0 {
            tracing::debug!(blank_rows, "Skipped blank rows");
        }

        Ok(Roster {
            records,
            ignored_columns,
        })
    }
}
