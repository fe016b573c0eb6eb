//! Summary of an EVA submission spreadsheet: project title, analyses,
//! reference genomes and samples.

use std::path::Path;

use calamine::{Data, Range, Reader, open_workbook_auto};

const PROJECT_TITLE: &[&str] = &["project title"];
const ANALYSIS_KEYS: &[&str] = &["analysis alias", "analysis title"];
const REFERENCE: &[&str] = &["reference"];
const SAMPLE_KEYS: &[&str] = &["sample name", "sample id", "sample accession"];

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MetadataSummary {
    pub project_title: Option<String>,
    pub number_analysis: usize,
    pub references: Vec<String>,
    pub number_samples: usize,
}

pub fn read_metadata(path: &Path) -> Result<MetadataSummary, calamine::Error> {
    let mut workbook = open_workbook_auto(path)?;
    let names = workbook.sheet_names();
    let mut sheet = |wanted: &str| -> Result<Option<Range<Data>>, calamine::Error> {
        match names.iter().find(|n| n.trim().eq_ignore_ascii_case(wanted)) {
            Some(name) => workbook.worksheet_range(name).map(Some),
            None => Ok(None),
        }
    };

    let project = sheet("Project")?;
    let analysis = sheet("Analysis")?;
    let sample = sheet("Sample")?;
    Ok(summarize(project.as_ref(), analysis.as_ref(), sample.as_ref()))
}

pub fn summarize(
    project: Option<&Range<Data>>,
    analysis: Option<&Range<Data>>,
    sample: Option<&Range<Data>>,
) -> MetadataSummary {
    let project_title = project
        .and_then(|r| Table::find(r, PROJECT_TITLE))
        .and_then(|t| t.rows.into_iter().find_map(|row| row.value(PROJECT_TITLE)));

    let analyses = analysis
        .and_then(|r| Table::find(r, ANALYSIS_KEYS))
        .map(|t| t.rows)
        .unwrap_or_default();
    let mut references: Vec<String> = Vec::new();
    for row in &analyses {
        if let Some(reference) = row.value(REFERENCE) {
            if !references.contains(&reference) {
                references.push(reference);
            }
        }
    }

    let number_samples = sample
        .and_then(|r| Table::find(r, SAMPLE_KEYS))
        .map_or(0, |t| t.rows.len());

    MetadataSummary {
        project_title,
        number_analysis: analyses.len(),
        references,
        number_samples,
    }
}

/// Data rows under the first header row that names one of the key columns.
/// Rows with every key column blank are skipped.
struct Table {
    rows: Vec<Row>,
}

struct Row {
    cells: Vec<(String, String)>,
}

impl Row {
    fn value(&self, headers: &[&str]) -> Option<String> {
        self.cells
            .iter()
            .find(|(h, v)| headers.contains(&h.as_str()) && !v.is_empty())
            .map(|(_, v)| v.clone())
    }
}

impl Table {
    fn find(range: &Range<Data>, keys: &[&str]) -> Option<Self> {
        let mut rows = range.rows();
        let header: Vec<String> = rows
            .by_ref()
            .map(|row| row.iter().map(|c| cell_text(c).to_lowercase()).collect::<Vec<_>>())
            .find(|row| row.iter().any(|h| keys.contains(&h.as_str())))?;

        let rows = rows
            .map(|row| Row {
                cells: header
                    .iter()
                    .cloned()
                    .zip(row.iter().map(cell_text))
                    .collect(),
            })
            .filter(|row| row.value(keys).is_some())
            .collect();
        Some(Self { rows })
    }
}

fn cell_text(cell: &Data) -> String {
    match cell {
        Data::Empty => String::new(),
        Data::String(s) => s.trim().to_owned(),
        other => other.to_string().trim().to_owned(),
    }
}
