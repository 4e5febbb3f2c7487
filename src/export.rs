//! Tabular export of a processed survey: words, cluster metrics and word frequencies.

use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use chrono::{DateTime, Local};
use clap::ValueEnum;
use csv::WriterBuilder;
use log::info;
use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::extract::{count_words, sort_map_to_vec};
use crate::model::{
    ClusterId, ExtractedWord, SentimentLabel, SurveyAnalysisSummary, SurveyId, thresholds,
};
use crate::store::Store;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExportFormat {
    #[default]
    Csv,
    Tsv,
    Json,
}

impl ExportFormat {
    pub fn extension(&self) -> &'static str {
        match self {
            ExportFormat::Csv => "csv",
            ExportFormat::Tsv => "tsv",
            ExportFormat::Json => "json",
        }
    }
}

///Neutralizes spreadsheet formulas: a cell starting with `=`, `+`, `-`, `@`,
///tab or carriage return gets a leading `'`.
///Cells already starting with `'` are returned unchanged.
/// # Example
/// ```
/// use survey_insights::csv_safe_cell;
/// assert_eq!(csv_safe_cell("=SUM(A1)".to_string()), "'=SUM(A1)");
/// assert_eq!(csv_safe_cell("pool".to_string()), "pool");
/// ```
pub fn csv_safe_cell(cell: String) -> String {
    match cell.chars().next() {
        Some('=' | '+' | '-' | '@' | '\t' | '\r') => format!("'{cell}"),
        _ => cell,
    }
}

#[derive(Debug, Serialize)]
struct WordRow {
    word: String,
    cluster: String,
    cluster_ids: String,
    language: String,
    response_id: u64,
    answer_id: u64,
    sentence_index: Option<usize>,
    sentiment: f64,
    label: &'static str,
    sentence: String,
}

#[derive(Debug, Serialize)]
struct ClusterRow {
    cluster_id: ClusterId,
    name: String,
    frequency: usize,
    response_count: usize,
    sentence_count: usize,
    sentiment: f64,
    nps: Option<f64>,
    category: &'static str,
    label: &'static str,
}

#[derive(Debug, Serialize)]
struct FrequencyRow {
    word: String,
    count: u32,
}

fn word_rows(words: &[ExtractedWord], escape: bool) -> Vec<WordRow> {
    let cell = |s: &str| {
        if escape {
            csv_safe_cell(s.to_string())
        } else {
            s.to_string()
        }
    };
    words
        .iter()
        .map(|w| WordRow {
            word: cell(&w.word),
            cluster: cell(&w.cluster_name),
            cluster_ids: w
                .cluster_ids
                .iter()
                .map(|id| id.to_string())
                .collect::<Vec<_>>()
                .join(";"),
            language: w.language.clone(),
            response_id: w.response_id,
            answer_id: w.answer_id,
            sentence_index: w.sentence_index,
            sentiment: w.sentiment,
            label: SentimentLabel::from_score(w.sentiment, thresholds::EXPORT_WORD).as_str(),
            sentence: cell(&w.sentence_text),
        })
        .collect()
}

fn cluster_rows(summary: &SurveyAnalysisSummary, escape: bool) -> Vec<ClusterRow> {
    // ranked order, most frequent first
    summary
        .top_clusters
        .iter()
        .filter_map(|id| summary.cluster_metrics.get(id).map(|m| (*id, m)))
        .map(|(id, m)| ClusterRow {
            cluster_id: id,
            name: if escape {
                csv_safe_cell(m.name.clone())
            } else {
                m.name.clone()
            },
            frequency: m.frequency,
            response_count: m.response_count,
            sentence_count: m.sentence_count,
            sentiment: m.sentiment,
            nps: m.nps,
            category: m.category.as_str(),
            label: SentimentLabel::from_score(m.sentiment, thresholds::EXPORT_CLUSTER).as_str(),
        })
        .collect()
}

fn frequency_rows(words: &[ExtractedWord], escape: bool) -> Vec<FrequencyRow> {
    let all: Vec<String> = words.iter().map(|w| w.word.clone()).collect();
    sort_map_to_vec(count_words(&all))
        .into_iter()
        .map(|(word, count)| FrequencyRow {
            word: if escape { csv_safe_cell(word) } else { word },
            count,
        })
        .collect()
}

/// `<survey>_<YYYYMMDD_HHMMSS>_<table>.<ext>`
pub fn export_file_name(
    survey_id: SurveyId,
    stamp: &DateTime<Local>,
    table: &str,
    format: ExportFormat,
) -> String {
    format!(
        "{}_{}_{}.{}",
        survey_id,
        stamp.format("%Y%m%d_%H%M%S"),
        table,
        format.extension()
    )
}

fn write_table<T: Serialize>(path: &Path, rows: &[T], format: ExportFormat) -> Result<()> {
    let mut file = BufWriter::new(File::create(path)?);
    match format {
        ExportFormat::Json => {
            serde_json::to_writer_pretty(&mut file, rows)?;
            file.flush()?;
        }
        ExportFormat::Csv | ExportFormat::Tsv => {
            let delimiter = if format == ExportFormat::Tsv { b'\t' } else { b',' };
            let mut wtr = WriterBuilder::new().delimiter(delimiter).from_writer(file);
            for row in rows {
                wtr.serialize(row)?;
            }
            wtr.flush()?;
        }
    }
    Ok(())
}

/// Writes the `words`, `clusters` and `wordfreq` tables of a survey into
/// `out_dir` and returns the written paths in that order.
pub fn export_survey(
    store: &dyn Store,
    summary: &SurveyAnalysisSummary,
    format: ExportFormat,
    out_dir: &Path,
) -> Result<Vec<PathBuf>> {
    let words = store.words_for_survey(summary.survey_id)?;
    fs::create_dir_all(out_dir)?;
    let stamp = Local::now();
    let escape = format != ExportFormat::Json;

    let mut written = Vec::with_capacity(3);
    let path = out_dir.join(export_file_name(summary.survey_id, &stamp, "words", format));
    write_table(&path, &word_rows(&words, escape), format)?;
    written.push(path);

    let path = out_dir.join(export_file_name(summary.survey_id, &stamp, "clusters", format));
    write_table(&path, &cluster_rows(summary, escape), format)?;
    written.push(path);

    let path = out_dir.join(export_file_name(summary.survey_id, &stamp, "wordfreq", format));
    write_table(&path, &frequency_rows(&words, escape), format)?;
    written.push(path);

    info!(
        "Exported survey {} ({} words, {} clusters) to {}",
        summary.survey_id,
        words.len(),
        summary.cluster_metrics.len(),
        out_dir.display()
    );
    Ok(written)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn formula_cells_are_neutralized() {
        assert_eq!(csv_safe_cell("=1+1".into()), "'=1+1");
        assert_eq!(csv_safe_cell("+49 123".into()), "'+49 123");
        assert_eq!(csv_safe_cell("-2".into()), "'-2");
        assert_eq!(csv_safe_cell("@cmd".into()), "'@cmd");
        assert_eq!(csv_safe_cell("'@SAFE".into()), "'@SAFE");
        assert_eq!(csv_safe_cell(String::new()), "");
    }

    #[test]
    fn file_name_layout() {
        let stamp = Local.with_ymd_and_hms(2024, 3, 9, 14, 5, 7).unwrap();
        assert_eq!(
            export_file_name(42, &stamp, "wordfreq", ExportFormat::Tsv),
            "42_20240309_140507_wordfreq.tsv"
        );
    }

    #[test]
    fn tsv_writes_tab_separated_rows() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("freq.tsv");
        let rows = vec![
            FrequencyRow {
                word: csv_safe_cell("=X".into()),
                count: 2,
            },
            FrequencyRow {
                word: "pool".into(),
                count: 1,
            },
        ];
        write_table(&path, &rows, ExportFormat::Tsv).unwrap();
        let content = fs::read_to_string(&path).unwrap();
        let mut lines = content.lines();
        assert_eq!(lines.next(), Some("word\tcount"));
        assert_eq!(lines.next(), Some("'=X\t2"));
        assert_eq!(lines.next(), Some("pool\t1"));
    }
}
