use crate::process::SieveError;

use csv::StringRecord;
use flate2::read::MultiGzDecoder;
use std::fs::File;
use std::io::{BufRead, BufReader, Read};
use std::path::{Path, PathBuf};

/// One row of the treatment assignment file.
#[derive(Debug, Clone)]
pub struct TreatmentRow {
    pub ptid: String,
    pub treatment: String,
}

/// One row of the per-site distance file.
#[derive(Debug, Clone)]
pub struct DistanceRow {
    pub ptid: String,
    pub method: String,
    pub display_position: String,
    pub distance: f64,
}

/// One record of the sequence file: trimmed header plus the sequence
/// split into one token per alignment position.
#[derive(Debug, Clone)]
pub struct FastaRecord {
    pub header: String,
    pub tokens: Vec<char>,
}

/// The parsed results file. The first three columns of each row are
/// metadata; everything after is a named statistic. The statistic column
/// set is determined once from the header.
#[derive(Debug, Clone)]
pub struct ResultsTable {
    pub stats: Vec<String>,
    pub rows: Vec<ResultsRow>,
}

/// One results row: the distance method it belongs to plus the statistic
/// values, parallel to `ResultsTable::stats`.
#[derive(Debug, Clone)]
pub struct ResultsRow {
    pub method: String,
    pub values: Vec<f64>,
}

/// Resolve an input path, falling back to a sibling `.gz` file when the
/// plain path does not exist.
fn resolve_input(path: &Path) -> PathBuf {
    if path.exists() {
        return path.to_path_buf();
    }
    let mut gz = path.as_os_str().to_owned();
    gz.push(".gz");
    let gz = PathBuf::from(gz);
    if gz.exists() {
        gz
    } else {
        path.to_path_buf()
    }
}

/// Open an input file, decompressing transparently if it ends in `.gz`.
pub fn open_reader(path: &Path) -> Result<Box<dyn BufRead>, SieveError> {
    let resolved = resolve_input(path);
    let file = File::open(&resolved).map_err(|source| SieveError::Retrieval {
        path: resolved.clone(),
        source,
    })?;
    if resolved.extension().and_then(|s| s.to_str()) == Some("gz") {
        Ok(Box::new(BufReader::new(MultiGzDecoder::new(file))))
    } else {
        Ok(Box::new(BufReader::new(file)))
    }
}

/// Read a whole input file into memory (used for the sequence file, which
/// is not line-structured).
pub fn read_text_file(path: &Path) -> Result<String, SieveError> {
    let mut reader = open_reader(path)?;
    let mut text = String::new();
    reader.read_to_string(&mut text)?;
    Ok(text)
}

fn column_index(headers: &StringRecord, name: &str, file: &str) -> Result<usize, SieveError> {
    headers
        .iter()
        .position(|h| h == name)
        .ok_or_else(|| SieveError::Parse(format!("{} file: missing column '{}'", file, name)))
}

fn field<'a>(
    record: &'a StringRecord,
    idx: usize,
    name: &str,
    file: &str,
    row: usize,
) -> Result<&'a str, SieveError> {
    record.get(idx).ok_or_else(|| {
        SieveError::Parse(format!("{} file: row {}: missing column '{}'", file, row, name))
    })
}

fn numeric(value: &str, name: &str, file: &str, row: usize) -> Result<f64, SieveError> {
    value.trim().parse().map_err(|_| {
        SieveError::Parse(format!(
            "{} file: row {}: column '{}' is not numeric: '{}'",
            file, row, name, value
        ))
    })
}

/// Parse the treatment assignment file (columns `ptid`, `treatment`).
pub fn read_treatment_file(path: &Path) -> Result<Vec<TreatmentRow>, SieveError> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .from_reader(open_reader(path)?);
    let headers = reader.headers()?.clone();
    let ptid_idx = column_index(&headers, "ptid", "treatment")?;
    let trt_idx = column_index(&headers, "treatment", "treatment")?;

    let mut rows = Vec::new();
    for (i, result) in reader.records().enumerate() {
        let record = result?;
        // header occupies row 1
        let row = i + 2;
        rows.push(TreatmentRow {
            ptid: field(&record, ptid_idx, "ptid", "treatment", row)?.to_string(),
            treatment: field(&record, trt_idx, "treatment", "treatment", row)?.to_string(),
        });
    }
    Ok(rows)
}

/// Parse the distance file (columns `ptid`, `distance_method`,
/// `display_position`, `distance`). Row order is the position order
/// within each (method, ptid) group; that contract is the input's, not
/// re-derived here.
pub fn read_distance_file(path: &Path) -> Result<Vec<DistanceRow>, SieveError> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .from_reader(open_reader(path)?);
    let headers = reader.headers()?.clone();
    let ptid_idx = column_index(&headers, "ptid", "distance")?;
    let method_idx = column_index(&headers, "distance_method", "distance")?;
    let pos_idx = column_index(&headers, "display_position", "distance")?;
    let dist_idx = column_index(&headers, "distance", "distance")?;

    let mut rows = Vec::new();
    for (i, result) in reader.records().enumerate() {
        let record = result?;
        let row = i + 2;
        let raw = field(&record, dist_idx, "distance", "distance", row)?;
        rows.push(DistanceRow {
            ptid: field(&record, ptid_idx, "ptid", "distance", row)?.to_string(),
            method: field(&record, method_idx, "distance_method", "distance", row)?.to_string(),
            display_position: field(&record, pos_idx, "display_position", "distance", row)?
                .to_string(),
            distance: numeric(raw, "distance", "distance", row)?,
        });
    }
    Ok(rows)
}

/// Parse the results file. Columns after the first three are statistics;
/// the `distance_method` column must be one of the metadata columns.
pub fn read_results_file(path: &Path) -> Result<ResultsTable, SieveError> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .from_reader(open_reader(path)?);
    let headers = reader.headers()?.clone();
    let method_idx = column_index(&headers, "distance_method", "results")?;
    let stats: Vec<String> = headers.iter().skip(3).map(String::from).collect();

    let mut rows = Vec::new();
    for (i, result) in reader.records().enumerate() {
        let record = result?;
        let row = i + 2;
        let method = field(&record, method_idx, "distance_method", "results", row)?.to_string();
        let mut values = Vec::with_capacity(stats.len());
        for (offset, stat) in stats.iter().enumerate() {
            let raw = field(&record, offset + 3, stat, "results", row)?;
            values.push(numeric(raw, stat, "results", row)?);
        }
        rows.push(ResultsRow { method, values });
    }
    Ok(ResultsTable { stats, rows })
}

/// Split FASTA-like text into records. Both '>' and ';' delimit records
/// (runs of either count once); the header is everything before the first
/// newline, trimmed, and the sequence is the remainder with line breaks
/// stripped. Empty chunks between delimiters are skipped.
pub fn split_fasta_records(text: &str) -> Vec<FastaRecord> {
    text.split(|c| c == '>' || c == ';')
        .filter(|chunk| !chunk.is_empty())
        .map(|chunk| {
            let (header, body) = match chunk.find('\n') {
                Some(nl) => (&chunk[..nl], &chunk[nl + 1..]),
                None => (chunk, ""),
            };
            FastaRecord {
                header: header.trim().to_string(),
                tokens: body.chars().filter(|c| *c != '\n' && *c != '\r').collect(),
            }
        })
        .collect()
}
