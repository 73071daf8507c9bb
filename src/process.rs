use crate::model::{
    transpose, DistanceTable, EntropyTable, ParticipantRecord, PositionIndexMap, ReferenceRecord,
    ScaleTable, SieveModel, SiteStatTable, TreatmentGroup,
};
use crate::parse::{
    read_distance_file, read_results_file, read_text_file, read_treatment_file,
    split_fasta_records, DistanceRow, ResultsTable, TreatmentRow,
};
use crate::stats::{
    classify_statistic, joint_entropy, round2, scale_descriptor, PROBABILITY_STAT_PATTERN,
};

use log::{debug, info, warn};
use regex::Regex;
use std::collections::HashMap;
use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum SieveError {
    #[error("failed to open {path}: {source}")]
    Retrieval {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),
    #[error("Parse error: {0}")]
    Parse(String),
}

/// Where and what to read. The four input file names follow the study
/// naming scheme of the upstream analysis pipeline.
#[derive(Debug, Clone)]
pub struct SieveConfig {
    pub data_dir: PathBuf,
    pub study: String,
    pub protein: String,
    pub reference: String,
    pub distance_metric: String,
    /// Display-position labels to pre-select, e.g. from a shared link.
    pub selected_sites: Vec<String>,
}

impl SieveConfig {
    pub fn treatment_path(&self) -> PathBuf {
        self.data_dir.join(format!("{}.trt.csv", self.study))
    }

    pub fn sequence_path(&self) -> PathBuf {
        self.data_dir
            .join(format!("{}.{}.{}.fasta", self.study, self.protein, self.reference))
    }

    pub fn distance_path(&self) -> PathBuf {
        self.data_dir.join(format!(
            "{}.{}.{}.{}.distance.csv",
            self.study, self.protein, self.reference, self.distance_metric
        ))
    }

    pub fn results_path(&self) -> PathBuf {
        self.data_dir.join(format!(
            "{}.{}.{}.{}.results.csv",
            self.study, self.protein, self.reference, self.distance_metric
        ))
    }
}

/// Mutable state threaded through the pipeline stages. The original
/// accumulated all of this in module-level globals; carrying it
/// explicitly lets the pipeline run repeatedly (and in tests) without
/// hidden coupling. `into_model` freezes it once the stages are done.
#[derive(Debug, Default)]
pub struct PipelineContext {
    pub participants: HashMap<String, ParticipantRecord>,
    pub reference: ReferenceRecord,
    /// Record-major until the transpose step, position-major after.
    pub cohort_matrix: Vec<Vec<char>>,
    pub vaccine_matrix: Vec<Vec<char>>,
    pub placebo_matrix: Vec<Vec<char>>,
    pub vaccine_count: usize,
    pub placebo_count: usize,
    pub distances: DistanceTable,
    pub position_map: PositionIndexMap,
    pub site_stats: SiteStatTable,
    pub scales: ScaleTable,
}

impl PipelineContext {
    fn into_model(self, entropies: EntropyTable, selected_sites: Vec<usize>) -> SieveModel {
        SieveModel {
            participants: self.participants,
            reference: self.reference,
            cohort_matrix: self.cohort_matrix,
            vaccine_matrix: self.vaccine_matrix,
            placebo_matrix: self.placebo_matrix,
            vaccine_count: self.vaccine_count,
            placebo_count: self.placebo_count,
            distances: self.distances,
            position_map: self.position_map,
            site_stats: self.site_stats,
            scales: self.scales,
            entropies,
            selected_sites,
        }
    }
}

/// Stage 1: participant ID -> fresh record with treatment group. Rows
/// whose label starts with "ref" (any case) are the reference strain's
/// own assignment and are excluded. Labels starting with "p" are placebo,
/// everything else vaccine. Duplicate IDs keep the last row.
pub fn build_treatment_index(rows: &[TreatmentRow]) -> HashMap<String, ParticipantRecord> {
    let mut index = HashMap::new();
    for row in rows {
        let label = row.treatment.to_lowercase();
        if label.starts_with("ref") {
            continue;
        }
        let group = if label.starts_with('p') {
            TreatmentGroup::Placebo
        } else {
            TreatmentGroup::Vaccine
        };
        if index
            .insert(row.ptid.clone(), ParticipantRecord::new(&row.ptid, group))
            .is_some()
        {
            warn!(
                "treatment file: duplicate participant id '{}', keeping the last row",
                row.ptid
            );
        }
    }
    index
}

/// Stage 2: parse the sequence text and classify each record against the
/// treatment index. Every parsed sequence lands in the cohort matrix,
/// including the reference and records with no treatment entry; only
/// matched participants reach the group matrices and counters.
pub fn align_sequences(text: &str, ctx: &mut PipelineContext) {
    for record in split_fasta_records(text) {
        ctx.cohort_matrix.push(record.tokens.clone());
        if record.header.starts_with("reference") {
            let id = record
                .header
                .rsplit('|')
                .next()
                .unwrap_or(record.header.as_str())
                .to_string();
            ctx.reference = ReferenceRecord {
                id,
                sequence: record.tokens,
            };
        } else if let Some(participant) = ctx.participants.get_mut(&record.header) {
            participant.sequence = record.tokens.clone();
            match participant.group {
                TreatmentGroup::Vaccine => {
                    ctx.vaccine_matrix.push(record.tokens);
                    ctx.vaccine_count += 1;
                }
                TreatmentGroup::Placebo => {
                    ctx.placebo_matrix.push(record.tokens);
                    ctx.placebo_count += 1;
                }
            }
        } else {
            warn!(
                "sequence file: header '{}' has no treatment entry, dropped from group matrices",
                record.header
            );
        }
    }
}

/// Stage 3: nest distances by method then participant, copy each
/// participant's vectors onto its record, and derive the position index
/// map from the rows of the file's first (ptid, method) pair. Row order
/// within a group is the position order; that is an input contract and
/// is not validated here.
pub fn join_distances(rows: &[DistanceRow], ctx: &mut PipelineContext) {
    for row in rows {
        ctx.distances
            .entry(row.method.clone())
            .or_default()
            .entry(row.ptid.clone())
            .or_default()
            .push(row.distance);
    }

    for (method, per_ptid) in &ctx.distances {
        for (ptid, values) in per_ptid {
            match ctx.participants.get_mut(ptid) {
                Some(participant) => {
                    participant.distances.insert(method.clone(), values.clone());
                }
                None => {
                    warn!(
                        "distance file: participant '{}' ({}) has no treatment entry",
                        ptid, method
                    );
                }
            }
        }
    }

    if let Some(first) = rows.first() {
        let labels: Vec<String> = rows
            .iter()
            .filter(|r| r.ptid == first.ptid && r.method == first.method)
            .map(|r| r.display_position.clone())
            .collect();
        ctx.position_map = PositionIndexMap::from_labels(labels);
    }
}

/// Stage 4: nest statistic values by method and name, in row order, and
/// attach a scale descriptor per (method, statistic) pair. The
/// probability pattern is a configurable classification rule.
pub fn aggregate_results(table: &ResultsTable, pattern: &Regex, ctx: &mut PipelineContext) {
    for row in &table.rows {
        let per_stat = ctx.site_stats.entry(row.method.clone()).or_default();
        for (stat, value) in table.stats.iter().zip(&row.values) {
            per_stat.entry(stat.clone()).or_default().push(*value);
        }
    }

    for (method, per_stat) in &ctx.site_stats {
        let scales = ctx.scales.entry(method.clone()).or_default();
        for (stat, values) in per_stat {
            let kind = classify_statistic(stat, pattern);
            scales.insert(stat.clone(), scale_descriptor(kind, values));
        }
    }
}

/// Stage 5: per-position entropy for the cohort and both groups. The
/// matrices must already be position-major. Each group normalizes by its
/// own size; a group with no sequences keeps an empty vector.
pub fn compute_entropies(ctx: &PipelineContext) -> EntropyTable {
    let cohort_n = ctx.vaccine_count + ctx.placebo_count;
    let mut table = EntropyTable::default();
    for i in 0..ctx.cohort_matrix.len() {
        table
            .full
            .push(round2(joint_entropy(&[i], &ctx.cohort_matrix, cohort_n)));
    }
    for i in 0..ctx.vaccine_matrix.len() {
        table.vaccine.push(round2(joint_entropy(
            &[i],
            &ctx.vaccine_matrix,
            ctx.vaccine_count,
        )));
    }
    for i in 0..ctx.placebo_matrix.len() {
        table.placebo.push(round2(joint_entropy(
            &[i],
            &ctx.placebo_matrix,
            ctx.placebo_count,
        )));
    }
    table
}

/// Translate display-position labels into internal indices, dropping any
/// label the position map does not know.
pub fn translate_selected_sites(labels: &[String], map: &PositionIndexMap) -> Vec<usize> {
    let mut sites = Vec::new();
    for label in labels {
        match map.index_of(label) {
            Some(idx) => sites.push(idx),
            None => warn!("selected site '{}' is not a known display position, ignored", label),
        }
    }
    sites
}

/// Run the whole pipeline: treatment, sequence, distance, results,
/// transpose, entropy, selected-site merge, in that order. Each stage's
/// file is read only after the previous stage has completed, because
/// each stage classifies against state the prior one built. Any failure
/// aborts the run; the model is returned only when everything parsed.
pub fn run_pipeline(config: &SieveConfig) -> Result<SieveModel, SieveError> {
    let mut ctx = PipelineContext::default();

    info!("reading treatment assignments from {}", config.treatment_path().display());
    let treatment_rows = read_treatment_file(&config.treatment_path())?;
    ctx.participants = build_treatment_index(&treatment_rows);
    debug!("treatment index holds {} participants", ctx.participants.len());

    info!("reading aligned sequences from {}", config.sequence_path().display());
    let fasta_text = read_text_file(&config.sequence_path())?;
    align_sequences(&fasta_text, &mut ctx);
    debug!(
        "aligned {} sequences ({} vaccine, {} placebo)",
        ctx.cohort_matrix.len(),
        ctx.vaccine_count,
        ctx.placebo_count
    );

    info!("reading per-site distances from {}", config.distance_path().display());
    let distance_rows = read_distance_file(&config.distance_path())?;
    join_distances(&distance_rows, &mut ctx);

    info!("reading site statistics from {}", config.results_path().display());
    let results = read_results_file(&config.results_path())?;
    aggregate_results(&results, &PROBABILITY_STAT_PATTERN, &mut ctx);

    // All downstream consumers index by position, not by participant.
    ctx.cohort_matrix = transpose(&ctx.cohort_matrix);
    ctx.vaccine_matrix = transpose(&ctx.vaccine_matrix);
    ctx.placebo_matrix = transpose(&ctx.placebo_matrix);

    let entropies = compute_entropies(&ctx);
    let selected = translate_selected_sites(&config.selected_sites, &ctx.position_map);

    info!("pipeline complete, model ready");
    Ok(ctx.into_model(entropies, selected))
}
