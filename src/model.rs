use std::collections::HashMap;

/// Treatment arm a participant was assigned to. Rows whose label starts
/// with "ref" never produce a record and so never reach this enum.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TreatmentGroup {
    Vaccine,
    Placebo,
}

/// One trial participant, keyed by ptid. The treatment index creates the
/// record empty; the sequence aligner fills `sequence` and the distance
/// joiner fills `distances` (one vector per distance method, indexed the
/// same way as the sequence).
#[derive(Debug, Clone)]
pub struct ParticipantRecord {
    pub id: String,
    pub group: TreatmentGroup,
    pub sequence: Vec<char>,
    pub distances: HashMap<String, Vec<f64>>,
}

impl ParticipantRecord {
    pub fn new(id: &str, group: TreatmentGroup) -> Self {
        ParticipantRecord {
            id: id.to_string(),
            group,
            sequence: Vec::new(),
            distances: HashMap::new(),
        }
    }

    pub fn is_vaccine(&self) -> bool {
        self.group == TreatmentGroup::Vaccine
    }
}

/// The vaccine/reference strain the alignment is numbered against.
/// Identified in the sequence file by a header starting with "reference";
/// the ID is the part of the header after the last '|'. Not a participant
/// and not counted in either group.
#[derive(Debug, Clone, Default)]
pub struct ReferenceRecord {
    pub id: String,
    pub sequence: Vec<char>,
}

/// Bidirectional association between display position labels (reference
/// numbering shown to users) and internal 0-based alignment indices.
/// Derived once from the first (ptid, method) pair of the distance file;
/// the input contract that all participants share the same ordering is
/// not re-validated.
#[derive(Debug, Clone, Default)]
pub struct PositionIndexMap {
    labels: Vec<String>,
    index_of: HashMap<String, usize>,
}

impl PositionIndexMap {
    pub fn from_labels(labels: Vec<String>) -> Self {
        let index_of = labels
            .iter()
            .enumerate()
            .map(|(i, l)| (l.clone(), i))
            .collect();
        PositionIndexMap { labels, index_of }
    }

    /// Internal index for a display label, if the label is known.
    pub fn index_of(&self, label: &str) -> Option<usize> {
        self.index_of.get(label).copied()
    }

    /// Display label for an internal index.
    pub fn label_of(&self, index: usize) -> Option<&str> {
        self.labels.get(index).map(|s| s.as_str())
    }

    pub fn labels(&self) -> &[String] {
        &self.labels
    }

    pub fn len(&self) -> usize {
        self.labels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }
}

/// How a site statistic should be scaled by the display layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScaleKind {
    /// Name matched the p/q-value pattern; bounded above by 1.0.
    Probability,
    /// Anything else; plain linear over the observed range.
    Linear,
}

/// Numeric domain for one (distance method, statistic) pair. Pure derived
/// data: the display layer turns this into an axis scale, the core only
/// reports the numbers.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScaleDescriptor {
    pub kind: ScaleKind,
    pub domain: (f64, f64),
}

/// Per-position Shannon entropies, rounded to two decimals. A group with
/// zero participants keeps an empty vector; that is a valid state, not an
/// error.
#[derive(Debug, Clone, Default)]
pub struct EntropyTable {
    pub full: Vec<f64>,
    pub vaccine: Vec<f64>,
    pub placebo: Vec<f64>,
}

/// distance method -> statistic name -> one value per alignment position.
pub type SiteStatTable = HashMap<String, HashMap<String, Vec<f64>>>;

/// distance method -> statistic name -> scale descriptor.
pub type ScaleTable = HashMap<String, HashMap<String, ScaleDescriptor>>;

/// distance method -> ptid -> one distance per alignment position.
pub type DistanceTable = HashMap<String, HashMap<String, Vec<f64>>>;

/// The merged output of the pipeline. Matrices are position-major by the
/// time this struct exists: one row per alignment position, one entry per
/// sequence. The display layer reads everything here; `selected_sites` is
/// the one list it is expected to keep appending to.
#[derive(Debug, Clone)]
pub struct SieveModel {
    pub participants: HashMap<String, ParticipantRecord>,
    pub reference: ReferenceRecord,
    /// Every parsed sequence, reference and unmatched records included.
    pub cohort_matrix: Vec<Vec<char>>,
    pub vaccine_matrix: Vec<Vec<char>>,
    pub placebo_matrix: Vec<Vec<char>>,
    pub vaccine_count: usize,
    pub placebo_count: usize,
    pub distances: DistanceTable,
    pub position_map: PositionIndexMap,
    pub site_stats: SiteStatTable,
    pub scales: ScaleTable,
    pub entropies: EntropyTable,
    /// Internal indices of the currently selected sites.
    pub selected_sites: Vec<usize>,
}

impl SieveModel {
    /// Number of alignment positions, as seen by the cohort matrix.
    pub fn alignment_length(&self) -> usize {
        self.cohort_matrix.len()
    }

    pub fn scale_for(&self, method: &str, stat: &str) -> Option<&ScaleDescriptor> {
        self.scales.get(method).and_then(|m| m.get(stat))
    }

    pub fn stat_values(&self, method: &str, stat: &str) -> Option<&[f64]> {
        self.site_stats
            .get(method)
            .and_then(|m| m.get(stat))
            .map(|v| v.as_slice())
    }
}

/// Turn a record-major matrix (one row per sequence) into a position-major
/// one (one row per position). Width is taken from the first row; rows
/// shorter than the first contribute nothing at the positions they lack.
/// Transposing twice returns the original matrix for rectangular input.
pub fn transpose<T: Clone>(rows: &[Vec<T>]) -> Vec<Vec<T>> {
    let width = match rows.first() {
        Some(first) => first.len(),
        None => return Vec::new(),
    };
    (0..width)
        .map(|c| rows.iter().filter_map(|r| r.get(c).cloned()).collect())
        .collect()
}
