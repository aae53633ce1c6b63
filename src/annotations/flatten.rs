use std::fmt::Display;
use std::io::Write;
use std::path::{Path, PathBuf};

use tracing::{debug, info};

use super::export::{create_output, TsvWriter};
use super::{
    AnnotationError, AnnotationTable, FrequencyIndex, ProjectedRecord, Projector, REGION_FLAGS,
};

/// Ancestry labels exported by default, in column order.
pub const DEFAULT_ANCESTRY_LABELS: [&str; 8] =
    ["afr", "amr", "asj", "eas", "fin", "nfe", "sas", "oth"];
/// Frequency group used for the overall and per-ancestry entries.
pub const DEFAULT_FREQ_GROUP: &str = "adj";
/// Globals struct holding the joint frequency metadata.
pub const DEFAULT_GLOBALS_FIELD: &str = "joint_globals";

/// Columns preceding the per-ancestry columns, in export order.
pub const FIXED_COLUMNS: [&str; 25] = [
    "locus",
    "alleles",
    "ref",
    "alt",
    "is_snp",
    "joint_AF",
    "joint_AC",
    "joint_AN",
    "joint_grpmax_AF",
    "joint_grpmax_AC",
    "joint_grpmax_AN",
    "joint_grpmax_gen_anc",
    "joint_faf95",
    "joint_faf99",
    "joint_faf95_max",
    "joint_faf95_max_gen_anc",
    "joint_faf99_max",
    "joint_faf99_max_gen_anc",
    REGION_FLAGS[0],
    REGION_FLAGS[1],
    REGION_FLAGS[2],
    REGION_FLAGS[3],
    REGION_FLAGS[4],
    "freq_cong_pval",
    "freq_cmh_pval",
];

/// Missing-value marker in exported files.
pub const MISSING: &str = "NA";

/// Settings for the annotation flattener.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FlattenConfig {
    /// Ancestry labels to export, in column order.
    pub ancestry_labels: Vec<String>,
    /// Frequency group (`adj`, `raw`, ...).
    pub freq_group: String,
    /// Globals struct holding the index dictionaries.
    pub globals_field: String,
}

impl Default for FlattenConfig {
    fn default() -> Self {
        Self {
            ancestry_labels: DEFAULT_ANCESTRY_LABELS.iter().map(|s| s.to_string()).collect(),
            freq_group: DEFAULT_FREQ_GROUP.to_string(),
            globals_field: DEFAULT_GLOBALS_FIELD.to_string(),
        }
    }
}

impl FlattenConfig {
    /// Override ancestry labels.
    pub fn with_ancestry_labels<S, I>(mut self, labels: I) -> Self
    where
        S: Into<String>,
        I: IntoIterator<Item = S>,
    {
        self.ancestry_labels = labels.into_iter().map(Into::into).collect();
        self
    }

    /// Override the frequency group.
    pub fn with_freq_group(mut self, group: impl Into<String>) -> Self {
        self.freq_group = group.into();
        self
    }

    /// Override the globals struct name.
    pub fn with_globals_field(mut self, field: impl Into<String>) -> Self {
        self.globals_field = field.into();
        self
    }

    /// Reject empty or duplicate labels and empty names.
    pub fn validate(&self) -> Result<(), AnnotationError> {
        if self.freq_group.trim().is_empty() {
            return Err(AnnotationError::InvalidConfig("empty frequency group".into()));
        }
        if self.globals_field.trim().is_empty() {
            return Err(AnnotationError::InvalidConfig("empty globals field".into()));
        }
        for (idx, label) in self.ancestry_labels.iter().enumerate() {
            if label.trim().is_empty() || label.contains(char::is_whitespace) {
                return Err(AnnotationError::InvalidConfig(format!(
                    "invalid ancestry label '{label}'"
                )));
            }
            if self.ancestry_labels[..idx].contains(label) {
                return Err(AnnotationError::InvalidConfig(format!(
                    "duplicate ancestry label '{label}'"
                )));
            }
        }
        Ok(())
    }

    /// Full header: fixed columns then `{label}_AF`, `{label}_AC`, `{label}_AN`.
    pub fn columns(&self) -> Vec<String> {
        let mut columns: Vec<String> = FIXED_COLUMNS.iter().map(|c| c.to_string()).collect();
        for label in &self.ancestry_labels {
            columns.push(format!("{label}_AF"));
            columns.push(format!("{label}_AC"));
            columns.push(format!("{label}_AN"));
        }
        columns
    }
}

/// One exported row.
#[derive(Debug, Clone, PartialEq)]
pub struct FlatRow {
    /// Row key: locus.
    pub locus: String,
    /// Row key: alleles as a JSON array.
    pub alleles: String,
    /// Reference allele.
    pub ref_allele: String,
    /// First alternate allele.
    pub alt_allele: String,
    /// Whether the variant is a SNP.
    pub is_snp: bool,
    /// Overall joint frequency `(AF, AC, AN)`.
    pub joint: (Option<f64>, Option<i64>, Option<i64>),
    /// Joint group-max `(AF, AC, AN, gen_anc)`.
    pub grpmax: (Option<f64>, Option<i64>, Option<i64>, Option<String>),
    /// Overall joint `(faf95, faf99)`.
    pub faf: (Option<f64>, Option<f64>),
    /// Joint FAF maxima `(faf95_max, faf95_max_gen_anc, faf99_max, faf99_max_gen_anc)`.
    pub fafmax: (Option<f64>, Option<String>, Option<f64>, Option<String>),
    /// Region flags in export order.
    pub region_flags: [Option<bool>; 5],
    /// Contingency-table test p-value.
    pub freq_cong_pval: Option<f64>,
    /// Cochran-Mantel-Haenszel test p-value.
    pub freq_cmh_pval: Option<f64>,
    /// Per-ancestry `(AF, AC, AN)` in label order.
    pub ancestry: Vec<(Option<f64>, Option<i64>, Option<i64>)>,
}

impl FlatRow {
    /// Flatten a projected record using resolved array positions.
    pub fn from_record(record: &ProjectedRecord, index: &FrequencyIndex) -> Self {
        let joint = &record.joint;
        let overall = joint.freq_at(index.overall());
        let overall_faf = joint.faf_at(index.faf_overall());
        let grpmax = joint.grpmax.as_ref();
        let fafmax = joint.fafmax.as_ref();
        let ref_allele = record.alleles[0].clone();
        let alt_allele = record.alleles[1].clone();

        Self {
            locus: record.locus.to_string(),
            alleles: serde_json::Value::from(record.alleles.clone()).to_string(),
            is_snp: is_snp(&ref_allele, &alt_allele),
            ref_allele,
            alt_allele,
            joint: (
                overall.and_then(|f| f.af),
                overall.and_then(|f| f.ac),
                overall.and_then(|f| f.an),
            ),
            grpmax: (
                grpmax.and_then(|g| g.af),
                grpmax.and_then(|g| g.ac),
                grpmax.and_then(|g| g.an),
                grpmax.and_then(|g| g.gen_anc.clone()),
            ),
            faf: (
                overall_faf.and_then(|f| f.faf95),
                overall_faf.and_then(|f| f.faf99),
            ),
            fafmax: (
                fafmax.and_then(|f| f.faf95_max),
                fafmax.and_then(|f| f.faf95_max_gen_anc.clone()),
                fafmax.and_then(|f| f.faf99_max),
                fafmax.and_then(|f| f.faf99_max_gen_anc.clone()),
            ),
            region_flags: record.region_flags,
            freq_cong_pval: record.freq_comparison.contingency_pval,
            freq_cmh_pval: record.freq_comparison.cmh_pval,
            ancestry: index
                .ancestry()
                .iter()
                .map(|anc| {
                    let entry = joint.freq_at(anc.index);
                    (
                        entry.and_then(|f| f.af),
                        entry.and_then(|f| f.ac),
                        entry.and_then(|f| f.an),
                    )
                })
                .collect(),
        }
    }

    /// Render the row as TSV fields in header order.
    pub fn to_fields(&self) -> Vec<String> {
        let mut fields = Vec::with_capacity(FIXED_COLUMNS.len() + self.ancestry.len() * 3);
        fields.push(self.locus.clone());
        fields.push(self.alleles.clone());
        fields.push(self.ref_allele.clone());
        fields.push(self.alt_allele.clone());
        fields.push(self.is_snp.to_string());
        fields.push(float_field(self.joint.0));
        fields.push(field(self.joint.1));
        fields.push(field(self.joint.2));
        fields.push(float_field(self.grpmax.0));
        fields.push(field(self.grpmax.1));
        fields.push(field(self.grpmax.2));
        fields.push(field(self.grpmax.3.as_deref()));
        fields.push(float_field(self.faf.0));
        fields.push(float_field(self.faf.1));
        fields.push(float_field(self.fafmax.0));
        fields.push(field(self.fafmax.1.as_deref()));
        fields.push(float_field(self.fafmax.2));
        fields.push(field(self.fafmax.3.as_deref()));
        fields.extend(self.region_flags.iter().map(|flag| field(*flag)));
        fields.push(float_field(self.freq_cong_pval));
        fields.push(float_field(self.freq_cmh_pval));
        for (af, ac, an) in &self.ancestry {
            fields.push(float_field(*af));
            fields.push(field(*ac));
            fields.push(field(*an));
        }
        fields
    }
}

fn field<T: Display>(value: Option<T>) -> String {
    value.map_or_else(|| MISSING.to_string(), |v| v.to_string())
}

/// Floats render like `f64` `Display` except infinities, which use the
/// `Infinity` / `-Infinity` spelling the row reader accepts.
fn float_field(value: Option<f64>) -> String {
    match value {
        Some(v) if v == f64::INFINITY => "Infinity".to_string(),
        Some(v) if v == f64::NEG_INFINITY => "-Infinity".to_string(),
        other => field(other),
    }
}

/// Whether `alt` is a single-base substitution of `reference`.
///
/// Alleles of equal length differing at exactly one position count as SNPs,
/// so `AC>AT` is a SNP. Symbolic and star alleles never are.
pub fn is_snp(reference: &str, alt: &str) -> bool {
    let symbolic = |a: &str| a == "*" || a.starts_with('<') || a.contains(['[', ']']);
    if reference.is_empty() || symbolic(reference) || symbolic(alt) {
        return false;
    }
    if reference.len() != alt.len() {
        return false;
    }
    reference
        .bytes()
        .zip(alt.bytes())
        .filter(|(r, a)| !r.eq_ignore_ascii_case(a))
        .count()
        == 1
}

/// Outcome of a flatten run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FlattenReport {
    /// Rows written (equal to rows read).
    pub rows: usize,
    /// Exported column names.
    pub columns: Vec<String>,
    /// Output path.
    pub output: PathBuf,
}

/// Projects nested annotation tables into a flat TSV.
#[derive(Debug, Clone)]
pub struct AnnotationFlattener {
    config: FlattenConfig,
}

impl AnnotationFlattener {
    /// Create a flattener, validating its configuration.
    pub fn new(config: FlattenConfig) -> Result<Self, AnnotationError> {
        config.validate()?;
        Ok(Self { config })
    }

    /// Active configuration.
    pub fn config(&self) -> &FlattenConfig {
        &self.config
    }

    /// Resolve array positions for `table` from its globals.
    pub fn frequency_index(
        &self,
        table: &AnnotationTable,
    ) -> Result<FrequencyIndex, AnnotationError> {
        FrequencyIndex::from_globals(
            table.globals(),
            &self.config.globals_field,
            &self.config.freq_group,
            &self.config.ancestry_labels,
        )
    }

    /// Flatten the table at `table_dir` into `output` (BGZF when the name
    /// ends in `.bgz` or `.gz`). An existing file is overwritten.
    pub fn flatten<P: AsRef<Path>, Q: AsRef<Path>>(
        &self,
        table_dir: P,
        output: Q,
    ) -> Result<FlattenReport, AnnotationError> {
        let output = output.as_ref();
        info!(table = %table_dir.as_ref().display(), "reading annotation table");
        let table = AnnotationTable::open(table_dir)?;
        let index = self.frequency_index(&table)?;

        debug!(
            overall = index.overall(),
            faf_overall = index.faf_overall(),
            ancestry = ?index.ancestry(),
            "resolved frequency positions"
        );

        let sink = create_output(output)?;
        info!(output = %output.display(), "exporting flattened annotations");
        let writer = TsvWriter::new(sink, output, &self.config.columns())?;
        let rows = self.write_rows(&table, &index, writer)?;

        info!(rows, "annotation export complete");
        Ok(FlattenReport {
            rows,
            columns: self.config.columns(),
            output: output.to_path_buf(),
        })
    }

    fn write_rows<W: Write>(
        &self,
        table: &AnnotationTable,
        index: &FrequencyIndex,
        mut writer: TsvWriter<W>,
    ) -> Result<usize, AnnotationError> {
        for row in table.rows()? {
            let row = row?;
            let projector = Projector::new(row.line);
            let record = projector.record(&row.value)?;
            index.check_row(&record, row.line)?;
            writer.write_row(&FlatRow::from_record(&record, index).to_fields())?;
        }
        writer.finish()
    }
}
