//! Projection of nested annotation records into typed cohort blocks.
//!
//! A key that is absent from a record is a schema error and fails the job; a
//! key whose value is `null` is a missing value. Missing structs propagate:
//! every field below them is missing too.

use serde_json::Value;

use super::AnnotationError;
use crate::genomics::Locus;

/// Cohort blocks carried by every record.
pub const COHORTS: [&str; 3] = ["joint", "exomes", "genomes"];

/// Boolean region flags exported as columns, in export order.
pub const REGION_FLAGS: [&str; 5] = [
    "fail_interval_qc",
    "outside_broad_capture_region",
    "outside_ukb_capture_region",
    "not_called_in_exomes",
    "not_called_in_genomes",
];

/// Per-group frequency entry.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FreqEntry {
    /// Allele count.
    pub ac: Option<i64>,
    /// Allele frequency.
    pub af: Option<f64>,
    /// Allele number.
    pub an: Option<i64>,
    /// Homozygote count.
    pub homozygote_count: Option<i64>,
}

/// Filtering allele frequency entry.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FafEntry {
    /// 95% confidence FAF.
    pub faf95: Option<f64>,
    /// 99% confidence FAF.
    pub faf99: Option<f64>,
}

/// Maximum FAF across genetic ancestry groups.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FafMax {
    /// Maximum 95% FAF.
    pub faf95_max: Option<f64>,
    /// Group reaching `faf95_max`.
    pub faf95_max_gen_anc: Option<String>,
    /// Maximum 99% FAF.
    pub faf99_max: Option<f64>,
    /// Group reaching `faf99_max`.
    pub faf99_max_gen_anc: Option<String>,
}

/// Frequency record of the group with the highest allele frequency.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct GrpMax {
    /// Allele count.
    pub ac: Option<i64>,
    /// Allele frequency.
    pub af: Option<f64>,
    /// Allele number.
    pub an: Option<i64>,
    /// Homozygote count.
    pub homozygote_count: Option<i64>,
    /// Genetic ancestry group label.
    pub gen_anc: Option<String>,
}

/// Selected fields of one cohort (`joint`, `exomes`, or `genomes`).
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CohortBlock {
    /// Frequency array, ordered as described by the table's `freq_index_dict`.
    pub freq: Option<Vec<Option<FreqEntry>>>,
    /// FAF array, ordered as described by the table's `faf_index_dict`.
    pub faf: Option<Vec<Option<FafEntry>>>,
    /// FAF maxima.
    pub fafmax: Option<FafMax>,
    /// Group-max record.
    pub grpmax: Option<GrpMax>,
}

impl CohortBlock {
    /// Frequency entry at `index`; missing when the array or entry is missing.
    pub fn freq_at(&self, index: usize) -> Option<&FreqEntry> {
        self.freq.as_ref()?.get(index)?.as_ref()
    }

    /// FAF entry at `index`; missing when the array or entry is missing.
    pub fn faf_at(&self, index: usize) -> Option<&FafEntry> {
        self.faf.as_ref()?.get(index)?.as_ref()
    }
}

/// Exome/genome comparison p-values.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FreqComparison {
    /// `contingency_table_test[0].p_value`.
    pub contingency_pval: Option<f64>,
    /// `cochran_mantel_haenszel_test.p_value`.
    pub cmh_pval: Option<f64>,
}

/// A record reduced to the fields the flattener uses.
#[derive(Debug, Clone, PartialEq)]
pub struct ProjectedRecord {
    /// Row key: locus.
    pub locus: Locus,
    /// Row key: alleles, reference first.
    pub alleles: Vec<String>,
    /// Region flags in [`REGION_FLAGS`] order.
    pub region_flags: [Option<bool>; 5],
    /// Joint cohort.
    pub joint: CohortBlock,
    /// Exome cohort.
    pub exomes: CohortBlock,
    /// Genome cohort.
    pub genomes: CohortBlock,
    /// Comparison statistics.
    pub freq_comparison: FreqComparison,
}

/// Field access bound to a row number for error reporting.
#[derive(Debug, Clone, Copy)]
pub struct Projector {
    row: usize,
}

impl Projector {
    /// Projector reporting errors against `row` (1-based line number).
    pub fn new(row: usize) -> Self {
        Self { row }
    }

    /// Walk `path` from `value`. `Ok(None)` means a missing value on the way.
    pub fn field<'a>(
        &self,
        value: &'a Value,
        path: &[&str],
    ) -> Result<Option<&'a Value>, AnnotationError> {
        let mut current = value;
        for (depth, key) in path.iter().enumerate() {
            match current {
                Value::Null => return Ok(None),
                Value::Object(map) => {
                    current = map
                        .get(*key)
                        .ok_or_else(|| self.missing(&path[..=depth]))?;
                }
                _ => return Err(self.mismatch(&path[..depth], "struct")),
            }
        }
        Ok(match current {
            Value::Null => None,
            other => Some(other),
        })
    }

    /// Integer field.
    pub fn int(&self, value: &Value, path: &[&str]) -> Result<Option<i64>, AnnotationError> {
        match self.field(value, path)? {
            None => Ok(None),
            Some(v) => v
                .as_i64()
                .map(Some)
                .ok_or_else(|| self.mismatch(path, "integer")),
        }
    }

    /// Float field; `"NaN"` and `"Infinity"` strings are accepted.
    pub fn float(&self, value: &Value, path: &[&str]) -> Result<Option<f64>, AnnotationError> {
        match self.field(value, path)? {
            None => Ok(None),
            Some(Value::Number(n)) => n
                .as_f64()
                .map(Some)
                .ok_or_else(|| self.mismatch(path, "float")),
            Some(Value::String(s)) => match s.as_str() {
                "NaN" => Ok(Some(f64::NAN)),
                "Infinity" => Ok(Some(f64::INFINITY)),
                "-Infinity" => Ok(Some(f64::NEG_INFINITY)),
                _ => Err(self.mismatch(path, "float")),
            },
            Some(_) => Err(self.mismatch(path, "float")),
        }
    }

    /// Boolean field.
    pub fn boolean(&self, value: &Value, path: &[&str]) -> Result<Option<bool>, AnnotationError> {
        match self.field(value, path)? {
            None => Ok(None),
            Some(v) => v
                .as_bool()
                .map(Some)
                .ok_or_else(|| self.mismatch(path, "boolean")),
        }
    }

    /// String field.
    pub fn string(&self, value: &Value, path: &[&str]) -> Result<Option<String>, AnnotationError> {
        match self.field(value, path)? {
            None => Ok(None),
            Some(v) => v
                .as_str()
                .map(|s| Some(s.to_string()))
                .ok_or_else(|| self.mismatch(path, "string")),
        }
    }

    /// Array field.
    pub fn array<'a>(
        &self,
        value: &'a Value,
        path: &[&str],
    ) -> Result<Option<&'a Vec<Value>>, AnnotationError> {
        match self.field(value, path)? {
            None => Ok(None),
            Some(v) => v
                .as_array()
                .map(Some)
                .ok_or_else(|| self.mismatch(path, "array")),
        }
    }

    /// Project a full record.
    pub fn record(&self, value: &Value) -> Result<ProjectedRecord, AnnotationError> {
        let locus = self.locus(value)?;
        let alleles = self.alleles(value)?;

        let mut region_flags = [None; 5];
        for (slot, flag) in region_flags.iter_mut().zip(REGION_FLAGS) {
            *slot = self.boolean(value, &["region_flags", flag])?;
        }

        let [joint, exomes, genomes] = COHORTS;
        Ok(ProjectedRecord {
            joint: self.cohort(value, joint)?,
            exomes: self.cohort(value, exomes)?,
            genomes: self.cohort(value, genomes)?,
            freq_comparison: self.freq_comparison(value, &locus)?,
            locus,
            alleles,
            region_flags,
        })
    }

    fn locus(&self, value: &Value) -> Result<Locus, AnnotationError> {
        let field = self
            .field(value, &["locus"])?
            .ok_or_else(|| self.mismatch(&["locus"], "locus"))?;
        match field {
            Value::String(text) => text
                .parse()
                .map_err(|_| self.mismatch(&["locus"], "locus")),
            Value::Object(_) => {
                let contig = self
                    .string(field, &["contig"])?
                    .ok_or_else(|| self.mismatch(&["locus", "contig"], "string"))?;
                let position = self
                    .int(field, &["position"])?
                    .and_then(|p| u32::try_from(p).ok())
                    .filter(|&p| p > 0)
                    .ok_or_else(|| self.mismatch(&["locus", "position"], "position"))?;
                Ok(Locus::new(contig, position))
            }
            _ => Err(self.mismatch(&["locus"], "locus")),
        }
    }

    fn alleles(&self, value: &Value) -> Result<Vec<String>, AnnotationError> {
        let array = self
            .array(value, &["alleles"])?
            .ok_or_else(|| self.mismatch(&["alleles"], "array"))?;
        let alleles = array
            .iter()
            .map(|allele| {
                allele
                    .as_str()
                    .map(str::to_string)
                    .ok_or_else(|| self.mismatch(&["alleles"], "string"))
            })
            .collect::<Result<Vec<_>, _>>()?;
        if alleles.len() < 2 {
            return Err(AnnotationError::TooFewAlleles {
                row: self.row,
                found: alleles.len(),
            });
        }
        Ok(alleles)
    }

    fn cohort(&self, value: &Value, name: &str) -> Result<CohortBlock, AnnotationError> {
        if self.field(value, &[name])?.is_none() {
            return Ok(CohortBlock::default());
        }

        let freq = match self.array(value, &[name, "freq"])? {
            None => None,
            Some(entries) => Some(
                entries
                    .iter()
                    .enumerate()
                    .map(|(idx, entry)| {
                        self.freq_entry(entry)
                            .map_err(|e| e.with_prefix(&format!("{name}.freq[{idx}]")))
                    })
                    .collect::<Result<Vec<_>, _>>()?,
            ),
        };
        let faf = match self.array(value, &[name, "faf"])? {
            None => None,
            Some(entries) => Some(
                entries
                    .iter()
                    .enumerate()
                    .map(|(idx, entry)| {
                        self.faf_entry(entry)
                            .map_err(|e| e.with_prefix(&format!("{name}.faf[{idx}]")))
                    })
                    .collect::<Result<Vec<_>, _>>()?,
            ),
        };

        let fafmax = match self.field(value, &[name, "fafmax"])? {
            None => None,
            Some(_) => Some(FafMax {
                faf95_max: self.float(value, &[name, "fafmax", "faf95_max"])?,
                faf95_max_gen_anc: self.string(value, &[name, "fafmax", "faf95_max_gen_anc"])?,
                faf99_max: self.float(value, &[name, "fafmax", "faf99_max"])?,
                faf99_max_gen_anc: self.string(value, &[name, "fafmax", "faf99_max_gen_anc"])?,
            }),
        };

        let grpmax = match self.field(value, &[name, "grpmax"])? {
            None => None,
            Some(_) => Some(GrpMax {
                ac: self.int(value, &[name, "grpmax", "AC"])?,
                af: self.float(value, &[name, "grpmax", "AF"])?,
                an: self.int(value, &[name, "grpmax", "AN"])?,
                homozygote_count: self.int(value, &[name, "grpmax", "homozygote_count"])?,
                gen_anc: self.string(value, &[name, "grpmax", "gen_anc"])?,
            }),
        };

        Ok(CohortBlock {
            freq,
            faf,
            fafmax,
            grpmax,
        })
    }

    fn freq_entry(&self, entry: &Value) -> Result<Option<FreqEntry>, AnnotationError> {
        if entry.is_null() {
            return Ok(None);
        }
        Ok(Some(FreqEntry {
            ac: self.int(entry, &["AC"])?,
            af: self.float(entry, &["AF"])?,
            an: self.int(entry, &["AN"])?,
            homozygote_count: self.int(entry, &["homozygote_count"])?,
        }))
    }

    fn faf_entry(&self, entry: &Value) -> Result<Option<FafEntry>, AnnotationError> {
        if entry.is_null() {
            return Ok(None);
        }
        Ok(Some(FafEntry {
            faf95: self.float(entry, &["faf95"])?,
            faf99: self.float(entry, &["faf99"])?,
        }))
    }

    /// A `null` test array is missing; an empty one is out of range for the
    /// first (per-allele) entry.
    fn freq_comparison(
        &self,
        value: &Value,
        locus: &Locus,
    ) -> Result<FreqComparison, AnnotationError> {
        let tests = self.array(value, &["freq_comparison_stats", "contingency_table_test"])?;
        let contingency_pval = match tests {
            None => None,
            Some(tests) => {
                let first = tests.first().ok_or_else(|| AnnotationError::IndexOutOfRange {
                    row: self.row,
                    locus: locus.to_string(),
                    array: "contingency_table_test",
                    key: "p_value".to_string(),
                    index: 0,
                    len: 0,
                })?;
                self.float(first, &["p_value"]).map_err(|e| {
                    e.with_prefix("freq_comparison_stats.contingency_table_test[0]")
                })?
            }
        };
        let cmh_pval = self.float(
            value,
            &["freq_comparison_stats", "cochran_mantel_haenszel_test", "p_value"],
        )?;
        Ok(FreqComparison {
            contingency_pval,
            cmh_pval,
        })
    }

    fn missing(&self, path: &[&str]) -> AnnotationError {
        AnnotationError::MissingField {
            row: self.row,
            path: path.join("."),
        }
    }

    fn mismatch(&self, path: &[&str], expected: &'static str) -> AnnotationError {
        AnnotationError::TypeMismatch {
            row: self.row,
            path: path.join("."),
            expected,
        }
    }
}
