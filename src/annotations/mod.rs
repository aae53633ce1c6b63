//! Flattening of nested per-variant annotation tables (gnomAD joint sites)
//! into a flat TSV with one row per variant.

mod error;
mod export;
mod flatten;
mod freq_index;
mod projection;
mod table;

pub use error::AnnotationError;
pub use export::{create_output, is_compressed_path, TsvWriter};
pub use flatten::{
    is_snp, AnnotationFlattener, FlatRow, FlattenConfig, FlattenReport, DEFAULT_ANCESTRY_LABELS,
    DEFAULT_FREQ_GROUP, DEFAULT_GLOBALS_FIELD, FIXED_COLUMNS, MISSING,
};
pub use freq_index::{AncestryIndex, FrequencyIndex, IndexDictionary};
pub use projection::{
    CohortBlock, FafEntry, FafMax, FreqComparison, FreqEntry, GrpMax, ProjectedRecord, Projector,
    COHORTS, REGION_FLAGS,
};
pub use table::{AnnotationTable, RowReader, TableRow, GLOBALS_FILE};
