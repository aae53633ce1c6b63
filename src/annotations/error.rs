use std::io;
use std::path::{Path, PathBuf};

use thiserror::Error;

/// Errors raised while reading, projecting, or exporting annotation tables.
#[derive(Debug, Error)]
pub enum AnnotationError {
    /// Filesystem error.
    #[error("I/O error on {path}: {source}")]
    Io {
        /// File being accessed.
        path: PathBuf,
        /// Underlying error.
        #[source]
        source: io::Error,
    },

    /// htslib failed to open a compressed stream.
    #[error("htslib error on {path}: {source}")]
    Htslib {
        /// File being accessed.
        path: PathBuf,
        /// Error reported by htslib.
        #[source]
        source: rust_htslib::errors::Error,
    },

    /// A row or the globals file was not valid JSON.
    #[error("invalid JSON in {path} at line {line}: {source}")]
    Json {
        /// File being parsed.
        path: PathBuf,
        /// 1-based line number; 0 for whole-file documents.
        line: usize,
        /// Parser error.
        #[source]
        source: serde_json::Error,
    },

    /// Table directory has no row file.
    #[error("no rows.jsonl[.gz|.bgz] in {0}")]
    MissingRows(PathBuf),

    /// A selected field is absent from the record.
    #[error("row {row}: field '{path}' not found")]
    MissingField {
        /// 1-based row line number.
        row: usize,
        /// Dotted field path.
        path: String,
    },

    /// A selected field has an unexpected type.
    #[error("row {row}: field '{path}' is not a {expected}")]
    TypeMismatch {
        /// 1-based row line number.
        row: usize,
        /// Dotted field path.
        path: String,
        /// Expected type name.
        expected: &'static str,
    },

    /// Row key carries fewer than two alleles.
    #[error("row {row}: expected at least 2 alleles, found {found}")]
    TooFewAlleles {
        /// 1-based row line number.
        row: usize,
        /// Number of alleles present.
        found: usize,
    },

    /// Table metadata lacks the frequency dictionaries.
    #[error("globals field '{0}' has neither an index dictionary nor a meta array")]
    MissingMetadata(String),

    /// A requested frequency key is not described by the table metadata.
    #[error("frequency key '{key}' not found in {dictionary} (available: {available})")]
    UnknownFrequencyKey {
        /// Key that was requested, e.g. `afr_adj`.
        key: String,
        /// Dictionary that was searched.
        dictionary: String,
        /// Keys present in the dictionary, comma separated.
        available: String,
    },

    /// A row's array is shorter than the metadata claims.
    #[error("row {row} ({locus}): {array} has {len} entries but '{key}' maps to index {index}")]
    IndexOutOfRange {
        /// 1-based row line number.
        row: usize,
        /// Row locus.
        locus: String,
        /// Array being indexed.
        array: &'static str,
        /// Key that selected the index.
        key: String,
        /// Index from metadata.
        index: usize,
        /// Actual array length.
        len: usize,
    },

    /// Flattener configuration is unusable.
    #[error("invalid flatten configuration: {0}")]
    InvalidConfig(String),

    /// A row had a different number of fields than the header.
    #[error("row has {found} fields but header has {expected}")]
    RowWidth {
        /// Header width.
        expected: usize,
        /// Row width.
        found: usize,
    },
}

impl AnnotationError {
    pub(crate) fn io(path: &Path, source: io::Error) -> Self {
        AnnotationError::Io {
            path: path.to_path_buf(),
            source,
        }
    }

    /// Prefix the field path of schema errors with `prefix`.
    pub fn with_prefix(self, prefix: &str) -> Self {
        match self {
            AnnotationError::MissingField { row, path } => AnnotationError::MissingField {
                row,
                path: join_path(prefix, &path),
            },
            AnnotationError::TypeMismatch {
                row,
                path,
                expected,
            } => AnnotationError::TypeMismatch {
                row,
                path: join_path(prefix, &path),
                expected,
            },
            other => other,
        }
    }

    /// Whether the error comes from the shape of the data rather than I/O.
    pub fn is_schema_error(&self) -> bool {
        matches!(
            self,
            AnnotationError::MissingField { .. }
                | AnnotationError::TypeMismatch { .. }
                | AnnotationError::TooFewAlleles { .. }
                | AnnotationError::MissingMetadata(_)
                | AnnotationError::UnknownFrequencyKey { .. }
                | AnnotationError::IndexOutOfRange { .. }
        )
    }
}

fn join_path(prefix: &str, path: &str) -> String {
    if path.is_empty() {
        prefix.to_string()
    } else {
        format!("{prefix}.{path}")
    }
}
