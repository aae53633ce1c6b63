//! On-disk annotation tables.
//!
//! A table is a directory with table-level metadata and one JSON record per
//! line:
//!
//! ```text
//! gnomad.joint.sites/
//!   globals.json
//!   rows.jsonl        (or rows.jsonl.gz / rows.jsonl.bgz)
//! ```

use std::fs;
use std::io::{BufRead, BufReader, Lines};
use std::path::{Path, PathBuf};

use rust_htslib::bgzf;
use serde_json::Value;

use super::AnnotationError;

/// Name of the metadata file inside a table directory.
pub const GLOBALS_FILE: &str = "globals.json";
const ROW_FILES: [&str; 3] = ["rows.jsonl", "rows.jsonl.bgz", "rows.jsonl.gz"];

/// Handle on an annotation table directory.
#[derive(Debug, Clone)]
pub struct AnnotationTable {
    root: PathBuf,
    rows_path: PathBuf,
    globals: Value,
}

impl AnnotationTable {
    /// Open a table directory and load its globals.
    pub fn open<P: AsRef<Path>>(root: P) -> Result<Self, AnnotationError> {
        let root = root.as_ref().to_path_buf();
        let globals_path = root.join(GLOBALS_FILE);
        let text = fs::read_to_string(&globals_path)
            .map_err(|source| AnnotationError::io(&globals_path, source))?;
        let globals = serde_json::from_str(&text).map_err(|source| AnnotationError::Json {
            path: globals_path.clone(),
            line: 0,
            source,
        })?;

        let rows_path = ROW_FILES
            .iter()
            .map(|name| root.join(name))
            .find(|path| path.is_file())
            .ok_or_else(|| AnnotationError::MissingRows(root.clone()))?;

        Ok(Self {
            root,
            rows_path,
            globals,
        })
    }

    /// Table directory.
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Path of the row file in use.
    pub fn rows_path(&self) -> &Path {
        &self.rows_path
    }

    /// Table-level metadata.
    pub fn globals(&self) -> &Value {
        &self.globals
    }

    /// Stream rows in file order.
    pub fn rows(&self) -> Result<RowReader, AnnotationError> {
        let reader = bgzf::Reader::from_path(&self.rows_path).map_err(|source| {
            AnnotationError::Htslib {
                path: self.rows_path.clone(),
                source,
            }
        })?;
        Ok(RowReader {
            path: self.rows_path.clone(),
            lines: BufReader::new(reader).lines(),
            line: 0,
        })
    }
}

/// One parsed table row.
#[derive(Debug, Clone, PartialEq)]
pub struct TableRow {
    /// 1-based line number in the row file.
    pub line: usize,
    /// Parsed record.
    pub value: Value,
}

/// Iterator over table rows; blank lines are skipped.
pub struct RowReader {
    path: PathBuf,
    lines: Lines<BufReader<bgzf::Reader>>,
    line: usize,
}

impl std::fmt::Debug for RowReader {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RowReader")
            .field("path", &self.path)
            .field("line", &self.line)
            .finish()
    }
}

impl Iterator for RowReader {
    type Item = Result<TableRow, AnnotationError>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            let text = match self.lines.next()? {
                Ok(text) => text,
                Err(source) => return Some(Err(AnnotationError::io(&self.path, source))),
            };
            self.line += 1;
            if text.trim().is_empty() {
                continue;
            }
            let line = self.line;
            return Some(
                serde_json::from_str(&text)
                    .map(|value| TableRow { line, value })
                    .map_err(|source| AnnotationError::Json {
                        path: self.path.clone(),
                        line,
                        source,
                    }),
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn reads_plain_rows_and_skips_blank_lines() {
        let dir = tempdir().unwrap();
        fs::write(dir.path().join(GLOBALS_FILE), r#"{"joint_globals": {}}"#).unwrap();
        fs::write(dir.path().join("rows.jsonl"), "{\"a\": 1}\n\n{\"a\": 2}\n").unwrap();

        let table = AnnotationTable::open(dir.path()).unwrap();
        let rows: Vec<_> = table.rows().unwrap().collect::<Result<_, _>>().unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].line, 1);
        assert_eq!(rows[1].line, 3);
        assert_eq!(rows[1].value["a"], 2);
    }

    #[test]
    fn missing_rows_file_is_reported() {
        let dir = tempdir().unwrap();
        fs::write(dir.path().join(GLOBALS_FILE), "{}").unwrap();
        let err = AnnotationTable::open(dir.path()).unwrap_err();
        assert!(matches!(err, AnnotationError::MissingRows(_)));
    }

    #[test]
    fn malformed_row_reports_line() {
        let dir = tempdir().unwrap();
        fs::write(dir.path().join(GLOBALS_FILE), "{}").unwrap();
        fs::write(dir.path().join("rows.jsonl"), "{\"a\": 1}\n{not json\n").unwrap();
        let table = AnnotationTable::open(dir.path()).unwrap();
        let results: Vec<_> = table.rows().unwrap().collect();
        assert!(results[0].is_ok());
        assert!(matches!(results[1], Err(AnnotationError::Json { line: 2, .. })));
    }
}
