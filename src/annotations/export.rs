//! Delimited text export.

use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use rust_htslib::bgzf;

use super::AnnotationError;

/// Whether `path` should be BGZF-compressed, judged by its extension.
pub fn is_compressed_path(path: &Path) -> bool {
    matches!(
        path.extension().and_then(|ext| ext.to_str()),
        Some("bgz") | Some("gz")
    )
}

/// Open `path` for writing, truncating any existing file and creating parent
/// directories. `.bgz` and `.gz` paths are BGZF-compressed.
pub fn create_output(path: &Path) -> Result<Box<dyn Write>, AnnotationError> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent).map_err(|source| AnnotationError::io(parent, source))?;
    }
    if is_compressed_path(path) {
        let writer = bgzf::Writer::from_path(path).map_err(|source| AnnotationError::Htslib {
            path: path.to_path_buf(),
            source,
        })?;
        Ok(Box::new(writer))
    } else {
        let file = File::create(path).map_err(|source| AnnotationError::io(path, source))?;
        Ok(Box::new(BufWriter::new(file)))
    }
}

/// Tab-separated writer with a fixed header.
#[derive(Debug)]
pub struct TsvWriter<W: Write> {
    inner: W,
    path: PathBuf,
    width: usize,
    rows: usize,
}

impl<W: Write> TsvWriter<W> {
    /// Write the header row and return the writer. `path` names the
    /// destination in error messages.
    pub fn new(
        inner: W,
        path: impl Into<PathBuf>,
        header: &[String],
    ) -> Result<Self, AnnotationError> {
        let mut writer = Self {
            inner,
            path: path.into(),
            width: header.len(),
            rows: 0,
        };
        writer.write_line(header)?;
        Ok(writer)
    }

    /// Append one row; its width must match the header.
    pub fn write_row(&mut self, fields: &[String]) -> Result<(), AnnotationError> {
        if fields.len() != self.width {
            return Err(AnnotationError::RowWidth {
                expected: self.width,
                found: fields.len(),
            });
        }
        self.write_line(fields)?;
        self.rows += 1;
        Ok(())
    }

    /// Rows written so far, excluding the header.
    pub fn rows(&self) -> usize {
        self.rows
    }

    /// Destination path.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Flush and close, returning the number of data rows.
    pub fn finish(mut self) -> Result<usize, AnnotationError> {
        self.inner
            .flush()
            .map_err(|source| AnnotationError::io(&self.path, source))?;
        Ok(self.rows)
    }

    fn write_line(&mut self, fields: &[String]) -> Result<(), AnnotationError> {
        let mut line = fields.join("\t");
        line.push('\n');
        self.inner
            .write_all(line.as_bytes())
            .map_err(|source| AnnotationError::io(&self.path, source))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io;

    fn strings(items: &[&str]) -> Vec<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn writes_header_and_rows() {
        let mut buffer = Vec::new();
        let mut writer = TsvWriter::new(&mut buffer, "out.tsv", &strings(&["a", "b"])).unwrap();
        writer.write_row(&strings(&["1", "NA"])).unwrap();
        assert_eq!(writer.finish().unwrap(), 1);
        assert_eq!(String::from_utf8(buffer).unwrap(), "a\tb\n1\tNA\n");
    }

    #[test]
    fn rejects_ragged_rows() {
        let mut writer = TsvWriter::new(Vec::new(), "out.tsv", &strings(&["a", "b"])).unwrap();
        let err = writer.write_row(&strings(&["1"])).unwrap_err();
        assert!(matches!(err, AnnotationError::RowWidth { expected: 2, found: 1 }));
    }

    #[test]
    fn compression_follows_extension() {
        assert!(is_compressed_path(Path::new("out.tsv.bgz")));
        assert!(is_compressed_path(Path::new("out.tsv.gz")));
        assert!(!is_compressed_path(Path::new("out.tsv")));
    }

    #[derive(Debug)]
    struct FullDisk;

    impl Write for FullDisk {
        fn write(&mut self, _: &[u8]) -> io::Result<usize> {
            Err(io::Error::new(io::ErrorKind::Other, "no space left on device"))
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    #[test]
    fn write_errors_name_the_output() {
        let err = TsvWriter::new(FullDisk, "out/annotations.tsv", &strings(&["a"])).unwrap_err();
        match err {
            AnnotationError::Io { path, .. } => {
                assert_eq!(path, PathBuf::from("out/annotations.tsv"))
            }
            other => panic!("unexpected error: {other}"),
        }
    }
}
