//! VCF/BCF input and sites-only BGZF VCF output backed by htslib.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use rust_htslib::bcf::{self, header::HeaderView, Read};
use thiserror::Error;

use super::{IntervalSet, Locus, LocusInterval};

/// Errors originating from VCF reading or writing.
#[derive(Debug, Error)]
pub enum VcfError {
    /// htslib failed to open, read, or write a file.
    #[error("htslib error on {path}: {source}")]
    Htslib {
        /// File being accessed.
        path: PathBuf,
        /// Error reported by htslib.
        #[source]
        source: rust_htslib::errors::Error,
    },

    /// Filesystem error outside htslib (e.g. creating the output directory).
    #[error("I/O error on {path}: {source}")]
    Io {
        /// File or directory being accessed.
        path: PathBuf,
        /// Underlying error.
        #[source]
        source: io::Error,
    },

    /// A finished file did not read back with every record it was given.
    #[error("{path} reads back {found} records but {expected} were written")]
    Incomplete {
        /// Output file.
        path: PathBuf,
        /// Records handed to the writer.
        expected: usize,
        /// Records read back.
        found: usize,
    },

    /// A record had no contig or a negative position.
    #[error("record {index} in {path} has no valid locus")]
    InvalidRecord {
        /// 0-based record index in the file.
        index: usize,
        /// Source file.
        path: PathBuf,
    },
}

impl VcfError {
    fn htslib(path: &Path, source: rust_htslib::errors::Error) -> Self {
        VcfError::Htslib {
            path: path.to_path_buf(),
            source,
        }
    }
}

/// Streaming reader over a VCF/BCF file (plain, gzip, or BGZF).
pub struct VariantSource {
    path: PathBuf,
    reader: bcf::Reader,
}

impl std::fmt::Debug for VariantSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("VariantSource")
            .field("path", &self.path)
            .field("samples", &self.sample_count())
            .finish()
    }
}

impl VariantSource {
    /// Open a variant file.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self, VcfError> {
        let path = path.as_ref().to_path_buf();
        let reader = bcf::Reader::from_path(&path).map_err(|e| VcfError::htslib(&path, e))?;
        Ok(Self { path, reader })
    }

    /// Path the source was opened from.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Header of the source file.
    pub fn header(&self) -> &HeaderView {
        self.reader.header()
    }

    /// Number of samples declared in the header.
    pub fn sample_count(&self) -> u32 {
        self.reader.header().sample_count()
    }

    /// Stream every record, calling `keep` with the record locus; records for
    /// which it returns `true` are passed to `sink`. Returns the number kept.
    pub fn filter_records<K, S>(&mut self, mut keep: K, mut sink: S) -> Result<usize, VcfError>
    where
        K: FnMut(&Locus) -> bool,
        S: FnMut(bcf::Record) -> Result<(), VcfError>,
    {
        let mut kept = 0usize;
        for (index, result) in self.reader.records().enumerate() {
            let record = result.map_err(|e| VcfError::htslib(&self.path, e))?;
            let locus = record_locus(&record).ok_or_else(|| VcfError::InvalidRecord {
                index,
                path: self.path.clone(),
            })?;
            if keep(&locus) {
                sink(record)?;
                kept += 1;
            }
        }
        Ok(kept)
    }

    /// Collect all records inside a single interval.
    pub fn records_in(&mut self, interval: &LocusInterval) -> Result<Vec<bcf::Record>, VcfError> {
        let mut records = Vec::new();
        self.filter_records(
            |locus| interval.contains_locus(locus),
            |record| {
                records.push(record);
                Ok(())
            },
        )?;
        Ok(records)
    }

    /// Collect all records inside any interval of `set`.
    pub fn records_in_union(&mut self, set: &IntervalSet) -> Result<Vec<bcf::Record>, VcfError> {
        let mut records = Vec::new();
        self.filter_records(
            |locus| set.contains(&locus.contig, locus.position),
            |record| {
                records.push(record);
                Ok(())
            },
        )?;
        Ok(records)
    }
}

/// 1-based locus of a record, resolved through its own header.
pub fn record_locus(record: &bcf::Record) -> Option<Locus> {
    let rid = record.rid()?;
    let contig = record.header().rid2name(rid).ok()?;
    let pos = u32::try_from(record.pos()).ok()?;
    Some(Locus::new(String::from_utf8_lossy(contig), pos + 1))
}

/// BGZF VCF writer that strips every sample column.
pub struct SitesOnlyWriter {
    path: PathBuf,
    writer: bcf::Writer,
    written: usize,
}

impl std::fmt::Debug for SitesOnlyWriter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SitesOnlyWriter")
            .field("path", &self.path)
            .field("written", &self.written)
            .finish()
    }
}

impl SitesOnlyWriter {
    /// Create (or truncate) `path`, deriving a zero-sample header from `template`.
    pub fn create<P: AsRef<Path>>(path: P, template: &HeaderView) -> Result<Self, VcfError> {
        let path = path.as_ref().to_path_buf();
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(|source| VcfError::Io {
                path: parent.to_path_buf(),
                source,
            })?;
        }
        let header = bcf::Header::from_template_subset(template, &[])
            .map_err(|e| VcfError::htslib(&path, e))?;
        let writer = bcf::Writer::from_path(&path, &header, false, bcf::Format::Vcf)
            .map_err(|e| VcfError::htslib(&path, e))?;
        Ok(Self {
            path,
            writer,
            written: 0,
        })
    }

    /// Write one record after dropping its samples.
    pub fn write(&mut self, record: &bcf::Record) -> Result<(), VcfError> {
        let mut record = record.clone();
        self.writer.translate(&mut record);
        self.writer.subset(&mut record);
        self.writer
            .write(&record)
            .map_err(|e| VcfError::htslib(&self.path, e))?;
        self.written += 1;
        Ok(())
    }

    /// Number of records written so far.
    pub fn written(&self) -> usize {
        self.written
    }

    /// Close the file and read it back, failing unless every written record
    /// is present. Returns the output path.
    pub fn finish(self) -> Result<PathBuf, VcfError> {
        let Self {
            path,
            writer,
            written,
        } = self;
        // htslib flushes the BGZF stream and writes the EOF block on drop.
        drop(writer);

        let mut reader = bcf::Reader::from_path(&path).map_err(|e| VcfError::htslib(&path, e))?;
        let mut found = 0usize;
        for record in reader.records() {
            record.map_err(|e| VcfError::htslib(&path, e))?;
            found += 1;
        }
        if found != written {
            return Err(VcfError::Incomplete {
                path,
                expected: written,
                found,
            });
        }
        Ok(path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    const VCF: &str = "##fileformat=VCFv4.2\n\
##contig=<ID=chr1,length=1000>\n\
##INFO=<ID=AC,Number=A,Type=Integer,Description=\"Allele count\">\n\
##FORMAT=<ID=GT,Number=1,Type=String,Description=\"Genotype\">\n\
#CHROM\tPOS\tID\tREF\tALT\tQUAL\tFILTER\tINFO\tFORMAT\tS1\tS2\n\
chr1\t50\t.\tA\tG\t.\tPASS\tAC=1\tGT\t0/1\t0/0\n\
chr1\t150\t.\tC\tT\t.\tPASS\tAC=2\tGT\t1/1\t0/0\n";

    #[test]
    fn writer_drops_samples() {
        let dir = tempdir().unwrap();
        let input = dir.path().join("in.vcf");
        fs::write(&input, VCF).unwrap();

        let mut source = VariantSource::open(&input).unwrap();
        assert_eq!(source.sample_count(), 2);
        let interval = LocusInterval::parse("chr1:100-200").unwrap();
        let records = source.records_in(&interval).unwrap();
        assert_eq!(records.len(), 1);

        let output = dir.path().join("nested").join("out.vcf.bgz");
        let mut writer = SitesOnlyWriter::create(&output, source.header()).unwrap();
        for record in &records {
            writer.write(record).unwrap();
        }
        assert_eq!(writer.written(), 1);
        let path = writer.finish().expect("output reads back");

        let mut reader = VariantSource::open(&path).unwrap();
        assert_eq!(reader.sample_count(), 0);
        let all = reader.records_in(&LocusInterval::whole_contig("chr1")).unwrap();
        assert_eq!(all.len(), 1);
        assert_eq!(all[0].pos(), 149);
    }

    #[test]
    fn truncated_output_is_detected() {
        let dir = tempdir().unwrap();
        let input = dir.path().join("in.vcf");
        fs::write(&input, VCF).unwrap();
        let mut source = VariantSource::open(&input).unwrap();
        let records = source.records_in(&LocusInterval::whole_contig("chr1")).unwrap();

        let output = dir.path().join("out.vcf.bgz");
        let mut writer = SitesOnlyWriter::create(&output, source.header()).unwrap();
        for record in &records {
            writer.write(record).unwrap();
        }
        // Claim one more record than htslib was handed.
        writer.written += 1;
        let err = writer.finish().unwrap_err();
        assert!(matches!(err, VcfError::Incomplete { expected: 3, found: 2, .. }));
    }
}
