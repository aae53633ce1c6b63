//! Region extraction: filter a variant dataset to each labelled interval and
//! write one sites-only VCF per label.

use std::fs::File;
use std::io;
use std::path::{Path, PathBuf};

use rust_htslib::bcf;
use thiserror::Error;
use tracing::{debug, info};

use super::vcf::record_locus;
use super::{Region, RegionList, SitesOnlyWriter, VariantDataset, VariantSource, VcfError};

/// Placeholder substituted with the region label in output file names.
pub const LABEL_PLACEHOLDER: &str = "{label}";
/// Default output template for exome sources.
pub const EXOME_TEMPLATE: &str = "{label}_Exome.vcf.bgz";
/// Default output template for whole-genome (VDS) sources.
pub const WGS_TEMPLATE: &str = "{label}wgs.vcf.bgz";

/// Errors raised by the region extractor.
#[derive(Debug, Error)]
pub enum ExtractError {
    /// Output template cannot name distinct files per label.
    #[error("output template '{0}' must contain {{label}} and no path separators")]
    InvalidTemplate(String),

    /// Reading or writing variant data failed.
    #[error(transparent)]
    Vcf(#[from] VcfError),

    /// Fingerprinting a written file failed.
    #[error("failed to fingerprint {path}: {source}")]
    Digest {
        /// File being hashed.
        path: PathBuf,
        /// Underlying error.
        #[source]
        source: io::Error,
    },
}

/// Configuration for a region extraction run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExtractorConfig {
    /// Directory receiving one file per label.
    pub output_dir: PathBuf,
    /// File name template; `{label}` is replaced by the region label.
    pub file_template: String,
}

impl ExtractorConfig {
    /// Configuration writing `{label}_Exome.vcf.bgz` files into `output_dir`.
    pub fn exome(output_dir: impl Into<PathBuf>) -> Self {
        Self {
            output_dir: output_dir.into(),
            file_template: EXOME_TEMPLATE.to_string(),
        }
    }

    /// Configuration writing `{label}wgs.vcf.bgz` files into `output_dir`.
    pub fn wgs(output_dir: impl Into<PathBuf>) -> Self {
        Self {
            output_dir: output_dir.into(),
            file_template: WGS_TEMPLATE.to_string(),
        }
    }

    /// Override the file name template.
    pub fn with_template(mut self, template: impl Into<String>) -> Self {
        self.file_template = template.into();
        self
    }

    /// Check the template yields one distinct file name per label.
    pub fn validate(&self) -> Result<(), ExtractError> {
        validate_template(&self.file_template)
    }

    /// Output path for `label`.
    pub fn output_path(&self, label: &str) -> PathBuf {
        self.output_dir
            .join(self.file_template.replace(LABEL_PLACEHOLDER, label))
    }
}

/// Check that a file template contains `{label}` and stays inside its directory.
pub fn validate_template(template: &str) -> Result<(), ExtractError> {
    if !template.contains(LABEL_PLACEHOLDER) || template.contains(['/', '\\']) {
        return Err(ExtractError::InvalidTemplate(template.to_string()));
    }
    Ok(())
}

/// One file written by the extractor.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExportedFile {
    /// Region label.
    pub label: String,
    /// Output path.
    pub path: PathBuf,
    /// Number of variant records written.
    pub records: usize,
    /// BLAKE3 digest of the file bytes, hex encoded.
    pub digest: String,
}

/// Summary of an extraction run, in region list order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExtractionReport {
    /// Files written, one per label.
    pub files: Vec<ExportedFile>,
    /// Records retained by the union prefilter (VDS runs only).
    pub prefiltered_records: Option<usize>,
}

impl ExtractionReport {
    /// Total records written across all labels.
    pub fn total_records(&self) -> usize {
        self.files.iter().map(|file| file.records).sum()
    }
}

/// Filters variant datasets region by region and exports sites-only VCFs.
#[derive(Debug, Clone)]
pub struct RegionExtractor {
    config: ExtractorConfig,
}

impl RegionExtractor {
    /// Create an extractor, validating its configuration.
    pub fn new(config: ExtractorConfig) -> Result<Self, ExtractError> {
        config.validate()?;
        Ok(Self { config })
    }

    /// Active configuration.
    pub fn config(&self) -> &ExtractorConfig {
        &self.config
    }

    /// Re-scan `source` once per region and write each region's variants.
    ///
    /// Existing output files are overwritten.
    pub fn extract<P: AsRef<Path>>(
        &self,
        source: P,
        regions: &RegionList,
    ) -> Result<ExtractionReport, ExtractError> {
        let source = source.as_ref();
        if regions.is_empty() {
            info!(source = %source.display(), "region list is empty; nothing to export");
            return Ok(ExtractionReport::default());
        }
        info!(
            source = %source.display(),
            regions = regions.len(),
            "starting region export"
        );

        let mut report = ExtractionReport::default();
        for (idx, region) in regions.iter().enumerate() {
            info!(
                index = idx,
                label = %region.label,
                interval = %region.interval,
                "processing region"
            );
            let mut reader = VariantSource::open(source)?;
            let mut writer =
                SitesOnlyWriter::create(self.config.output_path(&region.label), reader.header())?;
            reader.filter_records(
                |locus| region.interval.contains_locus(locus),
                |record| writer.write(&record),
            )?;
            report.files.push(self.finish_file(region, writer)?);
        }

        info!(
            files = report.files.len(),
            records = report.total_records(),
            "region export complete"
        );
        Ok(report)
    }

    /// Restrict the VDS variant data to the union of all regions in a single
    /// pass, then export each region from the retained records.
    pub fn extract_vds<P: AsRef<Path>>(
        &self,
        vds: P,
        regions: &RegionList,
    ) -> Result<ExtractionReport, ExtractError> {
        if regions.is_empty() {
            info!(vds = %vds.as_ref().display(), "region list is empty; nothing to export");
            return Ok(ExtractionReport::default());
        }
        let dataset = VariantDataset::open(vds)?;
        info!(
            vds = %dataset.root().display(),
            regions = regions.len(),
            "starting VDS region export"
        );

        let mut reader = dataset.variant_data()?;
        let union = regions.union();
        let records = reader.records_in_union(&union)?;
        info!(
            records = records.len(),
            reference_data = %dataset.reference_data_path().display(),
            "filtered variant data to region union; reference blocks dropped"
        );

        let mut report = ExtractionReport {
            prefiltered_records: Some(records.len()),
            ..ExtractionReport::default()
        };
        for (idx, region) in regions.iter().enumerate() {
            info!(
                index = idx,
                label = %region.label,
                interval = %region.interval,
                "processing region"
            );
            let mut writer =
                SitesOnlyWriter::create(self.config.output_path(&region.label), reader.header())?;
            write_matching(&records, region, &mut writer)?;
            report.files.push(self.finish_file(region, writer)?);
        }

        info!(
            files = report.files.len(),
            records = report.total_records(),
            "VDS region export complete"
        );
        Ok(report)
    }

    fn finish_file(
        &self,
        region: &Region,
        writer: SitesOnlyWriter,
    ) -> Result<ExportedFile, ExtractError> {
        let records = writer.written();
        let path = writer.finish()?;
        let digest = digest_file(&path)?;
        debug!(label = %region.label, path = %path.display(), %digest, "wrote file");
        info!(label = %region.label, records, "region exported");
        Ok(ExportedFile {
            label: region.label.clone(),
            path,
            records,
            digest,
        })
    }
}

fn write_matching(
    records: &[bcf::Record],
    region: &Region,
    writer: &mut SitesOnlyWriter,
) -> Result<(), VcfError> {
    for record in records {
        if record_locus(record).map_or(false, |locus| region.interval.contains_locus(&locus)) {
            writer.write(record)?;
        }
    }
    Ok(())
}

/// BLAKE3 digest of a file's bytes, hex encoded.
pub fn digest_file(path: &Path) -> Result<String, ExtractError> {
    let to_err = |source| ExtractError::Digest {
        path: path.to_path_buf(),
        source,
    };
    let mut file = File::open(path).map_err(to_err)?;
    let mut hasher = blake3::Hasher::new();
    io::copy(&mut file, &mut hasher).map_err(to_err)?;
    Ok(hasher.finalize().to_hex().to_string())
}
