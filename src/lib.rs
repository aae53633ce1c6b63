//! # Gene panel extraction
//!
//! Two independent batch jobs over large variant datasets:
//!
//! 1. **Region export**: filter a VCF (or the variant data of a VDS) to each
//!    labelled interval of a gene panel and write one sites-only BGZF VCF per
//!    label.
//! 2. **Annotation flattening**: project a nested gnomAD-style annotation
//!    table down to scalar columns and write one BGZF TSV.
//!
//! ## Usage Example
//!
//! ```ignore
//! use panel_extract::genomics::{ExtractorConfig, RegionExtractor, RegionList};
//!
//! let regions = RegionList::cardiac_panel()?;
//! let extractor = RegionExtractor::new(ExtractorConfig::exome("out/vcf"))?;
//! let report = extractor.extract("exome.vcf.gz", &regions)?;
//! assert_eq!(report.files.len(), regions.len());
//! ```

#![warn(missing_docs, missing_debug_implementations)]

pub mod annotations; // Nested annotation table flattening
pub mod config;      // Job files
pub mod genomics;    // Loci, region lists, VCF extraction

// Re-exports for convenience
pub use annotations::{AnnotationError, AnnotationFlattener, FlattenConfig, FlattenReport};
pub use config::{ConfigError, JobConfig};
pub use genomics::{
    ExtractError, ExtractionReport, ExtractorConfig, LocusInterval, RegionExtractor, RegionList,
};

use thiserror::Error;

/// Errors surfaced by [`run_job`].
#[derive(Debug, Error)]
pub enum JobError {
    /// Job file or region list was invalid.
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// Region export failed.
    #[error("region export failed: {0}")]
    Extract(#[from] ExtractError),

    /// Annotation export failed.
    #[error("annotation export failed: {0}")]
    Annotation(#[from] AnnotationError),
}

/// Outcome of a job file run.
#[derive(Debug, Clone, Default)]
pub struct JobReport {
    /// Exome region export, if configured.
    pub exome: Option<ExtractionReport>,
    /// WGS region export, if configured.
    pub wgs: Option<ExtractionReport>,
    /// Annotation export, if configured.
    pub flatten: Option<FlattenReport>,
}

/// Run every section of a validated job file: exome export, then WGS
/// export, then annotation flattening. The first failure aborts the run.
pub fn run_job(config: &JobConfig) -> Result<JobReport, JobError> {
    config.validate()?;
    let mut report = JobReport::default();

    if let Some(extract) = &config.extract {
        let regions = extract.regions().map_err(ConfigError::from)?;
        if let (Some(settings), Some(exome)) = (extract.exome_config(), &extract.exome) {
            let extractor = RegionExtractor::new(settings)?;
            report.exome = Some(extractor.extract(&exome.source, &regions)?);
        }
        if let (Some(settings), Some(wgs)) = (extract.wgs_config(), &extract.wgs) {
            let extractor = RegionExtractor::new(settings)?;
            report.wgs = Some(extractor.extract_vds(&wgs.vds, &regions)?);
        }
    }

    if let Some(flatten) = &config.flatten {
        let flattener = AnnotationFlattener::new(flatten.flatten_config())?;
        report.flatten = Some(flattener.flatten(&flatten.table, &flatten.output)?);
    }

    Ok(report)
}
