//! Genomic coordinates, region lists, and region-based VCF extraction.
//!
//! This module exposes the building blocks of the region extractor: locus
//! intervals, labelled region lists, htslib-backed VCF streaming, and the
//! extractor itself.

mod extractor;
mod intervals;
mod locus;
mod region;
mod vcf;
mod vds;

pub use extractor::{
    digest_file, validate_template, ExportedFile, ExtractError, ExtractionReport,
    ExtractorConfig, RegionExtractor, EXOME_TEMPLATE, LABEL_PLACEHOLDER, WGS_TEMPLATE,
};
pub use intervals::IntervalSet;
pub use locus::{Locus, LocusInterval, LocusParseError, MAX_POSITION};
pub use region::{Region, RegionError, RegionList};
pub use vcf::{record_locus, SitesOnlyWriter, VariantSource, VcfError};
pub use vds::{VariantDataset, REFERENCE_DATA, VARIANT_DATA};
