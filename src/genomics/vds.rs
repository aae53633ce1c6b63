//! Variant datasets (VDS): paired variant-call and reference-block data.
//!
//! On disk a VDS is a directory holding two variant files:
//!
//! ```text
//! cohort.vds/
//!   variant_data.vcf.gz     variant calls
//!   reference_data.vcf.gz   reference blocks
//! ```
//!
//! Either component may be plain VCF, gzip/BGZF VCF, or BCF.

use std::path::{Path, PathBuf};

use super::{VariantSource, VcfError};

const COMPONENT_SUFFIXES: [&str; 5] = [".vcf.gz", ".vcf.bgz", ".bcf", ".vcf", ".bcf.gz"];

/// Name of the variant-call component.
pub const VARIANT_DATA: &str = "variant_data";
/// Name of the reference-block component.
pub const REFERENCE_DATA: &str = "reference_data";

/// Resolved VDS directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VariantDataset {
    root: PathBuf,
    variant_data: PathBuf,
    reference_data: PathBuf,
}

impl VariantDataset {
    /// Resolve both components under `root`; either missing is an error.
    pub fn open<P: AsRef<Path>>(root: P) -> Result<Self, VcfError> {
        let root = root.as_ref().to_path_buf();
        let variant_data = locate_component(&root, VARIANT_DATA)?;
        let reference_data = locate_component(&root, REFERENCE_DATA)?;
        Ok(Self {
            root,
            variant_data,
            reference_data,
        })
    }

    /// VDS directory.
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Path of the variant-call component.
    pub fn variant_data_path(&self) -> &Path {
        &self.variant_data
    }

    /// Path of the reference-block component.
    pub fn reference_data_path(&self) -> &Path {
        &self.reference_data
    }

    /// Open the variant-call component for streaming.
    pub fn variant_data(&self) -> Result<VariantSource, VcfError> {
        VariantSource::open(&self.variant_data)
    }
}

fn locate_component(root: &Path, name: &str) -> Result<PathBuf, VcfError> {
    COMPONENT_SUFFIXES
        .iter()
        .map(|suffix| root.join(format!("{name}{suffix}")))
        .find(|candidate| candidate.is_file())
        .ok_or_else(|| VcfError::Io {
            path: root.join(name),
            source: std::io::Error::new(
                std::io::ErrorKind::NotFound,
                format!("VDS component '{name}' not found"),
            ),
        })
}
