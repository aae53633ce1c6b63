//! Job files.
//!
//! A job file is JSON with an optional `extract` section (region export from
//! an exome VCF and/or a WGS VDS) and an optional `flatten` section
//! (annotation export):
//!
//! ```json
//! {
//!   "extract": {
//!     "output_dir": "out/vcf",
//!     "regions_file": "panel.tsv",
//!     "exome": { "source": "exome.vcf.gz" },
//!     "wgs": { "vds": "wgs.vds", "file_template": "{label}wgs.vcf.bgz" }
//!   },
//!   "flatten": {
//!     "table": "gnomad.joint.sites",
//!     "output": "out/gnomad_annotations.tsv.bgz",
//!     "ancestry_labels": ["afr", "amr", "asj", "eas", "fin", "nfe", "sas", "remaining"]
//!   }
//! }
//! ```

use std::fs;
use std::path::{Path, PathBuf};

use serde::Deserialize;
use thiserror::Error;

use crate::annotations::{AnnotationError, FlattenConfig};
use crate::genomics::{
    validate_template, ExtractError, ExtractorConfig, RegionError, RegionList, EXOME_TEMPLATE,
    WGS_TEMPLATE,
};

/// Errors raised while loading or validating a job file.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Job file could not be read.
    #[error("failed to read job file {path}: {source}")]
    Io {
        /// Job file path.
        path: PathBuf,
        /// Underlying error.
        #[source]
        source: std::io::Error,
    },

    /// Job file is not valid JSON or has unknown fields.
    #[error("failed to parse job file {path}: {source}")]
    Parse {
        /// Job file path.
        path: PathBuf,
        /// Parser error.
        #[source]
        source: serde_json::Error,
    },

    /// A path still contains a `<PLACEHOLDER>` that was never filled in.
    #[error("{field} still contains a placeholder: {value}")]
    Placeholder {
        /// Field name.
        field: &'static str,
        /// Offending value.
        value: String,
    },

    /// Job file configures nothing to do.
    #[error("job file has neither an `extract` nor a `flatten` section")]
    NothingToDo,

    /// `extract` section names no source.
    #[error("`extract` section needs an `exome` or `wgs` source")]
    NoSource,

    /// Output template is invalid.
    #[error(transparent)]
    Template(#[from] ExtractError),

    /// Flatten settings are invalid.
    #[error(transparent)]
    Flatten(#[from] AnnotationError),

    /// Region list could not be loaded.
    #[error(transparent)]
    Regions(#[from] RegionError),
}

/// Top-level job file.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct JobConfig {
    /// Region export settings.
    #[serde(default)]
    pub extract: Option<ExtractJob>,
    /// Annotation export settings.
    #[serde(default)]
    pub flatten: Option<FlattenJob>,
}

/// Region export settings.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ExtractJob {
    /// Directory receiving the per-label VCFs.
    pub output_dir: PathBuf,
    /// `label<TAB>interval` file; the built-in cardiac panel when absent.
    #[serde(default)]
    pub regions_file: Option<PathBuf>,
    /// Exome VCF source.
    #[serde(default)]
    pub exome: Option<ExomeSource>,
    /// WGS VDS source.
    #[serde(default)]
    pub wgs: Option<WgsSource>,
}

/// Exome VCF source.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ExomeSource {
    /// VCF/BCF path.
    pub source: PathBuf,
    /// Output name template.
    #[serde(default = "default_exome_template")]
    pub file_template: String,
}

/// WGS VDS source.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct WgsSource {
    /// VDS directory.
    pub vds: PathBuf,
    /// Output name template.
    #[serde(default = "default_wgs_template")]
    pub file_template: String,
}

/// Annotation export settings.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct FlattenJob {
    /// Annotation table directory.
    pub table: PathBuf,
    /// Output TSV path.
    pub output: PathBuf,
    /// Ancestry labels, in column order.
    #[serde(default)]
    pub ancestry_labels: Option<Vec<String>>,
    /// Frequency group.
    #[serde(default)]
    pub freq_group: Option<String>,
    /// Globals struct with the index dictionaries.
    #[serde(default)]
    pub globals_field: Option<String>,
}

fn default_exome_template() -> String {
    EXOME_TEMPLATE.to_string()
}

fn default_wgs_template() -> String {
    WGS_TEMPLATE.to_string()
}

impl JobConfig {
    /// Read, parse, and validate a job file.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let text = fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let config = Self::from_json(&text).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })?;
        config.validate()?;
        Ok(config)
    }

    /// Parse without validating.
    pub fn from_json(text: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(text)
    }

    /// Check every field before any data is touched.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.extract.is_none() && self.flatten.is_none() {
            return Err(ConfigError::NothingToDo);
        }

        if let Some(extract) = &self.extract {
            check_path("extract.output_dir", &extract.output_dir)?;
            if let Some(regions) = &extract.regions_file {
                check_path("extract.regions_file", regions)?;
            }
            if extract.exome.is_none() && extract.wgs.is_none() {
                return Err(ConfigError::NoSource);
            }
            if let Some(exome) = &extract.exome {
                check_path("extract.exome.source", &exome.source)?;
                validate_template(&exome.file_template)?;
            }
            if let Some(wgs) = &extract.wgs {
                check_path("extract.wgs.vds", &wgs.vds)?;
                validate_template(&wgs.file_template)?;
            }
        }

        if let Some(flatten) = &self.flatten {
            check_path("flatten.table", &flatten.table)?;
            check_path("flatten.output", &flatten.output)?;
            flatten.flatten_config().validate()?;
        }
        Ok(())
    }
}

impl ExtractJob {
    /// Region list named by the job, or the built-in panel.
    pub fn regions(&self) -> Result<RegionList, RegionError> {
        match &self.regions_file {
            Some(path) => RegionList::from_path(path),
            None => RegionList::cardiac_panel(),
        }
    }

    /// Extractor settings for the exome source.
    pub fn exome_config(&self) -> Option<ExtractorConfig> {
        self.exome.as_ref().map(|exome| {
            ExtractorConfig::exome(&self.output_dir).with_template(&exome.file_template)
        })
    }

    /// Extractor settings for the WGS source.
    pub fn wgs_config(&self) -> Option<ExtractorConfig> {
        self.wgs
            .as_ref()
            .map(|wgs| ExtractorConfig::wgs(&self.output_dir).with_template(&wgs.file_template))
    }
}

impl FlattenJob {
    /// Flattener settings with defaults filled in.
    pub fn flatten_config(&self) -> FlattenConfig {
        let mut config = FlattenConfig::default();
        if let Some(labels) = &self.ancestry_labels {
            config = config.with_ancestry_labels(labels.iter().cloned());
        }
        if let Some(group) = &self.freq_group {
            config = config.with_freq_group(group.clone());
        }
        if let Some(field) = &self.globals_field {
            config = config.with_globals_field(field.clone());
        }
        config
    }
}

/// Reject paths that still carry `<...>` placeholders.
pub fn check_path(field: &'static str, path: &Path) -> Result<(), ConfigError> {
    let text = path.to_string_lossy();
    if let Some(open) = text.find('<') {
        if text[open..].contains('>') {
            return Err(ConfigError::Placeholder {
                field,
                value: text.into_owned(),
            });
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_full_job() {
        let config = JobConfig::from_json(
            r#"{
                "extract": {
                    "output_dir": "out",
                    "exome": {"source": "exome.vcf.gz"},
                    "wgs": {"vds": "wgs.vds"}
                },
                "flatten": {"table": "t", "output": "o.tsv.bgz", "ancestry_labels": ["afr"]}
            }"#,
        )
        .unwrap();
        config.validate().unwrap();

        let extract = config.extract.as_ref().unwrap();
        assert_eq!(extract.exome_config().unwrap().file_template, EXOME_TEMPLATE);
        assert_eq!(extract.wgs_config().unwrap().file_template, WGS_TEMPLATE);
        assert_eq!(extract.regions().unwrap().len(), 80);

        let flatten = config.flatten.as_ref().unwrap().flatten_config();
        assert_eq!(flatten.ancestry_labels, vec!["afr"]);
        assert_eq!(flatten.freq_group, "adj");
    }

    #[test]
    fn rejects_unfilled_placeholders() {
        let config = JobConfig::from_json(
            r#"{"extract": {"output_dir": "gs://<YOUR_SECURE_BUCKET>/vcf",
                             "exome": {"source": "exome.vcf.gz"}}}"#,
        )
        .unwrap();
        let err = config.validate().unwrap_err();
        assert!(matches!(err, ConfigError::Placeholder { field: "extract.output_dir", .. }));
    }

    #[test]
    fn rejects_unknown_fields_and_empty_jobs() {
        assert!(JobConfig::from_json(r#"{"extrakt": {}}"#).is_err());
        let err = JobConfig::from_json("{}").unwrap().validate().unwrap_err();
        assert!(matches!(err, ConfigError::NothingToDo));
    }

    #[test]
    fn rejects_template_without_label() {
        let config = JobConfig::from_json(
            r#"{"extract": {"output_dir": "out",
                             "exome": {"source": "e.vcf", "file_template": "all.vcf.bgz"}}}"#,
        )
        .unwrap();
        assert!(matches!(config.validate(), Err(ConfigError::Template(_))));
    }

    #[test]
    fn extract_without_source_is_rejected() {
        let config = JobConfig::from_json(r#"{"extract": {"output_dir": "out"}}"#).unwrap();
        assert!(matches!(config.validate(), Err(ConfigError::NoSource)));
    }
}
