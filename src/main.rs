use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use panel_extract::annotations::{AnnotationFlattener, FlattenConfig};
use panel_extract::genomics::{ExtractionReport, ExtractorConfig, RegionExtractor, RegionList};
use panel_extract::{run_job, JobConfig};
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(
    name = "panel-extract",
    about = "Gene panel VCF extraction and gnomAD annotation flattening"
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Run every section of a JSON job file.
    Run {
        /// Job file.
        #[arg(long)]
        config: PathBuf,
    },
    /// Export one sites-only VCF per region from a VCF/BCF source.
    Regions {
        /// Source VCF/BCF (plain or BGZF).
        #[arg(long)]
        source: PathBuf,
        /// Directory receiving the per-region files.
        #[arg(long)]
        output_dir: PathBuf,
        /// Region list (`label<TAB>interval`); defaults to the built-in cardiac panel.
        #[arg(long)]
        regions: Option<PathBuf>,
        /// Output file name template.
        #[arg(long, default_value = panel_extract::genomics::EXOME_TEMPLATE)]
        template: String,
    },
    /// Export one sites-only VCF per region from the variant data of a VDS.
    Vds {
        /// VDS directory (`variant_data.*` and `reference_data.*`).
        #[arg(long)]
        vds: PathBuf,
        /// Directory receiving the per-region files.
        #[arg(long)]
        output_dir: PathBuf,
        /// Region list (`label<TAB>interval`); defaults to the built-in cardiac panel.
        #[arg(long)]
        regions: Option<PathBuf>,
        /// Output file name template.
        #[arg(long, default_value = panel_extract::genomics::WGS_TEMPLATE)]
        template: String,
    },
    /// Flatten a nested annotation table into a TSV.
    Flatten {
        /// Annotation table directory (`globals.json` + `rows.jsonl[.bgz]`).
        #[arg(long)]
        table: PathBuf,
        /// Output path; `.bgz`/`.gz` outputs are BGZF-compressed.
        #[arg(long)]
        output: PathBuf,
        /// Ancestry labels in column order (comma separated).
        #[arg(long, value_delimiter = ',')]
        labels: Option<Vec<String>>,
        /// Frequency group for overall and per-ancestry entries.
        #[arg(long, default_value = panel_extract::annotations::DEFAULT_FREQ_GROUP)]
        freq_group: String,
        /// Globals struct holding the frequency index dictionaries.
        #[arg(long, default_value = panel_extract::annotations::DEFAULT_GLOBALS_FIELD)]
        globals_field: String,
    },
    /// Print the built-in region panel as TSV.
    Panel,
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Run { config } => run_config(&config)?,
        Commands::Regions {
            source,
            output_dir,
            regions,
            template,
        } => {
            let regions = load_regions(regions.as_deref())?;
            let extractor =
                RegionExtractor::new(ExtractorConfig::exome(output_dir).with_template(template))
                    .context("invalid extractor configuration")?;
            let report = extractor
                .extract(&source, &regions)
                .with_context(|| format!("region export from {} failed", source.display()))?;
            print_extraction(&report);
        }
        Commands::Vds {
            vds,
            output_dir,
            regions,
            template,
        } => {
            let regions = load_regions(regions.as_deref())?;
            let extractor =
                RegionExtractor::new(ExtractorConfig::wgs(output_dir).with_template(template))
                    .context("invalid extractor configuration")?;
            let report = extractor
                .extract_vds(&vds, &regions)
                .with_context(|| format!("VDS region export from {} failed", vds.display()))?;
            print_extraction(&report);
        }
        Commands::Flatten {
            table,
            output,
            labels,
            freq_group,
            globals_field,
        } => {
            let mut config = FlattenConfig::default()
                .with_freq_group(freq_group)
                .with_globals_field(globals_field);
            if let Some(labels) = labels {
                config = config.with_ancestry_labels(labels);
            }
            let flattener =
                AnnotationFlattener::new(config).context("invalid flatten configuration")?;
            let report = flattener
                .flatten(&table, &output)
                .with_context(|| format!("flattening {} failed", table.display()))?;
            println!(
                "{}\trows={}\tcolumns={}",
                report.output.display(),
                report.rows,
                report.columns.len()
            );
        }
        Commands::Panel => {
            let panel = RegionList::cardiac_panel().context("built-in panel is invalid")?;
            print!("{}", panel.to_tsv());
        }
    }

    Ok(())
}

fn run_config(path: &Path) -> Result<()> {
    let config = JobConfig::load(path)
        .with_context(|| format!("failed to load job file {}", path.display()))?;
    let report = run_job(&config).context("job failed")?;

    for extraction in [&report.exome, &report.wgs].into_iter().flatten() {
        print_extraction(extraction);
    }
    if let Some(flatten) = &report.flatten {
        println!(
            "{}\trows={}\tcolumns={}",
            flatten.output.display(),
            flatten.rows,
            flatten.columns.len()
        );
    }
    Ok(())
}

fn load_regions(path: Option<&Path>) -> Result<RegionList> {
    match path {
        Some(path) => RegionList::from_path(path)
            .with_context(|| format!("failed to load regions from {}", path.display())),
        None => RegionList::cardiac_panel().context("built-in panel is invalid"),
    }
}

fn print_extraction(report: &ExtractionReport) {
    for file in &report.files {
        println!(
            "{}\t{}\trecords={}\tblake3={}",
            file.label,
            file.path.display(),
            file.records,
            file.digest
        );
    }
}
