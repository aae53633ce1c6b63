#[path = "common/mod.rs"]
mod common;

use std::fs;

use common::{write_file, write_vds, SOURCE_VCF};
use panel_extract::genomics::{
    ExtractError, ExtractorConfig, RegionExtractor, RegionList, VariantDataset, VariantSource,
};
use tempfile::tempdir;

#[test]
fn vds_export_prefilters_to_region_union() {
    let dir = tempdir().unwrap();
    let vds = write_vds(dir.path());
    let out = dir.path().join("wgs");

    let regions = RegionList::from_pairs([
        ("GENE1", "chr1:100-200"),
        ("GENE2", "chr1:140-260"),
        ("GENE3", "chr2:100-130"),
    ])
    .unwrap();
    let extractor = RegionExtractor::new(ExtractorConfig::wgs(&out)).unwrap();
    let report = extractor.extract_vds(&vds, &regions).expect("VDS export succeeds");

    // Union covers 150, 200, 250 on chr1 and 120 on chr2; 50 falls outside.
    assert_eq!(report.prefiltered_records, Some(4));
    let counts: Vec<_> = report.files.iter().map(|f| (f.label.as_str(), f.records)).collect();
    assert_eq!(counts, [("GENE1", 1), ("GENE2", 3), ("GENE3", 1)]);

    for file in &report.files {
        assert_eq!(file.path, out.join(format!("{}wgs.vcf.bgz", file.label)));
        let reader = VariantSource::open(&file.path).unwrap();
        assert_eq!(reader.sample_count(), 0);
    }
}

#[test]
fn vds_and_plain_export_agree() {
    let dir = tempdir().unwrap();
    let vds = write_vds(dir.path());
    let source = write_file(dir.path(), "same.vcf", SOURCE_VCF);
    let regions = RegionList::from_pairs([("GENE1", "chr1:100-200"), ("GENE3", "chr2")]).unwrap();

    let template = "{label}.vcf.bgz";
    let from_vds = RegionExtractor::new(
        ExtractorConfig::wgs(dir.path().join("a")).with_template(template),
    )
    .unwrap()
    .extract_vds(&vds, &regions)
    .unwrap();
    let from_vcf = RegionExtractor::new(
        ExtractorConfig::exome(dir.path().join("b")).with_template(template),
    )
    .unwrap()
    .extract(&source, &regions)
    .unwrap();

    let vds_digests: Vec<_> = from_vds.files.iter().map(|f| &f.digest).collect();
    let vcf_digests: Vec<_> = from_vcf.files.iter().map(|f| &f.digest).collect();
    assert_eq!(vds_digests, vcf_digests);
}

#[test]
fn missing_reference_component_is_rejected() {
    let dir = tempdir().unwrap();
    let vds = write_vds(dir.path());
    fs::remove_file(vds.join("reference_data.vcf")).unwrap();

    assert!(VariantDataset::open(&vds).is_err());

    let regions = RegionList::from_pairs([("GENE1", "chr1:100-200")]).unwrap();
    let extractor = RegionExtractor::new(ExtractorConfig::wgs(dir.path().join("out"))).unwrap();
    let err = extractor.extract_vds(&vds, &regions).unwrap_err();
    assert!(matches!(err, ExtractError::Vcf(_)));
}

#[test]
fn components_resolve_by_suffix() {
    let dir = tempdir().unwrap();
    let vds = write_vds(dir.path());
    let dataset = VariantDataset::open(&vds).unwrap();
    assert_eq!(dataset.variant_data_path(), vds.join("variant_data.vcf"));
    assert_eq!(dataset.reference_data_path(), vds.join("reference_data.vcf"));
    assert_eq!(dataset.variant_data().unwrap().sample_count(), 2);
}
