#![allow(dead_code)]

use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use rust_htslib::bgzf;
use serde_json::{json, Value};

fn snapshot_root() -> PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR"))
        .join("tests")
        .join("snapshots")
}

pub fn assert_snapshot(name: &str, actual: &str) {
    let path = snapshot_root().join(name);
    if std::env::var("PANEL_EXTRACT_UPDATE_SNAPSHOTS").is_ok() {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).expect("create snapshot directory");
        }
        fs::write(&path, actual).expect("write snapshot");
        return;
    }

    let expected =
        fs::read_to_string(&path).unwrap_or_else(|_| panic!("snapshot {:?} not found", path));
    if normalize(&expected) != normalize(actual) {
        panic!(
            "Snapshot mismatch for {:?}. Set PANEL_EXTRACT_UPDATE_SNAPSHOTS=1 to regenerate.\n\
             Expected:\n{}\nActual:\n{}",
            path,
            expected,
            actual
        );
    }
}

fn normalize(input: &str) -> String {
    input.replace("\r\n", "\n")
}

/// Two-sample VCF with sites on both sides of `chr1:100-200` and one on chr2.
pub const SOURCE_VCF: &str = "##fileformat=VCFv4.2\n\
##contig=<ID=chr1,length=1000>\n\
##contig=<ID=chr2,length=1000>\n\
##INFO=<ID=AC,Number=A,Type=Integer,Description=\"Allele count\">\n\
##FORMAT=<ID=GT,Number=1,Type=String,Description=\"Genotype\">\n\
#CHROM\tPOS\tID\tREF\tALT\tQUAL\tFILTER\tINFO\tFORMAT\tS1\tS2\n\
chr1\t50\t.\tA\tG\t.\tPASS\tAC=1\tGT\t0/1\t0/0\n\
chr1\t150\t.\tC\tT\t.\tPASS\tAC=2\tGT\t1/1\t0/0\n\
chr1\t200\t.\tG\tA\t.\tPASS\tAC=1\tGT\t0/0\t0/1\n\
chr1\t250\t.\tT\tC\t.\tPASS\tAC=1\tGT\t0/1\t0/0\n\
chr2\t120\t.\tA\tC\t.\tPASS\tAC=3\tGT\t1/1\t0/1\n";

/// Reference-block component for VDS fixtures.
pub const REFERENCE_VCF: &str = "##fileformat=VCFv4.2\n\
##contig=<ID=chr1,length=1000>\n\
##INFO=<ID=END,Number=1,Type=Integer,Description=\"Block end\">\n\
##FORMAT=<ID=GT,Number=1,Type=String,Description=\"Genotype\">\n\
#CHROM\tPOS\tID\tREF\tALT\tQUAL\tFILTER\tINFO\tFORMAT\tS1\tS2\n\
chr1\t1\t.\tN\t<NON_REF>\t.\t.\tEND=49\tGT\t0/0\t0/0\n";

pub fn write_file(dir: &Path, name: &str, contents: &str) -> PathBuf {
    let path = dir.join(name);
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).expect("create fixture directory");
    }
    fs::write(&path, contents).expect("write fixture");
    path
}

/// Build a VDS directory under `dir` from the fixture VCFs.
pub fn write_vds(dir: &Path) -> PathBuf {
    let root = dir.join("cohort.vds");
    write_file(&root, "variant_data.vcf", SOURCE_VCF);
    write_file(&root, "reference_data.vcf", REFERENCE_VCF);
    root
}

/// Globals whose frequency arrays put the overall entry last, so a
/// position-zero assumption would read the wrong numbers.
pub fn joint_globals() -> Value {
    json!({
        "joint_globals": {
            "freq_index_dict": {"afr_adj": 0, "nfe_adj": 1, "raw": 2, "adj": 3},
            "faf_index_dict": {"nfe_adj": 0, "adj": 1}
        }
    })
}

pub fn freq(ac: i64, af: f64, an: i64) -> Value {
    json!({"AC": ac, "AF": af, "AN": an, "homozygote_count": 0})
}

/// A fully populated joint sites row.
pub fn annotation_row(contig: &str, position: u32, alleles: [&str; 2], overall_ac: i64) -> Value {
    let cohort = json!({
        "freq": [
            freq(5, 0.05, 100),
            freq(7, 0.07, 100),
            freq(13, 0.065, 200),
            freq(overall_ac, 0.25, 168)
        ],
        "faf": [{"faf95": 0.03, "faf99": 0.02}, {"faf95": 0.2, "faf99": 0.15}],
        "fafmax": {"faf95_max": 0.04, "faf95_max_gen_anc": "nfe",
                   "faf99_max": 0.03, "faf99_max_gen_anc": "nfe"},
        "grpmax": {"AC": 7, "AF": 0.07, "AN": 100, "homozygote_count": 0, "gen_anc": "nfe"}
    });
    json!({
        "locus": {"contig": contig, "position": position},
        "alleles": alleles,
        "region_flags": {
            "fail_interval_qc": false,
            "outside_broad_capture_region": false,
            "outside_ukb_capture_region": true,
            "not_called_in_exomes": false,
            "not_called_in_genomes": null
        },
        "joint": cohort.clone(),
        "exomes": cohort,
        "genomes": null,
        "freq_comparison_stats": {
            "contingency_table_test": [{"odds_ratio": 1.5, "p_value": 0.5}],
            "cochran_mantel_haenszel_test": {"chisq": 0.1, "p_value": 0.75}
        }
    })
}

/// Write an annotation table directory with plain JSONL rows.
pub fn write_table(dir: &Path, globals: &Value, rows: &[Value]) -> PathBuf {
    write_table_as(dir, globals, rows, "rows.jsonl")
}

/// Write an annotation table whose row file is `rows_file`; `.gz` and `.bgz`
/// names are BGZF-compressed.
pub fn write_table_as(dir: &Path, globals: &Value, rows: &[Value], rows_file: &str) -> PathBuf {
    let root = dir.join("joint.sites");
    write_file(&root, "globals.json", &globals.to_string());
    let mut body = String::new();
    for row in rows {
        body.push_str(&row.to_string());
        body.push('\n');
    }
    if rows_file.ends_with(".gz") || rows_file.ends_with(".bgz") {
        let mut writer = bgzf::Writer::from_path(root.join(rows_file)).expect("open BGZF rows");
        writer.write_all(body.as_bytes()).expect("write BGZF rows");
    } else {
        write_file(&root, rows_file, &body);
    }
    root
}
