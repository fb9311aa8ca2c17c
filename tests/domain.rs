use std::fs;

use camino::Utf8PathBuf;

use rsem_pipeline::discover::{discover_pairs, gather_pairs};
use rsem_pipeline::domain::{ReadPair, SampleName};

#[test]
fn discovers_mate1_files_case_insensitively() {
    let temp = tempfile::tempdir().unwrap();
    let root = Utf8PathBuf::from_path_buf(temp.path().to_path_buf()).unwrap();
    for name in [
        "ctrl_1.fastq.gz",
        "ctrl_2.fastq.gz",
        "stim_1.FASTQ",
        "stim_2.FASTQ",
        "notes_1.txt",
    ] {
        fs::write(root.join(name), b"").unwrap();
    }

    let pairs = discover_pairs(&root).unwrap();
    assert_eq!(pairs.len(), 2);
    assert_eq!(pairs[0].name, SampleName::from("ctrl"));
    assert_eq!(pairs[0].mate2, root.join("ctrl_2.fastq.gz"));
    assert_eq!(pairs[1].name, SampleName::from("stim"));
    assert_eq!(pairs[1].mate2, root.join("stim_2.FASTQ"));
}

#[test]
fn marker_in_directory_name_does_not_select_mate2() {
    let files = vec![Utf8PathBuf::from("/runs/lane_1/ctrl_2.fastq")];
    assert!(gather_pairs(&files).is_empty());
}

#[test]
fn mate2_is_derived_even_when_absent() {
    let pair = ReadPair::from_mate1(Utf8PathBuf::from("/reads/orphan_1.fastq"));
    assert_eq!(pair.mate2, Utf8PathBuf::from("/reads/orphan_2.fastq"));
}
