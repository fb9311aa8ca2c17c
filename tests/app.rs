use std::collections::HashSet;
use std::fs::{self, File};
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::thread;
use std::time::Duration;

use assert_matches::assert_matches;
use camino::{Utf8Path, Utf8PathBuf};

use rsem_pipeline::app::App;
use rsem_pipeline::config::ResolvedConfig;
use rsem_pipeline::dispatch::{DispatchOptions, LaunchStatus, SampleJob, SampleLauncher};
use rsem_pipeline::error::PipelineError;
use rsem_pipeline::output::JsonOutput;
use rsem_pipeline::picard::MetricsCollector;
use rsem_pipeline::rsem::Quantifier;
use rsem_pipeline::subset::options_for;
use rsem_pipeline::tools::ToolInfo;

struct MockRsem;

impl Quantifier for MockRsem {
    fn calculate_expression(
        &self,
        _mate1: &Utf8Path,
        _mate2: &Utf8Path,
        _output_prefix: &Utf8Path,
    ) -> Result<(), PipelineError> {
        Err(PipelineError::MissingTool("mock".to_string()))
    }

    fn tool_info(&self) -> ToolInfo {
        ToolInfo {
            name: "rsem-calculate-expression".to_string(),
            path: None,
            version: None,
        }
    }
}

struct MockPicard;

impl MetricsCollector for MockPicard {
    fn rna_seq_metrics(&self, _bam: &Utf8Path, _output: &Utf8Path) -> Result<(), PipelineError> {
        Err(PipelineError::MissingTool("mock".to_string()))
    }

    fn insert_size_metrics(
        &self,
        _bam: &Utf8Path,
        _output: &Utf8Path,
        _histogram: &Utf8Path,
    ) -> Result<(), PipelineError> {
        Err(PipelineError::MissingTool("mock".to_string()))
    }

    fn tool_info(&self) -> ToolInfo {
        ToolInfo {
            name: "picard".to_string(),
            path: None,
            version: None,
        }
    }
}

/// Writes the files a finished sample leaves behind instead of spawning one.
#[derive(Default)]
struct MockLauncher {
    failing: HashSet<String>,
    launched: Mutex<Vec<String>>,
    running: AtomicUsize,
    peak: AtomicUsize,
}

impl SampleLauncher for MockLauncher {
    fn launch(
        &self,
        job: &SampleJob,
        _stdout: File,
        _stderr: File,
    ) -> Result<LaunchStatus, PipelineError> {
        let now = self.running.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak.fetch_max(now, Ordering::SeqCst);
        thread::sleep(Duration::from_millis(20));

        let name = job.pair.name.to_string();
        self.launched.lock().unwrap().push(name.clone());
        let failed = self.failing.contains(&name);
        if !failed {
            let layout = &job.layout;
            fs::create_dir_all(layout.rsem_dir()).unwrap();
            let tpm = name.len();
            fs::write(
                layout.genes_results(),
                format!(
                    "gene_id\ttranscript_id(s)\tlength\texpected_count\tTPM\n\
                     g1\tt1\t100\t{tpm}0\t{tpm}.5\n\
                     g2\tt2\t200\t7\t0.25\n"
                ),
            )
            .unwrap();
            fs::write(layout.qc_file(), format!("PF_BASES\t{tpm}000\n")).unwrap();
        }

        self.running.fetch_sub(1, Ordering::SeqCst);
        Ok(LaunchStatus {
            success: !failed,
            status: if failed { "exit code 1" } else { "exit code 0" }.to_string(),
        })
    }
}

fn app() -> App<MockRsem, MockPicard> {
    App::new(ResolvedConfig::default(), MockRsem, MockPicard)
}

fn reads_folder(root: &Utf8Path, samples: &[&str]) -> Utf8PathBuf {
    let folder = root.join("reads");
    fs::create_dir_all(&folder).unwrap();
    for sample in samples {
        fs::write(folder.join(format!("{sample}_1.fastq.gz")), b"").unwrap();
        fs::write(folder.join(format!("{sample}_2.fastq.gz")), b"").unwrap();
    }
    folder
}

fn options(root: &Utf8Path, jobs: usize) -> DispatchOptions {
    DispatchOptions {
        folder: root.join("reads"),
        workdir: root.join("work"),
        jobs,
        with_qc: true,
        skip_existing: false,
    }
}

fn utf8_tempdir() -> (tempfile::TempDir, Utf8PathBuf) {
    let temp = tempfile::tempdir().unwrap();
    let root = Utf8PathBuf::from_path_buf(temp.path().to_path_buf()).unwrap();
    (temp, root)
}

#[test]
fn run_dispatches_then_collects_matrices() {
    let (_temp, root) = utf8_tempdir();
    reads_folder(&root, &["ctrl", "stim"]);
    let launcher = MockLauncher::default();

    let report = app().run(&options(&root, 2), &launcher, &JsonOutput).unwrap();

    assert_eq!(report.dispatch.samples.len(), 2);
    assert!(report.dispatch.samples.iter().all(|s| s.success));
    assert_eq!(report.collect.tpm.samples, vec!["ctrl", "stim"]);
    assert_eq!(
        fs::read_to_string(root.join("work/TPM_Matrix.txt")).unwrap(),
        "gene_id\tctrl\tstim\ng1\t4.5\t4.5\ng2\t0.25\t0.25\n"
    );
    assert_eq!(
        fs::read_to_string(root.join("work/Count_Matrix.txt")).unwrap(),
        "gene_id\tctrl\tstim\ng1\t40\t40\ng2\t7\t7\n"
    );
    assert_eq!(
        fs::read_to_string(root.join("work/QC_all.txt")).unwrap(),
        "\tctrl\tstim\nPF_BASES\t4000\t4000\n"
    );
    assert!(root.join("work/ctrl/log.txt").exists());
    assert!(root.join("work/ctrl/err.txt").exists());
}

#[test]
fn run_refuses_to_collect_after_a_failure() {
    let (_temp, root) = utf8_tempdir();
    reads_folder(&root, &["a", "b", "c"]);
    let launcher = MockLauncher {
        failing: HashSet::from(["b".to_string()]),
        ..MockLauncher::default()
    };

    let err = app()
        .run(&options(&root, 3), &launcher, &JsonOutput)
        .unwrap_err();

    assert_matches!(err, PipelineError::SamplesFailed(names) if names == vec!["b".to_string()]);
    assert_eq!(launcher.launched.lock().unwrap().len(), 3);
    assert!(!root.join("work/TPM_Matrix.txt").exists());
}

#[test]
fn worker_pool_bounds_concurrent_launches() {
    let (_temp, root) = utf8_tempdir();
    reads_folder(&root, &["s1", "s2", "s3", "s4", "s5", "s6"]);
    let launcher = MockLauncher::default();

    let report = app()
        .dispatch(&options(&root, 2), &launcher, &JsonOutput)
        .unwrap();

    assert_eq!(report.samples.len(), 6);
    assert_eq!(report.jobs, 2);
    assert!(launcher.peak.load(Ordering::SeqCst) <= 2);
    let names: Vec<_> = report.samples.iter().map(|s| s.sample.as_str()).collect();
    assert_eq!(names, vec!["s1", "s2", "s3", "s4", "s5", "s6"]);
}

#[test]
fn existing_sample_directory_stops_dispatch_before_launch() {
    let (_temp, root) = utf8_tempdir();
    reads_folder(&root, &["a", "b"]);
    fs::create_dir_all(root.join("work/b")).unwrap();
    let launcher = MockLauncher::default();

    let err = app()
        .dispatch(&options(&root, 2), &launcher, &JsonOutput)
        .unwrap_err();

    assert_matches!(err, PipelineError::SampleDirExists(path) if path.ends_with("b"));
    assert!(launcher.launched.lock().unwrap().is_empty());
    assert!(!root.join("work/a").exists());
}

#[test]
fn skip_existing_launches_only_new_samples() {
    let (_temp, root) = utf8_tempdir();
    reads_folder(&root, &["a", "b"]);
    fs::create_dir_all(root.join("work/b")).unwrap();
    let launcher = MockLauncher::default();
    let mut options = options(&root, 2);
    options.skip_existing = true;

    let report = app().dispatch(&options, &launcher, &JsonOutput).unwrap();

    assert_eq!(report.skipped, vec!["b".to_string()]);
    assert_eq!(*launcher.launched.lock().unwrap(), vec!["a".to_string()]);
}

#[test]
fn subset_after_collect() {
    let (_temp, root) = utf8_tempdir();
    reads_folder(&root, &["ko1", "wt1", "wt2"]);
    let launcher = MockLauncher::default();
    let app = app();
    app.run(&options(&root, 1), &launcher, &JsonOutput).unwrap();

    let work = root.join("work");
    fs::write(
        work.join("sample_meta.txt"),
        "sample\tGenotype\tStimulus\nko1\tKO\t0\nwt1\tWT\t6\nwt2\tWT\t3\n",
    )
    .unwrap();

    let report = app.subset(&options_for(&work), &JsonOutput).unwrap();
    assert_eq!(report.samples, vec!["wt2", "wt1"]);
    assert_eq!(
        fs::read_to_string(work.join("count_matrix_ebseq.txt")).unwrap(),
        "\twt2\twt1\ng1\t30\t30\ng2\t7\t7\n"
    );
}

#[test]
fn missing_reads_folder_is_an_input_error() {
    let (_temp, root) = utf8_tempdir();
    let launcher = MockLauncher::default();

    let err = app()
        .dispatch(&options(&root, 1), &launcher, &JsonOutput)
        .unwrap_err();

    assert_matches!(err, PipelineError::InvalidPath(_));
    assert_eq!(err.exit_code(), 2);
}

#[test]
fn tools_reports_configured_clients() {
    let report = app().tools();
    let names: Vec<_> = report.tools.iter().map(|t| t.name.as_str()).collect();
    assert_eq!(names, vec!["rsem-calculate-expression", "picard", "gzip"]);
}
