use std::ffi::OsString;
use std::fs;
use std::path::{Path, PathBuf};
use std::process::{Command, Output};
use tempfile::TempDir;

struct CliTestEnv {
    _temp_dir: TempDir,
    source: PathBuf,
    output: PathBuf,
    xdg_config: PathBuf,
    xdg_state: PathBuf,
}

impl CliTestEnv {
    fn new() -> Self {
        let temp_dir = TempDir::new().expect("failed to create temp dir");
        let base = temp_dir.path().to_path_buf();
        let source = base.join("transcripts");
        let output = base.join("out");
        let xdg_config = base.join("xdg-config");
        let xdg_state = base.join("xdg-state");

        fs::create_dir_all(&source).expect("failed to create source dir");
        fs::create_dir_all(&xdg_config).expect("failed to create XDG_CONFIG_HOME");
        fs::create_dir_all(&xdg_state).expect("failed to create XDG_STATE_HOME");

        seed_transcripts(&source);

        Self {
            _temp_dir: temp_dir,
            source,
            output,
            xdg_config,
            xdg_state,
        }
    }
}

fn seed_transcripts(source: &Path) {
    let routine = concat!(
        r#"{"sessionId":"routine","type":"user","timestamp":"2025-06-02T10:00:00Z","cwd":"/home/dev/webapp","message":{"role":"user","content":"quick question"}}"#,
        "\n",
        r#"{"sessionId":"routine","type":"assistant","timestamp":"2025-06-02T10:00:03Z","message":{"role":"assistant","content":"quick answer","usage":{"input_tokens":25,"output_tokens":25}}}"#,
        "\n",
    );

    let mut complex = String::new();
    for i in 0..8 {
        complex.push_str(&format!(
            concat!(
                r#"{{"sessionId":"complex","type":"user","timestamp":"2025-06-03T10:00:{i:02}Z","cwd":"/home/dev/webapp","message":{{"role":"user","content":"step {i}"}}}}"#,
                "\n",
                r#"{{"sessionId":"complex","type":"assistant","timestamp":"2025-06-03T10:00:{j:02}Z","message":{{"role":"assistant","content":[{{"type":"tool_use","id":"t{i}","name":"Read","input":{{}}}}],"usage":{{"input_tokens":25,"output_tokens":25}}}}}}"#,
                "\n",
            ),
            i = 2 * i,
            j = 2 * i + 1,
        ));
    }

    fs::write(source.join("routine.jsonl"), routine).expect("write routine fixture");
    fs::write(source.join("complex.jsonl"), complex).expect("write complex fixture");
    fs::write(source.join("broken.jsonl"), "definitely not json\n").expect("write broken fixture");
}

fn run_bin(env: &CliTestEnv, bin_name: &str, args: &[&str]) -> Output {
    let bin_path = match bin_name {
        "sessionscope-import" => PathBuf::from(assert_cmd::cargo::cargo_bin!("sessionscope-import")),
        "sessionscope-extract" => {
            PathBuf::from(assert_cmd::cargo::cargo_bin!("sessionscope-extract"))
        }
        "sessionscope-aggregate" => {
            PathBuf::from(assert_cmd::cargo::cargo_bin!("sessionscope-aggregate"))
        }
        "sessionscope-report" => PathBuf::from(assert_cmd::cargo::cargo_bin!("sessionscope-report")),
        _ => panic!("unsupported binary in test harness: {bin_name}"),
    };

    let mut command = Command::new(bin_path);

    command
        .args(args)
        .env("XDG_CONFIG_HOME", &env.xdg_config)
        .env("XDG_STATE_HOME", &env.xdg_state)
        .output()
        .unwrap_or_else(|e| panic!("failed to execute {bin_name}: {e}"))
}

fn assert_success(bin_name: &str, args: &[&str], output: &Output) {
    if output.status.success() {
        return;
    }

    let rendered_args = args
        .iter()
        .map(|arg| OsString::from(arg).to_string_lossy().into_owned())
        .collect::<Vec<_>>()
        .join(" ");
    let stdout = String::from_utf8_lossy(&output.stdout);
    let stderr = String::from_utf8_lossy(&output.stderr);
    panic!(
        "{bin_name} {rendered_args} failed\nstatus: {}\nstdout:\n{}\nstderr:\n{}",
        output.status, stdout, stderr
    );
}

#[test]
fn import_lists_sessions_and_warns_on_malformed() {
    let env = CliTestEnv::new();
    let source = env.source.to_string_lossy().into_owned();

    let args = ["--source", source.as_str()];
    let output = run_bin(&env, "sessionscope-import", &args);
    assert_success("sessionscope-import", &args, &output);

    let stdout = String::from_utf8_lossy(&output.stdout);
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stdout.contains("Imported 2 session(s), skipped 1 file(s)"));
    assert!(stdout.contains("routine"));
    assert!(stdout.contains("complex"));
    assert!(stderr.contains("broken.jsonl"));
}

#[test]
fn report_writes_full_layout() {
    let env = CliTestEnv::new();
    let source = env.source.to_string_lossy().into_owned();
    let output_dir = env.output.to_string_lossy().into_owned();

    let args = [
        "--source",
        source.as_str(),
        "--output",
        output_dir.as_str(),
    ];
    let output = run_bin(&env, "sessionscope-report", &args);
    assert_success("sessionscope-report", &args, &output);

    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("Report complete:"));
    assert!(stdout.contains("Sessions aggregated: 2"));
    assert!(stdout.contains("Files skipped:       1"));
    assert!(stdout.contains("Complexity ratio:    8.00x"));

    let aggregate_path = env.output.join("aggregate_report.json");
    assert!(aggregate_path.exists());
    assert!(env.output.join("sessions/routine.json").exists());
    assert!(env.output.join("sessions/complex.json").exists());

    let report: serde_json::Value =
        serde_json::from_str(&fs::read_to_string(&aggregate_path).expect("read report"))
            .expect("report is valid JSON");
    assert_eq!(report["total_sessions"], 2);
    assert_eq!(report["complexity"]["session_length_ratio"], 8.0);
}

#[test]
fn extract_writes_per_session_metrics() {
    let env = CliTestEnv::new();
    let source = env.source.to_string_lossy().into_owned();
    let output_dir = env.output.to_string_lossy().into_owned();

    let args = [
        "--source",
        source.as_str(),
        "--output",
        output_dir.as_str(),
    ];
    let output = run_bin(&env, "sessionscope-extract", &args);
    assert_success("sessionscope-extract", &args, &output);

    let routine_path = env.output.join("sessions/routine.json");
    assert!(routine_path.exists());

    let record: serde_json::Value =
        serde_json::from_str(&fs::read_to_string(&routine_path).expect("read metrics"))
            .expect("metrics are valid JSON");
    assert_eq!(record["prompt_tokens"], 25);
    assert_eq!(record["response_tokens"], 25);
    assert_eq!(record["iteration_count"], 1);
}

#[test]
fn aggregate_prints_report_and_fails_on_empty_corpus() {
    let env = CliTestEnv::new();
    let source = env.source.to_string_lossy().into_owned();

    let args = ["--source", source.as_str()];
    let output = run_bin(&env, "sessionscope-aggregate", &args);
    assert_success("sessionscope-aggregate", &args, &output);

    let report: serde_json::Value =
        serde_json::from_str(&String::from_utf8_lossy(&output.stdout))
            .expect("stdout is a JSON report");
    assert_eq!(report["total_sessions"], 2);

    // Empty corpus must exit nonzero
    let empty = env._temp_dir.path().join("empty");
    fs::create_dir_all(&empty).expect("create empty dir");
    let empty_source = empty.to_string_lossy().into_owned();
    let args = ["--source", empty_source.as_str()];
    let output = run_bin(&env, "sessionscope-aggregate", &args);
    assert!(
        !output.status.success(),
        "aggregate over an empty corpus must fail"
    );
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("empty corpus"));
}
