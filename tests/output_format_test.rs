//! Tests for the report and graph output formats produced by the CLI.

use std::fs;
use std::path::PathBuf;

use archlens::cli::{self, AnalyzeArgs, GraphArgs, EXIT_ERROR, EXIT_SKIPPED, EXIT_SUCCESS};
use serde_json::Value;
use tempfile::TempDir;

fn project_path() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("testdata")
        .join("project")
}

/// Write the bundled python schema into `dir` and return its path.
fn python_schema(dir: &TempDir) -> PathBuf {
    let path = dir.path().join("python.yaml");
    fs::write(&path, cli::template("python").unwrap()).unwrap();
    path
}

fn analyze_args(schema: PathBuf, output: PathBuf) -> AnalyzeArgs {
    AnalyzeArgs {
        path: project_path(),
        schema,
        format: "json".to_string(),
        output: Some(output),
        graph: None,
        exclude: Vec::new(),
        sequential: false,
        fail_on_skipped: false,
    }
}

fn run_and_get_json(args: &AnalyzeArgs) -> Value {
    assert_eq!(cli::run_analyze(args).unwrap(), EXIT_SUCCESS);
    let content = fs::read_to_string(args.output.as_ref().unwrap()).unwrap();
    serde_json::from_str(&content).expect("report should be valid JSON")
}

#[test]
fn test_json_report_structure() {
    let temp = TempDir::new().unwrap();
    let args = analyze_args(python_schema(&temp), temp.path().join("report.json"));
    let json = run_and_get_json(&args);

    for key in [
        "version",
        "language",
        "composition",
        "lines_per_file",
        "complexity",
        "quality",
        "dependencies",
        "patterns",
        "technologies",
        "skipped_files",
    ] {
        assert!(json.get(key).is_some(), "missing key {}", key);
    }

    assert_eq!(json["language"], "python");
    assert_eq!(json["composition"]["file_count"], 3);
    assert_eq!(json["composition"]["max_nesting_depth"], 11);
    assert_eq!(json["complexity"]["total_cyclomatic"], 7);
    assert_eq!(json["complexity"]["average_cyclomatic"], 3.5);
    assert_eq!(json["quality"]["exception_handling_count"], 1);
    assert_eq!(json["dependencies"]["import_frequency"]["os"], 2);
    assert_eq!(
        json["dependencies"]["direct_dependencies"],
        serde_json::json!(["flask", "os"])
    );
    assert_eq!(json["patterns"]["Endpoints Defined"]["count"], 1);
    assert_eq!(json["technologies"]["Frameworks"], serde_json::json!(["Flask"]));
    assert_eq!(json["technologies"]["CloudSDKs"], serde_json::json!([]));
    assert_eq!(json["complexity"]["comment_to_code_ratio"], 0.038);
    assert_eq!(json["dependencies"]["external_import_ratio"], 0.6);
}

#[test]
fn test_json_skipped_files() {
    let temp = TempDir::new().unwrap();
    let args = analyze_args(python_schema(&temp), temp.path().join("report.json"));
    let json = run_and_get_json(&args);

    let skipped = json["skipped_files"].as_array().unwrap();
    assert_eq!(skipped.len(), 1);
    assert_eq!(skipped[0]["path"], "broken.json");
    assert_eq!(skipped[0]["reason"], "malformed");
    assert!(skipped[0]["message"].as_str().unwrap().contains("broken.json"));
}

#[test]
fn test_json_output_is_identical_across_runs() {
    let temp = TempDir::new().unwrap();
    let schema = python_schema(&temp);

    let first = analyze_args(schema.clone(), temp.path().join("a.json"));
    let mut second = analyze_args(schema, temp.path().join("b.json"));
    second.sequential = true;

    assert_eq!(cli::run_analyze(&first).unwrap(), EXIT_SUCCESS);
    assert_eq!(cli::run_analyze(&second).unwrap(), EXIT_SUCCESS);
    assert_eq!(
        fs::read(temp.path().join("a.json")).unwrap(),
        fs::read(temp.path().join("b.json")).unwrap()
    );
}

#[test]
fn test_fail_on_skipped_exit_code() {
    let temp = TempDir::new().unwrap();
    let mut args = analyze_args(python_schema(&temp), temp.path().join("report.json"));
    args.fail_on_skipped = true;
    assert_eq!(cli::run_analyze(&args).unwrap(), EXIT_SKIPPED);

    args.exclude = vec!["broken.json".to_string()];
    assert_eq!(cli::run_analyze(&args).unwrap(), EXIT_SUCCESS);
}

#[test]
fn test_invalid_inputs_exit_with_error() {
    let temp = TempDir::new().unwrap();

    let mut args = analyze_args(temp.path().join("missing.yaml"), temp.path().join("r.json"));
    assert_eq!(cli::run_analyze(&args).unwrap(), EXIT_ERROR);

    args.schema = python_schema(&temp);
    args.format = "xml".to_string();
    assert_eq!(cli::run_analyze(&args).unwrap(), EXIT_ERROR);

    let both = temp.path().join("both.yaml");
    fs::write(
        &both,
        "internalDependencyPatterns: ['^a']\nexternalDependencyPatterns: ['^b']\n",
    )
    .unwrap();
    args.schema = both;
    args.format = "json".to_string();
    assert_eq!(cli::run_analyze(&args).unwrap(), EXIT_ERROR);
    assert!(!temp.path().join("r.json").exists());
}

#[test]
fn test_pretty_report_to_file() {
    let temp = TempDir::new().unwrap();
    let mut args = analyze_args(python_schema(&temp), temp.path().join("report.txt"));
    args.format = "pretty".to_string();
    args.graph = Some(temp.path().join("out/deps.dot"));
    assert_eq!(cli::run_analyze(&args).unwrap(), EXIT_SUCCESS);

    let text = fs::read_to_string(temp.path().join("report.txt")).unwrap();
    assert!(text.contains("Composition"));
    assert!(text.contains("broken.json"));
    // Colors are off when writing to a file
    assert!(!text.contains('\u{1b}'));

    let dot = fs::read_to_string(temp.path().join("out/deps.dot")).unwrap();
    assert!(dot.starts_with("digraph G {\n"));
    assert!(dot.ends_with("}\n"));
}

#[test]
fn test_graph_json_format() {
    let temp = TempDir::new().unwrap();
    let output = temp.path().join("graph.json");
    let args = GraphArgs {
        path: project_path(),
        schema: python_schema(&temp),
        output: Some(output.clone()),
        format: "json".to_string(),
        exclude: Vec::new(),
        fail_on_skipped: false,
    };
    assert_eq!(cli::run_graph(&args).unwrap(), EXIT_SUCCESS);

    let json: Value = serde_json::from_str(&fs::read_to_string(&output).unwrap()).unwrap();
    let nodes = json["nodes"].as_array().unwrap();
    let edges = json["edges"].as_array().unwrap();
    assert_eq!(nodes.len(), 6);
    assert_eq!(edges.len(), 3);
    assert!(nodes
        .iter()
        .any(|n| n["id"] == "routes" && n["kind"] == "folder"));
    assert!(edges
        .iter()
        .any(|e| e["source"] == "app.py" && e["target"] == ".routes" && e["label"] == "imports"));
}

#[test]
fn test_graph_fail_on_skipped_exit_code() {
    let temp = TempDir::new().unwrap();
    let mut args = GraphArgs {
        path: project_path(),
        schema: python_schema(&temp),
        output: Some(temp.path().join("deps.dot")),
        format: "dot".to_string(),
        exclude: Vec::new(),
        fail_on_skipped: true,
    };
    assert_eq!(cli::run_graph(&args).unwrap(), EXIT_SKIPPED);
    assert!(temp.path().join("deps.dot").exists());

    args.exclude = vec!["broken.json".to_string()];
    assert_eq!(cli::run_graph(&args).unwrap(), EXIT_SUCCESS);
}
