//! Command-line interface for archlens.

use clap::{Parser, Subcommand};
use colored::Colorize;
use std::fs::{self, File};
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};
use tracing::{info, warn};

use crate::analysis::{ProjectAnalysis, Runner};
use crate::discover;
use crate::report;
use crate::schema::SelectorSchema;

/// Exit codes.
pub const EXIT_SUCCESS: i32 = 0;
pub const EXIT_SKIPPED: i32 = 1;
pub const EXIT_ERROR: i32 = 2;

/// Schema-driven architecture metrics and dependency graphs.
///
/// archlens reads JSON syntax trees (one per source file), interprets them
/// through a per-language selector schema, and reports code composition,
/// complexity, dependencies and usage patterns. It can also render the
/// project's internal dependency structure as a Graphviz graph.
#[derive(Parser)]
#[command(name = "archlens")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Verbose logging (debug level)
    #[arg(short, long, global = true, conflicts_with = "quiet")]
    pub verbose: bool,

    /// Only log warnings and errors
    #[arg(short, long, global = true)]
    pub quiet: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Analyze a directory of syntax trees and print a report
    #[command(visible_alias = "stats")]
    Analyze(AnalyzeArgs),
    /// Build the in-project dependency graph
    Graph(GraphArgs),
    /// Parse source files into JSON syntax trees
    #[cfg(feature = "tree-sitter")]
    Parse(ParseArgs),
    /// Create a selector schema from a bundled template
    Init(InitArgs),
}

/// Arguments for the analyze command.
#[derive(Parser)]
pub struct AnalyzeArgs {
    /// Directory of `*.json` syntax trees (or a single tree file)
    pub path: PathBuf,

    /// Selector schema (YAML or JSON)
    #[arg(short, long)]
    pub schema: PathBuf,

    /// Output format: pretty or json
    #[arg(short, long, default_value = "pretty")]
    pub format: String,

    /// Write the report to this file instead of stdout
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// Also write the dependency graph (DOT) to this file
    #[arg(long)]
    pub graph: Option<PathBuf>,

    /// Glob of relative paths to leave out (repeatable)
    #[arg(long)]
    pub exclude: Vec<String>,

    /// Analyze files on one thread
    #[arg(long)]
    pub sequential: bool,

    /// Exit non-zero when any file was skipped
    #[arg(long)]
    pub fail_on_skipped: bool,
}

/// Arguments for the graph command.
#[derive(Parser)]
pub struct GraphArgs {
    /// Directory of `*.json` syntax trees
    pub path: PathBuf,

    /// Selector schema (YAML or JSON)
    #[arg(short, long)]
    pub schema: PathBuf,

    /// Output file (default: stdout)
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// Output format: dot or json
    #[arg(short, long, default_value = "dot")]
    pub format: String,

    /// Glob of relative paths to leave out (repeatable)
    #[arg(long)]
    pub exclude: Vec<String>,

    /// Exit non-zero when any file was skipped
    #[arg(long)]
    pub fail_on_skipped: bool,
}

/// Arguments for the parse command.
#[cfg(feature = "tree-sitter")]
#[derive(Parser)]
pub struct ParseArgs {
    /// Project root to parse
    pub path: PathBuf,

    /// Directory the trees are written to, mirroring the project layout
    #[arg(short, long, default_value = "ast")]
    pub output: PathBuf,

    /// Hide the progress bar
    #[arg(long)]
    pub no_progress: bool,
}

/// Arguments for the init command.
#[derive(Parser)]
pub struct InitArgs {
    /// Output file path
    #[arg(short, long, default_value = "schema.yaml")]
    pub output: PathBuf,

    /// Template to use
    #[arg(short, long, default_value = "python")]
    pub template: String,

    /// List available templates
    #[arg(short, long)]
    pub list: bool,
}

/// A bundled selector schema.
struct Template {
    name: &'static str,
    description: &'static str,
    content: &'static str,
}

/// All bundled schemas.
static TEMPLATES: &[Template] = &[
    Template {
        name: "python",
        description: "Python: Flask/Django endpoints, DB-API queries, relative imports internal",
        content: include_str!("templates/python.yaml"),
    },
    Template {
        name: "javascript",
        description: "JS/TS: Express routes, fetch/axios, relative imports internal",
        content: include_str!("templates/javascript.yaml"),
    },
    Template {
        name: "java",
        description: "Java: Spring mappings, JDBC queries, library prefixes external",
        content: include_str!("templates/java.yaml"),
    },
];

/// Content of a bundled schema by name.
pub fn template(name: &str) -> Option<&'static str> {
    TEMPLATES.iter().find(|t| t.name == name).map(|t| t.content)
}

/// Names of every bundled schema.
pub fn template_names() -> impl Iterator<Item = &'static str> {
    TEMPLATES.iter().map(|t| t.name)
}

/// Shared front half of `analyze` and `graph`: load the schema, find the
/// trees, and run the aggregation. `Ok(None)` means an error was already
/// reported to the user.
fn load_and_run(
    schema_path: &Path,
    path: &Path,
    exclude: &[String],
    parallel: bool,
) -> anyhow::Result<Option<(SelectorSchema, ProjectAnalysis)>> {
    let schema = match SelectorSchema::load(schema_path) {
        Ok(s) => s,
        Err(e) => {
            eprintln!("Error: {}", e);
            return Ok(None);
        }
    };

    if !path.exists() {
        eprintln!("Error: cannot access path {:?}", path);
        return Ok(None);
    }

    let files = discover::collect_ast_files(path, exclude)?;
    if files.is_empty() {
        warn!(path = %path.display(), "no syntax tree files found");
    }

    let analysis = Runner::new(&schema).parallel(parallel).run(&files)?;
    Ok(Some((schema, analysis)))
}

/// Open `path` for writing, or stdout.
fn open_output(path: Option<&Path>) -> anyhow::Result<Box<dyn Write>> {
    match path {
        Some(p) => {
            create_parent_dir(p)?;
            Ok(Box::new(BufWriter::new(File::create(p)?)))
        }
        None => Ok(Box::new(io::stdout().lock())),
    }
}

fn create_parent_dir(path: &Path) -> io::Result<()> {
    match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() && parent != Path::new(".") => {
            fs::create_dir_all(parent)
        }
        _ => Ok(()),
    }
}

/// Run the analyze command.
pub fn run_analyze(args: &AnalyzeArgs) -> anyhow::Result<i32> {
    // Validate format
    if args.format != "pretty" && args.format != "json" {
        eprintln!(
            "Error: invalid format {:?}, must be 'pretty' or 'json'",
            args.format
        );
        return Ok(EXIT_ERROR);
    }

    let (schema, analysis) =
        match load_and_run(&args.schema, &args.path, &args.exclude, !args.sequential)? {
            Some(r) => r,
            None => return Ok(EXIT_ERROR),
        };

    let report = report::finalize(&analysis.stats, &schema)?;

    let mut out = open_output(args.output.as_deref())?;
    match args.format.as_str() {
        "json" => report::write_json(&mut out, &report)?,
        _ => {
            if args.output.is_some() {
                colored::control::set_override(false);
            }
            let path_str = args.path.to_string_lossy().to_string();
            report::write_pretty(&mut out, &path_str, &report)?;
        }
    }
    out.flush()?;

    if let Some(graph_path) = &args.graph {
        create_parent_dir(graph_path)?;
        fs::write(graph_path, analysis.graph.render_dot())?;
        info!(path = %graph_path.display(), "wrote dependency graph");
    }

    // Return appropriate exit code
    if args.fail_on_skipped && !report.skipped_files.is_empty() {
        Ok(EXIT_SKIPPED)
    } else {
        Ok(EXIT_SUCCESS)
    }
}

/// Run the graph command.
pub fn run_graph(args: &GraphArgs) -> anyhow::Result<i32> {
    if args.format != "dot" && args.format != "json" {
        eprintln!(
            "Error: invalid format {:?}, must be 'dot' or 'json'",
            args.format
        );
        return Ok(EXIT_ERROR);
    }

    let (_, analysis) = match load_and_run(&args.schema, &args.path, &args.exclude, true)? {
        Some(r) => r,
        None => return Ok(EXIT_ERROR),
    };

    let rendered = match args.format.as_str() {
        "json" => format!("{}\n", serde_json::to_string_pretty(&analysis.graph)?),
        _ => analysis.graph.render_dot(),
    };

    let mut out = open_output(args.output.as_deref())?;
    out.write_all(rendered.as_bytes())?;
    out.flush()?;

    if let Some(path) = &args.output {
        println!(
            "Wrote {} nodes and {} edges to {}",
            analysis.graph.node_count(),
            analysis.graph.edge_count(),
            path.display()
        );
    }

    // Stdout may carry the graph itself, so the skip summary goes to stderr
    let skipped = &analysis.stats.skipped;
    if !skipped.is_empty() {
        eprintln!(
            "{} {} files skipped",
            "!".yellow(),
            skipped.len().to_string().yellow()
        );
        for s in skipped {
            eprintln!("    {} {}  {}", "SKIP".yellow(), s.path, s.reason);
        }
    }

    if args.fail_on_skipped && !skipped.is_empty() {
        Ok(EXIT_SKIPPED)
    } else {
        Ok(EXIT_SUCCESS)
    }
}

/// Run the parse command.
#[cfg(feature = "tree-sitter")]
pub fn run_parse(args: &ParseArgs) -> anyhow::Result<i32> {
    use indicatif::{ProgressBar, ProgressStyle};

    use crate::parser;

    let root = match args.path.canonicalize() {
        Ok(p) => p,
        Err(e) => {
            eprintln!("Error: cannot access path {:?}: {}", args.path, e);
            return Ok(EXIT_ERROR);
        }
    };
    if !root.is_dir() {
        eprintln!("Error: {} is not a directory", root.display());
        return Ok(EXIT_ERROR);
    }

    fs::create_dir_all(&args.output)?;
    let out_dir = args.output.canonicalize()?;

    // Never re-parse our own output when it lives inside the project
    let sources = discover::collect_source_files(&root, parser::is_supported_extension)?;
    let files: Vec<PathBuf> = sources
        .into_iter()
        .filter(|p| !p.starts_with(&out_dir))
        .collect();

    if files.is_empty() {
        eprintln!("Warning: no supported source files found");
        return Ok(EXIT_SUCCESS);
    }

    let progress = if args.no_progress {
        ProgressBar::hidden()
    } else {
        ProgressBar::new(files.len() as u64)
    };
    progress.set_style(
        ProgressStyle::with_template("{spinner} [{bar:40}] {pos}/{len} {wide_msg}")?
            .progress_chars("=> "),
    );

    let mut parsed = 0usize;
    let mut failed = 0usize;
    for path in &files {
        let rel = discover::relative_path(&root, path);
        progress.set_message(rel.clone());

        let result = parser::parse_file(path).and_then(|tree| {
            let target = parser::output_path(&out_dir, &rel);
            create_parent_dir(&target)?;
            fs::write(&target, serde_json::to_string_pretty(&tree)?)?;
            Ok(())
        });

        match result {
            Ok(()) => parsed += 1,
            Err(e) => {
                failed += 1;
                progress.suspend(|| warn!(path = %rel, "could not parse: {}", e));
            }
        }
        progress.inc(1);
    }
    progress.finish_and_clear();

    println!(
        "Parsed {} files into {}{}",
        parsed,
        out_dir.display(),
        if failed > 0 {
            format!(" ({} failed)", failed)
        } else {
            String::new()
        }
    );

    if parsed == 0 {
        Ok(EXIT_ERROR)
    } else {
        Ok(EXIT_SUCCESS)
    }
}

/// Run the init command.
pub fn run_init(args: &InitArgs) -> anyhow::Result<i32> {
    // List mode
    if args.list {
        return list_templates();
    }

    // Find template
    let template = match TEMPLATES.iter().find(|t| t.name == args.template) {
        Some(t) => t,
        None => {
            eprintln!("Error: unknown template {:?}", args.template);
            eprintln!("Run 'archlens init --list' to see available templates");
            return Ok(EXIT_ERROR);
        }
    };

    // Check if output already exists
    if args.output.exists() {
        eprintln!("Error: file already exists: {}", args.output.display());
        eprintln!("Remove it or use --output to specify a different path");
        return Ok(EXIT_ERROR);
    }

    if let Err(e) = create_parent_dir(&args.output) {
        eprintln!("Error: failed to create directory: {}", e);
        return Ok(EXIT_ERROR);
    }

    if let Err(e) = fs::write(&args.output, template.content) {
        eprintln!("Error: failed to write schema: {}", e);
        return Ok(EXIT_ERROR);
    }

    println!("Created {} from template '{}'", args.output.display(), template.name);
    println!();
    println!("Next steps:");
    println!("  1. Edit {} to match your project", args.output.display());
    println!("  2. Run: archlens parse . --output ast");
    println!(
        "  3. Run: archlens analyze ast --schema {} --graph deps.dot",
        args.output.display()
    );

    Ok(EXIT_SUCCESS)
}

/// List available templates.
fn list_templates() -> anyhow::Result<i32> {
    println!("Available templates:");
    println!();

    for template in TEMPLATES {
        let name = if template.name == "python" {
            format!("{} (default)", template.name)
        } else {
            template.name.to_string()
        };
        println!("  {:<20} {}", name, template.description);
    }

    println!();
    println!("Usage:");
    println!("  archlens init --template <name>");

    Ok(EXIT_SUCCESS)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema;
    use clap::CommandFactory;
    use tempfile::TempDir;

    #[test]
    fn test_cli_definition() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_bundled_templates_validate() {
        for name in template_names() {
            let content = template(name).unwrap();
            let parsed = SelectorSchema::from_yaml_str(content)
                .unwrap_or_else(|e| panic!("template {} does not parse: {}", name, e));
            schema::validate(&parsed)
                .unwrap_or_else(|e| panic!("template {} is invalid: {}", name, e));
            assert_eq!(parsed.language, name);
        }
    }

    #[test]
    fn test_init_writes_template() {
        let temp = TempDir::new().unwrap();
        let output = temp.path().join("schemas/java.yaml");
        let args = InitArgs {
            output: output.clone(),
            template: "java".to_string(),
            list: false,
        };
        assert_eq!(run_init(&args).unwrap(), EXIT_SUCCESS);
        assert_eq!(fs::read_to_string(&output).unwrap(), template("java").unwrap());

        // Refuses to overwrite
        assert_eq!(run_init(&args).unwrap(), EXIT_ERROR);
    }

    #[test]
    fn test_init_unknown_template() {
        let temp = TempDir::new().unwrap();
        let args = InitArgs {
            output: temp.path().join("x.yaml"),
            template: "cobol".to_string(),
            list: false,
        };
        assert_eq!(run_init(&args).unwrap(), EXIT_ERROR);
    }

    #[test]
    fn test_parse_args() {
        let cli = Cli::try_parse_from([
            "archlens",
            "-v",
            "analyze",
            "ast",
            "--schema",
            "python.yaml",
            "--exclude",
            "tests/**",
            "--exclude",
            "**/vendor/**",
            "--fail-on-skipped",
        ])
        .unwrap();
        assert!(cli.verbose);
        match cli.command {
            Commands::Analyze(args) => {
                assert_eq!(args.exclude.len(), 2);
                assert_eq!(args.format, "pretty");
                assert!(args.fail_on_skipped);
                assert!(!args.sequential);
            }
            _ => panic!("expected analyze"),
        }
    }

    #[test]
    fn test_parse_graph_args() {
        let cli = Cli::try_parse_from([
            "archlens",
            "graph",
            "ast",
            "--schema",
            "python.yaml",
            "--fail-on-skipped",
        ])
        .unwrap();
        match cli.command {
            Commands::Graph(args) => {
                assert_eq!(args.format, "dot");
                assert!(args.output.is_none());
                assert!(args.fail_on_skipped);
            }
            _ => panic!("expected graph"),
        }
    }
}
