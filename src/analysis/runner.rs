//! Project runner that folds every syntax tree into one report and one graph.

use std::path::PathBuf;

use tracing::{debug, info, warn};

use crate::error::{AnalysisError, Result};
use crate::graph::DependencyGraph;
use crate::schema::{DependencyClassifier, SelectorSchema};
use crate::tree::load_tree;

use super::aggregate::{analyze_file_at, extract_imports};
use super::stats::{SkipReason, SkippedFile, StatsAccumulator};

/// One serialized syntax tree on disk.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub struct AstFile {
    pub path: PathBuf,
    /// Path relative to the project root, `/`-separated.
    pub rel_path: String,
}

impl AstFile {
    pub fn new<P: Into<PathBuf>>(path: P, rel_path: &str) -> Self {
        Self {
            path: path.into(),
            rel_path: rel_path.replace('\\', "/"),
        }
    }
}

/// Everything one file contributed.
#[derive(Debug, Clone)]
pub struct FileAnalysis {
    pub rel_path: String,
    pub stats: StatsAccumulator,
    pub imports: Vec<String>,
}

/// Result of a whole run.
#[derive(Debug, Clone)]
pub struct ProjectAnalysis {
    pub stats: StatsAccumulator,
    pub graph: DependencyGraph,
}

/// Runs the aggregator over a set of syntax tree files.
pub struct Runner<'s> {
    schema: &'s SelectorSchema,
    parallel: bool,
}

impl<'s> Runner<'s> {
    pub fn new(schema: &'s SelectorSchema) -> Self {
        Self {
            schema,
            parallel: true,
        }
    }

    /// Set whether files are analyzed on the rayon pool.
    pub fn parallel(mut self, parallel: bool) -> Self {
        self.parallel = parallel;
        self
    }

    /// Analyze `files`.
    ///
    /// Fails only on schema problems, before any file is read. Files that
    /// cannot be read or decoded are recorded as skipped and the run goes on.
    pub fn run(&self, files: &[AstFile]) -> Result<ProjectAnalysis> {
        let classifier = DependencyClassifier::from_schema(self.schema)?;
        info!(
            language = self.schema.display_language(),
            files = files.len(),
            parallel = self.parallel,
            "starting analysis"
        );

        let mut outcomes: Vec<(String, std::result::Result<FileAnalysis, SkippedFile>)> =
            if self.parallel {
                use rayon::prelude::*;
                files
                    .par_iter()
                    .map(|f| (f.rel_path.clone(), self.analyze_one(f)))
                    .collect()
            } else {
                files
                    .iter()
                    .map(|f| (f.rel_path.clone(), self.analyze_one(f)))
                    .collect()
            };

        // Sort by path for deterministic merging
        outcomes.sort_by(|a, b| a.0.cmp(&b.0));

        let mut stats = StatsAccumulator::for_schema(self.schema);
        let mut graph = DependencyGraph::new();
        for (_, outcome) in outcomes {
            match outcome {
                Ok(file) => {
                    graph.add_file_imports(&file.rel_path, &file.imports, &classifier);
                    stats.merge(file.stats);
                }
                Err(skipped) => {
                    warn!(
                        path = %skipped.path,
                        reason = %skipped.reason,
                        "skipping file: {}",
                        skipped.message
                    );
                    stats.record_skipped(skipped);
                }
            }
        }

        info!(
            analyzed = stats.composition.file_count,
            skipped = stats.skipped_count(),
            nodes = graph.node_count(),
            edges = graph.edge_count(),
            "analysis finished"
        );
        Ok(ProjectAnalysis { stats, graph })
    }

    fn analyze_one(&self, file: &AstFile) -> std::result::Result<FileAnalysis, SkippedFile> {
        let tree = load_tree(&file.path).map_err(|e| skipped(&file.rel_path, e))?;

        let mut stats = StatsAccumulator::new();
        analyze_file_at(&file.rel_path, tree.as_ref(), self.schema, &mut stats);
        let imports = tree
            .as_ref()
            .map(|t| extract_imports(t, self.schema))
            .unwrap_or_default();

        debug!(
            path = %file.rel_path,
            empty = tree.is_none(),
            imports = imports.len(),
            "analyzed file"
        );
        Ok(FileAnalysis {
            rel_path: file.rel_path.clone(),
            stats,
            imports,
        })
    }
}

fn skipped(rel_path: &str, err: AnalysisError) -> SkippedFile {
    let reason = match err {
        AnalysisError::Io { .. } => SkipReason::Unreadable,
        _ => SkipReason::Malformed,
    };
    SkippedFile {
        path: rel_path.to_string(),
        reason,
        message: err.to_string(),
    }
}
