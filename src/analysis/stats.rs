//! Run-scoped statistics accumulator.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

use crate::schema::SelectorSchema;

/// Code composition counters.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Composition {
    pub file_count: usize,
    pub total_lines: usize,
    pub function_count: usize,
    pub class_count: usize,
    pub comment_count: usize,
    pub max_nesting_depth: usize,
}

/// Import counters.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DependencyStats {
    /// Every import node seen, named or not.
    pub import_count: usize,
    /// Extracted import name to number of occurrences.
    pub import_frequency: BTreeMap<String, usize>,
}

/// Matches for one pattern metric.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PatternStats {
    pub count: usize,
    pub values: BTreeSet<String>,
}

/// Why a file did not contribute to the run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SkipReason {
    /// The tree could not be decoded.
    Malformed,
    /// The tree could not be read.
    Unreadable,
}

impl std::fmt::Display for SkipReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SkipReason::Malformed => write!(f, "malformed"),
            SkipReason::Unreadable => write!(f, "unreadable"),
        }
    }
}

/// A file left out of the aggregation.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct SkippedFile {
    pub path: String,
    pub reason: SkipReason,
    pub message: String,
}

/// Aggregated statistics for one analysis run.
///
/// Owned by the run that created it. Parallel workers each fill their own
/// accumulator and the results are folded together with [`merge`](Self::merge).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatsAccumulator {
    pub composition: Composition,
    /// Lines of code per analyzed file, keyed by relative path.
    pub lines_per_file: BTreeMap<String, usize>,
    pub total_cyclomatic: usize,
    pub exception_handling_count: usize,
    pub dependencies: DependencyStats,
    pub patterns: BTreeMap<String, PatternStats>,
    pub skipped: Vec<SkippedFile>,
}

impl StatsAccumulator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Accumulator with an empty entry for every pattern metric in the schema,
    /// so metrics with no hits still appear in the report.
    pub fn for_schema(schema: &SelectorSchema) -> Self {
        let mut acc = Self::default();
        for metric in schema.pattern_metrics() {
            acc.patterns.insert(metric.to_string(), PatternStats::default());
        }
        acc
    }

    /// Count one occurrence of an import name.
    pub fn record_import_name(&mut self, name: &str) {
        *self
            .dependencies
            .import_frequency
            .entry(name.to_string())
            .or_insert(0) += 1;
    }

    /// Count one pattern match, optionally with its extracted value.
    pub fn record_pattern(&mut self, metric: &str, value: Option<String>) {
        let entry = self.patterns.entry(metric.to_string()).or_default();
        entry.count += 1;
        if let Some(v) = value {
            entry.values.insert(v);
        }
    }

    pub fn record_skipped(&mut self, skipped: SkippedFile) {
        self.skipped.push(skipped);
    }

    /// Fold another accumulator into this one.
    pub fn merge(&mut self, other: StatsAccumulator) {
        let c = &mut self.composition;
        c.file_count += other.composition.file_count;
        c.total_lines += other.composition.total_lines;
        c.function_count += other.composition.function_count;
        c.class_count += other.composition.class_count;
        c.comment_count += other.composition.comment_count;
        c.max_nesting_depth = c.max_nesting_depth.max(other.composition.max_nesting_depth);

        for (path, lines) in other.lines_per_file {
            *self.lines_per_file.entry(path).or_insert(0) += lines;
        }

        self.total_cyclomatic += other.total_cyclomatic;
        self.exception_handling_count += other.exception_handling_count;

        self.dependencies.import_count += other.dependencies.import_count;
        for (name, count) in other.dependencies.import_frequency {
            *self.dependencies.import_frequency.entry(name).or_insert(0) += count;
        }

        for (metric, stats) in other.patterns {
            let entry = self.patterns.entry(metric).or_default();
            entry.count += stats.count;
            entry.values.extend(stats.values);
        }

        self.skipped.extend(other.skipped);
    }

    pub fn skipped_count(&self) -> usize {
        self.skipped.len()
    }
}
