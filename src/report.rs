//! Report finalization and output formatting.
//!
//! Supports two output formats:
//! - Pretty: colored terminal summary for human readability
//! - JSON: structured output for programmatic consumption

use colored::*;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::io::{self, Write};

use crate::analysis::stats::{Composition, SkippedFile, StatsAccumulator};
use crate::error::Result;
use crate::schema::{DependencyClassifier, SelectorSchema};

/// Final, immutable analysis report.
///
/// Every collection is ordered, so serializing the same report twice always
/// produces the same bytes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Report {
    pub version: String,
    pub language: String,
    pub composition: Composition,
    pub lines_per_file: BTreeMap<String, usize>,
    pub complexity: ComplexitySummary,
    pub quality: QualitySummary,
    pub dependencies: DependencySummary,
    pub patterns: BTreeMap<String, PatternSummary>,
    /// Dependency-map category to detected canonical names.
    pub technologies: BTreeMap<String, Vec<String>>,
    pub skipped_files: Vec<SkippedFile>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ComplexitySummary {
    pub total_cyclomatic: usize,
    /// Rounded to two decimals; 0 when there are no functions.
    pub average_cyclomatic: f64,
    /// Comments per line of code, rounded to three decimals.
    pub comment_to_code_ratio: f64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QualitySummary {
    pub exception_handling_count: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DependencySummary {
    pub import_count: usize,
    pub direct_dependency_count: usize,
    /// External import names.
    pub direct_dependencies: Vec<String>,
    /// In-project import names.
    pub internal_dependencies: Vec<String>,
    /// Share of import occurrences that are external, rounded to two decimals.
    pub external_import_ratio: f64,
    pub import_frequency: BTreeMap<String, usize>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PatternSummary {
    pub count: usize,
    pub values: Vec<String>,
}

/// Build the report for a finished run.
///
/// Fails only when the schema's dependency patterns do not compile.
pub fn finalize(stats: &StatsAccumulator, schema: &SelectorSchema) -> Result<Report> {
    let classifier = DependencyClassifier::from_schema(schema)?;

    let mut direct = Vec::new();
    let mut internal = Vec::new();
    let mut external_imports: usize = 0;
    for (name, &count) in &stats.dependencies.import_frequency {
        if classifier.is_internal(name) {
            internal.push(name.clone());
        } else {
            direct.push(name.clone());
            external_imports += count;
        }
    }
    let import_count = stats.dependencies.import_count;
    let external_import_ratio = round2(external_imports as f64 / import_count.max(1) as f64);

    let function_count = stats.composition.function_count;
    let average_cyclomatic = if function_count == 0 {
        0.0
    } else {
        round2(stats.total_cyclomatic as f64 / function_count as f64)
    };
    let comment_to_code_ratio = round3(
        stats.composition.comment_count as f64 / stats.composition.total_lines.max(1) as f64,
    );

    let patterns = stats
        .patterns
        .iter()
        .map(|(metric, p)| {
            (
                metric.clone(),
                PatternSummary {
                    count: p.count,
                    values: p.values.iter().cloned().collect(),
                },
            )
        })
        .collect();

    let mut skipped_files = stats.skipped.clone();
    skipped_files.sort();

    Ok(Report {
        version: env!("CARGO_PKG_VERSION").to_string(),
        language: schema.language.clone(),
        composition: stats.composition.clone(),
        lines_per_file: stats.lines_per_file.clone(),
        complexity: ComplexitySummary {
            total_cyclomatic: stats.total_cyclomatic,
            average_cyclomatic,
            comment_to_code_ratio,
        },
        quality: QualitySummary {
            exception_handling_count: stats.exception_handling_count,
        },
        dependencies: DependencySummary {
            import_count,
            direct_dependency_count: direct.len(),
            direct_dependencies: direct,
            internal_dependencies: internal,
            external_import_ratio,
            import_frequency: stats.dependencies.import_frequency.clone(),
        },
        patterns,
        technologies: detect_technologies(
            stats.dependencies.import_frequency.keys().map(String::as_str),
            &schema.dependency_maps,
        ),
        skipped_files,
    })
}

/// Canonical names per category whose substring occurs in any import name.
/// Every category is present; one without hits maps to an empty list.
pub fn detect_technologies<'a>(
    imports: impl Iterator<Item = &'a str>,
    maps: &BTreeMap<String, BTreeMap<String, String>>,
) -> BTreeMap<String, Vec<String>> {
    let imports: Vec<&str> = imports.collect();
    let mut detected = BTreeMap::new();
    for (category, rules) in maps {
        let hits: BTreeSet<&String> = rules
            .iter()
            .filter(|(needle, _)| imports.iter().any(|name| name.contains(needle.as_str())))
            .map(|(_, canonical)| canonical)
            .collect();
        detected.insert(category.clone(), hits.into_iter().cloned().collect());
    }
    detected
}

fn round2(x: f64) -> f64 {
    (x * 100.0).round() / 100.0
}

fn round3(x: f64) -> f64 {
    (x * 1000.0).round() / 1000.0
}

// =============================================================================
// JSON Format
// =============================================================================

pub fn to_json_string(report: &Report) -> serde_json::Result<String> {
    serde_json::to_string_pretty(report)
}

/// Write the report as pretty-printed JSON followed by a newline.
pub fn write_json<W: Write>(writer: &mut W, report: &Report) -> anyhow::Result<()> {
    let json = to_json_string(report)?;
    writeln!(writer, "{}", json)?;
    Ok(())
}

// =============================================================================
// Pretty Format (colored terminal output)
// =============================================================================

/// Number of entries shown for ranked lists in the terminal summary.
const TOP_N: usize = 10;

pub fn write_pretty<W: Write>(writer: &mut W, path: &str, report: &Report) -> io::Result<()> {
    let w = writer;

    // Header
    writeln!(w)?;
    writeln!(
        w,
        "  {} v{}",
        "archlens".cyan().bold(),
        env!("CARGO_PKG_VERSION")
    )?;
    writeln!(w)?;
    writeln!(w, "  {}{}", "Analyzing: ".dimmed(), path)?;
    writeln!(w, "  {}{}", "Language:  ".dimmed(), display_or(&report.language, "-"))?;
    writeln!(w)?;

    write_composition(w, report)?;
    writeln!(w)?;
    write_dependencies(w, &report.dependencies)?;
    writeln!(w)?;

    if !report.technologies.is_empty() {
        writeln!(w, "  {}:", "Technologies".bold())?;
        for (category, names) in &report.technologies {
            if names.is_empty() {
                writeln!(w, "    {:<20}{}", category.dimmed(), "-".dimmed())?;
            } else {
                writeln!(w, "    {:<20}{}", category.dimmed(), names.join(", ").green())?;
            }
        }
        writeln!(w)?;
    }

    if !report.patterns.is_empty() {
        writeln!(w, "  {}:", "Patterns".bold())?;
        for (metric, p) in &report.patterns {
            writeln!(w, "    {:<28}{}", metric, p.count.to_string().bold())?;
            for value in p.values.iter().take(TOP_N) {
                writeln!(w, "        {}", value.dimmed())?;
            }
            if p.values.len() > TOP_N {
                writeln!(
                    w,
                    "        {}",
                    format!("... and {} more", p.values.len() - TOP_N).dimmed()
                )?;
            }
        }
        writeln!(w)?;
    }

    if !report.skipped_files.is_empty() {
        writeln!(
            w,
            "  {} ({}):",
            "Skipped files".bold(),
            report.skipped_files.len()
        )?;
        for s in &report.skipped_files {
            writeln!(
                w,
                "    {} {}  {}",
                "SKIP".yellow(),
                s.path.blue(),
                s.reason.to_string().dimmed()
            )?;
            writeln!(w, "         {}", s.message)?;
        }
        writeln!(w)?;
    }

    write_final_status(w, report)?;
    writeln!(w)
}

fn write_composition<W: Write>(w: &mut W, report: &Report) -> io::Result<()> {
    let c = &report.composition;
    writeln!(w, "  {}:", "Composition".bold())?;
    writeln!(w, "    {:<20}{}", "Files", c.file_count)?;
    writeln!(w, "    {:<20}{}", "Lines", c.total_lines)?;
    writeln!(w, "    {:<20}{}", "Functions", c.function_count)?;
    writeln!(w, "    {:<20}{}", "Classes", c.class_count)?;
    writeln!(w, "    {:<20}{}", "Comments", c.comment_count)?;
    writeln!(w, "    {:<20}{}", "Max nesting", c.max_nesting_depth)?;
    writeln!(
        w,
        "    {:<20}{}  (avg {})",
        "Complexity",
        report.complexity.total_cyclomatic,
        colored_average(report.complexity.average_cyclomatic)
    )?;
    writeln!(
        w,
        "    {:<20}{}",
        "Comment ratio", report.complexity.comment_to_code_ratio
    )?;
    writeln!(
        w,
        "    {:<20}{}",
        "Exception handlers", report.quality.exception_handling_count
    )
}

fn colored_average(avg: f64) -> ColoredString {
    let s = format!("{:.2}", avg);
    match avg {
        a if a <= 5.0 => s.green(),
        a if a <= 10.0 => s.yellow(),
        _ => s.red(),
    }
}

fn write_dependencies<W: Write>(w: &mut W, deps: &DependencySummary) -> io::Result<()> {
    writeln!(w, "  {}:", "Dependencies".bold())?;
    writeln!(w, "    {:<20}{}", "Imports", deps.import_count)?;
    writeln!(w, "    {:<20}{}", "External", deps.direct_dependency_count)?;
    writeln!(w, "    {:<20}{}", "Internal", deps.internal_dependencies.len())?;
    writeln!(w, "    {:<20}{}", "External ratio", deps.external_import_ratio)?;

    // Most frequent first, ties by name
    let mut ranked: Vec<(&String, &usize)> = deps.import_frequency.iter().collect();
    ranked.sort_by(|a, b| b.1.cmp(a.1).then_with(|| a.0.cmp(b.0)));
    if !ranked.is_empty() {
        writeln!(w)?;
        writeln!(w, "    {}", "Most imported:".dimmed())?;
        for (name, count) in ranked.into_iter().take(TOP_N) {
            writeln!(w, "      {:>5}  {}", count, name.blue())?;
        }
    }
    Ok(())
}

fn write_final_status<W: Write>(w: &mut W, report: &Report) -> io::Result<()> {
    let analyzed = report.composition.file_count;
    let skipped = report.skipped_files.len();
    if skipped == 0 {
        writeln!(
            w,
            "  {} {} files analyzed",
            "✓".green(),
            analyzed.to_string().bold()
        )
    } else {
        writeln!(
            w,
            "  {} {} files analyzed, {} skipped",
            "!".yellow(),
            analyzed.to_string().bold(),
            skipped.to_string().yellow()
        )
    }
}

fn display_or<'a>(s: &'a str, fallback: &'a str) -> &'a str {
    if s.is_empty() {
        fallback
    } else {
        s
    }
}
