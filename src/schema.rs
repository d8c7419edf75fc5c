//! Selector schema definitions.
//!
//! A selector schema describes, for one language, which node types play which
//! role and how to pull names out of import and usage nodes. Everything the
//! engine knows about a language lives here; the query code itself has no
//! grammar knowledge.

use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use crate::error::{AnalysisError, Result};
use crate::tree::SyntaxNode;

/// Top-level schema document.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct SelectorSchema {
    /// Language identifier. Used for diagnostics only.
    #[serde(default)]
    pub language: String,
    #[serde(default)]
    pub selectors: Selectors,
    /// Category (e.g. "Frameworks") to `{substring => canonical name}`.
    #[serde(default)]
    pub dependency_maps: BTreeMap<String, BTreeMap<String, String>>,
    /// Import names matching any of these are in-project.
    #[serde(default)]
    pub internal_dependency_patterns: Vec<String>,
    /// Import names matching none of these are in-project.
    #[serde(default)]
    pub external_dependency_patterns: Vec<String>,
}

/// The `selectors` section.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct Selectors {
    #[serde(default)]
    pub function: Vec<String>,
    #[serde(default)]
    pub class: Vec<String>,
    #[serde(default)]
    pub comment: Vec<String>,
    #[serde(default)]
    pub import: Vec<ImportSelector>,
    /// Metric name (e.g. "Endpoints Defined") to one or more rules.
    #[serde(default)]
    pub patterns: BTreeMap<String, OneOrMany<PatternSelector>>,
    #[serde(default)]
    pub quality: QualitySelectors,
    #[serde(default)]
    pub cyclomatic_complexity: ComplexityRules,
}

#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct QualitySelectors {
    #[serde(default)]
    pub exception_handling: Vec<String>,
}

#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct ComplexityRules {
    #[serde(default)]
    pub branching_nodes: Vec<String>,
}

/// Node type representing an import, and where its module name lives.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ImportSelector {
    #[serde(rename = "type")]
    pub node_type: String,
    #[serde(default)]
    pub source: Option<PathQuery>,
}

/// A usage-pattern rule.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PatternSelector {
    #[serde(rename = "type")]
    pub node_type: String,
    /// Substring the node text must contain. Unset means any node of the type.
    #[serde(default)]
    pub text_match: Option<String>,
    #[serde(default)]
    pub value: Option<PathQuery>,
}

impl PatternSelector {
    /// Whether a node satisfies both the type and the substring constraint.
    pub fn matches(&self, node: &SyntaxNode) -> bool {
        node.kind == self.node_type
            && self
                .text_match
                .as_deref()
                .map_or(true, |needle| node.text.contains(needle))
    }
}

/// Either a single value or a list of them.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(untagged)]
pub enum OneOrMany<T> {
    One(T),
    Many(Vec<T>),
}

impl<T> OneOrMany<T> {
    pub fn as_slice(&self) -> &[T] {
        match self {
            OneOrMany::One(v) => std::slice::from_ref(v),
            OneOrMany::Many(v) => v,
        }
    }
}

/// Ordered child-walk used to extract a text value from a node.
#[derive(Debug, Clone, Deserialize, Serialize, Default, PartialEq, Eq)]
pub struct PathQuery {
    #[serde(default)]
    pub path: Vec<PathStep>,
}

impl PathQuery {
    pub fn new(path: Vec<PathStep>) -> Self {
        Self { path }
    }
}

/// One step of a path query.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct PathStep {
    #[serde(rename = "type")]
    pub types: TypeMatch,
    #[serde(default)]
    pub text_match: Option<String>,
}

impl PathStep {
    /// Step matching a single child type.
    pub fn of(kind: &str) -> Self {
        Self {
            types: TypeMatch::One(kind.to_string()),
            text_match: None,
        }
    }

    /// Step matching any of several child types (final step only).
    pub fn any_of(kinds: &[&str]) -> Self {
        Self {
            types: TypeMatch::Any(kinds.iter().map(|k| k.to_string()).collect()),
            text_match: None,
        }
    }

    /// Require the child text to contain `needle`.
    pub fn containing(mut self, needle: &str) -> Self {
        self.text_match = Some(needle.to_string());
        self
    }

    /// Whether `node` satisfies this step. A type set only matches on the
    /// final step.
    pub fn matches(&self, node: &SyntaxNode, is_last: bool) -> bool {
        let type_ok = match &self.types {
            TypeMatch::One(kind) => node.kind == *kind,
            TypeMatch::Any(kinds) => is_last && kinds.iter().any(|k| *k == node.kind),
        };
        type_ok
            && self
                .text_match
                .as_deref()
                .map_or(true, |needle| node.text.contains(needle))
    }
}

/// A step's type constraint.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq, Eq)]
#[serde(untagged)]
pub enum TypeMatch {
    One(String),
    Any(Vec<String>),
}

/// Semantic roles a node type can fill.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StructuralRole {
    Function,
    Class,
    Comment,
    ExceptionHandling,
}

impl StructuralRole {
    pub const ALL: [StructuralRole; 4] = [
        StructuralRole::Function,
        StructuralRole::Class,
        StructuralRole::Comment,
        StructuralRole::ExceptionHandling,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            StructuralRole::Function => "function",
            StructuralRole::Class => "class",
            StructuralRole::Comment => "comment",
            StructuralRole::ExceptionHandling => "exceptionHandling",
        }
    }
}

impl std::fmt::Display for StructuralRole {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl SelectorSchema {
    /// Parse a schema file. `.json` files are read as JSON, everything else
    /// as YAML.
    pub fn parse_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path).map_err(|e| match e.kind() {
            std::io::ErrorKind::NotFound => AnalysisError::Configuration(format!(
                "schema file {} does not exist",
                path.display()
            )),
            _ => AnalysisError::io(path, e),
        })?;

        let is_json = path
            .extension()
            .and_then(|e| e.to_str())
            .is_some_and(|e| e.eq_ignore_ascii_case("json"));
        if is_json {
            Self::from_json_str(&content)
        } else {
            Self::from_yaml_str(&content)
        }
    }

    pub fn from_json_str(content: &str) -> Result<Self> {
        serde_json::from_str(content)
            .map_err(|e| AnalysisError::Configuration(format!("decoding JSON schema: {}", e)))
    }

    pub fn from_yaml_str(content: &str) -> Result<Self> {
        serde_yaml::from_str(content)
            .map_err(|e| AnalysisError::Configuration(format!("decoding YAML schema: {}", e)))
    }

    /// Parse and validate a schema file.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let schema = Self::parse_file(path)?;
        validate(&schema)?;
        Ok(schema)
    }

    /// Node types that fill a structural role.
    pub fn role_types(&self, role: StructuralRole) -> &[String] {
        match role {
            StructuralRole::Function => &self.selectors.function,
            StructuralRole::Class => &self.selectors.class,
            StructuralRole::Comment => &self.selectors.comment,
            StructuralRole::ExceptionHandling => &self.selectors.quality.exception_handling,
        }
    }

    pub fn branching_nodes(&self) -> &[String] {
        &self.selectors.cyclomatic_complexity.branching_nodes
    }

    /// Names of every configured pattern metric, sorted.
    pub fn pattern_metrics(&self) -> impl Iterator<Item = &str> {
        self.selectors.patterns.keys().map(String::as_str)
    }

    /// Display name for logs.
    pub fn display_language(&self) -> &str {
        if self.language.is_empty() {
            "unnamed"
        } else {
            &self.language
        }
    }
}

/// Validate a schema for correctness.
pub fn validate(schema: &SelectorSchema) -> Result<()> {
    DependencyClassifier::from_schema(schema)?;

    for (i, selector) in schema.selectors.import.iter().enumerate() {
        if selector.node_type.is_empty() {
            return Err(AnalysisError::Configuration(format!(
                "import selector #{} has an empty type",
                i
            )));
        }
        if let Some(query) = &selector.source {
            validate_path_query(query, &format!("import selector {:?}", selector.node_type))?;
        }
    }

    for (metric, rules) in &schema.selectors.patterns {
        for rule in rules.as_slice() {
            if rule.node_type.is_empty() {
                return Err(AnalysisError::Configuration(format!(
                    "pattern {:?} has a rule with an empty type",
                    metric
                )));
            }
            if let Some(query) = &rule.value {
                validate_path_query(query, &format!("pattern {:?}", metric))?;
            }
        }
    }

    Ok(())
}

fn validate_path_query(query: &PathQuery, owner: &str) -> Result<()> {
    let last = query.path.len().saturating_sub(1);
    for (i, step) in query.path.iter().enumerate() {
        if let TypeMatch::Any(kinds) = &step.types {
            if i != last {
                return Err(AnalysisError::Configuration(format!(
                    "{}: a type list is only allowed on the final path step (step {})",
                    owner, i
                )));
            }
            if kinds.is_empty() {
                return Err(AnalysisError::Configuration(format!(
                    "{}: empty type list on step {}",
                    owner, i
                )));
            }
        }
    }
    Ok(())
}

/// Whether an import points inside the project.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DependencyOrigin {
    Internal,
    External,
}

/// Which pattern list decides the classification.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Polarity {
    /// Internal iff an internal pattern matches.
    InternalPatterns,
    /// Internal iff no external pattern matches.
    ExternalPatterns,
    /// No patterns: everything is external.
    Unset,
}

/// Compiled internal/external classification. The single source of truth for
/// both the report and the dependency graph.
#[derive(Debug, Clone)]
pub struct DependencyClassifier {
    polarity: Polarity,
    patterns: Vec<Regex>,
}

impl DependencyClassifier {
    pub fn from_schema(schema: &SelectorSchema) -> Result<Self> {
        let (polarity, sources) = match (
            schema.internal_dependency_patterns.is_empty(),
            schema.external_dependency_patterns.is_empty(),
        ) {
            (false, false) => {
                return Err(AnalysisError::Configuration(
                    "define either internalDependencyPatterns or externalDependencyPatterns, not both"
                        .to_string(),
                ))
            }
            (false, true) => (Polarity::InternalPatterns, &schema.internal_dependency_patterns),
            (true, false) => (Polarity::ExternalPatterns, &schema.external_dependency_patterns),
            (true, true) => (Polarity::Unset, &schema.internal_dependency_patterns),
        };

        let patterns = sources
            .iter()
            .map(|p| {
                Regex::new(p).map_err(|e| {
                    AnalysisError::Configuration(format!(
                        "invalid dependency pattern {:?}: {}",
                        p, e
                    ))
                })
            })
            .collect::<Result<Vec<_>>>()?;

        Ok(Self { polarity, patterns })
    }

    pub fn classify(&self, name: &str) -> DependencyOrigin {
        let matched = self.patterns.iter().any(|re| re.is_match(name));
        let internal = match self.polarity {
            Polarity::InternalPatterns => matched,
            Polarity::ExternalPatterns => !matched,
            Polarity::Unset => false,
        };
        if internal {
            DependencyOrigin::Internal
        } else {
            DependencyOrigin::External
        }
    }

    pub fn is_internal(&self, name: &str) -> bool {
        self.classify(name) == DependencyOrigin::Internal
    }
}
