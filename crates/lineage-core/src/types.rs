use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Hard bound on the number of hops a single trace chain may take.
pub const MAX_TRACE_DEPTH: usize = 10;

/// Template-AST generation a component was parsed with. Decided once at
/// parse time and threaded through every downstream call; never
/// re-derived by probing node shapes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Dialect {
    /// Offset-based spans relative to the de-indented template block.
    Legacy,
    /// Line/column spans relative to the whole component file.
    Modern,
}

impl fmt::Display for Dialect {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Dialect::Legacy => write!(f, "legacy"),
            Dialect::Modern => write!(f, "modern"),
        }
    }
}

/// Semantic bucket a traced variable belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VarCategory {
    Content,
    Attributes,
    Conditionals,
}

impl VarCategory {
    pub fn all() -> [VarCategory; 3] {
        [
            VarCategory::Content,
            VarCategory::Attributes,
            VarCategory::Conditionals,
        ]
    }
}

impl fmt::Display for VarCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            VarCategory::Content => "content",
            VarCategory::Attributes => "attributes",
            VarCategory::Conditionals => "conditionals",
        };
        write!(f, "{}", s)
    }
}

impl FromStr for VarCategory {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "content" => Ok(VarCategory::Content),
            "attributes" => Ok(VarCategory::Attributes),
            "conditionals" => Ok(VarCategory::Conditionals),
            other => Err(format!("unknown variable category: {}", other)),
        }
    }
}

/// 1-based line, 0-based column, as supplied by the click capture.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourcePosition {
    pub line: u32,
    pub column: u32,
}

impl SourcePosition {
    pub fn new(line: u32, column: u32) -> Self {
        Self { line, column }
    }
}

/// One dynamic expression lifted out of a template node, with its
/// alias-resolved variable names.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BoundExpression {
    /// Directive or attribute that carried the expression; `None` for
    /// text interpolation.
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub directive: Option<String>,
    /// Expression text with alias resolution applied.
    pub expression: String,
    /// Original source text before alias resolution.
    pub raw: String,
    /// Resolved variable names extracted from the expression.
    pub variables: Vec<String>,
}

/// Variables of a located node, partitioned into the three categories.
/// `all` is the deduplicated union across categories.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CategorizedVariables {
    pub content: Vec<BoundExpression>,
    pub attributes: Vec<BoundExpression>,
    pub conditionals: Vec<BoundExpression>,
    pub all: Vec<String>,
}

impl CategorizedVariables {
    /// A node with zero resolved variables in every category is static
    /// content, a terminal result rather than an error.
    pub fn is_static(&self) -> bool {
        self.all.is_empty()
    }

    pub fn for_category(&self, category: VarCategory) -> &[BoundExpression] {
        match category {
            VarCategory::Content => &self.content,
            VarCategory::Attributes => &self.attributes,
            VarCategory::Conditionals => &self.conditionals,
        }
    }

    /// Resolved variable names for one category, deduplicated in first
    /// occurrence order.
    pub fn names_for(&self, category: VarCategory) -> Vec<String> {
        let mut seen = Vec::new();
        for binding in self.for_category(category) {
            for name in &binding.variables {
                if !seen.iter().any(|s: &String| s == name) {
                    seen.push(name.clone());
                }
            }
        }
        seen
    }

    /// Rebuild `all` from the category buckets.
    pub fn finalize(&mut self) {
        let mut all = Vec::new();
        for category in VarCategory::all() {
            for name in self.names_for(category) {
                if !all.iter().any(|s: &String| s == &name) {
                    all.push(name);
                }
            }
        }
        self.all = all;
    }
}

/// Why a trace chain stopped where it did.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChainTerminal {
    /// No active seed is a pass-through parameter of the component.
    NoFurtherSource,
    /// A state-store mapping was resolved for an active seed.
    StoreResolved,
    /// A referencing parent exists but could not be resolved or parsed.
    ParentUnresolved,
    /// The hop budget ran out before a terminal source was found.
    DepthExceeded,
    /// The node carried no variables for this category.
    Empty,
}

/// One hop of a trace chain.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TraceStep {
    pub file: String,
    pub tag: String,
    pub category: VarCategory,
    pub traced_variables: Vec<String>,
    pub pruned_script: String,
    pub source_snippet: String,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub call_snippet: Option<String>,
}

/// Ordered provenance record for one category, clicked element first.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TraceChain {
    pub category: VarCategory,
    pub steps: Vec<TraceStep>,
    pub terminal: ChainTerminal,
}

impl TraceChain {
    pub fn empty(category: VarCategory) -> Self {
        Self {
            category,
            steps: Vec::new(),
            terminal: ChainTerminal::Empty,
        }
    }
}
