//! Wire contract for analysis requests and responses. Field names are
//! fixed camelCase so existing consumers of the JSON shape keep
//! working; the HTTP layer itself lives outside this workspace.

use crate::types::{CategorizedVariables, TraceChain, VarCategory};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalyzeRequest {
    /// Project-relative component file path.
    pub path: String,
    /// 1-based click line.
    pub line: u32,
    /// 0-based click column.
    pub column: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TraceChains {
    pub content: TraceChain,
    pub attributes: TraceChain,
    pub conditionals: TraceChain,
}

impl TraceChains {
    pub fn get(&self, category: VarCategory) -> &TraceChain {
        match category {
            VarCategory::Content => &self.content,
            VarCategory::Attributes => &self.attributes,
            VarCategory::Conditionals => &self.conditionals,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalyzeResponse {
    pub message: String,
    pub target_element: String,
    pub trace_chains: TraceChains,
    pub ai_analysis: AiAnalysis,
    #[serde(rename = "finalCodeForAI")]
    pub final_code_for_ai: String,
    pub categorized_vars: CategorizedVariables,
}

/// Where the reasoning collaborator concluded the value originates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DataSourceType {
    #[serde(rename = "API")]
    Api,
    Store,
    Static,
    #[serde(rename = "UNKNOWN")]
    Unknown,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DataSource {
    #[serde(rename = "type")]
    pub kind: DataSourceType,
    pub endpoint: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub method: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ComponentAnalysis {
    pub file: String,
    pub role: String,
    pub summary: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VariableOrigin {
    pub name: String,
    pub origin: String,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub note: Option<String>,
}

/// Per-category origin breakdown mirroring the trace chains.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VariableAnalysis {
    #[serde(default)]
    pub content: Vec<VariableOrigin>,
    #[serde(default)]
    pub attributes: Vec<VariableOrigin>,
    #[serde(default)]
    pub conditionals: Vec<VariableOrigin>,
}

/// Structured verdict returned by the reasoning collaborator. Also the
/// shape of the degraded placeholder when the call cannot be completed.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AiAnalysis {
    pub full_link_trace: String,
    pub data_source: DataSource,
    #[serde(default)]
    pub component_analysis: Vec<ComponentAnalysis>,
    #[serde(default)]
    pub variable_analysis: VariableAnalysis,
    /// 0-100.
    pub confidence: u8,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub suggest_next_step: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub error_code: Option<String>,
}

impl AiAnalysis {
    /// Schema-shaped placeholder returned when the collaborator call
    /// failed or was bypassed; callers never see an error for this
    /// stage.
    pub fn degraded(code: &str, note: &str) -> Self {
        Self {
            full_link_trace: note.to_string(),
            data_source: DataSource {
                kind: DataSourceType::Unknown,
                endpoint: None,
                method: None,
            },
            component_analysis: Vec::new(),
            variable_analysis: VariableAnalysis::default(),
            confidence: 0,
            suggest_next_step: None,
            error_code: Some(code.to_string()),
        }
    }
}
