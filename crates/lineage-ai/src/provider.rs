//! Trait seam for the external reasoning collaborator. Everything the
//! facade needs from a backend is a single text-generation call; the
//! HTTP implementation lives in [`crate::http_provider`], tests use
//! in-memory fakes.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use lineage_core::Result;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReasoningRequest {
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub system: Option<String>,
    pub prompt: String,
    pub max_tokens: u32,
    pub temperature: f32,
}

impl ReasoningRequest {
    pub fn new(prompt: impl Into<String>) -> Self {
        Self {
            system: None,
            prompt: prompt.into(),
            max_tokens: 4096,
            temperature: 0.1,
        }
    }

    pub fn with_system(mut self, system: impl Into<String>) -> Self {
        self.system = Some(system.into());
        self
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReasoningResponse {
    pub content: String,
    pub model: String,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub total_tokens: Option<u64>,
}

/// Static evidence handed to the collaborator: the clicked element's
/// markup, the ordered pruned scripts of the trace, and any discovered
/// mutation-trigger call sites.
#[derive(Debug, Clone, Default)]
pub struct AnalysisEvidence {
    pub target_element: String,
    pub evidence_code: String,
    pub call_sites: Vec<String>,
}

#[async_trait]
pub trait ReasoningProvider: Send + Sync {
    async fn generate(&self, request: &ReasoningRequest) -> Result<ReasoningResponse>;

    fn name(&self) -> &str;
}
