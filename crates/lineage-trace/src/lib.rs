//! Trace orchestration: the per-category backtracking walk over
//! components, the request-scoped parse cache it shares, state-store
//! evidence extraction and response assembly.

pub mod orchestrator;
pub mod parse_cache;
pub mod response;
pub mod store;

pub use orchestrator::{TraceContext, TraceOrchestrator, TraceOutcome};
pub use parse_cache::{CachedComponent, ParseCache};
pub use response::{
    build_response, collected_call_sites, final_code, ranked_variables, static_response,
};
pub use store::{collect_store_evidence, CallSite, StoreEvidence};
