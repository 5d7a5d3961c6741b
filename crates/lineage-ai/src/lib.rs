//! Reasoning-collaborator integration: the provider trait and HTTP
//! implementation, structured-output parsing with one-shot self-repair,
//! and the reliability facade (concurrency limit, timeout, retry,
//! circuit breaking, guaranteed degraded fallback).

pub mod breaker;
pub mod facade;
pub mod http_provider;
pub mod provider;
pub mod schema;

pub use breaker::{CircuitBreaker, CircuitState, Clock, ManualClock, SystemClock};
pub use facade::ReasoningFacade;
pub use http_provider::HttpReasoningProvider;
pub use provider::{AnalysisEvidence, ReasoningProvider, ReasoningRequest, ReasoningResponse};
pub use schema::parse_analysis;
