//! Component parsing for the lineage tracer: coordinate normalization,
//! dual-dialect template ASTs, variable classification and script
//! pruning.

pub mod component;
pub mod expr;
pub mod position;
pub mod script;
pub mod template;
pub mod variables;

pub use component::{
    detect_framework_major, dialect_order, parse_component, ParsedComponent, ScriptBlock,
    ScriptLang,
};
pub use script::{
    all_store_bindings, parse_script, props_of, prune, ScriptModel, StoreBinding, StoreRefKind,
};
pub use template::{locate, node_source, LocatePoint, NodeId, TemplateAst};
pub use variables::{classify, parse_loop_expression, resolve_source};
