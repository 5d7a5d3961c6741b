//! Script-block analysis on top of the tree-sitter JS/TS grammars.

pub mod model;
pub mod options;
pub mod pruner;

pub use model::{parse_script, DeclKind, ScriptModel, TopLevelDecl};
pub use options::{
    all_store_bindings, filtered_options_source, props_of, StoreBinding, StoreRefKind,
};
pub use pruner::prune;
