//! Script pruning: the minimal, dependency-closed subset of a script
//! block's top-level declarations relevant to a seed variable set.
//!
//! A BFS fixed point over declaration names: every frontier name keeps
//! the declarations that bind it (name equality) or textually contain
//! it (types and bare statements), and each newly kept declaration
//! contributes its own free identifiers back to the frontier. Each name
//! is enqueued at most once, so the frontier drains.

use std::collections::{BTreeSet, HashSet, VecDeque};

use regex::Regex;

use super::model::{DeclKind, ScriptModel};
use super::options;

fn contains_word(haystack: &str, name: &str) -> bool {
    Regex::new(&format!(r"\b{}\b", regex::escape(name)))
        .map(|re| re.is_match(haystack))
        .unwrap_or(false)
}

fn decl_matches(model: &ScriptModel, index: usize, name: &str) -> bool {
    let decl = &model.decls[index];
    match decl.kind {
        DeclKind::Variable | DeclKind::Function | DeclKind::Class | DeclKind::Import => {
            decl.names.iter().any(|n| n == name)
        }
        DeclKind::Interface | DeclKind::TypeAlias | DeclKind::Statement => {
            contains_word(model.decl_source(decl), name)
        }
        DeclKind::ExportDefault => options::options_reference(model, name),
    }
}

fn decl_free_idents(model: &ScriptModel, index: usize) -> Vec<String> {
    let decl = &model.decls[index];
    match decl.kind {
        // the options declaration only contributes identifiers from
        // groups that survive filtering
        DeclKind::ExportDefault => options::options_free_idents(model),
        _ => decl.free_idents.clone(),
    }
}

/// Prunes the script to the declarations transitively relevant to
/// `seeds`, preserving original top-level order. The result is valid
/// standalone script text; every surviving declaration textually
/// existed in the input (the options declaration loses its
/// registration-only groups).
pub fn prune(model: &ScriptModel, seeds: &[String]) -> String {
    let mut kept: BTreeSet<usize> = BTreeSet::new();
    let mut known: HashSet<String> = HashSet::new();
    let mut frontier: VecDeque<String> = seeds.iter().cloned().collect();

    while let Some(name) = frontier.pop_front() {
        if !known.insert(name.clone()) {
            continue;
        }
        for index in 0..model.decls.len() {
            if !decl_matches(model, index, &name) {
                continue;
            }
            if !kept.insert(index) {
                continue;
            }
            for ident in decl_free_idents(model, index) {
                if !known.contains(&ident) {
                    frontier.push_back(ident);
                }
            }
        }
    }

    render(model, &kept)
}

fn render(model: &ScriptModel, kept: &BTreeSet<usize>) -> String {
    let mut parts = Vec::new();
    for &index in kept {
        let decl = &model.decls[index];
        let text = match decl.kind {
            DeclKind::ExportDefault => match options::filtered_options_source(model) {
                Some(filtered) => filtered,
                None => model.decl_source(decl).to_string(),
            },
            _ => model.decl_source(decl).to_string(),
        };
        parts.push(text);
    }
    parts.join("\n\n")
}
