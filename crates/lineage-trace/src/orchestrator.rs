//! The cross-component trace walk. Each category runs its own chain:
//! prune the current script against the active seeds, emit a step,
//! terminate on a state-store mapping, otherwise hop to the first
//! referencing parent that binds a pass-through seed and continue.
//! Per-hop failures truncate the chain at the last emitted step; the
//! request as a whole never aborts on them.

use std::path::Path;
use std::sync::Arc;

use crate::parse_cache::{CachedComponent, ParseCache};
use crate::store;
use lineage_core::{
    AnalyzeRequest, CategorizedVariables, ChainTerminal, LineageError, Result, Settings,
    TraceChain, TraceChains, TraceStep, VarCategory,
};
use lineage_graph::ModuleGraph;
use lineage_parser::expr::extract_identifiers;
use lineage_parser::{
    all_store_bindings, classify, detect_framework_major, dialect_order, node_source, parse_script,
    props_of, prune, NodeId, StoreBinding, StoreRefKind,
};

/// Process-wide collaborators threaded into each request.
pub struct TraceContext {
    pub settings: Settings,
    pub graph: Arc<ModuleGraph>,
}

/// What the static engine concluded before any reasoning call.
#[derive(Debug)]
pub enum TraceOutcome {
    /// The clicked node carries no resolved variables in any category;
    /// a successful terminal result, no collaborator call required.
    Static {
        target_element: String,
        categorized: CategorizedVariables,
    },
    Traced {
        target_element: String,
        categorized: CategorizedVariables,
        chains: TraceChains,
    },
}

pub struct TraceOrchestrator {
    ctx: TraceContext,
}

struct Hop {
    path: String,
    cached: Arc<CachedComponent>,
    node: NodeId,
    seeds: Vec<String>,
}

impl TraceOrchestrator {
    pub fn new(ctx: TraceContext) -> Self {
        Self { ctx }
    }

    pub fn settings(&self) -> &Settings {
        &self.ctx.settings
    }

    /// Runs the full static trace for one click. Request-scoped state
    /// (the parse cache) lives and dies here.
    pub fn analyze(&self, request: &AnalyzeRequest) -> Result<TraceOutcome> {
        if request.path.trim().is_empty() {
            return Err(LineageError::InvalidRequest("path is required".into()));
        }
        let settings = &self.ctx.settings;
        let full_path = settings.project.root.join(&request.path);
        let path = full_path.to_string_lossy().into_owned();

        let order = dialect_order(
            settings.parser.dialect_override,
            detect_framework_major(&settings.project.root),
        );
        let cache = ParseCache::new(order);

        let cached = cache.get_or_parse(&path)?;
        let node = cached
            .component
            .locate(request.line, request.column)
            .ok_or_else(|| LineageError::NodeNotLocated {
                file: request.path.clone(),
                line: request.line,
                column: request.column,
            })?;

        let categorized = classify(&cached.component.ast, node);
        let target_element = node_source(
            &cached.component.ast,
            node,
            settings.parser.max_node_lines,
        );

        if categorized.is_static() {
            tracing::debug!(path = %request.path, "clicked node is static content");
            return Ok(TraceOutcome::Static {
                target_element,
                categorized,
            });
        }

        let chains = TraceChains {
            content: self.walk(VarCategory::Content, &cache, &path, &cached, node, &categorized),
            attributes: self.walk(
                VarCategory::Attributes,
                &cache,
                &path,
                &cached,
                node,
                &categorized,
            ),
            conditionals: self.walk(
                VarCategory::Conditionals,
                &cache,
                &path,
                &cached,
                node,
                &categorized,
            ),
        };

        Ok(TraceOutcome::Traced {
            target_element,
            categorized,
            chains,
        })
    }

    /// One category's backtracking chain, bounded by the configured
    /// depth.
    fn walk(
        &self,
        category: VarCategory,
        cache: &ParseCache,
        start_path: &str,
        start: &Arc<CachedComponent>,
        start_node: NodeId,
        categorized: &CategorizedVariables,
    ) -> TraceChain {
        let seeds = categorized.names_for(category);
        if seeds.is_empty() {
            return TraceChain::empty(category);
        }

        let max_depth = self.ctx.settings.trace.max_depth;
        let mut chain = TraceChain {
            category,
            steps: Vec::new(),
            terminal: ChainTerminal::NoFurtherSource,
        };
        let mut current = Hop {
            path: start_path.to_string(),
            cached: start.clone(),
            node: start_node,
            seeds,
        };

        while chain.steps.len() < max_depth {
            let script = &current.cached.component.script;
            let model = match parse_script(&script.text, script.lang) {
                Ok(model) => model,
                Err(err) => {
                    tracing::debug!(path = %current.path, %err, "script unparsable; truncating chain");
                    chain.terminal = ChainTerminal::ParentUnresolved;
                    return chain;
                }
            };

            let pruned = prune(&model, &current.seeds);
            chain.steps.push(TraceStep {
                file: self.display_path(&current.path),
                tag: current
                    .cached
                    .component
                    .ast
                    .tag(current.node)
                    .to_string(),
                category,
                traced_variables: current.seeds.clone(),
                pruned_script: pruned,
                source_snippet: node_source(
                    &current.cached.component.ast,
                    current.node,
                    self.ctx.settings.parser.max_node_lines,
                ),
                call_snippet: None,
            });

            // a store mapping for any active seed short-circuits the
            // prop hop and ends the chain
            let bindings = all_store_bindings(&model);
            if let Some(binding) = bindings
                .iter()
                .find(|b| current.seeds.iter().any(|s| s == &b.local))
            {
                if chain.steps.len() < max_depth {
                    chain.steps.push(self.store_step(category, binding));
                }
                chain.terminal = ChainTerminal::StoreResolved;
                return chain;
            }

            let props = props_of(&model);
            let Some(prop) = current
                .seeds
                .iter()
                .find(|s| props.iter().any(|p| p == *s))
                .cloned()
            else {
                chain.terminal = ChainTerminal::NoFurtherSource;
                return chain;
            };

            let parents = self.ctx.graph.get_parents(&current.path);
            let Some(parent_path) = parents.first() else {
                tracing::debug!(path = %current.path, prop, "no referencing parent");
                chain.terminal = ChainTerminal::NoFurtherSource;
                return chain;
            };

            let parent = match cache.get_or_parse(parent_path) {
                Ok(parent) => parent,
                Err(err) => {
                    tracing::debug!(parent = %parent_path, %err, "parent unresolvable; truncating chain");
                    chain.terminal = ChainTerminal::ParentUnresolved;
                    return chain;
                }
            };

            let tags = tag_candidates(&current.path);
            let Some(binding) = parent.component.ast.find_prop_binding(&tags, &prop) else {
                tracing::debug!(parent = %parent_path, prop, "parent does not bind the prop");
                chain.terminal = ChainTerminal::NoFurtherSource;
                return chain;
            };

            tracing::debug!(
                from = %self.display_path(&current.path),
                to = %self.display_path(parent_path),
                prop,
                expression = %binding.expression,
                "prop hop"
            );
            current = Hop {
                path: parent_path.clone(),
                node: binding.node,
                seeds: extract_identifiers(&binding.expression),
                cached: parent,
            };
        }

        chain.terminal = ChainTerminal::DepthExceeded;
        chain
    }

    fn store_step(&self, category: VarCategory, binding: &StoreBinding) -> TraceStep {
        let evidence = store::collect_store_evidence(&self.ctx.settings.project, binding);
        let qualified = match &binding.namespace {
            Some(ns) => format!("{}/{}", ns, binding.target),
            None => binding.target.clone(),
        };
        let kind = match binding.kind {
            StoreRefKind::Getter => "getter",
            StoreRefKind::State => "state",
            StoreRefKind::Action => "action",
            StoreRefKind::Mutation => "mutation",
        };
        let call_snippet = if evidence.call_sites.is_empty() {
            None
        } else {
            Some(
                evidence
                    .call_sites
                    .iter()
                    .map(|s| format!("{}:{} {}", self.display_path(&s.file), s.line, s.snippet))
                    .collect::<Vec<_>>()
                    .join("\n"),
            )
        };
        TraceStep {
            file: evidence
                .store_file
                .as_deref()
                .map(|f| self.display_path(f))
                .unwrap_or_else(|| format!("store:{}", qualified)),
            tag: "store".to_string(),
            category,
            traced_variables: std::iter::once(binding.local.clone())
                .chain(evidence.state_names.iter().cloned())
                .collect(),
            pruned_script: evidence.slice,
            source_snippet: format!("{} {} -> {}", kind, binding.local, qualified),
            call_snippet,
        }
    }

    fn display_path(&self, path: &str) -> String {
        Path::new(path)
            .strip_prefix(&self.ctx.settings.project.root)
            .map(|p| p.to_string_lossy().into_owned())
            .unwrap_or_else(|_| path.to_string())
    }
}

/// Tag names a parent template may use for a child component file:
/// the file stem as written and its kebab-case form.
fn tag_candidates(child_path: &str) -> Vec<String> {
    let stem = Path::new(child_path)
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();
    let mut tags = vec![stem.clone()];
    let kebab = to_kebab_case(&stem);
    if kebab != stem {
        tags.push(kebab);
    }
    tags
}

fn to_kebab_case(name: &str) -> String {
    let mut out = String::with_capacity(name.len() + 4);
    for (i, c) in name.chars().enumerate() {
        if c.is_ascii_uppercase() {
            if i > 0 {
                out.push('-');
            }
            out.push(c.to_ascii_lowercase());
        } else {
            out.push(c);
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tag_candidates_cover_both_casings() {
        assert_eq!(
            tag_candidates("/app/src/components/UserCard.vue"),
            vec!["UserCard".to_string(), "user-card".to_string()]
        );
        assert_eq!(tag_candidates("/app/src/card.vue"), vec!["card".to_string()]);
    }
}
