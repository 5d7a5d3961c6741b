//! Wire response assembly: evidence-code concatenation for the
//! collaborator, category-weighted variable ranking, and the distinct
//! static-content shape.

use lineage_core::{
    AiAnalysis, AnalyzeResponse, CategorizedVariables, CategoryWeights, DataSource,
    DataSourceType, TraceChain, TraceChains, VarCategory, VariableAnalysis,
};

/// Categories ordered by their configured weight, heaviest first. Only
/// the relative order matters; the values are tunable configuration.
fn category_order(weights: &CategoryWeights) -> [VarCategory; 3] {
    let mut order = [
        (VarCategory::Content, weights.content),
        (VarCategory::Attributes, weights.attributes),
        (VarCategory::Conditionals, weights.conditionals),
    ];
    order.sort_by(|a, b| b.1.cmp(&a.1));
    [order[0].0, order[1].0, order[2].0]
}

/// Variables ranked by the summed weight of the categories they appear
/// in, for stable ordering of overlapping names in evidence and
/// messages.
pub fn ranked_variables(categorized: &CategorizedVariables, weights: &CategoryWeights) -> Vec<String> {
    let weight_of = |category: VarCategory| match category {
        VarCategory::Content => weights.content as u32,
        VarCategory::Attributes => weights.attributes as u32,
        VarCategory::Conditionals => weights.conditionals as u32,
    };
    let mut scored: Vec<(String, u32)> = categorized
        .all
        .iter()
        .map(|name| {
            let score = VarCategory::all()
                .into_iter()
                .filter(|&c| categorized.names_for(c).iter().any(|n| n == name))
                .map(weight_of)
                .sum();
            (name.clone(), score)
        })
        .collect();
    // stable sort keeps first-occurrence order among equals
    scored.sort_by(|a, b| b.1.cmp(&a.1));
    scored.into_iter().map(|(name, _)| name).collect()
}

/// The ordered evidence code sent to the collaborator: every chain
/// step's pruned script under a `// file:` header, heaviest category
/// first, each file included once.
pub fn final_code(chains: &TraceChains, weights: &CategoryWeights) -> String {
    let mut sections: Vec<String> = Vec::new();
    let mut seen_files: Vec<String> = Vec::new();
    for category in category_order(weights) {
        for step in &chains.get(category).steps {
            if seen_files.iter().any(|f| f == &step.file) {
                continue;
            }
            seen_files.push(step.file.clone());
            if step.pruned_script.trim().is_empty() {
                continue;
            }
            sections.push(format!("// file: {}\n{}", step.file, step.pruned_script));
        }
    }
    sections.join("\n\n")
}

/// Call-site evidence gathered by store terminal steps, in chain order.
pub fn collected_call_sites(chains: &TraceChains, weights: &CategoryWeights) -> Vec<String> {
    let mut sites = Vec::new();
    for category in category_order(weights) {
        for step in &chains.get(category).steps {
            if let Some(snippet) = &step.call_snippet {
                for line in snippet.lines() {
                    if !sites.iter().any(|s: &String| s == line) {
                        sites.push(line.to_string());
                    }
                }
            }
        }
    }
    sites
}

pub fn build_response(
    message: String,
    target_element: String,
    chains: TraceChains,
    categorized: CategorizedVariables,
    analysis: AiAnalysis,
    weights: &CategoryWeights,
) -> AnalyzeResponse {
    let final_code_for_ai = final_code(&chains, weights);
    AnalyzeResponse {
        message,
        target_element,
        trace_chains: chains,
        ai_analysis: analysis,
        final_code_for_ai,
        categorized_vars: categorized,
    }
}

/// Response for a click on markup with no dynamic bindings: a distinct
/// successful result, produced without any collaborator call.
pub fn static_response(target_element: String, categorized: CategorizedVariables) -> AnalyzeResponse {
    let analysis = AiAnalysis {
        full_link_trace: "The clicked element renders static content; no data flow to trace."
            .to_string(),
        data_source: DataSource {
            kind: DataSourceType::Static,
            endpoint: None,
            method: None,
        },
        component_analysis: Vec::new(),
        variable_analysis: VariableAnalysis::default(),
        confidence: 100,
        suggest_next_step: None,
        error_code: None,
    };
    AnalyzeResponse {
        message: "static content".to_string(),
        target_element,
        trace_chains: TraceChains {
            content: TraceChain::empty(VarCategory::Content),
            attributes: TraceChain::empty(VarCategory::Attributes),
            conditionals: TraceChain::empty(VarCategory::Conditionals),
        },
        ai_analysis: analysis,
        final_code_for_ai: String::new(),
        categorized_vars: categorized,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use lineage_core::{BoundExpression, ChainTerminal, TraceStep};

    fn step(file: &str, category: VarCategory, script: &str) -> TraceStep {
        TraceStep {
            file: file.to_string(),
            tag: "div".to_string(),
            category,
            traced_variables: vec!["user".to_string()],
            pruned_script: script.to_string(),
            source_snippet: "<div>{{ user }}</div>".to_string(),
            call_snippet: None,
        }
    }

    fn chains() -> TraceChains {
        TraceChains {
            content: TraceChain {
                category: VarCategory::Content,
                steps: vec![
                    step("src/Card.vue", VarCategory::Content, "export default {};"),
                    step("src/App.vue", VarCategory::Content, "const user = load();"),
                ],
                terminal: ChainTerminal::NoFurtherSource,
            },
            attributes: TraceChain {
                category: VarCategory::Attributes,
                steps: vec![step(
                    "src/Card.vue",
                    VarCategory::Attributes,
                    "export default {};",
                )],
                terminal: ChainTerminal::NoFurtherSource,
            },
            conditionals: TraceChain::empty(VarCategory::Conditionals),
        }
    }

    #[test]
    fn final_code_orders_by_weight_and_dedups_files() {
        let code = final_code(&chains(), &CategoryWeights::default());
        let card = code.find("// file: src/Card.vue").unwrap();
        let app = code.find("// file: src/App.vue").unwrap();
        assert!(card < app);
        // Card.vue appears once even though two chains visited it
        assert_eq!(code.matches("// file: src/Card.vue").count(), 1);
    }

    #[test]
    fn empty_pruned_scripts_are_skipped() {
        let mut chains = chains();
        chains.content.steps[1].pruned_script = String::new();
        let code = final_code(&chains, &CategoryWeights::default());
        assert!(!code.contains("src/App.vue"));
    }

    #[test]
    fn ranked_variables_prefer_heavier_categories() {
        let mut categorized = CategorizedVariables::default();
        categorized.conditionals.push(BoundExpression {
            directive: Some("v-if".into()),
            expression: "visible".into(),
            raw: "v-if=\"visible\"".into(),
            variables: vec!["visible".into()],
        });
        categorized.content.push(BoundExpression {
            directive: None,
            expression: "user.name".into(),
            raw: "{{ user.name }}".into(),
            variables: vec!["user".into()],
        });
        categorized.finalize();
        let ranked = ranked_variables(&categorized, &CategoryWeights::default());
        assert_eq!(ranked, vec!["user".to_string(), "visible".to_string()]);
    }

    #[test]
    fn static_response_shape() {
        let response = static_response("<span>Label</span>".into(), CategorizedVariables::default());
        assert_eq!(response.ai_analysis.data_source.kind, DataSourceType::Static);
        assert_eq!(response.ai_analysis.confidence, 100);
        assert!(response.final_code_for_ai.is_empty());
        assert!(response.trace_chains.content.steps.is_empty());
        let json = serde_json::to_value(&response).unwrap();
        assert_eq!(json["aiAnalysis"]["dataSource"]["type"], "Static");
        assert!(json.get("finalCodeForAI").is_some());
        assert!(json.get("categorizedVars").is_some());
    }

    #[test]
    fn call_sites_collect_across_chains() {
        let mut chains = chains();
        chains.content.steps[1].call_snippet =
            Some("src/store/user.js:10 commit('user/SET')".to_string());
        let sites = collected_call_sites(&chains, &CategoryWeights::default());
        assert_eq!(sites, vec!["src/store/user.js:10 commit('user/SET')"]);
    }
}
