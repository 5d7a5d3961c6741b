//! State-store evidence: resolves the store module behind a mapping,
//! extracts the minimal state/getter/mutation slice for the traced
//! member, and searches the tracked source tree for the call sites that
//! trigger matching mutations.

use std::path::{Path, PathBuf};

use once_cell::sync::Lazy;
use regex::Regex;
use tree_sitter::Node;

use lineage_core::ProjectConfig;
use lineage_parser::component::ScriptLang;
use lineage_parser::script::model::{self, parse_script, ScriptModel};
use lineage_parser::{StoreBinding, StoreRefKind};

static TRIGGER_CALL: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"(commit|dispatch)\(\s*['"]([\w/.-]+)['"]"#).expect("trigger call regex")
});

const MODULE_EXTENSIONS: &[&str] = &["js", "ts"];
const SEARCH_EXTENSIONS: &[&str] = &["vue", "js", "ts", "jsx", "tsx"];

#[derive(Debug, Clone, PartialEq)]
pub struct CallSite {
    pub file: String,
    /// 1-based line.
    pub line: usize,
    pub snippet: String,
}

#[derive(Debug, Clone, Default)]
pub struct StoreEvidence {
    pub store_file: Option<String>,
    /// Minimal store source relevant to the traced member.
    pub slice: String,
    pub state_names: Vec<String>,
    pub mutation_names: Vec<String>,
    pub call_sites: Vec<CallSite>,
}

/// Resolves a store mapping to its evidence. A missing or unreadable
/// store module yields evidence with whatever could still be gathered;
/// it never fails the walk.
pub fn collect_store_evidence(project: &ProjectConfig, binding: &StoreBinding) -> StoreEvidence {
    let mut evidence = StoreEvidence::default();

    let Some(path) = resolve_store_module(&project.store_root(), binding.namespace.as_deref())
    else {
        tracing::debug!(
            namespace = binding.namespace.as_deref().unwrap_or("<root>"),
            "store module not found"
        );
        return evidence;
    };
    evidence.store_file = Some(path.to_string_lossy().into_owned());

    let Ok(text) = std::fs::read_to_string(&path) else {
        return evidence;
    };
    let lang = match path.extension().and_then(|e| e.to_str()) {
        Some("ts") => ScriptLang::Ts,
        _ => ScriptLang::Js,
    };
    let Ok(model) = parse_script(&text, lang) else {
        tracing::warn!(path = %path.display(), "store module did not parse");
        return evidence;
    };

    extract_slice(&model, binding, &mut evidence);
    evidence.call_sites = find_trigger_call_sites(
        &project.source_root(),
        binding.namespace.as_deref(),
        &evidence.mutation_names,
    );
    evidence
}

fn resolve_store_module(store_root: &Path, namespace: Option<&str>) -> Option<PathBuf> {
    let stems: Vec<PathBuf> = match namespace {
        Some(ns) => vec![
            store_root.join(ns),
            store_root.join("modules").join(ns),
            store_root.join(ns).join("index"),
        ],
        None => vec![store_root.join("index")],
    };
    for stem in stems {
        for ext in MODULE_EXTENSIONS {
            let candidate = stem.with_extension(ext);
            if candidate.is_file() {
                return Some(candidate);
            }
        }
    }
    None
}

/// Builds the minimal slice: the mapped getter/state/action entry, the
/// state fields it reads, and every mutation touching those fields.
fn extract_slice(model: &ScriptModel, binding: &StoreBinding, evidence: &mut StoreEvidence) {
    let mut sections: Vec<String> = Vec::new();

    let mapped_group = match binding.kind {
        StoreRefKind::Getter => "getters",
        StoreRefKind::State => "state",
        StoreRefKind::Action => "actions",
        StoreRefKind::Mutation => "mutations",
    };

    let mut state_names: Vec<String> = Vec::new();
    match binding.kind {
        StoreRefKind::State => state_names.push(binding.target.clone()),
        StoreRefKind::Getter | StoreRefKind::Action | StoreRefKind::Mutation => {
            if let Some((_, text)) = group_entry(model, mapped_group, &binding.target) {
                // state fields the mapped member reads
                for (state_name, _) in group_entries(model, "state") {
                    if contains_word(&text, &state_name) {
                        state_names.push(state_name);
                    }
                }
                sections.push(text);
            }
        }
    }

    for (name, text) in group_entries(model, "state") {
        if state_names.iter().any(|s| s == &name) {
            sections.push(format!("// state: {}\n{}", name, text));
        }
    }

    for (name, text) in group_entries(model, "mutations") {
        let touches_state = state_names.iter().any(|s| contains_word(&text, s));
        let is_target = binding.kind == StoreRefKind::Mutation && name == binding.target;
        if touches_state || is_target {
            evidence.mutation_names.push(name);
            sections.push(text);
        }
    }

    if binding.kind == StoreRefKind::Action {
        if let Some((_, text)) = group_entry(model, "actions", &binding.target) {
            if !sections.iter().any(|s| s == &text) {
                sections.push(text);
            }
        }
    }

    evidence.state_names = state_names;
    evidence.slice = sections.join("\n\n");
}

fn contains_word(haystack: &str, name: &str) -> bool {
    Regex::new(&format!(r"\b{}\b", regex::escape(name)))
        .map(|re| re.is_match(haystack))
        .unwrap_or(false)
}

/// Named entries of one store option group (`state`, `getters`, ...),
/// in source order. Handles the function form of `state` by descending
/// to the first object literal.
fn group_entries(model: &ScriptModel, group: &str) -> Vec<(String, String)> {
    let Some(object) = model.options_object() else {
        return Vec::new();
    };
    let source = model.source.as_str();
    let Some(value) = pair_value(object, group, source) else {
        return Vec::new();
    };
    let Some(body) = first_object(value) else {
        return Vec::new();
    };

    let mut entries = Vec::new();
    for i in 0..body.named_child_count() {
        let Some(child) = body.named_child(i) else { continue };
        let name = match child.kind() {
            "pair" => child
                .child_by_field_name("key")
                .and_then(|k| entry_key(k, source)),
            "method_definition" => child
                .child_by_field_name("name")
                .and_then(|k| entry_key(k, source)),
            _ => None,
        };
        if let (Some(name), Ok(text)) = (name, child.utf8_text(source.as_bytes())) {
            entries.push((name, text.to_string()));
        }
    }
    entries
}

fn group_entry(model: &ScriptModel, group: &str, name: &str) -> Option<(String, String)> {
    group_entries(model, group)
        .into_iter()
        .find(|(n, _)| n == name)
}

fn pair_value<'a>(object: Node<'a>, key: &str, source: &str) -> Option<Node<'a>> {
    for i in 0..object.named_child_count() {
        let child = object.named_child(i)?;
        if child.kind() != "pair" {
            continue;
        }
        let matches = child
            .child_by_field_name("key")
            .and_then(|k| entry_key(k, source))
            .map(|k| k == key)
            .unwrap_or(false);
        if matches {
            return child.child_by_field_name("value");
        }
    }
    None
}

fn entry_key(node: Node<'_>, source: &str) -> Option<String> {
    match node.kind() {
        "property_identifier" | "identifier" => node
            .utf8_text(source.as_bytes())
            .ok()
            .map(|s| s.to_string()),
        "string" => model::string_content(node, source).map(|s| s.to_string()),
        _ => None,
    }
}

fn first_object(node: Node<'_>) -> Option<Node<'_>> {
    if node.kind() == "object" {
        return Some(node);
    }
    for i in 0..node.named_child_count() {
        if let Some(found) = node.named_child(i).and_then(first_object) {
            return Some(found);
        }
    }
    None
}

/// Scans the tracked source tree for `commit`/`dispatch` calls naming
/// one of `mutation_names` (namespaced or bare). Results come back in
/// path/line order so the evidence is deterministic.
fn find_trigger_call_sites(
    source_root: &Path,
    namespace: Option<&str>,
    mutation_names: &[String],
) -> Vec<CallSite> {
    if mutation_names.is_empty() {
        return Vec::new();
    }
    let mut sites = Vec::new();
    for entry in ignore::WalkBuilder::new(source_root).build().flatten() {
        let path = entry.path();
        let searchable = path
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| SEARCH_EXTENSIONS.contains(&e))
            .unwrap_or(false);
        if !searchable || !path.is_file() {
            continue;
        }
        let Ok(text) = std::fs::read_to_string(path) else {
            continue;
        };
        for (line_index, line) in text.lines().enumerate() {
            for caps in TRIGGER_CALL.captures_iter(line) {
                let called = &caps[2];
                let matched = mutation_names.iter().any(|name| {
                    called == name
                        || namespace
                            .map(|ns| called == format!("{}/{}", ns, name))
                            .unwrap_or(false)
                });
                if matched {
                    sites.push(CallSite {
                        file: path.to_string_lossy().into_owned(),
                        line: line_index + 1,
                        snippet: line.trim().to_string(),
                    });
                }
            }
        }
    }
    sites.sort_by(|a, b| a.file.cmp(&b.file).then(a.line.cmp(&b.line)));
    sites
}

#[cfg(test)]
mod tests {
    use super::*;

    const STORE_MODULE: &str = r#"
export default {
  namespaced: true,
  state: {
    profile: null,
    loading: false,
  },
  getters: {
    displayName(state) {
      return state.profile ? state.profile.name : 'guest';
    },
  },
  mutations: {
    SET_PROFILE(state, profile) {
      state.profile = profile;
    },
    SET_LOADING(state, value) {
      state.loading = value;
    },
  },
  actions: {
    async fetchProfile({ commit }) {
      commit('SET_LOADING', true);
      const profile = await api.get('/profile');
      commit('SET_PROFILE', profile);
      commit('SET_LOADING', false);
    },
  },
};
"#;

    fn fixture() -> (tempfile::TempDir, ProjectConfig) {
        let dir = tempfile::tempdir().unwrap();
        let store = dir.path().join("src/store");
        std::fs::create_dir_all(&store).unwrap();
        std::fs::write(store.join("account.js"), STORE_MODULE).unwrap();
        std::fs::write(
            dir.path().join("src/Profile.vue"),
            "<template><p>{{ displayName }}</p></template>\n<script>\nexport default {\n  created() {\n    this.$store.dispatch('account/fetchProfile');\n    this.$store.commit('account/SET_PROFILE', null);\n  },\n};\n</script>\n",
        )
        .unwrap();
        let project = ProjectConfig {
            root: dir.path().to_path_buf(),
            ..Default::default()
        };
        (dir, project)
    }

    fn getter_binding() -> StoreBinding {
        StoreBinding {
            local: "displayName".into(),
            namespace: Some("account".into()),
            target: "displayName".into(),
            kind: StoreRefKind::Getter,
        }
    }

    #[test]
    fn getter_slice_carries_state_and_mutations() {
        let (_dir, project) = fixture();
        let evidence = collect_store_evidence(&project, &getter_binding());
        assert!(evidence.store_file.unwrap().ends_with("account.js"));
        assert_eq!(evidence.state_names, vec!["profile"]);
        assert_eq!(evidence.mutation_names, vec!["SET_PROFILE"]);
        assert!(evidence.slice.contains("displayName(state)"));
        assert!(evidence.slice.contains("profile: null"));
        assert!(evidence.slice.contains("SET_PROFILE(state, profile)"));
        assert!(!evidence.slice.contains("SET_LOADING"));
    }

    #[test]
    fn call_sites_match_namespaced_triggers() {
        let (_dir, project) = fixture();
        let evidence = collect_store_evidence(&project, &getter_binding());
        // SET_PROFILE is committed once in the action and once directly
        assert_eq!(evidence.call_sites.len(), 2);
        let files: Vec<_> = evidence
            .call_sites
            .iter()
            .map(|s| s.file.rsplit('/').next().unwrap())
            .collect();
        assert!(files.contains(&"account.js"));
        assert!(files.contains(&"Profile.vue"));
    }

    #[test]
    fn state_mapping_slices_the_named_field() {
        let (_dir, project) = fixture();
        let binding = StoreBinding {
            local: "loading".into(),
            namespace: Some("account".into()),
            target: "loading".into(),
            kind: StoreRefKind::State,
        };
        let evidence = collect_store_evidence(&project, &binding);
        assert_eq!(evidence.state_names, vec!["loading"]);
        assert_eq!(evidence.mutation_names, vec!["SET_LOADING"]);
        assert!(evidence.slice.contains("loading: false"));
    }

    #[test]
    fn missing_module_degrades_to_empty_evidence() {
        let (_dir, project) = fixture();
        let binding = StoreBinding {
            local: "x".into(),
            namespace: Some("billing".into()),
            target: "x".into(),
            kind: StoreRefKind::Getter,
        };
        let evidence = collect_store_evidence(&project, &binding);
        assert!(evidence.store_file.is_none());
        assert!(evidence.slice.is_empty());
        assert!(evidence.call_sites.is_empty());
    }

    #[test]
    fn function_form_state_is_descended() {
        let dir = tempfile::tempdir().unwrap();
        let store = dir.path().join("src/store");
        std::fs::create_dir_all(&store).unwrap();
        std::fs::write(
            store.join("cart.js"),
            "export default {\n  state: () => ({ items: [] }),\n  mutations: {\n    ADD_ITEM(state, item) { state.items.push(item); },\n  },\n};\n",
        )
        .unwrap();
        let project = ProjectConfig {
            root: dir.path().to_path_buf(),
            ..Default::default()
        };
        let binding = StoreBinding {
            local: "items".into(),
            namespace: Some("cart".into()),
            target: "items".into(),
            kind: StoreRefKind::State,
        };
        let evidence = collect_store_evidence(&project, &binding);
        assert_eq!(evidence.state_names, vec!["items"]);
        assert_eq!(evidence.mutation_names, vec!["ADD_ITEM"]);
    }
}
