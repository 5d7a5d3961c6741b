//! Component options analysis: pass-through parameter (prop) discovery,
//! data-flow-irrelevant option-group filtering, and state-store mapping
//! detection.

use tree_sitter::Node;

use super::model::{collect_free_identifiers, string_content, walk, ScriptModel};

/// Option groups with no bearing on data flow; dropped from pruner
/// output even when they textually mention a traced name.
const DROPPED_OPTION_GROUPS: &[&str] = &["components", "directives", "filters", "mixins", "i18n"];

const MAP_HELPERS: &[(&str, StoreRefKind)] = &[
    ("mapGetters", StoreRefKind::Getter),
    ("mapState", StoreRefKind::State),
    ("mapActions", StoreRefKind::Action),
    ("mapMutations", StoreRefKind::Mutation),
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreRefKind {
    Getter,
    State,
    Action,
    Mutation,
}

/// One resolved mapping from a component-local name to a state-store
/// member.
#[derive(Debug, Clone, PartialEq)]
pub struct StoreBinding {
    /// Name the component sees.
    pub local: String,
    /// Store module namespace, when the mapping is namespaced.
    pub namespace: Option<String>,
    /// Getter/state/action name inside the store.
    pub target: String,
    pub kind: StoreRefKind,
}

fn pair_key<'a>(pair: Node<'a>, source: &'a str) -> Option<String> {
    let key = pair.child_by_field_name("key")?;
    match key.kind() {
        "property_identifier" | "identifier" => {
            key.utf8_text(source.as_bytes()).ok().map(|s| s.to_string())
        }
        "string" => string_content(key, source).map(|s| s.to_string()),
        _ => None,
    }
}

fn option_group_name<'a>(child: Node<'a>, source: &'a str) -> Option<String> {
    match child.kind() {
        "pair" => pair_key(child, source),
        "method_definition" => child
            .child_by_field_name("name")
            .and_then(|n| n.utf8_text(source.as_bytes()).ok())
            .map(|s| s.to_string()),
        _ => None,
    }
}

fn is_dropped_group(child: Node<'_>, source: &str) -> bool {
    option_group_name(child, source)
        .map(|name| DROPPED_OPTION_GROUPS.contains(&name.as_str()))
        .unwrap_or(false)
}

/// Names of the component's pass-through parameters, from the `props`
/// option in either its array or object form.
pub fn props_of(model: &ScriptModel) -> Vec<String> {
    let Some(object) = model.options_object() else {
        return Vec::new();
    };
    let source = model.source.as_str();
    let mut props = Vec::new();
    for i in 0..object.named_child_count() {
        let Some(child) = object.named_child(i) else { continue };
        if child.kind() != "pair" || pair_key(child, source).as_deref() != Some("props") {
            continue;
        }
        let Some(value) = child.child_by_field_name("value") else { continue };
        match value.kind() {
            "array" => {
                for j in 0..value.named_child_count() {
                    if let Some(name) = value.named_child(j).and_then(|n| string_content(n, source))
                    {
                        props.push(name.to_string());
                    }
                }
            }
            "object" => {
                for j in 0..value.named_child_count() {
                    if let Some(entry) = value.named_child(j) {
                        if entry.kind() == "pair" {
                            if let Some(name) = pair_key(entry, source) {
                                props.push(name);
                            }
                        }
                    }
                }
            }
            _ => {}
        }
    }
    props
}

/// The options declaration's text with dropped groups removed, or
/// `None` when the script has no options object. The rebuilt text stays
/// valid standalone script.
pub fn filtered_options_source(model: &ScriptModel) -> Option<String> {
    let object = model.options_object()?;
    let source = model.source.as_str();
    let mut parts = Vec::new();
    for i in 0..object.named_child_count() {
        let Some(child) = object.named_child(i) else { continue };
        if child.kind() == "comment" || is_dropped_group(child, source) {
            continue;
        }
        if let Ok(text) = child.utf8_text(source.as_bytes()) {
            parts.push(format!("  {}", text));
        }
    }
    Some(format!("export default {{\n{},\n}};", parts.join(",\n")))
}

/// Whether the options declaration textually references `name` in a
/// group that survives filtering. Containment is textual on purpose:
/// computed/method member names, string-mapped store members and plain
/// identifiers all count; dropped groups never do.
pub fn options_reference(model: &ScriptModel, name: &str) -> bool {
    let Some(object) = model.options_object() else {
        return false;
    };
    let source = model.source.as_str();
    let Ok(word) = regex::Regex::new(&format!(r"\b{}\b", regex::escape(name))) else {
        return false;
    };
    for i in 0..object.named_child_count() {
        let Some(child) = object.named_child(i) else { continue };
        if is_dropped_group(child, source) {
            continue;
        }
        if let Ok(text) = child.utf8_text(source.as_bytes()) {
            if word.is_match(text) {
                return true;
            }
        }
    }
    false
}

/// Free identifiers of the options declaration, restricted to the
/// groups that survive filtering.
pub fn options_free_idents(model: &ScriptModel) -> Vec<String> {
    let Some(object) = model.options_object() else {
        return Vec::new();
    };
    let source = model.source.as_str();
    let mut free = Vec::new();
    for i in 0..object.named_child_count() {
        let Some(child) = object.named_child(i) else { continue };
        if is_dropped_group(child, source) {
            continue;
        }
        collect_free_identifiers(child, source, &[], &mut free);
    }
    free
}

/// All state-store mappings declared anywhere in the script: the
/// `map*` spread helpers plus direct `$store` member access inside
/// named computed properties or methods.
pub fn store_bindings(model: &ScriptModel) -> Vec<StoreBinding> {
    let source = model.source.as_str();
    let mut bindings = Vec::new();
    walk(model.root(), &mut |node| {
        if node.kind() == "call_expression" {
            if let Some(found) = map_helper_bindings(node, source) {
                bindings.extend(found);
                return false;
            }
        }
        if node.kind() == "member_expression" {
            if let Some(binding) = direct_store_binding(node, source) {
                if !bindings.contains(&binding) {
                    bindings.push(binding);
                }
                return false;
            }
        }
        true
    });
    bindings
}

fn map_helper_bindings(call: Node<'_>, source: &str) -> Option<Vec<StoreBinding>> {
    let callee = call.child_by_field_name("function")?;
    if callee.kind() != "identifier" {
        return None;
    }
    let callee_name = callee.utf8_text(source.as_bytes()).ok()?;
    let kind = MAP_HELPERS
        .iter()
        .find(|(name, _)| *name == callee_name)
        .map(|(_, kind)| *kind)?;

    let args = call.child_by_field_name("arguments")?;
    let mut namespace = None;
    let mut members: Option<Node> = None;
    for i in 0..args.named_child_count() {
        let Some(arg) = args.named_child(i) else { continue };
        match arg.kind() {
            "string" if namespace.is_none() && members.is_none() => {
                namespace = string_content(arg, source).map(|s| s.to_string());
            }
            "array" | "object" => members = Some(arg),
            _ => {}
        }
    }
    let members = members?;

    // a mapping given without an explicit namespace may still carry
    // one inline, e.g. `mapGetters({ cartTotal: 'cart/total' })`
    let resolve = |target: String| -> (Option<String>, String) {
        match &namespace {
            Some(ns) => (Some(ns.clone()), target),
            None => split_namespaced(&target),
        }
    };

    let mut bindings = Vec::new();
    match members.kind() {
        "array" => {
            for i in 0..members.named_child_count() {
                if let Some(name) = members.named_child(i).and_then(|n| string_content(n, source)) {
                    let (namespace, target) = resolve(name.to_string());
                    bindings.push(StoreBinding {
                        local: target.clone(),
                        namespace,
                        target,
                        kind,
                    });
                }
            }
        }
        "object" => {
            for i in 0..members.named_child_count() {
                let Some(pair) = members.named_child(i) else { continue };
                if pair.kind() != "pair" {
                    continue;
                }
                let Some(local) = pair_key(pair, source) else { continue };
                let raw_target = pair
                    .child_by_field_name("value")
                    .and_then(|v| string_content(v, source))
                    .map(|s| s.to_string())
                    .unwrap_or_else(|| local.clone());
                let (namespace, target) = resolve(raw_target);
                bindings.push(StoreBinding {
                    local,
                    namespace,
                    target,
                    kind,
                });
            }
        }
        _ => {}
    }
    Some(bindings)
}

/// `this.$store.getters['ns/name']` and `this.$store.state.a.b` inside
/// a named computed property or method.
fn direct_store_binding(member: Node<'_>, source: &str) -> Option<StoreBinding> {
    let text = member.utf8_text(source.as_bytes()).ok()?;
    let trimmed = text.strip_prefix("this.").unwrap_or(text);
    let (kind, rest) = if let Some(rest) = trimmed.strip_prefix("$store.getters") {
        (StoreRefKind::Getter, rest)
    } else if let Some(rest) = trimmed.strip_prefix("$store.state") {
        (StoreRefKind::State, rest)
    } else {
        return None;
    };

    // take the outermost such member chain only
    if let Some(parent) = member.parent() {
        if matches!(parent.kind(), "member_expression" | "subscript_expression") {
            let parent_text = parent.utf8_text(source.as_bytes()).ok()?;
            let parent_trimmed = parent_text.strip_prefix("this.").unwrap_or(parent_text);
            if parent_trimmed.starts_with("$store.") {
                return None;
            }
        }
    }

    let path = rest.trim_start_matches('.');
    let (namespace, target) = split_namespaced(path);
    if target.is_empty() {
        return None;
    }
    Some(StoreBinding {
        local: enclosing_member_name(member, source)?,
        namespace,
        target,
        kind,
    })
}

fn split_namespaced(path: &str) -> (Option<String>, String) {
    match path.rsplit_once('/') {
        Some((ns, name)) => (Some(ns.to_string()), name.to_string()),
        None => match path.rsplit_once('.') {
            Some((ns, name)) => (Some(ns.to_string()), name.to_string()),
            None => (None, path.to_string()),
        },
    }
}

fn enclosing_member_name(node: Node<'_>, source: &str) -> Option<String> {
    let mut current = node.parent();
    while let Some(n) = current {
        match n.kind() {
            "method_definition" => {
                return n
                    .child_by_field_name("name")
                    .and_then(|name| name.utf8_text(source.as_bytes()).ok())
                    .map(|s| s.to_string());
            }
            "pair" => {
                return pair_key(n, source);
            }
            _ => {}
        }
        current = n.parent();
    }
    None
}

/// Resolves the subscript form `$store.getters['user/name']`, which is
/// a subscript expression wrapping the `$store.getters` member.
pub fn subscript_store_bindings(model: &ScriptModel) -> Vec<StoreBinding> {
    let source = model.source.as_str();
    let mut bindings = Vec::new();
    walk(model.root(), &mut |node| {
        if node.kind() != "subscript_expression" {
            return true;
        }
        let Some(object) = node.child_by_field_name("object") else { return true };
        let Ok(text) = object.utf8_text(source.as_bytes()) else { return true };
        let trimmed = text.strip_prefix("this.").unwrap_or(text);
        let kind = match trimmed {
            "$store.getters" => StoreRefKind::Getter,
            "$store.state" => StoreRefKind::State,
            _ => return true,
        };
        let Some(index) = node.child_by_field_name("index") else { return true };
        let Some(path) = string_content(index, source) else { return true };
        let (namespace, target) = split_namespaced(path);
        if let Some(local) = enclosing_member_name(node, source) {
            bindings.push(StoreBinding {
                local,
                namespace,
                target,
                kind,
            });
        }
        false
    });
    bindings
}

/// Every store mapping visible in the script, spread helpers and direct
/// access combined.
pub fn all_store_bindings(model: &ScriptModel) -> Vec<StoreBinding> {
    let mut bindings = store_bindings(model);
    for binding in subscript_store_bindings(model) {
        if !bindings.contains(&binding) {
            bindings.push(binding);
        }
    }
    bindings
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::component::ScriptLang;
    use crate::script::model::parse_script;

    const OPTIONS_SCRIPT: &str = r#"
import UserBadge from '@/components/UserBadge.vue';
import { mapGetters, mapActions } from 'vuex';

export default {
  components: { UserBadge },
  props: ['userId', 'compact'],
  computed: {
    ...mapGetters('account', ['profile', 'permissions']),
    ...mapGetters({ cartTotal: 'cart/total' }),
    avatarUrl() {
      return this.$store.getters['account/avatar'];
    },
    theme() {
      return this.$store.state.settings.theme;
    },
  },
  methods: {
    ...mapActions('account', ['refreshProfile']),
  },
};
"#;

    fn model() -> ScriptModel {
        parse_script(OPTIONS_SCRIPT, ScriptLang::Js).unwrap()
    }

    #[test]
    fn props_array_form() {
        assert_eq!(props_of(&model()), vec!["userId", "compact"]);
    }

    #[test]
    fn props_object_form() {
        let model = parse_script(
            "export default { props: { user: { type: Object }, 'max-rows': Number } };",
            ScriptLang::Js,
        )
        .unwrap();
        assert_eq!(props_of(&model), vec!["user", "max-rows"]);
    }

    #[test]
    fn namespaced_map_helpers_resolve() {
        let bindings = all_store_bindings(&model());
        let profile = bindings.iter().find(|b| b.local == "profile").unwrap();
        assert_eq!(profile.namespace.as_deref(), Some("account"));
        assert_eq!(profile.kind, StoreRefKind::Getter);

        let cart = bindings.iter().find(|b| b.local == "cartTotal").unwrap();
        assert_eq!(cart.namespace.as_deref(), Some("cart"));
        assert_eq!(cart.target, "total");

        let action = bindings.iter().find(|b| b.local == "refreshProfile").unwrap();
        assert_eq!(action.kind, StoreRefKind::Action);
    }

    #[test]
    fn direct_store_access_binds_to_enclosing_member() {
        let bindings = all_store_bindings(&model());
        let avatar = bindings.iter().find(|b| b.local == "avatarUrl").unwrap();
        assert_eq!(avatar.namespace.as_deref(), Some("account"));
        assert_eq!(avatar.target, "avatar");
        assert_eq!(avatar.kind, StoreRefKind::Getter);

        let theme = bindings.iter().find(|b| b.local == "theme").unwrap();
        assert_eq!(theme.kind, StoreRefKind::State);
        assert_eq!(theme.namespace.as_deref(), Some("settings"));
        assert_eq!(theme.target, "theme");
    }

    #[test]
    fn dropped_groups_are_filtered_from_options_source() {
        let filtered = filtered_options_source(&model()).unwrap();
        assert!(!filtered.contains("components:"));
        assert!(filtered.contains("props:"));
        assert!(filtered.contains("computed:"));
        // registration-only import no longer referenced
        assert!(!options_free_idents(&model()).contains(&"UserBadge".to_string()));
    }

    #[test]
    fn options_reference_sees_string_mapped_members() {
        let model = model();
        assert!(options_reference(&model, "profile"));
        assert!(options_reference(&model, "mapGetters"));
        assert!(!options_reference(&model, "UserBadge"));
    }
}
