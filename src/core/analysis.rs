/// Static checks over a rule table.
///
/// None of these affect expansion. The engine logs them as warnings after
/// construction when rule analysis is enabled.

use rustc_hash::{FxHashMap, FxHashSet};
use std::fmt;

use crate::core::grammar::GrammarSet;
use crate::core::node::Node;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Finding {
    /// The table has no rules at all.
    EmptyRuleset,
    /// A candidate refers directly to its own rule.
    SelfReference { rule: String, candidate: String },
    /// Rules that can reach each other, sorted by name.
    Cycle(Vec<String>),
    /// A candidate of `rule` sets a tag with the same name as a rule.
    TagOverridesRule { rule: String, tag: String },
    /// A name that no rule defines and no candidate sets as a tag or runtime
    /// rule. It passes through unexpanded unless the host adds an object.
    UnresolvedReference { rule: String, name: String },
}

impl fmt::Display for Finding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::EmptyRuleset => write!(f, "no expandable rules were found"),
            Self::SelfReference { rule, candidate } => {
                write!(f, "rule '{}' references itself: {}", rule, candidate)
            }
            Self::Cycle(rules) => write!(f, "cyclic rule references: {}", rules.join(" -> ")),
            Self::TagOverridesRule { rule, tag } => write!(
                f,
                "rule '{}' creates tag '{}', which overrides the rule of the same name",
                rule, tag
            ),
            Self::UnresolvedReference { rule, name } => {
                write!(f, "rule '{}' references '{}', which is never defined", rule, name)
            }
        }
    }
}

/// Run every check. Tag/rule collisions only matter for flat tag storage,
/// so `check_tag_overrides` selects whether they are reported.
pub fn analyze(rules: &GrammarSet, check_tag_overrides: bool) -> Vec<Finding> {
    if rules.is_empty() {
        return vec![Finding::EmptyRuleset];
    }

    let mut findings = Vec::new();
    let mut graph: FxHashMap<String, Vec<String>> = FxHashMap::default();

    for name in rules.names() {
        let Some(mapping) = rules.get(&name) else {
            continue;
        };
        let mut edges = Vec::new();
        for candidate in &mapping.candidates {
            let refs = References::collect(&candidate.value.nodes);
            if refs.rules.contains(&name) {
                findings.push(Finding::SelfReference {
                    rule: name.clone(),
                    candidate: candidate.source.clone(),
                });
            }
            if check_tag_overrides {
                for tag in &refs.tags {
                    if rules.contains(tag) {
                        findings.push(Finding::TagOverridesRule {
                            rule: name.clone(),
                            tag: tag.clone(),
                        });
                    }
                }
            }
            edges.extend(refs.rules.into_iter().filter(|r| rules.contains(r)));
        }
        edges.sort();
        edges.dedup();
        graph.insert(name, edges);
    }

    findings.extend(
        strongly_connected(&graph)
            .into_iter()
            .filter(|component| component.len() > 1)
            .map(Finding::Cycle),
    );
    findings
}

/// References to names that nothing in the table defines. Not part of
/// `analyze`, since hosts commonly supply objects after construction.
pub fn unresolved_references(rules: &GrammarSet) -> Vec<Finding> {
    let mut per_rule = Vec::new();
    let mut defined: FxHashSet<String> = FxHashSet::default();

    for name in rules.names() {
        let Some(mapping) = rules.get(&name) else {
            continue;
        };
        let mut used = Vec::new();
        for candidate in &mapping.candidates {
            let refs = References::collect(&candidate.value.nodes);
            defined.extend(refs.tags);
            defined.extend(refs.created);
            used.extend(refs.rules);
        }
        used.sort();
        used.dedup();
        per_rule.push((name, used));
    }

    per_rule
        .into_iter()
        .flat_map(|(rule, used)| {
            used.into_iter()
                .filter(|name| !rules.contains(name) && !defined.contains(name))
                .map(|name| Finding::UnresolvedReference {
                    rule: rule.clone(),
                    name,
                })
                .collect::<Vec<_>>()
        })
        .collect()
}

/// Names referenced anywhere inside a node list, including conditions,
/// modifier parameters and tag values.
#[derive(Debug, Default)]
struct References {
    rules: Vec<String>,
    tags: Vec<String>,
    created: Vec<String>,
}

impl References {
    fn collect(nodes: &[Node]) -> Self {
        let mut refs = References::default();
        let mut work: Vec<&Node> = nodes.iter().collect();
        while let Some(node) = work.pop() {
            match node {
                Node::Text(_) | Node::Weight(_) => {}
                Node::Rule { name, modifiers } => {
                    if !name.is_empty() {
                        refs.rules.push(name.clone());
                    }
                    for modifier in modifiers {
                        for param in &modifier.parameters {
                            work.extend(&param.nodes);
                        }
                    }
                }
                Node::Tag { name, values } => {
                    refs.tags.push(name.clone());
                    for value in values {
                        work.extend(&value.nodes);
                    }
                }
                Node::CreateRule { name, values } => {
                    refs.created.push(name.clone());
                    for value in values {
                        work.extend(&value.nodes);
                    }
                }
                Node::Any {
                    values, modifiers, ..
                } => {
                    for value in values {
                        work.extend(&value.nodes);
                    }
                    for modifier in modifiers {
                        for param in &modifier.parameters {
                            work.extend(&param.nodes);
                        }
                    }
                }
                Node::IfBlock {
                    condition,
                    then_block,
                    else_block,
                } => {
                    work.extend(&condition.lhs);
                    work.extend(&condition.rhs);
                    work.extend(then_block);
                    if let Some(block) = else_block {
                        work.extend(block);
                    }
                }
                Node::WhileBlock {
                    condition,
                    do_block,
                } => {
                    work.extend(&condition.lhs);
                    work.extend(&condition.rhs);
                    work.extend(do_block);
                }
            }
        }
        refs
    }
}

/// Tarjan's algorithm, iterative. Components come out with sorted members.
fn strongly_connected(graph: &FxHashMap<String, Vec<String>>) -> Vec<Vec<String>> {
    let mut names: Vec<&String> = graph.keys().collect();
    names.sort();

    let mut index: FxHashMap<&str, usize> = FxHashMap::default();
    let mut low: FxHashMap<&str, usize> = FxHashMap::default();
    let mut on_stack: FxHashSet<&str> = FxHashSet::default();
    let mut stack: Vec<&str> = Vec::new();
    let mut components = Vec::new();
    let mut counter = 0;

    for root in names {
        if index.contains_key(root.as_str()) {
            continue;
        }
        // (vertex, next edge to visit)
        let mut calls: Vec<(&str, usize)> = vec![(root.as_str(), 0)];
        while let Some(&mut (v, ref mut edge)) = calls.last_mut() {
            if *edge == 0 && !index.contains_key(v) {
                index.insert(v, counter);
                low.insert(v, counter);
                counter += 1;
                stack.push(v);
                on_stack.insert(v);
            }

            let successors = graph.get(v).map(Vec::as_slice).unwrap_or_default();
            if let Some(w) = successors.get(*edge) {
                *edge += 1;
                let w = w.as_str();
                if !index.contains_key(w) {
                    calls.push((w, 0));
                } else if on_stack.contains(w) {
                    let lowest = low[v].min(index[w]);
                    low.insert(v, lowest);
                }
                continue;
            }

            calls.pop();
            if let Some(&(parent, _)) = calls.last() {
                let lowest = low[parent].min(low[v]);
                low.insert(parent, lowest);
            }
            if low[v] == index[v] {
                let mut component = Vec::new();
                while let Some(w) = stack.pop() {
                    on_stack.remove(w);
                    component.push(w.to_string());
                    if w == v {
                        break;
                    }
                }
                component.sort();
                components.push(component);
            }
        }
    }
    components
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::logging::Logger;

    fn rules(entries: &[(&str, &str)]) -> GrammarSet {
        let log = Logger::default();
        let mut set = GrammarSet::new();
        for (name, text) in entries {
            set.add(name, (*text).into(), &log).unwrap();
        }
        set
    }

    #[test]
    fn empty_ruleset() {
        assert_eq!(analyze(&GrammarSet::new(), true), vec![Finding::EmptyRuleset]);
    }

    #[test]
    fn clean_rules_have_no_findings() {
        let set = rules(&[("origin", "#a# and #b#"), ("a", "x"), ("b", "#a#")]);
        assert!(analyze(&set, true).is_empty());
    }

    #[test]
    fn self_reference() {
        let set = rules(&[("r", "again #r#")]);
        assert_eq!(
            analyze(&set, true),
            vec![Finding::SelfReference {
                rule: "r".to_string(),
                candidate: "again #r#".to_string(),
            }]
        );
    }

    #[test]
    fn cycles_through_conditions_and_parameters() {
        let set = rules(&[
            ("a", "[if #b# then x]"),
            ("b", "#x.join(#c#)#"),
            ("c", "{(#a#,y)}"),
            ("x", "leaf"),
        ]);
        assert_eq!(
            analyze(&set, true),
            vec![Finding::Cycle(vec!["a".to_string(), "b".to_string(), "c".to_string()])]
        );
    }

    #[test]
    fn tag_override_only_when_requested() {
        let set = rules(&[("name", "rule"), ("origin", "[name:tag]#name#")]);
        let expected = Finding::TagOverridesRule {
            rule: "origin".to_string(),
            tag: "name".to_string(),
        };
        assert_eq!(analyze(&set, true), vec![expected]);
        assert!(analyze(&set, false).is_empty());
    }

    #[test]
    fn unresolved_references_skip_tags_and_runtime_rules() {
        let set = rules(&[
            ("origin", "[hero:fox]#hero# #helper# #ghost#"),
            ("setup", "{helper(owl)}"),
        ]);
        assert!(analyze(&set, true).is_empty());
        assert_eq!(
            unresolved_references(&set),
            vec![Finding::UnresolvedReference {
                rule: "origin".to_string(),
                name: "ghost".to_string(),
            }]
        );
    }

    #[test]
    fn findings_display() {
        let cycle = Finding::Cycle(vec!["a".to_string(), "b".to_string()]);
        assert_eq!(cycle.to_string(), "cyclic rule references: a -> b");
    }
}
