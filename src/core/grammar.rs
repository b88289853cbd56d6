/// Rule tables: named rules, their parsed candidates, and how one is chosen.

use rand::rngs::StdRng;
use rustc_hash::FxHashMap;
use thiserror::Error;

use crate::core::lexer::{tokenize, Token};
use crate::core::logging::Logger;
use crate::core::node::{Node, ValueCandidate};
use crate::core::parser::parse;
use crate::core::selector::{selector_for, Selector};
use crate::schema::definition::RuleDefinition;

#[derive(Debug, Error)]
pub enum GrammarError {
    #[error("invalid rule name '{0}': names must be plain text")]
    InvalidName(String),
    #[error("rule '{0}' has no valid candidates")]
    NoCandidates(String),
    #[error("rule not found: {0}")]
    RuleNotFound(String),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("RON deserialization error: {0}")]
    Ron(#[from] ron::error::SpannedError),
}

/// One parsed alternative of a rule, with the text it came from.
#[derive(Debug, Clone, PartialEq)]
pub struct RuleCandidate {
    pub source: String,
    pub value: ValueCandidate,
}

/// A rule's candidates and the selector that chooses between them.
#[derive(Debug, Clone)]
pub struct RuleMapping {
    pub candidates: Vec<RuleCandidate>,
    pub selector: Selector,
}

impl RuleMapping {
    /// Build a mapping from already parsed values, choosing the default selector.
    pub fn from_values(values: Vec<ValueCandidate>) -> Self {
        let selector = selector_for(&values);
        let candidates = values
            .into_iter()
            .map(|value| RuleCandidate {
                source: String::new(),
                value,
            })
            .collect();
        Self {
            candidates,
            selector,
        }
    }

    /// `None` when the selector picks outside the candidate list.
    pub fn select(&self, rng: &mut StdRng) -> Option<&RuleCandidate> {
        let index = self.selector.pick(self.candidates.len(), rng);
        self.candidates.get(index)
    }
}

/// The static rule table.
#[derive(Debug, Clone, Default)]
pub struct GrammarSet {
    rules: FxHashMap<String, RuleMapping>,
}

impl GrammarSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse and register a rule. Candidates that fail to parse are logged
    /// and dropped; the rule is rejected only if none survive.
    pub fn add(
        &mut self,
        name: &str,
        definition: RuleDefinition,
        log: &Logger,
    ) -> Result<(), GrammarError> {
        if !is_valid_name(name) {
            log.error(format_args!("rule name '{}' is not plain text", name));
            return Err(GrammarError::InvalidName(name.to_string()));
        }

        let mut candidates = Vec::new();
        for source in definition.candidates() {
            match parse(&tokenize(&source)) {
                Ok(mut nodes) => {
                    if nodes.is_empty() {
                        nodes.push(Node::text(""));
                    }
                    candidates.push(RuleCandidate {
                        source,
                        value: ValueCandidate::new(nodes),
                    });
                }
                Err(e) => {
                    log.error(format_args!("rule '{}' candidate dropped: {}", name, e));
                }
            }
        }

        if candidates.is_empty() {
            log.error(format_args!("rule '{}' has no valid candidates", name));
            return Err(GrammarError::NoCandidates(name.to_string()));
        }

        let selector = definition.selector().unwrap_or_else(|| {
            let values: Vec<ValueCandidate> =
                candidates.iter().map(|c| c.value.clone()).collect();
            selector_for(&values)
        });

        if self.rules.contains_key(name) {
            log.warn(format_args!("rule '{}' redefined", name));
        }
        log.trace(format_args!(
            "rule '{}' added with {} candidate(s)",
            name,
            candidates.len()
        ));
        self.rules.insert(
            name.to_string(),
            RuleMapping {
                candidates,
                selector,
            },
        );
        Ok(())
    }

    pub fn remove(&mut self, name: &str) -> Option<RuleMapping> {
        self.rules.remove(name)
    }

    pub fn set_selector(&mut self, name: &str, selector: Selector) -> Result<(), GrammarError> {
        match self.rules.get_mut(name) {
            Some(mapping) => {
                mapping.selector = selector;
                Ok(())
            }
            None => Err(GrammarError::RuleNotFound(name.to_string())),
        }
    }

    pub fn get(&self, name: &str) -> Option<&RuleMapping> {
        self.rules.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.rules.contains_key(name)
    }

    /// Rule names in sorted order.
    pub fn names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.rules.keys().cloned().collect();
        names.sort();
        names
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &RuleMapping)> {
        self.rules.iter()
    }
}

/// A rule name must lex as exactly one plain token equal to itself.
pub fn is_valid_name(name: &str) -> bool {
    match tokenize(name).as_slice() {
        [Token::Text(text)] => text == name,
        [Token::Number(n)] => n.to_string() == name,
        _ => false,
    }
}
