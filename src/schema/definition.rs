/// Rule definitions a host can register.

use std::fmt;

use crate::core::selector::{Selector, WeightedSelector};

/// Host-supplied source of rule candidates, optionally with its own selector.
pub trait CandidateProvider {
    fn candidates(&self) -> Vec<String>;

    /// A selector to use instead of the default for these candidates.
    fn selector(&self) -> Option<Selector> {
        None
    }
}

/// What a rule name maps to when it is registered.
pub enum RuleDefinition {
    Text(String),
    List(Vec<String>),
    Provider(Box<dyn CandidateProvider>),
}

impl RuleDefinition {
    pub fn candidates(&self) -> Vec<String> {
        match self {
            Self::Text(text) => vec![text.clone()],
            Self::List(list) => list.clone(),
            Self::Provider(provider) => provider.candidates(),
        }
    }

    pub fn selector(&self) -> Option<Selector> {
        match self {
            Self::Provider(provider) => provider.selector(),
            _ => None,
        }
    }

    pub fn provider(provider: impl CandidateProvider + 'static) -> Self {
        Self::Provider(Box::new(provider))
    }
}

impl fmt::Debug for RuleDefinition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Text(text) => f.debug_tuple("Text").field(text).finish(),
            Self::List(list) => f.debug_tuple("List").field(list).finish(),
            Self::Provider(provider) => f
                .debug_tuple("Provider")
                .field(&provider.candidates())
                .finish(),
        }
    }
}

impl From<&str> for RuleDefinition {
    fn from(text: &str) -> Self {
        Self::Text(text.to_string())
    }
}

impl From<String> for RuleDefinition {
    fn from(text: String) -> Self {
        Self::Text(text)
    }
}

impl From<Vec<String>> for RuleDefinition {
    fn from(list: Vec<String>) -> Self {
        Self::List(list)
    }
}

impl From<Vec<&str>> for RuleDefinition {
    fn from(list: Vec<&str>) -> Self {
        Self::List(list.into_iter().map(str::to_string).collect())
    }
}

impl<const N: usize> From<[&str; N]> for RuleDefinition {
    fn from(list: [&str; N]) -> Self {
        Self::List(list.iter().map(|s| s.to_string()).collect())
    }
}

/// Candidates with explicit integer weights, sampled proportionally.
///
/// Weights live beside the text, so candidates need no `:N` suffix.
#[derive(Debug, Clone)]
pub struct WeightedCandidates {
    entries: Vec<(String, u32)>,
}

impl WeightedCandidates {
    pub fn new<S: Into<String>>(entries: impl IntoIterator<Item = (S, u32)>) -> Self {
        Self {
            entries: entries
                .into_iter()
                .map(|(text, weight)| (text.into(), weight))
                .collect(),
        }
    }
}

impl CandidateProvider for WeightedCandidates {
    fn candidates(&self) -> Vec<String> {
        self.entries.iter().map(|(text, _)| text.clone()).collect()
    }

    fn selector(&self) -> Option<Selector> {
        let weights: Vec<u32> = self.entries.iter().map(|(_, weight)| *weight).collect();
        Some(Selector::new(WeightedSelector::new(&weights)))
    }
}
