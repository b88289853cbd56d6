use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::core::grammar::GrammarError;
use crate::core::tags::{HierarchicalTagStorage, TagStorage, UnilevelTagStorage};

/// How tags are scoped.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum TagStoragePolicy {
    /// One flat map; the latest write wins everywhere.
    #[default]
    Unilevel,
    /// Tags are keyed by evaluation depth and read from the nearest enclosing level.
    Hierarchical,
}

impl TagStoragePolicy {
    pub fn storage(&self) -> Box<dyn TagStorage> {
        match self {
            Self::Unilevel => Box::new(UnilevelTagStorage::default()),
            Self::Hierarchical => Box::new(HierarchicalTagStorage::default()),
        }
    }
}

/// Log verbosity, ordered from silent to chatty.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize,
)]
pub enum LogLevel {
    None,
    #[default]
    Errors,
    Warnings,
    Info,
    Verbose,
}

impl LogLevel {
    /// Parse the lowercase names used on command lines.
    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "none" => Some(Self::None),
            "errors" => Some(Self::Errors),
            "warnings" => Some(Self::Warnings),
            "info" => Some(Self::Info),
            "verbose" => Some(Self::Verbose),
            _ => None,
        }
    }
}

/// Engine configuration. Every field has a default, so a RON file only
/// needs to name what it changes:
///
/// ```ron
/// (tag_storage: Hierarchical, max_stack_depth: 64, seed: Some(7))
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineOptions {
    pub tag_storage: TagStoragePolicy,
    /// Run the rule analysers once the engine is built.
    pub rule_analysis: bool,
    /// Maximum nesting of rule expansions.
    pub max_stack_depth: usize,
    /// Maximum number of live execution contexts.
    pub max_frames: usize,
    pub log_level: LogLevel,
    /// `None` seeds from entropy.
    pub seed: Option<u64>,
}

impl Default for EngineOptions {
    fn default() -> Self {
        Self {
            tag_storage: TagStoragePolicy::Unilevel,
            rule_analysis: true,
            max_stack_depth: 256,
            max_frames: 4096,
            log_level: LogLevel::Errors,
            seed: None,
        }
    }
}

impl EngineOptions {
    /// Load options from a RON file.
    pub fn load_from_ron(path: &Path) -> Result<EngineOptions, GrammarError> {
        let contents = std::fs::read_to_string(path)?;
        Self::parse_ron(&contents)
    }

    /// Parse options from a RON string.
    pub fn parse_ron(input: &str) -> Result<EngineOptions, GrammarError> {
        Ok(ron::from_str(input)?)
    }
}
