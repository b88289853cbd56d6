//! WASM bindings for narrative-grammar, backing the in-browser playground.

use wasm_bindgen::prelude::*;

use narrative_grammar::core::loader;
use narrative_grammar::{Engine, LogLevel, TagStoragePolicy};

/// The grammar the playground opens with.
const FABLE_GRAMMAR: &str = include_str!("../../grammars/fable.ron");

#[derive(serde::Serialize)]
struct RuleInfo {
    name: String,
    candidates: usize,
}

#[derive(serde::Deserialize)]
#[serde(untagged)]
enum CandidatesInput {
    One(String),
    Many(Vec<String>),
}

#[wasm_bindgen]
pub struct WasmGrammar {
    engine: Engine,
}

#[wasm_bindgen]
impl WasmGrammar {
    /// Build a playground from a RON rule map.
    #[wasm_bindgen(constructor)]
    pub fn new(rules_ron: &str, seed: u64, hierarchical: bool) -> Result<WasmGrammar, JsError> {
        let rules = loader::parse_ron(rules_ron)
            .map_err(|e| JsError::new(&format!("Grammar parse error: {e}")))?;
        let policy = if hierarchical {
            TagStoragePolicy::Hierarchical
        } else {
            TagStoragePolicy::Unilevel
        };
        let engine = Engine::builder()
            .seed(seed)
            .tag_storage(policy)
            .log_level(LogLevel::None)
            .rule_analysis(false)
            .standard_modifiers()
            .rules(rules)
            .build()
            .map_err(|e| JsError::new(&format!("Engine build error: {e}")))?;
        Ok(WasmGrammar { engine })
    }

    /// A playground loaded with the bundled fable grammar.
    pub fn fable(seed: u64) -> Result<WasmGrammar, JsError> {
        Self::new(FABLE_GRAMMAR, seed, false)
    }

    /// Expand a template from a clean slate.
    pub fn expand(&mut self, text: &str) -> String {
        self.engine.expand(text)
    }

    /// Expand a template, keeping tags and runtime rules from earlier calls.
    pub fn expand_keeping_context(&mut self, text: &str) -> String {
        self.engine.expand_with_context(text, true)
    }

    /// Add or replace a rule. `candidates_json` is a string or an array of strings.
    pub fn add_rule(&mut self, name: &str, candidates_json: &str) -> Result<(), JsError> {
        let input: CandidatesInput = serde_json::from_str(candidates_json)
            .map_err(|e| JsError::new(&format!("Invalid candidates JSON: {e}")))?;
        let candidates = match input {
            CandidatesInput::One(text) => vec![text],
            CandidatesInput::Many(list) => list,
        };
        self.engine
            .add_rule(name, candidates)
            .map_err(|e| JsError::new(&format!("Rule error: {e}")))
    }

    pub fn remove_rule(&mut self, name: &str) -> bool {
        self.engine.remove_rule(name)
    }

    /// JSON array of rule names, sorted.
    pub fn rule_names(&self) -> String {
        serde_json::to_string(&self.engine.rule_names()).unwrap_or_else(|_| "[]".to_string())
    }

    /// JSON array of `{ name, candidates }`, sorted by name.
    pub fn rules(&self) -> Result<String, JsError> {
        let rules = self.engine.rules();
        let info: Vec<RuleInfo> = self
            .engine
            .rule_names()
            .into_iter()
            .map(|name| RuleInfo {
                candidates: rules.get(&name).map_or(0, |m| m.candidates.len()),
                name,
            })
            .collect();
        serde_json::to_string(&info)
            .map_err(|e| JsError::new(&format!("Serialization error: {e}")))
    }

    /// JSON array of analysis messages for the current rules.
    pub fn findings(&self) -> String {
        let messages: Vec<String> = self
            .engine
            .analyze()
            .iter()
            .map(ToString::to_string)
            .collect();
        serde_json::to_string(&messages).unwrap_or_else(|_| "[]".to_string())
    }
}
