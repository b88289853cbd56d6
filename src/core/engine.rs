/// The host-facing engine: rule tables, tags, host extensions, and `expand`.

use rand::rngs::StdRng;
use rand::SeedableRng;
use rustc_hash::FxHashMap;
use std::fmt::Display;
use std::path::{Path, PathBuf};
use thiserror::Error;

use crate::core::analysis::{analyze, Finding};
use crate::core::context::ContextStack;
use crate::core::eval::{EvalError, Evaluator, Method};
use crate::core::grammar::{GrammarError, GrammarSet, RuleMapping};
use crate::core::loader;
use crate::core::logging::Logger;
use crate::core::modifiers;
use crate::core::parser::parse_str;
use crate::core::selector::Selector;
use crate::core::tags::TagStorage;
use crate::schema::definition::RuleDefinition;
use crate::schema::options::{EngineOptions, LogLevel, TagStoragePolicy};

#[derive(Debug, Error)]
pub enum EngineError {
    #[error("grammar error: {0}")]
    Grammar(#[from] GrammarError),
    #[error("{0}")]
    Eval(#[from] EvalError),
}

/// Expands templates against a rule table. Built via `Engine::builder()`.
pub struct Engine {
    options: EngineOptions,
    log: Logger,
    rules: GrammarSet,
    runtime_rules: FxHashMap<String, RuleMapping>,
    tags: Box<dyn TagStorage>,
    objects: FxHashMap<String, String>,
    methods: FxHashMap<String, Method>,
    stack: ContextStack,
    rng: StdRng,
}

/// Builder for constructing an `Engine`.
pub struct EngineBuilder {
    options: EngineOptions,
    rules: Vec<(String, RuleDefinition)>,
    rule_files: Vec<PathBuf>,
    standard_modifiers: bool,
}

impl Engine {
    pub fn builder() -> EngineBuilder {
        EngineBuilder {
            options: EngineOptions::default(),
            rules: Vec::new(),
            rule_files: Vec::new(),
            standard_modifiers: false,
        }
    }

    /// An engine with default options and no rules.
    pub fn new() -> Self {
        Self::with_options(EngineOptions::default())
    }

    fn with_options(options: EngineOptions) -> Self {
        let rng = match options.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        Self {
            log: Logger::new(options.log_level),
            tags: options.tag_storage.storage(),
            options,
            rules: GrammarSet::new(),
            runtime_rules: FxHashMap::default(),
            objects: FxHashMap::default(),
            methods: FxHashMap::default(),
            stack: ContextStack::new(),
            rng,
        }
    }

    /// Expand `text` from a clean slate. Never fails: errors come back as
    /// text starting with `error: `.
    pub fn expand(&mut self, text: &str) -> String {
        self.expand_with_context(text, false)
    }

    /// Expand `text`, keeping tags and runtime rules from earlier calls
    /// when `preserve_context` is set.
    pub fn expand_with_context(&mut self, text: &str, preserve_context: bool) -> String {
        match self.try_expand(text, preserve_context) {
            Ok(output) => output,
            Err(e) => format!("error: {}", e),
        }
    }

    pub fn try_expand(&mut self, text: &str, preserve_context: bool) -> Result<String, EngineError> {
        if !preserve_context {
            self.runtime_rules.clear();
            self.tags.remove_all();
        }
        self.log.trace(format_args!("input {}", text));

        let nodes = parse_str(text).map_err(EvalError::from)?;
        let output = Evaluator {
            rules: &self.rules,
            runtime_rules: &mut self.runtime_rules,
            tags: self.tags.as_mut(),
            objects: &self.objects,
            methods: &mut self.methods,
            stack: &mut self.stack,
            rng: &mut self.rng,
            log: &self.log,
            max_stack_depth: self.options.max_stack_depth,
            max_frames: self.options.max_frames,
            level: 0,
        }
        .run(nodes)?;

        self.log.trace(format_args!("output {} ==> {}", text, output));
        Ok(output)
    }

    pub fn add_rule(
        &mut self,
        name: &str,
        definition: impl Into<RuleDefinition>,
    ) -> Result<(), GrammarError> {
        self.rules.add(name, definition.into(), &self.log)
    }

    pub fn remove_rule(&mut self, name: &str) -> bool {
        self.rules.remove(name).is_some()
    }

    /// Replace the selector of an existing rule.
    pub fn set_selector(&mut self, name: &str, selector: Selector) -> Result<(), GrammarError> {
        self.rules.set_selector(name, selector).map_err(|e| {
            self.log
                .warn(format_args!("rule '{}' not found to set selector", name));
            e
        })
    }

    /// Register a `text -> text` transform.
    pub fn add_modifier(&mut self, name: &str, mut modifier: impl FnMut(&str) -> String + 'static) {
        self.insert_method(name, "modifier", Box::new(move |input, _| modifier(input)));
    }

    /// Register a `(text, args) -> text` transform.
    pub fn add_method(
        &mut self,
        name: &str,
        method: impl FnMut(&str, &[String]) -> String + 'static,
    ) {
        self.insert_method(name, "method", Box::new(method));
    }

    /// Register a side-effecting hook. The text it is applied to is unchanged.
    pub fn add_call(&mut self, name: &str, mut call: impl FnMut() + 'static) {
        self.insert_method(
            name,
            "call",
            Box::new(move |input, _| {
                call();
                input.to_string()
            }),
        );
    }

    fn insert_method(&mut self, name: &str, kind: &str, method: Method) {
        if self.methods.insert(name.to_string(), method).is_some() {
            self.log.warn(format_args!("overwriting {} '{}'", kind, name));
        }
    }

    /// Expose a value under `#name#`, formatted with `Display`.
    pub fn add_object(&mut self, name: &str, value: impl Display) {
        self.objects.insert(name.to_string(), value.to_string());
    }

    pub fn remove_object(&mut self, name: &str) -> bool {
        self.objects.remove(name).is_some()
    }

    /// Static rule names in sorted order.
    pub fn rule_names(&self) -> Vec<String> {
        self.rules.names()
    }

    pub fn rules(&self) -> &GrammarSet {
        &self.rules
    }

    pub fn options(&self) -> &EngineOptions {
        &self.options
    }

    /// Run the rule-table checks.
    pub fn analyze(&self) -> Vec<Finding> {
        let flat_tags = self.options.tag_storage == TagStoragePolicy::Unilevel;
        analyze(&self.rules, flat_tags)
    }
}

impl Default for Engine {
    fn default() -> Self {
        Self::new()
    }
}

impl EngineBuilder {
    /// Replace all options at once.
    pub fn options(mut self, options: EngineOptions) -> Self {
        self.options = options;
        self
    }

    pub fn seed(mut self, seed: u64) -> Self {
        self.options.seed = Some(seed);
        self
    }

    pub fn tag_storage(mut self, policy: TagStoragePolicy) -> Self {
        self.options.tag_storage = policy;
        self
    }

    pub fn max_stack_depth(mut self, depth: usize) -> Self {
        self.options.max_stack_depth = depth;
        self
    }

    pub fn max_frames(mut self, frames: usize) -> Self {
        self.options.max_frames = frames;
        self
    }

    pub fn log_level(mut self, level: LogLevel) -> Self {
        self.options.log_level = level;
        self
    }

    pub fn rule_analysis(mut self, enabled: bool) -> Self {
        self.options.rule_analysis = enabled;
        self
    }

    pub fn rule(mut self, name: &str, definition: impl Into<RuleDefinition>) -> Self {
        self.rules.push((name.to_string(), definition.into()));
        self
    }

    pub fn rules<N, D>(mut self, rules: impl IntoIterator<Item = (N, D)>) -> Self
    where
        N: Into<String>,
        D: Into<RuleDefinition>,
    {
        self.rules
            .extend(rules.into_iter().map(|(n, d)| (n.into(), d.into())));
        self
    }

    /// Load rules from a `.ron` or `[name]` text file at build time.
    pub fn rule_file(mut self, path: impl AsRef<Path>) -> Self {
        self.rule_files.push(path.as_ref().to_path_buf());
        self
    }

    /// Register `capitalize`, `s`, `a` and the rest of the standard modifiers.
    pub fn standard_modifiers(mut self) -> Self {
        self.standard_modifiers = true;
        self
    }

    pub fn build(self) -> Result<Engine, EngineError> {
        let mut engine = Engine::with_options(self.options);

        // Rules that fail to register are logged by the rule table and skipped
        for path in &self.rule_files {
            for (name, candidates) in loader::load_file(path, &engine.log)? {
                let _ = engine.add_rule(&name, candidates);
            }
        }
        for (name, definition) in self.rules {
            let _ = engine.add_rule(&name, definition);
        }

        if self.standard_modifiers {
            for (name, modifier) in modifiers::standard() {
                engine.add_modifier(name, modifier);
            }
        }

        if engine.options.rule_analysis {
            engine.log.info(format_args!("analysing rules"));
            for finding in engine.analyze() {
                engine.log.warn(format_args!("{}", finding));
            }
        }

        Ok(engine)
    }
}
