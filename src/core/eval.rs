/// The evaluator: expands a node tree on an explicit context stack.
///
/// Nothing here recurses on the host stack. Each rule-table expansion raises
/// the evaluation level by one; inline rules, tags, conditions and modifiers
/// run at the level of the rule that contains them. The level both bounds
/// recursion and keys hierarchical tag storage.

use rand::rngs::StdRng;
use rustc_hash::FxHashMap;
use thiserror::Error;

use crate::core::context::{ContextStack, PopAction};
use crate::core::grammar::{GrammarSet, RuleMapping};
use crate::core::logging::Logger;
use crate::core::node::{Condition, ConditionOp, Instr, Modifier, Node};
use crate::core::parser::ParseError;
use crate::core::selector::selector_for;
use crate::core::tags::{TagMapping, TagStorage};

/// A host transform: `(current text, evaluated arguments) -> new text`.
pub type Method = Box<dyn FnMut(&str, &[String]) -> String>;

#[derive(Debug, Error)]
pub enum EvalError {
    #[error("stack overflow: rule expansion nested deeper than {0} levels")]
    StackOverflow(usize),
    #[error("stack overflow: more than {0} execution contexts live")]
    FrameLimit(usize),
    #[error("malformed condition: {0}")]
    MalformedCondition(String),
    #[error("parse error: {0}")]
    Parse(#[from] ParseError),
}

pub(crate) struct Evaluator<'e> {
    pub rules: &'e GrammarSet,
    pub runtime_rules: &'e mut FxHashMap<String, RuleMapping>,
    pub tags: &'e mut dyn TagStorage,
    pub objects: &'e FxHashMap<String, String>,
    pub methods: &'e mut FxHashMap<String, Method>,
    pub stack: &'e mut ContextStack,
    pub rng: &'e mut StdRng,
    pub log: &'e Logger,
    pub max_stack_depth: usize,
    pub max_frames: usize,
    pub level: usize,
}

impl<'e> Evaluator<'e> {
    pub fn run(&mut self, nodes: Vec<Node>) -> Result<String, EvalError> {
        self.stack.reset();
        self.level = 0;
        let root = nodes.into_iter().map(Instr::Node).collect();
        self.push(root, PopAction::AppendToResult, true)?;
        // a failed call can leave deeper levels behind
        self.tags.leave_level(self.level);

        loop {
            if self.stack.is_complete() {
                return Ok(self.stack.finish());
            }
            let Some(top) = self.stack.top_mut() else {
                return Ok(String::new());
            };
            match top.next() {
                Some(instr) => self.step(instr)?,
                None => {
                    if self.stack.pop() == Some(true) {
                        self.level = self.level.saturating_sub(1);
                        self.tags.leave_level(self.level);
                    }
                }
            }
        }
    }

    fn push(
        &mut self,
        instrs: Vec<Instr>,
        on_pop: PopAction,
        affects_level: bool,
    ) -> Result<(), EvalError> {
        if self.stack.len() >= self.max_frames {
            self.log.error(format_args!("stack overflow: context limit reached"));
            return Err(EvalError::FrameLimit(self.max_frames));
        }
        if affects_level {
            self.level += 1;
            if self.level > self.max_stack_depth {
                self.log.error(format_args!("stack overflow at level {}", self.level));
                return Err(EvalError::StackOverflow(self.max_stack_depth));
            }
        }
        self.stack.push(instrs, on_pop, affects_level);
        Ok(())
    }

    fn push_nodes(
        &mut self,
        nodes: &[Node],
        on_pop: PopAction,
        affects_level: bool,
    ) -> Result<(), EvalError> {
        self.push(
            nodes.iter().cloned().map(Instr::Node).collect(),
            on_pop,
            affects_level,
        )
    }

    fn append(&mut self, text: &str) {
        if let Some(top) = self.stack.top_mut() {
            top.result.push_str(text);
        }
    }

    fn step(&mut self, instr: Instr) -> Result<(), EvalError> {
        match instr {
            Instr::Node(node) => self.node(node),
            Instr::EvaluateArg(nodes) => self.push_nodes(&nodes, PopAction::AddArg, false),
            Instr::ClearArgs => {
                if let Some(top) = self.stack.top_mut() {
                    top.args.clear();
                }
                Ok(())
            }
            Instr::RunMod(name) => {
                self.run_mod(&name);
                Ok(())
            }
            Instr::CreateTag { name, selector } => {
                let candidates = self
                    .stack
                    .top_mut()
                    .map(|top| std::mem::take(&mut top.args))
                    .unwrap_or_default();
                if self.tags.get(self.level, &name).is_some() {
                    self.log.trace(format_args!("overwriting tag '{}'", name));
                }
                self.log
                    .trace(format_args!("set tag [{}] <- {:?}", name, candidates));
                self.tags
                    .store(self.level, &name, TagMapping { candidates, selector });
                Ok(())
            }
            Instr::Branch {
                op,
                then_block,
                else_block,
            } => self.branch(op, then_block, else_block),
        }
    }

    fn node(&mut self, node: Node) -> Result<(), EvalError> {
        match node {
            Node::Text(text) => {
                self.append(&text);
                Ok(())
            }
            Node::Weight(_) => Ok(()),
            Node::Rule { name, modifiers } => self.rule(name, &modifiers),
            Node::Any {
                values,
                selector,
                modifiers,
            } => {
                let index = selector.pick(values.len(), self.rng);
                let Some(choice) = values.get(index) else {
                    self.log
                        .warn(format_args!("inline rule selector picked no candidate"));
                    return Ok(());
                };
                let mut instrs: Vec<Instr> =
                    choice.nodes.iter().cloned().map(Instr::Node).collect();
                self.chain_modifiers(&mut instrs, &modifiers);
                self.push(instrs, PopAction::AppendToResult, false)
            }
            Node::Tag { name, values } => {
                let mut instrs: Vec<Instr> = values
                    .iter()
                    .map(|value| Instr::EvaluateArg(value.nodes.clone()))
                    .collect();
                instrs.push(Instr::CreateTag {
                    selector: selector_for(&values),
                    name,
                });
                self.push(instrs, PopAction::Nothing, false)
            }
            Node::CreateRule { name, values } => {
                if self.runtime_rules.contains_key(&name) {
                    self.log.warn(format_args!("overwriting rule '{}'", name));
                } else {
                    self.log.trace(format_args!("added rule '{}'", name));
                }
                self.runtime_rules
                    .insert(name, RuleMapping::from_values(values));
                Ok(())
            }
            Node::IfBlock {
                ref condition,
                ref then_block,
                ref else_block,
            } => {
                let mut instrs = self.expand_condition(condition);
                instrs.push(Instr::Branch {
                    op: condition.op,
                    then_block: then_block.clone(),
                    else_block: else_block.clone(),
                });
                self.push(instrs, PopAction::AppendToResult, false)
            }
            Node::WhileBlock {
                ref condition,
                ref do_block,
            } => {
                let mut instrs = self.expand_condition(condition);
                let mut body = do_block.clone();
                body.push(node.clone());
                instrs.push(Instr::Branch {
                    op: condition.op,
                    then_block: body,
                    else_block: None,
                });
                self.push(instrs, PopAction::AppendToResult, false)
            }
        }
    }

    /// Resolve `#name#`: tag, then object, then runtime rule, then static rule.
    fn rule(&mut self, name: String, modifiers: &[Modifier]) -> Result<(), EvalError> {
        let (nodes, affects_level) = if name.is_empty() {
            (vec![Node::text("")], false)
        } else if let Some(tag) = self.tags.get(self.level, &name) {
            let index = tag.selector.pick(tag.candidates.len(), self.rng);
            match tag.candidates.get(index) {
                Some(value) => {
                    self.log
                        .trace(format_args!("get tag [{}] -> {}", name, value));
                    (vec![Node::Text(value.clone())], false)
                }
                None => return Ok(self.passthrough(&name, "tag selector picked no value")),
            }
        } else if let Some(value) = self.objects.get(&name) {
            (vec![Node::Text(value.clone())], false)
        } else if let Some(mapping) = self
            .runtime_rules
            .get(&name)
            .or_else(|| self.rules.get(&name))
        {
            match mapping.select(self.rng) {
                Some(candidate) => (candidate.value.nodes.clone(), true),
                None => return Ok(self.passthrough(&name, "no candidates found")),
            }
        } else {
            return Ok(self.passthrough(&name, "not defined"));
        };

        let mut instrs: Vec<Instr> = nodes.into_iter().map(Instr::Node).collect();
        self.chain_modifiers(&mut instrs, modifiers);
        self.push(instrs, PopAction::AppendToResult, affects_level)
    }

    fn passthrough(&mut self, name: &str, reason: &str) {
        self.log
            .warn(format_args!("rule #{}# expansion failed - {}", name, reason));
        self.append(&format!("#{}#", name));
    }

    /// Append `EvaluateArg* RunMod ClearArgs` for each known modifier.
    fn chain_modifiers(&self, instrs: &mut Vec<Instr>, modifiers: &[Modifier]) {
        for modifier in modifiers {
            if !self.methods.contains_key(&modifier.name) {
                self.log
                    .warn(format_args!("modifier '{}' not defined", modifier.name));
                continue;
            }
            instrs.extend(
                modifier
                    .parameters
                    .iter()
                    .map(|param| Instr::EvaluateArg(param.nodes.clone())),
            );
            instrs.push(Instr::RunMod(modifier.name.clone()));
            instrs.push(Instr::ClearArgs);
        }
    }

    fn run_mod(&mut self, name: &str) {
        let Some(method) = self.methods.get_mut(name) else {
            self.log.warn(format_args!("modifier '{}' not defined", name));
            return;
        };
        if let Some(top) = self.stack.top_mut() {
            self.log.trace(format_args!(
                "run mod {}({}) params: {}",
                name,
                top.result,
                top.args.join(",")
            ));
            top.result = method(&top.result, &top.args);
        }
    }

    /// Lower a condition into argument evaluations. `in`/`not in` against a
    /// lone rule reference expands every candidate of that tag or rule.
    fn expand_condition(&self, condition: &Condition) -> Vec<Instr> {
        let mut instrs = vec![Instr::EvaluateArg(condition.lhs.clone())];

        if let (ConditionOp::ValueIn | ConditionOp::ValueNotIn, [Node::Rule { name, .. }]) =
            (condition.op, condition.rhs.as_slice())
        {
            if let Some(tag) = self.tags.get(self.level, name) {
                instrs.extend(
                    tag.candidates
                        .iter()
                        .map(|value| Instr::EvaluateArg(vec![Node::Text(value.clone())])),
                );
                return instrs;
            }
            if let Some(mapping) = self.runtime_rules.get(name).or_else(|| self.rules.get(name)) {
                instrs.extend(
                    mapping
                        .candidates
                        .iter()
                        .map(|candidate| Instr::EvaluateArg(candidate.value.nodes.clone())),
                );
                return instrs;
            }
        }

        instrs.push(Instr::EvaluateArg(condition.rhs.clone()));
        instrs
    }

    fn branch(
        &mut self,
        op: ConditionOp,
        then_block: Vec<Node>,
        else_block: Option<Vec<Node>>,
    ) -> Result<(), EvalError> {
        let Some(top) = self.stack.top_mut() else {
            return Ok(());
        };
        if !op.accepts(top.args.len()) {
            return Err(EvalError::MalformedCondition(format!(
                "{:?} cannot compare {} value(s)",
                op,
                top.args.len()
            )));
        }
        let taken = if op.holds(&top.args) {
            self.log.trace(format_args!("branch to then"));
            Some(then_block)
        } else {
            self.log.trace(format_args!("condition failed"));
            else_block
        };
        match taken {
            Some(block) => self.push_nodes(&block, PopAction::AppendToResult, false),
            None => Ok(()),
        }
    }
}
