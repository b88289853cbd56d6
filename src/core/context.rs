/// Execution contexts: the evaluator's explicit call stack.
///
/// Frames are pooled. Popping only moves the `top` index, so a frame's
/// buffers are reused by the next push instead of being reallocated.

use crate::core::node::Instr;

/// What happens to a frame's result when it is popped into its parent.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PopAction {
    AppendToResult,
    AddArg,
    Nothing,
}

#[derive(Debug)]
pub struct ExecutionContext {
    /// Pending work, stored last-first so the next item is at the end.
    pending: Vec<Instr>,
    pub result: String,
    pub args: Vec<String>,
    pub on_pop: PopAction,
    pub affects_level: bool,
}

impl ExecutionContext {
    fn empty() -> Self {
        Self {
            pending: Vec::new(),
            result: String::new(),
            args: Vec::new(),
            on_pop: PopAction::Nothing,
            affects_level: false,
        }
    }

    fn reset(&mut self, instrs: Vec<Instr>, on_pop: PopAction, affects_level: bool) {
        self.pending.clear();
        self.pending.extend(instrs.into_iter().rev());
        self.result.clear();
        self.args.clear();
        self.on_pop = on_pop;
        self.affects_level = affects_level;
    }

    pub(crate) fn next(&mut self) -> Option<Instr> {
        self.pending.pop()
    }

    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }

    /// Hand this frame's output to its parent.
    fn pop_into(&mut self, parent: &mut ExecutionContext) {
        match self.on_pop {
            PopAction::AppendToResult => parent.result.push_str(&self.result),
            PopAction::AddArg => parent.args.push(std::mem::take(&mut self.result)),
            PopAction::Nothing => {}
        }
    }
}

#[derive(Debug, Default)]
pub struct ContextStack {
    frames: Vec<ExecutionContext>,
    top: usize,
}

impl ContextStack {
    pub fn new() -> Self {
        Self::default()
    }

    /// Drop all live frames, keeping their allocations.
    pub fn reset(&mut self) {
        self.top = 0;
    }

    pub(crate) fn push(&mut self, instrs: Vec<Instr>, on_pop: PopAction, affects_level: bool) {
        if self.top == self.frames.len() {
            self.frames.push(ExecutionContext::empty());
        }
        self.frames[self.top].reset(instrs, on_pop, affects_level);
        self.top += 1;
    }

    /// Pop the top frame into its parent. Returns the popped frame's
    /// `affects_level`, or `None` when only the root is left.
    pub fn pop(&mut self) -> Option<bool> {
        if self.top < 2 {
            return None;
        }
        let (below, above) = self.frames.split_at_mut(self.top - 1);
        let child = &mut above[0];
        child.pop_into(&mut below[self.top - 2]);
        self.top -= 1;
        Some(child.affects_level)
    }

    pub fn top_mut(&mut self) -> Option<&mut ExecutionContext> {
        self.top.checked_sub(1).map(|i| &mut self.frames[i])
    }

    pub fn len(&self) -> usize {
        self.top
    }

    pub fn is_empty(&self) -> bool {
        self.top == 0
    }

    /// Only the root is left and it has no pending work.
    pub fn is_complete(&self) -> bool {
        self.top == 1 && self.frames[0].is_empty()
    }

    /// Take the root's output, leaving the stack empty.
    pub fn finish(&mut self) -> String {
        let result = match self.frames.first_mut() {
            Some(root) if self.top > 0 => std::mem::take(&mut root.result),
            _ => String::new(),
        };
        self.top = 0;
        result
    }
}
