/// Parsed node tree and the lowered instructions the evaluator executes.

use crate::core::selector::Selector;

/// A parsed template node.
#[derive(Debug, Clone, PartialEq)]
pub enum Node {
    /// Literal output.
    Text(String),
    /// `#name.mod1.mod2(arg)#`
    Rule {
        name: String,
        modifiers: Vec<Modifier>,
    },
    /// `[name:a,b]`
    Tag {
        name: String,
        values: Vec<ValueCandidate>,
    },
    /// `{name(a,b)}`, a rule that lives only in the runtime table.
    CreateRule {
        name: String,
        values: Vec<ValueCandidate>,
    },
    /// `{(a,b)}`, an anonymous inline rule.
    Any {
        values: Vec<ValueCandidate>,
        selector: Selector,
        modifiers: Vec<Modifier>,
    },
    /// `:NUMBER` trailing a candidate.
    Weight(u32),
    IfBlock {
        condition: Condition,
        then_block: Vec<Node>,
        else_block: Option<Vec<Node>>,
    },
    WhileBlock {
        condition: Condition,
        do_block: Vec<Node>,
    },
}

impl Node {
    pub fn text(text: impl Into<String>) -> Self {
        Node::Text(text.into())
    }

    /// A bare rule reference with no modifiers.
    pub fn rule(name: impl Into<String>) -> Self {
        Node::Rule {
            name: name.into(),
            modifiers: Vec::new(),
        }
    }
}

/// A `.name(params)` call chained on a rule reference.
#[derive(Debug, Clone, PartialEq)]
pub struct Modifier {
    pub name: String,
    pub parameters: Vec<ValueCandidate>,
}

/// One alternative of a rule, tag or parameter list.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ValueCandidate {
    pub nodes: Vec<Node>,
}

impl ValueCandidate {
    pub fn new(nodes: Vec<Node>) -> Self {
        Self { nodes }
    }

    pub fn has_weight(&self) -> bool {
        matches!(self.nodes.last(), Some(Node::Weight(_)))
    }

    /// The trailing `:NUMBER` weight, or 1 when there is none.
    pub fn weight(&self) -> u32 {
        match self.nodes.last() {
            Some(Node::Weight(weight)) => *weight,
            _ => 1,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConditionOp {
    EqualTo,
    NotEqualTo,
    ValueIn,
    ValueNotIn,
}

impl ConditionOp {
    /// Number of accumulated arguments a branch on this operator accepts.
    pub(crate) fn accepts(&self, args: usize) -> bool {
        match self {
            Self::EqualTo | Self::NotEqualTo => args == 2,
            Self::ValueIn | Self::ValueNotIn => args >= 1,
        }
    }

    /// Decide a branch given the expanded operands.
    pub(crate) fn holds(&self, args: &[String]) -> bool {
        match self {
            Self::EqualTo => args[0] == args[1],
            Self::NotEqualTo => args[0] != args[1],
            Self::ValueIn => args[1..].contains(&args[0]),
            Self::ValueNotIn => !args[1..].contains(&args[0]),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Condition {
    pub lhs: Vec<Node>,
    pub rhs: Vec<Node>,
    pub op: ConditionOp,
}

/// Work items on an execution context. Everything except `Node` is
/// produced by the evaluator while lowering nodes and never by the parser.
#[derive(Debug, Clone)]
pub(crate) enum Instr {
    Node(Node),
    /// Expand the nodes in a child frame and push the result onto `args`.
    EvaluateArg(Vec<Node>),
    ClearArgs,
    /// Apply a modifier to the frame's result using its `args`.
    RunMod(String),
    /// Store the frame's `args` as the candidates of a tag.
    CreateTag { name: String, selector: Selector },
    Branch {
        op: ConditionOp,
        then_block: Vec<Node>,
        else_block: Option<Vec<Node>>,
    },
}
