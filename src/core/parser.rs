/// Recursive-descent parser from tokens to a node tree.
///
/// Tokens that cannot start a construct are coerced into literal text
/// whenever they are not acting as a list separator or closer, so stray
/// punctuation in prose never needs escaping.

use thiserror::Error;

use crate::core::lexer::{tokenize, Keyword, Token};
use crate::core::node::{Condition, ConditionOp, Modifier, Node, ValueCandidate};
use crate::core::selector::selector_for;

/// A syntax error, with the input rendered and the failure point marked.
///
/// ```text
/// expected : after tag 'tag'
///     #[tag❌]#
///     .....^
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{rendered}")]
pub struct ParseError {
    pub reason: String,
    pub rendered: String,
}

type PResult<T> = Result<T, String>;

/// Tokenize and parse template text.
pub fn parse_str(input: &str) -> Result<Vec<Node>, ParseError> {
    parse(&tokenize(input))
}

/// Parse a token stream into nodes.
pub fn parse(tokens: &[Token]) -> Result<Vec<Node>, ParseError> {
    let mut parser = Parser {
        tokens,
        pos: 0,
        depth: 0,
    };
    parser
        .fragment_sequence_until(&[])
        .map_err(|reason| parser.diagnose(reason))
}

/// Deepest nesting of rules, tags and blocks a template may use.
pub const MAX_NESTING: usize = 128;

const HASH: Token = Token::Op('#');
const LEFT_CURLY: Token = Token::Op('{');
const RIGHT_CURLY: Token = Token::Op('}');
const LEFT_SQUARE: Token = Token::Op('[');
const RIGHT_SQUARE: Token = Token::Op(']');
const LEFT_ROUND: Token = Token::Op('(');
const RIGHT_ROUND: Token = Token::Op(')');
const COLON: Token = Token::Op(':');
const COMMA: Token = Token::Op(',');
const DOT: Token = Token::Op('.');

struct Parser<'a> {
    tokens: &'a [Token],
    pos: usize,
    depth: usize,
}

impl<'a> Parser<'a> {
    fn current(&self) -> Option<&'a Token> {
        self.tokens.get(self.pos)
    }

    fn next(&self) -> Option<&'a Token> {
        self.tokens.get(self.pos + 1)
    }

    fn at(&self, token: &Token) -> bool {
        self.current() == Some(token)
    }

    fn advance(&mut self) {
        self.pos += 1;
    }

    fn expect(&mut self, token: &Token, error: &str) -> PResult<()> {
        match self.current() {
            Some(current) if current == token => {
                self.advance();
                Ok(())
            }
            Some(_) if !error.is_empty() => Err(error.to_string()),
            Some(current) => Err(format!("expected {}, got {}", token, current)),
            None if !error.is_empty() => Err(error.to_string()),
            None => Err("unexpected end of input".to_string()),
        }
    }

    fn expect_any(&mut self, tokens: &[Token], error: &str) -> PResult<()> {
        match self.current() {
            Some(current) if tokens.contains(current) => {
                self.advance();
                Ok(())
            }
            _ => Err(error.to_string()),
        }
    }

    fn expect_space(&mut self, error: &str) -> PResult<()> {
        match self.current() {
            Some(token) if token.is_space() => {
                self.advance();
                Ok(())
            }
            _ => Err(error.to_string()),
        }
    }

    fn skip_space(&mut self) {
        if self.current().is_some_and(Token::is_space) {
            self.advance();
        }
    }

    /// Parse one nested construct, refusing to go deeper than `MAX_NESTING`.
    fn nested<T>(&mut self, parse: impl FnOnce(&mut Self) -> PResult<T>) -> PResult<T> {
        if self.depth >= MAX_NESTING {
            return Err(format!("nesting too deep (more than {} levels)", MAX_NESTING));
        }
        self.depth += 1;
        let result = parse(self);
        self.depth -= 1;
        result
    }

    /// A name is a single text or number token.
    fn optional_name(&mut self) -> Option<String> {
        match self.current() {
            Some(Token::Text(text)) => {
                self.advance();
                Some(text.clone())
            }
            Some(Token::Number(n)) => {
                self.advance();
                Some(n.to_string())
            }
            _ => None,
        }
    }

    fn name(&mut self, error: &str) -> PResult<String> {
        self.optional_name().ok_or_else(|| error.to_string())
    }

    /// `#...#` or `{...}`, optionally preceded by tags.
    fn rule(&mut self) -> PResult<Vec<Node>> {
        let mut nodes = Vec::new();
        self.expect_any(&[HASH, LEFT_CURLY], "expected # or {")?;

        while self.at(&LEFT_SQUARE) {
            nodes.extend(self.nested(Self::tag)?);
        }

        if self.at(&HASH) || self.at(&RIGHT_CURLY) {
            self.advance();
            nodes.push(Node::text(""));
            return Ok(nodes);
        }

        let name = self.optional_name();
        match (name, self.at(&LEFT_ROUND)) {
            (None, true) => {
                let values = self.candidate_list("inline rule candidate")?;
                let modifiers = self.modifiers("inline rule")?;
                nodes.push(Node::Any {
                    selector: selector_for(&values),
                    values,
                    modifiers,
                });
                self.expect_any(
                    &[HASH, RIGHT_CURLY],
                    "expected # or } after inline rule definition",
                )?;
            }
            (Some(name), true) => {
                let values = self.candidate_list("rule candidate")?;
                nodes.push(Node::CreateRule { name, values });
                self.expect_any(
                    &[HASH, RIGHT_CURLY],
                    "expected # or } after new rule definition",
                )?;
            }
            (name, false) => {
                let name = name.unwrap_or_default();
                let modifiers = self.modifiers(&name)?;
                let error = format!("closing # or }} not found for rule '{}'", name);
                nodes.push(Node::Rule { name, modifiers });
                self.expect_any(&[HASH, RIGHT_CURLY], &error)?;
            }
        }
        Ok(nodes)
    }

    /// `(a,b,c)`
    fn candidate_list(&mut self, context: &str) -> PResult<Vec<ValueCandidate>> {
        self.expect(&LEFT_ROUND, "")?;
        let values = self
            .fragment_list(context, &RIGHT_ROUND)?
            .into_iter()
            .map(ValueCandidate::new)
            .collect();
        self.expect(&RIGHT_ROUND, &format!("expected ) after {} list", context))?;
        Ok(values)
    }

    fn modifiers(&mut self, rule: &str) -> PResult<Vec<Modifier>> {
        let mut modifiers = Vec::new();
        while self.at(&DOT) {
            self.advance();
            let name = self.name(&format!("expected modifier name after . in rule '{}'", rule))?;
            let mut parameters = Vec::new();
            if self.at(&LEFT_ROUND) {
                self.advance();
                let list = self.fragment_list("parameter", &RIGHT_ROUND)?;
                // `.m()` is a call with no arguments
                if !(list.len() == 1 && list[0].is_empty()) {
                    parameters = list.into_iter().map(ValueCandidate::new).collect();
                }
                self.expect(&RIGHT_ROUND, "expected ) to close modifier call")?;
            }
            modifiers.push(Modifier { name, parameters });
        }
        Ok(modifiers)
    }

    /// `[name:a,b]`, possibly with nested rules and tags before the name.
    fn tag(&mut self) -> PResult<Vec<Node>> {
        let mut nodes = Vec::new();
        let mut defined_anything = false;
        self.expect(&LEFT_SQUARE, "")?;
        loop {
            match self.current() {
                None => return Err("closing ] not found".to_string()),
                Some(token) if *token == RIGHT_SQUARE => break,
                Some(token) if *token == HASH || *token == LEFT_CURLY => {
                    nodes.extend(self.nested(Self::rule)?);
                }
                Some(token) if *token == LEFT_SQUARE => {
                    nodes.extend(self.nested(Self::tag)?);
                }
                Some(_) => {
                    let name = self.name("expected tag name")?;
                    self.expect(&COLON, &format!("expected : after tag '{}'", name))?;
                    let values = self.fragment_list("tag value", &RIGHT_SQUARE)?;
                    if values[0].is_empty() {
                        return Err("expected a tag value".to_string());
                    }
                    nodes.push(Node::Tag {
                        name,
                        values: values.into_iter().map(ValueCandidate::new).collect(),
                    });
                }
            }
            defined_anything = true;
        }
        if !defined_anything {
            return Err("empty [] not allowed".to_string());
        }
        self.advance();
        Ok(nodes)
    }

    /// `:NUMBER`, or a literal colon.
    fn weight(&mut self) -> Node {
        self.advance();
        match self.current() {
            Some(Token::Number(weight)) => {
                self.advance();
                Node::Weight(*weight)
            }
            _ => Node::text(":"),
        }
    }

    fn condition(&mut self) -> PResult<Condition> {
        let mut lhs = self.fragment_sequence()?;
        strip_trailing_space(&mut lhs);

        let (op, mut rhs) = match self.current() {
            Some(Token::EqualTo) | Some(Token::NotEqualTo) => {
                let op = if self.at(&Token::EqualTo) {
                    ConditionOp::EqualTo
                } else {
                    ConditionOp::NotEqualTo
                };
                let symbol = if op == ConditionOp::EqualTo { "==" } else { "!=" };
                self.advance();
                self.skip_space();
                let rhs = self.fragment_sequence()?;
                if rhs.is_empty() {
                    return Err(format!("expected rule or text after {} in condition", symbol));
                }
                (op, rhs)
            }
            Some(Token::Keyword(keyword @ (Keyword::In | Keyword::NotIn))) => {
                let negated = *keyword == Keyword::NotIn;
                self.advance();
                self.skip_space();
                let rhs = self.fragment_sequence()?;
                // membership only makes sense against a rule or tag
                let op = match (rhs.first(), negated) {
                    (None, _) => return Err("expected rule after in/not in keyword".to_string()),
                    (Some(Node::Text(_)), false) => ConditionOp::EqualTo,
                    (Some(Node::Text(_)), true) => ConditionOp::NotEqualTo,
                    (Some(_), false) => ConditionOp::ValueIn,
                    (Some(_), true) => ConditionOp::ValueNotIn,
                };
                (op, rhs)
            }
            _ => (ConditionOp::NotEqualTo, vec![Node::text("")]),
        };
        strip_trailing_space(&mut rhs);
        Ok(Condition { lhs, rhs, op })
    }

    /// `[if COND then A else B]`
    fn if_block(&mut self) -> PResult<Node> {
        self.advance();
        self.advance();
        self.expect_space("expected space after if")?;
        let condition = self.condition()?;
        self.expect(
            &Token::Keyword(Keyword::Then),
            "expected 'then' after condition",
        )?;
        self.expect_space("expected space after 'then'")?;

        let else_keyword = Token::Keyword(Keyword::Else);
        let mut then_block = self.fragment_sequence_until(&[else_keyword.clone(), RIGHT_SQUARE])?;
        if then_block.is_empty() {
            return Err("'then' must be followed by rule(s)".to_string());
        }

        let mut else_block = None;
        if self.at(&else_keyword) {
            strip_trailing_space(&mut then_block);
            self.advance();
            self.expect_space("expected space after else")?;
            let block = self.fragment_sequence_until(&[RIGHT_SQUARE])?;
            if block.is_empty() {
                return Err("'else' must be followed by rule(s)".to_string());
            }
            else_block = Some(block);
        }

        self.expect(&RIGHT_SQUARE, "closing ] not found for if block")?;
        Ok(Node::IfBlock {
            condition,
            then_block,
            else_block,
        })
    }

    /// `[while COND do A]`
    fn while_block(&mut self) -> PResult<Node> {
        self.advance();
        self.advance();
        self.expect_space("expected space after while")?;
        let condition = self.condition()?;
        self.expect(
            &Token::Keyword(Keyword::Do),
            "expected 'do' after while condition",
        )?;
        self.expect_space("expected space after 'do'")?;
        let do_block = self.fragment_sequence_until(&[RIGHT_SQUARE])?;
        if do_block.is_empty() {
            return Err("'do' must be followed by rule(s)".to_string());
        }
        self.expect(&RIGHT_SQUARE, "closing ] not found for while block")?;
        Ok(Node::WhileBlock {
            condition,
            do_block,
        })
    }

    /// Comma separated fragment sequences, ending before `closer`.
    fn fragment_list(&mut self, context: &str, closer: &Token) -> PResult<Vec<Vec<Node>>> {
        let stoppers = [COMMA, closer.clone()];
        let mut list = vec![self.fragment_sequence_until(&stoppers)?];
        while self.at(&COMMA) {
            self.advance();
            let more = self.fragment_sequence_until(&stoppers)?;
            if more.is_empty() {
                return Err(format!("expected {} after ,", context));
            }
            list.push(more);
        }
        Ok(list)
    }

    /// One construct, or `None` if the current token cannot start one.
    fn fragment(&mut self) -> PResult<Option<Vec<Node>>> {
        let Some(token) = self.current() else {
            return Ok(None);
        };
        let nodes = match token {
            Token::Op('#') | Token::Op('{') => self.nested(Self::rule)?,
            Token::Op('[') => match self.next() {
                None => return Ok(None),
                Some(Token::Keyword(Keyword::If)) => vec![self.nested(Self::if_block)?],
                Some(Token::Keyword(Keyword::While)) => vec![self.nested(Self::while_block)?],
                Some(_) => self.nested(Self::tag)?,
            },
            Token::Op(':') => vec![self.weight()],
            Token::Text(_) | Token::Number(_) => {
                self.advance();
                vec![Node::Text(token.raw())]
            }
            _ => return Ok(None),
        };
        Ok(Some(nodes))
    }

    /// Fragments up to the first token that cannot start one.
    fn fragment_sequence(&mut self) -> PResult<Vec<Node>> {
        let mut nodes = Vec::new();
        while let Some(fragment) = self.fragment()? {
            nodes.extend(fragment);
        }
        Ok(nodes)
    }

    /// Fragments up to one of `stoppers`, taking any other stray token as text.
    fn fragment_sequence_until(&mut self, stoppers: &[Token]) -> PResult<Vec<Node>> {
        let mut nodes = Vec::new();
        while self.current().is_some() {
            nodes.extend(self.fragment_sequence()?);
            match self.current() {
                Some(token) if !stoppers.contains(token) => {
                    nodes.push(Node::Text(token.raw()));
                    self.advance();
                }
                _ => break,
            }
        }
        if nodes.len() > 1 {
            nodes = flatten_text(nodes);
        }
        Ok(nodes)
    }

    fn diagnose(&self, reason: String) -> ParseError {
        let end = self.pos.min(self.tokens.len());
        let consumed: usize = self.tokens[..end]
            .iter()
            .map(|token| token.raw().chars().count())
            .sum();
        let mut marked = String::new();
        for (i, c) in self.tokens.iter().map(Token::raw).collect::<String>().chars().enumerate() {
            if i == consumed {
                marked.push('❌');
            }
            marked.push(c);
        }
        if marked.chars().count() == consumed {
            marked.push('❌');
        }
        let rendered = [
            reason.clone(),
            format!("    {}", marked),
            format!("    {}^", ".".repeat(consumed)),
            String::new(),
        ]
        .join("\n");
        ParseError { reason, rendered }
    }
}

/// Merge runs of adjacent text nodes.
fn flatten_text(nodes: Vec<Node>) -> Vec<Node> {
    let mut out: Vec<Node> = Vec::with_capacity(nodes.len());
    for node in nodes {
        match (out.last_mut(), node) {
            (Some(Node::Text(previous)), Node::Text(text)) => previous.push_str(&text),
            (_, node) => out.push(node),
        }
    }
    out
}

/// Drop a lone trailing `" "` node, or one trailing space from the last text.
fn strip_trailing_space(nodes: &mut Vec<Node>) {
    if let Some(Node::Text(text)) = nodes.last_mut() {
        if text == " " {
            nodes.pop();
        } else if text.ends_with(' ') {
            text.pop();
        }
    }
}
