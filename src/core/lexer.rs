/// Lexical analysis: turns template text into a flat token stream.
///
/// Lexing is total: anything that is not an operator, keyword or number
/// becomes `Token::Text`. Keywords are context-sensitive and are only
/// recognised when preceded by whitespace (or `[` for `if`/`while`) and
/// followed by whitespace; otherwise the word stays literal text.

use std::fmt;

/// Characters that always lex as single-character operators.
const RESERVED: &[char] = &['[', ']', ':', '#', ',', '.', '(', ')', '{', '}'];

/// Control-flow keywords.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Keyword {
    If,
    Then,
    Else,
    While,
    Do,
    In,
    NotIn,
}

impl Keyword {
    /// Match order matters: `not in` must be tried before `in`.
    const ALL: [Keyword; 7] = [
        Keyword::NotIn,
        Keyword::If,
        Keyword::Then,
        Keyword::Else,
        Keyword::While,
        Keyword::Do,
        Keyword::In,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::If => "if",
            Self::Then => "then",
            Self::Else => "else",
            Self::While => "while",
            Self::Do => "do",
            Self::In => "in",
            Self::NotIn => "not in",
        }
    }

    /// Only block openers may directly follow a `[`.
    fn may_follow_bracket(&self) -> bool {
        matches!(self, Self::If | Self::While)
    }
}

/// A lexical token.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Token {
    /// A run of literal text, with escapes already resolved.
    Text(String),
    /// One of `[ ] : # , . ( ) { }`.
    Op(char),
    /// `==`
    EqualTo,
    /// `!=`
    NotEqualTo,
    Keyword(Keyword),
    Number(u32),
}

impl Token {
    /// The source text this token stands for. Used when a token has to be
    /// treated as plain text and when rendering parse diagnostics.
    pub fn raw(&self) -> String {
        match self {
            Self::Text(text) => text.clone(),
            Self::Op(c) => c.to_string(),
            Self::EqualTo => "==".to_string(),
            Self::NotEqualTo => "!=".to_string(),
            Self::Keyword(k) => k.as_str().to_string(),
            Self::Number(n) => n.to_string(),
        }
    }

    /// True for a text token holding exactly one whitespace character.
    pub fn is_space(&self) -> bool {
        match self {
            Self::Text(text) => {
                let mut chars = text.chars();
                matches!((chars.next(), chars.next()), (Some(c), None) if c.is_whitespace())
            }
            _ => false,
        }
    }
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Text(text) => write!(f, "'{}'", text),
            Self::Op(c) => write!(f, "{}", c),
            Self::EqualTo => write!(f, "=="),
            Self::NotEqualTo => write!(f, "!="),
            Self::Keyword(k) => write!(f, "keyword '{}'", k.as_str()),
            Self::Number(n) => write!(f, "number {}", n),
        }
    }
}

/// Split template text into tokens.
pub fn tokenize(input: &str) -> Vec<Token> {
    Lexer::new(input).run()
}

struct Lexer {
    chars: Vec<char>,
    pos: usize,
    tokens: Vec<Token>,
}

impl Lexer {
    fn new(input: &str) -> Self {
        Self {
            chars: input.chars().collect(),
            pos: 0,
            tokens: Vec::new(),
        }
    }

    fn run(mut self) -> Vec<Token> {
        while self.pos < self.chars.len() {
            self.next_token();
        }
        self.tokens
    }

    fn at(&self, i: usize) -> Option<char> {
        self.chars.get(i).copied()
    }

    fn two_char_op_at(&self, i: usize) -> Option<Token> {
        match (self.at(i), self.at(i + 1)) {
            (Some('='), Some('=')) => Some(Token::EqualTo),
            (Some('!'), Some('=')) => Some(Token::NotEqualTo),
            _ => None,
        }
    }

    /// Is there a keyword starting at `i`, given what precedes and follows it?
    fn keyword_at(&self, i: usize) -> Option<Keyword> {
        let prev = i.checked_sub(1).and_then(|p| self.at(p));
        Keyword::ALL.into_iter().find(|keyword| {
            let word: Vec<char> = keyword.as_str().chars().collect();
            let end = i + word.len();
            if end > self.chars.len() || self.chars[i..end] != word[..] {
                return false;
            }
            if !self.at(end).is_some_and(char::is_whitespace) {
                return false;
            }
            match prev {
                Some(c) if c.is_whitespace() => true,
                Some('[') => {
                    keyword.may_follow_bracket()
                        && self.tokens.last() == Some(&Token::Op('['))
                }
                _ => false,
            }
        })
    }

    /// Emit the single whitespace character following a keyword or
    /// comparison operator as its own token, so the parser can require it.
    fn split_following_space(&mut self) {
        if let Some(c) = self.at(self.pos) {
            if c.is_whitespace() {
                self.tokens.push(Token::Text(c.to_string()));
                self.pos += 1;
            }
        }
    }

    fn next_token(&mut self) {
        if let Some(op) = self.two_char_op_at(self.pos) {
            self.tokens.push(op);
            self.pos += 2;
            self.split_following_space();
            return;
        }

        let Some(c) = self.at(self.pos) else { return };

        if RESERVED.contains(&c) {
            self.tokens.push(Token::Op(c));
            self.pos += 1;
            return;
        }

        if let Some(keyword) = self.keyword_at(self.pos) {
            self.tokens.push(Token::Keyword(keyword));
            self.pos += keyword.as_str().chars().count();
            self.split_following_space();
            return;
        }

        if c.is_ascii_digit() {
            if let Some((number, len)) = self.number_at(self.pos) {
                self.tokens.push(Token::Number(number));
                self.pos += len;
                return;
            }
        }

        self.text_run();
    }

    /// A digit run that round-trips through `u32` without losing characters.
    fn number_at(&self, start: usize) -> Option<(u32, usize)> {
        let len = self.chars[start..]
            .iter()
            .take_while(|c| c.is_ascii_digit())
            .count();
        let digits: String = self.chars[start..start + len].iter().collect();
        if len > 1 && digits.starts_with('0') {
            return None;
        }
        digits.parse().ok().map(|n| (n, len))
    }

    fn text_run(&mut self) {
        let start = self.pos;
        let mut text = String::new();

        while let Some(c) = self.at(self.pos) {
            if RESERVED.contains(&c) {
                break;
            }
            if self.pos > start
                && (self.two_char_op_at(self.pos).is_some() || self.keyword_at(self.pos).is_some())
            {
                break;
            }
            if c == '\\' {
                // `\X` takes X literally; a trailing backslash is dropped
                if let Some(escaped) = self.at(self.pos + 1) {
                    text.push(escaped);
                }
                self.pos += 2;
                continue;
            }
            text.push(c);
            self.pos += 1;
        }

        self.pos = self.pos.min(self.chars.len());
        if !text.is_empty() {
            self.tokens.push(Token::Text(text));
        }
    }
}
