//! Narrative Grammar: grammar-driven text expansion for games.
//!
//! Templates like `#greeting#, [hero:#name#]#hero#!` are tokenized, parsed
//! into a node tree and expanded against a table of named rules. Beyond
//! plain rule substitution the template language has tags (variables),
//! inline and runtime rules, weighted choices, modifiers with arguments,
//! `if`/`else` conditionals and `while` loops. Expansion runs on an explicit
//! stack, so deep or runaway grammars end in an error rather than a crash.
//!
//! ```
//! use narrative_grammar::Engine;
//!
//! let mut engine = Engine::builder()
//!     .seed(7)
//!     .rule("animal", "fox")
//!     .rule("origin", "[hero:#animal#]The #hero# ran. The #hero# hid.")
//!     .build()
//!     .unwrap();
//! assert_eq!(engine.expand("#origin#"), "The fox ran. The fox hid.");
//! ```

pub mod core;
pub mod schema;

pub use crate::core::analysis::Finding;
pub use crate::core::engine::{Engine, EngineBuilder, EngineError};
pub use crate::core::eval::EvalError;
pub use crate::core::grammar::{GrammarError, GrammarSet};
pub use crate::core::parser::ParseError;
pub use crate::core::selector::{CandidateSelector, PickFirst, Selector, UniformSelector, WeightedSelector};
pub use crate::schema::definition::{CandidateProvider, RuleDefinition, WeightedCandidates};
pub use crate::schema::options::{EngineOptions, LogLevel, TagStoragePolicy};
