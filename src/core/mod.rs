pub mod analysis;
pub mod context;
pub mod engine;
pub mod eval;
pub mod grammar;
pub mod lexer;
pub mod loader;
pub mod logging;
pub mod modifiers;
pub mod node;
pub mod parser;
pub mod selector;
pub mod tags;
