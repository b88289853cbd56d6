pub mod definition;
pub mod options;
