//! Complete sample grammars exercising the library end to end.

mod arithmetic;
mod json;

#[cfg(test)]
mod __tests__;

pub use arithmetic::{arithmetic_parser, as_uint};
pub use json::json_parser;
