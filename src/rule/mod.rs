//! Rule parsing, evaluation and combination
//!
//! This module handles parsing rule strings like
//! `age > 30 AND department == 'Sales'` and evaluating them against a
//! [`Record`](crate::record::Record).

mod ast;
pub mod cache;
mod combiner;
mod evaluator;
pub mod parser;


pub use ast::*;
pub use cache::*;
pub use combiner::*;
pub use evaluator::*;
pub use parser::*;
