/*!
# Rust Language Module

This Rust module provides lexical analysis and parsing of TempleCode
expressions, plus the line-level helpers shared by every statement family:
line tags, keyword splitting, the block checker and the formatter.

*/

#[macro_use]
mod error;
mod format;
mod lex;
mod line;
mod parse;
mod split;
mod token;

pub use error::Error;
pub use error::ErrorCode;
pub use error::Fault;
pub use format::{check_blocks, classify, format_source, is_block_if, BlockKind, Marker};
pub use lex::lex;
pub use line::Line;
pub use parse::parse;
pub use parse::parse_list;
pub use split::*;
pub use token::{Operator, Token};

pub mod ast;

/// One-based line index within a loaded program, `None` for direct input.
pub type LineNumber = Option<usize>;
pub type Column = std::ops::Range<usize>;
