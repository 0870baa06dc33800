//! # TempleCode
//!
//! BASIC, PILOT and Logo turtle graphics in one line-oriented language,
//! with lists, dicts, structured control flow and a few modern extensions.
//!
//! Install with `cargo install templecode`, then run a program with
//! `templecode run hello.tc` or start the interactive prompt with
//! `templecode repl`. If you get the following, you have achieved success.
//! ```text
//! TempleCode 0.3.0
//! tc> █
//! ```
//!
//! Embedding the interpreter takes a [`mach::Runtime`] and a source string:
//! ```
//! use templecode::mach::{BufferOutput, Runtime};
//!
//! let out = BufferOutput::new();
//! let mut runtime = Runtime::default().with_output(out.clone());
//! let result = runtime.run("T:Hello\nPRINT 6 * 7\nFORWARD 10");
//! assert!(result.error_history.is_empty());
//! assert_eq!(out.contents(), "Hello\n42\n");
//! assert_eq!(runtime.turtle().y(), 10.0);
//! ```

#[path = "doc/introduction.rs"]
#[allow(non_snake_case)]
pub mod _Introduction;

#[path = "doc/appendix_a.rs"]
#[allow(non_snake_case)]
pub mod ___Appendix_A;

pub mod lang;
pub mod mach;
pub mod term;
