/*!
## Rust Machine Module

This Rust module is the TempleCode interpreter: the value model, variable
memory, program loader, turtle and the fetch-execute loop that dispatches
BASIC, PILOT, Logo and extension statements.

*/

mod basic;
mod block;
mod bridge;
mod config;
mod dispatch;
mod eval;
mod file;
mod function;
mod host;
mod listing;
mod logo;
mod modern;
mod operation;
mod pilot;
mod profile;
mod program;
mod runtime;
mod stack;
mod turtle;
mod val;
mod var;

pub use block::{Block, BlockTable};
pub use bridge::{from_json, to_json};
pub use config::Config;
pub use file::{FileMode, FileTable};
pub use function::Function;
pub use host::{
    BufferOutput, Canvas, ChannelInput, Handle, Input, InputHandle, Output, Point,
    RecordingCanvas, ScriptedInput, Shape, StdInput, StdOutput, StopHandle,
};
pub use listing::Listing;
pub use operation::Operation;
pub use profile::{LineStats, Profiler};
pub use program::{LogoProc, Program, Routine, RoutineKind};
pub use runtime::{ErrorRecord, RunResult, Runtime, Signal};
pub use stack::Stack;
pub use turtle::{color_name, Boundary, Turtle};
pub use val::{repeat_text, Val, MAX_ELEMENTS, MAX_STRING};
pub use var::Var;
