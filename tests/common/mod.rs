#![allow(dead_code)]
use templecode::mach::{BufferOutput, RecordingCanvas, RunResult, Runtime, ScriptedInput};

pub fn exec(source: &str) -> String {
    exec_with_input(source, &[])
}

pub fn exec_with_input(source: &str, answers: &[&str]) -> String {
    let (out, _, _) = exec_runtime(source, answers);
    out
}

/// Output, result and the runtime for inspecting state after the run.
pub fn exec_runtime(source: &str, answers: &[&str]) -> (String, RunResult, Runtime) {
    let out = BufferOutput::new();
    let mut runtime = Runtime::default()
        .with_output(out.clone())
        .with_input(ScriptedInput::new(answers.iter().copied()));
    let result = runtime.run(source);
    (out.contents(), result, runtime)
}

/// Runs with a recording canvas so drawn lines can be counted.
pub fn exec_canvas(source: &str) -> (String, Runtime, RecordingCanvas) {
    let out = BufferOutput::new();
    let canvas = RecordingCanvas::default();
    let mut runtime = Runtime::default()
        .with_output(out.clone())
        .with_canvas(canvas.clone());
    runtime.run(source);
    (out.contents(), runtime, canvas)
}

/// Codes of every recorded fault, oldest first.
pub fn codes(result: &RunResult) -> Vec<u16> {
    result.error_history.iter().map(|r| r.error.code()).collect()
}
