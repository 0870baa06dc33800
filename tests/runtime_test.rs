mod common;
use common::*;
use templecode::mach::{BufferOutput, ChannelInput, Runtime, Val};

fn buffered() -> (Runtime, BufferOutput) {
    let out = BufferOutput::new();
    (Runtime::default().with_output(out.clone()), out)
}

#[test]
fn test_immediate_lines_keep_state() {
    let (mut rt, out) = buffered();
    rt.execute_line("X = 5").unwrap();
    rt.execute_line("PRINT X * 2").unwrap();
    assert_eq!(out.contents(), "10\n");
    assert_eq!(rt.execute_line("FROB").unwrap_err().code(), 33);
}

#[test]
fn test_instances_are_independent() {
    let (mut a, _) = buffered();
    let (mut b, _) = buffered();
    a.run("X = 1\nFORWARD 20");
    b.run("X = 2");
    assert_eq!(a.var("X"), Some(Val::Integer(1)));
    assert_eq!(b.var("X"), Some(Val::Integer(2)));
    assert_eq!(b.turtle().y(), 0.0);
}

#[test]
fn test_run_resets_variables() {
    let (mut rt, _) = buffered();
    rt.run("X = 1");
    rt.run("Y = 2");
    assert_eq!(rt.var("X"), None);
    rt.reset();
    assert_eq!(rt.var("Y"), None);
    assert!(rt.program().is_empty());
}

#[test]
fn test_step() {
    let (mut rt, out) = buffered();
    rt.start("PRINT 1\nPRINT 2");
    assert!(rt.step());
    assert_eq!(out.contents(), "1\n");
    assert_eq!(rt.pc(), 1);
    assert!(!rt.step());
    assert!(!rt.step());
    assert_eq!(out.contents(), "1\n2\nProgram finished - nothing to step.\n");
}

#[test]
fn test_breakpoint_and_watch() {
    let (mut rt, out) = buffered();
    rt.set_debug_mode(true);
    assert!(rt.toggle_breakpoint(2));
    rt.add_watch("X");
    let paused = rt.run("X = 1\nX = 2\nPRINT X");
    assert!(!paused.completed);
    assert_eq!(out.take(), "[1] X = 1\nBREAK IN 2\n  X = 1\n");
    let finished = rt.resume();
    assert!(finished.completed);
    assert_eq!(out.contents(), "[2] X = 2\n[3] PRINT X\n2\n");
    assert!(rt.remove_watch("X"));
    assert_eq!(rt.watch_report(), "  (no watches)\n");
    assert!(!rt.toggle_breakpoint(2));
}

#[test]
fn test_debug_mode_keeps_going() {
    let (mut rt, out) = buffered();
    rt.set_debug_mode(true);
    let result = rt.run("X = 1 / 0\nPRINT \"on\"");
    assert!(result.completed);
    assert_eq!(codes(&result), vec![11]);
    assert!(out.contents().ends_with("on\n"));
}

#[test]
fn test_profiler() {
    let (mut rt, out) = buffered();
    rt.enable_profiler(true);
    rt.run("FOR I = 1 TO 3\nX = I\nNEXT");
    assert_eq!(rt.profiler().stats(1).map(|s| s.hits), Some(1));
    assert_eq!(rt.profiler().stats(2).map(|s| s.hits), Some(3));
    assert!(out.contents().contains("PROFILER REPORT"));
}

#[test]
fn test_channel_input() {
    let (input, handle) = ChannelInput::pair();
    let out = BufferOutput::new();
    let mut rt = Runtime::default()
        .with_output(out.clone())
        .with_input(input);
    let worker = std::thread::spawn(move || rt.run("INPUT \"Number\"; N\nPRINT N * 2"));
    assert_eq!(handle.prompts().recv().unwrap(), "Number ");
    handle.reply("21");
    let result = worker.join().unwrap();
    assert!(result.completed);
    assert_eq!(out.contents(), "42\n");
}

#[test]
fn test_cancel_between_runs_keeps_next_answer() {
    let (input, handle) = ChannelInput::pair();
    let out = BufferOutput::new();
    let mut rt = Runtime::default()
        .with_output(out.clone())
        .with_input(input);
    handle.cancel();
    let worker = std::thread::spawn(move || rt.run("INPUT X\nPRINT \"got:\" + X"));
    handle.prompts().recv().unwrap();
    handle.reply("hello");
    let result = worker.join().unwrap();
    assert!(result.completed);
    assert_eq!(out.contents(), "got:hello\n");
}

#[test]
fn test_stop_while_waiting_for_input() {
    let (input, handle) = ChannelInput::pair();
    let mut rt = Runtime::default()
        .with_output(BufferOutput::new())
        .with_input(input);
    let stop = rt.stop_handle();
    let worker = std::thread::spawn(move || rt.run("INPUT N\nPRINT \"no\""));
    handle.prompts().recv().unwrap();
    stop.stop();
    handle.cancel();
    let result = worker.join().unwrap();
    assert_eq!(codes(&result), vec![39]);
    assert!(!result.completed);
}

#[test]
fn test_error_history_is_kept() {
    let (mut rt, _) = buffered();
    rt.run("FROB\nPRINT 1");
    assert_eq!(rt.error_history().len(), 1);
    assert_eq!(rt.error_history()[0].line(), Some(1));
    assert!(rt.error_history()[0].message().starts_with("UNKNOWN COMMAND"));
}
