mod common;
use common::*;
use templecode::mach::{BufferOutput, Config, Runtime};

#[test]
fn test_endless_goto_trips_guard() {
    let (out, result, _) = exec_runtime("label:\nGOTO label", &[]);
    assert_eq!(codes(&result), vec![36]);
    assert!(!result.completed);
    assert!(out.starts_with("?ITERATION LIMIT IN"));
}

#[test]
fn test_guard_follows_config() {
    let out = BufferOutput::new();
    let config = Config {
        max_iterations: 50,
        ..Config::default()
    };
    let mut rt = Runtime::new(config).with_output(out.clone());
    let result = rt.run("N = 0\nloop:\nN = N + 1\nGOTO loop");
    assert_eq!(codes(&result), vec![36]);
    assert!(rt.var("N").unwrap().to_i64().unwrap() < 50);
}

#[test]
fn test_runtime_fault_ends_run() {
    let (out, result, _) = exec_runtime("PRINT 1\nX = 1 / 0\nPRINT 2", &[]);
    assert_eq!(out, "1\n?DIVISION BY ZERO IN 2\n");
    assert_eq!(codes(&result), vec![11]);
    assert_eq!(result.error_history[0].line(), Some(2));
    assert!(!result.completed);
}

#[test]
fn test_dispatch_faults_continue() {
    let source = "\
FROB
NEXT
RETURN
PRINT \"ok\"";
    let (out, result, _) = exec_runtime(source, &[]);
    assert_eq!(codes(&result), vec![33, 1, 3]);
    assert!(out.starts_with("?UNKNOWN COMMAND IN 1; FROB\n"));
    assert!(out.ends_with("ok\n"));
    assert!(result.completed);
}

#[test]
fn test_continue_on_error() {
    let out = BufferOutput::new();
    let config = Config {
        continue_on_error: true,
        ..Config::default()
    };
    let mut rt = Runtime::new(config).with_output(out.clone());
    let result = rt.run("X = 1 / 0\nGOTO nowhere\nPRINT \"on\"");
    assert_eq!(codes(&result), vec![11, 8]);
    assert!(out.contents().ends_with("on\n"));
    assert!(result.completed);
}

#[test]
fn test_missing_end_is_reported_at_load() {
    let (out, result, _) = exec_runtime("SUB NEVER\nPRINT 1", &[]);
    assert_eq!(codes(&result).first(), Some(&34));
    assert!(out.ends_with("1\n"));
}

#[test]
fn test_uncaught_throw() {
    let (out, result, _) = exec_runtime("THROW \"boom\"\nPRINT \"no\"", &[]);
    assert_eq!(out, "?UNHANDLED ERROR IN 1; boom\n");
    assert_eq!(codes(&result), vec![37]);
}

#[test]
fn test_type_mismatch() {
    let (_, result, _) = exec_runtime("X = \"abc\" - 1", &[]);
    assert_eq!(codes(&result), vec![13]);
}

#[test]
fn test_unknown_command_inside_try_continues() {
    let source = "\
TRY
  FROB
  PRINT \"after\"
CATCH E
  PRINT \"caught\"
END TRY";
    let (out, result, _) = exec_runtime(source, &[]);
    assert_eq!(codes(&result), vec![33]);
    assert!(out.ends_with("after\n"));
    assert!(!out.contains("caught"));
    assert!(result.completed);
}
