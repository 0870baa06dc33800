mod common;
use common::*;
use templecode::mach::{BufferOutput, Runtime, ScriptedInput};

#[test]
fn test_accept_match_and_branch() {
    let source = "\
T:What is your name?
A:NAME
T:Hello $NAME!
T:Do you like turtles?
A:
M:yes,sure
Y:T:Great
N:T:Too bad";
    assert_eq!(
        exec_with_input(source, &["Ada", "Sure thing"]),
        "What is your name?\nHello Ada!\nDo you like turtles?\nGreat\n"
    );
    assert!(exec_with_input(source, &["Ada", "nope"]).ends_with("Too bad\n"));
}

#[test]
fn test_accept_prompt_text() {
    let input = ScriptedInput::new(["blue"]);
    let out = BufferOutput::new();
    let mut rt = Runtime::default()
        .with_output(out.clone())
        .with_input(input.clone());
    rt.run("C:N = 2\nA:Pick $N colors\nT:You said %answer%");
    assert_eq!(input.prompts(), vec!["Pick 2 colors"]);
    assert_eq!(out.contents(), "You said blue\n");
}

#[test]
fn test_jump_loop() {
    let source = "\
C:N = 0
*top
C:N = N + 1
T:Pass $N
IF N < 3 THEN J:*top
T:Done";
    assert_eq!(exec(source), "Pass 1\nPass 2\nPass 3\nDone\n");
}

#[test]
fn test_call_and_end() {
    let source = "\
C:*greet
T:back
E:
*greet
T:in greet
E:
T:never";
    assert_eq!(exec(source), "in greet\nback\n");
}

#[test]
fn test_string_operations() {
    let source = "\
C:W = \"hello\"
S:UPPER W
T:$W
S:LEN W
T:$W_LEN
R:remarks are ignored
U:S = 7
T:Score *S* of 10";
    assert_eq!(exec(source), "HELLO\n5\nScore 7 of 10\n");
}

#[test]
fn test_compute_needs_assignment() {
    let (_, result, _) = exec_runtime("C:N + 1", &[]);
    assert_eq!(codes(&result), vec![2]);
}

#[test]
fn test_unknown_pilot_command_continues() {
    let (out, result, _) = exec_runtime("Q:what\nT:after", &[]);
    assert_eq!(codes(&result), vec![33]);
    assert!(out.ends_with("after\n"));
    assert!(result.completed);
}
