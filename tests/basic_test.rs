mod common;
use common::*;
use templecode::mach::Val;

#[test]
fn test_for_loop_sum() {
    let source = "\
S = 0
FOR I = 1 TO 5
  S = S + I
NEXT I
PRINT S";
    assert_eq!(exec(source), "15\n");
}

#[test]
fn test_for_loop_negative_step() {
    let source = "\
FOR I = 10 TO 1 STEP -3
  PRINT I
NEXT";
    assert_eq!(exec(source), "10\n7\n4\n1\n");
}

#[test]
fn test_for_loop_can_run_zero_times() {
    let source = "\
FOR I = 5 TO 1
  PRINT I
NEXT I
PRINT \"done\"";
    assert_eq!(exec(source), "done\n");
}

#[test]
fn test_nested_for_with_exit() {
    let source = "\
FOR I = 1 TO 3
  FOR J = 1 TO 3
    IF J = 2 THEN EXIT FOR
    PRINT I; J
  NEXT J
NEXT I";
    assert_eq!(exec(source), "11\n21\n31\n");
}

#[test]
fn test_recursive_function() {
    let source = "\
FUNCTION F(N)
  IF N<=1 THEN RETURN 1
  RETURN N*F(N-1)
END FUNCTION
PRINT F(5)";
    assert_eq!(exec(source), "120\n");
}

#[test]
fn test_sub_parameters_are_restored() {
    let source = "\
N = 99
SUB SHOW(N)
  PRINT \"in \"; N
END SUB
CALL SHOW(1)
SHOW 2
PRINT N";
    assert_eq!(exec(source), "in 1\nin 2\n99\n");
}

#[test]
fn test_select_case_runs_one_branch() {
    let source = "\
X = 2
SELECT CASE X
CASE 1
  PRINT \"one\"
CASE 2
  PRINT \"two\"
CASE ELSE
  PRINT \"other\"
END SELECT";
    assert_eq!(exec(source), "two\n");
}

#[test]
fn test_select_case_ranges() {
    let source = "\
SELECT CASE 15
CASE 1 TO 9
  PRINT \"small\"
CASE IS > 10
  PRINT \"big\"
CASE ELSE
  PRINT \"other\"
END SELECT";
    assert_eq!(exec(source), "big\n");
}

#[test]
fn test_block_if_chain() {
    let source = "\
X = 5
IF X > 10 THEN
  PRINT \"big\"
ELSEIF X > 3 THEN
  PRINT \"medium\"
ELSE
  PRINT \"small\"
END IF
IF X = 5 THEN PRINT \"five\" ELSE PRINT \"not five\"";
    assert_eq!(exec(source), "medium\nfive\n");
}

#[test]
fn test_while_and_do_loops() {
    let source = "\
N = 0
WHILE N < 3
  N = N + 1
WEND
PRINT N
DO
  N = N - 1
LOOP UNTIL N = 0
PRINT N
DO WHILE N < 2
  N = N + 1
  IF N = 1 THEN BREAK
LOOP
PRINT N";
    assert_eq!(exec(source), "3\n0\n1\n");
}

#[test]
fn test_gosub_and_labels() {
    let source = "\
GOSUB greet
GOSUB 100
END
greet:
PRINT \"hello\"
RETURN
100 PRINT \"numbered\"
110 RETURN";
    assert_eq!(exec(source), "hello\nnumbered\n");
}

#[test]
fn test_on_goto() {
    let source = "\
K = 2
ON K GOTO first, second
first:
PRINT \"first\"
END
second:
PRINT \"second\"";
    assert_eq!(exec(source), "second\n");
}

#[test]
fn test_data_read_restore() {
    let source = "\
DATA 1, 2, \"three\"
READ A, B, C
PRINT A + B; C
RESTORE
READ D
PRINT D";
    assert_eq!(exec(source), "3three\n1\n");
}

#[test]
fn test_out_of_data() {
    let (_, result, _) = exec_runtime("DATA 1\nREAD A, B", &[]);
    assert_eq!(codes(&result), vec![4]);
    assert!(!result.completed);
}

#[test]
fn test_dim_array() {
    let source = "\
DIM A(3)
FOR I = 0 TO 3
  A(I) = I * I
NEXT
PRINT A(3)";
    assert_eq!(exec(source), "9\n");
    let (_, result, _) = exec_runtime("DIM A(3)\nPRINT A(4)", &[]);
    assert_eq!(codes(&result), vec![9]);
}

#[test]
fn test_input() {
    let source = "\
INPUT \"Your name\"; N$
INPUT AGE
PRINT N$; \" is \"; AGE + 1";
    assert_eq!(exec_with_input(source, &["Ada", "36"]), "Ada is 37\n");
}

#[test]
fn test_swap_incr_decr() {
    let (_, result, rt) = exec_runtime("A = 1\nB = 2\nSWAP A, B\nINCR A\nDECR B, 5", &[]);
    assert!(result.completed);
    assert_eq!(rt.var("A"), Some(Val::Integer(3)));
    assert_eq!(rt.var("B"), Some(Val::Integer(-4)));
}

#[test]
fn test_string_functions() {
    let source = "\
S$ = \"Hello World\"
PRINT LEFT$(S$, 5); \"|\"; RIGHT$(S$, 5); \"|\"; MID$(S$, 7, 3)
PRINT LEN(S$); \" \"; UCASE$(S$); \" \"; INSTR(S$, \"World\")
PRINT \"ab\" * 3";
    assert_eq!(exec(source), "Hello|World|Wor\n11 HELLO WORLD 7\nababab\n");
}

#[test]
fn test_print_separators() {
    assert_eq!(exec("PRINT \"a\"; \"b\";\nPRINT \"c\""), "abc\n");
    assert_eq!(exec("PRINT 1, 2"), "1\t2\n");
}

#[test]
fn test_randomize_is_repeatable() {
    let source = "RANDOMIZE 42\nPRINT RND";
    assert_eq!(exec(source), exec(source));
}

#[test]
fn test_stop_ends_run() {
    let (out, result, _) = exec_runtime("PRINT 1\nSTOP\nPRINT 2", &[]);
    assert_eq!(out, "1\n");
    assert!(result.completed);
}

#[test]
fn test_for_rejects_zero_step() {
    let (out, result, _) = exec_runtime("FOR I = 1 TO 5 STEP 0\nPRINT I\nNEXT", &[]);
    assert_eq!(codes(&result), vec![5]);
    assert!(out.starts_with("?ILLEGAL FUNCTION CALL IN 1"));
}

#[test]
fn test_on_goto_out_of_range_falls_through() {
    let source = "\
ON K GOTO first, second
PRINT \"fell through\"
END
first:
PRINT \"first\"
second:
PRINT \"second\"";
    assert_eq!(exec(&format!("K = 5\n{}", source)), "fell through\n");
    assert_eq!(exec(&format!("K = 0\n{}", source)), "fell through\n");
}

#[test]
fn test_result_after_call() {
    let source = "\
FUNCTION DOUBLE(N)
  RETURN N * 2
END FUNCTION
CALL DOUBLE(21)
PRINT RESULT";
    assert_eq!(exec(source), "42\n");
}

#[test]
fn test_deep_recursion_is_allowed() {
    let source = "\
FUNCTION F(N)
  IF N <= 0 THEN RETURN 0
  RETURN 1 + F(N - 1)
END FUNCTION
PRINT F(200)";
    assert_eq!(exec(source), "200\n");
}

#[test]
fn test_unbounded_recursion_is_a_fault() {
    let source = "\
FUNCTION F(N)
  RETURN F(N)
END FUNCTION
PRINT F(1)";
    let (_, result, _) = exec_runtime(source, &[]);
    assert_eq!(codes(&result), vec![7]);
    assert!(!result.completed);
}

#[test]
fn test_huge_sizes_are_faults() {
    let (_, result, _) = exec_runtime("DIM A(100000000000)", &[]);
    assert_eq!(codes(&result), vec![7]);
    let source = "\
TRY
  X$ = REPEAT$(\"ab\", 100000000000000000)
CATCH E
  PRINT \"caught\"
END TRY
TRY
  Y$ = \"ab\" * 100000000000000000
CATCH E
  PRINT \"caught\"
END TRY
PRINT REPEAT$(\"ab\", 3)";
    assert_eq!(exec(source), "caught\ncaught\nababab\n");
}
