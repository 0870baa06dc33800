mod common;
use common::*;
use templecode::mach::Val;

#[test]
fn test_push_and_pop() {
    let (_, result, rt) = exec_runtime("LIST A = 1,2,3\nPUSH A, 4\nPOP A, V", &[]);
    assert!(result.error_history.is_empty());
    assert_eq!(rt.var("A").unwrap().to_string(), "[1, 2, 3]");
    assert_eq!(rt.var("V"), Some(Val::Integer(4)));
    assert_eq!(rt.var("A_LENGTH"), Some(Val::Integer(3)));
}

#[test]
fn test_list_indexing() {
    let source = "\
LIST L = \"a\", \"b\"
L[2] = \"c\"
PRINT L[0]; L[-1]; L_LENGTH
SPLIT \"x,y,z\", \",\" INTO P
JOIN P, \"-\" INTO J
PRINT J";
    assert_eq!(exec(source), "ac3\nx-y-z\n");
}

#[test]
fn test_throw_is_caught() {
    let source = "\
TRY
  THROW \"x\"
  PRINT \"unreached\"
CATCH E
  PRINT E
END TRY
PRINT \"after\"";
    assert_eq!(exec(source), "x\nafter\n");
}

#[test]
fn test_catch_fault_from_function() {
    let source = "\
FUNCTION BAD(X)
  RETURN X / 0
END FUNCTION
TRY
  Y = BAD(1)
CATCH E
  PRINT \"caught \"; E
END TRY";
    assert_eq!(exec(source), "caught DIVISION BY ZERO\n");
}

#[test]
fn test_try_without_catch() {
    let source = "\
TRY
  THROW \"x\"
END TRY
PRINT ERROR$";
    assert_eq!(exec(source), "x\n");
}

#[test]
fn test_assert() {
    let source = "\
TRY
  ASSERT 1 + 1 = 3, \"bad sum\"
CATCH E
  PRINT E
END TRY
ASSERT 2 > 1";
    assert_eq!(exec(source), "bad sum\n");
    let (out, result, _) = exec_runtime("ASSERT 0", &[]);
    assert_eq!(codes(&result), vec![38]);
    assert_eq!(out, "?ASSERTION FAILED IN 1; Assertion failed\n");
}

#[test]
fn test_json_parse_field() {
    assert_eq!(exec("JSON PARSE '{\"a\":1}' INTO D\nPRINT D.a"), "1\n");
}

#[test]
fn test_json_round_trip() {
    let source = "\
DICT P = name: \"Ada\", level: 3
JSON STRINGIFY P INTO S
JSON PARSE S INTO Q
PRINT S
PRINT Q.name; Q.level";
    assert_eq!(exec(source), "{\"name\":\"Ada\",\"level\":3}\nAda3\n");
}

#[test]
fn test_json_nested_get() {
    let source = "\
JSON PARSE '{\"user\": {\"tags\": [\"x\", \"y\"]}}' INTO D
JSON GET D.user.tags.1 INTO T
JSON GET D.user.nothing INTO N
PRINT T; \"|\"; N; \"|\"";
    assert_eq!(exec(source), "y||\n");
}

#[test]
fn test_regex() {
    let source = "\
REGEX MATCH \"[0-9]+\" IN \"abc 123 def 45\" INTO M
PRINT M; \" at \"; M_POS
REGEX FIND \"[0-9]+\" IN \"abc 123 def 45\" INTO ALL
PRINT ALL
REGEX REPLACE \"(\\w+)@(\\w+)\" WITH \"\\2 at \\1\" IN \"ada@home\" INTO R
PRINT R";
    assert_eq!(exec(source), "123 at 4\n[\"123\", \"45\"]\nhome at ada\n");
}

#[test]
fn test_bad_pattern() {
    let (_, result, _) = exec_runtime("REGEX MATCH \"(\" IN \"x\" INTO M", &[]);
    assert_eq!(codes(&result), vec![5]);
}

#[test]
fn test_foreach() {
    let source = "\
LIST L = 10, 20
FOREACH X IN L
  PRINT X
NEXT X
FOREACH I, C IN \"ab\"
  PRINT I; C
NEXT
LIST E
FOREACH X IN E
  PRINT \"never\"
NEXT
PRINT \"done\"";
    assert_eq!(exec(source), "10\n20\n0a\n1b\ndone\n");
}

#[test]
fn test_const_cannot_change() {
    let (out, result, rt) = exec_runtime("CONST LIMIT = 10\nLIMIT = 5\nPRINT LIMIT", &[]);
    assert_eq!(codes(&result), vec![35]);
    assert!(out.ends_with("10\n"));
    assert!(result.completed);
    assert_eq!(rt.var("LIMIT"), Some(Val::Integer(10)));
}

#[test]
fn test_printf() {
    let source = "\
NAME = \"Ada\"
PRINTF \"{0} scored {1}\", NAME, 90
PRINTF \"%s has %d%%\", \"Bob\", 5
PRINTF \"Hi {NAME}\"";
    assert_eq!(exec(source), "Ada scored 90\nBob has 5%\nHi Ada\n");
}

#[test]
fn test_struct_fields() {
    let source = "\
STRUCT POINT = x, y
NEW POINT AS P
P.x = 3
PRINT P.x + P.y
TYPEOF P";
    assert_eq!(exec(source), "3\nDICT\n");
}

#[test]
fn test_enum_and_lambda() {
    let source = "\
ENUM DAY = MON, TUE, WED
LAMBDA SQ(X) = X * X
PRINT DAY_WED; DAY_COUNT; SQ(4)
LIST L = 1, 2, 3
MAP SQ ON L INTO S
REDUCE SQ ON L INTO NONE
PRINT S";
    let (out, result, _) = exec_runtime(source, &[]);
    assert_eq!(out.lines().next(), Some("2316"));
    assert_eq!(codes(&result), vec![5]);
}

#[test]
fn test_dict_operations() {
    let source = "\
DICT D
SET D, color, \"red\"
SET D.size = 2
GET D, color, C
DELETE D, size
PRINT C; \" \"; D";
    assert_eq!(exec(source), "red {\"color\": \"red\"}\n");
}

#[test]
fn test_far_list_index_is_caught() {
    let source = "\
LIST L = 1
TRY
  L[1000000000000] = 5
CATCH E
  PRINT \"caught\"
END TRY
L[3] = 4
PRINT LENGTH(L)";
    assert_eq!(exec(source), "caught\n4\n");
}
