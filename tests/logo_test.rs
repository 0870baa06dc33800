mod common;
use common::*;
use templecode::mach::Val;

fn near(a: f64, b: f64) -> bool {
    (a - b).abs() < 1e-9
}

#[test]
fn test_square_returns_home() {
    let (_, rt, canvas) = exec_canvas("SQUARE 50");
    let t = rt.turtle();
    assert!(near(t.x(), 0.0) && near(t.y(), 0.0));
    assert!(near(t.heading(), 0.0));
    assert_eq!(canvas.lines().len(), 4);
}

#[test]
fn test_repeat_and_repcount() {
    let (out, rt, canvas) = exec_canvas("REPEAT 3 [PRINT REPCOUNT]\nREPEAT 4 [FD 10 RT 90]");
    assert_eq!(out, "1\n2\n3\n");
    assert_eq!(canvas.lines().len(), 4);
    assert_eq!(rt.var("REPCOUNT"), None);
}

#[test]
fn test_procedure_with_parameter() {
    let source = "\
TO BOX :SIZE
  REPEAT 4 [FORWARD :SIZE RIGHT 90]
END
BOX 30
BOX 10";
    let (_, rt, canvas) = exec_canvas(source);
    assert_eq!(canvas.lines().len(), 8);
    assert_eq!(rt.var("SIZE"), None);
}

#[test]
fn test_recursive_procedure_stops() {
    let source = "\
TO SPIRAL :N
  IF :N > 40 THEN STOP
  FORWARD :N
  RIGHT 90
  SPIRAL :N + 10
END
SPIRAL 10
PRINT \"after\"";
    let (out, _, canvas) = exec_canvas(source);
    assert_eq!(out, "after\n");
    assert_eq!(canvas.lines().len(), 4);
}

#[test]
fn test_position_reports() {
    let source = "\
PENUP
SETXY 10, 20
PENDOWN
RIGHT 90
FORWARD 5
POS
HEADING";
    let (out, rt, canvas) = exec_canvas(source);
    assert_eq!(out, "Position: [15, 20]\nHeading: 90\n");
    assert_eq!(canvas.lines().len(), 1);
    assert_eq!(rt.var("TURTLE_X"), Some(Val::Integer(15)));
}

#[test]
fn test_make_and_colon_variables() {
    let (out, rt, _) = exec_canvas("MAKE \"SIZE 25\nFD :SIZE\nPRINT TURTLE_Y");
    assert_eq!(out, "25\n");
    assert!(near(rt.turtle().y(), 25.0));
}

#[test]
fn test_pen_up_and_home() {
    let (_, rt, canvas) = exec_canvas("PU\nFD 40\nPD\nHOME\nSETPC red");
    assert!(canvas.lines().is_empty());
    assert!(near(rt.turtle().y(), 0.0));
    assert!(rt.turtle().is_pen_down());
}

#[test]
fn test_clearscreen_erases_drawing() {
    let (_, rt, canvas) = exec_canvas("FD 10\nRT 45\nCS");
    assert!(canvas.lines().is_empty());
    assert!(near(rt.turtle().heading(), 0.0));
}

#[test]
fn test_unknown_procedure_is_recorded() {
    let (out, result, _) = exec_runtime("FORWARD 10\nWIGGLE 3\nPRINT \"still here\"", &[]);
    assert_eq!(codes(&result), vec![33]);
    assert!(out.ends_with("still here\n"));
}

#[test]
fn test_star_skips_a_vertex() {
    let (_, rt, canvas) = exec_canvas("STAR 5 50");
    let lines = canvas.lines();
    assert_eq!(lines.len(), 5);
    let ((x0, y0), (x1, y1)) = lines[1];
    let turn = 144f64.to_radians();
    assert!(near(x1 - x0, 50.0 * turn.sin()));
    assert!(near(y1 - y0, -50.0 * turn.cos()));
    let t = rt.turtle();
    assert!(near(t.x(), 0.0) && near(t.y(), 0.0));
    assert!(near(t.heading(), 0.0));
}

#[test]
fn test_endless_procedure_is_a_fault() {
    let source = "\
TO SPIN :N
  SPIN :N + 1
END
SPIN 1";
    let (_, result, _) = exec_runtime(source, &[]);
    assert_eq!(codes(&result), vec![7]);
}

#[test]
fn test_huge_polygon_trips_guard() {
    let (_, result, _) = exec_runtime("POLYGON 1000000000000 10", &[]);
    assert_eq!(codes(&result), vec![36]);
    assert!(!result.completed);
}
