mod common;
use common::*;

fn scratch(name: &str) -> String {
    let path = std::env::temp_dir().join(format!("tc-{}-{}", std::process::id(), name));
    path.to_string_lossy().into_owned()
}

#[test]
fn test_numbered_files() {
    let path = scratch("lines.txt");
    let source = format!(
        "\
OPEN \"{0}\" FOR OUTPUT AS #1
WRITELINE #1, \"alpha\"
WRITELINE #1, \"beta\"
CLOSE #1
OPEN \"{0}\" FOR INPUT AS #2
READLINE #2, A$
READLINE #2, B$
PRINT A$; \"+\"; B$; EOF
READLINE #2, C$
PRINT EOF
CLOSE",
        path
    );
    assert_eq!(exec(&source), "alpha+beta0\n1\n");
    let _ = std::fs::remove_file(&path);
}

#[test]
fn test_whole_files() {
    let path = scratch("whole.txt");
    let source = format!(
        "\
WRITEFILE \"{0}\", \"one\"
APPENDFILE \"{0}\", \"two\"
READFILE \"{0}\", T$
PRINT LEN(T$); FILEEXISTS(\"{0}\")",
        path
    );
    assert_eq!(exec(&source), "71\n");
    let _ = std::fs::remove_file(&path);
}

#[test]
fn test_file_errors() {
    let path = scratch("missing.txt");
    let source = format!(
        "\
TRY
  OPEN \"{0}\" FOR INPUT AS #1
CATCH E
  PRINT \"caught\"
END TRY
CLOSE #3",
        path
    );
    let (out, result, _) = exec_runtime(&source, &[]);
    assert!(out.starts_with("caught\n"));
    assert_eq!(codes(&result), vec![52]);
    let (_, result, _) = exec_runtime("OPEN \"x\" FOR SIDEWAYS AS #1", &[]);
    assert_eq!(codes(&result), vec![54]);
}

#[test]
fn test_import_runs_once() {
    let path = scratch("lib.tc");
    std::fs::write(
        &path,
        "FUNCTION TWICE(N)\n  RETURN N * 2\nEND FUNCTION\nPRINT \"loaded\"\n",
    )
    .unwrap();
    let source = format!("IMPORT \"{0}\"\nIMPORT \"{0}\"\nPRINT TWICE(21)", path);
    assert_eq!(exec(&source), "loaded\n42\n");
    let _ = std::fs::remove_file(&path);
}
