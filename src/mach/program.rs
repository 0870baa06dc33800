use super::{BlockTable, Val};
use crate::error;
use crate::lang::{split_top, strip_keyword, BlockKind, Error, Line};
use std::collections::HashMap;
use std::ops::Range;

/// A Logo procedure from `TO name :param ... END`.
#[derive(Debug, Clone, PartialEq)]
pub struct LogoProc {
    pub params: Vec<String>,
    pub body: Vec<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RoutineKind {
    Sub,
    Function,
}

/// A SUB or FUNCTION body located by line index.
#[derive(Debug, Clone, PartialEq)]
pub struct Routine {
    pub kind: RoutineKind,
    pub params: Vec<String>,
    pub body_start: usize,
    pub body_end: usize,
}

/// ## Loaded program
///
/// Lines, labels, the DATA pool, Logo procedures, SUB/FUNCTION bodies
/// and the block table, all computed at load.

#[derive(Debug, Default)]
pub struct Program {
    lines: Vec<Line>,
    labels: HashMap<String, usize>,
    tags: HashMap<u32, usize>,
    data: Vec<Val>,
    procedures: HashMap<String, LogoProc>,
    routines: HashMap<String, Routine>,
    blocks: BlockTable,
    diagnostics: Vec<Error>,
}

impl Program {
    pub fn load(source: &str) -> Program {
        let mut program = Program::default();
        program.append(source);
        program
    }

    /// Adds more source after the existing lines. Returns the new line range.
    pub fn append(&mut self, source: &str) -> Range<usize> {
        let start = self.lines.len();
        let logical = self.preprocess(source);
        for text in logical {
            let index = self.lines.len();
            let line = Line::new(&text);
            if let Some(tag) = line.tag() {
                self.tags.entry(tag).or_insert(index);
            }
            if let Some(label) = label_of(line.text()) {
                self.labels.insert(label.to_ascii_uppercase(), index);
            }
            if let Some(items) = strip_keyword(line.text(), "DATA") {
                for item in split_top(items, ',') {
                    self.data.push(Val::coerce(item.trim_matches('"')));
                }
            }
            self.lines.push(line);
        }
        self.blocks = BlockTable::build(self.lines.iter().map(|l| l.text()));
        for index in start..self.lines.len() {
            self.register_routine(index);
        }
        start..self.lines.len()
    }

    fn register_routine(&mut self, index: usize) {
        let kind = match self.blocks.get(index).map(|b| b.kind) {
            Some(BlockKind::Sub) => RoutineKind::Sub,
            Some(BlockKind::Function) => RoutineKind::Function,
            _ => return,
        };
        let text = self.lines[index].text();
        let header = text[text.find(char::is_whitespace).unwrap_or(text.len())..].trim();
        let (name, params) = routine_header(header);
        if name.is_empty() {
            self.diagnostics
                .push(error!(SyntaxError, Some(index + 1); "MISSING ROUTINE NAME"));
            return;
        }
        let body_end = match self.blocks.closer(index) {
            Some(closer) => closer,
            None => {
                let closer = match kind {
                    RoutineKind::Sub => "END SUB",
                    RoutineKind::Function => "END FUNCTION",
                };
                self.diagnostics.push(
                    error!(MissingEnd, Some(index + 1); format!("{} {}: MISSING {}", first(text), name, closer)),
                );
                self.lines.len()
            }
        };
        self.routines.insert(
            name,
            Routine {
                kind,
                params,
                body_start: index + 1,
                body_end,
            },
        );
    }

    /// Collects TO...END procedures and joins multi-line REPEAT brackets.
    fn preprocess(&mut self, source: &str) -> Vec<String> {
        let raw: Vec<&str> = source.lines().collect();
        let mut out = vec![];
        let mut i = 0;
        while i < raw.len() {
            let line = raw[i].trim();
            let parsed = Line::new(line);
            if let Some(header) = strip_keyword(parsed.text(), "TO") {
                let mut words = header.split_whitespace();
                let name = words.next().unwrap_or("").to_ascii_lowercase();
                let params = words
                    .map(|p| p.trim_start_matches(':').to_ascii_uppercase())
                    .collect();
                let mut body = vec![];
                let mut closed = false;
                i += 1;
                while i < raw.len() {
                    let text = Line::new(raw[i]).text().to_string();
                    if text.eq_ignore_ascii_case("END") {
                        closed = true;
                        break;
                    }
                    let (joined, next) = join_brackets(&raw, i, &text, "\n");
                    i = next;
                    if !joined.is_empty() && !joined.starts_with(';') {
                        body.push(joined);
                    }
                }
                if !closed {
                    self.diagnostics
                        .push(error!(MissingEnd; format!("TO {}: MISSING END", name)));
                }
                self.procedures.insert(name, LogoProc { params, body });
                i += 1;
                continue;
            }
            if first(parsed.text()).eq_ignore_ascii_case("REPEAT") {
                let (joined, next) = join_brackets(&raw, i, line, " ");
                out.push(joined);
                i = next;
                continue;
            }
            out.push(line.to_string());
            i += 1;
        }
        out
    }

    pub fn len(&self) -> usize {
        self.lines.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    pub fn line(&self, index: usize) -> Option<&Line> {
        self.lines.get(index)
    }

    pub fn lines(&self) -> &[Line] {
        &self.lines
    }

    pub fn label(&self, name: &str) -> Option<usize> {
        self.labels.get(&name.to_ascii_uppercase()).copied()
    }

    pub fn tag(&self, tag: u32) -> Option<usize> {
        self.tags.get(&tag).copied()
    }

    pub fn data(&self) -> &[Val] {
        &self.data
    }

    pub fn procedures(&self) -> &HashMap<String, LogoProc> {
        &self.procedures
    }

    pub fn routines(&self) -> &HashMap<String, Routine> {
        &self.routines
    }

    pub fn blocks(&self) -> &BlockTable {
        &self.blocks
    }

    pub fn diagnostics(&self) -> &[Error] {
        &self.diagnostics
    }
}

fn first(text: &str) -> &str {
    text.split_whitespace().next().unwrap_or("")
}

/// `L:name`, `*name`, or `name:` on a line of its own.
pub fn label_of(text: &str) -> Option<String> {
    let is_word = |s: &str| {
        !s.is_empty()
            && s.chars().next().map_or(false, |c| c.is_ascii_alphabetic() || c == '_')
            && s.chars().all(|c| c.is_ascii_alphanumeric() || c == '_')
    };
    if text.len() > 2 && text.get(..2).map_or(false, |h| h.eq_ignore_ascii_case("L:")) {
        let name = text[2..].trim();
        return if name.is_empty() { None } else { Some(name.to_string()) };
    }
    if let Some(name) = text.strip_prefix('*') {
        let name = name.trim();
        return if is_word(name) { Some(name.to_string()) } else { None };
    }
    if let Some(name) = text.strip_suffix(':') {
        if text.len() > 2 && is_word(name) {
            return Some(name.to_string());
        }
    }
    None
}

/// `NAME(A, B)` or `NAME A B` to an upper-cased name and parameters.
pub fn routine_header(header: &str) -> (String, Vec<String>) {
    let (name, params) = match header.find('(') {
        Some(i) => {
            let inner = header[i + 1..].trim_end().trim_end_matches(')');
            (&header[..i], split_top(inner, ','))
        }
        None => {
            let mut words = header.split_whitespace();
            let name = words.next().unwrap_or("");
            (name, words.map(str::to_string).collect())
        }
    };
    let params = params
        .into_iter()
        .filter(|p| !p.is_empty())
        .map(|p| p.trim_start_matches(':').to_ascii_uppercase())
        .collect();
    (name.trim().to_ascii_uppercase(), params)
}

fn bracket_depth(text: &str) -> i32 {
    let mut depth = 0;
    let mut quote = false;
    for ch in text.chars() {
        match ch {
            '"' => quote = !quote,
            '[' if !quote => depth += 1,
            ']' if !quote => depth -= 1,
            _ => {}
        }
    }
    depth
}

/// Joins following raw lines onto `text` while `[` brackets stay open.
/// Returns the joined text and the index after the last consumed line.
fn join_brackets(raw: &[&str], index: usize, text: &str, glue: &str) -> (String, usize) {
    let mut joined = text.trim().to_string();
    let mut depth = bracket_depth(&joined);
    let mut next = index + 1;
    while depth > 0 && next < raw.len() {
        let piece = raw[next].trim();
        depth += bracket_depth(piece);
        if !piece.is_empty() {
            joined.push_str(glue);
            joined.push_str(piece);
        }
        next += 1;
    }
    (joined, next)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_labels() {
        assert_eq!(label_of("L:start"), Some("start".into()));
        assert_eq!(label_of("*loop"), Some("loop".into()));
        assert_eq!(label_of("done:"), Some("done".into()));
        assert_eq!(label_of("T:hello"), None);
        assert_eq!(label_of("* a comment"), None);
    }

    #[test]
    fn test_load_collects_data_and_routines() {
        let program = Program::load(
            "DATA 1, \"two\", 3.5\nFUNCTION SQ(X)\nRETURN X * X\nEND FUNCTION\nPRINT SQ(3)",
        );
        assert_eq!(
            program.data(),
            &[Val::Integer(1), Val::from("two"), Val::Float(3.5)]
        );
        let sq = &program.routines()["SQ"];
        assert_eq!(sq.params, vec!["X"]);
        assert_eq!((sq.body_start, sq.body_end), (2, 3));
        assert!(program.diagnostics().is_empty());
    }

    #[test]
    fn test_logo_procedures_are_lifted_out() {
        let program = Program::load("TO square :size\nREPEAT 4 [\nFD :size\nRT 90\n]\nEND\nsquare 50");
        assert_eq!(program.len(), 1);
        let proc = &program.procedures()["square"];
        assert_eq!(proc.params, vec!["SIZE"]);
        assert_eq!(proc.body, vec!["REPEAT 4 [\nFD :size\nRT 90\n]"]);
    }

    #[test]
    fn test_missing_end_is_a_diagnostic() {
        let program = Program::load("TO spin\nRT 10");
        assert_eq!(
            program.diagnostics()[0].to_string(),
            "MISSING END; TO spin: MISSING END"
        );
        assert!(program.procedures().contains_key("spin"));
    }

    #[test]
    fn test_multiline_repeat_is_joined() {
        let program = Program::load("REPEAT 2 [\nFD 10\n]\nPRINT 1");
        assert_eq!(program.line(0).unwrap().text(), "REPEAT 2 [ FD 10 ]");
        assert_eq!(program.len(), 2);
    }

    #[test]
    fn test_routine_header() {
        assert_eq!(
            routine_header("greet(name, times)"),
            ("GREET".to_string(), vec!["NAME".to_string(), "TIMES".to_string()])
        );
        assert_eq!(routine_header("HELLO"), ("HELLO".to_string(), vec![]));
    }
}
