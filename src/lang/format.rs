use super::{find_keyword, first_word, Line};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BlockKind {
    If,
    For,
    Foreach,
    While,
    Do,
    Select,
    Try,
    Sub,
    Function,
}

/// Role a line plays in block structure.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Marker {
    Open(BlockKind),
    Middle(BlockKind),
    Close(BlockKind),
}

impl BlockKind {
    /// NEXT closes both FOR and FOREACH.
    pub fn closes(self, open: BlockKind) -> bool {
        match self {
            BlockKind::For => matches!(open, BlockKind::For | BlockKind::Foreach),
            _ => self == open,
        }
    }
}

/// `IF cond THEN` with nothing after THEN.
pub fn is_block_if(text: &str) -> bool {
    if first_word(text) != "IF" {
        return false;
    }
    match find_keyword(text, "THEN") {
        Some(i) => text[i + 4..].trim().is_empty(),
        None => false,
    }
}

pub fn classify(text: &str) -> Option<Marker> {
    use BlockKind::*;
    use Marker::*;
    let first = first_word(text);
    let second = text
        .split_whitespace()
        .nth(1)
        .unwrap_or("")
        .to_ascii_uppercase();
    Some(match (first.as_str(), second.as_str()) {
        ("END", "IF") | ("ENDIF", _) => Close(If),
        ("END", "SELECT") => Close(Select),
        ("END", "TRY") => Close(Try),
        ("END", "SUB") => Close(Sub),
        ("END", "FUNCTION") => Close(Function),
        ("IF", _) if is_block_if(text) => Open(If),
        ("ELSEIF", _) | ("ELSE", _) => Middle(If),
        ("FOR", _) => Open(For),
        ("FOREACH", _) => Open(Foreach),
        ("NEXT", _) => Close(For),
        ("WHILE", _) => Open(While),
        ("WEND", _) => Close(While),
        ("DO", _) => Open(Do),
        ("LOOP", _) => Close(Do),
        ("SELECT", _) => Open(Select),
        ("CASE", _) => Middle(Select),
        ("TRY", _) => Open(Try),
        ("CATCH", _) => Middle(Try),
        ("SUB", _) => Open(Sub),
        ("FUNCTION", _) => Open(Function),
        _ => return None,
    })
}

/// Re-indents source by block depth. Line tags stay in front of the
/// indentation-free text; blank lines are kept.
pub fn format_source(source: &str, indent_width: usize) -> String {
    let indent = " ".repeat(indent_width);
    let mut level = 0usize;
    let mut out: Vec<String> = vec![];
    for raw in source.lines() {
        let line = Line::new(raw);
        if line.is_empty() && line.tag().is_none() {
            out.push(String::new());
            continue;
        }
        let marker = classify(line.text());
        match marker {
            Some(Marker::Close(_))
            | Some(Marker::Middle(BlockKind::If))
            | Some(Marker::Middle(BlockKind::Try)) => level = level.saturating_sub(1),
            _ => {}
        }
        out.push(format!("{}{}", indent.repeat(level), line));
        match marker {
            Some(Marker::Open(_))
            | Some(Marker::Middle(BlockKind::If))
            | Some(Marker::Middle(BlockKind::Try)) => level += 1,
            _ => {}
        }
    }
    let mut s = out.join("\n");
    if source.ends_with('\n') {
        s.push('\n');
    }
    s
}

struct Rule {
    opens: &'static [BlockKind],
    label: &'static str,
    closer: &'static str,
}

const RULES: &[Rule] = &[
    Rule {
        opens: &[BlockKind::For, BlockKind::Foreach],
        label: "FOR",
        closer: "NEXT",
    },
    Rule {
        opens: &[BlockKind::While],
        label: "WHILE",
        closer: "WEND",
    },
    Rule {
        opens: &[BlockKind::Do],
        label: "DO",
        closer: "LOOP",
    },
    Rule {
        opens: &[BlockKind::Select],
        label: "SELECT",
        closer: "END SELECT",
    },
    Rule {
        opens: &[BlockKind::Sub, BlockKind::Function],
        label: "SUB/FUNCTION",
        closer: "END SUB/FUNCTION",
    },
    Rule {
        opens: &[BlockKind::If],
        label: "IF",
        closer: "ENDIF",
    },
    Rule {
        opens: &[BlockKind::Try],
        label: "TRY",
        closer: "END TRY",
    },
];

/// Static block balance check. Each rule keeps its own counter, so
/// crossed blocks of different kinds are not reported.
pub fn check_blocks(source: &str) -> Vec<String> {
    let mut issues = vec![];
    let mut counts = vec![0usize; RULES.len()];
    for (index, raw) in source.lines().enumerate() {
        let line = Line::new(raw);
        let (kind, opening) = match classify(line.text()) {
            Some(Marker::Open(kind)) => (kind, true),
            Some(Marker::Close(kind)) => (kind, false),
            _ => continue,
        };
        for (rule, count) in RULES.iter().zip(counts.iter_mut()) {
            if opening && rule.opens.contains(&kind) {
                *count += 1;
            } else if !opening && rule.opens.iter().any(|open| kind.closes(*open)) {
                if *count == 0 {
                    issues.push(format!(
                        "Line {}: {} without matching {}",
                        index + 1,
                        rule.closer,
                        rule.label
                    ));
                } else {
                    *count -= 1;
                }
            }
        }
    }
    for (rule, count) in RULES.iter().zip(counts) {
        if count > 0 {
            issues.push(format!(
                "{} unclosed {} block(s) (missing {})",
                count, rule.label, rule.closer
            ));
        }
    }
    issues
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_classify() {
        assert_eq!(classify("if x then"), Some(Marker::Open(BlockKind::If)));
        assert_eq!(classify("IF X THEN PRINT 1"), None);
        assert_eq!(classify("end select"), Some(Marker::Close(BlockKind::Select)));
        assert_eq!(classify("FOREACH X IN L"), Some(Marker::Open(BlockKind::Foreach)));
        assert!(BlockKind::For.closes(BlockKind::Foreach));
    }

    #[test]
    fn test_format_source() {
        let src = "FOR I = 1 TO 3\nIF I = 2 THEN\nPRINT I\nELSE\nPRINT 0\nEND IF\nNEXT I";
        assert_eq!(
            format_source(src, 2),
            "FOR I = 1 TO 3\n  IF I = 2 THEN\n    PRINT I\n  ELSE\n    PRINT 0\n  END IF\nNEXT I"
        );
    }

    #[test]
    fn test_format_keeps_tags() {
        assert_eq!(
            format_source("10 WHILE X\n20 WEND\n", 4),
            "10 WHILE X\n20 WEND\n"
        );
        assert_eq!(format_source("DO\n\nLOOP", 2), "DO\n\nLOOP");
    }

    #[test]
    fn test_check_blocks() {
        assert!(check_blocks("FOR I = 1 TO 2\nNEXT I").is_empty());
        assert_eq!(
            check_blocks("NEXT\nWHILE 1\nIF X THEN"),
            vec![
                "Line 1: NEXT without matching FOR",
                "1 unclosed WHILE block(s) (missing WEND)",
                "1 unclosed IF block(s) (missing ENDIF)",
            ]
        );
    }
}
