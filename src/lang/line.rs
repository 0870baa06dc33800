/// One source line: an optional numeric tag and the statement text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Line {
    tag: Option<u32>,
    text: String,
}

impl Line {
    /// A leading integer followed by whitespace becomes the tag.
    pub fn new(source: &str) -> Line {
        let source = source.trim();
        let digits = source.chars().take_while(|c| c.is_ascii_digit()).count();
        if digits > 0 {
            let rest = &source[digits..];
            if rest.starts_with(|c: char| c.is_whitespace()) {
                if let Ok(tag) = source[..digits].parse::<u32>() {
                    return Line {
                        tag: Some(tag),
                        text: rest.trim().to_string(),
                    };
                }
            }
        }
        Line {
            tag: None,
            text: source.to_string(),
        }
    }

    pub fn tag(&self) -> Option<u32> {
        self.tag
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn is_empty(&self) -> bool {
        self.text.is_empty()
    }

    /// The text upper-cased, for keyword checks.
    pub fn upper(&self) -> String {
        self.text.to_ascii_uppercase()
    }
}

impl std::fmt::Display for Line {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        match self.tag {
            Some(tag) => write!(f, "{} {}", tag, self.text),
            None => write!(f, "{}", self.text),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tagged_line() {
        let line = Line::new("  10 PRINT 1 \r");
        assert_eq!(line.tag(), Some(10));
        assert_eq!(line.text(), "PRINT 1");
        assert_eq!(line.to_string(), "10 PRINT 1");
    }

    #[test]
    fn test_bare_number_is_not_a_tag() {
        let line = Line::new("10");
        assert_eq!(line.tag(), None);
        assert_eq!(line.text(), "10");
    }
}
