use crate::lang::Line;
use std::collections::BTreeMap;

/// ## REPL program store
///
/// Numbered lines typed at the prompt, kept in tag order. A number on
/// its own deletes that line.

#[derive(Debug, Clone, Default)]
pub struct Listing {
    source: BTreeMap<u32, Line>,
}

impl Listing {
    pub fn clear(&mut self) {
        self.source.clear();
    }

    pub fn is_empty(&self) -> bool {
        self.source.is_empty()
    }

    pub fn len(&self) -> usize {
        self.source.len()
    }

    /// Stores a tagged line. Returns false for direct statements, which
    /// the caller executes instead.
    pub fn enter(&mut self, text: &str) -> bool {
        let trimmed = text.trim();
        if let Ok(tag) = trimmed.parse::<u32>() {
            self.source.remove(&tag);
            return true;
        }
        let line = Line::new(trimmed);
        match line.tag() {
            Some(tag) => {
                self.source.insert(tag, line);
                true
            }
            None => false,
        }
    }

    pub fn line(&self, tag: u32) -> Option<&Line> {
        self.source.get(&tag)
    }

    pub fn lines(&self) -> impl Iterator<Item = &Line> {
        self.source.values()
    }

    /// Program text in tag order, ready for `Runtime::run`.
    pub fn source(&self) -> String {
        let mut s = String::new();
        for line in self.source.values() {
            s.push_str(&line.to_string());
            s.push('\n');
        }
        s
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lines_kept_in_order() {
        let mut listing = Listing::default();
        assert!(listing.enter("20 PRINT \"B\""));
        assert!(listing.enter("10 PRINT \"A\""));
        assert!(!listing.enter("PRINT 1"));
        assert_eq!(listing.source(), "10 PRINT \"A\"\n20 PRINT \"B\"\n");
        assert!(listing.enter("10"));
        assert_eq!(listing.len(), 1);
        assert!(listing.line(20).is_some());
    }
}
