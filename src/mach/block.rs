use crate::lang::{classify, BlockKind, Marker};
use std::collections::HashMap;

/// One block opener with the lines that structure it.
#[derive(Debug, Clone, PartialEq)]
pub struct Block {
    pub kind: BlockKind,
    pub closer: Option<usize>,
    /// ELSEIF/ELSE, CASE or CATCH lines, in order.
    pub interior: Vec<usize>,
}

/// ## Block table
///
/// Built once per load so jumps over IF, SELECT, TRY and loop bodies are
/// lookups instead of forward scans.

#[derive(Debug, Default, Clone)]
pub struct BlockTable {
    blocks: HashMap<usize, Block>,
    owner: HashMap<usize, usize>,
}

impl BlockTable {
    pub fn build<'a, I>(texts: I) -> BlockTable
    where
        I: IntoIterator<Item = &'a str>,
    {
        let mut table = BlockTable::default();
        let mut open: Vec<usize> = vec![];
        for (index, text) in texts.into_iter().enumerate() {
            match classify(text) {
                Some(Marker::Open(kind)) => {
                    table.blocks.insert(
                        index,
                        Block {
                            kind,
                            closer: None,
                            interior: vec![],
                        },
                    );
                    open.push(index);
                }
                Some(Marker::Middle(kind)) => {
                    if let Some(&opener) = open.last() {
                        if let Some(block) = table.blocks.get_mut(&opener) {
                            if block.kind == kind {
                                block.interior.push(index);
                                table.owner.insert(index, opener);
                            }
                        }
                    }
                }
                Some(Marker::Close(kind)) => {
                    let found = open.iter().rposition(|o| {
                        table
                            .blocks
                            .get(o)
                            .map_or(false, |block| kind.closes(block.kind))
                    });
                    if let Some(pos) = found {
                        let opener = open[pos];
                        open.truncate(pos);
                        if let Some(block) = table.blocks.get_mut(&opener) {
                            block.closer = Some(index);
                        }
                        table.owner.insert(index, opener);
                    }
                }
                None => {}
            }
        }
        table
    }

    pub fn get(&self, opener: usize) -> Option<&Block> {
        self.blocks.get(&opener)
    }

    pub fn closer(&self, opener: usize) -> Option<usize> {
        self.blocks.get(&opener).and_then(|b| b.closer)
    }

    /// Opener owning an interior or closing line.
    pub fn opener(&self, line: usize) -> Option<usize> {
        self.owner.get(&line).copied()
    }

    /// First interior line after `line` in the same block, else the closer.
    pub fn next_marker(&self, opener: usize, line: usize) -> Option<usize> {
        let block = self.blocks.get(&opener)?;
        block
            .interior
            .iter()
            .copied()
            .find(|&i| i > line)
            .or(block.closer)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_nested_if_chain() {
        let src = [
            "IF A THEN",
            "IF B THEN",
            "PRINT 1",
            "END IF",
            "ELSEIF C THEN",
            "ELSE",
            "END IF",
        ];
        let table = BlockTable::build(src.iter().copied());
        let outer = table.get(0).unwrap();
        assert_eq!(outer.interior, vec![4, 5]);
        assert_eq!(outer.closer, Some(6));
        assert_eq!(table.closer(1), Some(3));
        assert_eq!(table.opener(5), Some(0));
        assert_eq!(table.next_marker(0, 4), Some(5));
    }

    #[test]
    fn test_unclosed_inner_block_is_dropped() {
        let src = ["WHILE X", "FOR I = 1 TO 2", "WEND"];
        let table = BlockTable::build(src.iter().copied());
        assert_eq!(table.closer(0), Some(2));
        assert_eq!(table.closer(1), None);
    }

    #[test]
    fn test_next_closes_foreach() {
        let src = ["FOREACH X IN L", "PRINT X", "NEXT"];
        let table = BlockTable::build(src.iter().copied());
        assert_eq!(table.closer(0), Some(2));
    }
}
