use std::collections::BTreeMap;

use jblocks_syntax::NodeId;
use rustc_hash::FxHashMap;

use crate::block::BlockId;

/// Bidirectional index between syntax nodes, block identities, and
/// source lines, rebuilt from scratch on every block build.
///
/// Entries are only meaningful against the snapshot they were built
/// from; callers must refresh after every commit rather than consult
/// a map from a previous version.
#[derive(Debug, Clone, Default)]
pub struct NodeBlockMap {
    forward: FxHashMap<NodeId, BlockId>,
    reverse: FxHashMap<BlockId, NodeId>,
    line_of_block: FxHashMap<BlockId, u32>,
    // BTreeMap keeps lines ordered so the lowest mapped line is cheap
    // to find when no breakpoint is set.
    block_at_line: BTreeMap<u32, BlockId>,
}

impl NodeBlockMap {
    pub(crate) fn insert(&mut self, node: NodeId, block: BlockId, line: u32, is_statement: bool) {
        self.forward.insert(node, block);
        self.reverse.insert(block, node);
        self.line_of_block.insert(block, line);
        // Statement blocks win line collisions; otherwise first in wins.
        match self.block_at_line.entry(line) {
            std::collections::btree_map::Entry::Vacant(entry) => {
                entry.insert(block);
            }
            std::collections::btree_map::Entry::Occupied(mut entry) if is_statement => {
                entry.insert(block);
            }
            std::collections::btree_map::Entry::Occupied(_) => {}
        }
    }

    #[must_use]
    pub fn block_for_node(&self, node: NodeId) -> Option<BlockId> {
        self.forward.get(&node).copied()
    }

    #[must_use]
    pub fn node_for_block(&self, block: BlockId) -> Option<NodeId> {
        self.reverse.get(&block).copied()
    }

    #[must_use]
    pub fn block_at_line(&self, line: u32) -> Option<BlockId> {
        self.block_at_line.get(&line).copied()
    }

    #[must_use]
    pub fn line_of_block(&self, block: BlockId) -> Option<u32> {
        self.line_of_block.get(&block).copied()
    }

    /// Lowest source line that maps to a block, used as the fallback
    /// pause location when no breakpoints are set.
    #[must_use]
    pub fn first_mapped_line(&self) -> Option<u32> {
        self.block_at_line.keys().next().copied()
    }

    #[must_use]
    pub fn contains_block(&self, block: BlockId) -> bool {
        self.reverse.contains_key(&block)
    }

    #[must_use]
    pub fn mapped_lines(&self) -> impl Iterator<Item = u32> + '_ {
        self.block_at_line.keys().copied()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.reverse.is_empty()
    }
}
