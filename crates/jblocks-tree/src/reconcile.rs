use rustc_hash::FxHashMap;
use rustc_hash::FxHashSet;

use crate::block::BlockId;
use crate::block::BlockTree;

/// Match blocks whose identity changed across a rebuild.
///
/// Identities are path-based, so an edit that shifts a statement's
/// position re-mints its identity even though the user considers it
/// the same block. This pass pairs each vanished old block with the
/// first new block of the same shape and source text, in preorder,
/// so breakpoints and highlights follow moved blocks.
#[must_use]
pub fn reconcile(
    old: &BlockTree,
    old_source: &str,
    new: &BlockTree,
    new_source: &str,
) -> FxHashMap<BlockId, BlockId> {
    let old_ids: FxHashSet<BlockId> = old.preorder().map(|b| b.id).collect();
    let new_ids: FxHashSet<BlockId> = new.preorder().map(|b| b.id).collect();

    let mut unmatched: Vec<(BlockId, &'static str, &str)> = new
        .preorder()
        .filter(|block| !old_ids.contains(&block.id))
        .map(|block| (block.id, block.kind.tag(), block.text(new_source)))
        .collect();

    let mut mapping = FxHashMap::default();
    for vanished in old.preorder().filter(|block| !new_ids.contains(&block.id)) {
        let tag = vanished.kind.tag();
        let text = vanished.text(old_source);
        let Some(position) = unmatched
            .iter()
            .position(|(_, candidate_tag, candidate_text)| {
                *candidate_tag == tag && *candidate_text == text
            })
        else {
            continue;
        };
        let (new_id, _, _) = unmatched.remove(position);
        mapping.insert(vanished.id, new_id);
    }

    if !mapping.is_empty() {
        tracing::trace!(remapped = mapping.len(), "reconciled moved block identities");
    }
    mapping
}

/// Carry a set of block identities (breakpoints, highlight) across a
/// rebuild: identities still present survive unchanged, reconciled
/// ones are remapped, and the rest are dropped.
#[must_use]
pub fn carry_over(
    ids: &FxHashSet<BlockId>,
    new: &BlockTree,
    mapping: &FxHashMap<BlockId, BlockId>,
) -> FxHashSet<BlockId> {
    ids.iter()
        .filter_map(|id| {
            if new.contains(*id) {
                Some(*id)
            } else {
                mapping.get(id).copied()
            }
        })
        .collect()
}
