//! Visual block model: the block tree built from a parse, the
//! node/block/line index, and identity reconciliation across rebuilds.

mod block;
mod factory;
mod map;
mod reconcile;

pub use block::Block;
pub use block::BlockId;
pub use block::BlockKind;
pub use block::BlockTree;
pub use factory::build_blocks;
pub use map::NodeBlockMap;
pub use reconcile::carry_over;
pub use reconcile::reconcile;
