/// Flow graph nodes and the parameters handed to their hooks.
pub mod block;
pub mod navigator;
pub mod processor;

pub use block::{Block, BlockFn, BlockParams, BlockPath, Flow};
pub use navigator::PathNavigator;
pub use processor::{BlockProcessor, FlowProcessor};
