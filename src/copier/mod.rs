//! Pre-cloned solids and the face history that links copies to their source.

mod history;
mod pool;

pub use history::HistoryMap;
pub use pool::{CopyPool, SolidCopy};
