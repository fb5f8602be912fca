mod copy_solid;
mod delete_solid;

pub use copy_solid::{CopySolid, SolidCopyResult};
pub use delete_solid::DeleteSolid;
