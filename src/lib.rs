//! Cached, parallel tessellation of B-rep solids for display.
//!
//! ```
//! use std::sync::Arc;
//!
//! use brep_mesh_cache::kernel::{Item, ReferenceKernel};
//! use brep_mesh_cache::math::Point3;
//! use brep_mesh_cache::mesh::{ParallelMeshCreator, RenderNote};
//! use brep_mesh_cache::operations::creation::MakeBox;
//! use brep_mesh_cache::MeshCacheError;
//!
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() -> Result<(), MeshCacheError> {
//! let kernel = Arc::new(ReferenceKernel::new());
//! let solid = kernel.edit(|store| {
//!     MakeBox::new(Point3::origin(), Point3::new(1.0, 2.0, 3.0)).execute(store)
//! })?;
//!
//! let creator = ParallelMeshCreator::new(kernel);
//! let mesh = creator
//!     .caching(|session| async move {
//!         let item = Item::Solid(solid);
//!         let first = session.create(item, 0.01, RenderNote::default(), false, None).await?;
//!         let again = session.create(item, 0.01, RenderNote::default(), false, None).await?;
//!         assert!(Arc::ptr_eq(&first, &again));
//!         Ok::<_, MeshCacheError>(first)
//!     })
//!     .await?;
//! assert_eq!(mesh.faces.len(), 6);
//! assert_eq!(mesh.edges.len(), 12);
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod copier;
pub mod error;
pub mod geometry;
pub mod kernel;
pub mod math;
pub mod mesh;
pub mod operations;
pub mod tessellation;
pub mod topology;

pub use config::{DetailLevel, LevelMode, MeshCacheConfig};
pub use error::{MeshCacheError, Result};
