//! layerfs: one read-only filesystem view over an ordered stack of providers.
//!
//! Layer 0 has the highest priority. This crate provides:
//!
//! - **Provider contract**: [`Filesystem`] with optional capabilities
//!   ([`StatFs`], [`ReadDirFs`], [`ReadFileFs`], [`SubFs`]) probed per call
//! - **Resolution**: [`LayeredFs`] answers lookups from the first layer that
//!   has the path and merges directory listings across layers
//! - **Overlay directories**: in [`DirectoryMode::Overlay`], opening a
//!   directory yields an [`OverlayDir`] over every layer's entries
//! - **Error aggregation**: every failure is a [`LayerError`] carrying each
//!   layer's cause, classified as not-found only when no layer has the path
//! - **Providers**: [`MemoryFs`], [`LocalFs`], [`StaticFs`], [`ScopedFs`]
//!
//! ```
//! use std::sync::Arc;
//! use layerfs::{Filesystem, LayeredFs, MemoryFs};
//!
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() {
//! let overrides = MemoryFs::from_files([("theme.css", "dark")]);
//! let defaults = MemoryFs::from_files([("theme.css", "light"), ("app.js", "main()")]);
//! let fs = LayeredFs::strict([
//!     Arc::new(overrides) as Arc<dyn Filesystem>,
//!     Arc::new(defaults) as Arc<dyn Filesystem>,
//! ]);
//!
//! assert_eq!(fs.read_file("theme.css").await.unwrap(), b"dark");
//! assert_eq!(fs.read_file("app.js").await.unwrap(), b"main()");
//! assert!(fs.read_file("missing").await.unwrap_err().is_not_found());
//! # }
//! ```

mod bundle;
mod config;
mod error;
mod layered;
mod local;
mod memory;
mod overlay;
mod policy;
mod scoped;
mod traits;

pub mod handle;
pub mod ops;
pub mod path;
pub mod testing;

pub use bundle::StaticFs;
pub use config::{ConfigError, LayerConfig, LayerSource};
pub use error::{Collector, ErrorClass, LayerCause, LayerError, Target};
pub use layered::LayeredFs;
pub use local::LocalFs;
pub use memory::MemoryFs;
pub use overlay::OverlayDir;
pub use policy::{DirectoryMode, ResolutionPolicy, Tolerance};
pub use scoped::ScopedFs;
pub use traits::{
    DirEntry, DirEntryKind, DirHandle, EntryBatch, File, Filesystem, ReadDirFs, ReadFileFs,
    ReadLimit, StatFs, SubFs,
};
