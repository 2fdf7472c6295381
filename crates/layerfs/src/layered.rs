//! The layered filesystem: priority-ordered resolution across providers.
//!
//! Lookups (`open`, `stat`, `read_file`) return the first layer's answer.
//! Listings (`read_dir`) merge every layer that has the directory, keeping
//! the highest-priority entry for each name. Re-rooting (`sub`) keeps every
//! layer that can re-root itself at the requested directory.

use async_trait::async_trait;
use std::fmt;
use std::future::Future;
use std::io;
use std::path::Path;
use std::sync::Arc;

use crate::error::{Collector, LayerError, Target};
use crate::ops;
use crate::overlay::{self, MergedEntries};
use crate::path;
use crate::policy::{DirectoryMode, ResolutionPolicy};
use crate::traits::{DirEntry, File, Filesystem, ReadDirFs, ReadFileFs, StatFs, SubFs};

/// A read-only filesystem composed of ordered layers.
///
/// Index order is priority order: layer 0 wins every conflict. The layer
/// list and [`ResolutionPolicy`] are fixed at construction, so one instance
/// can serve concurrent callers as long as its providers can.
#[derive(Clone)]
pub struct LayeredFs {
    layers: Arc<[Arc<dyn Filesystem>]>,
    policy: ResolutionPolicy,
}

impl fmt::Debug for LayeredFs {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LayeredFs")
            .field("layers", &self.layers.len())
            .field("policy", &self.policy)
            .finish()
    }
}

impl LayeredFs {
    /// Compose `layers`, highest priority first.
    pub fn new<I>(layers: I, policy: ResolutionPolicy) -> Self
    where
        I: IntoIterator<Item = Arc<dyn Filesystem>>,
    {
        Self {
            layers: layers.into_iter().collect(),
            policy,
        }
    }

    /// Short-circuit tolerance, first-wins directories.
    pub fn strict<I>(layers: I) -> Self
    where
        I: IntoIterator<Item = Arc<dyn Filesystem>>,
    {
        Self::new(layers, ResolutionPolicy::strict())
    }

    /// Best-effort tolerance, first-wins directories.
    pub fn best_effort<I>(layers: I) -> Self
    where
        I: IntoIterator<Item = Arc<dyn Filesystem>>,
    {
        Self::new(layers, ResolutionPolicy::best_effort())
    }

    /// Short-circuit tolerance, overlay directories.
    pub fn overlay<I>(layers: I) -> Self
    where
        I: IntoIterator<Item = Arc<dyn Filesystem>>,
    {
        Self::new(layers, ResolutionPolicy::overlay())
    }

    pub fn layers(&self) -> &[Arc<dyn Filesystem>] {
        &self.layers
    }

    pub fn policy(&self) -> ResolutionPolicy {
        self.policy
    }

    pub fn len(&self) -> usize {
        self.layers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.layers.is_empty()
    }

    /// Open `path` from the first layer that has it.
    ///
    /// In [`DirectoryMode::Overlay`] a directory comes back as a synthetic
    /// handle over the merged entries of every layer.
    pub async fn open(&self, path: impl AsRef<Path>) -> Result<Box<dyn File>, LayerError> {
        let path = path::clean(path.as_ref());
        match self.policy.directory_mode {
            DirectoryMode::FirstWins => {
                self.first_wins(&path, Target::File, |fs, p| fs.open(p))
                    .await
            }
            DirectoryMode::Overlay => overlay::open(self, &path).await,
        }
    }

    /// Metadata for `path` from the first layer that has it.
    pub async fn stat(&self, path: impl AsRef<Path>) -> Result<DirEntry, LayerError> {
        let path = path::clean(path.as_ref());
        self.first_wins(&path, Target::File, |fs, p| ops::stat(fs, p))
            .await
    }

    /// Contents of `path` from the first layer that has it.
    pub async fn read_file(&self, path: impl AsRef<Path>) -> Result<Vec<u8>, LayerError> {
        let path = path::clean(path.as_ref());
        self.first_wins(&path, Target::File, |fs, p| ops::read_file(fs, p))
            .await
    }

    /// Merged listing of `path` across every layer that has the directory.
    ///
    /// Entries keep discovery order; a name already contributed by a
    /// higher-priority layer is skipped.
    pub async fn read_dir(&self, path: impl AsRef<Path>) -> Result<Vec<DirEntry>, LayerError> {
        let path = path::clean(path.as_ref());
        let mut collector = Collector::new(self.policy.tolerance, Target::Directory, &path);
        let mut merged = MergedEntries::default();
        let mut listed = false;

        for (layer, fs) in self.layers.iter().enumerate() {
            match ops::read_dir(&**fs, &path).await {
                Ok(entries) => {
                    listed = true;
                    collector.mark_found();
                    merged.extend(entries);
                }
                Err(err) => collector.record(layer, err)?,
            }
        }

        if !listed {
            return Err(collector.finish());
        }
        tracing::debug!(
            path = %path::display(&path),
            entries = merged.len(),
            "merged directory listing"
        );
        Ok(merged.into_entries())
    }

    /// A new layered filesystem rooted at `dir` in each layer.
    ///
    /// Layers without native re-rooting are left out, as are layers that
    /// fail at `dir` (subject to the tolerance). Fails only when no layer
    /// could be re-rooted.
    pub async fn sub(&self, dir: impl AsRef<Path>) -> Result<LayeredFs, LayerError> {
        let dir = path::clean(dir.as_ref());
        let mut collector = Collector::new(self.policy.tolerance, Target::Directory, &dir);
        let mut rerooted: Vec<Arc<dyn Filesystem>> = Vec::with_capacity(self.layers.len());

        for (layer, fs) in self.layers.iter().enumerate() {
            let Some(subber) = fs.as_sub() else {
                tracing::trace!(layer, "layer cannot be re-rooted, skipping");
                continue;
            };
            match subber.sub(&dir).await {
                Ok(sub) => {
                    collector.mark_found();
                    rerooted.push(sub);
                }
                Err(err) => collector.record(layer, err)?,
            }
        }

        if rerooted.is_empty() {
            return Err(collector.finish());
        }
        tracing::debug!(
            dir = %path::display(&dir),
            layers = rerooted.len(),
            "re-rooted layered filesystem"
        );
        Ok(LayeredFs::new(rerooted, self.policy))
    }

    /// Consult layers in order and return the first success.
    async fn first_wins<'p, T, F, Fut>(
        &'p self,
        path: &'p Path,
        target: Target,
        attempt: F,
    ) -> Result<T, LayerError>
    where
        F: Fn(&'p dyn Filesystem, &'p Path) -> Fut,
        Fut: Future<Output = io::Result<T>>,
    {
        let mut collector = Collector::new(self.policy.tolerance, target, path);

        for (layer, fs) in self.layers.iter().enumerate() {
            match attempt(&**fs, path).await {
                Ok(found) => {
                    tracing::debug!(layer, path = %path::display(path), "resolved");
                    return Ok(found);
                }
                Err(err) => collector.record(layer, err)?,
            }
        }

        Err(collector.finish())
    }
}

#[async_trait]
impl Filesystem for LayeredFs {
    async fn open(&self, path: &Path) -> io::Result<Box<dyn File>> {
        Ok(LayeredFs::open(self, path).await?)
    }

    fn as_stat(&self) -> Option<&dyn StatFs> {
        Some(self)
    }

    fn as_read_dir(&self) -> Option<&dyn ReadDirFs> {
        Some(self)
    }

    fn as_read_file(&self) -> Option<&dyn ReadFileFs> {
        Some(self)
    }

    fn as_sub(&self) -> Option<&dyn SubFs> {
        Some(self)
    }
}

#[async_trait]
impl StatFs for LayeredFs {
    async fn stat(&self, path: &Path) -> io::Result<DirEntry> {
        Ok(LayeredFs::stat(self, path).await?)
    }
}

#[async_trait]
impl ReadDirFs for LayeredFs {
    async fn read_dir(&self, path: &Path) -> io::Result<Vec<DirEntry>> {
        Ok(LayeredFs::read_dir(self, path).await?)
    }
}

#[async_trait]
impl ReadFileFs for LayeredFs {
    async fn read_file(&self, path: &Path) -> io::Result<Vec<u8>> {
        Ok(LayeredFs::read_file(self, path).await?)
    }
}

#[async_trait]
impl SubFs for LayeredFs {
    async fn sub(&self, dir: &Path) -> io::Result<Arc<dyn Filesystem>> {
        Ok(Arc::new(LayeredFs::sub(self, dir).await?))
    }
}
