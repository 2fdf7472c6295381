//! Per-layer error collection and classification.
//!
//! Every consulted layer contributes at most one [`LayerCause`]. Once a
//! traversal gives up, the causes are folded into a single [`LayerError`]
//! whose [`ErrorClass`] answers "does this path exist anywhere": it is
//! [`ErrorClass::NotFound`] only when every consulted layer said not-found.

use std::fmt;
use std::io;
use std::path::{Path, PathBuf};
use thiserror::Error;

use crate::path;
use crate::policy::Tolerance;

/// Dominant classification of a failed layered operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorClass {
    /// No consulted layer has the path.
    NotFound,
    /// At least one consulted layer failed for another reason, or the path
    /// exists but could not be served.
    Failed,
}

/// What the operation was looking for, used in messages.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Target {
    File,
    Directory,
}

impl fmt::Display for Target {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Target::File => f.write_str("file"),
            Target::Directory => f.write_str("directory"),
        }
    }
}

/// One layer's failure.
#[derive(Debug, Error)]
#[error("layer {layer}: {source}")]
pub struct LayerCause {
    /// Index of the layer in the layer list.
    pub layer: usize,
    pub source: io::Error,
}

impl LayerCause {
    pub fn is_not_found(&self) -> bool {
        self.source.kind() == io::ErrorKind::NotFound
    }
}

/// Aggregated failure of a layered operation.
#[derive(Debug, Error)]
#[error("{}", describe(.class, .target, .path, .causes))]
pub struct LayerError {
    class: ErrorClass,
    target: Target,
    path: PathBuf,
    causes: Vec<LayerCause>,
}

fn describe(class: &ErrorClass, target: &Target, path: &Path, causes: &[LayerCause]) -> String {
    let mut message = match class {
        ErrorClass::NotFound => {
            format!("{} {:?} not found in any layer", target, path::display(path))
        }
        ErrorClass::Failed => format!("{} {:?} could not be resolved", target, path::display(path)),
    };
    if !causes.is_empty() {
        let joined: Vec<String> = causes.iter().map(ToString::to_string).collect();
        message.push_str(": ");
        message.push_str(&joined.join("; "));
    }
    message
}

impl LayerError {
    pub fn class(&self) -> ErrorClass {
        self.class
    }

    pub fn is_not_found(&self) -> bool {
        self.class == ErrorClass::NotFound
    }

    pub fn target(&self) -> Target {
        self.target
    }

    /// The cleaned path the operation was resolving.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Per-layer causes in the order the layers were consulted.
    pub fn causes(&self) -> &[LayerCause] {
        &self.causes
    }
}

impl From<LayerError> for io::Error {
    fn from(err: LayerError) -> Self {
        let kind = match err.class {
            ErrorClass::NotFound => io::ErrorKind::NotFound,
            ErrorClass::Failed => io::ErrorKind::Other,
        };
        io::Error::new(kind, err)
    }
}

/// Accumulates per-layer outcomes for one operation under a tolerance.
#[derive(Debug)]
pub struct Collector {
    tolerance: Tolerance,
    target: Target,
    path: PathBuf,
    causes: Vec<LayerCause>,
    all_not_found: bool,
}

impl Collector {
    pub fn new(tolerance: Tolerance, target: Target, path: &Path) -> Self {
        Self {
            tolerance,
            target,
            path: path.to_path_buf(),
            causes: Vec::new(),
            all_not_found: true,
        }
    }

    /// Record a layer's failure.
    ///
    /// Not-found always lets the traversal continue. Any other failure ends
    /// it immediately under [`Tolerance::ShortCircuit`]; the returned error
    /// then carries the causes seen so far, this one last.
    pub fn record(&mut self, layer: usize, err: io::Error) -> Result<(), LayerError> {
        let not_found = err.kind() == io::ErrorKind::NotFound;
        tracing::trace!(
            layer,
            path = %path::display(&self.path),
            error = %err,
            not_found,
            "layer failed"
        );
        self.causes.push(LayerCause { layer, source: err });
        if not_found {
            return Ok(());
        }

        self.all_not_found = false;
        match self.tolerance {
            Tolerance::BestEffort => Ok(()),
            Tolerance::ShortCircuit => Err(self.take(ErrorClass::Failed)),
        }
    }

    /// Note that some layer proved the path exists.
    ///
    /// A later [`finish`](Self::finish) can then never classify as not-found.
    pub fn mark_found(&mut self) {
        self.all_not_found = false;
    }

    /// Change what the eventual error says it was looking for.
    pub fn retarget(&mut self, target: Target) {
        self.target = target;
    }

    pub fn causes(&self) -> &[LayerCause] {
        &self.causes
    }

    /// Classify everything recorded into the final error.
    pub fn finish(mut self) -> LayerError {
        let class = if self.all_not_found {
            ErrorClass::NotFound
        } else {
            ErrorClass::Failed
        };
        self.take(class)
    }

    fn take(&mut self, class: ErrorClass) -> LayerError {
        LayerError {
            class,
            target: self.target,
            path: std::mem::take(&mut self.path),
            causes: std::mem::take(&mut self.causes),
        }
    }
}
