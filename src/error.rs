use std::path::PathBuf;
use std::time::Duration;

use rmcp::model::{Content, IntoContents};
use thiserror::Error;

use crate::diagnose::ExtractionFailure;

/// Every way a documentation request can fail.
///
/// None of these are protocol faults: the handler returns them as tool
/// results flagged as errors, rendered with [`std::fmt::Display`].
#[derive(Debug, Error)]
pub enum DocError {
    #[error("{0}")]
    InvalidInput(String),

    #[error("working_dir is required for relative paths (including '.')")]
    ContextRequired,

    #[error("absolute path {} must match working directory {} when provided", path.display(), working_dir.display())]
    ContextMismatch { path: PathBuf, working_dir: PathBuf },

    #[error("failed to read module name from {}: {reason}", path.display())]
    ModuleDescriptor { path: PathBuf, reason: String },

    #[error("failed to create temporary project: {step}\noutput: {output}")]
    Provisioning { step: String, output: String },

    #[error(transparent)]
    Extraction(#[from] ExtractionFailure),

    #[error("{what} timed out after {}s", after.as_secs())]
    Timeout { what: String, after: Duration },

    #[error("page {page} exceeds total pages {total}")]
    PageOutOfRange { page: usize, total: usize },
}

impl IntoContents for DocError {
    fn into_contents(self) -> Vec<Content> {
        vec![Content::text(self.to_string())]
    }
}
