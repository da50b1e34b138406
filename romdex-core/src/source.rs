use serde::{Deserialize, Serialize};

/// Provenance of a batch of items: which input DAT they came from.
///
/// Used for dedup tie-breaking (lower input index wins renaming) and for
/// diff/verify workflows that compare one input against the others.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Source {
    /// Ordinal of the originating input file.
    pub input: usize,
    /// Path of the originating input file, if known.
    pub path: Option<String>,
}

impl Source {
    pub fn new(input: usize) -> Self {
        Self { input, path: None }
    }

    pub fn with_path(input: usize, path: impl Into<String>) -> Self {
        Self {
            input,
            path: Some(path.into()),
        }
    }
}
