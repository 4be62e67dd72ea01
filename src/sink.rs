//! Dependency sink: the boundary where discovered sets leave this crate
//!
//! The build system supplies its own ledger behind [`DepSink`]; the CLI and
//! tests use the in-memory [`CollectedDeps`] collector.

use std::path::{Path, PathBuf};

/// Receiver for the final dependency report.
///
/// Each method is called once per unique normalized path; call order is
/// unspecified.
pub trait DepSink {
    /// Record a path the traced step read.
    fn record_input(&mut self, path: &Path);
    /// Record a path the traced step created, wrote, or renamed into place.
    fn record_output(&mut self, path: &Path);
}

/// In-memory sink collecting both sets for later rendering.
#[derive(Debug, Default)]
pub struct CollectedDeps {
    pub inputs: Vec<PathBuf>,
    pub outputs: Vec<PathBuf>,
}

impl CollectedDeps {
    pub fn new() -> Self {
        Self::default()
    }

    /// True if no dependency was recorded at all.
    pub fn is_empty(&self) -> bool {
        self.inputs.is_empty() && self.outputs.is_empty()
    }
}

impl DepSink for CollectedDeps {
    fn record_input(&mut self, path: &Path) {
        self.inputs.push(path.to_path_buf());
    }

    fn record_output(&mut self, path: &Path) {
        self.outputs.push(path.to_path_buf());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_collected_deps_records_paths() {
        let mut deps = CollectedDeps::new();
        assert!(deps.is_empty());
        deps.record_input(Path::new("/src/a.c"));
        deps.record_output(Path::new("/src/a.o"));
        assert!(!deps.is_empty());
        assert_eq!(deps.inputs, [PathBuf::from("/src/a.c")]);
        assert_eq!(deps.outputs, [PathBuf::from("/src/a.o")]);
    }
}
