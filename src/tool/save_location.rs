use std::path::PathBuf;

/// Where captures are written.
pub trait SaveDirectory: Send + Sync {
    /// The chosen directory, or `None` if unset or no longer present.
    fn directory(&self) -> Option<PathBuf>;
}

/// A directory fixed at start-up, e.g. from `--out=`.
#[derive(Debug, Clone, Default)]
pub struct FixedDirectory {
    path: Option<PathBuf>,
}

impl FixedDirectory {
    pub fn new(path: Option<PathBuf>) -> Self {
        Self { path }
    }
}

impl SaveDirectory for FixedDirectory {
    fn directory(&self) -> Option<PathBuf> {
        self.path.clone().filter(|p| p.is_dir())
    }
}
