/// Errors produced while migrating a project.
#[derive(Debug, thiserror::Error)]
pub enum MigrateError {
    #[error("{path}:{line}: parse failed: {message}")]
    Parse {
        path: String,
        line: usize,
        message: String,
    },

    #[error("{path}: {source}")]
    Io {
        path: String,
        source: std::io::Error,
    },

    #[error("{path}: invalid JSON: {source}")]
    Json {
        path: String,
        source: serde_json::Error,
    },

    #[error("invalid glob pattern: {0}")]
    Glob(#[from] globset::Error),

    #[error("walk failed: {0}")]
    Walk(#[from] walkdir::Error),
}

impl MigrateError {
    /// Path of the file the error refers to, when there is one.
    pub fn path(&self) -> Option<&str> {
        match self {
            MigrateError::Parse { path, .. }
            | MigrateError::Io { path, .. }
            | MigrateError::Json { path, .. } => Some(path),
            MigrateError::Glob(_) | MigrateError::Walk(_) => None,
        }
    }
}
