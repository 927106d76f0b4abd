//! Initialization module for tutor projects.
//!
//! `tutor init` creates the `.tutor/` directory structure in a project:
//!
//! ```text
//! .tutor/
//! ├── tutor.toml       # Optional configuration (use `tutor config init`)
//! ├── sessions/        # One JSON file per conversation session
//! └── logs/            # Daily log files when [logging] file = true
//! ```

use anyhow::{Context, Result};
use std::path::{Path, PathBuf};

/// The name of the tutor configuration directory.
pub const TUTOR_DIR: &str = ".tutor";

/// Result of initializing a tutor project.
#[derive(Debug)]
pub struct InitResult {
    /// Path to the .tutor directory
    pub tutor_dir: PathBuf,
    /// Whether the directory was newly created (false if it already existed)
    pub created: bool,
}

/// Initialize a tutor project in the given directory.
///
/// Running it again on an existing project only fills in missing
/// subdirectories; sessions and configuration are left alone.
pub fn init_project(project_dir: &Path) -> Result<InitResult> {
    let tutor_dir = get_tutor_dir(project_dir);
    let created = !tutor_dir.exists();

    std::fs::create_dir_all(&tutor_dir)
        .with_context(|| format!("Failed to create directory: {}", tutor_dir.display()))?;
    ensure_directory_structure(&tutor_dir)?;

    Ok(InitResult { tutor_dir, created })
}

/// Ensure all required subdirectories exist.
fn ensure_directory_structure(tutor_dir: &Path) -> Result<()> {
    for sub in ["sessions", "logs"] {
        let path = tutor_dir.join(sub);
        std::fs::create_dir_all(&path)
            .with_context(|| format!("Failed to create {} directory: {}", sub, path.display()))?;
    }
    Ok(())
}

/// Check if a project is already initialized.
pub fn is_initialized(project_dir: &Path) -> bool {
    get_tutor_dir(project_dir).exists()
}

/// Get the path to the tutor directory for a project.
pub fn get_tutor_dir(project_dir: &Path) -> PathBuf {
    project_dir.join(TUTOR_DIR)
}
