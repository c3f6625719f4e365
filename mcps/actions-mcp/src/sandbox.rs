//! Project-root sandbox for path validation
//!
//! Every caller-supplied or config-declared path must resolve inside the
//! project root. Candidates are fully canonicalized (symlinks and `..`
//! resolved) *before* the ancestor check, so a symlink pointing outside the
//! root cannot slip through, and the check compares path components rather
//! than string prefixes: `/work/project_evilX` is not inside
//! `/work/project_evil`.

use std::path::{Path, PathBuf};

use crate::types::ValidationError;

/// Enforces the project-root boundary for untrusted paths
#[derive(Debug, Clone)]
pub struct ProjectSandbox {
    root: PathBuf,
}

impl ProjectSandbox {
    /// Create a sandbox rooted at `project_root`
    ///
    /// The root itself is canonicalized once so later comparisons are between
    /// fully resolved paths.
    pub fn new(project_root: &Path) -> std::io::Result<Self> {
        Ok(Self {
            root: project_root.canonicalize()?,
        })
    }

    /// The canonical project root
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Resolve an untrusted path and enforce the boundary
    ///
    /// Relative paths are joined under the project root. The candidate must
    /// exist on disk (canonicalization requires it) and its canonical form
    /// must be the root or a descendant of it. `label` names the parameter
    /// for error messages.
    pub fn resolve(&self, label: &str, value: &str) -> Result<PathBuf, ValidationError> {
        if value.contains('\0') {
            return Err(ValidationError::PathEscapesProject {
                param: label.to_string(),
                path: value.to_string(),
            });
        }

        let candidate = {
            let p = Path::new(value);
            if p.is_absolute() {
                p.to_path_buf()
            } else {
                self.root.join(p)
            }
        };

        let canonical =
            candidate
                .canonicalize()
                .map_err(|_| ValidationError::PathNotFound {
                    param: label.to_string(),
                    path: value.to_string(),
                })?;

        // Component-wise ancestor check on the fully resolved path.
        if !canonical.starts_with(&self.root) {
            return Err(ValidationError::PathEscapesProject {
                param: label.to_string(),
                path: value.to_string(),
            });
        }

        Ok(canonical)
    }
}
