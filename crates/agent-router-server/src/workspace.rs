// agent-router-server/src/workspace.rs
// ============================================================================
// Module: Workspace Registry
// Description: Discovery and path resolution for project workspaces.
// Purpose: Back the workspace gate and confine file access to a workspace.
// Dependencies: serde
// ============================================================================

//! ## Overview
//! A workspace is any directory directly under the workspace root whose name
//! is a valid id. [`WorkspaceRegistry::list`] is the only definition of that
//! set; membership checks and the ids reported on a gate failure both come
//! from it. The registry scans the root on every query, so workspaces created
//! at runtime are visible immediately. Relative paths are normalized lexically
//! and may never climb out of their workspace.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::fs;
use std::path::Component;
use std::path::Path;
use std::path::PathBuf;

use serde::Serialize;

use crate::errors::HandlerError;

// ============================================================================
// SECTION: Types
// ============================================================================

/// Registered workspace.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct WorkspaceEntry {
    /// Workspace identifier (directory name).
    pub id: String,
    /// Absolute workspace directory.
    pub root: String,
}

/// Workspaces under a root directory.
#[derive(Debug, Clone)]
pub struct WorkspaceRegistry {
    /// Directory holding one subdirectory per workspace.
    root: PathBuf,
}

impl WorkspaceRegistry {
    /// Creates a registry over `root`.
    #[must_use]
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
        }
    }

    /// Returns the workspace root.
    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Lists workspaces sorted by id. An unreadable root yields an empty list.
    #[must_use]
    pub fn list(&self) -> Vec<WorkspaceEntry> {
        let Ok(entries) = fs::read_dir(&self.root) else {
            return Vec::new();
        };
        let mut workspaces: Vec<WorkspaceEntry> = entries
            .filter_map(Result::ok)
            .filter_map(|entry| {
                let id = entry.file_name().to_str()?.to_string();
                let path = entry.path();
                if !is_valid_id(&id) || !path.is_dir() {
                    return None;
                }
                Some(WorkspaceEntry {
                    root: path.display().to_string(),
                    id,
                })
            })
            .collect();
        workspaces.sort_by(|a, b| a.id.cmp(&b.id));
        workspaces
    }

    /// Returns the registered workspace ids.
    #[must_use]
    pub fn ids(&self) -> Vec<String> {
        self.list().into_iter().map(|entry| entry.id).collect()
    }

    /// Returns true when `id` is one of [`Self::list`].
    #[must_use]
    pub fn contains(&self, id: &str) -> bool {
        is_valid_id(id) && self.list().iter().any(|entry| entry.id == id)
    }

    /// Returns the directory for workspace `id`.
    ///
    /// # Errors
    ///
    /// Returns [`HandlerError::InvalidInput`] when `id` is not a plain name.
    pub fn workspace_dir(&self, id: &str) -> Result<PathBuf, HandlerError> {
        if !is_valid_id(id) {
            return Err(HandlerError::InvalidInput(format!("Invalid workspace name: '{id}'")));
        }
        Ok(self.root.join(id))
    }

    /// Resolves `relative` inside workspace `id`.
    ///
    /// # Errors
    ///
    /// Returns [`HandlerError::InvalidInput`] for a malformed workspace id and
    /// [`HandlerError::PermissionDenied`] when the path escapes the workspace.
    pub fn resolve(&self, id: &str, relative: &str) -> Result<PathBuf, HandlerError> {
        let base = self.workspace_dir(id)?;
        let mut depth = 0_usize;
        let mut resolved = base;
        for component in Path::new(relative).components() {
            match component {
                Component::CurDir => {}
                Component::Normal(part) => {
                    resolved.push(part);
                    depth += 1;
                }
                Component::ParentDir if depth > 0 => {
                    resolved.pop();
                    depth -= 1;
                }
                Component::ParentDir | Component::RootDir | Component::Prefix(_) => {
                    return Err(HandlerError::PermissionDenied(format!(
                        "Path traversal blocked: '{relative}'"
                    )));
                }
            }
        }
        Ok(resolved)
    }
}

/// Returns true for a single, non-hidden path component.
fn is_valid_id(id: &str) -> bool {
    !id.is_empty() && !id.starts_with('.') && !id.contains('/') && !id.contains('\\')
}

// ============================================================================
// SECTION: Tests
// ============================================================================
