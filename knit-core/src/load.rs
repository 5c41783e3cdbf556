//! Loading a [`Workspace`] from disk.

use std::path::{Path, PathBuf};

use anyhow::Context;
use knit_cfg::ConfigSet;

use crate::Workspace;
use crate::cfgs::WORKSPACE_FILENAME;
use crate::defs::WorkspaceSpec;

/// Returns the path of the workspace file within `root`.
pub fn workspace_path(root: &Path, configs: &ConfigSet) -> PathBuf {
    let filename = WORKSPACE_FILENAME.read(configs);
    root.join(filename.as_str())
}

/// Read, parse, and validate the workspace rooted at `root`.
pub fn load_workspace(root: &Path, configs: &ConfigSet) -> Result<Workspace, anyhow::Error> {
    let path = workspace_path(root, configs);
    tracing::info!(?path, "reading workspace spec");

    let raw = std::fs::read_to_string(&path)
        .with_context(|| format!("failed to read {}", path.display()))?;
    let spec = WorkspaceSpec::from_toml(&raw)
        .with_context(|| format!("failed to parse {}", path.display()))?;
    let workspace = spec.into_builder().build_with(configs)?;

    Ok(workspace)
}
