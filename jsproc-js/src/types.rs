//! Types for engine construction

use crate::permissions::AccessPermissions;
use crate::JsExecutionError;

/// Longest workspace identity accepted
pub const MAX_WORKSPACE_LEN: usize = 128;

/// Options used to build a [`crate::JsEngine`]
#[derive(Debug, Clone)]
pub struct EngineOptions {
    /// Workspace (session) identity, exposed as `process.workspace`
    pub workspace: String,

    /// Sandbox flags, exposed as `process.permissions`
    pub permissions: AccessPermissions,

    /// Script evaluated once the globals are installed
    pub bootstrap_script: Option<String>,

    /// Install the `console` global
    pub enable_console: bool,

    /// Install `setTimeout` and friends
    pub enable_timers: bool,
}

impl EngineOptions {
    pub fn new(workspace: impl Into<String>) -> Self {
        Self {
            workspace: workspace.into(),
            permissions: AccessPermissions::default(),
            bootstrap_script: None,
            enable_console: true,
            enable_timers: true,
        }
    }

    pub fn with_permissions(mut self, permissions: AccessPermissions) -> Self {
        self.permissions = permissions;
        self
    }

    pub fn with_bootstrap(mut self, script: impl Into<String>) -> Self {
        self.bootstrap_script = Some(script.into());
        self
    }

    pub fn with_console(mut self, enabled: bool) -> Self {
        self.enable_console = enabled;
        self
    }

    pub fn with_timers(mut self, enabled: bool) -> Self {
        self.enable_timers = enabled;
        self
    }
}

/// Check a workspace identity: 1 to 128 characters from `[A-Za-z0-9_.-]`,
/// and not `.` or `..`
pub fn validate_workspace_id(workspace: &str) -> Result<(), JsExecutionError> {
    let invalid = |reason: &str| JsExecutionError::InvalidWorkspace {
        workspace: workspace.to_string(),
        reason: reason.to_string(),
    };

    if workspace.is_empty() {
        return Err(invalid("identity cannot be empty"));
    }
    if workspace.len() > MAX_WORKSPACE_LEN {
        return Err(invalid("identity is longer than 128 characters"));
    }
    if workspace == "." || workspace == ".." {
        return Err(invalid("identity cannot be a relative path component"));
    }
    if !workspace
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || matches!(c, '_' | '.' | '-'))
    {
        return Err(invalid("identity may only contain letters, digits, '_', '.' and '-'"));
    }

    Ok(())
}
