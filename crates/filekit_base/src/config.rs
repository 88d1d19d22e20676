use std::path::Path;

use serde::Deserialize;

use crate::{FilekitError, FilekitResult, ResultExt};

/// Settings shared by both file backends.
///
/// Every field has a default, so an empty TOML document is a valid configuration.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct FilekitConfig {
    /// Command prefix used when an operation asks for elevated privileges.
    pub privilege_escalation_command: Vec<String>,
    /// Shell used by the command backend for helpers that need redirection or `&&`.
    pub shell: String,
    /// Program printing the file type description (`file -b <path>`).
    pub file_command: String,
    /// Number of overwrite passes before a secure delete removes the file.
    pub secure_delete_passes: u32,
}

impl Default for FilekitConfig {
    fn default() -> Self {
        Self {
            privilege_escalation_command: vec!["sudo".to_string()],
            shell: "sh".to_string(),
            file_command: "file".to_string(),
            secure_delete_passes: 1,
        }
    }
}

impl FilekitConfig {
    /// Parse a configuration from TOML text.
    pub fn from_toml_str(content: &str) -> FilekitResult<Self> {
        let config: Self = toml::from_str(content)
            .map_err(|e| crate::err!("Failed to parse filekit config: {}", e))?;
        if config.secure_delete_passes == 0 {
            return Err(FilekitError::invalid_argument(
                "secure_delete_passes must be at least 1",
            ));
        }
        if config.shell.is_empty() || config.file_command.is_empty() {
            return Err(FilekitError::invalid_argument(
                "shell and file_command must not be empty",
            ));
        }
        Ok(config)
    }

    /// Returns `command` prefixed with the privilege escalation wrapper if `use_sudo` is set.
    pub fn wrap_privileged(&self, use_sudo: bool, command: Vec<String>) -> Vec<String> {
        if !use_sudo {
            return command;
        }
        self.privilege_escalation_command
            .iter()
            .cloned()
            .chain(command)
            .collect()
    }
}

/// Load the configuration from a TOML file.
pub fn load_config(path: &Path) -> FilekitResult<FilekitConfig> {
    let content = std::fs::read_to_string(path).map_err(|e| FilekitError::file_error(path, e))?;
    FilekitConfig::from_toml_str(&content)
        .with_context(|| format!("Failed to load config from {}", path.display()))
}
