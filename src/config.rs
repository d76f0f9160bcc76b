use crate::core::{Result, StoreError};

/// What to do when an operation targets an identifier that already has one in flight.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ConflictPolicy {
    /// Wait until the in-flight operation resolves, then run.
    #[default]
    Queue,
    /// Fail fast with [`StoreError::OperationInFlight`].
    Reject,
}

/// Optimistic controller configuration
#[derive(Debug, Clone)]
pub struct ControllerConfig {
    /// Handling of overlapping operations on one identifier
    pub conflict_policy: ConflictPolicy,

    /// Prefix of synthesized temporary identifiers
    pub temp_id_prefix: String,

    /// Last-error text used when a failure carries no message
    pub default_error_message: String,

    /// Whether a controller without an update operation is allowed.
    /// When it is, optimistic results are final.
    pub allow_local_only: bool,
}

impl Default for ControllerConfig {
    fn default() -> Self {
        Self::new()
    }
}

impl ControllerConfig {
    pub fn new() -> Self {
        Self {
            conflict_policy: ConflictPolicy::Queue,
            temp_id_prefix: "temp".to_string(),
            default_error_message: "Operation failed".to_string(),
            allow_local_only: true,
        }
    }

    /// Set the conflict policy
    pub fn conflict_policy(mut self, policy: ConflictPolicy) -> Self {
        self.conflict_policy = policy;
        self
    }

    /// Set the temporary id prefix
    pub fn temp_id_prefix(mut self, prefix: &str) -> Self {
        self.temp_id_prefix = prefix.to_string();
        self
    }

    /// Set the fallback error message
    pub fn default_error_message(mut self, message: &str) -> Self {
        self.default_error_message = message.to_string();
        self
    }

    /// Allow or forbid running without an update operation
    pub fn allow_local_only(mut self, allow: bool) -> Self {
        self.allow_local_only = allow;
        self
    }

    /// Validate configuration
    pub fn validate(&self) -> std::result::Result<(), String> {
        if self.temp_id_prefix.trim().is_empty() {
            return Err("temp_id_prefix cannot be empty".to_string());
        }

        if self.default_error_message.trim().is_empty() {
            return Err("default_error_message cannot be empty".to_string());
        }

        Ok(())
    }

    /// Validate against whether an update operation was supplied.
    pub(crate) fn validate_for(&self, has_operation: bool) -> Result<()> {
        self.validate().map_err(StoreError::Configuration)?;
        if !has_operation && !self.allow_local_only {
            return Err(StoreError::Configuration(
                "no update operation configured and local-only mode is disabled".to_string(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = ControllerConfig::default();
        assert_eq!(config.conflict_policy, ConflictPolicy::Queue);
        assert_eq!(config.temp_id_prefix, "temp");
        assert!(config.allow_local_only);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_empty_prefix_rejected() {
        let config = ControllerConfig::new().temp_id_prefix("  ");
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_local_only_disabled_requires_operation() {
        let config = ControllerConfig::new().allow_local_only(false);
        assert!(matches!(
            config.validate_for(false),
            Err(StoreError::Configuration(_))
        ));
        assert!(config.validate_for(true).is_ok());
    }
}
