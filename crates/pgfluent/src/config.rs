use crate::error::{OrmError, OrmResult};
use serde::Deserialize;

/// Configuration shared by query sessions and repositories.
///
/// Can be built in code or deserialized from application config; missing keys take the
/// defaults below.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct QbConfig {
    /// Page size used by repositories when none is given.
    pub default_max_results: i64,
    /// Page size used by `EntityQb::paginate_default`.
    pub default_per_page: i64,
    /// Base name for generated placeholders (`p0`, `p1`, ...).
    pub param_prefix: String,
    /// chrono format for `date` fields.
    pub date_format: String,
    /// chrono format for `time` fields.
    pub time_format: String,
    /// chrono format for `datetime` / `datetimetz` fields.
    pub datetime_format: String,
    /// Coerce dynamic-call arguments to the field's declared type.
    pub coerce_arguments: bool,
    /// Allow UPDATE / DELETE sessions without a WHERE clause to execute.
    pub allow_unfiltered_mutations: bool,
}

impl Default for QbConfig {
    fn default() -> Self {
        Self {
            default_max_results: 50,
            default_per_page: 10,
            param_prefix: "p".to_string(),
            date_format: "%Y-%m-%d".to_string(),
            time_format: "%H:%M:%S".to_string(),
            datetime_format: "%Y-%m-%d %H:%M:%S".to_string(),
            coerce_arguments: true,
            allow_unfiltered_mutations: false,
        }
    }
}

impl QbConfig {
    /// Create a new configuration with defaults.
    pub fn new() -> Self {
        Self::default()
    }

    pub fn default_max_results(mut self, max_results: i64) -> Self {
        self.default_max_results = max_results;
        self
    }

    pub fn default_per_page(mut self, per_page: i64) -> Self {
        self.default_per_page = per_page;
        self
    }

    pub fn param_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.param_prefix = prefix.into();
        self
    }

    pub fn date_format(mut self, format: impl Into<String>) -> Self {
        self.date_format = format.into();
        self
    }

    pub fn time_format(mut self, format: impl Into<String>) -> Self {
        self.time_format = format.into();
        self
    }

    pub fn datetime_format(mut self, format: impl Into<String>) -> Self {
        self.datetime_format = format.into();
        self
    }

    pub fn coerce_arguments(mut self, enabled: bool) -> Self {
        self.coerce_arguments = enabled;
        self
    }

    pub fn allow_unfiltered_mutations(mut self, allowed: bool) -> Self {
        self.allow_unfiltered_mutations = allowed;
        self
    }

    /// Check values that would otherwise fail later at query time.
    pub fn validate(&self) -> OrmResult<()> {
        if self.default_max_results < 1 {
            return Err(OrmError::invalid_argument(
                "default_max_results must be a positive integer",
            ));
        }
        if self.default_per_page < 1 {
            return Err(OrmError::invalid_argument(
                "default_per_page must be a positive integer",
            ));
        }
        let prefix_ok = self
            .param_prefix
            .chars()
            .next()
            .is_some_and(|c| c == '_' || c.is_ascii_alphabetic())
            && self
                .param_prefix
                .chars()
                .all(|c| c == '_' || c.is_ascii_alphanumeric());
        if !prefix_ok {
            return Err(OrmError::invalid_argument(format!(
                "param_prefix '{}' is not a valid placeholder name",
                self.param_prefix
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_repository_conventions() {
        let config = QbConfig::default();
        assert_eq!(config.default_max_results, 50);
        assert_eq!(config.default_per_page, 10);
        assert_eq!(config.param_prefix, "p");
        assert!(config.validate().is_ok());
    }

    #[test]
    fn deserializes_partial_config() {
        let config: QbConfig =
            serde_json::from_str(r#"{"param_prefix": "arg", "default_per_page": 25}"#).unwrap();
        assert_eq!(config.param_prefix, "arg");
        assert_eq!(config.default_per_page, 25);
        assert_eq!(config.date_format, "%Y-%m-%d");
    }

    #[test]
    fn rejects_unusable_values() {
        assert!(QbConfig::new().default_per_page(0).validate().is_err());
        assert!(QbConfig::new().param_prefix("1x").validate().is_err());
        assert!(QbConfig::new().param_prefix("").validate().is_err());
    }
}
