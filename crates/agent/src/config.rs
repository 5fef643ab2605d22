use crate::settings::ThresholdField;

/// Daemon configuration loaded from environment variables.
///
/// Every value is optional. Set values are written to the matching setting
/// endpoint once the monitor has started, exactly as an operator write
/// would be, so they follow the same parsing rules.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AgentConfig {
    /// Initial text for `max_proc`.
    pub max_proc: Option<String>,
    /// Initial text for `max_mem_percent`.
    pub max_mem_percent: Option<String>,
    /// Initial text for `handler_name`.
    pub handler: Option<String>,
}

impl AgentConfig {
    /// Load configuration from the process environment.
    ///
    /// | Env Var                     | Endpoint          |
    /// |-----------------------------|-------------------|
    /// | `LOADWATCH_MAX_PROC`        | `max_proc`        |
    /// | `LOADWATCH_MAX_MEM_PERCENT` | `max_mem_percent` |
    /// | `LOADWATCH_HANDLER`         | `handler_name`    |
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load configuration through an arbitrary key lookup.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        Self {
            max_proc: lookup("LOADWATCH_MAX_PROC"),
            max_mem_percent: lookup("LOADWATCH_MAX_MEM_PERCENT"),
            handler: lookup("LOADWATCH_HANDLER"),
        }
    }

    /// `(endpoint, text)` pairs to write at startup, in registration order.
    pub fn initial_writes(&self) -> Vec<(&'static str, &str)> {
        ThresholdField::ALL
            .into_iter()
            .filter_map(|field| {
                let value = match field {
                    ThresholdField::MaxProc => self.max_proc.as_deref(),
                    ThresholdField::MaxMemPercent => self.max_mem_percent.as_deref(),
                    ThresholdField::HandlerName => self.handler.as_deref(),
                }?;
                Some((field.name(), value))
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn empty_environment_writes_nothing() {
        let config = AgentConfig::from_lookup(|_| None);
        assert_eq!(config, AgentConfig::default());
        assert!(config.initial_writes().is_empty());
    }

    #[test]
    fn set_values_map_to_endpoints_in_order() {
        let config = AgentConfig::from_lookup(lookup_from(&[
            ("LOADWATCH_HANDLER", "/usr/bin/notifyd"),
            ("LOADWATCH_MAX_PROC", "150abc"),
        ]));

        assert_eq!(
            config.initial_writes(),
            vec![("max_proc", "150abc"), ("handler_name", "/usr/bin/notifyd")]
        );
    }

    #[test]
    fn values_are_kept_verbatim() {
        let config = AgentConfig::from_lookup(lookup_from(&[("LOADWATCH_MAX_MEM_PERCENT", " 80 ")]));
        assert_eq!(config.max_mem_percent.as_deref(), Some(" 80 "));
    }
}
