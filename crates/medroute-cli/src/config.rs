//! CLI configuration from environment.

use std::env;

use medroute_core::SearchConfig;

const DEFAULT_LOG_FILTER: &str = "medroute=info";

#[derive(Debug, Clone)]
pub struct Config {
    /// `EnvFilter` directive string.
    pub log_filter: String,
    pub log_json: bool,
    pub search: SearchConfig,
}

impl Config {
    pub fn from_env() -> Self {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Build from any key lookup; unparsable values fall back to defaults.
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = SearchConfig::default();
        Self {
            log_filter: lookup("MEDROUTE_LOG").unwrap_or_else(|| DEFAULT_LOG_FILTER.to_string()),
            log_json: lookup("MEDROUTE_LOG_JSON")
                .map(|s| parse_flag(&s))
                .unwrap_or(false),
            search: SearchConfig {
                max_expansions: lookup("MEDROUTE_MAX_EXPANSIONS")
                    .and_then(|s| s.parse().ok())
                    .unwrap_or(defaults.max_expansions),
                heuristic_multiplier: lookup("MEDROUTE_HEURISTIC_MULTIPLIER")
                    .and_then(|s| s.parse().ok())
                    .filter(|m: &f64| valid_multiplier(*m))
                    .unwrap_or(defaults.heuristic_multiplier),
            },
        }
    }

    /// Apply command-line overrides on top of the environment.
    pub fn with_overrides(
        mut self,
        max_expansions: Option<usize>,
        heuristic_multiplier: Option<f64>,
        log_json: bool,
    ) -> Self {
        if let Some(limit) = max_expansions {
            self.search.max_expansions = limit;
        }
        if let Some(multiplier) = heuristic_multiplier.filter(|m| valid_multiplier(*m)) {
            self.search.heuristic_multiplier = multiplier;
        }
        self.log_json |= log_json;
        self
    }
}

fn valid_multiplier(multiplier: f64) -> bool {
    multiplier.is_finite() && multiplier > 0.0
}

fn parse_flag(value: &str) -> bool {
    matches!(
        value.trim().to_ascii_lowercase().as_str(),
        "1" | "true" | "yes" | "on"
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn defaults_without_environment() {
        let config = Config::from_lookup(|_| None);
        assert_eq!(config.log_filter, "medroute=info");
        assert!(!config.log_json);
        assert_eq!(config.search.max_expansions, 50_000);
        assert_eq!(config.search.heuristic_multiplier, 1.5);
    }

    #[test]
    fn reads_environment_values() {
        let config = Config::from_lookup(lookup_from(&[
            ("MEDROUTE_LOG", "medroute_core=debug"),
            ("MEDROUTE_LOG_JSON", "TRUE"),
            ("MEDROUTE_MAX_EXPANSIONS", "1200"),
            ("MEDROUTE_HEURISTIC_MULTIPLIER", "1.0"),
        ]));
        assert_eq!(config.log_filter, "medroute_core=debug");
        assert!(config.log_json);
        assert_eq!(config.search.max_expansions, 1200);
        assert_eq!(config.search.heuristic_multiplier, 1.0);
    }

    #[test]
    fn bad_values_fall_back() {
        let config = Config::from_lookup(lookup_from(&[
            ("MEDROUTE_MAX_EXPANSIONS", "lots"),
            ("MEDROUTE_HEURISTIC_MULTIPLIER", "-2"),
        ]));
        assert_eq!(config.search.max_expansions, 50_000);
        assert_eq!(config.search.heuristic_multiplier, 1.5);
    }

    #[test]
    fn flags_override_environment() {
        let config = Config::from_lookup(lookup_from(&[("MEDROUTE_MAX_EXPANSIONS", "1200")]))
            .with_overrides(Some(99), Some(2.0), true);
        assert_eq!(config.search.max_expansions, 99);
        assert_eq!(config.search.heuristic_multiplier, 2.0);
        assert!(config.log_json);
    }

    #[test]
    fn invalid_multiplier_flags_are_ignored() {
        let env = lookup_from(&[("MEDROUTE_HEURISTIC_MULTIPLIER", "1.2")]);
        for bad in [f64::NAN, f64::INFINITY, -1.0, 0.0] {
            let config = Config::from_lookup(&env).with_overrides(None, Some(bad), false);
            assert_eq!(config.search.heuristic_multiplier, 1.2);
        }
    }
}
