//! Integration tests for TOML + environment configuration loading.
//!
//! Uses `figment::Jail` for sandboxed file and env var manipulation.

use figment::{
    Figment, Jail,
    providers::{Env, Format, Serialized, Toml},
};
use pretty_assertions::assert_eq;
use verdant_config::{ConfigError, VerdantConfig};

fn layered(file: &str) -> Figment {
    Figment::from(Serialized::defaults(VerdantConfig::default()))
        .merge(Toml::file(file))
        .merge(Env::prefixed("VERDANT_").split("__"))
}

#[test]
fn loads_sections_from_toml() {
    Jail::expect_with(|jail| {
        jail.create_file(
            "config.toml",
            r#"
[store]
path = "/var/lib/verdant/field.db"
max_write_attempts = 6

[orchestrator]
modality_timeout_ms = 2500
low_battery_threshold = 0.15
persist_actions = false

[recommendations]
max_actions = 4
urban_keywords = ["city", "suburb"]

[catalogue]
updates_path = "subjects-extra.toml"
"#,
        )?;

        let config = VerdantConfig::from_figment(&layered("config.toml"))
            .map_err(|e| figment::Error::from(e.to_string()))?;

        assert_eq!(config.store.path, "/var/lib/verdant/field.db");
        assert_eq!(config.store.max_write_attempts, 6);
        assert_eq!(config.orchestrator.modality_timeout_ms, 2500);
        assert!(!config.orchestrator.persist_actions);
        assert_eq!(config.recommendations.max_actions, 4);
        assert_eq!(config.recommendations.urban_keywords, vec!["city", "suburb"]);
        assert!(config.catalogue.has_updates());
        // untouched fields keep their defaults
        assert_eq!(config.store.retry_base_delay_ms, 50);
        assert!(config.recommendations.coastal_keywords.iter().any(|k| k == "coast"));
        Ok(())
    });
}

#[test]
fn env_overrides_toml() {
    Jail::expect_with(|jail| {
        jail.create_file(
            "config.toml",
            r#"
[store]
path = "from-toml.db"
"#,
        )?;
        jail.set_env("VERDANT_STORE__PATH", "from-env.db");
        jail.set_env("VERDANT_RECOMMENDATIONS__MAX_ACTIONS", "3");

        let config: VerdantConfig = layered("config.toml").extract()?;
        assert_eq!(config.store.path, "from-env.db");
        assert_eq!(config.recommendations.max_actions, 3);
        Ok(())
    });
}

#[test]
fn load_reads_project_local_file() {
    Jail::expect_with(|jail| {
        jail.create_dir(".verdant")?;
        jail.create_file(
            ".verdant/config.toml",
            r#"
[general]
default_limit = 50
"#,
        )?;

        let config = VerdantConfig::load().map_err(|e| figment::Error::from(e.to_string()))?;
        assert_eq!(config.general.default_limit, 50);
        Ok(())
    });
}

#[test]
fn out_of_range_values_fail_validation() {
    Jail::expect_with(|jail| {
        jail.set_env("VERDANT_ORCHESTRATOR__SEPARATION_MARGIN", "1.5");

        let result = VerdantConfig::load();
        assert!(matches!(result, Err(ConfigError::InvalidValue { .. })));
        Ok(())
    });
}
