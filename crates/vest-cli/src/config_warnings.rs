//! Detect `VEST_*` variables that figment silently ignored.

use vest_config::VestConfig;

/// Log a warning for each likely mistyped environment variable.
pub fn warn_unconfigured(config: &VestConfig) {
    for warning in collect_warnings(config, std::env::vars().map(|(key, _)| key)) {
        tracing::warn!("{warning}");
    }
}

/// A section still equal to its defaults while `VEST_<SECTION>_<FIELD>` (one
/// underscore) variables exist means the separator was mistyped.
fn collect_warnings<I>(config: &VestConfig, env_keys: I) -> Vec<String>
where
    I: IntoIterator<Item = String>,
{
    let defaults = VestConfig::default();
    let keys: Vec<String> = env_keys.into_iter().collect();

    let sections = [
        ("database", config.database == defaults.database, "VEST_DATABASE__URL"),
        ("server", config.server == defaults.server, "VEST_SERVER__PORT"),
        ("auth", config.auth == defaults.auth, "VEST_AUTH__JWT_SECRET"),
        ("mail", config.mail == defaults.mail, "VEST_MAIL__API_KEY"),
        ("general", config.general == defaults.general, "VEST_GENERAL__CURRENCY"),
    ];

    sections
        .into_iter()
        .filter(|(name, untouched, _)| *untouched && has_single_underscore_key(&keys, name))
        .map(|(name, _, example)| {
            format!(
                "{name} config is still default while VEST_{upper}_* variables exist. \
                 Use double underscores (example: {example}).",
                upper = name.to_ascii_uppercase()
            )
        })
        .collect()
}

fn has_single_underscore_key(keys: &[String], section: &str) -> bool {
    let prefix = format!("VEST_{}_", section.to_ascii_uppercase());
    keys.iter()
        .any(|key| key.starts_with(&prefix) && !key[prefix.len()..].starts_with('_'))
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    fn keys(names: &[&str]) -> Vec<String> {
        names.iter().map(ToString::to_string).collect()
    }

    #[test]
    fn single_underscore_on_default_section_warns() {
        let warnings = collect_warnings(&VestConfig::default(), keys(&["VEST_AUTH_JWT_SECRET"]));
        assert_eq!(warnings.len(), 1);
        assert!(warnings[0].contains("VEST_AUTH__JWT_SECRET"));
    }

    #[test]
    fn double_underscore_is_fine() {
        let warnings = collect_warnings(&VestConfig::default(), keys(&["VEST_MAIL__API_KEY", "VEST_LOG"]));
        assert!(warnings.is_empty());
    }

    #[test]
    fn configured_section_is_not_flagged() {
        let mut config = VestConfig::default();
        config.auth.jwt_secret = "x".repeat(32);
        let warnings = collect_warnings(&config, keys(&["VEST_AUTH_TTL"]));
        assert!(warnings.is_empty());
    }
}
