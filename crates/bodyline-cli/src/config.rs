//! Configuration loading.

use std::path::{Path, PathBuf};

use figment::Figment;
use figment::providers::{Env, Format, Serialized, Toml};
use serde::{Deserialize, Serialize};

/// Application configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Config {
    /// Write `<output>.errors.log` next to the body file.
    pub error_log: bool,

    /// Default for `body --sid`.
    pub short_sid: bool,

    /// Default for `process --strict`.
    pub strict: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            error_log: true,
            short_sid: false,
            strict: false,
        }
    }
}

impl Config {
    /// Loads configuration, optionally from a specific file.
    ///
    /// Later sources win: defaults, the user config file, `config_path`,
    /// then `BODYLINE_*` environment variables.
    #[expect(
        clippy::result_large_err,
        reason = "figment::Error is large but only returned at startup"
    )]
    pub fn load_from(config_path: Option<&Path>) -> Result<Self, figment::Error> {
        let mut figment = Figment::from(Serialized::defaults(Self::default()));

        if let Some(config_dir) = dirs_config_path() {
            figment = figment.merge(Toml::file(config_dir.join("config.toml")));
        }

        if let Some(path) = config_path {
            figment = figment.merge(Toml::file(path));
        }

        figment.merge(Env::prefixed("BODYLINE_")).extract()
    }
}

/// Returns the platform-specific config directory for bodyline.
fn dirs_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|p| p.join("bodyline"))
}

#[cfg(test)]
mod tests {
    use figment::Jail;

    use super::*;

    #[test]
    fn defaults_enable_error_log() {
        let config = Config::default();
        assert!(config.error_log);
        assert!(!config.short_sid);
        assert!(!config.strict);
    }

    #[test]
    fn config_dir_ends_with_bodyline() {
        let path = dirs_config_path().unwrap();
        assert_eq!(path.file_name().unwrap(), "bodyline");
    }

    #[test]
    fn file_then_env_override_defaults() {
        Jail::expect_with(|jail| {
            jail.create_file("bodyline.toml", "short_sid = true\nerror_log = false\n")?;
            jail.set_env("BODYLINE_STRICT", "true");
            jail.set_env("BODYLINE_SHORT_SID", "false");

            let config = Config::load_from(Some(Path::new("bodyline.toml")))?;
            assert_eq!(
                config,
                Config {
                    error_log: false,
                    short_sid: false,
                    strict: true,
                }
            );
            Ok(())
        });
    }
}
