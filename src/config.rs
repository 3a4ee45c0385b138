use crate::vault::VaultOptions;
use crate::vault::crypto::kdf::{self, KdfAlgorithm, KdfParams};
use dirs::{config_dir, data_dir};
use serde::{Deserialize, Serialize};
use std::env;
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};

const CONFIG_ENV: &str = "PWVAULT_CONFIG";
const VAULT_DIR_ENV: &str = "PWVAULT_DIR";
const TEST_KDF_ENV: &str = "PWVAULT_TEST_KDF";
const APP_DIR: &str = "pwvault";
const CONFIG_FILE_NAME: &str = "config.toml";

#[derive(Debug)]
pub enum ConfigError {
    ConfigDirUnavailable,
    VaultDirUnavailable,
    Io(std::io::Error),
    Parse(toml::de::Error),
    UnknownKdfAlgorithm(String),
    InvalidIterations(u32),
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::ConfigDirUnavailable => {
                write!(f, "unable to determine configuration directory")
            }
            ConfigError::VaultDirUnavailable => write!(
                f,
                "unable to determine vault directory; pass --dir or set {VAULT_DIR_ENV}"
            ),
            ConfigError::Io(err) => write!(f, "filesystem error: {err}"),
            ConfigError::Parse(err) => write!(f, "failed to parse config: {err}"),
            ConfigError::UnknownKdfAlgorithm(name) => {
                write!(f, "unsupported kdf algorithm '{name}'")
            }
            ConfigError::InvalidIterations(count) => {
                write!(f, "kdf iterations must be greater than zero (got {count})")
            }
        }
    }
}

impl std::error::Error for ConfigError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ConfigError::Io(err) => Some(err),
            ConfigError::Parse(err) => Some(err),
            _ => None,
        }
    }
}

/// On-disk configuration; every key is optional.
#[derive(Debug, Deserialize, Default, Clone, PartialEq, Eq)]
#[serde(default, deny_unknown_fields)]
pub struct FileConfig {
    pub vault_dir: Option<PathBuf>,
    pub min_password_length: Option<usize>,
    pub kdf: KdfSection,
}

#[derive(Debug, Deserialize, Default, Clone, PartialEq, Eq)]
#[serde(default, deny_unknown_fields)]
pub struct KdfSection {
    pub algorithm: Option<String>,
    pub iterations: Option<u32>,
}

/// Where a resolved vault directory came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum DirSource {
    Flag,
    Env,
    ConfigFile,
    Default,
}

/// Fully resolved settings for one invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Settings {
    pub vault_dir: PathBuf,
    pub vault_dir_source: DirSource,
    pub options: VaultOptions,
    pub config_path: PathBuf,
}

/// Inputs other than the config file that feed [`Settings::resolve`].
#[derive(Debug, Clone, Default)]
pub struct Overrides {
    pub dir_flag: Option<PathBuf>,
    pub dir_env: Option<PathBuf>,
    pub test_kdf: bool,
    pub default_data_dir: Option<PathBuf>,
}

impl Overrides {
    pub fn from_env(dir_flag: Option<&Path>) -> Self {
        Self {
            dir_flag: dir_flag.map(Path::to_path_buf),
            dir_env: env::var_os(VAULT_DIR_ENV)
                .filter(|v| !v.is_empty())
                .map(PathBuf::from),
            test_kdf: env::var_os(TEST_KDF_ENV).is_some(),
            default_data_dir: data_dir().map(|dir| dir.join(APP_DIR)),
        }
    }
}

impl Settings {
    /// Load the config file and apply the environment and `--dir`.
    pub fn load(dir_flag: Option<&Path>) -> Result<Self, ConfigError> {
        let path = config_path()?;
        let file = load_config(&path)?;
        Self::resolve(file, Overrides::from_env(dir_flag), path)
    }

    pub fn resolve(
        file: FileConfig,
        overrides: Overrides,
        config_path: PathBuf,
    ) -> Result<Self, ConfigError> {
        let (vault_dir, vault_dir_source) = if let Some(dir) = overrides.dir_flag {
            (dir, DirSource::Flag)
        } else if let Some(dir) = overrides.dir_env {
            (dir, DirSource::Env)
        } else if let Some(dir) = file.vault_dir {
            (dir, DirSource::ConfigFile)
        } else {
            let dir = overrides
                .default_data_dir
                .ok_or(ConfigError::VaultDirUnavailable)?;
            (dir, DirSource::Default)
        };

        let mut kdf = KdfParams::recommended();
        if let Some(name) = file.kdf.algorithm {
            kdf.algorithm = name
                .parse::<KdfAlgorithm>()
                .map_err(|_| ConfigError::UnknownKdfAlgorithm(name))?;
        }
        if let Some(iterations) = file.kdf.iterations {
            if iterations == 0 {
                return Err(ConfigError::InvalidIterations(iterations));
            }
            kdf.iterations = iterations;
        }
        if overrides.test_kdf {
            kdf = KdfParams::for_tests();
        }

        let options = VaultOptions {
            kdf,
            min_password_length: file
                .min_password_length
                .unwrap_or(crate::vault::DEFAULT_MIN_PASSWORD_LEN),
        };

        Ok(Self {
            vault_dir,
            vault_dir_source,
            options,
            config_path,
        })
    }

    pub fn uses_legacy_iterations(&self) -> bool {
        self.options.kdf.iterations <= kdf::LEGACY_ITERATIONS
    }
}

pub fn config_path() -> Result<PathBuf, ConfigError> {
    if let Some(path) = env::var_os(CONFIG_ENV).filter(|v| !v.is_empty()) {
        return Ok(PathBuf::from(path));
    }

    let mut dir = config_dir().ok_or(ConfigError::ConfigDirUnavailable)?;
    dir.push(APP_DIR);
    dir.push(CONFIG_FILE_NAME);
    Ok(dir)
}

pub fn load_config(path: &Path) -> Result<FileConfig, ConfigError> {
    match fs::read_to_string(path) {
        Ok(contents) => toml::from_str(&contents).map_err(ConfigError::Parse),
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(FileConfig::default()),
        Err(err) => Err(ConfigError::Io(err)),
    }
}
