use crate::config::policy::DeletePolicy;
use anyhow::{Context, Result, anyhow};
use log::{debug, warn};
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;

/// Scratch root used when nothing else is configured, relative to the working directory.
pub const DEFAULT_ROOT: &str = "target/tmp/unittest";

pub const CONFIG_ENV: &str = "TEST_SCRATCH_CONFIG";
pub const ROOT_ENV: &str = "TEST_SCRATCH_ROOT";
pub const POLICY_ENV: &str = "TEST_SCRATCH_DELETE_POLICY";

const CONFIG_DIR_NAME: &str = "test-scratch";
const CONFIG_FILE_NAME: &str = "config.toml";

/// Resolved values every manager is constructed from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScratchConfig {
    pub root: PathBuf,
    pub delete_policy: DeletePolicy,
}

impl Default for ScratchConfig {
    fn default() -> Self {
        Self {
            root: PathBuf::from(DEFAULT_ROOT),
            delete_policy: DeletePolicy::default(),
        }
    }
}

// config.toml, every key optional
#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct FileConfig {
    #[serde(default)]
    root: Option<PathBuf>,
    #[serde(default)]
    delete_policy: Option<DeletePolicy>,
}

static SHARED: OnceLock<ScratchConfig> = OnceLock::new();

impl ScratchConfig {
    pub fn new(root: impl Into<PathBuf>, delete_policy: DeletePolicy) -> Self {
        Self {
            root: root.into(),
            delete_policy,
        }
    }

    /// Loads defaults, then the config file, then environment overrides.
    pub fn load() -> Result<Self> {
        Self::load_with(|key| std::env::var(key).ok())
    }

    /// Same as [`ScratchConfig::load`] but resolves variables through `lookup`.
    pub fn load_with<V>(lookup: V) -> Result<Self>
    where
        V: Fn(&str) -> Option<String>,
    {
        let var = |key: &str| lookup(key).filter(|value| !value.is_empty());

        let mut config = match resolve_config_file(&var)? {
            Some(path) => Self::from_toml_file(&path)?,
            None => Self::default(),
        };

        if let Some(root) = var(ROOT_ENV) {
            config.root = PathBuf::from(root);
        }
        if let Some(policy) = var(POLICY_ENV) {
            config.delete_policy = policy
                .parse::<DeletePolicy>()
                .with_context(|| format!("reading {}", POLICY_ENV))?;
        }

        debug!(
            "scratch root {} with delete policy {}",
            config.root.display(),
            config.delete_policy
        );
        Ok(config)
    }

    /// Reads a single TOML file on top of the defaults.
    pub fn from_toml_file(path: &Path) -> Result<Self> {
        let text = fs::read_to_string(path)
            .with_context(|| format!("reading scratch config {}", path.display()))?;
        let file: FileConfig = toml::from_str(&text)
            .with_context(|| format!("parsing scratch config {}", path.display()))?;

        let defaults = Self::default();
        Ok(Self {
            root: file.root.unwrap_or(defaults.root),
            delete_policy: file.delete_policy.unwrap_or(defaults.delete_policy),
        })
    }

    /// Process-wide configuration, loaded on first use and never changed afterwards.
    /// A broken configuration falls back to the defaults with a warning.
    pub fn shared() -> &'static ScratchConfig {
        SHARED.get_or_init(|| {
            Self::load().unwrap_or_else(|err| {
                warn!("falling back to default scratch config: {:#}", err);
                Self::default()
            })
        })
    }
}

fn resolve_config_file<V>(var: &V) -> Result<Option<PathBuf>>
where
    V: Fn(&str) -> Option<String>,
{
    if let Some(explicit) = var(CONFIG_ENV) {
        let path = PathBuf::from(explicit);
        if !path.is_file() {
            return Err(anyhow!(
                "{} points to a non-existent file: {}",
                CONFIG_ENV,
                path.display()
            ));
        }
        return Ok(Some(path));
    }

    let config_home = var("XDG_CONFIG_HOME")
        .map(PathBuf::from)
        .or_else(|| var("HOME").map(|home| Path::new(&home).join(".config")));
    Ok(config_home
        .map(|dir| dir.join(CONFIG_DIR_NAME).join(CONFIG_FILE_NAME))
        .filter(|path| path.is_file()))
}
