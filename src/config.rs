//! Configuration for the Aurora service.
//!
//! Settings are read from `aurora.toml` and layered file → environment → CLI.
//!
//! # Configuration File Format
//!
//! ```toml
//! [server]
//! host = "127.0.0.1"
//! port = 8000
//! request_timeout_secs = 120
//! cors_permissive = false
//!
//! [artifacts]
//! save_path = "/tmp/are_outputs"
//!
//! [personas]
//! blueprint_dir = "./blueprints"
//!
//! [model]
//! temperature = 0.4
//! max_tokens = 800
//! selection = "first_healthy"
//!
//! [[model.backends]]
//! kind = "openai_compatible"
//! name = "local-llm"
//! base_url = "http://localhost:11434/v1"
//! model = "llama3"
//! api_key_env = "LOCAL_LLM_KEY"
//! timeout_secs = 60
//! call_budget = 500
//!
//! [[model.backends]]
//! kind = "mock"
//!
//! [burn]
//! project_token = "Aurora"
//! context_hint = "within the Aurora Project"
//! checkpoints = ["Purpose", "Methodology", "Ethics", "Recovery"]
//! compression_phrase = "Tanagra at the Firebreak"
//! glyph = "🔥"
//! entropy = 200
//! overclock = true
//! cycle_timeout_secs = 300
//! ```

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::model::{GenerateOptions, SelectionPolicy};

/// Name of the configuration file looked up in the working directory.
pub const CONFIG_FILE_NAME: &str = "aurora.toml";

/// Environment variable that overrides `[artifacts] save_path`.
pub const SAVE_PATH_ENV: &str = "AURORA_SAVE_PATH";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerSection {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
    #[serde(default)]
    pub cors_permissive: bool,
}

fn default_host() -> String {
    "127.0.0.1".to_string()
}

fn default_port() -> u16 {
    8000
}

fn default_request_timeout_secs() -> u64 {
    120
}

impl Default for ServerSection {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            request_timeout_secs: default_request_timeout_secs(),
            cors_permissive: false,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ArtifactsSection {
    #[serde(default = "default_save_path")]
    pub save_path: PathBuf,
}

fn default_save_path() -> PathBuf {
    PathBuf::from("/tmp/are_outputs")
}

impl Default for ArtifactsSection {
    fn default() -> Self {
        Self {
            save_path: default_save_path(),
        }
    }
}

/// Where rehydration looks up blueprints. Without a directory every
/// non-empty id resolves to a mock blueprint.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PersonasSection {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub blueprint_dir: Option<PathBuf>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BackendKind {
    Mock,
    OpenaiCompatible,
}

/// One member of the model fallback chain.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BackendConfig {
    pub kind: BackendKind,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub base_url: Option<String>,
    #[serde(default)]
    pub model: Option<String>,
    /// Environment variable holding the API key, if the backend needs one.
    #[serde(default)]
    pub api_key_env: Option<String>,
    #[serde(default = "default_backend_timeout_secs")]
    pub timeout_secs: u64,
    #[serde(default)]
    pub call_budget: Option<u32>,
}

fn default_backend_timeout_secs() -> u64 {
    60
}

impl BackendConfig {
    pub fn mock() -> Self {
        Self {
            kind: BackendKind::Mock,
            name: None,
            base_url: None,
            model: None,
            api_key_env: None,
            timeout_secs: default_backend_timeout_secs(),
            call_budget: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelSection {
    #[serde(default = "default_temperature")]
    pub temperature: f64,
    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,
    #[serde(default)]
    pub selection: SelectionPolicy,
    /// Ordered fallback chain. Empty means a single offline mock backend.
    #[serde(default)]
    pub backends: Vec<BackendConfig>,
}

fn default_temperature() -> f64 {
    0.4
}

fn default_max_tokens() -> u32 {
    800
}

impl Default for ModelSection {
    fn default() -> Self {
        Self {
            temperature: default_temperature(),
            max_tokens: default_max_tokens(),
            selection: SelectionPolicy::default(),
            backends: Vec::new(),
        }
    }
}

impl ModelSection {
    /// The configured chain, or a lone mock backend when none is configured.
    pub fn effective_backends(&self) -> Vec<BackendConfig> {
        if self.backends.is_empty() {
            vec![BackendConfig::mock()]
        } else {
            self.backends.clone()
        }
    }

    pub fn options(&self) -> GenerateOptions {
        GenerateOptions {
            temperature: self.temperature,
            max_tokens: self.max_tokens,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BurnSection {
    /// Literal token whose presence in a handshake answer marks project-scoped meaning.
    #[serde(default = "default_project_token")]
    pub project_token: String,
    #[serde(default = "default_context_hint")]
    pub context_hint: String,
    #[serde(default = "default_checkpoints")]
    pub checkpoints: Vec<String>,
    #[serde(default = "default_compression_phrase")]
    pub compression_phrase: String,
    #[serde(default = "default_glyph")]
    pub glyph: String,
    #[serde(default = "default_entropy")]
    pub entropy: i64,
    #[serde(default = "default_overclock")]
    pub overclock: bool,
    #[serde(default = "default_cycle_timeout_secs")]
    pub cycle_timeout_secs: u64,
}

fn default_project_token() -> String {
    "Aurora".to_string()
}

fn default_context_hint() -> String {
    "within the Aurora Project".to_string()
}

fn default_checkpoints() -> Vec<String> {
    ["Purpose", "Methodology", "Ethics", "Recovery"]
        .iter()
        .map(|s| s.to_string())
        .collect()
}

fn default_compression_phrase() -> String {
    "Tanagra at the Firebreak".to_string()
}

fn default_glyph() -> String {
    "🔥".to_string()
}

fn default_entropy() -> i64 {
    200
}

fn default_overclock() -> bool {
    true
}

fn default_cycle_timeout_secs() -> u64 {
    300
}

impl Default for BurnSection {
    fn default() -> Self {
        Self {
            project_token: default_project_token(),
            context_hint: default_context_hint(),
            checkpoints: default_checkpoints(),
            compression_phrase: default_compression_phrase(),
            glyph: default_glyph(),
            entropy: default_entropy(),
            overclock: default_overclock(),
            cycle_timeout_secs: default_cycle_timeout_secs(),
        }
    }
}

/// Parsed `aurora.toml`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AuroraToml {
    #[serde(default)]
    pub server: ServerSection,
    #[serde(default)]
    pub artifacts: ArtifactsSection,
    #[serde(default)]
    pub personas: PersonasSection,
    #[serde(default)]
    pub model: ModelSection,
    #[serde(default)]
    pub burn: BurnSection,
}

impl AuroraToml {
    /// Load configuration from a TOML file.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        Self::parse(&content)
    }

    /// Parse configuration from a TOML string.
    pub fn parse(content: &str) -> Result<Self> {
        toml::from_str(content).context("Failed to parse aurora.toml")
    }

    /// Load `aurora.toml` from `dir`, or defaults if it does not exist.
    pub fn load_or_default(dir: &Path) -> Result<Self> {
        let config_path = dir.join(CONFIG_FILE_NAME);
        if config_path.exists() {
            Self::load(&config_path)
        } else {
            Ok(Self::default())
        }
    }

    /// Save configuration to a TOML file.
    pub fn save(&self, path: &Path) -> Result<()> {
        let content = toml::to_string_pretty(self).context("Failed to serialize aurora.toml")?;
        std::fs::write(path, content)
            .with_context(|| format!("Failed to write config file: {}", path.display()))?;
        Ok(())
    }

    /// Human-readable warnings about suspicious settings.
    pub fn validate(&self) -> Vec<String> {
        let mut warnings = Vec::new();

        if !(1..=256).contains(&self.burn.entropy) {
            warnings.push(format!(
                "burn.entropy = {} is outside [1, 256] and will be clamped",
                self.burn.entropy
            ));
        }
        if self.burn.checkpoints.is_empty() {
            warnings.push("burn.checkpoints is empty; every burn will pass".to_string());
        }
        if self.burn.cycle_timeout_secs == 0 {
            warnings.push("burn.cycle_timeout_secs = 0; every cycle will time out".to_string());
        }
        if let Some(dir) = &self.personas.blueprint_dir
            && !dir.is_dir()
        {
            warnings.push(format!(
                "personas.blueprint_dir {} is not a directory; every rehydrate will 404",
                dir.display()
            ));
        }
        if !(0.0..=2.0).contains(&self.model.temperature) {
            warnings.push(format!(
                "model.temperature = {} is outside [0.0, 2.0]",
                self.model.temperature
            ));
        }

        for (i, backend) in self.model.backends.iter().enumerate() {
            if backend.kind == BackendKind::OpenaiCompatible {
                if backend.base_url.as_deref().is_none_or(str::is_empty) {
                    warnings.push(format!("model.backends[{}] is missing base_url", i));
                }
                if backend.model.as_deref().is_none_or(str::is_empty) {
                    warnings.push(format!("model.backends[{}] is missing model", i));
                }
            }
            if backend.call_budget == Some(0) {
                warnings.push(format!(
                    "model.backends[{}] has call_budget = 0 and will never be called",
                    i
                ));
            }
        }

        warnings
    }
}

/// Runtime configuration: the parsed file plus environment and CLI overrides.
#[derive(Debug, Clone)]
pub struct Config {
    pub toml: AuroraToml,
    /// File the configuration was read from, if any.
    pub source: Option<PathBuf>,
    pub verbose: bool,
    cli_host: Option<String>,
    cli_port: Option<u16>,
    cli_save_path: Option<PathBuf>,
}

impl Config {
    /// Load configuration from an explicit file, or from `aurora.toml` in the
    /// working directory when `path` is `None`.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let (toml, source) = match path {
            Some(p) => (AuroraToml::load(p)?, Some(p.to_path_buf())),
            None => {
                let cwd = std::env::current_dir().context("Failed to get current directory")?;
                let candidate = cwd.join(CONFIG_FILE_NAME);
                let source = candidate.exists().then_some(candidate);
                (AuroraToml::load_or_default(&cwd)?, source)
            }
        };
        Ok(Self::from_toml(toml, source))
    }

    pub fn from_toml(toml: AuroraToml, source: Option<PathBuf>) -> Self {
        Self {
            toml,
            source,
            verbose: false,
            cli_host: None,
            cli_port: None,
            cli_save_path: None,
        }
    }

    /// Apply CLI overrides.
    pub fn with_cli_args(
        mut self,
        verbose: bool,
        host: Option<String>,
        port: Option<u16>,
        save_path: Option<PathBuf>,
    ) -> Self {
        self.verbose = verbose;
        self.cli_host = host;
        self.cli_port = port;
        self.cli_save_path = save_path;
        self
    }

    /// Bind host (CLI → file → default).
    pub fn host(&self) -> String {
        self.cli_host
            .clone()
            .unwrap_or_else(|| self.toml.server.host.clone())
    }

    /// Bind port (CLI → file → default).
    pub fn port(&self) -> u16 {
        self.cli_port.unwrap_or(self.toml.server.port)
    }

    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host(), self.port())
    }

    /// Artifact directory (CLI → env → file → default).
    pub fn save_path(&self) -> PathBuf {
        self.cli_save_path
            .clone()
            .or_else(|| std::env::var(SAVE_PATH_ENV).ok().map(PathBuf::from))
            .unwrap_or_else(|| self.toml.artifacts.save_path.clone())
    }

    pub fn validate(&self) -> Vec<String> {
        self.toml.validate()
    }
}
