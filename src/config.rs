//! Bridge configuration: where the automation agent lives and how the MCP
//! server presents itself.
//!
//! The config file is JSON. `${VAR}` references in the agent settings are
//! expanded from the process environment when the file is loaded; unset
//! variables are left as written and reported once per load.

use serde::Deserialize;
use std::{
    collections::{BTreeMap, BTreeSet},
    env, fs,
    path::Path,
    path::PathBuf,
};

/// Environment variable pointing at the config file.
pub const CONFIG_ENV_VAR: &str = "BROWSER_BRIDGE_CONFIG";

/// File name looked up in the working directory when nothing else is set.
pub const DEFAULT_CONFIG_FILE: &str = "browser-bridge.json";

#[derive(Debug, Deserialize, Default)]
pub struct BridgeJsonConfig {
    #[serde(default)]
    pub agent: Option<AgentJsonConfig>,
    #[serde(default)]
    pub server: ServerJsonConfig,
}

#[derive(Debug, Deserialize, Clone, Default)]
pub struct AgentJsonConfig {
    // stdio agent service
    #[serde(default)]
    pub command: Option<String>,
    #[serde(default)]
    pub args: Vec<String>,
    #[serde(default)]
    pub env: BTreeMap<String, String>,

    // http agent service
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default, rename = "authToken")]
    pub auth_token: Option<String>,
}

#[derive(Debug, Deserialize, Clone, Default)]
pub struct ServerJsonConfig {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub instructions: Option<String>,
}

/// How to reach the upstream automation agent service.
#[derive(Debug, Clone, PartialEq)]
pub enum AgentServiceConfig {
    Stdio {
        command: String,
        args: Vec<String>,
        env: BTreeMap<String, String>,
    },
    Http {
        url: String,
        auth_token: Option<String>,
    },
}

impl AgentServiceConfig {
    pub fn from_json(cfg: AgentJsonConfig) -> anyhow::Result<Self> {
        if let Some(command) = cfg.command {
            return Ok(AgentServiceConfig::Stdio {
                command,
                args: cfg.args,
                env: cfg.env,
            });
        }

        if let Some(url) = cfg.url {
            return Ok(AgentServiceConfig::Http {
                url,
                auth_token: cfg.auth_token,
            });
        }

        Err(anyhow::anyhow!(
            "Agent service must have either `command` or `url`"
        ))
    }

    /// Short human-readable description used in log lines.
    pub fn describe(&self) -> String {
        match self {
            AgentServiceConfig::Stdio { command, .. } => format!("stdio:{}", command),
            AgentServiceConfig::Http { url, .. } => format!("http:{}", url),
        }
    }
}

/// Fully resolved bridge configuration.
#[derive(Debug, Clone)]
pub struct BridgeConfig {
    pub agent: AgentServiceConfig,
    pub server_name: String,
    pub instructions: Option<String>,
}

impl BridgeConfig {
    /// Build a config for the given agent service with default server metadata.
    pub fn new(agent: AgentServiceConfig) -> Self {
        Self {
            agent,
            server_name: env!("CARGO_PKG_NAME").to_string(),
            instructions: None,
        }
    }
}

/// Locate the config file.
///
/// Order: explicit path, `BROWSER_BRIDGE_CONFIG`,
/// `$XDG_CONFIG_HOME/browser-bridge/config.json`, `./browser-bridge.json`.
/// Returns `None` when no file exists; the agent may still come from CLI flags.
pub fn resolve_config_path(explicit: Option<&Path>) -> anyhow::Result<Option<PathBuf>> {
    if let Some(p) = explicit {
        if !p.exists() {
            return Err(anyhow::anyhow!(
                "Config file {} does not exist",
                p.display()
            ));
        }
        return Ok(Some(p.to_path_buf()));
    }

    if let Ok(p) = env::var(CONFIG_ENV_VAR) {
        return Ok(Some(PathBuf::from(p)));
    }

    if let Ok(xdg) = env::var("XDG_CONFIG_HOME") {
        let candidate = PathBuf::from(xdg).join("browser-bridge").join("config.json");
        if candidate.exists() {
            return Ok(Some(candidate));
        }
    }

    let candidate = PathBuf::from(DEFAULT_CONFIG_FILE);
    if candidate.exists() {
        return Ok(Some(candidate));
    }

    Ok(None)
}

/// Substitutes `${VAR}` references, remembering names with no value.
struct EnvExpander<'a> {
    lookup: &'a dyn Fn(&str) -> Option<String>,
    unresolved: BTreeSet<String>,
}

impl<'a> EnvExpander<'a> {
    fn new(lookup: &'a dyn Fn(&str) -> Option<String>) -> Self {
        Self {
            lookup,
            unresolved: BTreeSet::new(),
        }
    }

    fn expand(&mut self, input: &str) -> String {
        let mut out = String::with_capacity(input.len());
        let mut rest = input;

        while let Some(start) = rest.find("${") {
            out.push_str(&rest[..start]);
            let reference = &rest[start..];
            // An unterminated reference is kept literally.
            let Some(end) = reference.find('}') else {
                out.push_str(reference);
                return out;
            };

            let name = &reference[2..end];
            match (self.lookup)(name) {
                Some(value) => out.push_str(&value),
                None => {
                    self.unresolved.insert(name.to_string());
                    out.push_str(&reference[..=end]);
                }
            }
            rest = &reference[end + 1..];
        }

        out.push_str(rest);
        out
    }

    fn expand_in_place(&mut self, value: &mut String) {
        *value = self.expand(value);
    }
}

fn expand_agent(
    mut cfg: AgentJsonConfig,
    lookup: &dyn Fn(&str) -> Option<String>,
) -> AgentJsonConfig {
    let mut expander = EnvExpander::new(lookup);

    if let Some(command) = cfg.command.as_mut() {
        expander.expand_in_place(command);
    }
    cfg.args.iter_mut().for_each(|arg| expander.expand_in_place(arg));
    cfg.env
        .values_mut()
        .for_each(|value| expander.expand_in_place(value));
    if let Some(url) = cfg.url.as_mut() {
        expander.expand_in_place(url);
    }
    if let Some(token) = cfg.auth_token.as_mut() {
        expander.expand_in_place(token);
    }

    if !expander.unresolved.is_empty() {
        tracing::warn!(
            variables = ?expander.unresolved,
            "Agent config references unset environment variables; left unexpanded"
        );
    }
    cfg
}

/// Parse a config file, expanding environment references.
pub fn load_config_file(path: &Path) -> anyhow::Result<BridgeJsonConfig> {
    let raw = fs::read_to_string(path)
        .map_err(|e| anyhow::anyhow!("Failed to read {}: {}", path.display(), e))?;
    let mut cfg: BridgeJsonConfig = serde_json::from_str(&raw)
        .map_err(|e| anyhow::anyhow!("Failed to parse {}: {}", path.display(), e))?;
    cfg.agent = cfg
        .agent
        .map(|agent| expand_agent(agent, &|name| env::var(name).ok()));
    Ok(cfg)
}

/// Resolve the final configuration from an optional file plus an optional
/// agent override (from the command line). The override wins.
pub fn load_bridge_config(
    explicit_path: Option<&Path>,
    agent_override: Option<AgentServiceConfig>,
) -> anyhow::Result<BridgeConfig> {
    let file = match resolve_config_path(explicit_path)? {
        Some(path) => {
            tracing::info!("Loading bridge config from {}", path.display());
            load_config_file(&path)?
        }
        None => BridgeJsonConfig::default(),
    };

    let agent = match agent_override {
        Some(agent) => agent,
        None => match file.agent {
            Some(agent) => AgentServiceConfig::from_json(agent)?,
            None => {
                return Err(anyhow::anyhow!(
                    "No agent service configured (use --agent-command/--agent-url, \
                     set {} or create ./{})",
                    CONFIG_ENV_VAR,
                    DEFAULT_CONFIG_FILE
                ));
            }
        },
    };

    let mut config = BridgeConfig::new(agent);
    if let Some(name) = file.server.name {
        config.server_name = name;
    }
    config.instructions = file.server.instructions;
    Ok(config)
}
