//! TOML scenario files.
//!
//! ```toml
//! processes = 2
//!
//! [snapshot]
//! initiator = 0
//! after = "a"
//!
//! [runtime]
//! step_delay_ms = 50
//!
//! [[script]]
//! process = 0
//! instructions = [
//!     { kind = "internal", label = "a" },
//!     { kind = "send", label = "b", to = 1, peer_label = "c" },
//! ]
//!
//! [[script]]
//! process = 1
//! instructions = [{ kind = "receive", label = "c", peer_label = "b" }]
//! ```

use anyhow::{bail, Context, Result};
use causal_core::{Scenario, Script, SnapshotTrigger};
use causal_runtime::RuntimeConfig;
use serde::Deserialize;
use std::path::Path;

/// On-disk scenario description.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ScenarioFile {
    /// Group size
    pub processes: usize,
    /// Optional snapshot initiation point
    #[serde(default)]
    pub snapshot: Option<SnapshotTrigger>,
    /// Runtime overrides, merged over the CLI defaults
    #[serde(default)]
    pub runtime: Option<toml::Table>,
    /// One script per process
    #[serde(default)]
    pub script: Vec<Script>,
}

impl ScenarioFile {
    /// Read and parse `path`.
    pub fn load(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read scenario file {}", path.display()))?;
        Self::parse(&text).with_context(|| format!("Invalid scenario file {}", path.display()))
    }

    /// Parse scenario TOML.
    pub fn parse(text: &str) -> Result<Self> {
        Ok(toml::from_str(text)?)
    }

    /// Validated scenario.
    pub fn scenario(&self) -> Result<Scenario> {
        let scenario = Scenario {
            processes: self.processes,
            snapshot: self.snapshot.clone(),
            scripts: self.script.clone(),
        };
        scenario.validate()?;
        Ok(scenario)
    }

    /// `base` with the keys of the `[runtime]` table applied on top.
    pub fn runtime_config(&self, base: RuntimeConfig) -> Result<RuntimeConfig> {
        let Some(overrides) = &self.runtime else {
            return Ok(base);
        };
        let toml::Value::Table(mut table) =
            toml::Value::try_from(&base).context("Failed to encode runtime defaults")?
        else {
            bail!("Runtime defaults did not encode as a table");
        };
        table.extend(overrides.clone());
        let config: RuntimeConfig = toml::Value::Table(table)
            .try_into()
            .context("Invalid [runtime] table")?;
        Ok(config)
    }
}
