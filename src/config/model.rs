//! Serde data structures for the Checkpoint configuration file.
//!
//! Contains [`Config`] (the root), the per-stage settings [`GateConfig`],
//! [`CaptureConfig`] and [`AdviceConfig`], and the handler declarations
//! [`GroupConfig`] / [`OperationConfig`]. All types derive `Serialize` and
//! `Deserialize` with `deny_unknown_fields` for strict parsing.

use serde::{Deserialize, Serialize};

use crate::registry::Marker;

const fn default_reject_status() -> u16 {
    403
}

const fn default_true() -> bool {
    true
}

const fn is_true(v: &bool) -> bool {
    *v
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct Config {
    #[serde(default, skip_serializing_if = "GateConfig::is_default")]
    pub gate: GateConfig,

    #[serde(default, skip_serializing_if = "CaptureConfig::is_default")]
    pub capture: CaptureConfig,

    #[serde(default, skip_serializing_if = "AdviceConfig::is_default")]
    pub advice: AdviceConfig,

    pub groups: Vec<GroupConfig>,
}

impl Config {
    #[must_use]
    pub fn total_operations(&self) -> usize {
        self.groups.iter().map(|g| g.operations.len()).sum()
    }

    #[must_use]
    pub fn group(&self, id: &str) -> Option<&GroupConfig> {
        self.groups.iter().find(|g| g.id == id)
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct GateConfig {
    #[serde(default = "default_true", skip_serializing_if = "is_true")]
    pub enabled: bool,

    /// Status returned to the client when no open-access marker matches.
    #[serde(default = "default_reject_status")]
    pub reject_status: u16,
}

impl Default for GateConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            reject_status: default_reject_status(),
        }
    }
}

impl GateConfig {
    fn is_default(&self) -> bool {
        self.enabled && self.reject_status == default_reject_status()
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct CaptureConfig {
    #[serde(default = "default_true", skip_serializing_if = "is_true")]
    pub enabled: bool,
}

impl Default for CaptureConfig {
    fn default() -> Self {
        Self { enabled: true }
    }
}

impl CaptureConfig {
    const fn is_default(&self) -> bool {
        self.enabled
    }
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct AdviceConfig {
    /// Handler group the around-advice is scoped to. `None` disables the stage.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub group: Option<String>,
}

impl AdviceConfig {
    const fn is_default(&self) -> bool {
        self.group.is_none()
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct GroupConfig {
    pub id: String,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub markers: Vec<Marker>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub operations: Vec<OperationConfig>,
}

impl GroupConfig {
    #[must_use]
    pub fn operation(&self, id: &str) -> Option<&OperationConfig> {
        self.operations.iter().find(|o| o.id == id)
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct OperationConfig {
    pub id: String,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub markers: Vec<Marker>,
}
