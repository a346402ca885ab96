// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Engine configuration and its storage port.

use std::cell::RefCell;
use std::collections::HashMap;

use serde::{de::DeserializeOwned, Deserialize, Serialize};
use shapebatch_port::{RenderTag, ViewportContext};
use thiserror::Error;

use crate::gate::GateKind;

/// Key under which [`BatchConfig`] is stored.
pub const CONFIG_KEY: &str = "shapebatch";

/// Largest accepted pick resolution per axis.
pub const MAX_PICK_RESOLUTION: u32 = 1024;

/// When a context's pass counts as ended.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EndOfPass {
    /// The host calls `on_end_of_pass` after the draw returns.
    Native,
    /// The pass ends as soon as the batched submission returns.
    Immediate,
}

/// Gating and end-of-pass behavior for one viewport context.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContextConfig {
    /// Frame-dedup strategy.
    pub gate: GateKind,
    /// End-of-pass source.
    pub end_of_pass: EndOfPass,
}

/// Engine settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BatchConfig {
    /// Intersection query sample grid (width, height).
    pub pick_resolution: [u32; 2],
    /// Coverage below which a pick sample does not count.
    pub alpha_threshold: f32,
    /// Render tags considered by selection queries.
    pub selection_render_tags: Vec<RenderTag>,
    /// Settings for [`ViewportContext::Legacy`].
    pub legacy: ContextConfig,
    /// Settings for [`ViewportContext::Viewport2`].
    pub viewport2: ContextConfig,
}

impl Default for BatchConfig {
    fn default() -> Self {
        Self {
            pick_resolution: [256, 256],
            alpha_threshold: 0.1,
            selection_render_tags: vec![RenderTag::geometry()],
            legacy: ContextConfig {
                gate: GateKind::Flag,
                end_of_pass: EndOfPass::Immediate,
            },
            viewport2: ContextConfig {
                gate: GateKind::Stamp,
                end_of_pass: EndOfPass::Native,
            },
        }
    }
}

impl BatchConfig {
    /// Settings for `context`.
    pub fn context(&self, context: ViewportContext) -> &ContextConfig {
        match context {
            ViewportContext::Legacy => &self.legacy,
            ViewportContext::Viewport2 => &self.viewport2,
        }
    }

    /// Gate strategy per context, indexed by [`ViewportContext::index`].
    pub fn gate_kinds(&self) -> [GateKind; ViewportContext::COUNT] {
        ViewportContext::ALL.map(|ctx| self.context(ctx).gate)
    }

    /// Reject settings the engine cannot run with.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let [w, h] = self.pick_resolution;
        if w == 0 || h == 0 {
            return Err(ConfigError::Invalid(format!(
                "pick_resolution must be non-zero, got {w}x{h}"
            )));
        }
        if w > MAX_PICK_RESOLUTION || h > MAX_PICK_RESOLUTION {
            return Err(ConfigError::Invalid(format!(
                "pick_resolution {w}x{h} exceeds {MAX_PICK_RESOLUTION}x{MAX_PICK_RESOLUTION}"
            )));
        }
        if !(0.0..=1.0).contains(&self.alpha_threshold) {
            return Err(ConfigError::Invalid(format!(
                "alpha_threshold must lie in [0, 1], got {}",
                self.alpha_threshold
            )));
        }
        Ok(())
    }
}

/// Storage port for raw config blobs (keyed by logical name).
pub trait ConfigStore {
    /// Load a raw config blob. Returns `NotFound` when missing.
    fn load_raw(&self, key: &str) -> Result<Vec<u8>, ConfigError>;
    /// Persist a raw config blob.
    fn save_raw(&self, key: &str, data: &[u8]) -> Result<(), ConfigError>;
}

/// Error type for config operations.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Key not present in store.
    #[error("not found")]
    NotFound,
    /// I/O error while reading/writing.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    /// Serialization/deserialization failure.
    #[error("serde error: {0}")]
    Serde(#[from] serde_json::Error),
    /// Settings the engine cannot run with.
    #[error("invalid config: {0}")]
    Invalid(String),
    /// Catch-all error variant.
    #[error("other: {0}")]
    Other(String),
}

/// Thin service that serializes config values and delegates storage to a `ConfigStore`.
pub struct ConfigService<S> {
    store: S,
}

impl<S> ConfigService<S> {
    /// Create a new service using the given store.
    pub fn new(store: S) -> Self {
        Self { store }
    }

    /// Consume the service and return the inner store.
    pub fn into_inner(self) -> S {
        self.store
    }
}

impl<S> ConfigService<S>
where
    S: ConfigStore,
{
    /// Load and deserialize a config value for `key`. Returns `Ok(None)` if missing.
    pub fn load<T>(&self, key: &str) -> Result<Option<T>, ConfigError>
    where
        T: DeserializeOwned,
    {
        match self.store.load_raw(key) {
            Ok(bytes) => {
                if bytes.is_empty() {
                    return Ok(None);
                }
                let value = serde_json::from_slice(&bytes)?;
                Ok(Some(value))
            }
            Err(ConfigError::NotFound) => Ok(None),
            Err(e) => Err(e),
        }
    }

    /// Serialize and persist a config value for `key`.
    pub fn save<T>(&self, key: &str, value: &T) -> Result<(), ConfigError>
    where
        T: Serialize,
    {
        let data = serde_json::to_vec_pretty(value)?;
        self.store.save_raw(key, &data)
    }

    /// Load the engine config, falling back to defaults when none is stored.
    pub fn load_batch_config(&self) -> Result<BatchConfig, ConfigError> {
        let config: BatchConfig = self.load(CONFIG_KEY)?.unwrap_or_default();
        config.validate()?;
        Ok(config)
    }

    /// Validate and persist the engine config.
    pub fn save_batch_config(&self, config: &BatchConfig) -> Result<(), ConfigError> {
        config.validate()?;
        self.save(CONFIG_KEY, config)
    }
}

/// In-memory `ConfigStore`, for tests and hosts that persist nothing.
#[derive(Debug, Default)]
pub struct MemoryConfigStore {
    blobs: RefCell<HashMap<String, Vec<u8>>>,
}

impl MemoryConfigStore {
    /// Empty store.
    pub fn new() -> Self {
        Self::default()
    }
}

impl ConfigStore for MemoryConfigStore {
    fn load_raw(&self, key: &str) -> Result<Vec<u8>, ConfigError> {
        self.blobs
            .borrow()
            .get(key)
            .cloned()
            .ok_or(ConfigError::NotFound)
    }

    fn save_raw(&self, key: &str, data: &[u8]) -> Result<(), ConfigError> {
        self.blobs.borrow_mut().insert(key.to_owned(), data.to_vec());
        Ok(())
    }
}
