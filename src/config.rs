// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.
//
// Copyright (c) 2025 Pegasus Heavy Industries, LLC

//! Configuration for the chimp CLI and REPL.
//!
//! Values come from defaults, then `config.toml`, then `CHIMP_*`
//! environment variables.

use anyhow::Context;
use chimp_core::vm::{GLOBALS_SIZE, MAX_FRAMES, STACK_SIZE};
use chimp_core::Limits;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

const CONFIG_FILE: &str = "config.toml";
const ENV_PREFIX: &str = "CHIMP_";

/// User configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Operand stack slots per run
    pub stack_size: usize,
    /// Global store capacity
    pub globals_size: usize,
    /// Maximum call depth
    pub max_frames: usize,
    /// REPL history entries kept on disk
    pub history_size: usize,
    /// Print the disassembly of each unit before running it
    pub show_bytecode: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            stack_size: STACK_SIZE,
            globals_size: GLOBALS_SIZE,
            max_frames: MAX_FRAMES,
            history_size: 1000,
            show_bytecode: false,
        }
    }
}

impl Config {
    /// Loads configuration from `path`, or from the default location when
    /// `path` is `None`, then applies environment overrides.
    ///
    /// An explicit path must exist; a missing default file is not an error.
    pub fn load(path: Option<&Path>) -> anyhow::Result<Self> {
        let mut config = match path {
            Some(path) => Self::from_file(path)?,
            None => match default_config_path() {
                Some(path) if path.exists() => Self::from_file(&path)?,
                _ => Self::default(),
            },
        };
        config.merge_env(std::env::vars());
        Ok(config)
    }

    /// Parses a TOML configuration file.
    pub fn from_file(path: &Path) -> anyhow::Result<Self> {
        let data = std::fs::read_to_string(path)
            .with_context(|| format!("reading configuration from {}", path.display()))?;
        let config = toml::from_str(&data)
            .with_context(|| format!("parsing configuration {}", path.display()))?;
        tracing::debug!(path = %path.display(), "loaded configuration");
        Ok(config)
    }

    /// Applies `CHIMP_*` overrides. Unparseable values are ignored.
    pub fn merge_env(&mut self, vars: impl IntoIterator<Item = (String, String)>) {
        for (key, value) in vars {
            if let Some(key) = key.strip_prefix(ENV_PREFIX) {
                self.set(&key.to_lowercase(), &value);
            }
        }
    }

    /// Sets one value by key. Returns `false` for unknown keys and
    /// unparseable values.
    pub fn set(&mut self, key: &str, value: &str) -> bool {
        let applied = match key {
            "stack_size" => parse_into(value, &mut self.stack_size),
            "globals_size" => parse_into(value, &mut self.globals_size),
            "max_frames" => parse_into(value, &mut self.max_frames),
            "history_size" => parse_into(value, &mut self.history_size),
            "show_bytecode" => parse_into(value, &mut self.show_bytecode),
            _ => return false,
        };
        if !applied {
            tracing::warn!(key, value, "ignoring invalid configuration value");
        }
        applied
    }

    /// The VM limits described by this configuration.
    pub fn limits(&self) -> Limits {
        Limits {
            stack_size: self.stack_size,
            globals_size: self.globals_size,
            max_frames: self.max_frames,
        }
    }
}

fn parse_into<T: std::str::FromStr>(value: &str, slot: &mut T) -> bool {
    match value.trim().parse() {
        Ok(parsed) => {
            *slot = parsed;
            true
        }
        Err(_) => false,
    }
}

/// `<config dir>/chimp/config.toml`
pub fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|dir| dir.join("chimp").join(CONFIG_FILE))
}
