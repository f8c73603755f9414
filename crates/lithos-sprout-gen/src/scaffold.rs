// SPDX-License-Identifier: Apache-2.0 OR MIT
//! YAML-described registry skeletons.
//!
//! ```yaml
//! metadata:
//!   name: conversion
//!   description: Type conversion helpers.
//! notices:
//!   - functions: [toDecimal]
//!     kind: deprecated
//!     message: use `toOctal` instead
//! functions:
//!   - name: toBool
//!     description: converts a value to a boolean.
//!     aliases: [bool]
//!     parameters:
//!       - { name: v, type: any }
//!     return_type: bool
//!     examples:
//!       - { template: '{{ "true" | toBool }}', result: "true" }
//! ```

use std::fs;
use std::path::{Path, PathBuf};

use lithos_sprout::NoticeKind;
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::error::GenError;
use crate::render::Renderer;
use crate::writer::write_output;

pub const DEFAULT_CONFIG: &str = "registry/conversion/registry.yaml";

/// Decoded registry descriptor. Keys are snake_case in YAML and PascalCase
/// in template data.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(rename_all(serialize = "PascalCase", deserialize = "snake_case"))]
pub struct RegistryConfig {
    pub metadata: Metadata,
    #[serde(default)]
    pub notices: Vec<NoticeConfig>,
    #[serde(default)]
    pub functions: Vec<FunctionConfig>,
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(rename_all(serialize = "PascalCase", deserialize = "snake_case"))]
pub struct Metadata {
    pub name: String,
    #[serde(default)]
    pub author: String,
    #[serde(default)]
    pub description: String,
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(rename_all(serialize = "PascalCase", deserialize = "snake_case"))]
pub struct NoticeConfig {
    pub functions: Vec<String>,
    pub kind: NoticeKind,
    pub message: String,
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(rename_all(serialize = "PascalCase", deserialize = "snake_case"))]
pub struct FunctionConfig {
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub aliases: Vec<String>,
    #[serde(default)]
    pub parameters: Vec<ParameterConfig>,
    #[serde(default)]
    pub return_type: String,
    #[serde(default)]
    pub examples: Vec<ExampleConfig>,
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(rename_all(serialize = "PascalCase", deserialize = "snake_case"))]
pub struct ParameterConfig {
    pub name: String,
    #[serde(rename(serialize = "Type", deserialize = "type"))]
    pub type_name: String,
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(rename_all(serialize = "PascalCase", deserialize = "snake_case"))]
pub struct ExampleConfig {
    pub template: String,
    pub result: String,
}

impl RegistryConfig {
    pub fn from_yaml(path: &Path, source: &str) -> Result<Self, GenError> {
        let config: Self = serde_yaml::from_str(source).map_err(|source| GenError::Yaml {
            path: path.to_path_buf(),
            source,
        })?;
        if config.metadata.name.trim().is_empty() {
            return Err(GenError::Config(format!(
                "{}: metadata.name must not be empty",
                path.display()
            )));
        }
        Ok(config)
    }
}

pub fn load_config(path: &Path) -> Result<RegistryConfig, GenError> {
    let source = fs::read_to_string(path).map_err(|source| GenError::io(path, source))?;
    RegistryConfig::from_yaml(path, &source)
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScaffoldOptions {
    pub config: PathBuf,
}

impl Default for ScaffoldOptions {
    fn default() -> Self {
        Self {
            config: PathBuf::from(DEFAULT_CONFIG),
        }
    }
}

impl ScaffoldOptions {
    /// The skeleton lands next to the descriptor as `<metadata.name>.go`.
    pub fn output_for(&self, config: &RegistryConfig) -> PathBuf {
        self.config
            .with_file_name(format!("{}.go", config.metadata.name))
    }
}

/// Renders the registry skeleton described by `options.config` and returns
/// the written path.
pub fn scaffold(options: &ScaffoldOptions) -> Result<PathBuf, GenError> {
    let config = load_config(&options.config)?;
    info!(
        path = %options.config.display(),
        registry = %config.metadata.name,
        functions = config.functions.len(),
        "loaded registry descriptor"
    );
    let output = Renderer::new()?.render_registry(&config)?;
    let path = options.output_for(&config);
    write_output(&path, &output)?;
    Ok(path)
}
