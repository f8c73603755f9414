// SPDX-License-Identifier: Apache-2.0 OR MIT
//! Code generation for sprout-style Go helper registries.
//!
//! `generate` scans a Go source file for methods and emits `Must<Name>` and
//! `Safe<Name>` wrappers for every method returning an error. `scaffold`
//! turns a YAML registry descriptor into a registry skeleton. Both render
//! through `lithos-gotmpl-engine` with the Sprig and sprout helpers.

#![forbid(unsafe_code)]

use std::fmt;
use std::path::PathBuf;

use tracing::warn;

mod error;
mod generate;
pub mod golang;
pub mod render;
mod scaffold;
mod writer;

pub use error::{ExtractError, GenError};
pub use generate::{generate, GenerateOptions, DEFAULT_OUTPUT, DEFAULT_SOURCE};
pub use render::{template_functions, Renderer};
pub use scaffold::{
    load_config, scaffold, ExampleConfig, FunctionConfig, Metadata, NoticeConfig,
    ParameterConfig, RegistryConfig, ScaffoldOptions, DEFAULT_CONFIG,
};
pub use writer::write_output;

/// The two generator actions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Command {
    #[default]
    Generate,
    Scaffold,
}

impl Command {
    /// Maps the positional CLI argument to a command. Missing or unknown
    /// input selects [`Command::Generate`].
    pub fn from_arg(arg: Option<&str>) -> Self {
        match arg {
            None | Some("generate") => Command::Generate,
            Some("scaffold") => Command::Scaffold,
            Some(other) => {
                warn!(command = other, "unknown command, defaulting to generate");
                Command::Generate
            }
        }
    }
}

impl fmt::Display for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Command::Generate => "generate",
            Command::Scaffold => "scaffold",
        })
    }
}

/// Runs `command`, returning the path that was written.
pub fn run(
    command: Command,
    generate_options: &GenerateOptions,
    scaffold_options: &ScaffoldOptions,
) -> Result<PathBuf, GenError> {
    match command {
        Command::Generate => {
            generate(generate_options)?;
            Ok(generate_options.output.clone())
        }
        Command::Scaffold => scaffold(scaffold_options),
    }
}
