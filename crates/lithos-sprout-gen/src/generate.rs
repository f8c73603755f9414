// SPDX-License-Identifier: Apache-2.0 OR MIT
use std::path::PathBuf;

use tracing::info;

use crate::error::GenError;
use crate::golang::{extract_file, Package};
use crate::render::Renderer;
use crate::writer::write_output;

pub const DEFAULT_SOURCE: &str = "registry/conversion/manual_functions.go";
pub const DEFAULT_OUTPUT: &str = "registry/conversion/generated_functions.go";
const OUTPUT_FILE_NAME: &str = "generated_functions.go";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GenerateOptions {
    pub source: PathBuf,
    pub output: PathBuf,
}

impl Default for GenerateOptions {
    fn default() -> Self {
        Self {
            source: PathBuf::from(DEFAULT_SOURCE),
            output: PathBuf::from(DEFAULT_OUTPUT),
        }
    }
}

impl GenerateOptions {
    /// Reads `source` and writes `generated_functions.go` beside it.
    pub fn from_source(source: impl Into<PathBuf>) -> Self {
        let source = source.into();
        let output = source.with_file_name(OUTPUT_FILE_NAME);
        Self { source, output }
    }
}

/// Extracts the methods of `options.source` and writes their must/safe
/// wrappers to `options.output`.
pub fn generate(options: &GenerateOptions) -> Result<Package, GenError> {
    let package = extract_file(&options.source)?;
    info!(
        path = %options.source.display(),
        package = %package.name,
        functions = package.functions.len(),
        "extracted functions"
    );
    let output = Renderer::new()?.render_package(&package)?;
    write_output(&options.output, &output)?;
    Ok(package)
}
