// SPDX-License-Identifier: Apache-2.0 OR MIT
use std::io;
use std::path::PathBuf;

use lithos_sprout::HandlerError;
use thiserror::Error;

/// Problems found while scanning Go source. Lines are 1-based.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ExtractError {
    #[error("line {line}: expected package clause")]
    MissingPackage { line: usize },
    #[error("line {line}: unterminated {what}")]
    Unterminated { what: &'static str, line: usize },
    #[error("line {line}: unbalanced `{delimiter}`")]
    Unbalanced { delimiter: char, line: usize },
    #[error("line {line}: expected {expected}, found {found}")]
    Unexpected {
        expected: &'static str,
        found: String,
        line: usize,
    },
    #[error("line {line}: function `{function}` has no receiver")]
    MissingReceiver { function: String, line: usize },
}

impl ExtractError {
    pub fn line(&self) -> usize {
        match self {
            ExtractError::MissingPackage { line }
            | ExtractError::Unterminated { line, .. }
            | ExtractError::Unbalanced { line, .. }
            | ExtractError::Unexpected { line, .. }
            | ExtractError::MissingReceiver { line, .. } => *line,
        }
    }
}

/// Failures of a `generate` or `scaffold` run.
#[derive(Debug, Error)]
pub enum GenError {
    #[error("{}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("invalid registry descriptor {}: {source}", path.display())]
    Yaml {
        path: PathBuf,
        #[source]
        source: serde_yaml::Error,
    },
    #[error("{}: {source}", path.display())]
    Extract {
        path: PathBuf,
        #[source]
        source: ExtractError,
    },
    #[error("template {name}: {source}")]
    Template {
        name: String,
        #[source]
        source: lithos_gotmpl_engine::Error,
    },
    #[error("invalid configuration: {0}")]
    Config(String),
    #[error(transparent)]
    Handler(#[from] HandlerError),
    #[error("cannot build template data: {0}")]
    Json(#[from] serde_json::Error),
}

impl GenError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: io::Error) -> Self {
        GenError::Io {
            path: path.into(),
            source,
        }
    }
}
