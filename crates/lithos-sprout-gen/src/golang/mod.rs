// SPDX-License-Identifier: Apache-2.0 OR MIT
//! Minimal Go source model: just enough to find methods, their signatures,
//! doc comments and bodies without a Go toolchain.

use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};

use serde::Serialize;

use crate::error::{ExtractError, GenError};

mod extract;
pub mod lexer;

/// Placeholder for types the extractor does not model.
pub const UNKNOWN_TYPE: &str = "unknown";

/// One `import` spec.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Import {
    pub path: String,
    pub alias: Option<String>,
}

impl fmt::Display for Import {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.alias {
            Some(alias) => write!(f, "{alias} \"{}\"", self.path),
            None => write!(f, "\"{}\"", self.path),
        }
    }
}

/// A name/type pair. The name is empty for unnamed parameters and results.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Field {
    pub name: String,
    pub type_name: String,
}

impl Field {
    pub fn new(name: impl Into<String>, type_name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            type_name: type_name.into(),
        }
    }

    pub fn is_variadic(&self) -> bool {
        self.type_name.starts_with("...")
    }
}

impl fmt::Display for Field {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.name.is_empty() {
            f.write_str(&self.type_name)
        } else {
            write!(f, "{} {}", self.name, self.type_name)
        }
    }
}

/// Ordered parameter or result list; renders as `a string, b string`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Fields(pub Vec<Field>);

impl Fields {
    pub fn iter(&self) -> std::slice::Iter<'_, Field> {
        self.0.iter()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn last(&self) -> Option<&Field> {
        self.0.last()
    }
}

impl fmt::Display for Fields {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (idx, field) in self.0.iter().enumerate() {
            if idx > 0 {
                f.write_str(", ")?;
            }
            write!(f, "{field}")?;
        }
        Ok(())
    }
}

/// A method declaration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Function {
    pub name: String,
    pub receiver: Field,
    pub params: Fields,
    pub results: Fields,
    pub doc: Vec<String>,
    /// Source text of the body, braces included; empty for bodyless declarations.
    pub body: String,
    pub line: usize,
}

impl Function {
    pub fn returns_error(&self) -> bool {
        self.results
            .last()
            .is_some_and(|result| result.type_name == "error")
    }
}

/// Everything extracted from one Go file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Package {
    pub name: String,
    pub imports: Vec<Import>,
    pub functions: Vec<Function>,
    pub path: Option<PathBuf>,
}

/// Extracts the package clause, imports and methods from Go source text.
pub fn extract_source(source: &str) -> Result<Package, ExtractError> {
    extract::extract(source)
}

/// Reads and extracts a Go file.
pub fn extract_file(path: &Path) -> Result<Package, GenError> {
    let source = fs::read_to_string(path).map_err(|source| GenError::io(path, source))?;
    let mut package = extract_source(&source).map_err(|source| GenError::Extract {
        path: path.to_path_buf(),
        source,
    })?;
    package.path = Some(path.to_path_buf());
    Ok(package)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fields_render_names_and_types() {
        let params = Fields(vec![Field::new("a", "string"), Field::new("b", "string")]);
        assert_eq!(params.to_string(), "a string, b string");
        let results = Fields(vec![Field::new("", "error")]);
        assert_eq!(results.to_string(), "error");
        assert_eq!(Fields::default().to_string(), "");
    }

    #[test]
    fn imports_render_as_go_specs() {
        let plain = Import {
            path: "fmt".into(),
            alias: None,
        };
        let aliased = Import {
            path: "github.com/spf13/cast".into(),
            alias: Some("c".into()),
        };
        assert_eq!(plain.to_string(), "\"fmt\"");
        assert_eq!(aliased.to_string(), "c \"github.com/spf13/cast\"");
    }
}
