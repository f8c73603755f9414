// SPDX-License-Identifier: Apache-2.0 OR MIT
//! Template rendering for generated Go files.
//!
//! Templates run on `lithos-gotmpl-engine` with the Go builtins, the Sprig
//! helpers and the sprout registries installed, so they can use the same
//! helper set the generated code targets.

use heck::ToLowerCamelCase;
use lithos_gotmpl_core::{
    install_text_template_functions, FunctionRegistry, FunctionRegistryBuilder, Template,
};
use serde::Serialize;
use serde_json::Value;
use tracing::debug;

use crate::error::GenError;
use crate::golang::{Field, Fields, Function, Import, Package};
use crate::scaffold::RegistryConfig;

pub const FUNCTIONS_TEMPLATE_NAME: &str = "functions.go.tmpl";
pub const REGISTRY_TEMPLATE_NAME: &str = "registry.go.tmpl";

/// Must/Safe wrappers for every method returning an error.
pub const FUNCTIONS_TEMPLATE: &str = include_str!("../templates/functions.go.tmpl");
/// Registry skeleton rendered from a YAML descriptor.
pub const REGISTRY_TEMPLATE: &str = include_str!("../templates/registry.go.tmpl");

const DEFAULT_RECEIVER: &str = "r";

/// Returns a registry with the Go builtins, Sprig and sprout helpers.
pub fn template_functions() -> Result<FunctionRegistry, GenError> {
    let mut builder = FunctionRegistryBuilder::new();
    install_text_template_functions(&mut builder);
    lithos_sprig::install_sprig_functions(&mut builder);
    lithos_sprout::install_sprout_functions(&mut builder)?;
    Ok(builder.build())
}

/// Renders named templates against serialized data.
#[derive(Clone)]
pub struct Renderer {
    functions: FunctionRegistry,
}

impl Renderer {
    pub fn new() -> Result<Self, GenError> {
        Ok(Self {
            functions: template_functions()?,
        })
    }

    pub fn render(&self, name: &str, source: &str, data: &Value) -> Result<String, GenError> {
        let template_error = |source| GenError::Template {
            name: name.to_string(),
            source,
        };
        let template = Template::parse_with_functions(name, source, self.functions.clone())
            .map_err(template_error)?;
        let output = template.render(data).map_err(template_error)?;
        debug!(template = name, bytes = output.len(), "rendered template");
        Ok(output)
    }

    /// Renders the wrapper file for an extracted package.
    pub fn render_package(&self, package: &Package) -> Result<String, GenError> {
        let data = serde_json::to_value(PackageView::new(package))?;
        self.render(FUNCTIONS_TEMPLATE_NAME, FUNCTIONS_TEMPLATE, &data)
    }

    /// Renders the registry skeleton for a descriptor.
    pub fn render_registry(&self, config: &RegistryConfig) -> Result<String, GenError> {
        let data = serde_json::to_value(config)?;
        self.render(REGISTRY_TEMPLATE_NAME, REGISTRY_TEMPLATE, &data)
    }
}

impl std::fmt::Debug for Renderer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Renderer").finish_non_exhaustive()
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "PascalCase")]
struct PackageView {
    name: String,
    source: String,
    /// Import specs referenced by the wrapper signatures.
    imports: Vec<String>,
    functions: Vec<FunctionView>,
    wrapped: Vec<FunctionView>,
    plain: Vec<FunctionView>,
}

impl PackageView {
    fn new(package: &Package) -> Self {
        let functions: Vec<FunctionView> = package.functions.iter().map(FunctionView::new).collect();
        let (wrapped, plain): (Vec<FunctionView>, Vec<FunctionView>) = functions
            .iter()
            .cloned()
            .partition(|function| function.returns_error);

        let imports = package
            .imports
            .iter()
            .filter(|import| match import_name(import) {
                ImportName::Blank => false,
                ImportName::Opaque => true,
                ImportName::Known(name) => {
                    wrapped.iter().any(|function| function.mentions_package(name))
                }
            })
            .map(ToString::to_string)
            .collect();

        Self {
            name: package.name.clone(),
            source: package
                .path
                .as_ref()
                .map(|path| path.display().to_string())
                .unwrap_or_default(),
            imports,
            functions,
            wrapped,
            plain,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "PascalCase")]
struct ReceiverView {
    name: String,
    #[serde(rename = "Type")]
    type_name: String,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "PascalCase")]
struct FunctionView {
    name: String,
    template_name: String,
    receiver: ReceiverView,
    doc: Vec<String>,
    body: String,
    signature: String,
    returns: String,
    returns_value: String,
    value_names: String,
    call_args: String,
    returns_error: bool,
    line: usize,
}

impl FunctionView {
    fn new(function: &Function) -> Self {
        let params = named_params(&function.params);
        let call_args = params
            .iter()
            .map(|field| {
                if field.is_variadic() {
                    format!("{}...", field.name)
                } else {
                    field.name.clone()
                }
            })
            .collect::<Vec<_>>()
            .join(", ");

        let returns_error = function.returns_error();
        let value_types: Vec<&str> = function
            .results
            .iter()
            .take(function.results.len() - usize::from(returns_error))
            .map(|field| field.type_name.as_str())
            .collect();
        let value_names = (0..value_types.len())
            .map(|idx| format!("v{idx}"))
            .collect::<Vec<_>>()
            .join(", ");

        let receiver_name = if function.receiver.name.is_empty() || function.receiver.name == "_" {
            DEFAULT_RECEIVER.to_string()
        } else {
            function.receiver.name.clone()
        };

        Self {
            name: function.name.clone(),
            template_name: function.name.to_lower_camel_case(),
            receiver: ReceiverView {
                name: receiver_name,
                type_name: function.receiver.type_name.clone(),
            },
            doc: function.doc.clone(),
            body: function.body.clone(),
            signature: Fields(params).to_string(),
            returns: result_list(&function.results),
            returns_value: type_list(&value_types),
            value_names,
            call_args,
            returns_error,
            line: function.line,
        }
    }

    fn mentions_package(&self, name: &str) -> bool {
        let prefix = format!("{name}.");
        [&self.signature, &self.returns, &self.receiver.type_name]
            .into_iter()
            .any(|text| {
                text.match_indices(&prefix).any(|(idx, _)| {
                    text[..idx]
                        .chars()
                        .next_back()
                        .map_or(true, |c| !(c.is_alphanumeric() || c == '_'))
                })
            })
    }
}

/// Gives unnamed parameters an `argN` name so they can be forwarded.
fn named_params(params: &Fields) -> Vec<Field> {
    params
        .iter()
        .enumerate()
        .map(|(idx, field)| {
            if field.name.is_empty() || field.name == "_" {
                Field::new(format!("arg{idx}"), field.type_name.clone())
            } else {
                field.clone()
            }
        })
        .collect()
}

fn result_list(results: &Fields) -> String {
    match results.0.as_slice() {
        [] => String::new(),
        [single] if single.name.is_empty() => single.type_name.clone(),
        _ => format!("({results})"),
    }
}

fn type_list(types: &[&str]) -> String {
    match types {
        [] => String::new(),
        [single] => (*single).to_string(),
        _ => format!("({})", types.join(", ")),
    }
}

enum ImportName<'a> {
    /// `_` imports never appear in signatures.
    Blank,
    /// Dot imports and paths whose package name cannot be derived.
    Opaque,
    Known(&'a str),
}

/// The identifier an import is referenced by: the alias, or the last path
/// element without a `/vN` major-version element or `.vN` suffix.
fn import_name(import: &Import) -> ImportName<'_> {
    let name = match import.alias.as_deref() {
        Some("_") => return ImportName::Blank,
        Some(".") => return ImportName::Opaque,
        Some(alias) => alias,
        None => {
            let mut elements = import.path.rsplit('/');
            let last = elements.next().unwrap_or_default();
            let last = match elements.next() {
                Some(previous) if is_major_version(last) => previous,
                _ => last,
            };
            match last.rsplit_once('.') {
                Some((base, version)) if is_major_version(version) => base,
                _ => last,
            }
        }
    };
    if is_identifier(name) {
        ImportName::Known(name)
    } else {
        ImportName::Opaque
    }
}

fn is_major_version(element: &str) -> bool {
    element
        .strip_prefix('v')
        .is_some_and(|digits| !digits.is_empty() && digits.bytes().all(|b| b.is_ascii_digit()))
}

fn is_identifier(name: &str) -> bool {
    let mut chars = name.chars();
    chars
        .next()
        .is_some_and(|first| first.is_alphabetic() || first == '_')
        && chars.all(|c| c.is_alphanumeric() || c == '_')
}
