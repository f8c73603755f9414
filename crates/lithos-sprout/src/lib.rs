// SPDX-License-Identifier: Apache-2.0 OR MIT
//! Lithos Sprout provides sprout-style helper registries (type conversion,
//! arithmetic and time formatting) for Rust-based Go template interpreters
//! built on `lithos-gotmpl-engine`.
//!
//! Registries are grouped by topic and linked into a [`Handler`], which owns
//! the function-name table, resolves aliases, attaches notices and can add
//! `safe<Name>` variants that swallow errors.

#![forbid(unsafe_code)]

use lithos_gotmpl_core::{
    install_text_template_functions, FunctionRegistry, FunctionRegistryBuilder,
};

mod error;
mod functions;
pub mod gotime;
mod handler;
mod notice;
mod number;
mod registry;

pub use error::HandlerError;
pub use functions::conversion::{self, ConversionError, ConversionRegistry};
pub use functions::numeric::{self, NumericRegistry};
pub use functions::time::{self, TimeRegistry};
pub use handler::{Clock, Handler, HandlerBuilder, HandlerLink};
pub use notice::{Notice, NoticeKind};
pub use number::{Number, NumericError, Operation};
pub use registry::{AliasMap, FunctionMap, Registry};

/// Links the conversion, numeric and time registries into `handler`.
pub fn add_sprout_registries(handler: &mut Handler) -> Result<(), HandlerError> {
    handler
        .add_registry(ConversionRegistry::new())?
        .add_registry(NumericRegistry::new())?
        .add_registry(TimeRegistry::new())?;
    Ok(())
}

/// Returns a handler with every sprout registry linked and default options.
pub fn sprout_handler() -> Result<Handler, HandlerError> {
    let mut handler = Handler::new();
    add_sprout_registries(&mut handler)?;
    Ok(handler)
}

/// Registers the sprout helpers into an existing function registry builder.
pub fn install_sprout_functions(builder: &mut FunctionRegistryBuilder) -> Result<(), HandlerError> {
    sprout_handler()?.install(builder);
    Ok(())
}

/// Returns a registry populated with the Go core helpers plus the sprout
/// registries.
pub fn sprout_functions() -> Result<FunctionRegistry, HandlerError> {
    let mut builder = FunctionRegistryBuilder::new();
    install_text_template_functions(&mut builder);
    install_sprout_functions(&mut builder)?;
    Ok(builder.build())
}

#[cfg(test)]
mod tests {
    use super::*;
    use lithos_gotmpl_core::Template;
    use serde_json::json;

    #[test]
    fn template_with_sprout_helpers() {
        let registry = sprout_functions().unwrap();
        let template = Template::parse_with_functions(
            "sprout",
            "{{ add .a .b | toString }} {{ toBool .flag }} {{ toInt \"0x10\" }}",
            registry,
        )
        .unwrap();
        let rendered = template
            .render(&json!({"a": 2, "b": 3, "flag": "true"}))
            .unwrap();
        assert_eq!(rendered, "5 true 16");
    }

    #[test]
    fn handler_links_all_registries() {
        let handler = sprout_handler().unwrap();
        assert_eq!(
            handler.registry_uids(),
            [
                "lithos/sprout.conversion",
                "lithos/sprout.numeric",
                "lithos/sprout.time"
            ]
        );
        assert!(handler.functions().contains("durationRound"));
        assert_eq!(handler.aliases().original_of("biggest"), Some("max"));
    }
}
