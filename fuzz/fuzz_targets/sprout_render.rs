#![no_main]

use libfuzzer_sys::fuzz_target;
use lithos_gotmpl_core::{FunctionRegistry, Template};
use lithos_sprout::sprout_functions;
use once_cell::sync::Lazy;
use serde_json::json;

static REGISTRY: Lazy<Option<FunctionRegistry>> = Lazy::new(|| sprout_functions().ok());

fuzz_target!(|data: &[u8]| {
    let Some(registry) = REGISTRY.as_ref() else {
        return;
    };
    let source = match std::str::from_utf8(data) {
        Ok(src) => src,
        Err(_) => return,
    };

    if let Ok(template) = Template::parse_with_functions("fuzz-sprout", source, registry.clone()) {
        let _ = template.render(&json!({
            "n": 42,
            "f": 1.5,
            "s": "2024-05-01T10:00:00Z",
            "list": [1, 2, 3],
        }));
    }
});
