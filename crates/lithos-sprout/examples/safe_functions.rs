// SPDX-License-Identifier: Apache-2.0 OR MIT
use lithos_gotmpl_core::{install_text_template_functions, FunctionRegistryBuilder, Template};
use lithos_sprout::{add_sprout_registries, Handler};
use serde_json::json;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let mut handler = Handler::builder().safe_functions(true).build();
    add_sprout_registries(&mut handler)?;

    let mut builder = FunctionRegistryBuilder::new();
    install_text_template_functions(&mut builder);
    handler.install(&mut builder);

    let template = Template::parse_with_functions(
        "safe",
        "port={{ safeToInt .port }} timeout={{ safeToDuration .timeout }}",
        builder.build(),
    )?;

    let rendered = template.render(&json!({"port": "not-a-port", "timeout": "30s"}))?;
    println!("{}", rendered);
    Ok(())
}
