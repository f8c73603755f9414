// SPDX-License-Identifier: Apache-2.0 OR MIT
use lithos_gotmpl_core::Template;
use lithos_sprout::sprout_functions;
use serde_json::json;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let registry = sprout_functions()?;

    let template = Template::parse_with_functions(
        "sprout",
        "{{ .name }} is {{ sub 2024 (toInt .born) }} years old, next birthday in {{ durationRound .wait }}",
        registry,
    )?;

    let rendered = template.render(&json!({"name": "sprout", "born": "1990", "wait": "200h"}))?;
    println!("{}", rendered);
    Ok(())
}
