// SPDX-License-Identifier: Apache-2.0 OR MIT
use chrono::{DateTime, Utc};
use lithos_gotmpl_core::{
    install_text_template_functions, FunctionRegistry, FunctionRegistryBuilder, Template,
};
use lithos_sprout::{add_sprout_registries, sprout_functions, Handler};
use serde_json::{json, Value};

fn fixed_now() -> DateTime<Utc> {
    DateTime::parse_from_rfc3339("2024-05-01T10:00:00Z")
        .unwrap()
        .with_timezone(&Utc)
}

fn registry(safe: bool) -> FunctionRegistry {
    let mut handler = Handler::builder()
        .clock(fixed_now)
        .safe_functions(safe)
        .build();
    add_sprout_registries(&mut handler).unwrap();

    let mut builder = FunctionRegistryBuilder::new();
    install_text_template_functions(&mut builder);
    handler.install(&mut builder);
    builder.build()
}

fn render_with(registry: FunctionRegistry, source: &str, data: &Value) -> String {
    Template::parse_with_functions("test", source, registry)
        .unwrap()
        .render(data)
        .unwrap()
}

fn render(source: &str) -> String {
    render_with(registry(false), source, &json!({"t": "2024-05-01T10:00:00Z"}))
}

#[test]
fn conversion_helpers_render() {
    assert_eq!(render("{{ toOctal 777 }}"), "511");
    assert_eq!(render("{{ atoi \"42\" | add1 }}"), "43");
    assert_eq!(render("{{ toBool \"t\" }}/{{ toBool 0 }}"), "true/false");
    assert_eq!(render("{{ toString 1.50 }}"), "1.5");
    assert_eq!(render("{{ toDuration \"90m\" }}"), "1h30m0s");
}

#[test]
fn deprecated_aliases_still_work() {
    assert_eq!(render("{{ toDecimal \"10\" }}"), "8");
    assert_eq!(render("{{ biggest 1 5 3 }}"), "5");
    assert_eq!(
        render("{{ date_in_zone \"15:04\" (date_modify \"1h\" .t) \"UTC\" }}"),
        "11:00"
    );
}

#[test]
fn numeric_helpers_render() {
    assert_eq!(render("{{ round 3.746 2 }}"), "3.75");
    assert_eq!(render("{{ round 3.746 2 0.7 }}"), "3.74");
    assert_eq!(render("{{ add }}|{{ mulf }}"), "0|1");
    assert_eq!(render("{{ add 1 2 3 | mul 2 }}"), "12");
    assert_eq!(render("{{ divf 7 2 }}"), "3.5");
    assert_eq!(render("{{ floor 2.9 }}-{{ ceil 2.1 }}"), "2-3");
}

#[test]
fn time_helpers_use_the_handler_clock() {
    assert_eq!(render("{{ htmlDateInZone (now) \"UTC\" }}"), "2024-05-01");
    assert_eq!(render("{{ durationRound \"24h5s\" }}"), "1d");
    assert_eq!(
        render("{{ dateInZone \"Jan 2, 2006 15:04 MST\" .t \"UTC\" }}"),
        "May 1, 2024 10:00 UTC"
    );
    assert_eq!(render("{{ unixEpoch .t }}"), "1714557600");
    assert_eq!(render("{{ duration 3600 }}"), "1h0m0s");
}

#[test]
fn errors_abort_the_render() {
    let template =
        Template::parse_with_functions("test", "{{ toInt \"abc\" }}", registry(false)).unwrap();
    assert!(template.render(&json!({})).is_err());

    let template =
        Template::parse_with_functions("test", "{{ div 1 0 }}", registry(false)).unwrap();
    assert!(template.render(&json!({})).is_err());
}

#[test]
fn safe_variants_render_empty_output() {
    let rendered = render_with(
        registry(true),
        "[{{ safeToInt \"abc\" }}][{{ safeDiv 1 0 }}][{{ safeAdd 1 2 }}]",
        &json!({}),
    );
    assert_eq!(rendered, "[][][3]");
}

#[test]
fn default_registry_includes_core_helpers() {
    let rendered = render_with(
        sprout_functions().unwrap(),
        "{{ if gt (toInt .n) 3 }}big{{ else }}small{{ end }}",
        &json!({"n": "5"}),
    );
    assert_eq!(rendered, "big");
}
