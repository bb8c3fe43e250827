//! Interpolated scalars evaluated through the full cascade.

mod common;

use anyhow::{Result, ensure};
use rstest::{fixture, rstest};
use serde_json::{Value as Json, json};
use strata::{Native, Registry, ingest, resolve};

use common::{to_json, yaml};

#[fixture]
fn registry() -> Registry {
    Registry::standard().unwrap_or_else(|err| panic!("standard registry: {err}"))
}

fn evaluate(registry: &Registry, text: &str) -> Result<Json> {
    let template = ingest(
        "template",
        &Native::from(json!({
            "name": "web",
            "port": 8080,
            "list": [1, 2],
            "out": text
        })),
    )?;
    let tree = resolve(registry, template, []).into_result()?;
    Ok(to_json(&tree)?
        .get("out")
        .cloned()
        .unwrap_or(Json::Null))
}

#[rstest]
#[case("plain text", json!("plain text"))]
#[case("test(", json!("test("))]
#[case("(( port ))", json!(8080))]
#[case("(( list ))", json!([1, 2]))]
#[case("http://(( name )):(( port ))/", json!("http://web:8080/"))]
#[case("(( name ))-(( port ))", json!("web-8080"))]
#[case("a ((( name )))", json!("a (web)"))]
#[case("(( \"))\" ))", json!("))"))]
#[case("a (( b", json!("a (( b"))]
fn resolves_interpolations(
    registry: Registry,
    #[case] text: &str,
    #[case] expected: Json,
) -> Result<()> {
    let actual = evaluate(&registry, text)?;
    ensure!(actual == expected, "{text}: got {actual}");
    Ok(())
}

#[rstest]
#[case("((! name ))", json!("(( name ))"))]
#[case("((!! name ))", json!("((! name ))"))]
#[case("\\(( name ))", json!("\\(( name ))"))]
fn escapes_survive_one_run(
    registry: Registry,
    #[case] text: &str,
    #[case] expected: Json,
) -> Result<()> {
    let actual = evaluate(&registry, text)?;
    ensure!(actual == expected, "{text}: got {actual}");
    Ok(())
}

#[rstest]
fn escaped_output_evaluates_in_the_next_run(registry: Registry) -> Result<()> {
    let template = yaml(
        "template.yml",
        "
        greeting: hello
        deferred: ((! greeting ))
        ",
    )?;
    let first = resolve(&registry, template, []).into_result()?;
    ensure!(to_json(&first)?.get("deferred") == Some(&json!("(( greeting ))")));

    let reparsed = ingest("first", &Native::from(to_json(&first)?))?;
    let second = resolve(&registry, reparsed, []).into_result()?;
    ensure!(to_json(&second)? == json!({"greeting": "hello", "deferred": "hello"}));
    Ok(())
}

#[rstest]
fn interpolation_waits_for_pending_operands(registry: Registry) -> Result<()> {
    let template = yaml(
        "template.yml",
        "
        host: (( prefix \".example.org\" ))
        prefix: (( name ))
        name: api
        url: https://(( host ))/v1
        ",
    )?;
    let resolution = resolve(&registry, template, []);
    ensure!(resolution.passes == 3, "took {} passes", resolution.passes);
    let tree = resolution.into_result()?;
    ensure!(to_json(&tree)?.get("url") == Some(&json!("https://api.example.org/v1")));
    Ok(())
}
