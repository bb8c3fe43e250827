//! Resolution of templates against stub stacks.

mod common;

use anyhow::{Result, bail, ensure};
use rstest::{fixture, rstest};
use serde_json::json;
use strata::{Classification, Registry, StrataError, resolve};
use test_helpers::text::report_lines;

use common::{to_json, yaml};

#[fixture]
fn registry() -> Registry {
    Registry::standard().unwrap_or_else(|err| panic!("standard registry: {err}"))
}

#[rstest]
fn later_stubs_take_precedence(registry: Registry) -> Result<()> {
    let template = yaml("template.yml", "val: (( a ))\n")?;
    let stubs = [yaml("stub1.yml", "a: 1\n")?, yaml("stub2.yml", "a: 2\n")?];
    let tree = resolve(&registry, template, stubs).into_result()?;
    ensure!(to_json(&tree)? == json!({"val": 2}));
    Ok(())
}

#[rstest]
fn resolves_a_layered_manifest(registry: Registry) -> Result<()> {
    let template = yaml(
        "template.yml",
        r#"
        name: (( meta.name ))
        meta:
          name: web
          env: dev
        replicas: 1
        labels: (( join(",", meta.name, meta.env) ))
        endpoint: http://(( meta.name )).(( domain )):(( port ))/
        port: (( base_port + replicas ))
        jobs:
          - name: api
            instances: (( replicas * 2 ))
          - name: worker
            instances: 1
        job_names: (( map[jobs|job|->job.name] ))
        busy: (( select[jobs|job|->job.instances > 1] ))
        total: (( sum[jobs|0|acc,job|->acc + job.instances] ))
        "#,
    )?;
    let stub = yaml(
        "prod.yml",
        r"
        meta:
          env: prod
        replicas: 3
        domain: example.org
        base_port: 8000
        ",
    )?;
    let tree = resolve(&registry, template, [stub]).into_result()?;
    let expected = json!({
        "name": "web",
        "meta": {"name": "web", "env": "prod"},
        "replicas": 3,
        "labels": "web,prod",
        "endpoint": "http://web.example.org:8003/",
        "port": 8003,
        "jobs": [
            {"name": "api", "instances": 6},
            {"name": "worker", "instances": 1}
        ],
        "job_names": ["api", "worker"],
        "busy": [{"name": "api", "instances": 6}],
        "total": 7
    });
    let actual = to_json(&tree)?;
    ensure!(actual == expected, "got {actual}");
    Ok(())
}

#[rstest]
fn keyed_list_merge_with_the_portable_directive(registry: Registry) -> Result<()> {
    let template = yaml(
        "template.yml",
        "
        jobs:
          - <<<: (( merge on id ))
          - id: a
            size: small
          - id: b
            size: small
        ",
    )?;
    let stub = yaml(
        "stub.yml",
        "
        jobs:
          - id: b
            size: large
          - id: c
            size: tiny
        ",
    )?;
    let tree = resolve(&registry, template, [stub]).into_result()?;
    ensure!(
        to_json(&tree)?
            == json!({"jobs": [
                {"id": "c", "size": "tiny"},
                {"id": "a", "size": "small"},
                {"id": "b", "size": "large"}
            ]})
    );
    Ok(())
}

#[rstest]
fn unresolved_nodes_are_reported_in_path_order(registry: Registry) -> Result<()> {
    let template = yaml(
        "template.yml",
        "
        z: (( missing ))
        a: (( b ))
        b: (( a ))
        m:
          uses: (( z + 1 ))
        ok: (( 1 + 1 ))
        ",
    )?;
    let Err(err) = resolve(&registry, template, []).into_result() else {
        bail!("expected the run to get stuck");
    };
    let rendered = err.to_string();
    ensure!(
        report_lines(&rendered)
            == [
                "a: @ dependency cycle: a -> b -> a",
                "b: @ dependency cycle: b -> a -> b",
                "m.uses: - unresolved dependency 'z'",
                "z: * unknown reference 'missing'",
            ],
        "got {rendered}"
    );
    let StrataError::Unresolved(report) = err.as_ref() else {
        bail!("unexpected error kind");
    };
    let classes: Vec<Classification> = report
        .errors()
        .iter()
        .map(|error| error.classification)
        .collect();
    ensure!(
        classes
            == [
                Classification::Cyclic,
                Classification::Cyclic,
                Classification::Propagated,
                Classification::Local,
            ]
    );
    ensure!(to_json(report.partial())?.get("ok") == Some(&json!(2)));
    ensure!(to_json(report.partial())?.get("z") == Some(&json!("(( missing ))")));
    Ok(())
}

#[rstest]
fn a_second_resolution_changes_nothing(registry: Registry) -> Result<()> {
    let template = yaml(
        "template.yml",
        "
        a: (( b * 2 ))
        b: 21
        text: value (( a ))
        ",
    )?;
    let first = resolve(&registry, template, []).into_result()?;
    let second = resolve(&registry, first.clone(), []);
    ensure!(second.passes == 0);
    ensure!(second.into_result()? == first);
    ensure!(to_json(&first)? == json!({"a": 42, "b": 21, "text": "value 42"}));
    Ok(())
}

#[rstest]
fn validate_reports_failed_conditions(registry: Registry) -> Result<()> {
    let template = yaml(
        "template.yml",
        r#"
        good: (( validate(m, "map", "!empty") ))
        bad: (( validate(l, "map") ))
        m:
          k: v
        l: [1]
        "#,
    )?;
    let resolution = resolve(&registry, template, []);
    let lines: Vec<String> = resolution.errors.iter().map(ToString::to_string).collect();
    ensure!(lines.len() == 1, "got {lines:?}");
    ensure!(
        lines.first().is_some_and(|line| line.starts_with("bad: * validate:")),
        "got {lines:?}"
    );
    Ok(())
}
