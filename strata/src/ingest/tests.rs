//! Ingestion tests.

use anyhow::{Result, bail, ensure};
use rstest::rstest;
use serde_json::json;

use super::{Native, ingest};
use crate::error::StrataError;
use crate::node::{Flags, MergeKind, NodePath, Value};

fn at<'n>(node: &'n crate::node::Node, dotted: &str) -> Result<&'n crate::node::Node> {
    let path = NodePath::parse_dotted(dotted).ok_or_else(|| anyhow::anyhow!("bad path"))?;
    node.at(&path)
        .ok_or_else(|| anyhow::anyhow!("nothing at {dotted}"))
}

#[rstest]
#[case("plain", Flags::empty(), false)]
#[case("(( a ))", Flags::empty(), true)]
#[case("x (( a )) y", Flags::empty(), true)]
#[case("(( &state a ))", Flags::STATE, true)]
#[case("(( &temporary &local 1 ))", Flags::TEMPORARY.union(Flags::LOCAL), true)]
#[case("(( prefer 2 ))", Flags::OVERRIDE_LOCK, true)]
#[case("((! a ))", Flags::ESCAPED, false)]
#[case("\\(( a ))", Flags::empty(), false)]
fn scalars_become_literals_or_expressions(
    #[case] text: &str,
    #[case] flags: Flags,
    #[case] pending: bool,
) -> Result<()> {
    let node = ingest("t", &Native::from(json!({"v": text})))?;
    let value = at(&node, "v")?;
    ensure!(value.flags() == flags, "{text}: flags {:?}", value.flags());
    ensure!(value.is_pending() == pending, "{text}: pending mismatch");
    Ok(())
}

#[rstest]
fn marker_only_expressions_are_flagged_nulls() -> Result<()> {
    let node = ingest("t", &Native::from(json!({"v": "(( &state ))"})))?;
    let value = at(&node, "v")?;
    ensure!(matches!(value.value(), Value::Null));
    ensure!(value.flags().contains(Flags::STATE));
    Ok(())
}

#[rstest]
fn parse_failures_stay_on_the_node() -> Result<()> {
    let node = ingest("t", &Native::from(json!({"v": "(( a + ))"})))?;
    let Value::Pending(pending) = at(&node, "v")?.value() else {
        bail!("expected a pending node");
    };
    ensure!(pending.parsed().is_err());
    ensure!(pending.source() == "(( a + ))");
    Ok(())
}

#[rstest]
#[case(json!({"<<": "(( merge ))", "a": 1}), Some(MergeKind::Include), Flags::empty())]
#[case(json!({"<<": "(( merge replace ))"}), Some(MergeKind::Replace), Flags::empty())]
#[case(json!({"<<<": "(( merge none ))"}), None, Flags::OVERRIDE_LOCK)]
#[case(json!({"<<": "(( &temporary ))"}), None, Flags::TEMPORARY)]
fn mapping_directives(
    #[case] input: serde_json::Value,
    #[case] merge: Option<MergeKind>,
    #[case] flags: Flags,
) -> Result<()> {
    let node = ingest("t", &Native::from(input))?;
    ensure!(node.merge() == merge.as_ref());
    ensure!(node.flags() == flags);
    ensure!(node.get("<<").is_none() && node.get("<<<").is_none());
    Ok(())
}

#[rstest]
#[case(
    json!([{"<<": "(( merge ))"}, 1]),
    MergeKind::Keyed { key: "name".to_owned(), at: 0 },
    1
)]
#[case(
    json!([1, {"<<": "(( merge on id ))"}, 2]),
    MergeKind::Keyed { key: "id".to_owned(), at: 1 },
    2
)]
fn sequence_directives_are_dropped(
    #[case] input: serde_json::Value,
    #[case] merge: MergeKind,
    #[case] len: usize,
) -> Result<()> {
    let node = ingest("t", &Native::from(input))?;
    ensure!(node.merge() == Some(&merge));
    ensure!(node.as_sequence().map(<[_]>::len) == Some(len));
    Ok(())
}

#[rstest]
#[case(json!({"<<": 1}))]
#[case(json!({"<<": "text"}))]
#[case(json!({"<<": "(( a + 1 ))"}))]
#[case(json!({"<<": "(( merge a.b ))"}))]
fn rejects_malformed_directives(#[case] input: serde_json::Value) -> Result<()> {
    match ingest("t", &Native::from(input)) {
        Err(err) if matches!(err.as_ref(), StrataError::InvalidDirective { .. }) => Ok(()),
        other => bail!("expected an invalid directive, got {other:?}"),
    }
}

#[rstest]
fn non_string_keys_name_the_mapping_path() -> Result<()> {
    let native = Native::Mapping(vec![(
        Native::String("outer".to_owned()),
        Native::Mapping(vec![(Native::Int(1), Native::Bool(true))]),
    )]);
    let Err(err) = ingest("t", &native) else {
        bail!("expected a structural error");
    };
    ensure!(err.to_string() == "non-string key 1 at 'outer'", "got {err}");
    Ok(())
}

#[rstest]
#[case(Native::UInt(u64::MAX), "u64")]
#[case(
    Native::Tagged { tag: "Secret".to_owned(), value: Box::new(Native::Null) },
    "tagged value !Secret"
)]
fn unsupported_kinds_are_rejected(#[case] value: Native, #[case] kind: &str) -> Result<()> {
    let native = Native::Sequence(vec![Native::Null, value]);
    match ingest("t", &native) {
        Err(err) => match err.as_ref() {
            StrataError::UnknownType { path, kind: found } => {
                ensure!(path.to_string() == "[1]");
                ensure!(found == kind);
                Ok(())
            }
            other => bail!("unexpected error {other}"),
        },
        Ok(node) => bail!("accepted {node:?}"),
    }
}

#[rstest]
fn nodes_record_their_origin() -> Result<()> {
    let node = ingest("stub.yml", &Native::from(json!({"a": {"b": [1]}})))?;
    let leaf = at(&node, "a.b[0]")?;
    ensure!(leaf.origin().source() == "stub.yml");
    ensure!(leaf.origin().path().to_string() == "a.b[0]");
    Ok(())
}

#[rstest]
fn deserializes_from_any_self_describing_format() -> Result<()> {
    let native: Native = serde_json::from_str(r#"{"b": 1, "a": [true, null, 1.5, "x"]}"#)?;
    let Native::Mapping(entries) = &native else {
        bail!("expected a mapping");
    };
    let keys: Vec<String> = entries.iter().map(|(key, _)| key.to_string()).collect();
    ensure!(keys == ["\"b\"", "\"a\""]);
    ensure!(matches!(
        entries.get(1),
        Some((_, Native::Sequence(items))) if items.len() == 4
    ));
    Ok(())
}
