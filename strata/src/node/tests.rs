//! Unit tests for node paths, accessors and serialisation.

use anyhow::{Context, Result, ensure};
use rstest::rstest;
use serde_json::json;

use super::{Flags, Mapping, Node, NodePath, Pending, Segment, Value};

fn sample() -> Node {
    let mut inner = Mapping::new();
    inner.insert("c".to_owned(), Node::from(3_i64));
    let mut root = Mapping::new();
    root.insert(
        "a".to_owned(),
        Node::from(vec![Node::from("x"), Node::from(inner)]),
    );
    root.insert(
        "p".to_owned(),
        Node::new(Value::Pending(Pending::new(
            "(( a ))".to_owned(),
            Err(crate::expr::ParseError::new("unused", 0, 0)),
        ))),
    );
    Node::from(root)
}

#[rstest]
#[case(NodePath::root(), "<root>")]
#[case(NodePath::root().key("a"), "a")]
#[case(NodePath::root().key("a").index(1).key("c"), "a[1].c")]
#[case(NodePath::root().index(0).index(2), "[0][2]")]
fn renders_paths(#[case] path: NodePath, #[case] expected: &str) {
    assert_eq!(path.to_string(), expected);
}

#[rstest]
#[case("a.b[0].c", Some(vec![
    Segment::Key("a".into()),
    Segment::Key("b".into()),
    Segment::Index(0),
    Segment::Key("c".into()),
]))]
#[case("", Some(Vec::new()))]
#[case("a..b", None)]
#[case("a[x]", None)]
fn parses_dotted_paths(#[case] text: &str, #[case] expected: Option<Vec<Segment>>) {
    let parsed = NodePath::parse_dotted(text);
    assert_eq!(parsed, expected.map(NodePath::from_segments));
}

#[rstest]
fn walks_to_descendants() -> Result<()> {
    let tree = sample();
    let path = NodePath::root().key("a").index(1).key("c");
    let found = tree.at(&path).context("descendant missing")?;
    ensure!(found.as_int() == Some(3), "unexpected node {found:?}");
    ensure!(tree.at(&NodePath::root().key("missing")).is_none());
    Ok(())
}

#[rstest]
fn lists_pending_descendants() {
    let tree = sample();
    let pending = tree.pending_paths(&NodePath::root());
    assert_eq!(pending, vec![NodePath::root().key("p")]);
}

#[rstest]
#[case(Node::null(), false)]
#[case(Node::from(0_i64), false)]
#[case(Node::from(""), false)]
#[case(Node::from(Vec::new()), false)]
#[case(Node::from(false), false)]
#[case(Node::from(2_i64), true)]
#[case(Node::from("x"), true)]
fn applies_truthiness(#[case] node: Node, #[case] expected: bool) {
    assert_eq!(node.is_truthy(), expected);
}

#[rstest]
fn equality_ignores_markers() {
    let plain = Node::from(1_i64);
    let marked = Node::from(1_i64).with_flags(Flags::STATE);
    assert_eq!(plain, marked);
}

#[rstest]
fn serialises_pending_as_source() -> Result<()> {
    let value = serde_json::to_value(sample())?;
    ensure!(
        value == json!({"a": ["x", {"c": 3}], "p": "(( a ))"}),
        "unexpected serialisation {value}"
    );
    Ok(())
}
