//! Evaluator tests over a small fixed document set.

use anyhow::{Result, bail, ensure};
use rstest::{fixture, rstest};
use serde_json::json;

use super::{EvalError, EvalResult, Evaluation, evaluate};
use crate::binding::{Binding, Document, Documents, NodeRef};
use crate::error::ErrorKind;
use crate::expr::parse;
use crate::ingest::{Native, ingest};
use crate::node::{Node, NodePath};
use crate::registry::Registry;

struct Fixture {
    registry: Registry,
    template: Node,
    stubs: Node,
}

impl Fixture {
    fn eval_at(&self, at: &NodePath, text: &str) -> Result<EvalResult> {
        let parsed = parse(text)?;
        let Some(body) = parsed.body else {
            bail!("{text} has no body");
        };
        let documents = Documents {
            template: &self.template,
            stubs: &self.stubs,
            state: None,
        };
        let binding = Binding::new(documents, &self.registry, Document::Template, at.clone());
        Ok(evaluate(&body, &binding))
    }

    fn eval(&self, text: &str) -> Result<EvalResult> {
        self.eval_at(&NodePath::root().key("x"), text)
    }

    fn value(&self, text: &str) -> Result<serde_json::Value> {
        match self.eval(text)?? {
            Evaluation::Resolved(node) => Ok(serde_json::to_value(&node)?),
            Evaluation::Deferred(blockers) => bail!("{text} deferred on {blockers:?}"),
        }
    }
}

#[fixture]
fn fixture() -> Fixture {
    let template = json!({
        "a": 3,
        "s": "text",
        "list": [1, 2, 3],
        "m": {"a": 1, "b": 2},
        "other": {"b": 5, "c": 6},
        "pending": "(( a ))",
        "x": 0
    });
    let build = || -> Result<Fixture> {
        Ok(Fixture {
            registry: Registry::standard()?,
            template: ingest("template", &Native::from(template))?,
            stubs: ingest("stub", &Native::from(json!({"val": 5})))?,
        })
    };
    build().unwrap_or_else(|err| panic!("fixture setup failed: {err}"))
}

#[rstest]
#[case("1 + 2 * 3", json!(7))]
#[case("(1 + 2) * 3", json!(9))]
#[case("7 / 2", json!(3))]
#[case("7 % 4", json!(3))]
#[case("1 + 1.5", json!(2.5))]
#[case("-a", json!(-3))]
#[case("a - 5", json!(-2))]
fn arithmetic(
    fixture: Fixture,
    #[case] text: &str,
    #[case] expected: serde_json::Value,
) -> Result<()> {
    let actual = fixture.value(text)?;
    ensure!(actual == expected, "{text}: {actual} != {expected}");
    Ok(())
}

#[rstest]
#[case("[1, 2] == list", json!(false))]
#[case("[1, 2, 3] == list", json!(true))]
#[case("3 == 3.0", json!(true))]
#[case("s != \"text\"", json!(false))]
#[case("\"b\" > \"a\"", json!(true))]
#[case("a <= 2", json!(false))]
#[case("!0", json!(true))]
#[case("list && \"\"", json!(false))]
#[case("0 || m", json!(true))]
#[case("false && missing", json!(false))]
#[case("true || missing", json!(true))]
fn comparison_and_logic(
    fixture: Fixture,
    #[case] text: &str,
    #[case] expected: serde_json::Value,
) -> Result<()> {
    let actual = fixture.value(text)?;
    ensure!(actual == expected, "{text}: {actual} != {expected}");
    Ok(())
}

#[rstest]
#[case("\"a = \" a", json!("a = 3"))]
#[case("s \"-\" true", json!("text-true"))]
#[case("list [4] 5", json!([1, 2, 3, 4, 5]))]
#[case("m other", json!({"a": 1, "b": 5, "c": 6}))]
fn concatenation(
    fixture: Fixture,
    #[case] text: &str,
    #[case] expected: serde_json::Value,
) -> Result<()> {
    let actual = fixture.value(text)?;
    ensure!(actual == expected, "{text}: {actual} != {expected}");
    Ok(())
}

#[rstest]
#[case("missing // 5", json!(5))]
#[case("a // 5", json!(3))]
#[case("a > 2 ? \"big\" : missing", json!("big"))]
#[case("a > 5 ? missing : \"small\"", json!("small"))]
#[case("length(list) + length(s)", json!(7))]
#[case("join(\",\", list, 4)", json!("1,2,3,4"))]
fn defaults_conditionals_and_calls(
    fixture: Fixture,
    #[case] text: &str,
    #[case] expected: serde_json::Value,
) -> Result<()> {
    let actual = fixture.value(text)?;
    ensure!(actual == expected, "{text}: {actual} != {expected}");
    Ok(())
}

#[rstest]
#[case("map[list|x|->x * 2]", json!([2, 4, 6]))]
#[case("map[list|i,x|->i]", json!([0, 1, 2]))]
#[case("map[m|k,v|->k]", json!(["a", "b"]))]
#[case("select[list|x|->x > 1]", json!([2, 3]))]
#[case("select[m|k,v|->v > 1]", json!({"b": 2}))]
#[case("sum[list|0|acc,x|->acc + x]", json!(6))]
#[case("sum[m|\"\"|acc,k,v|->acc k]", json!("ab"))]
#[case("map[list|x|->map[list|y|->x * y]]", json!([[1, 2, 3], [2, 4, 6], [3, 6, 9]]))]
fn comprehensions(
    fixture: Fixture,
    #[case] text: &str,
    #[case] expected: serde_json::Value,
) -> Result<()> {
    let actual = fixture.value(text)?;
    ensure!(actual == expected, "{text}: {actual} != {expected}");
    Ok(())
}

#[rstest]
#[case("1 / 0", ErrorKind::Type)]
#[case("9223372036854775807 + 1", ErrorKind::Type)]
#[case("\"a\" + 1", ErrorKind::Type)]
#[case("s < 1", ErrorKind::Type)]
#[case("missing", ErrorKind::UnknownReference)]
#[case("nope(1)", ErrorKind::Function)]
#[case("length(1)", ErrorKind::Function)]
#[case("map[a|x|->x]", ErrorKind::Type)]
#[case("s m", ErrorKind::Type)]
fn failures_are_local_errors(
    fixture: Fixture,
    #[case] text: &str,
    #[case] kind: ErrorKind,
) -> Result<()> {
    match fixture.eval(text)? {
        Err(err) => ensure!(err.kind() == kind, "{text}: {err} has kind {:?}", err.kind()),
        Ok(outcome) => bail!("{text} should fail, got {outcome:?}"),
    }
    Ok(())
}

#[rstest]
#[case("pending")]
#[case("pending + 1")]
#[case("[pending, a]")]
#[case("pending // 5")]
#[case("map[list|x|->pending]")]
fn pending_inputs_defer(fixture: Fixture, #[case] text: &str) -> Result<()> {
    let blocker = NodeRef::new(Document::Template, NodePath::root().key("pending"));
    let outcome = fixture.eval(text)??;
    let Evaluation::Deferred(blockers) = outcome else {
        bail!("{text} should defer, got {outcome:?}");
    };
    ensure!(blockers.contains(&blocker), "{text} deferred on {blockers:?}");
    Ok(())
}

#[rstest]
fn merge_takes_the_stub_value_at_the_node_path(fixture: Fixture) -> Result<()> {
    let at = NodePath::root().key("val");
    ensure!(fixture.eval_at(&at, "merge")?? == Evaluation::Resolved(Node::from(5_i64)));
    ensure!(
        fixture.eval_at(&NodePath::root().key("x"), "merge val")??
            == Evaluation::Resolved(Node::from(5_i64))
    );
    ensure!(
        fixture.eval_at(&NodePath::root().key("x"), "merge")?
            == Err(EvalError::MergeMissing("x".to_owned()))
    );
    ensure!(matches!(
        fixture.eval_at(&at, "merge replace")?,
        Err(EvalError::Type(_))
    ));
    Ok(())
}
