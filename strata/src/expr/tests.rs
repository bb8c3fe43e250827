//! Parser tests covering precedence, references and special forms.

use anyhow::{Result, bail, ensure};
use rstest::rstest;

use super::{
    BinaryOp, ComprehensionKind, Expr, Literal, Marker, MergeExpr, RefSegment, Reference, parse,
};

fn reference(absolute: bool, path: &[&str]) -> Expr {
    Expr::Reference(Reference {
        absolute,
        path: path
            .iter()
            .map(|segment| RefSegment::Key((*segment).to_owned()))
            .collect(),
    })
}

fn body(text: &str) -> Result<Expr> {
    match parse(text)?.body {
        Some(expr) => Ok(expr),
        None => bail!("expression '{text}' has no body"),
    }
}

#[rstest]
#[case("42", Expr::Literal(Literal::Int(42)))]
#[case("1.5", Expr::Literal(Literal::Float(1.5)))]
#[case("\"a\\\"b\"", Expr::Literal(Literal::String("a\"b".into())))]
#[case("true", Expr::Literal(Literal::Bool(true)))]
#[case("nil", Expr::Literal(Literal::Null))]
#[case("~", Expr::Literal(Literal::Null))]
#[case("a.b", reference(false, &["a", "b"]))]
#[case(".a.b", reference(true, &["a", "b"]))]
#[case("my-name", reference(false, &["my-name"]))]
fn parses_primaries(#[case] text: &str, #[case] expected: Expr) -> Result<()> {
    let parsed = body(text)?;
    ensure!(parsed == expected, "parsed {parsed:?}, expected {expected:?}");
    Ok(())
}

#[rstest]
#[case("a[0]")]
#[case("a.[0]")]
#[case("a.0")]
fn parses_index_segments(#[case] text: &str) -> Result<()> {
    let parsed = body(text)?;
    let expected = Expr::Reference(Reference {
        absolute: false,
        path: vec![RefSegment::Key("a".into()), RefSegment::Index(0)],
    });
    ensure!(parsed == expected, "parsed {parsed:?}");
    Ok(())
}

#[rstest]
fn parses_negative_index() -> Result<()> {
    let parsed = body("list[-1]")?;
    let Expr::Reference(found) = parsed else {
        bail!("expected reference, got {parsed:?}");
    };
    ensure!(found.path.last() == Some(&RefSegment::Index(-1)));
    Ok(())
}

#[rstest]
fn multiplication_binds_tighter_than_addition() -> Result<()> {
    let parsed = body("1 + 2 * 3")?;
    let Expr::Binary { op: BinaryOp::Add, right, .. } = parsed else {
        bail!("expected addition at the root, got {parsed:?}");
    };
    ensure!(matches!(*right, Expr::Binary { op: BinaryOp::Mul, .. }));
    Ok(())
}

#[rstest]
#[case("a // b || c", BinaryOp::Default)]
#[case("a || b && c", BinaryOp::Or)]
#[case("a && b == c", BinaryOp::And)]
#[case("a == b + c", BinaryOp::Eq)]
#[case("a - b % c", BinaryOp::Sub)]
fn respects_precedence(#[case] text: &str, #[case] root: BinaryOp) -> Result<()> {
    let parsed = body(text)?;
    let Expr::Binary { op, .. } = parsed else {
        bail!("expected binary expression, got {parsed:?}");
    };
    ensure!(op == root, "root operator {op:?}, expected {root:?}");
    Ok(())
}

#[rstest]
fn juxtaposition_concatenates() -> Result<()> {
    let parsed = body(r#""start " a + b " end""#)?;
    let Expr::Concatenation(operands) = parsed else {
        bail!("expected concatenation, got {parsed:?}");
    };
    ensure!(operands.len() == 3, "unexpected operands {operands:?}");
    Ok(())
}

#[rstest]
fn parses_conditionals() -> Result<()> {
    let parsed = body("a > 1 ? \"big\" : \"small\"")?;
    ensure!(matches!(parsed, Expr::Conditional { .. }), "got {parsed:?}");
    Ok(())
}

#[rstest]
fn parses_calls_and_lists() -> Result<()> {
    let parsed = body("join(\", \", [a, 1])")?;
    let Expr::Call { name, args } = parsed else {
        bail!("expected call, got {parsed:?}");
    };
    ensure!(name == "join");
    ensure!(matches!(args.as_slice(), [Expr::Literal(_), Expr::List(items)] if items.len() == 2));
    Ok(())
}

#[rstest]
#[case("map[list|x|->x * 2]", ComprehensionKind::Map, 1, false)]
#[case("map[m|k,v|->k]", ComprehensionKind::Map, 2, false)]
#[case("select[list|x|->x > 1]", ComprehensionKind::Select, 1, false)]
#[case("sum[list|0|s,x|->s + x]", ComprehensionKind::Sum, 2, true)]
#[case("sum[m|0|s,k,v|->s + v]", ComprehensionKind::Sum, 3, true)]
fn parses_comprehensions(
    #[case] text: &str,
    #[case] kind: ComprehensionKind,
    #[case] vars: usize,
    #[case] has_init: bool,
) -> Result<()> {
    let parsed = body(text)?;
    let Expr::Comprehension(found) = parsed else {
        bail!("expected comprehension, got {parsed:?}");
    };
    ensure!(found.kind == kind);
    ensure!(found.vars.len() == vars, "vars {:?}", found.vars);
    ensure!(found.init.is_some() == has_init);
    Ok(())
}

#[rstest]
#[case("merge", MergeExpr::Plain)]
#[case("merge replace", MergeExpr::Replace)]
#[case("merge none", MergeExpr::None)]
#[case("merge on key", MergeExpr::On("key".into()))]
#[case("merge a.b", MergeExpr::Path(Reference {
    absolute: false,
    path: vec![RefSegment::Key("a".into()), RefSegment::Key("b".into())],
}))]
fn parses_merge_directives(#[case] text: &str, #[case] expected: MergeExpr) -> Result<()> {
    let parsed = body(text)?;
    ensure!(parsed == Expr::Merge(expected), "got {parsed:?}");
    Ok(())
}

#[rstest]
fn parses_markers_without_body() -> Result<()> {
    let parsed = parse("&temporary &state")?;
    ensure!(parsed.markers == vec![Marker::Temporary, Marker::State]);
    ensure!(parsed.body.is_none());
    Ok(())
}

#[rstest]
fn parses_prefer_before_body() -> Result<()> {
    let parsed = parse("prefer 1")?;
    ensure!(parsed.markers == vec![Marker::Prefer]);
    ensure!(parsed.body == Some(Expr::Literal(Literal::Int(1))));
    Ok(())
}

#[rstest]
#[case("a +", 3)]
#[case("(a", 2)]
#[case("\"open", 0)]
#[case("a $ b", 2)]
#[case("&bogus a", 0)]
#[case("map[x|a,b,c|->a]", 0)]
fn reports_error_positions(#[case] text: &str, #[case] start: usize) -> Result<()> {
    match parse(text) {
        Ok(parsed) => bail!("expected '{text}' to fail, got {parsed:?}"),
        Err(err) => {
            ensure!(err.span().0 == start, "error {err} at {:?}", err.span());
            Ok(())
        }
    }
}
