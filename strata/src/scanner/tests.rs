//! Unit tests for the interpolation scanner.

use rstest::rstest;

use super::{Scanned, expression_text, scan, unescape};

fn expression(text: &str) -> Scanned {
    Scanned::Expression(text.to_owned())
}

#[rstest]
#[case("test(", Scanned::Literal)]
#[case("plain text", Scanned::Literal)]
#[case("", Scanned::Literal)]
#[case("a (( b", Scanned::Literal)]
#[case("a ((( b ))", Scanned::Literal)]
#[case("\\(( a ))", Scanned::Literal)]
#[case("((! a ))", Scanned::Escaped)]
#[case("((!! a ))", Scanned::Escaped)]
fn leaves_non_expressions_alone(#[case] input: &str, #[case] expected: Scanned) {
    assert_eq!(scan(input), expected);
}

#[rstest]
#[case("(( a ))", "(( a ))")]
#[case("((a.b))", "(( a.b ))")]
#[case("(( ))", "(( ))")]
#[case("start (( a + b )) end", r#"(( "start " a + b " end" ))"#)]
#[case("a start ((( a ))) end", r#"(( "a start (" a ") end" ))"#)]
#[case("a start \\(( a )) end", r#"(( "a start \\" a " end" ))"#)]
#[case("(( a ))-(( b ))", r#"(( a "-" b ))"#)]
#[case(r#"(( "))" ))"#, r#"(( "))" ))"#)]
#[case("(( (a + b) * 2 ))", "(( (a + b) * 2 ))")]
#[case("say \"hi\" (( name ))", r#"(( "say \"hi\" " name ))"#)]
#[case("(( a \\))", r#"(( a "\\" ))"#)]
fn canonicalises_interpolations(#[case] input: &str, #[case] expected: &str) {
    assert_eq!(scan(input), expression(expected));
}

#[rstest]
fn keeps_mid_text_escapes_literal() {
    assert_eq!(
        scan("x ((! a )) (( b ))"),
        expression(r#"(( "x ((! a )) " b ))"#)
    );
}

#[rstest]
#[case("((! a ))", Some("(( a ))"))]
#[case("((!! a ))", Some("((! a ))"))]
#[case("(( a ))", None)]
#[case("text", None)]
fn strips_one_escape_level(#[case] input: &str, #[case] expected: Option<&str>) {
    assert_eq!(unescape(input).as_deref(), expected);
}

#[rstest]
#[case("(( a + b ))", "a + b")]
#[case("(( ))", "")]
fn extracts_inner_text(#[case] canonical: &str, #[case] expected: &str) {
    assert_eq!(expression_text(canonical), expected);
}
