//! Registry construction tests along with the core function library suite.

use anyhow::{Result, bail, ensure};
use rstest::rstest;

use super::{Module, Registry, RegistryBuilder, RegistryError, Validation};
use crate::binding::Binding;
use crate::eval::{EvalResult, resolved};
use crate::node::Node;


fn answer(_: &[Node], _: &Binding<'_>) -> EvalResult {
    resolved(Node::from(42_i64))
}

struct Extension;

impl Module for Extension {
    fn register(&self, builder: RegistryBuilder) -> Result<RegistryBuilder, RegistryError> {
        builder
            .function("answer", answer)?
            .validator("always", |_: &Node, _: &[Node]| {
                Validation::new(true, "is anything", "is nothing")
            })
    }
}

#[rstest]
fn standard_registry_lists_core_functions() -> Result<()> {
    let registry = Registry::standard()?;
    let names = registry.function_names();
    for expected in ["join", "length", "stub", "validate"] {
        ensure!(names.contains(&expected), "missing {expected} in {names:?}");
    }
    ensure!(registry.validator("map").is_some());
    ensure!(registry.function("nope").is_none());
    Ok(())
}

#[rstest]
fn modules_extend_the_registry() -> Result<()> {
    let registry = Registry::builder()
        .module(&super::Core)?
        .module(&Extension)?
        .build();
    ensure!(registry.function("answer").is_some());
    ensure!(registry.validator("always").is_some());
    Ok(())
}

#[rstest]
fn rejects_duplicate_functions() -> Result<()> {
    let outcome = Registry::builder()
        .function("answer", answer)?
        .function("answer", answer);
    match outcome {
        Err(RegistryError::DuplicateFunction(name)) => {
            ensure!(name == "answer");
            Ok(())
        }
        Err(other) => bail!("unexpected error {other}"),
        Ok(_) => bail!("duplicate function accepted"),
    }
}

#[rstest]
fn rejects_duplicate_validators() {
    let outcome = Registry::builder()
        .module(&super::CoreValidators)
        .and_then(|builder| builder.module(&super::CoreValidators));
    assert!(matches!(outcome, Err(RegistryError::DuplicateValidator(_))));
}

#[rstest]
#[case(Validation::new(true, "is map", "is no map"), "is map")]
#[case(Validation::new(false, "is map", "is no map"), "is no map")]
#[case(Validation::failed("is key", "is no key", "bad header"), "is no key: bad header")]
#[case(Validation::new(true, "is map", "is no map").negate(), "is map")]
fn composes_validation_messages(#[case] validation: Validation, #[case] expected: &str) {
    assert_eq!(validation.message(), expected);
}
