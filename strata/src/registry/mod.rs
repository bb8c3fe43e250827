//! Function and validator registry.
//!
//! A [`Registry`] is assembled once through [`RegistryBuilder`] and is
//! immutable afterwards. Every resolution entry point borrows a finished
//! registry, so evaluation cannot begin while names are still being
//! registered.

mod builtins;
mod validators;

use std::collections::HashMap;
use std::fmt;

use thiserror::Error;

use crate::binding::Binding;
use crate::eval::EvalResult;
use crate::node::Node;

pub use builtins::Core;
pub use validators::CoreValidators;

/// Setup faults raised while populating a registry.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
#[non_exhaustive]
pub enum RegistryError {
    /// A function name was registered twice.
    #[error("function '{0}' is already registered")]
    DuplicateFunction(String),
    /// A validator name was registered twice.
    #[error("validator '{0}' is already registered")]
    DuplicateValidator(String),
}

/// A callable available to expressions as `name(args…)`.
///
/// Arguments arrive fully evaluated. Closures with the matching signature
/// implement this trait.
pub trait Function: Send + Sync {
    /// Invoke the function.
    ///
    /// # Errors
    ///
    /// Returns an [`crate::EvalError`] when the arguments are unusable.
    fn call(&self, args: &[Node], binding: &Binding<'_>) -> EvalResult;
}

impl<F> Function for F
where
    F: Fn(&[Node], &Binding<'_>) -> EvalResult + Send + Sync,
{
    fn call(&self, args: &[Node], binding: &Binding<'_>) -> EvalResult {
        self(args, binding)
    }
}

/// Outcome of running a [`Validator`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Validation {
    /// Whether the value satisfied the validator.
    pub matched: bool,
    /// Description used when the value matched, e.g. `is map`.
    pub positive: String,
    /// Description used when it did not, e.g. `is no map`.
    pub negative: String,
    /// Hard failure explaining why the check could not succeed.
    pub error: Option<String>,
    /// `false` when the validator does not apply to this kind of value.
    pub applicable: bool,
}

impl Validation {
    /// A completed check.
    #[must_use]
    pub fn new(matched: bool, positive: impl Into<String>, negative: impl Into<String>) -> Self {
        Self {
            matched,
            positive: positive.into(),
            negative: negative.into(),
            error: None,
            applicable: true,
        }
    }

    /// A failed check with an explanatory cause.
    #[must_use]
    pub fn failed(
        positive: impl Into<String>,
        negative: impl Into<String>,
        cause: impl Into<String>,
    ) -> Self {
        Self {
            error: Some(cause.into()),
            ..Self::new(false, positive, negative)
        }
    }

    /// A validator that cannot judge this value.
    #[must_use]
    pub fn not_applicable(negative: impl Into<String>, cause: impl Into<String>) -> Self {
        Self {
            applicable: false,
            ..Self::failed(String::new(), negative, cause)
        }
    }

    /// Swap the positive and negative outcome.
    #[must_use]
    pub fn negate(self) -> Self {
        if self.error.is_some() || !self.applicable {
            return self;
        }
        Self {
            matched: !self.matched,
            positive: self.negative,
            negative: self.positive,
            error: None,
            applicable: true,
        }
    }

    /// Human-readable assertion: the positive text when matched, otherwise
    /// the negative text with any cause appended.
    ///
    /// ```rust
    /// use strata::registry::Validation;
    ///
    /// assert_eq!(Validation::new(true, "is map", "is no map").message(), "is map");
    /// assert_eq!(
    ///     Validation::failed("is map", "is no map", "found list").message(),
    ///     "is no map: found list",
    /// );
    /// ```
    #[must_use]
    pub fn message(&self) -> String {
        if self.matched {
            return self.positive.clone();
        }
        self.error.as_ref().map_or_else(
            || self.negative.clone(),
            |cause| format!("{}: {cause}", self.negative),
        )
    }
}

/// A named predicate used by the `validate` builtin.
pub trait Validator: Send + Sync {
    /// Check `value`, with any extra arguments from the condition.
    fn validate(&self, value: &Node, args: &[Node]) -> Validation;
}

impl<F> Validator for F
where
    F: Fn(&Node, &[Node]) -> Validation + Send + Sync,
{
    fn validate(&self, value: &Node, args: &[Node]) -> Validation {
        self(value, args)
    }
}

/// A bundle of functions and validators registered together.
pub trait Module {
    /// Add this module's entries to `builder`.
    ///
    /// # Errors
    ///
    /// Propagates [`RegistryError`] when a name is already taken.
    fn register(&self, builder: RegistryBuilder) -> Result<RegistryBuilder, RegistryError>;
}

/// Collects registrations before producing an immutable [`Registry`].
#[derive(Default)]
pub struct RegistryBuilder {
    functions: HashMap<String, Box<dyn Function>>,
    validators: HashMap<String, Box<dyn Validator>>,
}

impl RegistryBuilder {
    /// An empty builder.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a function.
    ///
    /// # Errors
    ///
    /// Returns [`RegistryError::DuplicateFunction`] when `name` is taken.
    pub fn function(
        mut self,
        name: impl Into<String>,
        function: impl Function + 'static,
    ) -> Result<Self, RegistryError> {
        let key = name.into();
        if self.functions.contains_key(&key) {
            return Err(RegistryError::DuplicateFunction(key));
        }
        self.functions.insert(key, Box::new(function));
        Ok(self)
    }

    /// Register a validator.
    ///
    /// # Errors
    ///
    /// Returns [`RegistryError::DuplicateValidator`] when `name` is taken.
    pub fn validator(
        mut self,
        name: impl Into<String>,
        validator: impl Validator + 'static,
    ) -> Result<Self, RegistryError> {
        let key = name.into();
        if self.validators.contains_key(&key) {
            return Err(RegistryError::DuplicateValidator(key));
        }
        self.validators.insert(key, Box::new(validator));
        Ok(self)
    }

    /// Register every entry of `module`.
    ///
    /// # Errors
    ///
    /// Propagates the module's [`RegistryError`].
    pub fn module(self, module: &dyn Module) -> Result<Self, RegistryError> {
        module.register(self)
    }

    /// Freeze the registrations.
    #[must_use]
    pub fn build(self) -> Registry {
        Registry {
            functions: self.functions,
            validators: self.validators,
        }
    }
}

/// Immutable lookup table for functions and validators.
pub struct Registry {
    functions: HashMap<String, Box<dyn Function>>,
    validators: HashMap<String, Box<dyn Validator>>,
}

impl Registry {
    /// Start a new registry.
    #[must_use]
    pub fn builder() -> RegistryBuilder {
        RegistryBuilder::new()
    }

    /// A registry holding the core builtins and validators.
    ///
    /// # Errors
    ///
    /// Fails only if the core modules register a name twice.
    pub fn standard() -> Result<Self, RegistryError> {
        Ok(Self::builder()
            .module(&Core)?
            .module(&CoreValidators)?
            .build())
    }

    /// Look up a function by exact name.
    #[must_use]
    pub fn function(&self, name: &str) -> Option<&dyn Function> {
        self.functions.get(name).map(|entry| &**entry)
    }

    /// Look up a validator by exact name.
    #[must_use]
    pub fn validator(&self, name: &str) -> Option<&dyn Validator> {
        self.validators.get(name).map(|entry| &**entry)
    }

    /// Registered function names, sorted.
    #[must_use]
    pub fn function_names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.functions.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }
}

impl fmt::Debug for Registry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Registry")
            .field("functions", &self.function_names())
            .field("validators", &self.validators.len())
            .finish()
    }
}

#[cfg(test)]
mod tests;
