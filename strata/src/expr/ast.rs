//! Expression tree produced by the parser.

use std::fmt;

/// A parsed `(( … ))` expression: node markers plus an optional value body.
#[derive(Clone, Debug, PartialEq)]
pub struct Expression {
    /// Markers preceding the body, in source order.
    pub markers: Vec<Marker>,
    /// Value expression; absent when the scalar only carries markers.
    pub body: Option<Expr>,
}

/// Node-level marker written in front of an expression body.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Marker {
    /// `&state`
    State,
    /// `&temporary`
    Temporary,
    /// `&local`
    Local,
    /// `prefer`: later stubs cannot override the value.
    Prefer,
}

/// Scalar literal.
#[derive(Clone, Debug, PartialEq)]
pub enum Literal {
    /// `nil` or `~`.
    Null,
    /// `true` / `false`.
    Bool(bool),
    /// Integer literal.
    Int(i64),
    /// Floating point literal.
    Float(f64),
    /// Quoted string.
    String(String),
}

/// One step of a reference path.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum RefSegment {
    /// Field name, or the `name` of a sequence element.
    Key(String),
    /// Sequence index; negative values count from the end.
    Index(i64),
}

/// Dotted/bracketed reference such as `a.b[0]` or `.root.field`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Reference {
    /// Leading `.`: resolve from the document root only.
    pub absolute: bool,
    /// Path segments; never empty.
    pub path: Vec<RefSegment>,
}

impl fmt::Display for Reference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (position, segment) in self.path.iter().enumerate() {
            match segment {
                RefSegment::Key(key) if position == 0 && !self.absolute => f.write_str(key)?,
                RefSegment::Key(key) => write!(f, ".{key}")?,
                RefSegment::Index(index) => write!(f, "[{index}]")?,
            }
        }
        Ok(())
    }
}

/// Prefix operator.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum UnaryOp {
    /// `!`
    Not,
    /// `-`
    Neg,
}

/// Infix operator.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum BinaryOp {
    /// `//`
    Default,
    /// `||`
    Or,
    /// `&&`
    And,
    /// `==`
    Eq,
    /// `!=`
    NotEq,
    /// `<`
    Lt,
    /// `<=`
    LtEq,
    /// `>`
    Gt,
    /// `>=`
    GtEq,
    /// `+`
    Add,
    /// `-`
    Sub,
    /// `*`
    Mul,
    /// `/`
    Div,
    /// `%`
    Mod,
}

impl BinaryOp {
    /// Source symbol of the operator.
    #[must_use]
    pub const fn symbol(self) -> &'static str {
        match self {
            Self::Default => "//",
            Self::Or => "||",
            Self::And => "&&",
            Self::Eq => "==",
            Self::NotEq => "!=",
            Self::Lt => "<",
            Self::LtEq => "<=",
            Self::Gt => ">",
            Self::GtEq => ">=",
            Self::Add => "+",
            Self::Sub => "-",
            Self::Mul => "*",
            Self::Div => "/",
            Self::Mod => "%",
        }
    }
}

/// Comprehension flavour.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ComprehensionKind {
    /// `map[src|vars|->body]` collects body values.
    Map,
    /// `select[src|vars|->body]` keeps elements whose body is truthy.
    Select,
    /// `sum[src|init|acc,vars|->body]` folds from `init`.
    Sum,
}

/// `kind[source|init|vars|->body]`.
#[derive(Clone, Debug, PartialEq)]
pub struct Comprehension {
    /// Flavour.
    pub kind: ComprehensionKind,
    /// Mapping or sequence being iterated.
    pub source: Expr,
    /// Initial accumulator for `sum`.
    pub init: Option<Expr>,
    /// Loop variable names. For `sum` the first is the accumulator; the last
    /// is the element value and an optional middle one the key or index.
    pub vars: Vec<String>,
    /// Per-element expression.
    pub body: Expr,
}

/// Merge directive written as an expression.
#[derive(Clone, Debug, PartialEq)]
pub enum MergeExpr {
    /// `merge`: take the stub value at this node's own path.
    Plain,
    /// `merge <path>`: take the stub value at another path.
    Path(Reference),
    /// `merge replace`
    Replace,
    /// `merge none`
    None,
    /// `merge on <key>`
    On(String),
}

/// Value expression.
#[derive(Clone, Debug, PartialEq)]
pub enum Expr {
    /// Scalar literal.
    Literal(Literal),
    /// Reference to another node or a comprehension variable.
    Reference(Reference),
    /// Prefix operation.
    Unary {
        /// Operator.
        op: UnaryOp,
        /// Operand.
        operand: Box<Self>,
    },
    /// Infix operation.
    Binary {
        /// Operator.
        op: BinaryOp,
        /// Left operand.
        left: Box<Self>,
        /// Right operand.
        right: Box<Self>,
    },
    /// Registered function call.
    Call {
        /// Function name.
        name: String,
        /// Arguments in order.
        args: Vec<Self>,
    },
    /// `map`, `select` or `sum` comprehension.
    Comprehension(Box<Comprehension>),
    /// Juxtaposed operands.
    Concatenation(Vec<Self>),
    /// Merge directive.
    Merge(MergeExpr),
    /// `condition ? then : otherwise`
    Conditional {
        /// Condition.
        condition: Box<Self>,
        /// Value when the condition is truthy.
        then: Box<Self>,
        /// Value otherwise.
        otherwise: Box<Self>,
    },
    /// `[a, b, …]`
    List(Vec<Self>),
}
