//! Surface syntax tree.
//!
//! This is the external collaborator's output: the lexer/layout/parser
//! (out of scope for this crate) are expected to build values of these
//! types. Every node that matters for diagnostics carries a source line.

use crate::types::Type;
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};

/// A literal value, shared by surface literals and patterns.
///
/// Strings are not part of this enum: a string literal is surface-level
/// sugar for a chain of `Char` cons-cells, handled during STG translation
/// (`stg::translate`), not a distinct literal kind patterns can match on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Literal {
    Int(i64),
    Char(char),
}

/// One of the built-in binary/unary operators recognized by the type
/// inferencer and lowered to `STGPrimitiveOp` by the translator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum BuiltinOp {
    Add,
    Sub,
    Times,
    Divide,
    Negate,
    Eq,
    Neq,
    Lt,
    Lte,
    Gt,
    Gte,
}

impl BuiltinOp {
    /// `negate` is the only unary operator; every other op takes two operands.
    pub fn is_unary(self) -> bool {
        matches!(self, BuiltinOp::Negate)
    }
}

/// A surface expression. Every variant other than `StringLiteral` desugars
/// almost directly into an STG counterpart; `StringLiteral` is expanded
/// into cons-cells during translation.
#[derive(Debug, Clone, Deserialize)]
pub enum Expr {
    IntLiteral {
        value: i64,
        line: u32,
    },
    CharLiteral {
        value: char,
        line: u32,
    },
    StringLiteral {
        value: String,
        line: u32,
    },
    Variable {
        name: String,
        line: u32,
    },
    Constructor {
        name: String,
        line: u32,
    },
    /// `\x1 .. xn -> body`. Parameters are listed outermost-first.
    Abstraction {
        params: Vec<String>,
        body: Box<Expr>,
        line: u32,
    },
    Application {
        left: Box<Expr>,
        right: Box<Expr>,
        line: u32,
    },
    /// `let { n1 = e1 ; ... } in body`, with optional explicit signatures.
    /// `recursive` is always `true` at the surface: the dependency analyzer
    /// (§4.1) later computes the precise per-group recursive flag.
    Let {
        bindings: Vec<(String, Expr)>,
        signatures: HashMap<String, Type>,
        body: Box<Expr>,
        line: u32,
    },
    Case {
        scrutinee: Box<Expr>,
        alternatives: Vec<(Pattern, Expr)>,
        line: u32,
    },
    /// `left` is absent only for `Negate`.
    BuiltinOp {
        left: Option<Box<Expr>>,
        right: Box<Expr>,
        op: BuiltinOp,
        line: u32,
    },
}

impl Expr {
    pub fn line(&self) -> u32 {
        match self {
            Expr::IntLiteral { line, .. }
            | Expr::CharLiteral { line, .. }
            | Expr::StringLiteral { line, .. }
            | Expr::Variable { line, .. }
            | Expr::Constructor { line, .. }
            | Expr::Abstraction { line, .. }
            | Expr::Application { line, .. }
            | Expr::Let { line, .. }
            | Expr::Case { line, .. }
            | Expr::BuiltinOp { line, .. } => *line,
        }
    }
}

/// A pattern. `as_names` holds any `x@pat` aliases attached to this pattern
/// node; all of them bind to the full value the pattern matches.
#[derive(Debug, Clone, Deserialize)]
pub enum Pattern {
    Wildcard {
        as_names: Vec<String>,
        line: u32,
    },
    Variable {
        name: String,
        as_names: Vec<String>,
        line: u32,
    },
    Literal {
        value: Literal,
        as_names: Vec<String>,
        line: u32,
    },
    Constructor {
        name: String,
        args: Vec<Pattern>,
        as_names: Vec<String>,
        line: u32,
    },
}

impl Pattern {
    pub fn as_names(&self) -> &[String] {
        match self {
            Pattern::Wildcard { as_names, .. }
            | Pattern::Variable { as_names, .. }
            | Pattern::Literal { as_names, .. }
            | Pattern::Constructor { as_names, .. } => as_names,
        }
    }

    pub fn line(&self) -> u32 {
        match self {
            Pattern::Wildcard { line, .. }
            | Pattern::Variable { line, .. }
            | Pattern::Literal { line, .. }
            | Pattern::Constructor { line, .. } => *line,
        }
    }
}

/// A user `data` declaration: `data Name a1 .. an = C1 t.. | C2 t.. | ...`.
#[derive(Debug, Clone, Deserialize)]
pub struct TypeConstructor {
    pub name: String,
    pub line: u32,
    /// Names of the type's own argument variables, in declaration order.
    pub arg_vars: Vec<String>,
    /// Names of its data constructors, in declaration order (fixes tags).
    pub data_constructors: Vec<String>,
}

/// A single data constructor of some `TypeConstructor`.
#[derive(Debug, Clone, Deserialize)]
pub struct DataConstructor {
    pub name: String,
    pub line: u32,
    pub type_constructor: String,
    /// Field types as written in the declaration, over the type
    /// constructor's `arg_vars` (kind-inferred, not yet a `Type` scheme
    /// until promoted by `kinds::infer_program`).
    pub fields: Vec<Type>,
}

/// A whole program: top-level bindings plus the declarations that give
/// type- and data-constructors meaning.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Program {
    /// Ordered top-level bindings (name -> defining expression).
    pub bindings: Vec<(String, Expr)>,
    /// Explicit top-level type signatures.
    pub signatures: HashMap<String, Type>,
    pub type_constructors: HashMap<String, TypeConstructor>,
    pub data_constructors: HashMap<String, DataConstructor>,
    /// Fully derived from `data_constructors`' field counts — never
    /// expected on the wire, see `Program::derive_arities`.
    #[serde(default)]
    pub data_constructor_arities: HashMap<String, usize>,
}

impl Program {
    pub fn new() -> Self {
        Self::default()
    }

    /// Merge `prelude` ahead of `self`'s own declarations: prelude bindings
    /// and constructors come first so user code may reference them. A
    /// well-formed program does not redeclare a prelude name, so later
    /// entries never overwrite the prelude's.
    pub fn with_prelude(mut self, prelude: Program) -> Self {
        let mut bindings = prelude.bindings;
        bindings.extend(self.bindings);
        self.bindings = bindings;

        for (name, scheme) in prelude.signatures {
            self.signatures.entry(name).or_insert(scheme);
        }
        for (name, tc) in prelude.type_constructors {
            self.type_constructors.entry(name).or_insert(tc);
        }
        for (name, dc) in prelude.data_constructors {
            self.data_constructors.entry(name).or_insert(dc);
        }
        for (name, arity) in prelude.data_constructor_arities {
            self.data_constructor_arities.entry(name).or_insert(arity);
        }
        self
    }

    pub fn find_binding(&self, name: &str) -> Option<&Expr> {
        self.bindings
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, e)| e)
    }

    /// Recompute `data_constructor_arities` from `data_constructors`'s own
    /// field counts. The external `Program` encoding (§6) omits this field
    /// since it is fully derived; callers run this once after deserializing.
    pub fn derive_arities(mut self) -> Self {
        for (name, dc) in &self.data_constructors {
            self.data_constructor_arities
                .insert(name.clone(), dc.fields.len());
        }
        self
    }
}

/// Every name a pattern binds: its own `Variable` name (if any), plus every
/// `as`-name at this node and at every nested sub-pattern.
pub fn pattern_bound_names(pattern: &Pattern) -> Vec<String> {
    let mut names = pattern.as_names().to_vec();
    match pattern {
        Pattern::Variable { name, .. } => names.push(name.clone()),
        Pattern::Constructor { args, .. } => {
            for arg in args {
                names.extend(pattern_bound_names(arg));
            }
        }
        Pattern::Wildcard { .. } | Pattern::Literal { .. } => {}
    }
    names
}

/// The free variables of `expr` (§4.1's "free-variable sets that ignore
/// bound names"): names referenced by `Expr::Variable` that are not bound
/// by an enclosing lambda parameter, let binder, or case-pattern name.
/// Constructor references live in a separate namespace and are never
/// counted here.
pub fn free_variables(expr: &Expr) -> HashSet<String> {
    let mut out = HashSet::new();
    collect_free_variables(expr, &mut out);
    out
}

fn collect_free_variables(expr: &Expr, out: &mut HashSet<String>) {
    match expr {
        Expr::IntLiteral { .. } | Expr::CharLiteral { .. } | Expr::StringLiteral { .. } => {}
        Expr::Variable { name, .. } => {
            out.insert(name.clone());
        }
        Expr::Constructor { .. } => {}
        Expr::Abstraction { params, body, .. } => {
            let mut inner = HashSet::new();
            collect_free_variables(body, &mut inner);
            for param in params {
                inner.remove(param);
            }
            out.extend(inner);
        }
        Expr::Application { left, right, .. } => {
            collect_free_variables(left, out);
            collect_free_variables(right, out);
        }
        Expr::Let {
            bindings, body, ..
        } => {
            let bound: HashSet<String> = bindings.iter().map(|(name, _)| name.clone()).collect();
            let mut inner = HashSet::new();
            for (_, definition) in bindings {
                collect_free_variables(definition, &mut inner);
            }
            collect_free_variables(body, &mut inner);
            for name in &bound {
                inner.remove(name);
            }
            out.extend(inner);
        }
        Expr::Case {
            scrutinee,
            alternatives,
            ..
        } => {
            collect_free_variables(scrutinee, out);
            for (pattern, alt_expr) in alternatives {
                let mut inner = HashSet::new();
                collect_free_variables(alt_expr, &mut inner);
                for name in pattern_bound_names(pattern) {
                    inner.remove(&name);
                }
                out.extend(inner);
            }
        }
        Expr::BuiltinOp { left, right, .. } => {
            if let Some(left) = left {
                collect_free_variables(left, out);
            }
            collect_free_variables(right, out);
        }
    }
}

#[cfg(test)]
mod free_variable_tests {
    use super::*;

    fn var(name: &str) -> Expr {
        Expr::Variable {
            name: name.to_string(),
            line: 1,
        }
    }

    #[test]
    fn lambda_parameters_are_not_free() {
        let expr = Expr::Abstraction {
            params: vec!["x".to_string()],
            body: Box::new(var("x")),
            line: 1,
        };
        assert!(free_variables(&expr).is_empty());
    }

    #[test]
    fn let_binders_are_not_free_but_outer_references_are() {
        let expr = Expr::Let {
            bindings: vec![("x".to_string(), var("y"))],
            signatures: HashMap::new(),
            body: Box::new(var("x")),
            line: 1,
        };
        let free = free_variables(&expr);
        assert!(free.contains("y"));
        assert!(!free.contains("x"));
    }

    #[test]
    fn case_pattern_names_are_not_free() {
        let expr = Expr::Case {
            scrutinee: Box::new(var("s")),
            alternatives: vec![(
                Pattern::Variable {
                    name: "x".to_string(),
                    as_names: vec![],
                    line: 1,
                },
                var("x"),
            )],
            line: 1,
        };
        let free = free_variables(&expr);
        assert_eq!(free, ["s".to_string()].into_iter().collect());
    }
}

#[cfg(test)]
mod external_program_encoding_tests {
    use super::*;

    /// §6's documented `picoc` input shape: a minimal JSON `Program` with one
    /// signature-less binding and one nullary data declaration.
    const MINIMAL_PROGRAM_JSON: &str = r#"{
        "bindings": [["main", {"IntLiteral": {"value": 1, "line": 1}}]],
        "signatures": {},
        "type_constructors": {
            "Unit": {"name": "Unit", "line": 1, "arg_vars": [], "data_constructors": ["MkUnit"]}
        },
        "data_constructors": {
            "MkUnit": {"name": "MkUnit", "line": 1, "type_constructor": "Unit", "fields": []}
        }
    }"#;

    #[test]
    fn deserializes_a_minimal_program_and_derives_arities() {
        let program: Program = serde_json::from_str(MINIMAL_PROGRAM_JSON).unwrap();
        assert!(program.data_constructor_arities.is_empty());
        let program = program.derive_arities();
        assert_eq!(program.data_constructor_arities["MkUnit"], 0);
        assert!(program.find_binding("main").is_some());
    }
}
