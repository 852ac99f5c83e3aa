//! STG translation (§4.4) and global cleanup (§4.5).
//!
//! Lowers a type-checked `ast::Program` into an `StgProgram`: a set of
//! supercombinator-like lambda-forms with explicit free-variable sets,
//! updatable flags, and pattern-match-compiled case expressions, reachable
//! from `main`. Grounded directly in `PicoHaskell`'s `stg.cpp` — tagged enums
//! here stand in for its `STGExpression` class hierarchy (§9 "Design Notes"
//! rules out downcast-heavy class hierarchies for this port).
//!
//! The translator never re-checks types: it assumes its input already
//! passed `typecheck::infer_program`, so every surface-level invariant in
//! §3 ("Post-typecheck AST invariants") already holds. A violation here
//! (an unsaturated constructor reference, an unbound pattern variable) is
//! an internal bug, not a user error — see `error::StgError`.

mod case;
mod cleanup;
mod translate;

use crate::ast::{BuiltinOp, Literal, Program};
use crate::error::StgError;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// One algebraic-case arm's pattern: the constructor it matches, plus the
/// fresh field-variable names bound to its arguments (never surface names —
/// those are resolved away into renamings before this point).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StgPattern {
    pub constructor: String,
    pub fields: Vec<String>,
}

/// An STG expression (§3 "STG expression"). `Application`'s `arguments` and
/// `Constructor`'s `arguments` are always variable names: a literal or
/// compound argument is lifted to its own named binding before it ever
/// reaches one of these nodes (mirrors `translate_application`/
/// `translate_constructor` in `stg.cpp`, which never inline a non-variable
/// atom here despite `stg.hpp`'s more general `STGAtom` field types).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum StgExpr {
    Variable(String),
    Literal(Literal),
    Application {
        function: String,
        arguments: Vec<String>,
    },
    Constructor {
        name: String,
        arguments: Vec<String>,
    },
    Let {
        bindings: BTreeMap<String, LambdaForm>,
        body: Box<StgExpr>,
        recursive: bool,
    },
    PrimitiveCase {
        scrutinee: Box<StgExpr>,
        alternatives: Vec<(Literal, StgExpr)>,
        default_binder: Option<String>,
        default: Box<StgExpr>,
    },
    AlgebraicCase {
        scrutinee: Box<StgExpr>,
        alternatives: Vec<(StgPattern, StgExpr)>,
        default_binder: Option<String>,
        default: Box<StgExpr>,
    },
    /// `left` is absent only when `op` is `Negate`.
    PrimitiveOp {
        left: Option<String>,
        right: String,
        op: BuiltinOp,
    },
}

/// A lambda-form (§3): free variables, parameters, the updatable flag, and
/// the body it evaluates to when entered.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LambdaForm {
    pub free_variables: std::collections::BTreeSet<String>,
    pub parameters: Vec<String>,
    pub updatable: bool,
    pub body: StgExpr,
}

/// A data constructor's runtime descriptor: its tag, arity, and the number
/// of *other* data constructors of the same type (§3 "STG data-constructor
/// descriptor records") — a single-constructor type has `siblings: 0`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DataConstructorDescriptor {
    pub tag: usize,
    pub arity: usize,
    pub siblings: usize,
}

/// The translator's final output: every lambda-form reachable from `main`,
/// plus a descriptor for every data constructor actually used by one of
/// them.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StgProgram {
    pub bindings: BTreeMap<String, LambdaForm>,
    pub data_constructors: BTreeMap<String, DataConstructorDescriptor>,
}

/// Translate a type-checked program into its STG form and run global
/// cleanup (§4.4, §4.5). `program` should already include the prelude
/// (`Program::with_prelude`) and have passed `typecheck::infer_program`.
pub fn translate(program: &Program) -> Result<StgProgram, StgError> {
    let bindings = translate::translate_top_level(program);
    cleanup::run(program, bindings)
}
