//! The fixed declarations every program is compiled against (§3 "Ambient
//! definitions"): `Bool`/`&&`/`||`, and the list type `[]`/`:` that string
//! literals and list patterns desugar onto. Built directly with `ast`
//! constructors rather than parsed from source text, since the external
//! parser is out of scope for this crate (see `ast.rs`'s module doc).
//!
//! `Program::with_prelude` puts these declarations ahead of the user's own,
//! so `&&`/`||`/`True`/`False`/`[]`/`:` are simply names already in scope by
//! the time dependency analysis and inference run.
//!
//! The cons constructor's internal name is `:`, not the surface `(:)`
//! notation — this matches `stg.cpp`'s own tag-assignment switch, which
//! compares against the bare operator name.

use crate::ast::{DataConstructor, Expr, Pattern, Program, TypeConstructor};
use crate::types::Type;

const LINE: u32 = 0;

fn var(name: &str) -> Expr {
    Expr::Variable {
        name: name.to_string(),
        line: LINE,
    }
}

fn constructor(name: &str) -> Expr {
    Expr::Constructor {
        name: name.to_string(),
        line: LINE,
    }
}

fn nullary_pattern(name: &str) -> Pattern {
    Pattern::Constructor {
        name: name.to_string(),
        args: vec![],
        as_names: vec![],
        line: LINE,
    }
}

/// `(&&) a b = case a of { False -> False ; True -> b }`.
fn and_definition() -> Expr {
    Expr::Abstraction {
        params: vec!["a".to_string(), "b".to_string()],
        body: Box::new(Expr::Case {
            scrutinee: Box::new(var("a")),
            alternatives: vec![
                (nullary_pattern("False"), constructor("False")),
                (nullary_pattern("True"), var("b")),
            ],
            line: LINE,
        }),
        line: LINE,
    }
}

/// `(||) a b = case a of { True -> True ; False -> b }`.
fn or_definition() -> Expr {
    Expr::Abstraction {
        params: vec!["a".to_string(), "b".to_string()],
        body: Box::new(Expr::Case {
            scrutinee: Box::new(var("a")),
            alternatives: vec![
                (nullary_pattern("True"), constructor("True")),
                (nullary_pattern("False"), var("b")),
            ],
            line: LINE,
        }),
        line: LINE,
    }
}

/// Build the `Bool`/`&&`/`||`/`[]`/`:` prelude program.
pub fn prelude_program() -> Program {
    let mut program = Program::new();

    program.type_constructors.insert(
        "Bool".to_string(),
        TypeConstructor {
            name: "Bool".to_string(),
            line: LINE,
            arg_vars: vec![],
            data_constructors: vec!["True".to_string(), "False".to_string()],
        },
    );
    for name in ["True", "False"] {
        program.data_constructors.insert(
            name.to_string(),
            DataConstructor {
                name: name.to_string(),
                line: LINE,
                type_constructor: "Bool".to_string(),
                fields: vec![],
            },
        );
        program.data_constructor_arities.insert(name.to_string(), 0);
    }

    let bool_to_bool_to_bool = Type::function(Type::bool(), Type::function(Type::bool(), Type::bool()));
    program.signatures.insert("&&".to_string(), bool_to_bool_to_bool.clone());
    program.signatures.insert("||".to_string(), bool_to_bool_to_bool);

    program.bindings.push(("&&".to_string(), and_definition()));
    program.bindings.push(("||".to_string(), or_definition()));

    program.type_constructors.insert(
        "[]".to_string(),
        TypeConstructor {
            name: "[]".to_string(),
            line: LINE,
            arg_vars: vec!["a".to_string()],
            data_constructors: vec!["[]".to_string(), ":".to_string()],
        },
    );
    program.data_constructors.insert(
        "[]".to_string(),
        DataConstructor {
            name: "[]".to_string(),
            line: LINE,
            type_constructor: "[]".to_string(),
            fields: vec![],
        },
    );
    program.data_constructor_arities.insert("[]".to_string(), 0);
    program.data_constructors.insert(
        ":".to_string(),
        DataConstructor {
            name: ":".to_string(),
            line: LINE,
            type_constructor: "[]".to_string(),
            fields: vec![
                Type::Quantified("a".to_string()),
                Type::list(Type::Quantified("a".to_string())),
            ],
        },
    );
    program.data_constructor_arities.insert(":".to_string(), 2);

    program
}
