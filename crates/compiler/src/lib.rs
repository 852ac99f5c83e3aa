//! PicoHaskell Compiler Library
//!
//! Provides the core pipeline of a compiler for a small, pure, lazy,
//! statically typed functional language (a Haskell subset): kind inference,
//! Hindley-Milner type inference with let-generalization, and translation to
//! an STG-form intermediate representation. Lexing, parsing, and final code
//! generation are external collaborators; this crate's input is a `Program`
//! already built by a parser, and its output is an `StgProgram` ready for an
//! emitter.
//!
//! # Running the pipeline
//!
//! ```rust,ignore
//! use pico_compiler::{Program, compile_program};
//!
//! let program: Program = serde_json::from_str(source_json)?;
//! let program = program.derive_arities();
//! let stg_program = compile_program(program)?;
//! let output = serde_json::to_string_pretty(&stg_program)?;
//! ```

pub mod ast;
pub mod config;
pub mod dependency;
pub mod error;
pub mod kinds;
pub mod prelude;
pub mod stg;
pub mod typecheck;
pub mod types;
pub mod unification;

pub use ast::Program;
pub use config::PipelineConfig;
pub use error::{CompileError, KindError, StgError, TypeError};
pub use stg::StgProgram;
pub use types::{Kind, Type};

use tracing::debug;

/// Run the full pipeline (§2) over a program: merge the prelude, infer kinds
/// and types, and translate the typed surface AST to STG form.
///
/// `program` need not already include the prelude — it is merged ahead of
/// `program`'s own declarations here, matching §6's documented input
/// contract ("a prelude injected prior to user source").
pub fn compile_program(program: Program) -> Result<StgProgram, CompileError> {
    compile_program_with_config(program, &PipelineConfig::default())
}

/// Run the full pipeline with a [`PipelineConfig`]. The config's toggles only
/// gate extra tracing output; pipeline semantics are unaffected by any of
/// them.
pub fn compile_program_with_config(
    program: Program,
    config: &PipelineConfig,
) -> Result<StgProgram, CompileError> {
    let program = program.with_prelude(prelude::prelude_program()).derive_arities();

    debug!(
        bindings = program.bindings.len(),
        type_constructors = program.type_constructors.len(),
        "starting pipeline"
    );

    let _assumptions = typecheck::infer_program(&program)?;
    if config.trace_dependency_groups || config.trace_unification {
        debug!("type inference complete, translating to STG");
    }

    let stg_program = stg::translate(&program)?;

    debug!(
        bindings = stg_program.bindings.len(),
        data_constructors = stg_program.data_constructors.len(),
        "pipeline complete"
    );

    Ok(stg_program)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::Expr;

    fn program_with_main(body: Expr) -> Program {
        let mut program = Program::new();
        program.bindings.push(("main".to_string(), body));
        program
    }

    #[test]
    fn compiles_a_literal_binding_end_to_end() {
        let program = program_with_main(Expr::IntLiteral { value: 1, line: 1 });
        let stg_program = compile_program(program).unwrap();
        assert!(stg_program.bindings.contains_key("main"));
    }

    #[test]
    fn missing_main_is_reported_as_an_stg_error() {
        let program = Program::new();
        let err = compile_program(program).unwrap_err();
        assert!(matches!(err, CompileError::Stg(_)));
    }

    #[test]
    fn ill_typed_program_is_reported_as_a_type_error() {
        let program = program_with_main(Expr::BuiltinOp {
            left: Some(Box::new(Expr::CharLiteral { value: 'a', line: 1 })),
            right: Box::new(Expr::IntLiteral { value: 1, line: 1 }),
            op: crate::ast::BuiltinOp::Add,
            line: 1,
        });
        let err = compile_program(program).unwrap_err();
        assert!(matches!(err, CompileError::Type(_)));
    }
}
