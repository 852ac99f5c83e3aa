//! Type inference (§4.3 "Type inferencer").
//!
//! Implements the six-step procedure verbatim: validate signature kinds,
//! split explicit/implicit bindings, dependency-analyze the implicit ones,
//! seed assumptions from signatures, infer and generalize each implicit SCC
//! against the *outer* assumptions, then infer and `check_type_signature`
//! each explicit binding against the accumulated local assumptions. The
//! same procedure runs for both top-level `Program` bindings and a `Let`
//! expression's local declaration block — §4.3 calls this out explicitly
//! ("a block of declarations (top-level or let-local)").

pub mod signatures;

use crate::ast::{self, BuiltinOp, Expr, Literal, Pattern, Program};
use crate::dependency;
use crate::error::{CompileError, TypeError};
use crate::kinds::{self, KindEnvironment};
use crate::types::{Kind, Type};
use crate::unification::{self, instantiate_fresh};
use std::collections::{HashMap, HashSet};
use tracing::{debug, trace};

/// The constant, program-wide lookup tables needed alongside the mutable
/// `assumptions` map threaded through inference: data-constructor schemes
/// (a separate namespace from ordinary variables) and their arities (for
/// pattern-saturation checking), plus every type constructor's kind.
pub struct TypeEnv<'a> {
    pub dc_schemes: &'a HashMap<String, Type>,
    pub dc_arities: &'a HashMap<String, usize>,
    pub tc_kinds: &'a HashMap<String, Kind>,
}

impl<'a> TypeEnv<'a> {
    pub fn new(kind_env: &'a KindEnvironment, dc_arities: &'a HashMap<String, usize>) -> Self {
        TypeEnv {
            dc_schemes: &kind_env.data_constructor_schemes,
            dc_arities,
            tc_kinds: &kind_env.type_constructor_kinds,
        }
    }
}

/// Run kind inference, then type inference, over a whole program. Returns
/// the complete assumption set (one principal scheme per top-level name).
pub fn infer_program(program: &Program) -> Result<HashMap<String, Type>, CompileError> {
    let kind_env = kinds::infer_program(program)?;
    let env = TypeEnv::new(&kind_env, &program.data_constructor_arities);
    infer_declarations(&program.bindings, &program.signatures, &HashMap::new(), &env)
}

/// §4.3's six-step procedure, applied to one declaration block. Returns
/// just the schemes newly introduced by `bindings` (the caller merges them
/// into whatever broader assumption set is in scope).
pub fn infer_declarations(
    bindings: &[(String, Expr)],
    signatures: &HashMap<String, Type>,
    outer_assumptions: &HashMap<String, Type>,
    env: &TypeEnv,
) -> Result<HashMap<String, Type>, CompileError> {
    // Step 1: validate every signature's kind.
    for (name, ty) in signatures {
        kinds::check_signature_kind(ty, env.tc_kinds).map_err(|inner| {
            CompileError::from(crate::error::KindError::new(
                format!("Type signature for \"{}\" with invalid type: {}", name, inner),
                None,
            ))
        })?;
    }

    // A signature with no matching binding is ill-formed regardless of
    // whether the binding is implicit or explicit.
    for name in signatures.keys() {
        if !bindings.iter().any(|(n, _)| n == name) {
            return Err(TypeError::new(
                format!("Type signature for \"{}\" with no matching binding.", name),
                None,
            )
            .into());
        }
    }

    // Step 2: split explicitly- and implicitly-typed bindings.
    let (explicit, implicit): (Vec<_>, Vec<_>) = bindings
        .iter()
        .partition(|(name, _)| signatures.contains_key(name));

    // Step 3: dependency-analyze the implicit bindings only.
    let implicit_names: HashSet<String> = implicit.iter().map(|(n, _)| n.clone()).collect();
    let mut edges = HashMap::new();
    for (name, expr) in &implicit {
        let deps: HashSet<String> = ast::free_variables(expr)
            .into_iter()
            .filter(|n| implicit_names.contains(n))
            .collect();
        edges.insert(name.clone(), deps);
    }
    let groups = dependency::order_by_dependency(&edges);

    // Step 4: seed assumptions with explicit signatures plus everything
    // already in scope.
    let mut assumptions = outer_assumptions.clone();
    for (name, ty) in signatures {
        assumptions.insert(name.clone(), ty.clone());
    }

    let mut result = HashMap::new();

    // Step 5: each implicit SCC, in dependency order.
    for group in &groups {
        debug!(names = ?group.names, recursive = group.recursive, "inferring implicit binding group");

        let mut fresh_vars = HashMap::new();
        for name in &group.names {
            let fresh = Type::fresh_var();
            assumptions.insert(name.clone(), fresh.clone());
            fresh_vars.insert(name.clone(), fresh);
        }

        for name in &group.names {
            let (_, expr) = implicit.iter().find(|(n, _)| n == name).unwrap();
            let body_type = infer_expr(expr, &assumptions, env)?;
            unification::unify_type(&body_type, &fresh_vars[name]).map_err(|_| {
                TypeError::new(
                    format!("Line {}: could not deduce type for name {}.", expr.line(), name),
                    Some(expr.line()),
                )
            })?;
        }

        for name in &group.names {
            let generalized =
                unification::generalise(&fresh_vars[name], outer_assumptions.values().cloned());
            trace!(name = %name, scheme = %generalized, "generalized implicit binding");
            assumptions.insert(name.clone(), generalized.clone());
            result.insert(name.clone(), generalized);
        }
    }

    // Step 6: each explicit binding, against the final assumptions.
    for (name, expr) in &explicit {
        let declared = &signatures[name.as_str()];
        let body_type = infer_expr(expr, &assumptions, env)?;
        unification::unify_type(&body_type, &instantiate_fresh(declared)).map_err(|_| {
            TypeError::new(
                format!("Line {}: could not deduce type for name {}.", expr.line(), name),
                Some(expr.line()),
            )
        })?;
        let generalized = unification::generalise(&body_type, assumptions.values().cloned());
        signatures::check_type_signature(&generalized, declared).map_err(|_| {
            TypeError::new(
                format!("Line {}: could not confirm type for name {}.", expr.line(), name),
                Some(expr.line()),
            )
        })?;
        result.insert(name.to_string(), declared.clone());
    }

    Ok(result)
}

/// The expression rules table (§4.3 "Expression rules").
pub fn infer_expr(expr: &Expr, assumptions: &HashMap<String, Type>, env: &TypeEnv) -> Result<Type, CompileError> {
    match expr {
        Expr::IntLiteral { .. } => Ok(Type::int()),
        Expr::CharLiteral { .. } => Ok(Type::char()),
        Expr::StringLiteral { .. } => Ok(Type::string()),
        Expr::Variable { name, line } => assumptions
            .get(name)
            .map(instantiate_fresh)
            .ok_or_else(|| {
                TypeError::new(
                    format!("Line {}: undefined reference to name {}.", line, name),
                    Some(*line),
                )
                .into()
            }),
        Expr::Constructor { name, line } => env
            .dc_schemes
            .get(name)
            .map(instantiate_fresh)
            .ok_or_else(|| {
                TypeError::new(
                    format!("Line {}: undefined reference to name {}.", line, name),
                    Some(*line),
                )
                .into()
            }),
        Expr::Abstraction { params, body, .. } => {
            let mut inner = assumptions.clone();
            let param_types: Vec<Type> = params
                .iter()
                .map(|p| {
                    let fresh = Type::fresh_var();
                    inner.insert(p.clone(), fresh.clone());
                    fresh
                })
                .collect();
            let body_type = infer_expr(body, &inner, env)?;
            Ok(param_types
                .into_iter()
                .rev()
                .fold(body_type, |acc, param_ty| Type::function(param_ty, acc)))
        }
        Expr::Application { left, right, line } => {
            let left_type = infer_expr(left, assumptions, env)?;
            let right_type = infer_expr(right, assumptions, env)?;
            let result = Type::fresh_var();
            unification::unify_type(&left_type, &Type::function(right_type, result.clone()))
                .map_err(|_| {
                    TypeError::new(
                        format!("Line {}: could not infer type for application.", line),
                        Some(*line),
                    )
                })?;
            Ok(result)
        }
        Expr::Let {
            bindings,
            signatures,
            body,
            ..
        } => {
            let new_assumptions = infer_declarations(bindings, signatures, assumptions, env)?;
            let mut extended = assumptions.clone();
            extended.extend(new_assumptions);
            infer_expr(body, &extended, env)
        }
        Expr::Case {
            scrutinee,
            alternatives,
            line,
        } => {
            let scrutinee_type = infer_expr(scrutinee, assumptions, env)?;
            let result = Type::fresh_var();
            for (pattern, alt_expr) in alternatives {
                let mut alt_assumptions = assumptions.clone();
                let pattern_type = infer_pattern(pattern, &mut alt_assumptions, env)?;
                unification::unify_type(&pattern_type, &scrutinee_type).map_err(|_| {
                    TypeError::new(
                        format!(
                            "Line {}: type expected by pattern does not unify with type of expression being analysed by case.",
                            line
                        ),
                        Some(*line),
                    )
                })?;
                let alt_type = infer_expr(alt_expr, &alt_assumptions, env)?;
                unification::unify_type(&alt_type, &result).map_err(|_| {
                    TypeError::new(
                        format!(
                            "Line {}: type of expression in alternative does not unify with the types in other alternatives.",
                            line
                        ),
                        Some(*line),
                    )
                })?;
            }
            Ok(result)
        }
        Expr::BuiltinOp { left, right, op, line } => infer_builtin_op(*op, left.as_deref(), right, *line, assumptions, env),
    }
}

fn infer_builtin_op(
    op: BuiltinOp,
    left: Option<&Expr>,
    right: &Expr,
    line: u32,
    assumptions: &HashMap<String, Type>,
    env: &TypeEnv,
) -> Result<Type, CompileError> {
    let invalid_args = || {
        CompileError::from(TypeError::new(
            format!("Line {}: invalid arguments to built in operator.", line),
            Some(line),
        ))
    };

    match op {
        BuiltinOp::Negate => {
            let right_type = infer_expr(right, assumptions, env)?;
            unification::unify_type(&right_type, &Type::int()).map_err(|_| invalid_args())?;
            Ok(Type::int())
        }
        BuiltinOp::Add | BuiltinOp::Sub | BuiltinOp::Times | BuiltinOp::Divide => {
            let left_type = infer_expr(left.expect("binary op always has a left operand"), assumptions, env)?;
            let right_type = infer_expr(right, assumptions, env)?;
            unification::unify_type(&left_type, &Type::int()).map_err(|_| invalid_args())?;
            unification::unify_type(&right_type, &Type::int()).map_err(|_| invalid_args())?;
            Ok(Type::int())
        }
        BuiltinOp::Eq | BuiltinOp::Neq => {
            let left_type = infer_expr(left.expect("binary op always has a left operand"), assumptions, env)?;
            let right_type = infer_expr(right, assumptions, env)?;
            unification::unify_type(&left_type, &right_type).map_err(|_| invalid_args())?;
            Ok(Type::bool())
        }
        BuiltinOp::Lt | BuiltinOp::Lte | BuiltinOp::Gt | BuiltinOp::Gte => {
            let left_type = infer_expr(left.expect("binary op always has a left operand"), assumptions, env)?;
            let right_type = infer_expr(right, assumptions, env)?;
            unification::unify_type(&left_type, &Type::int()).map_err(|_| invalid_args())?;
            unification::unify_type(&right_type, &Type::int()).map_err(|_| invalid_args())?;
            Ok(Type::bool())
        }
    }
}

/// Pattern inference: mirrors the expression rules at the type level (§4.3
/// "Pattern rules"). Binds every name the pattern introduces into
/// `assumptions` as a side effect and returns the type the whole pattern
/// matches against.
pub fn infer_pattern(
    pattern: &Pattern,
    assumptions: &mut HashMap<String, Type>,
    env: &TypeEnv,
) -> Result<Type, CompileError> {
    let names = ast::pattern_bound_names(pattern);
    let mut seen = HashSet::new();
    for name in &names {
        if !seen.insert(name.clone()) {
            return Err(TypeError::new(
                format!(
                    "Line {}: a variable should occur at most once within a pattern.",
                    pattern.line()
                ),
                Some(pattern.line()),
            )
            .into());
        }
    }
    infer_pattern_inner(pattern, assumptions, env)
}

fn infer_pattern_inner(
    pattern: &Pattern,
    assumptions: &mut HashMap<String, Type>,
    env: &TypeEnv,
) -> Result<Type, CompileError> {
    match pattern {
        Pattern::Wildcard { as_names, .. } => {
            let ty = Type::fresh_var();
            for name in as_names {
                assumptions.insert(name.clone(), ty.clone());
            }
            Ok(ty)
        }
        Pattern::Variable { name, as_names, .. } => {
            let ty = Type::fresh_var();
            assumptions.insert(name.clone(), ty.clone());
            for alias in as_names {
                assumptions.insert(alias.clone(), ty.clone());
            }
            Ok(ty)
        }
        Pattern::Literal { value, as_names, .. } => {
            let ty = match value {
                Literal::Int(_) => Type::int(),
                Literal::Char(_) => Type::char(),
            };
            for name in as_names {
                assumptions.insert(name.clone(), ty.clone());
            }
            Ok(ty)
        }
        Pattern::Constructor {
            name,
            args,
            as_names,
            line,
        } => {
            let scheme = env.dc_schemes.get(name).ok_or_else(|| {
                CompileError::from(TypeError::new(
                    format!(
                        "Line {}: reference in pattern to undefined data constructor {}.",
                        line, name
                    ),
                    Some(*line),
                ))
            })?;
            let declared_arity = *env.dc_arities.get(name).unwrap_or(&0);
            if declared_arity != args.len() {
                return Err(TypeError::new(
                    format!("Line {}: one cannot match against a partially-applied constructor.", line),
                    Some(*line),
                )
                .into());
            }

            let mut instantiated = instantiate_fresh(scheme);
            let mut field_types = Vec::with_capacity(args.len());
            for _ in 0..args.len() {
                let (arg_ty, rest) = instantiated.as_function().ok_or_else(|| {
                    CompileError::from(TypeError::new(
                        format!("Line {}: one cannot match against a partially-applied constructor.", line),
                        Some(*line),
                    ))
                })?;
                field_types.push(arg_ty);
                instantiated = rest;
            }

            for (sub_pattern, field_type) in args.iter().zip(field_types.iter()) {
                let sub_type = infer_pattern_inner(sub_pattern, assumptions, env)?;
                unification::unify_type(&sub_type, field_type).map_err(|_| {
                    TypeError::new(
                        format!(
                            "Line {}: could not unify the type of the data constructor {} with the type implied by the pattern it was used in.",
                            line, name
                        ),
                        Some(*line),
                    )
                })?;
            }

            for alias in as_names {
                assumptions.insert(alias.clone(), instantiated.clone());
            }
            Ok(instantiated)
        }
    }
}
