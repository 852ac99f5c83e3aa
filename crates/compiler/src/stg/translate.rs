//! Expression translation (§4.4): every surface `Expr` form except `Case`
//! (handled in `super::case`) lowered into an `(LambdaForm, extra_definitions)`
//! pair, ported directly from `stg.cpp`'s `translate_expression` and its
//! per-form helpers.
//!
//! `extra_definitions` is the writer-style "definitions list" threaded
//! through every recursive call: a binding that a sub-translation had to
//! lift out (because its value wasn't already an atomic name) but that does
//! not itself belong at this scope. Each caller either passes its own
//! extra-definitions further up unchanged, or — at a lambda, case-alt, or
//! top-level `let` boundary — calls `capture_definitions_that_depend_on_names`
//! to decide which of them must instead become a nested `let` right here,
//! because they reference a name this scope just introduced.

use super::case;
use super::{LambdaForm, StgExpr};
use crate::ast::{Expr, Literal, Program};
use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet};

/// A binding-group lifted out of a sub-translation, not yet placed.
pub(super) type Definitions = Vec<BTreeMap<String, LambdaForm>>;

/// Everything the translator needs that does not change mid-traversal.
pub(super) struct Ctx<'a> {
    pub dc_arities: &'a HashMap<String, usize>,
}

pub(super) fn fresh_name(next_var: &mut u64) -> String {
    let name = format!(".{}", *next_var);
    *next_var += 1;
    name
}

pub(super) fn add_definition(name: String, lambda_form: LambdaForm, definitions: &mut Definitions) {
    let mut bindings = BTreeMap::new();
    bindings.insert(name, lambda_form);
    definitions.push(bindings);
}

/// If `lambda_form`'s body is already a bare variable reference, return its
/// name directly; otherwise lift it into its own binding under a fresh
/// dot-name and return that. Every STG node that only ever references
/// variables by name (`Application`'s arguments, `Constructor`'s arguments,
/// `PrimitiveOp`'s operands) goes through this.
pub(super) fn name_or_lift(next_var: &mut u64, lambda_form: LambdaForm, definitions: &mut Definitions) -> String {
    if let StgExpr::Variable(name) = &lambda_form.body {
        name.clone()
    } else {
        let name = fresh_name(next_var);
        add_definition(name.clone(), lambda_form, definitions);
        name
    }
}

/// Dispatch table for every expression form (§4.4).
pub(super) fn translate_expr(
    ctx: &Ctx,
    next_var: &mut u64,
    renamings: &HashMap<String, String>,
    expr: &Expr,
) -> (LambdaForm, Definitions) {
    match expr {
        Expr::IntLiteral { value, .. } => translate_literal(Literal::Int(*value)),
        Expr::CharLiteral { value, .. } => translate_literal(Literal::Char(*value)),
        Expr::StringLiteral { value, .. } => translate_string_literal(ctx, next_var, value),
        Expr::Variable { name, .. } => translate_variable(name, renamings),
        Expr::Constructor { name, .. } => translate_constructor(ctx, next_var, name),
        Expr::Abstraction { .. } => translate_abstraction(ctx, next_var, renamings.clone(), expr),
        Expr::Application { .. } => translate_application(ctx, next_var, renamings, expr),
        Expr::Let { bindings, body, .. } => {
            translate_let(ctx, next_var, renamings.clone(), bindings, body)
        }
        Expr::Case { .. } => case::translate_case(ctx, next_var, renamings, expr),
        Expr::BuiltinOp {
            left, right, op, ..
        } => translate_built_in_op(ctx, next_var, renamings, *op, left.as_deref(), right),
    }
}

fn translate_variable(name: &str, renamings: &HashMap<String, String>) -> (LambdaForm, Definitions) {
    let resolved = renamings.get(name).cloned().unwrap_or_else(|| name.to_string());
    let mut free_variables = BTreeSet::new();
    free_variables.insert(resolved.clone());
    (
        LambdaForm {
            free_variables,
            parameters: vec![],
            updatable: true,
            body: StgExpr::Variable(resolved),
        },
        Vec::new(),
    )
}

fn translate_literal(value: Literal) -> (LambdaForm, Definitions) {
    (
        LambdaForm {
            free_variables: BTreeSet::new(),
            parameters: vec![],
            updatable: false,
            body: StgExpr::Literal(value),
        },
        Vec::new(),
    )
}

/// A bare constructor reference (not yet applied to any arguments): a
/// lambda-form with one fresh parameter per field, non-updatable, whose
/// body saturates the constructor with those parameters. Saturated
/// application (`C a b`) instead goes through `translate_application`.
fn translate_constructor(ctx: &Ctx, next_var: &mut u64, name: &str) -> (LambdaForm, Definitions) {
    let arity = ctx.dc_arities[name];
    let parameters: Vec<String> = (0..arity).map(|_| fresh_name(next_var)).collect();
    (
        LambdaForm {
            free_variables: BTreeSet::new(),
            parameters: parameters.clone(),
            updatable: false,
            body: StgExpr::Constructor {
                name: name.to_string(),
                arguments: parameters,
            },
        },
        Vec::new(),
    )
}

/// `"ab"` desugars to `':' 'a' (':' 'b' [])`: each character and each
/// cons-cell is lifted to its own fresh binding, and the whole chain is
/// referenced by the name of its outermost cell. Not present in `stg.cpp`
/// (its surface grammar has no string literals) — built by the same
/// lift-to-a-name-then-saturate pattern `translate_constructor`/
/// `translate_application` use for ordinary constructor applications.
fn translate_string_literal(ctx: &Ctx, next_var: &mut u64, value: &str) -> (LambdaForm, Definitions) {
    let mut definitions = Vec::new();

    let nil_name = fresh_name(next_var);
    add_definition(
        nil_name.clone(),
        LambdaForm {
            free_variables: BTreeSet::new(),
            parameters: vec![],
            updatable: false,
            body: StgExpr::Constructor {
                name: "[]".to_string(),
                arguments: vec![],
            },
        },
        &mut definitions,
    );

    let mut tail_name = nil_name;
    for ch in value.chars().rev() {
        let char_name = fresh_name(next_var);
        add_definition(
            char_name.clone(),
            LambdaForm {
                free_variables: BTreeSet::new(),
                parameters: vec![],
                updatable: false,
                body: StgExpr::Literal(Literal::Char(ch)),
            },
            &mut definitions,
        );

        let cons_name = fresh_name(next_var);
        let arity = ctx.dc_arities.get(":").copied().unwrap_or(2);
        debug_assert_eq!(arity, 2, "cons constructor must be binary");
        let mut free_variables = BTreeSet::new();
        free_variables.insert(char_name.clone());
        free_variables.insert(tail_name.clone());
        add_definition(
            cons_name.clone(),
            LambdaForm {
                free_variables,
                parameters: vec![],
                updatable: false,
                body: StgExpr::Constructor {
                    name: ":".to_string(),
                    arguments: vec![char_name, tail_name.clone()],
                },
            },
            &mut definitions,
        );
        tail_name = cons_name;
    }

    let mut free_variables = BTreeSet::new();
    free_variables.insert(tail_name.clone());
    (
        LambdaForm {
            free_variables,
            parameters: vec![],
            updatable: true,
            body: StgExpr::Variable(tail_name),
        },
        definitions,
    )
}

fn translate_built_in_op(
    ctx: &Ctx,
    next_var: &mut u64,
    renamings: &HashMap<String, String>,
    op: crate::ast::BuiltinOp,
    left: Option<&Expr>,
    right: &Expr,
) -> (LambdaForm, Definitions) {
    let mut definitions = Vec::new();

    let left_name = left.map(|left_expr| {
        let (lf, defs) = translate_expr(ctx, next_var, renamings, left_expr);
        definitions.extend(defs);
        name_or_lift(next_var, lf, &mut definitions)
    });

    let (right_lf, right_defs) = translate_expr(ctx, next_var, renamings, right);
    definitions.extend(right_defs);
    let right_name = name_or_lift(next_var, right_lf, &mut definitions);

    let mut free_variables = BTreeSet::new();
    if let Some(name) = &left_name {
        free_variables.insert(name.clone());
    }
    free_variables.insert(right_name.clone());

    (
        LambdaForm {
            free_variables,
            parameters: vec![],
            updatable: true,
            body: StgExpr::PrimitiveOp {
                left: left_name,
                right: right_name,
                op,
            },
        },
        definitions,
    )
}

/// §4.4's "extra-definitions list threading": partition `definitions` into
/// ones independent of `names` (bubble outward unchanged) and ones that
/// reference a name in `names` (must instead become a nested `let` wrapped
/// directly around `expr`, in reverse order so earlier groups end up
/// outermost). A captured group's own `recursive` flag is true when one of
/// its own bindings refers to another binding in the very same group.
pub(super) fn capture_definitions_that_depend_on_names(
    definitions: Definitions,
    expr: &mut StgExpr,
    free_variables_in_expr: &mut BTreeSet<String>,
    names: &[String],
) -> Definitions {
    let mut independent_definitions = Vec::new();
    let mut definitions_that_depend_on_names: Vec<(BTreeMap<String, LambdaForm>, bool)> = Vec::new();
    let mut names_that_depend_on_names: BTreeSet<String> = names.iter().cloned().collect();

    for definition in definitions {
        let defined_names: BTreeSet<String> = definition.keys().cloned().collect();
        let mut free_variables_in_definition: BTreeSet<String> = BTreeSet::new();
        let mut depends_on_names = false;
        for lambda_form in definition.values() {
            for free_variable in &lambda_form.free_variables {
                free_variables_in_definition.insert(free_variable.clone());
                if names_that_depend_on_names.contains(free_variable) {
                    depends_on_names = true;
                }
            }
        }

        if !depends_on_names {
            independent_definitions.push(definition);
            continue;
        }

        for name in &defined_names {
            free_variables_in_expr.remove(name);
            names_that_depend_on_names.insert(name.clone());
        }

        let mut recursive = false;
        for name in &free_variables_in_definition {
            if defined_names.contains(name) {
                recursive = true;
            } else if !names_that_depend_on_names.contains(name) {
                free_variables_in_expr.insert(name.clone());
            }
        }
        definitions_that_depend_on_names.push((definition, recursive));
    }

    for (definition, recursive) in definitions_that_depend_on_names.into_iter().rev() {
        let body = std::mem::replace(expr, StgExpr::Variable(String::new()));
        *expr = StgExpr::Let {
            bindings: definition,
            body: Box::new(body),
            recursive,
        };
    }

    independent_definitions
}

/// Translate one case alternative's (or let-body's) right-hand side: if its
/// translation is itself a function (non-empty parameter list), lift the
/// whole thing under a fresh name and reference it by name; otherwise take
/// its body and free variables directly. Either way, strip `names_bound_in_pattern`
/// from the result's free variables and run `capture_definitions_that_depend_on_names`
/// against them before reporting back to the caller.
pub(super) fn translate_alt_expression(
    ctx: &Ctx,
    next_var: &mut u64,
    renamings: &HashMap<String, String>,
    expr: &Expr,
    names_bound_in_pattern: &[String],
    definitions: &mut Definitions,
    free_variables: &mut BTreeSet<String>,
) -> StgExpr {
    let (lambda_form, mut alt_definitions) = translate_expr(ctx, next_var, renamings, expr);

    let (mut free_variables_in_alt, mut alt_expr) = if !lambda_form.parameters.is_empty() {
        let name = fresh_name(next_var);
        let mut free = BTreeSet::new();
        free.insert(name.clone());
        add_definition(name.clone(), lambda_form, &mut alt_definitions);
        (free, StgExpr::Variable(name))
    } else {
        (lambda_form.free_variables, lambda_form.body)
    };

    for variable in names_bound_in_pattern {
        free_variables_in_alt.remove(variable);
    }

    let independent_definitions = capture_definitions_that_depend_on_names(
        alt_definitions,
        &mut alt_expr,
        &mut free_variables_in_alt,
        names_bound_in_pattern,
    );

    definitions.extend(independent_definitions);
    free_variables.extend(free_variables_in_alt);

    alt_expr
}

/// Collapse a chain of nested applications `((f a) b) c` into one flat
/// `STGApplication`/saturated-constructor node, translating each argument
/// back-to-front (right-to-left) exactly as `stg.cpp` does, so dot-names are
/// assigned in the same order.
fn translate_application(
    ctx: &Ctx,
    next_var: &mut u64,
    renamings: &HashMap<String, String>,
    expr: &Expr,
) -> (LambdaForm, Definitions) {
    let mut definitions = Vec::new();
    let mut argument_variables: Vec<String> = Vec::new();

    let mut current = expr;
    loop {
        let (left, right) = match current {
            Expr::Application { left, right, .. } => (left.as_ref(), right.as_ref()),
            _ => unreachable!("translate_application called on a non-Application expression"),
        };

        let (right_lf, right_defs) = translate_expr(ctx, next_var, renamings, right);
        definitions.extend(right_defs);
        let name = name_or_lift(next_var, right_lf, &mut definitions);
        argument_variables.insert(0, name);

        current = left;
        if !matches!(current, Expr::Application { .. }) {
            break;
        }
    }

    if let Expr::Constructor { name, .. } = current {
        let arity = ctx.dc_arities[name];
        let additional_argument_variables: Vec<String> = (argument_variables.len()..arity)
            .map(|_| fresh_name(next_var))
            .collect();
        let mut combined_argument_variables = argument_variables.clone();
        combined_argument_variables.extend(additional_argument_variables.iter().cloned());

        return (
            LambdaForm {
                free_variables: argument_variables.into_iter().collect(),
                parameters: additional_argument_variables,
                updatable: false,
                body: StgExpr::Constructor {
                    name: name.clone(),
                    arguments: combined_argument_variables,
                },
            },
            definitions,
        );
    }

    let (head_lf, head_defs) = translate_expr(ctx, next_var, renamings, current);
    definitions.extend(head_defs);
    let function_name = name_or_lift(next_var, head_lf, &mut definitions);

    let mut free_variables: BTreeSet<String> = argument_variables.iter().cloned().collect();
    free_variables.insert(function_name.clone());

    (
        LambdaForm {
            free_variables,
            parameters: vec![],
            updatable: true,
            body: StgExpr::Application {
                function: function_name,
                arguments: argument_variables,
            },
        },
        definitions,
    )
}

/// Collapse a chain of nested abstractions `\x -> \y -> body` into one
/// lambda-form with all parameters in outermost-first order, then capture
/// any extra definitions that reference one of those parameters as a
/// nested `let` right inside the body.
fn translate_abstraction(
    ctx: &Ctx,
    next_var: &mut u64,
    mut renamings: HashMap<String, String>,
    expr: &Expr,
) -> (LambdaForm, Definitions) {
    let mut argument_variables = Vec::new();
    let mut current = expr;
    while let Expr::Abstraction { params, body, .. } = current {
        for param in params {
            let new_name = fresh_name(next_var);
            argument_variables.push(new_name.clone());
            renamings.insert(param.clone(), new_name);
        }
        current = body;
    }

    let (lambda_form, definitions) = translate_expr(ctx, next_var, &renamings, current);
    let mut free_variables = lambda_form.free_variables;
    let mut body_expr = lambda_form.body;
    for variable in &argument_variables {
        free_variables.remove(variable);
    }

    let independent_definitions = capture_definitions_that_depend_on_names(
        definitions,
        &mut body_expr,
        &mut free_variables,
        &argument_variables,
    );

    (
        LambdaForm {
            free_variables,
            parameters: argument_variables,
            updatable: false,
            body: body_expr,
        },
        independent_definitions,
    )
}

/// §4.1-style SCC grouping of a `let`'s own bindings (reusing
/// `dependency::order_by_dependency`, the same machinery the type
/// inferencer uses for top-level groups), then — unlike lambda/case-alt
/// translation, which *nests* dependent extra-definitions as a `let` around
/// the current body — folds every definition that depends on a name in the
/// current group directly into that group's own bindings map. This mirrors
/// `translate_let` in `stg.cpp`, which is deliberately asymmetric with
/// `translate_abstraction`/`translate_alt_expression` here.
fn translate_let(
    ctx: &Ctx,
    next_var: &mut u64,
    mut renamings: HashMap<String, String>,
    bindings: &[(String, Expr)],
    body: &Expr,
) -> (LambdaForm, Definitions) {
    let mut names_defined = Vec::new();
    for (name, _) in bindings {
        let new_name = fresh_name(next_var);
        renamings.insert(name.clone(), new_name);
        names_defined.push(name.clone());
    }
    let names_defined_set: HashSet<String> = names_defined.iter().cloned().collect();

    let mut edges = HashMap::new();
    for (name, definition) in bindings {
        let free = crate::ast::free_variables(definition);
        edges.insert(
            name.clone(),
            free.intersection(&names_defined_set).cloned().collect(),
        );
    }
    let groups = crate::dependency::order_by_dependency(&edges);

    let mut definitions: Definitions = Vec::new();

    for group in &groups {
        let mut group_bindings: BTreeMap<String, LambdaForm> = BTreeMap::new();
        let mut names_defined_in_group: HashSet<String> =
            group.names.iter().map(|name| renamings[name].clone()).collect();

        for name in &group.names {
            let definition = bindings
                .iter()
                .find(|(n, _)| n == name)
                .map(|(_, e)| e)
                .expect("let-group name must name one of the let's own bindings");

            let (lambda_form, defs) = translate_expr(ctx, next_var, &renamings, definition);

            for def in defs {
                let depends_on_group = def
                    .values()
                    .any(|lf| lf.free_variables.iter().any(|fv| names_defined_in_group.contains(fv)));

                if !depends_on_group {
                    definitions.push(def);
                } else {
                    for (n, lf) in def {
                        names_defined_in_group.insert(n.clone());
                        group_bindings.insert(n, lf);
                    }
                }
            }

            group_bindings.insert(renamings[name].clone(), lambda_form);
        }

        definitions.push(group_bindings);
    }

    let (body_lf, body_defs) = translate_expr(ctx, next_var, &renamings, body);
    definitions.extend(body_defs);

    (body_lf, definitions)
}

/// The top-level binding loop (§4.4): translate every top-level binding
/// under empty renamings (top-level names are already in scope under their
/// own surface names), then flatten whatever each translation lifts out
/// directly into the same flat global bindings map.
pub(super) fn translate_top_level(program: &Program) -> BTreeMap<String, LambdaForm> {
    let ctx = Ctx {
        dc_arities: &program.data_constructor_arities,
    };
    let mut next_var: u64 = 0;
    let mut bindings: BTreeMap<String, LambdaForm> = BTreeMap::new();
    let empty_renamings = HashMap::new();

    for (name, expr) in &program.bindings {
        let (lambda_form, defs) = translate_expr(&ctx, &mut next_var, &empty_renamings, expr);
        bindings.insert(name.clone(), lambda_form);
        for definition in defs {
            for (n, lf) in definition {
                bindings.insert(n, lf);
            }
        }
    }

    bindings
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::Program;
    use std::collections::HashMap as StdHashMap;

    fn ctx(arities: &StdHashMap<String, usize>) -> Ctx<'_> {
        Ctx { dc_arities: arities }
    }

    #[test]
    fn variable_translates_to_itself_when_unrenamed() {
        let expr = Expr::Variable {
            name: "x".to_string(),
            line: 1,
        };
        let (lf, defs) = translate_variable("x", &HashMap::new());
        assert!(defs.is_empty());
        assert_eq!(lf.body, StgExpr::Variable("x".to_string()));
        assert!(lf.free_variables.contains("x"));
        let _ = expr;
    }

    #[test]
    fn variable_is_resolved_through_renamings() {
        let mut renamings = HashMap::new();
        renamings.insert("x".to_string(), ".0".to_string());
        let (lf, _) = translate_variable("x", &renamings);
        assert_eq!(lf.body, StgExpr::Variable(".0".to_string()));
    }

    #[test]
    fn int_literal_lambda_form_is_not_updatable() {
        let (lf, defs) = translate_literal(Literal::Int(5));
        assert!(!lf.updatable);
        assert!(defs.is_empty());
        assert_eq!(lf.body, StgExpr::Literal(Literal::Int(5)));
    }

    #[test]
    fn nullary_constructor_has_no_parameters() {
        let mut arities = StdHashMap::new();
        arities.insert("True".to_string(), 0);
        let mut next_var = 0;
        let (lf, _) = translate_constructor(&ctx(&arities), &mut next_var, "True");
        assert!(lf.parameters.is_empty());
        assert!(!lf.updatable);
        assert_eq!(
            lf.body,
            StgExpr::Constructor {
                name: "True".to_string(),
                arguments: vec![]
            }
        );
    }

    #[test]
    fn saturating_constructor_reference_gets_one_parameter_per_field() {
        let mut arities = StdHashMap::new();
        arities.insert(":".to_string(), 2);
        let mut next_var = 0;
        let (lf, _) = translate_constructor(&ctx(&arities), &mut next_var, ":");
        assert_eq!(lf.parameters.len(), 2);
        match &lf.body {
            StgExpr::Constructor { name, arguments } => {
                assert_eq!(name, ":");
                assert_eq!(arguments, &lf.parameters);
            }
            _ => panic!("expected a constructor body"),
        }
    }

    #[test]
    fn string_literal_desugars_into_cons_chain_with_lifted_bindings() {
        let mut arities = StdHashMap::new();
        arities.insert("[]".to_string(), 0);
        arities.insert(":".to_string(), 2);
        let mut next_var = 0;
        let (lf, defs) = translate_string_literal(&ctx(&arities), &mut next_var, "ab");
        // Two characters plus the empty list: 3 leaf bindings, plus 2 cons cells.
        assert_eq!(defs.len(), 5);
        match &lf.body {
            StgExpr::Variable(_) => {}
            other => panic!("expected the result to reference the outermost cons cell by name, got {other:?}"),
        }
    }

    #[test]
    fn empty_string_literal_desugars_to_nil() {
        let mut arities = StdHashMap::new();
        arities.insert("[]".to_string(), 0);
        let mut next_var = 0;
        let (_, defs) = translate_string_literal(&ctx(&arities), &mut next_var, "");
        assert_eq!(defs.len(), 1);
    }

    #[test]
    fn application_of_saturated_constructor_is_non_updatable() {
        let mut program = Program::new();
        program.data_constructor_arities.insert(":".to_string(), 2);
        let expr = Expr::Application {
            left: Box::new(Expr::Application {
                left: Box::new(Expr::Constructor {
                    name: ":".to_string(),
                    line: 1,
                }),
                right: Box::new(Expr::CharLiteral { value: 'a', line: 1 }),
                line: 1,
            }),
            right: Box::new(Expr::Variable {
                name: "rest".to_string(),
                line: 1,
            }),
            line: 1,
        };
        let ctx = ctx(&program.data_constructor_arities);
        let mut next_var = 0;
        let (lf, _) = translate_application(&ctx, &mut next_var, &HashMap::new(), &expr);
        assert!(!lf.updatable);
        assert!(lf.parameters.is_empty());
        match lf.body {
            StgExpr::Constructor { name, arguments } => {
                assert_eq!(name, ":");
                assert_eq!(arguments.len(), 2);
            }
            other => panic!("expected a saturated constructor, got {other:?}"),
        }
    }

    #[test]
    fn nested_abstraction_collapses_to_one_lambda_form() {
        let expr = Expr::Abstraction {
            params: vec!["x".to_string()],
            body: Box::new(Expr::Abstraction {
                params: vec!["y".to_string()],
                body: Box::new(Expr::Variable {
                    name: "x".to_string(),
                    line: 1,
                }),
                line: 1,
            }),
            line: 1,
        };
        let arities = StdHashMap::new();
        let ctx = ctx(&arities);
        let mut next_var = 0;
        let (lf, defs) = translate_abstraction(&ctx, &mut next_var, HashMap::new(), &expr);
        assert_eq!(lf.parameters.len(), 2);
        assert!(defs.is_empty());
        assert!(!lf.updatable);
    }

    #[test]
    fn capture_leaves_independent_definitions_alone() {
        let mut independent_def = BTreeMap::new();
        independent_def.insert(
            "g".to_string(),
            LambdaForm {
                free_variables: ["other".to_string()].into_iter().collect(),
                parameters: vec![],
                updatable: true,
                body: StgExpr::Variable("other".to_string()),
            },
        );
        let mut expr = StgExpr::Variable("x".to_string());
        let mut free_variables: BTreeSet<String> = ["x".to_string()].into_iter().collect();
        let independent = capture_definitions_that_depend_on_names(
            vec![independent_def],
            &mut expr,
            &mut free_variables,
            &["x".to_string()],
        );
        assert_eq!(independent.len(), 1);
        assert_eq!(expr, StgExpr::Variable("x".to_string()));
    }

    #[test]
    fn capture_wraps_dependent_definitions_as_a_let() {
        let mut dependent_def = BTreeMap::new();
        dependent_def.insert(
            "g".to_string(),
            LambdaForm {
                free_variables: ["x".to_string()].into_iter().collect(),
                parameters: vec![],
                updatable: true,
                body: StgExpr::Variable("x".to_string()),
            },
        );
        let mut expr = StgExpr::Variable("g".to_string());
        let mut free_variables: BTreeSet<String> = ["g".to_string()].into_iter().collect();
        let independent = capture_definitions_that_depend_on_names(
            vec![dependent_def],
            &mut expr,
            &mut free_variables,
            &["x".to_string()],
        );
        assert!(independent.is_empty());
        assert!(free_variables.contains("x"));
        assert!(!free_variables.contains("g"));
        match expr {
            StgExpr::Let { bindings, .. } => assert!(bindings.contains_key("g")),
            other => panic!("expected a let, got {other:?}"),
        }
    }
}
