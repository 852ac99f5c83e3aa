//! Global cleanup (§4.5): the pass run after translation and before an
//! `StgProgram` is handed to an emitter.
//!
//! Four independent sweeps over the flat bindings map `translate_top_level`
//! produces: strip statically-addressable globals out of nested closures'
//! free-variable sets, force partial applications non-updatable, prune to
//! what `main` actually reaches, and build the descriptor table for every
//! data constructor that survives the prune. Grounded in `stg.cpp`'s own
//! post-translation cleanup pass, which runs these as one traversal; they are
//! kept as separate functions here since each sweep has its own invariant to
//! state and test independently.

use super::{DataConstructorDescriptor, LambdaForm, StgExpr, StgPattern, StgProgram};
use crate::ast::Program;
use crate::error::StgError;
use std::collections::{BTreeMap, BTreeSet, HashMap};

/// Tags fixed by §3 regardless of declaration order; every other data
/// constructor's tag is its index among its type constructor's
/// `data_constructors`, in declaration order.
const FIXED_TAGS: [(&str, usize); 4] = [("[]", 0), (":", 1), ("False", 0), ("True", 1)];

pub(super) fn run(
    program: &Program,
    mut bindings: BTreeMap<String, LambdaForm>,
) -> Result<StgProgram, StgError> {
    let arities = collect_arities(&bindings);
    force_non_updatable_on_partial_applications(&mut bindings, &arities);

    let top_level_names: BTreeSet<String> = bindings.keys().cloned().collect();
    strip_top_level_names_from_nested_free_variables(&mut bindings, &top_level_names);

    let (reachable, used_data_constructors) = reachable_from_main(&bindings)?;
    bindings.retain(|name, _| reachable.contains(name));

    let data_constructors = build_descriptor_table(program, &used_data_constructors);

    Ok(StgProgram {
        bindings,
        data_constructors,
    })
}

/// Every name bound anywhere in the program (top-level, or nested inside a
/// `Let`) mapped to its lambda-form's parameter count. Fresh names threaded
/// through one never-reset counter (§5) are globally unique, so one flat map
/// covering both scopes is safe.
fn collect_arities(bindings: &BTreeMap<String, LambdaForm>) -> HashMap<String, usize> {
    let mut arities = HashMap::new();
    for (name, lf) in bindings {
        arities.insert(name.clone(), lf.parameters.len());
        collect_arities_from_expr(&lf.body, &mut arities);
    }
    arities
}

fn collect_arities_from_expr(expr: &StgExpr, arities: &mut HashMap<String, usize>) {
    match expr {
        StgExpr::Let { bindings, body, .. } => {
            for (name, lf) in bindings {
                arities.insert(name.clone(), lf.parameters.len());
                collect_arities_from_expr(&lf.body, arities);
            }
            collect_arities_from_expr(body, arities);
        }
        StgExpr::PrimitiveCase {
            scrutinee,
            alternatives,
            default,
            ..
        } => {
            collect_arities_from_expr(scrutinee, arities);
            for (_, alt) in alternatives {
                collect_arities_from_expr(alt, arities);
            }
            collect_arities_from_expr(default, arities);
        }
        StgExpr::AlgebraicCase {
            scrutinee,
            alternatives,
            default,
            ..
        } => {
            collect_arities_from_expr(scrutinee, arities);
            for (_, alt) in alternatives {
                collect_arities_from_expr(alt, arities);
            }
            collect_arities_from_expr(default, arities);
        }
        StgExpr::Variable(_)
        | StgExpr::Literal(_)
        | StgExpr::Application { .. }
        | StgExpr::Constructor { .. }
        | StgExpr::PrimitiveOp { .. } => {}
    }
}

/// §4.5 item 2: an application `f a₁…aₖ` with `k < arity(f)` forces its
/// directly enclosing lambda-form's `updatable` flag to false. A `Let`'s own
/// sub-bindings are their own enclosing scope and are visited separately; an
/// application inside a `Let`'s body still belongs to the scope the `Let`
/// itself sits in.
fn force_non_updatable_on_partial_applications(
    bindings: &mut BTreeMap<String, LambdaForm>,
    arities: &HashMap<String, usize>,
) {
    for lf in bindings.values_mut() {
        if expr_has_partial_application(&lf.body, arities) {
            lf.updatable = false;
        }
        force_non_updatable_in_expr(&mut lf.body, arities);
    }
}

fn force_non_updatable_in_expr(expr: &mut StgExpr, arities: &HashMap<String, usize>) {
    match expr {
        StgExpr::Let { bindings, body, .. } => {
            for lf in bindings.values_mut() {
                if expr_has_partial_application(&lf.body, arities) {
                    lf.updatable = false;
                }
                force_non_updatable_in_expr(&mut lf.body, arities);
            }
            force_non_updatable_in_expr(body, arities);
        }
        StgExpr::PrimitiveCase {
            scrutinee,
            alternatives,
            default,
            ..
        } => {
            force_non_updatable_in_expr(scrutinee, arities);
            for (_, alt) in alternatives.iter_mut() {
                force_non_updatable_in_expr(alt, arities);
            }
            force_non_updatable_in_expr(default, arities);
        }
        StgExpr::AlgebraicCase {
            scrutinee,
            alternatives,
            default,
            ..
        } => {
            force_non_updatable_in_expr(scrutinee, arities);
            for (_, alt) in alternatives.iter_mut() {
                force_non_updatable_in_expr(alt, arities);
            }
            force_non_updatable_in_expr(default, arities);
        }
        StgExpr::Variable(_)
        | StgExpr::Literal(_)
        | StgExpr::Application { .. }
        | StgExpr::Constructor { .. }
        | StgExpr::PrimitiveOp { .. } => {}
    }
}

/// Does `expr`, without crossing into a nested `Let`'s own sub-bindings,
/// contain an under-saturated application of a name with a known arity?
/// Applications of an unknown (lambda-bound parameter) function are left
/// alone — their arity isn't known until runtime.
fn expr_has_partial_application(expr: &StgExpr, arities: &HashMap<String, usize>) -> bool {
    match expr {
        StgExpr::Application { function, arguments } => arities
            .get(function)
            .is_some_and(|&arity| arguments.len() < arity),
        StgExpr::Let { body, .. } => expr_has_partial_application(body, arities),
        StgExpr::PrimitiveCase {
            scrutinee,
            alternatives,
            default,
            ..
        } => {
            expr_has_partial_application(scrutinee, arities)
                || alternatives
                    .iter()
                    .any(|(_, alt)| expr_has_partial_application(alt, arities))
                || expr_has_partial_application(default, arities)
        }
        StgExpr::AlgebraicCase {
            scrutinee,
            alternatives,
            default,
            ..
        } => {
            expr_has_partial_application(scrutinee, arities)
                || alternatives
                    .iter()
                    .any(|(_, alt)| expr_has_partial_application(alt, arities))
                || expr_has_partial_application(default, arities)
        }
        StgExpr::Variable(_) | StgExpr::Literal(_) | StgExpr::Constructor { .. } | StgExpr::PrimitiveOp { .. } => {
            false
        }
    }
}

/// §4.5 item 1: a nested, non-constructor-bodied lambda-form never needs a
/// top-level name in its free-variable set — the emitter addresses a
/// top-level binding directly rather than through the closure's environment.
/// Constructor-bodied lambda-forms are left alone: their free variables are
/// the constructor's actual runtime fields, and a field has to be stored
/// even when its value happens to be a top-level CAF.
fn strip_top_level_names_from_nested_free_variables(
    bindings: &mut BTreeMap<String, LambdaForm>,
    top_level_names: &BTreeSet<String>,
) {
    for lf in bindings.values_mut() {
        strip_in_expr(&mut lf.body, top_level_names);
    }
}

fn strip_in_expr(expr: &mut StgExpr, top_level_names: &BTreeSet<String>) {
    match expr {
        StgExpr::Let { bindings, body, .. } => {
            for lf in bindings.values_mut() {
                if !matches!(lf.body, StgExpr::Constructor { .. }) {
                    lf.free_variables.retain(|name| !top_level_names.contains(name));
                }
                strip_in_expr(&mut lf.body, top_level_names);
            }
            strip_in_expr(body, top_level_names);
        }
        StgExpr::PrimitiveCase {
            scrutinee,
            alternatives,
            default,
            ..
        } => {
            strip_in_expr(scrutinee, top_level_names);
            for (_, alt) in alternatives.iter_mut() {
                strip_in_expr(alt, top_level_names);
            }
            strip_in_expr(default, top_level_names);
        }
        StgExpr::AlgebraicCase {
            scrutinee,
            alternatives,
            default,
            ..
        } => {
            strip_in_expr(scrutinee, top_level_names);
            for (_, alt) in alternatives.iter_mut() {
                strip_in_expr(alt, top_level_names);
            }
            strip_in_expr(default, top_level_names);
        }
        StgExpr::Variable(_)
        | StgExpr::Literal(_)
        | StgExpr::Application { .. }
        | StgExpr::Constructor { .. }
        | StgExpr::PrimitiveOp { .. } => {}
    }
}

/// §4.5 item 3: walk free-variable edges from `main` over the (already
/// top-level-only) bindings map, keeping only what it reaches and collecting
/// every data constructor named anywhere in a reachable lambda-form's body.
fn reachable_from_main(
    bindings: &BTreeMap<String, LambdaForm>,
) -> Result<(BTreeSet<String>, BTreeSet<String>), StgError> {
    if !bindings.contains_key("main") {
        return Err(StgError("no top-level binding named \"main\".".to_string()));
    }

    let mut reachable = BTreeSet::new();
    let mut used_data_constructors = BTreeSet::new();
    let mut stack = vec!["main".to_string()];

    while let Some(name) = stack.pop() {
        if !reachable.insert(name.clone()) {
            continue;
        }
        let Some(lf) = bindings.get(&name) else {
            continue;
        };
        collect_data_constructors(&lf.body, &mut used_data_constructors);
        for free_variable in &lf.free_variables {
            if bindings.contains_key(free_variable) && !reachable.contains(free_variable) {
                stack.push(free_variable.clone());
            }
        }
    }

    Ok((reachable, used_data_constructors))
}

fn collect_data_constructors(expr: &StgExpr, out: &mut BTreeSet<String>) {
    match expr {
        StgExpr::Constructor { name, .. } => {
            out.insert(name.clone());
        }
        StgExpr::Let { bindings, body, .. } => {
            for lf in bindings.values() {
                collect_data_constructors(&lf.body, out);
            }
            collect_data_constructors(body, out);
        }
        StgExpr::PrimitiveCase {
            scrutinee,
            alternatives,
            default,
            ..
        } => {
            collect_data_constructors(scrutinee, out);
            for (_, alt) in alternatives {
                collect_data_constructors(alt, out);
            }
            collect_data_constructors(default, out);
        }
        StgExpr::AlgebraicCase {
            scrutinee,
            alternatives,
            default,
            ..
        } => {
            collect_data_constructors(scrutinee, out);
            for (StgPattern { constructor, .. }, alt) in alternatives {
                out.insert(constructor.clone());
                collect_data_constructors(alt, out);
            }
            collect_data_constructors(default, out);
        }
        StgExpr::Variable(_) | StgExpr::Literal(_) | StgExpr::Application { .. } | StgExpr::PrimitiveOp { .. } => {}
    }
}

/// §4.5 item 4 / §3's tag-assignment rule. `siblings` counts the *other*
/// data constructors of the same type, not including the one itself.
fn build_descriptor_table(
    program: &Program,
    used: &BTreeSet<String>,
) -> BTreeMap<String, DataConstructorDescriptor> {
    let mut table = BTreeMap::new();
    for name in used {
        let Some(dc) = program.data_constructors.get(name) else {
            continue;
        };
        let tc = &program.type_constructors[&dc.type_constructor];
        let tag = FIXED_TAGS
            .iter()
            .find(|(fixed_name, _)| *fixed_name == name.as_str())
            .map(|(_, tag)| *tag)
            .unwrap_or_else(|| {
                tc.data_constructors
                    .iter()
                    .position(|sibling| sibling == name)
                    .expect("a used data constructor is always listed among its type constructor's siblings")
            });
        table.insert(
            name.clone(),
            DataConstructorDescriptor {
                tag,
                arity: program.data_constructor_arities[name],
                siblings: tc.data_constructors.len() - 1,
            },
        );
    }
    table
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::{DataConstructor, TypeConstructor};
    use std::collections::BTreeSet as StdBTreeSet;

    fn lf(free_variables: &[&str], parameters: &[&str], updatable: bool, body: StgExpr) -> LambdaForm {
        LambdaForm {
            free_variables: free_variables.iter().map(|s| s.to_string()).collect(),
            parameters: parameters.iter().map(|s| s.to_string()).collect(),
            updatable,
            body,
        }
    }

    fn bool_program() -> Program {
        let mut program = Program::new();
        program.type_constructors.insert(
            "Bool".to_string(),
            TypeConstructor {
                name: "Bool".to_string(),
                line: 0,
                arg_vars: vec![],
                data_constructors: vec!["True".to_string(), "False".to_string()],
            },
        );
        for name in ["True", "False"] {
            program.data_constructors.insert(
                name.to_string(),
                DataConstructor {
                    name: name.to_string(),
                    line: 0,
                    type_constructor: "Bool".to_string(),
                    fields: vec![],
                },
            );
            program.data_constructor_arities.insert(name.to_string(), 0);
        }
        program
    }

    #[test]
    fn missing_main_is_an_stg_error() {
        let bindings = BTreeMap::new();
        let err = reachable_from_main(&bindings).unwrap_err();
        assert_eq!(err, StgError("no top-level binding named \"main\".".to_string()));
    }

    #[test]
    fn unreachable_bindings_are_pruned_and_main_is_kept() {
        let mut bindings = BTreeMap::new();
        bindings.insert(
            "main".to_string(),
            lf(&[], &[], true, StgExpr::Literal(crate::ast::Literal::Int(1))),
        );
        bindings.insert(
            "orphan".to_string(),
            lf(&[], &[], true, StgExpr::Literal(crate::ast::Literal::Int(2))),
        );
        let (reachable, _) = reachable_from_main(&bindings).unwrap();
        assert!(reachable.contains("main"));
        assert!(!reachable.contains("orphan"));
    }

    #[test]
    fn reachability_follows_free_variable_edges_transitively() {
        let mut bindings = BTreeMap::new();
        bindings.insert(
            "main".to_string(),
            lf(&["helper"], &[], true, StgExpr::Variable("helper".to_string())),
        );
        bindings.insert(
            "helper".to_string(),
            lf(&["deep"], &[], true, StgExpr::Variable("deep".to_string())),
        );
        bindings.insert(
            "deep".to_string(),
            lf(&[], &[], true, StgExpr::Literal(crate::ast::Literal::Int(3))),
        );
        let (reachable, _) = reachable_from_main(&bindings).unwrap();
        assert_eq!(
            reachable,
            StdBTreeSet::from(["main".to_string(), "helper".to_string(), "deep".to_string()])
        );
    }

    #[test]
    fn constructor_names_are_collected_from_reachable_bodies() {
        let mut bindings = BTreeMap::new();
        bindings.insert(
            "main".to_string(),
            lf(
                &[],
                &[],
                true,
                StgExpr::Constructor {
                    name: "True".to_string(),
                    arguments: vec![],
                },
            ),
        );
        let (_, used) = reachable_from_main(&bindings).unwrap();
        assert!(used.contains("True"));
    }

    #[test]
    fn fixed_tags_override_declaration_order_for_bool() {
        let program = bool_program();
        let used = StdBTreeSet::from(["True".to_string(), "False".to_string()]);
        let table = build_descriptor_table(&program, &used);
        assert_eq!(table["False"].tag, 0);
        assert_eq!(table["True"].tag, 1);
        assert_eq!(table["True"].siblings, 1);
    }

    #[test]
    fn under_saturated_application_forces_updatable_false() {
        let mut bindings = BTreeMap::new();
        bindings.insert(
            "main".to_string(),
            lf(
                &[],
                &[],
                true,
                StgExpr::Application {
                    function: "f".to_string(),
                    arguments: vec!["x".to_string()],
                },
            ),
        );
        bindings.insert("f".to_string(), lf(&[], &["p", "q"], false, StgExpr::Variable("p".to_string())));

        let arities = collect_arities(&bindings);
        force_non_updatable_on_partial_applications(&mut bindings, &arities);
        assert!(!bindings["main"].updatable);
    }

    #[test]
    fn saturated_application_leaves_updatable_untouched() {
        let mut bindings = BTreeMap::new();
        bindings.insert(
            "main".to_string(),
            lf(
                &[],
                &[],
                true,
                StgExpr::Application {
                    function: "f".to_string(),
                    arguments: vec!["x".to_string(), "y".to_string()],
                },
            ),
        );
        bindings.insert("f".to_string(), lf(&[], &["p", "q"], false, StgExpr::Variable("p".to_string())));

        let arities = collect_arities(&bindings);
        force_non_updatable_on_partial_applications(&mut bindings, &arities);
        assert!(bindings["main"].updatable);
    }

    #[test]
    fn nested_non_constructor_lambda_form_loses_top_level_free_variables() {
        let mut bindings = BTreeMap::new();
        let nested = lf(&["helper", "local"], &[], true, StgExpr::Variable("local".to_string()));
        let mut nested_bindings = BTreeMap::new();
        nested_bindings.insert("x.1".to_string(), nested);
        bindings.insert(
            "main".to_string(),
            lf(
                &["helper"],
                &[],
                true,
                StgExpr::Let {
                    bindings: nested_bindings,
                    body: Box::new(StgExpr::Variable("x.1".to_string())),
                    recursive: false,
                },
            ),
        );
        bindings.insert(
            "helper".to_string(),
            lf(&[], &[], true, StgExpr::Literal(crate::ast::Literal::Int(1))),
        );

        let top_level_names: BTreeSet<String> = bindings.keys().cloned().collect();
        strip_top_level_names_from_nested_free_variables(&mut bindings, &top_level_names);

        let StgExpr::Let { bindings: nested, .. } = &bindings["main"].body else {
            panic!("expected a Let");
        };
        assert!(!nested["x.1"].free_variables.contains("helper"));
        assert!(nested["x.1"].free_variables.contains("local"));
    }

    #[test]
    fn nested_constructor_lambda_form_keeps_top_level_free_variables() {
        let mut bindings = BTreeMap::new();
        let nested = lf(
            &["helper"],
            &[],
            true,
            StgExpr::Constructor {
                name: "Just".to_string(),
                arguments: vec!["helper".to_string()],
            },
        );
        let mut nested_bindings = BTreeMap::new();
        nested_bindings.insert("x.1".to_string(), nested);
        bindings.insert(
            "main".to_string(),
            lf(
                &["helper"],
                &[],
                true,
                StgExpr::Let {
                    bindings: nested_bindings,
                    body: Box::new(StgExpr::Variable("x.1".to_string())),
                    recursive: false,
                },
            ),
        );
        bindings.insert(
            "helper".to_string(),
            lf(&[], &[], true, StgExpr::Literal(crate::ast::Literal::Int(1))),
        );

        let top_level_names: BTreeSet<String> = bindings.keys().cloned().collect();
        strip_top_level_names_from_nested_free_variables(&mut bindings, &top_level_names);

        let StgExpr::Let { bindings: nested, .. } = &bindings["main"].body else {
            panic!("expected a Let");
        };
        assert!(nested["x.1"].free_variables.contains("helper"));
    }
}
