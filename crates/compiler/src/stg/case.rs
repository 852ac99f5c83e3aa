//! Pattern-match compilation (§4.4.1): lowering a surface `Case` (nested
//! patterns, ordered alternatives) into `STGPrimitiveCase`/`STGAlgebraicCase`
//! nodes whose alternatives carry only flat constructor patterns over fresh
//! field variables.
//!
//! The "top-level case" and "nested case compilation" subsections of §4.4.1
//! describe what looks like two algorithms, but they are one: the top level
//! is just the one-column instance of the general multi-column matcher
//! (`compile_rows` below) that constructor-field expansion also drives. A
//! column's scrutinee is always an already-bound name — the case's own
//! lifted scrutinee, or a fresh field name bound by an enclosing algebraic
//! arm — so an `as`-pattern or bare variable pattern can always alias
//! directly onto that name instead of needing a separate runtime-provided
//! default binder. This crate's `STGPrimitiveCase`/`STGAlgebraicCase`
//! therefore never populates `default_binder` (§3 marks the field
//! optional); see DESIGN.md.

use super::translate::{
    fresh_name, name_or_lift, translate_alt_expression, translate_expr, Ctx, Definitions,
};
use super::{LambdaForm, StgExpr, StgPattern};
use crate::ast::{pattern_bound_names, Expr, Literal, Pattern};
use std::collections::{BTreeSet, HashMap};

/// One still-unresolved alternative mid-compilation: the patterns left to
/// test (front = the column currently being decided), the renamings
/// accumulated from columns already consumed, and the original RHS.
struct Row<'a> {
    columns: Vec<&'a Pattern>,
    renamings: HashMap<String, String>,
    expr: &'a Expr,
}

/// Entry point: translate a surface `Expr::Case`.
pub(super) fn translate_case(
    ctx: &Ctx,
    next_var: &mut u64,
    renamings: &HashMap<String, String>,
    expr: &Expr,
) -> (LambdaForm, Definitions) {
    let (scrutinee, alternatives) = match expr {
        Expr::Case {
            scrutinee,
            alternatives,
            ..
        } => (scrutinee.as_ref(), alternatives),
        _ => unreachable!("translate_case called on a non-Case expression"),
    };

    // "Wildcard or single variable pattern first": the case degenerates
    // entirely, and the scrutinee is only evaluated (and named) if its
    // value is actually needed by an `as`-binding or the pattern's own name.
    match alternatives.first() {
        Some((first_pattern @ (Pattern::Wildcard { .. } | Pattern::Variable { .. }), first_rhs)) => {
            return translate_degenerate_case(
                ctx, next_var, renamings, scrutinee, first_pattern, first_rhs,
            );
        }
        _ => {}
    }

    let mut definitions = Vec::new();
    let (scrutinee_lf, scrutinee_defs) = translate_expr(ctx, next_var, renamings, scrutinee);
    definitions.extend(scrutinee_defs);
    let scrutinee_name = name_or_lift(next_var, scrutinee_lf, &mut definitions);

    let rows: Vec<Row> = alternatives
        .iter()
        .map(|(pattern, rhs)| Row {
            columns: vec![pattern],
            renamings: renamings.clone(),
            expr: rhs,
        })
        .collect();

    let mut default_free = BTreeSet::new();
    default_free.insert("case_error".to_string());
    let default = StgExpr::Variable("case_error".to_string());

    let (case_expr, free_variables) = compile_rows(
        ctx,
        next_var,
        std::slice::from_ref(&scrutinee_name),
        rows,
        &mut definitions,
        &default,
        &default_free,
    );

    (
        LambdaForm {
            free_variables,
            parameters: vec![],
            updatable: true,
            body: case_expr,
        },
        definitions,
    )
}

fn translate_degenerate_case(
    ctx: &Ctx,
    next_var: &mut u64,
    renamings: &HashMap<String, String>,
    scrutinee: &Expr,
    pattern: &Pattern,
    rhs: &Expr,
) -> (LambdaForm, Definitions) {
    let bound_names = pattern_bound_names(pattern);
    let mut definitions = Vec::new();
    let mut new_renamings = renamings.clone();

    if !bound_names.is_empty() {
        let (lf, defs) = translate_expr(ctx, next_var, renamings, scrutinee);
        definitions.extend(defs);
        let scrutinee_name = name_or_lift(next_var, lf, &mut definitions);
        for name in bound_names {
            new_renamings.insert(name, scrutinee_name.clone());
        }
    }

    let (rhs_lf, rhs_defs) = translate_expr(ctx, next_var, &new_renamings, rhs);
    definitions.extend(rhs_defs);
    (rhs_lf, definitions)
}

/// The general multi-column matcher. `scrutinee_names[i]` names the value
/// tested by column `i` of every row in `rows`; each row's `columns` list
/// is the same length as `scrutinee_names` and is consumed left to right.
/// `default`/`default_free` is what to fall back to if every row in `rows`
/// fails to match (the enclosing case's own default, or `case_error`).
fn compile_rows<'a>(
    ctx: &Ctx,
    next_var: &mut u64,
    scrutinee_names: &[String],
    rows: Vec<Row<'a>>,
    definitions: &mut Definitions,
    default: &StgExpr,
    default_free: &BTreeSet<String>,
) -> (StgExpr, BTreeSet<String>) {
    if rows.is_empty() {
        return (default.clone(), default_free.clone());
    }
    if scrutinee_names.is_empty() {
        // Every column has been consumed: the leading (highest-priority)
        // row is the answer; anything after it in `rows` is unreachable.
        let row = rows.into_iter().next().unwrap();
        let mut free_variables = BTreeSet::new();
        let alt_expr = translate_alt_expression(
            ctx,
            next_var,
            &row.renamings,
            row.expr,
            &[],
            definitions,
            &mut free_variables,
        );
        return (alt_expr, free_variables);
    }

    // "scan alternatives back-to-front and segment... maximal contiguous
    // runs" collapses, for a single column, to: find the first row whose
    // column is wild/variable (it matches unconditionally, so every row
    // after it is dead — reachable only through it), split it off as this
    // level's default, and drop the rest.
    let truncate_at = rows
        .iter()
        .position(|r| matches!(r.columns[0], Pattern::Wildcard { .. } | Pattern::Variable { .. }));
    let mut kept: Vec<Row> = match truncate_at {
        Some(i) => rows.into_iter().take(i + 1).collect(),
        None => rows,
    };

    let trailing_is_wild = kept
        .last()
        .is_some_and(|r| matches!(r.columns[0], Pattern::Wildcard { .. } | Pattern::Variable { .. }));

    let (default_expr, default_free_here) = if trailing_is_wild {
        let wildcard_row = kept.pop().unwrap();
        let bound_names = pattern_bound_names(wildcard_row.columns[0]);
        let mut new_renamings = wildcard_row.renamings.clone();
        for name in bound_names {
            new_renamings.insert(name, scrutinee_names[0].clone());
        }
        let continuation = Row {
            columns: wildcard_row.columns[1..].to_vec(),
            renamings: new_renamings,
            expr: wildcard_row.expr,
        };
        compile_rows(
            ctx,
            next_var,
            &scrutinee_names[1..],
            vec![continuation],
            definitions,
            default,
            default_free,
        )
    } else {
        (default.clone(), default_free.clone())
    };

    if kept.is_empty() {
        return (default_expr, default_free_here);
    }

    match kept[0].columns[0] {
        Pattern::Literal { .. } => compile_literal_column(
            ctx,
            next_var,
            scrutinee_names,
            kept,
            definitions,
            default_expr,
            default_free_here,
        ),
        Pattern::Constructor { .. } => compile_constructor_column(
            ctx,
            next_var,
            scrutinee_names,
            kept,
            definitions,
            default_expr,
            default_free_here,
        ),
        Pattern::Wildcard { .. } | Pattern::Variable { .. } => {
            unreachable!("wild/variable rows are always split off above")
        }
    }
}

/// §4.4.1 "Literal patterns": group by literal value (first occurrence's
/// position fixes the alternative's position; a later row with the same
/// value joins that group rather than starting a new one).
fn compile_literal_column<'a>(
    ctx: &Ctx,
    next_var: &mut u64,
    scrutinee_names: &[String],
    rows: Vec<Row<'a>>,
    definitions: &mut Definitions,
    default_expr: StgExpr,
    default_free: BTreeSet<String>,
) -> (StgExpr, BTreeSet<String>) {
    let mut order: Vec<Literal> = Vec::new();
    let mut groups: HashMap<Literal, Vec<Row<'a>>> = HashMap::new();
    for row in rows {
        let value = match row.columns[0] {
            Pattern::Literal { value, .. } => *value,
            _ => unreachable!("non-literal row reached compile_literal_column"),
        };
        groups.entry(value).or_insert_with(|| {
            order.push(value);
            Vec::new()
        });
        groups.get_mut(&value).unwrap().push(row);
    }

    let mut alternatives = Vec::with_capacity(order.len());
    let mut free_variables = default_free.clone();

    for value in order {
        let group_rows = groups.remove(&value).unwrap();
        let next_rows: Vec<Row> = group_rows
            .into_iter()
            .map(|row| {
                let mut renamings = row.renamings.clone();
                for name in row.columns[0].as_names() {
                    renamings.insert(name.clone(), scrutinee_names[0].clone());
                }
                Row {
                    columns: row.columns[1..].to_vec(),
                    renamings,
                    expr: row.expr,
                }
            })
            .collect();

        let (compiled, compiled_free) = compile_rows(
            ctx,
            next_var,
            &scrutinee_names[1..],
            next_rows,
            definitions,
            &default_expr,
            &default_free,
        );
        free_variables.extend(compiled_free);
        alternatives.push((value, compiled));
    }

    free_variables.insert(scrutinee_names[0].clone());

    (
        StgExpr::PrimitiveCase {
            scrutinee: Box::new(StgExpr::Variable(scrutinee_names[0].clone())),
            alternatives,
            default_binder: None,
            default: Box::new(default_expr),
        },
        free_variables,
    )
}

/// §4.4.1 "Constructor patterns": group by outermost constructor name
/// (preserving intra-group order), allocate one fresh field name per field,
/// and recurse on those fields plus whatever columns were already pending.
fn compile_constructor_column<'a>(
    ctx: &Ctx,
    next_var: &mut u64,
    scrutinee_names: &[String],
    rows: Vec<Row<'a>>,
    definitions: &mut Definitions,
    default_expr: StgExpr,
    default_free: BTreeSet<String>,
) -> (StgExpr, BTreeSet<String>) {
    let mut order: Vec<String> = Vec::new();
    let mut groups: HashMap<String, Vec<Row<'a>>> = HashMap::new();
    for row in rows {
        let name = match row.columns[0] {
            Pattern::Constructor { name, .. } => name.clone(),
            _ => unreachable!("non-constructor row reached compile_constructor_column"),
        };
        groups.entry(name.clone()).or_insert_with(|| {
            order.push(name.clone());
            Vec::new()
        });
        groups.get_mut(&name).unwrap().push(row);
    }

    let mut alternatives = Vec::with_capacity(order.len());
    let mut free_variables = default_free.clone();

    for name in order {
        let group_rows = groups.remove(&name).unwrap();
        let arity = ctx.dc_arities[&name];
        let field_names: Vec<String> = (0..arity).map(|_| fresh_name(next_var)).collect();

        let next_rows: Vec<Row> = group_rows
            .into_iter()
            .map(|row| {
                let (args, as_names) = match row.columns[0] {
                    Pattern::Constructor { args, as_names, .. } => (args, as_names),
                    _ => unreachable!(),
                };
                let mut renamings = row.renamings.clone();
                for alias in as_names {
                    renamings.insert(alias.clone(), scrutinee_names[0].clone());
                }
                let mut columns: Vec<&Pattern> = args.iter().collect();
                columns.extend(row.columns[1..].iter().copied());
                Row {
                    columns,
                    renamings,
                    expr: row.expr,
                }
            })
            .collect();

        let mut next_scrutinee_names = field_names.clone();
        next_scrutinee_names.extend(scrutinee_names[1..].iter().cloned());

        let (compiled, compiled_free) = compile_rows(
            ctx,
            next_var,
            &next_scrutinee_names,
            next_rows,
            definitions,
            &default_expr,
            &default_free,
        );
        for fv in compiled_free {
            if !field_names.contains(&fv) {
                free_variables.insert(fv);
            }
        }
        alternatives.push((
            StgPattern {
                constructor: name,
                fields: field_names,
            },
            compiled,
        ));
    }

    free_variables.insert(scrutinee_names[0].clone());

    (
        StgExpr::AlgebraicCase {
            scrutinee: Box::new(StgExpr::Variable(scrutinee_names[0].clone())),
            alternatives,
            default_binder: None,
            default: Box::new(default_expr),
        },
        free_variables,
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap as StdHashMap;

    fn ctx(arities: &StdHashMap<String, usize>) -> Ctx<'_> {
        Ctx { dc_arities: arities }
    }

    fn var(name: &str) -> Expr {
        Expr::Variable {
            name: name.to_string(),
            line: 1,
        }
    }

    fn int_lit(n: i64) -> Expr {
        Expr::IntLiteral { value: n, line: 1 }
    }

    fn bool_arities() -> StdHashMap<String, usize> {
        let mut a = StdHashMap::new();
        a.insert("True".to_string(), 0);
        a.insert("False".to_string(), 0);
        a
    }

    /// s5: `case x of { True -> 1 ; False -> 0 }`.
    #[test]
    fn boolean_case_compiles_to_algebraic_case_with_both_arms() {
        let arities = bool_arities();
        let expr = Expr::Case {
            scrutinee: Box::new(var("x")),
            alternatives: vec![
                (
                    Pattern::Constructor {
                        name: "True".to_string(),
                        args: vec![],
                        as_names: vec![],
                        line: 1,
                    },
                    int_lit(1),
                ),
                (
                    Pattern::Constructor {
                        name: "False".to_string(),
                        args: vec![],
                        as_names: vec![],
                        line: 1,
                    },
                    int_lit(0),
                ),
            ],
            line: 1,
        };
        let mut next_var = 0;
        let (lf, _defs) = translate_case(&ctx(&arities), &mut next_var, &HashMap::new(), &expr);
        assert!(lf.free_variables.contains("x"));
        match lf.body {
            StgExpr::AlgebraicCase {
                alternatives,
                default,
                ..
            } => {
                assert_eq!(alternatives.len(), 2);
                assert_eq!(alternatives[0].0.constructor, "True");
                assert_eq!(alternatives[1].0.constructor, "False");
                assert_eq!(*default, StgExpr::Variable("case_error".to_string()));
            }
            other => panic!("expected an algebraic case, got {other:?}"),
        }
    }

    /// A trailing variable pattern becomes the default arm instead of
    /// `case_error`.
    #[test]
    fn trailing_variable_pattern_becomes_the_default_arm() {
        let arities = StdHashMap::new();
        let expr = Expr::Case {
            scrutinee: Box::new(var("n")),
            alternatives: vec![
                (
                    Pattern::Literal {
                        value: Literal::Int(0),
                        as_names: vec![],
                        line: 1,
                    },
                    int_lit(100),
                ),
                (
                    Pattern::Variable {
                        name: "other".to_string(),
                        as_names: vec![],
                        line: 1,
                    },
                    var("other"),
                ),
            ],
            line: 1,
        };
        let mut next_var = 0;
        let (lf, _defs) = translate_case(&ctx(&arities), &mut next_var, &HashMap::new(), &expr);
        match lf.body {
            StgExpr::PrimitiveCase {
                alternatives,
                default,
                ..
            } => {
                assert_eq!(alternatives.len(), 1);
                assert_eq!(alternatives[0].0, Literal::Int(0));
                // The default aliases `other` directly to the scrutinee's
                // name rather than introducing a synthetic binder.
                assert_eq!(*default, StgExpr::Variable("n".to_string()));
            }
            other => panic!("expected a primitive case, got {other:?}"),
        }
    }

    /// A wildcard-first case degenerates without ever naming the scrutinee.
    #[test]
    fn wildcard_first_case_never_forces_the_scrutinee() {
        let arities = StdHashMap::new();
        let expr = Expr::Case {
            scrutinee: Box::new(var("unused")),
            alternatives: vec![(
                Pattern::Wildcard {
                    as_names: vec![],
                    line: 1,
                },
                int_lit(5),
            )],
            line: 1,
        };
        let mut next_var = 0;
        let (lf, defs) = translate_case(&ctx(&arities), &mut next_var, &HashMap::new(), &expr);
        assert!(defs.is_empty());
        assert!(!lf.free_variables.contains("unused"));
        assert_eq!(lf.body, StgExpr::Literal(Literal::Int(5)));
    }

    /// Nested constructor patterns compile to nested algebraic cases, one
    /// per field, over fresh field names.
    #[test]
    fn nested_constructor_pattern_expands_one_column_at_a_time() {
        let mut arities = StdHashMap::new();
        arities.insert("Just".to_string(), 1);
        arities.insert("Nothing".to_string(), 0);
        arities.insert("Pair".to_string(), 2);

        // case p of { Pair (Just x) y -> x ; Pair Nothing y -> y }
        let expr = Expr::Case {
            scrutinee: Box::new(var("p")),
            alternatives: vec![
                (
                    Pattern::Constructor {
                        name: "Pair".to_string(),
                        args: vec![
                            Pattern::Constructor {
                                name: "Just".to_string(),
                                args: vec![Pattern::Variable {
                                    name: "x".to_string(),
                                    as_names: vec![],
                                    line: 1,
                                }],
                                as_names: vec![],
                                line: 1,
                            },
                            Pattern::Variable {
                                name: "y".to_string(),
                                as_names: vec![],
                                line: 1,
                            },
                        ],
                        as_names: vec![],
                        line: 1,
                    },
                    var("x"),
                ),
                (
                    Pattern::Constructor {
                        name: "Pair".to_string(),
                        args: vec![
                            Pattern::Constructor {
                                name: "Nothing".to_string(),
                                args: vec![],
                                as_names: vec![],
                                line: 1,
                            },
                            Pattern::Variable {
                                name: "y".to_string(),
                                as_names: vec![],
                                line: 1,
                            },
                        ],
                        as_names: vec![],
                        line: 1,
                    },
                    var("y"),
                ),
            ],
            line: 1,
        };

        let mut next_var = 0;
        let (lf, _defs) = translate_case(&ctx(&arities), &mut next_var, &HashMap::new(), &expr);
        assert!(lf.free_variables.contains("p"));
        match lf.body {
            StgExpr::AlgebraicCase { alternatives, .. } => {
                assert_eq!(alternatives.len(), 1);
                assert_eq!(alternatives[0].0.constructor, "Pair");
                match &alternatives[0].1 {
                    StgExpr::AlgebraicCase { alternatives: inner, .. } => {
                        assert_eq!(inner.len(), 2);
                    }
                    other => panic!("expected nested algebraic case over the first field, got {other:?}"),
                }
            }
            other => panic!("expected an algebraic case, got {other:?}"),
        }
    }
}
