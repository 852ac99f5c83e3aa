//! Kind inference over user-defined type constructors and signature kind
//! checking (§4.2 "Kind inferencer").
//!
//! Mirrors `unification.rs`'s type-level machinery one level up: kinds
//! unify and default-generalize the same way types unify and generalize,
//! just with `*` instead of a quantified name as the generalization target.

use crate::ast::Program;
use crate::dependency;
use crate::error::KindError;
use crate::types::{Kind, Type};
use crate::unification::{self, UnifyError};
use std::collections::{HashMap, HashSet};
use tracing::debug;

/// The output of kind inference: every type constructor's own kind, and a
/// type scheme for every data constructor (built directly over its owning
/// type constructor's own argument-variable names, per `types.cpp`'s
/// `type_check` — data-constructor schemes share the type constructor's
/// literal variable names rather than freshly-renamed ones).
#[derive(Debug, Clone, Default)]
pub struct KindEnvironment {
    pub type_constructor_kinds: HashMap<String, Kind>,
    pub data_constructor_schemes: HashMap<String, Type>,
}

/// The fixed kinds of the built-in type constructors (§3's "rigid type
/// constructor"): `Int`, `Char`, `Bool` are `*`; `(->)` is `* -> * -> *`;
/// `[]` is `* -> *`.
fn builtin_kinds() -> HashMap<String, Kind> {
    let mut kinds = HashMap::new();
    kinds.insert("Int".to_string(), Kind::Star);
    kinds.insert("Char".to_string(), Kind::Star);
    kinds.insert("Bool".to_string(), Kind::Star);
    kinds.insert(
        "(->)".to_string(),
        Kind::arrow_chain([Kind::Star, Kind::Star].into_iter()),
    );
    kinds.insert("[]".to_string(), Kind::arrow(Kind::Star, Kind::Star));
    kinds
}

/// Infer kinds for every type constructor in `program` and build every data
/// constructor's type scheme, then kind-check every top-level signature.
pub fn infer_program(program: &Program) -> Result<KindEnvironment, KindError> {
    let mut tc_kinds = builtin_kinds();
    let mut var_kinds_by_tc: HashMap<String, HashMap<String, Kind>> = HashMap::new();
    let mut dc_schemes = HashMap::new();

    let edges = type_constructor_dependency_edges(program);
    let groups = dependency::order_by_dependency(&edges);

    for group in &groups {
        debug!(?group.names, "kind-inferring type constructor group");

        for tc_name in &group.names {
            let tc = &program.type_constructors[tc_name];
            let var_kinds: HashMap<String, Kind> = tc
                .arg_vars
                .iter()
                .map(|v| (v.clone(), Kind::fresh_var()))
                .collect();
            let own_kind =
                Kind::arrow_chain(tc.arg_vars.iter().map(|v| var_kinds[v].clone()));
            tc_kinds.insert(tc_name.clone(), own_kind);
            var_kinds_by_tc.insert(tc_name.clone(), var_kinds);
        }

        for tc_name in &group.names {
            let tc = &program.type_constructors[tc_name];
            let var_kinds = var_kinds_by_tc.get_mut(tc_name).unwrap();
            for dc_name in &tc.data_constructors {
                let dc = &program.data_constructors[dc_name];
                for field in &dc.fields {
                    let field_kind = infer_kind(field, var_kinds, &tc_kinds, Some(dc.line))?;
                    unification::unify_kind(&field_kind, &Kind::Star)
                        .map_err(|e| kind_unify_error(e, Some(dc.line)))?;
                }
            }
        }

        for tc_name in &group.names {
            unification::default_generalise_kind(&tc_kinds[tc_name]);
        }

        for tc_name in &group.names {
            let tc = &program.type_constructors[tc_name];
            let result_type = Type::app_chain(
                Type::Constructor(tc.name.clone(), tc_kinds[tc_name].clone()),
                tc.arg_vars.iter().cloned().map(Type::Quantified),
            );
            for dc_name in &tc.data_constructors {
                let dc = &program.data_constructors[dc_name];
                let scheme = dc
                    .fields
                    .iter()
                    .rev()
                    .fold(result_type.clone(), |acc, field| {
                        Type::function(field.clone(), acc)
                    });
                dc_schemes.insert(dc_name.clone(), scheme);
            }
        }
    }

    for (name, signature) in &program.signatures {
        check_signature_kind(signature, &tc_kinds)
            .map_err(|inner| KindError::new(
                format!(
                    "Type signature for \"{}\" with invalid type: {}",
                    name, inner
                ),
                None,
            ))?;
    }

    Ok(KindEnvironment {
        type_constructor_kinds: tc_kinds,
        data_constructor_schemes: dc_schemes,
    })
}

/// Which other user-defined type constructors does each type constructor's
/// data-constructor field types reference? Builtins are left out of the
/// edge set entirely, which is exactly what makes `dependency` treat them
/// as external (§4.1).
fn type_constructor_dependency_edges(
    program: &Program,
) -> HashMap<String, HashSet<String>> {
    let mut edges = HashMap::new();
    for tc in program.type_constructors.values() {
        let mut deps = HashSet::new();
        for dc_name in &tc.data_constructors {
            if let Some(dc) = program.data_constructors.get(dc_name) {
                for field in &dc.fields {
                    collect_type_constructor_refs(field, program, &mut deps);
                }
            }
        }
        edges.insert(tc.name.clone(), deps);
    }
    edges
}

fn collect_type_constructor_refs(
    ty: &Type,
    program: &Program,
    out: &mut HashSet<String>,
) {
    match ty {
        Type::Constructor(name, _) => {
            if program.type_constructors.contains_key(name) {
                out.insert(name.clone());
            }
        }
        Type::App(l, r) => {
            collect_type_constructor_refs(l, program, out);
            collect_type_constructor_refs(r, program, out);
        }
        Type::Var(_) | Type::Quantified(_) => {}
    }
}

/// Kind-infer a field type or signature body: variable lookup against
/// `var_kinds` (lazily creating a fresh kind variable for a name seen for
/// the first time, which only matters for signature checking — data
/// constructor field kinds are always pre-seeded), rigid-constructor
/// lookup against `tc_kinds`, and application unifying the head's kind
/// with `arg_kind -> fresh`.
fn infer_kind(
    ty: &Type,
    var_kinds: &mut HashMap<String, Kind>,
    tc_kinds: &HashMap<String, Kind>,
    line: Option<u32>,
) -> Result<Kind, KindError> {
    match ty {
        Type::Quantified(name) => Ok(var_kinds
            .entry(name.clone())
            .or_insert_with(Kind::fresh_var)
            .clone()),
        Type::Constructor(name, _) => tc_kinds.get(name).cloned().ok_or_else(|| {
            KindError::new(format!("unbound type constructor \"{}\".", name), line)
        }),
        Type::App(l, r) => {
            let l_kind = infer_kind(l, var_kinds, tc_kinds, line)?;
            let r_kind = infer_kind(r, var_kinds, tc_kinds, line)?;
            let result = Kind::fresh_var();
            unification::unify_kind(&l_kind, &Kind::arrow(r_kind, result.clone()))
                .map_err(|e| kind_unify_error(e, line))?;
            Ok(result)
        }
        Type::Var(_) => Err(KindError::new(
            "cannot infer kind of instantiated type variable.".to_string(),
            line,
        )),
    }
}

fn kind_unify_error(e: UnifyError, line: Option<u32>) -> KindError {
    match e {
        UnifyError::OccursCheck { .. } => {
            KindError::new("Failed to unify kinds: occurs check failed.", line)
        }
        UnifyError::Mismatch { .. } => KindError::new("Failed to unify kinds.", line),
    }
}

/// §4.2 "Type-signature kind check": build a fresh kind variable per
/// quantified name and unify the inferred kind with `*`.
pub fn check_signature_kind(ty: &Type, tc_kinds: &HashMap<String, Kind>) -> Result<(), String> {
    let mut var_kinds = HashMap::new();
    let kind = infer_kind(ty, &mut var_kinds, tc_kinds, None).map_err(|e| e.message)?;
    unification::unify_kind(&kind, &Kind::Star).map_err(|e| match e {
        UnifyError::OccursCheck { .. } => "occurs check failed.".to_string(),
        UnifyError::Mismatch { .. } => "could not infer kind.".to_string(),
    })
}
