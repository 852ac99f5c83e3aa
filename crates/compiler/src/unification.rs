//! Unification, instantiation, and generalization over `Type` and `Kind`
//! (§4.2, §4.3 "Unification"/"Signature matching").
//!
//! Grounded directly in `types.cpp`'s `unify`/`instantiate`/`generalise`
//! pair of overloads: the same five-case dispatch (identical variable,
//! same constructor, variable on either side, both applications, mismatch)
//! for both `Type` and `Kind`, since kinds "follow the same
//! substitution-by-mutation scheme as types" (§3).

use crate::types::{Kind, KindVar, Type, TypeVar};
use std::collections::HashMap;

/// Unification failed. Callers attach source line and surrounding context
/// (the §4.3 "Failure modes" wording) when turning this into a `TypeError`.
#[derive(Debug, Clone, PartialEq)]
pub enum UnifyError {
    Mismatch { left: String, right: String },
    OccursCheck { var: String, ty: String },
}

impl std::fmt::Display for UnifyError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            UnifyError::Mismatch { left, right } => {
                write!(f, "could not unify {} with {}", left, right)
            }
            UnifyError::OccursCheck { var, ty } => {
                write!(f, "occurs check failed: {} occurs in {}", var, ty)
            }
        }
    }
}

/// Follow `bound_to` chains to the representative type: an unbound
/// variable, or the first non-variable node.
pub fn follow_type(ty: &Type) -> Type {
    let mut current = ty.clone();
    loop {
        match current {
            Type::Var(ref v) => match v.bound_to() {
                Some(next) => current = next,
                None => return current,
            },
            other => return other,
        }
    }
}

pub fn follow_kind(kind: &Kind) -> Kind {
    let mut current = kind.clone();
    loop {
        match current {
            Kind::Var(ref v) => match v.bound_to() {
                Some(next) => current = next,
                None => return current,
            },
            other => return other,
        }
    }
}

fn occurs_check_ok_type(var: &TypeVar, ty: &Type) -> bool {
    match follow_type(ty) {
        Type::Var(v) => !v.ptr_eq(var),
        Type::Constructor(_, _) => true,
        Type::App(l, r) => occurs_check_ok_type(var, &l) && occurs_check_ok_type(var, &r),
        Type::Quantified(_) => true,
    }
}

fn occurs_check_ok_kind(var: &KindVar, kind: &Kind) -> bool {
    match follow_kind(kind) {
        Kind::Var(v) => !v.ptr_eq(var),
        Kind::Star => true,
        Kind::Arrow(l, r) => occurs_check_ok_kind(var, &l) && occurs_check_ok_kind(var, &r),
    }
}

/// Standard substitution-by-mutation unification with an occurs check
/// (§4.3 "Unification"): follow both sides, then identical pointer / same
/// constructor / variable-on-either-side / both-applications / mismatch.
pub fn unify_type(a: &Type, b: &Type) -> Result<(), UnifyError> {
    let a = follow_type(a);
    let b = follow_type(b);

    match (&a, &b) {
        (Type::Var(va), Type::Var(vb)) if va.ptr_eq(vb) => Ok(()),
        (Type::Constructor(na, _), Type::Constructor(nb, _)) if na == nb => Ok(()),
        (Type::Quantified(na), Type::Quantified(nb)) if na == nb => Ok(()),
        (Type::Var(v), other) | (other, Type::Var(v)) => {
            if !occurs_check_ok_type(v, other) {
                return Err(UnifyError::OccursCheck {
                    var: a.to_string(),
                    ty: other.to_string(),
                });
            }
            v.bind(other.clone());
            Ok(())
        }
        (Type::App(l1, r1), Type::App(l2, r2)) => {
            unify_type(l1, l2)?;
            unify_type(r1, r2)
        }
        _ => Err(UnifyError::Mismatch {
            left: a.to_string(),
            right: b.to_string(),
        }),
    }
}

pub fn unify_kind(a: &Kind, b: &Kind) -> Result<(), UnifyError> {
    let a = follow_kind(a);
    let b = follow_kind(b);

    match (&a, &b) {
        (Kind::Var(va), Kind::Var(vb)) if va.ptr_eq(vb) => Ok(()),
        (Kind::Star, Kind::Star) => Ok(()),
        (Kind::Var(v), other) | (other, Kind::Var(v)) => {
            if !occurs_check_ok_kind(v, other) {
                return Err(UnifyError::OccursCheck {
                    var: a.to_string(),
                    ty: other.to_string(),
                });
            }
            v.bind(other.clone());
            Ok(())
        }
        (Kind::Arrow(l1, r1), Kind::Arrow(l2, r2)) => {
            unify_kind(l1, l2)?;
            unify_kind(r1, r2)
        }
        _ => Err(UnifyError::Mismatch {
            left: a.to_string(),
            right: b.to_string(),
        }),
    }
}

/// Replace every `Quantified` variable in `scheme` with a fresh unification
/// variable, sharing one fresh variable per distinct quantified name
/// (memoized in `seen`, mirroring `instantiate`'s `map<string, type>`).
pub fn instantiate(scheme: &Type, seen: &mut HashMap<String, Type>) -> Type {
    match scheme {
        Type::Quantified(name) => seen
            .entry(name.clone())
            .or_insert_with(Type::fresh_var)
            .clone(),
        Type::Constructor(name, kind) => Type::Constructor(name.clone(), kind.clone()),
        Type::App(l, r) => Type::app(instantiate(l, seen), instantiate(r, seen)),
        Type::Var(v) => match v.bound_to() {
            Some(bound) => instantiate(&bound, seen),
            None => Type::Var(v.clone()),
        },
    }
}

pub fn instantiate_fresh(scheme: &Type) -> Type {
    instantiate(scheme, &mut HashMap::new())
}

/// Collect every free unification variable occurring in `ty` (following
/// `bound_to` chains), in first-encountered order.
pub fn free_type_vars(ty: &Type, out: &mut Vec<TypeVar>) {
    match follow_type(ty) {
        Type::Var(v) => {
            if !out.iter().any(|existing| existing.ptr_eq(&v)) {
                out.push(v);
            }
        }
        Type::App(l, r) => {
            free_type_vars(&l, out);
            free_type_vars(&r, out);
        }
        Type::Constructor(_, _) | Type::Quantified(_) => {}
    }
}

fn free_kind_vars(kind: &Kind, out: &mut Vec<KindVar>) {
    match follow_kind(kind) {
        Kind::Var(v) => {
            if !out.iter().any(|existing| existing.ptr_eq(&v)) {
                out.push(v);
            }
        }
        Kind::Arrow(l, r) => {
            free_kind_vars(&l, out);
            free_kind_vars(&r, out);
        }
        Kind::Star => {}
    }
}

/// Generalize `ty`: every free unification variable that does not occur in
/// any scheme in `outer_assumptions` is bound to a fresh `Quantified`
/// variable (named `a`, `b`, ... `z`, `a1`, `b1`, ...). Variables that
/// escape into an outer assumption are left exactly as they are, so the
/// inferred scheme stays sound wherever it shares a variable with the
/// surrounding context.
pub fn generalise(ty: &Type, outer_assumptions: impl IntoIterator<Item = Type>) -> Type {
    let mut escaping = Vec::new();
    for assumption in outer_assumptions {
        free_type_vars(&assumption, &mut escaping);
    }

    let mut candidates = Vec::new();
    free_type_vars(ty, &mut candidates);

    let mut letter = 0usize;
    for var in candidates {
        if escaping.iter().any(|e| e.ptr_eq(&var)) {
            continue;
        }
        var.bind(Type::Quantified(quantified_name(letter)));
        letter += 1;
    }

    instantiate_as_written(ty)
}

/// After generalization every free variable has been bound to a
/// `Quantified` node (or left alone if it escaped); this just follows
/// those bindings into a clean tree without allocating fresh variables.
fn instantiate_as_written(ty: &Type) -> Type {
    match ty {
        Type::Var(v) => match v.bound_to() {
            Some(bound) => instantiate_as_written(&bound),
            None => Type::Var(v.clone()),
        },
        Type::App(l, r) => Type::app(instantiate_as_written(l), instantiate_as_written(r)),
        other => other.clone(),
    }
}

fn quantified_name(index: usize) -> String {
    let letter = (b'a' + (index % 26) as u8) as char;
    if index < 26 {
        letter.to_string()
    } else {
        format!("{}{}", letter, index / 26)
    }
}

/// Kind-level generalization (§4.2's "defaulting-generalize"): every
/// remaining free kind variable in the group defaults to `*`, not to a
/// quantified variable — PicoHaskell has no kind polymorphism.
pub fn default_generalise_kind(kind: &Kind) {
    let mut vars = Vec::new();
    free_kind_vars(kind, &mut vars);
    for var in vars {
        var.bind(Kind::Star);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unify_binds_a_free_variable() {
        let v = Type::fresh_var();
        unify_type(&v, &Type::int()).unwrap();
        assert_eq!(follow_type(&v), Type::int());
    }

    #[test]
    fn unify_rejects_mismatched_constructors() {
        let err = unify_type(&Type::int(), &Type::bool()).unwrap_err();
        assert!(matches!(err, UnifyError::Mismatch { .. }));
    }

    #[test]
    fn occurs_check_rejects_infinite_type() {
        let v = Type::fresh_var();
        let list_of_v = Type::list(v.clone());
        let err = unify_type(&v, &list_of_v).unwrap_err();
        assert!(matches!(err, UnifyError::OccursCheck { .. }));
    }

    #[test]
    fn instantiate_shares_one_fresh_var_per_quantified_name() {
        let scheme = Type::function(Type::Quantified("a".into()), Type::Quantified("a".into()));
        let instantiated = instantiate_fresh(&scheme);
        let (arg, result) = instantiated.as_function().unwrap();
        assert_eq!(follow_type(&arg), follow_type(&result));
    }

    #[test]
    fn generalise_quantifies_non_escaping_variables() {
        let v = Type::fresh_var();
        let ty = Type::function(v.clone(), v.clone());
        let scheme = generalise(&ty, std::iter::empty());
        let (arg, result) = scheme.as_function().unwrap();
        assert_eq!(arg, Type::Quantified("a".to_string()));
        assert_eq!(result, Type::Quantified("a".to_string()));
    }

    #[test]
    fn generalise_leaves_escaping_variables_free() {
        let v = Type::fresh_var();
        let outer = Type::list(v.clone());
        let scheme = generalise(&v, [outer]);
        assert!(matches!(follow_type(&scheme), Type::Var(_)));
    }
}
