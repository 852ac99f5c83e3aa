//! Signature matching (§4.3 "Signature matching"): checking an inferred
//! principal scheme against a user-declared one.
//!
//! Grounded in `types.cpp`'s `check_type_signature`: a two-phase structure,
//! a 2-arg instantiate-then-check entry point wrapping a recursive worker.
//! The worker treats every variable introduced by instantiating the
//! *declared* side as rigid (never bound), and only the *inferred* side's
//! variables are mutable — so reusing one inferred variable at two
//! positions that the declared scheme requires to be genuinely distinct
//! variables is caught, while declaring a strictly more specific type than
//! the principal one (several inferred variables collapsing to one
//! declared variable) is accepted.

use crate::types::{Type, TypeVar};
use crate::unification::{self, instantiate_fresh};

/// Check that `inferred` (a principal scheme produced by inference) is at
/// least as general as `declared` (a user-written signature) — i.e.
/// `declared` is not asking for more polymorphism than `inferred` actually
/// has.
pub fn check_type_signature(inferred: &Type, declared: &Type) -> Result<(), String> {
    let inferred = instantiate_fresh(inferred);
    let declared = instantiate_fresh(declared);

    let mut declared_vars = Vec::new();
    unification::free_type_vars(&declared, &mut declared_vars);

    check(&inferred, &declared, &declared_vars)
}

fn check(inferred: &Type, declared: &Type, declared_vars: &[TypeVar]) -> Result<(), String> {
    let inferred = unification::follow_type(inferred);
    let declared = unification::follow_type(declared);

    match (&inferred, &declared) {
        (Type::Var(v), _) if declared_vars.iter().any(|d| d.ptr_eq(v)) => match &declared {
            Type::Var(d) if d.ptr_eq(v) => Ok(()),
            _ => Err("Failed to verify type signature.".to_string()),
        },
        (Type::Var(v), other) => {
            if !occurs_check_ok(v, other) {
                return Err("Failed to verify type signature: occurs check failed.".to_string());
            }
            v.bind(other.clone());
            Ok(())
        }
        (Type::Constructor(n1, _), Type::Constructor(n2, _)) if n1 == n2 => Ok(()),
        (Type::App(l1, r1), Type::App(l2, r2)) => {
            check(l1, l2, declared_vars)?;
            check(r1, r2, declared_vars)
        }
        _ => Err("Failed to verify type signature.".to_string()),
    }
}

fn occurs_check_ok(var: &TypeVar, ty: &Type) -> bool {
    match unification::follow_type(ty) {
        Type::Var(v) => !v.ptr_eq(var),
        Type::Constructor(_, _) => true,
        Type::App(l, r) => occurs_check_ok(var, &l) && occurs_check_ok(var, &r),
        Type::Quantified(_) => true,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn identity_scheme_accepts_itself() {
        let scheme = Type::function(Type::Quantified("a".into()), Type::Quantified("a".into()));
        assert!(check_type_signature(&scheme, &scheme).is_ok());
    }

    #[test]
    fn identity_scheme_accepts_a_monomorphic_specialisation() {
        let inferred = Type::function(Type::Quantified("a".into()), Type::Quantified("a".into()));
        let declared = Type::function(Type::int(), Type::int());
        assert!(check_type_signature(&inferred, &declared).is_ok());
    }

    #[test]
    fn identity_scheme_rejects_two_independent_declared_variables() {
        let inferred = Type::function(Type::Quantified("a".into()), Type::Quantified("a".into()));
        let declared = Type::function(Type::Quantified("b".into()), Type::Quantified("c".into()));
        assert!(check_type_signature(&inferred, &declared).is_err());
    }

    #[test]
    fn mismatched_constructors_are_rejected() {
        assert!(check_type_signature(&Type::int(), &Type::bool()).is_err());
    }
}
