//! Types and kinds (§3, §4.2, §4.3).
//!
//! Unification variables are pointer-identity cells mutated in place, the
//! same scheme the original `PicoHaskell` implementation uses for its
//! `bound_to` fields — except here the pointer is an `Rc<RefCell<_>>`
//! rather than a raw/shared pointer into an arena, so the borrow checker
//! enforces the "mutate only during the owning inference call" lifetime
//! that scheme relies on informally.
//!
//! Kinds follow exactly the same substitution-by-mutation scheme as types
//! (§3), so `KindVar`/`Kind` mirror `TypeVar`/`Type` variant for variant.

use serde::de::Deserializer;
use serde::Deserialize;
use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;
use std::sync::atomic::{AtomicU64, Ordering};

static NEXT_VAR_ID: AtomicU64 = AtomicU64::new(0);

fn fresh_id() -> u64 {
    NEXT_VAR_ID.fetch_add(1, Ordering::Relaxed)
}

#[derive(Debug)]
struct KindVarInner {
    id: u64,
    bound_to: Option<Kind>,
}

/// A mutable kind unification variable. Cloning a `KindVar` clones the
/// `Rc`, not the cell: both clones observe the same `bind`.
#[derive(Debug, Clone)]
pub struct KindVar(Rc<RefCell<KindVarInner>>);

impl KindVar {
    pub fn fresh() -> Self {
        KindVar(Rc::new(RefCell::new(KindVarInner {
            id: fresh_id(),
            bound_to: None,
        })))
    }

    pub fn id(&self) -> u64 {
        self.0.borrow().id
    }

    pub fn bound_to(&self) -> Option<Kind> {
        self.0.borrow().bound_to.clone()
    }

    pub fn bind(&self, kind: Kind) {
        self.0.borrow_mut().bound_to = Some(kind);
    }

    pub fn ptr_eq(&self, other: &KindVar) -> bool {
        Rc::ptr_eq(&self.0, &other.0)
    }
}

impl PartialEq for KindVar {
    fn eq(&self, other: &Self) -> bool {
        self.ptr_eq(other)
    }
}
impl Eq for KindVar {}

/// A kind: `*`, an arrow kind, or an unbound/bound unification variable.
#[derive(Debug, Clone, PartialEq)]
pub enum Kind {
    Star,
    Arrow(Box<Kind>, Box<Kind>),
    Var(KindVar),
}

impl Kind {
    pub fn arrow(left: Kind, right: Kind) -> Kind {
        Kind::Arrow(Box::new(left), Box::new(right))
    }

    pub fn fresh_var() -> Kind {
        Kind::Var(KindVar::fresh())
    }

    /// `k1 -> k2 -> ... -> kn -> *`, built right-to-left as §4.2 describes
    /// for a type constructor's own kind.
    pub fn arrow_chain(arg_kinds: impl DoubleEndedIterator<Item = Kind>) -> Kind {
        arg_kinds.rev().fold(Kind::Star, |acc, k| Kind::arrow(k, acc))
    }
}

impl fmt::Display for Kind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Kind::Star => write!(f, "*"),
            Kind::Arrow(l, r) => write!(f, "({} -> {})", l, r),
            Kind::Var(v) => match v.bound_to() {
                Some(k) => write!(f, "{}", k),
                None => write!(f, "k{}", v.id()),
            },
        }
    }
}

#[derive(Debug)]
struct TypeVarInner {
    id: u64,
    bound_to: Option<Type>,
}

/// A mutable type unification variable (§3's "free unification variable").
#[derive(Debug, Clone)]
pub struct TypeVar(Rc<RefCell<TypeVarInner>>);

impl TypeVar {
    pub fn fresh() -> Self {
        TypeVar(Rc::new(RefCell::new(TypeVarInner {
            id: fresh_id(),
            bound_to: None,
        })))
    }

    pub fn id(&self) -> u64 {
        self.0.borrow().id
    }

    pub fn bound_to(&self) -> Option<Type> {
        self.0.borrow().bound_to.clone()
    }

    pub fn bind(&self, ty: Type) {
        self.0.borrow_mut().bound_to = Some(ty);
    }

    pub fn ptr_eq(&self, other: &TypeVar) -> bool {
        Rc::ptr_eq(&self.0, &other.0)
    }
}

impl PartialEq for TypeVar {
    fn eq(&self, other: &Self) -> bool {
        self.ptr_eq(other)
    }
}
impl Eq for TypeVar {}

/// A type (§3): a unification variable, a rigid constructor carrying its
/// kind, an application, or (post-generalization) a quantified variable.
#[derive(Debug, Clone, PartialEq)]
pub enum Type {
    Var(TypeVar),
    Constructor(String, Kind),
    App(Box<Type>, Box<Type>),
    /// A name bound by an enclosing `forall`; only ever appears inside a
    /// generalized scheme, never during active inference of its own body.
    Quantified(String),
}

impl Type {
    pub fn fresh_var() -> Type {
        Type::Var(TypeVar::fresh())
    }

    pub fn app(left: Type, right: Type) -> Type {
        Type::App(Box::new(left), Box::new(right))
    }

    pub fn app_chain(head: Type, args: impl IntoIterator<Item = Type>) -> Type {
        args.into_iter().fold(head, Type::app)
    }

    pub fn int() -> Type {
        Type::Constructor("Int".to_string(), Kind::Star)
    }

    pub fn char() -> Type {
        Type::Constructor("Char".to_string(), Kind::Star)
    }

    pub fn bool() -> Type {
        Type::Constructor("Bool".to_string(), Kind::Star)
    }

    pub fn arrow_constructor() -> Type {
        Type::Constructor(
            "(->)".to_string(),
            Kind::arrow_chain([Kind::Star, Kind::Star].into_iter()),
        )
    }

    pub fn list_constructor() -> Type {
        Type::Constructor("[]".to_string(), Kind::arrow(Kind::Star, Kind::Star))
    }

    /// `a -> b`.
    pub fn function(arg: Type, result: Type) -> Type {
        Type::app_chain(Type::arrow_constructor(), [arg, result])
    }

    /// `[elem]`.
    pub fn list(elem: Type) -> Type {
        Type::app(Type::list_constructor(), elem)
    }

    /// `[Char]`, the type of string literals.
    pub fn string() -> Type {
        Type::list(Type::char())
    }

    /// Decompose `a -> b` (an application of the `(->)` constructor),
    /// returning `None` if `self` is not (after following bindings) a
    /// function type.
    pub fn as_function(&self) -> Option<(Type, Type)> {
        if let Type::App(l, r) = self
            && let Type::App(arrow, arg) = l.as_ref()
            && matches!(arrow.as_ref(), Type::Constructor(name, _) if name == "(->)")
        {
            return Some((arg.as_ref().clone(), r.as_ref().clone()));
        }
        None
    }
}

/// The wire shape a `Type` deserializes from (§6 "external AST/STG input
/// encoding"): a user-written signature or `data` field is always closed
/// modulo its own quantified names, so the JSON form never needs (and
/// cannot sensibly construct) a live unification variable — only `picoc`'s
/// *input* side ever deserializes a `Type`, never its output.
#[derive(Deserialize)]
enum TypeWire {
    Constructor(String),
    App(Box<TypeWire>, Box<TypeWire>),
    Quantified(String),
}

impl From<TypeWire> for Type {
    fn from(wire: TypeWire) -> Self {
        match wire {
            // The kind attached here is never consulted for correctness:
            // every consumer re-derives it by looking up the name in
            // `KindEnvironment::type_constructor_kinds` instead of reading
            // this field (see `unification::unify`, `kinds::infer_kind`).
            TypeWire::Constructor(name) => Type::Constructor(name, Kind::fresh_var()),
            TypeWire::App(l, r) => Type::app((*l).into(), (*r).into()),
            TypeWire::Quantified(name) => Type::Quantified(name),
        }
    }
}

impl<'de> Deserialize<'de> for Type {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        TypeWire::deserialize(deserializer).map(Type::from)
    }
}

impl fmt::Display for Type {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some((arg, result)) = self.as_function() {
            return write!(f, "({} -> {})", arg, result);
        }
        match self {
            Type::Var(v) => match v.bound_to() {
                Some(t) => write!(f, "{}", t),
                None => write!(f, "t{}", v.id()),
            },
            Type::Constructor(name, _) => write!(f, "{}", name),
            Type::App(l, r) => write!(f, "({} {})", l, r),
            Type::Quantified(name) => write!(f, "{}", name),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn function_type_round_trips_through_as_function() {
        let ty = Type::function(Type::int(), Type::bool());
        let (arg, result) = ty.as_function().expect("should decompose as a function");
        assert_eq!(arg, Type::int());
        assert_eq!(result, Type::bool());
    }

    #[test]
    fn deserializes_a_function_signature_from_json() {
        let json = r#"{"App":[{"App":[{"Constructor":"(->)"},{"Quantified":"a"}]},{"Quantified":"a"}]}"#;
        let ty: Type = serde_json::from_str(json).unwrap();
        match ty {
            Type::App(l, r) => {
                assert_eq!(*r, Type::Quantified("a".to_string()));
                match *l {
                    Type::App(arrow, arg) => {
                        assert_eq!(*arg, Type::Quantified("a".to_string()));
                        assert!(matches!(*arrow, Type::Constructor(name, _) if name == "(->)"));
                    }
                    _ => panic!("expected a nested application"),
                }
            }
            _ => panic!("expected an application"),
        }
    }

    #[test]
    fn fresh_type_vars_are_distinct_cells() {
        let a = TypeVar::fresh();
        let b = TypeVar::fresh();
        assert_ne!(a, b);
        assert_eq!(a.clone(), a);
    }

    #[test]
    fn binding_a_var_is_observed_through_clones() {
        let v = TypeVar::fresh();
        let alias = v.clone();
        v.bind(Type::int());
        assert_eq!(alias.bound_to(), Some(Type::int()));
    }

    #[test]
    fn arrow_chain_builds_right_associated_kind() {
        let k = Kind::arrow_chain([Kind::Star, Kind::Star].into_iter());
        assert_eq!(k, Kind::arrow(Kind::Star, Kind::arrow(Kind::Star, Kind::Star)));
    }

    #[test]
    fn display_formats_lists_and_functions() {
        assert_eq!(Type::string().to_string(), "([] Char)");
        assert_eq!(Type::function(Type::int(), Type::int()).to_string(), "(Int -> Int)");
    }
}
