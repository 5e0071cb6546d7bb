//! The dimension-list unifier.
//!
//! Matches two lists of dimensions where each element is either a concrete
//! positive integer, a name (variable), or a name with a wildcard suffix
//! `?`, `+` or `*`. Produces a variable -> value substitution or fails.
//! Never mutates the incoming substitution in place: every step returns a
//! freshly extended map, so a failed branch simply drops its clone.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

/// A wildcard suffix on a dimension name: `?` (0 or 1), `+` (1 or more), `*` (0 or more).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Wildcard {
    /// `?`
    Opt,
    /// `+`
    Plus,
    /// `*`
    Star,
}

impl Wildcard {
    fn from_suffix(c: char) -> Option<Self> {
        match c {
            '?' => Some(Self::Opt),
            '+' => Some(Self::Plus),
            '*' => Some(Self::Star),
            _ => None,
        }
    }

    fn suffix(self) -> char {
        match self {
            Self::Opt => '?',
            Self::Plus => '+',
            Self::Star => '*',
        }
    }

    fn skippable(self) -> bool {
        matches!(self, Self::Opt | Self::Star)
    }

    fn extendable(self) -> bool {
        matches!(self, Self::Plus | Self::Star)
    }
}

/// One element of a tensor's dimension list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DimElem {
    /// A concrete, positive dimension size.
    Int(u64),
    /// A dimension variable, optionally wildcard-suffixed.
    Var(String, Option<Wildcard>),
}

impl DimElem {
    /// Parse a single dim element from its wire representation (a JSON
    /// integer or string). Does not validate identifier syntax; callers
    /// validate with [`crate::ident::is_name`] on the stripped name.
    pub fn parse(value: &serde_json::Value) -> Result<Self, String> {
        if let Some(n) = value.as_u64() {
            return Ok(Self::Int(n));
        }
        if let Some(s) = value.as_str() {
            let mut chars = s.chars();
            let last = chars.next_back();
            if let Some(w) = last.and_then(Wildcard::from_suffix) {
                return Ok(Self::Var(chars.as_str().to_string(), Some(w)));
            }
            return Ok(Self::Var(s.to_string(), None));
        }
        Err("dim fields must all be integers or strings".to_string())
    }

    /// Render back to the wire representation.
    #[must_use]
    pub fn to_value(&self) -> serde_json::Value {
        match self {
            Self::Int(n) => serde_json::Value::from(*n),
            Self::Var(name, None) => serde_json::Value::String(name.clone()),
            Self::Var(name, Some(w)) => serde_json::Value::String(format!("{name}{}", w.suffix())),
        }
    }

    fn modifier(&self) -> Option<Wildcard> {
        match self {
            Self::Int(_) => None,
            Self::Var(_, w) => *w,
        }
    }

    /// The bare value used for binding and equality, with any wildcard suffix stripped.
    fn bind_value(&self) -> DimValue {
        match self {
            Self::Int(n) => DimValue::Int(*n),
            Self::Var(name, _) => DimValue::Name(name.clone()),
        }
    }

    fn var_name(&self) -> Option<&str> {
        match self {
            Self::Int(_) => None,
            Self::Var(name, _) => Some(name.as_str()),
        }
    }
}

/// A concrete value a dimension variable can resolve to: either a source
/// dimension size, or (when the source itself is still abstract) a source
/// dimension variable's name.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum DimValue {
    /// A resolved dimension size.
    Int(u64),
    /// An unresolved source-side name.
    Name(String),
}

/// Substitution mapping dimension-variable name to the value it resolved to.
pub type DimSubst = IndexMap<String, DimValue>;

/// Attempt to bind `elem`'s value against `target`, extending `subst` if `elem` is a variable.
///
/// Returns `None` if `elem` is a concrete integer that disagrees with
/// `target`, or a variable already bound to something other than `target`.
fn bind(subst: &DimSubst, elem: &DimElem, target: &DimValue) -> Option<DimSubst> {
    match elem.var_name() {
        None => {
            if elem.bind_value() == *target {
                Some(subst.clone())
            } else {
                None
            }
        }
        Some(name) => match subst.get(name) {
            None => {
                let mut next = subst.clone();
                next.insert(name.to_string(), target.clone());
                Some(next)
            }
            Some(bound) if bound == target => Some(subst.clone()),
            Some(_) => None,
        },
    }
}

/// Unify two dimension lists under substitution `subst`
///
/// Returns the extended substitution on success. Pure: never mutates `subst`.
#[must_use]
pub fn unify_dim_list(a: &[DimElem], b: &[DimElem], subst: &DimSubst) -> Option<DimSubst> {
    match (a.first(), b.first()) {
        (None, None) => Some(subst.clone()),
        (None, Some(head_b)) => {
            if head_b.modifier().is_some_and(Wildcard::skippable) {
                unify_dim_list(a, &b[1..], subst)
            } else {
                None
            }
        }
        (Some(head_a), None) => {
            if head_a.modifier().is_some_and(Wildcard::skippable) {
                unify_dim_list(&a[1..], b, subst)
            } else {
                None
            }
        }
        (Some(head_a), Some(head_b)) => {
            let mod_a = head_a.modifier();
            let mod_b = head_b.modifier();
            let val_b = head_b.bind_value();

            // 1. Consume both heads.
            if let Some(s) = bind(subst, head_a, &val_b) {
                if let Some(r) = unify_dim_list(&a[1..], &b[1..], &s) {
                    return Some(r);
                }
            }
            // 2. mB extendable: consume A head, keep B head.
            if mod_b.is_some_and(Wildcard::extendable) {
                if let Some(s) = bind(subst, head_a, &val_b) {
                    if let Some(r) = unify_dim_list(&a[1..], b, &s) {
                        return Some(r);
                    }
                }
            }
            // 3. mA skippable: skip A head.
            if mod_a.is_some_and(Wildcard::skippable) {
                if let Some(r) = unify_dim_list(&a[1..], b, subst) {
                    return Some(r);
                }
            }
            // 4. mA extendable: consume B head, keep A head.
            if mod_a.is_some_and(Wildcard::extendable) {
                if let Some(s) = bind(subst, head_a, &val_b) {
                    if let Some(r) = unify_dim_list(a, &b[1..], &s) {
                        return Some(r);
                    }
                }
            }
            // 5. mB skippable: skip B head.
            if mod_b.is_some_and(Wildcard::skippable) {
                if let Some(r) = unify_dim_list(a, &b[1..], subst) {
                    return Some(r);
                }
            }
            None
        }
    }
}

/// Bind a single dimension-name variable (used by class-dimension matching,
/// which unifies a bare name against a bare value rather than a list).
#[must_use]
pub fn bind_name(subst: &DimSubst, name: &str, target: DimValue) -> Option<DimSubst> {
    match subst.get(name) {
        None => {
            let mut next = subst.clone();
            next.insert(name.to_string(), target);
            Some(next)
        }
        Some(bound) if *bound == target => Some(subst.clone()),
        Some(_) => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn int(n: u64) -> DimElem {
        DimElem::Int(n)
    }
    fn var(name: &str, w: Option<Wildcard>) -> DimElem {
        DimElem::Var(name.to_string(), w)
    }

    #[test]
    fn wildcard_middle_absorbs_nothing_when_exact() {
        let a = vec![int(3), var("w", Some(Wildcard::Star)), int(5)];
        let b = vec![int(3), int(5)];
        let subst = unify_dim_list(&a, &b, &DimSubst::new()).unwrap();
        assert!(subst.is_empty());
    }

    #[test]
    fn wildcard_middle_absorbs_extra_dims() {
        let a = vec![int(3), var("w", Some(Wildcard::Star)), int(5)];
        let b = vec![int(3), int(7), int(8), int(5)];
        let subst = unify_dim_list(&a, &b, &DimSubst::new()).unwrap();
        assert!(subst.is_empty());
    }

    #[test]
    fn repeated_variable_binds_then_checks_consistency() {
        let a = vec![var("d", None), var("d", None)];
        let b_ok = vec![int(4), int(4)];
        let subst = unify_dim_list(&a, &b_ok, &DimSubst::new()).unwrap();
        assert_eq!(subst.get("d"), Some(&DimValue::Int(4)));

        let b_bad = vec![int(4), int(5)];
        assert!(unify_dim_list(&a, &b_bad, &DimSubst::new()).is_none());
    }

    #[test]
    fn concrete_lists_commute_with_identity() {
        let a = vec![int(2), int(3), int(4)];
        assert!(unify_dim_list(&a, &a, &DimSubst::new()).is_some());
        let b = vec![int(2), int(3), int(5)];
        assert!(unify_dim_list(&a, &b, &DimSubst::new()).is_none());
    }

    #[test]
    fn plus_wildcard_requires_at_least_one() {
        let a = vec![var("w", Some(Wildcard::Plus))];
        assert!(unify_dim_list(&a, &[], &DimSubst::new()).is_none());
        assert!(unify_dim_list(&a, &[int(1)], &DimSubst::new()).is_some());
    }
}
