// ============================================================================
// spark-entities - Equality
// Write-suppression comparisons for fields and child slots
// ============================================================================
//
// A setter only runs its side effects (mark changed, notify) when the new
// value differs from the stored one. Plain fields compare with PartialEq by
// default; child slots compare by identity. Types without a sensible
// PartialEq (floats holding NaN) pass an explicit EqualsFn instead.
// ============================================================================

use std::rc::Rc;

/// Equality function used to decide whether a write is a no-op.
pub type EqualsFn<T> = fn(&T, &T) -> bool;

/// Structural equality via PartialEq. The default for `Field<T>` writes.
///
/// # Example
/// ```
/// use spark_entities::events::equality::equals;
///
/// assert!(equals(&"draft", &"draft"));
/// assert!(!equals(&1, &2));
/// ```
pub fn equals<T: PartialEq>(a: &T, b: &T) -> bool {
    a == b
}

/// Identity equality for shared entities. Two handles are equal only when
/// they point at the same allocation, regardless of contents.
///
/// # Example
/// ```
/// use spark_entities::events::equality::same_entity;
/// use std::rc::Rc;
///
/// let a = Rc::new(5);
/// let b = Rc::new(5);
/// assert!(same_entity(&a, &a.clone()));
/// assert!(!same_entity(&a, &b));
/// ```
pub fn same_entity<T: ?Sized>(a: &Rc<T>, b: &Rc<T>) -> bool {
    Rc::ptr_eq(a, b)
}

/// Identity equality lifted over optional slot contents.
pub fn same_slot<T: ?Sized>(a: &Option<Rc<T>>, b: &Option<Rc<T>>) -> bool {
    match (a, b) {
        (None, None) => true,
        (Some(a), Some(b)) => Rc::ptr_eq(a, b),
        _ => false,
    }
}

/// f64 equality where NaN equals NaN, so re-writing NaN is a no-op.
///
/// # Example
/// ```
/// use spark_entities::events::equality::safe_equals_f64;
///
/// assert!(safe_equals_f64(&f64::NAN, &f64::NAN));
/// assert!(!safe_equals_f64(&f64::NAN, &0.0));
/// ```
pub fn safe_equals_f64(a: &f64, b: &f64) -> bool {
    if a.is_nan() {
        return b.is_nan();
    }
    a == b
}

/// f32 counterpart of [`safe_equals_f64`].
pub fn safe_equals_f32(a: &f32, b: &f32) -> bool {
    if a.is_nan() {
        return b.is_nan();
    }
    a == b
}

/// Never equal: every write counts as a change.
pub fn never_equals<T>(_a: &T, _b: &T) -> bool {
    false
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn structural_equality() {
        assert!(equals(&vec![1, 2], &vec![1, 2]));
        assert!(!equals(&vec![1, 2], &vec![2, 1]));
    }

    #[test]
    fn identity_ignores_contents() {
        let a = Rc::new(String::from("x"));
        let b = Rc::new(String::from("x"));
        assert!(same_entity(&a, &a));
        assert!(!same_entity(&a, &b));

        assert!(same_slot::<String>(&None, &None));
        assert!(same_slot(&Some(a.clone()), &Some(a.clone())));
        assert!(!same_slot(&Some(a), &None));
    }

    #[test]
    fn nan_safe_floats() {
        assert!(safe_equals_f64(&f64::NAN, &f64::NAN));
        assert!(safe_equals_f64(&-0.0, &0.0));
        assert!(!safe_equals_f64(&1.0, &f64::NAN));
        assert!(safe_equals_f32(&f32::NAN, &f32::NAN));
        assert!(!safe_equals_f32(&1.0, &2.0));
    }

    #[test]
    fn never_equals_forces_writes() {
        let eq: EqualsFn<u8> = never_equals;
        assert!(!eq(&1, &1));
    }
}
