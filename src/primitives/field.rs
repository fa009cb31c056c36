// ============================================================================
// spark-entities - Field
// Interior-mutable backing storage for plain entity properties
// ============================================================================

use std::cell::RefCell;
use std::fmt;

use serde::{Deserialize, Serialize};

/// Backing storage for a value property.
///
/// Reads are free; writes go through
/// [`EntityKit::set_value`](crate::EntityKit::set_value) so they mark the
/// owner changed and notify. Serializes as the bare value.
///
/// # Example
///
/// ```
/// use spark_entities::Field;
///
/// let name = Field::new(String::from("alpha"));
/// assert_eq!(name.get(), "alpha");
/// assert_eq!(name.with(|s| s.len()), 5);
/// ```
#[derive(Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Field<T> {
    value: RefCell<T>,
}

impl<T> Field<T> {
    pub fn new(value: T) -> Self {
        Self {
            value: RefCell::new(value),
        }
    }

    /// Current value (cloning).
    pub fn get(&self) -> T
    where
        T: Clone,
    {
        self.value.borrow().clone()
    }

    /// Borrow the current value for the duration of `f`.
    pub fn with<R>(&self, f: impl FnOnce(&T) -> R) -> R {
        f(&self.value.borrow())
    }

    /// Swap in a new value without any notification.
    pub(crate) fn replace(&self, value: T) -> T {
        self.value.replace(value)
    }

    pub fn into_inner(self) -> T {
        self.value.into_inner()
    }
}

impl<T: Clone> Clone for Field<T> {
    fn clone(&self) -> Self {
        Self::new(self.get())
    }
}

impl<T: PartialEq> PartialEq for Field<T> {
    fn eq(&self, other: &Self) -> bool {
        *self.value.borrow() == *other.value.borrow()
    }
}

impl<T: fmt::Debug> fmt::Debug for Field<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(&*self.value.borrow(), f)
    }
}

impl<T> From<T> for Field<T> {
    fn from(value: T) -> Self {
        Self::new(value)
    }
}
