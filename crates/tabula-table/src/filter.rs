use std::collections::HashSet;
use std::fmt;

use crate::value::Value;

/// How a field's values are tested by [`crate::Table::where_field`].
pub enum Condition<'a> {
    /// Keep values for which the function returns `true`.
    Predicate(Box<dyn Fn(&Value) -> bool + 'a>),
    /// Keep values contained in the set.
    In(HashSet<Value>),
    /// Keep values equal to the scalar.
    Equals(Value),
}

impl<'a> Condition<'a> {
    pub fn predicate(f: impl Fn(&Value) -> bool + 'a) -> Self {
        Condition::Predicate(Box::new(f))
    }

    pub fn one_of<I, V>(values: I) -> Self
    where
        I: IntoIterator<Item = V>,
        V: Into<Value>,
    {
        Condition::In(values.into_iter().map(Into::into).collect())
    }

    pub fn equals(value: impl Into<Value>) -> Self {
        Condition::Equals(value.into())
    }

    pub fn matches(&self, value: &Value) -> bool {
        match self {
            Condition::Predicate(f) => f(value),
            Condition::In(set) => set.contains(value),
            Condition::Equals(expected) => value == expected,
        }
    }
}

impl From<Value> for Condition<'_> {
    fn from(value: Value) -> Self {
        Condition::Equals(value)
    }
}

impl From<HashSet<Value>> for Condition<'_> {
    fn from(value: HashSet<Value>) -> Self {
        Condition::In(value)
    }
}

impl fmt::Debug for Condition<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Condition::Predicate(_) => f.write_str("Predicate(..)"),
            Condition::In(set) => f.debug_tuple("In").field(set).finish(),
            Condition::Equals(v) => f.debug_tuple("Equals").field(v).finish(),
        }
    }
}
