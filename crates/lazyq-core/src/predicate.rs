//! Value-level predicates used by filters.
//!
//! Every variant except `Lambda` can be inverted, and for those variants
//! `p.call(v) == !p.invert()?.call(v)` holds for every `v`, with one pinned
//! exception: `StartsWith` inverts to `EndsWith` (see `Predicate::invert`).
//!
//! An absent value (the accessor found nothing) is evaluated as `Value::Null`.
//! Ordering predicates use `Value::total_cmp`, so nulls are smaller than
//! everything else.

use std::cmp::Ordering;
use std::fmt;
use std::sync::Arc;

use crate::error::{Error, Result};
use crate::value::Value;

/// Caller-supplied test; may fail, which aborts the running query.
pub type LambdaFn = Arc<dyn Fn(&Value) -> Result<bool> + Send + Sync>;

#[derive(Clone)]
pub enum Predicate {
    Equal(Value),
    NotEqual(Value),
    LessThan(Value),
    GreaterThan(Value),
    LessOrEqual(Value),
    GreaterOrEqual(Value),
    In(Vec<Value>),
    NotIn(Vec<Value>),
    /// The tested value is a list holding the operand.
    Contains(Value),
    NotContains(Value),
    StartsWith(String),
    EndsWith(String),
    ContainsSubstring(String),
    ExcludesSubstring(String),
    Lambda(LambdaFn),
}

impl Predicate {
    pub fn equals(v: impl Into<Value>) -> Self {
        Predicate::Equal(v.into())
    }

    pub fn not_equal(v: impl Into<Value>) -> Self {
        Predicate::NotEqual(v.into())
    }

    pub fn less_than(v: impl Into<Value>) -> Self {
        Predicate::LessThan(v.into())
    }

    pub fn greater_than(v: impl Into<Value>) -> Self {
        Predicate::GreaterThan(v.into())
    }

    pub fn less_or_equal(v: impl Into<Value>) -> Self {
        Predicate::LessOrEqual(v.into())
    }

    pub fn greater_or_equal(v: impl Into<Value>) -> Self {
        Predicate::GreaterOrEqual(v.into())
    }

    pub fn one_of<I, V>(values: I) -> Self
    where
        I: IntoIterator<Item = V>,
        V: Into<Value>,
    {
        Predicate::In(values.into_iter().map(Into::into).collect())
    }

    pub fn none_of<I, V>(values: I) -> Self
    where
        I: IntoIterator<Item = V>,
        V: Into<Value>,
    {
        Predicate::NotIn(values.into_iter().map(Into::into).collect())
    }

    pub fn contains(v: impl Into<Value>) -> Self {
        Predicate::Contains(v.into())
    }

    pub fn not_contains(v: impl Into<Value>) -> Self {
        Predicate::NotContains(v.into())
    }

    pub fn starts_with(s: impl Into<String>) -> Self {
        Predicate::StartsWith(s.into())
    }

    pub fn ends_with(s: impl Into<String>) -> Self {
        Predicate::EndsWith(s.into())
    }

    pub fn contains_substring(s: impl Into<String>) -> Self {
        Predicate::ContainsSubstring(s.into())
    }

    pub fn excludes_substring(s: impl Into<String>) -> Self {
        Predicate::ExcludesSubstring(s.into())
    }

    pub fn lambda<F>(f: F) -> Self
    where
        F: Fn(&Value) -> bool + Send + Sync + 'static,
    {
        Predicate::Lambda(Arc::new(move |v: &Value| Ok(f(v))))
    }

    pub fn try_lambda<F>(f: F) -> Self
    where
        F: Fn(&Value) -> Result<bool> + Send + Sync + 'static,
    {
        Predicate::Lambda(Arc::new(f))
    }

    /// Evaluate against an accessor result.
    ///
    /// Only `Lambda` can return an error.
    pub fn call(&self, value: Option<&Value>) -> Result<bool> {
        let v = value.unwrap_or(&Value::Null);
        use Predicate::*;
        Ok(match self {
            Equal(x) => v.same(x),
            NotEqual(x) => !v.same(x),
            LessThan(x) => v.total_cmp(x) == Ordering::Less,
            GreaterOrEqual(x) => v.total_cmp(x) != Ordering::Less,
            GreaterThan(x) => v.total_cmp(x) == Ordering::Greater,
            LessOrEqual(x) => v.total_cmp(x) != Ordering::Greater,
            In(set) => set.iter().any(|x| v.same(x)),
            NotIn(set) => !set.iter().any(|x| v.same(x)),
            Contains(x) => list_contains(v, x),
            NotContains(x) => !list_contains(v, x),
            StartsWith(s) => v.as_str().is_some_and(|t| t.starts_with(s.as_str())),
            EndsWith(s) => v.as_str().is_some_and(|t| t.ends_with(s.as_str())),
            ContainsSubstring(s) => v.as_str().is_some_and(|t| t.contains(s.as_str())),
            ExcludesSubstring(s) => !v.as_str().is_some_and(|t| t.contains(s.as_str())),
            Lambda(f) => return f(v),
        })
    }

    /// The complementary predicate.
    ///
    /// Known inconsistency, kept on purpose: `StartsWith` inverts to
    /// `EndsWith` (and back), which is not a complement. Callers that need
    /// "does not start with" should use a lambda.
    pub fn invert(&self) -> Result<Predicate> {
        use Predicate::*;
        Ok(match self {
            Equal(x) => NotEqual(x.clone()),
            NotEqual(x) => Equal(x.clone()),
            LessThan(x) => GreaterOrEqual(x.clone()),
            GreaterOrEqual(x) => LessThan(x.clone()),
            GreaterThan(x) => LessOrEqual(x.clone()),
            LessOrEqual(x) => GreaterThan(x.clone()),
            In(set) => NotIn(set.clone()),
            NotIn(set) => In(set.clone()),
            Contains(x) => NotContains(x.clone()),
            NotContains(x) => Contains(x.clone()),
            StartsWith(s) => EndsWith(s.clone()),
            EndsWith(s) => StartsWith(s.clone()),
            ContainsSubstring(s) => ExcludesSubstring(s.clone()),
            ExcludesSubstring(s) => ContainsSubstring(s.clone()),
            Lambda(_) => {
                return Err(Error::Misuse("lambda predicates cannot be inverted".into()))
            }
        })
    }

    pub fn is_invertible(&self) -> bool {
        !matches!(self, Predicate::Lambda(_))
    }

    /// Stable lowercase name, used in plan explain output.
    pub fn name(&self) -> &'static str {
        use Predicate::*;
        match self {
            Equal(_) => "equal",
            NotEqual(_) => "not_equal",
            LessThan(_) => "less_than",
            GreaterThan(_) => "greater_than",
            LessOrEqual(_) => "less_or_equal",
            GreaterOrEqual(_) => "greater_or_equal",
            In(_) => "in",
            NotIn(_) => "not_in",
            Contains(_) => "contains",
            NotContains(_) => "not_contains",
            StartsWith(_) => "starts_with",
            EndsWith(_) => "ends_with",
            ContainsSubstring(_) => "contains_substring",
            ExcludesSubstring(_) => "excludes_substring",
            Lambda(_) => "lambda",
        }
    }
}

fn list_contains(v: &Value, x: &Value) -> bool {
    v.as_list().is_some_and(|items| items.iter().any(|i| i.same(x)))
}

impl fmt::Debug for Predicate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(self, f)
    }
}

impl fmt::Display for Predicate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        use Predicate::*;
        match self {
            Equal(x) | NotEqual(x) | LessThan(x) | GreaterThan(x) | LessOrEqual(x)
            | GreaterOrEqual(x) | Contains(x) | NotContains(x) => {
                write!(f, "{}({})", self.name(), x)
            }
            In(set) | NotIn(set) => {
                write!(f, "{}({})", self.name(), Value::List(set.clone()))
            }
            StartsWith(s) | EndsWith(s) | ContainsSubstring(s) | ExcludesSubstring(s) => {
                write!(f, "{}({:?})", self.name(), s)
            }
            Lambda(_) => f.write_str("lambda"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn samples() -> Vec<Value> {
        vec![
            Value::Null,
            Value::Bool(false),
            Value::Int(-1),
            Value::Int(30),
            Value::Float(30.0),
            Value::Float(30.5),
            Value::Float(f64::NAN),
            Value::from(""),
            Value::from("Brown"),
            Value::from("Billy"),
            Value::from("nwo"),
            Value::from(json!(["pig", "cow"])),
            Value::from(json!([30, 31])),
            Value::from(json!({"type": "pig"})),
        ]
    }

    fn invertible() -> Vec<Predicate> {
        vec![
            Predicate::equals(30),
            Predicate::not_equal("Brown"),
            Predicate::less_than(30),
            Predicate::greater_than(30),
            Predicate::less_or_equal(30.0),
            Predicate::greater_or_equal("Billy"),
            Predicate::one_of(["Brown", "Billy"]),
            Predicate::none_of([30, 31]),
            Predicate::contains("pig"),
            Predicate::not_contains(30),
            Predicate::contains_substring("ow"),
            Predicate::excludes_substring("ow"),
        ]
    }

    #[test]
    fn test_inversion_is_complement() {
        for p in invertible() {
            let inv = p.invert().unwrap();
            for v in samples() {
                assert_eq!(
                    p.call(Some(&v)).unwrap(),
                    !inv.call(Some(&v)).unwrap(),
                    "{} vs {} on {}",
                    p,
                    inv,
                    v
                );
            }
            assert_eq!(p.call(None).unwrap(), !inv.call(None).unwrap());
        }
    }

    #[test]
    fn test_double_inversion_round_trips_name() {
        for p in invertible() {
            assert_eq!(p.invert().unwrap().invert().unwrap().name(), p.name());
        }
    }

    #[test]
    fn test_starts_with_inverts_to_ends_with() {
        // Pinned inconsistency: the inverse of starts_with is ends_with.
        let p = Predicate::starts_with("B");
        let inv = p.invert().unwrap();
        assert!(matches!(inv, Predicate::EndsWith(ref s) if s == "B"));

        // "Bob" starts with "B" and does not end with it: contract holds here.
        let bob = Value::from("Bob");
        assert_eq!(p.call(Some(&bob)).unwrap(), !inv.call(Some(&bob)).unwrap());
        // "Al" does neither, which breaks the complement contract.
        let al = Value::from("Al");
        assert!(!p.call(Some(&al)).unwrap());
        assert!(!inv.call(Some(&al)).unwrap());
    }

    #[test]
    fn test_ends_with_is_its_own_variant() {
        let p = Predicate::ends_with("wn");
        assert!(p.call(Some(&Value::from("Brown"))).unwrap());
        assert!(!p.call(Some(&Value::from("Billy"))).unwrap());
    }

    #[test]
    fn test_equality_is_identity_for_primitives() {
        assert!(Predicate::equals(160).call(Some(&Value::Float(160.0))).unwrap());
        let obj = Value::from(json!({"name": "Nancy"}));
        assert!(!Predicate::Equal(obj.clone()).call(Some(&obj)).unwrap());
    }

    #[test]
    fn test_absent_values() {
        assert!(!Predicate::equals("Alice").call(None).unwrap());
        assert!(Predicate::not_equal("Alice").call(None).unwrap());
        assert!(!Predicate::greater_than(30).call(None).unwrap());
        assert!(Predicate::less_than(30).call(None).unwrap());
        assert!(!Predicate::starts_with("A").call(None).unwrap());
        assert!(!Predicate::contains(1).call(None).unwrap());
    }

    #[test]
    fn test_strings_only_for_string_predicates() {
        assert!(!Predicate::starts_with("1").call(Some(&Value::Int(12))).unwrap());
        assert!(!Predicate::contains_substring("ig").call(Some(&Value::from(json!(["pig"])))).unwrap());
    }

    #[test]
    fn test_lambda_errors_and_inversion() {
        let p = Predicate::try_lambda(|v| match v.as_i64() {
            Some(i) => Ok(i > 10),
            None => Err(Error::lambda("not an int")),
        });
        assert!(p.call(Some(&Value::Int(11))).unwrap());
        assert!(matches!(p.call(Some(&Value::from("x"))), Err(Error::Lambda(_))));
        assert!(!p.is_invertible());
        assert!(matches!(p.invert(), Err(Error::Misuse(_))));
    }

    #[test]
    fn test_display() {
        assert_eq!(Predicate::equals("Brown").to_string(), r#"equal("Brown")"#);
        assert_eq!(Predicate::one_of([1, 2]).to_string(), "in([1,2])");
        assert_eq!(Predicate::starts_with("B").to_string(), r#"starts_with("B")"#);
    }
}
