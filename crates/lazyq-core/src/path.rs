//! Field paths and accessors.
//!
//! A `FieldPath` is validated when it is built, so a malformed path is a
//! construction-time error. Walking a path never fails: a missing or null
//! intermediate just yields `None`.

use std::borrow::Cow;
use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::value::Value;

/// One step of a field path.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum PathStep {
    /// Object field by name. On a list, a numeric name addresses an element.
    Field(String),
    /// List element by position. On an object, addresses the field named by
    /// the decimal index.
    Index(usize),
}

impl PathStep {
    fn apply<'a>(&self, v: &'a Value) -> Option<&'a Value> {
        match (self, v) {
            (PathStep::Field(name), Value::Object(map)) => map.get(name),
            (PathStep::Field(name), Value::List(items)) => {
                name.parse::<usize>().ok().and_then(|i| items.get(i))
            }
            (PathStep::Index(i), Value::List(items)) => items.get(*i),
            (PathStep::Index(i), Value::Object(map)) => map.get(&i.to_string()),
            _ => None,
        }
    }
}

impl From<&str> for PathStep {
    fn from(s: &str) -> Self {
        PathStep::Field(s.to_string())
    }
}

impl From<String> for PathStep {
    fn from(s: String) -> Self {
        PathStep::Field(s)
    }
}

impl From<usize> for PathStep {
    fn from(i: usize) -> Self {
        PathStep::Index(i)
    }
}

impl fmt::Display for PathStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PathStep::Field(name) => write!(f, "{}", name),
            PathStep::Index(i) => write!(f, "{}", i),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldPath {
    steps: Vec<PathStep>,
}

impl FieldPath {
    /// Build a path from explicit steps.
    pub fn new<I, S>(steps: I) -> Result<Self>
    where
        I: IntoIterator<Item = S>,
        S: Into<PathStep>,
    {
        let steps: Vec<PathStep> = steps.into_iter().map(Into::into).collect();
        let path = Self { steps };
        path.validate()?;
        Ok(path)
    }

    /// Parse a dotted path such as `partner.name` or `members.0`.
    ///
    /// All-digit segments become `PathStep::Index`.
    pub fn parse(dotted: &str) -> Result<Self> {
        let steps = dotted.split('.').map(|seg| match seg.parse::<usize>() {
            Ok(i) => PathStep::Index(i),
            Err(_) => PathStep::Field(seg.to_string()),
        });
        let path = Self {
            steps: steps.collect(),
        };
        path.validate().map_err(|e| match e {
            Error::InvalidPath { reason, .. } => Error::InvalidPath {
                path: dotted.to_string(),
                reason,
            },
            other => other,
        })?;
        Ok(path)
    }

    fn validate(&self) -> Result<()> {
        if self.steps.is_empty() {
            return Err(Error::InvalidPath {
                path: String::new(),
                reason: "path has no steps".into(),
            });
        }
        if let Some(pos) = self
            .steps
            .iter()
            .position(|s| matches!(s, PathStep::Field(name) if name.is_empty()))
        {
            return Err(Error::InvalidPath {
                path: self.to_string(),
                reason: format!("step {} is an empty field name", pos),
            });
        }
        Ok(())
    }

    pub fn steps(&self) -> &[PathStep] {
        &self.steps
    }

    /// True for a single-step path naming `field`.
    pub fn is_field(&self, field: &str) -> bool {
        matches!(self.steps.as_slice(), [PathStep::Field(name)] if name == field)
    }

    /// Walk the path. `None` as soon as a step is missing or lands on null.
    pub fn get<'a>(&self, record: &'a Value) -> Option<&'a Value> {
        let mut cur = record;
        for step in &self.steps {
            if cur.is_null() {
                return None;
            }
            cur = step.apply(cur)?;
        }
        Some(cur)
    }
}

impl fmt::Display for FieldPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, step) in self.steps.iter().enumerate() {
            if i > 0 {
                f.write_str(".")?;
            }
            write!(f, "{}", step)?;
        }
        Ok(())
    }
}

/// Projection from a record to an optional value.
pub type ProjectFn = Arc<dyn Fn(&Value) -> Option<Value> + Send + Sync>;

/// Extracts the value a filter or ordering looks at.
#[derive(Clone)]
pub enum Accessor {
    /// The whole record.
    Record,
    Path(FieldPath),
    Project(ProjectFn),
}

impl Accessor {
    pub fn path(dotted: &str) -> Result<Self> {
        Ok(Accessor::Path(FieldPath::parse(dotted)?))
    }

    pub fn project<F>(f: F) -> Self
    where
        F: Fn(&Value) -> Option<Value> + Send + Sync + 'static,
    {
        Accessor::Project(Arc::new(f))
    }

    pub fn get<'a>(&self, record: &'a Value) -> Option<Cow<'a, Value>> {
        match self {
            Accessor::Record => Some(Cow::Borrowed(record)),
            Accessor::Path(path) => path.get(record).map(Cow::Borrowed),
            Accessor::Project(f) => f(record).map(Cow::Owned),
        }
    }

    pub fn as_path(&self) -> Option<&FieldPath> {
        match self {
            Accessor::Path(path) => Some(path),
            _ => None,
        }
    }
}

impl From<FieldPath> for Accessor {
    fn from(path: FieldPath) -> Self {
        Accessor::Path(path)
    }
}

/// Anything a filter, ordering, or hop can be pointed at.
///
/// Dotted strings are parsed here, so a malformed path fails when the query
/// is built rather than when it runs.
pub trait IntoAccessor {
    fn into_accessor(self) -> Result<Accessor>;
}

impl IntoAccessor for Accessor {
    fn into_accessor(self) -> Result<Accessor> {
        Ok(self)
    }
}

impl IntoAccessor for FieldPath {
    fn into_accessor(self) -> Result<Accessor> {
        Ok(Accessor::Path(self))
    }
}

impl IntoAccessor for &str {
    fn into_accessor(self) -> Result<Accessor> {
        Accessor::path(self)
    }
}

impl fmt::Debug for Accessor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(self, f)
    }
}

impl fmt::Display for Accessor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Accessor::Record => f.write_str("<record>"),
            Accessor::Path(path) => write!(f, "{}", path),
            Accessor::Project(_) => f.write_str("<fn>"),
        }
    }
}
