//! IR operations and their attached data.
//!
//! An [`Operation`] is a node in the IR graph: a dialect-qualified kind name,
//! ordered operand and result values, a source location, a named attribute
//! map, and an optional nested region. The kind name is fixed at
//! construction; operands, results, and attributes may be mutated by passes.
//!
//! Behavior is *not* stored on the operation. Traits, effects, and capability
//! implementations are registered per kind in [`crate::registry::OpRegistry`]
//! and looked up by the operation's qualified name.

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use super::location::Location;

/// An SSA value reference.
///
/// Values are minted by the enclosing [`Module`](super::Module) and are
/// opaque: the capability layer only ever compares them for identity.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ValueId {
    /// Module-local index for this value.
    pub index: u32,
}

impl ValueId {
    /// Create a value id with the given index.
    pub const fn new(index: u32) -> Self {
        Self { index }
    }

    /// The index of this value.
    pub const fn index(self) -> u32 {
        self.index
    }
}

impl fmt::Debug for ValueId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ValueId({})", self.index)
    }
}

impl fmt::Display for ValueId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "%{}", self.index)
    }
}

/// Profiler measurement attached to an operation.
///
/// Absent at creation; populated by the annotation pass. Re-attaching
/// overwrites, never merges.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProfilerData {
    /// Timestamp of the measurement, in nanoseconds.
    pub timestamp_ns: u64,
    /// Measured duration, in nanoseconds.
    pub duration_ns: u64,
}

impl ProfilerData {
    /// Create a profiler record.
    pub const fn new(timestamp_ns: u64, duration_ns: u64) -> Self {
        Self {
            timestamp_ns,
            duration_ns,
        }
    }
}

/// A named attribute value stored on an operation.
#[derive(Debug, Clone, PartialEq)]
pub enum Attribute {
    /// Boolean flag.
    Bool(bool),
    /// Signed integer.
    I64(i64),
    /// Unsigned integer.
    U64(u64),
    /// String value (layout formats, container names, ...).
    Str(String),
    /// Attached profiler measurement.
    Profiler(ProfilerData),
}

impl Attribute {
    /// View this attribute as a string, if it is one.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Attribute::Str(s) => Some(s),
            _ => None,
        }
    }

    /// View this attribute as a bool, if it is one.
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Attribute::Bool(b) => Some(*b),
            _ => None,
        }
    }

    /// View this attribute as a profiler record, if it is one.
    pub fn as_profiler(&self) -> Option<ProfilerData> {
        match self {
            Attribute::Profiler(d) => Some(*d),
            _ => None,
        }
    }
}

/// A node in the IR graph.
#[derive(Debug, Clone)]
pub struct Operation {
    /// Dialect-qualified kind name, e.g. `cinder.conv`.
    name: Arc<str>,
    /// Ordered operand values.
    operands: Vec<ValueId>,
    /// Ordered result values.
    results: Vec<ValueId>,
    /// Source location for diagnostics and profile keying.
    location: Location,
    /// Named attributes. BTreeMap keeps iteration deterministic.
    attrs: BTreeMap<String, Attribute>,
    /// Nested operations, for ops that carry a region.
    region: Vec<Operation>,
}

impl Operation {
    /// Create an operation of the given kind with no operands or results.
    pub fn new(name: impl Into<Arc<str>>, location: Location) -> Self {
        Self {
            name: name.into(),
            operands: Vec::new(),
            results: Vec::new(),
            location,
            attrs: BTreeMap::new(),
            region: Vec::new(),
        }
    }

    /// Builder-style: set the operand list.
    pub fn with_operands(mut self, operands: Vec<ValueId>) -> Self {
        self.operands = operands;
        self
    }

    /// Builder-style: set the result list.
    pub fn with_results(mut self, results: Vec<ValueId>) -> Self {
        self.results = results;
        self
    }

    /// Builder-style: set an attribute.
    pub fn with_attr(mut self, key: impl Into<String>, value: Attribute) -> Self {
        self.attrs.insert(key.into(), value);
        self
    }

    /// Builder-style: set the nested region.
    pub fn with_region(mut self, region: Vec<Operation>) -> Self {
        self.region = region;
        self
    }

    /// The dialect-qualified kind name, e.g. `cinder.var_read`.
    pub fn qualified_name(&self) -> &str {
        &self.name
    }

    /// The dialect namespace, i.e. the part before the first `.`.
    ///
    /// Returns `None` for unqualified names.
    pub fn dialect(&self) -> Option<&str> {
        let (dialect, _) = self.name.split_once('.')?;
        Some(dialect)
    }

    /// The unqualified kind name, i.e. the part after the first `.`.
    pub fn short_name(&self) -> &str {
        match self.name.split_once('.') {
            Some((_, rest)) => rest,
            None => &self.name,
        }
    }

    /// The source location of this operation.
    pub fn location(&self) -> &Location {
        &self.location
    }

    /// Ordered operand values.
    pub fn operands(&self) -> &[ValueId] {
        &self.operands
    }

    /// Ordered result values.
    pub fn results(&self) -> &[ValueId] {
        &self.results
    }

    /// Append an operand.
    pub fn push_operand(&mut self, value: ValueId) {
        self.operands.push(value);
    }

    /// Append a result.
    pub fn push_result(&mut self, value: ValueId) {
        self.results.push(value);
    }

    /// Look up a named attribute.
    pub fn attr(&self, key: &str) -> Option<&Attribute> {
        self.attrs.get(key)
    }

    /// Set a named attribute, replacing any existing value.
    pub fn set_attr(&mut self, key: impl Into<String>, value: Attribute) {
        self.attrs.insert(key.into(), value);
    }

    /// Remove a named attribute, returning the previous value.
    pub fn remove_attr(&mut self, key: &str) -> Option<Attribute> {
        self.attrs.remove(key)
    }

    /// All attributes, in deterministic key order.
    pub fn attrs(&self) -> impl Iterator<Item = (&str, &Attribute)> {
        self.attrs.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// Nested operations, if this op carries a region.
    pub fn region(&self) -> &[Operation] {
        &self.region
    }

    /// Mutable access to the nested region.
    pub fn region_mut(&mut self) -> &mut Vec<Operation> {
        &mut self.region
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name)?;
        if !self.operands.is_empty() {
            write!(f, "(")?;
            for (i, v) in self.operands.iter().enumerate() {
                if i > 0 {
                    write!(f, ", ")?;
                }
                write!(f, "{}", v)?;
            }
            write!(f, ")")?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_dialect_split() {
        let op = Operation::new("cinder.var_read", Location::unknown());
        assert_eq!(op.dialect(), Some("cinder"));
        assert_eq!(op.short_name(), "var_read");
        assert_eq!(op.qualified_name(), "cinder.var_read");
    }

    #[test]
    fn test_unqualified_name_has_no_dialect() {
        let op = Operation::new("return", Location::unknown());
        assert_eq!(op.dialect(), None);
        assert_eq!(op.short_name(), "return");
    }

    #[test]
    fn test_attr_roundtrip() {
        let mut op = Operation::new("cinder.conv", Location::unknown());
        op.set_attr("data_format", Attribute::Str("NHWC".into()));
        assert_eq!(
            op.attr("data_format").and_then(Attribute::as_str),
            Some("NHWC")
        );
        op.set_attr("data_format", Attribute::Str("NCHW".into()));
        assert_eq!(
            op.attr("data_format").and_then(Attribute::as_str),
            Some("NCHW")
        );
        assert!(op.remove_attr("data_format").is_some());
        assert!(op.attr("data_format").is_none());
    }

    #[test]
    fn test_display() {
        let op = Operation::new("cinder.add", Location::unknown())
            .with_operands(vec![ValueId::new(0), ValueId::new(1)]);
        assert_eq!(op.to_string(), "cinder.add(%0, %1)");
    }
}
