//! Serialized scene-state data model
//!
//! A scene update arrives as a tree of [`StateNode`]s: each node describes
//! one logical renderer-side object by type name, carries its property
//! values, owns the state of the objects it depends on, and records the
//! method calls that wire those objects together. The tree is transient -
//! it is produced once per update and consumed by a single synchronization
//! pass, while the live instances it describes persist across passes.
//!
//! Property values and call arguments are modeled as the closed [`Value`]
//! variant type rather than a raw dynamic value, so argument resolution and
//! property application can be matched exhaustively. Property order is
//! significant and [`PropertyMap`] preserves insertion order through
//! (de)serialization.

use std::fmt;
use std::slice;

use serde::de::{MapAccess, SeqAccess, Visitor};
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::error::SyncError;

/// A property value or recorded call argument.
///
/// Covers exactly the shapes the JSON scene format can carry. Instance
/// references travel inside `String` as wrapped-id tokens (see
/// [`crate::codec`]) and are only resolved to live instances at call-replay
/// time.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    /// Absent / null value.
    Null,
    /// Boolean literal.
    Bool(bool),
    /// Integer number (JSON numbers without a fractional part).
    Integer(i64),
    /// Floating point number.
    Float(f64),
    /// String literal, possibly a wrapped instance-id token.
    String(String),
    /// Ordered sequence of values.
    Sequence(Vec<Value>),
    /// Nested ordered mapping.
    Map(PropertyMap),
}

impl Value {
    /// Returns the boolean if this value is a `Bool`.
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(b) => Some(*b),
            _ => None,
        }
    }

    /// Returns the integer if this value is an `Integer`.
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Value::Integer(i) => Some(*i),
            _ => None,
        }
    }

    /// Returns the value as a float; integers are widened.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Integer(i) => Some(*i as f64),
            Value::Float(f) => Some(*f),
            _ => None,
        }
    }

    /// Returns the string slice if this value is a `String`.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(s) => Some(s),
            _ => None,
        }
    }

    /// Returns the elements if this value is a `Sequence`.
    pub fn as_sequence(&self) -> Option<&[Value]> {
        match self {
            Value::Sequence(items) => Some(items),
            _ => None,
        }
    }

    /// Returns the nested map if this value is a `Map`.
    pub fn as_map(&self) -> Option<&PropertyMap> {
        match self {
            Value::Map(map) => Some(map),
            _ => None,
        }
    }

    /// True for `Value::Null`.
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}

impl From<i64> for Value {
    fn from(i: i64) -> Self {
        Value::Integer(i)
    }
}

impl From<f64> for Value {
    fn from(f: f64) -> Self {
        Value::Float(f)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::String(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::String(s)
    }
}

impl From<Vec<Value>> for Value {
    fn from(items: Vec<Value>) -> Self {
        Value::Sequence(items)
    }
}

impl From<PropertyMap> for Value {
    fn from(map: PropertyMap) -> Self {
        Value::Map(map)
    }
}

impl Serialize for Value {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        match self {
            Value::Null => serializer.serialize_unit(),
            Value::Bool(b) => serializer.serialize_bool(*b),
            Value::Integer(i) => serializer.serialize_i64(*i),
            Value::Float(f) => serializer.serialize_f64(*f),
            Value::String(s) => serializer.serialize_str(s),
            Value::Sequence(items) => serializer.collect_seq(items),
            Value::Map(map) => map.serialize(serializer),
        }
    }
}

struct ValueVisitor;

impl<'de> Visitor<'de> for ValueVisitor {
    type Value = Value;

    fn expecting(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter.write_str("a scene property value")
    }

    fn visit_bool<E>(self, v: bool) -> Result<Value, E> {
        Ok(Value::Bool(v))
    }

    fn visit_i64<E>(self, v: i64) -> Result<Value, E> {
        Ok(Value::Integer(v))
    }

    fn visit_u64<E>(self, v: u64) -> Result<Value, E> {
        if let Ok(i) = i64::try_from(v) {
            Ok(Value::Integer(i))
        } else {
            Ok(Value::Float(v as f64))
        }
    }

    fn visit_f64<E>(self, v: f64) -> Result<Value, E> {
        Ok(Value::Float(v))
    }

    fn visit_str<E>(self, v: &str) -> Result<Value, E> {
        Ok(Value::String(v.to_string()))
    }

    fn visit_string<E>(self, v: String) -> Result<Value, E> {
        Ok(Value::String(v))
    }

    fn visit_unit<E>(self) -> Result<Value, E> {
        Ok(Value::Null)
    }

    fn visit_none<E>(self) -> Result<Value, E> {
        Ok(Value::Null)
    }

    fn visit_some<D>(self, deserializer: D) -> Result<Value, D::Error>
    where
        D: Deserializer<'de>,
    {
        Value::deserialize(deserializer)
    }

    fn visit_seq<A>(self, mut seq: A) -> Result<Value, A::Error>
    where
        A: SeqAccess<'de>,
    {
        let mut items = Vec::with_capacity(seq.size_hint().unwrap_or(0));
        while let Some(item) = seq.next_element()? {
            items.push(item);
        }
        Ok(Value::Sequence(items))
    }

    fn visit_map<A>(self, map: A) -> Result<Value, A::Error>
    where
        A: MapAccess<'de>,
    {
        PropertyMapVisitor.visit_map(map).map(Value::Map)
    }
}

impl<'de> Deserialize<'de> for Value {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        deserializer.deserialize_any(ValueVisitor)
    }
}

/// Insertion-ordered mapping from property name to [`Value`].
///
/// Serializes as a plain JSON object. Lookup is linear, which is fine for
/// the small property sets scene nodes carry.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PropertyMap {
    entries: Vec<(String, Value)>,
}

impl PropertyMap {
    /// Create an empty map.
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or replace a property, preserving the original position on
    /// replacement. Returns the previous value if one existed.
    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<Value>) -> Option<Value> {
        let key = key.into();
        let value = value.into();
        if let Some(entry) = self.entries.iter_mut().find(|(k, _)| *k == key) {
            return Some(std::mem::replace(&mut entry.1, value));
        }
        self.entries.push((key, value));
        None
    }

    /// Look up a property by name.
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.entries
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v)
    }

    /// Remove a property, returning its value if present.
    pub fn remove(&mut self, key: &str) -> Option<Value> {
        let index = self.entries.iter().position(|(k, _)| k == key)?;
        Some(self.entries.remove(index).1)
    }

    /// True if a property with this name exists.
    pub fn contains_key(&self, key: &str) -> bool {
        self.entries.iter().any(|(k, _)| k == key)
    }

    /// Number of properties.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// True if the map holds no properties.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Iterate over `(name, value)` pairs in insertion order.
    pub fn iter(&self) -> slice::Iter<'_, (String, Value)> {
        self.entries.iter()
    }

    /// Iterate over property names in insertion order.
    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(k, _)| k.as_str())
    }
}

impl FromIterator<(String, Value)> for PropertyMap {
    fn from_iter<I: IntoIterator<Item = (String, Value)>>(iter: I) -> Self {
        let mut map = PropertyMap::new();
        for (key, value) in iter {
            map.insert(key, value);
        }
        map
    }
}

impl<'a> IntoIterator for &'a PropertyMap {
    type Item = &'a (String, Value);
    type IntoIter = slice::Iter<'a, (String, Value)>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.iter()
    }
}

impl Serialize for PropertyMap {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.collect_map(self.entries.iter().map(|(k, v)| (k.as_str(), v)))
    }
}

struct PropertyMapVisitor;

impl<'de> Visitor<'de> for PropertyMapVisitor {
    type Value = PropertyMap;

    fn expecting(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter.write_str("a property object")
    }

    fn visit_map<A>(self, mut access: A) -> Result<PropertyMap, A::Error>
    where
        A: MapAccess<'de>,
    {
        let mut map = PropertyMap::new();
        while let Some((key, value)) = access.next_entry::<String, Value>()? {
            map.insert(key, value);
        }
        Ok(map)
    }
}

impl<'de> Deserialize<'de> for PropertyMap {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        deserializer.deserialize_map(PropertyMapVisitor)
    }
}

/// A recorded method invocation: method name plus positional arguments.
///
/// Serialized as a two-element array `["methodName", [arg, ...]]`, matching
/// the scene wire format.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(from = "(String, Vec<Value>)", into = "(String, Vec<Value>)")]
pub struct Call {
    /// Method name, resolved by the target instance at replay time.
    pub method: String,
    /// Ordered arguments; strings may be wrapped instance-id tokens.
    pub args: Vec<Value>,
}

impl Call {
    /// Create a recorded call.
    pub fn new(method: impl Into<String>, args: Vec<Value>) -> Self {
        Self {
            method: method.into(),
            args,
        }
    }
}

impl From<(String, Vec<Value>)> for Call {
    fn from((method, args): (String, Vec<Value>)) -> Self {
        Self { method, args }
    }
}

impl From<Call> for (String, Vec<Value>) {
    fn from(call: Call) -> Self {
        (call.method, call.args)
    }
}

/// One node of the serialized scene description.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StateNode {
    /// Opaque identifier, unique within one synchronization pass.
    pub id: String,
    /// Type name, the key into the type-handler registry.
    #[serde(rename = "type")]
    pub type_name: String,
    /// Property values to apply to the instance.
    #[serde(default, skip_serializing_if = "PropertyMap::is_empty")]
    pub properties: PropertyMap,
    /// Child states this object depends on; owned, tree-shaped, no cycles.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub dependencies: Vec<StateNode>,
    /// Recorded method invocations, replayed after the dependency walk.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub calls: Vec<Call>,
}

impl StateNode {
    /// Create a node with no properties, dependencies, or calls.
    pub fn new(id: impl Into<String>, type_name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            type_name: type_name.into(),
            properties: PropertyMap::new(),
            dependencies: Vec::new(),
            calls: Vec::new(),
        }
    }

    /// Add a property (builder style).
    #[must_use]
    pub fn with_property(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.properties.insert(key, value);
        self
    }

    /// Add a dependency child (builder style).
    #[must_use]
    pub fn with_dependency(mut self, child: StateNode) -> Self {
        self.dependencies.push(child);
        self
    }

    /// Add a recorded call (builder style).
    #[must_use]
    pub fn with_call(mut self, method: impl Into<String>, args: Vec<Value>) -> Self {
        self.calls.push(Call::new(method, args));
        self
    }

    /// Parse a state tree from its JSON wire form.
    pub fn from_json_str(json: &str) -> Result<Self, SyncError> {
        Ok(serde_json::from_str(json)?)
    }

    /// Serialize this state tree back to JSON.
    pub fn to_json_string(&self) -> Result<String, SyncError> {
        Ok(serde_json::to_string(self)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_property_map_preserves_insertion_order() {
        let mut map = PropertyMap::new();
        map.insert("zeta", 1i64);
        map.insert("alpha", 2i64);
        map.insert("mid", 3i64);

        let keys: Vec<&str> = map.keys().collect();
        assert_eq!(keys, vec!["zeta", "alpha", "mid"]);

        // Replacement keeps the original position
        map.insert("alpha", 99i64);
        let keys: Vec<&str> = map.keys().collect();
        assert_eq!(keys, vec!["zeta", "alpha", "mid"]);
        assert_eq!(map.get("alpha"), Some(&Value::Integer(99)));
    }

    #[test]
    fn test_property_map_round_trips_as_json_object() {
        let mut map = PropertyMap::new();
        map.insert("visibility", true);
        map.insert("opacity", 0.5f64);
        map.insert("name", "actor0");

        let json = serde_json::to_string(&map).unwrap();
        assert_eq!(
            json,
            r#"{"visibility":true,"opacity":0.5,"name":"actor0"}"#
        );

        let back: PropertyMap = serde_json::from_str(&json).unwrap();
        assert_eq!(back, map);
    }

    #[test]
    fn test_value_parses_all_json_shapes() {
        let value: Value =
            serde_json::from_str(r#"{"a": null, "b": [1, 2.5, "x"], "c": {"d": false}}"#).unwrap();

        let map = value.as_map().expect("top level object");
        assert!(map.get("a").unwrap().is_null());
        let seq = map.get("b").unwrap().as_sequence().unwrap();
        assert_eq!(seq[0], Value::Integer(1));
        assert_eq!(seq[1], Value::Float(2.5));
        assert_eq!(seq[2], Value::String("x".to_string()));
        let nested = map.get("c").unwrap().as_map().unwrap();
        assert_eq!(nested.get("d"), Some(&Value::Bool(false)));
    }

    #[test]
    fn test_call_serializes_as_tuple() {
        let call = Call::new("setMapper", vec![Value::from("instance:${mapper1}")]);
        let json = serde_json::to_string(&call).unwrap();
        assert_eq!(json, r#"["setMapper",["instance:${mapper1}"]]"#);

        let back: Call = serde_json::from_str(&json).unwrap();
        assert_eq!(back, call);
    }

    #[test]
    fn test_state_node_defaults_for_missing_sections() {
        let node = StateNode::from_json_str(r#"{"id": "root", "type": "RenderWindow"}"#).unwrap();
        assert_eq!(node.id, "root");
        assert_eq!(node.type_name, "RenderWindow");
        assert!(node.properties.is_empty());
        assert!(node.dependencies.is_empty());
        assert!(node.calls.is_empty());
    }

    #[test]
    fn test_state_node_parses_full_tree() {
        let json = r#"
        {
            "id": "rw1",
            "type": "RenderWindow",
            "properties": {"numberOfLayers": 1},
            "dependencies": [
                {
                    "id": "ren1",
                    "type": "Renderer",
                    "properties": {"background": [0.0, 0.0, 0.0]},
                    "dependencies": [
                        {"id": "actor1", "type": "Actor"}
                    ],
                    "calls": [["addActor", ["instance:${actor1}"]]]
                }
            ]
        }"#;

        let node = StateNode::from_json_str(json).unwrap();
        assert_eq!(node.dependencies.len(), 1);
        let renderer = &node.dependencies[0];
        assert_eq!(renderer.type_name, "Renderer");
        assert_eq!(renderer.dependencies[0].id, "actor1");
        assert_eq!(renderer.calls[0].method, "addActor");

        // Round trip preserves structure
        let back = StateNode::from_json_str(&node.to_json_string().unwrap()).unwrap();
        assert_eq!(back, node);
    }

    #[test]
    fn test_value_accessors() {
        assert_eq!(Value::Integer(3).as_f64(), Some(3.0));
        assert_eq!(Value::Float(2.5).as_f64(), Some(2.5));
        assert_eq!(Value::Bool(true).as_bool(), Some(true));
        assert_eq!(Value::from("s").as_str(), Some("s"));
        assert_eq!(Value::Null.as_f64(), None);
    }
}
