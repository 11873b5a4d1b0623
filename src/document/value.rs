use std::hash::{Hash, Hasher};

use indexmap::IndexMap;

#[derive(Debug, Clone, PartialEq, Default)]
pub enum Value {
    #[default]
    Nil,
    Bool(bool),
    Number(f64),
    String(String),
    Table(Table),
}

impl Value {
    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Nil => "nil",
            Value::Bool(_) => "boolean",
            Value::Number(_) => "number",
            Value::String(_) => "string",
            Value::Table(_) => "table",
        }
    }

    pub fn is_nil(&self) -> bool {
        matches!(self, Value::Nil)
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Number(n) => Some(*n),
            _ => None,
        }
    }

    pub fn as_table(&self) -> Option<&Table> {
        match self {
            Value::Table(table) => Some(table),
            _ => None,
        }
    }

    /// Follows a chain of string keys through nested tables.
    pub fn lookup(&self, keys: &[&str]) -> Option<&Value> {
        keys.iter()
            .try_fold(self, |value, key| value.as_table()?.get_str(key))
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}

impl From<f64> for Value {
    fn from(n: f64) -> Self {
        Value::Number(n)
    }
}

impl From<i32> for Value {
    fn from(n: i32) -> Self {
        Value::Number(n.into())
    }
}

impl From<u32> for Value {
    fn from(n: u32) -> Self {
        Value::Number(n.into())
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::String(s.to_owned())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::String(s)
    }
}

impl From<Table> for Value {
    fn from(table: Table) -> Self {
        Value::Table(table)
    }
}

/// A table whose pairs keep the order in which their keys were first
/// inserted. Reassigning an existing key keeps its position; assigning nil
/// removes it.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Table {
    entries: IndexMap<Key, Value>,
}

/// Hashable wrapper for table keys. Keys are never nil or NaN, and `-0`
/// hashes the same as `0` since they compare equal.
#[derive(Debug, Clone, PartialEq)]
struct Key(Value);

impl Eq for Key {}

impl Hash for Key {
    fn hash<H: Hasher>(&self, state: &mut H) {
        match &self.0 {
            Value::Nil => 0u8.hash(state),
            Value::Bool(b) => (1u8, b).hash(state),
            Value::Number(n) => (2u8, (n + 0.0).to_bits()).hash(state),
            Value::String(s) => (3u8, s).hash(state),
            Value::Table(table) => (4u8, table.len()).hash(state),
        }
    }
}

/// Key-value pairs of a [`Table`] in insertion order.
pub struct Iter<'a>(indexmap::map::Iter<'a, Key, Value>);

impl<'a> Iterator for Iter<'a> {
    type Item = (&'a Value, &'a Value);

    fn next(&mut self) -> Option<Self::Item> {
        self.0.next().map(|(key, value)| (&key.0, value))
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.0.size_hint()
    }
}

impl Table {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> Iter<'_> {
        Iter(self.entries.iter())
    }

    pub fn get(&self, key: &Value) -> Option<&Value> {
        self.entries.get(&Key(key.clone()))
    }

    pub fn get_str(&self, key: &str) -> Option<&Value> {
        self.get(&Value::from(key))
    }

    pub fn get_mut(&mut self, key: &Value) -> Option<&mut Value> {
        self.entries.get_mut(&Key(key.clone()))
    }

    pub fn set(&mut self, key: Value, value: Value) {
        if value.is_nil() {
            self.entries.shift_remove(&Key(key));
        } else {
            self.entries.insert(Key(key), value);
        }
    }

    /// Builder-style [`Table::set`] with a string key.
    pub fn with(mut self, key: &str, value: impl Into<Value>) -> Self {
        self.set(Value::from(key), value.into());
        self
    }

    /// Appends `value` under the next sequential integer key.
    pub fn push(&mut self, value: impl Into<Value>) {
        let next = self
            .iter()
            .filter_map(|(k, _)| k.as_f64())
            .filter(|n| n.fract() == 0.0 && *n >= 1.0)
            .fold(0.0, f64::max)
            + 1.0;
        self.set(Value::Number(next), value.into());
    }
}

impl<'a> IntoIterator for &'a Table {
    type Item = (&'a Value, &'a Value);
    type IntoIter = Iter<'a>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

impl FromIterator<(Value, Value)> for Table {
    fn from_iter<T: IntoIterator<Item = (Value, Value)>>(iter: T) -> Self {
        let mut table = Table::new();
        for (key, value) in iter {
            table.set(key, value);
        }
        table
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn set_preserves_insertion_order() {
        let mut table = Table::new();
        table.set("b".into(), 1.into());
        table.set("a".into(), 2.into());
        table.set("b".into(), 3.into());
        let keys: Vec<_> = table.iter().map(|(k, _)| k.as_str().unwrap()).collect();
        assert_eq!(keys, ["b", "a"]);
        assert_eq!(table.get_str("b"), Some(&Value::Number(3.0)));
    }

    #[test]
    fn nil_assignment_removes_key() {
        let mut table = Table::new().with("x", 1).with("y", 2);
        table.set("x".into(), Value::Nil);
        assert_eq!(table.len(), 1);
        assert!(table.get_str("x").is_none());
    }

    #[test]
    fn integral_number_keys_match() {
        let mut table = Table::new();
        table.push("first");
        table.push("second");
        assert_eq!(table.get(&Value::Number(2.0)), Some(&Value::from("second")));
    }

    #[test]
    fn negative_zero_is_the_same_key() {
        let mut table = Table::new();
        table.set(Value::Number(0.0), "zero".into());
        table.set(Value::Number(-0.0), "again".into());
        assert_eq!(table.len(), 1);
        assert_eq!(table.get(&Value::Number(0.0)), Some(&Value::from("again")));
    }

    #[test]
    fn large_tables_keep_order_and_lookups() {
        let mut table = Table::new();
        for i in 0..50_000 {
            table.set(Value::from(format!("key{i}")), Value::from(i));
        }
        table.set("key10".into(), Value::Nil);
        table.set("key20".into(), 7.into());

        assert_eq!(table.len(), 49_999);
        assert_eq!(table.get_str("key49999"), Some(&Value::Number(49_999.0)));
        assert_eq!(table.get_str("key20"), Some(&Value::Number(7.0)));
        let keys: Vec<_> = table.iter().take(12).map(|(k, _)| k.as_str().unwrap()).collect();
        assert_eq!(
            keys,
            ["key0", "key1", "key2", "key3", "key4", "key5", "key6", "key7", "key8", "key9", "key11", "key12"]
        );
    }

    #[test]
    fn lookup_walks_nested_tables() {
        let value = Value::from(Table::new().with("weather", Table::new().with("qnh", 760)));
        assert_eq!(
            value.lookup(&["weather", "qnh"]).and_then(Value::as_f64),
            Some(760.0)
        );
        assert!(value.lookup(&["weather", "clouds"]).is_none());
    }
}
