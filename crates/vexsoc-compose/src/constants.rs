//! Configuration constants handed to the firmware build.

use std::fmt;

use serde::Serialize;

use crate::error::{ComposeError, Result};

/// Value of a configuration constant.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum ConstantValue {
    Int(u64),
    Str(String),
    /// Presence-only marker; only the definition itself carries meaning.
    Defined,
}

impl fmt::Display for ConstantValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConstantValue::Int(v) => write!(f, "{v}"),
            ConstantValue::Str(s) => write!(f, "\"{s}\""),
            ConstantValue::Defined => write!(f, "(defined)"),
        }
    }
}

/// A named constant.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Constant {
    pub name: String,
    pub value: ConstantValue,
}

/// Insertion-ordered table of uniquely named constants.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ConstantTable {
    entries: Vec<Constant>,
}

fn is_identifier(name: &str) -> bool {
    let mut chars = name.chars();
    match chars.next() {
        Some(c) if c.is_ascii_alphabetic() || c == '_' => {}
        _ => return false,
    }
    chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}

impl ConstantTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Define a constant. Re-defining with the same value is a no-op; a
    /// different value is a conflict.
    pub fn add(&mut self, name: &str, value: ConstantValue) -> Result<()> {
        if !is_identifier(name) {
            return Err(ComposeError::validation(format!(
                "constant name '{name}' is not a valid identifier"
            )));
        }
        if let Some(existing) = self.get(name) {
            if *existing == value {
                return Ok(());
            }
            return Err(ComposeError::Conflict {
                resource: format!("constant '{name}'"),
                detail: format!("already defined as {existing}, requested {value}"),
            });
        }
        tracing::debug!(name, %value, "defined constant");
        self.entries.push(Constant {
            name: name.to_string(),
            value,
        });
        Ok(())
    }

    pub fn add_int(&mut self, name: &str, value: u64) -> Result<()> {
        self.add(name, ConstantValue::Int(value))
    }

    pub fn define(&mut self, name: &str) -> Result<()> {
        self.add(name, ConstantValue::Defined)
    }

    pub fn get(&self, name: &str) -> Option<&ConstantValue> {
        self.entries
            .iter()
            .find(|c| c.name == name)
            .map(|c| &c.value)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Constant> {
        self.entries.iter()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;

    #[test]
    fn same_value_is_idempotent() {
        let mut t = ConstantTable::new();
        t.add_int("LOCALIP1", 192).unwrap();
        t.add_int("LOCALIP1", 192).unwrap();
        assert_eq!(t.len(), 1);
    }

    #[test]
    fn different_value_conflicts() {
        let mut t = ConstantTable::new();
        t.add_int("LOCALIP1", 192).unwrap();
        let err = t.add_int("LOCALIP1", 10).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Conflict);
        let err = t.define("LOCALIP1").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Conflict);
    }

    #[test]
    fn marker_is_present_without_value() {
        let mut t = ConstantTable::new();
        t.define("NETBOOT_LINUX_VEXRISCV").unwrap();
        assert_eq!(t.get("NETBOOT_LINUX_VEXRISCV"), Some(&ConstantValue::Defined));
        assert!(!t.contains("FLASHBOOT_LINUX_VEXRISCV"));
    }

    #[test]
    fn rejects_non_identifiers() {
        let mut t = ConstantTable::new();
        assert!(t.add_int("1ABC", 0).is_err());
        assert!(t.add_int("A-B", 0).is_err());
        assert!(t.is_empty());
    }

    #[test]
    fn insertion_order_preserved() {
        let mut t = ConstantTable::new();
        t.add_int("B", 1).unwrap();
        t.add_int("A", 2).unwrap();
        let names: Vec<_> = t.iter().map(|c| c.name.as_str()).collect();
        assert_eq!(names, vec!["B", "A"]);
    }
}
