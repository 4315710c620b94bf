//! VMware descriptor format (`.vmx`, `preferences.ini`, `inventory.vmls`)
//!
//! One `key = "value"` entry per line. Values are always written quoted and
//! keys are written in sorted order so output is deterministic.
//!
//! Values containing `"` or line breaks cannot be represented: quotes at
//! either end of a value are stripped on read.

use anyhow::{bail, Context, Result};
use serde::ser::{Serialize, SerializeMap, Serializer};
use std::collections::BTreeMap;
use std::path::Path;

#[cfg(windows)]
const LINE_ENDING: &str = "\r\n";
#[cfg(not(windows))]
const LINE_ENDING: &str = "\n";

/// Descriptor value for a boolean setting
pub fn vmx_bool(value: bool) -> &'static str {
    if value {
        "TRUE"
    } else {
        "FALSE"
    }
}

/// Key/value entries of a descriptor file, kept in file order.
///
/// A repeated key keeps its first position and takes the last value.
/// Equality ignores order.
#[derive(Debug, Clone, Default)]
pub struct DescriptorMap {
    entries: Vec<(String, String)>,
}

impl DescriptorMap {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.entries
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    /// Set a value, returning the previous one
    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<String>) -> Option<String> {
        let key = key.into();
        let value = value.into();
        match self.entries.iter_mut().find(|(k, _)| *k == key) {
            Some((_, existing)) => Some(std::mem::replace(existing, value)),
            None => {
                self.entries.push((key, value));
                None
            }
        }
    }

    /// Copy every entry of `other` into this map, returning the keys whose
    /// value was added or changed
    pub fn merge(&mut self, other: &DescriptorMap) -> Vec<String> {
        let mut changed = Vec::new();
        for (key, value) in other.iter() {
            if self.get(key) != Some(value) {
                self.insert(key, value);
                changed.push(key.to_string());
            }
        }
        changed
    }

    /// Entries in file order
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    pub fn values(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(_, v)| v.as_str())
    }

    fn sorted(&self) -> BTreeMap<&str, &str> {
        self.iter().collect()
    }
}

impl PartialEq for DescriptorMap {
    fn eq(&self, other: &Self) -> bool {
        self.sorted() == other.sorted()
    }
}

impl Eq for DescriptorMap {}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for DescriptorMap {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut map = DescriptorMap::new();
        for (k, v) in iter {
            map.insert(k, v);
        }
        map
    }
}

impl Serialize for DescriptorMap {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.entries.len()))?;
        for (k, v) in &self.entries {
            map.serialize_entry(k, v)?;
        }
        map.end()
    }
}

/// Parse descriptor text. A non-empty line without `=` is an error.
pub fn parse(text: &str) -> Result<DescriptorMap> {
    let text = text.strip_prefix('\u{feff}').unwrap_or(text);
    let mut map = DescriptorMap::new();

    for (index, line) in text.lines().enumerate() {
        let line = line.trim_end_matches('\r');
        if line.trim().is_empty() {
            continue;
        }

        let Some((key, value)) = line.split_once('=') else {
            bail!("Malformed descriptor line {}: {:?} has no '='", index + 1, line);
        };

        let key = key.trim_matches(' ');
        let value = value.trim_matches(' ').trim_matches('"');
        map.insert(key, value);
    }

    Ok(map)
}

/// Render entries sorted by key, one `key = "value"` per line
pub fn serialize(map: &DescriptorMap) -> String {
    let mut out = String::new();
    for (key, value) in map.sorted() {
        out.push_str(&format!("{} = \"{}\"", key, value));
        out.push_str(LINE_ENDING);
    }
    out
}

/// Read and parse a descriptor file
pub fn read_file(path: &Path) -> Result<DescriptorMap> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read descriptor {:?}", path))?;
    parse(&content).with_context(|| format!("Failed to parse descriptor {:?}", path))
}

/// Replace a descriptor file with the serialized map
pub fn write_file(path: &Path, map: &DescriptorMap) -> Result<()> {
    std::fs::write(path, serialize(map))
        .with_context(|| format!("Failed to write descriptor {:?}", path))
}

#[cfg(test)]
mod tests {
    use super::*;

    const VMX: &str = ".encoding = \"windows-1252\"\r\n\
config.version = \"8\"\r\n\
displayName = \"Web 01\"\r\n\
sata0:1.fileName = \"C:\\ISO\\ubuntu.iso\"\r\n\
annotation = \"a=b\"\r\n";

    #[test]
    fn test_parse_vmx() {
        let map = parse(VMX).unwrap();
        assert_eq!(map.len(), 5);
        assert_eq!(map.get(".encoding"), Some("windows-1252"));
        assert_eq!(map.get("displayName"), Some("Web 01"));
        assert_eq!(map.get("sata0:1.fileName"), Some(r"C:\ISO\ubuntu.iso"));
        // split on the first '=' only
        assert_eq!(map.get("annotation"), Some("a=b"));
    }

    #[test]
    fn test_parse_keeps_file_order_and_last_value() {
        let map = parse("b = \"1\"\na = \"2\"\nb = \"3\"\n").unwrap();
        let entries: Vec<_> = map.iter().collect();
        assert_eq!(entries, vec![("b", "3"), ("a", "2")]);
    }

    #[test]
    fn test_parse_skips_blank_lines() {
        let map = parse("\n  \na = \"1\"\n\n").unwrap();
        assert_eq!(map.len(), 1);
    }

    #[test]
    fn test_parse_rejects_line_without_equals() {
        let err = parse("a = \"1\"\ngarbage\n").unwrap_err();
        assert!(err.to_string().contains("line 2"));
    }

    #[test]
    fn test_serialize_sorted_and_quoted() {
        let map: DescriptorMap = [("memsize", "4096"), ("displayName", "Web"), ("ide1:0.present", vmx_bool(true))]
            .into_iter()
            .collect();
        let expected = ["displayName = \"Web\"", "ide1:0.present = \"TRUE\"", "memsize = \"4096\""]
            .iter()
            .map(|l| format!("{}{}", l, LINE_ENDING))
            .collect::<String>();
        assert_eq!(serialize(&map), expected);
    }

    #[test]
    fn test_serialize_is_independent_of_insertion_order() {
        let a: DescriptorMap = [("x", "1"), ("a", "2"), ("m", "3")].into_iter().collect();
        let b: DescriptorMap = [("m", "3"), ("x", "1"), ("a", "2")].into_iter().collect();
        assert_eq!(serialize(&a), serialize(&b));
        assert_eq!(a, b);
    }

    #[test]
    fn test_round_trip() {
        let map: DescriptorMap = [
            ("sata0:1.fileName", r"C:\ISO\win 11.iso"),
            ("sata0:1.present", "FALSE"),
            ("empty", ""),
            ("guestOS", "windows11-64"),
        ]
        .into_iter()
        .collect();
        assert_eq!(parse(&serialize(&map)).unwrap(), map);
    }

    #[test]
    fn test_merge_reports_changed_keys() {
        let mut current: DescriptorMap = [("a", "1"), ("b", "2")].into_iter().collect();
        let changes: DescriptorMap = [("a", "1"), ("b", "5"), ("c", "6")].into_iter().collect();
        assert_eq!(current.merge(&changes), vec!["b".to_string(), "c".to_string()]);
        assert_eq!(current.get("b"), Some("5"));
        assert_eq!(current.get("c"), Some("6"));
    }

    #[test]
    fn test_read_write_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("web.vmx");
        std::fs::write(&path, VMX).unwrap();

        let mut map = read_file(&path).unwrap();
        map.insert("memsize", "2048");
        write_file(&path, &map).unwrap();

        let reread = read_file(&path).unwrap();
        assert_eq!(reread, map);
        let content = std::fs::read_to_string(&path).unwrap();
        assert!(content.starts_with(".encoding = \"windows-1252\""));
    }
}
