use serde::ser::{Serialize, SerializeMap, Serializer};

use crate::commands::vmrun::RUNNING_HEADER;

/// VMs reported by `vmrun list`, keyed by descriptor path.
///
/// Lookups ignore case, since VMware and the inventory do not agree on the
/// casing of Windows paths.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunningSet {
    /// (descriptor path, raw listing line)
    entries: Vec<(String, String)>,
}

impl RunningSet {
    /// Parse `vmrun list` output
    pub fn parse(output: &str) -> Self {
        let entries = output
            .lines()
            .map(|line| line.trim_end_matches('\r'))
            .filter(|line| !line.trim().is_empty() && !line.contains(RUNNING_HEADER))
            .map(|line| (line.trim().to_string(), line.to_string()))
            .collect();
        Self { entries }
    }

    pub fn contains(&self, descriptor_path: &str) -> bool {
        self.line_for(descriptor_path).is_some()
    }

    /// Raw listing line for a descriptor path
    pub fn line_for(&self, descriptor_path: &str) -> Option<&str> {
        let wanted = descriptor_path.trim().to_lowercase();
        self.entries
            .iter()
            .find(|(path, _)| path.to_lowercase() == wanted)
            .map(|(_, line)| line.as_str())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl Serialize for RunningSet {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.entries.len()))?;
        for (path, line) in &self.entries {
            map.serialize_entry(path, line)?;
        }
        map.end()
    }
}
