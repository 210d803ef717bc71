use indexmap::IndexMap;

use crate::error::Error;

#[derive(Debug, Clone, Default)]
pub struct Label {
    /// Byte address, once defined.
    pub addr: Option<u32>,
    /// Line of definition, or of first use while still undefined.
    pub line: usize,
    /// Queue slots of jumps waiting for this label.
    pub pending: Vec<usize>,
}

/// Symbol table for one assembly run.
#[derive(Debug, Default)]
pub struct LabelManager {
    labels: IndexMap<String, Label>,
}

impl LabelManager {
    pub fn new() -> Self {
        LabelManager::default()
    }

    /// Bind `name` to `addr`, returning the slots that were waiting for it.
    pub fn define(&mut self, name: &str, addr: u32, line: usize) -> Result<Vec<usize>, Error> {
        let entry = self.labels.entry(name.to_string()).or_default();
        if entry.addr.is_some() {
            return Err(Error::RedefinedLabel {
                name: name.to_string(),
                first: entry.line,
            });
        }
        entry.addr = Some(addr);
        entry.line = line;
        Ok(std::mem::take(&mut entry.pending))
    }

    /// Address of `name` if known. Otherwise `slot` is recorded as pending on it.
    pub fn reference(&mut self, name: &str, slot: usize, line: usize) -> Option<u32> {
        let entry = self.labels.entry(name.to_string()).or_insert_with(|| Label {
            line,
            ..Label::default()
        });
        match entry.addr {
            Some(addr) => Some(addr),
            None => {
                entry.pending.push(slot);
                None
            }
        }
    }

    pub fn get(&self, name: &str) -> Option<u32> {
        self.labels.get(name).and_then(|label| label.addr)
    }

    /// Names referenced but never defined, in order of first use.
    pub fn unresolved(&self) -> Vec<String> {
        self.labels
            .iter()
            .filter(|(_, label)| label.addr.is_none())
            .map(|(name, _)| name.clone())
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn backward_reference_resolves_immediately() {
        let mut labels = LabelManager::new();
        assert_eq!(labels.define("loop", 0x10, 1).unwrap(), Vec::<usize>::new());
        assert_eq!(labels.reference("loop", 7, 2), Some(0x10));
    }

    #[test]
    fn forward_reference_waits() {
        let mut labels = LabelManager::new();
        assert_eq!(labels.reference("end", 0, 1), None);
        assert_eq!(labels.reference("end", 3, 2), None);
        assert_eq!(labels.unresolved(), vec!["end".to_string()]);
        assert_eq!(labels.define("end", 0x40, 5).unwrap(), vec![0, 3]);
        assert!(labels.unresolved().is_empty());
        assert_eq!(labels.get("end"), Some(0x40));
    }

    #[test]
    fn double_definition() {
        let mut labels = LabelManager::new();
        labels.define("main", 0, 3).unwrap();
        match labels.define("main", 8, 9) {
            Err(Error::RedefinedLabel { name, first }) => {
                assert_eq!(name, "main");
                assert_eq!(first, 3);
            }
            other => panic!("unexpected {other:?}"),
        }
    }
}
