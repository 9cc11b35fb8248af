use std::collections::HashMap;
use std::hash::Hash;

/// Draft text keyed by the entity it belongs to. Missing keys read as empty.
#[derive(Debug, Clone)]
pub struct Drafts<K> {
    entries: HashMap<K, String>,
}

impl<K> Default for Drafts<K> {
    fn default() -> Self {
        Self {
            entries: HashMap::new(),
        }
    }
}

impl<K: Eq + Hash + Copy> Drafts<K> {
    pub fn get(&self, key: K) -> &str {
        self.entries.get(&key).map(String::as_str).unwrap_or("")
    }

    pub fn set(&mut self, key: K, text: impl Into<String>) {
        self.entries.insert(key, text.into());
    }

    /// Reset the entry for `key` to empty, creating it if needed.
    pub fn seed(&mut self, key: K) {
        self.entries.insert(key, String::new());
    }

    pub fn clear(&mut self, key: K) {
        if let Some(entry) = self.entries.get_mut(&key) {
            entry.clear();
        }
    }

    /// Trimmed draft text, or `None` when it is blank.
    pub fn trimmed(&self, key: K) -> Option<String> {
        let text = self.get(key).trim();
        (!text.is_empty()).then(|| text.to_string())
    }

    /// Drop entries whose owner is gone.
    pub fn retain(&mut self, mut keep: impl FnMut(&K) -> bool) {
        self.entries.retain(|k, _| keep(k));
    }

    pub fn contains(&self, key: K) -> bool {
        self.entries.contains_key(&key)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
