//! Import lists
//!
//! Entries are fully-qualified class names. Deduplication is exact and
//! case-sensitive; the first occurrence keeps its position.

use indexmap::IndexSet;

/// Ordered, duplicate-free list of class imports
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ImportList {
    entries: IndexSet<String>,
}

impl ImportList {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a class; returns false when the exact string was already present
    pub fn push(&mut self, fqcn: impl Into<String>) -> bool {
        self.entries.insert(fqcn.into())
    }

    pub fn extend<I, S>(&mut self, items: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        for item in items {
            self.push(item);
        }
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(String::as_str)
    }

    /// `use X;` lines, one per entry
    pub fn lines(&self) -> Vec<String> {
        self.iter().map(|fqcn| format!("use {fqcn};")).collect()
    }

    /// All `use` lines joined by newlines
    pub fn render(&self) -> String {
        self.lines().join("\n")
    }
}

impl<S: Into<String>> FromIterator<S> for ImportList {
    fn from_iter<I: IntoIterator<Item = S>>(iter: I) -> Self {
        let mut list = ImportList::new();
        list.extend(iter);
        list
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_first_occurrence_wins() {
        let list: ImportList = ["B\\Two", "A\\One", "B\\Two"].into_iter().collect();
        assert_eq!(list.render(), "use B\\Two;\nuse A\\One;");
    }

    #[test]
    fn test_dedup_is_exact() {
        let mut list = ImportList::new();
        assert!(list.push("App\\Models\\User"));
        assert!(!list.push("App\\Models\\User"));
        assert!(list.push("\\App\\Models\\User"));
        assert!(list.push("app\\models\\user"));
        assert_eq!(list.len(), 3);
    }
}
