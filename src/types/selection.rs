use crate::types::snippet::SnippetId;

/// Multi-selection of snippets, kept in the order they were picked.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SnippetIdSet {
    ids: Vec<SnippetId>,
}

impl SnippetIdSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn contains(&self, id: SnippetId) -> bool {
        self.ids.contains(&id)
    }

    /// Returns false if the id was already present.
    pub fn add(&mut self, id: SnippetId) -> bool {
        if self.contains(id) {
            return false;
        }
        self.ids.push(id);
        true
    }

    pub fn remove(&mut self, id: SnippetId) -> bool {
        match self.ids.iter().position(|&s| s == id) {
            Some(pos) => {
                self.ids.remove(pos);
                true
            }
            None => false,
        }
    }

    pub fn toggle(&mut self, id: SnippetId) {
        if !self.remove(id) {
            self.ids.push(id);
        }
    }

    pub fn clear(&mut self) {
        self.ids.clear();
    }

    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = SnippetId> + '_ {
        self.ids.iter().copied()
    }

    pub fn as_slice(&self) -> &[SnippetId] {
        &self.ids
    }
}

impl FromIterator<SnippetId> for SnippetIdSet {
    fn from_iter<I: IntoIterator<Item = SnippetId>>(iter: I) -> Self {
        let mut set = SnippetIdSet::new();
        for id in iter {
            set.add(id);
        }
        set
    }
}
