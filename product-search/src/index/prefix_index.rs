//! Prefix tree for autocomplete.
//!
//! Words are matched on their case-folded form and returned in the spelling they were
//! last inserted with. Words inserted for a product are owned by that product and
//! disappear once no product owns them; plain inserts are permanent.

use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::{PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

#[derive(Debug, Default)]
struct Node {
    children: BTreeMap<char, Node>,
    /// Display spelling when a complete word ends here.
    terminal: Option<String>,
}

impl Node {
    /// Push every word at or below this node, in key order.
    fn collect(&self, out: &mut Vec<String>) {
        let mut stack = vec![self];
        while let Some(node) = stack.pop() {
            if let Some(display) = &node.terminal {
                out.push(display.clone());
            }
            stack.extend(node.children.values().rev());
        }
    }
}

// Iterative teardown; the derived drop would recurse once per level.
impl Drop for Node {
    fn drop(&mut self) {
        let mut stack: Vec<Node> = std::mem::take(&mut self.children).into_values().collect();
        while let Some(mut node) = stack.pop() {
            stack.extend(std::mem::take(&mut node.children).into_values());
        }
    }
}

#[derive(Debug, Default)]
struct Trie {
    root: Node,
    /// Folded word -> products whose name it is.
    owners: HashMap<String, HashSet<String>>,
    /// Product -> folded word currently inserted for it.
    product_words: HashMap<String, String>,
    /// Folded words inserted without an owner.
    permanent: HashSet<String>,
}

impl Trie {
    fn insert_word(&mut self, folded: &str, display: &str) {
        let mut node = &mut self.root;
        for c in folded.chars() {
            node = node.children.entry(c).or_default();
        }
        node.terminal = Some(display.to_string());
    }

    fn find(&self, folded: &str) -> Option<&Node> {
        let mut node = &self.root;
        for c in folded.chars() {
            node = node.children.get(&c)?;
        }
        Some(node)
    }

    /// Unmark `folded` and prune the branch that only served it.
    fn remove_word(&mut self, folded: &str) {
        let chars: Vec<char> = folded.chars().collect();

        // Deepest node on the path that must survive: it ends a word or forks.
        let mut cut = 0;
        let mut node = &self.root;
        for (depth, c) in chars.iter().enumerate() {
            if node.terminal.is_some() || node.children.len() > 1 {
                cut = depth;
            }
            node = match node.children.get(c) {
                Some(child) => child,
                None => return,
            };
        }
        if node.terminal.is_none() {
            return;
        }
        let keep_target = !node.children.is_empty();

        let stop = if keep_target { chars.len() } else { cut };
        let mut node = &mut self.root;
        for c in &chars[..stop] {
            node = match node.children.get_mut(c) {
                Some(child) => child,
                None => return,
            };
        }

        if keep_target {
            node.terminal = None;
        } else if let Some(c) = chars.get(cut) {
            node.children.remove(c);
        }
    }

    fn release(&mut self, product_id: &str, folded: &str) {
        let orphaned = match self.owners.get_mut(folded) {
            Some(owners) => {
                owners.remove(product_id);
                owners.is_empty()
            }
            None => true,
        };
        if orphaned {
            self.owners.remove(folded);
            if !self.permanent.contains(folded) {
                self.remove_word(folded);
            }
        }
    }
}

/// Longest word kept in the index, in characters. Longer names are truncated.
pub const MAX_WORD_CHARS: usize = 256;

fn fold(text: &str) -> String {
    text.trim().to_lowercase()
}

/// Folded key and display spelling of a word to insert, both truncated.
fn fold_word(text: &str) -> (String, String) {
    let display: String = text.trim().chars().take(MAX_WORD_CHARS).collect();
    let folded = fold(&display).chars().take(MAX_WORD_CHARS).collect();
    (folded, display)
}

/// Concurrent prefix index over product names.
///
/// Readers run in parallel; writers are serialized and exclude readers.
#[derive(Debug, Default)]
pub struct PrefixIndex {
    inner: RwLock<Trie>,
}

impl PrefixIndex {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create an index preloaded with permanent words.
    #[cfg(test)]
    pub fn with_words<I, S>(words: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let index = Self::new();
        for word in words {
            index.insert(word.as_ref());
        }
        index
    }

    fn read(&self) -> RwLockReadGuard<'_, Trie> {
        self.inner.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, Trie> {
        self.inner.write().unwrap_or_else(PoisonError::into_inner)
    }

    /// Insert a permanent word. Blank text is ignored.
    pub fn insert(&self, text: &str) {
        let (folded, display) = fold_word(text);
        if folded.is_empty() {
            return;
        }
        let mut trie = self.write();
        trie.permanent.insert(folded.clone());
        trie.insert_word(&folded, &display);
    }

    /// Insert `name` on behalf of a product, replacing the word previously inserted for it.
    ///
    /// Names longer than [`MAX_WORD_CHARS`] are indexed by their leading characters.
    ///
    /// Re-inserting the same name is a no-op apart from refreshing its spelling.
    pub fn insert_for(&self, product_id: &str, name: &str) {
        let (folded, display) = fold_word(name);
        let mut trie = self.write();

        if let Some(previous) = trie.product_words.get(product_id).cloned() {
            if previous != folded {
                trie.product_words.remove(product_id);
                trie.release(product_id, &previous);
            }
        }

        if folded.is_empty() {
            return;
        }

        trie.owners
            .entry(folded.clone())
            .or_default()
            .insert(product_id.to_string());
        trie.product_words
            .insert(product_id.to_string(), folded.clone());
        trie.insert_word(&folded, &display);
    }

    /// Release the word owned by a product. Returns true if the product had one.
    pub fn remove_product(&self, product_id: &str) -> bool {
        let mut trie = self.write();
        match trie.product_words.remove(product_id) {
            Some(folded) => {
                trie.release(product_id, &folded);
                true
            }
            None => false,
        }
    }

    /// All words whose folded form starts with the folded prefix, sorted.
    pub fn suggest(&self, prefix: &str) -> Vec<String> {
        let folded = fold(prefix);
        let trie = self.read();
        let mut out = Vec::new();
        if let Some(node) = trie.find(&folded) {
            node.collect(&mut out);
        }
        out
    }

    /// Every word in the index, sorted.
    pub fn get_all(&self) -> Vec<String> {
        let mut out = Vec::new();
        self.read().root.collect(&mut out);
        out
    }

    /// Returns true if `word` is a complete word in the index.
    #[cfg(test)]
    pub fn contains(&self, word: &str) -> bool {
        let folded = fold(word);
        self.read()
            .find(&folded)
            .is_some_and(|node| node.terminal.is_some())
    }
}
