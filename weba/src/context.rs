use std::cell::RefCell;
use std::rc::Rc;

use crate::{Error, Result, Tag};

#[derive(Debug, Clone)]
enum Entry {
    Open(Tag),
    /// Pushed by [`Ui::no_context`](crate::Ui::no_context); hides everything below it.
    Suppressed,
}

/// The stack of currently open tags for one task.
#[derive(Debug, Default)]
pub struct ContextStack {
    entries: RefCell<Vec<Entry>>,
}

impl ContextStack {
    /// An empty stack.
    pub fn new() -> Self {
        Self::default()
    }

    /// Open `tag`. A tag may be open at most once.
    pub fn push(&self, tag: &Tag) -> Result<()> {
        let mut entries = self.entries.borrow_mut();
        let already_open = entries
            .iter()
            .any(|entry| matches!(entry, Entry::Open(open) if open.same_node(tag)));
        if already_open {
            return Err(Error::AlreadyOpen { name: tag.name() });
        }
        tracing::trace!(tag = %tag.name(), depth = entries.len() + 1, "context push");
        entries.push(Entry::Open(tag.clone()));
        Ok(())
    }

    pub(crate) fn suppress(&self) {
        tracing::trace!("context suppressed");
        self.entries.borrow_mut().push(Entry::Suppressed);
    }

    /// Remove the top entry, returning its tag (`None` for a suppression marker).
    pub fn pop(&self) -> Result<Option<Tag>> {
        let entry = self
            .entries
            .borrow_mut()
            .pop()
            .ok_or(Error::StackUnderflow)?;
        tracing::trace!(depth = self.depth(), "context pop");
        Ok(match entry {
            Entry::Open(tag) => Some(tag),
            Entry::Suppressed => None,
        })
    }

    /// The tag new nodes are appended to, if any.
    pub fn current(&self) -> Option<Tag> {
        match self.entries.borrow().last() {
            Some(Entry::Open(tag)) => Some(tag.clone()),
            _ => None,
        }
    }

    /// Number of entries, suppression markers included.
    pub fn depth(&self) -> usize {
        self.entries.borrow().len()
    }

    /// Whether nothing is open.
    pub fn is_empty(&self) -> bool {
        self.depth() == 0
    }

    /// Whether `tag` is open anywhere on the stack.
    pub fn contains(&self, tag: &Tag) -> bool {
        self.entries
            .borrow()
            .iter()
            .any(|entry| matches!(entry, Entry::Open(open) if open.same_node(tag)))
    }

    /// Drop entries above `depth`, returning how many were removed.
    fn truncate(&self, depth: usize) -> usize {
        let mut entries = self.entries.borrow_mut();
        let removed = entries.len().saturating_sub(depth);
        entries.truncate(depth);
        removed
    }

    fn top_is(&self, tag: Option<&Tag>) -> bool {
        match (self.entries.borrow().last(), tag) {
            (Some(Entry::Open(open)), Some(tag)) => open.same_node(tag),
            (Some(Entry::Suppressed), None) => true,
            _ => false,
        }
    }
}

/// Keeps a tag open until dropped. Returned by [`Ui::enter`](crate::Ui::enter).
#[must_use = "the tag is closed again as soon as the guard is dropped"]
pub struct ContextGuard {
    stack: Rc<ContextStack>,
    tag: Option<Tag>,
    depth: usize,
}

impl ContextGuard {
    pub(crate) fn open(stack: Rc<ContextStack>, tag: &Tag) -> Result<Self> {
        let depth = stack.depth();
        stack.push(tag)?;
        Ok(Self {
            stack,
            tag: Some(tag.clone()),
            depth,
        })
    }

    pub(crate) fn suppress(stack: Rc<ContextStack>) -> Self {
        let depth = stack.depth();
        stack.suppress();
        Self {
            stack,
            tag: None,
            depth,
        }
    }

    /// The tag held open, or `None` for a [`Ui::no_context`](crate::Ui::no_context) guard.
    pub fn tag(&self) -> Option<&Tag> {
        self.tag.as_ref()
    }
}

impl Drop for ContextGuard {
    fn drop(&mut self) {
        let depth = self.stack.depth();
        if depth == self.depth + 1 && self.stack.top_is(self.tag.as_ref()) {
            // A single entry was pushed by this guard, so the pop cannot fail
            let _ = self.stack.pop();
            return;
        }
        if depth <= self.depth {
            tracing::warn!(
                expected_depth = self.depth + 1,
                depth,
                "context guard dropped after its entry was already popped"
            );
            return;
        }
        let removed = self.stack.truncate(self.depth);
        tracing::warn!(
            removed,
            "context guard dropped out of order; closing entries opened after it"
        );
    }
}
