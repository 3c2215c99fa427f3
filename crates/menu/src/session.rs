use std::time::{Duration, Instant};

use firstmate_common::OperatorId;

use crate::node::MenuNode;

/// A staged change awaiting confirmation.
///
/// Both mutations of the channel settings go through the confirmation
/// screen; committing resolves the staged value into a full
/// [`firstmate_settings::ConfigUpdate`] against the current record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PendingChange {
    SetEnabled(bool),
    SetText(String),
}

/// Transient per-operator navigation state.
///
/// Never persisted: a process restart puts every operator back at the root
/// menu with a fresh epoch, which is what invalidates pre-restart keyboards.
#[derive(Debug)]
pub struct OperatorSession {
    pub operator_id: OperatorId,
    pub node: MenuNode,
    stack: Vec<MenuNode>,
    pub pending: Option<PendingChange>,
    /// Stale-press token; embedded in every rendered keyboard.
    pub epoch: u64,
    last_active: Instant,
}

impl OperatorSession {
    #[must_use]
    pub fn new(operator_id: OperatorId, epoch: u64) -> Self {
        Self {
            operator_id,
            node: MenuNode::Root,
            stack: Vec::new(),
            pending: None,
            epoch,
            last_active: Instant::now(),
        }
    }

    /// Enter a child screen, remembering the current one for `Back`.
    pub fn descend(&mut self, to: MenuNode) {
        debug_assert!(self.stack.len() < MenuNode::TREE_DEPTH);
        self.stack.push(self.node);
        self.node = to;
    }

    /// Return to the previous screen. Popping an empty stack stays at root.
    pub fn back(&mut self) {
        self.node = self.stack.pop().unwrap_or(MenuNode::Root);
    }

    /// Pop screens until `target` is current. Lands on root if `target` is
    /// not on the path.
    pub fn unwind_to(&mut self, target: MenuNode) {
        while self.node != target {
            match self.stack.pop() {
                Some(node) => self.node = node,
                None => {
                    self.node = MenuNode::Root;
                    break;
                },
            }
        }
    }

    /// Reset to the root screen, discarding navigation and staged edits.
    pub fn reset(&mut self) {
        self.node = MenuNode::Root;
        self.stack.clear();
        self.pending = None;
    }

    #[must_use]
    pub fn depth(&self) -> usize {
        self.stack.len()
    }

    pub fn touch(&mut self) {
        self.last_active = Instant::now();
    }

    #[must_use]
    pub fn is_idle(&self, timeout: Duration) -> bool {
        self.last_active.elapsed() > timeout
    }

    #[cfg(test)]
    pub fn backdate(&mut self, by: Duration) {
        if let Some(earlier) = Instant::now().checked_sub(by) {
            self.last_active = earlier;
        }
    }
}
