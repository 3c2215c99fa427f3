/// One screen of the operator menu.
///
/// The tree is fixed:
///
/// ```text
/// Root ── Settings ── ChannelSettings ── TextEditor ── Confirm
/// ```
///
/// `Confirm` is also reachable directly from `ChannelSettings` (flag
/// toggle), so `TextEditor` is not always on the back-stack beneath it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum MenuNode {
    #[default]
    Root,
    Settings,
    ChannelSettings,
    TextEditor,
    Confirm,
}

impl MenuNode {
    /// Maximum number of ancestors any node has; the back-stack can never
    /// legally grow past this.
    pub const TREE_DEPTH: usize = 4;

    /// Whether this node accepts a free-text message from the operator.
    #[must_use]
    pub fn awaits_text(self) -> bool {
        matches!(self, Self::TextEditor)
    }
}
