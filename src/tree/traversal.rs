// ============================================================================
// spark-entities - Traversal Options
// How far a tree query reaches and whether it deduplicates
// ============================================================================

/// Parameters shared by the [`Node`](crate::Node) query operations.
///
/// Queries always cover descendants of the starting node, never the node
/// itself.
///
/// # Example
///
/// ```
/// use spark_entities::TraversalOptions;
///
/// let opts = TraversalOptions::recursive().unique();
/// assert!(opts.recursive && opts.unique && !opts.from_root);
/// ```
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TraversalOptions {
    /// Descend below direct children.
    pub recursive: bool,
    /// Suppress value-equal items across the whole traversal.
    pub unique: bool,
    /// Start from the root of the tree instead of this node.
    pub from_root: bool,
}

impl TraversalOptions {
    /// Direct children only.
    pub fn direct() -> Self {
        Self::default()
    }

    /// The full subtree.
    pub fn recursive() -> Self {
        Self {
            recursive: true,
            ..Self::default()
        }
    }

    pub fn unique(mut self) -> Self {
        self.unique = true;
        self
    }

    pub fn from_root(mut self) -> Self {
        self.from_root = true;
        self
    }

    /// The same options once the query has been redirected to the root.
    pub(crate) fn at_root(mut self) -> Self {
        self.from_root = false;
        self
    }
}

/// Duplicate policy for [`Node::insert_child`](crate::Node::insert_child).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum InsertMode {
    /// Always append.
    #[default]
    Always,
    /// Skip when a direct child holds an equal item.
    UniqueAmongChildren,
    /// Skip when any descendant holds an equal item.
    UniqueInSubtree,
    /// Skip when the root or any of its descendants holds an equal item.
    UniqueInTree,
}

impl InsertMode {
    /// The existence check this mode performs, if any.
    pub fn existence_check(self) -> Option<TraversalOptions> {
        match self {
            InsertMode::Always => None,
            InsertMode::UniqueAmongChildren => Some(TraversalOptions::direct()),
            InsertMode::UniqueInSubtree => Some(TraversalOptions::recursive()),
            InsertMode::UniqueInTree => Some(TraversalOptions::recursive().from_root()),
        }
    }
}

impl From<bool> for InsertMode {
    /// `true` is the shallow unique check, `false` always appends.
    fn from(unique: bool) -> Self {
        if unique {
            InsertMode::UniqueAmongChildren
        } else {
            InsertMode::Always
        }
    }
}
