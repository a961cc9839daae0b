//! # Tree Query Engine
//!
//! Derived, memoized views over the flat node map: children grouped by
//! slot and ordered by fractional key, plus a reverse name index. The
//! views are built lazily, at most once per document value -- a mutation
//! produces a new document with an empty cache, so a stale view can never
//! be observed.

use std::collections::{BTreeMap, HashMap};

use crate::document::Document;
use crate::error::DomError;
use crate::fractional;
use crate::id::NodeId;
use crate::node::{Node, NodeType};

/// Memoized derived views of one document value.
#[derive(Debug)]
pub(crate) struct Views {
    /// parent -> slot -> child ids, ordered by fractional key.
    children: HashMap<NodeId, BTreeMap<String, Vec<NodeId>>>,
    /// Reverse name index.
    names: HashMap<String, NodeId>,
}

impl Views {
    pub(crate) fn build(doc: &Document) -> Views {
        let mut keyed: HashMap<NodeId, BTreeMap<String, Vec<(String, NodeId)>>> = HashMap::new();
        let mut names = HashMap::with_capacity(doc.node_count());

        for node in doc.nodes().values() {
            names.insert(node.name.clone(), node.id.clone());
            if let (Some(parent), Some(slot), Some(key)) = (
                node.parent_id.as_ref(),
                node.parent_prop.as_ref(),
                node.parent_index.as_ref(),
            ) {
                keyed
                    .entry(parent.clone())
                    .or_default()
                    .entry(slot.clone())
                    .or_default()
                    .push((key.clone(), node.id.clone()));
            }
        }

        let children = keyed
            .into_iter()
            .map(|(parent, slots)| {
                let slots = slots
                    .into_iter()
                    .map(|(slot, mut entries)| {
                        entries.sort_by(|(a, _), (b, _)| fractional::compare_keys(a, b));
                        (slot, entries.into_iter().map(|(_, id)| id).collect())
                    })
                    .collect();
                (parent, slots)
            })
            .collect();

        Views { children, names }
    }

    pub(crate) fn slots(&self, parent: &NodeId) -> Option<&BTreeMap<String, Vec<NodeId>>> {
        self.children.get(parent)
    }

    pub(crate) fn children_ids(&self, parent: &NodeId, slot: &str) -> &[NodeId] {
        self.children
            .get(parent)
            .and_then(|slots| slots.get(slot))
            .map(Vec::as_slice)
            .unwrap_or_default()
    }

    pub(crate) fn name_to_id(&self, node_name: &str) -> Option<NodeId> {
        self.names.get(node_name).cloned()
    }
}

/// Where to insert a node among its future siblings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InsertPosition {
    First,
    Last,
    Before(NodeId),
    After(NodeId),
}

impl Document {
    /// All children of a node, grouped by slot, each group in visual
    /// order.
    pub fn child_nodes(&self, parent: &NodeId) -> BTreeMap<String, Vec<&Node>> {
        let views = self.views();
        let mut out = BTreeMap::new();
        if let Some(slots) = views.slots(parent) {
            for (slot, ids) in slots {
                let resolved = ids
                    .iter()
                    .filter_map(|id| self.get_maybe_node(id))
                    .collect();
                out.insert(slot.clone(), resolved);
            }
        }
        out
    }

    /// Children of one slot, in visual order.
    pub fn children(&self, parent: &NodeId, slot: &str) -> Vec<&Node> {
        self.views()
            .children_ids(parent, slot)
            .iter()
            .filter_map(|id| self.get_maybe_node(id))
            .collect()
    }

    pub fn parent(&self, id: &NodeId) -> Option<&Node> {
        let node = self.get_maybe_node(id)?;
        let parent_id = node.parent_id.as_ref()?;
        self.get_maybe_node(parent_id)
    }

    /// Pre-order flatten of all transitive children (self excluded).
    pub fn descendants(&self, id: &NodeId) -> Vec<&Node> {
        let views = self.views();
        let mut out = Vec::new();
        let mut stack: Vec<&NodeId> = Vec::new();
        push_children(views, id, &mut stack);
        while let Some(current) = stack.pop() {
            if let Some(node) = self.get_maybe_node(current) {
                out.push(node);
            }
            push_children(views, current, &mut stack);
        }
        out
    }

    /// Nodes sharing this node's parent and slot, in order, self excluded.
    pub fn siblings(&self, id: &NodeId) -> Vec<&Node> {
        let Some(node) = self.get_maybe_node(id) else {
            return Vec::new();
        };
        let (Some(parent), Some(slot)) = (node.parent_id.as_ref(), node.parent_prop.as_deref())
        else {
            return Vec::new();
        };
        self.children(parent, slot)
            .into_iter()
            .filter(|sibling| sibling.id != *id)
            .collect()
    }

    /// Chain of ancestors, root first, direct parent last.
    pub fn ancestors(&self, id: &NodeId) -> Vec<&Node> {
        let mut chain = Vec::new();
        let mut current = self.get_maybe_node(id);
        while let Some(node) = current {
            let parent = node.parent_id.as_ref().and_then(|p| self.get_maybe_node(p));
            if let Some(parent) = parent {
                chain.push(parent);
            }
            current = parent;
        }
        chain.reverse();
        chain
    }

    /// Ancestors from the direct parent up to and including the nearest
    /// `page` ancestor, nearest first. Empty when no page is above.
    pub fn page_ancestors(&self, id: &NodeId) -> Vec<&Node> {
        let mut chain = Vec::new();
        let mut current = self.get_maybe_node(id);
        while let Some(node) = current {
            let parent = node.parent_id.as_ref().and_then(|p| self.get_maybe_node(p));
            if let Some(parent) = parent {
                chain.push(parent);
                if parent.node_type == NodeType::Page {
                    return chain;
                }
            }
            current = parent;
        }
        Vec::new()
    }

    /// The page an arbitrarily deep node belongs to, if any.
    pub fn page_ancestor(&self, id: &NodeId) -> Option<&Node> {
        self.page_ancestors(id).pop()
    }

    pub fn first_child(&self, parent: &NodeId, slot: &str) -> Option<&Node> {
        let id = self.views().children_ids(parent, slot).first()?;
        self.get_maybe_node(id)
    }

    pub fn last_child(&self, parent: &NodeId, slot: &str) -> Option<&Node> {
        let id = self.views().children_ids(parent, slot).last()?;
        self.get_maybe_node(id)
    }

    pub fn sibling_before(&self, id: &NodeId) -> Option<&Node> {
        let (ids, pos) = self.sibling_position(id)?;
        if pos == 0 {
            return None;
        }
        self.get_maybe_node(&ids[pos - 1])
    }

    pub fn sibling_after(&self, id: &NodeId) -> Option<&Node> {
        let (ids, pos) = self.sibling_position(id)?;
        self.get_maybe_node(ids.get(pos + 1)?)
    }

    /// Compute a legal fractional key for inserting at a visual position,
    /// delegating to the fractional-index module for the actual key.
    pub fn key_for_position(
        &self,
        parent: &NodeId,
        slot: &str,
        position: &InsertPosition,
    ) -> Result<String, DomError> {
        let key_of = |id: &NodeId| -> Result<Option<String>, DomError> {
            Ok(self.get_node(id)?.parent_index.clone())
        };
        let (lower, upper) = match position {
            InsertPosition::First => {
                let first = self.first_child(parent, slot).map(|n| n.id.clone());
                (None, first.as_ref().map(key_of).transpose()?.flatten())
            }
            InsertPosition::Last => {
                let last = self.last_child(parent, slot).map(|n| n.id.clone());
                (last.as_ref().map(key_of).transpose()?.flatten(), None)
            }
            InsertPosition::Before(reference) => {
                self.assert_in_slot(parent, slot, reference)?;
                let lower = self
                    .sibling_before(reference)
                    .and_then(|n| n.parent_index.clone());
                (lower, key_of(reference)?)
            }
            InsertPosition::After(reference) => {
                self.assert_in_slot(parent, slot, reference)?;
                let upper = self
                    .sibling_after(reference)
                    .and_then(|n| n.parent_index.clone());
                (key_of(reference)?, upper)
            }
        };
        fractional::key_between(lower.as_deref(), upper.as_deref())
    }

    fn assert_in_slot(&self, parent: &NodeId, slot: &str, id: &NodeId) -> Result<(), DomError> {
        let node = self.get_node(id)?;
        let matches = node.parent_id.as_ref() == Some(parent)
            && node.parent_prop.as_deref() == Some(slot);
        if matches {
            Ok(())
        } else {
            Err(DomError::InvariantViolation(format!(
                "node {id} is not a child of {parent} under {slot:?}"
            )))
        }
    }

    fn sibling_position(&self, id: &NodeId) -> Option<(&[NodeId], usize)> {
        let node = self.get_maybe_node(id)?;
        let parent = node.parent_id.as_ref()?;
        let slot = node.parent_prop.as_deref()?;
        let ids = self.views().children_ids(parent, slot);
        let pos = ids.iter().position(|candidate| candidate == id)?;
        Some((ids, pos))
    }
}

fn push_children<'a>(views: &'a Views, parent: &NodeId, stack: &mut Vec<&'a NodeId>) {
    if let Some(slots) = views.slots(parent) {
        // Reverse so the stack pops slots and siblings in ascending order.
        for ids in slots.values().rev() {
            for id in ids.iter().rev() {
                stack.push(id);
            }
        }
    }
}
