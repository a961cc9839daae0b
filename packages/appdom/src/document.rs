//! # Node Store
//!
//! The document is a flat arena of id -> node, always forming a single
//! tree reachable from the root `app` node. Every operation is pure: it
//! consumes `&self` and returns a fresh [`Document`] value on success, or
//! a [`DomError`] leaving the input untouched. Untouched nodes stay
//! reference-identical across versions (persistent map of `Arc<Node>`),
//! which is what makes whole-document history snapshots and identity-keyed
//! memoization cheap.
//!
//! ## Lifecycle
//!
//! ```text
//! Document::new → create_node (detached) → add_node → edit ops → remove_node
//!       │                                     │
//!     root app                      parent_id/prop/index assigned
//! ```

use std::collections::HashSet;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, OnceLock};

use im::HashMap;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::binding::BindableValue;
use crate::error::DomError;
use crate::fractional;
use crate::id::NodeId;
use crate::merge;
use crate::name::{self, NameError};
use crate::node::{can_host, Namespace, Node, NodeType, PropBag};
use crate::queries::Views;

/// Identity tag for memo caches: every mutation produces a document value
/// with a fresh revision, so "same revision" implies "same content".
fn next_revision() -> u64 {
    static REVISION: AtomicU64 = AtomicU64::new(0);
    REVISION.fetch_add(1, Ordering::Relaxed) + 1
}

/// The full immutable tree-shaped value describing one application.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(from = "DocumentRepr", into = "DocumentRepr")]
pub struct Document {
    nodes: HashMap<NodeId, Arc<Node>>,
    root: NodeId,
    version: u64,
    revision: u64,
    views: OnceLock<Arc<Views>>,
}

/// Wire shape: `{ nodes, root, version }`. Revision and view caches are
/// process-local and never serialized.
#[derive(Serialize, Deserialize)]
struct DocumentRepr {
    nodes: HashMap<NodeId, Arc<Node>>,
    root: NodeId,
    version: u64,
}

impl From<DocumentRepr> for Document {
    fn from(repr: DocumentRepr) -> Self {
        Document {
            nodes: repr.nodes,
            root: repr.root,
            version: repr.version,
            revision: next_revision(),
            views: OnceLock::new(),
        }
    }
}

impl From<Document> for DocumentRepr {
    fn from(doc: Document) -> Self {
        DocumentRepr {
            nodes: doc.nodes,
            root: doc.root,
            version: doc.version,
        }
    }
}

impl PartialEq for Document {
    fn eq(&self, other: &Self) -> bool {
        self.root == other.root && self.version == other.version && self.nodes == other.nodes
    }
}

/// Initial field values for [`Document::create_node`].
#[derive(Debug, Clone, Default)]
pub struct NodeInit {
    pub name: Option<String>,
    pub attributes: PropBag,
    pub props: PropBag,
    pub params: PropBag,
    pub layout: PropBag,
    pub theme: PropBag,
}

/// A detached subtree produced by [`Document::clone_fragment`], ready to
/// be spliced into a document with [`Document::add_fragment`].
#[derive(Debug, Clone)]
pub struct Fragment {
    pub root: NodeId,
    pub nodes: HashMap<NodeId, Arc<Node>>,
}

impl Document {
    /// Create a document seeded with its root `app` node.
    pub fn new() -> Document {
        let root = Node {
            id: NodeId::fresh(),
            node_type: NodeType::App,
            name: "app".to_string(),
            parent_id: None,
            parent_prop: None,
            parent_index: None,
            attributes: PropBag::new(),
            props: PropBag::new(),
            params: PropBag::new(),
            layout: PropBag::new(),
            theme: PropBag::new(),
        };
        let root_id = root.id.clone();
        Document {
            nodes: HashMap::unit(root_id.clone(), Arc::new(root)),
            root: root_id,
            version: 0,
            revision: next_revision(),
            views: OnceLock::new(),
        }
    }

    // ------------------------------------------------------------------
    // Accessors and guards
    // ------------------------------------------------------------------

    pub fn root(&self) -> &NodeId {
        &self.root
    }

    /// Monotone format tag written by the producer of new documents.
    pub fn version(&self) -> u64 {
        self.version
    }

    /// Process-local identity of this document value (cache key).
    pub fn revision(&self) -> u64 {
        self.revision
    }

    pub fn nodes(&self) -> &HashMap<NodeId, Arc<Node>> {
        &self.nodes
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    /// Look a node up; `None` when absent.
    pub fn get_maybe_node(&self, id: &NodeId) -> Option<&Node> {
        self.nodes.get(id).map(Arc::as_ref)
    }

    /// Look a node up; fails loudly when absent.
    pub fn get_node(&self, id: &NodeId) -> Result<&Node, DomError> {
        self.get_maybe_node(id)
            .ok_or_else(|| DomError::NodeNotFound(id.clone()))
    }

    /// Type-checked lookup.
    pub fn get_node_of_type(&self, id: &NodeId, expected: NodeType) -> Result<&Node, DomError> {
        let node = self.get_node(id)?;
        node.assert_type(expected)?;
        Ok(node)
    }

    /// The root `app` node.
    pub fn app(&self) -> Result<&Node, DomError> {
        self.get_node_of_type(&self.root.clone(), NodeType::App)
    }

    /// Resolve a node by its document-unique name, via the memoized
    /// reverse index.
    pub fn get_node_id_by_name(&self, node_name: &str) -> Option<NodeId> {
        self.views().name_to_id(node_name)
    }

    pub(crate) fn views(&self) -> &Views {
        self.views
            .get_or_init(|| Arc::new(Views::build(self)))
            .as_ref()
    }

    // ------------------------------------------------------------------
    // Node creation and attachment
    // ------------------------------------------------------------------

    /// Build a detached node with a fresh id and a unique, syntax-valid
    /// name derived from `init.name` (or the type's default stem).
    pub fn create_node(&self, node_type: NodeType, init: NodeInit) -> Node {
        let taken = self.taken_names();
        let wanted = init.name.unwrap_or_default();
        let node_name = name::propose(&taken, &wanted, node_type.default_name());
        Node {
            id: NodeId::fresh(),
            node_type,
            name: node_name,
            parent_id: None,
            parent_prop: None,
            parent_index: None,
            attributes: init.attributes,
            props: init.props,
            params: init.params,
            layout: init.layout,
            theme: init.theme,
        }
    }

    /// Attach a detached node under `parent_id` / `parent_prop`. With no
    /// explicit `parent_index`, the node goes after the current last child.
    pub fn add_node(
        &self,
        node: Node,
        parent_id: &NodeId,
        parent_prop: &str,
        parent_index: Option<String>,
    ) -> Result<Document, DomError> {
        if node.is_attached() {
            return Err(DomError::InvariantViolation(format!(
                "node {} is already attached",
                node.id
            )));
        }
        if self.nodes.contains_key(&node.id) {
            return Err(DomError::InvariantViolation(format!(
                "node {} already exists in the document",
                node.id
            )));
        }
        let parent = self.get_node(parent_id)?;
        if !can_host(parent.node_type, parent_prop, node.node_type) {
            return Err(DomError::InvariantViolation(format!(
                "a {:?} cannot host a {:?} under {parent_prop:?}",
                parent.node_type, node.node_type
            )));
        }

        let key = self.resolve_index(parent_id, parent_prop, parent_index, None)?;
        let node_name = self.ensure_unique_name(&node.name, node.node_type);

        debug!(node = %node.id, parent = %parent_id, slot = parent_prop, "add node");

        let mut attached = node;
        attached.name = node_name;
        attached.parent_id = Some(parent_id.clone());
        attached.parent_prop = Some(parent_prop.to_string());
        attached.parent_index = Some(key);

        let nodes = merge::update(&self.nodes, [(attached.id.clone(), Arc::new(attached))]);
        Ok(self.rebuilt(nodes))
    }

    /// Re-parent an existing node (drag/drop and reordering).
    pub fn move_node(
        &self,
        id: &NodeId,
        new_parent_id: &NodeId,
        new_parent_prop: &str,
        parent_index: Option<String>,
    ) -> Result<Document, DomError> {
        let node = self.get_node(id)?;
        if !node.is_attached() {
            return Err(DomError::InvariantViolation(format!(
                "the root node {id} cannot be moved"
            )));
        }
        let parent = self.get_node(new_parent_id)?;
        if !can_host(parent.node_type, new_parent_prop, node.node_type) {
            return Err(DomError::InvariantViolation(format!(
                "a {:?} cannot host a {:?} under {new_parent_prop:?}",
                parent.node_type, node.node_type
            )));
        }
        if new_parent_id == id
            || self
                .descendants(id)
                .iter()
                .any(|descendant| descendant.id == *new_parent_id)
        {
            return Err(DomError::InvariantViolation(format!(
                "moving {id} under {new_parent_id} would create a cycle"
            )));
        }

        let key = self.resolve_index(new_parent_id, new_parent_prop, parent_index, Some(id))?;

        debug!(node = %id, parent = %new_parent_id, slot = new_parent_prop, "move node");

        let mut moved = node.clone();
        moved.parent_id = Some(new_parent_id.clone());
        moved.parent_prop = Some(new_parent_prop.to_string());
        moved.parent_index = Some(key);

        let nodes = merge::update(&self.nodes, [(id.clone(), Arc::new(moved))]);
        Ok(self.rebuilt(nodes))
    }

    /// Remove a node and, recursively, every descendant. The root cannot
    /// be removed.
    pub fn remove_node(&self, id: &NodeId) -> Result<Document, DomError> {
        let node = self.get_node(id)?;
        if !node.is_attached() {
            return Err(DomError::InvariantViolation(format!(
                "the root node {id} cannot be removed"
            )));
        }

        let mut doomed: Vec<NodeId> = vec![id.clone()];
        doomed.extend(self.descendants(id).iter().map(|n| n.id.clone()));

        debug!(node = %id, count = doomed.len(), "remove subtree");

        let nodes = merge::omit(&self.nodes, doomed.iter());
        Ok(self.rebuilt(nodes))
    }

    // ------------------------------------------------------------------
    // Node editing
    // ------------------------------------------------------------------

    /// Replace an existing node's property bags wholesale, preserving the
    /// reserved fields (`id`, `type`, `name`, parent linkage). Used after
    /// an external editor finishes a bulk edit of one node.
    pub fn save_node(&self, node: Node) -> Result<Document, DomError> {
        let existing = self.get_node(&node.id)?;
        let mut merged = existing.clone();
        merged.attributes = node.attributes;
        merged.props = node.props;
        merged.params = node.params;
        merged.layout = node.layout;
        merged.theme = node.theme;
        if merged == *existing {
            return Ok(self.clone());
        }
        let nodes = merge::update(&self.nodes, [(merged.id.clone(), Arc::new(merged))]);
        Ok(self.rebuilt(nodes))
    }

    /// Rename a node. The new name is re-slugified when it is not already
    /// a legal identifier; uniqueness collisions surface as
    /// [`NameError::Duplicate`]. No-op when the name is unchanged.
    pub fn set_node_name(&self, id: &NodeId, new_name: &str) -> Result<Document, DomError> {
        let node = self.get_node(id)?;
        let resolved = if name::validate(new_name).is_ok() {
            new_name.to_string()
        } else {
            let slug = name::slugify(new_name);
            name::validate(&slug)
                .map_err(|_| NameError::InvalidSyntax(new_name.to_string()))?;
            slug
        };
        if node.name == resolved {
            return Ok(self.clone());
        }
        if let Some(other) = self.get_node_id_by_name(&resolved) {
            if other != *id {
                return Err(NameError::Duplicate(resolved).into());
            }
        }

        debug!(node = %id, name = %resolved, "rename node");

        let mut renamed = node.clone();
        renamed.name = resolved;
        let nodes = merge::update(&self.nodes, [(id.clone(), Arc::new(renamed))]);
        Ok(self.rebuilt(nodes))
    }

    /// Set (or clear, when `value` is `None`) one bindable value on the
    /// node's direct `props` bag.
    pub fn set_node_prop(
        &self,
        id: &NodeId,
        prop: &str,
        value: Option<BindableValue>,
    ) -> Result<Document, DomError> {
        self.set_node_namespaced_prop(id, Namespace::Props, prop, value)
    }

    /// Set (or clear) one bindable value within a named namespace bag.
    pub fn set_node_namespaced_prop(
        &self,
        id: &NodeId,
        namespace: Namespace,
        prop: &str,
        value: Option<BindableValue>,
    ) -> Result<Document, DomError> {
        let node = self.get_node(id)?;
        let bag = merge::set_or_clear(node.namespace(namespace), prop.to_string(), value);
        if bag.ptr_eq(node.namespace(namespace)) {
            return Ok(self.clone());
        }
        let updated = node.with_namespace(namespace, bag);
        let nodes = merge::update(&self.nodes, [(id.clone(), Arc::new(updated))]);
        Ok(self.rebuilt(nodes))
    }

    /// Replace an entire namespace bag at once (`None` clears it).
    pub fn set_node_namespace(
        &self,
        id: &NodeId,
        namespace: Namespace,
        bag: Option<PropBag>,
    ) -> Result<Document, DomError> {
        let node = self.get_node(id)?;
        let bag = bag.unwrap_or_default();
        if bag == *node.namespace(namespace) {
            return Ok(self.clone());
        }
        let updated = node.with_namespace(namespace, bag);
        let nodes = merge::update(&self.nodes, [(id.clone(), Arc::new(updated))]);
        Ok(self.rebuilt(nodes))
    }

    // ------------------------------------------------------------------
    // Fragments (duplication)
    // ------------------------------------------------------------------

    /// Deep-clone a node and its descendants with freshly generated ids,
    /// producing a standalone fragment. Names are kept; they are
    /// disambiguated against the destination at [`Self::add_fragment`]
    /// time.
    pub fn clone_fragment(&self, id: &NodeId) -> Result<Fragment, DomError> {
        let source_root = self.get_node(id)?;

        let mut originals: Vec<&Node> = vec![source_root];
        originals.extend(self.descendants(id));

        let id_map: std::collections::HashMap<NodeId, NodeId> = originals
            .iter()
            .map(|n| (n.id.clone(), NodeId::fresh()))
            .collect();

        let mut nodes = HashMap::new();
        for original in &originals {
            let mut cloned = Node::clone(original);
            cloned.id = id_map[&original.id].clone();
            if original.id == *id {
                // Fragment root starts detached.
                cloned.parent_id = None;
                cloned.parent_prop = None;
                cloned.parent_index = None;
            } else {
                let old_parent = original
                    .parent_id
                    .as_ref()
                    .ok_or_else(|| DomError::NodeNotFound(original.id.clone()))?;
                cloned.parent_id = Some(id_map[old_parent].clone());
            }
            nodes.insert(cloned.id.clone(), Arc::new(cloned));
        }

        Ok(Fragment {
            root: id_map[id].clone(),
            nodes,
        })
    }

    /// Splice a fragment under `parent_id` / `parent_prop`, after the
    /// current last child. Fragment node names are disambiguated against
    /// this document.
    pub fn add_fragment(
        &self,
        fragment: &Fragment,
        parent_id: &NodeId,
        parent_prop: &str,
    ) -> Result<Document, DomError> {
        let frag_root = fragment
            .nodes
            .get(&fragment.root)
            .ok_or_else(|| DomError::NodeNotFound(fragment.root.clone()))?;
        let parent = self.get_node(parent_id)?;
        if !can_host(parent.node_type, parent_prop, frag_root.node_type) {
            return Err(DomError::InvariantViolation(format!(
                "a {:?} cannot host a {:?} under {parent_prop:?}",
                parent.node_type, frag_root.node_type
            )));
        }
        for node_id in fragment.nodes.keys() {
            if self.nodes.contains_key(node_id) {
                return Err(DomError::InvariantViolation(format!(
                    "fragment node {node_id} already exists in the document"
                )));
            }
        }

        let key = self.resolve_index(parent_id, parent_prop, None, None)?;

        // Rename pass: pre-order over the fragment so parents settle
        // their names before their children.
        let order = fragment_preorder(fragment);
        let mut taken_owned: HashSet<String> = self
            .nodes
            .values()
            .map(|n| n.name.clone())
            .collect();

        let mut incoming: Vec<(NodeId, Arc<Node>)> = Vec::with_capacity(order.len());
        for node_id in order {
            let node = &fragment.nodes[&node_id];
            let taken: HashSet<&str> = taken_owned.iter().map(String::as_str).collect();
            let node_name = name::propose(&taken, &node.name, node.node_type.default_name());
            taken_owned.insert(node_name.clone());

            let mut placed = (**node).clone();
            placed.name = node_name;
            if node_id == fragment.root {
                placed.parent_id = Some(parent_id.clone());
                placed.parent_prop = Some(parent_prop.to_string());
                placed.parent_index = Some(key.clone());
            }
            incoming.push((node_id, Arc::new(placed)));
        }

        debug!(root = %fragment.root, count = incoming.len(), parent = %parent_id, "add fragment");

        let nodes = merge::update(&self.nodes, incoming);
        Ok(self.rebuilt(nodes))
    }

    // ------------------------------------------------------------------
    // Whole-document validation
    // ------------------------------------------------------------------

    /// Check every structural invariant. Freshly produced documents always
    /// satisfy these; this is the integrity gate for documents arriving
    /// from an external loader.
    pub fn validate(&self) -> Result<(), DomError> {
        let root = self.get_node(&self.root.clone())?;
        root.assert_type(NodeType::App)?;
        if root.is_attached() {
            return Err(DomError::InvariantViolation(
                "the root node must not have a parent".to_string(),
            ));
        }

        let mut names: HashSet<&str> = HashSet::new();
        let mut reachable = 1usize;
        for node in self.nodes.values() {
            name::validate(&node.name)?;
            if !names.insert(&node.name) {
                return Err(NameError::Duplicate(node.name.clone()).into());
            }
            if node.id == self.root {
                continue;
            }
            let parent_id = node.parent_id.as_ref().ok_or_else(|| {
                DomError::InvariantViolation(format!("non-root node {} has no parent", node.id))
            })?;
            let parent = self.get_node(parent_id)?;
            let slot = node.parent_prop.as_deref().ok_or_else(|| {
                DomError::InvariantViolation(format!("node {} has no parent prop", node.id))
            })?;
            if node.parent_index.is_none() {
                return Err(DomError::InvariantViolation(format!(
                    "node {} has no parent index",
                    node.id
                )));
            }
            if !can_host(parent.node_type, slot, node.node_type) {
                return Err(DomError::InvariantViolation(format!(
                    "a {:?} cannot host a {:?} under {slot:?}",
                    parent.node_type, node.node_type
                )));
            }
        }

        // Duplicate sibling keys and connectedness, via a walk from root.
        let mut stack = vec![self.root.clone()];
        while let Some(current) = stack.pop() {
            if let Some(slots) = self.views().slots(&current) {
                for ids in slots.values() {
                    let mut seen_keys: HashSet<&str> = HashSet::new();
                    for child_id in ids {
                        let child = self.get_node(child_id)?;
                        let key = child.parent_index.as_deref().unwrap_or_default();
                        if !seen_keys.insert(key) {
                            return Err(DomError::InvariantViolation(format!(
                                "duplicate sibling key {key:?} under {current}"
                            )));
                        }
                        reachable += 1;
                        stack.push(child_id.clone());
                    }
                }
            }
        }
        if reachable != self.nodes.len() {
            return Err(DomError::InvariantViolation(format!(
                "{} of {} nodes are unreachable from the root",
                self.nodes.len() - reachable,
                self.nodes.len()
            )));
        }
        Ok(())
    }

    // ------------------------------------------------------------------
    // Internals
    // ------------------------------------------------------------------

    /// New document value around an updated node map. Bumps the version
    /// tag and assigns a fresh cache identity.
    fn rebuilt(&self, nodes: HashMap<NodeId, Arc<Node>>) -> Document {
        Document {
            nodes,
            root: self.root.clone(),
            version: self.version + 1,
            revision: next_revision(),
            views: OnceLock::new(),
        }
    }

    fn taken_names(&self) -> HashSet<&str> {
        self.nodes.values().map(|n| n.name.as_str()).collect()
    }

    /// Keep a legal unique name as-is, otherwise derive one.
    fn ensure_unique_name(&self, wanted: &str, node_type: NodeType) -> String {
        let taken = self.taken_names();
        if name::validate(wanted).is_ok() && !taken.contains(wanted) {
            return wanted.to_string();
        }
        name::propose(&taken, wanted, node_type.default_name())
    }

    /// Resolve the fractional key for an insertion: an explicit key is
    /// checked against sibling duplicates, a missing one lands after the
    /// current last child. `exclude` skips the node being moved.
    fn resolve_index(
        &self,
        parent_id: &NodeId,
        slot: &str,
        explicit: Option<String>,
        exclude: Option<&NodeId>,
    ) -> Result<String, DomError> {
        let sibling_ids = self.views().children_ids(parent_id, slot);
        match explicit {
            Some(key) => {
                for sibling_id in sibling_ids {
                    if exclude == Some(sibling_id) {
                        continue;
                    }
                    let sibling = self.get_node(sibling_id)?;
                    if sibling.parent_index.as_deref() == Some(key.as_str()) {
                        return Err(DomError::InvariantViolation(format!(
                            "duplicate sibling key {key:?} under {parent_id}"
                        )));
                    }
                }
                Ok(key)
            }
            None => {
                let last_key = sibling_ids
                    .iter()
                    .filter(|sibling_id| exclude != Some(*sibling_id))
                    .last()
                    .and_then(|sibling_id| self.get_maybe_node(sibling_id))
                    .and_then(|sibling| sibling.parent_index.clone());
                fractional::key_between(last_key.as_deref(), None)
            }
        }
    }
}

impl Default for Document {
    fn default() -> Self {
        Self::new()
    }
}

/// Pre-order node ids of a fragment, children grouped by slot and ordered
/// by fractional key.
fn fragment_preorder(fragment: &Fragment) -> Vec<NodeId> {
    use std::collections::BTreeMap;

    let mut children: std::collections::HashMap<NodeId, BTreeMap<(String, String), NodeId>> =
        std::collections::HashMap::new();
    for node in fragment.nodes.values() {
        if let (Some(parent), Some(slot), Some(key)) = (
            node.parent_id.as_ref(),
            node.parent_prop.as_ref(),
            node.parent_index.as_ref(),
        ) {
            children
                .entry(parent.clone())
                .or_default()
                .insert((slot.clone(), key.clone()), node.id.clone());
        }
    }

    let mut order = Vec::with_capacity(fragment.nodes.len());
    let mut stack = vec![fragment.root.clone()];
    while let Some(current) = stack.pop() {
        order.push(current.clone());
        if let Some(kids) = children.get(&current) {
            // Reverse so the stack pops in ascending order.
            for child in kids.values().rev() {
                stack.push(child.clone());
            }
        }
    }
    order
}
