//! # Render-Tree Projection
//!
//! A secret-free subset of the document, safe to hand across the trust
//! boundary to a renderer. `connection` nodes carry secret-bearing
//! attributes and are dropped entirely; `secret`-tagged bindables are
//! stripped from every surviving node. A `query` node keeps its reference
//! to a connection id (an opaque string), never the connection's payload.

use std::sync::Arc;

use im::HashMap;
use serde::{Deserialize, Serialize};

use crate::document::Document;
use crate::id::NodeId;
use crate::node::{Node, NodeType, PropBag};

/// Document-shaped projection for lower-trust rendering contexts.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RenderTree {
    nodes: HashMap<NodeId, Arc<Node>>,
    root: NodeId,
    version: u64,
}

impl RenderTree {
    /// Pure filter over the document's nodes. Never mutates the source.
    pub fn project(doc: &Document) -> RenderTree {
        let mut nodes = HashMap::new();
        for (id, node) in doc.nodes() {
            if node.node_type == NodeType::Connection {
                continue;
            }
            nodes.insert(id.clone(), strip_secrets(node));
        }
        RenderTree {
            nodes,
            root: doc.root().clone(),
            version: doc.version(),
        }
    }

    pub fn root(&self) -> &NodeId {
        &self.root
    }

    pub fn version(&self) -> u64 {
        self.version
    }

    pub fn get(&self, id: &NodeId) -> Option<&Node> {
        self.nodes.get(id).map(Arc::as_ref)
    }

    pub fn contains(&self, id: &NodeId) -> bool {
        self.nodes.contains_key(id)
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Node> {
        self.nodes.values().map(Arc::as_ref)
    }
}

/// Shares the node untouched unless it actually carries a secret.
fn strip_secrets(node: &Arc<Node>) -> Arc<Node> {
    let bags = [
        &node.attributes,
        &node.props,
        &node.params,
        &node.layout,
        &node.theme,
    ];
    let tainted = bags
        .iter()
        .any(|bag| bag.values().any(|value| value.is_secret()));
    if !tainted {
        return node.clone();
    }

    let mut scrubbed = Node::clone(node);
    scrubbed.attributes = drop_secret_entries(&scrubbed.attributes);
    scrubbed.props = drop_secret_entries(&scrubbed.props);
    scrubbed.params = drop_secret_entries(&scrubbed.params);
    scrubbed.layout = drop_secret_entries(&scrubbed.layout);
    scrubbed.theme = drop_secret_entries(&scrubbed.theme);
    Arc::new(scrubbed)
}

fn drop_secret_entries(bag: &PropBag) -> PropBag {
    if bag.values().any(|value| value.is_secret()) {
        bag.iter()
            .filter(|(_, value)| !value.is_secret())
            .map(|(key, value)| (key.clone(), value.clone()))
            .collect()
    } else {
        bag.clone()
    }
}
