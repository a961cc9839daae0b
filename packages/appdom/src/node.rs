//! Node definitions: the closed set of node types, their property
//! namespaces, and the parent/child legality table.

use im::HashMap;
use serde::{Deserialize, Serialize};

use crate::binding::BindableValue;
use crate::error::DomError;
use crate::id::NodeId;

/// A named property bag: bindable values keyed by arbitrary names.
pub type PropBag = HashMap<String, BindableValue>;

/// The closed set of node kinds making up a document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum NodeType {
    App,
    Page,
    Element,
    CodeComponent,
    Connection,
    Theme,
    Query,
    Mutation,
}

impl NodeType {
    /// Default name stem used when a node is created without one.
    pub fn default_name(self) -> &'static str {
        match self {
            NodeType::App => "app",
            NodeType::Page => "page",
            NodeType::Element => "element",
            NodeType::CodeComponent => "codeComponent",
            NodeType::Connection => "connection",
            NodeType::Theme => "theme",
            NodeType::Query => "query",
            NodeType::Mutation => "mutation",
        }
    }
}

/// The five property namespaces a node carries.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Namespace {
    Attributes,
    Props,
    Params,
    Layout,
    Theme,
}

impl Namespace {
    pub fn as_str(self) -> &'static str {
        match self {
            Namespace::Attributes => "attributes",
            Namespace::Props => "props",
            Namespace::Params => "params",
            Namespace::Layout => "layout",
            Namespace::Theme => "theme",
        }
    }
}

/// One typed entity in the document.
///
/// `parent_id`, `parent_prop` and `parent_index` are all present iff the
/// node is attached; the root `app` node is the only permanently detached
/// node in a well-formed document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Node {
    pub id: NodeId,
    #[serde(rename = "type")]
    pub node_type: NodeType,
    pub name: String,
    pub parent_id: Option<NodeId>,
    pub parent_prop: Option<String>,
    pub parent_index: Option<String>,
    #[serde(default, skip_serializing_if = "HashMap::is_empty")]
    pub attributes: PropBag,
    #[serde(default, skip_serializing_if = "HashMap::is_empty")]
    pub props: PropBag,
    #[serde(default, skip_serializing_if = "HashMap::is_empty")]
    pub params: PropBag,
    #[serde(default, skip_serializing_if = "HashMap::is_empty")]
    pub layout: PropBag,
    #[serde(default, skip_serializing_if = "HashMap::is_empty")]
    pub theme: PropBag,
}

impl Node {
    pub fn is_attached(&self) -> bool {
        self.parent_id.is_some()
    }

    pub fn namespace(&self, ns: Namespace) -> &PropBag {
        match ns {
            Namespace::Attributes => &self.attributes,
            Namespace::Props => &self.props,
            Namespace::Params => &self.params,
            Namespace::Layout => &self.layout,
            Namespace::Theme => &self.theme,
        }
    }

    /// Rebuild this node with one namespace bag replaced.
    pub(crate) fn with_namespace(&self, ns: Namespace, bag: PropBag) -> Node {
        let mut out = self.clone();
        match ns {
            Namespace::Attributes => out.attributes = bag,
            Namespace::Props => out.props = bag,
            Namespace::Params => out.params = bag,
            Namespace::Layout => out.layout = bag,
            Namespace::Theme => out.theme = bag,
        }
        out
    }

    /// Fail unless this node has the expected type.
    pub fn assert_type(&self, expected: NodeType) -> Result<(), DomError> {
        if self.node_type == expected {
            Ok(())
        } else {
            Err(DomError::UnexpectedType {
                id: self.id.clone(),
                expected,
                actual: self.node_type,
            })
        }
    }
}

macro_rules! type_predicates {
    ($(($is:ident, $assert:ident, $variant:ident)),* $(,)?) => {
        impl Node {
            $(
                pub fn $is(&self) -> bool {
                    self.node_type == NodeType::$variant
                }

                pub fn $assert(&self) -> Result<&Node, DomError> {
                    self.assert_type(NodeType::$variant).map(|_| self)
                }
            )*
        }
    };
}

type_predicates!(
    (is_app, assert_is_app, App),
    (is_page, assert_is_page, Page),
    (is_element, assert_is_element, Element),
    (is_code_component, assert_is_code_component, CodeComponent),
    (is_connection, assert_is_connection, Connection),
    (is_theme, assert_is_theme, Theme),
    (is_query, assert_is_query, Query),
    (is_mutation, assert_is_mutation, Mutation),
);

/// Fixed parent/child compatibility: can a node of type `parent` host a
/// `child` under the named slot? Operations that would violate this table
/// fail instead of coercing.
pub fn can_host(parent: NodeType, slot: &str, child: NodeType) -> bool {
    match (parent, child) {
        (NodeType::App, NodeType::Page) => slot == "pages",
        (NodeType::App, NodeType::Connection) => slot == "connections",
        (NodeType::App, NodeType::Theme) => slot == "themes",
        (NodeType::App, NodeType::CodeComponent) => slot == "codeComponents",
        (NodeType::Page, NodeType::Element) => slot == "children",
        (NodeType::Page, NodeType::Query) => slot == "queries",
        (NodeType::Page, NodeType::Mutation) => slot == "mutations",
        // Elements host child elements under arbitrary named slots.
        (NodeType::Element, NodeType::Element) => !slot.is_empty(),
        _ => false,
    }
}
