//! # AppDom
//!
//! The application document model at the core of a low-code app builder:
//! an immutable, strongly-typed tree describing an application's pages,
//! UI elements, queries, connections and themes, with the algorithms that
//! let many independent editors mutate it safely.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────┐
//! │ fractional: sortable sibling keys           │
//! │ merge: copy-on-write combinators            │
//! └─────────────────────────────────────────────┘
//!                     ↓
//! ┌─────────────────────────────────────────────┐
//! │ document: flat id → node store              │
//! │  - create / attach / move / remove nodes    │
//! │  - rename + property edits, fragments       │
//! │  - invariants enforced on every operation   │
//! └─────────────────────────────────────────────┘
//!                     ↓
//! ┌─────────────────────────────────────────────┐
//! │ queries: memoized tree views                │
//! │ render_tree: secret-free projection         │
//! └─────────────────────────────────────────────┘
//! ```
//!
//! ## Core principles
//!
//! 1. **Flat map, not pointer graph**: parent/child/sibling relations are
//!    id references into one arena map.
//! 2. **Persistent values**: every mutation returns a new [`Document`];
//!    untouched subtrees stay reference-identical, so consumers can
//!    cheaply detect "did anything under here change".
//! 3. **Stable sibling order**: fractional string keys order siblings
//!    without ever renumbering them.
//! 4. **Fail fast**: an operation that would break an invariant aborts
//!    with a [`DomError`], leaving the document unchanged.
//!
//! ## Usage
//!
//! ```rust
//! use appdom::{BindableValue, Document, NodeInit, NodeType};
//!
//! let doc = Document::new();
//! let app_id = doc.root().clone();
//!
//! let page = doc.create_node(
//!     NodeType::Page,
//!     NodeInit { name: Some("Home".into()), ..Default::default() },
//! );
//! let page_id = page.id.clone();
//! let doc = doc.add_node(page, &app_id, "pages", None)?;
//!
//! let doc = doc.set_node_prop(
//!     &page_id,
//!     "title",
//!     Some(BindableValue::constant("Welcome")),
//! )?;
//!
//! assert_eq!(doc.children(&app_id, "pages").len(), 1);
//! # Ok::<(), appdom::DomError>(())
//! ```

mod binding;
mod document;
mod error;
pub mod fractional;
mod id;
pub mod merge;
mod name;
mod node;
mod queries;
mod render_tree;

pub use binding::BindableValue;
pub use document::{Document, Fragment, NodeInit};
pub use error::DomError;
pub use id::NodeId;
pub use name::{propose as propose_name, slugify, validate as validate_name, NameError};
pub use node::{can_host, Namespace, Node, NodeType, PropBag};
pub use queries::InsertPosition;
pub use render_tree::RenderTree;
