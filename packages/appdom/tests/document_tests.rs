//! End-to-end document scenarios.

use std::sync::Arc;

use appdom::{
    validate_name, BindableValue, Document, InsertPosition, NodeId, NodeInit, NodeType, PropBag,
};

fn add_page(doc: &Document, page_name: &str) -> (Document, NodeId) {
    let app_id = doc.root().clone();
    let page = doc.create_node(
        NodeType::Page,
        NodeInit {
            name: Some(page_name.into()),
            ..Default::default()
        },
    );
    let page_id = page.id.clone();
    let doc = doc.add_node(page, &app_id, "pages", None).unwrap();
    (doc, page_id)
}

#[test]
fn scenario_page_with_typography_element() {
    let doc = Document::new();
    let (doc, page_id) = add_page(&doc, "Home");

    let element = doc.create_node(
        NodeType::Element,
        NodeInit {
            attributes: PropBag::from(vec![(
                "component".to_string(),
                BindableValue::constant("Typography"),
            )]),
            ..Default::default()
        },
    );
    let doc = doc.add_node(element, &page_id, "children", None).unwrap();

    let groups = doc.child_nodes(&page_id);
    let children = &groups["children"];
    assert_eq!(children.len(), 1);
    validate_name(&children[0].name).unwrap();
    assert_eq!(
        children[0].attributes.get("component"),
        Some(&BindableValue::constant("Typography"))
    );
    doc.validate().unwrap();
}

#[test]
fn scenario_colliding_user_names_are_disambiguated() {
    let doc = Document::new();
    let app_id = doc.root().clone();

    let first = doc.create_node(
        NodeType::CodeComponent,
        NodeInit {
            name: Some("My Component".into()),
            ..Default::default()
        },
    );
    let first_name = first.name.clone();
    let doc = doc.add_node(first, &app_id, "codeComponents", None).unwrap();

    let second = doc.create_node(
        NodeType::CodeComponent,
        NodeInit {
            name: Some("My Component".into()),
            ..Default::default()
        },
    );
    let second_name = second.name.clone();
    let doc = doc.add_node(second, &app_id, "codeComponents", None).unwrap();

    assert_eq!(first_name, "MyComponent");
    assert_eq!(second_name, "MyComponent2");
    validate_name(&first_name).unwrap();
    validate_name(&second_name).unwrap();
    doc.validate().unwrap();
}

#[test]
fn scenario_fragment_duplication() {
    let doc = Document::new();
    let (doc, page_id) = add_page(&doc, "Home");

    // A subtree of 5 nodes: stack > (row > text, text), text.
    let stack = doc.create_node(
        NodeType::Element,
        NodeInit {
            name: Some("Stack".into()),
            ..Default::default()
        },
    );
    let stack_id = stack.id.clone();
    let doc = doc.add_node(stack, &page_id, "children", None).unwrap();
    let row = doc.create_node(NodeType::Element, NodeInit::default());
    let row_id = row.id.clone();
    let doc = doc.add_node(row, &stack_id, "content", None).unwrap();
    let mut doc = doc;
    for _ in 0..2 {
        let text = doc.create_node(NodeType::Element, NodeInit::default());
        doc = doc.add_node(text, &row_id, "content", None).unwrap();
    }
    let tail = doc.create_node(NodeType::Element, NodeInit::default());
    let doc = doc.add_node(tail, &stack_id, "content", None).unwrap();

    let before_count = doc.node_count();
    let fragment = doc.clone_fragment(&stack_id).unwrap();
    assert_eq!(fragment.nodes.len(), 5);
    // Fresh ids throughout.
    for id in fragment.nodes.keys() {
        assert!(doc.get_maybe_node(id).is_none());
    }

    let (doc2, other_page) = add_page(&doc, "About");
    let doc2 = doc2.add_fragment(&fragment, &other_page, "children").unwrap();
    assert_eq!(doc2.node_count(), before_count + 1 + 5);
    doc2.validate().unwrap();

    // Identical relative structure: the copied root has one "content"
    // slot with two ordered entries, the first of which has two children.
    let copied_root = doc2.children(&other_page, "children")[0];
    assert_eq!(copied_root.name, "Stack2", "name disambiguated");
    let copied_children = doc2.children(&copied_root.id, "content");
    assert_eq!(copied_children.len(), 2);
    assert_eq!(doc2.children(&copied_children[0].id, "content").len(), 2);
}

#[test]
fn structural_sharing_leaves_untouched_nodes_identical() {
    let doc = Document::new();
    let (doc, page_id) = add_page(&doc, "Home");
    let (doc, other_id) = add_page(&doc, "About");

    let edited = doc
        .set_node_prop(&page_id, "title", Some(BindableValue::constant("Hi")))
        .unwrap();

    let before = doc.nodes().get(&other_id).unwrap();
    let after = edited.nodes().get(&other_id).unwrap();
    assert!(Arc::ptr_eq(before, after));

    let root_before = doc.nodes().get(doc.root()).unwrap();
    let root_after = edited.nodes().get(edited.root()).unwrap();
    assert!(Arc::ptr_eq(root_before, root_after));

    assert!(!Arc::ptr_eq(
        doc.nodes().get(&page_id).unwrap(),
        edited.nodes().get(&page_id).unwrap()
    ));
}

#[test]
fn add_then_remove_round_trips_the_node_map() {
    let doc = Document::new();
    let (doc, page_id) = add_page(&doc, "Home");

    let element = doc.create_node(NodeType::Element, NodeInit::default());
    let element_id = element.id.clone();
    let added = doc.add_node(element, &page_id, "children", None).unwrap();
    let removed = added.remove_node(&element_id).unwrap();

    assert_eq!(removed.nodes(), doc.nodes());
}

#[test]
fn descendant_removal_leaves_no_dangling_parents() {
    let doc = Document::new();
    let (mut doc, page_id) = add_page(&doc, "Home");
    let mut last_parent = page_id.clone();
    for _ in 0..4 {
        let element = doc.create_node(NodeType::Element, NodeInit::default());
        let element_id = element.id.clone();
        let slot = if last_parent == page_id { "children" } else { "content" };
        doc = doc.add_node(element, &last_parent, slot, None).unwrap();
        last_parent = element_id;
    }

    let top = doc.children(&page_id, "children")[0].id.clone();
    let expected_gone = 1 + doc.descendants(&top).len();
    let after = doc.remove_node(&top).unwrap();
    assert_eq!(after.node_count(), doc.node_count() - expected_gone);
    after.validate().unwrap();
}

#[test]
fn inserting_before_a_reference_keeps_sibling_order_stable() {
    let doc = Document::new();
    let (mut doc, page_id) = add_page(&doc, "Home");
    let mut ids = Vec::new();
    for _ in 0..4 {
        let element = doc.create_node(NodeType::Element, NodeInit::default());
        ids.push(element.id.clone());
        doc = doc.add_node(element, &page_id, "children", None).unwrap();
    }

    let key = doc
        .key_for_position(&page_id, "children", &InsertPosition::Before(ids[2].clone()))
        .unwrap();
    let newcomer = doc.create_node(NodeType::Element, NodeInit::default());
    let newcomer_id = newcomer.id.clone();
    let doc = doc
        .add_node(newcomer, &page_id, "children", Some(key))
        .unwrap();

    let order: Vec<NodeId> = doc
        .children(&page_id, "children")
        .iter()
        .map(|n| n.id.clone())
        .collect();
    assert_eq!(
        order,
        vec![
            ids[0].clone(),
            ids[1].clone(),
            newcomer_id,
            ids[2].clone(),
            ids[3].clone()
        ]
    );
    doc.validate().unwrap();
}

#[test]
fn wire_format_round_trips() -> anyhow::Result<()> {
    let doc = Document::new();
    let (doc, page_id) = add_page(&doc, "Home");
    let doc = doc.set_node_prop(&page_id, "title", Some(BindableValue::expression("state.t")))?;

    let json = serde_json::to_value(&doc)?;
    assert!(json.get("nodes").is_some());
    assert!(json.get("root").is_some());
    assert_eq!(json["version"], serde_json::json!(doc.version()));
    // Cache identity never leaks onto the wire.
    assert!(json.get("revision").is_none());

    let back: Document = serde_json::from_value(json)?;
    assert_eq!(back, doc);
    back.validate()?;
    assert_eq!(
        back.get_node(&page_id)?.props.get("title"),
        Some(&BindableValue::expression("state.t"))
    );
    Ok(())
}

#[test]
fn moving_between_slots_rechecks_legality() {
    let doc = Document::new();
    let (doc, page_id) = add_page(&doc, "Home");
    let (doc, other_id) = add_page(&doc, "About");

    let element = doc.create_node(NodeType::Element, NodeInit::default());
    let element_id = element.id.clone();
    let doc = doc.add_node(element, &page_id, "children", None).unwrap();

    let moved = doc.move_node(&element_id, &other_id, "children", None).unwrap();
    assert_eq!(
        moved.get_node(&element_id).unwrap().parent_id.as_ref(),
        Some(&other_id)
    );
    moved.validate().unwrap();

    assert!(doc.move_node(&element_id, &other_id, "queries", None).is_err());
}
