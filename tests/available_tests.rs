use exprquill::document::available::{find_available_variables, AvailableVariable, InputRef};
use exprquill::document::node::{Variable, VariableType};
use exprquill::document::tree::VariableTree;
use exprquill::expression::{Parser, TreeHelper};
use serde_json::json;

fn variables() -> Vec<Variable> {
    serde_json::from_value(json!([
        {
            "key": "G3UiXFzKjTefY_iu8U59Z",
            "type": 6,
            "name": "obj",
            "children": [
                { "key": "klAhNVg0xasVuN-l3bZdw", "type": 1, "name": "str" },
                { "key": "j8Hp-0mQhGfW618h35Pql", "type": 4, "name": "num" }
            ],
            "nodeTitle": "Code",
            "nodeId": "112561"
        },
        {
            "key": "UVxP2tcAXIe2DXIeT1C-o",
            "type": 103,
            "name": "arr_obj",
            "children": [
                { "key": "7-id-zYuO7aBPiC48Jkk4", "type": 1, "name": "str" },
                { "key": "QHB4k7Z3k2VyTipg8rjlL", "type": 4, "name": "num" }
            ],
            "nodeTitle": "Code",
            "nodeId": "112561"
        },
        {
            "key": "GX1IupmKt-gaMKC54d1a4",
            "type": 99,
            "name": "arr_str",
            "nodeTitle": "Code",
            "nodeId": "112561"
        }
    ]))
    .unwrap()
}

fn inputs() -> Vec<InputRef> {
    serde_json::from_value(json!([
        { "name": "ref_obj", "keyPath": ["112561", "G3UiXFzKjTefY_iu8U59Z"] },
        { "name": "ref_arr_obj", "keyPath": ["112561", "UVxP2tcAXIe2DXIeT1C-o"] },
        {
            "name": "test_ref",
            "keyPath": ["112561", "G3UiXFzKjTefY_iu8U59Z", "klAhNVg0xasVuN-l3bZdw"]
        },
        { "name": "ref_arr_str", "keyPath": ["112561", "GX1IupmKt-gaMKC54d1a4"] },
        { "name": "constant", "keyPath": [] }
    ]))
    .unwrap()
}

fn expected_available() -> Vec<AvailableVariable> {
    let vars = variables();
    vec![
        AvailableVariable {
            name: "ref_obj".to_string(),
            key_path: Some(vec!["G3UiXFzKjTefY_iu8U59Z".to_string()]),
            variable: Some(vars[0].clone()),
            children: Vec::new(),
        },
        AvailableVariable {
            name: "ref_arr_obj".to_string(),
            key_path: Some(vec!["UVxP2tcAXIe2DXIeT1C-o".to_string()]),
            variable: Some(vars[1].clone()),
            children: Vec::new(),
        },
        AvailableVariable {
            name: "test_ref".to_string(),
            key_path: Some(vec![
                "G3UiXFzKjTefY_iu8U59Z".to_string(),
                "klAhNVg0xasVuN-l3bZdw".to_string(),
            ]),
            variable: Some(Variable::new(
                "klAhNVg0xasVuN-l3bZdw",
                "str",
                VariableType::String,
            )),
            children: Vec::new(),
        },
        AvailableVariable {
            name: "ref_arr_str".to_string(),
            key_path: Some(vec!["GX1IupmKt-gaMKC54d1a4".to_string()]),
            variable: Some(vars[2].clone()),
            children: Vec::new(),
        },
        AvailableVariable {
            name: "constant".to_string(),
            key_path: None,
            variable: None,
            children: Vec::new(),
        },
    ]
}

#[test]
fn test_find_available_variables() {
    let results = find_available_variables(&variables(), &inputs());
    assert_eq!(results, expected_available());
}

#[test]
fn test_create_variable_tree() {
    let tree = VariableTree::from_available(&expected_available());
    assert_eq!(tree.roots().len(), 5);

    let ref_obj = tree.node(tree.roots()[0]);
    assert_eq!(ref_obj.label, "ref_obj");
    assert_eq!(ref_obj.value, "G3UiXFzKjTefY_iu8U59Z");
    assert_eq!(ref_obj.key, "ref_obj");

    let str_id = tree.find_by_labels(&["ref_obj", "str"]).unwrap();
    let str_node = tree.node(str_id);
    assert_eq!(str_node.value, "G3UiXFzKjTefY_iu8U59Z.klAhNVg0xasVuN-l3bZdw");
    assert_eq!(str_node.key, str_node.value);

    let constant = tree.node(tree.roots()[4]);
    assert_eq!(constant.value, "constant");
    assert!(constant.children().is_empty());
}

#[test]
fn test_nested_inputs_become_child_nodes() {
    let inputs = vec![InputRef::new("group").with_children(vec![
        InputRef::new("first").with_key_path(["112561", "G3UiXFzKjTefY_iu8U59Z"]),
        InputRef::new("literal"),
    ])];
    let available = find_available_variables(&variables(), &inputs);
    assert!(available[0].variable.is_none());
    assert_eq!(available[0].children.len(), 2);
    assert!(available[0].children[0].variable.is_some());

    let tree = VariableTree::from_available(&available);
    let literal = tree.find_by_labels(&["group", "literal"]).unwrap();
    assert_eq!(tree.node(literal).key, "group.literal");
    assert!(tree.find_by_labels(&["group", "first", "num"]).is_some());
}

#[test]
fn test_array_variable_needs_index_to_resolve() {
    let tree = VariableTree::from_available(&find_available_variables(&variables(), &inputs()));
    let helper = TreeHelper::new(&tree);

    let with_index = Parser::parse("{{ref_arr_obj[1].num}}", 20).unwrap();
    let branch = helper
        .match_tree_branch(with_index.segments.inline.as_deref().unwrap())
        .unwrap();
    assert_eq!(tree.node(branch[1]).value, "UVxP2tcAXIe2DXIeT1C-o.QHB4k7Z3k2VyTipg8rjlL");

    let without_index = Parser::parse("{{ref_arr_obj.num}}", 17).unwrap();
    assert_eq!(
        helper.match_tree_branch(without_index.segments.inline.as_deref().unwrap()),
        None
    );
}
