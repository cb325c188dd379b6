#![no_main]
use libfuzzer_sys::fuzz_target;
use regraft::{NodeId, SourcePos, SyntaxKind, SyntaxTree};

const GROUP: SyntaxKind = SyntaxKind(1);
const WORD: SyntaxKind = SyntaxKind(2);
const NAMES: [&str; 3] = ["condition", "body", "items"];

fn pick(nodes: &[NodeId], byte: u8) -> NodeId {
    nodes[byte as usize % nodes.len()]
}

fuzz_target!(|data: &[u8]| {
    let mut tree = SyntaxTree::new();
    let mut nodes = vec![tree.create_composite(GROUP)];

    // Interpret the input as an edit script. Rejected edits are expected;
    // panics and inconsistent links are not.
    let mut bytes = data.iter().copied();
    while let Some(op) = bytes.next() {
        match op % 11 {
            0 => nodes.push(tree.create_composite(GROUP)),
            1 => nodes.push(tree.create_token(WORD, "t", SourcePos::default())),
            2 => {
                let (Some(a), Some(b)) = (bytes.next(), bytes.next()) else {
                    break;
                };
                let _ = tree.append_child(pick(&nodes, a), pick(&nodes, b));
            }
            3 => {
                let (Some(a), Some(b)) = (bytes.next(), bytes.next()) else {
                    break;
                };
                let _ = tree.prepend_child(pick(&nodes, a), pick(&nodes, b));
            }
            4 => {
                let (Some(a), Some(b), Some(c)) = (bytes.next(), bytes.next(), bytes.next())
                else {
                    break;
                };
                let _ = tree.insert_before(pick(&nodes, a), pick(&nodes, b), pick(&nodes, c));
            }
            5 => {
                let (Some(a), Some(b), Some(c)) = (bytes.next(), bytes.next(), bytes.next())
                else {
                    break;
                };
                let _ = tree.insert_after(pick(&nodes, a), pick(&nodes, b), pick(&nodes, c));
            }
            6 => {
                let (Some(a), Some(b)) = (bytes.next(), bytes.next()) else {
                    break;
                };
                let _ = tree.remove_child(pick(&nodes, a), pick(&nodes, b));
            }
            7 => {
                let Some(a) = bytes.next() else { break };
                let _ = tree.remove_first(pick(&nodes, a));
            }
            8 => {
                let (Some(a), Some(b), Some(c)) = (bytes.next(), bytes.next(), bytes.next())
                else {
                    break;
                };
                let _ = tree.replace_child(pick(&nodes, a), pick(&nodes, b), pick(&nodes, c));
            }
            9 => {
                let (Some(a), Some(b)) = (bytes.next(), bytes.next()) else {
                    break;
                };
                let _ = tree.merge_node(pick(&nodes, a), pick(&nodes, b));
            }
            _ => {
                let (Some(a), Some(b), Some(n)) = (bytes.next(), bytes.next(), bytes.next())
                else {
                    break;
                };
                let name = NAMES[n as usize % NAMES.len()];
                let _ = tree.append_child_as(pick(&nodes, a), pick(&nodes, b), name);
            }
        }
    }

    // Every surviving view must agree, and queries must not panic.
    for &id in &nodes {
        let children: Vec<NodeId> = tree.children(id).collect();
        assert_eq!(children.len(), tree.child_count(id));
        for &child in &children {
            assert_eq!(tree.parent(child), Some(id));
        }
        let _ = tree.text(id);
        let _ = tree.source_pos(id);
        let _ = tree.first_token(id);
        let _ = tree.last_token(id);
    }
});
