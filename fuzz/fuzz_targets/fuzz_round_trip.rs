#![no_main]
use libfuzzer_sys::fuzz_target;
use regraft::{SourcePos, SyntaxKind, SyntaxTree};

fuzz_target!(|data: &[u8]| {
    if let Ok(s) = std::str::from_utf8(data) {
        let mut tree = SyntaxTree::new();
        let root = tree.create_composite(SyntaxKind(1));

        // Chunk the input into tokens; serializing must give the input back
        let chars: Vec<char> = s.chars().collect();
        for piece in chars.chunks(3) {
            let text: String = piece.iter().collect();
            let tok = tree.create_token(SyntaxKind(2), text, SourcePos::default());
            assert!(tree.append_child(root, tok).is_ok());
        }
        assert_eq!(tree.text(root), s);

        // Draining from the front must visit every token and empty the root
        let mut drained = String::new();
        while let Ok(Some(id)) = tree.remove_first(root) {
            if let Some(text) = tree.token_text(id) {
                drained.push_str(text);
            }
        }
        assert_eq!(drained, s);
        assert_eq!(tree.child_count(root), 0);
    }
});
