//! Render the construct tree for terminal display.

use generational_arena::Index;
use termtree::Tree;
use tracing::instrument;

use crate::domain::{App, Node, NodeId};

pub trait TreeNodeConvert {
    fn to_tree_string(&self) -> Tree<String>;
}

fn label(node: &Node) -> String {
    if node.name().is_empty() {
        node.kind().to_string()
    } else {
        format!("{} ({})", node.name(), node.kind())
    }
}

impl TreeNodeConvert for App {
    #[instrument(level = "debug", skip(self))]
    fn to_tree_string(&self) -> Tree<String> {
        fn build_tree(app: &App, node_idx: Index, parent_tree: &mut Tree<String>) {
            if let Some(node) = app.node_at(node_idx) {
                for &child_idx in node.child_indices() {
                    if let Some(child) = app.node_at(child_idx) {
                        let mut child_tree = Tree::new(label(child));
                        build_tree(app, child_idx, &mut child_tree);
                        parent_tree.push(child_tree);
                    }
                }
            }
        }

        let root_idx = NodeId::from(self.root()).index();
        let mut tree = match self.node_at(root_idx) {
            Some(root) => Tree::new(label(root)),
            None => return Tree::new("Empty tree".to_string()),
        };
        build_tree(self, root_idx, &mut tree);
        tree
    }
}
