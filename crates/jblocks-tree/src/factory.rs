use jblocks_source::Span;
use jblocks_syntax::NodeId;
use jblocks_syntax::NodeKind;
use jblocks_syntax::NumKind;
use jblocks_syntax::SyntaxTree;

use crate::block::Block;
use crate::block::BlockId;
use crate::block::BlockKind;
use crate::block::BlockTree;
use crate::map::NodeBlockMap;

/// Build a fresh block tree and node/block/line index from one parse.
///
/// The walk is top-down and tolerant: unrecognized shapes become
/// opaque `Unknown` leaf blocks carrying the recorded diagnostic, so
/// a half-edited document still renders.
#[must_use]
pub fn build_blocks(tree: &SyntaxTree) -> (BlockTree, NodeBlockMap) {
    let mut factory = BlockFactory {
        tree,
        map: NodeBlockMap::default(),
        comment_attached: vec![false; tree.comments().len()],
    };

    let mut roots = Vec::new();
    if let Some(root) = tree.root() {
        match tree.kind(root) {
            NodeKind::Class { .. } => {
                let members: Vec<NodeId> = tree.children(root).to_vec();
                for (i, member) in members.into_iter().enumerate() {
                    let mut path = vec![i];
                    roots.push(factory.build(member, &mut path));
                }
            }
            _ => {
                let mut path = vec![0];
                roots.push(factory.build(root, &mut path));
            }
        }
    }

    let unattached = factory
        .comment_attached
        .iter()
        .filter(|attached| !**attached)
        .count();
    if unattached > 0 {
        tracing::trace!(count = unattached, "comments outside any body were dropped");
    }

    (BlockTree::new(roots), factory.map)
}

struct BlockFactory<'tree> {
    tree: &'tree SyntaxTree,
    map: NodeBlockMap,
    comment_attached: Vec<bool>,
}

impl BlockFactory<'_> {
    fn build(&mut self, node: NodeId, path: &mut Vec<usize>) -> Block {
        let kind = self.kind_of(node);
        let id = BlockId::mint(kind.tag(), path);
        let span = self.tree.span(node);
        let line = self.tree.line_of(node);

        let error = match kind {
            BlockKind::Unknown => self.diagnostic_for(span),
            _ => None,
        };

        let node_children: Vec<NodeId> = self.tree.children(node).to_vec();
        let mut children = Vec::with_capacity(node_children.len());
        for (i, child) in node_children.iter().copied().enumerate() {
            path.push(i);
            children.push(self.build(child, path));
            path.pop();
        }

        // A print with no argument renders with an implicit empty
        // string literal the user can edit.
        if matches!(kind, BlockKind::Print) && children.is_empty() {
            path.push(0);
            children.push(self.synthetic_empty_string(span, line, path));
            path.pop();
        }

        if matches!(kind, BlockKind::Body) {
            let base = children.len();
            let comment_blocks = self.attach_comments(span, &node_children, base, path);
            children.extend(comment_blocks);
            children.sort_by_key(|block| block.span.start());
        }

        self.map.insert(node, id, line, kind.is_statement());

        Block {
            id,
            kind,
            node: Some(node),
            span,
            line,
            children,
            error,
            has_breakpoint: false,
        }
    }

    /// Comments physically inside this body, but not inside any of
    /// its child statements, belong to this body. A comment attaches
    /// to exactly one body; the first body reached in the top-down
    /// walk claims it.
    fn attach_comments(
        &mut self,
        body_span: Span,
        statements: &[NodeId],
        base_index: usize,
        path: &mut Vec<usize>,
    ) -> Vec<Block> {
        let mut claimed = Vec::new();
        for index in 0..self.comment_attached.len() {
            if self.comment_attached[index] {
                continue;
            }
            let comment = &self.tree.comments()[index];
            if !body_span.contains(comment.span) {
                continue;
            }
            let inside_child = statements
                .iter()
                .any(|&stmt| self.tree.span(stmt).contains(comment.span));
            if inside_child {
                continue;
            }
            self.comment_attached[index] = true;
            claimed.push(index);
        }

        claimed
            .into_iter()
            .enumerate()
            .map(|(offset, index)| {
                let comment = &self.tree.comments()[index];
                path.push(base_index + offset);
                let kind = BlockKind::Comment {
                    text: comment.text.clone(),
                };
                let id = BlockId::mint(kind.tag(), path);
                path.pop();
                Block {
                    id,
                    kind,
                    node: None,
                    span: comment.span,
                    line: self.tree.line_index().to_line(comment.span.start_offset()),
                    children: Vec::new(),
                    error: None,
                    has_breakpoint: false,
                }
            })
            .collect()
    }

    fn synthetic_empty_string(&self, print_span: Span, line: u32, path: &[usize]) -> Block {
        let kind = BlockKind::StringLiteral {
            value: String::new(),
        };
        let id = BlockId::mint(kind.tag(), path);
        // Position the synthetic literal between the parentheses,
        // just before the trailing `);`.
        let anchor = print_span.end_usize().saturating_sub(2);
        Block {
            id,
            kind,
            node: None,
            span: Span::from_bounds(anchor, anchor),
            line,
            children: Vec::new(),
            error: None,
            has_breakpoint: false,
        }
    }

    fn diagnostic_for(&self, span: Span) -> Option<String> {
        self.tree
            .errors()
            .iter()
            .find(|error| span.start() < error.span.end() && error.span.start() < span.end())
            .map(|error| error.message.clone())
    }

    fn kind_of(&self, node: NodeId) -> BlockKind {
        match self.tree.kind(node) {
            NodeKind::Method {
                name,
                return_type,
                is_main,
            } => {
                if *is_main {
                    BlockKind::Start
                } else {
                    BlockKind::Method {
                        name: name.clone(),
                        return_type: return_type.clone(),
                    }
                }
            }
            NodeKind::EnumDecl { name, constants } => BlockKind::Enum {
                name: name.clone(),
                constants: constants.clone(),
            },
            NodeKind::Body => BlockKind::Body,
            NodeKind::Field { ty, name } | NodeKind::LocalVar { ty, name } => {
                BlockKind::DeclareVariable {
                    ty: ty.clone(),
                    name: name.clone(),
                }
            }
            NodeKind::If => BlockKind::If,
            NodeKind::While => BlockKind::While,
            NodeKind::DoWhile => BlockKind::DoWhile,
            NodeKind::For { ty, var } => BlockKind::ForEach {
                ty: ty.clone(),
                var: var.clone(),
            },
            NodeKind::Switch => BlockKind::Switch,
            NodeKind::SwitchCase { is_default } => BlockKind::SwitchCase {
                is_default: *is_default,
            },
            NodeKind::Break => BlockKind::Break,
            NodeKind::Continue => BlockKind::Continue,
            NodeKind::Return => BlockKind::Return,
            NodeKind::Print => BlockKind::Print,
            NodeKind::Assign { op } => BlockKind::Assign { op: *op },
            NodeKind::IncDec { op, prefix } => BlockKind::IncrementDecrement {
                op: *op,
                prefix: *prefix,
            },
            NodeKind::CallStmt { scope, name } | NodeKind::CallExpr { scope, name } => {
                BlockKind::MethodCall {
                    scope: scope.clone(),
                    name: name.clone(),
                }
            }
            NodeKind::Wait => BlockKind::Wait,
            NodeKind::StrLit { value } => BlockKind::StringLiteral {
                value: value.clone(),
            },
            NodeKind::NumLit { text, kind } => match kind {
                NumKind::Int => BlockKind::IntLiteral { text: text.clone() },
                NumKind::Float => BlockKind::FloatLiteral { text: text.clone() },
                NumKind::Double => BlockKind::DoubleLiteral { text: text.clone() },
            },
            NodeKind::BoolLit { value } => BlockKind::BooleanLiteral { value: *value },
            NodeKind::CharLit { value } => BlockKind::CharLiteral { value: *value },
            NodeKind::NullLit => BlockKind::NullLiteral,
            NodeKind::Ident { name } => BlockKind::Identifier { name: name.clone() },
            NodeKind::EnumConst { ty, name } => BlockKind::EnumConstant {
                ty: ty.clone(),
                name: name.clone(),
            },
            NodeKind::FieldAccess { qualifier, name } => BlockKind::FieldAccess {
                qualifier: qualifier.clone(),
                name: name.clone(),
            },
            NodeKind::Binary { op } => {
                if op.is_comparison() {
                    BlockKind::Comparison { op: *op }
                } else {
                    BlockKind::BinaryOperation { op: *op }
                }
            }
            NodeKind::ArrayInit => BlockKind::Array { ty: String::new() },
            NodeKind::ArrayNew { ty } => BlockKind::Array { ty: ty.clone() },
            NodeKind::ListCtor { flavor } => BlockKind::List { flavor: *flavor },
            NodeKind::ScannerRead { method } => BlockKind::ReadInput {
                method: method.clone(),
            },
            NodeKind::Class { .. } | NodeKind::Unknown => BlockKind::Unknown,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn wrap(statements: &str) -> String {
        format!(
            "public class Demo {{\n    public static void main(String[] args) {{\n{statements}\n    }}\n}}\n"
        )
    }

    fn build(source: &str) -> (SyntaxTree, BlockTree, NodeBlockMap) {
        let tree = SyntaxTree::parse(source);
        let (blocks, map) = build_blocks(&tree);
        (tree, blocks, map)
    }

    #[test]
    fn demo_program_builds_start_body_and_statements() {
        let source = wrap("        int x = 10;\n        System.out.println(x);");
        let (_, blocks, _) = build(&source);
        let roots = blocks.roots();
        assert_eq!(roots.len(), 1);
        assert_eq!(roots[0].kind, BlockKind::Start);
        let body = &roots[0].children[0];
        assert_eq!(body.kind, BlockKind::Body);
        assert!(matches!(
            body.children[0].kind,
            BlockKind::DeclareVariable { .. }
        ));
        assert_eq!(body.children[1].kind, BlockKind::Print);
    }

    #[test]
    fn print_without_argument_gets_a_synthetic_empty_string() {
        let source = wrap("        System.out.println();");
        let (_, blocks, _) = build(&source);
        let print = &blocks.roots()[0].children[0].children[0];
        assert_eq!(print.kind, BlockKind::Print);
        assert_eq!(print.children.len(), 1);
        assert_eq!(
            print.children[0].kind,
            BlockKind::StringLiteral {
                value: String::new()
            }
        );
        assert!(print.children[0].node.is_none());
    }

    #[test]
    fn comment_attaches_to_the_innermost_body_that_holds_it() {
        let source = wrap(
            "        // outer note\n        if (true) {\n            // inner note\n            int x = 1;\n        }",
        );
        let (_, blocks, _) = build(&source);
        let outer_body = &blocks.roots()[0].children[0];
        let comments: Vec<&str> = outer_body
            .children
            .iter()
            .filter_map(|b| match &b.kind {
                BlockKind::Comment { text } => Some(text.as_str()),
                _ => None,
            })
            .collect();
        assert_eq!(comments, ["outer note"]);

        let if_block = outer_body
            .children
            .iter()
            .find(|b| b.kind == BlockKind::If)
            .expect("if block");
        let inner_body = if_block
            .children
            .iter()
            .find(|b| b.kind == BlockKind::Body)
            .expect("if body");
        let inner_comments: Vec<&str> = inner_body
            .children
            .iter()
            .filter_map(|b| match &b.kind {
                BlockKind::Comment { text } => Some(text.as_str()),
                _ => None,
            })
            .collect();
        assert_eq!(inner_comments, ["inner note"]);
    }

    #[test]
    fn comments_interleave_in_source_order() {
        let source = wrap("        int x = 1;\n        // between\n        int y = 2;");
        let (_, blocks, _) = build(&source);
        let body = &blocks.roots()[0].children[0];
        let tags: Vec<&str> = body.children.iter().map(|b| b.kind.tag()).collect();
        assert_eq!(tags, ["declare-variable", "comment", "declare-variable"]);
    }

    #[test]
    fn statement_wins_line_collisions_in_the_line_map() {
        let source = wrap("        int x = 10;");
        let (tree, blocks, map) = build(&source);
        let body = &blocks.roots()[0].children[0];
        let decl = &body.children[0];
        let line = tree.line_of(decl.node.expect("declaration has a node"));
        // Declaration and its initializer literal share the line; the
        // statement owns it.
        assert_eq!(map.block_at_line(line), Some(decl.id));
    }

    #[test]
    fn block_outline_for_a_commented_program() {
        fn render(block: &Block, depth: usize, out: &mut String) {
            if !out.is_empty() {
                out.push('\n');
            }
            out.push_str(&"  ".repeat(depth));
            out.push_str(&format!("{} @{}", block.kind.tag(), block.line));
            for child in &block.children {
                render(child, depth + 1, out);
            }
        }

        let source = wrap(
            "        int x = 10;\n        // doubles on the way out\n        System.out.println(x * 2);",
        );
        let (_, blocks, _) = build(&source);
        let mut dump = String::new();
        for root in blocks.roots() {
            render(root, 0, &mut dump);
        }
        insta::assert_snapshot!(dump, @r"
        start @2
          body @2
            declare-variable @3
              int-literal @3
            comment @4
            print @5
              binary-operation @5
                identifier @5
                int-literal @5
        ");
    }

    #[test]
    fn identities_are_stable_across_reparses_of_identical_text() {
        let source = wrap("        int x = 10;\n        System.out.println(x);");
        let (_, first, _) = build(&source);
        let (_, second, _) = build(&source);
        let first_ids: Vec<BlockId> = first.preorder().map(|b| b.id).collect();
        let second_ids: Vec<BlockId> = second.preorder().map(|b| b.id).collect();
        assert_eq!(first_ids, second_ids);
    }

    #[test]
    fn identities_outside_an_edited_region_are_untouched() {
        let before = wrap("        int x = 10;\n        System.out.println(x);");
        let after = wrap("        int x = 99;\n        System.out.println(x);");
        let (_, old_blocks, _) = build(&before);
        let (_, new_blocks, _) = build(&after);
        let old_print = old_blocks
            .preorder()
            .find(|b| b.kind == BlockKind::Print)
            .expect("print block");
        assert!(new_blocks.contains(old_print.id));
    }

    #[test]
    fn unknown_blocks_carry_the_recorded_diagnostic() {
        let source = wrap("        int = ;");
        let (_, blocks, _) = build(&source);
        let unknown = blocks
            .preorder()
            .find(|b| b.kind == BlockKind::Unknown)
            .expect("unknown block");
        assert!(unknown.error.is_some());
    }

    #[test]
    fn first_mapped_line_is_the_lowest() {
        let source = wrap("        int x = 10;\n        int y = 20;");
        let (tree, blocks, map) = build(&source);
        let body = &blocks.roots()[0].children[0];
        let first_line = tree.line_of(body.children[0].node.expect("node"));
        assert!(map.first_mapped_line().is_some_and(|line| line <= first_line));
    }
}
