use std::cell::RefCell;

use tree_sitter::{Node, Parser, Tree};

use crate::{MinifyError, alloc::ensure_tree_sitter_allocator, position::Position};

thread_local! {
    /// Shared Tree-sitter parser instance. We reuse it to avoid reloading the language for each call.
    static JS_PARSER: RefCell<Parser> = {
        ensure_tree_sitter_allocator();

        let mut parser = Parser::new();
        parser
            .set_language(&tree_sitter_javascript::LANGUAGE.into())
            .expect("tree-sitter-javascript language load failed");
        RefCell::new(parser)
    };
}

/// Which JavaScript goal symbol the input is parsed as.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum SourceType {
    /// ES module: `import`/`export` declarations are allowed.
    #[default]
    Module,
    /// Classic script: top-level `import`/`export` declarations are rejected.
    Script,
}

impl std::fmt::Display for SourceType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SourceType::Module => f.write_str("module"),
            SourceType::Script => f.write_str("script"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommentKind {
    /// `// ...` (and legacy `<!--` / `-->` line comments).
    Line,
    /// `/* ... */`
    Block,
}

/// A comment found while parsing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Comment<'s> {
    pub kind: CommentKind,
    /// Full comment text including its delimiters.
    pub text: &'s str,
    pub start: Position,
    pub end: Position,
}

impl<'s> Comment<'s> {
    /// Comment text without its `/* */` or `//` delimiters.
    pub fn body(&self) -> &'s str {
        match self.kind {
            CommentKind::Block => self
                .text
                .strip_prefix("/*")
                .and_then(|t| t.strip_suffix("*/"))
                .unwrap_or(self.text),
            CommentKind::Line => self.text.strip_prefix("//").unwrap_or(self.text),
        }
    }
}

/// Traversal control returned by a [`walk`] visitor.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Walk {
    /// Visit this node's children next.
    Descend,
    /// Do not visit anything below this node.
    SkipSubtree,
}

/// Pre-order traversal of `root`, honouring [`Walk::SkipSubtree`].
///
/// Iterative, using a `TreeCursor`, so deeply nested input cannot overflow the stack.
pub fn walk<'t>(root: Node<'t>, mut visit: impl FnMut(Node<'t>) -> Walk) {
    let mut cursor = root.walk();
    'walk: loop {
        let descend = visit(cursor.node()) == Walk::Descend;

        if descend && cursor.goto_first_child() {
            continue;
        }

        loop {
            if cursor.goto_next_sibling() {
                break;
            }
            if !cursor.goto_parent() {
                break 'walk;
            }
        }
    }
}

/// Parse `source` as JavaScript and report every comment to `on_comment` in document order.
///
/// tree-sitter recovers from syntax errors, but a partially understood program is not safe to
/// rewrite, so any error or missing node fails the whole input.
pub fn parse<'s>(
    source: &'s str,
    source_type: SourceType,
    mut on_comment: impl FnMut(Comment<'s>),
) -> Result<Tree, MinifyError> {
    ensure_tree_sitter_allocator();

    let tree = JS_PARSER
        .with(|p| {
            let mut parser = p.borrow_mut();
            parser.parse(source, None)
        })
        .ok_or(MinifyError::ParseAborted)?;
    let root = tree.root_node();

    if root.has_error() {
        let at = first_error(root).unwrap_or(root).start_position();
        return Err(MinifyError::Syntax {
            line: at.row + 1,
            column: at.column,
        });
    }

    if source_type == SourceType::Script {
        let mut cursor = root.walk();
        if let Some(decl) = root
            .named_children(&mut cursor)
            .find(|n| matches!(n.kind(), "import_statement" | "export_statement"))
        {
            let at = decl.start_position();
            return Err(MinifyError::ModuleSyntaxInScript {
                line: at.row + 1,
                column: at.column,
            });
        }
    }

    walk(root, |node| {
        if matches!(node.kind(), "comment" | "html_comment")
            && let Some(text) = source.get(node.byte_range())
        {
            let kind = if text.starts_with("/*") {
                CommentKind::Block
            } else {
                CommentKind::Line
            };
            on_comment(Comment {
                kind,
                text,
                start: Position::from_point(node.start_position(), node.start_byte()),
                end: Position::from_point(node.end_position(), node.end_byte()),
            });
        }
        Walk::Descend
    });

    Ok(tree)
}

/// First `ERROR` or missing node in document order.
fn first_error(root: Node<'_>) -> Option<Node<'_>> {
    let mut found = None;
    walk(root, |node| {
        if found.is_some() || !node.has_error() {
            return Walk::SkipSubtree;
        }
        if node.is_error() || node.is_missing() {
            found = Some(node);
            return Walk::SkipSubtree;
        }
        Walk::Descend
    });
    found
}

#[cfg(test)]
mod tests {
    use super::*;

    fn comments(src: &str) -> Vec<Comment<'_>> {
        let mut out = Vec::new();
        parse(src, SourceType::Module, |c| out.push(c)).unwrap();
        out
    }

    #[test]
    fn parses_template_literals() {
        let tree = parse("let a = h`x ${`y`} z`;", SourceType::Module, |_| {}).unwrap();
        let sexp = tree.root_node().to_sexp();
        assert!(sexp.contains("template_string"));
        assert!(sexp.contains("template_substitution"));
    }

    #[test]
    fn reports_syntax_errors_with_position() {
        let err = parse("let a = `x`;\nlet b = );", SourceType::Module, |_| {}).unwrap_err();
        assert!(matches!(err, MinifyError::Syntax { line: 2, .. }), "{err:?}");
    }

    #[test]
    fn unterminated_template_is_a_syntax_error() {
        let err = parse("let a = `x", SourceType::Module, |_| {}).unwrap_err();
        assert!(matches!(err, MinifyError::Syntax { .. }));
    }

    #[test]
    fn script_rejects_module_declarations() {
        let src = "export const a = `x`;";
        assert!(parse(src, SourceType::Module, |_| {}).is_ok());
        let err = parse(src, SourceType::Script, |_| {}).unwrap_err();
        assert!(matches!(
            err,
            MinifyError::ModuleSyntaxInScript { line: 1, column: 0 }
        ));
    }

    #[test]
    fn reports_comments_in_order_with_positions() {
        let src = "// one\nlet a = 1; /* two */\n/*! three */";
        let found = comments(src);
        assert_eq!(found.len(), 3);

        assert_eq!(found[0].text, "// one");
        assert_eq!(found[0].kind, CommentKind::Line);
        assert_eq!(found[0].body(), " one");

        assert_eq!(found[1].text, "/* two */");
        assert_eq!(found[1].kind, CommentKind::Block);
        assert_eq!(found[1].body(), " two ");
        assert_eq!(found[1].start.line, 2);
        assert_eq!(found[1].start.column, 11);

        assert_eq!(found[2].body(), "! three ");
        assert_eq!(found[2].end.line, 3);
    }

    #[test]
    fn multi_line_block_comment_ends_on_its_last_line() {
        let src = "/*\n minify\n*/\nlet a = 1;";
        let found = comments(src);
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].start.line, 1);
        assert_eq!(found[0].end.line, 3);
    }

    #[test]
    fn walk_skips_subtrees() {
        let tree = parse("f(`a${`b`}`);", SourceType::Module, |_| {}).unwrap();
        let mut templates = 0;
        walk(tree.root_node(), |node| {
            if node.kind() == "template_string" {
                templates += 1;
                return Walk::SkipSubtree;
            }
            Walk::Descend
        });
        assert_eq!(templates, 1);
    }
}
