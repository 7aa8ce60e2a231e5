//! Template literal locator.
//!
//! Walks the syntax tree in pre-order, classifies nodes into a small typed set
//! ([`SyntaxNode`]), and hands template literals to a [`TemplateVisitor`]. The visitor used by
//! [`locate_edits`] decides per literal whether it is eligible and turns every changed static
//! chunk into an [`Edit`].

use tracing::trace;
use tree_sitter::Node;

use crate::{
    edit::Edit,
    ignore::IgnoreRegions,
    minify::MinifyOptions,
    normalize::{NormalizeOptions, normalize_tracked},
    parse::{Walk, walk},
    position::Position,
};

/// Node kinds the locator cares about.
#[derive(Debug, Clone, Copy)]
pub enum SyntaxNode<'t> {
    Template(TemplateLiteral<'t>),
    Other,
}

impl<'t> SyntaxNode<'t> {
    pub fn classify(node: Node<'t>) -> Self {
        match node.kind() {
            "template_string" => SyntaxNode::Template(TemplateLiteral { node }),
            _ => SyntaxNode::Other,
        }
    }
}

/// A template literal (`` `...` ``), tagged or not.
#[derive(Debug, Clone, Copy)]
pub struct TemplateLiteral<'t> {
    node: Node<'t>,
}

/// One static chunk of a template literal: the raw text between a backtick or `}` and the next
/// `${` or backtick.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TemplateChunk<'s> {
    pub start: Position,
    pub end: Position,
    pub raw: &'s str,
}

impl TemplateChunk<'_> {
    pub fn is_empty(&self) -> bool {
        self.start.offset == self.end.offset
    }
}

impl<'t> TemplateLiteral<'t> {
    /// Position of the opening backtick.
    pub fn start(&self) -> Position {
        Position::from_point(self.node.start_position(), self.node.start_byte())
    }

    /// Whether this literal is the template of a tagged template expression (`` tag`...` ``).
    pub fn is_tagged(&self) -> bool {
        self.node.parent().is_some_and(|parent| {
            parent.kind() == "call_expression"
                && parent
                    .child_by_field_name("arguments")
                    .is_some_and(|args| args.id() == self.node.id())
        })
    }

    /// The literal's own static chunks in document order, empty ones included. Text belonging to
    /// substitutions (and so to nested literals) is never part of a chunk.
    pub fn chunks<'s>(&self, source: &'s str) -> Vec<TemplateChunk<'s>> {
        let mut cursor = self.node.walk();
        let children: Vec<Node<'t>> = self.node.children(&mut cursor).collect();
        let [open, inner @ .., close] = children.as_slice() else {
            return Vec::new();
        };

        let mut chunks = Vec::new();
        let mut push = |start: Position, end: Position| {
            if let Some(raw) = source.get(start.offset..end.offset) {
                chunks.push(TemplateChunk { start, end, raw });
            }
        };

        let mut start = Position::from_point(open.end_position(), open.end_byte());
        for child in inner {
            if child.kind() == "template_substitution" {
                push(
                    start,
                    Position::from_point(child.start_position(), child.start_byte()),
                );
                start = Position::from_point(child.end_position(), child.end_byte());
            }
        }
        push(
            start,
            Position::from_point(close.start_position(), close.start_byte()),
        );

        chunks
    }
}

/// Callback interface for [`visit_templates`].
pub trait TemplateVisitor<'t> {
    /// Called for each template literal in pre-order. Returning [`Walk::SkipSubtree`] hides every
    /// literal nested inside it.
    fn visit_template(&mut self, literal: &TemplateLiteral<'t>) -> Walk;
}

/// Dispatch every template literal under `root` to `visitor`.
pub fn visit_templates<'t>(root: Node<'t>, visitor: &mut impl TemplateVisitor<'t>) {
    walk(root, |node| match SyntaxNode::classify(node) {
        SyntaxNode::Template(literal) => visitor.visit_template(&literal),
        SyntaxNode::Other => Walk::Descend,
    });
}

/// Result of [`locate_edits`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Located {
    /// Edits sorted by start offset.
    pub edits: Vec<Edit>,
    /// Template literals visited.
    pub literals: usize,
    /// Literals skipped because an ignore marker guards them.
    pub ignored: usize,
}

struct EditCollector<'s, 'r> {
    source: &'s str,
    ignore: &'r IgnoreRegions,
    tagged_only: bool,
    normalize: NormalizeOptions,
    located: Located,
}

impl<'t> TemplateVisitor<'t> for EditCollector<'_, '_> {
    fn visit_template(&mut self, literal: &TemplateLiteral<'t>) -> Walk {
        self.located.literals += 1;
        let start = literal.start();

        if self.ignore.covers(start) {
            trace!(%start, "template literal ignored by marker");
            self.located.ignored += 1;
            return Walk::SkipSubtree;
        }

        // Substitutions may still hold tagged literals.
        if self.tagged_only && !literal.is_tagged() {
            return Walk::Descend;
        }

        for chunk in literal.chunks(self.source) {
            if chunk.is_empty() {
                continue;
            }
            let normalized = normalize_tracked(chunk.raw, &self.normalize);
            if normalized.text == chunk.raw {
                continue;
            }
            trace!(
                start = %chunk.start,
                end = %chunk.end,
                from = chunk.raw.len(),
                to = normalized.text.len(),
                "template chunk edit"
            );
            self.located.edits.push(Edit::with_origins(
                chunk.start.offset,
                chunk.end.offset,
                normalized.text,
                &normalized.origins,
            ));
        }

        Walk::Descend
    }
}

/// Collect the edits that normalize every eligible template chunk under `root`.
pub fn locate_edits(
    source: &str,
    root: Node<'_>,
    ignore: &IgnoreRegions,
    options: &MinifyOptions,
) -> Located {
    let mut collector = EditCollector {
        source,
        ignore,
        tagged_only: options.tagged_only,
        normalize: NormalizeOptions {
            keep_comments: options.keep_comments,
        },
        located: Located::default(),
    };
    visit_templates(root, &mut collector);

    // Chunks of an outer literal that follow a substitution come after the nested literal's.
    let mut located = collector.located;
    located.edits.sort_by_key(|e| e.start);
    located
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parse::{SourceType, parse};

    struct Collect(Vec<(bool, usize)>);

    impl<'t> TemplateVisitor<'t> for Collect {
        fn visit_template(&mut self, literal: &TemplateLiteral<'t>) -> Walk {
            self.0.push((literal.is_tagged(), literal.start().offset));
            Walk::Descend
        }
    }

    fn literals(src: &str) -> Vec<(bool, usize)> {
        let tree = parse(src, SourceType::Module, |_| {}).unwrap();
        let mut collect = Collect(Vec::new());
        visit_templates(tree.root_node(), &mut collect);
        collect.0
    }

    fn first_chunks(src: &str) -> Vec<String> {
        let tree = parse(src, SourceType::Module, |_| {}).unwrap();
        let mut found = None;
        walk(tree.root_node(), |node| {
            if found.is_none()
                && let SyntaxNode::Template(literal) = SyntaxNode::classify(node)
            {
                found = Some(
                    literal
                        .chunks(src)
                        .iter()
                        .map(|c| c.raw.to_string())
                        .collect(),
                );
            }
            Walk::Descend
        });
        found.unwrap()
    }

    fn located(src: &str, options: &MinifyOptions) -> Located {
        let mut ignore = IgnoreRegions::new();
        let tree = parse(src, options.source_type, |c| ignore.observe(&c)).unwrap();
        locate_edits(src, tree.root_node(), &ignore, options)
    }

    /// Literals are visited in pre-order, nested ones after their parent.
    #[test]
    fn visits_literals_in_pre_order() {
        let src = "a = `x${`y`}`; b = `z`;";
        let found = literals(src);
        let offsets: Vec<usize> = found.iter().map(|&(_, o)| o).collect();
        assert_eq!(offsets, vec![4, 8, 19]);
    }

    /// Only the template argument of a call expression counts as tagged.
    #[test]
    fn detects_tagged_templates() {
        assert_eq!(literals("h`x`;"), vec![(true, 1)]);
        assert_eq!(literals("a.b`x`;"), vec![(true, 3)]);
        assert_eq!(literals("`x`;"), vec![(false, 0)]);
        assert_eq!(literals("f(`x`);"), vec![(false, 2)]);
    }

    /// Chunks partition the static text around substitutions.
    #[test]
    fn splits_chunks_at_substitutions() {
        assert_eq!(first_chunks("`a${b}c${d}`"), vec!["a", "c", ""]);
        assert_eq!(first_chunks("``"), vec![""]);
        assert_eq!(first_chunks("` x ${`inner`} y `"), vec![" x ", " y "]);
        assert_eq!(first_chunks("`a\\n${b}`"), vec!["a\\n", ""]);
    }

    /// Unchanged chunks produce no edit.
    #[test]
    fn skips_unchanged_chunks() {
        let l = located("let a = `x y`;", &MinifyOptions::default());
        assert!(l.edits.is_empty());
        assert_eq!(l.literals, 1);
    }

    /// Edits cover exactly the chunk span.
    #[test]
    fn edits_cover_chunk_spans() {
        let src = "let a = `  <a>  ${b}  </a>  `;";
        let l = located(src, &MinifyOptions::default());
        assert_eq!(l.edits.len(), 2);
        assert_eq!(&src[l.edits[0].start..l.edits[0].end], "  <a>  ");
        assert_eq!(l.edits[0].replacement, "<a>");
        assert_eq!(&src[l.edits[1].start..l.edits[1].end], "  </a>  ");
        assert_eq!(l.edits[1].replacement, "</a>");
    }

    /// Edits from nested literals are interleaved in document order.
    #[test]
    fn sorts_nested_edits() {
        let src = "a = ` ${` x  `}  `;";
        let l = located(src, &MinifyOptions::default());
        let starts: Vec<usize> = l.edits.iter().map(|e| e.start).collect();
        let mut sorted = starts.clone();
        sorted.sort();
        assert_eq!(starts, sorted);
        assert_eq!(l.edits.len(), 2);
    }

    /// With `tagged_only`, untagged literals are left alone but their substitutions are not.
    #[test]
    fn tagged_only_is_per_literal() {
        let options = MinifyOptions {
            tagged_only: true,
            ..MinifyOptions::default()
        };
        let l = located("a = `x  ${h`y  z`}  `;", &options);
        assert_eq!(l.edits.len(), 1);
        assert_eq!(l.edits[0].replacement, "y z");
    }

    /// An ignored literal hides everything nested inside it.
    #[test]
    fn ignore_marker_skips_subtree() {
        let src = "/* minify-templates-ignore */\na = `x  ${`y  z`}`;\nb = `p  q`;";
        let l = located(src, &MinifyOptions::default());
        assert_eq!(l.literals, 2);
        assert_eq!(l.ignored, 1);
        assert_eq!(l.edits.len(), 1);
        assert_eq!(l.edits[0].replacement, "p q");
    }

    /// Origins recorded in edits are absolute input offsets.
    #[test]
    fn edit_origins_are_absolute() {
        let src = "a = `x   y`;";
        let l = located(src, &MinifyOptions::default());
        assert_eq!(l.edits[0].output_byte_to_input_byte, vec![Some(5), Some(6), Some(9)]);
    }
}
