use std::{fs, path::PathBuf};

use clap::Parser;
use minify_templates::{
    SourceType,
    locate::{SyntaxNode, TemplateLiteral},
    parse::{Walk, parse, walk},
};

#[derive(Parser, Debug)]
#[command(name = "parse")]
#[command(about = "Parse a JavaScript file with tree-sitter and print the CST", long_about = None)]
struct Args {
    /// Path to the source file to parse
    input: PathBuf,

    /// Parse as a classic script instead of a module
    #[arg(long)]
    script: bool,

    /// Print the tree in S-expression format instead of the default dump format
    #[arg(long, short)]
    sexp: bool,

    /// Print only template literals and their static chunks
    #[arg(long, short)]
    templates: bool,
}

fn main() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let args = Args::parse();

    let source = fs::read_to_string(&args.input)?;
    let source_type = if args.script {
        SourceType::Script
    } else {
        SourceType::Module
    };

    let tree = parse(&source, source_type, |comment| {
        eprintln!(
            "comment {:?} {}..{} {:?}",
            comment.kind, comment.start, comment.end, comment.text
        );
    })?;
    let root = tree.root_node();

    if args.sexp {
        println!("{}", root.to_sexp());
    } else if args.templates {
        walk(root, |node| {
            if let SyntaxNode::Template(literal) = SyntaxNode::classify(node) {
                dump_template(&source, &literal);
            }
            Walk::Descend
        });
    } else {
        dump_tree(&source, root, 0);
    }

    Ok(())
}

fn dump_template(source: &str, literal: &TemplateLiteral<'_>) {
    println!(
        "template at {} tagged={}",
        literal.start(),
        literal.is_tagged()
    );
    for chunk in literal.chunks(source) {
        println!(
            "  chunk {}..{} \"{}\"",
            chunk.start,
            chunk.end,
            truncate(&chunk.raw.replace('\n', "\\n"), 120)
        );
    }
}

fn dump_tree(source: &str, node: tree_sitter::Node<'_>, depth: usize) {
    let indent = "  ".repeat(depth);

    let start = node.start_position();
    let end = node.end_position();

    let text_preview = node
        .utf8_text(source.as_bytes())
        .ok()
        .map(|t| t.replace('\n', "\\n"))
        .unwrap_or_else(|| "<non-utf8>".to_string());

    println!(
        "{indent}{kind} [{sb}..{eb}] ({sl}:{sc})..({el}:{ec}) \"{text}\"",
        kind = node.kind(),
        sb = node.start_byte(),
        eb = node.end_byte(),
        sl = start.row,
        sc = start.column,
        el = end.row,
        ec = end.column,
        text = truncate(&text_preview, 120),
    );

    let mut cursor = node.walk();
    for child in node.children(&mut cursor) {
        dump_tree(source, child, depth + 1);
    }
}

fn truncate(s: &str, max: usize) -> String {
    if s.len() <= max {
        return s.to_string();
    }

    let mut end = max;
    while !s.is_char_boundary(end) {
        end -= 1;
    }
    format!("{}…", &s[..end])
}
