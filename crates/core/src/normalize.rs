//! Whitespace normalization of raw template literal text.
//!
//! Rules, applied in order to one static chunk of a template literal:
//!
//! 1. Every maximal run of JavaScript whitespace (the ECMAScript `WhiteSpace` and
//!    `LineTerminator` sets, i.e. what `\s` matches in a JS regex) becomes one ASCII space.
//! 2. A space between `>` and `<` is removed (`> <` becomes `><`).
//! 3. A space at the very start of the chunk followed by `<` is removed.
//! 4. A space at the very end of the chunk preceded by `>` is removed.
//! 5. Spaces around a node reference token (`#` followed by word characters) sitting between
//!    two tags are removed (`> #ref <` becomes `>#ref<`).
//! 6. Unless comments are kept, HTML comments (`<!-- ... -->`) are removed.
//!
//! Collapsing runs first means rules 2-5 only ever see single ASCII spaces, whichever whitespace
//! characters the source used.
//!
//! The input is the chunk's raw source text, so escape sequences such as `\n` are two ordinary
//! characters here and are never touched. A whitespace character escaped by a backslash (a line
//! continuation, or `\ `) belongs to its escape and is kept as written.
//!
//! A comment is kept when cutting it out would join its neighbours into new syntax: a `$` before
//! it and a `{` after it would open a substitution, and an unpaired backslash before it would
//! escape whatever follows.
//!
//! Alongside the text, [`normalize_tracked`] records for every output byte the byte offset in the
//! raw chunk it came from, which the sourcemap generator uses to map inside edited chunks.

use std::sync::LazyLock;

use regex::Regex;

static TAG_GAP: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"> <").unwrap());
static LEADING_GAP: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\A <").unwrap());
static TRAILING_GAP: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"> \z").unwrap());
static NODE_REF_GAP: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"> #[A-Za-z0-9_]+ <").unwrap());
static HTML_COMMENT: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(?s)<!--.*?-->").unwrap());

/// Options for [`normalize`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct NormalizeOptions {
    /// Keep `<!-- ... -->` comments instead of removing them.
    pub keep_comments: bool,
}

/// Normalized text plus per-byte provenance.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Normalized {
    pub text: String,
    /// `origins[i]` is the byte offset in the raw input that output byte `i` came from. A space
    /// produced by collapsing a run points at the first byte of that run.
    pub origins: Vec<usize>,
}

/// Whether `c` is whitespace as far as a JavaScript `\s` is concerned.
///
/// This differs from [`char::is_whitespace`]: U+FEFF counts, U+0085 does not.
pub fn is_js_whitespace(c: char) -> bool {
    matches!(
        c,
        '\t' | '\n'
            | '\u{b}'
            | '\u{c}'
            | '\r'
            | ' '
            | '\u{a0}'
            | '\u{1680}'
            | '\u{2000}'..='\u{200a}'
            | '\u{2028}'
            | '\u{2029}'
            | '\u{202f}'
            | '\u{205f}'
            | '\u{3000}'
            | '\u{feff}'
    )
}

/// Normalize one raw template chunk.
pub fn normalize(raw: &str, options: &NormalizeOptions) -> String {
    normalize_tracked(raw, options).text
}

/// Normalize one raw template chunk, keeping track of where each output byte came from.
pub fn normalize_tracked(raw: &str, options: &NormalizeOptions) -> Normalized {
    let mut out = collapse_whitespace(raw);

    for rule in [&TAG_GAP, &LEADING_GAP, &TRAILING_GAP, &NODE_REF_GAP] {
        let spaces: Vec<usize> = rule
            .find_iter(&out.text)
            .flat_map(|m| {
                m.range()
                    .filter(|&i| out.text.as_bytes()[i] == b' ')
                    .collect::<Vec<_>>()
            })
            .collect();
        out.remove(spaces.into_iter().map(|i| (i, i + 1)));
    }

    if !options.keep_comments {
        let comments = removable_comments(&out.text);
        out.remove(comments);
    }

    out
}

/// Ranges of the HTML comments in `text` that can be cut out without changing what the
/// surrounding characters mean.
fn removable_comments(text: &str) -> Vec<(usize, usize)> {
    let mut ranges = Vec::new();
    let mut kept = String::new();
    let mut cursor = 0;
    for m in HTML_COMMENT.find_iter(text) {
        kept.push_str(&text[cursor..m.start()]);
        cursor = m.start();
        if joins_cleanly(&kept, &text[m.end()..]) {
            ranges.push((m.start(), m.end()));
            cursor = m.end();
        }
    }
    ranges
}

/// Whether `before` followed directly by `after` reads the same as with a comment in between.
fn joins_cleanly(before: &str, after: &str) -> bool {
    if before.ends_with('$') && after.starts_with('{') {
        return false;
    }
    let backslashes = before.bytes().rev().take_while(|&b| b == b'\\').count();
    backslashes % 2 == 0
}

fn collapse_whitespace(raw: &str) -> Normalized {
    let mut text = String::with_capacity(raw.len());
    let mut origins = Vec::with_capacity(raw.len());
    let mut in_run = false;
    let mut escaped = false;

    let mut chars = raw.char_indices().peekable();
    while let Some((i, c)) = chars.next() {
        if escaped {
            escaped = false;
            in_run = false;
            text.push(c);
            origins.extend(i..i + c.len_utf8());
            // `\` CR LF is a single line continuation.
            if c == '\r'
                && let Some(&(j, '\n')) = chars.peek()
            {
                chars.next();
                text.push('\n');
                origins.push(j);
            }
            continue;
        }
        if is_js_whitespace(c) {
            if !in_run {
                text.push(' ');
                origins.push(i);
                in_run = true;
            }
        } else {
            in_run = false;
            escaped = c == '\\';
            text.push(c);
            origins.extend(i..i + c.len_utf8());
        }
    }

    Normalized { text, origins }
}

impl Normalized {
    /// Drop the given byte ranges. Ranges must be ascending, disjoint and on char boundaries.
    fn remove(&mut self, ranges: impl IntoIterator<Item = (usize, usize)>) {
        let mut ranges = ranges.into_iter().peekable();
        if ranges.peek().is_none() {
            return;
        }

        let mut text = String::with_capacity(self.text.len());
        let mut origins = Vec::with_capacity(self.origins.len());
        let mut cursor = 0usize;
        for (start, end) in ranges {
            text.push_str(&self.text[cursor..start]);
            origins.extend_from_slice(&self.origins[cursor..start]);
            cursor = end;
        }
        text.push_str(&self.text[cursor..]);
        origins.extend_from_slice(&self.origins[cursor..]);

        self.text = text;
        self.origins = origins;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const WHITESPACE: &[(char, &str)] = &[
        (' ', "space"),
        ('\u{c}', "form feed"),
        ('\n', "line feed"),
        ('\r', "carriage return"),
        ('\t', "horizontal tab"),
        ('\u{b}', "vertical tab"),
        ('\u{a0}', "no-break space"),
        ('\u{1680}', "ogham space mark"),
        ('\u{2000}', "en quad"),
        ('\u{2001}', "em quad"),
        ('\u{2002}', "en space"),
        ('\u{2003}', "em space"),
        ('\u{2004}', "three-per-em space"),
        ('\u{2005}', "four-per-em space"),
        ('\u{2006}', "six-per-em space"),
        ('\u{2007}', "figure space"),
        ('\u{2008}', "punctuation space"),
        ('\u{2009}', "thin space"),
        ('\u{200a}', "hair space"),
        ('\u{2028}', "line separator"),
        ('\u{2029}', "paragraph separator"),
        ('\u{202f}', "narrow no-break space"),
        ('\u{205f}', "medium mathematical space"),
        ('\u{3000}', "ideographic space"),
        ('\u{feff}', "zero width no-break space"),
    ];

    fn all_whitespace() -> String {
        WHITESPACE.iter().map(|&(c, _)| c).collect()
    }

    fn norm(raw: &str) -> String {
        normalize(raw, &NormalizeOptions::default())
    }

    fn norm_keep(raw: &str) -> String {
        normalize(
            raw,
            &NormalizeOptions {
                keep_comments: true,
            },
        )
    }

    #[test]
    fn reduces_each_whitespace_to_single_space() {
        for &(c, name) in WHITESPACE {
            assert_eq!(norm(&c.to_string()), " ", "single {name}");
            assert_eq!(norm(&c.to_string().repeat(3)), " ", "multiple {name}");
        }
    }

    #[test]
    fn reduces_mixed_whitespace_to_single_space() {
        assert_eq!(norm(&all_whitespace()), " ");
    }

    #[test]
    fn zero_width_space_is_not_whitespace() {
        assert_eq!(norm("a\u{200b}\u{200b}b"), "a\u{200b}\u{200b}b");
        assert!(!is_js_whitespace('\u{85}'));
    }

    #[test]
    fn leaves_escape_sequences_alone() {
        let raw = r"' '' '' '\f\n\r\t\v\u00a0\u1680\u2000\u2028\u2029\u3000\ufeff";
        assert_eq!(norm(raw), raw);
    }

    #[test]
    fn removes_space_between_tags() {
        assert_eq!(norm("> <"), "><");
        assert_eq!(norm(&format!(">{}<", all_whitespace())), "><");
    }

    #[test]
    fn removes_space_between_start_and_tag() {
        assert_eq!(norm(" <"), "<");
        assert_eq!(norm(&format!("{}<", all_whitespace())), "<");
    }

    #[test]
    fn removes_space_between_tag_and_end() {
        assert_eq!(norm("> "), ">");
        assert_eq!(norm(&format!(">{}", all_whitespace())), ">");
    }

    #[test]
    fn keeps_space_next_to_text() {
        for raw in ["text <", "| <", "© <", "> text", "> |", "> ©", "> >", "< <"] {
            assert_eq!(norm(raw), raw);
        }
    }

    #[test]
    fn collapses_markup() {
        assert_eq!(norm("   <a>b   </a>   "), "<a>b </a>");
        assert_eq!(
            norm("\n  <ul>\n    <li>one</li>\n    <li>two</li>\n  </ul>\n"),
            "<ul><li>one</li><li>two</li></ul>"
        );
    }

    #[test]
    fn removes_space_around_node_refs() {
        assert_eq!(norm("<div> #a </div>"), "<div>#a</div>");
        assert_eq!(norm("\n<div>\n  <br> #a\n</div>\n"), "<div><br>#a</div>");
        assert_eq!(norm("\n<div>\n  #a <br>\n</div>\n"), "<div>#a<br></div>");
        assert_eq!(norm("<a href=#>   #link3 </a>"), "<a href=#>#link3</a>");
    }

    #[test]
    fn keeps_space_around_invalid_node_refs() {
        assert_eq!(norm("<div> #a b </div>"), "<div> #a b </div>");
        assert_eq!(norm("<div> # </div>"), "<div> # </div>");
    }

    #[test]
    fn removes_html_comments_by_default() {
        assert_eq!(norm("<!--   -->"), "");
        assert_eq!(norm("<!--\n\n\n-->"), "");
        assert_eq!(norm("<!--\t\t\t-->"), "");
        assert_eq!(norm("   <!--<br>   <br>   <br>-->   "), "");
        assert_eq!(norm("<p>a<!-- x -->b</p>"), "<p>ab</p>");
    }

    #[test]
    fn keeps_html_comments_when_asked() {
        assert_eq!(norm_keep("<!--   -->"), "<!-- -->");
        assert_eq!(norm_keep("<!--\n\n\n-->"), "<!-- -->");
        assert_eq!(norm_keep("<!--\t\t\t-->"), "<!-- -->");
        assert_eq!(
            norm_keep("   <!--<br>   <br>   <br>-->   "),
            "<!--<br><br><br>-->"
        );
    }

    #[test]
    fn comment_removal_is_non_greedy() {
        assert_eq!(norm("<!-- a -->x<!-- b -->"), "x");
    }

    #[test]
    fn keeps_comment_between_dollar_and_brace() {
        assert_eq!(norm("$<!-- x -->{alert(1)}"), "$<!-- x -->{alert(1)}");
        assert_eq!(norm("$<!-- a --><!-- b -->{"), "$<!-- b -->{");
        assert_eq!(norm("$<!-- x --> {"), "$ {");
        assert_eq!(norm("<!-- x -->{"), "{");
    }

    #[test]
    fn keeps_comment_after_unpaired_backslash() {
        assert_eq!(norm(r"\<!-- x -->n"), r"\<!-- x -->n");
        assert_eq!(norm(r"a\<!-- x -->"), r"a\<!-- x -->");
        assert_eq!(norm(r"\\<!-- x -->n"), r"\\n");
    }

    #[test]
    fn keeps_escaped_whitespace() {
        assert_eq!(norm("a\\\n  b"), "a\\\n b");
        assert_eq!(norm("a\\\r\n\r\nb"), "a\\\r\n b");
        assert_eq!(norm("a\\   b"), "a\\  b");
        assert_eq!(norm("a\\\\   b"), "a\\\\ b");
    }

    #[test]
    fn empty_input_stays_empty() {
        assert_eq!(norm(""), "");
    }

    #[test]
    fn tracks_origins_of_collapsed_runs() {
        let n = normalize_tracked("x   y", &NormalizeOptions::default());
        assert_eq!(n.text, "x y");
        assert_eq!(n.origins, vec![0, 1, 4]);
    }

    #[test]
    fn tracks_origins_across_removed_spaces() {
        let n = normalize_tracked("  <a>\n  <b>  ", &NormalizeOptions::default());
        assert_eq!(n.text, "<a><b>");
        assert_eq!(n.origins, vec![2, 3, 4, 8, 9, 10]);
    }

    #[test]
    fn tracks_origins_of_multibyte_text() {
        let raw = "©\u{3000}\u{3000}é";
        let n = normalize_tracked(raw, &NormalizeOptions::default());
        assert_eq!(n.text, "© é");
        // '©' is 2 bytes, each ideographic space is 3 bytes, 'é' is 2 bytes.
        assert_eq!(n.origins, vec![0, 1, 2, 8, 9]);
        assert_eq!(n.origins.len(), n.text.len());
    }
}
