mod query;

pub use query::encode_url_encoded_pairs;
pub use query::parse_url_encoded_pairs;
pub use query::replace_url_encoded_pairs;
pub use query::QueryEdit;
pub use query::QueryEntry;

/// Escapes the five predefined XML entities. `&` is handled first so
/// already-produced entities are not escaped twice.
pub fn escape_xml(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '>' => out.push_str("&gt;"),
            '<' => out.push_str("&lt;"),
            '\'' => out.push_str("&apos;"),
            '"' => out.push_str("&quot;"),
            c => out.push(c),
        }
    }
    out
}

/// Decodes the five predefined XML entities. `&amp;` is decoded last so the
/// other replacements cannot manufacture new entities.
pub fn unescape_xml(s: &str) -> String {
    s.replace("&gt;", ">")
        .replace("&lt;", "<")
        .replace("&apos;", "'")
        .replace("&quot;", "\"")
        .replace("&amp;", "&")
}

/// XML-escapes, then turns every newline convention into a line break tag.
pub fn escape_html(s: &str) -> String {
    escape_xml(s)
        .replace("\r\n", "<br />")
        .replace('\n', "<br />")
        .replace('\r', "<br />")
}

/// Wraps an HTML-escaped copy of `s` in a `<pre>` block.
pub fn plain_text_to_html(s: &str) -> String {
    format!("<pre>{}</pre>", escape_html(s))
}

fn is_source_safe(c: char) -> bool {
    c.is_ascii_alphanumeric() || " _+*/\\.,?!@#$%^&():;[]|><~-".contains(c)
}

/// Escapes `s` for embedding in a C-style quoted source literal (without the
/// quotes). Backslashes, quotes and common control characters become their
/// two-character escapes; any other character outside the printable safe set
/// becomes `\xHH` (code points up to 0xFF), `\uHHHH` (up to 0xFFFF), or a
/// diagnostic placeholder above that.
pub fn escape_to_source_literal(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '\\' => out.push_str("\\\\"),
            '\'' => out.push_str("\\'"),
            '"' => out.push_str("\\\""),
            '\t' => out.push_str("\\t"),
            '\r' => out.push_str("\\r"),
            '\u{000c}' => out.push_str("\\f"),
            '\u{000b}' => out.push_str("\\v"),
            '\n' => out.push_str("\\n"),
            c if is_source_safe(c) => out.push(c),
            c => {
                let code = c as u32;
                if code <= 0xff {
                    out.push_str(&format!("\\x{code:02x}"));
                } else if code <= 0xffff {
                    out.push_str(&format!("\\u{code:04x}"));
                } else {
                    out.push_str(&format!("[Unexplainable char 0x{code:x}]"));
                }
            }
        }
    }
    out
}

/// Escapes backslashes and regex metacharacters so `s` can be embedded in a
/// pattern as a literal value.
pub fn escape_regex_literal(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        if matches!(
            c,
            '\\' | '.' | '$' | '^' | '{' | '[' | '|' | '(' | ')' | ']' | '}' | '*' | '+' | '?'
        ) {
            out.push('\\');
        }
        out.push(c);
    }
    out
}

/// Rewrites CRLF and lone CR line endings to single LF characters.
pub fn normalise_newlines(s: &str) -> String {
    s.replace("\r\n", "\n").replace('\r', "\n")
}

/// Number of identical characters in `a` and `b`, comparing from `start`
/// in both. Returns 0 when `start` is past the end of either string.
/// Indices count characters, not bytes.
pub fn find_common_prefix_length(a: &str, b: &str, start: usize) -> usize {
    a.chars()
        .skip(start)
        .zip(b.chars().skip(start))
        .take_while(|(x, y)| x == y)
        .count()
}

/// Formats a character offset in `text` as a 1-based `l: <line> c:<col>`
/// label for diagnostics.
pub fn line_col_label(text: &str, pos: usize) -> String {
    let pos = pos.saturating_sub(1);
    let mut line = 1;
    let mut line_start = 0;
    for (i, c) in text.chars().take(pos + 1).enumerate() {
        if c == '\n' {
            line_start = i;
            line += 1;
        }
    }
    format!("l: {} c:{}", line, pos - line_start)
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_case::test_case;

    #[test]
    fn escape_xml_handles_ampersand_first() {
        assert_eq!(escape_xml("<&>"), "&lt;&amp;&gt;");
        assert_eq!(escape_xml("&amp;"), "&amp;amp;");
    }

    #[test_case(""; "empty")]
    #[test_case("plain text"; "plain")]
    #[test_case("a & b < c > d 'e' \"f\""; "all five entities")]
    #[test_case("&&&&"; "ampersand run")]
    fn xml_round_trip(s: &str) {
        assert_eq!(unescape_xml(&escape_xml(s)), s);
    }

    #[test]
    fn escape_html_converts_every_newline_convention() {
        assert_eq!(escape_html("a\r\nb\nc\rd"), "a<br />b<br />c<br />d");
        assert_eq!(escape_html("<a>\n"), "&lt;a&gt;<br />");
    }

    #[test]
    fn plain_text_wraps_in_pre() {
        assert_eq!(plain_text_to_html("x<y"), "<pre>x&lt;y</pre>");
    }

    #[test_case("back\\slash", "back\\\\slash"; "backslash")]
    #[test_case("it's \"here\"", "it\\'s \\\"here\\\""; "quotes")]
    #[test_case("a\tb\rc\nd", "a\\tb\\rc\\nd"; "common controls")]
    #[test_case("\u{000c}\u{000b}", "\\f\\v"; "form feed and vertical tab")]
    #[test_case("\u{0007}", "\\x07"; "bell as two digit hex")]
    #[test_case("caf\u{e9}", "caf\\xe9"; "latin1 as two digit hex")]
    #[test_case("\u{2211}", "\\u2211"; "bmp as four digit hex")]
    #[test_case("\u{1f600}", "[Unexplainable char 0x1f600]"; "astral placeholder")]
    fn source_literal_escapes(input: &str, expected: &str) {
        assert_eq!(escape_to_source_literal(input), expected);
    }

    #[test]
    fn source_literal_is_a_pure_function() {
        let input = "a\\b\u{1f600}'\"\n";
        assert_eq!(
            escape_to_source_literal(input),
            escape_to_source_literal(input)
        );
    }

    #[test]
    fn regex_literal_escapes_metacharacters() {
        assert_eq!(escape_regex_literal("a.b*c"), "a\\.b\\*c");
        assert_eq!(escape_regex_literal("(x|y)?"), "\\(x\\|y\\)\\?");
        assert_eq!(escape_regex_literal("\\d"), "\\\\d");
    }

    #[test]
    fn normalise_newlines_collapses_to_lf() {
        assert_eq!(normalise_newlines("a\r\nb\rc\nd"), "a\nb\nc\nd");
    }

    #[test_case("abcdef", "abcxyz", 0, 3; "common head")]
    #[test_case("abcdef", "abcdef", 0, 6; "identical")]
    #[test_case("abc", "xyz", 0, 0; "nothing common")]
    #[test_case("abcdef", "abcxef", 2, 1; "mid start")]
    #[test_case("ab", "abcdef", 5, 0; "start past shorter")]
    #[test_case("", "", 3, 0; "start past both")]
    fn common_prefix(a: &str, b: &str, start: usize, expected: usize) {
        assert_eq!(find_common_prefix_length(a, b, start), expected);
    }

    #[test]
    fn line_col_label_counts_lines() {
        assert_eq!(line_col_label("ab\ncd", 4), "l: 2 c:1");
        assert_eq!(line_col_label("ab", 0), "l: 1 c:0");
    }
}
