use chain::Alternation;
use chain::Anchor;
use chain::Chain;
use chain::CharClass;
use chain::ClassItem;
use chain::Group;
use chain::Literal;
use chain::NodeId;
use chain::NodeKind;
use chain::Quantifier;
use chain::Token;
use chain::Wildcard;
use thiserror::Error;

#[derive(Error, Clone, Debug, PartialEq, Eq)]
pub enum BuildError {
    #[error("unclosed group opened at offset {0}")]
    UnclosedGroup(usize),
    #[error("unmatched ')' at offset {0}")]
    UnmatchedGroupClose(usize),
    #[error("unclosed character class opened at offset {0}")]
    UnclosedClass(usize),
    #[error("dangling escape at end of pattern")]
    DanglingEscape,
    #[error("quantifier at offset {0} has nothing to repeat")]
    DanglingQuantifier(usize),
    #[error("malformed repetition braces at offset {0}")]
    MalformedRepetition(usize),
}

/// A chain built from a pattern. `head` is `None` for the empty pattern.
#[derive(Debug)]
pub struct BuiltChain {
    pub chain: Chain,
    pub head: Option<NodeId>,
}

/// Decomposes `pattern` into a flat chain of construction nodes, one per
/// syntactic unit, left to right. Every node records the raw span it
/// consumed as its source text and as one token (offsets count
/// characters).
pub fn build(pattern: &str) -> Result<BuiltChain, BuildError> {
    let mut builder = Builder {
        chars: pattern.chars().collect(),
        pos: 0,
        chain: Chain::new(),
        head: None,
        tail: None,
        groups: 0,
    };
    builder.run()?;
    Ok(BuiltChain {
        chain: builder.chain,
        head: builder.head,
    })
}

struct Builder {
    chars: Vec<char>,
    pos: usize,
    chain: Chain,
    head: Option<NodeId>,
    tail: Option<NodeId>,
    groups: usize,
}

fn word_items() -> Vec<ClassItem> {
    vec![
        ClassItem::Range('a', 'z'),
        ClassItem::Range('A', 'Z'),
        ClassItem::Range('0', '9'),
        ClassItem::Char('_'),
    ]
}

fn space_items() -> Vec<ClassItem> {
    vec![
        ClassItem::Char(' '),
        ClassItem::Char('\t'),
        ClassItem::Char('\r'),
        ClassItem::Char('\n'),
        ClassItem::Char('\u{000b}'),
        ClassItem::Char('\u{000c}'),
    ]
}

impl Builder {
    fn peek(&self) -> Option<char> {
        self.chars.get(self.pos).copied()
    }

    fn slice(&self, start: usize, end: usize) -> String {
        self.chars[start..end].iter().collect()
    }

    /// Creates a node over the consumed span `[start, end)`, records its
    /// source text and token, and links it to the chain tail.
    fn attach(&mut self, kind: Box<dyn NodeKind>, start: usize, end: usize) -> NodeId {
        let id = self.chain.push(kind);
        let text = self.slice(start, end);
        self.chain.set_source(id, text.clone());
        self.chain.add_tokens(id, [Token::new(start, text).into()]);
        match self.tail {
            Some(tail) => self.chain.set_next(tail, Some(id)),
            None => self.head = Some(id),
        }
        self.tail = Some(id);
        id
    }

    fn run(&mut self) -> Result<(), BuildError> {
        while let Some(c) = self.peek() {
            match c {
                '(' => self.group()?,
                ')' => return Err(BuildError::UnmatchedGroupClose(self.pos)),
                '[' => self.class()?,
                '?' | '*' | '+' => self.simple_quantifier()?,
                '{' => self.braced_quantifier()?,
                '|' => self.single(Box::new(Alternation)),
                '^' => self.single(Box::new(Anchor::Start)),
                '$' => self.single(Box::new(Anchor::End)),
                '.' => self.single(Box::new(Wildcard)),
                '\\' => match self.chars.get(self.pos + 1).copied() {
                    None => return Err(BuildError::DanglingEscape),
                    Some('d' | 'D' | 'w' | 'W' | 's' | 'S') => self.class_shorthand(),
                    Some(_) => self.literal_run()?,
                },
                _ => self.literal_run()?,
            }
        }
        Ok(())
    }

    fn single(&mut self, kind: Box<dyn NodeKind>) {
        let start = self.pos;
        self.pos += 1;
        self.attach(kind, start, self.pos);
    }

    fn class_shorthand(&mut self) {
        let start = self.pos;
        let c = self.chars[self.pos + 1];
        self.pos += 2;
        let (items, negated) = match c {
            'd' => (vec![ClassItem::Range('0', '9')], false),
            'D' => (vec![ClassItem::Range('0', '9')], true),
            'w' => (word_items(), false),
            'W' => (word_items(), true),
            's' => (space_items(), false),
            _ => (space_items(), true),
        };
        self.attach(Box::new(CharClass::new(items, negated)), start, self.pos);
    }

    /// Whether the current tail node can take a quantifier.
    fn repeatable(&self) -> bool {
        match self.tail {
            None => false,
            Some(tail) => !matches!(
                self.chain.kind(tail).name(),
                "quantifier" | "alternation" | "anchor"
            ),
        }
    }

    fn simple_quantifier(&mut self) -> Result<(), BuildError> {
        let start = self.pos;
        if !self.repeatable() {
            return Err(BuildError::DanglingQuantifier(start));
        }
        let c = self.chars[self.pos];
        self.pos += 1;
        let quantifier = match c {
            '?' => Quantifier::new(0, Some(1)),
            '*' => Quantifier::new(0, None),
            _ => Quantifier::new(1, None),
        };
        self.attach(Box::new(quantifier), start, self.pos);
        Ok(())
    }

    fn digits(&mut self) -> Option<u32> {
        let start = self.pos;
        while matches!(self.peek(), Some(c) if c.is_ascii_digit()) {
            self.pos += 1;
        }
        if self.pos == start {
            return None;
        }
        self.slice(start, self.pos).parse().ok()
    }

    fn braced_quantifier(&mut self) -> Result<(), BuildError> {
        let start = self.pos;
        if !self.repeatable() {
            return Err(BuildError::DanglingQuantifier(start));
        }
        self.pos += 1;
        let min = self
            .digits()
            .ok_or(BuildError::MalformedRepetition(start))?;
        let max = if self.peek() == Some(',') {
            self.pos += 1;
            if matches!(self.peek(), Some(c) if c.is_ascii_digit()) {
                Some(
                    self.digits()
                        .ok_or(BuildError::MalformedRepetition(start))?,
                )
            } else {
                None
            }
        } else {
            Some(min)
        };
        if self.peek() != Some('}') {
            return Err(BuildError::MalformedRepetition(start));
        }
        self.pos += 1;
        // Inverted bounds such as {5,2} build fine and fail at render
        // time, where they are reported per node.
        self.attach(Box::new(Quantifier::new(min, max)), start, self.pos);
        Ok(())
    }

    fn class(&mut self) -> Result<(), BuildError> {
        let start = self.pos;
        self.pos += 1;
        let negated = if self.peek() == Some('^') {
            self.pos += 1;
            true
        } else {
            false
        };
        let mut items = Vec::new();
        loop {
            match self.peek() {
                None => return Err(BuildError::UnclosedClass(start)),
                Some(']') => {
                    self.pos += 1;
                    break;
                }
                Some('\\') => {
                    let c = self
                        .chars
                        .get(self.pos + 1)
                        .copied()
                        .ok_or(BuildError::DanglingEscape)?;
                    self.pos += 2;
                    match c {
                        'd' => items.push(ClassItem::Range('0', '9')),
                        'w' => items.extend(word_items()),
                        's' => items.extend(space_items()),
                        'n' => items.push(ClassItem::Char('\n')),
                        'r' => items.push(ClassItem::Char('\r')),
                        't' => items.push(ClassItem::Char('\t')),
                        other => items.push(ClassItem::Char(other)),
                    }
                }
                Some(c) => {
                    self.pos += 1;
                    let range_end = self.chars.get(self.pos + 1).copied();
                    if self.peek() == Some('-') && range_end.is_some() && range_end != Some(']') {
                        self.pos += 2;
                        items.push(ClassItem::Range(c, range_end.unwrap()));
                    } else {
                        items.push(ClassItem::Char(c));
                    }
                }
            }
        }
        self.attach(Box::new(CharClass::new(items, negated)), start, self.pos);
        Ok(())
    }

    fn group(&mut self) -> Result<(), BuildError> {
        let start = self.pos;
        self.pos += 1;
        let inner_start = self.pos;
        let mut depth = 1usize;
        while depth > 0 {
            match self.peek() {
                None => return Err(BuildError::UnclosedGroup(start)),
                Some('\\') => {
                    if self.chars.get(self.pos + 1).is_none() {
                        return Err(BuildError::DanglingEscape);
                    }
                    self.pos += 2;
                }
                Some('[') => {
                    self.pos += 1;
                    loop {
                        match self.peek() {
                            None => return Err(BuildError::UnclosedClass(self.pos)),
                            Some('\\') => {
                                if self.chars.get(self.pos + 1).is_none() {
                                    return Err(BuildError::DanglingEscape);
                                }
                                self.pos += 2;
                            }
                            Some(']') => {
                                self.pos += 1;
                                break;
                            }
                            Some(_) => self.pos += 1,
                        }
                    }
                }
                Some('(') => {
                    depth += 1;
                    self.pos += 1;
                }
                Some(')') => {
                    depth -= 1;
                    self.pos += 1;
                }
                Some(_) => self.pos += 1,
            }
        }
        let inner = self.slice(inner_start, self.pos - 1);
        self.groups += 1;
        let index = self.groups;
        let id = self.attach(Box::new(Group::new(index, inner)), start, self.pos);
        self.chain.set_identifier(id, index.to_string());
        Ok(())
    }

    fn literal_run(&mut self) -> Result<(), BuildError> {
        let start = self.pos;
        let mut text = String::new();
        let mut char_starts = Vec::new();
        while let Some(c) = self.peek() {
            match c {
                '(' | ')' | '[' | '{' | '?' | '*' | '+' | '|' | '^' | '$' | '.' => break,
                '\\' => match self.chars.get(self.pos + 1).copied() {
                    None => return Err(BuildError::DanglingEscape),
                    Some('d' | 'D' | 'w' | 'W' | 's' | 'S') => break,
                    Some(esc) => {
                        char_starts.push(self.pos);
                        text.push(match esc {
                            'n' => '\n',
                            'r' => '\r',
                            't' => '\t',
                            other => other,
                        });
                        self.pos += 2;
                    }
                },
                c => {
                    char_starts.push(self.pos);
                    text.push(c);
                    self.pos += 1;
                }
            }
        }
        // A following quantifier binds to the last unit only, so split it
        // off into its own node.
        let quantifier_follows = matches!(self.peek(), Some('?' | '*' | '+' | '{'));
        if quantifier_follows && char_starts.len() > 1 {
            let split = char_starts[char_starts.len() - 1];
            let mut rest = text;
            let last = rest.pop().unwrap();
            self.attach(Box::new(Literal::new(rest)), start, split);
            self.attach(Box::new(Literal::new(last.to_string())), split, self.pos);
        } else {
            self.attach(Box::new(Literal::new(text)), start, self.pos);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chain::DiagnosticSink;
    use chain::RenderError;
    use test_case::test_case;

    fn descriptions(built: &BuiltChain) -> String {
        built.chain.describe_chain(built.head.unwrap())
    }

    #[test]
    fn empty_pattern_builds_an_empty_chain() {
        let built = build("").unwrap();
        assert!(built.head.is_none());
        assert!(built.chain.is_empty());
    }

    #[test]
    fn flat_pattern_decomposes_left_to_right() {
        let built = build(r"a(bc)\d+").unwrap();
        assert_eq!(
            descriptions(&built),
            "literal 'a', group #1 over 'bc', any character in [0-9], \
             previous node repeated one or more times"
        );
    }

    #[test]
    fn nodes_record_their_consumed_spans() {
        let built = build(r"a(bc)\d+").unwrap();
        let chain = &built.chain;
        let spans: Vec<(usize, String)> = chain
            .iter_from(built.head.unwrap())
            .map(|id| {
                let token = &chain.tokens(id)[0];
                (token.offset, token.value.clone())
            })
            .collect();
        assert_eq!(
            spans,
            vec![
                (0, "a".to_string()),
                (1, "(bc)".to_string()),
                (5, r"\d".to_string()),
                (7, "+".to_string()),
            ]
        );
    }

    #[test]
    fn quantifier_splits_the_last_literal_character() {
        let built = build("ab+").unwrap();
        assert_eq!(
            descriptions(&built),
            "literal 'a', literal 'b', previous node repeated one or more times"
        );
        let chain = &built.chain;
        let offsets: Vec<usize> = chain
            .iter_from(built.head.unwrap())
            .map(|id| chain.tokens(id)[0].offset)
            .collect();
        assert_eq!(offsets, vec![0, 1, 2]);
    }

    #[test]
    fn escaped_metacharacters_join_the_literal_run() {
        let built = build(r"a\.b").unwrap();
        assert_eq!(descriptions(&built), "literal 'a.b'");
        let chain = &built.chain;
        assert_eq!(chain.source(built.head.unwrap()), Some(r"a\.b"));
    }

    #[test]
    fn classes_parse_ranges_members_and_negation() {
        let built = build("[a-z_]").unwrap();
        assert_eq!(descriptions(&built), "any character in [a-z_]");

        let built = build("[^0-9]").unwrap();
        assert_eq!(descriptions(&built), "any character not in [0-9]");
    }

    #[test]
    fn trailing_dash_in_class_is_a_member() {
        let built = build("[a-]").unwrap();
        assert_eq!(descriptions(&built), "any character in [a-]");
    }

    #[test]
    fn groups_number_from_one_in_source_order() {
        let built = build("(a)(b)").unwrap();
        let chain = &built.chain;
        let ids: Vec<Option<&str>> = chain
            .iter_from(built.head.unwrap())
            .map(|id| chain.identifier(id))
            .collect();
        assert_eq!(ids, vec![Some("1"), Some("2")]);
    }

    #[test]
    fn nested_groups_capture_the_raw_inner_text() {
        let built = build("(a(b))").unwrap();
        assert_eq!(descriptions(&built), "group #1 over 'a(b)'");
    }

    #[test_case("x?", 0, Some(1); "question mark")]
    #[test_case("x*", 0, None; "star")]
    #[test_case("x+", 1, None; "plus")]
    #[test_case("x{3}", 3, Some(3); "exact")]
    #[test_case("x{2,5}", 2, Some(5); "closed range")]
    #[test_case("x{2,}", 2, None; "open range")]
    fn quantifier_forms(pattern: &str, min: u32, max: Option<u32>) {
        let built = build(pattern).unwrap();
        let chain = &built.chain;
        let quantifier = chain.last(built.head.unwrap());
        assert_eq!(chain.describe(quantifier), Quantifier::new(min, max).describe());
    }

    #[test]
    fn anchors_alternation_and_wildcard_become_single_nodes() {
        let built = build("^a|.$").unwrap();
        assert_eq!(
            descriptions(&built),
            "start of input, literal 'a', either the previous or the following branch, \
             any single character, end of input"
        );
    }

    #[test_case("(", BuildError::UnclosedGroup(0); "unclosed group")]
    #[test_case("a)", BuildError::UnmatchedGroupClose(1); "unmatched close")]
    #[test_case("[ab", BuildError::UnclosedClass(0); "unclosed class")]
    #[test_case(r"a\", BuildError::DanglingEscape; "dangling escape")]
    #[test_case("+a", BuildError::DanglingQuantifier(0); "leading quantifier")]
    #[test_case("a++", BuildError::DanglingQuantifier(2); "stacked quantifiers")]
    #[test_case("a{x}", BuildError::MalformedRepetition(1); "non numeric braces")]
    fn malformed_patterns_report_typed_errors(pattern: &str, expected: BuildError) {
        assert_eq!(build(pattern).unwrap_err(), expected);
    }

    #[test]
    fn inverted_bounds_build_but_fail_at_render_time() {
        #[derive(Default)]
        struct Recording(Vec<(Option<String>, RenderError)>);

        impl DiagnosticSink for Recording {
            fn render_failure(&mut self, identifier: Option<&str>, error: &RenderError) {
                self.0.push((identifier.map(str::to_string), error.clone()));
            }
        }

        let built = build("x{5,2}").unwrap();
        let mut sink = Recording::default();
        let markup = built
            .chain
            .render_chain_markup(built.head.unwrap(), &mut sink);
        assert!(markup.contains("rx_literal\">x"));
        assert!(!markup.contains("rx_repeat"));
        assert_eq!(sink.0.len(), 1);
        assert_eq!(
            sink.0[0].1,
            RenderError::InvalidQuantifier { min: 5, max: 2 }
        );
    }
}
