use crate::render::RenderError;
use std::fmt::Debug;
use textutil::escape_html;

/// Capability set every node variant provides. There are deliberately no
/// default bodies: a variant that misses an override does not compile.
pub trait NodeKind: Debug {
    /// Short variant name used in diagnostics.
    fn name(&self) -> &'static str;

    /// Whether this node, on its own, accepts `input`.
    fn matches(&self, input: &str) -> bool;

    /// Human-readable summary of this node.
    fn describe(&self) -> String;

    /// Presentation fragment for this node's body.
    fn render_body(&self) -> Result<String, RenderError>;

    /// Chain-compaction hook run by `Chain::flatten`.
    fn compact(&mut self) {}
}

/// A run of plain text matched verbatim.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Literal {
    pub text: String,
}

impl Literal {
    pub fn new(text: impl Into<String>) -> Self {
        Self { text: text.into() }
    }
}

impl NodeKind for Literal {
    fn name(&self) -> &'static str {
        "literal"
    }

    fn matches(&self, input: &str) -> bool {
        input == self.text
    }

    fn describe(&self) -> String {
        format!("literal '{}'", self.text)
    }

    fn render_body(&self) -> Result<String, RenderError> {
        Ok(format!(
            "<span class=\"rx_literal\">{}</span>",
            escape_html(&self.text)
        ))
    }
}

/// One member of a character class: a single character or an inclusive
/// range.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClassItem {
    Char(char),
    Range(char, char),
}

impl ClassItem {
    fn contains(&self, c: char) -> bool {
        match self {
            ClassItem::Char(member) => *member == c,
            ClassItem::Range(start, end) => (*start..=*end).contains(&c),
        }
    }

    fn spec(&self) -> String {
        match self {
            ClassItem::Char(c) => c.to_string(),
            ClassItem::Range(start, end) => format!("{start}-{end}"),
        }
    }
}

/// A character class, possibly negated. Accepts exactly one character.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CharClass {
    pub items: Vec<ClassItem>,
    pub negated: bool,
}

impl CharClass {
    pub fn new(items: Vec<ClassItem>, negated: bool) -> Self {
        Self { items, negated }
    }

    /// The class in `[...]` source form.
    pub fn spec(&self) -> String {
        let members: String = self.items.iter().map(ClassItem::spec).collect();
        if self.negated {
            format!("[^{members}]")
        } else {
            format!("[{members}]")
        }
    }

    fn contains(&self, c: char) -> bool {
        self.items.iter().any(|item| item.contains(c))
    }
}

impl NodeKind for CharClass {
    fn name(&self) -> &'static str {
        "class"
    }

    fn matches(&self, input: &str) -> bool {
        let mut chars = input.chars();
        match (chars.next(), chars.next()) {
            (Some(c), None) => self.contains(c) != self.negated,
            _ => false,
        }
    }

    fn describe(&self) -> String {
        let members: String = self.items.iter().map(ClassItem::spec).collect();
        if self.negated {
            format!("any character not in [{members}]")
        } else {
            format!("any character in [{members}]")
        }
    }

    fn render_body(&self) -> Result<String, RenderError> {
        Ok(format!(
            "<span class=\"rx_class\">{}</span>",
            escape_html(&self.spec())
        ))
    }
}

/// The `.` wildcard: any single character.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Wildcard;

impl NodeKind for Wildcard {
    fn name(&self) -> &'static str {
        "wildcard"
    }

    fn matches(&self, input: &str) -> bool {
        let mut chars = input.chars();
        chars.next().is_some() && chars.next().is_none()
    }

    fn describe(&self) -> String {
        "any single character".to_string()
    }

    fn render_body(&self) -> Result<String, RenderError> {
        Ok("<span class=\"rx_any\">.</span>".to_string())
    }
}

/// A capturing group. Groups carry a 1-based index and the raw inner text;
/// matching a group requires an execution engine, which is out of scope, so
/// a group on its own accepts nothing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Group {
    pub index: usize,
    pub inner: String,
}

impl Group {
    pub fn new(index: usize, inner: impl Into<String>) -> Self {
        Self {
            index,
            inner: inner.into(),
        }
    }
}

impl NodeKind for Group {
    fn name(&self) -> &'static str {
        "group"
    }

    fn matches(&self, _input: &str) -> bool {
        false
    }

    fn describe(&self) -> String {
        format!("group #{} over '{}'", self.index, self.inner)
    }

    fn render_body(&self) -> Result<String, RenderError> {
        Ok(format!(
            "<span class=\"rx_group\">({})</span>",
            escape_html(&self.inner)
        ))
    }
}

/// A repetition of the preceding node: `?`, `*`, `+` or a `{min,max}`
/// form. A missing `max` means unbounded.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Quantifier {
    pub min: u32,
    pub max: Option<u32>,
}

impl Quantifier {
    pub fn new(min: u32, max: Option<u32>) -> Self {
        Self { min, max }
    }

    fn wording(&self) -> String {
        match (self.min, self.max) {
            (0, Some(1)) => "zero or one time".to_string(),
            (0, None) => "zero or more times".to_string(),
            (1, None) => "one or more times".to_string(),
            (min, None) => format!("at least {min} times"),
            (min, Some(max)) if min == max => format!("exactly {min} times"),
            (min, Some(max)) => format!("between {min} and {max} times"),
        }
    }
}

impl NodeKind for Quantifier {
    fn name(&self) -> &'static str {
        "quantifier"
    }

    fn matches(&self, _input: &str) -> bool {
        false
    }

    fn describe(&self) -> String {
        format!("previous node repeated {}", self.wording())
    }

    fn render_body(&self) -> Result<String, RenderError> {
        if let Some(max) = self.max {
            if max < self.min {
                return Err(RenderError::InvalidQuantifier { min: self.min, max });
            }
        }
        Ok(format!(
            "<span class=\"rx_repeat\">{}</span>",
            escape_html(&self.wording())
        ))
    }
}

/// The `|` alternation marker between two branches.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Alternation;

impl NodeKind for Alternation {
    fn name(&self) -> &'static str {
        "alternation"
    }

    fn matches(&self, _input: &str) -> bool {
        false
    }

    fn describe(&self) -> String {
        "either the previous or the following branch".to_string()
    }

    fn render_body(&self) -> Result<String, RenderError> {
        Ok("<span class=\"rx_alt\">|</span>".to_string())
    }
}

/// A position assertion. Anchors consume no characters, so they accept
/// only the empty input.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Anchor {
    Start,
    End,
}

impl NodeKind for Anchor {
    fn name(&self) -> &'static str {
        "anchor"
    }

    fn matches(&self, input: &str) -> bool {
        input.is_empty()
    }

    fn describe(&self) -> String {
        match self {
            Anchor::Start => "start of input".to_string(),
            Anchor::End => "end of input".to_string(),
        }
    }

    fn render_body(&self) -> Result<String, RenderError> {
        let symbol = match self {
            Anchor::Start => "^",
            Anchor::End => "$",
        };
        Ok(format!("<span class=\"rx_anchor\">{symbol}</span>"))
    }
}
