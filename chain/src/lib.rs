mod kind;
mod render;

pub use kind::Alternation;
pub use kind::Anchor;
pub use kind::CharClass;
pub use kind::ClassItem;
pub use kind::Group;
pub use kind::Literal;
pub use kind::NodeKind;
pub use kind::Quantifier;
pub use kind::Wildcard;
pub use render::is_highlighted;
pub use render::DiagnosticSink;
pub use render::HighlightSpan;
pub use render::RenderError;
pub use render::TracingSink;

/// A contiguous span of source text consumed by one node of the chain.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Token {
    pub offset: usize,
    pub value: String,
}

impl Token {
    pub fn new(offset: usize, value: impl Into<String>) -> Self {
        Self {
            offset,
            value: value.into(),
        }
    }
}

/// Argument shape for [`Chain::add_tokens`]: a bare token or an arbitrarily
/// nested list, flattened depth-first on insertion.
#[derive(Debug, Clone)]
pub enum TokenTree {
    Leaf(Token),
    List(Vec<TokenTree>),
}

impl From<Token> for TokenTree {
    fn from(token: Token) -> Self {
        TokenTree::Leaf(token)
    }
}

impl From<Vec<TokenTree>> for TokenTree {
    fn from(items: Vec<TokenTree>) -> Self {
        TokenTree::List(items)
    }
}

/// Index of a node slot inside one [`Chain`]. Ids are only meaningful for
/// the chain that issued them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct NodeId(usize);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct TokenListId(usize);

#[derive(Debug)]
struct Node {
    kind: Box<dyn NodeKind>,
    next: Option<NodeId>,
    identifier: Option<String>,
    source: Option<String>,
    tokens: TokenListId,
}

/// An arena-owned, singly-linked sequence of polymorphic regex-construction
/// nodes. Token lists live in a side table so [`Chain::copy_from`] can share
/// one list between two nodes.
///
/// Chains must stay acyclic; linking a node back into its own chain is a
/// caller contract violation. Debug builds assert on it, release builds do
/// not pay for detection.
#[derive(Debug, Default)]
pub struct Chain {
    nodes: Vec<Node>,
    token_lists: Vec<Vec<Token>>,
}

impl Chain {
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates an unlinked node with an empty token list.
    pub fn push(&mut self, kind: Box<dyn NodeKind>) -> NodeId {
        let tokens = TokenListId(self.token_lists.len());
        self.token_lists.push(Vec::new());
        self.nodes.push(Node {
            kind,
            next: None,
            identifier: None,
            source: None,
            tokens,
        });
        NodeId(self.nodes.len() - 1)
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    fn node(&self, id: NodeId) -> &Node {
        &self.nodes[id.0]
    }

    fn node_mut(&mut self, id: NodeId) -> &mut Node {
        &mut self.nodes[id.0]
    }

    pub fn next(&self, id: NodeId) -> Option<NodeId> {
        self.node(id).next
    }

    pub fn set_next(&mut self, id: NodeId, next: Option<NodeId>) {
        self.node_mut(id).next = next;
    }

    pub fn identifier(&self, id: NodeId) -> Option<&str> {
        self.node(id).identifier.as_deref()
    }

    pub fn set_identifier(&mut self, id: NodeId, label: impl Into<String>) {
        self.node_mut(id).identifier = Some(label.into());
    }

    pub fn source(&self, id: NodeId) -> Option<&str> {
        self.node(id).source.as_deref()
    }

    pub fn set_source(&mut self, id: NodeId, expression: impl Into<String>) {
        self.node_mut(id).source = Some(expression.into());
    }

    pub fn kind(&self, id: NodeId) -> &dyn NodeKind {
        self.node(id).kind.as_ref()
    }

    pub fn tokens(&self, id: NodeId) -> &[Token] {
        &self.token_lists[self.node(id).tokens.0]
    }

    /// True when both nodes hold the same token list, as after
    /// [`Chain::copy_from`].
    pub fn shares_tokens(&self, a: NodeId, b: NodeId) -> bool {
        self.node(a).tokens == self.node(b).tokens
    }

    /// Appends tokens to the node's list, flattening nested lists
    /// depth-first and preserving order. Empty input is a no-op.
    pub fn add_tokens(&mut self, id: NodeId, items: impl IntoIterator<Item = TokenTree>) {
        fn append(list: &mut Vec<Token>, item: TokenTree) {
            match item {
                TokenTree::Leaf(token) => list.push(token),
                TokenTree::List(items) => {
                    for item in items {
                        append(list, item);
                    }
                }
            }
        }
        let list = self.node(id).tokens;
        for item in items {
            append(&mut self.token_lists[list.0], item);
        }
    }

    /// Walks node ids from `start` to the end of the chain.
    pub fn iter_from(&self, start: NodeId) -> ChainIter<'_> {
        ChainIter {
            chain: self,
            cursor: Some(start),
            hops: 0,
        }
    }

    /// Number of nodes reachable from `start`, itself included.
    pub fn chain_len(&self, start: NodeId) -> usize {
        self.iter_from(start).count()
    }

    /// Whether this node accepts `input`. Chain-level matching is the
    /// caller's job: walk [`Chain::next`] and combine verdicts.
    pub fn matches(&self, id: NodeId, input: &str) -> bool {
        self.node(id).kind.matches(input)
    }

    /// Human-readable summary of this node alone.
    pub fn describe(&self, id: NodeId) -> String {
        self.node(id).kind.describe()
    }

    /// Comma-joined [`Chain::describe`] over this node and all successors,
    /// in chain order.
    pub fn describe_chain(&self, start: NodeId) -> String {
        let mut out = String::new();
        for id in self.iter_from(start) {
            if !out.is_empty() {
                out.push_str(", ");
            }
            out.push_str(&self.describe(id));
        }
        out
    }

    /// The final node of the chain, whose `next` is `None`.
    pub fn last(&self, start: NodeId) -> NodeId {
        let mut current = start;
        let mut hops = 0;
        while let Some(next) = self.node(current).next {
            hops += 1;
            debug_assert!(hops <= self.nodes.len(), "node chain contains a cycle");
            current = next;
        }
        current
    }

    /// Recursively normalizes `next` links in place, running each kind's
    /// compaction hook, and returns `start` for chaining.
    pub fn flatten(&mut self, start: NodeId) -> NodeId {
        self.node_mut(start).kind.compact();
        if let Some(next) = self.node(start).next {
            let flattened = self.flatten(next);
            self.node_mut(start).next = Some(flattened);
        }
        start
    }

    /// Links `tail` after the last node of the chain starting at `start`.
    /// `tail` must not already be reachable from `start`.
    pub fn append_at_end(&mut self, start: NodeId, tail: NodeId) {
        debug_assert!(
            self.iter_from(start).all(|id| id != tail),
            "tail is already reachable from this chain"
        );
        let last = self.last(start);
        self.node_mut(last).next = Some(tail);
    }

    /// Transplants `next`, `identifier` and the token list handle from
    /// `src` onto `dst`. The token list is shared, not cloned; `dst`'s kind
    /// and source text are untouched, and its identity is preserved for
    /// external holders.
    pub fn copy_from(&mut self, dst: NodeId, src: NodeId) {
        let (next, identifier, tokens) = {
            let src = self.node(src);
            (src.next, src.identifier.clone(), src.tokens)
        };
        let dst = self.node_mut(dst);
        dst.next = next;
        dst.identifier = identifier;
        dst.tokens = tokens;
    }

    /// Invokes `op` with this chain and `id`; returns its result.
    pub fn apply_to_self<R>(&mut self, id: NodeId, op: impl FnOnce(&mut Self, NodeId) -> R) -> R {
        op(self, id)
    }

    /// Applies `op` to `start`, then recursively replaces the successor
    /// with the result of walking the old successor. Returns `op`'s result
    /// for the first node only. Replacement segments returned by `op` are
    /// not re-walked: `op` runs exactly once per node of the original
    /// chain.
    pub fn apply_to_chain<F>(&mut self, start: NodeId, op: &mut F) -> NodeId
    where
        F: FnMut(&mut Self, NodeId) -> NodeId,
    {
        let result = self.apply_to_self(start, |chain, id| op(chain, id));
        if let Some(next) = self.node(start).next {
            let replacement = self.apply_to_chain(next, op);
            self.node_mut(start).next = Some(replacement);
        }
        result
    }
}

pub struct ChainIter<'a> {
    chain: &'a Chain,
    cursor: Option<NodeId>,
    hops: usize,
}

impl Iterator for ChainIter<'_> {
    type Item = NodeId;

    fn next(&mut self) -> Option<Self::Item> {
        let id = self.cursor?;
        self.hops += 1;
        debug_assert!(
            self.hops <= self.chain.nodes.len(),
            "node chain contains a cycle"
        );
        self.cursor = self.chain.node(id).next;
        Some(id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn literal_chain(chain: &mut Chain, texts: &[&str]) -> NodeId {
        let head = chain.push(Box::new(Literal::new(texts[0])));
        let mut tail = head;
        for text in &texts[1..] {
            let node = chain.push(Box::new(Literal::new(*text)));
            chain.set_next(tail, Some(node));
            tail = node;
        }
        head
    }

    #[test]
    fn describe_chain_has_one_segment_per_node() {
        let mut chain = Chain::new();
        let head = literal_chain(&mut chain, &["a", "b", "c"]);
        let description = chain.describe_chain(head);
        assert_eq!(description.split(", ").count(), chain.chain_len(head));
        assert_eq!(description, "literal 'a', literal 'b', literal 'c'");
    }

    #[test]
    fn add_tokens_flattens_nested_lists_in_order() {
        let mut chain = Chain::new();
        let node = chain.push(Box::new(Literal::new("x")));
        let a = Token::new(0, "a");
        let b = Token::new(1, "b");
        let c = Token::new(2, "c");
        let d = Token::new(3, "d");
        chain.add_tokens(
            node,
            [
                TokenTree::List(vec![
                    a.clone().into(),
                    TokenTree::List(vec![b.clone().into(), c.clone().into()]),
                ]),
                d.clone().into(),
            ],
        );
        assert_eq!(chain.tokens(node), &[a, b, c, d]);
    }

    #[test]
    fn add_tokens_with_empty_input_is_a_no_op() {
        let mut chain = Chain::new();
        let node = chain.push(Box::new(Literal::new("x")));
        chain.add_tokens(node, []);
        assert!(chain.tokens(node).is_empty());
    }

    #[test]
    fn append_at_end_joins_two_chains() {
        let mut chain = Chain::new();
        let head = literal_chain(&mut chain, &["a", "b", "c"]);
        let tail = literal_chain(&mut chain, &["d", "e"]);
        chain.append_at_end(head, tail);
        assert_eq!(chain.chain_len(head), 5);
        let last = chain.last(head);
        assert_eq!(chain.iter_from(head).nth(4), Some(last));
        assert_eq!(chain.next(last), None);
    }

    #[test]
    fn last_of_single_node_is_itself() {
        let mut chain = Chain::new();
        let node = chain.push(Box::new(Literal::new("a")));
        assert_eq!(chain.last(node), node);
    }

    #[test]
    fn copy_from_shares_next_and_token_list() {
        let mut chain = Chain::new();
        let a = chain.push(Box::new(Literal::new("a")));
        let b = literal_chain(&mut chain, &["b", "c"]);
        chain.set_identifier(b, "1");
        chain.add_tokens(b, [Token::new(0, "b").into()]);

        chain.copy_from(a, b);
        assert_eq!(chain.next(a), chain.next(b));
        assert_eq!(chain.identifier(a), Some("1"));
        assert!(chain.shares_tokens(a, b));

        // The list is shared, not cloned: appending through one node is
        // visible through the other.
        chain.add_tokens(b, [Token::new(1, "x").into()]);
        assert_eq!(chain.tokens(a), chain.tokens(b));
        assert_eq!(chain.tokens(a).len(), 2);
    }

    #[test]
    fn flatten_runs_the_compact_hook_once_per_node() {
        use std::cell::Cell;
        use std::rc::Rc;

        #[derive(Debug)]
        struct Counting(Rc<Cell<u32>>);

        impl NodeKind for Counting {
            fn name(&self) -> &'static str {
                "counting"
            }
            fn matches(&self, _input: &str) -> bool {
                false
            }
            fn describe(&self) -> String {
                "counting".to_string()
            }
            fn render_body(&self) -> Result<String, RenderError> {
                Ok(String::new())
            }
            fn compact(&mut self) {
                self.0.set(self.0.get() + 1);
            }
        }

        let count = Rc::new(Cell::new(0));
        let mut chain = Chain::new();
        let head = chain.push(Box::new(Counting(Rc::clone(&count))));
        let tail = chain.push(Box::new(Counting(Rc::clone(&count))));
        chain.set_next(head, Some(tail));
        chain.flatten(head);
        assert_eq!(count.get(), 2);
    }

    #[test]
    fn flatten_returns_start_and_keeps_order() {
        let mut chain = Chain::new();
        let head = literal_chain(&mut chain, &["a", "b", "c"]);
        assert_eq!(chain.flatten(head), head);
        assert_eq!(
            chain.describe_chain(head),
            "literal 'a', literal 'b', literal 'c'"
        );
    }

    #[test]
    fn apply_to_self_passes_the_node_through() {
        let mut chain = Chain::new();
        let node = chain.push(Box::new(Literal::new("a")));
        let description = chain.apply_to_self(node, |chain, id| chain.describe(id));
        assert_eq!(description, "literal 'a'");
    }

    #[test]
    fn apply_to_chain_runs_once_per_node_and_returns_first_result() {
        let mut chain = Chain::new();
        let head = literal_chain(&mut chain, &["a", "b", "c"]);
        let mut visited = Vec::new();
        let result = chain.apply_to_chain(head, &mut |chain, id| {
            visited.push(chain.describe(id));
            id
        });
        assert_eq!(result, head);
        assert_eq!(visited, ["literal 'a'", "literal 'b'", "literal 'c'"]);
    }

    #[test]
    fn apply_to_chain_rewrites_successors_with_the_result() {
        let mut chain = Chain::new();
        let head = literal_chain(&mut chain, &["a", "b", "c"]);
        // Replace every 'b' node with a fresh 'B' node; the replacement
        // keeps the old successor so the walk continues past it.
        let mut invocations = 0;
        chain.apply_to_chain(head, &mut |chain, id| {
            invocations += 1;
            if chain.describe(id) == "literal 'b'" {
                let replacement = chain.push(Box::new(Literal::new("B")));
                let next = chain.next(id);
                chain.set_next(replacement, next);
                replacement
            } else {
                id
            }
        });
        assert_eq!(invocations, 3);
        assert_eq!(
            chain.describe_chain(head),
            "literal 'a', literal 'B', literal 'c'"
        );
    }

    #[cfg(debug_assertions)]
    #[test]
    #[should_panic(expected = "cycle")]
    fn debug_builds_catch_cycles() {
        let mut chain = Chain::new();
        let head = literal_chain(&mut chain, &["a", "b"]);
        let second = chain.next(head).unwrap();
        chain.set_next(second, Some(head));
        chain.last(head);
    }
}
