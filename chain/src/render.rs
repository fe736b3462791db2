use crate::Chain;
use crate::NodeId;
use textutil::escape_html;
use thiserror::Error;

#[derive(Error, Clone, Debug, PartialEq, Eq)]
pub enum RenderError {
    #[error("quantifier upper bound {max} is below lower bound {min}")]
    InvalidQuantifier { min: u32, max: u32 },
    #[error("{0}")]
    Failed(String),
}

/// One `[offset, length]` pair a host adapter wires to hover handlers.
/// Offsets and lengths count characters of the source expression.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HighlightSpan {
    pub offset: usize,
    pub len: usize,
}

impl HighlightSpan {
    pub fn covers(&self, pos: usize) -> bool {
        pos >= self.offset && pos < self.offset + self.len
    }
}

/// Span membership for one source character. An absent span set means
/// every character lights up (the hover-out state).
pub fn is_highlighted(pos: usize, spans: Option<&[HighlightSpan]>) -> bool {
    match spans {
        None => true,
        Some(spans) => spans.iter().any(|span| span.covers(pos)),
    }
}

/// Error channel consumed by [`Chain::render_chain_markup`]: one report per
/// node whose body failed to render, keyed by that node's identifier.
pub trait DiagnosticSink {
    fn render_failure(&mut self, identifier: Option<&str>, error: &RenderError);
}

/// Reports render failures through `tracing`.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingSink;

impl DiagnosticSink for TracingSink {
    fn render_failure(&mut self, identifier: Option<&str>, error: &RenderError) {
        tracing::warn!(
            identifier = identifier.unwrap_or("<anonymous>"),
            %error,
            "node failed to render"
        );
    }
}

impl Chain {
    /// One highlight span per token of the node.
    pub fn highlight_spans(&self, id: NodeId) -> Vec<HighlightSpan> {
        self.tokens(id)
            .iter()
            .map(|token| HighlightSpan {
                offset: token.offset,
                len: token.value.chars().count(),
            })
            .collect()
    }

    /// The node's spans serialized as `[offset,length]` pairs.
    pub fn highlight_descriptor(&self, id: NodeId) -> String {
        self.highlight_spans(id)
            .iter()
            .map(|span| format!("[{},{}]", span.offset, span.len))
            .collect::<Vec<_>>()
            .join(",")
    }

    /// Opening fragment for one node: the list item carrying the highlight
    /// descriptor, plus an identifier badge when the node is labeled.
    pub fn render_open_markup(&self, id: NodeId) -> String {
        let mut out = format!(
            "<li data-highlight=\"{}\">",
            self.highlight_descriptor(id)
        );
        if let Some(label) = self.identifier(id) {
            out.push_str(&format!(
                "<span class=\"rx_id\">{})</span> ",
                escape_html(label)
            ));
        }
        out
    }

    /// Walks the chain front-to-back wrapping each node's open fragment,
    /// body and close fragment. A node whose body fails to render is
    /// reported to `sink` and skipped; rendering always continues with the
    /// next node.
    pub fn render_chain_markup(&self, start: NodeId, sink: &mut dyn DiagnosticSink) -> String {
        let mut out = String::from("<ul>");
        for id in self.iter_from(start) {
            match self.kind(id).render_body() {
                Ok(body) => {
                    out.push_str(&self.render_open_markup(id));
                    out.push_str(&body);
                    out.push_str("</li>");
                }
                Err(error) => sink.render_failure(self.identifier(id), &error),
            }
        }
        out.push_str("</ul>");
        out
    }
}
