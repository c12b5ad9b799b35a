//! Form template markup, parsed once into an arena of nodes.
//!
//! The markup is HTML carrying custom form tags. The parser here does not
//! try to be a browser: it builds a literal tree of elements, text and
//! comments, and leaves entity references and unknown elements untouched so
//! the renderer can pass them through verbatim.

use crate::error::{DesignError, DesignResult};

pub type NodeId = usize;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NodeKind {
    Element {
        name: String,
        attributes: Vec<(String, String)>,
    },
    Text(String),
    Comment(String),
}

#[derive(Debug, Clone)]
pub struct TagNode {
    pub kind: NodeKind,
    pub parent: Option<NodeId>,
    pub children: Vec<NodeId>,
    /// Whether the source wrote this element as `<name/>`.
    pub self_closed: bool,
}

/// A parsed form template. Nodes live in one arena, referenced by index, so
/// the tree can be walked and shared without self-referential borrows.
#[derive(Debug, Clone)]
pub struct FormTemplate {
    nodes: Vec<TagNode>,
    roots: Vec<NodeId>,
}

// Elements that never take a closing tag in HTML.
const VOID_ELEMENTS: &[&str] = &[
    "area", "base", "br", "col", "embed", "hr", "img", "input", "link", "meta", "param", "source",
    "track", "wbr",
];

pub(crate) fn is_void_element(name: &str) -> bool {
    VOID_ELEMENTS.contains(&name.to_ascii_lowercase().as_str())
}

impl FormTemplate {
    pub fn parse(markup: &str) -> DesignResult<Self> {
        Parser::new(markup).run()
    }

    pub fn roots(&self) -> &[NodeId] {
        &self.roots
    }

    pub fn node(&self, id: NodeId) -> &TagNode {
        &self.nodes[id]
    }

    pub fn children(&self, id: NodeId) -> &[NodeId] {
        &self.nodes[id].children
    }

    /// The element name at `id`, if it is an element node.
    pub fn element_name(&self, id: NodeId) -> Option<&str> {
        match &self.nodes[id].kind {
            NodeKind::Element { name, .. } => Some(name),
            _ => None,
        }
    }

    pub fn attribute(&self, id: NodeId, name: &str) -> Option<&str> {
        match &self.nodes[id].kind {
            NodeKind::Element { attributes, .. } => attributes
                .iter()
                .find(|(k, _)| k == name)
                .map(|(_, v)| v.as_str()),
            _ => None,
        }
    }

    /// Number of nodes in the arena, including text and comments.
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }
}

/// Serialises an opening tag back to markup, for pass-through rendering.
pub(crate) fn serialize_open_tag(
    name: &str,
    attributes: &[(String, String)],
    self_close: bool,
) -> String {
    let mut out = String::with_capacity(name.len() + 2);
    out.push('<');
    out.push_str(name);
    for (key, value) in attributes {
        out.push(' ');
        out.push_str(key);
        out.push_str("=\"");
        // Values hold the raw source text; author-written entities must
        // survive, so only the wrapping quote gets escaped.
        out.push_str(&value.replace('"', "&quot;"));
        out.push('"');
    }
    out.push_str(if self_close { "/>" } else { ">" });
    out
}

pub(crate) fn escape_attribute(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    for c in value.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            _ => out.push(c),
        }
    }
    out
}

struct Parser<'a> {
    src: &'a str,
    pos: usize,
    nodes: Vec<TagNode>,
    roots: Vec<NodeId>,
    stack: Vec<NodeId>,
}

impl<'a> Parser<'a> {
    fn new(src: &'a str) -> Self {
        Self {
            src,
            pos: 0,
            nodes: Vec::new(),
            roots: Vec::new(),
            stack: Vec::new(),
        }
    }

    fn run(mut self) -> DesignResult<FormTemplate> {
        while self.pos < self.src.len() {
            if self.rest().starts_with("<!--") {
                self.comment()?;
            } else if self.rest().starts_with("</") {
                self.closing_tag()?;
            } else if self.rest().starts_with("<!") {
                self.declaration()?;
            } else if self.rest().starts_with('<') {
                self.opening_tag()?;
            } else {
                self.text();
            }
        }
        if let Some(&open) = self.stack.last() {
            let name = match &self.nodes[open].kind {
                NodeKind::Element { name, .. } => name.clone(),
                _ => String::new(),
            };
            return Err(self.error(format!("element <{name}> is never closed")));
        }
        Ok(FormTemplate {
            nodes: self.nodes,
            roots: self.roots,
        })
    }

    fn rest(&self) -> &'a str {
        &self.src[self.pos..]
    }

    fn error(&self, message: impl Into<String>) -> DesignError {
        DesignError::TemplateParse {
            offset: self.pos,
            message: message.into(),
        }
    }

    fn push_node(&mut self, kind: NodeKind) -> NodeId {
        let parent = self.stack.last().copied();
        let id = self.nodes.len();
        self.nodes.push(TagNode {
            kind,
            parent,
            children: Vec::new(),
            self_closed: false,
        });
        match parent {
            Some(p) => self.nodes[p].children.push(id),
            None => self.roots.push(id),
        }
        id
    }

    fn text(&mut self) {
        let end = self
            .rest()
            .find('<')
            .map(|i| self.pos + i)
            .unwrap_or(self.src.len());
        let run = &self.src[self.pos..end];
        if !run.is_empty() {
            self.push_node(NodeKind::Text(run.to_owned()));
        }
        self.pos = end;
    }

    fn comment(&mut self) -> DesignResult<()> {
        let body_start = self.pos + 4;
        let close = self.src[body_start..]
            .find("-->")
            .ok_or_else(|| self.error("comment is never closed"))?;
        let body = &self.src[body_start..body_start + close];
        self.push_node(NodeKind::Comment(body.to_owned()));
        self.pos = body_start + close + 3;
        Ok(())
    }

    // Doctype and other <!...> declarations are carried as comments so they
    // round-trip without the renderer caring about them.
    fn declaration(&mut self) -> DesignResult<()> {
        let close = self
            .rest()
            .find('>')
            .ok_or_else(|| self.error("declaration is never closed"))?;
        let body = &self.src[self.pos..self.pos + close + 1];
        self.push_node(NodeKind::Comment(body.to_owned()));
        self.pos += close + 1;
        Ok(())
    }

    fn closing_tag(&mut self) -> DesignResult<()> {
        let start = self.pos;
        self.pos += 2;
        let name = self.tag_name()?;
        self.skip_whitespace();
        if !self.rest().starts_with('>') {
            return Err(self.error(format!("malformed closing tag </{name}>")));
        }
        self.pos += 1;
        match self.stack.pop() {
            Some(open) => {
                let open_name = match &self.nodes[open].kind {
                    NodeKind::Element { name, .. } => name.as_str(),
                    _ => "",
                };
                if open_name != name {
                    self.pos = start;
                    return Err(
                        self.error(format!("</{name}> closes <{open_name}>, names must match"))
                    );
                }
            }
            None => {
                self.pos = start;
                return Err(self.error(format!("</{name}> has no matching opening tag")));
            }
        }
        Ok(())
    }

    fn opening_tag(&mut self) -> DesignResult<()> {
        self.pos += 1;
        let name = self.tag_name()?;
        let mut attributes = Vec::new();
        loop {
            self.skip_whitespace();
            if self.rest().starts_with("/>") {
                self.pos += 2;
                let id = self.push_node(NodeKind::Element { name, attributes });
                self.nodes[id].self_closed = true;
                return Ok(());
            }
            if self.rest().starts_with('>') {
                self.pos += 1;
                let lowered = name.to_ascii_lowercase();
                let id = self.push_node(NodeKind::Element { name, attributes });
                if !VOID_ELEMENTS.contains(&lowered.as_str()) {
                    self.stack.push(id);
                }
                return Ok(());
            }
            if self.rest().is_empty() {
                return Err(self.error(format!("tag <{name}> is never closed")));
            }
            attributes.push(self.attribute()?);
        }
    }

    fn tag_name(&mut self) -> DesignResult<String> {
        let start = self.pos;
        while self
            .rest()
            .chars()
            .next()
            .is_some_and(|c| c.is_ascii_alphanumeric() || matches!(c, ':' | '-' | '_' | '.'))
        {
            self.pos += 1;
        }
        if self.pos == start {
            return Err(self.error("expected a tag name"));
        }
        Ok(self.src[start..self.pos].to_owned())
    }

    fn attribute(&mut self) -> DesignResult<(String, String)> {
        let start = self.pos;
        while self
            .rest()
            .chars()
            .next()
            .is_some_and(|c| c.is_ascii_alphanumeric() || matches!(c, ':' | '-' | '_' | '.'))
        {
            self.pos += 1;
        }
        if self.pos == start {
            return Err(self.error("expected an attribute name"));
        }
        let name = self.src[start..self.pos].to_owned();
        self.skip_whitespace();
        if !self.rest().starts_with('=') {
            // Bare attribute, HTML boolean style.
            return Ok((name, String::new()));
        }
        self.pos += 1;
        self.skip_whitespace();
        let value = match self.rest().chars().next() {
            Some(quote @ ('"' | '\'')) => {
                self.pos += 1;
                let close = self
                    .rest()
                    .find(quote)
                    .ok_or_else(|| self.error(format!("attribute '{name}' quote never closed")))?;
                let value = self.src[self.pos..self.pos + close].to_owned();
                self.pos += close + 1;
                value
            }
            _ => {
                let end = self
                    .rest()
                    .find(|c: char| c.is_whitespace() || c == '>' || c == '/')
                    .unwrap_or(self.rest().len());
                let value = self.src[self.pos..self.pos + end].to_owned();
                self.pos += end;
                value
            }
        };
        Ok((name, value))
    }

    fn skip_whitespace(&mut self) {
        while self.rest().chars().next().is_some_and(|c| c.is_whitespace()) {
            self.pos += 1;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_parses_nested_elements_with_text() {
        let t = FormTemplate::parse("<section><p>hello</p></section>").unwrap();
        assert_eq!(t.roots().len(), 1);
        let section = t.roots()[0];
        assert_eq!(t.element_name(section), Some("section"));
        let p = t.children(section)[0];
        assert_eq!(t.element_name(p), Some("p"));
        let text = t.children(p)[0];
        assert_eq!(t.node(text).kind, NodeKind::Text("hello".into()));
    }

    #[test]
    fn test_parses_attributes_in_both_quote_styles() {
        let t = FormTemplate::parse(r#"<obs conceptId="5089" id='wt'/>"#).unwrap();
        let obs = t.roots()[0];
        assert_eq!(t.attribute(obs, "conceptId"), Some("5089"));
        assert_eq!(t.attribute(obs, "id"), Some("wt"));
        assert!(t.children(obs).is_empty());
    }

    #[test]
    fn test_void_elements_do_not_need_closing() {
        let t = FormTemplate::parse("<p>a<br>b</p>").unwrap();
        let p = t.roots()[0];
        assert_eq!(t.children(p).len(), 3);
        assert_eq!(t.element_name(t.children(p)[1]), Some("br"));
    }

    #[test]
    fn test_comments_are_kept_but_inert() {
        let t = FormTemplate::parse("<!-- draft -->ok").unwrap();
        assert_eq!(t.node(t.roots()[0]).kind, NodeKind::Comment(" draft ".into()));
        assert_eq!(t.node(t.roots()[1]).kind, NodeKind::Text("ok".into()));
    }

    #[test]
    fn test_mismatched_closing_tag_is_an_error() {
        let err = FormTemplate::parse("<section><p></section>").unwrap_err();
        assert!(matches!(err, DesignError::TemplateParse { .. }));
        assert!(err.to_string().contains("must match"));
    }

    #[test]
    fn test_unclosed_element_is_an_error() {
        let err = FormTemplate::parse("<section>abandoned").unwrap_err();
        assert!(err.to_string().contains("never closed"));
    }

    #[test]
    fn test_unterminated_comment_is_an_error() {
        let err = FormTemplate::parse("<!-- oops").unwrap_err();
        assert!(matches!(err, DesignError::TemplateParse { offset: 0, .. }));
    }

    #[test]
    fn test_open_tag_serialisation_escapes_only_the_quote() {
        let out = serialize_open_tag(
            "a",
            &[("title".to_string(), "say \"hi\"".to_string())],
            false,
        );
        assert_eq!(out, r#"<a title="say &quot;hi&quot;">"#);
    }

    #[test]
    fn test_attribute_entities_survive_a_serialisation_round_trip() {
        let t = FormTemplate::parse(r#"<a href="x?a=1&amp;b=2">link</a>"#).unwrap();
        let a = t.roots()[0];
        match &t.node(a).kind {
            NodeKind::Element { name, attributes } => {
                assert_eq!(
                    serialize_open_tag(name, attributes, false),
                    r#"<a href="x?a=1&amp;b=2">"#
                );
            }
            other => panic!("expected an element, got {other:?}"),
        }
    }

    #[test]
    fn test_only_explicitly_self_closed_elements_are_flagged() {
        let t = FormTemplate::parse("<exitFromCare/><div></div>").unwrap();
        assert!(t.node(t.roots()[0]).self_closed);
        assert!(!t.node(t.roots()[1]).self_closed);
    }
}
