//! Incremental tree builder.
//!
//! Consumes tokenizer events one by one, maintaining the open-element
//! stack. Each new element's cascade is resolved at creation time against
//! the rules registered so far; rules from a `<style>` element join the
//! store when that element *closes*, so they only affect elements created
//! afterwards. That ordering is load-bearing: a late stylesheet never
//! retroactively restyles an earlier element.

use petrel_css::{resolve, ComputedStyle, RuleStore, StyleTarget};
use petrel_cssparser::parse_stylesheet;
use petrel_html::{Attribute, Token};
use tracing::{debug, trace};

use crate::{Document, DomError, Layout, Node, NodeId, NodeKind};

/// Stack-based DOM builder with per-element style resolution.
///
/// One builder per document; the open stack always holds the synthetic
/// document root at the bottom.
pub struct DocumentBuilder<'a, L: Layout> {
    document: Document,
    stack: Vec<NodeId>,
    current_text: Option<NodeId>,
    rules: RuleStore,
    layout: &'a mut L,
}

impl<'a, L: Layout> DocumentBuilder<'a, L> {
    pub fn new(layout: &'a mut L) -> Self {
        let document = Document::new();
        let root = document.root();
        Self {
            document,
            stack: vec![root],
            current_text: None,
            rules: RuleStore::new(),
            layout,
        }
    }

    /// Process one token. A [`DomError::TagMismatch`] aborts the parse;
    /// the builder must not be fed further tokens after an error.
    pub fn process(&mut self, token: Token) -> Result<(), DomError> {
        trace!(?token, depth = self.stack.len(), "processing token");
        match token {
            Token::StartTag {
                name,
                attributes,
                self_closing,
            } => {
                self.current_text = None;
                self.insert_element(name, attributes, self_closing);
            }
            Token::EndTag { name } => {
                self.current_text = None;
                self.close_element(name)?;
            }
            Token::Character(ch) => {
                self.append_character(ch);
            }
            Token::Eof => {}
        }
        Ok(())
    }

    fn insert_element(&mut self, tag_name: String, attributes: Vec<Attribute>, self_closing: bool) {
        // Resolve the cascade before the element joins the tree, against
        // the ancestor chain innermost-first.
        let mut computed_style = ComputedStyle::new();
        {
            let target = StyleTarget {
                tag_name: Some(&tag_name),
                id: attribute_value(&attributes, "id"),
                class: attribute_value(&attributes, "class"),
            };
            let ancestors: Vec<StyleTarget<'_>> = self
                .stack
                .iter()
                .rev()
                .map(|&id| style_target(self.document.node(id)))
                .collect();
            resolve(&target, &ancestors, &self.rules, &mut computed_style);
        }

        let parent = self.top();
        let id = self.document.append_child(
            parent,
            NodeKind::Element {
                tag_name,
                attributes,
                computed_style,
            },
        );
        if !self_closing {
            self.stack.push(id);
        }
    }

    fn close_element(&mut self, name: String) -> Result<(), DomError> {
        let top = self.top();
        let top_tag = self.document.node(top).tag_name();
        if top_tag != Some(name.as_str()) {
            return Err(DomError::TagMismatch {
                expected: top_tag.unwrap_or("#document").to_string(),
                found: name,
            });
        }

        if name == "style" {
            self.register_style_rules(top);
        }

        self.layout.layout(&self.document, top);
        self.stack.pop();
        Ok(())
    }

    /// Register the rules of a closing `<style>` element. Only a first
    /// child that is a text node is consulted; a malformed sheet is
    /// dropped rather than reported.
    fn register_style_rules(&mut self, style_element: NodeId) {
        let css = self
            .document
            .children(style_element)
            .first()
            .and_then(|&child| self.document.node(child).text());
        let Some(css) = css else { return };

        match parse_stylesheet(css) {
            Ok(sheet) => self.rules.add_stylesheet(sheet),
            Err(err) => debug!(%err, "ignoring malformed stylesheet"),
        }
    }

    fn append_character(&mut self, ch: char) {
        match self.current_text {
            Some(id) => {
                if let NodeKind::Text(content) = &mut self.document.node_mut(id).kind {
                    content.push(ch);
                }
            }
            None => {
                let parent = self.top();
                let id = self
                    .document
                    .append_child(parent, NodeKind::Text(ch.to_string()));
                self.current_text = Some(id);
            }
        }
    }

    fn top(&self) -> NodeId {
        *self
            .stack
            .last()
            .expect("open stack always holds the document root")
    }

    /// Current open-stack depth, document root included.
    pub fn open_depth(&self) -> usize {
        self.stack.len()
    }

    /// Rules registered so far.
    pub fn rules(&self) -> &RuleStore {
        &self.rules
    }

    pub fn document(&self) -> &Document {
        &self.document
    }

    /// Consume the builder and return the document built so far.
    pub fn finish(self) -> Document {
        self.document
    }
}

fn attribute_value<'a>(attributes: &'a [Attribute], name: &str) -> Option<&'a str> {
    attributes
        .iter()
        .find(|a| a.name == name)
        .map(|a| a.value.as_str())
}

fn style_target(node: &Node) -> StyleTarget<'_> {
    match &node.kind {
        NodeKind::Element { tag_name, .. } => StyleTarget {
            tag_name: Some(tag_name),
            id: node.attribute("id"),
            class: node.attribute("class"),
        },
        _ => StyleTarget::default(),
    }
}

/// Build a document from a token stream, invoking `layout` once per
/// closing element.
pub fn build_document<L: Layout>(
    tokens: impl IntoIterator<Item = Token>,
    layout: &mut L,
) -> Result<Document, DomError> {
    let mut builder = DocumentBuilder::new(layout);
    for token in tokens {
        builder.process(token)?;
    }
    Ok(builder.finish())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::NoLayout;
    use petrel_html::tokenize;

    fn build(html: &str) -> Result<Document, DomError> {
        let mut layout = NoLayout;
        build_document(tokenize(html), &mut layout)
    }

    /// Layout double that records closing elements in call order.
    #[derive(Default)]
    struct Recorder {
        closed: Vec<String>,
    }

    impl Layout for Recorder {
        fn layout(&mut self, document: &Document, element: NodeId) {
            if let Some(tag) = document.node(element).tag_name() {
                self.closed.push(tag.to_string());
            }
        }
    }

    #[test]
    fn text_tokens_coalesce_into_one_node() {
        let doc = build("<p class='a'>hi</p>").unwrap();
        let p = doc.get_elements_by_tag_name("p")[0];
        let children = doc.children(p);
        assert_eq!(children.len(), 1);
        assert_eq!(doc.node(children[0]).text(), Some("hi"));
    }

    #[test]
    fn element_boundary_starts_a_new_text_node() {
        let doc = build("<p>a<b>c</b>d</p>").unwrap();
        let p = doc.get_elements_by_tag_name("p")[0];
        let kinds: Vec<bool> = doc
            .children(p)
            .iter()
            .map(|&id| doc.node(id).is_text())
            .collect();
        assert_eq!(kinds, vec![true, false, true]);
        assert_eq!(doc.text_content(p), "acd");
    }

    #[test]
    fn self_closing_tag_is_not_pushed() {
        let doc = build("<div><br/>text</div>").unwrap();
        let div = doc.get_elements_by_tag_name("div")[0];
        let br = doc.get_elements_by_tag_name("br")[0];
        // br is a child of div, and the text went to div, not br.
        assert_eq!(doc.node(br).parent, Some(div));
        assert!(doc.children(br).is_empty());
        assert_eq!(doc.text_content(div), "text");
    }

    #[test]
    fn mismatched_end_tag_is_fatal_and_leaves_stack() {
        let mut layout = NoLayout;
        let mut builder = DocumentBuilder::new(&mut layout);
        for token in tokenize("<div><span>") {
            builder.process(token).unwrap();
        }
        assert_eq!(builder.open_depth(), 3);

        let err = builder
            .process(Token::EndTag {
                name: "div".to_string(),
            })
            .unwrap_err();
        assert_eq!(
            err,
            DomError::TagMismatch {
                expected: "span".to_string(),
                found: "div".to_string(),
            }
        );
        // The failed close must not have mutated the stack.
        assert_eq!(builder.open_depth(), 3);
    }

    #[test]
    fn end_tag_at_root_is_a_mismatch() {
        let err = build("</div>").unwrap_err();
        assert_eq!(
            err,
            DomError::TagMismatch {
                expected: "#document".to_string(),
                found: "div".to_string(),
            }
        );
    }

    #[test]
    fn balanced_input_returns_stack_to_root() {
        let mut layout = NoLayout;
        let mut builder = DocumentBuilder::new(&mut layout);
        for token in tokenize("<html><body><p>x</p><br/></body></html>") {
            builder.process(token).unwrap();
        }
        assert_eq!(builder.open_depth(), 1);
    }

    #[test]
    fn unclosed_tags_leave_stack_deep() {
        let mut layout = NoLayout;
        let mut builder = DocumentBuilder::new(&mut layout);
        for token in tokenize("<html><body>") {
            builder.process(token).unwrap();
        }
        assert_eq!(builder.open_depth(), 3);
    }

    #[test]
    fn layout_runs_bottom_up_on_close() {
        let mut recorder = Recorder::default();
        build_document(tokenize("<div><span>x</span><p>y</p></div>"), &mut recorder).unwrap();
        assert_eq!(recorder.closed, vec!["span", "p", "div"]);
    }

    #[test]
    fn style_rules_apply_to_later_elements() {
        let doc = build(
            "<html><style>p{color:blue}</style><p>after</p></html>",
        )
        .unwrap();
        let p = doc.get_elements_by_tag_name("p")[0];
        assert_eq!(doc.node(p).computed_style().unwrap().get("color"), Some("blue"));
    }

    #[test]
    fn style_rules_do_not_apply_retroactively() {
        // The <p> before the stylesheet closes is already resolved.
        let doc = build(
            "<html><p>before</p><style>p{color:blue}</style><p>after</p></html>",
        )
        .unwrap();
        let ps = doc.get_elements_by_tag_name("p");
        assert_eq!(doc.node(ps[0]).computed_style().unwrap().get("color"), None);
        assert_eq!(
            doc.node(ps[1]).computed_style().unwrap().get("color"),
            Some("blue")
        );
    }

    #[test]
    fn id_rule_beats_tag_rule_either_way() {
        for css in ["p{color:blue}#x{color:red}", "#x{color:red}p{color:blue}"] {
            let html = format!("<html><style>{css}</style><p id=\"x\">t</p></html>");
            let doc = build(&html).unwrap();
            let p = doc.get_elements_by_tag_name("p")[0];
            assert_eq!(
                doc.node(p).computed_style().unwrap().get("color"),
                Some("red"),
                "css: {css}"
            );
        }
    }

    #[test]
    fn equal_specificity_first_applied_wins() {
        let doc = build(
            "<html><style>p{color:blue}p{color:green}</style><p>t</p></html>",
        )
        .unwrap();
        let p = doc.get_elements_by_tag_name("p")[0];
        assert_eq!(doc.node(p).computed_style().unwrap().get("color"), Some("blue"));
    }

    #[test]
    fn descendant_rule_matches_through_the_stack() {
        let doc = build(
            "<html><style>body div p{margin:0}</style><body><div><section><p>t</p></section></div></body></html>",
        )
        .unwrap();
        let p = doc.get_elements_by_tag_name("p")[0];
        assert_eq!(doc.node(p).computed_style().unwrap().get("margin"), Some("0"));
    }

    #[test]
    fn style_element_without_text_registers_nothing() {
        let mut layout = NoLayout;
        let mut builder = DocumentBuilder::new(&mut layout);
        for token in tokenize("<html><style></style><p>t</p></html>") {
            builder.process(token).unwrap();
        }
        assert!(builder.rules().is_empty());
    }

    #[test]
    fn malformed_stylesheet_is_dropped() {
        let mut layout = NoLayout;
        let mut builder = DocumentBuilder::new(&mut layout);
        for token in tokenize("<html><style>p{color:blue</style><p>t</p></html>") {
            builder.process(token).unwrap();
        }
        assert!(builder.rules().is_empty());
    }
}
