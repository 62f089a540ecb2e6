//! Owned element tree for one entity, plus a namespace-agnostic walker.
//!
//! Lookups only ever scan immediate children. A descendant search would let
//! an `AGENCY` nested under `AGENCY_CONTACT_LIST/CONTACT` answer for the
//! entity's own `AGENCY`, so the walker never offers one.

use crate::normalize::collapse_whitespace;

/// One parsed XML element. `text` is the character data directly inside this
/// element, entity references already decoded, concatenated across text and
/// CDATA runs.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Element {
    pub name: String,
    pub text: String,
    pub children: Vec<Element>,
}

impl Element {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            text: String::new(),
            children: Vec::new(),
        }
    }

    /// Builder helper used by tests and fixtures
    pub fn with_text(mut self, text: impl Into<String>) -> Self {
        self.text = text.into();
        self
    }

    /// Builder helper used by tests and fixtures
    pub fn with_child(mut self, child: Element) -> Self {
        self.children.push(child);
        self
    }

    pub fn local_name(&self) -> &str {
        local_name(&self.name)
    }

    pub fn is_leaf(&self) -> bool {
        self.children.is_empty()
    }

    /// Cleaned text of this element
    pub fn clean_text(&self) -> String {
        collapse_whitespace(&self.text)
    }

    /// Number of nodes in this subtree, itself included
    pub fn node_count(&self) -> usize {
        1 + self.children.iter().map(Element::node_count).sum::<usize>()
    }
}

/// Strip `prefix:` and `{uri}` namespace decoration from a tag.
pub fn local_name(tag: &str) -> &str {
    let tag = match tag.rfind('}') {
        Some(pos) => &tag[pos + 1..],
        None => tag,
    };
    match tag.rfind(':') {
        Some(pos) => &tag[pos + 1..],
        None => tag,
    }
}

pub fn first_child_by_name<'a>(node: &'a Element, name: &str) -> Option<&'a Element> {
    node.children.iter().find(|c| c.local_name() == name)
}

pub fn children_by_name<'a>(node: &'a Element, name: &str) -> Vec<&'a Element> {
    node.children
        .iter()
        .filter(|c| c.local_name() == name)
        .collect()
}

/// Cleaned text of the first immediate child named `name`, or empty.
pub fn text_child(node: &Element, name: &str) -> String {
    first_child_by_name(node, name)
        .map(Element::clean_text)
        .unwrap_or_default()
}

/// [`text_child`] against an optional parent (absent group ⇒ empty).
pub fn text_child_of(node: Option<&Element>, name: &str) -> String {
    node.map(|n| text_child(n, name)).unwrap_or_default()
}
