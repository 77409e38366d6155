//! A small, generic OME-XML element tree.
//!
//! Elements keep their attributes in document order so that a parsed and
//! re-serialized document differs only where attributes were changed.

use std::str;

use quick_xml::events::{BytesDecl, BytesEnd, BytesStart, BytesText, Event};
use quick_xml::{Reader, Writer};
use uuid::Uuid;

use crate::error::MetadataError;

/// Name of the per-series element that receives the OMEIS results.
pub const PIXELS_ELEMENT: &str = "Pixels";

/// Root attribute that carries the run identity.
pub const IDENTITY_ATTRIBUTE: &str = "UUID";

/// A child of an [`Element`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Node {
    Element(Element),
    Text(String),
}

/// An XML element with ordered attributes.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Element {
    /// Qualified name, including any `prefix:`
    pub name: String,
    pub attributes: Vec<(String, String)>,
    pub children: Vec<Node>,
}

impl Element {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }

    /// Builder-style attribute setter.
    pub fn with_attribute(mut self, key: &str, value: impl Into<String>) -> Self {
        self.set_attribute(key, value);
        self
    }

    /// Builder-style child append.
    pub fn with_child(mut self, child: Element) -> Self {
        self.children.push(Node::Element(child));
        self
    }

    /// The name without its namespace prefix.
    pub fn local_name(&self) -> &str {
        match self.name.split_once(':') {
            Some((_, local)) => local,
            None => &self.name,
        }
    }

    pub fn attribute(&self, key: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    /// Set an attribute, replacing the value in place if it already exists.
    pub fn set_attribute(&mut self, key: &str, value: impl Into<String>) {
        let value = value.into();
        match self.attributes.iter_mut().find(|(k, _)| k == key) {
            Some((_, existing)) => *existing = value,
            None => self.attributes.push((key.to_string(), value)),
        }
    }

    pub fn push_child(&mut self, child: Element) {
        self.children.push(Node::Element(child));
    }

    pub fn push_text(&mut self, text: impl Into<String>) {
        self.children.push(Node::Text(text.into()));
    }

    /// Direct child elements, skipping text.
    pub fn child_elements(&self) -> impl Iterator<Item = &Element> {
        self.children.iter().filter_map(|node| match node {
            Node::Element(e) => Some(e),
            Node::Text(_) => None,
        })
    }

    /// All elements with the given local name, depth-first in document
    /// order. The subtree of a matching element is not searched.
    pub fn find_all_mut(&mut self, local_name: &str) -> Vec<&mut Element> {
        let mut found = Vec::new();
        collect_mut(self, local_name, &mut found);
        found
    }

    /// Number of elements [`find_all_mut`](Self::find_all_mut) would return.
    pub fn count_all(&self, local_name: &str) -> usize {
        if self.local_name() == local_name {
            return 1;
        }
        self.child_elements()
            .map(|child| child.count_all(local_name))
            .sum()
    }
}

fn collect_mut<'a>(element: &'a mut Element, local_name: &str, found: &mut Vec<&'a mut Element>) {
    if element.local_name() == local_name {
        found.push(element);
        return;
    }
    for node in element.children.iter_mut() {
        if let Node::Element(child) = node {
            collect_mut(child, local_name, found);
        }
    }
}

// =============================================================================
// MetadataDocument
// =============================================================================

/// A metadata document rooted at a single element.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MetadataDocument {
    root: Element,
}

impl MetadataDocument {
    pub fn new(root: Element) -> Self {
        Self { root }
    }

    /// Parse XML text into a document.
    ///
    /// Comments, processing instructions and the declaration are dropped.
    /// Whitespace-only text is trimmed away.
    pub fn parse(xml: &str) -> Result<Self, MetadataError> {
        let mut reader = Reader::from_str(xml);
        reader.trim_text(true);

        let mut stack: Vec<Element> = Vec::new();
        let mut root: Option<Element> = None;

        loop {
            match reader.read_event()? {
                Event::Start(e) => stack.push(element_from_start(&e)?),
                Event::Empty(e) => {
                    let element = element_from_start(&e)?;
                    attach(&mut stack, &mut root, element)?;
                }
                Event::End(_) => {
                    let element = stack
                        .pop()
                        .ok_or_else(|| MetadataError::Malformed("unbalanced end tag".into()))?;
                    attach(&mut stack, &mut root, element)?;
                }
                Event::Text(e) => {
                    let text = e.unescape()?;
                    if let Some(parent) = stack.last_mut() {
                        parent.push_text(text.into_owned());
                    }
                }
                Event::CData(e) => {
                    let text = utf8(&e)?;
                    if let Some(parent) = stack.last_mut() {
                        parent.push_text(text);
                    }
                }
                Event::Eof => break,
                Event::Decl(_) | Event::Comment(_) | Event::PI(_) | Event::DocType(_) => {}
            }
        }

        if let Some(open) = stack.last() {
            return Err(MetadataError::Malformed(format!(
                "unclosed element <{}>",
                open.name
            )));
        }
        root.map(Self::new)
            .ok_or_else(|| MetadataError::Malformed("no root element".into()))
    }

    pub fn root(&self) -> &Element {
        &self.root
    }

    pub fn root_mut(&mut self) -> &mut Element {
        &mut self.root
    }

    /// Serialize with an XML declaration and two-space indentation.
    pub fn to_xml(&self) -> Result<String, MetadataError> {
        let mut writer = Writer::new_with_indent(Vec::new(), b' ', 2);
        writer.write_event(Event::Decl(BytesDecl::new("1.0", Some("UTF-8"), None)))?;
        write_element(&mut writer, &self.root)?;
        String::from_utf8(writer.into_inner()).map_err(|e| MetadataError::Xml(e.to_string()))
    }

    /// All `Pixels` elements in document order, one per series.
    pub fn pixels_elements_mut(&mut self) -> Vec<&mut Element> {
        self.root.find_all_mut(PIXELS_ELEMENT)
    }

    pub fn pixels_count(&self) -> usize {
        self.root.count_all(PIXELS_ELEMENT)
    }

    /// The run identity stored on the root element.
    pub fn identity(&self) -> Option<&str> {
        self.root.attribute(IDENTITY_ATTRIBUTE)
    }

    pub fn set_identity(&mut self, identity: impl Into<String>) {
        self.root.set_attribute(IDENTITY_ATTRIBUTE, identity);
    }
}

/// A fresh `urn:uuid:` identity token.
pub fn generate_identity() -> String {
    format!("urn:uuid:{}", Uuid::new_v4())
}

fn utf8(bytes: &[u8]) -> Result<String, MetadataError> {
    str::from_utf8(bytes)
        .map(str::to_string)
        .map_err(|e| MetadataError::Xml(e.to_string()))
}

fn element_from_start(start: &BytesStart<'_>) -> Result<Element, MetadataError> {
    let mut element = Element::new(utf8(start.name().as_ref())?);
    for attr in start.attributes() {
        let attr = attr?;
        let key = utf8(attr.key.as_ref())?;
        let value = attr.unescape_value()?.into_owned();
        element.attributes.push((key, value));
    }
    Ok(element)
}

fn attach(
    stack: &mut [Element],
    root: &mut Option<Element>,
    element: Element,
) -> Result<(), MetadataError> {
    match stack.last_mut() {
        Some(parent) => parent.push_child(element),
        None if root.is_some() => {
            return Err(MetadataError::Malformed(format!(
                "second root element <{}>",
                element.name
            )))
        }
        None => *root = Some(element),
    }
    Ok(())
}

fn write_element(writer: &mut Writer<Vec<u8>>, element: &Element) -> Result<(), MetadataError> {
    let mut start = BytesStart::new(element.name.as_str());
    for (key, value) in &element.attributes {
        start.push_attribute((key.as_str(), value.as_str()));
    }

    if element.children.is_empty() {
        writer.write_event(Event::Empty(start))?;
        return Ok(());
    }

    writer.write_event(Event::Start(start))?;
    for child in &element.children {
        match child {
            Node::Element(e) => write_element(writer, e)?,
            Node::Text(text) => writer.write_event(Event::Text(BytesText::new(text)))?,
        }
    }
    writer.write_event(Event::End(BytesEnd::new(element.name.as_str())))?;
    Ok(())
}
