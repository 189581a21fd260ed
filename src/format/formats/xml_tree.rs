//! Minimal owned XML element tree.
//!
//! Box annotation files are edited in place: objects are rewritten while the
//! rest of the document (header fields, unknown elements) must survive
//! untouched. The tree keeps element names, attributes, text and children in
//! document order. Comments and processing instructions are dropped.

use std::io::Write;

use quick_xml::Reader;
use quick_xml::Writer;
use quick_xml::events::{BytesDecl, BytesEnd, BytesStart, BytesText, Event};

use crate::format::error::FormatError;

/// One XML element with its attributes, text content and child elements.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct XmlNode {
    pub name: String,
    pub attrs: Vec<(String, String)>,
    pub text: String,
    pub children: Vec<XmlNode>,
}

impl XmlNode {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }

    /// Leaf element holding only text.
    pub fn with_text(name: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            text: text.into(),
            ..Default::default()
        }
    }

    pub fn is_leaf(&self) -> bool {
        self.children.is_empty()
    }

    /// First child with the given name.
    pub fn child(&self, name: &str) -> Option<&XmlNode> {
        self.children.iter().find(|c| c.name == name)
    }

    pub fn child_mut(&mut self, name: &str) -> Option<&mut XmlNode> {
        self.children.iter_mut().find(|c| c.name == name)
    }

    /// Trimmed text of the first child with the given name.
    pub fn child_text(&self, name: &str) -> Option<&str> {
        self.child(name).map(|c| c.text.trim())
    }

    pub fn children_named<'a>(&'a self, name: &'a str) -> impl Iterator<Item = &'a XmlNode> {
        self.children.iter().filter(move |c| c.name == name)
    }

    /// Set the text of the first child with the given name, appending the child if missing.
    pub fn set_child_text(&mut self, name: &str, text: impl Into<String>) {
        let text = text.into();
        match self.child_mut(name) {
            Some(child) => child.text = text,
            None => self.children.push(XmlNode::with_text(name, text)),
        }
    }

    /// Parse a document and return its root element.
    pub fn parse(raw: &str) -> Result<XmlNode, FormatError> {
        let mut reader = Reader::from_str(raw);
        reader.trim_text(true);

        let mut stack: Vec<XmlNode> = Vec::new();
        let mut root: Option<XmlNode> = None;

        loop {
            match reader.read_event()? {
                Event::Start(ref e) => stack.push(Self::from_start(e)?),
                Event::Empty(ref e) => {
                    let node = Self::from_start(e)?;
                    Self::attach(&mut stack, &mut root, node)?;
                }
                Event::End(_) => {
                    let node = stack
                        .pop()
                        .ok_or_else(|| FormatError::invalid_format("Unexpected closing tag"))?;
                    Self::attach(&mut stack, &mut root, node)?;
                }
                Event::Text(ref e) => {
                    if let Some(current) = stack.last_mut() {
                        current.text.push_str(&e.unescape()?);
                    }
                }
                Event::CData(e) => {
                    if let Some(current) = stack.last_mut() {
                        current.text.push_str(&String::from_utf8_lossy(&e.into_inner()));
                    }
                }
                Event::Eof => break,
                _ => {}
            }
        }

        if let Some(open) = stack.last() {
            return Err(FormatError::UnclosedElement {
                name: open.name.clone(),
            });
        }
        root.ok_or_else(|| FormatError::invalid_format("Document has no root element"))
    }

    fn from_start(e: &BytesStart<'_>) -> Result<XmlNode, FormatError> {
        let mut node = XmlNode::new(String::from_utf8_lossy(e.name().as_ref()));
        for attr in e.attributes() {
            let attr = attr.map_err(|e| FormatError::Xml(e.into()))?;
            let key = String::from_utf8_lossy(attr.key.as_ref()).to_string();
            let value = attr.unescape_value()?.to_string();
            node.attrs.push((key, value));
        }
        Ok(node)
    }

    fn attach(
        stack: &mut [XmlNode],
        root: &mut Option<XmlNode>,
        node: XmlNode,
    ) -> Result<(), FormatError> {
        match stack.last_mut() {
            Some(parent) => parent.children.push(node),
            None if root.is_none() => *root = Some(node),
            None => {
                return Err(FormatError::invalid_format(
                    "Document has more than one root element",
                ));
            }
        }
        Ok(())
    }

    /// Serialize as an indented document with an XML declaration.
    pub fn to_xml_string(&self) -> Result<String, FormatError> {
        let mut writer = Writer::new_with_indent(Vec::new(), b' ', 2);
        writer
            .write_event(Event::Decl(BytesDecl::new("1.0", None, None)))
            .map_err(|e| FormatError::Xml(e.into()))?;
        self.write(&mut writer)?;

        let result = writer.into_inner();
        String::from_utf8(result).map_err(|_| FormatError::invalid_format("Invalid UTF-8 in XML"))
    }

    fn write<W: Write>(&self, writer: &mut Writer<W>) -> Result<(), FormatError> {
        let start = BytesStart::new(self.name.as_str())
            .with_attributes(self.attrs.iter().map(|(k, v)| (k.as_str(), v.as_str())));

        if self.children.is_empty() && self.text.is_empty() {
            writer
                .write_event(Event::Empty(start))
                .map_err(|e| FormatError::Xml(e.into()))?;
            return Ok(());
        }

        writer
            .write_event(Event::Start(start))
            .map_err(|e| FormatError::Xml(e.into()))?;
        if !self.text.is_empty() {
            writer
                .write_event(Event::Text(BytesText::new(&self.text)))
                .map_err(|e| FormatError::Xml(e.into()))?;
        }
        for child in &self.children {
            child.write(writer)?;
        }
        writer
            .write_event(Event::End(BytesEnd::new(self.name.as_str())))
            .map_err(|e| FormatError::Xml(e.into()))?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_nested_tree() {
        let root = XmlNode::parse(
            r#"<?xml version="1.0"?>
<annotation verified="yes">
  <filename>a.jpg</filename>
  <object><name>car</name><occluded/></object>
</annotation>"#,
        )
        .unwrap();
        assert_eq!(root.name, "annotation");
        assert_eq!(root.attrs, vec![("verified".to_string(), "yes".to_string())]);
        assert_eq!(root.child_text("filename"), Some("a.jpg"));
        let object = root.child("object").unwrap();
        assert_eq!(object.child_text("name"), Some("car"));
        assert!(object.child("occluded").unwrap().is_leaf());
    }

    #[test]
    fn test_parse_rejects_malformed() {
        assert!(XmlNode::parse("<annotation><object></annotation>").is_err());
        assert!(XmlNode::parse("<annotation>").is_err());
        assert!(XmlNode::parse("").is_err());
        assert!(XmlNode::parse("<a/><b/>").is_err());
    }

    #[test]
    fn test_escaped_text_survives() {
        let mut root = XmlNode::new("annotation");
        root.set_child_text("note", "a < b & c");
        let xml = root.to_xml_string().unwrap();
        assert!(xml.contains("a &lt; b &amp; c"));
        let back = XmlNode::parse(&xml).unwrap();
        assert_eq!(back.child_text("note"), Some("a < b & c"));
    }

    #[test]
    fn test_set_child_text_replaces_or_appends() {
        let mut node = XmlNode::new("object");
        node.set_child_text("name", "car");
        node.set_child_text("name", "truck");
        node.set_child_text("color", "red");
        assert_eq!(node.children.len(), 2);
        assert_eq!(node.child_text("name"), Some("truck"));
    }
}
