//! Minimal owned XML tree on top of quick-xml.
//!
//! Layer documents are small, so they are read fully into memory,
//! rearranged, and written back out.

use std::path::Path;

use quick_xml::events::{BytesCData, BytesEnd, BytesStart, BytesText, Event};
use quick_xml::{Reader, Writer};

use crate::error::{DrawError, Result};

/// A node in the tree.
#[derive(Debug, Clone, PartialEq)]
pub enum Node {
    /// Nested element.
    Element(XmlElement),
    /// Unescaped character data.
    Text(String),
    /// CDATA section, kept verbatim (stylesheets).
    CData(String),
}

/// An element with ordered attributes and children.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct XmlElement {
    /// Qualified name, prefix included.
    pub name: String,
    /// Attributes in document order, unescaped.
    pub attrs: Vec<(String, String)>,
    /// Child nodes in document order.
    pub children: Vec<Node>,
}

impl XmlElement {
    /// Empty element.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    /// Builder: add an attribute.
    pub fn attr(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.set_attr(key, value);
        self
    }

    /// Builder: add a child element.
    pub fn child(mut self, child: XmlElement) -> Self {
        self.children.push(Node::Element(child));
        self
    }

    /// Builder: add a text node.
    pub fn text(mut self, text: impl Into<String>) -> Self {
        self.children.push(Node::Text(text.into()));
        self
    }

    /// Attribute value by name.
    pub fn get_attr(&self, key: &str) -> Option<&str> {
        self.attrs
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    /// Set or replace an attribute.
    pub fn set_attr(&mut self, key: impl Into<String>, value: impl Into<String>) {
        let (key, value) = (key.into(), value.into());
        match self.attrs.iter_mut().find(|(k, _)| *k == key) {
            Some(slot) => slot.1 = value,
            None => self.attrs.push((key, value)),
        }
    }

    /// Child elements, skipping text.
    pub fn elements(&self) -> impl Iterator<Item = &XmlElement> {
        self.children.iter().filter_map(|n| match n {
            Node::Element(e) => Some(e),
            _ => None,
        })
    }

    /// Mutable child elements, skipping text.
    pub fn elements_mut(&mut self) -> impl Iterator<Item = &mut XmlElement> {
        self.children.iter_mut().filter_map(|n| match n {
            Node::Element(e) => Some(e),
            _ => None,
        })
    }

    /// Visit this element and every descendant, depth first.
    pub fn walk_mut(&mut self, f: &mut impl FnMut(&mut XmlElement)) {
        f(self);
        for child in self.elements_mut() {
            child.walk_mut(f);
        }
    }

    /// Count elements named `name` in this subtree, this one included.
    pub fn count(&self, name: &str) -> usize {
        usize::from(self.name == name) + self.elements().map(|e| e.count(name)).sum::<usize>()
    }
}

fn malformed(path: &Path, reason: impl Into<String>) -> DrawError {
    DrawError::Layer {
        path: path.to_path_buf(),
        reason: reason.into(),
    }
}

fn start_element(e: &BytesStart<'_>) -> Result<XmlElement> {
    let mut element = XmlElement::new(String::from_utf8_lossy(e.name().as_ref()));
    for attr in e.attributes() {
        let attr = attr.map_err(quick_xml::Error::from)?;
        let key = String::from_utf8_lossy(attr.key.as_ref()).into_owned();
        let value = attr.unescape_value()?.into_owned();
        element.attrs.push((key, value));
    }
    Ok(element)
}

/// Parse a document into its root element. `path` is only used in errors.
///
/// Declarations, processing instructions, doctypes, and comments are
/// dropped, as are whitespace-only text nodes. Other text is kept verbatim.
pub fn parse_document(text: &str, path: &Path) -> Result<XmlElement> {
    let mut reader = Reader::from_str(text);

    let mut stack: Vec<XmlElement> = Vec::new();
    let mut root = None;

    let mut attach = |stack: &mut Vec<XmlElement>, element: XmlElement| -> Result<()> {
        match stack.last_mut() {
            Some(parent) => parent.children.push(Node::Element(element)),
            None if root.is_none() => root = Some(element),
            None => return Err(malformed(path, "multiple root elements")),
        }
        Ok(())
    };

    loop {
        match reader.read_event()? {
            Event::Start(e) => stack.push(start_element(&e)?),
            Event::Empty(e) => {
                let element = start_element(&e)?;
                attach(&mut stack, element)?;
            }
            Event::End(_) => {
                let element = stack
                    .pop()
                    .ok_or_else(|| malformed(path, "unbalanced end tag"))?;
                attach(&mut stack, element)?;
            }
            Event::Text(t) => {
                let text = t.unescape()?.into_owned();
                if text.trim().is_empty() {
                    continue;
                }
                if let Some(parent) = stack.last_mut() {
                    parent.children.push(Node::Text(text));
                }
            }
            Event::CData(c) => {
                if let Some(parent) = stack.last_mut() {
                    parent
                        .children
                        .push(Node::CData(String::from_utf8_lossy(&c).into_owned()));
                }
            }
            Event::Eof => break,
            _ => {}
        }
    }

    if !stack.is_empty() {
        return Err(malformed(path, "unclosed element"));
    }
    root.ok_or_else(|| malformed(path, "no root element"))
}

/// Read and parse a document from disk.
pub fn read_document(path: &Path) -> Result<XmlElement> {
    let text = std::fs::read_to_string(path)?;
    parse_document(&text, path)
}

fn write_element(writer: &mut Writer<Vec<u8>>, element: &XmlElement) -> Result<()> {
    let mut start = BytesStart::new(element.name.as_str());
    for (k, v) in &element.attrs {
        start.push_attribute((k.as_str(), v.as_str()));
    }
    if element.children.is_empty() {
        writer.write_event(Event::Empty(start))?;
        return Ok(());
    }
    writer.write_event(Event::Start(start))?;
    for child in &element.children {
        match child {
            Node::Element(e) => write_element(writer, e)?,
            Node::Text(t) => writer.write_event(Event::Text(BytesText::new(t)))?,
            Node::CData(c) => writer.write_event(Event::CData(BytesCData::new(c.as_str())))?,
        }
    }
    writer.write_event(Event::End(BytesEnd::new(element.name.as_str())))?;
    Ok(())
}

/// Serialise a document, with an XML declaration and an optional
/// stylesheet processing instruction.
pub fn write_document(root: &XmlElement, stylesheet: Option<&str>) -> Result<Vec<u8>> {
    let mut buf = br#"<?xml version="1.0" encoding="UTF-8" standalone="no"?>"#.to_vec();
    buf.push(b'\n');
    if let Some(href) = stylesheet {
        let href = quick_xml::escape::escape(href);
        buf.extend_from_slice(format!(r#"<?xml-stylesheet type="text/css" href="{href}"?>"#).as_bytes());
        buf.push(b'\n');
    }
    let mut writer = Writer::new_with_indent(buf, b' ', 2);
    write_element(&mut writer, root)?;
    let mut out = writer.into_inner();
    out.push(b'\n');
    Ok(out)
}

/// Write a document to `path`, creating parent directories.
pub fn save_document(root: &XmlElement, stylesheet: Option<&str>, path: &Path) -> Result<()> {
    if let Some(dir) = path.parent().filter(|d| !d.as_os_str().is_empty()) {
        std::fs::create_dir_all(dir)?;
    }
    std::fs::write(path, write_document(root, stylesheet)?)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_tree() {
        let doc = r#"<?xml version="1.0"?>
            <!-- layer -->
            <svg xmlns="http://www.w3.org/2000/svg" width="10mm">
              <g class="a &amp; b"><path d="M 0,0 L 1,1"/></g>
              <text>1 &lt; 2</text>
              <style><![CDATA[.cut { fill: black; }]]></style>
            </svg>"#;
        let root = parse_document(doc, Path::new("t.svg")).unwrap();
        assert_eq!(root.name, "svg");
        assert_eq!(root.get_attr("width"), Some("10mm"));
        let children: Vec<_> = root.elements().collect();
        assert_eq!(children.len(), 3);
        assert_eq!(children[0].get_attr("class"), Some("a & b"));
        assert_eq!(children[0].count("path"), 1);
        assert_eq!(children[1].children, vec![Node::Text("1 < 2".into())]);
        assert_eq!(
            children[2].children,
            vec![Node::CData(".cut { fill: black; }".into())]
        );
    }

    #[test]
    fn test_malformed_documents() {
        let p = Path::new("bad.svg");
        assert!(parse_document("", p).is_err());
        assert!(parse_document("<svg><g></svg>", p).is_err());
        assert!(matches!(
            parse_document("<svg/><svg/>", p),
            Err(DrawError::Layer { .. })
        ));
    }

    #[test]
    fn test_write_escapes_and_reparses() {
        let root = XmlElement::new("svg")
            .attr("xmlns:ifc", "http://www.ifcopenshell.org/ns")
            .child(XmlElement::new("text").attr("class", "a\"b").text("R&D"));
        let bytes = write_document(&root, Some("default.css")).unwrap();
        let text = String::from_utf8(bytes).unwrap();
        assert!(text.starts_with("<?xml version=\"1.0\""));
        assert!(text.contains(r#"<?xml-stylesheet type="text/css" href="default.css"?>"#));
        assert!(text.contains("R&amp;D"));

        let reparsed = parse_document(&text, Path::new("t.svg")).unwrap();
        assert_eq!(reparsed, root);
    }

    #[test]
    fn test_label_whitespace_survives_reparse() {
        let root = XmlElement::new("svg").child(
            XmlElement::new("g")
                .child(XmlElement::new("text").text("  3.50 "))
                .child(XmlElement::new("text").text("LIVING")),
        );
        let bytes = write_document(&root, None).unwrap();
        let reparsed = parse_document(&String::from_utf8(bytes).unwrap(), Path::new("a.svg")).unwrap();
        assert_eq!(reparsed, root);

        let labels: Vec<_> = reparsed.elements().next().unwrap().elements().collect();
        assert_eq!(labels[0].children, vec![Node::Text("  3.50 ".into())]);
    }

    #[test]
    fn test_set_attr_replaces() {
        let mut e = XmlElement::new("image").attr("href", "a.png");
        e.set_attr("href", "b.png");
        assert_eq!(e.attrs, vec![("href".to_string(), "b.png".to_string())]);
    }
}
