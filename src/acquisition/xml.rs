//! Minimal namespace-aware XML tree for project documents.
//!
//! Project documents are small enough to hold in memory, and every lookup
//! we need is "first element with this local name, in document order", so a
//! plain owned tree beats streaming here.

use std::collections::HashMap;

use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum XmlError {
    #[error("XML syntax error at byte {position}: {message}")]
    Syntax { position: u64, message: String },

    #[error("document has no root element")]
    NoRoot,

    #[error("document ended inside element '{0}'")]
    Unclosed(String),

    #[error("content after the root element")]
    TrailingContent,
}

/// One element with its resolved namespace and direct text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct XmlElement {
    /// Qualified name as written (`prefix:local` or `local`).
    pub name: String,
    pub local_name: String,
    pub namespace: Option<String>,
    /// Concatenated direct text and CDATA content, untrimmed.
    pub text: String,
    pub children: Vec<XmlElement>,
}

impl XmlElement {
    /// Direct text with surrounding whitespace removed.
    pub fn trimmed_text(&self) -> &str {
        self.text.trim()
    }

    /// Pre-order walk over this element and all descendants.
    pub fn descendants(&self) -> Descendants<'_> {
        Descendants { stack: vec![self] }
    }

    /// First element (self included) with the given local name, in document
    /// order.
    pub fn find_first(&self, local_name: &str) -> Option<&XmlElement> {
        self.descendants().find(|e| e.local_name == local_name)
    }

    /// Trimmed text of the first element with the given local name whose
    /// text is non-empty.
    pub fn first_text(&self, local_name: &str) -> Option<&str> {
        self.descendants()
            .filter(|e| e.local_name == local_name)
            .map(XmlElement::trimmed_text)
            .find(|t| !t.is_empty())
    }
}

/// Document-order iterator over an element subtree.
pub struct Descendants<'a> {
    stack: Vec<&'a XmlElement>,
}

impl<'a> Iterator for Descendants<'a> {
    type Item = &'a XmlElement;

    fn next(&mut self) -> Option<Self::Item> {
        let next = self.stack.pop()?;
        self.stack.extend(next.children.iter().rev());
        Some(next)
    }
}

/// A parsed document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct XmlDocument {
    pub root: XmlElement,
}

fn split_name(qualified: &str) -> (Option<&str>, &str) {
    match qualified.split_once(':') {
        Some((prefix, local)) => (Some(prefix), local),
        None => (None, qualified),
    }
}

struct OpenElement {
    element: XmlElement,
    scope: HashMap<String, String>,
}

fn lookup_namespace(
    prefix: Option<&str>,
    open: &[OpenElement],
    own_scope: &HashMap<String, String>,
) -> Option<String> {
    let key = prefix.unwrap_or("");
    own_scope
        .get(key)
        .or_else(|| open.iter().rev().find_map(|o| o.scope.get(key)))
        .filter(|uri| !uri.is_empty())
        .cloned()
}

fn open_element(start: &BytesStart<'_>, open: &[OpenElement]) -> Result<OpenElement, String> {
    let name = String::from_utf8_lossy(start.name().as_ref()).into_owned();

    let mut scope = HashMap::new();
    for attr in start.attributes() {
        let attr = attr.map_err(|e| e.to_string())?;
        let key = attr.key.as_ref();
        let value = attr
            .unescape_value()
            .map_err(|e| e.to_string())?
            .into_owned();
        if key == b"xmlns" {
            scope.insert(String::new(), value);
        } else if let Some(prefix) = key.strip_prefix(b"xmlns:") {
            scope.insert(String::from_utf8_lossy(prefix).into_owned(), value);
        }
    }

    let (prefix, local) = split_name(&name);
    let namespace = lookup_namespace(prefix, open, &scope);
    let local_name = local.to_string();

    Ok(OpenElement {
        element: XmlElement {
            name,
            local_name,
            namespace,
            text: String::new(),
            children: Vec::new(),
        },
        scope,
    })
}

impl XmlDocument {
    /// Parse a complete document. The document must have exactly one root
    /// element and every element must be closed.
    pub fn parse(xml: &str) -> Result<Self, XmlError> {
        let mut reader = Reader::from_str(xml);
        let mut open: Vec<OpenElement> = Vec::new();
        let mut root: Option<XmlElement> = None;

        let syntax = |reader: &Reader<&[u8]>, message: String| XmlError::Syntax {
            position: reader.buffer_position() as u64,
            message,
        };

        loop {
            let event = reader
                .read_event()
                .map_err(|e| syntax(&reader, e.to_string()))?;

            match event {
                Event::Start(start) => {
                    if root.is_some() {
                        return Err(XmlError::TrailingContent);
                    }
                    let element =
                        open_element(&start, &open).map_err(|m| syntax(&reader, m))?;
                    open.push(element);
                }
                Event::Empty(start) => {
                    if root.is_some() {
                        return Err(XmlError::TrailingContent);
                    }
                    let element = open_element(&start, &open)
                        .map_err(|m| syntax(&reader, m))?
                        .element;
                    match open.last_mut() {
                        Some(parent) => parent.element.children.push(element),
                        None => root = Some(element),
                    }
                }
                Event::End(_) => {
                    let Some(done) = open.pop() else {
                        return Err(syntax(&reader, "unexpected closing tag".to_string()));
                    };
                    match open.last_mut() {
                        Some(parent) => parent.element.children.push(done.element),
                        None => root = Some(done.element),
                    }
                }
                Event::Text(text) => {
                    let value = text
                        .unescape()
                        .map_err(|e| syntax(&reader, e.to_string()))?;
                    match open.last_mut() {
                        Some(current) => current.element.text.push_str(&value),
                        None if value.trim().is_empty() => {}
                        None => return Err(syntax(&reader, "text outside root element".into())),
                    }
                }
                Event::CData(data) => {
                    if let Some(current) = open.last_mut() {
                        current.element.text.push_str(&String::from_utf8_lossy(&data));
                    }
                }
                Event::Eof => break,
                // Declarations, comments, processing instructions, doctype.
                _ => {}
            }
        }

        if let Some(unclosed) = open.pop() {
            return Err(XmlError::Unclosed(unclosed.element.name));
        }

        root.map(|root| XmlDocument { root }).ok_or(XmlError::NoRoot)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<!-- exported -->
<project xmlns="http://cordis.europa.eu" xmlns:x="urn:extra">
  <id> 101057392 </id>
  <title>ACME &amp; Friends</title>
  <x:note><![CDATA[raw <text>]]></x:note>
  <relations>
    <organization><id>999</id><title></title></organization>
  </relations>
  <empty/>
</project>"#;

    #[test]
    fn parses_tree_with_namespaces() {
        let doc = XmlDocument::parse(SAMPLE).unwrap();
        let root = &doc.root;
        assert_eq!(root.local_name, "project");
        assert_eq!(root.namespace.as_deref(), Some("http://cordis.europa.eu"));

        let note = root.find_first("note").unwrap();
        assert_eq!(note.name, "x:note");
        assert_eq!(note.namespace.as_deref(), Some("urn:extra"));
        assert_eq!(note.text, "raw <text>");

        // Default namespace is inherited.
        let title = root.find_first("title").unwrap();
        assert_eq!(title.namespace.as_deref(), Some("http://cordis.europa.eu"));
        assert_eq!(title.text, "ACME & Friends");

        assert!(root.find_first("empty").is_some());
    }

    #[test]
    fn first_match_is_in_document_order() {
        let doc = XmlDocument::parse(SAMPLE).unwrap();
        assert_eq!(doc.root.find_first("id").unwrap().trimmed_text(), "101057392");
        assert_eq!(doc.root.first_text("title"), Some("ACME & Friends"));
        assert_eq!(doc.root.first_text("missing"), None);
    }

    #[test]
    fn first_text_skips_empty_elements() {
        let doc = XmlDocument::parse("<p><a> </a><b><a>second</a></b></p>").unwrap();
        assert_eq!(doc.root.first_text("a"), Some("second"));
    }

    #[test]
    fn rejects_malformed_documents() {
        assert!(XmlDocument::parse("").is_err());
        assert!(XmlDocument::parse("not xml at all").is_err());
        assert!(XmlDocument::parse("<project><id>1</id>").is_err());
        assert!(XmlDocument::parse("<project></other>").is_err());
        assert!(XmlDocument::parse("<a/><b/>").is_err());
    }

    #[test]
    fn unprefixed_without_default_namespace() {
        let doc = XmlDocument::parse("<project><id>1</id></project>").unwrap();
        assert_eq!(doc.root.namespace, None);
    }
}
