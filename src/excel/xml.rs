//! Minimal element tree over quick-xml events, enough to walk the parts of an
//! xlsx package (styles, workbook, relationships, worksheets).

use crate::error::{ConvertError, ConvertResult};
use quick_xml::escape::{resolve_predefined_entity, unescape};
use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;
use std::str::FromStr;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum XmlNode {
    Element(XmlElement),
    Text(String),
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct XmlElement {
    /// Local name, namespace prefix stripped
    pub name: String,
    /// Attributes keyed by their qualified name (`r:id` keeps its prefix)
    pub attrs: Vec<(String, String)>,
    pub children: Vec<XmlNode>,
}

impl XmlElement {
    /// Parse a whole XML document and return its root element.
    pub fn parse(part: &str, xml: &str) -> ConvertResult<XmlElement> {
        let xml_err = |message: String| ConvertError::Xml {
            part: part.to_string(),
            message,
        };

        let mut reader = Reader::from_str(xml);
        let mut buf = Vec::new();
        let mut stack: Vec<XmlElement> = Vec::new();
        let mut root: Option<XmlElement> = None;

        loop {
            let event = reader
                .read_event_into(&mut buf)
                .map_err(|e| xml_err(e.to_string()))?;
            match event {
                Event::Start(ref e) => stack.push(start_element(e).map_err(&xml_err)?),
                Event::Empty(ref e) => {
                    let element = start_element(e).map_err(&xml_err)?;
                    attach(&mut stack, &mut root, element);
                }
                Event::End(_) => {
                    let element = stack
                        .pop()
                        .ok_or_else(|| xml_err("unbalanced end tag".to_string()))?;
                    attach(&mut stack, &mut root, element);
                }
                Event::Text(ref t) => {
                    let raw = t.decode().map_err(|e| xml_err(e.to_string()))?;
                    let text = unescape(&raw).map_err(|e| xml_err(e.to_string()))?;
                    push_text(&mut stack, &text);
                }
                Event::CData(ref t) => {
                    let text = String::from_utf8_lossy(t.as_ref()).into_owned();
                    push_text(&mut stack, &text);
                }
                Event::GeneralRef(ref r) => {
                    let resolved = match r.resolve_char_ref().map_err(|e| xml_err(e.to_string()))? {
                        Some(ch) => ch.to_string(),
                        None => {
                            let name = r.decode().map_err(|e| xml_err(e.to_string()))?;
                            resolve_predefined_entity(&name)
                                .map(str::to_string)
                                .ok_or_else(|| xml_err(format!("unknown entity &{};", name)))?
                        }
                    };
                    push_text(&mut stack, &resolved);
                }
                Event::Eof => break,
                _ => {}
            }
            buf.clear();
        }

        if !stack.is_empty() {
            return Err(xml_err("unexpected end of document".to_string()));
        }
        root.ok_or_else(|| xml_err("document has no root element".to_string()))
    }

    /// Attribute by qualified name, falling back to a match on the local part.
    pub fn attr(&self, name: &str) -> Option<&str> {
        self.attrs
            .iter()
            .find(|(key, _)| key == name)
            .or_else(|| {
                self.attrs
                    .iter()
                    .find(|(key, _)| key.rsplit(':').next() == Some(name))
            })
            .map(|(_, value)| value.as_str())
    }

    pub fn attr_parse<T: FromStr>(&self, name: &str) -> Option<T> {
        self.attr(name).and_then(|v| v.trim().parse().ok())
    }

    /// Boolean attribute (`1`/`true`/`0`/`false`).
    pub fn attr_bool(&self, name: &str) -> Option<bool> {
        match self.attr(name)? {
            "1" | "true" => Some(true),
            "0" | "false" => Some(false),
            _ => None,
        }
    }

    pub fn elements(&self) -> impl Iterator<Item = &XmlElement> {
        self.children.iter().filter_map(|node| match node {
            XmlNode::Element(e) => Some(e),
            XmlNode::Text(_) => None,
        })
    }

    pub fn children_named<'a>(&'a self, name: &'a str) -> impl Iterator<Item = &'a XmlElement> {
        self.elements().filter(move |e| e.name == name)
    }

    pub fn child(&self, name: &str) -> Option<&XmlElement> {
        self.elements().find(|e| e.name == name)
    }

    /// Concatenated text content of direct text children.
    pub fn text(&self) -> String {
        self.children
            .iter()
            .filter_map(|node| match node {
                XmlNode::Text(t) => Some(t.as_str()),
                XmlNode::Element(_) => None,
            })
            .collect()
    }
}

fn start_element(e: &BytesStart<'_>) -> Result<XmlElement, String> {
    let name = String::from_utf8_lossy(e.local_name().as_ref()).into_owned();
    let mut attrs = Vec::new();
    for attr in e.attributes() {
        let attr = attr.map_err(|err| err.to_string())?;
        let key = String::from_utf8_lossy(attr.key.as_ref()).into_owned();
        let raw = String::from_utf8_lossy(&attr.value);
        let value = unescape(&raw)
            .map(|v| v.into_owned())
            .unwrap_or_else(|_| raw.to_string());
        attrs.push((key, value));
    }
    Ok(XmlElement {
        name,
        attrs,
        children: Vec::new(),
    })
}

fn attach(stack: &mut [XmlElement], root: &mut Option<XmlElement>, element: XmlElement) {
    match stack.last_mut() {
        Some(parent) => parent.children.push(XmlNode::Element(element)),
        None => *root = Some(element),
    }
}

fn push_text(stack: &mut [XmlElement], text: &str) {
    let Some(parent) = stack.last_mut() else {
        return;
    };
    if let Some(XmlNode::Text(existing)) = parent.children.last_mut() {
        existing.push_str(text);
    } else {
        parent.children.push(XmlNode::Text(text.to_string()));
    }
}
