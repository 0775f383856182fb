use super::arena::XmlDocument;
use super::node::{SourcePos, XmlNodeData};
use super::xname::{XAttribute, XName, XMLNS_NS};
use crate::error::{RedmarkError, Result};
use std::path::Path;

/// Text encoding a part was saved with, detected from its XML declaration.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum XmlEncoding {
    Ascii,
    Utf8,
}

impl XmlEncoding {
    pub fn label(self) -> &'static str {
        match self {
            XmlEncoding::Ascii => "ascii",
            XmlEncoding::Utf8 => "UTF-8",
        }
    }
}

/// Sniff the declared encoding from the head of the document bytes.
pub fn detect_encoding(bytes: &[u8]) -> XmlEncoding {
    let head = &bytes[..bytes.len().min(200)];
    let header = String::from_utf8_lossy(head);
    if header.contains("encoding=\"ascii\"") {
        XmlEncoding::Ascii
    } else {
        XmlEncoding::Utf8
    }
}

pub fn parse(xml: &str) -> Result<XmlDocument> {
    parse_with_location(xml, "input")
}

pub fn parse_bytes(bytes: &[u8]) -> Result<XmlDocument> {
    let text = std::str::from_utf8(bytes).map_err(|e| RedmarkError::XmlParse {
        message: e.to_string(),
        location: "input".to_string(),
    })?;
    parse(text)
}

pub fn parse_file(path: &Path) -> Result<(XmlDocument, XmlEncoding)> {
    let bytes = std::fs::read(path)?;
    let encoding = detect_encoding(&bytes);
    let text = std::str::from_utf8(&bytes).map_err(|e| RedmarkError::XmlParse {
        message: e.to_string(),
        location: path.display().to_string(),
    })?;
    let doc = parse_with_location(text, &path.display().to_string())?;
    Ok((doc, encoding))
}

fn parse_with_location(xml: &str, location: &str) -> Result<XmlDocument> {
    let doc = roxmltree::Document::parse_with_options(
        xml,
        roxmltree::ParsingOptions {
            allow_dtd: true,
            ..Default::default()
        },
    )
    .map_err(|e| RedmarkError::XmlParse {
        message: e.to_string(),
        location: format!("{} line {}", location, e.pos().row),
    })?;

    let mut xml_doc = XmlDocument::new();
    build_tree(&doc, doc.root_element(), &mut xml_doc, None);
    Ok(xml_doc)
}

fn build_tree(
    src: &roxmltree::Document,
    node: roxmltree::Node,
    doc: &mut XmlDocument,
    parent: Option<indextree::NodeId>,
) {
    let node_data = match node.node_type() {
        roxmltree::NodeType::Element => {
            let name = XName::new(
                node.tag_name().namespace().unwrap_or(""),
                node.tag_name().name(),
            );

            let mut attributes: Vec<XAttribute> = node
                .attributes()
                .map(|attr| {
                    XAttribute::new(
                        XName::new(attr.namespace().unwrap_or(""), attr.name()),
                        attr.value(),
                    )
                })
                .collect();

            // Namespace declarations come back separately from regular
            // attributes; re-attach them, but only on the element that
            // introduces them (roxmltree reports all in-scope namespaces).
            let parent_ns: Vec<(Option<&str>, &str)> = node
                .parent_element()
                .map(|p| p.namespaces().map(|ns| (ns.name(), ns.uri())).collect())
                .unwrap_or_default();
            for ns in node.namespaces() {
                if parent_ns.contains(&(ns.name(), ns.uri())) {
                    continue;
                }
                match ns.name() {
                    Some(prefix) => {
                        attributes.push(XAttribute::new(XName::new(XMLNS_NS, prefix), ns.uri()));
                    }
                    None => {
                        attributes.push(XAttribute::new(XName::local("xmlns"), ns.uri()));
                    }
                }
            }

            let pos = src.text_pos_at(node.range().start);
            XmlNodeData::Element {
                name,
                attributes,
                pos: Some(SourcePos {
                    line: pos.row,
                    column: pos.col,
                }),
            }
        }
        roxmltree::NodeType::Text => match node.text() {
            Some(text) => XmlNodeData::Text(text.to_string()),
            None => return,
        },
        roxmltree::NodeType::Comment => match node.text() {
            Some(text) => XmlNodeData::Comment(text.to_string()),
            None => return,
        },
        roxmltree::NodeType::PI => XmlNodeData::ProcessingInstruction {
            target: node
                .pi()
                .map(|pi| pi.target.to_string())
                .unwrap_or_default(),
            data: node
                .pi()
                .and_then(|pi| pi.value.map(|s| s.to_string()))
                .unwrap_or_default(),
        },
        _ => return,
    };

    let new_id = match parent {
        Some(parent_id) => doc.add_child(parent_id, node_data),
        None => doc.add_root(node_data),
    };

    for child in node.children() {
        build_tree(src, child, doc, Some(new_id));
    }
}
