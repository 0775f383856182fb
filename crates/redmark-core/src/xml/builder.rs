use super::arena::XmlDocument;
use super::namespaces::default_prefix;
use super::node::XmlNodeData;
use super::parser::XmlEncoding;
use super::xname::{XAttribute, XName, XMLNS_NS};
use crate::error::{RedmarkError, Result};
use quick_xml::events::{BytesEnd, BytesStart, BytesText, Event};
use quick_xml::Writer;
use std::collections::HashMap;
use std::io::Cursor;

type NamespaceMap = HashMap<String, String>;

/// Serialize a document with its XML declaration in the given encoding.
///
/// ASCII output escapes every non-ASCII character as a decimal character
/// reference, matching how the parts were pretty-printed at unpack time.
pub fn serialize_bytes(doc: &XmlDocument, encoding: XmlEncoding) -> Result<Vec<u8>> {
    let body = serialize_body(doc, None)?;
    Ok(finish(body, encoding))
}

/// Serialize with 2-space indentation (used when unpacking an archive).
pub fn serialize_pretty_bytes(doc: &XmlDocument, encoding: XmlEncoding) -> Result<Vec<u8>> {
    let body = serialize_body(doc, Some("  "))?;
    Ok(finish(body, encoding))
}

/// Serialize a single subtree without an XML declaration.
///
/// No ancestor namespace declarations are merged in; prefixes without an
/// in-scope declaration fall back to the conventional OOXML prefixes, so
/// the output can be re-inserted into a document that declares them.
pub fn serialize_subtree(doc: &XmlDocument, node: indextree::NodeId) -> Result<String> {
    let mut writer = Writer::new(Cursor::new(Vec::new()));
    let namespace_map = NamespaceMap::new();
    write_node(doc, node, &mut writer, &namespace_map, None, 0)?;
    let bytes = writer.into_inner().into_inner();
    String::from_utf8(bytes).map_err(|e| RedmarkError::XmlWrite(e.to_string()))
}

fn serialize_body(doc: &XmlDocument, indent: Option<&str>) -> Result<String> {
    let mut writer = Writer::new(Cursor::new(Vec::new()));

    if let Some(root_id) = doc.root() {
        let mut namespace_map = NamespaceMap::new();
        if let Some(attrs) = doc.get(root_id).and_then(|d| d.attributes()) {
            extend_namespace_map(&mut namespace_map, attrs);
        }
        write_node(doc, root_id, &mut writer, &namespace_map, indent, 0)?;
    }

    let bytes = writer.into_inner().into_inner();
    String::from_utf8(bytes).map_err(|e| RedmarkError::XmlWrite(e.to_string()))
}

fn finish(body: String, encoding: XmlEncoding) -> Vec<u8> {
    let mut out = match encoding {
        XmlEncoding::Ascii => String::from("<?xml version=\"1.0\" encoding=\"ascii\"?>\n"),
        XmlEncoding::Utf8 => {
            String::from("<?xml version=\"1.0\" encoding=\"UTF-8\" standalone=\"yes\"?>\n")
        }
    };

    match encoding {
        XmlEncoding::Ascii => {
            for c in body.chars() {
                if c.is_ascii() {
                    out.push(c);
                } else {
                    out.push_str(&format!("&#{};", c as u32));
                }
            }
        }
        XmlEncoding::Utf8 => out.push_str(&body),
    }

    out.into_bytes()
}

fn extend_namespace_map(namespace_map: &mut NamespaceMap, attributes: &[XAttribute]) {
    for attr in attributes {
        match &attr.name.namespace {
            None if attr.name.local_name == "xmlns" => {
                namespace_map
                    .entry(attr.value.clone())
                    .or_insert_with(String::new);
            }
            Some(ns) if ns == XMLNS_NS => {
                namespace_map
                    .entry(attr.value.clone())
                    .or_insert_with(|| attr.name.local_name.clone());
            }
            _ => {}
        }
    }
}

fn prefix_for_namespace<'a>(namespace: &str, namespace_map: &'a NamespaceMap) -> &'a str {
    match namespace_map.get(namespace) {
        Some(prefix) => prefix.as_str(),
        None => default_prefix(namespace),
    }
}

fn prefix_for_attribute<'a>(namespace: &str, namespace_map: &'a NamespaceMap) -> &'a str {
    if namespace == XMLNS_NS {
        return "xmlns";
    }
    if let Some(prefix) = namespace_map.get(namespace) {
        if !prefix.is_empty() {
            return prefix.as_str();
        }
    }
    default_prefix(namespace)
}

fn qualified_name(name: &XName, namespace_map: &NamespaceMap) -> String {
    match &name.namespace {
        Some(ns) => {
            let prefix = prefix_for_namespace(ns, namespace_map);
            if prefix.is_empty() {
                name.local_name.clone()
            } else {
                format!("{}:{}", prefix, name.local_name)
            }
        }
        None => name.local_name.clone(),
    }
}

fn write_node<W: std::io::Write>(
    doc: &XmlDocument,
    node_id: indextree::NodeId,
    writer: &mut Writer<W>,
    namespace_map: &NamespaceMap,
    indent: Option<&str>,
    depth: usize,
) -> Result<()> {
    let Some(node_data) = doc.get(node_id) else {
        return Ok(());
    };

    match node_data {
        XmlNodeData::Element {
            name, attributes, ..
        } => {
            write_element(doc, node_id, name, attributes, writer, namespace_map, indent, depth)?;
        }
        XmlNodeData::Text(text) => {
            writer
                .write_event(Event::Text(BytesText::new(text)))
                .map_err(|e| RedmarkError::XmlWrite(e.to_string()))?;
        }
        XmlNodeData::Comment(text) => {
            writer
                .write_event(Event::Comment(BytesText::new(text)))
                .map_err(|e| RedmarkError::XmlWrite(e.to_string()))?;
        }
        XmlNodeData::ProcessingInstruction { target, data } => {
            let pi_content = if data.is_empty() {
                target.clone()
            } else {
                format!("{} {}", target, data)
            };
            writer
                .write_event(Event::PI(quick_xml::events::BytesPI::new(&pi_content)))
                .map_err(|e| RedmarkError::XmlWrite(e.to_string()))?;
        }
    }

    Ok(())
}

#[allow(clippy::too_many_arguments)]
fn write_element<W: std::io::Write>(
    doc: &XmlDocument,
    node_id: indextree::NodeId,
    name: &XName,
    attributes: &[XAttribute],
    writer: &mut Writer<W>,
    namespace_map: &NamespaceMap,
    indent: Option<&str>,
    depth: usize,
) -> Result<()> {
    let mut scoped_map = namespace_map.clone();
    extend_namespace_map(&mut scoped_map, attributes);

    let tag_name = qualified_name(name, &scoped_map);
    let mut elem = BytesStart::new(&tag_name);

    for attr in attributes {
        let attr_name = match &attr.name.namespace {
            Some(ns) => {
                let prefix = prefix_for_attribute(ns, &scoped_map);
                if prefix.is_empty() {
                    attr.name.local_name.clone()
                } else {
                    format!("{}:{}", prefix, attr.name.local_name)
                }
            }
            None => attr.name.local_name.clone(),
        };
        elem.push_attribute((attr_name.as_str(), attr.value.as_str()));
    }

    let children: Vec<_> = doc.children(node_id).collect();

    if children.is_empty() {
        writer.write_event(Event::Empty(elem)).map_err(|e| RedmarkError::XmlWrite(e.to_string()))?;
        return Ok(());
    }

    writer.write_event(Event::Start(elem)).map_err(|e| RedmarkError::XmlWrite(e.to_string()))?;

    // A lone text child stays inline; otherwise, pretty mode puts each
    // child on its own indented line.
    let indent_children = indent.is_some()
        && children
            .iter()
            .all(|&c| !matches!(doc.get(c), Some(XmlNodeData::Text(_))));

    for child_id in &children {
        if indent_children {
            let pad = indent.unwrap_or_default().repeat(depth + 1);
            writer
                .write_event(Event::Text(BytesText::from_escaped(format!("\n{}", pad))))
                .map_err(|e| RedmarkError::XmlWrite(e.to_string()))?;
        }
        write_node(doc, *child_id, writer, &scoped_map, indent, depth + 1)?;
    }

    if indent_children {
        let pad = indent.unwrap_or_default().repeat(depth);
        writer
            .write_event(Event::Text(BytesText::from_escaped(format!("\n{}", pad))))
            .map_err(|e| RedmarkError::XmlWrite(e.to_string()))?;
    }

    writer
        .write_event(Event::End(BytesEnd::new(&tag_name)))
        .map_err(|e| RedmarkError::XmlWrite(e.to_string()))?;

    Ok(())
}

/// Drop whitespace-only text nodes and comments ahead of repacking.
///
/// Children of text-bearing `*:t` elements are left untouched so document
/// content strings survive verbatim.
pub fn condense(doc: &mut XmlDocument) {
    let Some(root) = doc.root() else { return };

    let mut to_remove = Vec::new();
    for node in doc.descendants(root) {
        let Some(data) = doc.get(node) else { continue };
        if !data.is_element() {
            continue;
        }
        if data.name().map(|n| n.local_name == "t").unwrap_or(false) {
            continue;
        }
        for child in doc.children(node) {
            match doc.get(child) {
                Some(XmlNodeData::Text(text)) if text.trim().is_empty() => {
                    to_remove.push(child);
                }
                Some(XmlNodeData::Comment(_)) => to_remove.push(child),
                _ => {}
            }
        }
    }

    for node in to_remove {
        doc.remove_subtree(node);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::xml::parser::parse;

    #[test]
    fn serialize_simple_document() {
        let mut doc = XmlDocument::new();
        let root = doc.add_root(XmlNodeData::element(XName::local("root")));
        doc.add_child(root, XmlNodeData::text("content"));

        let xml = String::from_utf8(serialize_bytes(&doc, XmlEncoding::Utf8).unwrap()).unwrap();
        assert!(xml.contains("<root>content</root>"));
        assert!(xml.starts_with("<?xml version=\"1.0\" encoding=\"UTF-8\""));
    }

    #[test]
    fn serialize_empty_element() {
        let mut doc = XmlDocument::new();
        doc.add_root(XmlNodeData::element(XName::local("empty")));

        let xml = String::from_utf8(serialize_bytes(&doc, XmlEncoding::Utf8).unwrap()).unwrap();
        assert!(xml.contains("<empty/>"));
    }

    #[test]
    fn ascii_output_escapes_non_ascii() {
        let mut doc = XmlDocument::new();
        let root = doc.add_root(XmlNodeData::element(XName::local("t")));
        doc.add_child(root, XmlNodeData::text("\u{201c}quoted\u{201d}"));

        let bytes = serialize_bytes(&doc, XmlEncoding::Ascii).unwrap();
        assert!(bytes.is_ascii());
        let xml = String::from_utf8(bytes).unwrap();
        assert!(xml.contains("&#8220;quoted&#8221;"));
        assert!(xml.contains("encoding=\"ascii\""));
    }

    #[test]
    fn roundtrip_preserves_prefixed_names() {
        let src = concat!(
            r#"<w:document xmlns:w="http://schemas.openxmlformats.org/wordprocessingml/2006/main">"#,
            r#"<w:body><w:p><w:r><w:t>Hi</w:t></w:r></w:p></w:body></w:document>"#
        );
        let doc = parse(src).unwrap();
        let xml = String::from_utf8(serialize_bytes(&doc, XmlEncoding::Utf8).unwrap()).unwrap();
        assert!(xml.contains("<w:t>Hi</w:t>"));
        assert!(xml.contains("xmlns:w="));
    }

    #[test]
    fn subtree_serialization_uses_conventional_prefixes() {
        let src = concat!(
            r#"<w:p xmlns:w="http://schemas.openxmlformats.org/wordprocessingml/2006/main">"#,
            r#"<w:r><w:t>x</w:t></w:r></w:p>"#
        );
        let doc = parse(src).unwrap();
        let root = doc.root().unwrap();
        let run = doc.children(root).next().unwrap();

        let fragment = serialize_subtree(&doc, run).unwrap();
        assert_eq!(fragment, "<w:r><w:t>x</w:t></w:r>");
    }

    #[test]
    fn pretty_print_indents_element_children() {
        let doc = parse("<root><a><b>text</b></a></root>").unwrap();
        let xml =
            String::from_utf8(serialize_pretty_bytes(&doc, XmlEncoding::Ascii).unwrap()).unwrap();
        assert!(xml.contains("\n  <a>"));
        assert!(xml.contains("\n    <b>text</b>"));
    }

    #[test]
    fn condense_strips_formatting_whitespace_but_not_text_content() {
        let mut doc = parse("<root>\n  <w:t xmlns:w=\"urn:w\"> keep </w:t>\n  <!-- note -->\n</root>")
            .unwrap();
        condense(&mut doc);
        let xml = String::from_utf8(serialize_bytes(&doc, XmlEncoding::Utf8).unwrap()).unwrap();
        assert!(xml.contains("> keep <"));
        assert!(!xml.contains("note"));
        assert!(!xml.contains("\n  "));
    }
}
