use super::fragment::Fragment;
use super::query::{element_text, NodeQuery, PrefixMap};
use crate::error::{RedmarkError, Result};
use crate::xml::builder;
use crate::xml::parser::{self, XmlEncoding};
use crate::xml::xname::XName;
use crate::xml::XmlDocument;
use indextree::NodeId;
use std::path::{Path, PathBuf};

/// An editable XML part bound to its file path.
///
/// Parses with per-element source positions so nodes can be located by the
/// line numbers of the on-disk file, tracks the declared encoding for
/// faithful re-serialization, and stays dirty until saved.
#[derive(Debug)]
pub struct XmlPart {
    path: PathBuf,
    doc: XmlDocument,
    encoding: XmlEncoding,
    dirty: bool,
}

impl XmlPart {
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        if !path.is_file() {
            return Err(RedmarkError::MissingPart(path.display().to_string()));
        }
        let (doc, encoding) = parser::parse_file(path)?;
        Ok(Self {
            path: path.to_path_buf(),
            doc,
            encoding,
            dirty: false,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn encoding(&self) -> XmlEncoding {
        self.encoding
    }

    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    pub fn doc(&self) -> &XmlDocument {
        &self.doc
    }

    /// Mutable tree access; the part is considered dirty afterwards.
    pub fn doc_mut(&mut self) -> &mut XmlDocument {
        self.dirty = true;
        &mut self.doc
    }

    pub fn root(&self) -> Result<NodeId> {
        self.doc.root().ok_or_else(|| RedmarkError::XmlParse {
            message: "document has no root element".to_string(),
            location: self.path.display().to_string(),
        })
    }

    /// Resolve a prefixed name (`w:del`) against the root's declarations.
    pub fn resolve_name(&self, prefixed: &str) -> XName {
        PrefixMap::from_root(&self.doc).element_name(prefixed)
    }

    /// Find the unique element matching the query.
    ///
    /// Exactly one match is a success; zero or several matches fail with
    /// the applied filters spelled out.
    pub fn find(&self, query: &NodeQuery) -> Result<NodeId> {
        let matches = self.find_all(query);

        match matches.len() {
            1 => Ok(matches[0]),
            0 => {
                let filters = query.describe();
                let base = if filters.is_empty() {
                    format!("Node not found: <{}>", query.tag)
                } else {
                    format!("Node not found: <{}> {}", query.tag, filters)
                };
                Err(RedmarkError::NodeNotFound(format!(
                    "{}. {}",
                    base,
                    query.hint()
                )))
            }
            _ => Err(RedmarkError::AmbiguousNode(format!(
                "Multiple nodes found: <{}>. Add attrs, line, or contains filters to narrow the match.",
                query.tag
            ))),
        }
    }

    pub fn find_all(&self, query: &NodeQuery) -> Vec<NodeId> {
        let Some(root) = self.doc.root() else {
            return Vec::new();
        };
        let prefixes = PrefixMap::from_root(&self.doc);
        self.doc
            .descendants(root)
            .filter(|&id| query.matches(&self.doc, id, &prefixes))
            .collect()
    }

    /// Concatenated non-whitespace text of an element's descendants.
    pub fn text_of(&self, node: NodeId) -> String {
        element_text(&self.doc, node)
    }

    /// Replace `target` with the nodes of a raw XML fragment.
    pub fn replace_node(&mut self, target: NodeId, xml_content: &str) -> Result<Vec<NodeId>> {
        let fragment = Fragment::parse(&self.doc, xml_content)?;
        self.dirty = true;
        let inserted = fragment.insert_before(&mut self.doc, target);
        self.doc.remove_subtree(target);
        Ok(inserted)
    }

    pub fn insert_before(&mut self, target: NodeId, xml_content: &str) -> Result<Vec<NodeId>> {
        let fragment = Fragment::parse(&self.doc, xml_content)?;
        self.dirty = true;
        Ok(fragment.insert_before(&mut self.doc, target))
    }

    pub fn insert_after(&mut self, target: NodeId, xml_content: &str) -> Result<Vec<NodeId>> {
        let fragment = Fragment::parse(&self.doc, xml_content)?;
        self.dirty = true;
        Ok(fragment.insert_after(&mut self.doc, target))
    }

    pub fn append_to(&mut self, target: NodeId, xml_content: &str) -> Result<Vec<NodeId>> {
        let fragment = Fragment::parse(&self.doc, xml_content)?;
        self.dirty = true;
        Ok(fragment.append_into(&mut self.doc, target))
    }

    /// Next free relationship id: one past the highest `rId<N>` suffix.
    pub fn next_relationship_id(&self) -> String {
        let mut max_id = 0u32;
        if let Some(root) = self.doc.root() {
            for node in self.doc.descendants(root) {
                let Some(data) = self.doc.get(node) else { continue };
                let is_relationship = data
                    .name()
                    .map(|n| n.local_name == "Relationship")
                    .unwrap_or(false);
                if !is_relationship {
                    continue;
                }
                if let Some(id) = data.attribute(&XName::local("Id")) {
                    if let Some(num) = id.strip_prefix("rId").and_then(|s| s.parse::<u32>().ok()) {
                        max_id = max_id.max(num);
                    }
                }
            }
        }
        format!("rId{}", max_id + 1)
    }

    /// Serialize back to the part's path in its original encoding.
    pub fn save(&mut self) -> Result<()> {
        let bytes = builder::serialize_bytes(&self.doc, self.encoding)?;
        std::fs::write(&self.path, bytes)?;
        self.dirty = false;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::xml::namespaces::W;

    fn write_part(dir: &Path, name: &str, content: &str) -> PathBuf {
        let path = dir.join(name);
        std::fs::write(&path, content).unwrap();
        path
    }

    const DOC: &str = concat!(
        r#"<?xml version="1.0" encoding="ascii"?>"#,
        "\n",
        r#"<w:document xmlns:w="http://schemas.openxmlformats.org/wordprocessingml/2006/main">"#,
        "\n",
        r#"  <w:body>"#,
        "\n",
        r#"    <w:p><w:r><w:t>alpha</w:t></w:r></w:p>"#,
        "\n",
        r#"    <w:p><w:r><w:t>beta</w:t></w:r></w:p>"#,
        "\n",
        r#"  </w:body>"#,
        "\n",
        r#"</w:document>"#
    );

    #[test]
    fn open_missing_part_fails() {
        let err = XmlPart::open("/nonexistent/part.xml").unwrap_err();
        assert!(matches!(err, RedmarkError::MissingPart(_)));
    }

    #[test]
    fn find_is_exactly_one() {
        let dir = tempfile::tempdir().unwrap();
        let part = XmlPart::open(write_part(dir.path(), "document.xml", DOC)).unwrap();

        part.find(&NodeQuery::tag("w:p").containing("alpha")).unwrap();

        let err = part.find(&NodeQuery::tag("w:p")).unwrap_err();
        assert!(err.to_string().contains("Multiple nodes found"));

        let err = part
            .find(&NodeQuery::tag("w:p").containing("gamma"))
            .unwrap_err();
        let msg = err.to_string();
        assert!(msg.contains("Node not found: <w:p> containing 'gamma'"), "{msg}");
        assert!(msg.contains("split across multiple elements"), "{msg}");
    }

    #[test]
    fn replace_node_swaps_subtree() {
        let dir = tempfile::tempdir().unwrap();
        let mut part = XmlPart::open(write_part(dir.path(), "document.xml", DOC)).unwrap();

        let target = part.find(&NodeQuery::tag("w:r").containing("beta")).unwrap();
        let inserted = part
            .replace_node(target, "<w:r><w:t>gamma</w:t></w:r>")
            .unwrap();

        assert_eq!(inserted.len(), 1);
        assert!(part.find(&NodeQuery::tag("w:r").containing("beta")).is_err());
        part.find(&NodeQuery::tag("w:r").containing("gamma")).unwrap();
        assert!(part.is_dirty());
    }

    #[test]
    fn save_preserves_ascii_encoding() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_part(dir.path(), "document.xml", DOC);
        let mut part = XmlPart::open(&path).unwrap();

        let para = part.find(&NodeQuery::tag("w:p").containing("beta")).unwrap();
        part.append_to(para, "<w:r><w:t>\u{201c}x\u{201d}</w:t></w:r>")
            .unwrap();
        part.save().unwrap();

        let bytes = std::fs::read(&path).unwrap();
        assert!(bytes.is_ascii());
        let text = String::from_utf8(bytes).unwrap();
        assert!(text.contains("encoding=\"ascii\""));
        assert!(text.contains("&#8220;x&#8221;"));
        assert!(!part.is_dirty());
    }

    #[test]
    fn next_relationship_id_scans_numeric_suffixes() {
        let dir = tempfile::tempdir().unwrap();
        let rels = concat!(
            r#"<Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships">"#,
            r#"<Relationship Id="rId3" Type="t" Target="a.xml"/>"#,
            r#"<Relationship Id="rId10" Type="t" Target="b.xml"/>"#,
            r#"</Relationships>"#
        );
        let part = XmlPart::open(write_part(dir.path(), "document.xml.rels", rels)).unwrap();
        assert_eq!(part.next_relationship_id(), "rId11");
    }

    #[test]
    fn resolve_name_uses_root_declarations() {
        let dir = tempfile::tempdir().unwrap();
        let part = XmlPart::open(write_part(dir.path(), "document.xml", DOC)).unwrap();
        assert_eq!(part.resolve_name("w:p"), W::p());
    }
}
