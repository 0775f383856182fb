use crate::error::{RedmarkError, Result};
use crate::xml::parser;
use crate::xml::xname::XAttribute;
use crate::xml::XmlDocument;
use indextree::NodeId;
use std::fmt::Write as _;

/// A raw XML fragment parsed in the namespace context of a host document.
///
/// The fragment is wrapped in a synthetic root carrying every namespace
/// declaration found on the host root, so prefixed names resolve the same
/// way they would inside the host tree.
#[derive(Debug)]
pub struct Fragment {
    doc: XmlDocument,
    children: Vec<NodeId>,
}

impl Fragment {
    pub fn parse(host: &XmlDocument, xml_content: &str) -> Result<Self> {
        let mut wrapper = String::from("<fragment-root");
        for attr in host_namespace_decls(host) {
            let name = match &attr.name.namespace {
                Some(_) => format!("xmlns:{}", attr.name.local_name),
                None => attr.name.local_name.clone(),
            };
            let _ = write!(wrapper, " {}=\"{}\"", name, attr.value);
        }
        wrapper.push('>');
        wrapper.push_str(xml_content);
        wrapper.push_str("</fragment-root>");

        let doc = parser::parse(&wrapper)?;
        let root = doc.root().ok_or(RedmarkError::EmptyFragment)?;
        let children: Vec<NodeId> = doc.children(root).collect();

        if !children
            .iter()
            .any(|&id| doc.get(id).map(|d| d.is_element()).unwrap_or(false))
        {
            return Err(RedmarkError::EmptyFragment);
        }

        Ok(Self { doc, children })
    }

    /// Transplant the fragment's nodes as the last children of `parent`.
    pub fn append_into(&self, host: &mut XmlDocument, parent: NodeId) -> Vec<NodeId> {
        self.children
            .iter()
            .filter_map(|&child| host.import_subtree(&self.doc, child, parent))
            .collect()
    }

    /// Transplant the fragment's nodes immediately before `sibling`.
    pub fn insert_before(&self, host: &mut XmlDocument, sibling: NodeId) -> Vec<NodeId> {
        let mut inserted = Vec::new();
        for &child in &self.children {
            if let Some(copy) = host.import_detached(&self.doc, child) {
                host.insert_node_before(sibling, copy);
                inserted.push(copy);
            }
        }
        inserted
    }

    /// Transplant the fragment's nodes immediately after `sibling`.
    pub fn insert_after(&self, host: &mut XmlDocument, sibling: NodeId) -> Vec<NodeId> {
        let mut inserted = Vec::new();
        let mut anchor = sibling;
        for &child in &self.children {
            if let Some(copy) = host.import_detached(&self.doc, child) {
                host.insert_node_after(anchor, copy);
                anchor = copy;
                inserted.push(copy);
            }
        }
        inserted
    }
}

fn host_namespace_decls(host: &XmlDocument) -> Vec<XAttribute> {
    host.root()
        .and_then(|root| host.get(root))
        .and_then(|data| data.attributes())
        .map(|attrs| {
            attrs
                .iter()
                .filter(|a| a.is_namespace_decl())
                .cloned()
                .collect()
        })
        .unwrap_or_default()
}
