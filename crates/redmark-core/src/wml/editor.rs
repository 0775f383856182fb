use super::inject::{inject_tracked_attributes, RevisionContext};
use crate::editor::{NodeQuery, XmlPart};
use crate::error::Result;
use crate::xml::xname::XName;
use crate::xml::XmlDocument;
use indextree::NodeId;
use std::path::Path;

/// An `XmlPart` that keeps mutated Word markup legal.
///
/// Every fragment mutation is followed by one walk over the inserted
/// nodes that fills in the OOXML bookkeeping attributes (RSIDs,
/// paragraph ids, change ids, authorship, whitespace preservation).
pub struct DocxPart {
    part: XmlPart,
    ctx: RevisionContext,
}

impl DocxPart {
    pub fn open(path: impl AsRef<Path>, ctx: RevisionContext) -> Result<Self> {
        Ok(Self {
            part: XmlPart::open(path)?,
            ctx,
        })
    }

    pub fn context(&self) -> &RevisionContext {
        &self.ctx
    }

    pub fn path(&self) -> &Path {
        self.part.path()
    }

    pub fn is_dirty(&self) -> bool {
        self.part.is_dirty()
    }

    pub fn doc(&self) -> &XmlDocument {
        self.part.doc()
    }

    pub fn doc_mut(&mut self) -> &mut XmlDocument {
        self.part.doc_mut()
    }

    pub fn root(&self) -> Result<NodeId> {
        self.part.root()
    }

    pub fn resolve_name(&self, prefixed: &str) -> XName {
        self.part.resolve_name(prefixed)
    }

    pub fn find(&self, query: &NodeQuery) -> Result<NodeId> {
        self.part.find(query)
    }

    pub fn find_all(&self, query: &NodeQuery) -> Vec<NodeId> {
        self.part.find_all(query)
    }

    pub fn text_of(&self, node: NodeId) -> String {
        self.part.text_of(node)
    }

    pub fn next_relationship_id(&self) -> String {
        self.part.next_relationship_id()
    }

    pub fn save(&mut self) -> Result<()> {
        self.part.save()
    }

    /// Run the attribute walk over nodes mutated outside the fragment API.
    pub fn inject(&mut self, nodes: &[NodeId]) {
        let ctx = self.ctx.clone();
        inject_tracked_attributes(self.part.doc_mut(), nodes, &ctx);
    }

    pub fn replace_node(&mut self, target: NodeId, xml_content: &str) -> Result<Vec<NodeId>> {
        let nodes = self.part.replace_node(target, xml_content)?;
        self.inject(&nodes);
        Ok(nodes)
    }

    pub fn insert_before(&mut self, target: NodeId, xml_content: &str) -> Result<Vec<NodeId>> {
        let nodes = self.part.insert_before(target, xml_content)?;
        self.inject(&nodes);
        Ok(nodes)
    }

    pub fn insert_after(&mut self, target: NodeId, xml_content: &str) -> Result<Vec<NodeId>> {
        let nodes = self.part.insert_after(target, xml_content)?;
        self.inject(&nodes);
        Ok(nodes)
    }

    pub fn append_to(&mut self, target: NodeId, xml_content: &str) -> Result<Vec<NodeId>> {
        let nodes = self.part.append_to(target, xml_content)?;
        self.inject(&nodes);
        Ok(nodes)
    }
}
