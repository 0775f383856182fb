use super::node::XmlNodeData;
use super::xname::{XAttribute, XName};
use indextree::{Arena, NodeId};

/// An XML tree stored in an index arena.
///
/// Nodes are addressed by stable `NodeId`s; structural edits (wrap,
/// unwrap, move) are expressed as detach/insert operations on child
/// lists rather than parent-pointer surgery.
#[derive(Debug)]
pub struct XmlDocument {
    arena: Arena<XmlNodeData>,
    root: Option<NodeId>,
}

impl XmlDocument {
    pub fn new() -> Self {
        Self {
            arena: Arena::new(),
            root: None,
        }
    }

    pub fn root(&self) -> Option<NodeId> {
        self.root
    }

    pub fn get(&self, id: NodeId) -> Option<&XmlNodeData> {
        self.arena.get(id).map(|node| node.get())
    }

    pub fn get_mut(&mut self, id: NodeId) -> Option<&mut XmlNodeData> {
        self.arena.get_mut(id).map(|node| node.get_mut())
    }

    pub fn add_root(&mut self, data: XmlNodeData) -> NodeId {
        let id = self.arena.new_node(data);
        self.root = Some(id);
        id
    }

    /// Create a node that is not yet attached anywhere in the tree.
    pub fn create_detached(&mut self, data: XmlNodeData) -> NodeId {
        self.arena.new_node(data)
    }

    pub fn add_child(&mut self, parent: NodeId, data: XmlNodeData) -> NodeId {
        let child = self.arena.new_node(data);
        parent.append(child, &mut self.arena);
        child
    }

    pub fn add_first_child(&mut self, parent: NodeId, data: XmlNodeData) -> NodeId {
        let child = self.arena.new_node(data);
        parent.prepend(child, &mut self.arena);
        child
    }

    pub fn add_before(&mut self, sibling: NodeId, data: XmlNodeData) -> NodeId {
        let new_node = self.arena.new_node(data);
        sibling.insert_before(new_node, &mut self.arena);
        new_node
    }

    pub fn add_after(&mut self, sibling: NodeId, data: XmlNodeData) -> NodeId {
        let new_node = self.arena.new_node(data);
        sibling.insert_after(new_node, &mut self.arena);
        new_node
    }

    /// Remove a node together with its whole subtree.
    pub fn remove_subtree(&mut self, node: NodeId) {
        node.remove_subtree(&mut self.arena);
    }

    /// Remove a node, promoting its children into its place.
    pub fn unwrap_node(&mut self, node: NodeId) {
        node.remove(&mut self.arena);
    }

    /// Detach a subtree from its parent without deleting it.
    pub fn detach(&mut self, node: NodeId) {
        node.detach(&mut self.arena);
    }

    /// Reattach a (detached or existing) subtree as the last child of `parent`.
    pub fn append_node(&mut self, parent: NodeId, node: NodeId) {
        node.detach(&mut self.arena);
        parent.append(node, &mut self.arena);
    }

    pub fn insert_node_before(&mut self, sibling: NodeId, node: NodeId) {
        node.detach(&mut self.arena);
        sibling.insert_before(node, &mut self.arena);
    }

    pub fn insert_node_after(&mut self, sibling: NodeId, node: NodeId) {
        node.detach(&mut self.arena);
        sibling.insert_after(node, &mut self.arena);
    }

    pub fn rename(&mut self, node: NodeId, new_name: XName) {
        if let Some(XmlNodeData::Element { name, .. }) = self.get_mut(node) {
            *name = new_name;
        }
    }

    pub fn attribute(&self, node: NodeId, name: &XName) -> Option<&str> {
        self.get(node)?.attribute(name)
    }

    pub fn has_attribute(&self, node: NodeId, name: &XName) -> bool {
        self.attribute(node, name).is_some()
    }

    pub fn set_attribute(&mut self, node: NodeId, name: &XName, value: &str) {
        if let Some(node_data) = self.get_mut(node) {
            if let Some(attrs) = node_data.attributes_mut() {
                if let Some(attr) = attrs.iter_mut().find(|a| &a.name == name) {
                    attr.value = value.to_string();
                } else {
                    attrs.push(XAttribute::new(name.clone(), value));
                }
            }
        }
    }

    pub fn remove_attribute(&mut self, node: NodeId, name: &XName) {
        if let Some(node_data) = self.get_mut(node) {
            if let Some(attrs) = node_data.attributes_mut() {
                attrs.retain(|a| &a.name != name);
            }
        }
    }

    pub fn children(&self, parent: NodeId) -> impl Iterator<Item = NodeId> + '_ {
        parent.children(&self.arena)
    }

    /// All nodes of the subtree rooted at `node`, including `node` itself.
    pub fn descendants(&self, node: NodeId) -> impl Iterator<Item = NodeId> + '_ {
        node.descendants(&self.arena)
    }

    pub fn parent(&self, node: NodeId) -> Option<NodeId> {
        self.arena.get(node)?.parent()
    }

    pub fn next_sibling(&self, node: NodeId) -> Option<NodeId> {
        self.arena.get(node)?.next_sibling()
    }

    /// Ancestors of `node`, starting with `node` itself.
    pub fn ancestors(&self, node: NodeId) -> impl Iterator<Item = NodeId> + '_ {
        node.ancestors(&self.arena)
    }

    pub fn name(&self, node: NodeId) -> Option<&XName> {
        self.get(node)?.name()
    }

    pub fn is_named(&self, node: NodeId, ns: &str, local: &str) -> bool {
        self.name(node).map(|n| n.is(ns, local)).unwrap_or(false)
    }

    /// Element descendants with the given name, excluding `start` itself.
    pub fn descendants_named(&self, start: NodeId, name: &XName) -> Vec<NodeId> {
        self.descendants(start)
            .skip(1)
            .filter(|&id| self.name(id) == Some(name))
            .collect()
    }

    /// First direct child element with the given name.
    pub fn child_named(&self, parent: NodeId, name: &XName) -> Option<NodeId> {
        self.children(parent)
            .find(|&id| self.name(id) == Some(name))
    }

    /// True if any strict ancestor of `node` has the given name.
    pub fn has_ancestor_named(&self, node: NodeId, name: &XName) -> bool {
        self.ancestors(node)
            .skip(1)
            .any(|id| self.name(id) == Some(name))
    }

    /// Deep-copy the subtree rooted at `node`; the copy is left detached.
    pub fn clone_subtree(&mut self, node: NodeId) -> Option<NodeId> {
        let data = self.get(node)?.clone();
        let copy = self.arena.new_node(data);
        let children: Vec<NodeId> = self.children(node).collect();
        for child in children {
            if let Some(child_copy) = self.clone_subtree(child) {
                copy.append(child_copy, &mut self.arena);
            }
        }
        Some(copy)
    }

    /// Deep-copy a subtree from another document under `parent`.
    pub fn import_subtree(
        &mut self,
        src: &XmlDocument,
        src_node: NodeId,
        parent: NodeId,
    ) -> Option<NodeId> {
        let copy = self.import_detached(src, src_node)?;
        parent.append(copy, &mut self.arena);
        Some(copy)
    }

    /// Deep-copy a subtree from another document, leaving the copy detached.
    pub fn import_detached(&mut self, src: &XmlDocument, src_node: NodeId) -> Option<NodeId> {
        let data = src.get(src_node)?.clone();
        let copy = self.arena.new_node(data);
        for child in src.children(src_node) {
            if let Some(child_copy) = self.import_detached(src, child) {
                copy.append(child_copy, &mut self.arena);
            }
        }
        Some(copy)
    }
}

impl Default for XmlDocument {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn doc_with_children() -> (XmlDocument, NodeId, NodeId, NodeId) {
        let mut doc = XmlDocument::new();
        let root = doc.add_root(XmlNodeData::element(XName::local("root")));
        let a = doc.add_child(root, XmlNodeData::element(XName::local("a")));
        let b = doc.add_child(root, XmlNodeData::element(XName::local("b")));
        (doc, root, a, b)
    }

    #[test]
    fn create_document_with_root() {
        let mut doc = XmlDocument::new();
        let root_name = XName::new("http://example.com", "root");
        let root_id = doc.add_root(XmlNodeData::element(root_name.clone()));

        assert_eq!(doc.root(), Some(root_id));
        assert_eq!(doc.get(root_id).unwrap().name(), Some(&root_name));
    }

    #[test]
    fn reparent_moves_subtree() {
        let (mut doc, root, a, b) = doc_with_children();
        doc.append_node(a, b);

        let root_children: Vec<_> = doc.children(root).collect();
        assert_eq!(root_children, vec![a]);
        let a_children: Vec<_> = doc.children(a).collect();
        assert_eq!(a_children, vec![b]);
    }

    #[test]
    fn unwrap_promotes_children() {
        let (mut doc, root, a, _b) = doc_with_children();
        let inner = doc.add_child(a, XmlNodeData::element(XName::local("inner")));
        doc.unwrap_node(a);

        let root_children: Vec<_> = doc.children(root).collect();
        assert_eq!(root_children[0], inner);
    }

    #[test]
    fn rename_changes_element_name() {
        let (mut doc, _root, a, _b) = doc_with_children();
        doc.rename(a, XName::local("renamed"));
        assert_eq!(doc.name(a).unwrap().local_name, "renamed");
    }

    #[test]
    fn clone_subtree_is_deep_and_detached() {
        let (mut doc, root, a, _b) = doc_with_children();
        doc.add_child(a, XmlNodeData::text("payload"));

        let copy = doc.clone_subtree(a).unwrap();
        assert_eq!(doc.parent(copy), None);
        doc.append_node(root, copy);

        let copied_text = doc.children(copy).next().unwrap();
        assert_eq!(doc.get(copied_text).unwrap().text_content(), Some("payload"));
    }

    #[test]
    fn set_and_get_attribute() {
        let (mut doc, root, _a, _b) = doc_with_children();
        let attr_name = XName::local("id");
        doc.set_attribute(root, &attr_name, "test123");
        assert_eq!(doc.attribute(root, &attr_name), Some("test123"));

        doc.remove_attribute(root, &attr_name);
        assert!(!doc.has_attribute(root, &attr_name));
    }
}
