use super::xname::{XAttribute, XName};

/// Line/column of an element's start tag in the originally parsed source.
///
/// Recorded at parse time only; mutation does not maintain positions.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SourcePos {
    pub line: u32,
    pub column: u32,
}

#[derive(Clone, Debug)]
pub enum XmlNodeData {
    Element {
        name: XName,
        attributes: Vec<XAttribute>,
        pos: Option<SourcePos>,
    },
    Text(String),
    Comment(String),
    ProcessingInstruction { target: String, data: String },
}

impl XmlNodeData {
    pub fn element(name: XName) -> Self {
        Self::Element {
            name,
            attributes: Vec::new(),
            pos: None,
        }
    }

    pub fn element_with_attrs(name: XName, attributes: Vec<XAttribute>) -> Self {
        Self::Element {
            name,
            attributes,
            pos: None,
        }
    }

    pub fn text(content: &str) -> Self {
        Self::Text(content.to_string())
    }

    pub fn is_element(&self) -> bool {
        matches!(self, Self::Element { .. })
    }

    pub fn is_text(&self) -> bool {
        matches!(self, Self::Text(_))
    }

    pub fn name(&self) -> Option<&XName> {
        match self {
            Self::Element { name, .. } => Some(name),
            _ => None,
        }
    }

    pub fn pos(&self) -> Option<SourcePos> {
        match self {
            Self::Element { pos, .. } => *pos,
            _ => None,
        }
    }

    pub fn attributes(&self) -> Option<&[XAttribute]> {
        match self {
            Self::Element { attributes, .. } => Some(attributes),
            _ => None,
        }
    }

    pub fn attributes_mut(&mut self) -> Option<&mut Vec<XAttribute>> {
        match self {
            Self::Element { attributes, .. } => Some(attributes),
            _ => None,
        }
    }

    pub fn attribute(&self, name: &XName) -> Option<&str> {
        self.attributes()?
            .iter()
            .find(|a| &a.name == name)
            .map(|a| a.value.as_str())
    }

    pub fn has_attribute(&self, name: &XName) -> bool {
        self.attribute(name).is_some()
    }

    pub fn text_content(&self) -> Option<&str> {
        match self {
            Self::Text(s) => Some(s),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn element_node_creation() {
        let name = XName::new("http://example.com", "test");
        let node = XmlNodeData::element(name.clone());
        assert!(node.is_element());
        assert_eq!(node.name(), Some(&name));
        assert_eq!(node.pos(), None);
    }

    #[test]
    fn text_node_creation() {
        let node = XmlNodeData::text("Hello, World!");
        assert!(node.is_text());
        assert_eq!(node.text_content(), Some("Hello, World!"));
    }

    #[test]
    fn attribute_lookup() {
        let attr_name = XName::local("id");
        let node = XmlNodeData::element_with_attrs(
            XName::local("root"),
            vec![XAttribute::new(attr_name.clone(), "42")],
        );
        assert_eq!(node.attribute(&attr_name), Some("42"));
        assert!(!node.has_attribute(&XName::local("missing")));
    }
}
