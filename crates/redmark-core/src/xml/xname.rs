use std::fmt;

/// Namespace URI under which `xmlns:prefix` declaration attributes live.
pub const XMLNS_NS: &str = "http://www.w3.org/2000/xmlns/";

#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct XName {
    pub namespace: Option<String>,
    pub local_name: String,
}

impl XName {
    pub fn new(namespace: &str, local_name: &str) -> Self {
        Self {
            namespace: if namespace.is_empty() {
                None
            } else {
                Some(namespace.to_string())
            },
            local_name: local_name.to_string(),
        }
    }

    pub fn local(local_name: &str) -> Self {
        Self {
            namespace: None,
            local_name: local_name.to_string(),
        }
    }

    pub fn is(&self, namespace: &str, local_name: &str) -> bool {
        self.local_name == local_name && self.namespace.as_deref() == Some(namespace)
    }
}

impl fmt::Display for XName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.namespace {
            Some(ns) => write!(f, "{{{}}}{}", ns, self.local_name),
            None => write!(f, "{}", self.local_name),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct XAttribute {
    pub name: XName,
    pub value: String,
}

impl XAttribute {
    pub fn new(name: XName, value: &str) -> Self {
        Self {
            name,
            value: value.to_string(),
        }
    }

    /// True for both `xmlns="uri"` and `xmlns:prefix="uri"` declarations.
    pub fn is_namespace_decl(&self) -> bool {
        (self.name.namespace.is_none() && self.name.local_name == "xmlns")
            || self.name.namespace.as_deref() == Some(XMLNS_NS)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn xname_with_namespace_displays_correctly() {
        let name = XName::new("http://example.com", "element");
        assert_eq!(name.to_string(), "{http://example.com}element");
    }

    #[test]
    fn xname_without_namespace_displays_correctly() {
        let name = XName::local("element");
        assert_eq!(name.to_string(), "element");
    }

    #[test]
    fn namespace_decl_detection() {
        let default_decl = XAttribute::new(XName::local("xmlns"), "http://example.com");
        let prefixed_decl = XAttribute::new(XName::new(XMLNS_NS, "w"), "http://example.com");
        let plain = XAttribute::new(XName::local("id"), "1");

        assert!(default_decl.is_namespace_decl());
        assert!(prefixed_decl.is_namespace_decl());
        assert!(!plain.is_namespace_decl());
    }
}
