use crate::xml::namespaces::XML;
use crate::xml::xname::{XName, XMLNS_NS};
use crate::xml::{XmlDocument, XmlNodeData};
use indextree::NodeId;
use std::borrow::Cow;
use std::collections::HashMap;
use std::fmt::Write as _;
use std::ops::RangeInclusive;

/// Line-number filter: a single 1-based line or an inclusive range.
#[derive(Clone, Debug)]
pub enum LineFilter {
    At(u32),
    Within(RangeInclusive<u32>),
}

/// A node lookup that must match exactly one element.
///
/// Filters combine conjunctively: tag name, attribute values, the source
/// line recorded at parse time, and a substring of the element's text.
///
/// ```no_run
/// # use redmark_core::editor::NodeQuery;
/// let q = NodeQuery::tag("w:r").attr("w:id", "1");
/// let q = NodeQuery::tag("w:p").within_lines(100..=200).containing("text");
/// ```
#[derive(Clone, Debug)]
pub struct NodeQuery {
    pub(crate) tag: String,
    pub(crate) attrs: Vec<(String, String)>,
    pub(crate) line: Option<LineFilter>,
    pub(crate) contains: Option<String>,
}

impl NodeQuery {
    pub fn tag(tag: &str) -> Self {
        Self {
            tag: tag.to_string(),
            attrs: Vec::new(),
            line: None,
            contains: None,
        }
    }

    pub fn attr(mut self, name: &str, value: &str) -> Self {
        self.attrs.push((name.to_string(), value.to_string()));
        self
    }

    pub fn at_line(mut self, line: u32) -> Self {
        self.line = Some(LineFilter::At(line));
        self
    }

    pub fn within_lines(mut self, lines: RangeInclusive<u32>) -> Self {
        self.line = Some(LineFilter::Within(lines));
        self
    }

    /// Substring match over the element's non-whitespace text content.
    /// The needle may use entity escapes (`&#8220;`) or literal Unicode.
    pub fn containing(mut self, text: &str) -> Self {
        self.contains = Some(text.to_string());
        self
    }

    pub(crate) fn matches(&self, doc: &XmlDocument, node: NodeId, prefixes: &PrefixMap) -> bool {
        let Some(data) = doc.get(node) else {
            return false;
        };
        if data.name() != Some(&prefixes.element_name(&self.tag)) {
            return false;
        }

        if let Some(filter) = &self.line {
            let Some(pos) = data.pos() else { return false };
            match filter {
                LineFilter::At(line) => {
                    if pos.line != *line {
                        return false;
                    }
                }
                LineFilter::Within(range) => {
                    if !range.contains(&pos.line) {
                        return false;
                    }
                }
            }
        }

        for (name, value) in &self.attrs {
            if data.attribute(&prefixes.attribute_name(name)) != Some(value.as_str()) {
                return false;
            }
        }

        if let Some(needle) = &self.contains {
            let haystack = element_text(doc, node);
            if !haystack.contains(unescape_entities(needle).as_ref()) {
                return false;
            }
        }

        true
    }

    /// Render the applied filters for error messages.
    pub(crate) fn describe(&self) -> String {
        let mut parts = Vec::new();
        match &self.line {
            Some(LineFilter::At(line)) => parts.push(format!("at line {}", line)),
            Some(LineFilter::Within(range)) => {
                parts.push(format!("at lines {}-{}", range.start(), range.end()))
            }
            None => {}
        }
        if !self.attrs.is_empty() {
            let mut attrs = String::from("with attributes {");
            for (i, (name, value)) in self.attrs.iter().enumerate() {
                if i > 0 {
                    attrs.push_str(", ");
                }
                let _ = write!(attrs, "{}=\"{}\"", name, value);
            }
            attrs.push('}');
            parts.push(attrs);
        }
        if let Some(needle) = &self.contains {
            parts.push(format!("containing '{}'", needle));
        }
        parts.join(" ")
    }

    /// A hint for the zero-match error, keyed to the narrowest filter used.
    pub(crate) fn hint(&self) -> &'static str {
        if self.contains.is_some() {
            "The text may be split across multiple elements or use different wording."
        } else if self.line.is_some() {
            "Line numbers may have shifted if the document was modified."
        } else if !self.attrs.is_empty() {
            "Check that the attribute values are correct."
        } else {
            "Try adding attrs, line, or contains filters."
        }
    }
}

/// Prefix → namespace bindings taken from a document's root element.
///
/// Queries use prefixed names (`w:del`) the way they appear in the file;
/// resolution against the root declarations turns them into the
/// namespace-qualified names the tree stores.
pub struct PrefixMap {
    bindings: HashMap<String, String>,
    default_ns: Option<String>,
}

impl PrefixMap {
    pub fn from_root(doc: &XmlDocument) -> Self {
        let mut bindings = HashMap::new();
        let mut default_ns = None;

        if let Some(attrs) = doc
            .root()
            .and_then(|root| doc.get(root))
            .and_then(|data| data.attributes())
        {
            for attr in attrs {
                if attr.name.namespace.as_deref() == Some(XMLNS_NS) {
                    bindings.insert(attr.name.local_name.clone(), attr.value.clone());
                } else if attr.name.namespace.is_none() && attr.name.local_name == "xmlns" {
                    default_ns = Some(attr.value.clone());
                }
            }
        }

        Self {
            bindings,
            default_ns,
        }
    }

    /// Unprefixed element names resolve to the root's default namespace.
    pub fn element_name(&self, prefixed: &str) -> XName {
        match prefixed.split_once(':') {
            Some((prefix, local)) => XName::new(self.namespace_for(prefix), local),
            None => match &self.default_ns {
                Some(ns) => XName::new(ns, prefixed),
                None => XName::local(prefixed),
            },
        }
    }

    /// Unprefixed attribute names never inherit the default namespace.
    pub fn attribute_name(&self, prefixed: &str) -> XName {
        match prefixed.split_once(':') {
            Some((prefix, local)) => XName::new(self.namespace_for(prefix), local),
            None => XName::local(prefixed),
        }
    }

    fn namespace_for(&self, prefix: &str) -> &str {
        match prefix {
            "xml" => XML::NS,
            "xmlns" => XMLNS_NS,
            _ => self
                .bindings
                .get(prefix)
                .map(|s| s.as_str())
                .unwrap_or(""),
        }
    }
}

/// Concatenated text of an element's descendants, skipping whitespace-only
/// text nodes (those represent XML formatting, not document content).
pub fn element_text(doc: &XmlDocument, node: NodeId) -> String {
    let mut out = String::new();
    for id in doc.descendants(node) {
        if let Some(XmlNodeData::Text(text)) = doc.get(id) {
            if !text.trim().is_empty() {
                out.push_str(text);
            }
        }
    }
    out
}

/// Normalize an entity-escaped needle (`&#8220;`, `&amp;`) to literal text
/// so both spellings match the parsed document.
pub fn unescape_entities(s: &str) -> Cow<'_, str> {
    match quick_xml::escape::unescape(s) {
        Ok(unescaped) => unescaped,
        Err(_) => Cow::Borrowed(s),
    }
}
