use crate::xml::namespaces::{W, W14, W16CEX, W16DU, XML};
use crate::xml::xname::{XName, XMLNS_NS};
use crate::xml::XmlDocument;
use indextree::NodeId;

/// Identity of one editing session: the RSID stamped on new content and
/// the author recorded on tracked changes and comments.
#[derive(Clone, Debug)]
pub struct RevisionContext {
    pub rsid: String,
    pub author: String,
    pub initials: String,
}

impl RevisionContext {
    pub fn new(rsid: &str, author: &str, initials: &str) -> Self {
        Self {
            rsid: rsid.to_string(),
            author: author.to_string(),
            initials: initials.to_string(),
        }
    }

    pub fn with_generated_rsid(author: &str, initials: &str) -> Self {
        Self::new(&generate_rsid(), author, initials)
    }
}

impl Default for RevisionContext {
    fn default() -> Self {
        Self::with_generated_rsid("Redmark", "R")
    }
}

/// Random 8-digit hex RSID.
pub fn generate_rsid() -> String {
    format!("{:08X}", random_u32())
}

/// Random 8-digit hex id for `w14:paraId`/`w16cid:durableId`.
///
/// The OOXML bookkeeping parts constrain paraId below 0x80000000 and
/// durableId below 0x7FFFFFFF; the stricter bound is applied to both.
pub fn generate_hex_id() -> String {
    format!("{:08X}", (random_u32() % 0x7FFF_FFFE) + 1)
}

fn random_u32() -> u32 {
    let bytes = *uuid::Uuid::new_v4().as_bytes();
    u32::from_be_bytes([bytes[0], bytes[1], bytes[2], bytes[3]])
}

/// Current UTC time in the OOXML revision timestamp format.
pub fn utc_timestamp() -> String {
    chrono::Utc::now().format("%Y-%m-%dT%H:%M:%SZ").to_string()
}

/// Fill in the bookkeeping attributes OOXML expects on freshly inserted
/// Word content: RSIDs and paragraph ids on `w:p`/`w:r`, whitespace
/// preservation on `w:t`, change id/author/date on `w:ins`/`w:del`, and
/// authorship on comments. Attributes already present are never touched.
pub fn inject_tracked_attributes(doc: &mut XmlDocument, nodes: &[NodeId], ctx: &RevisionContext) {
    let timestamp = utc_timestamp();
    let mut next_change_id = next_change_id(doc);

    for &node in nodes {
        let targets: Vec<NodeId> = doc
            .descendants(node)
            .filter(|&id| doc.get(id).map(|d| d.is_element()).unwrap_or(false))
            .collect();

        for elem in targets {
            let Some(name) = doc.name(elem).cloned() else { continue };
            match (name.namespace.as_deref(), name.local_name.as_str()) {
                (Some(W::NS), "p") => fill_paragraph(doc, elem, ctx),
                (Some(W::NS), "r") => fill_run(doc, elem, ctx),
                (Some(W::NS), "t") => fill_text(doc, elem),
                (Some(W::NS), "ins") | (Some(W::NS), "del") => {
                    fill_tracked_change(doc, elem, ctx, &timestamp, &mut next_change_id)
                }
                (Some(W::NS), "comment") => fill_comment(doc, elem, ctx, &timestamp),
                (Some(W16CEX::NS), "commentExtensible") => {
                    if !doc.has_attribute(elem, &W16CEX::dateUtc()) {
                        ensure_namespace(doc, "w16cex", W16CEX::NS);
                        doc.set_attribute(elem, &W16CEX::dateUtc(), &timestamp);
                    }
                }
                _ => {}
            }
        }
    }
}

/// One past the highest `w:id` carried by any tracked change in the part.
pub fn next_change_id(doc: &XmlDocument) -> i64 {
    let mut max_id = -1i64;
    let Some(root) = doc.root() else { return 0 };
    for node in doc.descendants(root) {
        let Some(data) = doc.get(node) else { continue };
        let is_change = data
            .name()
            .map(|n| n.is(W::NS, "ins") || n.is(W::NS, "del"))
            .unwrap_or(false);
        if !is_change {
            continue;
        }
        if let Some(id) = data.attribute(&W::id()).and_then(|v| v.parse::<i64>().ok()) {
            max_id = max_id.max(id);
        }
    }
    max_id + 1
}

/// Declare a namespace prefix on the root element if absent.
pub fn ensure_namespace(doc: &mut XmlDocument, prefix: &str, uri: &str) {
    let Some(root) = doc.root() else { return };
    let decl = XName::new(XMLNS_NS, prefix);
    if !doc.has_attribute(root, &decl) {
        doc.set_attribute(root, &decl, uri);
    }
}

fn fill_paragraph(doc: &mut XmlDocument, elem: NodeId, ctx: &RevisionContext) {
    for attr in [W::rsidR(), W::rsidRDefault(), W::rsidP()] {
        if !doc.has_attribute(elem, &attr) {
            doc.set_attribute(elem, &attr, &ctx.rsid);
        }
    }
    if !doc.has_attribute(elem, &W14::paraId()) {
        ensure_namespace(doc, "w14", W14::NS);
        doc.set_attribute(elem, &W14::paraId(), &generate_hex_id());
    }
    if !doc.has_attribute(elem, &W14::textId()) {
        ensure_namespace(doc, "w14", W14::NS);
        doc.set_attribute(elem, &W14::textId(), &generate_hex_id());
    }
}

fn fill_run(doc: &mut XmlDocument, elem: NodeId, ctx: &RevisionContext) {
    // Runs inside a deletion region carry w:rsidDel instead of w:rsidR.
    if doc.has_ancestor_named(elem, &W::del()) {
        if !doc.has_attribute(elem, &W::rsidDel()) {
            doc.set_attribute(elem, &W::rsidDel(), &ctx.rsid);
        }
    } else if !doc.has_attribute(elem, &W::rsidR()) {
        doc.set_attribute(elem, &W::rsidR(), &ctx.rsid);
    }
}

fn fill_text(doc: &mut XmlDocument, elem: NodeId) {
    let needs_preserve = doc
        .children(elem)
        .next()
        .and_then(|child| doc.get(child))
        .and_then(|data| data.text_content())
        .map(|text| {
            !text.is_empty()
                && (text.chars().next().is_some_and(|c| c.is_whitespace())
                    || text.chars().last().is_some_and(|c| c.is_whitespace()))
        })
        .unwrap_or(false);

    if needs_preserve && !doc.has_attribute(elem, &XML::space()) {
        doc.set_attribute(elem, &XML::space(), "preserve");
    }
}

fn fill_tracked_change(
    doc: &mut XmlDocument,
    elem: NodeId,
    ctx: &RevisionContext,
    timestamp: &str,
    next_change_id: &mut i64,
) {
    if !doc.has_attribute(elem, &W::id()) {
        doc.set_attribute(elem, &W::id(), &next_change_id.to_string());
        *next_change_id += 1;
    }
    if !doc.has_attribute(elem, &W::author()) {
        doc.set_attribute(elem, &W::author(), &ctx.author);
    }
    if !doc.has_attribute(elem, &W::date()) {
        doc.set_attribute(elem, &W::date(), timestamp);
    }
    if !doc.has_attribute(elem, &W16DU::dateUtc()) {
        ensure_namespace(doc, "w16du", W16DU::NS);
        doc.set_attribute(elem, &W16DU::dateUtc(), timestamp);
    }
}

fn fill_comment(doc: &mut XmlDocument, elem: NodeId, ctx: &RevisionContext, timestamp: &str) {
    if !doc.has_attribute(elem, &W::author()) {
        doc.set_attribute(elem, &W::author(), &ctx.author);
    }
    if !doc.has_attribute(elem, &W::date()) {
        doc.set_attribute(elem, &W::date(), timestamp);
    }
    if !doc.has_attribute(elem, &W::initials()) {
        doc.set_attribute(elem, &W::initials(), &ctx.initials);
    }
}
