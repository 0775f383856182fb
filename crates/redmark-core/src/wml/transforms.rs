//! The four redline operations over Word markup.
//!
//! State model: a run or paragraph subtree is plain, inserted (`w:ins`)
//! or deleted (`w:del`). Regions nest to represent rejections: a `w:del`
//! inside someone's `w:ins` rejects their insertion, and a fresh `w:ins`
//! after someone's `w:del` restores their deleted content.

use super::editor::DocxPart;
use crate::error::{RedmarkError, Result};
use crate::xml::builder;
use crate::xml::namespaces::W;
use crate::xml::parser;
use crate::xml::{XmlDocument, XmlNodeData};
use indextree::NodeId;

impl DocxPart {
    /// Mark a run or paragraph as a tracked deletion.
    ///
    /// Text leaves become `w:delText` (attributes and entity-safe content
    /// preserved verbatim), run RSIDs switch to the deletion variant, and
    /// the content is wrapped in a new `w:del` region. Numbered-list
    /// paragraphs additionally get a `w:del` marker inside `w:pPr/w:rPr`
    /// since the numbering glyph has no run of its own.
    ///
    /// Fails without touching the tree if the element already carries a
    /// tracked change or is not a `w:r`/`w:p`.
    pub fn suggest_deletion(&mut self, elem: NodeId) -> Result<NodeId> {
        let name = self
            .doc()
            .name(elem)
            .cloned()
            .ok_or_else(|| RedmarkError::InvalidTrackedChange("target is not an element".into()))?;

        if name == W::r() {
            if !self.doc().descendants_named(elem, &W::delText()).is_empty() {
                return Err(RedmarkError::InvalidTrackedChange(
                    "w:r element already contains w:delText".into(),
                ));
            }

            let ctx_rsid = self.context().rsid.clone();
            let doc = self.doc_mut();
            convert_texts_to_deleted(doc, elem);
            swap_run_rsid_to_deleted(doc, elem, &ctx_rsid);

            let wrapper = doc.add_before(elem, XmlNodeData::element(W::del()));
            doc.append_node(wrapper, elem);
            self.inject(&[wrapper]);
            Ok(wrapper)
        } else if name == W::p() {
            if !self.doc().descendants_named(elem, &W::ins()).is_empty()
                || !self.doc().descendants_named(elem, &W::del()).is_empty()
            {
                return Err(RedmarkError::InvalidTrackedChange(
                    "w:p element already contains tracked changes".into(),
                ));
            }

            let ctx_rsid = self.context().rsid.clone();
            let doc = self.doc_mut();

            // List items keep their numbering glyph; record its deletion
            // through the paragraph-mark run properties instead.
            if let Some(p_pr) = doc.child_named(elem, &W::pPr()) {
                if !doc.descendants_named(p_pr, &W::numPr()).is_empty() {
                    let r_pr = doc
                        .child_named(p_pr, &W::rPr())
                        .unwrap_or_else(|| doc.add_child(p_pr, XmlNodeData::element(W::rPr())));
                    doc.add_first_child(r_pr, XmlNodeData::element(W::del()));
                }
            }

            convert_texts_to_deleted(doc, elem);
            for run in doc.descendants_named(elem, &W::r()) {
                swap_run_rsid_to_deleted(doc, run, &ctx_rsid);
            }

            let content: Vec<NodeId> = doc
                .children(elem)
                .filter(|&child| doc.name(child) != Some(&W::pPr()))
                .collect();
            let wrapper = doc.add_child(elem, XmlNodeData::element(W::del()));
            for child in content {
                doc.append_node(wrapper, child);
            }
            self.inject(&[wrapper]);
            Ok(elem)
        } else {
            Err(RedmarkError::InvalidTrackedChange(format!(
                "expected w:r or w:p, got <{}>",
                name
            )))
        }
    }

    /// Reject an insertion by nesting a deletion region inside it.
    ///
    /// Accepts a single `w:ins` or any container holding one or more; the
    /// insertion stays outermost so the original proposal is preserved.
    pub fn revert_insertion(&mut self, elem: NodeId) -> Result<Vec<NodeId>> {
        let insertions = if self.doc().name(elem) == Some(&W::ins()) {
            vec![elem]
        } else {
            self.doc().descendants_named(elem, &W::ins())
        };

        if insertions.is_empty() {
            let tag = element_label(self.doc(), elem);
            return Err(RedmarkError::InvalidTrackedChange(format!(
                "revert_insertion requires a w:ins element; <{}> contains no insertions",
                tag
            )));
        }

        let ctx_rsid = self.context().rsid.clone();
        for ins in insertions {
            if self.doc().descendants_named(ins, &W::r()).is_empty() {
                continue;
            }

            let doc = self.doc_mut();
            for run in doc.descendants_named(ins, &W::r()) {
                swap_run_rsid_to_deleted(doc, run, &ctx_rsid);
            }
            convert_texts_to_deleted(doc, ins);

            let content: Vec<NodeId> = doc.children(ins).collect();
            let wrapper = doc.add_child(ins, XmlNodeData::element(W::del()));
            for child in content {
                doc.append_node(wrapper, child);
            }
            self.inject(&[wrapper]);
        }

        Ok(vec![elem])
    }

    /// Restore a deletion by re-inserting its content after the region.
    ///
    /// The original `w:del` is left untouched; its runs are cloned into a
    /// new `w:ins` placed as the next sibling, with `w:delText` converted
    /// back to `w:t`. When called on a single `w:del` the new insertion
    /// is returned alongside the original.
    pub fn revert_deletion(&mut self, elem: NodeId) -> Result<Vec<NodeId>> {
        let is_single = self.doc().name(elem) == Some(&W::del());
        let deletions = if is_single {
            vec![elem]
        } else {
            self.doc().descendants_named(elem, &W::del())
        };

        if deletions.is_empty() {
            let tag = element_label(self.doc(), elem);
            return Err(RedmarkError::InvalidTrackedChange(format!(
                "revert_deletion requires a w:del element; <{}> contains no deletions",
                tag
            )));
        }

        let ctx_rsid = self.context().rsid.clone();
        let mut created_insertion = None;

        for del in deletions {
            let runs = self.doc().descendants_named(del, &W::r());
            if runs.is_empty() {
                continue;
            }

            let doc = self.doc_mut();
            let ins = doc.create_detached(XmlNodeData::element(W::ins()));
            for run in runs {
                let Some(copy) = doc.clone_subtree(run) else { continue };
                for del_text in doc.descendants_named(copy, &W::delText()) {
                    doc.rename(del_text, W::t());
                }
                swap_run_rsid_to_inserted(doc, copy, &ctx_rsid);
                doc.append_node(ins, copy);
            }
            doc.insert_node_after(del, ins);
            self.inject(&[ins]);

            if is_single {
                created_insertion = Some(ins);
            }
        }

        match created_insertion {
            Some(ins) => Ok(vec![elem, ins]),
            None => Ok(vec![elem]),
        }
    }
}

/// Wrap a standalone paragraph fragment as a tracked insertion.
///
/// Ensures `w:pPr`/`w:rPr` exist, adds the `w:ins` marker that records
/// insertion of the paragraph mark (needed for numbered-list glyphs), and
/// wraps all non-property content in one `w:ins` region. Returns the
/// transformed fragment as a string ready for insertion into a document.
pub fn suggest_paragraph(xml_content: &str) -> Result<String> {
    let wrapper = format!(
        "<fragment-root xmlns:w=\"{}\">{}</fragment-root>",
        W::NS,
        xml_content
    );
    let mut doc = parser::parse(&wrapper)?;
    let root = doc.root().ok_or(RedmarkError::EmptyFragment)?;

    let para = *doc
        .descendants_named(root, &W::p())
        .first()
        .ok_or_else(|| {
            RedmarkError::InvalidTrackedChange("fragment does not contain a w:p element".into())
        })?;

    let p_pr = doc
        .child_named(para, &W::pPr())
        .unwrap_or_else(|| doc.add_first_child(para, XmlNodeData::element(W::pPr())));
    let r_pr = doc
        .child_named(p_pr, &W::rPr())
        .unwrap_or_else(|| doc.add_child(p_pr, XmlNodeData::element(W::rPr())));
    doc.add_first_child(r_pr, XmlNodeData::element(W::ins()));

    let content: Vec<NodeId> = doc
        .children(para)
        .filter(|&child| doc.name(child) != Some(&W::pPr()))
        .collect();
    let ins_wrapper = doc.add_child(para, XmlNodeData::element(W::ins()));
    for child in content {
        doc.append_node(ins_wrapper, child);
    }

    builder::serialize_subtree(&doc, para)
}

/// Rename every `w:t` under `start` to `w:delText`, keeping attributes
/// (such as `xml:space`) and child text nodes exactly as they are.
fn convert_texts_to_deleted(doc: &mut XmlDocument, start: NodeId) {
    for t in doc.descendants_named(start, &W::t()) {
        doc.rename(t, W::delText());
    }
}

fn swap_run_rsid_to_deleted(doc: &mut XmlDocument, run: NodeId, rsid: &str) {
    if let Some(value) = doc.attribute(run, &W::rsidR()).map(String::from) {
        doc.set_attribute(run, &W::rsidDel(), &value);
        doc.remove_attribute(run, &W::rsidR());
    } else if !doc.has_attribute(run, &W::rsidDel()) {
        doc.set_attribute(run, &W::rsidDel(), rsid);
    }
}

fn swap_run_rsid_to_inserted(doc: &mut XmlDocument, run: NodeId, rsid: &str) {
    if let Some(value) = doc.attribute(run, &W::rsidDel()).map(String::from) {
        doc.set_attribute(run, &W::rsidR(), &value);
        doc.remove_attribute(run, &W::rsidDel());
    } else if !doc.has_attribute(run, &W::rsidR()) {
        doc.set_attribute(run, &W::rsidR(), rsid);
    }
}

fn element_label(doc: &XmlDocument, elem: NodeId) -> String {
    doc.name(elem)
        .map(|n| n.local_name.clone())
        .unwrap_or_else(|| "node".to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::editor::NodeQuery;
    use crate::wml::RevisionContext;
    use pretty_assertions::assert_eq;
    use std::path::Path;

    fn docx_part(dir: &Path, body: &str) -> DocxPart {
        let content = format!(
            concat!(
                r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>"#,
                "\n",
                r#"<w:document xmlns:w="http://schemas.openxmlformats.org/wordprocessingml/2006/main">"#,
                r#"<w:body>{}</w:body></w:document>"#
            ),
            body
        );
        let path = dir.join("document.xml");
        std::fs::write(&path, content).unwrap();
        DocxPart::open(&path, RevisionContext::new("00112233", "Tester", "T")).unwrap()
    }

    #[test]
    fn suggest_deletion_wraps_run() {
        let dir = tempfile::tempdir().unwrap();
        let mut part = docx_part(dir.path(), r#"<w:p><w:r w:rsidR="AA"><w:t>gone</w:t></w:r></w:p>"#);

        let run = part.find(&NodeQuery::tag("w:r")).unwrap();
        let wrapper = part.suggest_deletion(run).unwrap();

        assert_eq!(part.doc().name(wrapper), Some(&W::del()));
        assert!(part.doc().has_attribute(wrapper, &W::id()));
        assert_eq!(part.doc().attribute(wrapper, &W::author()), Some("Tester"));

        // run kept its rsid, now as the deletion variant
        assert_eq!(part.doc().attribute(run, &W::rsidDel()), Some("AA"));
        assert!(!part.doc().has_attribute(run, &W::rsidR()));

        // no plain text leaves remain inside the deletion
        assert!(part.doc().descendants_named(wrapper, &W::t()).is_empty());
        let del_text = part.doc().descendants_named(wrapper, &W::delText());
        assert_eq!(part.text_of(del_text[0]), "gone");
    }

    #[test]
    fn suggest_deletion_rejects_already_deleted_run_without_mutating() {
        let dir = tempfile::tempdir().unwrap();
        let mut part = docx_part(dir.path(), r#"<w:p><w:r><w:delText>x</w:delText></w:r></w:p>"#);

        let run = part.find(&NodeQuery::tag("w:r")).unwrap();
        let err = part.suggest_deletion(run).unwrap_err();
        assert!(err.to_string().contains("already contains w:delText"));

        // tree unchanged: run still a direct child of the paragraph
        let para = part.find(&NodeQuery::tag("w:p")).unwrap();
        let children: Vec<_> = part.doc().children(para).collect();
        assert_eq!(children, vec![run]);
    }

    #[test]
    fn suggest_deletion_rejects_non_run_targets() {
        let dir = tempfile::tempdir().unwrap();
        let mut part = docx_part(dir.path(), r#"<w:p><w:r><w:t>x</w:t></w:r></w:p>"#);
        let body = part.find(&NodeQuery::tag("w:body")).unwrap();
        let err = part.suggest_deletion(body).unwrap_err();
        assert!(err.to_string().contains("expected w:r or w:p"));
    }

    #[test]
    fn suggest_deletion_of_paragraph_wraps_all_content() {
        let dir = tempfile::tempdir().unwrap();
        let mut part = docx_part(
            dir.path(),
            r#"<w:p><w:pPr><w:jc w:val="left"/></w:pPr><w:r><w:t>a</w:t></w:r><w:r><w:t>b</w:t></w:r></w:p>"#,
        );

        let para = part.find(&NodeQuery::tag("w:p")).unwrap();
        part.suggest_deletion(para).unwrap();

        let children: Vec<_> = part.doc().children(para).collect();
        assert_eq!(children.len(), 2); // pPr + one w:del region
        assert_eq!(part.doc().name(children[0]), Some(&W::pPr()));
        assert_eq!(part.doc().name(children[1]), Some(&W::del()));
        assert_eq!(part.doc().descendants_named(children[1], &W::r()).len(), 2);
        assert!(part.doc().descendants_named(para, &W::t()).is_empty());
    }

    #[test]
    fn suggest_deletion_marks_numbered_paragraph_properties() {
        let dir = tempfile::tempdir().unwrap();
        let mut part = docx_part(
            dir.path(),
            concat!(
                r#"<w:p><w:pPr><w:numPr><w:ilvl w:val="0"/><w:numId w:val="1"/></w:numPr></w:pPr>"#,
                r#"<w:r><w:t>item</w:t></w:r></w:p>"#
            ),
        );

        let para = part.find(&NodeQuery::tag("w:p")).unwrap();
        part.suggest_deletion(para).unwrap();

        let p_pr = part.doc().child_named(para, &W::pPr()).unwrap();
        let r_pr = part.doc().child_named(p_pr, &W::rPr()).unwrap();
        let marker = part.doc().children(r_pr).next().unwrap();
        assert_eq!(part.doc().name(marker), Some(&W::del()));
    }

    #[test]
    fn revert_insertion_nests_deletion_inside() {
        let dir = tempfile::tempdir().unwrap();
        let mut part = docx_part(
            dir.path(),
            r#"<w:p><w:ins w:id="3" w:author="Other" w:date="2021-01-01T00:00:00Z"><w:r w:rsidR="BB"><w:t>their text</w:t></w:r></w:ins></w:p>"#,
        );

        let ins = part.find(&NodeQuery::tag("w:ins")).unwrap();
        part.revert_insertion(ins).unwrap();

        // insertion remains outermost, with exactly one w:del child
        assert_eq!(part.doc().attribute(ins, &W::author()), Some("Other"));
        let children: Vec<_> = part.doc().children(ins).collect();
        assert_eq!(children.len(), 1);
        let del = children[0];
        assert_eq!(part.doc().name(del), Some(&W::del()));
        assert_eq!(part.doc().attribute(del, &W::author()), Some("Tester"));

        let run = part.doc().descendants_named(del, &W::r())[0];
        assert_eq!(part.doc().attribute(run, &W::rsidDel()), Some("BB"));
        assert!(part.doc().descendants_named(del, &W::t()).is_empty());
    }

    #[test]
    fn revert_insertion_requires_an_insertion() {
        let dir = tempfile::tempdir().unwrap();
        let mut part = docx_part(dir.path(), r#"<w:p><w:r><w:t>x</w:t></w:r></w:p>"#);
        let para = part.find(&NodeQuery::tag("w:p")).unwrap();
        let err = part.revert_insertion(para).unwrap_err();
        assert!(err.to_string().contains("contains no insertions"));
    }

    #[test]
    fn revert_deletion_reinserts_after_region() {
        let dir = tempfile::tempdir().unwrap();
        let mut part = docx_part(
            dir.path(),
            r#"<w:p><w:del w:id="2" w:author="Other" w:date="2021-01-01T00:00:00Z"><w:r w:rsidDel="CC"><w:delText xml:space="preserve"> was removed </w:delText></w:r></w:del></w:p>"#,
        );

        let del = part.find(&NodeQuery::tag("w:del")).unwrap();
        let nodes = part.revert_deletion(del).unwrap();
        assert_eq!(nodes.len(), 2);
        let ins = nodes[1];

        // new insertion sits right after the untouched deletion
        assert_eq!(part.doc().next_sibling(del), Some(ins));
        assert_eq!(part.doc().name(ins), Some(&W::ins()));
        assert_eq!(part.doc().descendants_named(del, &W::delText()).len(), 1);

        let new_run = part.doc().descendants_named(ins, &W::r())[0];
        assert_eq!(part.doc().attribute(new_run, &W::rsidR()), Some("CC"));
        let new_t = part.doc().descendants_named(ins, &W::t())[0];
        assert_eq!(part.text_of(new_t), " was removed ");
        // attributes on the text leaf survive the conversion
        use crate::xml::namespaces::XML;
        assert_eq!(part.doc().attribute(new_t, &XML::space()), Some("preserve"));
    }

    #[test]
    fn deletion_roundtrip_restores_visible_text() {
        let dir = tempfile::tempdir().unwrap();
        let mut part = docx_part(dir.path(), r#"<w:p><w:r><w:t>round trip</w:t></w:r></w:p>"#);

        let run = part.find(&NodeQuery::tag("w:r")).unwrap();
        let wrapper = part.suggest_deletion(run).unwrap();
        let nodes = part.revert_deletion(wrapper).unwrap();

        let ins = nodes[1];
        let restored = part.doc().descendants_named(ins, &W::t());
        assert_eq!(part.text_of(restored[0]), "round trip");
    }

    #[test]
    fn suggest_paragraph_wraps_content_and_marks_properties() {
        let out = suggest_paragraph(r#"<w:p><w:r><w:t>fresh</w:t></w:r></w:p>"#).unwrap();

        assert!(out.starts_with("<w:p>"));
        assert!(out.contains("<w:pPr><w:rPr><w:ins/></w:rPr></w:pPr>"));
        assert!(out.contains("<w:ins><w:r><w:t>fresh</w:t></w:r></w:ins>"));
    }

    #[test]
    fn suggest_paragraph_keeps_existing_properties_first() {
        let out = suggest_paragraph(
            r#"<w:p><w:pPr><w:jc w:val="center"/></w:pPr><w:r><w:t>x</w:t></w:r></w:p>"#,
        )
        .unwrap();

        let p_pr_at = out.find("<w:pPr>").unwrap();
        let ins_at = out.find("<w:ins>").unwrap();
        assert!(p_pr_at < ins_at);
        assert!(out.contains("<w:jc w:val=\"center\"/>"));
    }
}
