use super::checks::PackageChecker;
use super::xsd::XsdChecker;
use super::{CheckReport, Violation};
use crate::error::Result;
use crate::xml::namespaces::{W, XML};
use crate::xml::parser;
use crate::xml::{XmlDocument, XmlNodeData};
use once_cell::sync::Lazy;
use std::collections::HashMap;
use std::io::Read;
use std::path::{Path, PathBuf};

/// Word-specific element → expected relationship type mapping.
///
/// Kept explicit and empty until a concrete case needs pinning; the
/// suffix heuristic in the shared checker covers the rest advisorily.
static ELEMENT_RELATIONSHIP_TYPES: Lazy<HashMap<&'static str, &'static str>> =
    Lazy::new(HashMap::new);

/// Aggregated result of one validator run.
#[derive(Debug)]
pub struct ValidationOutcome {
    pub reports: Vec<CheckReport>,
}

impl ValidationOutcome {
    pub fn passed(&self) -> bool {
        self.reports.iter().all(|r| r.passed())
    }

    /// Failed checks rendered for an aggregated `ValidationFailed` error.
    pub fn summary(&self) -> String {
        self.reports
            .iter()
            .filter(|r| !r.passed())
            .map(|r| r.render_failure())
            .collect::<Vec<_>>()
            .join("\n")
    }
}

/// Runs every check applicable to a Word package, diffed against the
/// original archive where the check supports a baseline.
pub struct DocxValidator {
    checker: PackageChecker,
    unpacked_dir: PathBuf,
    original_file: PathBuf,
    schemas_dir: PathBuf,
    verbose: bool,
}

impl DocxValidator {
    pub fn new(unpacked_dir: &Path, original_file: &Path) -> Self {
        Self {
            checker: PackageChecker::new(unpacked_dir),
            unpacked_dir: unpacked_dir.to_path_buf(),
            original_file: original_file.to_path_buf(),
            schemas_dir: PathBuf::from("schemas"),
            verbose: false,
        }
    }

    pub fn verbose(mut self, verbose: bool) -> Self {
        self.verbose = verbose;
        self.checker = self.checker.verbose(verbose);
        self
    }

    pub fn with_schemas_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.schemas_dir = dir.into();
        self
    }

    /// Run all checks. Violations accumulate across checks so one run
    /// reports the complete set; only a failure to parse any part at all
    /// short-circuits, since nothing else is meaningful on broken XML.
    pub fn validate(&self) -> Result<ValidationOutcome> {
        let mut reports = Vec::new();

        let well_formed = self.checker.check_well_formed();
        well_formed.print(self.verbose);
        let parse_failed = !well_formed.passed();
        reports.push(well_formed);
        if parse_failed {
            return Ok(ValidationOutcome { reports });
        }

        for report in [
            self.checker.check_namespaces(),
            self.checker.check_unique_ids(),
            self.checker.check_file_references(),
            self.checker.check_content_types(),
        ] {
            report.print(self.verbose);
            reports.push(report);
        }

        let xsd = XsdChecker::new(&self.unpacked_dir, &self.original_file, &self.schemas_dir)
            .verbose(self.verbose)
            .check(self.checker.xml_files())?;
        xsd.print(self.verbose);
        reports.push(xsd);

        for report in [
            self.check_whitespace_preservation(),
            self.check_deletions(),
            self.check_insertions(),
            self.checker
                .check_relationship_ids(&ELEMENT_RELATIONSHIP_TYPES),
        ] {
            report.print(self.verbose);
            reports.push(report);
        }

        // Report-only: a shifted paragraph count is worth a look but is
        // not by itself a violation.
        self.compare_paragraph_counts();

        Ok(ValidationOutcome { reports })
    }

    fn document_part(&self) -> Option<(XmlDocument, String)> {
        let path = self.unpacked_dir.join("word/document.xml");
        if !path.is_file() {
            return None;
        }
        match parser::parse_file(&path) {
            Ok((doc, _)) => Some((doc, self.checker.relative(&path))),
            Err(_) => None,
        }
    }

    /// Every `w:t` with leading/trailing whitespace carries
    /// `xml:space="preserve"`.
    fn check_whitespace_preservation(&self) -> CheckReport {
        let mut report = CheckReport::new("all whitespace is properly preserved");
        let Some((doc, rel_path)) = self.document_part() else {
            return report;
        };
        let Some(root) = doc.root() else { return report };

        for node in doc.descendants_named(root, &W::t()) {
            let Some(text) = first_text(&doc, node) else { continue };
            let edges_whitespace = text.chars().next().is_some_and(|c| c.is_whitespace())
                || text.chars().last().is_some_and(|c| c.is_whitespace());
            if !edges_whitespace {
                continue;
            }
            if doc.attribute(node, &XML::space()) != Some("preserve") {
                report.push(Violation::new(
                    rel_path.clone(),
                    doc.get(node).and_then(|d| d.pos()).map(|p| p.line),
                    format!(
                        "w:t with whitespace lacks xml:space='preserve': {}",
                        preview(&text)
                    ),
                ));
            }
        }

        report
    }

    /// Deletion regions must hold `w:delText`, never plain `w:t`.
    /// The schema alone does not catch this, so it is checked directly.
    fn check_deletions(&self) -> CheckReport {
        let mut report = CheckReport::new("no w:t elements inside w:del");
        let Some((doc, rel_path)) = self.document_part() else {
            return report;
        };
        let Some(root) = doc.root() else { return report };

        for del in doc.descendants_named(root, &W::del()) {
            for t in doc.descendants_named(del, &W::t()) {
                let Some(text) = first_text(&doc, t) else { continue };
                report.push(Violation::new(
                    rel_path.clone(),
                    doc.get(t).and_then(|d| d.pos()).map(|p| p.line),
                    format!("<w:t> found inside <w:del>: {}", preview(&text)),
                ));
            }
        }

        report
    }

    /// `w:delText` may appear under `w:ins` only when a `w:del` sits in
    /// between (rejecting someone else's insertion).
    fn check_insertions(&self) -> CheckReport {
        let mut report = CheckReport::new("no w:delText inside w:ins without nested w:del");
        let Some((doc, rel_path)) = self.document_part() else {
            return report;
        };
        let Some(root) = doc.root() else { return report };

        for del_text in doc.descendants_named(root, &W::delText()) {
            let mut inside_ins = false;
            let mut inside_del = false;
            for ancestor in doc.ancestors(del_text).skip(1) {
                match doc.get(ancestor).and_then(|d| d.name()) {
                    Some(name) if *name == W::ins() => inside_ins = true,
                    Some(name) if *name == W::del() => inside_del = true,
                    _ => {}
                }
            }
            if inside_ins && !inside_del {
                let text = first_text(&doc, del_text).unwrap_or_default();
                report.push(Violation::new(
                    rel_path.clone(),
                    doc.get(del_text).and_then(|d| d.pos()).map(|p| p.line),
                    format!("<w:delText> within <w:ins>: {}", preview(&text)),
                ));
            }
        }

        report
    }

    fn compare_paragraph_counts(&self) {
        let current = self
            .document_part()
            .map(|(doc, _)| count_paragraphs(&doc))
            .unwrap_or(0);
        let original = self.count_original_paragraphs().unwrap_or(0);

        let diff = current as i64 - original as i64;
        let diff_str = if diff > 0 {
            format!("+{}", diff)
        } else {
            diff.to_string()
        };
        println!("\nParagraph count: {} → {} ({})", original, current, diff_str);
    }

    fn count_original_paragraphs(&self) -> Option<usize> {
        let file = std::fs::File::open(&self.original_file).ok()?;
        let mut archive = zip::read::ZipArchive::new(file).ok()?;
        let mut entry = archive.by_name("word/document.xml").ok()?;
        let mut content = String::new();
        entry.read_to_string(&mut content).ok()?;
        let doc = parser::parse(&content).ok()?;
        Some(count_paragraphs(&doc))
    }
}

fn count_paragraphs(doc: &XmlDocument) -> usize {
    doc.root()
        .map(|root| doc.descendants_named(root, &W::p()).len())
        .unwrap_or(0)
}

fn first_text(doc: &XmlDocument, node: indextree::NodeId) -> Option<String> {
    doc.children(node).find_map(|child| match doc.get(child) {
        Some(XmlNodeData::Text(text)) if !text.is_empty() => Some(text.clone()),
        _ => None,
    })
}

fn preview(text: &str) -> String {
    let rendered = format!("{:?}", text);
    if rendered.len() > 50 {
        format!("{}...", &rendered[..50])
    } else {
        rendered
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    fn validator_with_document(body: &str) -> (tempfile::TempDir, DocxValidator) {
        let dir = tempfile::tempdir().unwrap();
        let word = dir.path().join("word");
        fs::create_dir_all(&word).unwrap();
        fs::write(
            word.join("document.xml"),
            format!(
                concat!(
                    r#"<w:document xmlns:w="http://schemas.openxmlformats.org/wordprocessingml/2006/main">"#,
                    r#"<w:body>{}</w:body></w:document>"#
                ),
                body
            ),
        )
        .unwrap();
        let validator = DocxValidator::new(dir.path(), &dir.path().join("missing.docx"));
        (dir, validator)
    }

    #[test]
    fn plain_text_inside_deletion_is_reported() {
        let (_dir, validator) =
            validator_with_document(r#"<w:p><w:del><w:r><w:t>bad</w:t></w:r></w:del></w:p>"#);
        let report = validator.check_deletions();
        assert_eq!(report.violations.len(), 1);
        assert!(report.violations[0].message.contains("<w:t> found inside <w:del>"));
    }

    #[test]
    fn deletion_text_inside_deletion_passes() {
        let (_dir, validator) = validator_with_document(
            r#"<w:p><w:del><w:r><w:delText>fine</w:delText></w:r></w:del></w:p>"#,
        );
        assert!(validator.check_deletions().passed());
    }

    #[test]
    fn del_text_in_insertion_requires_nested_deletion() {
        let (_dir, validator) = validator_with_document(
            r#"<w:p><w:ins><w:r><w:delText>bad</w:delText></w:r></w:ins></w:p>"#,
        );
        let report = validator.check_insertions();
        assert_eq!(report.violations.len(), 1);

        let (_dir, validator) = validator_with_document(
            r#"<w:p><w:ins><w:del><w:r><w:delText>fine</w:delText></w:r></w:del></w:ins></w:p>"#,
        );
        assert!(validator.check_insertions().passed());
    }

    #[test]
    fn whitespace_without_preserve_flag_is_reported() {
        let (_dir, validator) =
            validator_with_document(r#"<w:p><w:r><w:t> padded </w:t></w:r></w:p>"#);
        let report = validator.check_whitespace_preservation();
        assert_eq!(report.violations.len(), 1);

        let (_dir, validator) = validator_with_document(
            r#"<w:p><w:r><w:t xml:space="preserve"> padded </w:t></w:r></w:p>"#,
        );
        assert!(validator.check_whitespace_preservation().passed());
    }
}
