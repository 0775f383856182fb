//! Structural checks shared by every OOXML document kind: namespace
//! declarations, scoped id uniqueness, relationship graph integrity, and
//! content-type declarations.

use super::{CheckReport, Violation};
use crate::package::archive;
use crate::xml::namespaces::{MC, PKG_REL, R};
use crate::xml::parser;
use crate::xml::XmlDocument;
use once_cell::sync::Lazy;
use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};

/// Uniqueness scope for an identifier attribute.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum IdScope {
    /// Unique within one file; the same value may recur in other files.
    File,
    /// Unique across the whole package.
    Global,
}

/// Element kinds whose id attribute must be unique, keyed by lowercase
/// local name. Tracked changes (`ins`/`del`) are absent on purpose: they
/// may share an id when part of the same revision.
static UNIQUE_ID_SCOPES: Lazy<HashMap<&'static str, (&'static str, IdScope)>> = Lazy::new(|| {
    HashMap::from([
        // Word
        ("comment", ("id", IdScope::File)),
        ("commentrangestart", ("id", IdScope::File)),
        ("commentrangeend", ("id", IdScope::File)),
        ("bookmarkstart", ("id", IdScope::File)),
        ("bookmarkend", ("id", IdScope::File)),
        // PowerPoint
        ("sldid", ("id", IdScope::File)),
        ("sldmasterid", ("id", IdScope::Global)),
        ("sldlayoutid", ("id", IdScope::Global)),
        ("cm", ("authorid", IdScope::File)),
        // Excel
        ("sheet", ("sheetid", IdScope::File)),
        ("definedname", ("id", IdScope::File)),
        // Shapes (all formats)
        ("cxnsp", ("id", IdScope::File)),
        ("sp", ("id", IdScope::File)),
        ("pic", ("id", IdScope::File)),
        ("grpsp", ("id", IdScope::File)),
    ])
});

/// Root element kinds that require a content-type override.
static DECLARABLE_ROOTS: Lazy<HashSet<&'static str>> = Lazy::new(|| {
    HashSet::from([
        "sld",
        "sldLayout",
        "sldMaster",
        "presentation",
        "document",
        "workbook",
        "worksheet",
        "theme",
    ])
});

/// Media extensions that must carry a Default content-type declaration.
static MEDIA_CONTENT_TYPES: Lazy<HashMap<&'static str, &'static str>> = Lazy::new(|| {
    HashMap::from([
        ("png", "image/png"),
        ("jpg", "image/jpeg"),
        ("jpeg", "image/jpeg"),
        ("gif", "image/gif"),
        ("bmp", "image/bmp"),
        ("tiff", "image/tiff"),
        ("wmf", "image/x-wmf"),
        ("emf", "image/x-emf"),
    ])
});

/// Runs the structural checks against one unpacked package.
pub struct PackageChecker {
    unpacked_dir: PathBuf,
    xml_files: Vec<PathBuf>,
    verbose: bool,
}

impl PackageChecker {
    pub fn new(unpacked_dir: &Path) -> Self {
        let unpacked_dir = unpacked_dir.to_path_buf();
        let xml_files = archive::xml_files_under(&unpacked_dir);
        if xml_files.is_empty() {
            tracing::warn!(dir = %unpacked_dir.display(), "no XML files found");
        }
        Self {
            unpacked_dir,
            xml_files,
            verbose: false,
        }
    }

    pub fn verbose(mut self, verbose: bool) -> Self {
        self.verbose = verbose;
        self
    }

    pub fn is_verbose(&self) -> bool {
        self.verbose
    }

    pub fn unpacked_dir(&self) -> &Path {
        &self.unpacked_dir
    }

    pub fn xml_files(&self) -> &[PathBuf] {
        &self.xml_files
    }

    pub fn relative(&self, path: &Path) -> String {
        path.strip_prefix(&self.unpacked_dir)
            .unwrap_or(path)
            .to_string_lossy()
            .replace('\\', "/")
    }

    /// Every XML part parses without syntax error.
    pub fn check_well_formed(&self) -> CheckReport {
        let mut report = CheckReport::new("all XML parts are well-formed");
        for xml_file in &self.xml_files {
            if let Err(e) = parser::parse_file(xml_file) {
                report.push(Violation::new(self.relative(xml_file), None, e.to_string()));
            }
        }
        report
    }

    /// Every prefix listed in an `mc:Ignorable` attribute is declared on
    /// the element or one of its ancestors.
    pub fn check_namespaces(&self) -> CheckReport {
        let mut report = CheckReport::new("all namespace prefixes are properly declared");

        for xml_file in &self.xml_files {
            let Ok((doc, _)) = parser::parse_file(xml_file) else {
                continue; // well-formedness is its own check
            };
            let Some(root) = doc.root() else { continue };

            for node in doc.descendants(root) {
                let Some(data) = doc.get(node) else { continue };
                let Some(attrs) = data.attributes() else { continue };
                let Some(ignorable) = attrs
                    .iter()
                    .find(|a| a.name.local_name == "Ignorable")
                    .map(|a| a.value.clone())
                else {
                    continue;
                };

                let declared = declared_prefixes_in_scope(&doc, node);
                for prefix in ignorable.split_whitespace() {
                    if !declared.contains(prefix) {
                        report.push(Violation::new(
                            self.relative(xml_file),
                            data.pos().map(|p| p.line),
                            format!("namespace '{}' in Ignorable but not declared", prefix),
                        ));
                    }
                }
            }
        }

        report
    }

    /// No two elements share an id within the scope its kind demands.
    /// `mc:AlternateContent` subtrees hold mutually-exclusive variants and
    /// are excluded.
    pub fn check_unique_ids(&self) -> CheckReport {
        let mut report = CheckReport::new("all required IDs are unique");
        let mut global_ids: HashMap<String, (String, Option<u32>, String)> = HashMap::new();

        for xml_file in &self.xml_files {
            let Ok((doc, _)) = parser::parse_file(xml_file) else {
                continue;
            };
            let Some(root) = doc.root() else { continue };
            let rel_path = self.relative(xml_file);

            let mut file_ids: HashMap<(String, String), HashMap<String, Option<u32>>> =
                HashMap::new();

            for node in doc.descendants(root) {
                if in_alternate_content(&doc, node) {
                    continue;
                }
                let Some(data) = doc.get(node) else { continue };
                let Some(name) = data.name() else { continue };
                let tag = name.local_name.to_lowercase();
                let Some(&(attr_name, scope)) = UNIQUE_ID_SCOPES.get(tag.as_str()) else {
                    continue;
                };

                let Some(attrs) = data.attributes() else { continue };
                let Some(id_value) = attrs
                    .iter()
                    .find(|a| a.name.local_name.to_lowercase() == attr_name)
                    .map(|a| a.value.clone())
                else {
                    continue;
                };
                let line = data.pos().map(|p| p.line);

                match scope {
                    IdScope::Global => {
                        if let Some((prev_file, prev_line, prev_tag)) = global_ids.get(&id_value) {
                            report.push(Violation::new(
                                rel_path.clone(),
                                line,
                                format!(
                                    "global ID '{}' in <{}> already used in {} at line {} in <{}>",
                                    id_value,
                                    tag,
                                    prev_file,
                                    prev_line.unwrap_or(0),
                                    prev_tag
                                ),
                            ));
                        } else {
                            global_ids.insert(id_value, (rel_path.clone(), line, tag.clone()));
                        }
                    }
                    IdScope::File => {
                        let seen = file_ids
                            .entry((tag.clone(), attr_name.to_string()))
                            .or_default();
                        if let Some(prev_line) = seen.get(&id_value) {
                            report.push(Violation::new(
                                rel_path.clone(),
                                line,
                                format!(
                                    "duplicate {}='{}' in <{}> (first occurrence at line {})",
                                    attr_name,
                                    id_value,
                                    tag,
                                    prev_line.unwrap_or(0)
                                ),
                            ));
                        } else {
                            seen.insert(id_value, line);
                        }
                    }
                }
            }
        }

        report
    }

    /// Relationship targets resolve to existing files, and every package
    /// file is referenced by some relationship (content-types and the
    /// relationship files themselves are exempt).
    pub fn check_file_references(&self) -> CheckReport {
        let mut report = CheckReport::new("all file references are valid and complete");

        let rels_files: Vec<&PathBuf> = self
            .xml_files
            .iter()
            .filter(|p| p.extension().and_then(|e| e.to_str()) == Some("rels"))
            .collect();
        if rels_files.is_empty() {
            return report;
        }

        let all_files: HashSet<PathBuf> = archive::walk_files(&self.unpacked_dir)
            .into_iter()
            .filter(|p| {
                p.file_name().and_then(|n| n.to_str()) != Some("[Content_Types].xml")
                    && p.extension().and_then(|e| e.to_str()) != Some("rels")
            })
            .filter_map(|p| p.canonicalize().ok())
            .collect();

        let mut referenced: HashSet<PathBuf> = HashSet::new();

        for rels_file in &rels_files {
            let rel_path = self.relative(rels_file);
            let Ok((doc, _)) = parser::parse_file(rels_file) else {
                report.push(Violation::new(rel_path, None, "cannot parse relationships"));
                continue;
            };
            let Some(root) = doc.root() else { continue };

            // Targets resolve relative to the directory that owns the
            // _rels folder (word/_rels/document.xml.rels -> word/).
            let base_dir = rels_file
                .parent()
                .and_then(|p| p.parent())
                .unwrap_or(&self.unpacked_dir);

            for node in doc.descendants(root) {
                let Some(data) = doc.get(node) else { continue };
                if data.name().map(|n| n.local_name.as_str()) != Some("Relationship") {
                    continue;
                }
                let Some(target) = data.attribute(&crate::xml::XName::local("Target")) else {
                    continue;
                };
                if target.starts_with("http") || target.starts_with("mailto:") {
                    continue;
                }
                if data.attribute(&crate::xml::XName::local("TargetMode")) == Some("External") {
                    continue;
                }

                let resolved = base_dir.join(target);
                match resolved.canonicalize() {
                    Ok(path) if path.is_file() => {
                        referenced.insert(path);
                    }
                    _ => {
                        report.push(Violation::new(
                            rel_path.clone(),
                            data.pos().map(|p| p.line),
                            format!("broken reference: {}", target),
                        ));
                    }
                }
            }
        }

        let mut orphans: Vec<&PathBuf> = all_files.difference(&referenced).collect();
        orphans.sort();
        for orphan in orphans {
            report.push(Violation::new(
                self.relative(orphan),
                None,
                "unreferenced file (no relationship points to it)",
            ));
        }

        report
    }

    /// Every `r:id` attribute refers to an id present in the part's
    /// companion relationship file. Where an explicit mapping gives the
    /// expected relationship type for the referencing element, the type
    /// must match; the name-suffix heuristic is advisory only.
    pub fn check_relationship_ids(
        &self,
        explicit_types: &HashMap<&'static str, &'static str>,
    ) -> CheckReport {
        let mut report = CheckReport::new("all relationship ID references are valid");

        for xml_file in &self.xml_files {
            if xml_file.extension().and_then(|e| e.to_str()) == Some("rels") {
                continue;
            }
            let Some(rels_file) = companion_rels(xml_file) else {
                continue;
            };
            if !rels_file.is_file() {
                continue;
            }

            let rels_rel_path = self.relative(&rels_file);
            let Ok((rels_doc, _)) = parser::parse_file(&rels_file) else {
                continue;
            };
            let mut rid_to_type: HashMap<String, String> = HashMap::new();
            if let Some(root) = rels_doc.root() {
                for node in rels_doc.descendants(root) {
                    let Some(data) = rels_doc.get(node) else { continue };
                    if data.name().map(|n| n.is(PKG_REL::NS, "Relationship")) != Some(true) {
                        continue;
                    }
                    let Some(rid) = data.attribute(&crate::xml::XName::local("Id")) else {
                        continue;
                    };
                    if rid_to_type.contains_key(rid) {
                        report.push(Violation::new(
                            rels_rel_path.clone(),
                            data.pos().map(|p| p.line),
                            format!("duplicate relationship ID '{}' (IDs must be unique)", rid),
                        ));
                    }
                    let rel_type = data
                        .attribute(&crate::xml::XName::local("Type"))
                        .unwrap_or("");
                    let type_name = rel_type.rsplit('/').next().unwrap_or(rel_type);
                    rid_to_type.insert(rid.to_string(), type_name.to_string());
                }
            }

            let xml_rel_path = self.relative(xml_file);
            let Ok((doc, _)) = parser::parse_file(xml_file) else {
                continue;
            };
            let Some(root) = doc.root() else { continue };

            for node in doc.descendants(root) {
                let Some(data) = doc.get(node) else { continue };
                let Some(rid) = data.attribute(&R::id()) else { continue };
                let elem_name = data
                    .name()
                    .map(|n| n.local_name.clone())
                    .unwrap_or_default();
                let line = data.pos().map(|p| p.line);

                let Some(actual_type) = rid_to_type.get(rid) else {
                    let mut valid: Vec<&String> = rid_to_type.keys().collect();
                    valid.sort();
                    let preview: Vec<&str> = valid.iter().take(5).map(|s| s.as_str()).collect();
                    let suffix = if valid.len() > 5 { "..." } else { "" };
                    report.push(Violation::new(
                        xml_rel_path.clone(),
                        line,
                        format!(
                            "<{}> references non-existent relationship '{}' (valid IDs: {}{})",
                            elem_name,
                            rid,
                            preview.join(", "),
                            suffix
                        ),
                    ));
                    continue;
                };

                let elem_lower = elem_name.to_lowercase();
                if let Some(expected) = explicit_types.get(elem_lower.as_str()) {
                    if !actual_type.to_lowercase().contains(expected) {
                        report.push(Violation::new(
                            xml_rel_path.clone(),
                            line,
                            format!(
                                "<{}> references '{}' which points to '{}' but a '{}' relationship is expected",
                                elem_name, rid, actual_type, expected
                            ),
                        ));
                    }
                } else if let Some(guessed) = infer_relationship_type(&elem_lower) {
                    // Name-suffix inference is approximate; log, don't fail.
                    if !actual_type.to_lowercase().contains(&guessed) {
                        tracing::debug!(
                            file = %xml_rel_path,
                            element = %elem_name,
                            rid = %rid,
                            actual = %actual_type,
                            guessed = %guessed,
                            "relationship type differs from name-suffix inference"
                        );
                    }
                }
            }
        }

        report
    }

    /// Every declarable root kind has an Override and every media file's
    /// extension has a Default in `[Content_Types].xml`.
    pub fn check_content_types(&self) -> CheckReport {
        let mut report = CheckReport::new("all content is declared in [Content_Types].xml");

        let content_types_file = self.unpacked_dir.join("[Content_Types].xml");
        if !content_types_file.is_file() {
            report.push(Violation::new(
                "[Content_Types].xml",
                None,
                "file not found",
            ));
            return report;
        }

        let Ok((ct_doc, _)) = parser::parse_file(&content_types_file) else {
            report.push(Violation::new("[Content_Types].xml", None, "cannot parse"));
            return report;
        };

        let mut declared_parts: HashSet<String> = HashSet::new();
        let mut declared_extensions: HashSet<String> = HashSet::new();
        if let Some(root) = ct_doc.root() {
            for node in ct_doc.descendants(root) {
                let Some(data) = ct_doc.get(node) else { continue };
                match data.name().map(|n| n.local_name.as_str()) {
                    Some("Override") => {
                        if let Some(part) = data.attribute(&crate::xml::XName::local("PartName")) {
                            declared_parts.insert(part.trim_start_matches('/').to_string());
                        }
                    }
                    Some("Default") => {
                        if let Some(ext) = data.attribute(&crate::xml::XName::local("Extension")) {
                            declared_extensions.insert(ext.to_lowercase());
                        }
                    }
                    _ => {}
                }
            }
        }

        for xml_file in &self.xml_files {
            let path_str = self.relative(xml_file);
            if path_str.ends_with(".rels")
                || path_str.contains("[Content_Types]")
                || path_str.starts_with("docProps/")
                || path_str.contains("_rels/")
            {
                continue;
            }

            let Ok((doc, _)) = parser::parse_file(xml_file) else {
                continue;
            };
            let Some(root_name) = doc
                .root()
                .and_then(|r| doc.get(r))
                .and_then(|d| d.name().cloned())
            else {
                continue;
            };

            if DECLARABLE_ROOTS.contains(root_name.local_name.as_str())
                && !declared_parts.contains(&path_str)
            {
                report.push(Violation::new(
                    path_str.clone(),
                    None,
                    format!(
                        "file with root <{}> is not declared in [Content_Types].xml",
                        root_name.local_name
                    ),
                ));
            }
        }

        for file_path in archive::walk_files(&self.unpacked_dir) {
            let extension = file_path
                .extension()
                .and_then(|e| e.to_str())
                .map(|e| e.to_lowercase())
                .unwrap_or_default();
            if extension.is_empty() || extension == "xml" || extension == "rels" {
                continue;
            }
            if file_path.file_name().and_then(|n| n.to_str()) == Some("[Content_Types].xml") {
                continue;
            }
            let rel = self.relative(&file_path);
            if rel.contains("_rels/") || rel.starts_with("docProps/") {
                continue;
            }

            if !declared_extensions.contains(&extension) {
                if let Some(content_type) = MEDIA_CONTENT_TYPES.get(extension.as_str()) {
                    report.push(Violation::new(
                        rel,
                        None,
                        format!(
                            "file with extension '{ext}' is not declared in [Content_Types].xml \
                             (add <Default Extension=\"{ext}\" ContentType=\"{ct}\"/>)",
                            ext = extension,
                            ct = content_type
                        ),
                    ));
                }
            }
        }

        report
    }
}

/// Prefixes declared on `node` or any of its ancestors.
fn declared_prefixes_in_scope(doc: &XmlDocument, node: indextree::NodeId) -> HashSet<String> {
    let mut declared = HashSet::new();
    for ancestor in doc.ancestors(node) {
        let Some(attrs) = doc.get(ancestor).and_then(|d| d.attributes()) else {
            continue;
        };
        for attr in attrs {
            if attr.name.namespace.as_deref() == Some(crate::xml::xname::XMLNS_NS) {
                declared.insert(attr.name.local_name.clone());
            }
        }
    }
    declared
}

fn in_alternate_content(doc: &XmlDocument, node: indextree::NodeId) -> bool {
    doc.ancestors(node).any(|id| {
        doc.get(id)
            .and_then(|d| d.name())
            .map(|n| *n == MC::AlternateContent())
            .unwrap_or(false)
    })
}

/// Companion relationship file: `dir/file.xml` -> `dir/_rels/file.xml.rels`.
fn companion_rels(xml_file: &Path) -> Option<PathBuf> {
    let parent = xml_file.parent()?;
    let name = xml_file.file_name()?.to_str()?;
    Some(parent.join("_rels").join(format!("{}.rels", name)))
}

/// Best-effort expected relationship type from an element name suffix
/// (`sldId` -> `slide`, `styleReference` -> `style`).
fn infer_relationship_type(elem_lower: &str) -> Option<String> {
    if let Some(prefix) = elem_lower.strip_suffix("id") {
        if prefix.is_empty() {
            return None;
        }
        if prefix.ends_with("master") || prefix.ends_with("layout") {
            return Some(prefix.to_string());
        }
        if prefix == "sld" {
            return Some("slide".to_string());
        }
        return Some(prefix.to_string());
    }
    if let Some(prefix) = elem_lower.strip_suffix("reference") {
        if !prefix.is_empty() {
            return Some(prefix.to_string());
        }
    }
    None
}
