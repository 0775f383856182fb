//! XSD validation with baseline diffing.
//!
//! Both the working copy and the original package are validated
//! independently and only the set difference of error messages is
//! reported, so violations pre-existing in the source document are not
//! flagged as regressions of this editing session.

use super::{CheckReport, Violation};
use crate::error::Result;
use crate::xml::namespaces::MC;
use crate::xml::parser;
use crate::xml::{builder, XmlDocument, XmlEncoding, XmlNodeData};
use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::{BTreeSet, HashMap, HashSet};
use std::path::{Path, PathBuf};

static SCHEMA_MAPPINGS: Lazy<HashMap<&'static str, &'static str>> = Lazy::new(|| {
    HashMap::from([
        // main content folders
        ("word", "ISO-IEC29500-4_2016/wml.xsd"),
        ("ppt", "ISO-IEC29500-4_2016/pml.xsd"),
        ("xl", "ISO-IEC29500-4_2016/sml.xsd"),
        // shared files
        ("[Content_Types].xml", "ecma/fourth-edition/opc-contentTypes.xsd"),
        ("app.xml", "ISO-IEC29500-4_2016/shared-documentPropertiesExtended.xsd"),
        ("core.xml", "ecma/fourth-edition/opc-coreProperties.xsd"),
        ("custom.xml", "ISO-IEC29500-4_2016/shared-documentPropertiesCustom.xsd"),
        (".rels", "ecma/fourth-edition/opc-relationships.xsd"),
        // Word-specific files
        ("people.xml", "microsoft/wml-2012.xsd"),
        ("commentsIds.xml", "microsoft/wml-cid-2016.xsd"),
        ("commentsExtensible.xml", "microsoft/wml-cex-2018.xsd"),
        ("commentsExtended.xml", "microsoft/wml-2012.xsd"),
        // charts and themes
        ("chart", "ISO-IEC29500-4_2016/dml-chart.xsd"),
        ("theme", "ISO-IEC29500-4_2016/dml-main.xsd"),
    ])
});

const MAIN_CONTENT_FOLDERS: [&str; 3] = ["word", "ppt", "xl"];

/// Namespaces a validating consumer is expected to understand; anything
/// else is an ignorable extension stripped before validation.
static OOXML_NAMESPACES: Lazy<HashSet<&'static str>> = Lazy::new(|| {
    HashSet::from([
        "http://schemas.openxmlformats.org/officeDocument/2006/math",
        "http://schemas.openxmlformats.org/officeDocument/2006/relationships",
        "http://schemas.openxmlformats.org/schemaLibrary/2006/main",
        "http://schemas.openxmlformats.org/drawingml/2006/main",
        "http://schemas.openxmlformats.org/drawingml/2006/chart",
        "http://schemas.openxmlformats.org/drawingml/2006/chartDrawing",
        "http://schemas.openxmlformats.org/drawingml/2006/diagram",
        "http://schemas.openxmlformats.org/drawingml/2006/picture",
        "http://schemas.openxmlformats.org/drawingml/2006/spreadsheetDrawing",
        "http://schemas.openxmlformats.org/drawingml/2006/wordprocessingDrawing",
        "http://schemas.openxmlformats.org/wordprocessingml/2006/main",
        "http://schemas.openxmlformats.org/presentationml/2006/main",
        "http://schemas.openxmlformats.org/spreadsheetml/2006/main",
        "http://schemas.openxmlformats.org/officeDocument/2006/sharedTypes",
        "http://www.w3.org/XML/1998/namespace",
    ])
});

static TEMPLATE_TAG: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\{\{[^}]*\}\}").expect("template tag pattern compiles"));

pub struct XsdChecker {
    unpacked_dir: PathBuf,
    original_file: PathBuf,
    schemas_dir: PathBuf,
    verbose: bool,
}

impl XsdChecker {
    pub fn new(unpacked_dir: &Path, original_file: &Path, schemas_dir: &Path) -> Self {
        Self {
            unpacked_dir: unpacked_dir.to_path_buf(),
            original_file: original_file.to_path_buf(),
            schemas_dir: schemas_dir.to_path_buf(),
            verbose: false,
        }
    }

    pub fn verbose(mut self, verbose: bool) -> Self {
        self.verbose = verbose;
        self
    }

    /// Validate every mapped part, reporting only errors absent from the
    /// baseline. Returns a skipped report when no XSD engine or schema
    /// directory is available.
    pub fn check(&self, xml_files: &[PathBuf]) -> Result<CheckReport> {
        if !cfg!(feature = "xsd") {
            tracing::debug!("built without the xsd feature, skipping schema validation");
            return Ok(CheckReport::skipped("XSD validation (engine not compiled)"));
        }
        if !self.schemas_dir.is_dir() {
            tracing::debug!(dir = %self.schemas_dir.display(), "schema directory not found");
            return Ok(CheckReport::skipped("XSD validation (no schema directory)"));
        }

        let mut report = CheckReport::new("no new XSD validation errors");
        let mut valid_count = 0usize;
        let mut skipped_count = 0usize;
        let mut preexisting_count = 0usize;

        // The baseline archive is extracted once and each part validated
        // on demand as its counterpart fails.
        let baseline_dir = tempfile::Builder::new().prefix("redmark_xsd_").tempdir()?;
        let mut baseline_extracted = false;

        for xml_file in xml_files {
            let rel_path = self.relative(xml_file);
            let Some(schema_path) = self.schema_path_for(xml_file) else {
                skipped_count += 1;
                if self.verbose {
                    tracing::debug!(file = %rel_path, "no schema mapped, skipping");
                }
                continue;
            };
            if !schema_path.is_file() {
                skipped_count += 1;
                continue;
            }

            let current_errors = match self.validate_one(xml_file, &rel_path, &schema_path) {
                Ok(errors) => errors,
                Err(message) => BTreeSet::from([message]),
            };
            if current_errors.is_empty() {
                valid_count += 1;
                continue;
            }

            if !baseline_extracted {
                let file = std::fs::File::open(&self.original_file)?;
                zip::read::ZipArchive::new(file)?.extract(baseline_dir.path())?;
                baseline_extracted = true;
            }

            let baseline_file = baseline_dir.path().join(&rel_path);
            let baseline_errors = if baseline_file.is_file() {
                self.validate_one(&baseline_file, &rel_path, &schema_path)
                    .unwrap_or_default()
            } else {
                BTreeSet::new()
            };

            let new_errors: Vec<&String> = current_errors.difference(&baseline_errors).collect();
            if new_errors.is_empty() {
                preexisting_count += 1;
                valid_count += 1;
                continue;
            }

            for error in new_errors.iter().take(3) {
                let truncated = if error.len() > 250 {
                    format!("{}...", &error[..250])
                } else {
                    (*error).clone()
                };
                report.push(Violation::new(rel_path.clone(), None, truncated));
            }
        }

        if self.verbose {
            println!("Validated {} file(s) against XSD schemas", xml_files.len());
            println!("  - valid: {}", valid_count);
            println!("  - skipped (no schema): {}", skipped_count);
            if preexisting_count > 0 {
                println!("  - with pre-existing errors (ignored): {}", preexisting_count);
            }
        }

        Ok(report)
    }

    fn relative(&self, path: &Path) -> String {
        path.strip_prefix(&self.unpacked_dir)
            .unwrap_or(path)
            .to_string_lossy()
            .replace('\\', "/")
    }

    fn schema_path_for(&self, xml_file: &Path) -> Option<PathBuf> {
        let name = xml_file.file_name()?.to_str()?;
        if let Some(mapped) = SCHEMA_MAPPINGS.get(name) {
            return Some(self.schemas_dir.join(mapped));
        }
        if xml_file.extension().and_then(|e| e.to_str()) == Some("rels") {
            return Some(self.schemas_dir.join(SCHEMA_MAPPINGS[".rels"]));
        }

        let path_str = xml_file.to_string_lossy().replace('\\', "/");
        if path_str.contains("charts/") && name.starts_with("chart") {
            return Some(self.schemas_dir.join(SCHEMA_MAPPINGS["chart"]));
        }
        if path_str.contains("theme/") && name.starts_with("theme") {
            return Some(self.schemas_dir.join(SCHEMA_MAPPINGS["theme"]));
        }

        let parent = xml_file.parent()?.file_name()?.to_str()?;
        if MAIN_CONTENT_FOLDERS.contains(&parent) {
            return Some(self.schemas_dir.join(SCHEMA_MAPPINGS[parent]));
        }

        None
    }

    /// Parse, preprocess, and validate one file; errors come back as a
    /// normalized message set so baseline diffing can compare them.
    fn validate_one(
        &self,
        file: &Path,
        rel_path: &str,
        schema_path: &Path,
    ) -> std::result::Result<BTreeSet<String>, String> {
        let (mut doc, _) = parser::parse_file(file).map_err(|e| e.to_string())?;
        preprocess_for_validation(&mut doc, rel_path);
        let xml = builder::serialize_bytes(&doc, XmlEncoding::Utf8)
            .map_err(|e| e.to_string())
            .and_then(|bytes| String::from_utf8(bytes).map_err(|e| e.to_string()))?;
        run_schema_validation(&xml, schema_path)
    }
}

/// Make a part comparable against its schema: drop `{{...}}` placeholder
/// markup from non-content text, the `mc:Ignorable` attribute, and (for
/// main-content parts) everything from unknown extension namespaces.
fn preprocess_for_validation(doc: &mut XmlDocument, rel_path: &str) {
    strip_template_tags(doc);

    if let Some(root) = doc.root() {
        doc.remove_attribute(root, &MC::Ignorable());
    }

    let first_component = rel_path.split('/').next().unwrap_or("");
    if MAIN_CONTENT_FOLDERS.contains(&first_component) {
        strip_foreign_attributes(doc);
        strip_foreign_elements(doc);
    }
}

fn strip_template_tags(doc: &mut XmlDocument) {
    let Some(root) = doc.root() else { return };

    let mut rewrites = Vec::new();
    for node in doc.descendants(root) {
        let Some(XmlNodeData::Text(text)) = doc.get(node) else {
            continue;
        };
        let in_content_text = doc
            .parent(node)
            .and_then(|p| doc.get(p))
            .and_then(|d| d.name())
            .map(|n| n.local_name == "t")
            .unwrap_or(false);
        if in_content_text {
            continue;
        }
        if TEMPLATE_TAG.is_match(text) {
            rewrites.push((node, TEMPLATE_TAG.replace_all(text, "").to_string()));
        }
    }

    for (node, text) in rewrites {
        if let Some(data) = doc.get_mut(node) {
            *data = XmlNodeData::Text(text);
        }
    }
}

fn strip_foreign_attributes(doc: &mut XmlDocument) {
    let Some(root) = doc.root() else { return };
    let nodes: Vec<_> = doc.descendants(root).collect();
    for node in nodes {
        let Some(data) = doc.get_mut(node) else { continue };
        let Some(attrs) = data.attributes_mut() else { continue };
        attrs.retain(|attr| match attr.name.namespace.as_deref() {
            None => true,
            Some(crate::xml::xname::XMLNS_NS) => true,
            Some(ns) => OOXML_NAMESPACES.contains(ns),
        });
    }
}

fn strip_foreign_elements(doc: &mut XmlDocument) {
    loop {
        let Some(root) = doc.root() else { return };
        let target = doc.descendants(root).skip(1).find(|&node| {
            doc.get(node)
                .and_then(|d| d.name())
                .and_then(|n| n.namespace.as_deref())
                .map(|ns| !OOXML_NAMESPACES.contains(ns))
                .unwrap_or(false)
        });
        match target {
            Some(node) => doc.remove_subtree(node),
            None => break,
        }
    }
}

#[cfg(feature = "xsd")]
fn run_schema_validation(
    xml: &str,
    schema_path: &Path,
) -> std::result::Result<BTreeSet<String>, String> {
    use libxml::parser::Parser;
    use libxml::schemas::{SchemaParserContext, SchemaValidationContext};

    let mut parser_ctx = SchemaParserContext::from_file(&schema_path.to_string_lossy());
    let mut schema = SchemaValidationContext::from_parser(&mut parser_ctx).map_err(|errors| {
        let detail: Vec<String> = errors.into_iter().filter_map(|e| e.message).collect();
        format!("schema load failed: {}", detail.join("; "))
    })?;

    let document = Parser::default()
        .parse_string(xml)
        .map_err(|e| e.to_string())?;

    match schema.validate_document(&document) {
        Ok(()) => Ok(BTreeSet::new()),
        Err(errors) => Ok(errors
            .into_iter()
            .filter_map(|e| e.message)
            .map(|m| m.trim().to_string())
            .collect()),
    }
}

#[cfg(not(feature = "xsd"))]
fn run_schema_validation(
    _xml: &str,
    _schema_path: &Path,
) -> std::result::Result<BTreeSet<String>, String> {
    Err("XSD engine not compiled".to_string())
}
