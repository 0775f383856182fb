use super::archive;
use super::{content_type_values, relationship_types};
use crate::editor::NodeQuery;
use crate::error::{RedmarkError, Result};
use crate::validation::{DocxValidator, RedliningValidator};
use crate::wml::templates;
use crate::wml::{generate_hex_id, DocxPart, RevisionContext};
use crate::xml::namespaces::W;
use indextree::NodeId;
use std::collections::HashMap;
use std::fmt::Write as _;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

/// Session options for a `PackageDocument`.
#[derive(Clone, Debug)]
pub struct PackageOptions {
    /// RSID stamped on new content; generated when not supplied.
    pub rsid: Option<String>,
    /// Turn on `w:trackRevisions` in settings.xml.
    pub track_revisions: bool,
    /// Author recorded on tracked changes and comments.
    pub author: String,
    pub initials: String,
}

impl Default for PackageOptions {
    fn default() -> Self {
        Self {
            rsid: None,
            track_revisions: false,
            author: "Redmark".to_string(),
            initials: "R".to_string(),
        }
    }
}

impl PackageOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_author(mut self, author: impl Into<String>) -> Self {
        self.author = author.into();
        self
    }

    pub fn with_initials(mut self, initials: impl Into<String>) -> Self {
        self.initials = initials.into();
        self
    }

    pub fn with_rsid(mut self, rsid: impl Into<String>) -> Self {
        self.rsid = Some(rsid.into());
        self
    }

    pub fn with_track_revisions(mut self, track: bool) -> Self {
        self.track_revisions = track;
        self
    }
}

#[derive(Clone, Debug)]
struct CommentAnchor {
    para_id: String,
}

/// One editing session over an unpacked Word package.
///
/// Owns a working copy of every XML part in a temporary workspace plus a
/// zipped snapshot of the untouched original, which the validators use as
/// their baseline. The workspace is removed when the session drops,
/// whatever the outcome.
pub struct PackageDocument {
    original_dir: PathBuf,
    temp: TempDir,
    working_dir: PathBuf,
    baseline: PathBuf,
    ctx: RevisionContext,
    parts: HashMap<String, DocxPart>,
    existing_comments: HashMap<u32, CommentAnchor>,
    next_comment_id: u32,
}

impl PackageDocument {
    pub fn open(unpacked_dir: impl AsRef<Path>, options: PackageOptions) -> Result<Self> {
        let original_dir = unpacked_dir.as_ref().to_path_buf();
        if !original_dir.is_dir() {
            return Err(RedmarkError::InvalidPackage {
                message: format!("directory not found: {}", original_dir.display()),
            });
        }

        let temp = tempfile::Builder::new().prefix("redmark_docx_").tempdir()?;
        let working_dir = temp.path().join("unpacked");
        archive::copy_tree(&original_dir, &working_dir)?;

        // Snapshot the original as the validation baseline, outside the
        // working copy and never touched again.
        let baseline = temp.path().join("original.docx");
        archive::pack(&original_dir, &baseline, false)?;

        let ctx = match options.rsid {
            Some(rsid) => RevisionContext::new(&rsid, &options.author, &options.initials),
            None => RevisionContext::with_generated_rsid(&options.author, &options.initials),
        };
        tracing::info!(rsid = %ctx.rsid, author = %ctx.author, "opened editing session");

        let mut document = Self {
            original_dir,
            temp,
            working_dir,
            baseline,
            ctx,
            parts: HashMap::new(),
            existing_comments: HashMap::new(),
            next_comment_id: 0,
        };

        document.load_existing_comments()?;
        document.setup_tracking(options.track_revisions)?;
        document.add_author_to_people()?;

        Ok(document)
    }

    pub fn working_dir(&self) -> &Path {
        &self.working_dir
    }

    pub fn baseline(&self) -> &Path {
        &self.baseline
    }

    pub fn context(&self) -> &RevisionContext {
        &self.ctx
    }

    pub fn next_comment_id(&self) -> u32 {
        self.next_comment_id
    }

    /// The lazily-opened editor for one XML part, by package-relative path.
    pub fn part(&mut self, rel_path: &str) -> Result<&mut DocxPart> {
        if !self.parts.contains_key(rel_path) {
            let file = self.working_dir.join(rel_path);
            if !file.is_file() {
                return Err(RedmarkError::MissingPart(rel_path.to_string()));
            }
            let part = DocxPart::open(&file, self.ctx.clone())?;
            self.parts.insert(rel_path.to_string(), part);
        }
        self.parts
            .get_mut(rel_path)
            .ok_or_else(|| RedmarkError::MissingPart(rel_path.to_string()))
    }

    /// Anchor a new comment from `start` to `end` (nodes of the document
    /// part) and record it across all four comment parts. The comment id,
    /// paragraph id, and durable id are freshly allocated.
    pub fn add_comment(&mut self, start: NodeId, end: NodeId, text: &str) -> Result<u32> {
        let comment_id = self.next_comment_id;
        let para_id = generate_hex_id();
        let durable_id = generate_hex_id();

        {
            let document = self.part("word/document.xml")?;
            document.insert_before(start, &templates::comment_range_start(comment_id))?;

            // Paragraph anchors take the range end inside; run-level
            // anchors take it immediately after.
            let end_is_paragraph = document.doc().name(end) == Some(&W::p());
            if end_is_paragraph {
                document.append_to(end, &templates::comment_range_end_with_ref(comment_id))?;
            } else {
                document.insert_after(end, &templates::comment_range_end_with_ref(comment_id))?;
            }
        }

        self.append_comment_records(comment_id, &para_id, &durable_id, text, None)?;

        self.existing_comments
            .insert(comment_id, CommentAnchor { para_id });
        self.next_comment_id += 1;
        Ok(comment_id)
    }

    /// Add a reply threaded under an existing comment. The reply shares
    /// the parent's anchor range and its extended-comments entry carries
    /// the parent's paragraph id.
    pub fn reply_to_comment(&mut self, parent_comment_id: u32, text: &str) -> Result<u32> {
        let parent = self
            .existing_comments
            .get(&parent_comment_id)
            .cloned()
            .ok_or(RedmarkError::ParentNotFound(parent_comment_id))?;

        let comment_id = self.next_comment_id;
        let para_id = generate_hex_id();
        let durable_id = generate_hex_id();

        {
            let parent_id_value = parent_comment_id.to_string();
            let document = self.part("word/document.xml")?;
            let parent_start = document.find(
                &NodeQuery::tag("w:commentRangeStart").attr("w:id", &parent_id_value),
            )?;
            let parent_ref = document.find(
                &NodeQuery::tag("w:commentReference").attr("w:id", &parent_id_value),
            )?;

            document.insert_after(parent_start, &templates::comment_range_start(comment_id))?;

            let parent_ref_run =
                document
                    .doc()
                    .parent(parent_ref)
                    .ok_or_else(|| RedmarkError::InvalidTrackedChange(
                        "comment reference has no enclosing run".to_string(),
                    ))?;
            document.insert_after(parent_ref_run, &templates::comment_range_end(comment_id))?;
            document.insert_after(parent_ref_run, &templates::comment_reference_run(comment_id))?;
        }

        self.append_comment_records(
            comment_id,
            &para_id,
            &durable_id,
            text,
            Some(&parent.para_id),
        )?;

        self.existing_comments
            .insert(comment_id, CommentAnchor { para_id });
        self.next_comment_id += 1;
        Ok(comment_id)
    }

    /// Run the schema and redlining validators against the working copy,
    /// aggregating every violation into one error.
    pub fn validate(&mut self) -> Result<()> {
        // Flush edits so the validators see the current state on disk.
        for part in self.parts.values_mut() {
            if part.is_dirty() {
                part.save()?;
            }
        }

        let mut report = String::new();

        let schema = DocxValidator::new(&self.working_dir, &self.baseline);
        let outcome = schema.validate()?;
        if !outcome.passed() {
            let _ = writeln!(report, "{}", outcome.summary());
        }

        let redlining = RedliningValidator::new(&self.working_dir, &self.baseline, &self.ctx.author);
        let outcome = redlining.validate()?;
        if !outcome.passed {
            let _ = writeln!(report, "{}", outcome.summary());
        }

        if report.is_empty() {
            Ok(())
        } else {
            Err(RedmarkError::ValidationFailed {
                report: report.trim_end().to_string(),
            })
        }
    }

    /// Persist all parts, validate (on by default), then copy the working
    /// tree over `destination` (or the original directory). Validation
    /// runs before the copy so a failing session never partially writes.
    pub fn save(&mut self, destination: Option<&Path>, validate: bool) -> Result<()> {
        if self.working_dir.join("word/comments.xml").is_file() {
            self.ensure_comment_relationships()?;
            self.ensure_comment_content_types()?;
        }

        for part in self.parts.values_mut() {
            part.save()?;
        }

        if validate {
            self.validate()?;
        }

        let target = destination.unwrap_or(&self.original_dir).to_path_buf();
        archive::copy_tree(&self.working_dir, &target)?;
        Ok(())
    }

    // ==================== session setup ====================

    fn load_existing_comments(&mut self) -> Result<()> {
        if !self.working_dir.join("word/comments.xml").is_file() {
            self.next_comment_id = 0;
            return Ok(());
        }

        let comments = self.part("word/comments.xml")?;
        let mut max_id = -1i64;
        let mut anchors = Vec::new();

        for node in comments.find_all(&NodeQuery::tag("w:comment")) {
            let Some(id) = comments
                .doc()
                .attribute(node, &W::id())
                .and_then(|v| v.parse::<i64>().ok())
            else {
                continue;
            };
            max_id = max_id.max(id);

            // Remember the anchoring paragraph so replies can thread to it.
            let para_id = comments
                .doc()
                .descendants_named(node, &W::p())
                .iter()
                .find_map(|&p| {
                    comments
                        .doc()
                        .attribute(p, &crate::xml::namespaces::W14::paraId())
                        .map(String::from)
                });
            if let (Ok(id), Some(para_id)) = (u32::try_from(id), para_id) {
                anchors.push((id, para_id));
            }
        }

        for (id, para_id) in anchors {
            self.existing_comments.insert(id, CommentAnchor { para_id });
        }
        self.next_comment_id = u32::try_from(max_id + 1).unwrap_or(0);
        Ok(())
    }

    fn setup_tracking(&mut self, track_revisions: bool) -> Result<()> {
        self.ensure_template("word/people.xml", templates::PEOPLE_XML)?;
        self.add_content_type_override("/word/people.xml", content_type_values::PEOPLE)?;
        self.ensure_people_relationship()?;
        self.update_settings(track_revisions)?;
        Ok(())
    }

    fn ensure_template(&self, rel_path: &str, template: &str) -> Result<()> {
        let file = self.working_dir.join(rel_path);
        if !file.is_file() {
            std::fs::write(&file, template)?;
        }
        Ok(())
    }

    fn add_content_type_override(&mut self, part_name: &str, content_type: &str) -> Result<()> {
        let types = self.part("[Content_Types].xml")?;
        let existing = types.find_all(&NodeQuery::tag("Override").attr("PartName", part_name));
        if !existing.is_empty() {
            return Ok(());
        }
        let root = types.root()?;
        types.append_to(
            root,
            &format!(
                "<Override PartName=\"{}\" ContentType=\"{}\"/>",
                part_name, content_type
            ),
        )?;
        Ok(())
    }

    fn has_relationship(part: &DocxPart, target: &str) -> bool {
        !part
            .find_all(&NodeQuery::tag("Relationship").attr("Target", target))
            .is_empty()
    }

    fn ensure_people_relationship(&mut self) -> Result<()> {
        let rels = self.part("word/_rels/document.xml.rels")?;
        if Self::has_relationship(rels, "people.xml") {
            return Ok(());
        }
        let next_rid = rels.next_relationship_id();
        let root = rels.root()?;
        rels.append_to(
            root,
            &format!(
                "<Relationship Id=\"{}\" Type=\"{}\" Target=\"people.xml\"/>",
                next_rid,
                relationship_types::PEOPLE
            ),
        )?;
        Ok(())
    }

    /// Record this session's RSID in settings.xml, and optionally enable
    /// change tracking. Placement follows the settings schema order:
    /// `trackRevisions` early, `rsids` late.
    fn update_settings(&mut self, track_revisions: bool) -> Result<()> {
        let rsid = self.ctx.rsid.clone();
        let settings = self.part("word/settings.xml")?;
        let root = settings.find(&NodeQuery::tag("w:settings"))?;

        if track_revisions && settings.find_all(&NodeQuery::tag("w:trackRevisions")).is_empty() {
            let markup = "<w:trackRevisions/>";
            let anchor = settings
                .find_all(&NodeQuery::tag("w:documentProtection"))
                .into_iter()
                .next()
                .or_else(|| {
                    settings
                        .find_all(&NodeQuery::tag("w:defaultTabStop"))
                        .into_iter()
                        .next()
                });
            match anchor {
                Some(anchor) => {
                    settings.insert_before(anchor, markup)?;
                }
                None => {
                    let first = settings.doc().children(root).next();
                    match first {
                        Some(first) => {
                            settings.insert_before(first, markup)?;
                        }
                        None => {
                            settings.append_to(root, markup)?;
                        }
                    }
                }
            }
        }

        let rsids_sections = settings.find_all(&NodeQuery::tag("w:rsids"));
        match rsids_sections.into_iter().next() {
            None => {
                let markup = format!(
                    "<w:rsids><w:rsidRoot w:val=\"{rsid}\"/><w:rsid w:val=\"{rsid}\"/></w:rsids>"
                );
                if let Some(compat) = settings.find_all(&NodeQuery::tag("w:compat")).into_iter().next() {
                    settings.insert_after(compat, &markup)?;
                } else if let Some(clr) = settings
                    .find_all(&NodeQuery::tag("w:clrSchemeMapping"))
                    .into_iter()
                    .next()
                {
                    settings.insert_before(clr, &markup)?;
                } else {
                    settings.append_to(root, &markup)?;
                }
            }
            Some(rsids) => {
                let already_present = settings
                    .doc()
                    .descendants_named(rsids, &W::rsid())
                    .iter()
                    .any(|&n| settings.doc().attribute(n, &W::val()) == Some(rsid.as_str()));
                if !already_present {
                    settings.append_to(rsids, &format!("<w:rsid w:val=\"{rsid}\"/>"))?;
                }
            }
        }

        Ok(())
    }

    fn add_author_to_people(&mut self) -> Result<()> {
        let author = self.ctx.author.clone();
        let people = self.part("word/people.xml")?;
        let existing = people.find_all(&NodeQuery::tag("w15:person").attr("w15:author", &author));
        if !existing.is_empty() {
            return Ok(());
        }
        let root = people.find(&NodeQuery::tag("w15:people"))?;
        people.append_to(root, &templates::person_entry(&author))?;
        Ok(())
    }

    // ==================== comment bookkeeping ====================

    /// Append the correlated entries for one comment to all four comment
    /// parts, creating any part that does not exist yet.
    fn append_comment_records(
        &mut self,
        comment_id: u32,
        para_id: &str,
        durable_id: &str,
        text: &str,
        parent_para_id: Option<&str>,
    ) -> Result<()> {
        self.ensure_template("word/comments.xml", templates::COMMENTS_XML)?;
        {
            let comments = self.part("word/comments.xml")?;
            let root = comments.find(&NodeQuery::tag("w:comments"))?;
            comments.append_to(root, &templates::comment_body(comment_id, para_id, text))?;
        }

        self.ensure_template("word/commentsExtended.xml", templates::COMMENTS_EXTENDED_XML)?;
        {
            let extended = self.part("word/commentsExtended.xml")?;
            let root = extended.find(&NodeQuery::tag("w15:commentsEx"))?;
            extended.append_to(
                root,
                &templates::comment_extended_entry(para_id, parent_para_id),
            )?;
        }

        self.ensure_template("word/commentsIds.xml", templates::COMMENTS_IDS_XML)?;
        {
            let ids = self.part("word/commentsIds.xml")?;
            let root = ids.find(&NodeQuery::tag("w16cid:commentsIds"))?;
            ids.append_to(root, &templates::comment_id_entry(para_id, durable_id))?;
        }

        self.ensure_template(
            "word/commentsExtensible.xml",
            templates::COMMENTS_EXTENSIBLE_XML,
        )?;
        {
            let extensible = self.part("word/commentsExtensible.xml")?;
            let root = extensible.find(&NodeQuery::tag("w16cex:commentsExtensible"))?;
            extensible.append_to(root, &templates::comment_extensible_entry(durable_id))?;
        }

        Ok(())
    }

    fn ensure_comment_relationships(&mut self) -> Result<()> {
        let rels = self.part("word/_rels/document.xml.rels")?;
        if Self::has_relationship(rels, "comments.xml") {
            return Ok(());
        }

        let base: u32 = rels
            .next_relationship_id()
            .trim_start_matches("rId")
            .parse()
            .unwrap_or(1);
        let root = rels.root()?;

        let entries = [
            (base, relationship_types::COMMENTS, "comments.xml"),
            (
                base + 1,
                relationship_types::COMMENTS_EXTENDED,
                "commentsExtended.xml",
            ),
            (base + 2, relationship_types::COMMENTS_IDS, "commentsIds.xml"),
            (
                base + 3,
                relationship_types::COMMENTS_EXTENSIBLE,
                "commentsExtensible.xml",
            ),
        ];
        for (rid, rel_type, target) in entries {
            rels.append_to(
                root,
                &format!(
                    "<Relationship Id=\"rId{}\" Type=\"{}\" Target=\"{}\"/>",
                    rid, rel_type, target
                ),
            )?;
        }
        Ok(())
    }

    fn ensure_comment_content_types(&mut self) -> Result<()> {
        let types = self.part("[Content_Types].xml")?;
        let existing =
            types.find_all(&NodeQuery::tag("Override").attr("PartName", "/word/comments.xml"));
        if !existing.is_empty() {
            return Ok(());
        }

        let overrides = [
            ("/word/comments.xml", content_type_values::COMMENTS),
            (
                "/word/commentsExtended.xml",
                content_type_values::COMMENTS_EXTENDED,
            ),
            ("/word/commentsIds.xml", content_type_values::COMMENTS_IDS),
            (
                "/word/commentsExtensible.xml",
                content_type_values::COMMENTS_EXTENSIBLE,
            ),
        ];
        let root = types.root()?;
        for (part_name, content_type) in overrides {
            types.append_to(
                root,
                &format!(
                    "<Override PartName=\"{}\" ContentType=\"{}\"/>",
                    part_name, content_type
                ),
            )?;
        }
        Ok(())
    }
}

impl std::fmt::Debug for PackageDocument {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PackageDocument")
            .field("original_dir", &self.original_dir)
            .field("working_dir", &self.working_dir)
            .field("temp", &self.temp.path())
            .field("next_comment_id", &self.next_comment_id)
            .finish()
    }
}
