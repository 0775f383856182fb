use super::convert::{probe_render, RenderProbe};
use crate::error::{RedmarkError, Result};
use crate::xml::parser::{self, XmlEncoding};
use crate::xml::builder;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;
use zip::read::ZipArchive;
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipWriter};

const OFFICE_EXTENSIONS: [&str; 3] = ["docx", "pptx", "xlsx"];
const RENDER_PROBE_TIMEOUT: Duration = Duration::from_secs(10);

/// Extract an Office archive and pretty-print every XML part.
///
/// Parts are rewritten with 2-space indentation in ASCII so line-number
/// based node lookups match what a reader of the files sees.
pub fn unpack(archive: &Path, output_dir: &Path) -> Result<()> {
    fs::create_dir_all(output_dir)?;
    let file = fs::File::open(archive)?;
    let mut zip = ZipArchive::new(file)?;
    zip.extract(output_dir)?;

    for xml_file in xml_files_under(output_dir) {
        let (doc, _) = parser::parse_file(&xml_file)?;
        let bytes = builder::serialize_pretty_bytes(&doc, XmlEncoding::Ascii)?;
        fs::write(&xml_file, bytes)?;
    }

    Ok(())
}

/// Zip an unpacked directory back into an Office file.
///
/// Pretty-print whitespace and comment nodes are condensed away first
/// (text under `*:t` is left alone). With `probe` set, the result is
/// handed to the external render backstop; an unrenderable archive is
/// deleted and `Ok(false)` returned. A missing converter or a timeout
/// only degrades the probe to a warning.
pub fn pack(input_dir: &Path, output_file: &Path, probe: bool) -> Result<bool> {
    if !input_dir.is_dir() {
        return Err(RedmarkError::InvalidPackage {
            message: format!("{} is not a directory", input_dir.display()),
        });
    }
    let extension = output_file
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_ascii_lowercase())
        .unwrap_or_default();
    if !OFFICE_EXTENSIONS.contains(&extension.as_str()) {
        return Err(RedmarkError::InvalidPackage {
            message: format!(
                "{} must be a .docx, .pptx, or .xlsx file",
                output_file.display()
            ),
        });
    }

    // Stage into a temp copy so the input directory is never modified.
    let staging = tempfile::Builder::new().prefix("redmark_pack_").tempdir()?;
    let content_dir = staging.path().join("content");
    copy_tree(input_dir, &content_dir)?;

    for xml_file in xml_files_under(&content_dir) {
        let (mut doc, _) = parser::parse_file(&xml_file)?;
        builder::condense(&mut doc);
        fs::write(&xml_file, builder::serialize_bytes(&doc, XmlEncoding::Utf8)?)?;
    }

    if let Some(parent) = output_file.parent() {
        fs::create_dir_all(parent)?;
    }
    write_zip(&content_dir, output_file)?;

    if probe {
        match probe_render(output_file, RENDER_PROBE_TIMEOUT) {
            RenderProbe::Rendered => {}
            RenderProbe::ToolMissing => {
                tracing::warn!("render converter not found, skipping pack validation");
            }
            RenderProbe::TimedOut => {
                tracing::warn!("render probe timed out, skipping pack validation");
            }
            RenderProbe::Failed(message) => {
                tracing::warn!(%message, "packed document failed to render");
                fs::remove_file(output_file)?;
                return Ok(false);
            }
        }
    }

    Ok(true)
}

fn write_zip(content_dir: &Path, output_file: &Path) -> Result<()> {
    let file = fs::File::create(output_file)?;
    let mut writer = ZipWriter::new(file);
    let options = SimpleFileOptions::default().compression_method(CompressionMethod::Deflated);

    for path in walk_files(content_dir) {
        let Ok(relative) = path.strip_prefix(content_dir) else {
            continue;
        };
        let name = relative.to_string_lossy().replace('\\', "/");
        writer.start_file(name, options)?;
        let content = fs::read(&path)?;
        use std::io::Write as _;
        writer.write_all(&content)?;
    }

    writer.finish()?;
    Ok(())
}

/// Every `.xml` and `.rels` file under `dir`, recursively, sorted.
pub fn xml_files_under(dir: &Path) -> Vec<PathBuf> {
    let mut files: Vec<PathBuf> = walk_files(dir)
        .into_iter()
        .filter(|p| {
            matches!(
                p.extension().and_then(|e| e.to_str()),
                Some("xml") | Some("rels")
            )
        })
        .collect();
    files.sort();
    files
}

/// Every file under `dir`, recursively, sorted.
pub fn walk_files(dir: &Path) -> Vec<PathBuf> {
    let mut files = Vec::new();
    collect_files(dir, &mut files);
    files.sort();
    files
}

fn collect_files(dir: &Path, out: &mut Vec<PathBuf>) {
    let Ok(entries) = fs::read_dir(dir) else { return };
    for entry in entries.flatten() {
        let path = entry.path();
        if path.is_dir() {
            collect_files(&path, out);
        } else if path.is_file() {
            out.push(path);
        }
    }
}

/// Recursively copy `src` into `dst`, overwriting existing files.
pub fn copy_tree(src: &Path, dst: &Path) -> Result<()> {
    fs::create_dir_all(dst)?;
    for entry in fs::read_dir(src)? {
        let entry = entry?;
        let target = dst.join(entry.file_name());
        if entry.path().is_dir() {
            copy_tree(&entry.path(), &target)?;
        } else {
            fs::copy(entry.path(), &target)?;
        }
    }
    Ok(())
}
