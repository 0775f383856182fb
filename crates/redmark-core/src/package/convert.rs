//! External render backstop: hand the packed document to a headless
//! converter and see whether it produces output. Corroborates that the
//! archive is openable by a real consumer, nothing more.

use std::io::Read;
use std::path::Path;
use std::process::{Command, Stdio};
use std::time::{Duration, Instant};

#[derive(Debug)]
pub enum RenderProbe {
    Rendered,
    ToolMissing,
    TimedOut,
    Failed(String),
}

/// Convert the document to HTML with `soffice`, bounded by `timeout`.
///
/// The probe is advisory: a missing binary or an overrun clock must not
/// fail the caller's mutation session, so both get their own variants.
pub fn probe_render(doc_path: &Path, timeout: Duration) -> RenderProbe {
    let filter = match doc_path
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_ascii_lowercase())
        .as_deref()
    {
        Some("docx") => "html:HTML",
        Some("pptx") => "html:impress_html_Export",
        Some("xlsx") => "html:HTML (StarCalc)",
        _ => return RenderProbe::Failed("unsupported file extension".to_string()),
    };

    let out_dir = match tempfile::Builder::new().prefix("redmark_probe_").tempdir() {
        Ok(dir) => dir,
        Err(e) => return RenderProbe::Failed(e.to_string()),
    };

    let spawned = Command::new("soffice")
        .arg("--headless")
        .arg("--convert-to")
        .arg(filter)
        .arg("--outdir")
        .arg(out_dir.path())
        .arg(doc_path)
        .stdout(Stdio::null())
        .stderr(Stdio::piped())
        .spawn();

    let mut child = match spawned {
        Ok(child) => child,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return RenderProbe::ToolMissing,
        Err(e) => return RenderProbe::Failed(e.to_string()),
    };

    let deadline = Instant::now() + timeout;
    loop {
        match child.try_wait() {
            Ok(Some(_)) => break,
            Ok(None) => {
                if Instant::now() >= deadline {
                    let _ = child.kill();
                    let _ = child.wait();
                    return RenderProbe::TimedOut;
                }
                std::thread::sleep(Duration::from_millis(50));
            }
            Err(e) => return RenderProbe::Failed(e.to_string()),
        }
    }

    let stem = doc_path
        .file_stem()
        .map(|s| s.to_string_lossy().to_string())
        .unwrap_or_default();
    if out_dir.path().join(format!("{}.html", stem)).is_file() {
        return RenderProbe::Rendered;
    }

    let mut stderr = String::new();
    if let Some(mut pipe) = child.stderr.take() {
        let _ = pipe.read_to_string(&mut stderr);
    }
    let message = if stderr.trim().is_empty() {
        "document conversion produced no output".to_string()
    } else {
        stderr.trim().to_string()
    };
    RenderProbe::Failed(message)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unsupported_extension_fails_fast() {
        let probe = probe_render(Path::new("file.txt"), Duration::from_secs(1));
        assert!(matches!(probe, RenderProbe::Failed(_)));
    }
}
