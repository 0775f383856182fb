mod common;

use redmark_core::editor::NodeQuery;
use redmark_core::error::RedmarkError;
use redmark_core::package::{PackageDocument, PackageOptions};

fn options() -> PackageOptions {
    PackageOptions::new().with_author("Tester").with_initials("T")
}

#[test]
fn tracked_deletion_session_saves_and_validates() {
    let dir = tempfile::tempdir().unwrap();
    common::write_unpacked_docx(dir.path(), common::DEFAULT_BODY);
    let out = tempfile::tempdir().unwrap();
    let destination = out.path().join("saved");

    let mut doc = PackageDocument::open(dir.path(), options()).unwrap();

    let run = doc
        .part("word/document.xml")
        .unwrap()
        .find(&NodeQuery::tag("w:r").containing("Second paragraph"))
        .unwrap();
    doc.part("word/document.xml")
        .unwrap()
        .suggest_deletion(run)
        .unwrap();

    doc.save(Some(&destination), true).unwrap();

    let saved = std::fs::read_to_string(destination.join("word/document.xml")).unwrap();
    assert!(saved.contains("<w:del "));
    assert!(saved.contains("w:author=\"Tester\""));
    assert!(saved.contains("<w:delText>Second paragraph</w:delText>"));
}

#[test]
fn tracked_rewrite_round_trip_validates() {
    let dir = tempfile::tempdir().unwrap();
    common::write_unpacked_docx(dir.path(), common::DEFAULT_BODY);
    let out = tempfile::tempdir().unwrap();
    let destination = out.path().join("saved");

    let mut doc = PackageDocument::open(dir.path(), options()).unwrap();
    {
        let document = doc.part("word/document.xml").unwrap();
        let run = document
            .find(&NodeQuery::tag("w:r").containing("Hello world"))
            .unwrap();
        // replace "Hello world" with a deletion of the old text plus an
        // insertion of the new, the way a tracked rewrite looks
        let wrapper = document.suggest_deletion(run).unwrap();
        document
            .insert_after(wrapper, "<w:ins><w:r><w:t>Hello brave world</w:t></w:r></w:ins>")
            .unwrap();
    }

    doc.save(Some(&destination), true).unwrap();

    let saved = std::fs::read_to_string(destination.join("word/document.xml")).unwrap();
    assert!(saved.contains("Hello brave world"));
    assert!(saved.contains("<w:delText>Hello world</w:delText>"));
}

#[test]
fn untracked_edit_alongside_tracked_changes_fails_validation() {
    let dir = tempfile::tempdir().unwrap();
    common::write_unpacked_docx(dir.path(), common::DEFAULT_BODY);

    let mut doc = PackageDocument::open(dir.path(), options()).unwrap();
    {
        let document = doc.part("word/document.xml").unwrap();

        // one legitimate tracked change, so redlining has work to do
        let run = document
            .find(&NodeQuery::tag("w:r").containing("Second paragraph"))
            .unwrap();
        document.suggest_deletion(run).unwrap();

        // and one out-of-band edit that no tracked change records
        let other = document
            .find(&NodeQuery::tag("w:r").containing("Hello world"))
            .unwrap();
        document
            .replace_node(other, "<w:r><w:t>Hello sneaky world</w:t></w:r>")
            .unwrap();
    }

    let err = doc.save(None, true).unwrap_err();
    let RedmarkError::ValidationFailed { report } = err else {
        panic!("expected ValidationFailed, got: {err}");
    };
    assert!(report.contains("tracked changes"), "{report}");
    // the diff pinpoints the unauthorized rewording
    assert!(report.contains("sneaky"), "{report}");
}

#[test]
fn validation_failure_prevents_writing_the_destination() {
    let dir = tempfile::tempdir().unwrap();
    common::write_unpacked_docx(dir.path(), common::DEFAULT_BODY);
    let out = tempfile::tempdir().unwrap();
    let destination = out.path().join("saved");

    let mut doc = PackageDocument::open(dir.path(), options()).unwrap();
    {
        let document = doc.part("word/document.xml").unwrap();
        let run = document
            .find(&NodeQuery::tag("w:r").containing("Second paragraph"))
            .unwrap();
        document.suggest_deletion(run).unwrap();
        let other = document
            .find(&NodeQuery::tag("w:r").containing("Hello world"))
            .unwrap();
        document
            .replace_node(other, "<w:r><w:t>changed outside tracking</w:t></w:r>")
            .unwrap();
    }

    assert!(doc.save(Some(&destination), true).is_err());
    assert!(!destination.exists(), "failed save must not partially write");
}

#[test]
fn session_workspace_is_removed_on_drop() {
    let dir = tempfile::tempdir().unwrap();
    common::write_unpacked_docx(dir.path(), common::DEFAULT_BODY);

    let workspace;
    {
        let doc = PackageDocument::open(dir.path(), options()).unwrap();
        workspace = doc.working_dir().to_path_buf();
        assert!(workspace.is_dir());
    }
    assert!(!workspace.exists());
}

#[test]
fn settings_gain_session_rsid_and_optional_tracking_flag() {
    let dir = tempfile::tempdir().unwrap();
    common::write_unpacked_docx(dir.path(), common::DEFAULT_BODY);
    let out = tempfile::tempdir().unwrap();
    let destination = out.path().join("saved");

    let mut doc = PackageDocument::open(
        dir.path(),
        options().with_rsid("00C0FFEE").with_track_revisions(true),
    )
    .unwrap();
    doc.save(Some(&destination), true).unwrap();

    let settings = std::fs::read_to_string(destination.join("word/settings.xml")).unwrap();
    assert!(settings.contains("<w:rsidRoot w:val=\"00C0FFEE\"/>"));
    assert!(settings.contains("<w:trackRevisions/>"));
    // trackRevisions is placed before defaultTabStop per schema order
    let track_at = settings.find("<w:trackRevisions/>").unwrap();
    let tab_at = settings.find("<w:defaultTabStop").unwrap();
    assert!(track_at < tab_at);
}
