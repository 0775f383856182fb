mod common;

use redmark_core::validation::DocxValidator;
use std::fs;

#[test]
fn clean_package_passes_all_checks() {
    let dir = tempfile::tempdir().unwrap();
    common::write_unpacked_docx(dir.path(), common::DEFAULT_BODY);

    let baseline = tempfile::tempdir().unwrap();
    let archive = baseline.path().join("original.docx");
    redmark_core::package::pack(dir.path(), &archive, false).unwrap();

    let outcome = DocxValidator::new(dir.path(), &archive).validate().unwrap();
    assert!(outcome.passed(), "{}", outcome.summary());
}

#[test]
fn broken_relationship_fails_and_reports_every_violation() {
    let dir = tempfile::tempdir().unwrap();
    common::write_unpacked_docx(dir.path(), common::DEFAULT_BODY);

    let baseline = tempfile::tempdir().unwrap();
    let archive = baseline.path().join("original.docx");
    redmark_core::package::pack(dir.path(), &archive, false).unwrap();

    // break the relationship graph in two independent ways
    fs::remove_file(dir.path().join("word/settings.xml")).unwrap();
    fs::write(dir.path().join("word/stray.xml"), "<stray/>").unwrap();

    let outcome = DocxValidator::new(dir.path(), &archive).validate().unwrap();
    assert!(!outcome.passed());
    let summary = outcome.summary();
    assert!(summary.contains("broken reference: settings.xml"), "{summary}");
    assert!(summary.contains("unreferenced file"), "{summary}");
}

#[cfg(feature = "xsd")]
mod xsd {
    use super::common;
    use redmark_core::validation::DocxValidator;
    use std::fs;
    use std::path::Path;

    /// A miniature schema for the Word main namespace: a body holds
    /// paragraphs of runs of text, nothing else.
    const STUB_WML_XSD: &str = concat!(
        r#"<?xml version="1.0" encoding="UTF-8"?>"#,
        "\n",
        r#"<xs:schema xmlns:xs="http://www.w3.org/2001/XMLSchema""#,
        r#" targetNamespace="http://schemas.openxmlformats.org/wordprocessingml/2006/main""#,
        r#" elementFormDefault="qualified">"#,
        r#"<xs:element name="document"><xs:complexType><xs:sequence>"#,
        r#"<xs:element name="body"><xs:complexType><xs:sequence>"#,
        r#"<xs:element name="p" minOccurs="0" maxOccurs="unbounded">"#,
        r#"<xs:complexType><xs:sequence>"#,
        r#"<xs:element name="r" minOccurs="0" maxOccurs="unbounded">"#,
        r#"<xs:complexType><xs:sequence>"#,
        r#"<xs:element name="t" type="xs:string" minOccurs="0"/>"#,
        r#"</xs:sequence></xs:complexType></xs:element>"#,
        r#"</xs:sequence></xs:complexType></xs:element>"#,
        r#"</xs:sequence></xs:complexType></xs:element>"#,
        r#"</xs:sequence></xs:complexType></xs:element>"#,
        r#"</xs:schema>"#
    );

    fn write_schemas(dir: &Path) {
        let schema_dir = dir.join("ISO-IEC29500-4_2016");
        fs::create_dir_all(&schema_dir).unwrap();
        fs::write(schema_dir.join("wml.xsd"), STUB_WML_XSD).unwrap();
    }

    fn xsd_failures(outcome: &redmark_core::validation::ValidationOutcome) -> Vec<String> {
        outcome
            .reports
            .iter()
            .filter(|r| r.description.contains("XSD"))
            .flat_map(|r| r.violations.iter().map(|v| v.message.clone()))
            .collect()
    }

    #[test]
    fn preexisting_schema_violations_are_not_regressions() {
        let dir = tempfile::tempdir().unwrap();
        // the baseline already violates the schema
        common::write_unpacked_docx(
            dir.path(),
            "    <w:p><w:r><w:t>fine</w:t></w:r></w:p>\n    <w:existingProblem/>\n",
        );

        let out = tempfile::tempdir().unwrap();
        let archive = out.path().join("original.docx");
        redmark_core::package::pack(dir.path(), &archive, false).unwrap();

        let schemas = tempfile::tempdir().unwrap();
        write_schemas(schemas.path());

        // unchanged working copy: the violation predates the session
        let outcome = DocxValidator::new(dir.path(), &archive)
            .with_schemas_dir(schemas.path())
            .validate()
            .unwrap();
        assert!(
            xsd_failures(&outcome).is_empty(),
            "{:?}",
            xsd_failures(&outcome)
        );
    }

    #[test]
    fn newly_introduced_schema_violation_is_the_only_one_reported() {
        let dir = tempfile::tempdir().unwrap();
        common::write_unpacked_docx(
            dir.path(),
            "    <w:p><w:r><w:t>fine</w:t></w:r></w:p>\n    <w:existingProblem/>\n",
        );

        let out = tempfile::tempdir().unwrap();
        let archive = out.path().join("original.docx");
        redmark_core::package::pack(dir.path(), &archive, false).unwrap();

        // the session introduces one more violation next to the old one
        common::write_unpacked_docx(
            dir.path(),
            concat!(
                "    <w:p><w:r><w:t>fine</w:t></w:r></w:p>\n",
                "    <w:existingProblem/>\n",
                "    <w:freshProblem/>\n"
            ),
        );

        let schemas = tempfile::tempdir().unwrap();
        write_schemas(schemas.path());

        let outcome = DocxValidator::new(dir.path(), &archive)
            .with_schemas_dir(schemas.path())
            .validate()
            .unwrap();

        let failures = xsd_failures(&outcome);
        assert_eq!(failures.len(), 1, "{failures:?}");
        assert!(failures[0].contains("freshProblem"), "{failures:?}");
    }
}
