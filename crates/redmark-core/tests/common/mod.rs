//! Shared fixture: a minimal but relationship-complete unpacked DOCX.

use std::fs;
use std::path::Path;

pub const DEFAULT_BODY: &str = concat!(
    "    <w:p>\n",
    "      <w:r>\n",
    "        <w:t>Hello world</w:t>\n",
    "      </w:r>\n",
    "    </w:p>\n",
    "    <w:p>\n",
    "      <w:r>\n",
    "        <w:t>Second paragraph</w:t>\n",
    "      </w:r>\n",
    "    </w:p>\n"
);

/// Write an unpacked Word package with every part referenced and every
/// declarable part carrying a content type.
pub fn write_unpacked_docx(dir: &Path, body: &str) {
    fs::create_dir_all(dir.join("word/_rels")).unwrap();
    fs::create_dir_all(dir.join("_rels")).unwrap();

    fs::write(
        dir.join("[Content_Types].xml"),
        concat!(
            r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>"#,
            "\n",
            r#"<Types xmlns="http://schemas.openxmlformats.org/package/2006/content-types">"#,
            "\n",
            r#"  <Default Extension="rels" ContentType="application/vnd.openxmlformats-package.relationships+xml"/>"#,
            "\n",
            r#"  <Default Extension="xml" ContentType="application/xml"/>"#,
            "\n",
            r#"  <Override PartName="/word/document.xml" ContentType="application/vnd.openxmlformats-officedocument.wordprocessingml.document.main+xml"/>"#,
            "\n",
            r#"</Types>"#
        ),
    )
    .unwrap();

    fs::write(
        dir.join("_rels/.rels"),
        concat!(
            r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>"#,
            "\n",
            r#"<Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships">"#,
            "\n",
            r#"  <Relationship Id="rId1" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/officeDocument" Target="word/document.xml"/>"#,
            "\n",
            r#"</Relationships>"#
        ),
    )
    .unwrap();

    fs::write(
        dir.join("word/_rels/document.xml.rels"),
        concat!(
            r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>"#,
            "\n",
            r#"<Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships">"#,
            "\n",
            r#"  <Relationship Id="rId1" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/settings" Target="settings.xml"/>"#,
            "\n",
            r#"</Relationships>"#
        ),
    )
    .unwrap();

    fs::write(
        dir.join("word/settings.xml"),
        concat!(
            r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>"#,
            "\n",
            r#"<w:settings xmlns:w="http://schemas.openxmlformats.org/wordprocessingml/2006/main">"#,
            "\n",
            r#"  <w:defaultTabStop w:val="720"/>"#,
            "\n",
            r#"</w:settings>"#
        ),
    )
    .unwrap();

    fs::write(
        dir.join("word/document.xml"),
        format!(
            concat!(
                r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>"#,
                "\n",
                r#"<w:document xmlns:w="http://schemas.openxmlformats.org/wordprocessingml/2006/main">"#,
                "\n",
                "  <w:body>\n{}  </w:body>\n",
                r#"</w:document>"#
            ),
            body
        ),
    )
    .unwrap();
}
