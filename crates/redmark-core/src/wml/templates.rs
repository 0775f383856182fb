//! Minimal skeletons for the comment-related parts, created on first use,
//! plus the markup fragments appended to them for each new comment.

use std::borrow::Cow;

pub const COMMENTS_XML: &str = concat!(
    r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>"#,
    "\n",
    r#"<w:comments xmlns:mc="http://schemas.openxmlformats.org/markup-compatibility/2006" "#,
    r#"xmlns:w="http://schemas.openxmlformats.org/wordprocessingml/2006/main" "#,
    r#"xmlns:w14="http://schemas.microsoft.com/office/word/2010/wordml" "#,
    r#"mc:Ignorable="w14">"#,
    "\n",
    r#"</w:comments>"#
);

pub const COMMENTS_EXTENDED_XML: &str = concat!(
    r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>"#,
    "\n",
    r#"<w15:commentsEx xmlns:mc="http://schemas.openxmlformats.org/markup-compatibility/2006" "#,
    r#"xmlns:w15="http://schemas.microsoft.com/office/word/2012/wordml" "#,
    r#"mc:Ignorable="w15">"#,
    "\n",
    r#"</w15:commentsEx>"#
);

pub const COMMENTS_IDS_XML: &str = concat!(
    r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>"#,
    "\n",
    r#"<w16cid:commentsIds xmlns:mc="http://schemas.openxmlformats.org/markup-compatibility/2006" "#,
    r#"xmlns:w16cid="http://schemas.microsoft.com/office/word/2016/wordml/cid" "#,
    r#"mc:Ignorable="w16cid">"#,
    "\n",
    r#"</w16cid:commentsIds>"#
);

pub const COMMENTS_EXTENSIBLE_XML: &str = concat!(
    r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>"#,
    "\n",
    r#"<w16cex:commentsExtensible xmlns:mc="http://schemas.openxmlformats.org/markup-compatibility/2006" "#,
    r#"xmlns:w16cex="http://schemas.microsoft.com/office/word/2018/wordml/cex" "#,
    r#"mc:Ignorable="w16cex">"#,
    "\n",
    r#"</w16cex:commentsExtensible>"#
);

pub const PEOPLE_XML: &str = concat!(
    r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>"#,
    "\n",
    r#"<w15:people xmlns:mc="http://schemas.openxmlformats.org/markup-compatibility/2006" "#,
    r#"xmlns:w15="http://schemas.microsoft.com/office/word/2012/wordml" "#,
    r#"mc:Ignorable="w15">"#,
    "\n",
    r#"</w15:people>"#
);

fn escape_xml(text: &str) -> Cow<'_, str> {
    quick_xml::escape::escape(text)
}

pub fn comment_range_start(comment_id: u32) -> String {
    format!("<w:commentRangeStart w:id=\"{}\"/>", comment_id)
}

/// Range end plus the reference run that renders the comment anchor.
/// RSIDs on the run are filled in by the attribute injection walk.
pub fn comment_range_end_with_ref(comment_id: u32) -> String {
    format!(
        concat!(
            "<w:commentRangeEnd w:id=\"{id}\"/>",
            "<w:r>",
            "<w:rPr><w:rStyle w:val=\"CommentReference\"/></w:rPr>",
            "<w:commentReference w:id=\"{id}\"/>",
            "</w:r>"
        ),
        id = comment_id
    )
}

pub fn comment_range_end(comment_id: u32) -> String {
    format!("<w:commentRangeEnd w:id=\"{}\"/>", comment_id)
}

pub fn comment_reference_run(comment_id: u32) -> String {
    format!(
        concat!(
            "<w:r>",
            "<w:rPr><w:rStyle w:val=\"CommentReference\"/></w:rPr>",
            "<w:commentReference w:id=\"{id}\"/>",
            "</w:r>"
        ),
        id = comment_id
    )
}

/// Comment body for comments.xml. Author, date, and initials on the
/// `w:comment` element are filled in by the attribute injection walk.
pub fn comment_body(comment_id: u32, para_id: &str, text: &str) -> String {
    format!(
        concat!(
            "<w:comment w:id=\"{id}\">",
            "<w:p w14:paraId=\"{para_id}\" w14:textId=\"77777777\">",
            "<w:r><w:rPr><w:rStyle w:val=\"CommentReference\"/></w:rPr><w:annotationRef/></w:r>",
            "<w:r><w:rPr><w:color w:val=\"000000\"/><w:sz w:val=\"20\"/><w:szCs w:val=\"20\"/></w:rPr>",
            "<w:t>{text}</w:t></w:r>",
            "</w:p>",
            "</w:comment>"
        ),
        id = comment_id,
        para_id = para_id,
        text = escape_xml(text)
    )
}

pub fn comment_extended_entry(para_id: &str, parent_para_id: Option<&str>) -> String {
    match parent_para_id {
        Some(parent) => format!(
            "<w15:commentEx w15:paraId=\"{}\" w15:paraIdParent=\"{}\" w15:done=\"0\"/>",
            para_id, parent
        ),
        None => format!("<w15:commentEx w15:paraId=\"{}\" w15:done=\"0\"/>", para_id),
    }
}

pub fn comment_id_entry(para_id: &str, durable_id: &str) -> String {
    format!(
        "<w16cid:commentId w16cid:paraId=\"{}\" w16cid:durableId=\"{}\"/>",
        para_id, durable_id
    )
}

pub fn comment_extensible_entry(durable_id: &str) -> String {
    format!(
        "<w16cex:commentExtensible w16cex:durableId=\"{}\"/>",
        durable_id
    )
}

pub fn person_entry(author: &str) -> String {
    let escaped = escape_xml(author);
    format!(
        concat!(
            "<w15:person w15:author=\"{author}\">",
            "<w15:presenceInfo w15:providerId=\"None\" w15:userId=\"{author}\"/>",
            "</w15:person>"
        ),
        author = escaped
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::xml::parser::parse;

    #[test]
    fn templates_are_well_formed() {
        for template in [
            COMMENTS_XML,
            COMMENTS_EXTENDED_XML,
            COMMENTS_IDS_XML,
            COMMENTS_EXTENSIBLE_XML,
            PEOPLE_XML,
        ] {
            parse(template).unwrap();
        }
    }

    #[test]
    fn comment_body_escapes_markup_in_text() {
        let xml = comment_body(0, "12AB34CD", "a < b & c");
        assert!(xml.contains("a &lt; b &amp; c"));
        parse(&format!(
            r#"<root xmlns:w="urn:w" xmlns:w14="urn:w14">{}</root>"#,
            xml
        ))
        .unwrap();
    }

    #[test]
    fn person_entry_escapes_author() {
        let xml = person_entry(r#"O"Brien & Co"#);
        assert!(xml.contains("&quot;"));
        assert!(xml.contains("&amp;"));
    }
}
