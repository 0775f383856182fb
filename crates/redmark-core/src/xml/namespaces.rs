#![allow(non_snake_case)]

use super::xname::XName;

pub mod W {
    use super::XName;
    pub const NS: &str = "http://schemas.openxmlformats.org/wordprocessingml/2006/main";

    pub fn document() -> XName { XName::new(NS, "document") }
    pub fn body() -> XName { XName::new(NS, "body") }
    pub fn p() -> XName { XName::new(NS, "p") }
    pub fn r() -> XName { XName::new(NS, "r") }
    pub fn t() -> XName { XName::new(NS, "t") }
    pub fn pPr() -> XName { XName::new(NS, "pPr") }
    pub fn rPr() -> XName { XName::new(NS, "rPr") }
    pub fn numPr() -> XName { XName::new(NS, "numPr") }
    pub fn ins() -> XName { XName::new(NS, "ins") }
    pub fn del() -> XName { XName::new(NS, "del") }
    pub fn delText() -> XName { XName::new(NS, "delText") }
    pub fn comment() -> XName { XName::new(NS, "comment") }
    pub fn comments() -> XName { XName::new(NS, "comments") }
    pub fn commentRangeStart() -> XName { XName::new(NS, "commentRangeStart") }
    pub fn commentRangeEnd() -> XName { XName::new(NS, "commentRangeEnd") }
    pub fn commentReference() -> XName { XName::new(NS, "commentReference") }
    pub fn settings() -> XName { XName::new(NS, "settings") }
    pub fn trackRevisions() -> XName { XName::new(NS, "trackRevisions") }
    pub fn documentProtection() -> XName { XName::new(NS, "documentProtection") }
    pub fn defaultTabStop() -> XName { XName::new(NS, "defaultTabStop") }
    pub fn compat() -> XName { XName::new(NS, "compat") }
    pub fn clrSchemeMapping() -> XName { XName::new(NS, "clrSchemeMapping") }
    pub fn rsids() -> XName { XName::new(NS, "rsids") }
    pub fn rsidRoot() -> XName { XName::new(NS, "rsidRoot") }
    pub fn rsid() -> XName { XName::new(NS, "rsid") }
    pub fn id() -> XName { XName::new(NS, "id") }
    pub fn author() -> XName { XName::new(NS, "author") }
    pub fn date() -> XName { XName::new(NS, "date") }
    pub fn initials() -> XName { XName::new(NS, "initials") }
    pub fn val() -> XName { XName::new(NS, "val") }
    // rsid attributes (revision session IDs)
    pub fn rsidR() -> XName { XName::new(NS, "rsidR") }
    pub fn rsidRDefault() -> XName { XName::new(NS, "rsidRDefault") }
    pub fn rsidP() -> XName { XName::new(NS, "rsidP") }
    pub fn rsidDel() -> XName { XName::new(NS, "rsidDel") }
}

pub mod W14 {
    use super::XName;
    pub const NS: &str = "http://schemas.microsoft.com/office/word/2010/wordml";

    pub fn paraId() -> XName { XName::new(NS, "paraId") }
    pub fn textId() -> XName { XName::new(NS, "textId") }
}

pub mod W15 {
    use super::XName;
    pub const NS: &str = "http://schemas.microsoft.com/office/word/2012/wordml";

    pub fn people() -> XName { XName::new(NS, "people") }
    pub fn person() -> XName { XName::new(NS, "person") }
    pub fn presenceInfo() -> XName { XName::new(NS, "presenceInfo") }
    pub fn author() -> XName { XName::new(NS, "author") }
    pub fn commentsEx() -> XName { XName::new(NS, "commentsEx") }
    pub fn commentEx() -> XName { XName::new(NS, "commentEx") }
    pub fn paraId() -> XName { XName::new(NS, "paraId") }
    pub fn paraIdParent() -> XName { XName::new(NS, "paraIdParent") }
    pub fn done() -> XName { XName::new(NS, "done") }
}

pub mod W16CID {
    use super::XName;
    pub const NS: &str = "http://schemas.microsoft.com/office/word/2016/wordml/cid";

    pub fn commentsIds() -> XName { XName::new(NS, "commentsIds") }
    pub fn commentId() -> XName { XName::new(NS, "commentId") }
    pub fn paraId() -> XName { XName::new(NS, "paraId") }
    pub fn durableId() -> XName { XName::new(NS, "durableId") }
}

pub mod W16CEX {
    use super::XName;
    pub const NS: &str = "http://schemas.microsoft.com/office/word/2018/wordml/cex";

    pub fn commentsExtensible() -> XName { XName::new(NS, "commentsExtensible") }
    pub fn commentExtensible() -> XName { XName::new(NS, "commentExtensible") }
    pub fn durableId() -> XName { XName::new(NS, "durableId") }
    pub fn dateUtc() -> XName { XName::new(NS, "dateUtc") }
}

pub mod W16DU {
    use super::XName;
    pub const NS: &str = "http://schemas.microsoft.com/office/word/2023/wordml/word16du";

    pub fn dateUtc() -> XName { XName::new(NS, "dateUtc") }
}

pub mod MC {
    use super::XName;
    pub const NS: &str = "http://schemas.openxmlformats.org/markup-compatibility/2006";

    pub fn AlternateContent() -> XName { XName::new(NS, "AlternateContent") }
    pub fn Ignorable() -> XName { XName::new(NS, "Ignorable") }
}

pub mod XML {
    use super::XName;
    pub const NS: &str = "http://www.w3.org/XML/1998/namespace";

    pub fn space() -> XName { XName::new(NS, "space") }
}

pub mod R {
    use super::XName;
    pub const NS: &str = "http://schemas.openxmlformats.org/officeDocument/2006/relationships";

    pub fn id() -> XName { XName::new(NS, "id") }
}

pub mod PKG_REL {
    use super::XName;
    pub const NS: &str = "http://schemas.openxmlformats.org/package/2006/relationships";

    pub fn Relationship() -> XName { XName::new(NS, "Relationship") }
}

pub mod CT {
    use super::XName;
    pub const NS: &str = "http://schemas.openxmlformats.org/package/2006/content-types";

    pub fn Override() -> XName { XName::new(NS, "Override") }
    pub fn Default() -> XName { XName::new(NS, "Default") }
}

/// Preferred serialization prefix for namespaces without an in-scope
/// declaration (used when serializing detached fragments).
pub fn default_prefix(namespace: &str) -> &'static str {
    match namespace {
        W::NS => "w",
        W14::NS => "w14",
        W15::NS => "w15",
        W16CID::NS => "w16cid",
        W16CEX::NS => "w16cex",
        W16DU::NS => "w16du",
        MC::NS => "mc",
        R::NS => "r",
        "http://schemas.openxmlformats.org/drawingml/2006/main" => "a",
        "http://schemas.openxmlformats.org/drawingml/2006/wordprocessingDrawing" => "wp",
        "http://schemas.openxmlformats.org/presentationml/2006/main" => "p",
        "http://schemas.openxmlformats.org/officeDocument/2006/math" => "m",
        super::xname::XMLNS_NS => "xmlns",
        XML::NS => "xml",
        _ => "ns",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn word_namespace_creates_valid_xnames() {
        let p = W::p();
        assert_eq!(p.namespace, Some(W::NS.to_string()));
        assert_eq!(p.local_name, "p");
    }

    #[test]
    fn default_prefixes_cover_word_extensions() {
        assert_eq!(default_prefix(W16DU::NS), "w16du");
        assert_eq!(default_prefix(XML::NS), "xml");
        assert_eq!(default_prefix("urn:unknown"), "ns");
    }
}
