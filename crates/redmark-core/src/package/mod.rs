pub mod archive;
pub mod convert;
mod document;

pub use archive::{pack, unpack};
pub use convert::{probe_render, RenderProbe};
pub use document::{PackageDocument, PackageOptions};

pub mod content_type_values {
    pub const DOCUMENT: &str =
        "application/vnd.openxmlformats-officedocument.wordprocessingml.document.main+xml";
    pub const COMMENTS: &str =
        "application/vnd.openxmlformats-officedocument.wordprocessingml.comments+xml";
    pub const COMMENTS_EXTENDED: &str =
        "application/vnd.openxmlformats-officedocument.wordprocessingml.commentsExtended+xml";
    pub const COMMENTS_IDS: &str =
        "application/vnd.openxmlformats-officedocument.wordprocessingml.commentsIds+xml";
    pub const COMMENTS_EXTENSIBLE: &str =
        "application/vnd.openxmlformats-officedocument.wordprocessingml.commentsExtensible+xml";
    pub const PEOPLE: &str =
        "application/vnd.openxmlformats-officedocument.wordprocessingml.people+xml";
}

pub mod relationship_types {
    pub const OFFICE_DOCUMENT: &str =
        "http://schemas.openxmlformats.org/officeDocument/2006/relationships/officeDocument";
    pub const COMMENTS: &str =
        "http://schemas.openxmlformats.org/officeDocument/2006/relationships/comments";
    pub const COMMENTS_EXTENDED: &str =
        "http://schemas.microsoft.com/office/2011/relationships/commentsExtended";
    pub const COMMENTS_IDS: &str =
        "http://schemas.microsoft.com/office/2016/09/relationships/commentsIds";
    pub const COMMENTS_EXTENSIBLE: &str =
        "http://schemas.microsoft.com/office/2018/08/relationships/commentsExtensible";
    pub const PEOPLE: &str = "http://schemas.microsoft.com/office/2011/relationships/people";
    pub const STYLES: &str =
        "http://schemas.openxmlformats.org/officeDocument/2006/relationships/styles";
    pub const SETTINGS: &str =
        "http://schemas.openxmlformats.org/officeDocument/2006/relationships/settings";
}
