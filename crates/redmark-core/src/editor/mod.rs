mod fragment;
mod part;
mod query;

pub use fragment::Fragment;
pub use part::XmlPart;
pub use query::{element_text, unescape_entities, LineFilter, NodeQuery, PrefixMap};
