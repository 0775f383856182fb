mod editor;
mod inject;
pub mod templates;
mod transforms;

pub use editor::DocxPart;
pub use inject::{
    ensure_namespace, generate_hex_id, generate_rsid, inject_tracked_attributes, next_change_id,
    utc_timestamp, RevisionContext,
};
pub use transforms::suggest_paragraph;
