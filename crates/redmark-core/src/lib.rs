pub mod editor;
pub mod error;
pub mod package;
pub mod validation;
pub mod wml;
pub mod xml;

pub use error::{RedmarkError, Result};

pub use editor::{NodeQuery, XmlPart};
pub use package::{PackageDocument, PackageOptions};
pub use validation::{DocxValidator, RedliningValidator};
pub use wml::{suggest_paragraph, DocxPart, RevisionContext};
