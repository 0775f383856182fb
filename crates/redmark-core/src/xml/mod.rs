pub mod arena;
pub mod builder;
pub mod namespaces;
pub mod node;
pub mod parser;
pub mod xname;

pub use arena::XmlDocument;
pub use node::{SourcePos, XmlNodeData};
pub use parser::XmlEncoding;
pub use xname::{XAttribute, XName};
