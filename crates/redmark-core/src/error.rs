use thiserror::Error;

#[derive(Error, Debug)]
pub enum RedmarkError {
    #[error("XML parsing error at {location}: {message}")]
    XmlParse { message: String, location: String },

    #[error("XML serialization error: {0}")]
    XmlWrite(String),

    #[error("XML part not found: {0}")]
    MissingPart(String),

    #[error("{0}")]
    NodeNotFound(String),

    #[error("{0}")]
    AmbiguousNode(String),

    #[error("Fragment must contain at least one element")]
    EmptyFragment,

    #[error("Invalid tracked change: {0}")]
    InvalidTrackedChange(String),

    #[error("Parent comment not found: id={0}")]
    ParentNotFound(u32),

    #[error("Invalid package: {message}")]
    InvalidPackage { message: String },

    #[error("Validation failed:\n{report}")]
    ValidationFailed { report: String },

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Zip(#[from] zip::result::ZipError),
}

pub type Result<T> = std::result::Result<T, RedmarkError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_display_formats_correctly() {
        let err = RedmarkError::MissingPart("word/comments.xml".to_string());
        assert_eq!(err.to_string(), "XML part not found: word/comments.xml");
    }

    #[test]
    fn parent_not_found_carries_id() {
        let err = RedmarkError::ParentNotFound(7);
        assert_eq!(err.to_string(), "Parent comment not found: id=7");
    }
}
