use thiserror::Error;

/// Errors raised while turning an annotation into an export payload.
///
/// Missing datapoints and empty groups are not errors; they degrade to
/// placeholders inside the mapper.
#[derive(Error, Debug)]
pub enum ExportError {
    #[error("invalid export configuration: {0}")]
    Config(String),

    #[error("malformed JSON configuration: {0}")]
    ConfigFormat(#[from] serde_json::Error),

    #[error("malformed YAML configuration: {0}")]
    ConfigYaml(#[from] serde_yaml::Error),

    #[error("invalid annotation id: {0}")]
    AnnotationId(String),

    #[error("invalid XML element name: {0:?}")]
    InvalidTagName(String),

    #[error("failed to write XML: {0}")]
    Xml(#[from] quick_xml::Error),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error("generated XML is not valid UTF-8")]
    Utf8(#[from] std::string::FromUtf8Error),
}
