use thiserror::Error;
use std::io;

#[derive(Debug, Error)]
pub enum OglError {
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    #[error("Failed to parse configuration: {0}")]
    TomlDe(#[from] toml::de::Error),

    #[error("Failed to write configuration: {0}")]
    TomlSer(#[from] toml::ser::Error),

    #[error("XML error: {0}")]
    Xml(String),

    #[error("Bad value {value:?} for attribute '{attribute}' of <{element}>")]
    Attribute {
        element: String,
        attribute: String,
        value: String,
    },

    #[error("Unexpected element <{0}>")]
    UnknownElement(String),

    #[error("Collection out of range: {0}")]
    InvalidCollection(i32),

    #[error("Color table out of range: {0}")]
    InvalidClut(i32),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Image error: {0}")]
    Image(#[from] image::ImageError),

    #[error("No OpenGL context is loaded")]
    NoContext,

    #[error("Model loading failed: {0}")]
    ModelLoad(String),
}

impl From<quick_xml::Error> for OglError {
    fn from(err: quick_xml::Error) -> Self {
        OglError::Xml(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, OglError>;
