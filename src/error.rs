use std::fmt;

use crate::length::LengthUnit;

#[derive(Debug)]
pub enum SvgError {
    MalformedLength(String),
    UnsupportedUnit(LengthUnit),
    UnsupportedClipPath(String),
    UnknownPaintReference(String),
    CyclicReference(String),
    InvalidDocument(String),
    Backend(String),
    Xml(roxmltree::Error),
}

impl fmt::Display for SvgError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SvgError::MalformedLength(raw) => write!(f, "malformed length: {:?}", raw),
            SvgError::UnsupportedUnit(unit) => {
                write!(f, "unsupported length unit: {}", unit.suffix())
            }
            SvgError::UnsupportedClipPath(message) => {
                write!(f, "unsupported clip-path: {}", message)
            }
            SvgError::UnknownPaintReference(uri) => {
                write!(f, "paint reference is not a gradient: {}", uri)
            }
            SvgError::CyclicReference(message) => write!(f, "cyclic use reference: {}", message),
            SvgError::InvalidDocument(message) => write!(f, "invalid document: {}", message),
            SvgError::Backend(message) => write!(f, "drawing backend error: {}", message),
            SvgError::Xml(err) => write!(f, "xml error: {}", err),
        }
    }
}

impl std::error::Error for SvgError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            SvgError::Xml(err) => Some(err),
            _ => None,
        }
    }
}

impl From<roxmltree::Error> for SvgError {
    fn from(value: roxmltree::Error) -> Self {
        SvgError::Xml(value)
    }
}
