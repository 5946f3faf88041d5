use crate::assertion::ResolverFailure;
use crate::jvm;
use std::fmt;

#[derive(Debug)]
pub enum Error {
    /// A class file (inside an artifact or a module) could not be decoded
    MalformedClass(jvm::Error),

    /// Artifact bytes that are neither a jar nor a class file, or a jar that can't be read
    MalformedArtifact(String),

    /// The external artifact resolver failed
    Resolver(ResolverFailure),

    /// Version range expression that doesn't parse, or whose bounds are inverted
    InvalidRange(String),

    /// Artifact coordinate that isn't of the form `group:artifact[:version]`
    InvalidCoordinate(String),

    /// Class or member name that isn't a legal JVM name
    InvalidName(String),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::MalformedClass(err) => write!(f, "malformed class file: {}", err),
            Error::MalformedArtifact(msg) => write!(f, "malformed artifact: {}", msg),
            Error::Resolver(failure) => write!(f, "artifact resolution failed: {}", failure),
            Error::InvalidRange(msg) => write!(f, "invalid version range: {}", msg),
            Error::InvalidCoordinate(msg) => write!(f, "invalid artifact coordinate: {}", msg),
            Error::InvalidName(msg) => write!(f, "invalid name: {}", msg),
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Error::MalformedClass(err) => Some(err),
            Error::Resolver(failure) => Some(failure),
            _ => None,
        }
    }
}

impl From<jvm::Error> for Error {
    fn from(err: jvm::Error) -> Error {
        Error::MalformedClass(err)
    }
}

impl From<ResolverFailure> for Error {
    fn from(failure: ResolverFailure) -> Error {
        Error::Resolver(failure)
    }
}

impl From<zip::result::ZipError> for Error {
    fn from(err: zip::result::ZipError) -> Error {
        Error::MalformedArtifact(err.to_string())
    }
}
