//! Shader subsystem error handling
//!
//! One error enum for every failure the shader layer can surface, plus small
//! helpers so call sites can attach a path or context without `unwrap()`.

use std::io;
use std::path::{Path, PathBuf};

use crate::descriptor::StageKind;
use crate::value::ValueType;

/// Type alias for shader operation results
pub type ShaderResult<T> = Result<T, ShaderError>;

#[derive(Debug, thiserror::Error)]
pub enum ShaderError {
    #[error("File not found: {}", path.display())]
    FileNotFound { path: PathBuf },

    #[error("IO error on {path}: {error}")]
    IoError { path: String, error: String },

    #[error("Malformed shader descriptor {path}: {error}")]
    JsonParseError { path: String, error: String },

    #[error("Invalid shader descriptor {path}: {reason}")]
    InvalidDescriptor { path: String, reason: String },

    #[error("{stage} stage of '{shader}' failed to compile:\n{log}")]
    StageCompileError {
        shader: String,
        stage: StageKind,
        log: String,
    },

    #[error("Program '{shader}' failed to link:\n{log}")]
    LinkError { shader: String, log: String },

    #[error("Name not found: {name}")]
    NameNotFound { name: String },

    #[error("Type mismatch for '{name}': slot holds {expected}, got {actual}")]
    TypeMismatch {
        name: String,
        expected: ValueType,
        actual: ValueType,
    },

    #[error("Define '{name}' cannot be {value}: GLSL has no literal for non-finite floats")]
    InvalidDefineValue { name: String, value: String },

    #[error("Invalid program '{shader}': last compile did not succeed")]
    InvalidProgram { shader: String },

    #[error("Driver operation '{operation}' failed: {error}")]
    DriverError { operation: String, error: String },

    #[error("Config error in {path}: {error}")]
    ConfigError { path: String, error: String },

    #[error("File watch error on {path}: {error}")]
    WatchError { path: String, error: String },
}

/// Attach a file path to an `io::Error`, keeping "not found" distinguishable.
pub trait IoErrorContext<T> {
    fn io_context(self, path: &Path) -> ShaderResult<T>;
}

impl<T> IoErrorContext<T> for Result<T, io::Error> {
    fn io_context(self, path: &Path) -> ShaderResult<T> {
        self.map_err(|e| match e.kind() {
            io::ErrorKind::NotFound => ShaderError::FileNotFound {
                path: path.to_path_buf(),
            },
            _ => ShaderError::IoError {
                path: path.display().to_string(),
                error: e.to_string(),
            },
        })
    }
}

/// Create a driver error for a failed object creation or similar call
pub fn driver_error(operation: &str, error: impl std::fmt::Display) -> ShaderError {
    ShaderError::DriverError {
        operation: operation.to_string(),
        error: error.to_string(),
    }
}

/// Create an invalid-descriptor error
pub fn invalid_descriptor(path: &Path, reason: impl std::fmt::Display) -> ShaderError {
    ShaderError::InvalidDescriptor {
        path: path.display().to_string(),
        reason: reason.to_string(),
    }
}

pub fn name_not_found(name: &str) -> ShaderError {
    ShaderError::NameNotFound {
        name: name.to_string(),
    }
}
