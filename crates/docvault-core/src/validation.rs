use crate::constants::PDF_SIGNATURE;

/// Upload validation errors
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    #[error("File too large: {size} bytes (max: {max} bytes)")]
    FileTooLarge { size: usize, max: usize },

    #[error("Empty file")]
    EmptyFile,

    #[error("File is not a PDF document")]
    InvalidSignature,
}

/// Upload validator
///
/// Runs before any session, blob or row is touched, so a rejected upload has
/// no side effect.
#[derive(Debug, Clone, Copy)]
pub struct UploadValidator {
    max_file_size: usize,
}

impl UploadValidator {
    pub fn new(max_file_size: usize) -> Self {
        Self { max_file_size }
    }

    pub fn max_file_size(&self) -> usize {
        self.max_file_size
    }

    /// Validate declared or buffered size. The ceiling is inclusive.
    pub fn validate_file_size(&self, size: usize) -> Result<(), ValidationError> {
        if size == 0 {
            return Err(ValidationError::EmptyFile);
        }

        if size > self.max_file_size {
            return Err(ValidationError::FileTooLarge {
                size,
                max: self.max_file_size,
            });
        }

        Ok(())
    }

    /// Validate the `%PDF-` signature.
    pub fn validate_signature(&self, data: &[u8]) -> Result<(), ValidationError> {
        if data.starts_with(PDF_SIGNATURE) {
            Ok(())
        } else {
            Err(ValidationError::InvalidSignature)
        }
    }

    /// Size first, then signature.
    pub fn validate(&self, data: &[u8]) -> Result<(), ValidationError> {
        self.validate_file_size(data.len())?;
        self.validate_signature(data)
    }
}
