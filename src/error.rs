use std::fmt;

use thiserror::Error;

pub type ConvertResult<T> = Result<T, ConvertError>;

#[derive(Error, Debug)]
pub enum ConvertError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Data error: {0}")]
    Data(String),

    #[error("Sheet '{0}' not found in reference workbook")]
    NotFound(String),

    #[error("Invalid xlsx package: {0}")]
    Zip(#[from] zip::result::ZipError),

    #[error("XML error in {part}: {message}")]
    Xml { part: String, message: String },

    #[error("Failed to read workbook: {0}")]
    Read(#[from] calamine::XlsxError),

    #[error("Failed to write workbook: {0}")]
    Write(#[from] rust_xlsxwriter::XlsxError),

    #[error("Workbook error: {0}")]
    Workbook(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Template fetch error: {0}")]
    Fetch(String),

    #[error(transparent)]
    Conversion(Box<ConversionError>),
}

impl From<ConversionError> for ConvertError {
    fn from(err: ConversionError) -> Self {
        ConvertError::Conversion(Box::new(err))
    }
}

impl ConvertError {
    /// Shorthand for a data error tied to a source row (1-based sheet row).
    pub fn data_at(row: usize, message: impl fmt::Display) -> Self {
        ConvertError::Data(format!("row {}: {}", row, message))
    }
}

/// Conversion step that was running when a [`ConversionError`] was raised.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    ReadSource,
    LoadTemplate,
    BuildOrders,
    BuildWorkpieces,
    Serialize,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Stage::ReadSource => "reading source table",
            Stage::LoadTemplate => "loading reference workbook",
            Stage::BuildOrders => "building order entry workbook",
            Stage::BuildWorkpieces => "building workpiece workbook",
            Stage::Serialize => "serializing workbooks",
        };
        f.write_str(label)
    }
}

/// The single error surfaced by a conversion run.
#[derive(Error, Debug)]
#[error("Conversion failed while {stage}: {source}")]
pub struct ConversionError {
    pub stage: Stage,
    #[source]
    pub source: ConvertError,
}

impl ConversionError {
    pub fn new(stage: Stage, source: ConvertError) -> Self {
        Self { stage, source }
    }

    /// True when the cause is bad source data rather than an internal failure.
    pub fn is_data_error(&self) -> bool {
        matches!(
            self.source,
            ConvertError::Data(_) | ConvertError::NotFound(_)
        )
    }
}

/// Extension for attaching a [`Stage`] to a fallible step.
pub trait StageContext<T> {
    fn stage(self, stage: Stage) -> Result<T, ConversionError>;
}

impl<T> StageContext<T> for ConvertResult<T> {
    fn stage(self, stage: Stage) -> Result<T, ConversionError> {
        self.map_err(|e| ConversionError::new(stage, e))
    }
}
