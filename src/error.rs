use thiserror::Error;

/// Errors surfaced while loading, rendering or exporting site data.
///
/// Record-level problems (unknown class ids, non-numeric scores, bad event
/// timestamps) are not errors; they degrade to placeholder values.
#[derive(Error, Debug)]
pub enum SiteError {
    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("HTTP {status} for {url}")]
    Status { status: u16, url: String },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("Template error: {0}")]
    Template(#[from] handlebars::TemplateError),

    #[error("Render error: {0}")]
    Render(#[from] handlebars::RenderError),

    #[error("Invalid event: {0}")]
    InvalidEvent(String),

    #[error("Invalid config: {0}")]
    InvalidConfig(String),

    #[error("Missing required columns: {0}")]
    MissingColumn(String),
}

pub type Result<T> = std::result::Result<T, SiteError>;
