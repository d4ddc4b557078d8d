//! Error types for the tutoring pipeline.

use reqwest::StatusCode;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, TutorError>;

/// Failures of a single call to the generative model.
#[derive(Error, Debug)]
pub enum GatewayError {
    /// The API answered with a non-success status.
    #[error("Gemini API error ({status}): {body}")]
    Api { status: StatusCode, body: String },

    /// The API answered successfully but without any text.
    #[error("No text content in response")]
    NoContent,

    /// The request never completed or the body could not be read.
    #[error("Gemini transport error: {0}")]
    Transport(#[from] reqwest::Error),
}

#[derive(Error, Debug)]
pub enum TutorError {
    #[error("Nothing to analyze: no files and no notes")]
    EmptySubmission,

    #[error("An analysis is already in progress")]
    AnalysisInFlight,

    #[error("No analysis available yet")]
    NoAnalysis,

    #[error("Question {0} does not exist")]
    QuestionNotFound(usize),

    #[error("Message is empty")]
    EmptyMessage,

    #[error("Slides are already being generated")]
    SlidesInFlight,

    #[error("File {0} does not exist")]
    FileNotFound(usize),

    #[error(transparent)]
    Gateway(#[from] GatewayError),

    #[error("Malformed model output: {0}")]
    Parse(#[from] serde_json::Error),
}

impl TutorError {
    /// Input the client should not have sent, as opposed to a state conflict
    /// or an upstream failure.
    pub fn is_rejected_input(&self) -> bool {
        matches!(
            self,
            TutorError::EmptySubmission
                | TutorError::QuestionNotFound(_)
                | TutorError::EmptyMessage
                | TutorError::FileNotFound(_)
        )
    }

    pub fn is_state_conflict(&self) -> bool {
        matches!(
            self,
            TutorError::AnalysisInFlight | TutorError::NoAnalysis | TutorError::SlidesInFlight
        )
    }
}
