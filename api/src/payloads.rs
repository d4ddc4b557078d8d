use serde::Deserialize;

#[derive(Deserialize)]
pub struct NotesPayload {
    pub notes: String,
}

#[derive(Deserialize)]
pub struct LanguagePayload {
    pub language: String,
}

#[derive(Deserialize)]
pub struct ChatPayload {
    pub message: String,
}
