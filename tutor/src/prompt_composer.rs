use crate::error::{Result, TutorError};
use crate::models::*;
use crate::schema;

const PERSONA: &str = r#"You are "El7ag" (الحاج), an expert academic tutor. Speak professionally with a friendly Egyptian spirit and teach like a university textbook.

FORMATTING RULES:
1. Write every mathematical expression with Unicode symbols, for example: ×, ÷, √, ², ³, ½, π, θ, ≤, ≥, ≠, ≈, ∞, ∑, ∫, →.
2. NEVER use LaTeX, dollar-sign delimiters or markup of any kind for math.
3. NEVER put math inside code blocks.
4. Keep each solution step to one idea."#;

const DEFAULT_ANALYZE_REQUEST: &str =
    "Analyze every question found in the attached material.";

/// Builds the requests for the three model operations plus free chat. Pure:
/// nothing here touches the network.
pub struct PromptComposer {
    system_instruction: String,
}

impl PromptComposer {
    pub fn new() -> Self {
        Self {
            system_instruction: PERSONA.to_string(),
        }
    }

    pub fn system_instruction(&self) -> &str {
        &self.system_instruction
    }

    /// Files first, then the notes. Fails before anything is sent when there
    /// is neither a file nor a non-blank note.
    pub fn analyze(
        &self,
        notes: &str,
        file_parts: &[ContentPart],
        file_count: usize,
    ) -> Result<ModelRequest> {
        if file_count == 0 && notes.trim().is_empty() {
            return Err(TutorError::EmptySubmission);
        }

        let mut parts: Vec<ContentPart> = file_parts
            .iter()
            .filter(|part| match part {
                ContentPart::Text { text } => !text.trim().is_empty(),
                ContentPart::InlineData { .. } => true,
            })
            .cloned()
            .collect();

        let request = if notes.trim().is_empty() {
            DEFAULT_ANALYZE_REQUEST
        } else {
            notes.trim()
        };
        parts.push(ContentPart::text(self.build_analysis_brief(request)));

        Ok(ModelRequest {
            system_instruction: self.system_instruction.clone(),
            history: Vec::new(),
            parts,
            response_schema: Some(schema::analysis_schema()),
        })
    }

    pub fn expand(
        &self,
        question: &QuestionAnalysis,
        language: Language,
        history: &[ChatMessage],
    ) -> ModelRequest {
        let content = question.localized(language);
        let prompt = format!(
            r#"I need a detailed explanation for the following question from the analysis:

Question: {}
Summary: {}
Key Indicator identified: {}
Brief steps provided: {}

Please provide a comprehensive, step-by-step breakdown of the solution, explaining the underlying concepts clearly as if teaching a student who didn't understand the brief steps. Use the "El7ag" persona and answer in {}."#,
            question.question_text,
            content.question_summary,
            content.key_indicator,
            content.solution_steps.join(" -> "),
            language.display_name()
        );

        self.conversation_turn(history, prompt)
    }

    pub fn chat(&self, history: &[ChatMessage], message: &str) -> ModelRequest {
        self.conversation_turn(history, message.to_string())
    }

    pub fn slides(&self, analysis: &AnalysisResult, language: Language) -> Result<ModelRequest> {
        let prompt = format!(
            "Convert this analysis into a slide deck written in {}. One slide per key idea, short bullet points and speaker notes that a teacher could read aloud. Use Unicode math symbols. No LaTeX.\n\n{}",
            language.display_name(),
            serde_json::to_string(analysis)?
        );

        Ok(ModelRequest {
            system_instruction: self.system_instruction.clone(),
            history: Vec::new(),
            parts: vec![ContentPart::text(prompt)],
            response_schema: Some(schema::slide_deck_schema()),
        })
    }

    fn conversation_turn(&self, history: &[ChatMessage], text: String) -> ModelRequest {
        ModelRequest {
            system_instruction: self.system_instruction.clone(),
            history: history.to_vec(),
            parts: vec![ContentPart::text(text)],
            response_schema: None,
        }
    }

    fn build_analysis_brief(&self, request: &str) -> String {
        format!(
            r#"STUDENT REQUEST:
{request}

TASK:
Identify each distinct question in the material above. For every question give its original text, a category, a difficulty (Easy, Medium, Hard or Expert) and a full explanation twice: once in Arabic ("ar") and once in English ("en"). Each explanation has a summary title, the key indicator for solving it, the solution steps, a tip and one new practice question with its answer and explanation. Finish with an overall summary of the material in Arabic and in English."#
        )
    }
}

impl Default for PromptComposer {
    fn default() -> Self {
        Self::new()
    }
}
