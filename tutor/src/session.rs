use crate::config::TutorConfig;
use crate::error::{Result, TutorError};
use crate::file_normalizer::{FileNormalizer, UploadedFile};
use crate::gemini_service::GeminiService;
use crate::messages;
use crate::models::*;
use crate::prompt_composer::PromptComposer;
use crate::render::{render_analysis, RenderedAnalysis};
use crate::response_parser;
use serde::Serialize;
use std::sync::{Mutex as StdMutex, MutexGuard, PoisonError};
use tokio::sync::Mutex as TokioMutex;

/// A chat turn as the user asked for it.
#[derive(Debug, Clone, PartialEq)]
pub enum ChatRequest {
    Message(String),
    /// Expand the explanation of one question (0-based index).
    Explain(usize),
}

#[derive(Debug, Default)]
pub struct SessionState {
    files: Vec<UploadedFile>,
    notes: String,
    language: Language,
    status: ProcessingState,
    analysis: Option<AnalysisResult>,
    error_message: Option<String>,
    chat: Vec<ChatMessage>,
    /// Bumped whenever the transcript restarts.
    transcript: u64,
    pending_chat_turns: usize,
    slides: Option<Vec<Slide>>,
    generating_slides: bool,
}

/// A started chat turn: the model request plus the transcript it belongs to.
#[derive(Debug, Clone)]
pub struct ChatTurn {
    pub request: ModelRequest,
    pub transcript: u64,
}

/// What an analysis works on, taken when it starts.
#[derive(Debug, Clone)]
pub struct AnalysisInput {
    pub files: Vec<UploadedFile>,
    pub notes: String,
}

impl SessionState {
    pub fn new(language: Language) -> Self {
        Self {
            language,
            ..Self::default()
        }
    }

    pub fn status(&self) -> ProcessingState {
        self.status
    }

    pub fn language(&self) -> Language {
        self.language
    }

    pub fn analysis(&self) -> Option<&AnalysisResult> {
        self.analysis.as_ref()
    }

    pub fn chat(&self) -> &[ChatMessage] {
        &self.chat
    }

    pub fn error_message(&self) -> Option<&str> {
        self.error_message.as_deref()
    }

    pub fn is_chat_loading(&self) -> bool {
        self.pending_chat_turns > 0
    }

    pub fn add_files(&mut self, files: Vec<UploadedFile>) {
        self.files.extend(files);
        self.error_message = None;
    }

    pub fn remove_file(&mut self, index: usize) -> Result<UploadedFile> {
        if index >= self.files.len() {
            return Err(TutorError::FileNotFound(index));
        }
        Ok(self.files.remove(index))
    }

    pub fn set_notes(&mut self, notes: impl Into<String>) {
        self.notes = notes.into();
    }

    pub fn set_language(&mut self, language: Language) {
        self.language = language;
    }

    /// `Idle | Complete | Error -> Analyzing`.
    pub fn begin_analysis(&mut self) -> Result<AnalysisInput> {
        if self.status == ProcessingState::Analyzing {
            return Err(TutorError::AnalysisInFlight);
        }
        if self.files.is_empty() && self.notes.trim().is_empty() {
            self.error_message = Some(messages::empty_submission(self.language));
            return Err(TutorError::EmptySubmission);
        }

        self.status = ProcessingState::Analyzing;
        self.error_message = None;

        Ok(AnalysisInput {
            files: self.files.clone(),
            notes: self.notes.clone(),
        })
    }

    /// `Analyzing -> Complete`. The transcript restarts with a greeting and
    /// any open deck is dropped.
    pub fn complete_analysis(&mut self, analysis: AnalysisResult) {
        self.chat = vec![ChatMessage::model(messages::analysis_greeting(
            self.language,
            analysis.questions.len(),
        ))];
        self.transcript += 1;
        self.analysis = Some(analysis);
        self.slides = None;
        self.status = ProcessingState::Complete;
    }

    /// `Analyzing -> Error`. The next analyze call is accepted as a retry.
    pub fn fail_analysis(&mut self) {
        self.analysis = None;
        self.status = ProcessingState::Error;
        self.error_message = Some(messages::analysis_failed(self.language));
    }

    /// Checks a chat request can run at all and counts it as pending.
    pub fn enqueue_chat(&mut self, request: &ChatRequest) -> Result<()> {
        self.validate_chat(request)?;
        self.pending_chat_turns += 1;
        Ok(())
    }

    /// Appends the user line for `request` and builds the model request from
    /// the transcript as it was before that line.
    pub fn start_chat_turn(
        &mut self,
        request: &ChatRequest,
        composer: &PromptComposer,
    ) -> Result<ChatTurn> {
        self.validate_chat(request)?;
        let history = self.chat.clone();

        let (visible, model_request) = match request {
            ChatRequest::Message(message) => (message.clone(), composer.chat(&history, message)),
            ChatRequest::Explain(index) => {
                let question = self
                    .analysis
                    .as_ref()
                    .and_then(|a| a.questions.get(*index))
                    .ok_or(TutorError::QuestionNotFound(*index))?;
                (
                    messages::explain_request(self.language, index + 1),
                    composer.expand(question, self.language, &history),
                )
            }
        };

        self.chat.push(ChatMessage::user(visible));
        Ok(ChatTurn {
            request: model_request,
            transcript: self.transcript,
        })
    }

    /// Appends the reply (or an apology) and releases the pending slot. A
    /// reply to a transcript that has since restarted is returned but not
    /// appended.
    pub fn finish_chat_turn(&mut self, transcript: u64, reply: Option<String>) -> ChatMessage {
        let message = match reply {
            Some(text) => ChatMessage::model(text),
            None => ChatMessage::model(messages::chat_apology(self.language)),
        };
        if transcript == self.transcript {
            self.chat.push(message.clone());
        } else {
            log::info!("Dropping reply to a transcript that was reset by a new analysis");
        }
        self.release_chat_turn();
        message
    }

    pub fn release_chat_turn(&mut self) {
        self.pending_chat_turns = self.pending_chat_turns.saturating_sub(1);
    }

    fn validate_chat(&self, request: &ChatRequest) -> Result<()> {
        let analysis = self.analysis.as_ref().ok_or(TutorError::NoAnalysis)?;
        match request {
            ChatRequest::Message(message) if message.trim().is_empty() => {
                Err(TutorError::EmptyMessage)
            }
            ChatRequest::Explain(index) if *index >= analysis.questions.len() => {
                Err(TutorError::QuestionNotFound(*index))
            }
            _ => Ok(()),
        }
    }

    pub fn begin_slides(&mut self) -> Result<(AnalysisResult, Language)> {
        let analysis = self.analysis.clone().ok_or(TutorError::NoAnalysis)?;
        if self.generating_slides {
            return Err(TutorError::SlidesInFlight);
        }
        self.generating_slides = true;
        Ok((analysis, self.language))
    }

    pub fn finish_slides(&mut self, slides: Option<Vec<Slide>>) {
        self.generating_slides = false;
        if slides.is_some() {
            self.slides = slides;
        }
    }

    pub fn close_slides(&mut self) {
        self.slides = None;
    }

    pub fn view(&self) -> SessionView {
        SessionView {
            status: self.status,
            error_message: self.error_message.clone(),
            language: self.language,
            notes: self.notes.clone(),
            files: self
                .files
                .iter()
                .map(|f| FileSummary {
                    name: f.name.clone(),
                    mime_type: f.mime_type.clone(),
                    size: f.bytes.len(),
                })
                .collect(),
            analysis: self
                .analysis
                .as_ref()
                .map(|a| render_analysis(a, self.language)),
            chat: self.chat.clone(),
            is_chat_loading: self.is_chat_loading(),
            slides: self.slides.clone(),
            is_generating_slides: self.generating_slides,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FileSummary {
    pub name: String,
    pub mime_type: String,
    pub size: usize,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionView {
    pub status: ProcessingState,
    pub error_message: Option<String>,
    pub language: Language,
    pub notes: String,
    pub files: Vec<FileSummary>,
    pub analysis: Option<RenderedAnalysis>,
    pub chat: Vec<ChatMessage>,
    pub is_chat_loading: bool,
    pub slides: Option<Vec<Slide>>,
    pub is_generating_slides: bool,
}

/// One user's session: the state machine plus the gateway it talks to.
///
/// The state lock is never held while the model is being called. Chat and
/// explain turns go through `chat_queue`, a fair lock, so the transcript
/// always follows request order. If a future returned here is dropped
/// mid-call, the transition it started is rolled back: an analysis ends in
/// `Error`, a chat turn gives up its pending slot and a deck request clears
/// its in-flight flag.
pub struct Session {
    gateway: GeminiService,
    composer: PromptComposer,
    state: StdMutex<SessionState>,
    chat_queue: TokioMutex<()>,
}

/// Runs `undo` against the session state when dropped while still armed.
struct Rollback<'a, F>
where
    F: FnOnce(&mut SessionState),
{
    state: &'a StdMutex<SessionState>,
    undo: Option<F>,
}

impl<'a, F> Rollback<'a, F>
where
    F: FnOnce(&mut SessionState),
{
    fn new(state: &'a StdMutex<SessionState>, undo: F) -> Self {
        Self {
            state,
            undo: Some(undo),
        }
    }

    /// Must be called before the state lock is taken again.
    fn disarm(mut self) {
        self.undo = None;
    }
}

impl<F> Drop for Rollback<'_, F>
where
    F: FnOnce(&mut SessionState),
{
    fn drop(&mut self) {
        if let Some(undo) = self.undo.take() {
            undo(&mut lock(self.state));
        }
    }
}

fn lock(state: &StdMutex<SessionState>) -> MutexGuard<'_, SessionState> {
    state.lock().unwrap_or_else(PoisonError::into_inner)
}

impl Session {
    pub fn new(gateway: GeminiService, language: Language) -> Self {
        Self {
            gateway,
            composer: PromptComposer::new(),
            state: StdMutex::new(SessionState::new(language)),
            chat_queue: TokioMutex::new(()),
        }
    }

    pub fn from_config(config: &TutorConfig) -> Self {
        Self::new(GeminiService::new(config.gateway.clone()), config.language)
    }

    fn state(&self) -> MutexGuard<'_, SessionState> {
        lock(&self.state)
    }

    pub async fn view(&self) -> SessionView {
        self.state().view()
    }

    pub async fn add_files(&self, files: Vec<UploadedFile>) {
        let count = files.len();
        self.state().add_files(files);
        log::info!("Added {} files to the session", count);
    }

    pub async fn remove_file(&self, index: usize) -> Result<UploadedFile> {
        self.state().remove_file(index)
    }

    pub async fn set_notes(&self, notes: impl Into<String>) {
        self.state().set_notes(notes);
    }

    pub async fn set_language(&self, language: Language) {
        self.state().set_language(language);
    }

    pub async fn status(&self) -> ProcessingState {
        self.state().status()
    }

    pub async fn error_message(&self) -> Option<String> {
        self.state().error_message().map(str::to_string)
    }

    pub async fn analysis(&self) -> Option<AnalysisResult> {
        self.state().analysis().cloned()
    }

    pub async fn chat_messages(&self) -> Vec<ChatMessage> {
        self.state().chat().to_vec()
    }

    pub async fn is_chat_loading(&self) -> bool {
        self.state().is_chat_loading()
    }

    pub async fn analyze(&self) -> Result<AnalysisResult> {
        let input = self.state().begin_analysis()?;
        let rollback = Rollback::new(&self.state, |state: &mut SessionState| {
            log::warn!("Analysis dropped before it finished");
            state.fail_analysis();
        });
        log::info!(
            "Starting analysis of {} files with {} chars of notes",
            input.files.len(),
            input.notes.len()
        );

        let result = self.run_analysis(input).await;
        rollback.disarm();

        let mut state = self.state();
        match result {
            Ok(analysis) => {
                state.complete_analysis(analysis.clone());
                log::info!("Analysis complete: {} questions", analysis.questions.len());
                Ok(analysis)
            }
            Err(e) => {
                log::error!("Analysis failed: {}", e);
                state.fail_analysis();
                Err(e)
            }
        }
    }

    async fn run_analysis(&self, input: AnalysisInput) -> Result<AnalysisResult> {
        let file_count = input.files.len();
        let files = input.files;
        let parts = match tokio::task::spawn_blocking(move || FileNormalizer::new().normalize(&files))
            .await
        {
            Ok(parts) => parts,
            Err(e) => {
                log::error!("File normalization task failed: {}", e);
                Vec::new()
            }
        };

        let request = self.composer.analyze(&input.notes, &parts, file_count)?;
        let text = self.gateway.generate(&request).await?;
        response_parser::parse_analysis(&text)
    }

    pub async fn send_message(&self, message: impl Into<String>) -> Result<ChatMessage> {
        self.chat_turn(ChatRequest::Message(message.into())).await
    }

    pub async fn explain_question(&self, index: usize) -> Result<ChatMessage> {
        self.chat_turn(ChatRequest::Explain(index)).await
    }

    /// Runs one chat turn. A gateway failure is not an error here: the turn
    /// ends with an apology in the transcript, which is what gets returned.
    pub async fn chat_turn(&self, request: ChatRequest) -> Result<ChatMessage> {
        self.state().enqueue_chat(&request)?;
        let rollback = Rollback::new(&self.state, |state: &mut SessionState| {
            log::warn!("Chat turn dropped before it finished");
            state.release_chat_turn();
        });

        let _turn = self.chat_queue.lock().await;

        let started = self.state().start_chat_turn(&request, &self.composer);
        let turn = match started {
            Ok(turn) => turn,
            Err(e) => {
                rollback.disarm();
                self.state().release_chat_turn();
                return Err(e);
            }
        };

        let reply = match self.gateway.generate(&turn.request).await {
            Ok(text) => Some(text),
            Err(e) => {
                log::error!("Chat turn failed: {}", e);
                None
            }
        };

        rollback.disarm();
        let message = self.state().finish_chat_turn(turn.transcript, reply);
        Ok(message)
    }

    pub async fn generate_slides(&self) -> Result<Vec<Slide>> {
        let (analysis, language) = self.state().begin_slides()?;
        let rollback = Rollback::new(&self.state, |state: &mut SessionState| {
            log::warn!("Slide generation dropped before it finished");
            state.finish_slides(None);
        });

        let result = self.run_slides(&analysis, language).await;
        rollback.disarm();

        let mut state = self.state();
        match result {
            Ok(slides) => {
                log::info!("Generated {} slides", slides.len());
                state.finish_slides(Some(slides.clone()));
                Ok(slides)
            }
            Err(e) => {
                log::error!("Slide generation failed: {}", e);
                state.finish_slides(None);
                Err(e)
            }
        }
    }

    async fn run_slides(&self, analysis: &AnalysisResult, language: Language) -> Result<Vec<Slide>> {
        let request = self.composer.slides(analysis, language)?;
        let text = self.gateway.generate(&request).await?;
        response_parser::parse_slides(&text)
    }

    pub async fn close_slides(&self) {
        self.state().close_slides();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn localized() -> LocalizedContent {
        LocalizedContent {
            question_summary: "s".to_string(),
            key_indicator: "k".to_string(),
            solution_steps: vec!["a".to_string(), "b".to_string()],
            tips: "t".to_string(),
            practice_question: PracticeQuestion {
                question: "q".to_string(),
                answer: "a".to_string(),
                explanation: "e".to_string(),
            },
        }
    }

    fn analysis(count: usize) -> AnalysisResult {
        AnalysisResult {
            overall_summary_ar: "ملخص".to_string(),
            overall_summary_en: "Summary".to_string(),
            questions: (0..count)
                .map(|i| QuestionAnalysis {
                    id: format!("q-{i}"),
                    question_text: format!("Question {i}"),
                    category: "Algebra".to_string(),
                    difficulty: Difficulty::Easy,
                    ar: localized(),
                    en: localized(),
                })
                .collect(),
        }
    }

    fn completed(language: Language, count: usize) -> SessionState {
        let mut state = SessionState::new(language);
        state.set_notes("solve");
        state.begin_analysis().unwrap();
        state.complete_analysis(analysis(count));
        state
    }

    #[test]
    fn empty_submission_sets_message_and_keeps_state() {
        let mut state = SessionState::new(Language::En);
        state.set_notes("   ");

        assert!(matches!(state.begin_analysis(), Err(TutorError::EmptySubmission)));
        assert_eq!(state.status(), ProcessingState::Idle);
        assert_eq!(state.error_message(), Some("Please upload something first!"));
    }

    #[test]
    fn adding_files_clears_the_error() {
        let mut state = SessionState::new(Language::Ar);
        let _ = state.begin_analysis();
        assert!(state.error_message().is_some());

        state.add_files(vec![UploadedFile::new("a.txt", "text/plain", b"x".to_vec())]);
        assert!(state.error_message().is_none());
    }

    #[test]
    fn second_analysis_is_rejected_while_one_runs() {
        let mut state = SessionState::new(Language::En);
        state.set_notes("question");
        state.begin_analysis().unwrap();

        assert_eq!(state.status(), ProcessingState::Analyzing);
        assert!(matches!(state.begin_analysis(), Err(TutorError::AnalysisInFlight)));
    }

    #[test]
    fn files_stay_editable_during_analysis() {
        let mut state = SessionState::new(Language::En);
        state.add_files(vec![UploadedFile::new("a.txt", "text/plain", b"x".to_vec())]);
        let input = state.begin_analysis().unwrap();

        state.add_files(vec![UploadedFile::new("b.txt", "text/plain", b"y".to_vec())]);
        assert_eq!(input.files.len(), 1);
        assert_eq!(state.view().files.len(), 2);
        assert!(state.remove_file(5).is_err());
        assert_eq!(state.remove_file(0).unwrap().name, "a.txt");
    }

    #[test]
    fn completion_resets_transcript_with_greeting() {
        let mut state = completed(Language::En, 3);
        state.enqueue_chat(&ChatRequest::Message("hi".to_string())).unwrap();
        let turn = state
            .start_chat_turn(&ChatRequest::Message("hi".to_string()), &PromptComposer::new())
            .unwrap();
        state.finish_chat_turn(turn.transcript, Some("hello".to_string()));
        assert_eq!(state.chat().len(), 3);

        state.begin_analysis().unwrap();
        state.complete_analysis(analysis(2));
        assert_eq!(
            state.chat(),
            &[ChatMessage::model("Done! I analyzed 2 items. Ready for questions.")]
        );
        assert_eq!(state.status(), ProcessingState::Complete);
    }

    #[test]
    fn reply_to_a_reset_transcript_is_not_appended() {
        let mut state = completed(Language::En, 1);
        let request = ChatRequest::Message("old question".to_string());
        state.enqueue_chat(&request).unwrap();
        let turn = state.start_chat_turn(&request, &PromptComposer::new()).unwrap();

        state.begin_analysis().unwrap();
        state.complete_analysis(analysis(1));

        let reply = state.finish_chat_turn(turn.transcript, Some("stale reply".to_string()));
        assert_eq!(reply, ChatMessage::model("stale reply"));
        assert_eq!(
            state.chat(),
            &[ChatMessage::model("Done! I analyzed 1 items. Ready for questions.")]
        );
        assert!(!state.is_chat_loading());
    }

    #[test]
    fn failure_then_retry() {
        let mut state = SessionState::new(Language::Ar);
        state.set_notes("x");
        state.begin_analysis().unwrap();
        state.fail_analysis();

        assert_eq!(state.status(), ProcessingState::Error);
        assert_eq!(
            state.error_message(),
            Some("حصلت مشكلة في التحليل، جرب تاني يا حاج.")
        );
        assert!(state.begin_analysis().is_ok());
        assert!(state.error_message().is_none());
    }

    #[test]
    fn chat_requires_a_completed_analysis() {
        let mut state = SessionState::new(Language::En);
        assert!(matches!(
            state.enqueue_chat(&ChatRequest::Message("hi".to_string())),
            Err(TutorError::NoAnalysis)
        ));
        assert!(matches!(state.begin_slides(), Err(TutorError::NoAnalysis)));
    }

    #[test]
    fn chat_rejects_blank_messages_and_unknown_questions() {
        let mut state = completed(Language::En, 2);
        assert!(matches!(
            state.enqueue_chat(&ChatRequest::Message("  ".to_string())),
            Err(TutorError::EmptyMessage)
        ));
        assert!(matches!(
            state.enqueue_chat(&ChatRequest::Explain(2)),
            Err(TutorError::QuestionNotFound(2))
        ));
        assert!(!state.is_chat_loading());
    }

    #[test]
    fn explain_turn_shows_request_line_but_sends_detailed_prompt() {
        let mut state = completed(Language::En, 2);
        let request = ChatRequest::Explain(1);
        state.enqueue_chat(&request).unwrap();
        assert!(state.is_chat_loading());

        let turn = state.start_chat_turn(&request, &PromptComposer::new()).unwrap();
        let model_request = &turn.request;
        assert_eq!(
            state.chat().last(),
            Some(&ChatMessage::user("Can you explain Question 2 in more detail?"))
        );
        // History is the transcript before the new line.
        assert_eq!(model_request.history.len(), 1);
        assert!(model_request.parts[0]
            .as_text()
            .unwrap()
            .contains("Question: Question 1"));

        state.finish_chat_turn(turn.transcript, None);
        assert_eq!(
            state.chat().last(),
            Some(&ChatMessage::model("Sorry, an error occurred."))
        );
        assert!(!state.is_chat_loading());
    }

    #[test]
    fn slides_guarded_and_discarded_on_close() {
        let mut state = completed(Language::En, 1);
        state.begin_slides().unwrap();
        assert!(matches!(state.begin_slides(), Err(TutorError::SlidesInFlight)));

        state.finish_slides(Some(vec![Slide {
            title: "X".to_string(),
            bullet_points: vec![],
            speaker_notes: String::new(),
        }]));
        assert_eq!(state.view().slides.map(|s| s.len()), Some(1));
        assert!(!state.view().is_generating_slides);

        state.close_slides();
        assert!(state.view().slides.is_none());
    }

    #[test]
    fn view_renders_in_session_language() {
        let mut state = completed(Language::En, 4);
        let view = state.view();
        let rendered = view.analysis.unwrap();
        assert_eq!(rendered.questions.len(), 4);
        assert_eq!(rendered.summary, "Summary");

        state.set_language(Language::Ar);
        assert_eq!(state.view().analysis.unwrap().summary, "ملخص");
    }
}
