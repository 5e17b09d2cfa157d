//! Interactive session state.
//!
//! [`Session`] is a plain value updated by [`Session::update`]: each
//! [`Event`] changes the state and yields at most one [`Effect`] for the
//! driver to perform. Nothing here does I/O, so every transition is tested
//! directly.
//!
//! Background work (file loading, generation) comes back as
//! [`Event::FileLoaded`] / [`Event::FileRejected`] / [`Event::JobFinished`].
//! While a job is in flight the generate trigger is disabled; any outcome
//! enables it again.

use crate::config::{parse_question_count, ProviderCredential, QuestionStyle, DEFAULT_QUESTION_COUNT};
use crate::error::{QuizError, ValidationError};
use crate::output::{GenerationResult, DEFAULT_EXPORT_NAME};
use crate::pipeline::input::{SelectedFile, SourceDocument};
use crate::pipeline::request::GenerationRequest;
use crate::preferences::Preferences;
use std::fmt;
use std::path::PathBuf;

/// Text shown in place of the questions while a job runs.
pub const PENDING_TEXT: &str = "Generazione in corso... Potrebbe richiedere un momento.";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Screen {
    Welcome,
    Credentials,
    Main,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ResultView {
    Empty,
    Pending,
    Ready {
        result: GenerationResult,
        answers_visible: bool,
    },
    /// `Errore: <error>`
    Failed(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NoticeLevel {
    Info,
    Error,
}

/// A dialog-style message for the user.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notice {
    pub level: NoticeLevel,
    pub title: String,
    pub message: String,
}

impl Notice {
    pub fn info(title: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            level: NoticeLevel::Info,
            title: title.into(),
            message: message.into(),
        }
    }

    pub fn error(title: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            level: NoticeLevel::Error,
            title: title.into(),
            message: message.into(),
        }
    }
}

impl fmt::Display for Notice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.title, self.message)
    }
}

/// Everything a background generation needs, captured at trigger time.
#[derive(Debug, Clone)]
pub struct GenerationJob {
    pub credential: ProviderCredential,
    pub request: GenerationRequest,
}

/// How a background job ended.
#[derive(Debug)]
pub enum JobOutcome {
    Success(GenerationResult),
    /// Parameters refused before the request was sent.
    Rejected(QuizError),
    /// The exchange with the provider failed.
    Failed(QuizError),
}

impl From<Result<GenerationResult, QuizError>> for JobOutcome {
    fn from(r: Result<GenerationResult, QuizError>) -> Self {
        match r {
            Ok(result) => JobOutcome::Success(result),
            Err(e) if e.is_validation() => JobOutcome::Rejected(e),
            Err(e) => JobOutcome::Failed(e),
        }
    }
}

#[derive(Debug)]
pub enum Event {
    Continue,
    OpenSettings,
    SaveCredentials { api_key: String, model: String },
    AddFile(PathBuf),
    FileLoaded(SelectedFile),
    FileRejected(String),
    SetQuestionCount(String),
    SetModel(String),
    SetStyle(QuestionStyle),
    Generate,
    JobFinished(JobOutcome),
    ToggleAnswers,
    Clear,
    /// Save to the given path, or [`DEFAULT_EXPORT_NAME`] when `None`.
    Save(Option<PathBuf>),
}

#[derive(Debug)]
pub enum Effect {
    LoadFile(PathBuf),
    /// Run the job in the background. The driver also persists the job's
    /// model choice.
    StartJob(GenerationJob),
    ShowMessage(Notice),
    PersistCredential(ProviderCredential),
    WriteFile { path: PathBuf, contents: String },
}

/// State of one interactive session.
#[derive(Debug, Clone)]
pub struct Session {
    screen: Screen,
    credential: ProviderCredential,
    files: Vec<SelectedFile>,
    count_input: String,
    model_input: String,
    style: QuestionStyle,
    result: ResultView,
    generating: bool,
}

impl Session {
    /// Start on the welcome screen with the stored credential.
    pub fn new(prefs: &Preferences) -> Self {
        let credential = prefs.credential();
        Self {
            screen: Screen::Welcome,
            model_input: credential.model.clone(),
            credential,
            files: Vec::new(),
            count_input: DEFAULT_QUESTION_COUNT.to_string(),
            style: QuestionStyle::None,
            result: ResultView::Empty,
            generating: false,
        }
    }

    pub fn screen(&self) -> Screen {
        self.screen
    }

    pub fn credential(&self) -> &ProviderCredential {
        &self.credential
    }

    pub fn files(&self) -> &[SelectedFile] {
        &self.files
    }

    pub fn count_input(&self) -> &str {
        &self.count_input
    }

    pub fn model_input(&self) -> &str {
        &self.model_input
    }

    pub fn style(&self) -> QuestionStyle {
        self.style
    }

    pub fn result(&self) -> &ResultView {
        &self.result
    }

    pub fn is_generating(&self) -> bool {
        self.generating
    }

    /// Text for the questions pane.
    pub fn questions_text(&self) -> String {
        match &self.result {
            ResultView::Empty => String::new(),
            ResultView::Pending => PENDING_TEXT.to_string(),
            ResultView::Ready { result, .. } => result.questions_with_footer(),
            ResultView::Failed(message) => message.clone(),
        }
    }

    /// Answers when revealed.
    pub fn visible_answers(&self) -> Option<&str> {
        match &self.result {
            ResultView::Ready {
                result,
                answers_visible: true,
            } => Some(result.answers_or_placeholder()),
            _ => None,
        }
    }

    /// Apply `event` and return the effect to perform, if any.
    pub fn update(&mut self, event: Event) -> Option<Effect> {
        match event {
            Event::Continue => {
                self.screen = if self.credential.has_key() {
                    Screen::Main
                } else {
                    Screen::Credentials
                };
                None
            }
            Event::OpenSettings => {
                self.screen = Screen::Credentials;
                None
            }
            Event::SaveCredentials { api_key, model } => {
                let credential = ProviderCredential::new(api_key, model);
                if !credential.has_key() {
                    return Some(Effect::ShowMessage(Notice::info(
                        "Chiave Mancante",
                        "Inserisci una chiave API di OpenRouter valida.",
                    )));
                }
                self.model_input = credential.model.clone();
                self.credential = credential.clone();
                self.screen = Screen::Main;
                Some(Effect::PersistCredential(credential))
            }
            Event::AddFile(path) => Some(Effect::LoadFile(path)),
            Event::FileLoaded(file) => {
                self.files.push(file);
                None
            }
            Event::FileRejected(message) => {
                Some(Effect::ShowMessage(Notice::error("File Non Aggiunto", message)))
            }
            Event::SetQuestionCount(text) => {
                self.count_input = text;
                None
            }
            Event::SetModel(text) => {
                self.model_input = text;
                None
            }
            Event::SetStyle(style) => {
                self.style = style;
                None
            }
            Event::Generate => self.start_generation(),
            Event::JobFinished(outcome) => self.finish_generation(outcome),
            Event::ToggleAnswers => match &mut self.result {
                ResultView::Ready {
                    answers_visible, ..
                } => {
                    *answers_visible = !*answers_visible;
                    None
                }
                _ => Some(Effect::ShowMessage(Notice::info(
                    "Nessuna Risposta",
                    "Genera prima le domande per vedere le risposte.",
                ))),
            },
            Event::Clear => {
                self.files.clear();
                if !self.generating {
                    self.result = ResultView::Empty;
                }
                None
            }
            Event::Save(path) => match &self.result {
                ResultView::Ready { result, .. } => Some(Effect::WriteFile {
                    path: path.unwrap_or_else(|| PathBuf::from(DEFAULT_EXPORT_NAME)),
                    contents: result.export_text(),
                }),
                _ => Some(Effect::ShowMessage(Notice::info(
                    "Niente da Salvare",
                    "Esegui prima la generazione per produrre domande.",
                ))),
            },
        }
    }

    fn start_generation(&mut self) -> Option<Effect> {
        if self.generating {
            return None;
        }
        if !self.credential.has_key() {
            return Some(Effect::ShowMessage(Notice::info(
                "Chiave API Mancante",
                "Imposta la tua chiave API di OpenRouter nel passaggio precedente.",
            )));
        }
        let count = match parse_question_count(&self.count_input) {
            Ok(n) => n,
            Err(_) => {
                return Some(Effect::ShowMessage(Notice::info(
                    "Numero Non Valido",
                    "Inserisci un numero valido di domande (1-100).",
                )))
            }
        };
        if self.files.is_empty() {
            return Some(Effect::ShowMessage(Notice::info(
                "Nessuna Fonte",
                "Aggiungi almeno un PDF o un'immagine.",
            )));
        }

        let credential = ProviderCredential::new(&self.credential.api_key, &self.model_input);
        let sources: Vec<SourceDocument> = self.files.iter().map(|f| f.document.clone()).collect();
        let request =
            match GenerationRequest::new(&credential.model, i64::from(count), self.style, sources) {
                Ok(r) => r,
                Err(e) => return Some(Effect::ShowMessage(validation_notice(&e))),
            };

        self.model_input = credential.model.clone();
        self.credential = credential.clone();
        self.generating = true;
        self.result = ResultView::Pending;
        Some(Effect::StartJob(GenerationJob {
            credential,
            request,
        }))
    }

    fn finish_generation(&mut self, outcome: JobOutcome) -> Option<Effect> {
        self.generating = false;
        match outcome {
            JobOutcome::Success(result) => {
                self.result = ResultView::Ready {
                    result,
                    answers_visible: false,
                };
                None
            }
            JobOutcome::Rejected(e) => {
                self.result = ResultView::Failed(format!("Errore: {e}"));
                match e {
                    QuizError::Validation(v) => Some(Effect::ShowMessage(validation_notice(&v))),
                    other => Some(Effect::ShowMessage(Notice::error("Errore", other.to_string()))),
                }
            }
            JobOutcome::Failed(e) => {
                self.result = ResultView::Failed(format!("Errore: {e}"));
                None
            }
        }
    }
}

fn validation_notice(e: &ValidationError) -> Notice {
    let title = match e {
        ValidationError::QuestionCountOutOfRange(_) | ValidationError::InvalidQuestionCount(_) => {
            "Numero Non Valido"
        }
        ValidationError::NoSources => "Nessuna Fonte",
        ValidationError::MissingApiKey => "Chiave API Mancante",
    };
    Notice::info(title, e.to_string())
}
