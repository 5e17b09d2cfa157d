//! Effect executor for [`Session`](crate::session::Session).
//!
//! Quick effects (persisting the credential, writing a file) run inline and
//! return a [`Notice`]. Slow ones (loading a file, generating) run on
//! `tokio::spawn`ed tasks; each task sends exactly one [`Event`] back through
//! the channel returned by [`Driver::new`]. The front end feeds those events
//! into `Session::update` on its own loop, so the session is never shared.

use crate::config::GenerationConfig;
use crate::generate::generate;
use crate::output::write_text;
use crate::pipeline::input::load_source;
use crate::pipeline::llm::CompletionClient;
use crate::preferences::PreferencesStore;
use crate::session::{Effect, Event, GenerationJob, JobOutcome, Notice};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

/// Performs [`Effect`]s on behalf of a session.
#[derive(Debug, Clone)]
pub struct Driver {
    config: GenerationConfig,
    client: CompletionClient,
    store: PreferencesStore,
    events: mpsc::UnboundedSender<Event>,
}

impl Driver {
    /// Create a driver and the receiving end of its event channel.
    pub fn new(
        config: GenerationConfig,
        client: CompletionClient,
        store: PreferencesStore,
    ) -> (Self, mpsc::UnboundedReceiver<Event>) {
        let (events, rx) = mpsc::unbounded_channel();
        (
            Self {
                config,
                client,
                store,
                events,
            },
            rx,
        )
    }

    /// Perform `effect`. Returns a notice to show now, if any.
    pub async fn execute(&self, effect: Effect) -> Option<Notice> {
        match effect {
            Effect::ShowMessage(notice) => Some(notice),
            Effect::LoadFile(path) => {
                self.spawn_load(path);
                None
            }
            Effect::StartJob(job) => {
                if let Err(e) = self.store.save_model(&job.credential.model) {
                    warn!("Could not persist model choice: {}", e);
                }
                self.spawn_job(job);
                None
            }
            Effect::PersistCredential(credential) => match self.store.save_credential(&credential) {
                Ok(()) => None,
                Err(e) => Some(Notice::error("Errore", e.to_string())),
            },
            Effect::WriteFile { path, contents } => match write_text(&path, &contents).await {
                Ok(()) => Some(Notice::info(
                    "Salvato",
                    format!("Output salvato con successo in {}.", path.display()),
                )),
                Err(e) => Some(Notice::error("Errore", e.to_string())),
            },
        }
    }

    /// Load `path` off the loop; delivers `FileLoaded` or `FileRejected`.
    pub fn spawn_load(&self, path: std::path::PathBuf) -> JoinHandle<()> {
        let events = self.events.clone();
        let progress = self.config.progress_callback.clone();
        tokio::spawn(async move {
            let event = match load_source(&path).await {
                Ok(file) => {
                    if let Some(cb) = progress {
                        cb.on_source_loaded(&file.label);
                    }
                    Event::FileLoaded(file)
                }
                Err(e) => {
                    debug!("Rejected {}: {}", path.display(), e);
                    Event::FileRejected(e.to_string())
                }
            };
            deliver(&events, event);
        })
    }

    /// Run `job` off the loop; delivers one `JobFinished`.
    pub fn spawn_job(&self, job: GenerationJob) -> JoinHandle<()> {
        let events = self.events.clone();
        let config = self.config.clone();
        let client = self.client.clone();
        tokio::spawn(async move {
            let result = generate(&job.credential, &job.request, &config, &client).await;
            deliver(&events, Event::JobFinished(JobOutcome::from(result)));
        })
    }
}

fn deliver(events: &mpsc::UnboundedSender<Event>, event: Event) {
    if events.send(event).is_err() {
        debug!("Session ended before a background event was delivered");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{ProviderCredential, QuestionStyle};
    use crate::error::QuizError;
    use crate::pipeline::input::SourceDocument;
    use crate::pipeline::llm::{ChatTransport, HttpRequest, RawResponse};
    use crate::pipeline::request::GenerationRequest;
    use async_trait::async_trait;
    use std::sync::Arc;

    struct Unreachable;

    #[async_trait]
    impl ChatTransport for Unreachable {
        async fn send(&self, _request: HttpRequest) -> Result<RawResponse, QuizError> {
            Err(QuizError::Network {
                detail: "connection refused".into(),
            })
        }
    }

    fn driver(dir: &std::path::Path) -> (Driver, mpsc::UnboundedReceiver<Event>) {
        let config = GenerationConfig::default();
        let client = CompletionClient::with_transport(Arc::new(Unreachable), &config);
        Driver::new(config, client, PreferencesStore::in_dir(dir))
    }

    #[tokio::test]
    async fn job_delivers_exactly_one_event() {
        let dir = tempfile::tempdir().unwrap();
        let (driver, mut rx) = driver(dir.path());
        let job = GenerationJob {
            credential: ProviderCredential::new("k", "m/x"),
            request: GenerationRequest::new(
                "m/x",
                3,
                QuestionStyle::None,
                vec![SourceDocument::Text {
                    content: "t".into(),
                }],
            )
            .unwrap(),
        };

        assert!(driver.execute(Effect::StartJob(job)).await.is_none());
        match rx.recv().await {
            Some(Event::JobFinished(JobOutcome::Failed(QuizError::Network { .. }))) => {}
            other => panic!("unexpected {other:?}"),
        }
        assert!(rx.try_recv().is_err());

        let prefs = PreferencesStore::in_dir(dir.path()).load().unwrap();
        assert_eq!(prefs.model, "m/x");
    }

    #[tokio::test]
    async fn unsupported_file_is_rejected_through_channel() {
        let dir = tempfile::tempdir().unwrap();
        let (driver, mut rx) = driver(dir.path());
        driver
            .execute(Effect::LoadFile("notes.docx".into()))
            .await;
        match rx.recv().await {
            Some(Event::FileRejected(msg)) => assert!(msg.contains(".docx"), "{msg}"),
            other => panic!("unexpected {other:?}"),
        }
    }

    #[tokio::test]
    async fn write_file_reports_success() {
        let dir = tempfile::tempdir().unwrap();
        let (driver, _rx) = driver(dir.path());
        let path = dir.path().join("out.txt");
        let notice = driver
            .execute(Effect::WriteFile {
                path: path.clone(),
                contents: "1. A?".into(),
            })
            .await
            .unwrap();
        assert_eq!(notice.title, "Salvato");
        assert_eq!(std::fs::read_to_string(path).unwrap(), "1. A?");
    }

    #[tokio::test]
    async fn persist_credential_writes_store() {
        let dir = tempfile::tempdir().unwrap();
        let (driver, _rx) = driver(dir.path());
        let notice = driver
            .execute(Effect::PersistCredential(ProviderCredential::new("sk", "")))
            .await;
        assert!(notice.is_none());
        assert!(PreferencesStore::in_dir(dir.path()).load().unwrap().has_key());
    }
}
