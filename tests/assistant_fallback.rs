use async_trait::async_trait;
use concierge::assistant::Assistant;
use concierge::error::{Error, Result};
use concierge::llm::{Connector, ModelHandle, ModelProvider};
use concierge::prompt::{COURSE_SECTION_HEADER, GUIDELINE_SECTION_HEADER, PromptBuilder};
use concierge::secrets::{API_KEY, Environment, Secrets, SecretsStore};
use std::sync::{Arc, Mutex};

#[derive(Default)]
struct CallLog {
    connected_with: Vec<String>,
    directory_queries: usize,
    generations: Vec<(String, String)>,
}

#[derive(Clone, Default)]
struct FakeConnector {
    /// `None` makes every directory query fail.
    directory: Option<Vec<String>>,
    not_found: Vec<String>,
    broken: Vec<String>,
    unbindable: Vec<String>,
    log: Arc<Mutex<CallLog>>,
}

impl FakeConnector {
    fn with_directory(names: &[&str]) -> Self {
        Self {
            directory: Some(names.iter().map(|s| s.to_string()).collect()),
            ..Self::default()
        }
    }

    fn not_found(mut self, names: &[&str]) -> Self {
        self.not_found = names.iter().map(|s| s.to_string()).collect();
        self
    }

    fn broken(mut self, names: &[&str]) -> Self {
        self.broken = names.iter().map(|s| s.to_string()).collect();
        self
    }

    fn unbindable(mut self, names: &[&str]) -> Self {
        self.unbindable = names.iter().map(|s| s.to_string()).collect();
        self
    }
}

struct FakeProvider(FakeConnector);

impl Connector for FakeConnector {
    type Provider = FakeProvider;

    fn connect(&self, api_key: &str) -> Result<FakeProvider> {
        self.log.lock().unwrap().connected_with.push(api_key.into());
        Ok(FakeProvider(self.clone()))
    }
}

#[async_trait]
impl ModelProvider for FakeProvider {
    async fn list_models(&self) -> Result<Vec<String>> {
        self.0.log.lock().unwrap().directory_queries += 1;
        self.0
            .directory
            .clone()
            .ok_or_else(|| Error::http("directory unreachable"))
    }

    fn model(&self, name: &str) -> Result<ModelHandle> {
        if self.0.unbindable.iter().any(|n| n == name) {
            return Err(Error::config(format!("cannot bind {name}")));
        }
        ModelHandle::new(name)
    }

    async fn generate(&self, model: &ModelHandle, prompt: &str) -> Result<String> {
        let name = model.name().to_string();
        self.0
            .log
            .lock()
            .unwrap()
            .generations
            .push((name.clone(), prompt.to_string()));
        if self.0.not_found.contains(&name) {
            return Err(Error::api_with_status(
                "generativelanguage.googleapis.com",
                format!("models/{name} is not found for API version v1beta"),
                404,
            ));
        }
        if self.0.broken.contains(&name) {
            return Err(Error::api_with_status(
                "generativelanguage.googleapis.com",
                "internal error",
                500,
            ));
        }
        Ok(format!("answer from {name}"))
    }
}

fn secrets_with_key() -> Secrets {
    Secrets::new(
        SecretsStore::default(),
        Environment::from_pairs([(API_KEY, "test-key")]),
    )
}

fn assistant(connector: FakeConnector, secrets: Secrets) -> Assistant<FakeConnector> {
    Assistant::new(
        secrets,
        connector,
        vec!["A".into(), "B".into(), "C".into()],
        PromptBuilder::default(),
    )
}

#[tokio::test]
async fn missing_api_key_fails_without_network() {
    let connector = FakeConnector::with_directory(&["A"]);
    let log = connector.log.clone();
    let err = assistant(connector, Secrets::default())
        .generate_response("hello", None, None)
        .await
        .unwrap_err();

    assert!(matches!(err, Error::MissingCredential));
    assert!(err.to_string().contains("GEMINI_API_KEY"));
    let log = log.lock().unwrap();
    assert!(log.connected_with.is_empty());
    assert_eq!(log.directory_queries, 0);
    assert!(log.generations.is_empty());
}

#[tokio::test]
async fn authenticates_with_resolved_key() {
    let connector = FakeConnector::with_directory(&["A"]);
    let log = connector.log.clone();
    assistant(connector, secrets_with_key())
        .generate_response("hello", None, None)
        .await
        .unwrap();
    assert_eq!(log.lock().unwrap().connected_with, vec!["test-key"]);
}

#[tokio::test]
async fn selects_first_preferred_model_in_directory() {
    let connector = FakeConnector::with_directory(&["B", "C"]);
    let log = connector.log.clone();
    let answer = assistant(connector, secrets_with_key())
        .generate_response("hello", None, None)
        .await
        .unwrap();

    assert_eq!(answer, "answer from B");
    let log = log.lock().unwrap();
    assert!(log.generations.iter().all(|(model, _)| model != "A"));
}

#[tokio::test]
async fn directory_failure_binds_preferred_names_directly() {
    let connector = FakeConnector::default();
    let answer = assistant(connector, secrets_with_key())
        .generate_response("hello", None, None)
        .await
        .unwrap();
    assert_eq!(answer, "answer from A");
}

#[tokio::test]
async fn unlisted_preferences_fall_back_to_direct_binding() {
    let connector = FakeConnector::with_directory(&["X", "Y"]).unbindable(&["A"]);
    let answer = assistant(connector, secrets_with_key())
        .generate_response("hello", None, None)
        .await
        .unwrap();
    assert_eq!(answer, "answer from B");
}

#[tokio::test]
async fn no_bindable_model_is_model_unavailable() {
    let connector = FakeConnector::with_directory(&["X", "Y"]).unbindable(&["A", "B", "C"]);
    let log = connector.log.clone();
    let err = assistant(connector, secrets_with_key())
        .generate_response("hello", None, None)
        .await
        .unwrap_err();

    match &err {
        Error::ModelUnavailable {
            available,
            last_error,
        } => {
            assert_eq!(available, &vec!["X".to_string(), "Y".to_string()]);
            assert!(last_error.as_deref().unwrap().contains("cannot bind C"));
        }
        other => panic!("expected ModelUnavailable, got {other:?}"),
    }
    assert!(err.to_string().contains("X, Y"));
    assert!(log.lock().unwrap().generations.is_empty());
}

#[tokio::test]
async fn not_found_model_retries_with_alternate() {
    let connector = FakeConnector::with_directory(&["B", "C"]).not_found(&["B"]);
    let log = connector.log.clone();
    let answer = assistant(connector, secrets_with_key())
        .generate_response("hello", None, None)
        .await
        .unwrap();

    assert_eq!(answer, "answer from C");
    let log = log.lock().unwrap();
    let models: Vec<_> = log.generations.iter().map(|(m, _)| m.as_str()).collect();
    assert_eq!(models, vec!["B", "C"]);
    assert!(log.generations.len() <= 2);
    let prompts: Vec<_> = log.generations.iter().map(|(_, p)| p.as_str()).collect();
    assert_eq!(prompts[0], prompts[1]);
}

#[tokio::test]
async fn other_errors_are_not_retried() {
    let connector = FakeConnector::with_directory(&["B", "C"]).broken(&["B"]);
    let log = connector.log.clone();
    let err = assistant(connector, secrets_with_key())
        .generate_response("hello", None, None)
        .await
        .unwrap_err();

    match &err {
        Error::GenerationFailed { message, available } => {
            assert!(message.contains("internal error"));
            assert_eq!(available, &vec!["B".to_string(), "C".to_string()]);
        }
        other => panic!("expected GenerationFailed, got {other:?}"),
    }
    assert_eq!(log.lock().unwrap().generations.len(), 1);
}

#[tokio::test]
async fn exhausted_alternates_fail_after_one_pass() {
    let directory = ["B", "C", "D", "E", "F", "G"];
    let connector = FakeConnector::with_directory(&directory)
        .not_found(&["B", "C"])
        .broken(&["D", "E", "F", "G"]);
    let log = connector.log.clone();
    let err = assistant(connector, secrets_with_key())
        .generate_response("hello", None, None)
        .await
        .unwrap_err();

    match &err {
        Error::GenerationFailed { message, available } => {
            assert!(message.contains("internal error"));
            assert_eq!(available.len(), 5);
        }
        other => panic!("expected GenerationFailed, got {other:?}"),
    }
    assert_eq!(log.lock().unwrap().generations.len(), directory.len());
}

#[tokio::test]
async fn unlisted_failed_model_does_not_add_an_attempt() {
    let connector = FakeConnector::with_directory(&["X", "Y"]).not_found(&["A", "X", "Y"]);
    let log = connector.log.clone();
    let err = Assistant::new(
        secrets_with_key(),
        connector,
        vec!["A".into()],
        PromptBuilder::default(),
    )
    .generate_response("hello", None, None)
    .await
    .unwrap_err();

    assert!(matches!(err, Error::GenerationFailed { .. }));
    let log = log.lock().unwrap();
    let models: Vec<_> = log.generations.iter().map(|(m, _)| m.as_str()).collect();
    assert_eq!(models, vec!["A", "X"]);
}

#[tokio::test]
async fn prompt_embeds_courses_guidelines_and_question() {
    let connector = FakeConnector::with_directory(&["A"]);
    let log = connector.log.clone();
    assistant(connector, secrets_with_key())
        .generate_response(
            "2歳の子のイヤイヤ期に悩んでいます",
            Some("講座名,対象\nイヤイヤ期講座,1-3歳\n"),
            Some("医療的な判断はしない"),
        )
        .await
        .unwrap();

    let log = log.lock().unwrap();
    let prompt = &log.generations[0].1;
    assert!(prompt.contains(COURSE_SECTION_HEADER));
    assert!(prompt.contains("イヤイヤ期講座,1-3歳"));
    assert!(prompt.contains(GUIDELINE_SECTION_HEADER));
    assert!(prompt.contains("医療的な判断はしない"));
    assert!(prompt.contains("2歳の子のイヤイヤ期に悩んでいます"));
}

#[tokio::test]
async fn prompt_without_courses_asks_for_empathy() {
    let connector = FakeConnector::with_directory(&["A"]);
    let log = connector.log.clone();
    assistant(connector, secrets_with_key())
        .generate_response("寝かしつけに時間がかかります", None, None)
        .await
        .unwrap();

    let log = log.lock().unwrap();
    let prompt = &log.generations[0].1;
    assert!(!prompt.contains(COURSE_SECTION_HEADER));
    assert!(!prompt.contains(GUIDELINE_SECTION_HEADER));
    assert!(prompt.contains("優しく共感しながら応答してください"));
    assert!(prompt.contains("寝かしつけに時間がかかります"));
}

#[tokio::test]
async fn list_models_surfaces_directory_errors() {
    let err = assistant(FakeConnector::default(), secrets_with_key())
        .list_models()
        .await
        .unwrap_err();
    assert!(matches!(err, Error::Http(_)));
}
