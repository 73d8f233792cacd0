use anyhow::Result;
use std::future::Future;

/// Role marker baked into user turns, both in history and in the outbound prompt.
pub const USER_PREFIX: &str = "🧑‍💻: ";
/// Role marker baked into model turns.
pub const MODEL_PREFIX: &str = "🤖: ";
/// The single line appended to history when the generation call fails.
pub const ERROR_MARKER: &str = "⚠️ Error en la consulta";
/// Substituted for the model's text when the API returns an empty body.
pub const EMPTY_RESPONSE: &str = "No se recibió respuesta";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TurnRole {
    User,
    Model,
    Error,
}

/// One appended line of conversation history. Immutable once appended.
#[derive(Debug, Clone)]
pub struct Turn {
    pub role: TurnRole,
    pub text: String,
}

impl Turn {
    pub fn user(text: impl Into<String>) -> Self {
        Self {
            role: TurnRole::User,
            text: text.into(),
        }
    }

    pub fn model(text: impl Into<String>) -> Self {
        Self {
            role: TurnRole::Model,
            text: text.into(),
        }
    }

    pub fn error() -> Self {
        Self {
            role: TurnRole::Error,
            text: String::new(),
        }
    }

    /// Display form with the role marker baked in. Error turns render as the
    /// bare marker.
    pub fn as_line(&self) -> String {
        match self.role {
            TurnRole::User => format!("{}{}", USER_PREFIX, self.text),
            TurnRole::Model => format!("{}{}", MODEL_PREFIX, self.text),
            TurnRole::Error => ERROR_MARKER.to_string(),
        }
    }
}

/// Builds the outbound payload from the current history and the new prompt.
///
/// Swapping in a windowing or summarizing strategy only touches this seam;
/// the conversation itself never inspects the payload.
pub trait PromptBuilder: Send + Sync {
    fn build(&self, history: &[Turn], prompt: &str) -> String;
}

/// Serializes every prior turn, newline-joined, followed by the prefixed new
/// prompt. Context grows linearly with conversation length and is resent in
/// full on every turn.
pub struct FullHistory;

impl PromptBuilder for FullHistory {
    fn build(&self, history: &[Turn], prompt: &str) -> String {
        let mut payload = history
            .iter()
            .map(Turn::as_line)
            .collect::<Vec<_>>()
            .join("\n");
        payload.push('\n');
        payload.push_str(USER_PREFIX);
        payload.push_str(prompt);
        payload
    }
}

/// Chat history plus the in-flight guard. At most one generation request is
/// outstanding at a time; a second submission while one is pending is dropped
/// silently.
pub struct Conversation {
    history: Vec<Turn>,
    loading: bool,
    builder: Box<dyn PromptBuilder>,
}

impl Conversation {
    pub fn new() -> Self {
        Self::with_builder(Box::new(FullHistory))
    }

    pub fn with_builder(builder: Box<dyn PromptBuilder>) -> Self {
        Self {
            history: Vec::new(),
            loading: false,
            builder,
        }
    }

    pub fn history(&self) -> &[Turn] {
        &self.history
    }

    pub fn is_loading(&self) -> bool {
        self.loading
    }

    /// Accepts the prompt and returns the outbound payload, or `None` while a
    /// request is already in flight. No content precondition: empty prompts
    /// are accepted here and filtered (or not) by the caller.
    pub fn begin_turn(&mut self, prompt: &str) -> Option<String> {
        if self.loading {
            return None;
        }
        self.loading = true;
        Some(self.builder.build(&self.history, prompt))
    }

    /// Delivers the outcome of the request started by `begin_turn`.
    ///
    /// On success the prompt and the response are appended, with
    /// [`EMPTY_RESPONSE`] standing in for an empty body. On failure only the
    /// error marker is appended; the prompt is dropped. The loading flag is
    /// released on both paths.
    pub fn complete_turn(&mut self, prompt: &str, outcome: Result<String>) {
        match outcome {
            Ok(text) => {
                self.history.push(Turn::user(prompt));
                if text.is_empty() {
                    self.history.push(Turn::model(EMPTY_RESPONSE));
                } else {
                    self.history.push(Turn::model(text));
                }
            }
            Err(_) => self.history.push(Turn::error()),
        }
        self.loading = false;
    }

    /// One full turn: guard, invoke `generate` with the payload, record the
    /// outcome. Returns without touching history when a request is already
    /// outstanding.
    pub async fn submit_turn<F, Fut>(&mut self, prompt: &str, generate: F)
    where
        F: FnOnce(String) -> Fut,
        Fut: Future<Output = Result<String>>,
    {
        let payload = match self.begin_turn(prompt) {
            Some(payload) => payload,
            None => return,
        };
        let outcome = generate(payload).await;
        self.complete_turn(prompt, outcome);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::anyhow;

    #[test]
    fn begin_turn_drops_duplicate_submissions() {
        let mut conv = Conversation::new();
        assert!(conv.begin_turn("hola").is_some());
        assert!(conv.is_loading());

        // Second call while pending: no payload, no state change
        assert!(conv.begin_turn("otra").is_none());
        assert!(conv.history().is_empty());
        assert!(conv.is_loading());
    }

    #[test]
    fn first_payload_is_a_newline_plus_the_prefixed_prompt() {
        let mut conv = Conversation::new();
        let payload = conv.begin_turn("hola").unwrap();
        assert_eq!(payload, format!("\n{}hola", USER_PREFIX));
    }

    #[test]
    fn blank_prompts_are_accepted_by_the_conversation() {
        let mut conv = Conversation::new();
        assert!(conv.begin_turn("").is_some());
    }

    #[tokio::test]
    async fn submit_turn_is_a_no_op_while_loading() {
        let mut conv = Conversation::new();
        conv.begin_turn("primera");

        conv.submit_turn("segunda", |_| async { Ok("nunca".to_string()) })
            .await;

        assert!(conv.history().is_empty());
        assert!(conv.is_loading());
    }

    #[tokio::test]
    async fn successful_turn_appends_prompt_then_response() {
        let mut conv = Conversation::new();
        conv.submit_turn("hola", |_| async {
            Ok("¡hola! ¿en qué puedo ayudarte?".to_string())
        })
        .await;

        assert!(!conv.is_loading());
        let lines: Vec<String> = conv.history().iter().map(Turn::as_line).collect();
        assert_eq!(
            lines,
            vec![
                "🧑‍💻: hola".to_string(),
                "🤖: ¡hola! ¿en qué puedo ayudarte?".to_string(),
            ]
        );
    }

    #[tokio::test]
    async fn empty_response_becomes_the_placeholder() {
        let mut conv = Conversation::new();
        conv.submit_turn("ping", |_| async { Ok(String::new()) }).await;

        assert_eq!(conv.history().len(), 2);
        assert_eq!(
            conv.history()[1].as_line(),
            format!("{}{}", MODEL_PREFIX, EMPTY_RESPONSE)
        );
    }

    #[tokio::test]
    async fn failed_turn_appends_exactly_the_error_marker() {
        let mut conv = Conversation::new();
        conv.submit_turn("primera", |_| async { Ok("bien".to_string()) })
            .await;
        assert_eq!(conv.history().len(), 2);

        conv.submit_turn("x", |_| async { Err(anyhow!("connection reset")) })
            .await;

        // Exactly one new entry; the prompt itself is not recorded
        assert_eq!(conv.history().len(), 3);
        assert_eq!(conv.history()[2].as_line(), ERROR_MARKER);
        assert!(!conv.history().iter().any(|t| t.text == "x"));
        assert!(!conv.is_loading());
    }

    #[tokio::test]
    async fn payload_resends_the_full_history_in_order() {
        let mut conv = Conversation::new();
        conv.submit_turn("uno", |_| async { Ok("respuesta uno".to_string()) })
            .await;
        conv.submit_turn("dos", |_| async { Ok("respuesta dos".to_string()) })
            .await;

        let payload = conv.begin_turn("tres").unwrap();
        let expected = format!(
            "🧑‍💻: uno\n🤖: respuesta uno\n🧑‍💻: dos\n🤖: respuesta dos\n{}tres",
            USER_PREFIX
        );
        assert_eq!(payload, expected);
    }

    #[tokio::test]
    async fn loading_releases_after_each_outcome() {
        let mut conv = Conversation::new();

        conv.submit_turn("a", |_| async { Ok("b".to_string()) }).await;
        assert!(!conv.is_loading());

        conv.submit_turn("c", |_| async { Err(anyhow!("timeout")) }).await;
        assert!(!conv.is_loading());
    }
}
