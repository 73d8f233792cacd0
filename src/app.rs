use anyhow::anyhow;
use tokio::task::JoinHandle;

use crate::conversation::Conversation;
use crate::gemini::GeminiClient;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputMode {
    Normal,
    Editing,
}

/// A dispatched generation request: the prompt that produced it and the task
/// running the API call.
pub struct PendingTurn {
    prompt: String,
    task: JoinHandle<anyhow::Result<String>>,
}

pub struct App {
    // Core state
    pub should_quit: bool,
    pub input_mode: InputMode,

    // Input state
    pub input: String,
    pub cursor: usize, // cursor position in input, in chars

    // Conversation state
    pub conversation: Conversation,
    pub pending: Option<PendingTurn>,

    // Chat viewport
    pub chat_scroll: u16,
    pub chat_height: u16, // inner height of the chat area, set during render
    pub chat_width: u16,  // inner width, for wrap calculations

    // Animation state
    pub animation_frame: u8, // 0-2 for ellipsis animation

    // Gemini
    pub client: GeminiClient,
    pub model: String,
}

impl App {
    pub fn new(client: GeminiClient, model: String) -> Self {
        Self {
            should_quit: false,
            input_mode: InputMode::Editing,

            input: String::new(),
            cursor: 0,

            conversation: Conversation::new(),
            pending: None,

            chat_scroll: 0,
            chat_height: 0,
            chat_width: 0,

            animation_frame: 0,

            client,
            model,
        }
    }

    /// Submit the current input. Blank input is ignored, and a submission
    /// while a request is in flight is dropped without clearing the input.
    pub fn submit_input(&mut self) {
        if self.input.trim().is_empty() {
            return;
        }

        let prompt = self.input.clone();
        let payload = match self.conversation.begin_turn(&prompt) {
            Some(payload) => payload,
            None => return,
        };

        self.input.clear();
        self.cursor = 0;

        let client = self.client.clone();
        let model = self.model.clone();
        let task = tokio::spawn(async move { client.generate(&model, &payload).await });
        self.pending = Some(PendingTurn { prompt, task });

        // Scroll so the loading indicator is visible
        self.scroll_chat_to_bottom();
    }

    /// Deliver the outcome of a finished generation task. Called from the
    /// event loop, so history and the loading flag keep a single writer.
    pub async fn poll_pending(&mut self) {
        let finished = self
            .pending
            .as_ref()
            .map(|p| p.task.is_finished())
            .unwrap_or(false);
        if !finished {
            return;
        }

        if let Some(PendingTurn { prompt, task }) = self.pending.take() {
            let outcome = match task.await {
                Ok(result) => result,
                Err(err) => Err(anyhow!("generation task failed: {}", err)),
            };
            self.conversation.complete_turn(&prompt, outcome);
            self.scroll_chat_to_bottom();
        }
    }

    /// Tick animation frame (called by Tick event)
    pub fn tick_animation(&mut self) {
        if self.conversation.is_loading() {
            self.animation_frame = (self.animation_frame + 1) % 3;
        }
    }

    // Chat scrolling
    pub fn scroll_down(&mut self) {
        self.chat_scroll = self.chat_scroll.saturating_add(1);
    }

    pub fn scroll_up(&mut self) {
        self.chat_scroll = self.chat_scroll.saturating_sub(1);
    }

    pub fn scroll_to_top(&mut self) {
        self.chat_scroll = 0;
    }

    /// Scroll so the latest turn (and the loading indicator) is visible.
    pub fn scroll_chat_to_bottom(&mut self) {
        // Use actual chat width for wrap calculation, default to 50 if not set
        let wrap_width = if self.chat_width > 0 {
            self.chat_width as usize
        } else {
            50
        };

        let mut total_lines: u16 = 0;

        for turn in self.conversation.history() {
            for line in turn.as_line().lines() {
                // Use character count, not byte length, for proper UTF-8 handling
                let char_count = line.chars().count();
                if char_count == 0 {
                    total_lines += 1; // Empty line still takes one line
                } else {
                    total_lines += ((char_count / wrap_width) + 1) as u16;
                }
            }
            total_lines += 1; // Blank line after each turn
        }

        if self.conversation.is_loading() {
            total_lines += 2; // "🤖:" + "Pensando..."
        }

        let visible_height = if self.chat_height > 0 {
            self.chat_height
        } else {
            20
        };

        if total_lines > visible_height {
            self.chat_scroll = total_lines.saturating_sub(visible_height);
        } else {
            self.chat_scroll = 0;
        }
    }
}
