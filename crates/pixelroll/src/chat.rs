//! Where finished roll messages go.

use tokio::sync::mpsc;
use tracing::debug;

/// Errors posting a chat message.
#[derive(Debug, thiserror::Error)]
pub enum ChatError {
    /// The host's chat input or submit control is gone.
    #[error("chat input or submit control not found")]
    MissingChatSurface,
}

/// Receives formatted roll messages.
///
/// The bridge calls this from its actor task, one post at a time. A
/// failed post is logged and dropped; it is never retried.
pub trait ChatSink: Send + 'static {
    /// Posts one message.
    ///
    /// # Errors
    /// Returns [`ChatError::MissingChatSurface`] if there is nowhere to
    /// post.
    fn post(&mut self, text: &str) -> Result<(), ChatError>;
}

/// Forwards posts into a channel.
#[derive(Debug, Clone)]
pub struct ChannelChat {
    sender: mpsc::UnboundedSender<String>,
}

impl ChannelChat {
    /// Creates the sink and the receiving end.
    pub fn new() -> (Self, mpsc::UnboundedReceiver<String>) {
        let (sender, receiver) = mpsc::unbounded_channel();
        (Self { sender }, receiver)
    }
}

impl ChatSink for ChannelChat {
    fn post(&mut self, text: &str) -> Result<(), ChatError> {
        self.sender
            .send(text.to_owned())
            .map_err(|_| ChatError::MissingChatSurface)
    }
}

/// A text box plus a submit control, like a web chat.
pub trait ChatSurface: Send + 'static {
    /// Current contents of the input, or `None` if it cannot be found.
    fn read_input(&self) -> Option<String>;

    /// Replaces the contents of the input.
    fn write_input(&mut self, text: &str);

    /// Presses submit. Returns `false` if the control cannot be found.
    fn submit(&mut self) -> bool;
}

/// Posts through a [`ChatSurface`], leaving whatever the user was typing
/// in place afterwards.
#[derive(Debug)]
pub struct TextboxChat<S> {
    surface: S,
}

impl<S: ChatSurface> TextboxChat<S> {
    pub fn new(surface: S) -> Self {
        Self { surface }
    }

    pub fn surface(&self) -> &S {
        &self.surface
    }
}

impl<S: ChatSurface> ChatSink for TextboxChat<S> {
    fn post(&mut self, text: &str) -> Result<(), ChatError> {
        let prior = self
            .surface
            .read_input()
            .ok_or(ChatError::MissingChatSurface)?;

        self.surface.write_input(text);
        let submitted = self.surface.submit();
        self.surface.write_input(&prior);

        if !submitted {
            return Err(ChatError::MissingChatSurface);
        }
        debug!(text = %text, "chat input submitted");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Default)]
    struct FakeChat {
        input: Option<String>,
        has_button: bool,
        sent: Vec<String>,
    }

    impl ChatSurface for FakeChat {
        fn read_input(&self) -> Option<String> {
            self.input.clone()
        }

        fn write_input(&mut self, text: &str) {
            if let Some(input) = &mut self.input {
                *input = text.to_owned();
            }
        }

        fn submit(&mut self) -> bool {
            if !self.has_button {
                return false;
            }
            if let Some(input) = &self.input {
                self.sent.push(input.clone());
            }
            true
        }
    }

    #[test]
    fn test_textbox_chat_posts_and_restores_draft() {
        let mut chat = TextboxChat::new(FakeChat {
            input: Some("half-typed".into()),
            has_button: true,
            sent: Vec::new(),
        });

        chat.post("ROLLED: 3 5").unwrap();

        assert_eq!(chat.surface().sent, ["ROLLED: 3 5"]);
        assert_eq!(chat.surface().input.as_deref(), Some("half-typed"));
    }

    #[test]
    fn test_textbox_chat_without_input_is_missing_surface() {
        let mut chat = TextboxChat::new(FakeChat::default());
        assert!(matches!(
            chat.post("x"),
            Err(ChatError::MissingChatSurface)
        ));
    }

    #[test]
    fn test_textbox_chat_without_button_restores_and_errors() {
        let mut chat = TextboxChat::new(FakeChat {
            input: Some(String::new()),
            has_button: false,
            sent: Vec::new(),
        });

        assert!(chat.post("x").is_err());
        assert_eq!(chat.surface().input.as_deref(), Some(""));
    }

    #[test]
    fn test_channel_chat_closed_receiver_is_missing_surface() {
        let (mut chat, rx) = ChannelChat::new();
        chat.post("one").unwrap();
        drop(rx);
        assert!(matches!(
            chat.post("two"),
            Err(ChatError::MissingChatSurface)
        ));
    }
}
