//! Chat transcript builders for text-only and image-bearing prompts.

use serde::{Deserialize, Serialize};

use crate::provider::{ContentPart, Message, Role};

/// One demonstration pair placed ahead of the live prompt.
#[derive(Debug, Clone, PartialEq, Eq, Default, Deserialize, Serialize)]
pub struct FewShotExample {
    pub input: String,
    pub output: String,
    /// Image URL shown with the input; only used by [`create_messages_with_images`].
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub img: Option<String>,
}

impl FewShotExample {
    pub fn new(input: impl Into<String>, output: impl Into<String>) -> Self {
        Self {
            input: input.into(),
            output: output.into(),
            img: None,
        }
    }

    #[must_use]
    pub fn with_image(mut self, url: impl Into<String>) -> Self {
        self.img = Some(url.into());
        self
    }
}

/// Build `system, (user, assistant)*, history..., user`.
#[must_use]
pub fn create_messages(
    system: &str,
    user: &str,
    few_shot: &[FewShotExample],
    history: &[Message],
) -> Vec<Message> {
    let mut messages = Vec::with_capacity(2 + few_shot.len() * 2 + history.len());
    messages.push(Message::system(system));
    for example in few_shot {
        messages.push(Message::user(example.input.as_str()));
        messages.push(Message::assistant(example.output.as_str()));
    }
    messages.extend_from_slice(history);
    messages.push(Message::user(user));
    messages
}

/// Build a multimodal transcript ending in a user message that carries `image_url`.
///
/// Each few-shot example expands to a text user turn, an image user turn (skipped when
/// the example has no image) and a text assistant turn. The final user message holds
/// the image part first, then `user` as a text part when it is non-empty.
#[must_use]
pub fn create_messages_with_images(
    system: &str,
    image_url: &str,
    user: &str,
    few_shot: &[FewShotExample],
    history: &[Message],
) -> Vec<Message> {
    let mut messages = Vec::with_capacity(2 + few_shot.len() * 3 + history.len());
    messages.push(Message::with_parts(
        Role::System,
        vec![ContentPart::text(system)],
    ));
    for example in few_shot {
        messages.push(Message::with_parts(
            Role::User,
            vec![ContentPart::text(example.input.as_str())],
        ));
        if let Some(img) = &example.img {
            messages.push(Message::with_parts(
                Role::User,
                vec![ContentPart::image_url(img.as_str())],
            ));
        }
        messages.push(Message::with_parts(
            Role::Assistant,
            vec![ContentPart::text(example.output.as_str())],
        ));
    }
    messages.extend_from_slice(history);

    let mut last = vec![ContentPart::image_url(image_url)];
    if !user.is_empty() {
        last.push(ContentPart::text(user));
    }
    messages.push(Message::with_parts(Role::User, last));
    messages
}
