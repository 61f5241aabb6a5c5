//! Prompts: what a step asks, how the answer is recognized and how it is
//! validated.

use std::{fmt, sync::Arc};

use {
    parley_common::InboundMessage,
    serde::{Deserialize, Serialize},
};

use crate::{
    choice::{Choice, inline_list, recognize_choice, recognize_confirm, recognize_number, to_choices},
    waterfall::StepValue,
};

/// How an answer to a prompt is recognized.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PromptKind {
    /// Any non-empty text.
    Text,
    /// One of the choices in [`PromptOptions::choices`].
    Choice,
    /// Yes or no.
    Confirm,
    /// A number anywhere in the text.
    Number,
    /// One or more attachments.
    Attachment,
}

/// Per-ask prompt text. Persisted with the dialog state while the prompt
/// waits for an answer.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PromptOptions {
    pub prompt: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub retry_prompt: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub choices: Vec<Choice>,
}

impl PromptOptions {
    pub fn new(prompt: impl Into<String>) -> Self {
        Self {
            prompt: prompt.into(),
            ..Self::default()
        }
    }

    pub fn with_retry(mut self, retry_prompt: impl Into<String>) -> Self {
        self.retry_prompt = Some(retry_prompt.into());
        self
    }

    pub fn with_choices(mut self, choices: Vec<Choice>) -> Self {
        self.choices = choices;
        self
    }
}

/// Outcome of validating a recognized answer.
#[derive(Debug, Clone, PartialEq)]
pub enum Validation {
    /// Advance with `value`, sending `notice` first when present.
    Accept {
        value: StepValue,
        notice: Option<String>,
    },
    /// Stay on the prompt and send the retry text.
    Reject,
}

impl Validation {
    pub fn accept(value: StepValue) -> Self {
        Self::Accept {
            value,
            notice: None,
        }
    }

    pub fn accept_with_notice(value: StepValue, notice: impl Into<String>) -> Self {
        Self::Accept {
            value,
            notice: Some(notice.into()),
        }
    }
}

/// Validator: receives the recognized value (`None` when recognition
/// failed) and decides whether the prompt is answered. It may replace the
/// value, e.g. to filter attachments.
pub type Validator = Arc<dyn Fn(Option<StepValue>) -> Validation + Send + Sync>;

/// A registered prompt: a recognizer plus an optional validator.
#[derive(Clone)]
pub struct Prompt {
    kind: PromptKind,
    validator: Option<Validator>,
}

impl fmt::Debug for Prompt {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Prompt")
            .field("kind", &self.kind)
            .field("validator", &self.validator.is_some())
            .finish()
    }
}

impl Prompt {
    pub fn new(kind: PromptKind) -> Self {
        Self {
            kind,
            validator: None,
        }
    }

    pub fn with_validator(
        kind: PromptKind,
        validator: impl Fn(Option<StepValue>) -> Validation + Send + Sync + 'static,
    ) -> Self {
        Self {
            kind,
            validator: Some(Arc::new(validator)),
        }
    }

    /// Text sent when the prompt is first asked.
    pub fn render(&self, options: &PromptOptions) -> String {
        match self.kind {
            PromptKind::Choice => with_list(&options.prompt, &options.choices),
            PromptKind::Confirm => with_list(&options.prompt, &confirm_choices()),
            _ => options.prompt.clone(),
        }
    }

    /// Text sent after a rejected answer.
    pub fn render_retry(&self, options: &PromptOptions) -> String {
        match &options.retry_prompt {
            Some(retry) => retry.clone(),
            None => self.render(options),
        }
    }

    /// Recognize `message` as an answer.
    pub fn recognize(&self, message: &InboundMessage, options: &PromptOptions) -> Option<StepValue> {
        let text = message.text_or_empty();
        match self.kind {
            PromptKind::Text => {
                (!text.trim().is_empty()).then(|| StepValue::Text(text.trim().to_string()))
            },
            PromptKind::Choice => recognize_choice(text, &options.choices).map(StepValue::Choice),
            PromptKind::Confirm => recognize_confirm(text).map(StepValue::Confirm),
            PromptKind::Number => recognize_number(text).map(StepValue::Number),
            PromptKind::Attachment => {
                (!message.attachments.is_empty())
                    .then(|| StepValue::Attachments(message.attachments.clone()))
            },
        }
    }

    /// Recognize then validate. Without a validator any recognized answer is
    /// accepted and an unrecognized one rejected.
    pub fn check(&self, message: &InboundMessage, options: &PromptOptions) -> Validation {
        let recognized = self.recognize(message, options);
        match &self.validator {
            Some(validator) => (**validator)(recognized),
            None => recognized.map_or(Validation::Reject, Validation::accept),
        }
    }
}

fn confirm_choices() -> Vec<Choice> {
    to_choices(&["Yes", "No"])
}

fn with_list(prompt: &str, choices: &[Choice]) -> String {
    if choices.is_empty() {
        return prompt.to_string();
    }
    format!("{prompt} {}", inline_list(choices))
}

#[cfg(test)]
mod tests {
    use {
        super::*,
        parley_common::{Attachment, Participant},
    };

    fn message(text: &str) -> InboundMessage {
        InboundMessage::text("test", "c", Participant::new("u", "U"), text)
    }

    #[test]
    fn choice_prompt_renders_inline_list() {
        let prompt = Prompt::new(PromptKind::Choice);
        let options = PromptOptions::new("Please enter your mode of transport.")
            .with_choices(to_choices(&["Car", "Bus", "Bicycle"]));
        assert_eq!(
            prompt.render(&options),
            "Please enter your mode of transport. (1) Car, (2) Bus, or (3) Bicycle"
        );
        // No retry text: the full prompt is repeated.
        assert_eq!(prompt.render_retry(&options), prompt.render(&options));
    }

    #[test]
    fn confirm_prompt_appends_yes_no() {
        let prompt = Prompt::new(PromptKind::Confirm);
        assert_eq!(
            prompt.render(&PromptOptions::new("Do you want to give your age?")),
            "Do you want to give your age? (1) Yes or (2) No"
        );
    }

    #[test]
    fn retry_text_wins_when_present() {
        let prompt = Prompt::new(PromptKind::Number);
        let options = PromptOptions::new("Please enter your age.").with_retry("Try again.");
        assert_eq!(prompt.render(&options), "Please enter your age.");
        assert_eq!(prompt.render_retry(&options), "Try again.");
    }

    #[test]
    fn text_prompt_rejects_blank_input() {
        let prompt = Prompt::new(PromptKind::Text);
        let options = PromptOptions::new("Name?");
        assert_eq!(prompt.check(&message("   "), &options), Validation::Reject);
        assert_eq!(
            prompt.check(&message(" Alfred "), &options),
            Validation::accept(StepValue::Text("Alfred".into()))
        );
    }

    #[test]
    fn validator_sees_unrecognized_input() {
        let prompt = Prompt::with_validator(PromptKind::Attachment, |recognized| match recognized {
            Some(value) => Validation::accept(value),
            None => Validation::accept_with_notice(StepValue::Attachments(Vec::new()), "none"),
        });
        let options = PromptOptions::new("Attach");

        assert_eq!(
            prompt.check(&message("no picture"), &options),
            Validation::accept_with_notice(StepValue::Attachments(Vec::new()), "none")
        );

        let with_file = message("").with_attachment(Attachment::new("image/png"));
        assert_eq!(
            prompt.check(&with_file, &options),
            Validation::accept(StepValue::Attachments(vec![Attachment::new("image/png")]))
        );
    }

    #[test]
    fn validator_can_reject_recognized_value() {
        let prompt = Prompt::with_validator(PromptKind::Number, |recognized| match recognized {
            Some(StepValue::Number(n)) if n > 0.0 => Validation::accept(StepValue::Number(n)),
            _ => Validation::Reject,
        });
        let options = PromptOptions::new("Age?");
        assert_eq!(prompt.check(&message("-4"), &options), Validation::Reject);
        assert_eq!(
            prompt.check(&message("4"), &options),
            Validation::accept(StepValue::Number(4.0))
        );
    }
}
