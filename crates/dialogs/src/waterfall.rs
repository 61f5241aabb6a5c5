//! Waterfall step runner.
//!
//! A waterfall is a fixed, ordered list of steps. Each step either asks a
//! prompt (the turn ends and the runner waits for that conversation's next
//! message), hands a value straight to the next step, or finishes the run.
//! Between turns the only thing remembered is the per-session
//! [`DialogState`]: the step index, the pending prompt and the step values.

use std::{collections::HashMap, sync::Arc};

use {
    async_trait::async_trait,
    parley_channels::{ChannelError, ChannelOutbound},
    parley_common::{Attachment, InboundMessage, Reply, ReplyPayload},
    parley_sessions::{SessionKey, SessionStore, Storage, TurnLocks},
    serde::{Deserialize, Serialize},
    serde_json::{Map, Value},
    tracing::{debug, error, trace},
};

use crate::{
    choice::FoundChoice,
    error::DialogError,
    prompt::{Prompt, PromptOptions, Validation},
};

/// Session store namespace holding [`DialogState`].
pub const DIALOG_STATE: &str = "dialog_state";

/// Value handed from one step to the next.
#[derive(Debug, Clone, PartialEq)]
pub enum StepValue {
    /// Nothing: the first step of a run, or a step that produced no value.
    None,
    Text(String),
    Choice(FoundChoice),
    Confirm(bool),
    Number(f64),
    Attachments(Vec<Attachment>),
    /// The user chose not to answer.
    Declined,
}

impl StepValue {
    /// Short description used in error messages.
    pub fn describe(&self) -> String {
        match self {
            Self::None => "nothing".into(),
            Self::Text(t) => format!("text {t:?}"),
            Self::Choice(c) => format!("choice {:?}", c.value),
            Self::Confirm(b) => format!("confirmation {b}"),
            Self::Number(n) => format!("number {n}"),
            Self::Attachments(a) => format!("{} attachment(s)", a.len()),
            Self::Declined => "declined".into(),
        }
    }
}

/// What a step does next.
#[derive(Debug, Clone, PartialEq)]
pub enum StepAction {
    /// Send the prompt registered as `prompt_id` and wait for an answer.
    Ask {
        prompt_id: &'static str,
        options: PromptOptions,
    },
    /// Move on with a value that was already known. The next step sees
    /// `skipped == true` and must not acknowledge it.
    Skip(StepValue),
    /// Move on with a freshly decided value, without asking.
    Continue(StepValue),
    /// End the run.
    Finish,
}

impl StepAction {
    pub fn ask(prompt_id: &'static str, options: PromptOptions) -> Self {
        Self::Ask { prompt_id, options }
    }
}

/// A prompt waiting for an answer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PendingPrompt {
    pub prompt_id: String,
    pub options: PromptOptions,
}

/// Per-session position in the waterfall.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DialogState {
    pub step: usize,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pending: Option<PendingPrompt>,
    /// Values steps pass forward through the run.
    #[serde(default, skip_serializing_if = "Map::is_empty")]
    pub values: Map<String, Value>,
}

/// Whether the dialog is still running after a turn.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DialogStatus {
    Waiting,
    Complete,
}

/// Result of one turn.
#[derive(Debug, Clone)]
pub struct TurnOutcome {
    pub status: DialogStatus,
    /// Replies delivered during the turn, in order.
    pub replies: Vec<Reply>,
}

impl TurnOutcome {
    pub fn texts(&self) -> Vec<&str> {
        self.replies.iter().filter_map(Reply::text).collect()
    }
}

/// Everything a step can see and do.
pub struct StepContext<'a> {
    pub key: &'a SessionKey,
    pub message: &'a InboundMessage,
    pub index: usize,
    /// Value from the previous step or the answered prompt.
    pub result: StepValue,
    /// The previous step skipped its prompt because the value was known.
    pub skipped: bool,
    /// Values carried across the steps of this run, persisted per session.
    pub values: &'a mut Map<String, Value>,
    outbound: &'a dyn ChannelOutbound,
    sent: &'a mut Vec<Reply>,
}

impl<'a> StepContext<'a> {
    /// A context outside any runner, positioned at the first step.
    #[cfg(test)]
    pub(crate) fn for_test(
        key: &'a SessionKey,
        message: &'a InboundMessage,
        values: &'a mut Map<String, Value>,
        outbound: &'a dyn ChannelOutbound,
        sent: &'a mut Vec<Reply>,
    ) -> Self {
        Self {
            key,
            message,
            index: 0,
            result: StepValue::None,
            skipped: false,
            values,
            outbound,
            sent,
        }
    }

    pub fn channel_id(&self) -> &str {
        &self.message.channel_id
    }

    pub async fn send_text(&mut self, text: impl Into<String>) -> Result<(), DialogError> {
        let payload = ReplyPayload::Text { text: text.into() };
        self.deliver(payload).await.map_err(DialogError::from)
    }

    /// Send an attachment. Rendering failures are returned to the caller,
    /// which decides how to degrade.
    pub async fn send_attachment(
        &mut self,
        attachment: Attachment,
        caption: Option<String>,
    ) -> Result<(), ChannelError> {
        self.deliver(ReplyPayload::Attachment {
            attachment,
            caption,
        })
        .await
    }

    async fn deliver(&mut self, payload: ReplyPayload) -> Result<(), ChannelError> {
        let reply = self.message.reply(payload);
        self.outbound.send(&reply).await?;
        self.sent.push(reply);
        Ok(())
    }
}

/// A fixed sequence of steps.
#[async_trait]
pub trait Waterfall: Send + Sync {
    fn id(&self) -> &str;

    /// Step names, in order. Their count is the length of the waterfall.
    fn steps(&self) -> &'static [&'static str];

    /// Prompts the steps may ask, keyed by prompt id.
    fn prompts(&self) -> Vec<(&'static str, Prompt)>;

    async fn run_step(&self, step: &mut StepContext<'_>) -> Result<StepAction, DialogError>;
}

/// Routes each inbound message to its session's position in a waterfall.
pub struct DialogRunner<W> {
    waterfall: W,
    prompts: HashMap<&'static str, Prompt>,
    states: SessionStore<DialogState>,
    locks: TurnLocks,
}

impl<W: Waterfall> DialogRunner<W> {
    pub fn new(waterfall: W, storage: Arc<dyn Storage>) -> Self {
        let prompts = waterfall.prompts().into_iter().collect();
        Self {
            waterfall,
            prompts,
            states: SessionStore::new(storage, DIALOG_STATE),
            locks: TurnLocks::new(),
        }
    }

    pub fn waterfall(&self) -> &W {
        &self.waterfall
    }

    /// Current dialog state of a session.
    pub async fn state(&self, key: &SessionKey) -> Result<DialogState, DialogError> {
        Ok(self.states.get(key).await?)
    }

    /// Process one inbound message.
    ///
    /// Turns for the same session are serialized. When a step fails the
    /// session's dialog state is left as it was before the turn, except
    /// after a structural error: the run is dropped so the next message
    /// starts over. The profile itself is not repaired.
    pub async fn on_turn(
        &self,
        message: &InboundMessage,
        outbound: &dyn ChannelOutbound,
    ) -> Result<TurnOutcome, DialogError> {
        let key = SessionKey::from(message);
        let _turn = self.locks.acquire(&key).await;

        let result = self.run_turn(&key, message, outbound).await;
        if let Err(e) = &result {
            if e.is_structural() {
                error!(
                    dialog = self.waterfall.id(),
                    session = %key,
                    error = %e,
                    "dialog state is inconsistent, restarting dialog"
                );
                if let Err(clear) = self.states.clear(&key).await {
                    error!(session = %key, error = %clear, "could not reset dialog state");
                }
            } else {
                error!(dialog = self.waterfall.id(), session = %key, error = %e, "turn failed");
            }
        }
        result
    }

    async fn run_turn(
        &self,
        key: &SessionKey,
        message: &InboundMessage,
        outbound: &dyn ChannelOutbound,
    ) -> Result<TurnOutcome, DialogError> {
        let mut state = self.states.get(key).await?;
        let mut sent = Vec::new();

        let (mut index, mut result, mut skipped) = match state.pending.take() {
            Some(pending) => {
                let prompt = self.prompt(&pending.prompt_id)?;
                match prompt.check(message, &pending.options) {
                    Validation::Reject => {
                        debug!(session = %key, prompt = %pending.prompt_id, "answer rejected, re-prompting");
                        let retry = prompt.render_retry(&pending.options);
                        self.send(message, outbound, &mut sent, retry).await?;
                        state.pending = Some(pending);
                        self.states.set(key, &state).await?;
                        return Ok(TurnOutcome {
                            status: DialogStatus::Waiting,
                            replies: sent,
                        });
                    },
                    Validation::Accept { value, notice } => {
                        if let Some(notice) = notice {
                            self.send(message, outbound, &mut sent, notice).await?;
                        }
                        (state.step + 1, value, false)
                    },
                }
            },
            None => {
                debug!(dialog = self.waterfall.id(), session = %key, "starting dialog");
                state = DialogState::default();
                (0, StepValue::None, false)
            },
        };

        let steps = self.waterfall.steps();
        loop {
            let Some(name) = steps.get(index) else {
                return self.finish(key, sent).await;
            };
            trace!(session = %key, step = *name, skipped, "running step");

            let action = {
                let mut ctx = StepContext {
                    key,
                    message,
                    index,
                    result,
                    skipped,
                    values: &mut state.values,
                    outbound,
                    sent: &mut sent,
                };
                self.waterfall.run_step(&mut ctx).await?
            };

            match action {
                StepAction::Ask { prompt_id, options } => {
                    let text = self.prompt(prompt_id)?.render(&options);
                    self.send(message, outbound, &mut sent, text).await?;
                    state.step = index;
                    state.pending = Some(PendingPrompt {
                        prompt_id: prompt_id.to_string(),
                        options,
                    });
                    self.states.set(key, &state).await?;
                    return Ok(TurnOutcome {
                        status: DialogStatus::Waiting,
                        replies: sent,
                    });
                },
                StepAction::Skip(value) => {
                    (index, result, skipped) = (index + 1, value, true);
                },
                StepAction::Continue(value) => {
                    (index, result, skipped) = (index + 1, value, false);
                },
                StepAction::Finish => return self.finish(key, sent).await,
            }
        }
    }

    async fn finish(&self, key: &SessionKey, sent: Vec<Reply>) -> Result<TurnOutcome, DialogError> {
        debug!(dialog = self.waterfall.id(), session = %key, "dialog complete");
        self.states.clear(key).await?;
        self.locks.prune_idle().await;
        Ok(TurnOutcome {
            status: DialogStatus::Complete,
            replies: sent,
        })
    }

    fn prompt(&self, prompt_id: &str) -> Result<&Prompt, DialogError> {
        self.prompts
            .get(prompt_id)
            .ok_or_else(|| DialogError::UnknownPrompt(prompt_id.to_string()))
    }

    async fn send(
        &self,
        message: &InboundMessage,
        outbound: &dyn ChannelOutbound,
        sent: &mut Vec<Reply>,
        text: String,
    ) -> Result<(), DialogError> {
        let reply = message.reply(ReplyPayload::Text { text });
        outbound.send(&reply).await?;
        sent.push(reply);
        Ok(())
    }
}

#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use {
        super::*,
        crate::prompt::PromptKind,
        parley_channels::CaptureOutbound,
        parley_common::Participant,
        parley_sessions::MemoryStorage,
    };

    /// Two questions, echoing both answers at the end.
    struct Echo;

    #[async_trait]
    impl Waterfall for Echo {
        fn id(&self) -> &str {
            "echo"
        }

        fn steps(&self) -> &'static [&'static str] {
            &["first", "second", "done"]
        }

        fn prompts(&self) -> Vec<(&'static str, Prompt)> {
            vec![
                ("text", Prompt::new(PromptKind::Text)),
                (
                    "number",
                    Prompt::with_validator(PromptKind::Number, |v| match v {
                        Some(StepValue::Number(n)) if n > 0.0 => Validation::accept(StepValue::Number(n)),
                        _ => Validation::Reject,
                    }),
                ),
            ]
        }

        async fn run_step(&self, step: &mut StepContext<'_>) -> Result<StepAction, DialogError> {
            match step.index {
                0 => Ok(StepAction::ask("text", PromptOptions::new("word?"))),
                1 => {
                    if let StepValue::Text(word) = &step.result {
                        step.values.insert("word".into(), Value::String(word.clone()));
                    }
                    Ok(StepAction::ask(
                        "number",
                        PromptOptions::new("number?").with_retry("positive number please"),
                    ))
                },
                _ => {
                    let word = step.values.get("word").and_then(Value::as_str).unwrap_or("?").to_string();
                    step.send_text(format!("{word} {}", step.result.describe())).await?;
                    Ok(StepAction::Finish)
                },
            }
        }
    }

    fn say(conversation: &str, text: &str) -> InboundMessage {
        InboundMessage::text("test", conversation, Participant::new(conversation, conversation), text)
    }

    #[tokio::test]
    async fn suspends_at_prompts_and_resumes() {
        let runner = DialogRunner::new(Echo, Arc::new(MemoryStorage::new()));
        let out = CaptureOutbound::new("test");

        let turn = runner.on_turn(&say("a", "hi"), &out).await.unwrap();
        assert_eq!(turn.texts(), vec!["word?"]);
        assert_eq!(turn.status, DialogStatus::Waiting);

        let turn = runner.on_turn(&say("a", "apple"), &out).await.unwrap();
        assert_eq!(turn.texts(), vec!["number?"]);

        let turn = runner.on_turn(&say("a", "-3"), &out).await.unwrap();
        assert_eq!(turn.texts(), vec!["positive number please"]);
        assert_eq!(turn.status, DialogStatus::Waiting);

        let turn = runner.on_turn(&say("a", "7"), &out).await.unwrap();
        assert_eq!(turn.texts(), vec!["apple number 7"]);
        assert_eq!(turn.status, DialogStatus::Complete);

        let key = SessionKey::for_conversation("test", "a");
        assert_eq!(runner.state(&key).await.unwrap(), DialogState::default());
    }

    #[tokio::test]
    async fn sessions_keep_separate_positions() {
        let runner = DialogRunner::new(Echo, Arc::new(MemoryStorage::new()));
        let out = CaptureOutbound::new("test");

        runner.on_turn(&say("a", "hi"), &out).await.unwrap();
        runner.on_turn(&say("a", "apple"), &out).await.unwrap();
        runner.on_turn(&say("b", "hi"), &out).await.unwrap();
        runner.on_turn(&say("b", "banana"), &out).await.unwrap();

        let a = runner.on_turn(&say("a", "1"), &out).await.unwrap();
        let b = runner.on_turn(&say("b", "2"), &out).await.unwrap();
        assert_eq!(a.texts(), vec!["apple number 1"]);
        assert_eq!(b.texts(), vec!["banana number 2"]);
    }

    #[tokio::test]
    async fn separator_in_channel_id_does_not_share_a_session() {
        let runner = DialogRunner::new(Echo, Arc::new(MemoryStorage::new()));
        let out = CaptureOutbound::new("test");
        let msg = |channel: &str, conversation: &str, text: &str| {
            InboundMessage::text(channel, conversation, Participant::new("u", "U"), text)
        };

        runner.on_turn(&msg("a:b", "c", "hi"), &out).await.unwrap();
        let turn = runner.on_turn(&msg("a", "b:c", "apple"), &out).await.unwrap();
        assert_eq!(turn.texts(), vec!["word?"]);
    }

    #[tokio::test]
    async fn replies_are_addressed_to_the_sender() {
        let runner = DialogRunner::new(Echo, Arc::new(MemoryStorage::new()));
        let out = CaptureOutbound::new("test");
        let msg = say("a", "hi");
        let turn = runner.on_turn(&msg, &out).await.unwrap();
        let reply = &turn.replies[0];
        assert_eq!(reply.recipient.id, "a");
        assert_eq!(reply.conversation_id, "a");
        assert_eq!(reply.reply_to_id, msg.id);
        assert_eq!(out.take().await.len(), 1);
    }

    #[tokio::test]
    async fn unknown_prompt_is_an_error() {
        struct Broken;

        #[async_trait]
        impl Waterfall for Broken {
            fn id(&self) -> &str {
                "broken"
            }

            fn steps(&self) -> &'static [&'static str] {
                &["only"]
            }

            fn prompts(&self) -> Vec<(&'static str, Prompt)> {
                Vec::new()
            }

            async fn run_step(&self, _: &mut StepContext<'_>) -> Result<StepAction, DialogError> {
                Ok(StepAction::ask("missing", PromptOptions::new("?")))
            }
        }

        let runner = DialogRunner::new(Broken, Arc::new(MemoryStorage::new()));
        let err = runner
            .on_turn(&say("a", "hi"), &CaptureOutbound::new("test"))
            .await
            .unwrap_err();
        assert!(matches!(err, DialogError::UnknownPrompt(id) if id == "missing"));
    }
}
