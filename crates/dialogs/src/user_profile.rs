//! The seven-step user profile script: transport, name, age, picture,
//! summary and save.

use std::sync::Arc;

use {
    async_trait::async_trait,
    parley_config::{ChannelsConfig, DialogConfig, ParleyConfig},
    parley_sessions::Storage,
    tracing::{info, warn},
};

use crate::{
    choice::{FoundChoice, to_choices},
    error::DialogError,
    profile::{Age, Picture, Transport},
    prompt::{Prompt, PromptKind, PromptOptions, Validation},
    slot::{ProfileSlot, slot_for},
    waterfall::{DialogRunner, StepAction, StepContext, StepValue, Waterfall},
};

pub const ATTACHMENT_PROMPT: &str = "ATTACHMENT_PROMPT";
pub const CHOICE_PROMPT: &str = "CHOICE_PROMPT";
pub const CONFIRM_PROMPT: &str = "CONFIRM_PROMPT";
pub const NAME_PROMPT: &str = "NAME_PROMPT";
pub const NUMBER_PROMPT: &str = "NUMBER_PROMPT";

const STEPS: &[&str] = &[
    "transport",
    "name",
    "name_confirm",
    "age",
    "picture",
    "confirm",
    "save",
];

const NO_ATTACHMENTS: &str = "No attachments received. Proceeding without a profile picture...";
const PICTURE_CAPTION: &str = "This is your profile picture.";
const PICTURE_NOT_SHOWN: &str = "A profile picture was saved but could not be displayed here.";

pub struct UserProfileDialog {
    slot: Box<dyn ProfileSlot>,
    dialog: DialogConfig,
    channels: ChannelsConfig,
}

impl UserProfileDialog {
    /// Dialog using the profile slot selected by `config.dialog.strategy`.
    pub fn new(config: &ParleyConfig, storage: Arc<dyn Storage>) -> Self {
        Self::with_slot(config, slot_for(config.dialog.strategy, storage))
    }

    pub fn with_slot(config: &ParleyConfig, slot: Box<dyn ProfileSlot>) -> Self {
        Self {
            slot,
            dialog: config.dialog.clone(),
            channels: config.channels.clone(),
        }
    }

    pub fn slot(&self) -> &dyn ProfileSlot {
        self.slot.as_ref()
    }

    fn age_retry(&self) -> String {
        format!(
            "The value entered must be greater than {} and less than {}.",
            self.dialog.min_age, self.dialog.max_age
        )
    }

    async fn transport_step(&self, step: &mut StepContext<'_>) -> Result<StepAction, DialogError> {
        let profile = self.slot.begin(step).await?;

        if let Some(transport) = profile.transport {
            return Ok(StepAction::Skip(transport_value(transport)));
        }

        Ok(StepAction::ask(
            CHOICE_PROMPT,
            PromptOptions::new("Please enter your mode of transport.")
                .with_choices(to_choices(&Transport::ALL.map(Transport::as_str))),
        ))
    }

    async fn name_step(&self, step: &mut StepContext<'_>) -> Result<StepAction, DialogError> {
        let mut profile = self.slot.load(step)?;
        let transport = match &step.result {
            StepValue::Choice(found) => Transport::from_value(&found.value),
            _ => None,
        }
        .ok_or_else(|| unexpected("name", "transport choice", &step.result))?;
        profile.transport = Some(transport);
        self.slot.store(step, &profile)?;

        if let Some(name) = profile.name {
            return Ok(StepAction::Skip(StepValue::Text(name)));
        }
        Ok(StepAction::ask(NAME_PROMPT, PromptOptions::new("Please enter your name.")))
    }

    async fn name_confirm_step(&self, step: &mut StepContext<'_>) -> Result<StepAction, DialogError> {
        let mut profile = self.slot.load(step)?;
        profile.require(profile.transport.as_ref(), "transport")?;

        let StepValue::Text(name) = &step.result else {
            return Err(unexpected("name_confirm", "name", &step.result));
        };
        let name = name.clone();
        profile.name = Some(name.clone());
        self.slot.store(step, &profile)?;

        if !step.skipped {
            step.send_text(format!("Thanks {name}.")).await?;
        }

        if profile.age.is_some() {
            return Ok(StepAction::Continue(StepValue::Confirm(true)));
        }
        Ok(StepAction::ask(
            CONFIRM_PROMPT,
            PromptOptions::new("Do you want to give your age?"),
        ))
    }

    async fn age_step(&self, step: &mut StepContext<'_>) -> Result<StepAction, DialogError> {
        let profile = self.slot.load(step)?;
        profile.require(profile.name.as_ref(), "name")?;

        if let Some(age) = profile.age {
            return Ok(StepAction::Skip(age_value(age)));
        }

        match step.result {
            StepValue::Confirm(true) => Ok(StepAction::ask(
                NUMBER_PROMPT,
                PromptOptions::new("Please enter your age.").with_retry(self.age_retry()),
            )),
            StepValue::Confirm(false) => Ok(StepAction::Continue(StepValue::Declined)),
            _ => Err(unexpected("age", "confirmation", &step.result)),
        }
    }

    async fn picture_step(&self, step: &mut StepContext<'_>) -> Result<StepAction, DialogError> {
        let mut profile = self.slot.load(step)?;
        let age = match step.result {
            StepValue::Number(n) if n >= 0.0 && n.fract() == 0.0 && n <= f64::from(u32::MAX) => {
                Age::Given(n as u32)
            },
            StepValue::Declined => Age::Declined,
            _ => return Err(unexpected("picture", "age", &step.result)),
        };
        profile.age = Some(age);
        self.slot.store(step, &profile)?;

        if !step.skipped {
            let msg = match age {
                Age::Given(n) => format!("I have your age as {n}."),
                Age::Declined => "No age given.".to_string(),
            };
            step.send_text(msg).await?;
        }

        if let Some(picture) = profile.picture {
            return Ok(StepAction::Skip(picture_value(picture)));
        }

        let channel = self.channels.get(step.channel_id());
        if !channel.attachment_prompt {
            step.send_text(channel.skip_notice).await?;
            return Ok(StepAction::Continue(StepValue::Declined));
        }

        Ok(StepAction::ask(
            ATTACHMENT_PROMPT,
            PromptOptions::new("Please attach a profile picture (or type any message to skip).")
                .with_retry("The attachment must be a jpeg/png image file."),
        ))
    }

    async fn confirm_step(&self, step: &mut StepContext<'_>) -> Result<StepAction, DialogError> {
        let mut profile = self.slot.load(step)?;
        profile.require(profile.age.as_ref(), "age")?;

        let picture = match &step.result {
            StepValue::Attachments(attachments) => attachments
                .first()
                .cloned()
                .map_or(Picture::Declined, Picture::Attachment),
            StepValue::Declined => Picture::Declined,
            _ => return Err(unexpected("confirm", "picture", &step.result)),
        };
        profile.picture = Some(picture);
        self.slot.store(step, &profile)?;

        step.send_text(profile.summary()?).await?;

        if let Some(attachment) = profile.picture_attachment()
            && let Err(e) = step
                .send_attachment(attachment.clone(), Some(PICTURE_CAPTION.to_string()))
                .await
        {
            warn!(session = %step.key, error = %e, "could not display profile picture");
            step.send_text(PICTURE_NOT_SHOWN).await?;
        }

        Ok(StepAction::ask(
            CONFIRM_PROMPT,
            PromptOptions::new("Would you like me to save this information?"),
        ))
    }

    async fn save_step(&self, step: &mut StepContext<'_>) -> Result<StepAction, DialogError> {
        let profile = self.slot.load(step)?;
        match step.result {
            StepValue::Confirm(true) => {
                self.slot.save(step, &profile).await?;
                info!(session = %step.key, strategy = %self.slot.strategy(), "user profile saved");
                step.send_text("User Profile Saved.").await?;
            },
            StepValue::Confirm(false) => {
                self.slot.discard(step).await?;
                step.send_text("Thanks. Your profile will not be kept.").await?;
            },
            _ => return Err(unexpected("save", "confirmation", &step.result)),
        }
        Ok(StepAction::Finish)
    }
}

#[async_trait]
impl Waterfall for UserProfileDialog {
    fn id(&self) -> &str {
        "user_profile"
    }

    fn steps(&self) -> &'static [&'static str] {
        STEPS
    }

    fn prompts(&self) -> Vec<(&'static str, Prompt)> {
        let (min, max) = (self.dialog.min_age, self.dialog.max_age);
        let allowed = self.dialog.picture_content_types.clone();

        vec![
            (NAME_PROMPT, Prompt::new(PromptKind::Text)),
            (CHOICE_PROMPT, Prompt::new(PromptKind::Choice)),
            (CONFIRM_PROMPT, Prompt::new(PromptKind::Confirm)),
            (
                NUMBER_PROMPT,
                Prompt::with_validator(PromptKind::Number, move |recognized| {
                    validate_age(recognized, min, max)
                }),
            ),
            (
                ATTACHMENT_PROMPT,
                Prompt::with_validator(PromptKind::Attachment, move |recognized| {
                    validate_picture(recognized, &allowed)
                }),
            ),
        ]
    }

    async fn run_step(&self, step: &mut StepContext<'_>) -> Result<StepAction, DialogError> {
        match step.index {
            0 => self.transport_step(step).await,
            1 => self.name_step(step).await,
            2 => self.name_confirm_step(step).await,
            3 => self.age_step(step).await,
            4 => self.picture_step(step).await,
            5 => self.confirm_step(step).await,
            _ => self.save_step(step).await,
        }
    }
}

/// Runner for the user profile dialog.
pub fn user_profile_runner(
    config: &ParleyConfig,
    storage: Arc<dyn Storage>,
) -> DialogRunner<UserProfileDialog> {
    DialogRunner::new(UserProfileDialog::new(config, Arc::clone(&storage)), storage)
}

/// Whole numbers strictly between the bounds. Whatever the configured
/// bounds, an accepted age is never negative and fits a `u32`.
fn validate_age(recognized: Option<StepValue>, min: i64, max: i64) -> Validation {
    let lower = min.max(-1) as f64;
    let upper = max.min(i64::from(u32::MAX) + 1) as f64;
    match recognized {
        Some(StepValue::Number(n)) if n.fract() == 0.0 && n > lower && n < upper => {
            Validation::accept(StepValue::Number(n))
        },
        _ => Validation::Reject,
    }
}

/// Keep attachments of an allowed type. Nothing attached at all is an
/// answer too: the user skipped the picture.
fn validate_picture(recognized: Option<StepValue>, allowed: &[String]) -> Validation {
    match recognized {
        Some(StepValue::Attachments(attachments)) => {
            let valid: Vec<_> = attachments
                .into_iter()
                .filter(|a| a.has_content_type(allowed))
                .collect();
            if valid.is_empty() {
                Validation::Reject
            } else {
                Validation::accept(StepValue::Attachments(valid))
            }
        },
        _ => Validation::accept_with_notice(StepValue::Attachments(Vec::new()), NO_ATTACHMENTS),
    }
}

fn transport_value(transport: Transport) -> StepValue {
    StepValue::Choice(FoundChoice {
        index: Transport::ALL
            .iter()
            .position(|t| *t == transport)
            .unwrap_or_default(),
        value: transport.as_str().to_string(),
    })
}

fn age_value(age: Age) -> StepValue {
    match age {
        Age::Given(n) => StepValue::Number(f64::from(n)),
        Age::Declined => StepValue::Declined,
    }
}

fn picture_value(picture: Picture) -> StepValue {
    match picture {
        Picture::Attachment(attachment) => StepValue::Attachments(vec![attachment]),
        Picture::Declined => StepValue::Declined,
    }
}

fn unexpected(step: &'static str, expected: &'static str, actual: &StepValue) -> DialogError {
    DialogError::UnexpectedResult {
        step,
        expected,
        actual: actual.describe(),
    }
}
