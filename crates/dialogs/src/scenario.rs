//! Scripted conversations with the replies a correctly isolated dialog
//! gives. Shared by the tests and the `demo` command.

use {
    parley_channels::ChannelOutbound,
    parley_common::{InboundMessage, Participant},
    tracing::{debug, warn},
};

use crate::waterfall::{DialogRunner, Waterfall};

pub const ALFRED_CONVERSATION: &str = "alfred-conv";
pub const BATMAN_CONVERSATION: &str = "batman-conv";

/// One user message and the replies expected for it.
#[derive(Debug, Clone)]
pub struct ScriptedTurn {
    pub conversation: &'static str,
    pub user: Participant,
    pub text: &'static str,
    pub expect: Vec<&'static str>,
}

#[derive(Debug, Clone)]
pub struct Scenario {
    pub name: &'static str,
    pub turns: Vec<ScriptedTurn>,
}

/// Which user is speaking in a script.
#[derive(Debug, Clone, Copy)]
struct Speaker {
    conversation: &'static str,
    id: &'static str,
    name: &'static str,
}

const ALFRED: Speaker = Speaker {
    conversation: ALFRED_CONVERSATION,
    id: "alfred",
    name: "Alfred",
};

const BATMAN: Speaker = Speaker {
    conversation: BATMAN_CONVERSATION,
    id: "batman",
    name: "Batman",
};

impl Speaker {
    fn says(self, text: &'static str, expect: &[&'static str]) -> ScriptedTurn {
        ScriptedTurn {
            conversation: self.conversation,
            user: Participant::new(self.id, self.name),
            text,
            expect: expect.to_vec(),
        }
    }
}

const TRANSPORT_PROMPT: &str = "Please enter your mode of transport. (1) Car, (2) Bus, or (3) Bicycle";
const NAME_PROMPT: &str = "Please enter your name.";
const AGE_INTENT_PROMPT: &str = "Do you want to give your age? (1) Yes or (2) No";
const AGE_PROMPT: &str = "Please enter your age.";
const PICTURE_PROMPT: &str = "Please attach a profile picture (or type any message to skip).";
const NO_PICTURE: &str = "No attachments received. Proceeding without a profile picture...";
const SAVE_PROMPT: &str = "Would you like me to save this information? (1) Yes or (2) No";
const SAVED: &str = "User Profile Saved.";

fn opening(who: Speaker, greeting: &'static str, transport: &'static str, thanks: &'static str) -> Vec<ScriptedTurn> {
    vec![
        who.says(greeting, &[TRANSPORT_PROMPT]),
        who.says(transport, &[NAME_PROMPT]),
        who.says(who.name, &[thanks, AGE_INTENT_PROMPT]),
    ]
}

fn closing(
    who: Speaker,
    age: &'static str,
    age_ack: &'static str,
    summary: &'static str,
) -> Vec<ScriptedTurn> {
    vec![
        who.says("Yes", &[AGE_PROMPT]),
        who.says(age, &[age_ack, PICTURE_PROMPT]),
        who.says("no picture", &[NO_PICTURE, summary, SAVE_PROMPT]),
        who.says("Yes", &[SAVED]),
    ]
}

fn alfred_opening() -> Vec<ScriptedTurn> {
    opening(ALFRED, "hello", "Car", "Thanks Alfred.")
}

fn alfred_closing() -> Vec<ScriptedTurn> {
    closing(
        ALFRED,
        "42",
        "I have your age as 42.",
        "I have your mode of transport as Car and your name as Alfred and your age as 42.",
    )
}

/// Alfred runs the whole script alone.
pub fn single_user() -> Scenario {
    Scenario {
        name: "single user",
        turns: [alfred_opening(), alfred_closing()].concat(),
    }
}

/// Alfred and Batman both reach the age question, then finish one after
/// the other.
pub fn two_users() -> Scenario {
    let batman_opening = opening(BATMAN, "hi", "Bus", "Thanks Batman.");
    let batman_closing = closing(
        BATMAN,
        "11",
        "I have your age as 11.",
        "I have your mode of transport as Bus and your name as Batman and your age as 11.",
    );
    Scenario {
        name: "two concurrent users",
        turns: [alfred_opening(), batman_opening, alfred_closing(), batman_closing].concat(),
    }
}

pub fn all() -> Vec<Scenario> {
    vec![single_user(), two_users()]
}

/// What happened on one scripted turn.
#[derive(Debug, Clone)]
pub struct TurnReport {
    pub conversation: &'static str,
    pub user: String,
    pub input: &'static str,
    pub expected: Vec<&'static str>,
    pub actual: Vec<String>,
    pub error: Option<String>,
    /// Some reply went to another user or conversation.
    pub misaddressed: bool,
}

impl TurnReport {
    pub fn passed(&self) -> bool {
        self.error.is_none() && !self.misaddressed && self.actual == self.expected
    }
}

#[derive(Debug, Clone)]
pub struct ScenarioReport {
    pub name: &'static str,
    pub turns: Vec<TurnReport>,
}

impl ScenarioReport {
    pub fn passed(&self) -> bool {
        self.turns.iter().all(TurnReport::passed)
    }

    pub fn failures(&self) -> impl Iterator<Item = &TurnReport> {
        self.turns.iter().filter(|t| !t.passed())
    }

    /// Every reply text sent to `conversation`, in order.
    pub fn transcript(&self, conversation: &str) -> Vec<&str> {
        self.turns
            .iter()
            .filter(|t| t.conversation == conversation)
            .flat_map(|t| t.actual.iter().map(String::as_str))
            .collect()
    }
}

/// Play `scenario` through `runner` on `channel_id`. A failing turn is
/// recorded and the script carries on.
pub async fn run_scenario<W: Waterfall>(
    runner: &DialogRunner<W>,
    outbound: &dyn ChannelOutbound,
    channel_id: &str,
    scenario: &Scenario,
) -> ScenarioReport {
    let mut turns = Vec::with_capacity(scenario.turns.len());

    for turn in &scenario.turns {
        let message = InboundMessage::text(channel_id, turn.conversation, turn.user.clone(), turn.text);
        let mut report = TurnReport {
            conversation: turn.conversation,
            user: turn.user.name.clone(),
            input: turn.text,
            expected: turn.expect.clone(),
            actual: Vec::new(),
            error: None,
            misaddressed: false,
        };

        match runner.on_turn(&message, outbound).await {
            Ok(outcome) => {
                report.misaddressed = outcome
                    .replies
                    .iter()
                    .any(|r| r.recipient != turn.user || r.conversation_id != turn.conversation);
                report.actual = outcome.texts().into_iter().map(str::to_string).collect();
            },
            Err(e) => report.error = Some(e.to_string()),
        }

        if report.passed() {
            debug!(scenario = scenario.name, user = %report.user, input = turn.text, "turn ok");
        } else {
            warn!(
                scenario = scenario.name,
                user = %report.user,
                input = turn.text,
                expected = ?report.expected,
                actual = ?report.actual,
                "turn diverged from script"
            );
        }
        turns.push(report);
    }

    ScenarioReport {
        name: scenario.name,
        turns,
    }
}
