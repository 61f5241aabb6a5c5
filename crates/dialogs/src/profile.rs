use std::fmt;

use {
    parley_common::Attachment,
    serde::{Deserialize, Serialize},
};

use crate::error::DialogError;

/// Answers collected by the user profile dialog.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserProfile {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub transport: Option<Transport>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub age: Option<Age>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub picture: Option<Picture>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Transport {
    Car,
    Bus,
    Bicycle,
}

impl Transport {
    pub const ALL: [Transport; 3] = [Self::Car, Self::Bus, Self::Bicycle];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Car => "Car",
            Self::Bus => "Bus",
            Self::Bicycle => "Bicycle",
        }
    }

    /// Exact, case-insensitive lookup by display name.
    pub fn from_value(value: &str) -> Option<Self> {
        Self::ALL
            .into_iter()
            .find(|t| t.as_str().eq_ignore_ascii_case(value.trim()))
    }
}

impl fmt::Display for Transport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The age answer. `Declined` records that the user chose not to say.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Age {
    Given(u32),
    Declined,
}

/// The picture answer. `Declined` covers both "sent no attachment" and
/// "channel cannot take attachments".
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Picture {
    Attachment(Attachment),
    Declined,
}

impl UserProfile {
    pub const EMPTY: UserProfile = UserProfile {
        transport: None,
        name: None,
        age: None,
        picture: None,
    };

    /// `I have your mode of transport as Car and your name as Alfred and
    /// your age as 42.` The age clause is left out when the age was declined.
    pub fn summary(&self) -> Result<String, DialogError> {
        let transport = self.require(self.transport.as_ref(), "transport")?;
        let name = self.require(self.name.as_ref(), "name")?;
        let age = self.require(self.age.as_ref(), "age")?;

        let mut msg = format!("I have your mode of transport as {transport} and your name as {name}");
        if let Age::Given(age) = age {
            msg.push_str(&format!(" and your age as {age}"));
        }
        msg.push('.');
        Ok(msg)
    }

    /// Fail with [`DialogError::MissingProfileField`] when `value` is unset.
    pub fn require<'a, T>(
        &self,
        value: Option<&'a T>,
        field: &'static str,
    ) -> Result<&'a T, DialogError> {
        value.ok_or_else(|| DialogError::MissingProfileField {
            field,
            profile: serde_json::to_string(self).unwrap_or_else(|_| format!("{self:?}")),
        })
    }

    pub fn picture_attachment(&self) -> Option<&Attachment> {
        match &self.picture {
            Some(Picture::Attachment(a)) => Some(a),
            _ => None,
        }
    }
}
