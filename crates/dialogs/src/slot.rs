//! Where the user profile dialog keeps its working profile.
//!
//! [`SessionSlot`] keeps it in the session's dialog state, so every
//! conversation has its own copy. [`GlobalSlot`] and [`PropertySlot`] keep a
//! single profile for the whole process or for the dialog instance. They
//! behave identically for one conversation at a time and corrupt each other
//! as soon as two conversations interleave.

use std::sync::{Arc, Mutex, PoisonError};

use {
    async_trait::async_trait,
    parley_config::StorageStrategy,
    parley_sessions::{SessionStore, Storage},
    tracing::debug,
};

use crate::{error::DialogError, profile::UserProfile, waterfall::StepContext};

/// Session store namespace holding saved profiles.
pub const USER_PROFILE: &str = "user_profile";

/// Step value under which [`SessionSlot`] keeps the working profile.
const WORKING_PROFILE: &str = "userProfile";

#[async_trait]
pub trait ProfileSlot: Send + Sync {
    fn strategy(&self) -> StorageStrategy;

    /// Start of a run: set up and return the working profile.
    async fn begin(&self, step: &mut StepContext<'_>) -> Result<UserProfile, DialogError>;

    fn load(&self, step: &StepContext<'_>) -> Result<UserProfile, DialogError>;

    fn store(&self, step: &mut StepContext<'_>, profile: &UserProfile) -> Result<(), DialogError>;

    /// The user agreed to keep the profile.
    async fn save(&self, step: &mut StepContext<'_>, profile: &UserProfile) -> Result<(), DialogError>;

    /// The user declined to keep the profile.
    async fn discard(&self, step: &mut StepContext<'_>) -> Result<(), DialogError>;
}

// ── Session ─────────────────────────────────────────────────────────────────

/// Working profile in the session's step values; saved profiles in the
/// session store.
pub struct SessionSlot {
    profiles: SessionStore<UserProfile>,
}

impl SessionSlot {
    pub fn new(storage: Arc<dyn Storage>) -> Self {
        Self {
            profiles: SessionStore::new(storage, USER_PROFILE),
        }
    }

    pub fn profiles(&self) -> &SessionStore<UserProfile> {
        &self.profiles
    }
}

#[async_trait]
impl ProfileSlot for SessionSlot {
    fn strategy(&self) -> StorageStrategy {
        StorageStrategy::Session
    }

    async fn begin(&self, step: &mut StepContext<'_>) -> Result<UserProfile, DialogError> {
        let profile = self.profiles.get(step.key).await?;
        self.store(step, &profile)?;
        Ok(profile)
    }

    fn load(&self, step: &StepContext<'_>) -> Result<UserProfile, DialogError> {
        match step.values.get(WORKING_PROFILE) {
            Some(value) => serde_json::from_value(value.clone())
                .map_err(|e| DialogError::Storage(anyhow::anyhow!("corrupt working profile: {e}"))),
            None => Ok(UserProfile::default()),
        }
    }

    fn store(&self, step: &mut StepContext<'_>, profile: &UserProfile) -> Result<(), DialogError> {
        let value = serde_json::to_value(profile)
            .map_err(|e| DialogError::Storage(anyhow::anyhow!("serialize working profile: {e}")))?;
        step.values.insert(WORKING_PROFILE.to_string(), value);
        Ok(())
    }

    async fn save(&self, step: &mut StepContext<'_>, profile: &UserProfile) -> Result<(), DialogError> {
        debug!(session = %step.key, "saving user profile");
        self.profiles.set(step.key, profile).await?;
        Ok(())
    }

    async fn discard(&self, step: &mut StepContext<'_>) -> Result<(), DialogError> {
        debug!(session = %step.key, "discarding user profile");
        self.profiles.clear(step.key).await?;
        step.values.remove(WORKING_PROFILE);
        Ok(())
    }
}

// ── Global ──────────────────────────────────────────────────────────────────

static GLOBAL_USER_PROFILE: Mutex<UserProfile> = Mutex::new(UserProfile::EMPTY);

/// One profile for the whole process, reset whenever any conversation
/// starts the dialog.
#[derive(Debug, Default, Clone, Copy)]
pub struct GlobalSlot;

impl GlobalSlot {
    fn with<R>(f: impl FnOnce(&mut UserProfile) -> R) -> R {
        let mut guard = GLOBAL_USER_PROFILE
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        f(&mut guard)
    }
}

#[async_trait]
impl ProfileSlot for GlobalSlot {
    fn strategy(&self) -> StorageStrategy {
        StorageStrategy::Global
    }

    async fn begin(&self, _step: &mut StepContext<'_>) -> Result<UserProfile, DialogError> {
        Ok(Self::with(|profile| {
            *profile = UserProfile::default();
            profile.clone()
        }))
    }

    fn load(&self, _step: &StepContext<'_>) -> Result<UserProfile, DialogError> {
        Ok(Self::with(|profile| profile.clone()))
    }

    fn store(&self, _step: &mut StepContext<'_>, profile: &UserProfile) -> Result<(), DialogError> {
        Self::with(|global| *global = profile.clone());
        Ok(())
    }

    async fn save(&self, step: &mut StepContext<'_>, _profile: &UserProfile) -> Result<(), DialogError> {
        debug!(session = %step.key, "global profile kept in memory");
        Ok(())
    }

    async fn discard(&self, _step: &mut StepContext<'_>) -> Result<(), DialogError> {
        Self::with(|profile| *profile = UserProfile::default());
        Ok(())
    }
}

// ── Property ────────────────────────────────────────────────────────────────

/// One profile per dialog instance. The dialog is shared by every
/// conversation, so this is as shared as [`GlobalSlot`].
#[derive(Debug, Default)]
pub struct PropertySlot {
    profile: Mutex<UserProfile>,
}

impl PropertySlot {
    fn with<R>(&self, f: impl FnOnce(&mut UserProfile) -> R) -> R {
        let mut guard = self.profile.lock().unwrap_or_else(PoisonError::into_inner);
        f(&mut guard)
    }
}

#[async_trait]
impl ProfileSlot for PropertySlot {
    fn strategy(&self) -> StorageStrategy {
        StorageStrategy::Property
    }

    async fn begin(&self, _step: &mut StepContext<'_>) -> Result<UserProfile, DialogError> {
        Ok(self.with(|profile| {
            *profile = UserProfile::default();
            profile.clone()
        }))
    }

    fn load(&self, _step: &StepContext<'_>) -> Result<UserProfile, DialogError> {
        Ok(self.with(|profile| profile.clone()))
    }

    fn store(&self, _step: &mut StepContext<'_>, profile: &UserProfile) -> Result<(), DialogError> {
        self.with(|own| *own = profile.clone());
        Ok(())
    }

    async fn save(&self, step: &mut StepContext<'_>, _profile: &UserProfile) -> Result<(), DialogError> {
        debug!(session = %step.key, "instance profile kept in memory");
        Ok(())
    }

    async fn discard(&self, _step: &mut StepContext<'_>) -> Result<(), DialogError> {
        self.with(|profile| *profile = UserProfile::default());
        Ok(())
    }
}

/// Slot for a configured strategy.
pub fn slot_for(strategy: StorageStrategy, storage: Arc<dyn Storage>) -> Box<dyn ProfileSlot> {
    match strategy {
        StorageStrategy::Session => Box::new(SessionSlot::new(storage)),
        StorageStrategy::Global => Box::new(GlobalSlot),
        StorageStrategy::Property => Box::new(PropertySlot::default()),
    }
}
