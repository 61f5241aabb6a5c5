use std::{marker::PhantomData, sync::Arc};

use {
    anyhow::Context,
    serde::{Serialize, de::DeserializeOwned},
    tracing::trace,
};

use crate::{key::SessionKey, storage::Storage};

/// Typed per-session state, one value of `T` per [`SessionKey`].
///
/// Values round-trip through [`Storage`] on every call, so a value returned
/// by [`get`](Self::get) is a private copy: mutating it has no effect on the
/// store until it is passed back to [`set`](Self::set).
pub struct SessionStore<T> {
    storage: Arc<dyn Storage>,
    namespace: String,
    _state: PhantomData<fn() -> T>,
}

impl<T> Clone for SessionStore<T> {
    fn clone(&self) -> Self {
        Self {
            storage: Arc::clone(&self.storage),
            namespace: self.namespace.clone(),
            _state: PhantomData,
        }
    }
}

impl<T> SessionStore<T>
where
    T: Serialize + DeserializeOwned + Default,
{
    pub fn new(storage: Arc<dyn Storage>, namespace: impl Into<String>) -> Self {
        Self {
            storage,
            namespace: namespace.into(),
            _state: PhantomData,
        }
    }

    /// The stored value for `key`, or `T::default()` on first access.
    pub async fn get(&self, key: &SessionKey) -> anyhow::Result<T> {
        let storage_key = key.scoped(&self.namespace);
        match self.storage.read(&storage_key).await? {
            Some(value) => serde_json::from_value(value)
                .with_context(|| format!("corrupt session state at {storage_key}")),
            None => {
                trace!(session = %key, namespace = %self.namespace, "fresh session state");
                Ok(T::default())
            },
        }
    }

    /// Associate `value` with `key`.
    pub async fn set(&self, key: &SessionKey, value: &T) -> anyhow::Result<()> {
        let value = serde_json::to_value(value)?;
        self.storage
            .write(&key.scoped(&self.namespace), value)
            .await
    }

    /// Reset `key` to an empty value.
    pub async fn clear(&self, key: &SessionKey) -> anyhow::Result<()> {
        self.storage.delete(&key.scoped(&self.namespace)).await
    }

    /// Whether anything has been stored for `key`.
    pub async fn contains(&self, key: &SessionKey) -> anyhow::Result<bool> {
        Ok(self
            .storage
            .read(&key.scoped(&self.namespace))
            .await?
            .is_some())
    }
}
