//! Request-scoped correlation state.
//!
//! A [`CorrelationContext`] is created once per inbound request by
//! [`Pipeline::run`](super::Pipeline::run) and handed by `&mut` to every
//! interceptor. Its id never changes after creation; interceptors share
//! data with each other through the typed [`annotations`](CorrelationContext::annotations)
//! map instead of globals or thread-locals.

use std::fmt;
use std::time::SystemTime;

use http::Extensions;

/// Longest inbound id accepted by [`CorrelationContext::get_or_create`].
pub const MAX_ID_LEN: usize = 128;

pub struct CorrelationContext {
    id: String,
    created_at: SystemTime,
    annotations: Extensions,
}

impl CorrelationContext {
    /// Start a context with a fresh random (UUID v4) identifier.
    #[must_use]
    pub fn create() -> Self {
        Self::with_id(uuid::Uuid::new_v4().to_string())
    }

    /// Reuse `existing` when it is a usable identifier, otherwise create one.
    ///
    /// An identifier is usable when it is 1 to [`MAX_ID_LEN`] visible ASCII
    /// characters, which also makes it a valid header value.
    #[must_use]
    pub fn get_or_create(existing: Option<&str>) -> Self {
        match existing.map(str::trim) {
            Some(id) if is_valid_id(id) => Self::with_id(id.to_string()),
            Some(rejected) => {
                tracing::debug!(
                    len = rejected.len(),
                    "discarding unusable inbound request id"
                );
                Self::create()
            }
            None => Self::create(),
        }
    }

    fn with_id(id: String) -> Self {
        Self {
            id,
            created_at: SystemTime::now(),
            annotations: Extensions::new(),
        }
    }

    #[must_use]
    pub fn id(&self) -> &str {
        &self.id
    }

    #[must_use]
    pub const fn created_at(&self) -> SystemTime {
        self.created_at
    }

    #[must_use]
    pub const fn annotations(&self) -> &Extensions {
        &self.annotations
    }

    pub fn annotations_mut(&mut self) -> &mut Extensions {
        &mut self.annotations
    }
}

impl fmt::Debug for CorrelationContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CorrelationContext")
            .field("id", &self.id)
            .field("created_at", &self.created_at)
            .field("annotations", &self.annotations.len())
            .finish()
    }
}

fn is_valid_id(id: &str) -> bool {
    !id.is_empty() && id.len() <= MAX_ID_LEN && id.bytes().all(|b| b.is_ascii_graphic())
}
