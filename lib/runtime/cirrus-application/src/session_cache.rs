use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use chrono::Utc;
use tokio::sync::OnceCell;
use tracing::{debug, info};

use cirrus_domain::{ExporterError, MessageCatalog, Session, SessionKey, TenantConfig};
use cirrus_ports::SessionPort;

type Slot = Arc<OnceCell<Arc<Session>>>;

/// Process-lifetime session cache keyed by [`SessionKey`].
///
/// Each key owns a slot that is initialized at most once at a time, so
/// concurrent first use of the same credentials authenticates once. A failed
/// authentication leaves the slot empty.
pub struct SessionCache {
    sessions: Arc<dyn SessionPort>,
    messages: Arc<MessageCatalog>,
    slots: Mutex<HashMap<SessionKey, Slot>>,
}

impl SessionCache {
    pub fn new(sessions: Arc<dyn SessionPort>, messages: Arc<MessageCatalog>) -> Self {
        Self {
            sessions,
            messages,
            slots: Mutex::new(HashMap::new()),
        }
    }

    fn slot(&self, key: &SessionKey) -> Slot {
        let mut slots = self.slots.lock().unwrap_or_else(|e| e.into_inner());
        Arc::clone(slots.entry(key.clone()).or_default())
    }

    /// Swaps an expired slot for a fresh one unless another task already did.
    fn replace_expired(&self, key: &SessionKey, stale: &Slot) -> Slot {
        let mut slots = self.slots.lock().unwrap_or_else(|e| e.into_inner());
        let current = slots.entry(key.clone()).or_default();
        if Arc::ptr_eq(current, stale) {
            *current = Slot::default();
        }
        Arc::clone(current)
    }

    pub async fn get_or_create(&self, tenant: &TenantConfig) -> Result<Arc<Session>, ExporterError> {
        let key = tenant.session_key();
        let mut slot = self.slot(&key);

        if let Some(session) = slot.get() {
            if !session.is_expired(Utc::now()) {
                debug!(tenant = %tenant.project_name, "session cache hit");
                return Ok(Arc::clone(session));
            }
            info!(
                tenant = %tenant.project_name,
                "{}",
                self.messages.format("session_expired", &[&tenant.project_name])
            );
            slot = self.replace_expired(&key, &slot);
        }

        let session = slot
            .get_or_try_init(|| async {
                let session = self.sessions.authenticate(tenant).await.map_err(|err| {
                    match err.downcast::<ExporterError>() {
                        Ok(typed) => typed,
                        Err(other) => ExporterError::Authentication {
                            tenant: tenant.project_name.clone(),
                            reason: format!("{other:#}"),
                        },
                    }
                })?;
                if session.token().trim().is_empty() {
                    return Err(ExporterError::Authentication {
                        tenant: tenant.project_name.clone(),
                        reason: self.messages.get("token_error").to_string(),
                    });
                }
                Ok(Arc::new(session))
            })
            .await?;
        Ok(Arc::clone(session))
    }

    pub fn len(&self) -> usize {
        self.slots
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .values()
            .filter(|slot| slot.initialized())
            .count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
