//! Geofence registry.
//!
//! Authoritative in-memory set of active geofences per family, with
//! copy-on-write snapshots for the evaluation hot path: mutations build a
//! fresh `Arc<Vec<_>>` and swap it whole, so a snapshot taken for one
//! evaluation is never changed underneath it and a mutation applies from
//! the next sample on.
//!
//! Mutations write through to the durable [`GeofenceStore`] asynchronously;
//! a failed write never rolls back the in-memory set. Changes are
//! observable through explicit subscription handles.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use tokio::sync::{broadcast, RwLock};
use tracing::{error, info, warn};
use uuid::Uuid;

use domain::models::family::FamilyMember;
use domain::models::geofence::{CreateGeofenceRequest, Geofence, UpdateGeofenceRequest};

use crate::directory::FamilyDirectory;
use crate::error::EngineError;
use crate::store::GeofenceStore;

/// Capacity of the change feed. A lagging subscriber observes a `Lagged`
/// error and falls back to snapshot pruning.
const CHANGE_CHANNEL_CAPACITY: usize = 64;

/// Attempts for the durable write-through.
const SAVE_ATTEMPTS: u32 = 3;

/// Base backoff between write-through attempts.
const SAVE_BACKOFF: Duration = Duration::from_millis(250);

/// A change to the active geofence set.
#[derive(Debug, Clone)]
pub enum RegistryChange {
    Created(Geofence),
    Updated(Geofence),
    Deactivated { geofence_id: Uuid, family_id: Uuid },
}

/// Handle for one registry change subscription.
///
/// Owned by the caller and torn down deterministically via
/// [`GeofenceRegistry::unsubscribe`]; dropping the handle has the same
/// effect.
pub struct RegistrySubscription {
    id: u64,
    receiver: broadcast::Receiver<RegistryChange>,
}

impl RegistrySubscription {
    /// Subscription id, for logging.
    pub fn id(&self) -> u64 {
        self.id
    }

    /// Receives the next registry change.
    pub async fn recv(&mut self) -> Result<RegistryChange, broadcast::error::RecvError> {
        self.receiver.recv().await
    }
}

/// Authoritative registry of geofences.
pub struct GeofenceRegistry {
    directory: Arc<dyn FamilyDirectory>,
    store: Arc<dyn GeofenceStore>,
    families: RwLock<HashMap<Uuid, Arc<Vec<Geofence>>>>,
    changes: broadcast::Sender<RegistryChange>,
    next_subscription_id: AtomicU64,
}

impl GeofenceRegistry {
    pub fn new(directory: Arc<dyn FamilyDirectory>, store: Arc<dyn GeofenceStore>) -> Self {
        let (changes, _) = broadcast::channel(CHANGE_CHANNEL_CAPACITY);
        Self {
            directory,
            store,
            families: RwLock::new(HashMap::new()),
            changes,
            next_subscription_id: AtomicU64::new(1),
        }
    }

    /// Loads the active set from the durable store. Called once at startup.
    pub async fn hydrate(&self) -> Result<usize, EngineError> {
        let geofences = self.store.load_active().await?;
        let count = geofences.len();

        let mut grouped: HashMap<Uuid, Vec<Geofence>> = HashMap::new();
        for geofence in geofences {
            grouped.entry(geofence.family_id).or_default().push(geofence);
        }

        let mut families = self.families.write().await;
        families.clear();
        for (family_id, family_geofences) in grouped {
            families.insert(family_id, Arc::new(family_geofences));
        }

        info!(geofences = count, "Geofence registry hydrated");
        Ok(count)
    }

    /// Creates a geofence.
    pub async fn create(&self, request: CreateGeofenceRequest) -> Result<Geofence, EngineError> {
        self.authorize_manager(request.family_id, request.created_by)
            .await?;
        validate_geometry(request.latitude, request.longitude, request.radius_meters)?;

        let geofence = Geofence {
            id: Uuid::new_v4(),
            family_id: request.family_id,
            name: request.name,
            latitude: request.latitude,
            longitude: request.longitude,
            radius_meters: request.radius_meters,
            active: true,
            notify_on_enter: request.notify_on_enter,
            notify_on_exit: request.notify_on_exit,
            created_at: Utc::now(),
            created_by: request.created_by,
        };

        {
            let mut families = self.families.write().await;
            let entry = families
                .entry(geofence.family_id)
                .or_insert_with(|| Arc::new(Vec::new()));
            let mut next = entry.as_ref().clone();
            next.push(geofence.clone());
            *entry = Arc::new(next);
        }

        self.spawn_save(geofence.clone());
        let _ = self.changes.send(RegistryChange::Created(geofence.clone()));

        info!(
            geofence_id = %geofence.id,
            family_id = %geofence.family_id,
            name = %geofence.name,
            "Geofence created"
        );
        Ok(geofence)
    }

    /// Updates an active geofence. Partial: absent fields keep their value.
    pub async fn update(
        &self,
        geofence_id: Uuid,
        request: UpdateGeofenceRequest,
    ) -> Result<Geofence, EngineError> {
        let existing = self
            .get_active(geofence_id)
            .await
            .ok_or_else(|| EngineError::NotFound("Geofence not found".into()))?;
        self.authorize_manager(existing.family_id, request.acting_member_id)
            .await?;

        let mut updated = existing;
        if let Some(name) = request.name {
            updated.name = name;
        }
        if let Some(latitude) = request.latitude {
            updated.latitude = latitude;
        }
        if let Some(longitude) = request.longitude {
            updated.longitude = longitude;
        }
        if let Some(radius_meters) = request.radius_meters {
            updated.radius_meters = radius_meters;
        }
        if let Some(notify_on_enter) = request.notify_on_enter {
            updated.notify_on_enter = notify_on_enter;
        }
        if let Some(notify_on_exit) = request.notify_on_exit {
            updated.notify_on_exit = notify_on_exit;
        }
        validate_geometry(updated.latitude, updated.longitude, updated.radius_meters)?;

        {
            let mut families = self.families.write().await;
            if let Some(entry) = families.get_mut(&updated.family_id) {
                let mut next = entry.as_ref().clone();
                if let Some(slot) = next.iter_mut().find(|g| g.id == geofence_id) {
                    *slot = updated.clone();
                }
                *entry = Arc::new(next);
            }
        }

        self.spawn_save(updated.clone());
        let _ = self.changes.send(RegistryChange::Updated(updated.clone()));

        info!(geofence_id = %updated.id, family_id = %updated.family_id, "Geofence updated");
        Ok(updated)
    }

    /// Deactivates a geofence. Soft delete: the record stays in the durable
    /// store with `active = false`; no further events are ever emitted for
    /// it.
    pub async fn deactivate(
        &self,
        geofence_id: Uuid,
        acting_member_id: Uuid,
    ) -> Result<(), EngineError> {
        let existing = self
            .get_active(geofence_id)
            .await
            .ok_or_else(|| EngineError::NotFound("Geofence not found".into()))?;
        self.authorize_manager(existing.family_id, acting_member_id)
            .await?;

        {
            let mut families = self.families.write().await;
            if let Some(entry) = families.get_mut(&existing.family_id) {
                let next: Vec<Geofence> = entry
                    .as_ref()
                    .iter()
                    .filter(|g| g.id != geofence_id)
                    .cloned()
                    .collect();
                *entry = Arc::new(next);
            }
        }

        self.spawn_set_active(geofence_id, false);
        let _ = self.changes.send(RegistryChange::Deactivated {
            geofence_id,
            family_id: existing.family_id,
        });

        info!(geofence_id = %geofence_id, family_id = %existing.family_id, "Geofence deactivated");
        Ok(())
    }

    /// Snapshot of a family's active geofences. The returned Arc is
    /// immutable; later mutations swap in a fresh one.
    pub async fn active_for(&self, family_id: Uuid) -> Arc<Vec<Geofence>> {
        let families = self.families.read().await;
        families
            .get(&family_id)
            .cloned()
            .unwrap_or_else(|| Arc::new(Vec::new()))
    }

    /// Looks up an active geofence by id.
    pub async fn get_active(&self, geofence_id: Uuid) -> Option<Geofence> {
        let families = self.families.read().await;
        families
            .values()
            .flat_map(|geofences| geofences.iter())
            .find(|g| g.id == geofence_id)
            .cloned()
    }

    /// Lists a family's geofences. Deactivated ones come from the durable
    /// store.
    pub async fn list_for_family(
        &self,
        family_id: Uuid,
        include_inactive: bool,
    ) -> Result<Vec<Geofence>, EngineError> {
        if include_inactive {
            Ok(self.store.for_family(family_id, true).await?)
        } else {
            Ok(self.active_for(family_id).await.as_ref().clone())
        }
    }

    /// Subscribes to registry changes.
    pub fn subscribe(&self) -> RegistrySubscription {
        let id = self.next_subscription_id.fetch_add(1, Ordering::SeqCst);
        info!(subscription_id = id, "Registry subscription opened");
        RegistrySubscription {
            id,
            receiver: self.changes.subscribe(),
        }
    }

    /// Tears down a subscription.
    pub fn unsubscribe(&self, subscription: RegistrySubscription) {
        info!(subscription_id = subscription.id, "Registry subscription closed");
        drop(subscription);
    }

    /// Number of live subscriptions.
    pub fn subscription_count(&self) -> usize {
        self.changes.receiver_count()
    }

    async fn authorize_manager(
        &self,
        family_id: Uuid,
        user_id: Uuid,
    ) -> Result<FamilyMember, EngineError> {
        let member = self
            .directory
            .member(family_id, user_id)
            .await?
            .ok_or_else(|| EngineError::Unauthorized("Not a member of this family".into()))?;
        if !member.role.can_manage_geofences() {
            return Err(EngineError::Unauthorized(
                "Role may not manage geofences".into(),
            ));
        }
        Ok(member)
    }

    fn spawn_save(&self, geofence: Geofence) {
        let store = Arc::clone(&self.store);
        tokio::spawn(async move {
            for attempt in 1..=SAVE_ATTEMPTS {
                match store.save(&geofence).await {
                    Ok(()) => return,
                    Err(e) if attempt < SAVE_ATTEMPTS => {
                        warn!(geofence_id = %geofence.id, attempt, error = %e, "Geofence save failed, retrying");
                        tokio::time::sleep(SAVE_BACKOFF * attempt).await;
                    }
                    Err(e) => {
                        error!(geofence_id = %geofence.id, error = %e, "Geofence save failed permanently");
                    }
                }
            }
        });
    }

    fn spawn_set_active(&self, geofence_id: Uuid, active: bool) {
        let store = Arc::clone(&self.store);
        tokio::spawn(async move {
            for attempt in 1..=SAVE_ATTEMPTS {
                match store.set_active(geofence_id, active).await {
                    Ok(()) => return,
                    Err(e) if attempt < SAVE_ATTEMPTS => {
                        warn!(geofence_id = %geofence_id, attempt, error = %e, "Geofence flag update failed, retrying");
                        tokio::time::sleep(SAVE_BACKOFF * attempt).await;
                    }
                    Err(e) => {
                        error!(geofence_id = %geofence_id, error = %e, "Geofence flag update failed permanently");
                    }
                }
            }
        });
    }
}

fn validate_geometry(latitude: f64, longitude: f64, radius_meters: f64) -> Result<(), EngineError> {
    if !latitude.is_finite() || !(-90.0..=90.0).contains(&latitude) {
        return Err(EngineError::InvalidGeometry(format!(
            "latitude {latitude} out of range"
        )));
    }
    if !longitude.is_finite() || !(-180.0..=180.0).contains(&longitude) {
        return Err(EngineError::InvalidGeometry(format!(
            "longitude {longitude} out of range"
        )));
    }
    if !radius_meters.is_finite() || radius_meters <= 0.0 {
        return Err(EngineError::InvalidGeometry(
            "radius must be positive".into(),
        ));
    }
    Ok(())
}
