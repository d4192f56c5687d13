//! Unit-scoped zone and marker collections with push notifications.
//!
//! Each unit's zones and markers are stored as one JSON array per
//! collection. Subscribers receive the full collection immediately and
//! again after every write through this `RecordSync`. Delivery is
//! at-least-once: a subscriber may see the same snapshot twice and must
//! treat that as a no-op.

use super::{KeyValueStore, StorageError};
use crate::error::ValidationError;
use crate::model::{
    MarkerId, MarkerPatch, TacticalMarker, UnitId, Zone, ZoneId, ZonePatch,
};
use futures_channel::mpsc::{unbounded, UnboundedReceiver, UnboundedSender};
use serde::{de::DeserializeOwned, Serialize};
use std::cell::RefCell;
use std::collections::HashMap;

/// A record type stored in a unit-scoped collection.
trait SyncRecord: Clone + Serialize + DeserializeOwned + 'static {
    type Id: PartialEq;
    type Patch;

    fn record_id(&self) -> &Self::Id;
    fn patch(&mut self, patch: &Self::Patch) -> Result<(), ValidationError>;
    fn collection_key(unit: &UnitId) -> String;
}

impl SyncRecord for Zone {
    type Id = ZoneId;
    type Patch = ZonePatch;

    fn record_id(&self) -> &ZoneId {
        self.id()
    }

    fn patch(&mut self, patch: &ZonePatch) -> Result<(), ValidationError> {
        self.apply_patch(patch)
    }

    fn collection_key(unit: &UnitId) -> String {
        unit.zones_key()
    }
}

impl SyncRecord for TacticalMarker {
    type Id = MarkerId;
    type Patch = MarkerPatch;

    fn record_id(&self) -> &MarkerId {
        self.id()
    }

    fn patch(&mut self, patch: &MarkerPatch) -> Result<(), ValidationError> {
        self.apply_patch(patch);
        Ok(())
    }

    fn collection_key(unit: &UnitId) -> String {
        unit.markers_key()
    }
}

type Subscribers<T> = RefCell<HashMap<UnitId, Vec<UnboundedSender<Vec<T>>>>>;

/// A local mutation waiting to be written to the shared store.
#[derive(Debug, Clone, PartialEq)]
pub enum PendingWrite {
    CreateZone(Zone),
    UpdateZone(ZoneId, ZonePatch),
    DeleteZone(ZoneId),
    CreateMarker(TacticalMarker),
    UpdateMarker(MarkerId, MarkerPatch),
    DeleteMarker(MarkerId),
    ClearAll,
}

/// Push-based sync of zones and markers over a [`KeyValueStore`].
pub struct RecordSync<S> {
    store: S,
    zone_subscribers: Subscribers<Zone>,
    marker_subscribers: Subscribers<TacticalMarker>,
}

impl<S: KeyValueStore> RecordSync<S> {
    pub fn new(store: S) -> Self {
        Self {
            store,
            zone_subscribers: RefCell::new(HashMap::new()),
            marker_subscribers: RefCell::new(HashMap::new()),
        }
    }

    /// Subscribes to a unit's zones. The current snapshot is queued
    /// immediately; dropping the receiver unsubscribes.
    pub async fn subscribe_zones(
        &self,
        unit: &UnitId,
    ) -> Result<UnboundedReceiver<Vec<Zone>>, StorageError> {
        self.subscribe(unit, &self.zone_subscribers).await
    }

    pub async fn subscribe_markers(
        &self,
        unit: &UnitId,
    ) -> Result<UnboundedReceiver<Vec<TacticalMarker>>, StorageError> {
        self.subscribe(unit, &self.marker_subscribers).await
    }

    /// Inserts a zone, replacing any stored zone with the same id.
    pub async fn create_zone(&self, unit: &UnitId, zone: &Zone) -> Result<(), StorageError> {
        self.upsert(unit, zone, &self.zone_subscribers).await
    }

    /// Applies a partial update. Returns `false` if the zone is gone or the
    /// patched zone would break an invariant; nothing is written then.
    pub async fn update_zone(
        &self,
        unit: &UnitId,
        id: &ZoneId,
        patch: &ZonePatch,
    ) -> Result<bool, StorageError> {
        self.update(unit, id, patch, &self.zone_subscribers).await
    }

    /// Removes a zone. Removing an unknown id succeeds.
    pub async fn delete_zone(&self, unit: &UnitId, id: &ZoneId) -> Result<(), StorageError> {
        self.remove::<Zone>(unit, id, &self.zone_subscribers).await
    }

    pub async fn create_marker(
        &self,
        unit: &UnitId,
        marker: &TacticalMarker,
    ) -> Result<(), StorageError> {
        self.upsert(unit, marker, &self.marker_subscribers).await
    }

    pub async fn update_marker(
        &self,
        unit: &UnitId,
        id: &MarkerId,
        patch: &MarkerPatch,
    ) -> Result<bool, StorageError> {
        self.update(unit, id, patch, &self.marker_subscribers).await
    }

    pub async fn delete_marker(&self, unit: &UnitId, id: &MarkerId) -> Result<(), StorageError> {
        self.remove::<TacticalMarker>(unit, id, &self.marker_subscribers)
            .await
    }

    /// Drops every zone and marker of a unit.
    pub async fn clear_all(&self, unit: &UnitId) -> Result<(), StorageError> {
        self.store.delete(&unit.zones_key()).await?;
        self.store.delete(&unit.markers_key()).await?;
        log::info!("Cleared all records for unit {}", unit);
        notify::<Zone>(&self.zone_subscribers, unit, &[]);
        notify::<TacticalMarker>(&self.marker_subscribers, unit, &[]);
        Ok(())
    }

    /// Applies one queued local mutation.
    pub async fn apply(&self, unit: &UnitId, write: &PendingWrite) -> Result<(), StorageError> {
        match write {
            PendingWrite::CreateZone(zone) => self.create_zone(unit, zone).await,
            PendingWrite::UpdateZone(id, patch) => {
                if !self.update_zone(unit, id, patch).await? {
                    log::debug!("Skipped update of zone {}", id);
                }
                Ok(())
            }
            PendingWrite::DeleteZone(id) => self.delete_zone(unit, id).await,
            PendingWrite::CreateMarker(marker) => self.create_marker(unit, marker).await,
            PendingWrite::UpdateMarker(id, patch) => {
                if !self.update_marker(unit, id, patch).await? {
                    log::debug!("Skipped update of vanished marker {}", id);
                }
                Ok(())
            }
            PendingWrite::DeleteMarker(id) => self.delete_marker(unit, id).await,
            PendingWrite::ClearAll => self.clear_all(unit).await,
        }
    }

    async fn load<T: SyncRecord>(&self, unit: &UnitId) -> Result<Vec<T>, StorageError> {
        Ok(self
            .store
            .get::<Vec<T>>(&T::collection_key(unit))
            .await?
            .unwrap_or_default())
    }

    async fn save<T: SyncRecord>(
        &self,
        unit: &UnitId,
        records: &Vec<T>,
        subscribers: &Subscribers<T>,
    ) -> Result<(), StorageError> {
        self.store.put(&T::collection_key(unit), records).await?;
        notify(subscribers, unit, records);
        Ok(())
    }

    async fn subscribe<T: SyncRecord>(
        &self,
        unit: &UnitId,
        subscribers: &Subscribers<T>,
    ) -> Result<UnboundedReceiver<Vec<T>>, StorageError> {
        let snapshot = self.load::<T>(unit).await?;
        let (tx, rx) = unbounded();
        // the receiver is alive here, so this cannot fail
        let _ = tx.unbounded_send(snapshot);
        subscribers
            .borrow_mut()
            .entry(unit.clone())
            .or_default()
            .push(tx);
        log::debug!("New subscriber for {}", T::collection_key(unit));
        Ok(rx)
    }

    async fn upsert<T: SyncRecord>(
        &self,
        unit: &UnitId,
        record: &T,
        subscribers: &Subscribers<T>,
    ) -> Result<(), StorageError> {
        let mut records = self.load::<T>(unit).await?;
        match records
            .iter_mut()
            .find(|r| r.record_id() == record.record_id())
        {
            Some(existing) => *existing = record.clone(),
            None => records.push(record.clone()),
        }
        self.save(unit, &records, subscribers).await
    }

    async fn update<T: SyncRecord>(
        &self,
        unit: &UnitId,
        id: &T::Id,
        patch: &T::Patch,
        subscribers: &Subscribers<T>,
    ) -> Result<bool, StorageError> {
        let mut records = self.load::<T>(unit).await?;
        let Some(record) = records.iter_mut().find(|r| r.record_id() == id) else {
            return Ok(false);
        };
        if let Err(e) = record.patch(patch) {
            log::warn!(
                "Rejected update to {}: {}",
                T::collection_key(unit),
                e
            );
            return Ok(false);
        }
        self.save(unit, &records, subscribers).await?;
        Ok(true)
    }

    async fn remove<T: SyncRecord>(
        &self,
        unit: &UnitId,
        id: &T::Id,
        subscribers: &Subscribers<T>,
    ) -> Result<(), StorageError> {
        let mut records = self.load::<T>(unit).await?;
        records.retain(|r| r.record_id() != id);
        self.save(unit, &records, subscribers).await
    }
}

/// Pushes a snapshot to a unit's subscribers, pruning closed channels.
fn notify<T: Clone>(subscribers: &Subscribers<T>, unit: &UnitId, records: &[T]) {
    if let Some(senders) = subscribers.borrow_mut().get_mut(unit) {
        senders.retain(|tx| tx.unbounded_send(records.to_vec()).is_ok());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geo::lat_lng;
    use crate::model::{MarkerKind, MarkerStore, ShapeKind, UnixMillis, ZoneShape, ZoneStore};
    use crate::storage::MemoryStore;
    use futures_executor::block_on;
    use futures_util::StreamExt;

    fn unit() -> UnitId {
        UnitId::new("RTJ-310")
    }

    fn zone(store: &mut ZoneStore, radius_m: f64) -> Zone {
        store
            .create(
                ZoneShape {
                    center: lat_lng(59.3293, 18.0686),
                    kind: ShapeKind::Circle,
                    radius_m,
                    inner_radius_m: None,
                    bearing_deg: None,
                    has_warm_zone: false,
                }
                .into(),
                UnixMillis(1_000),
            )
            .unwrap()
            .clone()
    }

    #[test]
    fn test_subscribe_delivers_snapshot_then_updates() {
        let sync = RecordSync::new(MemoryStore::new());
        let mut zones = ZoneStore::new();
        let z = zone(&mut zones, 300.0);

        block_on(async {
            let mut rx = sync.subscribe_zones(&unit()).await.unwrap();
            assert_eq!(rx.next().await, Some(vec![]));

            sync.create_zone(&unit(), &z).await.unwrap();
            let snapshot = rx.next().await.unwrap();
            assert_eq!(snapshot.len(), 1);
            assert_eq!(snapshot[0].id(), z.id());

            let patch = ZonePatch {
                radius_m: Some(450.0),
                ..Default::default()
            };
            assert!(sync.update_zone(&unit(), z.id(), &patch).await.unwrap());
            assert_eq!(rx.next().await.unwrap()[0].radius_m(), 450.0);
        });
    }

    #[test]
    fn test_units_are_isolated() {
        let sync = RecordSync::new(MemoryStore::new());
        let mut zones = ZoneStore::new();
        let z = zone(&mut zones, 100.0);
        let other = UnitId::new("RTJ-320");

        block_on(async {
            sync.create_zone(&unit(), &z).await.unwrap();
            assert!(sync.load::<Zone>(&other).await.unwrap().is_empty());
            assert_eq!(sync.load::<Zone>(&unit()).await.unwrap().len(), 1);
        });
    }

    #[test]
    fn test_delete_is_idempotent_and_update_of_missing_is_false() {
        let sync = RecordSync::new(MemoryStore::new());
        let mut zones = ZoneStore::new();
        let z = zone(&mut zones, 100.0);

        block_on(async {
            sync.create_zone(&unit(), &z).await.unwrap();
            sync.delete_zone(&unit(), z.id()).await.unwrap();
            sync.delete_zone(&unit(), z.id()).await.unwrap();
            assert!(sync.load::<Zone>(&unit()).await.unwrap().is_empty());

            let patch = ZonePatch::default();
            assert!(!sync.update_zone(&unit(), z.id(), &patch).await.unwrap());
        });
    }

    #[test]
    fn test_marker_label_update_and_clear_all() {
        let sync = RecordSync::new(MemoryStore::new());
        let mut markers = MarkerStore::new();
        let now = UnixMillis(5_000);
        let m = markers
            .add(MarkerKind::ManOverboard, lat_lng(59.31, 18.07), None, now, now)
            .clone();

        block_on(async {
            let mut rx = sync.subscribe_markers(&unit()).await.unwrap();
            rx.next().await;

            sync.create_marker(&unit(), &m).await.unwrap();
            rx.next().await;

            let patch = MarkerPatch {
                label: Some("Skeppsbron".into()),
            };
            sync.update_marker(&unit(), m.id(), &patch).await.unwrap();
            let snapshot = rx.next().await.unwrap();
            assert_eq!(snapshot[0].label(), Some("Skeppsbron"));

            sync.clear_all(&unit()).await.unwrap();
            assert_eq!(rx.next().await, Some(vec![]));
        });
    }

    #[test]
    fn test_dropped_receiver_is_pruned() {
        let sync = RecordSync::new(MemoryStore::new());
        let mut zones = ZoneStore::new();
        let z = zone(&mut zones, 100.0);

        block_on(async {
            let rx = sync.subscribe_zones(&unit()).await.unwrap();
            drop(rx);
            sync.create_zone(&unit(), &z).await.unwrap();
        });
        assert!(sync.zone_subscribers.borrow()[&unit()].is_empty());
    }

    #[test]
    fn test_update_breaking_invariant_is_not_written() {
        let sync = RecordSync::new(MemoryStore::new());
        let mut zones = ZoneStore::new();
        let z = zones
            .create(
                ZoneShape {
                    center: lat_lng(59.3293, 18.0686),
                    kind: ShapeKind::Keyhole,
                    radius_m: 300.0,
                    inner_radius_m: Some(100.0),
                    bearing_deg: Some(90.0),
                    has_warm_zone: true,
                }
                .into(),
                UnixMillis(1_000),
            )
            .unwrap()
            .clone();

        block_on(async {
            sync.create_zone(&unit(), &z).await.unwrap();
            let shrink = ZonePatch {
                radius_m: Some(150.0),
                ..Default::default()
            };
            let widen_inner = ZonePatch {
                inner_radius_m: Some(200.0),
                ..Default::default()
            };
            assert!(sync.update_zone(&unit(), z.id(), &shrink).await.unwrap());
            assert!(!sync.update_zone(&unit(), z.id(), &widen_inner).await.unwrap());

            let stored = sync.load::<Zone>(&unit()).await.unwrap();
            assert_eq!(stored[0].radius_m(), 150.0);
            assert_eq!(stored[0].inner_radius_m(), Some(100.0));
        });
    }
}
