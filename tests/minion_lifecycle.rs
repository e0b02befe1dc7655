//! End-to-end minion lifecycle: harvesting into a full inventory, upgrading
//! out of it, and persisting across sessions.

use minions::catalog::{load_catalog, Catalog};
use minions::config::{MinionsConfig, StoreBackend};
use minions::error::MinionError;
use minions::minion::{Minion, MinionServices, Placement, SharedMinion, FULL_MESSAGE};
use minions::scheduler::TickScheduler;
use minions::state::{self, records, RecordStore, YamlRecordStore};
use minions::types::{ItemStack, Position, RemoveReason};
use minions::world::InMemoryWorld;
use std::path::Path;
use std::sync::Arc;

const CATALOG: &str = r#"
items:
  - id: ROCK
    name: Rock
  - id: PEBBLE
    name: Pebble
    max_stack: 16
blueprints:
  - id: ROCK
    behavior: instant
    time_between_actions: [4, 4, 2]
    head_assets: [rock_1, rock_2, rock_3]
    drops:
      - kind: ROCK
"#;

struct Session {
    catalog: Arc<Catalog>,
    world: Arc<InMemoryWorld>,
    scheduler: Arc<TickScheduler>,
}

impl Session {
    fn new(dir: &Path) -> Self {
        let path = dir.join("catalog.yml");
        std::fs::write(&path, CATALOG).unwrap();
        Self {
            catalog: Arc::new(load_catalog(&path).unwrap()),
            world: Arc::new(InMemoryWorld::new()),
            scheduler: Arc::new(TickScheduler::new()),
        }
    }

    fn services(&self) -> MinionServices {
        MinionServices {
            registry: self.catalog.clone(),
            host: self.world.clone(),
            scheduler: self.scheduler.clone(),
        }
    }

    fn place(&self, level: u32, store: &dyn RecordStore) -> SharedMinion {
        let bp = self.catalog.blueprint("ROCK").unwrap();
        Minion::spawn(
            Placement::new("steve", bp, level, Position::new(4.0, 70.0, -2.0)),
            self.services(),
            store,
        )
        .unwrap()
    }

    fn respawn_all(&self, store: &dyn RecordStore) -> Vec<SharedMinion> {
        records::list_records(store)
            .unwrap()
            .iter()
            .map(|record| {
                let bp = self.catalog.blueprint(&record.blueprint).unwrap();
                Minion::spawn(
                    Placement::from_record("steve", bp, record),
                    self.services(),
                    store,
                )
                .unwrap()
            })
            .collect()
    }
}

#[test]
fn test_full_level_one_minion_resumes_after_upgrade() {
    let dir = tempfile::tempdir().unwrap();
    let session = Session::new(dir.path());
    let minion = session.place(1, &YamlRecordStore::in_memory());

    {
        let mut m = minion.lock();
        assert!(m.store_loot("ROCK", 10).unwrap());
        assert_eq!(m.inventory().stacks(), &[ItemStack::new("ROCK", 10, 64)]);
        assert!(!m.is_full());

        // 54 saturate the only stack, 6 have nowhere to go
        assert!(!m.store_loot("ROCK", 60).unwrap());
        assert_eq!(m.inventory().stacks(), &[ItemStack::new("ROCK", 64, 64)]);
        assert!(m.is_full());
        assert!(!m.is_working());
    }
    assert_eq!(session.world.overlay_texts(), vec![FULL_MESSAGE.to_string()]);

    // Nothing happens while paused.
    session.scheduler.advance_by(40);
    assert_eq!(minion.lock().inventory().len(), 1);

    {
        let mut m = minion.lock();
        m.set_level(2).unwrap();
        assert_eq!(m.capacity(), 3);
        assert!(!m.is_full());
        assert!(m.is_working());
        assert_eq!(m.inventory().stacks(), &[ItemStack::new("ROCK", 64, 64)]);
    }
    assert!(session.world.overlay_texts().is_empty());

    session.scheduler.advance_by(4);
    assert_eq!(
        minion.lock().inventory().stacks(),
        &[ItemStack::new("ROCK", 64, 64), ItemStack::new("ROCK", 1, 64)]
    );
}

#[test]
fn test_rejected_level_change_leaves_minion_untouched() {
    let dir = tempfile::tempdir().unwrap();
    let session = Session::new(dir.path());
    let minion = session.place(2, &YamlRecordStore::in_memory());

    let mut m = minion.lock();
    m.store_loot("PEBBLE", 5).unwrap();
    let before = m.record();

    for level in [0, 1, 2] {
        assert_eq!(
            m.set_level(level),
            Err(MinionError::LevelNotIncreasing { current: 2, requested: level })
        );
    }
    assert_eq!(m.record(), before);
    assert_eq!(m.capacity(), 3);
    assert_eq!(m.time_between_actions(), 4);
    assert!(m.is_working());
}

#[test]
fn test_inventory_survives_quit_and_respawn_in_order() {
    let dir = tempfile::tempdir().unwrap();
    let record_path = dir.path().join("players").join("steve").join("minions.yml");

    let expected = {
        let session = Session::new(dir.path());
        let mut store = YamlRecordStore::open(&record_path).unwrap();
        let minion = session.place(3, &store);

        let mut m = minion.lock();
        m.store_loot("PEBBLE", 16).unwrap();
        m.store_loot("ROCK", 30).unwrap();
        m.store_loot("PEBBLE", 3).unwrap();
        let expected = m.inventory().stacks().to_vec();
        assert_eq!(expected.len(), 3);

        m.remove(RemoveReason::Quit, &mut store).unwrap();
        assert_eq!(session.world.minion_count(), 0);
        expected
    };

    let session = Session::new(dir.path());
    let store = YamlRecordStore::open(&record_path).unwrap();
    let minions = session.respawn_all(&store);
    assert_eq!(minions.len(), 1);

    let m = minions[0].lock();
    assert_eq!(m.level(), 3);
    assert_eq!(m.position(), Position::new(4.0, 70.0, -2.0));
    assert_eq!(m.inventory().stacks(), expected.as_slice());
    assert!(!m.is_full());
    assert!(m.is_working());
}

#[test]
fn test_saving_twice_writes_identical_documents() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("minions.yml");
    let session = Session::new(dir.path());
    let mut store = YamlRecordStore::open(&path).unwrap();
    let minion = session.place(2, &store);

    let m = minion.lock();
    m.save(&mut store).unwrap();
    let first = std::fs::read_to_string(&path).unwrap();
    m.save(&mut store).unwrap();
    assert_eq!(std::fs::read_to_string(&path).unwrap(), first);
}

#[test]
fn test_sqlite_backend_round_trip_and_pickup() {
    let dir = tempfile::tempdir().unwrap();
    let mut config = MinionsConfig::for_home(dir.path());
    config.store_backend = StoreBackend::Sqlite;
    let session = Session::new(dir.path());

    let id = {
        let mut store = state::open_store(&config, "steve").unwrap();
        let minion = session.place(1, store.as_ref());
        let mut m = minion.lock();
        m.store_loot("ROCK", 12).unwrap();
        m.remove(RemoveReason::Quit, store.as_mut()).unwrap();
        m.id().clone()
    };

    let mut store = state::open_store(&config, "steve").unwrap();
    let record = records::load_record(store.as_ref(), &id).unwrap().unwrap();
    assert_eq!(record.items, vec![("ROCK".to_string(), 12)]);

    // Another owner sees nothing.
    let other = state::open_store(&config, "alex").unwrap();
    assert!(records::list_records(other.as_ref()).unwrap().is_empty());

    let minions = session.respawn_all(store.as_ref());
    let mut m = minions[0].lock();
    let items = m.collect_all();
    assert_eq!(items, vec![ItemStack::new("ROCK", 12, 64)]);
    m.remove(RemoveReason::Pickup, store.as_mut()).unwrap();
    assert_eq!(records::load_record(store.as_ref(), &id).unwrap(), None);
}
