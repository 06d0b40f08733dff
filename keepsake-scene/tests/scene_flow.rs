//! Integration Tests: a play session from join to reload.
//!
//! Config → session → hooks/systems → commit → level snapshot → restore, on
//! a file-backed SQLite store.

use std::sync::Arc;

use parking_lot::Mutex;
use serde_json::json;

use keepsake_core::authority::AuthorityFlag;
use keepsake_core::entity::{Classifiable, EntityRef, SaveActorData, SceneEntity};
use keepsake_core::record::SaveRecord;
use keepsake_core::registry::{SaveCategory, SaveStrategy, StrategyCatalog};
use keepsake_core::types::{ClassRef, Rotator3, Transform, Vector3};
use keepsake_scene::config::{open_store, SceneConfig};
use keepsake_scene::level::{execute_restore, load_level, plan_restore, save_level, SceneWriter};
use keepsake_scene::systems::{apply_events, Applied};
use keepsake_scene::{hooks, SaveSession};

struct Npc {
    id: String,
    mood: &'static str,
}

impl SceneEntity for Npc {
    fn as_classifiable(&self) -> Option<&dyn Classifiable> {
        Some(self)
    }

    fn as_save_actor_data(&self) -> Option<&dyn SaveActorData> {
        Some(self)
    }
}

impl Classifiable for Npc {
    fn classification_id(&self) -> String {
        self.id.clone()
    }
}

impl SaveActorData for Npc {
    fn save_actor_data(&self, record: SaveRecord) -> SaveRecord {
        record
            .with_class(ClassRef::new("Npc.Villager"))
            .with_transform(Transform::new(Vector3::new(0.0, 0.0, 0.0), Rotator3::default()))
            .with_payload(json!({ "mood": self.mood }))
    }
}

fn npc(id: &str, mood: &'static str) -> EntityRef {
    Arc::new(Npc {
        id: id.to_string(),
        mood,
    })
}

/// Counts calls per category.
struct Tally {
    calls: Arc<Mutex<Vec<String>>>,
    category: SaveCategory,
}

impl SaveStrategy for Tally {
    fn save(&mut self) -> bool {
        self.calls.lock().push(format!("save {}", self.category));
        true
    }

    fn load(&mut self) -> bool {
        self.calls.lock().push(format!("load {}", self.category));
        true
    }

    fn teardown(&mut self) {
        self.calls.lock().push(format!("teardown {}", self.category));
    }
}

const CONFIG: &str = r#"
[session]
mode = "Adventure"
owner_id = "Player1"
slot = 1

[persistence]
backend = "sqlite"

[[categories]]
id = "6a2f0a7c-3c55-4d5e-9a39-0f3cf7c1a001"
display_name = "Attributes"
category = "Attributes"
strategy = "tally"

[[categories]]
id = "6a2f0a7c-3c55-4d5e-9a39-0f3cf7c1a002"
display_name = "Inventory"
category = "Inventory"
strategy = "tally"
save_on_teardown = false
"#;

fn config_at(path: &std::path::Path) -> SceneConfig {
    let mut config = SceneConfig::from_toml(CONFIG).expect("config");
    config.keepsake.persistence.path = path.display().to_string();
    config
}

fn catalog(calls: &Arc<Mutex<Vec<String>>>) -> StrategyCatalog {
    let mut catalog = StrategyCatalog::new();
    let calls = Arc::clone(calls);
    catalog.register("tally", move |config| {
        Box::new(Tally {
            calls: Arc::clone(&calls),
            category: config.category,
        })
    });
    catalog
}

#[derive(Default)]
struct Respawner {
    spawned: Vec<String>,
    applied: Vec<String>,
}

impl SceneWriter for Respawner {
    fn apply(&mut self, _entity: &EntityRef, record: &SaveRecord) {
        self.applied.push(record.id.clone());
    }

    fn spawn(&mut self, record: &SaveRecord) -> Option<EntityRef> {
        self.spawned.push(record.id.clone());
        Some(npc(&record.id, "confused"))
    }
}

#[test]
fn play_save_and_reload() {
    let dir = tempfile::tempdir().expect("tempdir");
    let path = dir.path().join("saves.db");
    let calls = Arc::new(Mutex::new(Vec::new()));
    let player = npc("Player1", "brave");
    let elder = npc("Elder", "wise");
    let wolf = npc("placeholder", "hungry");

    let spawned_id;
    {
        let config = config_at(&path);
        let store = open_store(&config.keepsake.persistence).expect("store");
        let mut session = SaveSession::new(config, store, Arc::new(AuthorityFlag::new(true))).expect("session");
        assert!(session.initialize_strategies(&player, &catalog(&calls)));
        assert_eq!(
            session.registry().categories(),
            vec![SaveCategory::Attributes, SaveCategory::Inventory]
        );

        let spawn = hooks::on_actor_spawned(&wolf, ClassRef::new("Npc.Wolf"), Transform::default());
        spawned_id = spawn.subject().expect("id").to_string();
        let results = apply_events(
            &[
                hooks::on_player_joined("Player1", &player, None),
                spawn,
                hooks::on_actor_moved("Elder", Transform::default()),
            ],
            &session.batch(),
        );
        assert!(results.iter().all(|applied| matches!(applied, Applied::Queued(_))));

        assert_eq!(session.commit().expect("commit"), 0);
        let committed = session.current().expect("current");
        assert_eq!(committed.len(), 3);
        assert_eq!(committed.get("Player1").expect("player").payload, json!({ "mood": "brave" }));

        let level_scene: Vec<EntityRef> = vec![Arc::clone(&elder)];
        assert_eq!(save_level(&mut session, "Village", &level_scene).expect("level"), 0);
    }
    assert!(calls.lock().contains(&"save Attributes".to_string()));
    assert!(!calls.lock().contains(&"save Inventory".to_string()));
    assert!(calls.lock().contains(&"teardown Inventory".to_string()));

    let config = config_at(&path);
    let store = open_store(&config.keepsake.persistence).expect("reopen");
    let mut session = SaveSession::new(config, store, Arc::new(AuthorityFlag::new(true))).expect("session");
    let generation = session.open().expect("open").clone();
    assert_eq!(generation.generation_index, 0);

    let reloaded_scene: Vec<EntityRef> = vec![npc("Player1", "tired"), npc("Elder", "wise")];
    let plan = plan_restore(&generation, &reloaded_scene);
    assert_eq!(plan.spawn.len(), 1);
    assert_eq!(plan.spawn[0].id, spawned_id);

    let mut writer = Respawner::default();
    let report = execute_restore(&plan, &mut writer);
    assert_eq!(report.applied, 2);
    assert_eq!(writer.spawned, vec![spawned_id]);

    let village = load_level(&mut session, "Village").expect("load").expect("saved");
    assert_eq!(village.get("Elder").expect("elder").payload, json!({ "mood": "wise" }));
}
