//! TOML-backed world store.
//!
//! World data (spawn zones, mob templates, NPC placements) lives in one
//! TOML document, read at startup and re-read on admin refresh. A missing
//! file is replaced with a small starter world so a fresh checkout boots.

use async_trait::async_trait;
use ember_world::mob::{MobTemplate, SpawnZone};
use ember_world::store::{NpcSeed, WorldStore};
use ember_world::types::{Coord, Faction, MapId, MapRect, NpcId, TemplateId};
use ember_world::WorldError;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{info, warn};

/// The on-disk world document.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
struct WorldDocument {
    #[serde(default)]
    templates: Vec<MobTemplate>,
    #[serde(default)]
    zones: Vec<SpawnZone>,
    #[serde(default)]
    npcs: Vec<NpcSeed>,
}

#[derive(Debug, Default)]
struct LoadedWorld {
    zones: Vec<Arc<SpawnZone>>,
    templates: HashMap<TemplateId, Arc<MobTemplate>>,
    npcs: Vec<NpcSeed>,
}

/// World store reading one TOML file.
#[derive(Debug)]
pub struct TomlWorldStore {
    path: PathBuf,
    world: RwLock<LoadedWorld>,
}

impl TomlWorldStore {
    /// Opens the store, creating a starter world file when none exists.
    pub async fn open(path: PathBuf) -> Result<Self, Box<dyn std::error::Error>> {
        let document = if path.exists() {
            let content = tokio::fs::read_to_string(&path).await?;
            toml::from_str(&content)?
        } else {
            let starter = starter_world();
            if let Some(parent) = path.parent() {
                tokio::fs::create_dir_all(parent).await?;
            }
            tokio::fs::write(&path, toml::to_string_pretty(&starter)?).await?;
            info!("Created starter world data file: {}", path.display());
            starter
        };

        let store = Self { path, world: RwLock::new(LoadedWorld::default()) };
        store.install(document).await;
        Ok(store)
    }

    /// Re-reads the world file (admin refresh). On a parse failure the
    /// previous world stays installed.
    pub async fn reload(&self) -> Result<(), WorldError> {
        let content = tokio::fs::read_to_string(&self.path)
            .await
            .map_err(|e| WorldError::Store(e.to_string()))?;
        let document: WorldDocument =
            toml::from_str(&content).map_err(|e| WorldError::Store(e.to_string()))?;
        self.install(document).await;
        info!("🔄 World data reloaded from {}", self.path.display());
        Ok(())
    }

    async fn install(&self, document: WorldDocument) {
        let mut templates = HashMap::new();
        for template in document.templates {
            if templates.insert(template.id, Arc::new(template)).is_some() {
                warn!("🟡 Duplicate template id in world data; keeping the last one");
            }
        }
        let mut world = self.world.write().await;
        world.zones = document.zones.into_iter().map(Arc::new).collect();
        world.templates = templates;
        world.npcs = document.npcs;
    }
}

#[async_trait]
impl WorldStore for TomlWorldStore {
    async fn spawn_zones(&self) -> Result<Vec<Arc<SpawnZone>>, WorldError> {
        Ok(self.world.read().await.zones.clone())
    }

    async fn mob_template(&self, id: TemplateId) -> Option<Arc<MobTemplate>> {
        self.world.read().await.templates.get(&id).cloned()
    }

    async fn npc_seeds(&self) -> Result<Vec<NpcSeed>, WorldError> {
        Ok(self.world.read().await.npcs.clone())
    }
}

/// A small playable world for fresh checkouts.
fn starter_world() -> WorldDocument {
    WorldDocument {
        templates: vec![
            MobTemplate {
                id: TemplateId(1),
                name: "cinder imp".to_string(),
                max_hp: 120,
                faction: Faction(2),
                level: 4,
                walk_speed: 18.0,
                run_speed: 52.0,
                aggro_range: None,
            },
            MobTemplate {
                id: TemplateId(2),
                name: "ash golem".to_string(),
                max_hp: 600,
                faction: Faction(2),
                level: 12,
                walk_speed: 10.0,
                run_speed: 30.0,
                aggro_range: Some(180.0),
            },
        ],
        zones: vec![
            SpawnZone {
                map: MapId(100),
                rect: MapRect::new(-200.0, -200.0, 200.0, 200.0),
                count: 8,
                respawn_ms: 30_000,
                attackable: true,
                template: TemplateId(1),
            },
            SpawnZone {
                map: MapId(100),
                rect: MapRect::new(400.0, 400.0, 700.0, 700.0),
                count: 2,
                respawn_ms: 120_000,
                attackable: true,
                template: TemplateId(2),
            },
        ],
        npcs: vec![NpcSeed {
            id: NpcId(1),
            map: MapId(100),
            name: "ember warden".to_string(),
            position: Coord::new(0.0, -250.0),
        }],
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn open_creates_starter_world() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("data").join("world.toml");

        let store = TomlWorldStore::open(path.clone()).await.unwrap();
        assert!(path.exists());

        let zones = store.spawn_zones().await.unwrap();
        assert_eq!(zones.len(), 2);
        assert!(store.mob_template(TemplateId(1)).await.is_some());
        assert!(store.mob_template(TemplateId(99)).await.is_none());
        assert_eq!(store.npc_seeds().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn open_parses_existing_world() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("world.toml");
        let content = r#"
[[templates]]
id = 7
name = "bog rat"
max_hp = 40
faction = 3
level = 1
walk_speed = 12.0
run_speed = 35.0

[[zones]]
map = 5
count = 4
respawn_ms = 10000
attackable = true
template = 7

[zones.rect]
min_x = 0.0
min_y = 0.0
max_x = 50.0
max_y = 50.0
"#;
        tokio::fs::write(&path, content).await.unwrap();

        let store = TomlWorldStore::open(path).await.unwrap();
        let zones = store.spawn_zones().await.unwrap();
        assert_eq!(zones.len(), 1);
        assert_eq!(zones[0].count, 4);
        assert_eq!(zones[0].template, TemplateId(7));

        let template = store.mob_template(TemplateId(7)).await.unwrap();
        assert_eq!(template.name, "bog rat");
        assert_eq!(template.faction, Faction(3));
        assert!(store.npc_seeds().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn reload_picks_up_changes() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("world.toml");
        let store = TomlWorldStore::open(path.clone()).await.unwrap();
        assert_eq!(store.spawn_zones().await.unwrap().len(), 2);

        tokio::fs::write(&path, "zones = []\ntemplates = []\nnpcs = []\n")
            .await
            .unwrap();
        store.reload().await.unwrap();
        assert!(store.spawn_zones().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn reload_failure_keeps_previous_world() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("world.toml");
        let store = TomlWorldStore::open(path.clone()).await.unwrap();

        tokio::fs::write(&path, "this is [ not toml").await.unwrap();
        assert!(store.reload().await.is_err());
        assert_eq!(store.spawn_zones().await.unwrap().len(), 2);
    }
}
