//! Read-only views of the world and the periodic JSON telemetry writer.

use std::fs::{self, File};
use std::io::BufWriter;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use chrono::Utc;
use glam::Vec2;
use serde::Serialize;

use crate::villager::{Gender, VillagerState};
use crate::wolf::WolfState;
use crate::world::{EntityId, World};

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct VillagerView {
    pub id: EntityId,
    pub position: Vec2,
    pub age: u32,
    pub gender: Gender,
    pub state: VillagerState,
    pub energy: f32,
    pub carried: u32,
    pub dwelling: Option<EntityId>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WolfView {
    pub id: EntityId,
    pub position: Vec2,
    pub age: u32,
    pub state: WolfState,
    pub target: Option<EntityId>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HouseView {
    pub id: EntityId,
    pub position: Vec2,
    pub occupants: Vec<EntityId>,
    pub reproduction_timer: f32,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SettlementView {
    pub position: Vec2,
    pub stock: u32,
    pub capacity: u32,
    pub houses: Vec<HouseView>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ForestView {
    pub id: EntityId,
    pub position: Vec2,
    pub radius: f32,
    pub trees: usize,
    pub wolves: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WorldSnapshot {
    pub scenario: String,
    pub tick: u64,
    pub elapsed_secs: f64,
    pub population: usize,
    pub wolf_count: usize,
    pub settlement: Option<SettlementView>,
    pub forests: Vec<ForestView>,
    pub villagers: Vec<VillagerView>,
    pub wolves: Vec<WolfView>,
}

impl WorldSnapshot {
    pub fn capture(world: &World, scenario: &str) -> Self {
        let settlement = world.settlement().map(|s| SettlementView {
            position: s.position(),
            stock: s.stock(),
            capacity: s.capacity(),
            houses: s
                .houses()
                .iter()
                .map(|h| HouseView {
                    id: h.id,
                    position: h.position,
                    occupants: h.occupants().iter().map(|o| o.id).collect(),
                    reproduction_timer: h.timer(),
                })
                .collect(),
        });
        Self {
            scenario: scenario.to_string(),
            tick: world.tick(),
            elapsed_secs: world.elapsed_secs(),
            population: world.population(),
            wolf_count: world.wolf_count(),
            settlement,
            forests: world
                .forests()
                .iter()
                .map(|f| ForestView {
                    id: f.id,
                    position: f.position(),
                    radius: f.radius(),
                    trees: f.trees().len(),
                    wolves: f.wolf_count(),
                })
                .collect(),
            villagers: world
                .villagers()
                .map(|v| VillagerView {
                    id: v.id,
                    position: v.position,
                    age: v.age,
                    gender: v.gender,
                    state: v.state,
                    energy: v.energy,
                    carried: v.carried,
                    dwelling: v.dwelling,
                })
                .collect(),
            wolves: world
                .wolves()
                .map(|w| WolfView {
                    id: w.id,
                    position: w.position,
                    age: w.age,
                    state: w.state,
                    target: w.target,
                })
                .collect(),
        }
    }
}

#[derive(Serialize)]
struct SnapshotFile<'a> {
    written_at: String,
    #[serde(flatten)]
    snapshot: &'a WorldSnapshot,
}

/// Writes `<dir>/<scenario>/tick_NNNNNN.json` every `interval_ticks` ticks.
/// An interval of zero turns it off.
pub struct SnapshotWriter {
    output_dir: PathBuf,
    interval_ticks: u64,
}

impl SnapshotWriter {
    pub fn new(output_dir: impl AsRef<Path>, interval_ticks: u64) -> Self {
        Self {
            output_dir: output_dir.as_ref().to_path_buf(),
            interval_ticks,
        }
    }

    pub fn maybe_write(&mut self, world: &World, scenario: &str) -> Result<Option<PathBuf>> {
        let tick = world.tick();
        if self.interval_ticks == 0 || tick == 0 || tick % self.interval_ticks != 0 {
            return Ok(None);
        }
        let dir = self.output_dir.join(scenario);
        fs::create_dir_all(&dir)
            .with_context(|| format!("Failed to create snapshot dir {}", dir.display()))?;
        let path = dir.join(format!("tick_{tick:06}.json"));
        let file = File::create(&path)
            .with_context(|| format!("Failed to create snapshot {}", path.display()))?;
        let snapshot = world.snapshot(scenario);
        let record = SnapshotFile {
            written_at: Utc::now().to_rfc3339(),
            snapshot: &snapshot,
        };
        serde_json::to_writer_pretty(BufWriter::new(file), &record)
            .with_context(|| format!("Failed to write snapshot {}", path.display()))?;
        Ok(Some(path))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::AgentParams;

    #[test]
    fn disabled_writer_writes_nothing() {
        let temp = tempfile::tempdir().unwrap();
        let mut writer = SnapshotWriter::new(temp.path(), 0);
        let mut world = World::new(AgentParams::default());
        world.advance_time(0.1);
        assert!(writer.maybe_write(&world, "unit").unwrap().is_none());
        assert!(fs::read_dir(temp.path()).unwrap().next().is_none());
    }

    #[test]
    fn snapshot_lists_every_entity() {
        let mut world = World::new(AgentParams::default());
        world.spawn_villager(Vec2::ZERO, 25, Gender::Female);
        world.spawn_wolf(Vec2::new(9.0, 9.0));
        let snapshot = world.snapshot("unit");
        assert_eq!(snapshot.population, 1);
        assert_eq!(snapshot.wolves.len(), 1);
        assert!(snapshot.settlement.is_none());
        assert_eq!(snapshot.villagers[0].state, VillagerState::Resting);
    }
}
