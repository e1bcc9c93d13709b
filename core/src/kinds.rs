//! Task and reward kinds.
//!
//! Tasks and rewards are closed sum types discriminated by a `type` string.
//! A [`KindRegistry`] maps each discriminator to a factory that builds the
//! typed value from raw properties. Registries are plain values: build one
//! with [`KindRegistry::standard`] and pass it to whatever needs it.
//!
//! # Example
//!
//! ```
//! use questpack_core::{KindRegistry, PropertyMap, RawValue, Task};
//!
//! let registry = KindRegistry::standard();
//! let mut props = PropertyMap::new();
//! props.insert("item".into(), RawValue::from("minecraft:oak_log"));
//! props.insert("count".into(), RawValue::Int(16));
//!
//! let task = registry.build_task("item", &props).unwrap();
//! assert_eq!(task.kind(), "item");
//! assert!(registry.build_task("teleport", &props).is_err());
//! ```

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::{ModelError, Result};
use crate::tree::{PropertyMap, RawValue};

/// An item id with a stack size.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ItemStack {
    pub id: String,
    pub count: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub nbt: Option<String>,
}

impl ItemStack {
    pub fn new(id: impl Into<String>, count: u32) -> Self {
        Self {
            id: id.into(),
            count,
            nbt: None,
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.id.trim().is_empty() {
            return Err(ModelError::BlankId {
                entity: "item stack",
            });
        }
        if self.count == 0 {
            return Err(ModelError::InvalidAmount {
                entity: "item stack",
                field: "count",
                reason: "must be at least 1".to_string(),
            });
        }
        Ok(())
    }
}

/// Quest completion requirement.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Task {
    /// Collect (and optionally consume) an item stack.
    Item {
        item: ItemStack,
        #[serde(default)]
        consume: bool,
    },
    /// Manual confirmation.
    Checkmark,
    /// Reach a spot within `radius` blocks.
    Location {
        dimension: String,
        x: f64,
        y: f64,
        z: f64,
        radius: f64,
    },
    Kill {
        entity: String,
        value: u64,
    },
    Advancement {
        advancement: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        criterion: Option<String>,
    },
    Dimension {
        dimension: String,
    },
    /// Gain experience points, or levels when `levels` is set.
    Xp {
        value: u64,
        #[serde(default)]
        levels: bool,
    },
}

impl Task {
    /// Discriminator string of this task.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Item { .. } => "item",
            Self::Checkmark => "checkmark",
            Self::Location { .. } => "location",
            Self::Kill { .. } => "kill",
            Self::Advancement { .. } => "advancement",
            Self::Dimension { .. } => "dimension",
            Self::Xp { .. } => "xp",
        }
    }

    pub fn validate(&self) -> Result<()> {
        match self {
            Self::Item { item, .. } => item.validate(),
            Self::Checkmark => Ok(()),
            Self::Location {
                dimension,
                x,
                y,
                z,
                radius,
            } => {
                require_text("location task", "dimension", dimension)?;
                if ![x, y, z, radius].iter().all(|v| v.is_finite()) {
                    return Err(ModelError::InvalidAmount {
                        entity: "location task",
                        field: "coordinates",
                        reason: "must be finite".to_string(),
                    });
                }
                if *radius < 0.0 {
                    return Err(ModelError::InvalidAmount {
                        entity: "location task",
                        field: "radius",
                        reason: format!("{radius} is negative"),
                    });
                }
                Ok(())
            }
            Self::Kill { entity, value } => {
                require_text("kill task", "entity", entity)?;
                require_positive("kill task", "value", *value)
            }
            Self::Advancement { advancement, .. } => {
                require_text("advancement task", "advancement", advancement)
            }
            Self::Dimension { dimension } => require_text("dimension task", "dimension", dimension),
            Self::Xp { value, .. } => require_positive("xp task", "value", *value),
        }
    }
}

/// Quest completion reward.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Reward {
    Item {
        item: ItemStack,
    },
    Xp {
        amount: u64,
    },
    XpLevels {
        levels: u32,
    },
    /// Rolls a project loot table.
    LootTable {
        table: String,
        rolls: u32,
    },
    Command {
        command: String,
        #[serde(default)]
        elevated: bool,
    },
}

impl Reward {
    /// Discriminator string of this reward.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Item { .. } => "item",
            Self::Xp { .. } => "xp",
            Self::XpLevels { .. } => "xp_levels",
            Self::LootTable { .. } => "loot_table",
            Self::Command { .. } => "command",
        }
    }

    pub fn validate(&self) -> Result<()> {
        match self {
            Self::Item { item } => item.validate(),
            Self::Xp { amount } => require_positive("xp reward", "amount", *amount),
            Self::XpLevels { levels } => {
                require_positive("xp_levels reward", "levels", u64::from(*levels))
            }
            Self::LootTable { table, rolls } => {
                require_text("loot_table reward", "table", table)?;
                require_positive("loot_table reward", "rolls", u64::from(*rolls))
            }
            Self::Command { command, .. } => require_text("command reward", "command", command),
        }
    }
}

/// Builds a [`Task`] from raw properties.
pub type TaskFactory = fn(&PropertyMap) -> Result<Task>;
/// Builds a [`Reward`] from raw properties.
pub type RewardFactory = fn(&PropertyMap) -> Result<Reward>;

/// Discriminator-to-factory mapping for tasks and rewards.
///
/// Unknown discriminators fail closed with [`ModelError::UnknownKind`].
#[derive(Clone, Default)]
pub struct KindRegistry {
    tasks: BTreeMap<String, TaskFactory>,
    rewards: BTreeMap<String, RewardFactory>,
}

impl KindRegistry {
    /// Creates a registry with no kinds.
    pub fn empty() -> Self {
        Self::default()
    }

    /// Creates a registry with every built-in task and reward kind.
    pub fn standard() -> Self {
        let mut registry = Self::empty();
        registry.register_task("item", item_task);
        registry.register_task("checkmark", |_| Ok(Task::Checkmark));
        registry.register_task("location", location_task);
        registry.register_task("kill", kill_task);
        registry.register_task("advancement", advancement_task);
        registry.register_task("dimension", dimension_task);
        registry.register_task("xp", xp_task);

        registry.register_reward("item", item_reward);
        registry.register_reward("xp", xp_reward);
        registry.register_reward("xp_levels", xp_levels_reward);
        registry.register_reward("loot_table", loot_table_reward);
        registry.register_reward("command", command_reward);
        registry
    }

    /// Registers (or replaces) a task factory.
    pub fn register_task(&mut self, kind: &str, factory: TaskFactory) {
        self.tasks.insert(kind.to_string(), factory);
    }

    /// Registers (or replaces) a reward factory.
    pub fn register_reward(&mut self, kind: &str, factory: RewardFactory) {
        self.rewards.insert(kind.to_string(), factory);
    }

    pub fn has_task_kind(&self, kind: &str) -> bool {
        self.tasks.contains_key(kind)
    }

    pub fn has_reward_kind(&self, kind: &str) -> bool {
        self.rewards.contains_key(kind)
    }

    pub fn task_kinds(&self) -> impl Iterator<Item = &str> {
        self.tasks.keys().map(String::as_str)
    }

    pub fn reward_kinds(&self) -> impl Iterator<Item = &str> {
        self.rewards.keys().map(String::as_str)
    }

    /// Builds and validates a task.
    ///
    /// # Errors
    ///
    /// Returns [`ModelError::UnknownKind`] for unregistered discriminators and
    /// any error raised by the factory or by [`Task::validate`].
    pub fn build_task(&self, kind: &str, properties: &PropertyMap) -> Result<Task> {
        let factory = self
            .tasks
            .get(kind)
            .ok_or_else(|| ModelError::UnknownKind {
                category: "task",
                kind: kind.to_string(),
            })?;
        let task = factory(properties)?;
        task.validate()?;
        Ok(task)
    }

    /// Builds and validates a reward.
    ///
    /// # Errors
    ///
    /// Returns [`ModelError::UnknownKind`] for unregistered discriminators and
    /// any error raised by the factory or by [`Reward::validate`].
    pub fn build_reward(&self, kind: &str, properties: &PropertyMap) -> Result<Reward> {
        let factory = self
            .rewards
            .get(kind)
            .ok_or_else(|| ModelError::UnknownKind {
                category: "reward",
                kind: kind.to_string(),
            })?;
        let reward = factory(properties)?;
        reward.validate()?;
        Ok(reward)
    }
}

impl fmt::Debug for KindRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("KindRegistry")
            .field("tasks", &self.tasks.keys().collect::<Vec<_>>())
            .field("rewards", &self.rewards.keys().collect::<Vec<_>>())
            .finish()
    }
}

fn require_text(entity: &'static str, field: &'static str, value: &str) -> Result<()> {
    if value.trim().is_empty() {
        return Err(ModelError::InvalidAmount {
            entity,
            field,
            reason: "cannot be blank".to_string(),
        });
    }
    Ok(())
}

fn require_positive(entity: &'static str, field: &'static str, value: u64) -> Result<()> {
    if value == 0 {
        return Err(ModelError::InvalidAmount {
            entity,
            field,
            reason: "must be greater than zero".to_string(),
        });
    }
    Ok(())
}

fn required_str(kind: &str, props: &PropertyMap, key: &'static str) -> Result<String> {
    match props.get(key) {
        None | Some(RawValue::Null) => Err(ModelError::MissingProperty {
            kind: kind.to_string(),
            property: key,
        }),
        Some(value) => value
            .as_id()
            .ok_or_else(|| ModelError::InvalidProperty {
                kind: kind.to_string(),
                property: key,
                expected: "a string",
            }),
    }
}

fn required_number(kind: &str, props: &PropertyMap, key: &'static str) -> Result<f64> {
    match props.get(key) {
        None | Some(RawValue::Null) => Err(ModelError::MissingProperty {
            kind: kind.to_string(),
            property: key,
        }),
        Some(value) => value.as_f64().ok_or_else(|| ModelError::InvalidProperty {
            kind: kind.to_string(),
            property: key,
            expected: "a number",
        }),
    }
}

fn optional_u64(kind: &str, props: &PropertyMap, key: &'static str, default: u64) -> Result<u64> {
    match props.get(key) {
        None | Some(RawValue::Null) => Ok(default),
        Some(value) => value
            .as_i64()
            .and_then(|v| u64::try_from(v).ok())
            .ok_or_else(|| ModelError::InvalidProperty {
                kind: kind.to_string(),
                property: key,
                expected: "a non-negative integer",
            }),
    }
}

fn to_u32(kind: &str, key: &'static str, value: u64) -> Result<u32> {
    u32::try_from(value).map_err(|_| ModelError::InvalidProperty {
        kind: kind.to_string(),
        property: key,
        expected: "an integer below 2^32",
    })
}

fn optional_bool(props: &PropertyMap, key: &str, default: bool) -> bool {
    props.get(key).and_then(RawValue::as_bool).unwrap_or(default)
}

/// Reads `item` as either a bare id or an `{id, count, tag}` object. A
/// top-level `count` overrides the nested one.
fn item_stack(kind: &str, props: &PropertyMap) -> Result<ItemStack> {
    let invalid = || ModelError::InvalidProperty {
        kind: kind.to_string(),
        property: "item",
        expected: "an item id or an object with an 'id'",
    };
    let (id, nested_count, nbt) = match props.get("item") {
        None | Some(RawValue::Null) => {
            return Err(ModelError::MissingProperty {
                kind: kind.to_string(),
                property: "item",
            });
        }
        Some(RawValue::String(id)) => (id.clone(), None, None),
        Some(RawValue::Compound(map)) => {
            let id = map
                .get("id")
                .and_then(RawValue::as_str)
                .ok_or_else(invalid)?
                .to_string();
            let nbt = map
                .get("tag")
                .or_else(|| map.get("nbt"))
                .map(RawValue::to_display_string);
            (id, map.get("count").and_then(RawValue::as_i64), nbt)
        }
        Some(_) => return Err(invalid()),
    };

    let count = match props.get("count").and_then(RawValue::as_i64).or(nested_count) {
        Some(count) => u64::try_from(count).map_err(|_| ModelError::InvalidAmount {
            entity: "item stack",
            field: "count",
            reason: format!("{count} is negative"),
        })?,
        None => 1,
    };

    Ok(ItemStack {
        id,
        count: to_u32(kind, "count", count)?,
        nbt,
    })
}

fn item_task(props: &PropertyMap) -> Result<Task> {
    Ok(Task::Item {
        item: item_stack("item task", props)?,
        consume: optional_bool(props, "consume_items", false),
    })
}

fn location_task(props: &PropertyMap) -> Result<Task> {
    let kind = "location task";
    Ok(Task::Location {
        dimension: required_str(kind, props, "dimension")?,
        x: required_number(kind, props, "x")?,
        y: required_number(kind, props, "y")?,
        z: required_number(kind, props, "z")?,
        radius: required_number(kind, props, "radius")?,
    })
}

fn kill_task(props: &PropertyMap) -> Result<Task> {
    let kind = "kill task";
    Ok(Task::Kill {
        entity: required_str(kind, props, "entity")?,
        value: optional_u64(kind, props, "value", 1)?,
    })
}

fn advancement_task(props: &PropertyMap) -> Result<Task> {
    Ok(Task::Advancement {
        advancement: required_str("advancement task", props, "advancement")?,
        criterion: props
            .get("criterion")
            .and_then(RawValue::as_str)
            .filter(|c| !c.trim().is_empty())
            .map(String::from),
    })
}

fn dimension_task(props: &PropertyMap) -> Result<Task> {
    Ok(Task::Dimension {
        dimension: required_str("dimension task", props, "dimension")?,
    })
}

fn xp_task(props: &PropertyMap) -> Result<Task> {
    Ok(Task::Xp {
        value: optional_u64("xp task", props, "value", 1)?,
        levels: !optional_bool(props, "points", true),
    })
}

fn item_reward(props: &PropertyMap) -> Result<Reward> {
    Ok(Reward::Item {
        item: item_stack("item reward", props)?,
    })
}

fn xp_reward(props: &PropertyMap) -> Result<Reward> {
    let kind = "xp reward";
    if props.contains_key("xp") && props.contains_key("xp_levels") {
        return Err(ModelError::MutuallyExclusive {
            entity: kind,
            first: "xp",
            second: "xp_levels",
        });
    }
    let amount = match props.get("xp") {
        Some(_) => optional_u64(kind, props, "xp", 1)?,
        None => optional_u64(kind, props, "amount", 1)?,
    };
    Ok(Reward::Xp { amount })
}

fn xp_levels_reward(props: &PropertyMap) -> Result<Reward> {
    let kind = "xp_levels reward";
    let levels = optional_u64(kind, props, "xp_levels", 1)?;
    Ok(Reward::XpLevels {
        levels: to_u32(kind, "xp_levels", levels)?,
    })
}

fn loot_table_reward(props: &PropertyMap) -> Result<Reward> {
    let kind = "loot_table reward";
    let rolls = optional_u64(kind, props, "rolls", 1)?;
    Ok(Reward::LootTable {
        table: required_str(kind, props, "table")?,
        rolls: to_u32(kind, "rolls", rolls)?,
    })
}

fn command_reward(props: &PropertyMap) -> Result<Reward> {
    Ok(Reward::Command {
        command: required_str("command reward", props, "command")?,
        elevated: optional_bool(props, "elevate_perms", false),
    })
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    fn props(value: serde_json::Value) -> PropertyMap {
        match RawValue::from(value) {
            RawValue::Compound(map) => map,
            other => panic!("expected object, got {}", other.kind_name()),
        }
    }

    #[test]
    fn test_item_task_reads_nested_item_and_overrides_count() {
        let registry = KindRegistry::standard();
        let task = registry
            .build_task(
                "item",
                &props(json!({"item": {"id": "minecraft:stone", "count": 4}, "count": 32})),
            )
            .unwrap();
        assert_eq!(
            task,
            Task::Item {
                item: ItemStack::new("minecraft:stone", 32),
                consume: false,
            }
        );
    }

    #[test]
    fn test_item_task_rejects_zero_count() {
        let registry = KindRegistry::standard();
        let err = registry
            .build_task("item", &props(json!({"item": "minecraft:stone", "count": 0})))
            .unwrap_err();
        assert!(matches!(err, ModelError::InvalidAmount { field: "count", .. }));
    }

    #[test]
    fn test_location_task_requires_every_coordinate() {
        let registry = KindRegistry::standard();
        let err = registry
            .build_task(
                "location",
                &props(json!({"dimension": "minecraft:the_nether", "x": 1, "y": 64, "z": 3})),
            )
            .unwrap_err();
        assert_eq!(
            err,
            ModelError::MissingProperty {
                kind: "location task".to_string(),
                property: "radius",
            }
        );
    }

    #[test]
    fn test_xp_reward_rejects_both_xp_forms() {
        let registry = KindRegistry::standard();
        let err = registry
            .build_reward("xp", &props(json!({"xp": 10, "xp_levels": 2})))
            .unwrap_err();
        assert!(matches!(err, ModelError::MutuallyExclusive { .. }));
    }

    #[test]
    fn test_unknown_kind_fails_closed() {
        let registry = KindRegistry::standard();
        let err = registry.build_reward("mana", &PropertyMap::new()).unwrap_err();
        assert_eq!(
            err,
            ModelError::UnknownKind {
                category: "reward",
                kind: "mana".to_string(),
            }
        );
    }

    #[test]
    fn test_registries_are_isolated() {
        let mut custom = KindRegistry::empty();
        custom.register_task("checkmark", |_| Ok(Task::Checkmark));

        assert!(custom.has_task_kind("checkmark"));
        assert!(!custom.has_task_kind("item"));
        assert!(KindRegistry::standard().has_task_kind("item"));
    }

    #[test]
    fn test_task_serializes_with_type_tag() {
        let task = Task::Dimension {
            dimension: "minecraft:the_end".to_string(),
        };
        let value = serde_json::to_value(&task).unwrap();
        assert_eq!(value, json!({"type": "dimension", "dimension": "minecraft:the_end"}));
    }
}
