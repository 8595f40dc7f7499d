//! Output records in the shape the Shaped companion scripts import.
//!
//! Field order matters to consumers that diff bundles, so struct fields are
//! declared in emission order.

use serde::{Serialize, Serializer};

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TraitAction {
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub recharge: Option<String>,
    pub text: String,
}

impl TraitAction {
    pub fn new(name: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            recharge: None,
            text: text.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LegendaryAction {
    pub name: String,
    #[serde(skip_serializing_if = "is_single_action")]
    pub cost: u32,
    pub text: String,
}

fn is_single_action(cost: &u32) -> bool {
    *cost == 1
}

/// Hit point text, or `0` when the source gave something unusable.
#[derive(Debug, Clone, PartialEq)]
pub enum HitPointsText {
    Known(String),
    Unknown,
}

impl Serialize for HitPointsText {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Self::Known(text) => serializer.serialize_str(text),
            Self::Unknown => serializer.serialize_u8(0),
        }
    }
}

/// Whole challenge ratings serialize as integers, fractions as floats.
fn compact_number<S: Serializer>(value: &f64, serializer: S) -> Result<S::Ok, S::Error> {
    if value.fract() == 0.0 && value.is_finite() {
        serializer.serialize_i64(*value as i64)
    } else {
        serializer.serialize_f64(*value)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NormalizedMonster {
    pub name: String,
    pub size: String,
    #[serde(rename = "type")]
    pub creature_type: String,
    pub alignment: String,
    #[serde(rename = "AC")]
    pub ac: String,
    #[serde(rename = "HP")]
    pub hp: HitPointsText,
    pub speed: String,
    pub strength: i32,
    pub dexterity: i32,
    pub constitution: i32,
    pub intelligence: i32,
    pub wisdom: i32,
    pub charisma: i32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub saving_throws: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub skills: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub damage_vulnerabilities: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub damage_resistances: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub damage_immunities: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub condition_immunities: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub senses: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub languages: Option<String>,
    #[serde(serialize_with = "compact_number")]
    pub challenge: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub traits: Option<Vec<TraitAction>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub actions: Option<Vec<TraitAction>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reactions: Option<Vec<TraitAction>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub legendary_points: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub legendary_actions: Option<Vec<LegendaryAction>>,
    #[serde(flatten)]
    pub lair: LairContent,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub environments: Option<Vec<String>>,
}

/// Lair and regional text contributed by a legendary group.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LairContent {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub lair_actions: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub regional_effects: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub regional_effects_fade: Option<String>,
}

impl LairContent {
    pub fn is_empty(&self) -> bool {
        self.lair_actions.is_none()
            && self.regional_effects.is_none()
            && self.regional_effects_fade.is_none()
    }
}

/// What remains of a monster the SRD already ships.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PrunedMonster {
    pub name: String,
    #[serde(flatten)]
    pub lair: LairContent,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum MonsterEntry {
    Full(Box<NormalizedMonster>),
    Pruned(PrunedMonster),
}

impl MonsterEntry {
    pub fn name(&self) -> &str {
        match self {
            Self::Full(monster) => &monster.name,
            Self::Pruned(pruned) => &pruned.name,
        }
    }
}

/// Damage fields shared by the `attack`, `save` and `damage` objects.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DamageInfo {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub damage: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub damage_bonus: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub damage_type: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub higher_level_dice: Option<serde_json::Number>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub casting_stat: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub secondary_damage: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub secondary_damage_bonus: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub secondary_damage_type: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub higher_level_secondary_dice: Option<serde_json::Number>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub secondary_casting_stat: Option<bool>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct SpellAttack {
    #[serde(rename = "type", skip_serializing_if = "Option::is_none")]
    pub kind: Option<String>,
    #[serde(flatten)]
    pub damage: DamageInfo,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SpellSave {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ability: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub save_success: Option<String>,
    #[serde(flatten)]
    pub damage: DamageInfo,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SpellHeal {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub heal: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bonus: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub casting_stat: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub higher_level_dice: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub higher_level_amount: Option<i64>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NormalizedSpell {
    pub name: String,
    pub level: u8,
    pub school: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ritual: Option<bool>,
    pub casting_time: String,
    pub range: String,
    pub components: String,
    pub duration: String,
    pub description: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub higher_level: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub attack: Option<SpellAttack>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub save: Option<SpellSave>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub damage: Option<DamageInfo>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub heal: Option<SpellHeal>,
}

/// Points the importer from the SRD name of a spell to its current name.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SpellRename {
    pub name: String,
    pub new_name: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum SpellEntry {
    Full(Box<NormalizedSpell>),
    Renamed(SpellRename),
}

impl SpellEntry {
    pub fn name(&self) -> &str {
        match self {
            Self::Full(spell) => &spell.name,
            Self::Renamed(rename) => &rename.name,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Archetype {
    pub name: String,
    pub spells: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ClassEntry {
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub archetypes: Option<Vec<Archetype>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub spells: Option<Vec<String>>,
}

/// One source's worth of converted content.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SourceBundle {
    pub name: String,
    pub dependencies: Vec<String>,
    pub version: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub classes: Option<Vec<ClassEntry>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub monsters: Option<Vec<MonsterEntry>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub spells: Option<Vec<SpellEntry>>,
}
