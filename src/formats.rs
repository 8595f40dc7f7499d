//! Source data as it appears in the bestiary and spell JSON files.

use indexmap::IndexMap;
use serde::{Deserialize, Deserializer};

// --- entry trees ---

/// One node of an `entries` tree.
///
/// Shapes the converters do not know are kept as [`Entry::Other`] and skipped.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum Entry {
    Text(String),
    Node(EntryNode),
    Other(serde_json::Value),
}

impl Entry {
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Self::Text(text) => Some(text),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum EntryNode {
    #[serde(alias = "section", alias = "inset", alias = "variantSub")]
    Entries {
        #[serde(default)]
        name: Option<String>,
        #[serde(default)]
        entries: Vec<Entry>,
    },
    #[serde(alias = "inlineBlock")]
    Inline {
        #[serde(default)]
        entries: Vec<Entry>,
    },
    List {
        #[serde(default)]
        items: Vec<ListItem>,
    },
    Table(Table),
    Item(NamedItem),
    Link {
        text: String,
    },
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum ListItem {
    Text(String),
    Named(NamedItem),
    Other(serde_json::Value),
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct NamedItem {
    pub name: String,
    #[serde(default)]
    pub entry: Option<String>,
    #[serde(default)]
    pub entries: Vec<Entry>,
}

impl NamedItem {
    /// The item's body: `entry` when present, otherwise its text entries joined.
    pub fn body(&self) -> String {
        match &self.entry {
            Some(entry) => entry.clone(),
            None => self
                .entries
                .iter()
                .filter_map(Entry::as_text)
                .collect::<Vec<_>>()
                .join("\n"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Table {
    #[serde(default)]
    pub caption: Option<String>,
    #[serde(default)]
    pub col_labels: Vec<String>,
    #[serde(default)]
    pub col_styles: Vec<String>,
    #[serde(default)]
    pub rows: Vec<Vec<Cell>>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum Cell {
    Text(String),
    Roll { roll: RollCell },
    Other(serde_json::Value),
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct RollCell {
    #[serde(default)]
    pub exact: Option<i64>,
    #[serde(default)]
    pub min: Option<i64>,
    #[serde(default)]
    pub max: Option<i64>,
}

// --- monsters ---

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MonsterFile {
    #[serde(default)]
    pub monster: Vec<MonsterRecord>,
    #[serde(default)]
    pub legendary_group: Vec<LegendaryGroup>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MonsterRecord {
    pub name: String,
    #[serde(default)]
    pub size: String,
    #[serde(rename = "type")]
    pub creature_type: CreatureType,
    #[serde(default)]
    pub alignment: Vec<Alignment>,
    #[serde(default)]
    pub ac: Vec<ArmorClass>,
    #[serde(default)]
    pub hp: HitPoints,
    #[serde(default)]
    pub speed: Speed,
    #[serde(rename = "str", default)]
    pub strength: i32,
    #[serde(rename = "dex", default)]
    pub dexterity: i32,
    #[serde(rename = "con", default)]
    pub constitution: i32,
    #[serde(rename = "int", default)]
    pub intelligence: i32,
    #[serde(rename = "wis", default)]
    pub wisdom: i32,
    #[serde(rename = "cha", default)]
    pub charisma: i32,
    #[serde(default)]
    pub save: Option<IndexMap<String, String>>,
    #[serde(default)]
    pub skill: Option<SkillBlock>,
    #[serde(default)]
    pub vulnerable: Option<Vec<DamageModifier>>,
    #[serde(default)]
    pub resist: Option<Vec<DamageModifier>>,
    #[serde(default)]
    pub immune: Option<Vec<DamageModifier>>,
    #[serde(default)]
    pub condition_immune: Option<Vec<ConditionImmunity>>,
    #[serde(default)]
    pub senses: Option<TextList>,
    #[serde(default)]
    pub languages: Option<TextList>,
    #[serde(default)]
    pub cr: Option<ChallengeField>,
    #[serde(rename = "trait", default)]
    pub traits: Option<Vec<StatblockEntry>>,
    #[serde(rename = "action", default)]
    pub actions: Option<Vec<StatblockEntry>>,
    #[serde(rename = "reaction", default)]
    pub reactions: Option<Vec<StatblockEntry>>,
    #[serde(default)]
    pub spellcasting: Option<Vec<SpellcastingBlock>>,
    #[serde(default)]
    pub variant: Option<Vec<Variant>>,
    #[serde(default)]
    pub legendary: Option<Vec<LegendaryEntry>>,
    #[serde(default)]
    pub legendary_actions: Option<u32>,
    #[serde(default)]
    pub legendary_group: Option<GroupRef>,
    #[serde(default)]
    pub environment: Option<Vec<String>>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum CreatureType {
    Plain(String),
    Tagged {
        #[serde(rename = "type")]
        kind: String,
        #[serde(default)]
        tags: Vec<TypeTag>,
        #[serde(default, rename = "swarmSize")]
        swarm_size: Option<String>,
    },
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum TypeTag {
    Plain(String),
    Prefixed { tag: String, prefix: String },
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum Alignment {
    Code(String),
    Chance {
        alignment: Vec<String>,
        #[serde(default)]
        chance: Option<u32>,
        #[serde(default)]
        note: Option<String>,
    },
    Special {
        special: String,
    },
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum ArmorClass {
    Flat(u32),
    Detailed(ArmorDetail),
    /// Free text such as `{"special": "12 + your Dexterity modifier"}`.
    Special { special: String },
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ArmorDetail {
    pub ac: u32,
    #[serde(default)]
    pub from: Option<Vec<String>>,
    #[serde(default)]
    pub condition: Option<String>,
    #[serde(default)]
    pub braces: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct HitPoints {
    #[serde(default)]
    pub average: Option<u32>,
    #[serde(default)]
    pub formula: Option<String>,
    #[serde(default)]
    pub special: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Speed {
    #[serde(default)]
    pub walk: Option<SpeedValue>,
    #[serde(default)]
    pub burrow: Option<SpeedValue>,
    #[serde(default)]
    pub climb: Option<SpeedValue>,
    #[serde(default)]
    pub fly: Option<SpeedValue>,
    #[serde(default)]
    pub swim: Option<SpeedValue>,
    #[serde(default)]
    pub can_hover: bool,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum SpeedValue {
    Feet(u32),
    Conditional { number: u32, condition: String },
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct SkillBlock {
    #[serde(default)]
    pub other: Vec<SkillChoice>,
    #[serde(flatten)]
    pub bonuses: IndexMap<String, String>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct SkillChoice {
    #[serde(rename = "oneOf", default)]
    pub one_of: IndexMap<String, String>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum DamageModifier {
    Plain(String),
    Group(DamageGroup),
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DamageGroup {
    #[serde(default, alias = "immune", alias = "vulnerable")]
    pub resist: Vec<DamageModifier>,
    #[serde(default)]
    pub pre_note: Option<String>,
    #[serde(default)]
    pub note: Option<String>,
    #[serde(default)]
    pub special: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum ConditionImmunity {
    Plain(String),
    Group {
        #[serde(rename = "conditionImmune")]
        conditions: Vec<ConditionImmunity>,
        #[serde(default, rename = "preNote")]
        pre_note: Option<String>,
        #[serde(default)]
        note: Option<String>,
    },
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum TextList {
    One(String),
    Many(Vec<String>),
}

impl TextList {
    pub fn joined(&self) -> String {
        match self {
            Self::One(text) => text.clone(),
            Self::Many(items) => items.join(", "),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum ChallengeField {
    Plain(String),
    Detailed { cr: String },
}

impl ChallengeField {
    pub fn rating(&self) -> &str {
        match self {
            Self::Plain(cr) | Self::Detailed { cr } => cr,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct StatblockEntry {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub entries: Vec<Entry>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SpellcastingBlock {
    pub name: String,
    #[serde(default)]
    pub header_entries: Vec<Entry>,
    #[serde(default)]
    pub footer_entries: Vec<Entry>,
    /// Frequency keys (`will`, `daily`, `spells`, ...) in source order.
    #[serde(flatten)]
    pub usage: IndexMap<String, serde_json::Value>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum SpellRef {
    Name(String),
    Detailed { entry: String },
}

impl SpellRef {
    pub fn text(&self) -> &str {
        match self {
            Self::Name(name) | Self::Detailed { entry: name } => name,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct SpellLevelSlots {
    #[serde(default)]
    pub slots: Option<u32>,
    #[serde(default)]
    pub spells: Vec<SpellRef>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Variant {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub entries: Vec<Entry>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct LegendaryEntry {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub entries: Vec<Entry>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum GroupRef {
    Name(String),
    Ref { name: String },
}

impl GroupRef {
    pub fn name(&self) -> &str {
        match self {
            Self::Name(name) | Self::Ref { name } => name,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LegendaryGroup {
    pub name: String,
    #[serde(default)]
    pub lair_actions: Option<Vec<Entry>>,
    #[serde(default)]
    pub regional_effects: Option<Vec<Entry>>,
}

// --- spells ---

#[derive(Debug, Clone, Default, Deserialize)]
pub struct SpellFile {
    #[serde(default)]
    pub spell: Vec<SpellRecord>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SpellRecord {
    pub name: String,
    pub level: u8,
    pub school: String,
    #[serde(default)]
    pub time: Vec<CastingTime>,
    #[serde(default)]
    pub range: Option<SpellRange>,
    #[serde(default)]
    pub components: Option<Components>,
    #[serde(default)]
    pub duration: Vec<SpellDuration>,
    #[serde(default)]
    pub meta: Option<SpellMeta>,
    #[serde(default)]
    pub entries: Vec<Entry>,
    #[serde(default)]
    pub entries_higher_level: Option<Vec<Entry>>,
    #[serde(default)]
    pub classes: SpellClasses,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct CastingTime {
    #[serde(default)]
    pub number: Option<u32>,
    pub unit: String,
    #[serde(default)]
    pub condition: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct SpellRange {
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default)]
    pub distance: Option<Distance>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Distance {
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default)]
    pub amount: Option<u32>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct Components {
    #[serde(default)]
    pub v: bool,
    #[serde(default)]
    pub s: bool,
    #[serde(default)]
    pub m: Option<Material>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum Material {
    Flag(bool),
    Text(String),
    Detailed { text: String },
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct SpellDuration {
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default)]
    pub duration: Option<DurationAmount>,
    #[serde(default)]
    pub concentration: bool,
    #[serde(default)]
    pub ends: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DurationAmount {
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default)]
    pub amount: Option<u32>,
    #[serde(default)]
    pub up_to: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct SpellMeta {
    #[serde(default)]
    pub ritual: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SpellClasses {
    #[serde(default)]
    pub from_class_list: Vec<ClassRef>,
    #[serde(default)]
    pub from_subclass: Vec<SubclassRef>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ClassRef {
    pub name: String,
    pub source: String,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct SubclassRef {
    pub class: ClassRef,
    pub subclass: SubclassName,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubclassName {
    pub name: String,
    pub source: String,
    #[serde(default)]
    pub sub_subclass: Option<String>,
}

// --- supplemental spell mechanics ---

#[derive(Debug, Clone, Deserialize)]
pub struct SupplementalFile {
    #[serde(default)]
    pub spell: Vec<SupplementalRecord>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SupplementalRecord {
    pub name: String,
    #[serde(default)]
    pub data: serde_json::Map<String, serde_json::Value>,
    #[serde(default)]
    pub shaped_data: serde_json::Map<String, serde_json::Value>,
}

impl SupplementalRecord {
    /// `data` overlaid with `shapedData`.
    pub fn merged(self) -> Result<SupplementalSpellData, serde_json::Error> {
        let mut data = self.data;
        data.extend(self.shaped_data);
        serde_json::from_value(serde_json::Value::Object(data))
    }
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct SupplementalSpellData {
    #[serde(rename = "Spell Attack", default, deserialize_with = "text_or_number")]
    pub spell_attack: Option<String>,
    #[serde(rename = "Save", default, deserialize_with = "text_or_number")]
    pub save: Option<String>,
    #[serde(rename = "Save Success", default, deserialize_with = "text_or_number")]
    pub save_success: Option<String>,
    #[serde(rename = "Damage", default, deserialize_with = "text_or_number")]
    pub damage: Option<String>,
    #[serde(rename = "Damage Progression", default, deserialize_with = "text_or_number")]
    pub damage_progression: Option<String>,
    #[serde(rename = "Damage Type", default, deserialize_with = "text_or_number")]
    pub damage_type: Option<String>,
    #[serde(rename = "Higher Spell Slot Dice", default, deserialize_with = "text_or_number")]
    pub higher_spell_slot_dice: Option<String>,
    #[serde(rename = "Add Casting Modifier", default, deserialize_with = "text_or_number")]
    pub add_casting_modifier: Option<String>,
    #[serde(rename = "primaryDamageCondition", default, deserialize_with = "text_or_number")]
    pub primary_damage_condition: Option<String>,
    #[serde(rename = "Secondary Damage", default, deserialize_with = "text_or_number")]
    pub secondary_damage: Option<String>,
    #[serde(rename = "Secondary Damage Type", default, deserialize_with = "text_or_number")]
    pub secondary_damage_type: Option<String>,
    #[serde(
        rename = "Secondary Damage Progression",
        default,
        deserialize_with = "text_or_number"
    )]
    pub secondary_damage_progression: Option<String>,
    #[serde(
        rename = "Secondary Higher Spell Slot Dice",
        default,
        deserialize_with = "text_or_number"
    )]
    pub secondary_higher_spell_slot_dice: Option<String>,
    #[serde(
        rename = "Secondary Add Casting Modifier",
        default,
        deserialize_with = "text_or_number"
    )]
    pub secondary_add_casting_modifier: Option<String>,
    #[serde(rename = "secondaryDamageCondition", default, deserialize_with = "text_or_number")]
    pub secondary_damage_condition: Option<String>,
    #[serde(rename = "Healing", default, deserialize_with = "text_or_number")]
    pub healing: Option<String>,
    #[serde(rename = "Higher Level Healing", default, deserialize_with = "text_or_number")]
    pub higher_level_healing: Option<String>,
}

fn text_or_number<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Option::<serde_json::Value>::deserialize(deserializer)? {
        Some(serde_json::Value::String(text)) if !text.is_empty() => Some(text),
        Some(serde_json::Value::Number(number)) => Some(number.to_string()),
        _ => None,
    })
}

// --- reference tables ---

/// `index.json`: source key -> file name.
pub type SourceIndex = IndexMap<String, String>;

#[derive(Debug, Clone, Default, Deserialize)]
pub struct SrdMonsterFile {
    #[serde(default)]
    pub monsters: Vec<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SrdSpellFile {
    #[serde(default)]
    pub spells: Vec<String>,
    #[serde(default)]
    pub spell_renames: IndexMap<String, String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MetaFile {
    #[serde(default)]
    pub legendary_group: Vec<LegendaryGroup>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn entry_trees_decode_into_known_node_kinds() -> anyhow::Result<()> {
        let entries: Vec<Entry> = serde_json::from_value(serde_json::json!([
            "plain",
            {"type": "list", "items": ["a", {"type": "item", "name": "B.", "entry": "b"}]},
            {"type": "entries", "name": "Sub", "entries": ["x"]},
            {"type": "inline", "entries": ["y", {"type": "link", "text": "z"}]},
            {"type": "table", "colLabels": ["d6"], "colStyles": ["col-2"], "rows": [[{"roll": {"exact": 1}}]]},
            {"type": "image", "href": {}}
        ]))?;

        assert_eq!(entries[0], Entry::Text("plain".to_owned()));
        assert!(matches!(&entries[1], Entry::Node(EntryNode::List { items }) if items.len() == 2));
        assert!(matches!(&entries[2], Entry::Node(EntryNode::Entries { name: Some(n), .. }) if n == "Sub"));
        assert!(matches!(&entries[3], Entry::Node(EntryNode::Inline { .. })));
        assert!(matches!(&entries[4], Entry::Node(EntryNode::Table(_))));
        assert!(matches!(&entries[5], Entry::Other(_)));
        Ok(())
    }

    #[test]
    fn supplemental_data_prefers_shaped_overrides() -> anyhow::Result<()> {
        let record: SupplementalRecord = serde_json::from_value(serde_json::json!({
            "name": "Fire Bolt",
            "data": {"Damage": "1d10", "Damage Type": "Fire", "Higher Spell Slot Dice": 1},
            "shapedData": {"Damage Type": "Cold"}
        }))?;

        let data = record.merged()?;
        assert_eq!(data.damage.as_deref(), Some("1d10"));
        assert_eq!(data.damage_type.as_deref(), Some("Cold"));
        assert_eq!(data.higher_spell_slot_dice.as_deref(), Some("1"));
        Ok(())
    }

    #[test]
    fn spellcasting_keeps_frequency_keys_in_source_order() -> anyhow::Result<()> {
        let block: SpellcastingBlock = serde_json::from_value(serde_json::json!({
            "name": "Innate Spellcasting",
            "headerEntries": ["header"],
            "will": ["mage hand"],
            "daily": {"1e": ["fly"]},
            "constant": ["detect magic"]
        }))?;

        let keys = block.usage.keys().map(String::as_str).collect::<Vec<_>>();
        assert_eq!(keys, vec!["will", "daily", "constant"]);
        Ok(())
    }
}
