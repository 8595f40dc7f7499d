//! Cross-source aggregation: converts every pending source in one pass, builds the
//! class and archetype spell indices, and finalizes the bundles.

use std::cmp::Ordering;
use std::collections::{HashMap, HashSet};

use indexmap::IndexMap;

use crate::catalog::{PHB, ReferenceTables, SourceRecord};
use crate::config::SCHEMA_VERSION;
use crate::error::{ConvertError, EntityKind};
use crate::formats::{MonsterFile, SpellRecord};
use crate::monster::{LegendaryIndex, convert_monster};
use crate::reference::RulesText;
use crate::shaped::{
    Archetype, ClassEntry, MonsterEntry, PrunedMonster, SourceBundle, SpellEntry, SpellRename,
};
use crate::spell::convert_spell;
use crate::text::compare_names;

/// Subclasses whose spells the SRD already grants.
const EXCLUDED_SUBCLASSES: &[&str] = &["Life", "Devotion", "Land", "Fiend"];

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ClassSpells {
    pub archetypes: Vec<ArchetypeSpells>,
    pub spells: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArchetypeSpells {
    pub name: String,
    pub spells: Vec<String>,
}

/// Class name -> spells and archetypes, in first-seen order.
pub type ClassIndex = IndexMap<String, ClassSpells>;

/// Spell name -> level, under both the current and the SRD name. Outlives a single run
/// because class lists can name spells converted by an earlier one.
pub type SpellLevels = HashMap<String, u8>;

#[derive(Debug, Default)]
struct Converted {
    monsters: Vec<MonsterEntry>,
    spells: Vec<SpellEntry>,
}

/// Working state for one conversion pass.
pub struct ConversionRun<'a> {
    tables: &'a ReferenceTables,
    rules: &'a dyn RulesText,
    legendary_groups: LegendaryIndex,
    spell_levels: &'a mut SpellLevels,
    /// Sources whose class lists this run appended to.
    touched: HashSet<String>,
}

impl<'a> ConversionRun<'a> {
    pub fn new(
        tables: &'a ReferenceTables,
        rules: &'a dyn RulesText,
        spell_levels: &'a mut SpellLevels,
    ) -> Self {
        let legendary_groups = tables
            .legendary_groups
            .iter()
            .map(|group| (group.name.clone(), group.clone()))
            .collect();
        Self {
            tables,
            rules,
            legendary_groups,
            spell_levels,
            touched: HashSet::new(),
        }
    }

    fn convert_monsters(
        &mut self,
        file: MonsterFile,
        source_name: &str,
    ) -> Result<Vec<MonsterEntry>, ConvertError> {
        for group in file.legendary_group {
            self.legendary_groups.insert(group.name.clone(), group);
        }

        let mut out = Vec::with_capacity(file.monster.len());
        for monster in &file.monster {
            let converted = convert_monster(monster, &self.legendary_groups, self.rules)
                .map_err(|err| err.in_entity(EntityKind::Monster, &monster.name, source_name))?;
            if !self.tables.srd_monsters.contains(&monster.name) {
                out.push(MonsterEntry::Full(Box::new(converted)));
                continue;
            }
            if !converted.lair.is_empty() {
                out.push(MonsterEntry::Pruned(PrunedMonster {
                    name: converted.name,
                    lair: converted.lair,
                }));
            }
        }
        Ok(out)
    }

    fn convert_spells(
        &mut self,
        spells: Vec<SpellRecord>,
        key: &str,
        source_name: &str,
        records: &mut IndexMap<String, SourceRecord>,
    ) -> Result<Vec<SpellEntry>, ConvertError> {
        let tables = self.tables;
        let mut out = Vec::with_capacity(spells.len());
        for spell in &spells {
            let renamed = tables.spell_renames.get(&spell.name);
            self.spell_levels.insert(spell.name.clone(), spell.level);
            if let Some(old) = renamed {
                self.spell_levels.insert(old.clone(), spell.level);
            }

            self.index_classes(spell, key, records);

            if tables.srd_spells.contains(&spell.name) {
                continue;
            }
            if let Some(old) = renamed {
                out.push(SpellEntry::Renamed(SpellRename {
                    name: old.clone(),
                    new_name: spell.name.clone(),
                }));
                continue;
            }
            let converted = convert_spell(
                spell,
                tables.supplemental.get(&spell.name),
                self.rules,
            )
            .map_err(|err| err.in_entity(EntityKind::Spell, &spell.name, source_name))?;
            out.push(SpellEntry::Full(Box::new(converted)));
        }
        Ok(out)
    }

    fn index_classes(
        &mut self,
        spell: &SpellRecord,
        key: &str,
        records: &mut IndexMap<String, SourceRecord>,
    ) {
        let tables = self.tables;
        let srd_covered = tables.is_srd_spell(&spell.name);
        let listed_name = tables
            .spell_renames
            .get(&spell.name)
            .unwrap_or(&spell.name);

        for class in &spell.classes.from_class_list {
            if srd_covered && class.source == PHB {
                continue;
            }
            let owner = if class.source == PHB {
                key
            } else {
                class.source.as_str()
            };
            let Some(record) = records.get_mut(owner) else {
                continue;
            };
            self.touched.insert(record.key.clone());
            record
                .classes
                .entry(class.name.clone())
                .or_default()
                .spells
                .push(listed_name.clone());
        }

        for entry in &spell.classes.from_subclass {
            if EXCLUDED_SUBCLASSES.contains(&entry.subclass.name.as_str()) {
                continue;
            }
            if !records.contains_key(&entry.class.source) {
                continue;
            }
            let owner = if entry.subclass.source == PHB {
                key
            } else {
                entry.subclass.source.as_str()
            };
            let Some(record) = records.get_mut(owner) else {
                continue;
            };
            self.touched.insert(record.key.clone());
            let archetype_name = entry
                .subclass
                .sub_subclass
                .as_ref()
                .unwrap_or(&entry.subclass.name);
            let class = record.classes.entry(entry.class.name.clone()).or_default();
            match class
                .archetypes
                .iter_mut()
                .find(|archetype| &archetype.name == archetype_name)
            {
                Some(archetype) => archetype.spells.push(spell.name.clone()),
                None => class.archetypes.push(ArchetypeSpells {
                    name: archetype_name.clone(),
                    spells: vec![spell.name.clone()],
                }),
            }
        }
    }

    fn by_level_then_name(&self, a: &str, b: &str) -> Ordering {
        let level = |name: &str| self.spell_levels.get(name).copied().unwrap_or(u8::MAX);
        level(a).cmp(&level(b)).then_with(|| compare_names(a, b))
    }

    fn class_entries(&self, record: &SourceRecord) -> Option<Vec<ClassEntry>> {
        let mut classes = record
            .classes
            .iter()
            .map(|(name, class)| {
                let mut spells = class.spells.clone();
                spells.sort_by(|a, b| self.by_level_then_name(a, b));
                let mut archetypes = class
                    .archetypes
                    .iter()
                    .map(|archetype| {
                        let mut spells = archetype.spells.clone();
                        spells.sort_by(|a, b| self.by_level_then_name(a, b));
                        Archetype {
                            name: archetype.name.clone(),
                            spells,
                        }
                    })
                    .collect::<Vec<_>>();
                archetypes.sort_by(|a, b| compare_names(&a.name, &b.name));
                ClassEntry {
                    name: name.clone(),
                    archetypes: (!archetypes.is_empty()).then_some(archetypes),
                    spells: (!spells.is_empty()).then_some(spells),
                }
            })
            .collect::<Vec<_>>();
        classes.sort_by(|a, b| compare_names(&a.name, &b.name));
        (!classes.is_empty()).then_some(classes)
    }

    fn finalize(&self, record: &SourceRecord, converted: Converted) -> SourceBundle {
        let Converted {
            mut monsters,
            mut spells,
        } = converted;
        monsters.sort_by(|a, b| compare_names(a.name(), b.name()));
        spells.sort_by(|a, b| compare_names(a.name(), b.name()));

        SourceBundle {
            name: record.name.clone(),
            dependencies: record.dependencies.clone(),
            version: SCHEMA_VERSION.to_owned(),
            classes: self.class_entries(record),
            monsters: (!monsters.is_empty()).then_some(monsters),
            spells: (!spells.is_empty()).then_some(spells),
        }
    }
}

/// Converts every source that has loaded inputs and no bundle yet.
///
/// All pending sources convert before any is finalized, since a spell in one source
/// can add to another source's class lists. Bundles converted by an earlier call get
/// their class lists rebuilt when this call appended to them.
pub fn convert_pending(
    records: &mut IndexMap<String, SourceRecord>,
    spell_levels: &mut SpellLevels,
    tables: &ReferenceTables,
    rules: &dyn RulesText,
) -> Result<(), ConvertError> {
    let pending = records
        .values()
        .filter(|record| record.converted.is_none() && record.has_inputs())
        .map(|record| record.key.clone())
        .collect::<Vec<_>>();
    tracing::info!(sources = ?pending, "converting sources");

    let mut run = ConversionRun::new(tables, rules, spell_levels);
    let mut converted = HashMap::with_capacity(pending.len());
    for key in &pending {
        let Some(record) = records.get_mut(key) else {
            continue;
        };
        let source_name = record.name.clone();
        let monster_input = record.monster_input.take();
        let spell_input = record.spell_input.take();

        let mut out = Converted::default();
        if let Some(file) = monster_input {
            out.monsters = run.convert_monsters(file, &source_name)?;
        }
        if let Some(spells) = spell_input {
            out.spells = run.convert_spells(spells, key, &source_name, records)?;
        }
        tracing::debug!(
            source = %key,
            monsters = out.monsters.len(),
            spells = out.spells.len(),
            "converted source"
        );
        converted.insert(key.clone(), out);
    }

    for key in &pending {
        let Some(out) = converted.remove(key) else {
            continue;
        };
        let Some(record) = records.get(key) else {
            continue;
        };
        let bundle = run.finalize(record, out);
        if let Some(record) = records.get_mut(key) {
            record.converted = Some(bundle);
        }
    }

    let touched = std::mem::take(&mut run.touched);
    for key in touched.iter().filter(|key| !pending.contains(*key)) {
        let Some(record) = records.get(key) else {
            continue;
        };
        if record.converted.is_none() {
            continue;
        }
        let classes = run.class_entries(record);
        if let Some(bundle) = records.get_mut(key).and_then(|r| r.converted.as_mut()) {
            bundle.classes = classes;
            tracing::debug!(source = %key, "refreshed class lists");
        }
    }
    tracing::info!(sources = pending.len(), "finalized sources");
    Ok(())
}
