//! The source catalog: which sources exist, their loaded inputs, and the reference tables
//! every conversion consults.

use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};

use anyhow::Context as _;
use indexmap::IndexMap;
use serde::de::DeserializeOwned;

use crate::aggregate::{ClassIndex, SpellLevels, convert_pending};
use crate::config::DataLayout;
use crate::formats::{
    LegendaryGroup, MetaFile, MonsterFile, SourceIndex, SpellFile, SpellRecord, SrdMonsterFile,
    SrdSpellFile, SupplementalFile, SupplementalSpellData,
};
use crate::reference::RulesText;
use crate::shaped::SourceBundle;

pub const PHB: &str = "PHB";
pub const PHB_NAME: &str = "Player's Handbook";

#[derive(Debug, Clone)]
pub struct SourceRecord {
    pub key: String,
    pub name: String,
    pub dependencies: Vec<String>,
    pub monster_path: Option<PathBuf>,
    pub spell_path: Option<PathBuf>,
    pub monster_input: Option<MonsterFile>,
    pub spell_input: Option<Vec<SpellRecord>>,
    /// Class spell lists gathered for this source, possibly by spells of other sources.
    pub classes: ClassIndex,
    pub converted: Option<SourceBundle>,
}

impl SourceRecord {
    pub fn new(key: &str, name: &str) -> Self {
        let dependencies = if key == PHB {
            vec!["SRD".to_owned()]
        } else {
            vec![PHB_NAME.to_owned()]
        };
        Self {
            key: key.to_owned(),
            name: name.to_owned(),
            dependencies,
            monster_path: None,
            spell_path: None,
            monster_input: None,
            spell_input: None,
            classes: ClassIndex::new(),
            converted: None,
        }
    }

    pub fn has_inputs(&self) -> bool {
        self.monster_input.is_some() || self.spell_input.is_some()
    }
}

/// Lookup tables shared by every source.
#[derive(Debug, Clone, Default)]
pub struct ReferenceTables {
    pub srd_monsters: HashSet<String>,
    pub srd_spells: HashSet<String>,
    /// Current spell name -> the name the SRD uses.
    pub spell_renames: IndexMap<String, String>,
    pub supplemental: HashMap<String, SupplementalSpellData>,
    pub legendary_groups: Vec<LegendaryGroup>,
}

impl ReferenceTables {
    pub async fn load(layout: &DataLayout) -> anyhow::Result<Self> {
        let (srd_monsters, srd_spells, supplemental, meta) = tokio::try_join!(
            read_json::<SrdMonsterFile>(layout.srd_monsters()),
            read_json::<SrdSpellFile>(layout.srd_spells()),
            read_json::<SupplementalFile>(layout.supplemental_spells()),
            read_json::<MetaFile>(layout.legendary_meta()),
        )?;

        let supplemental = supplemental
            .spell
            .into_iter()
            .map(|record| {
                let name = record.name.clone();
                record
                    .merged()
                    .map(|data| (name.clone(), data))
                    .with_context(|| format!("supplemental data for spell {name}"))
            })
            .collect::<anyhow::Result<HashMap<_, _>>>()?;

        Ok(Self {
            srd_monsters: srd_monsters.monsters.into_iter().collect(),
            srd_spells: srd_spells.spells.into_iter().collect(),
            spell_renames: srd_spells.spell_renames,
            supplemental,
            legendary_groups: meta.legendary_group,
        })
    }

    pub fn is_srd_spell(&self, name: &str) -> bool {
        self.srd_spells.contains(name)
            || self
                .spell_renames
                .get(name)
                .is_some_and(|old| self.srd_spells.contains(old))
    }
}

/// Every known source plus whatever has been loaded or converted so far.
///
/// Converted bundles stay cached on their records until [`SourceCatalog::invalidate`].
/// Later `generate` calls reuse the spell levels of earlier ones, so the result does not
/// depend on the order sources were requested in.
#[derive(Debug)]
pub struct SourceCatalog {
    layout: DataLayout,
    pub records: IndexMap<String, SourceRecord>,
    pub tables: Option<ReferenceTables>,
    spell_levels: SpellLevels,
}

impl SourceCatalog {
    /// Reads both index files and creates one record per source key.
    pub async fn load(layout: DataLayout, rules: &dyn RulesText) -> anyhow::Result<Self> {
        let (bestiary, spells) = tokio::try_join!(
            read_json::<SourceIndex>(layout.bestiary_index()),
            read_json::<SourceIndex>(layout.spells_index()),
        )?;

        let mut records = IndexMap::new();
        for (key, file) in bestiary {
            let record = records
                .entry(key.clone())
                .or_insert_with(|| SourceRecord::new(&key, &rules.source_name(&key)));
            record.monster_path = Some(layout.bestiary_file(&file));
        }
        for (key, file) in spells {
            let record = records
                .entry(key.clone())
                .or_insert_with(|| SourceRecord::new(&key, &rules.source_name(&key)));
            record.spell_path = Some(layout.spell_file(&file));
        }
        tracing::debug!(sources = records.len(), "loaded source index");

        Ok(Self {
            layout,
            records,
            tables: None,
            spell_levels: SpellLevels::new(),
        })
    }

    pub fn layout(&self) -> &DataLayout {
        &self.layout
    }

    /// Sources in display order: the Player's Handbook first, then by name.
    pub fn sources(&self) -> Vec<&SourceRecord> {
        let mut sources = self.records.values().collect::<Vec<_>>();
        sources.sort_by(|a, b| {
            (a.name != PHB_NAME)
                .cmp(&(b.name != PHB_NAME))
                .then_with(|| crate::text::compare_names(&a.name, &b.name))
        });
        sources
    }

    /// Loads the reference tables and the inputs of every requested, unconverted source.
    pub async fn prepare(&mut self, keys: &[String]) -> anyhow::Result<()> {
        for key in keys {
            if !self.records.contains_key(key) {
                anyhow::bail!("unknown source: {key}");
            }
        }

        if self.tables.is_none() {
            self.tables = Some(
                ReferenceTables::load(&self.layout)
                    .await
                    .context("load reference tables")?,
            );
        }

        enum Loaded {
            Monsters(MonsterFile),
            Spells(SpellFile),
        }

        let mut join_set = tokio::task::JoinSet::new();
        for key in keys {
            let record = &self.records[key.as_str()];
            if record.converted.is_some() || record.has_inputs() {
                continue;
            }
            if let Some(path) = record.monster_path.clone() {
                let key = key.clone();
                join_set.spawn(async move {
                    let file = read_json::<MonsterFile>(path).await;
                    (key, file.map(Loaded::Monsters))
                });
            }
            if let Some(path) = record.spell_path.clone() {
                let key = key.clone();
                join_set.spawn(async move {
                    let file = read_json::<SpellFile>(path).await;
                    (key, file.map(Loaded::Spells))
                });
            }
        }

        while let Some(joined) = join_set.join_next().await {
            let (key, loaded) = joined.context("join source load task")?;
            let loaded = loaded.with_context(|| format!("load source {key}"))?;
            let Some(record) = self.records.get_mut(&key) else {
                continue;
            };
            match loaded {
                Loaded::Monsters(file) => record.monster_input = Some(file),
                Loaded::Spells(file) => record.spell_input = Some(file.spell),
            }
        }
        Ok(())
    }

    /// Converts the requested sources and returns their bundles in request order.
    pub async fn generate(
        &mut self,
        keys: &[String],
        rules: &dyn RulesText,
    ) -> anyhow::Result<Vec<SourceBundle>> {
        self.prepare(keys).await?;
        let tables = self
            .tables
            .as_ref()
            .context("reference tables not loaded")?;
        convert_pending(&mut self.records, &mut self.spell_levels, tables, rules)?;

        keys.iter()
            .map(|key| {
                self.records
                    .get(key)
                    .and_then(|record| record.converted.clone())
                    .with_context(|| format!("source {key} produced no bundle"))
            })
            .collect()
    }

    /// Drops loaded inputs, derived class lists, spell levels and cached bundles.
    pub fn invalidate(&mut self) {
        for record in self.records.values_mut() {
            record.monster_input = None;
            record.spell_input = None;
            record.classes.clear();
            record.converted = None;
        }
        self.tables = None;
        self.spell_levels.clear();
    }
}

async fn read_json<T: DeserializeOwned>(path: impl AsRef<Path>) -> anyhow::Result<T> {
    let path = path.as_ref();
    let bytes = tokio::fs::read(path)
        .await
        .with_context(|| format!("read {}", path.display()))?;
    serde_json::from_slice(&bytes).with_context(|| format!("parse {}", path.display()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reference::Dnd5eRules;

    fn write(dir: &Path, name: &str, value: serde_json::Value) -> anyhow::Result<()> {
        let path = dir.join(name);
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(path, serde_json::to_vec(&value)?)?;
        Ok(())
    }

    fn fixture(dir: &Path) -> anyhow::Result<()> {
        write(dir, "bestiary/index.json", serde_json::json!({"MM": "bestiary-mm.json"}))?;
        write(
            dir,
            "spells/index.json",
            serde_json::json!({"PHB": "spells-phb.json", "XGE": "spells-xge.json"}),
        )?;
        write(dir, "bestiary/srd-monsters.json", serde_json::json!({"monsters": []}))?;
        write(dir, "bestiary/meta.json", serde_json::json!({"legendaryGroup": []}))?;
        write(
            dir,
            "spells/srd-spells.json",
            serde_json::json!({"spells": [], "spellRenames": {}}),
        )?;
        write(dir, "spells/roll20.json", serde_json::json!({"spell": []}))?;
        write(
            dir,
            "bestiary/bestiary-mm.json",
            serde_json::json!({"monster": [{
                "name": "Bat", "size": "T", "type": "beast", "alignment": ["U"],
                "ac": [12], "hp": {"average": 1, "formula": "1d4-1"}, "speed": {"walk": 5, "fly": 30},
                "str": 2, "dex": 15, "con": 8, "int": 2, "wis": 12, "cha": 4, "cr": "0"
            }]}),
        )?;
        write(dir, "spells/spells-phb.json", serde_json::json!({"spell": []}))?;
        write(dir, "spells/spells-xge.json", serde_json::json!({"spell": []}))?;
        Ok(())
    }

    #[tokio::test]
    async fn index_files_create_one_record_per_key() -> anyhow::Result<()> {
        let dir = tempfile::tempdir()?;
        fixture(dir.path())?;

        let catalog = SourceCatalog::load(DataLayout::new(dir.path()), &Dnd5eRules).await?;
        let names = catalog
            .sources()
            .iter()
            .map(|source| source.name.as_str())
            .collect::<Vec<_>>();
        assert_eq!(
            names,
            vec![
                "Player's Handbook",
                "Monster Manual",
                "Xanathar's Guide to Everything"
            ]
        );
        assert_eq!(catalog.records["PHB"].dependencies, vec!["SRD".to_owned()]);
        assert_eq!(
            catalog.records["MM"].dependencies,
            vec!["Player's Handbook".to_owned()]
        );
        Ok(())
    }

    #[tokio::test]
    async fn generate_caches_bundles_until_invalidated() -> anyhow::Result<()> {
        let dir = tempfile::tempdir()?;
        fixture(dir.path())?;

        let mut catalog = SourceCatalog::load(DataLayout::new(dir.path()), &Dnd5eRules).await?;
        let bundles = catalog.generate(&["MM".to_owned()], &Dnd5eRules).await?;
        assert_eq!(bundles.len(), 1);
        assert_eq!(bundles[0].name, "Monster Manual");
        assert!(catalog.records["MM"].converted.is_some());
        assert!(!catalog.records["MM"].has_inputs());

        catalog.invalidate();
        assert!(catalog.records["MM"].converted.is_none());
        assert!(catalog.tables.is_none());
        Ok(())
    }

    #[tokio::test]
    async fn unknown_source_keys_are_rejected() -> anyhow::Result<()> {
        let dir = tempfile::tempdir()?;
        fixture(dir.path())?;

        let mut catalog = SourceCatalog::load(DataLayout::new(dir.path()), &Dnd5eRules).await?;
        let err = catalog.prepare(&["NOPE".to_owned()]).await.unwrap_err();
        assert!(err.to_string().contains("unknown source: NOPE"));
        Ok(())
    }
}
