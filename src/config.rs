use std::path::{Path, PathBuf};

/// Version stamped on every emitted bundle.
pub const SCHEMA_VERSION: &str = "2.0.0";

/// Where the source JSON lives under a data directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DataLayout {
    pub bestiary_dir: PathBuf,
    pub spells_dir: PathBuf,
}

impl DataLayout {
    pub fn new(root: impl AsRef<Path>) -> Self {
        Self::with_overrides(root, None, None)
    }

    /// Honors `SHAPEDIFY_BESTIARY_DIR` and `SHAPEDIFY_SPELLS_DIR`; relative values resolve
    /// against `root`.
    pub fn from_env(root: impl AsRef<Path>) -> Self {
        let bestiary = std::env::var("SHAPEDIFY_BESTIARY_DIR").ok();
        let spells = std::env::var("SHAPEDIFY_SPELLS_DIR").ok();
        Self::with_overrides(root, bestiary, spells)
    }

    pub fn with_overrides(
        root: impl AsRef<Path>,
        bestiary: Option<String>,
        spells: Option<String>,
    ) -> Self {
        let root = root.as_ref();
        Self {
            bestiary_dir: root.join(bestiary.as_deref().unwrap_or("bestiary")),
            spells_dir: root.join(spells.as_deref().unwrap_or("spells")),
        }
    }

    pub fn bestiary_index(&self) -> PathBuf {
        self.bestiary_dir.join("index.json")
    }

    pub fn spells_index(&self) -> PathBuf {
        self.spells_dir.join("index.json")
    }

    pub fn bestiary_file(&self, file: &str) -> PathBuf {
        self.bestiary_dir.join(file)
    }

    pub fn spell_file(&self, file: &str) -> PathBuf {
        self.spells_dir.join(file)
    }

    pub fn srd_monsters(&self) -> PathBuf {
        self.bestiary_dir.join("srd-monsters.json")
    }

    pub fn legendary_meta(&self) -> PathBuf {
        self.bestiary_dir.join("meta.json")
    }

    pub fn srd_spells(&self) -> PathBuf {
        self.spells_dir.join("srd-spells.json")
    }

    pub fn supplemental_spells(&self) -> PathBuf {
        self.spells_dir.join("roll20.json")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_layout_uses_bestiary_and_spells_dirs() {
        let layout = DataLayout::new("/data");
        assert_eq!(
            layout.bestiary_index(),
            PathBuf::from("/data/bestiary/index.json")
        );
        assert_eq!(
            layout.supplemental_spells(),
            PathBuf::from("/data/spells/roll20.json")
        );
        assert_eq!(
            layout.spell_file("spells-phb.json"),
            PathBuf::from("/data/spells/spells-phb.json")
        );
    }

    #[test]
    fn overrides_resolve_relative_to_root() {
        let layout = DataLayout::with_overrides(
            "/data",
            Some("monsters".to_owned()),
            Some("/elsewhere/spells".to_owned()),
        );
        assert_eq!(layout.srd_monsters(), PathBuf::from("/data/monsters/srd-monsters.json"));
        assert_eq!(layout.srd_spells(), PathBuf::from("/elsewhere/spells/srd-spells.json"));
    }
}
