use std::path::Path;

use serde_json::{Value, json};

fn write(root: &Path, name: &str, value: Value) -> anyhow::Result<()> {
    let path = root.join(name);
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    std::fs::write(path, serde_json::to_vec_pretty(&value)?)?;
    Ok(())
}

fn dragon(name: &str, group: Option<&str>) -> Value {
    let mut value = json!({
        "name": name, "size": "L", "type": "dragon", "alignment": ["L", "E"],
        "ac": [{"ac": 18, "from": ["natural armor"]}],
        "hp": {"average": 136, "formula": "16d10+48"},
        "speed": {"walk": 40, "fly": 80, "swim": 40},
        "str": 19, "dex": 12, "con": 17, "int": 16, "wis": 13, "cha": 15,
        "cr": "8"
    });
    if let Some(group) = group {
        value["legendaryGroup"] = json!({"name": group, "source": "MM"});
    }
    value
}

fn spell(name: &str, level: u8, classes: Value) -> Value {
    json!({
        "name": name,
        "level": level,
        "school": "V",
        "time": [{"number": 1, "unit": "action"}],
        "range": {"type": "point", "distance": {"type": "feet", "amount": 60}},
        "components": {"v": true, "s": true},
        "duration": [{"type": "instant"}],
        "entries": [format!("{name} is cast.")],
        "classes": classes
    })
}

fn wizard(source: &str) -> Value {
    json!({"fromClassList": [{"name": "Wizard", "source": source}]})
}

/// A data directory with a Monster Manual bestiary and two spell sources.
pub fn write_data_dir(root: &Path) -> anyhow::Result<()> {
    write(root, "bestiary/index.json", json!({"MM": "bestiary-mm.json"}))?;
    write(
        root,
        "bestiary/srd-monsters.json",
        json!({"monsters": ["Young Green Dragon", "Adult Green Dragon"]}),
    )?;
    write(
        root,
        "bestiary/meta.json",
        json!({"legendaryGroup": [{"name": "Green Dragon", "lairActions": ["Grasping roots."]}]}),
    )?;
    write(
        root,
        "bestiary/bestiary-mm.json",
        json!({"monster": [
            dragon("Young Green Dragon", None),
            dragon("Adult Green Dragon", Some("Green Dragon")),
            {
                "name": "Dust Drake", "size": "M", "type": "dragon", "alignment": ["N"],
                "ac": [12], "hp": {"average": 22, "formula": "4d8+4"}, "speed": {"walk": 30},
                "str": 14, "dex": 14, "con": 12, "int": 6, "wis": 10, "cha": 8, "cr": "1/2",
                "action": [{
                    "name": "Bite (Recharge 5\u{2013}6)",
                    "entries": ["{@atk mw} {@hit 5} to hit. {@h}7 ({@damage 1d10+2}) piercing damage."]
                }]
            }
        ]}),
    )?;

    write(
        root,
        "spells/index.json",
        json!({"PHB": "spells-phb.json", "XGE": "spells-xge.json"}),
    )?;
    write(
        root,
        "spells/srd-spells.json",
        json!({"spells": ["Melf's Acid Arrow"], "spellRenames": {"Acid Arrow": "Melf's Acid Arrow"}}),
    )?;
    write(root, "spells/roll20.json", json!({"spell": []}))?;
    write(
        root,
        "spells/spells-phb.json",
        json!({"spell": [
            spell("Fireball", 3, wizard("PHB")),
            spell("Acid Splash", 0, wizard("PHB")),
            spell("Acid Arrow", 2, wizard("PHB")),
            spell("Fire Bolt", 0, wizard("XGE")),
        ]}),
    )?;
    write(
        root,
        "spells/spells-xge.json",
        json!({"spell": [spell("Toll the Dead", 0, wizard("PHB"))]}),
    )?;
    Ok(())
}
