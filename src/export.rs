use std::fs::OpenOptions;
use std::io::Write as _;
use std::path::Path;
use std::sync::LazyLock;

use anyhow::Context as _;
use regex::Regex;
use serde_json::Value;

use crate::shaped::SourceBundle;

static OPEN_QUOTE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"([\s(])"(\w)"#).expect("open quote regex"));
static CLOSE_QUOTE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"([\w,.])""#).expect("close quote regex"));

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, clap::ValueEnum)]
pub enum Format {
    /// Script for the Shaped companion: one `addEntities` call per bundle.
    #[default]
    Script,
    /// A JSON array of bundles.
    Json,
}

/// Encodes the bundles, swapping straight quotes in every string value for typographic ones.
pub fn encode(bundles: &[SourceBundle], format: Format) -> anyhow::Result<String> {
    let mut values = bundles
        .iter()
        .map(serde_json::to_value)
        .collect::<Result<Vec<_>, _>>()
        .context("serialize bundles")?;
    for value in &mut values {
        fix_quotes(value);
    }

    match format {
        Format::Json => serde_json::to_string_pretty(&values).context("encode json"),
        Format::Script => {
            let calls = values
                .iter()
                .map(|value| {
                    serde_json::to_string(value)
                        .map(|json| format!("ShapedScripts.addEntities({json})"))
                })
                .collect::<Result<Vec<_>, _>>()
                .context("encode script")?;
            Ok(format!(
                "on('ready', function() {{\n{}\n}});",
                calls.join("\n")
            ))
        }
    }
}

fn fix_quotes(value: &mut Value) {
    match value {
        Value::String(text) => *text = typographic_quotes(text),
        Value::Array(items) => items.iter_mut().for_each(fix_quotes),
        Value::Object(map) => map.values_mut().for_each(fix_quotes),
        Value::Null | Value::Bool(_) | Value::Number(_) => {}
    }
}

fn typographic_quotes(text: &str) -> String {
    let text = text.replace('\'', "’");
    let text = OPEN_QUOTE_RE.replace_all(&text, "$1“$2");
    CLOSE_QUOTE_RE.replace_all(&text, "$1”").into_owned()
}

/// Writes to `out`, or stdout when no path is given.
///
/// An existing file is only replaced with `force`.
pub fn write_output(out: Option<&Path>, contents: &str, force: bool) -> anyhow::Result<()> {
    let Some(out) = out else {
        let mut stdout = std::io::stdout().lock();
        writeln!(stdout, "{contents}").context("write stdout")?;
        stdout.flush().context("flush stdout")?;
        return Ok(());
    };

    if out.exists() && !force {
        anyhow::bail!("output already exists: {}", out.display());
    }
    if let Some(parent) = out.parent()
        && !parent.as_os_str().is_empty()
    {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("create output dir: {}", parent.display()))?;
    }

    let mut options = OpenOptions::new();
    options.write(true);
    if force {
        options.create(true).truncate(true);
    } else {
        options.create_new(true);
    }
    let mut file = options
        .open(out)
        .with_context(|| format!("open output: {}", out.display()))?;
    file.write_all(contents.as_bytes())
        .with_context(|| format!("write output: {}", out.display()))?;
    file.flush()
        .with_context(|| format!("flush output: {}", out.display()))?;
    tracing::info!(out = %out.display(), bytes = contents.len(), "wrote bundles");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn bundle() -> SourceBundle {
        SourceBundle {
            name: "Volo's Guide to Monsters".to_owned(),
            dependencies: vec!["Player's Handbook".to_owned()],
            version: "2.0.0".to_owned(),
            classes: None,
            monsters: None,
            spells: None,
        }
    }

    #[test]
    fn quotes_become_typographic() {
        assert_eq!(
            typographic_quotes(r#"the word "doom" (or "dread"), it's"#),
            "the word “doom” (or “dread”), it’s"
        );
        assert_eq!(typographic_quotes("no quotes"), "no quotes");
    }

    #[test]
    fn script_wraps_each_bundle_in_an_add_entities_call() -> anyhow::Result<()> {
        let script = encode(&[bundle(), bundle()], Format::Script)?;
        let lines = script.lines().collect::<Vec<_>>();

        assert_eq!(lines.len(), 4);
        assert_eq!(lines[0], "on('ready', function() {");
        assert!(lines[1].starts_with("ShapedScripts.addEntities({\"name\":\"Volo’s Guide"));
        assert!(lines[1].contains("\"dependencies\":[\"Player’s Handbook\"]"));
        assert_eq!(lines[3], "});");
        Ok(())
    }

    #[test]
    fn json_is_an_array_and_keys_keep_their_quotes() -> anyhow::Result<()> {
        let json = encode(&[bundle()], Format::Json)?;
        let value: Value = serde_json::from_str(&json)?;

        assert_eq!(value[0]["name"], "Volo’s Guide to Monsters");
        assert_eq!(value[0]["version"], "2.0.0");
        assert!(value[0].get("monsters").is_none());
        Ok(())
    }

    #[test]
    fn existing_output_requires_force() -> anyhow::Result<()> {
        let dir = tempfile::tempdir()?;
        let out = dir.path().join("nested").join("out.js");

        write_output(Some(&out), "first", false)?;
        let err = write_output(Some(&out), "second", false).unwrap_err();
        assert!(err.to_string().contains("output already exists"));

        write_output(Some(&out), "second", true)?;
        assert_eq!(std::fs::read_to_string(&out)?, "second");
        Ok(())
    }
}
