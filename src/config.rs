use std::path::Path;

use anyhow::{Context, bail};
use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::{Map, Value};

use crate::error::{Error, Result};

// ---------------------------------------------------------------------------
// Option structs: defaults + caller overrides
// ---------------------------------------------------------------------------

/// Caller-supplied option overrides, keyed by option name.
pub type Overrides = Map<String, Value>;

/// An option struct whose defaults can be overridden key by key.
pub trait Options: Default + Serialize + DeserializeOwned {
    /// Alternate spellings accepted for option keys: `(alias, canonical)`.
    const ALIASES: &'static [(&'static str, &'static str)] = &[];

    /// Defaults with every override key replacing the matching default.
    fn with_overrides(overrides: &Overrides) -> Result<Self> {
        merge_overrides(overrides, Self::ALIASES)
    }
}

fn merge_overrides<T>(overrides: &Overrides, aliases: &[(&str, &str)]) -> Result<T>
where
    T: Default + Serialize + DeserializeOwned,
{
    let mut merged = match serde_json::to_value(T::default())? {
        Value::Object(map) => map,
        other => {
            return Err(Error::Config(format!(
                "options must serialize to a map, got {other}"
            )))
        }
    };

    for (key, value) in overrides {
        let key = aliases
            .iter()
            .find(|(alias, _)| alias == key)
            .map_or(key.as_str(), |(_, canonical)| canonical);
        if !merged.contains_key(key) {
            return Err(Error::Config(format!("unknown option '{key}'")));
        }
        merged.insert(key.to_string(), value.clone());
    }

    serde_json::from_value(Value::Object(merged)).map_err(|e| Error::Config(e.to_string()))
}

// ---------------------------------------------------------------------------
// Option files
// ---------------------------------------------------------------------------

/// Read an override map from a `.json` or `.toml` file.
pub fn load_overrides(path: &Path) -> anyhow::Result<Overrides> {
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("reading options file {}", path.display()))?;

    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .unwrap_or("")
        .to_ascii_lowercase();

    let value: Value = match ext.as_str() {
        "json" => serde_json::from_str(&text).context("parsing JSON options")?,
        "toml" => {
            let table: toml::Table = toml::from_str(&text).context("parsing TOML options")?;
            serde_json::to_value(table).context("converting TOML options")?
        }
        other => bail!("Unsupported options file extension: .{other}"),
    };

    match value {
        Value::Object(map) => Ok(map),
        _ => bail!("Options file must contain a table of option names"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;
    use serde_json::json;

    #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
    #[serde(default)]
    struct Sample {
        gain: Option<i32>,
        title: String,
        flip: bool,
    }

    impl Default for Sample {
        fn default() -> Self {
            Self {
                gain: None,
                title: "title".into(),
                flip: false,
            }
        }
    }

    impl Options for Sample {
        const ALIASES: &'static [(&'static str, &'static str)] = &[("flp", "flip")];
    }

    fn overrides(pairs: &[(&str, Value)]) -> Overrides {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.clone()))
            .collect()
    }

    #[test]
    fn test_empty_overrides_give_defaults() {
        let opts = Sample::with_overrides(&Overrides::new()).unwrap();
        assert_eq!(opts, Sample::default());
    }

    #[test]
    fn test_overrides_replace_matching_keys_in_any_order() {
        let a = overrides(&[("gain", json!(2)), ("title", json!("scan"))]);
        let b = overrides(&[("title", json!("scan")), ("gain", json!(2))]);

        let from_a = Sample::with_overrides(&a).unwrap();
        let from_b = Sample::with_overrides(&b).unwrap();
        assert_eq!(from_a, from_b);
        assert_eq!(from_a.gain, Some(2));
        assert_eq!(from_a.title, "scan");
        assert!(!from_a.flip);
    }

    #[test]
    fn test_alias_maps_to_canonical_key() {
        let opts = Sample::with_overrides(&overrides(&[("flp", json!(true))])).unwrap();
        assert!(opts.flip);
    }

    #[test]
    fn test_unknown_key_rejected() {
        let err = Sample::with_overrides(&overrides(&[("gian", json!(1))])).unwrap_err();
        assert!(matches!(err, Error::Config(msg) if msg.contains("gian")));
    }

    #[test]
    fn test_wrong_type_rejected() {
        let err = Sample::with_overrides(&overrides(&[("flip", json!("yes"))])).unwrap_err();
        assert!(matches!(err, Error::Config(_)));
    }

    #[test]
    fn test_load_toml_overrides() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("plot.toml");
        std::fs::write(&path, "title = \"gate sweep\"\ngain = 3\n").unwrap();

        let map = load_overrides(&path).unwrap();
        let opts = Sample::with_overrides(&map).unwrap();
        assert_eq!(opts.title, "gate sweep");
        assert_eq!(opts.gain, Some(3));
    }
}
