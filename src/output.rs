use std::io::Write as _;
use std::path::Path;
use std::str::FromStr;

use anyhow::{Context as _, Result, bail};
use serde::Serialize;

/// Output format for structured data
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum OutputFormat {
    /// YAML, the format stack manifests are written in
    #[default]
    Yaml,
    /// JSON - machine-parseable
    Json,
}

impl FromStr for OutputFormat {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "yaml" | "yml" => Ok(Self::Yaml),
            "json" => Ok(Self::Json),
            _ => bail!("Invalid format '{}'. Use: yaml or json", s),
        }
    }
}

impl OutputFormat {
    /// Serialize data to the requested format
    pub fn serialize<T: Serialize>(self, data: &T) -> Result<String> {
        match self {
            Self::Json => serde_json::to_string_pretty(data)
                .map(|mut s| {
                    s.push('\n');
                    s
                })
                .map_err(|e| anyhow::anyhow!("JSON serialization failed: {}", e)),
            Self::Yaml => {
                serde_yaml::to_string(data).map_err(|e| anyhow::anyhow!("YAML serialization failed: {}", e))
            }
        }
    }
}

/// Write `data` to `file`, or to stdout when `file` is `None`.
pub fn emit<T: Serialize>(format: OutputFormat, data: &T, file: Option<&Path>) -> Result<()> {
    let rendered = format.serialize(data)?;
    match file {
        Some(path) => std::fs::write(path, rendered)
            .with_context(|| format!("failed to write {}", path.display())),
        None => {
            let mut stdout = std::io::stdout().lock();
            stdout.write_all(rendered.as_bytes())?;
            stdout.flush()?;
            Ok(())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;

    #[test]
    fn parses_known_formats() {
        assert_eq!("YAML".parse::<OutputFormat>().unwrap(), OutputFormat::Yaml);
        assert_eq!("yml".parse::<OutputFormat>().unwrap(), OutputFormat::Yaml);
        assert_eq!("json".parse::<OutputFormat>().unwrap(), OutputFormat::Json);
        assert!("toml".parse::<OutputFormat>().is_err());
        assert_eq!(OutputFormat::default(), OutputFormat::Yaml);
    }

    #[test]
    fn serializes_both_formats() {
        let data = BTreeMap::from([("stack", "dev")]);
        assert_eq!(OutputFormat::Yaml.serialize(&data).unwrap(), "stack: dev\n");
        assert_eq!(
            OutputFormat::Json.serialize(&data).unwrap(),
            "{\n  \"stack\": \"dev\"\n}\n"
        );
    }

    #[test]
    fn emit_writes_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("affected.json");
        emit(OutputFormat::Json, &vec![1, 2], Some(&path)).unwrap();
        let written = std::fs::read_to_string(&path).unwrap();
        assert_eq!(
            serde_json::from_str::<Vec<i32>>(&written).unwrap(),
            vec![1, 2]
        );
    }
}
