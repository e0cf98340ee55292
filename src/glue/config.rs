//! `skir.yml` data model (§6): a plain serde struct mirroring the
//! config file's shape. Data-model only — the YAML loader itself is
//! one of the external collaborators the core is deliberately
//! ignorant of (spec.md §1 Non-goals), so this module never touches a
//! YAML parser; it exists so that loader has a typed shape to
//! deserialize into. No glob-pattern validation is performed here
//! either, unlike the teacher's `config.rs`, since nothing in this
//! crate consumes include/ignore patterns.
//!
//! Grounded in the teacher's `config.rs`: serde-derived struct with
//! `camelCase` renaming and a `validate() -> anyhow::Result<()>`
//! pattern reporting every problem it finds via `anyhow::bail!`.

use anyhow::{bail, Result};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Config {
    pub generators: Vec<GeneratorConfig>,
    #[serde(default)]
    pub dependencies: Option<DependenciesConfig>,
    #[serde(default)]
    pub github_token_env_var: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeneratorConfig {
    #[serde(rename = "mod")]
    pub module: String,
    #[serde(rename = "outDir")]
    pub out_dir: String,
    #[serde(default)]
    pub config: serde_json::Value,
}

/// Left intentionally opaque: spec.md gives this field's shape as a
/// literal `{...}`, so it's kept as whatever the file contains rather
/// than modeled field-by-field.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DependenciesConfig(pub serde_json::Value);

impl Config {
    /// Deserializes an already-parsed config value (the YAML loader
    /// lives outside this crate) and validates it in one step.
    pub fn from_value(value: serde_json::Value) -> Result<Config> {
        let config: Config = serde_json::from_value(value)?;
        config.validate()?;
        Ok(config)
    }

    /// Checks the one structural invariant spec.md calls out by name:
    /// every generator's `outDir` must end with `/skirout` (§6).
    pub fn validate(&self) -> Result<()> {
        if self.generators.is_empty() {
            bail!("skir.yml must declare at least one generator");
        }
        for generator in &self.generators {
            if !generator.out_dir.ends_with("/skirout") {
                bail!(
                    "generator \"{}\": outDir \"{}\" must end with \"/skirout\"",
                    generator.module,
                    generator.out_dir
                );
            }
        }
        Ok(())
    }
}
