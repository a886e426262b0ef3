//! Producer-side source scene: the walkable material description the
//! serializer exports, read from JSON.

use std::collections::BTreeMap;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::material::{Channel, MaterialType, ShaderNode};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SourceScene {
    pub objects: Vec<SourceObject>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SourceObject {
    pub name: String,
    #[serde(default)]
    pub materials: Vec<SourceMaterial>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SourceMaterial {
    pub name: String,
    #[serde(default)]
    pub parent: Option<String>,
    #[serde(rename = "materialType")]
    pub material_type: MaterialType,
    #[serde(default)]
    pub channels: BTreeMap<Channel, SourceChannel>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SourceChannel {
    #[serde(default = "default_enabled")]
    pub enabled: bool,
    #[serde(default)]
    pub link: Option<ShaderNode>,
    #[serde(default)]
    pub color: Option<[f32; 3]>,
    #[serde(default)]
    pub value: Option<f32>,
}

fn default_enabled() -> bool {
    true
}

impl SourceScene {
    pub fn material_count(&self) -> usize {
        self.objects.iter().map(|o| o.materials.len()).sum()
    }
}

pub fn load_scene_from_path(path: impl AsRef<std::path::Path>) -> Result<SourceScene> {
    let path = path.as_ref();
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read scene json at {}", path.display()))?;
    let scene: SourceScene =
        serde_json::from_str(&text).context("failed to parse scene json")?;
    Ok(scene)
}
