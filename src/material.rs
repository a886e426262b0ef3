//! Interchange data model: channels, material types, shader nodes, and the
//! normalized per-material description the parser produces.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::record::{
    self, TAG_COLOR, TAG_COLOR_CORRECTION, TAG_FLOAT_TEXTURE, TAG_GRADIENT, TAG_IMAGE_TEXTURE,
    TAG_RGB_SPECTRUM,
};

/// Material property slots exchanged between the two editors.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Channel {
    Diffuse,
    Roughness,
    Normal,
    Bump,
    Displacement,
    Opacity,
    Metalness,
    Emission,
    Transmission,
    Specular,
}

impl Channel {
    /// Fixed iteration order used by both serialization and resolution.
    pub const ALL: [Channel; 10] = [
        Channel::Diffuse,
        Channel::Roughness,
        Channel::Normal,
        Channel::Bump,
        Channel::Displacement,
        Channel::Opacity,
        Channel::Metalness,
        Channel::Emission,
        Channel::Transmission,
        Channel::Specular,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Channel::Diffuse => "Diffuse",
            Channel::Roughness => "Roughness",
            Channel::Normal => "Normal",
            Channel::Bump => "Bump",
            Channel::Displacement => "Displacement",
            Channel::Opacity => "Opacity",
            Channel::Metalness => "Metalness",
            Channel::Emission => "Emission",
            Channel::Transmission => "Transmission",
            Channel::Specular => "Specular",
        }
    }

    /// Channel named by a key prefix such as the first token of `Diffuse Link`.
    pub fn from_prefix(prefix: &str) -> Option<Channel> {
        Channel::ALL.into_iter().find(|c| c.as_str() == prefix)
    }
}

impl std::fmt::Display for Channel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Material class carried on the `Type:` line as `<tag> (<Name>)`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum MaterialType {
    Diffuse,
    Glossy,
    Specular,
    Metallic,
    Universal,
    #[default]
    Unknown,
}

impl MaterialType {
    pub fn tag(self) -> i64 {
        match self {
            MaterialType::Diffuse => 2510,
            MaterialType::Glossy => 2511,
            MaterialType::Specular => 2512,
            MaterialType::Metallic => 2514,
            MaterialType::Universal => 2516,
            MaterialType::Unknown => 0,
        }
    }

    pub fn from_tag(tag: i64) -> MaterialType {
        match tag {
            2510 => MaterialType::Diffuse,
            2511 => MaterialType::Glossy,
            2512 => MaterialType::Specular,
            2514 => MaterialType::Metallic,
            2516 => MaterialType::Universal,
            _ => MaterialType::Unknown,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            MaterialType::Diffuse => "Diffuse",
            MaterialType::Glossy => "Glossy",
            MaterialType::Specular => "Specular",
            MaterialType::Metallic => "Metallic",
            MaterialType::Universal => "Universal",
            MaterialType::Unknown => "Unknown",
        }
    }

    /// Parse a `Type:` value. The numeric tag wins; older exports that carry
    /// only a name fall back to a case-insensitive name match.
    pub fn parse(raw: &str) -> MaterialType {
        if let Some(tag) = record::leading_int(raw) {
            return MaterialType::from_tag(tag);
        }
        let lowered = raw.to_lowercase();
        for mt in [
            MaterialType::Diffuse,
            MaterialType::Glossy,
            MaterialType::Specular,
            MaterialType::Metallic,
            MaterialType::Universal,
        ] {
            if lowered.contains(&mt.name().to_lowercase()) {
                return mt;
            }
        }
        MaterialType::Unknown
    }
}

/// One control point of a gradient ramp.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GradientKnot {
    /// Position along the ramp, clamped to [0, 1] on construction.
    pub position: f32,
    pub color: [f32; 3],
}

impl GradientKnot {
    pub fn new(position: f32, color: [f32; 3]) -> GradientKnot {
        GradientKnot {
            position: position.clamp(0.0, 1.0),
            color,
        }
    }
}

/// Shader node kinds the format can carry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind")]
pub enum ShaderNode {
    Color { r: f32, g: f32, b: f32 },
    ImageTexture { path: String },
    Gradient { knots: Vec<GradientKnot> },
    FloatTexture { value: f32 },
    RgbSpectrum { r: f32, g: f32, b: f32 },
    ColorCorrection { child: Box<ShaderNode> },
    Unknown { type_id: i64 },
}

impl ShaderNode {
    /// Name emitted on the `Shader Name:` line.
    pub fn display_name(&self) -> &'static str {
        match self {
            ShaderNode::Color { .. } => "Color",
            ShaderNode::ImageTexture { .. } => "ImageTexture",
            ShaderNode::Gradient { .. } => "Gradient",
            ShaderNode::FloatTexture { .. } => "FloatTexture",
            ShaderNode::RgbSpectrum { .. } => "RgbSpectrum",
            ShaderNode::ColorCorrection { .. } => "ColorCorrection",
            ShaderNode::Unknown { .. } => "Shader",
        }
    }

    /// Numeric tag emitted on the `Shader Type:` line.
    pub fn type_tag(&self) -> i64 {
        match self {
            ShaderNode::Color { .. } => TAG_COLOR,
            ShaderNode::ImageTexture { .. } => TAG_IMAGE_TEXTURE,
            ShaderNode::Gradient { .. } => TAG_GRADIENT,
            ShaderNode::FloatTexture { .. } => TAG_FLOAT_TEXTURE,
            ShaderNode::RgbSpectrum { .. } => TAG_RGB_SPECTRUM,
            ShaderNode::ColorCorrection { .. } => TAG_COLOR_CORRECTION,
            ShaderNode::Unknown { type_id } => *type_id,
        }
    }
}

/// Closed classification of a linked shader, derived tag-first.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShaderKind {
    Color,
    Gradient,
    ImageTexture,
    FloatTexture,
    RgbSpectrum,
    ColorCorrection,
    Unknown,
}

impl ShaderKind {
    pub fn from_tag(tag: i64) -> ShaderKind {
        match tag {
            TAG_COLOR => ShaderKind::Color,
            TAG_GRADIENT => ShaderKind::Gradient,
            TAG_IMAGE_TEXTURE => ShaderKind::ImageTexture,
            TAG_FLOAT_TEXTURE => ShaderKind::FloatTexture,
            TAG_RGB_SPECTRUM => ShaderKind::RgbSpectrum,
            TAG_COLOR_CORRECTION => ShaderKind::ColorCorrection,
            _ => ShaderKind::Unknown,
        }
    }

    /// Locale-aware fallback for records with no usable type tag. Matches the
    /// display names older producers emitted, including the Chinese aliases.
    /// "ColorCorrection" lands on `Color` here, which is what makes unwrapped
    /// color captures resolve as flat colors.
    pub fn from_name(name: &str) -> ShaderKind {
        let lowered = name.to_lowercase();
        if name.contains("渐变") || lowered.contains("gradient") {
            ShaderKind::Gradient
        } else if name.contains("颜色") || lowered.contains("color") {
            ShaderKind::Color
        } else {
            ShaderKind::Unknown
        }
    }
}

/// Raw captures for one channel's linked shader record.
///
/// Fields hold value text exactly as scanned; interpretation (vector parsing,
/// kind dispatch) happens at resolution time.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LinkedShader {
    /// A plain `<Channel> Link:` line was seen (as opposed to the prefix being
    /// switched by a `Color (Link)` style key).
    pub present: bool,
    /// Value of the `<Channel> Link:` line, normally the linked node's name.
    pub reference: Option<String>,
    pub name: Option<String>,
    pub type_tag: Option<i64>,
    pub image_file: Option<String>,
    /// Bare `Color:` payload scanned inside the record.
    pub color: Option<String>,
    /// `<Channel> Color (Link):` value, emitted explicitly or captured while
    /// unwrapping a color correction wrapper.
    pub color_link: Option<String>,
    pub gradient_image_path: Option<String>,
    pub knot_positions: Option<String>,
    pub knot_colors: Option<String>,
}

impl LinkedShader {
    pub fn kind(&self) -> ShaderKind {
        if let Some(tag) = self.type_tag {
            return ShaderKind::from_tag(tag);
        }
        match &self.name {
            Some(name) => ShaderKind::from_name(name),
            None => ShaderKind::Unknown,
        }
    }

    /// Reconstruct gradient knots from the single-line knot metadata.
    pub fn gradient_knots(&self) -> Option<Vec<GradientKnot>> {
        let positions = record::parse_vector(self.knot_positions.as_deref()?);
        let colors = record::parse_vector(self.knot_colors.as_deref()?);
        if positions.is_empty() {
            return None;
        }
        let knots: Vec<GradientKnot> = positions
            .iter()
            .zip(colors.chunks_exact(3))
            .map(|(p, c)| GradientKnot::new(*p, [c[0], c[1], c[2]]))
            .collect();
        if knots.is_empty() { None } else { Some(knots) }
    }

    /// Best-effort shader node from the captures, used for the emission clone.
    pub fn reconstruct(&self) -> Option<ShaderNode> {
        if let Some(path) = self.image_file.as_deref().filter(|p| !p.is_empty()) {
            return Some(ShaderNode::ImageTexture { path: path.to_string() });
        }
        if let Some(knots) = self.gradient_knots() {
            return Some(ShaderNode::Gradient { knots });
        }
        let raw = self.color.as_deref().or(self.color_link.as_deref())?;
        let v = record::parse_vector(raw);
        if v.len() >= 3 {
            return Some(ShaderNode::Color { r: v[0], g: v[1], b: v[2] });
        }
        None
    }
}

/// Everything captured for one channel of one material.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ChannelData {
    /// `Use <Channel>:` flag, metadata only.
    pub enabled: Option<bool>,
    /// Raw `<Channel> Color:` value.
    pub flat_color: Option<String>,
    /// Raw `<Channel> Float:` value.
    pub flat_float: Option<String>,
    pub link: Option<LinkedShader>,
}

impl ChannelData {
    pub fn link_mut(&mut self) -> &mut LinkedShader {
        self.link.get_or_insert_with(LinkedShader::default)
    }
}

/// Normalized description of one material block, one per `Material Name:`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MaterialDescription {
    pub name: String,
    pub material_type: MaterialType,
    pub is_emissive: bool,
    pub emission: Option<ShaderNode>,
    pub channels: BTreeMap<Channel, ChannelData>,
    pub object_name: Option<String>,
    pub parent_name: Option<String>,
    /// Unclassified `Key: Value` pairs. Never consulted by resolution.
    pub extra: BTreeMap<String, String>,
}

impl MaterialDescription {
    pub fn new(name: impl Into<String>) -> MaterialDescription {
        MaterialDescription {
            name: name.into(),
            ..MaterialDescription::default()
        }
    }

    pub fn channel_mut(&mut self, channel: Channel) -> &mut ChannelData {
        self.channels.entry(channel).or_default()
    }
}

/// Target blend mode directive payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BlendMode {
    Hashed,
}

/// Atomic instruction handed to the target graph builder.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ConstructionDirective {
    SetFlatValue(Channel, f32),
    SetFlatColor(Channel, [f32; 3]),
    AttachImageTexture(Channel, String),
    AttachGradientAsTexture(Channel, String),
    SetBlendMode(BlendMode),
}
