//! Producer side: walks a source scene and emits the line-oriented record.
//!
//! Layout contract: a wrapped (color correction) record places the child's
//! first payload line exactly [`UNWRAP_PAYLOAD_OFFSET`] lines after the
//! wrapper's `Shader Name:` line, and a gradient payload places its
//! `Gradient Image Path:` line exactly [`GRADIENT_PATH_OFFSET`] lines after
//! the `Gradient:` line. The parser's cursor jumps depend on both.

use std::path::PathBuf;

use anyhow::Result;
use log::warn;

use crate::error::BridgeError;
use crate::gradient::{self, DEFAULT_RESOLUTION, GradientAxis};
use crate::material::{Channel, GradientKnot, ShaderNode};
use crate::naming::NameRegistry;
use crate::record::{FORMAT_VERSION, MAX_WRAP_DEPTH, SECTION_BREAK, fmt_scalar, fmt_vector};
use crate::scene::{SourceMaterial, SourceScene};

/// Where and how gradient links get baked to bitmaps.
#[derive(Debug, Clone)]
pub struct BakeOptions {
    pub dir: PathBuf,
    pub width: u32,
    pub height: u32,
    pub axis: GradientAxis,
}

impl Default for BakeOptions {
    fn default() -> BakeOptions {
        BakeOptions {
            dir: PathBuf::from("."),
            width: DEFAULT_RESOLUTION,
            height: DEFAULT_RESOLUTION,
            axis: GradientAxis::Horizontal,
        }
    }
}

#[derive(Debug)]
pub struct SerializedBatch {
    pub text: String,
    /// Gradient bitmaps written while serializing.
    pub baked: Vec<PathBuf>,
}

struct NodeCtx<'a> {
    object: &'a str,
    material: &'a str,
    channel: Channel,
    opts: &'a BakeOptions,
    baked: &'a mut Vec<PathBuf>,
}

/// Serialize every material of every object, in scene order, channels in
/// [`Channel::ALL`] order. Material names are claimed through `names` so a
/// whole batch shares one de-duplication scope.
pub fn serialize_scene(
    scene: &SourceScene,
    names: &mut NameRegistry,
    opts: &BakeOptions,
) -> Result<SerializedBatch> {
    let mut lines: Vec<String> = Vec::new();
    let mut baked: Vec<PathBuf> = Vec::new();

    lines.push(format!("Format Version: {FORMAT_VERSION}"));

    for obj in &scene.objects {
        for mat in &obj.materials {
            let unique = names.claim(&mat.name);
            serialize_material(&mut lines, &mut baked, &obj.name, mat, &unique, opts)?;
        }
    }

    let mut text = lines.join("\n");
    text.push('\n');
    Ok(SerializedBatch { text, baked })
}

fn serialize_material(
    lines: &mut Vec<String>,
    baked: &mut Vec<PathBuf>,
    object: &str,
    mat: &SourceMaterial,
    unique_name: &str,
    opts: &BakeOptions,
) -> Result<()> {
    lines.push(format!("Material Name: {unique_name}"));
    lines.push(format!("Object Name: {object}"));
    lines.push(format!(
        "Parent Name: {}",
        mat.parent.as_deref().unwrap_or("None")
    ));
    lines.push(format!(
        "Type: {} ({})",
        mat.material_type.tag(),
        mat.material_type.name()
    ));

    for channel in Channel::ALL {
        let Some(source) = mat.channels.get(&channel) else {
            continue;
        };
        lines.push(format!(
            "Use {channel}: {}",
            if source.enabled { 1 } else { 0 }
        ));
        // Flat lines are emitted even when a link exists; consumers use them
        // as fallbacks and humans use them when eyeballing exports.
        if let Some(rgb) = source.color {
            lines.push(format!("{channel} Color: {}", fmt_vector(rgb)));
        }
        if let Some(v) = source.value {
            lines.push(format!("{channel} Float: {}", fmt_scalar(v)));
        }
        if let Some(node) = &source.link {
            lines.push(format!("{channel} Link: {}", node.display_name()));
            let mut ctx = NodeCtx {
                object,
                material: unique_name,
                channel,
                opts,
                baked,
            };
            serialize_node(lines, node, false, &mut ctx, 0)?;
        }
        lines.push(SECTION_BREAK.to_string());
    }

    lines.push(SECTION_BREAK.to_string());
    Ok(())
}

/// Emit one shader record. `compact` records (children inside a wrapper) skip
/// the `Shader Type:` line, which is what keeps the wrapped payload at the
/// fixed unwrap offset.
fn serialize_node(
    lines: &mut Vec<String>,
    node: &ShaderNode,
    compact: bool,
    ctx: &mut NodeCtx<'_>,
    depth: usize,
) -> Result<()> {
    if depth > MAX_WRAP_DEPTH {
        return Err(BridgeError::LinkDepthExceeded { depth }.into());
    }

    lines.push(format!("Shader Name: {}", node.display_name()));
    if !compact {
        lines.push(format!("Shader Type: {}", node.type_tag()));
    }

    match node {
        ShaderNode::Color { r, g, b } => {
            lines.push(format!("Color: {}", fmt_vector([*r, *g, *b])));
        }
        ShaderNode::ImageTexture { path } => {
            lines.push(format!("Image Texture File: {path}"));
        }
        ShaderNode::FloatTexture { value } => {
            lines.push(format!("Float Texture Value: {}", fmt_scalar(*value)));
        }
        ShaderNode::RgbSpectrum { r, g, b } => {
            lines.push(format!("RGB Spectrum Color: {}", fmt_vector([*r, *g, *b])));
        }
        ShaderNode::Gradient { knots } => {
            gradient_payload(lines, knots, ctx);
        }
        ShaderNode::ColorCorrection { child } => {
            lines.push(format!("Color Correction Link: {}", child.display_name()));
            serialize_node(lines, child, true, ctx, depth + 1)?;
        }
        ShaderNode::Unknown { .. } => {}
    }
    Ok(())
}

/// The ten-line gradient payload. Knot lists stay on single lines so the
/// distance from `Gradient:` to `Gradient Image Path:` never varies with
/// knot count.
fn gradient_payload(lines: &mut Vec<String>, knots: &[GradientKnot], ctx: &mut NodeCtx<'_>) {
    let mut sorted = knots.to_vec();
    sorted.sort_by(|a, b| {
        a.position
            .partial_cmp(&b.position)
            .unwrap_or(std::cmp::Ordering::Equal)
    });

    let positions: Vec<String> = sorted.iter().map(|k| fmt_scalar(k.position)).collect();
    let colors: Vec<String> = sorted
        .iter()
        .map(|k| {
            format!(
                "({}, {}, {})",
                fmt_scalar(k.color[0]),
                fmt_scalar(k.color[1]),
                fmt_scalar(k.color[2])
            )
        })
        .collect();
    let first = sorted
        .first()
        .map(|k| fmt_vector(k.color))
        .unwrap_or_else(|| fmt_vector([0.0, 0.0, 0.0]));
    let last = sorted
        .last()
        .map(|k| fmt_vector(k.color))
        .unwrap_or_else(|| fmt_vector([0.0, 0.0, 0.0]));

    lines.push(format!("Gradient: {} knots", sorted.len()));
    lines.push("Gradient Interpolation: Linear".to_string());
    lines.push(format!("Gradient Axis: {}", ctx.opts.axis.as_str()));
    lines.push(format!(
        "Gradient Resolution: {}x{}",
        ctx.opts.width, ctx.opts.height
    ));
    lines.push(format!("Gradient Knot Count: {}", sorted.len()));
    lines.push(format!("Gradient Knot Positions: {}", positions.join(" ")));
    lines.push(format!("Gradient Knot Colors: {}", colors.join(" ")));
    lines.push(format!("Gradient First Color: {first}"));
    lines.push(format!("Gradient Last Color: {last}"));

    let file_name = format!(
        "{}_{}_{}_gradient.png",
        ctx.object, ctx.material, ctx.channel
    );
    let path = ctx.opts.dir.join(file_name);
    let baked_path = match gradient::bake_to_file(
        &sorted,
        ctx.opts.width,
        ctx.opts.height,
        ctx.opts.axis,
        &path,
    ) {
        Ok(()) => {
            ctx.baked.push(path.clone());
            path.display().to_string()
        }
        Err(e) => {
            warn!(
                "gradient bake failed for {}/{} {}: {e:#}",
                ctx.object, ctx.material, ctx.channel
            );
            String::new()
        }
    };
    lines.push(format!("Gradient Image Path: {baked_path}"));
}
