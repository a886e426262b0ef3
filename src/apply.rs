//! Applies construction directives against a target graph through a narrow
//! builder trait, so the same resolution output drives a real host editor or
//! the in-memory graph used by tests and the `--graph-out` dump.

use std::collections::BTreeMap;
use std::path::Path;

use log::warn;
use serde::Serialize;

use crate::error::BridgeError;
use crate::material::{BlendMode, Channel, ConstructionDirective};
use crate::schema::{AdapterKind, SocketArity, SocketSchema};

/// Everything the consumer needs from a host graph editor.
pub trait TargetGraphBuilder {
    /// Create or look up a material and return the base shader node's id.
    fn ensure_material(&mut self, name: &str) -> String;
    fn set_socket_scalar(&mut self, material: &str, socket: &str, value: f32);
    fn set_socket_color(&mut self, material: &str, socket: &str, value: [f32; 4]);
    /// `bound` is false when the source file was missing and the node was
    /// created without content.
    fn add_image_node(&mut self, material: &str, path: &str, bound: bool) -> String;
    fn add_adapter_node(&mut self, material: &str, kind: AdapterKind) -> String;
    fn connect(
        &mut self,
        material: &str,
        from_node: &str,
        from_socket: &str,
        to_node: &str,
        to_socket: &str,
    );
    fn set_blend_mode(&mut self, material: &str, mode: BlendMode);
}

#[derive(Debug, Default)]
pub struct AppliedMaterial {
    pub warnings: Vec<String>,
}

pub fn apply_material(
    builder: &mut dyn TargetGraphBuilder,
    schema: &SocketSchema,
    name: &str,
    directives: &[ConstructionDirective],
) -> AppliedMaterial {
    let base = builder.ensure_material(name);
    let mut out = AppliedMaterial::default();

    for directive in directives {
        match directive {
            ConstructionDirective::SetFlatValue(ch, v) => {
                set_flat(builder, schema, name, *ch, Flat::Scalar(*v), &mut out);
            }
            ConstructionDirective::SetFlatColor(ch, rgb) => {
                set_flat(builder, schema, name, *ch, Flat::Color(*rgb), &mut out);
            }
            ConstructionDirective::AttachImageTexture(ch, path)
            | ConstructionDirective::AttachGradientAsTexture(ch, path) => {
                attach_texture(builder, schema, name, &base, *ch, path, &mut out);
            }
            ConstructionDirective::SetBlendMode(mode) => {
                builder.set_blend_mode(name, *mode);
            }
        }
    }

    out
}

enum Flat {
    Scalar(f32),
    Color([f32; 3]),
}

fn set_flat(
    builder: &mut dyn TargetGraphBuilder,
    schema: &SocketSchema,
    material: &str,
    channel: Channel,
    value: Flat,
    out: &mut AppliedMaterial,
) {
    let Some(binding) = schema.binding(channel) else {
        return;
    };
    let Some(arity) = schema.arity(&binding.socket) else {
        missing_socket(material, &binding.socket, out);
        return;
    };

    // Arity coercion: scalars splat onto color sockets, colors collapse to
    // their first component on scalar sockets.
    match (arity, value) {
        (SocketArity::Color, Flat::Scalar(v)) => {
            builder.set_socket_color(material, &binding.socket, [v, v, v, 1.0]);
        }
        (SocketArity::Color, Flat::Color(rgb)) => {
            builder.set_socket_color(material, &binding.socket, [rgb[0], rgb[1], rgb[2], 1.0]);
        }
        (SocketArity::Scalar | SocketArity::Vector, Flat::Scalar(v)) => {
            builder.set_socket_scalar(material, &binding.socket, v);
        }
        (SocketArity::Scalar | SocketArity::Vector, Flat::Color(rgb)) => {
            builder.set_socket_scalar(material, &binding.socket, rgb[0]);
        }
    }
}

fn attach_texture(
    builder: &mut dyn TargetGraphBuilder,
    schema: &SocketSchema,
    material: &str,
    base: &str,
    channel: Channel,
    path: &str,
    out: &mut AppliedMaterial,
) {
    let Some(binding) = schema.binding(channel) else {
        return;
    };

    let exists = Path::new(path).exists();
    if !exists {
        let e = BridgeError::MissingSourceAsset { path: path.into() };
        warn!("{material}: {e}");
        out.warnings.push(e.to_string());
    }
    let tex = builder.add_image_node(material, path, exists);

    match binding.adapter {
        Some(kind) => {
            let adapter = builder.add_adapter_node(material, kind);
            builder.connect(material, &tex, "Color", &adapter, kind.input_socket());
            builder.connect(material, &adapter, kind.output_socket(), base, &binding.socket);
        }
        None => {
            if schema.arity(&binding.socket).is_none() {
                // The texture node stays in the graph unconnected, same as a
                // host editor leaving an orphan node behind.
                missing_socket(material, &binding.socket, out);
                return;
            }
            builder.connect(material, &tex, "Color", base, &binding.socket);
        }
    }
}

fn missing_socket(material: &str, socket: &str, out: &mut AppliedMaterial) {
    let e = BridgeError::MissingTargetSocket {
        socket: socket.to_string(),
    };
    warn!("{material}: {e}");
    out.warnings.push(e.to_string());
}

/// Id of the base shader node inside [`MemoryGraph`] materials.
pub const BASE_NODE_ID: &str = "surface";

/// Flat, serializable stand-in for a host material graph.
#[derive(Debug, Default, Serialize)]
pub struct MemoryGraph {
    pub materials: BTreeMap<String, MaterialNodes>,
    #[serde(skip)]
    next_id: usize,
}

#[derive(Debug, Default, Serialize)]
pub struct MaterialNodes {
    pub sockets: BTreeMap<String, SocketValue>,
    pub image_nodes: BTreeMap<String, ImageNode>,
    pub adapter_nodes: BTreeMap<String, String>,
    pub links: Vec<GraphLink>,
    pub blend_mode: Option<String>,
    pub shadow_mode: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(untagged)]
pub enum SocketValue {
    Scalar(f32),
    Color([f32; 4]),
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ImageNode {
    pub path: String,
    pub bound: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GraphLink {
    pub from: String,
    pub to: String,
}

impl MemoryGraph {
    pub fn new() -> MemoryGraph {
        MemoryGraph::default()
    }

    fn material(&mut self, name: &str) -> &mut MaterialNodes {
        self.materials.entry(name.to_string()).or_default()
    }
}

impl TargetGraphBuilder for MemoryGraph {
    fn ensure_material(&mut self, name: &str) -> String {
        self.material(name);
        BASE_NODE_ID.to_string()
    }

    fn set_socket_scalar(&mut self, material: &str, socket: &str, value: f32) {
        self.material(material)
            .sockets
            .insert(socket.to_string(), SocketValue::Scalar(value));
    }

    fn set_socket_color(&mut self, material: &str, socket: &str, value: [f32; 4]) {
        self.material(material)
            .sockets
            .insert(socket.to_string(), SocketValue::Color(value));
    }

    fn add_image_node(&mut self, material: &str, path: &str, bound: bool) -> String {
        let id = format!("tex{}", self.next_id);
        self.next_id += 1;
        self.material(material).image_nodes.insert(
            id.clone(),
            ImageNode {
                path: path.to_string(),
                bound,
            },
        );
        id
    }

    fn add_adapter_node(&mut self, material: &str, kind: AdapterKind) -> String {
        let id = format!("adapter{}", self.next_id);
        self.next_id += 1;
        self.material(material)
            .adapter_nodes
            .insert(id.clone(), kind.node_name().to_string());
        id
    }

    fn connect(
        &mut self,
        material: &str,
        from_node: &str,
        from_socket: &str,
        to_node: &str,
        to_socket: &str,
    ) {
        self.material(material).links.push(GraphLink {
            from: format!("{from_node}.{from_socket}"),
            to: format!("{to_node}.{to_socket}"),
        });
    }

    fn set_blend_mode(&mut self, material: &str, mode: BlendMode) {
        let name = match mode {
            BlendMode::Hashed => "Hashed",
        };
        let mat = self.material(material);
        mat.blend_mode = Some(name.to_string());
        mat.shadow_mode = Some(name.to_string());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use std::fs;
    use std::path::PathBuf;

    use crate::schema::load_default_schema;

    fn temp_png() -> PathBuf {
        let nonce = std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .unwrap()
            .as_nanos();
        let path = std::env::temp_dir().join(format!("material-bridge-apply-{nonce}.png"));
        fs::write(&path, b"px").unwrap();
        path
    }

    #[test]
    fn flat_color_gains_an_alpha_component() {
        let schema = load_default_schema().unwrap();
        let mut graph = MemoryGraph::new();
        apply_material(
            &mut graph,
            &schema,
            "M",
            &[ConstructionDirective::SetFlatColor(
                Channel::Diffuse,
                [0.2, 0.4, 0.6],
            )],
        );
        assert_eq!(
            graph.materials["M"].sockets["Base Color"],
            SocketValue::Color([0.2, 0.4, 0.6, 1.0])
        );
    }

    #[test]
    fn scalar_splats_onto_a_color_socket() {
        let schema = load_default_schema().unwrap();
        let mut graph = MemoryGraph::new();
        apply_material(
            &mut graph,
            &schema,
            "M",
            &[ConstructionDirective::SetFlatValue(Channel::Diffuse, 0.5)],
        );
        assert_eq!(
            graph.materials["M"].sockets["Base Color"],
            SocketValue::Color([0.5, 0.5, 0.5, 1.0])
        );
    }

    #[test]
    fn color_collapses_onto_a_scalar_socket() {
        let schema = load_default_schema().unwrap();
        let mut graph = MemoryGraph::new();
        apply_material(
            &mut graph,
            &schema,
            "M",
            &[ConstructionDirective::SetFlatColor(
                Channel::Roughness,
                [0.7, 0.1, 0.2],
            )],
        );
        assert_eq!(
            graph.materials["M"].sockets["Roughness"],
            SocketValue::Scalar(0.7)
        );
    }

    #[test]
    fn displacement_flat_value_warns_about_the_missing_socket() {
        let schema = load_default_schema().unwrap();
        let mut graph = MemoryGraph::new();
        let applied = apply_material(
            &mut graph,
            &schema,
            "M",
            &[ConstructionDirective::SetFlatValue(
                Channel::Displacement,
                1.0,
            )],
        );
        assert_eq!(applied.warnings.len(), 1);
        assert!(applied.warnings[0].contains("Displacement"));
        assert!(graph.materials["M"].sockets.is_empty());
    }

    #[test]
    fn displacement_texture_leaves_an_orphan_node() {
        let schema = load_default_schema().unwrap();
        let mut graph = MemoryGraph::new();
        let png = temp_png();
        let applied = apply_material(
            &mut graph,
            &schema,
            "M",
            &[ConstructionDirective::AttachImageTexture(
                Channel::Displacement,
                png.display().to_string(),
            )],
        );
        let mat = &graph.materials["M"];
        assert_eq!(mat.image_nodes.len(), 1);
        assert!(mat.links.is_empty());
        assert_eq!(applied.warnings.len(), 1);
    }

    #[test]
    fn bump_texture_routes_through_the_height_adapter() {
        let schema = load_default_schema().unwrap();
        let mut graph = MemoryGraph::new();
        let png = temp_png();
        apply_material(
            &mut graph,
            &schema,
            "M",
            &[ConstructionDirective::AttachImageTexture(
                Channel::Bump,
                png.display().to_string(),
            )],
        );
        let mat = &graph.materials["M"];
        assert_eq!(mat.adapter_nodes.len(), 1);
        assert_eq!(
            mat.links,
            vec![
                GraphLink {
                    from: "tex0.Color".to_string(),
                    to: "adapter1.Height".to_string(),
                },
                GraphLink {
                    from: "adapter1.Normal".to_string(),
                    to: "surface.Normal".to_string(),
                },
            ]
        );
    }

    #[test]
    fn missing_texture_file_creates_an_unbound_node() {
        let schema = load_default_schema().unwrap();
        let mut graph = MemoryGraph::new();
        let applied = apply_material(
            &mut graph,
            &schema,
            "M",
            &[ConstructionDirective::AttachImageTexture(
                Channel::Diffuse,
                "/definitely/not/here.png".to_string(),
            )],
        );
        let mat = &graph.materials["M"];
        let node = mat.image_nodes.values().next().unwrap();
        assert!(!node.bound);
        // The link is still made; only the content is missing.
        assert_eq!(mat.links.len(), 1);
        assert_eq!(applied.warnings.len(), 1);
        assert!(applied.warnings[0].contains("missing on disk"));
    }

    #[test]
    fn blend_mode_sets_shadow_mode_too() {
        let schema = load_default_schema().unwrap();
        let mut graph = MemoryGraph::new();
        apply_material(
            &mut graph,
            &schema,
            "M",
            &[ConstructionDirective::SetBlendMode(BlendMode::Hashed)],
        );
        let mat = &graph.materials["M"];
        assert_eq!(mat.blend_mode.as_deref(), Some("Hashed"));
        assert_eq!(mat.shadow_mode.as_deref(), Some("Hashed"));
    }
}
