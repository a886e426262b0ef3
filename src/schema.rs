//! Target-side socket schema: which input sockets the base shader node
//! exposes, their arity, and which socket each material channel lands on.
//!
//! The bundled default mirrors a principled-style surface shader. Normal and
//! Bump share the `Normal` socket but route through different adapter nodes;
//! Displacement is deliberately bound to a socket the base node does not
//! expose, so applying it surfaces the missing-socket warning instead of
//! silently dropping the channel.

use std::collections::HashMap;

use anyhow::{Result, anyhow, bail};
use serde::Deserialize;

use crate::material::Channel;

const DEFAULT_SOCKET_SCHEMA_JSON: &str = include_str!("../assets/socket-schema.json");

/// Value shape a socket accepts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SocketArity {
    Scalar,
    Color,
    Vector,
}

/// Intermediate node inserted between a texture and its target socket.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum AdapterKind {
    /// Decodes a tangent-space normal map. Texture color in, normal out.
    NormalMap,
    /// Converts a height field to a normal. Texture height in, normal out.
    BumpToNormal,
}

impl AdapterKind {
    pub fn node_name(self) -> &'static str {
        match self {
            AdapterKind::NormalMap => "NormalMap",
            AdapterKind::BumpToNormal => "BumpToNormal",
        }
    }

    /// Socket the texture output feeds on the adapter.
    pub fn input_socket(self) -> &'static str {
        match self {
            AdapterKind::NormalMap => "Color",
            AdapterKind::BumpToNormal => "Height",
        }
    }

    pub fn output_socket(self) -> &'static str {
        "Normal"
    }
}

#[derive(Debug, Clone)]
pub struct ChannelBinding {
    pub socket: String,
    pub adapter: Option<AdapterKind>,
}

#[derive(Debug, Clone)]
pub struct SocketSchema {
    /// Base shader node type the consumer instantiates per material.
    pub node_type: String,
    pub inputs: HashMap<String, SocketArity>,
    pub channels: HashMap<Channel, ChannelBinding>,
}

impl SocketSchema {
    pub fn binding(&self, channel: Channel) -> Option<&ChannelBinding> {
        self.channels.get(&channel)
    }

    pub fn arity(&self, socket: &str) -> Option<SocketArity> {
        self.inputs.get(socket).copied()
    }
}

#[derive(Debug, Deserialize)]
struct RawSocketSchema {
    #[serde(rename = "schemaVersion")]
    #[allow(dead_code)]
    schema_version: u32,
    #[serde(rename = "nodeType")]
    node_type: String,
    inputs: HashMap<String, SocketArity>,
    channels: Vec<RawChannelBinding>,
}

#[derive(Debug, Deserialize)]
struct RawChannelBinding {
    channel: String,
    socket: String,
    #[serde(default)]
    adapter: Option<AdapterKind>,
}

pub fn load_default_schema() -> Result<SocketSchema> {
    parse_schema(DEFAULT_SOCKET_SCHEMA_JSON)
}

fn parse_schema(json: &str) -> Result<SocketSchema> {
    let raw: RawSocketSchema = serde_json::from_str(json)
        .map_err(|e| anyhow!("failed to parse assets/socket-schema.json: {e}"))?;

    let mut channels: HashMap<Channel, ChannelBinding> = HashMap::new();
    let mut errors: Vec<String> = Vec::new();

    for b in raw.channels {
        let Some(channel) = Channel::from_prefix(&b.channel) else {
            errors.push(format!("unknown channel '{}'", b.channel));
            continue;
        };
        if channels.contains_key(&channel) {
            errors.push(format!("channel '{}' bound more than once", b.channel));
            continue;
        }
        channels.insert(
            channel,
            ChannelBinding {
                socket: b.socket,
                adapter: b.adapter,
            },
        );
    }

    for channel in Channel::ALL {
        if !channels.contains_key(&channel) {
            errors.push(format!("channel '{channel}' has no socket binding"));
        }
    }

    if !errors.is_empty() {
        bail!(
            "socket schema failed validation ({} error(s)):\n- {}",
            errors.len(),
            errors.join("\n- ")
        );
    }

    Ok(SocketSchema {
        node_type: raw.node_type,
        inputs: raw.inputs,
        channels,
    })
}
