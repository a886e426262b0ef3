//! Consumer side: turns interchange text back into material descriptions.
//!
//! The scanner is an explicit-cursor loop rather than a line iterator because
//! color correction wrappers are not delimited: their payload sits at a fixed
//! distance from the wrapper's `Shader Name:` line ([`UNWRAP_PAYLOAD_OFFSET`],
//! plus [`GRADIENT_PATH_OFFSET`] for gradients) and the cursor jumps there,
//! then resumes without re-reading the skipped wrapper lines.

use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use log::{debug, warn};

use crate::error::BridgeError;
use crate::material::{Channel, LinkedShader, MaterialDescription, MaterialType};
use crate::record::{self, GRADIENT_PATH_OFFSET, UNWRAP_PAYLOAD_OFFSET};

/// One abandoned material block.
#[derive(Debug)]
pub struct RecordFailure {
    pub material: String,
    /// 1-based line the failed cursor jump started from.
    pub line: usize,
    pub error: BridgeError,
}

/// Everything recovered from one interchange file. A truncated block lands in
/// `failures` without disturbing the materials before or after it.
#[derive(Debug, Default)]
pub struct ParsedBatch {
    pub format_version: Option<i64>,
    pub materials: Vec<MaterialDescription>,
    pub failures: Vec<RecordFailure>,
}

pub fn parse_file(path: &Path) -> Result<ParsedBatch> {
    if !path.exists() {
        return Err(BridgeError::FileNotFound {
            path: path.to_path_buf(),
        }
        .into());
    }
    let text = fs::read_to_string(path)
        .with_context(|| format!("reading interchange file {}", path.display()))?;
    Ok(parse_text(&text))
}

pub fn parse_text(text: &str) -> ParsedBatch {
    Scanner::new(text).run()
}

/// Key families namespaced under the prefix of the nearest `Link:` key.
const NAMESPACE_KEYS: [&str; 5] = [
    "Shader Name",
    "Shader Type",
    "Image Texture",
    "Gradient",
    "Color",
];

struct Scanner<'a> {
    lines: Vec<&'a str>,
    i: usize,
    cur: Option<MaterialDescription>,
    /// First token of the last key containing `Link`, usually a channel name.
    prefix: String,
    /// Armed when an unwrap jump lands on a line without a colon. Holds the
    /// prefix snapshotted at the trigger; the next line that is not a
    /// `Key: Value` pair gets inspected against the legacy capture patterns,
    /// then the flag drops whether or not anything matched.
    pending: Option<String>,
    batch: ParsedBatch,
}

impl<'a> Scanner<'a> {
    fn new(text: &'a str) -> Scanner<'a> {
        Scanner {
            lines: text.lines().map(str::trim).collect(),
            i: 0,
            cur: None,
            prefix: String::new(),
            pending: None,
            batch: ParsedBatch::default(),
        }
    }

    fn run(mut self) -> ParsedBatch {
        while self.i < self.lines.len() {
            let line = self.lines[self.i];

            if let Some(rest) = line.strip_prefix("Material Name:") {
                self.flush();
                self.cur = Some(MaterialDescription::new(rest.trim()));
                self.prefix.clear();
                self.pending = None;
            } else if let Some((key, value)) = record::kv_split(line) {
                if self.cur.is_some() {
                    self.store(key, value);
                    if key == "Shader Name" && value.starts_with("ColorCorrection") {
                        self.unwrap_jump();
                    }
                } else if key == "Format Version" {
                    self.batch.format_version = record::leading_int(value);
                }
            } else if let Some(prefix) = self.pending.take() {
                // Section breaks, blank lines and legacy `Key:Value` lines all
                // land here; the first one resolves the pending inspection.
                self.inspect_legacy(&prefix, line);
            }

            self.i += 1;
        }
        self.flush();
        self.batch
    }

    /// Route one `Key: Value` pair into the current material.
    fn store(&mut self, key: &str, value: &str) {
        let Some(mat) = self.cur.as_mut() else { return };

        if key.contains("Link") {
            let first = key.split_whitespace().next().unwrap_or_default();
            self.prefix = first.to_string();
            let rest = key[first.len()..].trim_start();
            match Channel::from_prefix(first) {
                Some(ch) if rest == "Link" => {
                    let link = mat.channel_mut(ch).link_mut();
                    link.present = true;
                    link.reference = Some(value.to_string());
                }
                Some(ch) if rest == "Color (Link)" => {
                    mat.channel_mut(ch).link_mut().color_link = Some(value.to_string());
                }
                _ => {
                    mat.extra.insert(key.to_string(), value.to_string());
                }
            }
            return;
        }

        if let Some(rest) = key.strip_prefix("Use ") {
            if let Some(ch) = Channel::from_prefix(rest.trim()) {
                if let Some(flag) = record::parse_flag(value) {
                    mat.channel_mut(ch).enabled = Some(flag);
                    return;
                }
            }
            mat.extra.insert(key.to_string(), value.to_string());
            return;
        }

        // Shader record keys, namespaced while a link context is active.
        if !self.prefix.is_empty() && NAMESPACE_KEYS.iter().any(|ns| key.starts_with(ns)) {
            if let Some(ch) = Channel::from_prefix(&self.prefix) {
                if store_link_field(mat.channel_mut(ch).link_mut(), key, value) {
                    return;
                }
            }
            mat.extra
                .insert(format!("{} {key}", self.prefix), value.to_string());
            return;
        }

        match key {
            "Object Name" => mat.object_name = Some(value.to_string()),
            "Parent Name" => {
                mat.parent_name = (value != "None").then(|| value.to_string());
            }
            "Type" => mat.material_type = MaterialType::parse(value),
            _ => {
                // Channel-prefixed material fields: flat data and the spelled
                // out forms of the unwrap capture slots.
                if let Some((first, rest)) = key.split_once(' ') {
                    if let Some(ch) = Channel::from_prefix(first) {
                        let data = mat.channel_mut(ch);
                        if rest == "Color" {
                            data.flat_color = Some(value.to_string());
                            return;
                        }
                        if rest == "Float" {
                            data.flat_float = Some(value.to_string());
                            return;
                        }
                        if store_link_field(data.link_mut(), rest, value) {
                            return;
                        }
                    }
                }
                mat.extra.insert(key.to_string(), value.to_string());
            }
        }
    }

    /// Jump from a `Shader Name: ColorCorrection` line to the wrapped child's
    /// first payload line and capture it under the prefix from the trigger.
    /// The skipped wrapper lines are never re-read; scanning resumes right
    /// after the jumped-to line.
    fn unwrap_jump(&mut self) {
        let trigger = self.i;
        let target = trigger + UNWRAP_PAYLOAD_OFFSET;
        let Some(line) = self.lines.get(target).copied() else {
            self.abandon(trigger + 1);
            return;
        };

        let prefix = self.prefix.clone();
        if let Some(v) = record::value_after(line, "Image Texture File:") {
            self.capture(&prefix, "Image Texture File", v);
            self.i = target;
        } else if let Some(v) = record::value_after(line, "Color:") {
            self.capture(&prefix, "Color (Link)", v);
            self.i = target;
        } else if line.starts_with("Gradient:") {
            let path_at = target + GRADIENT_PATH_OFFSET;
            let Some(path_line) = self.lines.get(path_at).copied() else {
                self.abandon(target + 1);
                return;
            };
            if let Some(v) = record::value_after(path_line, "Gradient Image Path:") {
                self.capture(&prefix, "Gradient Image Path", v);
            }
            self.i = path_at;
        } else if !line.contains(':') {
            // Older producer layouts put the payload one line further down,
            // sometimes without a space after the colon. Arm the one-shot
            // legacy inspection and keep scanning.
            self.pending = Some(prefix);
            self.i = target;
        } else {
            // Wrapped child kind with no capture rule. Consume the wrapper
            // lines and move on.
            self.i = target;
        }
    }

    fn inspect_legacy(&mut self, prefix: &str, line: &str) {
        for (pattern, suffix) in [
            ("Image Texture File:", "Image Texture File"),
            ("Color:", "Color (Link)"),
            ("Gradient Image Path:", "Gradient Image Path"),
        ] {
            if let Some(v) = record::value_after(line, pattern) {
                debug!("legacy payload line matched {pattern:?} under prefix {prefix:?}");
                self.capture(prefix, suffix, v);
                return;
            }
        }
    }

    fn capture(&mut self, prefix: &str, suffix: &str, value: String) {
        let Some(mat) = self.cur.as_mut() else { return };
        match Channel::from_prefix(prefix) {
            Some(ch) => {
                let link = mat.channel_mut(ch).link_mut();
                match suffix {
                    "Image Texture File" => link.image_file = Some(value),
                    "Color (Link)" => link.color_link = Some(value),
                    "Gradient Image Path" => link.gradient_image_path = Some(value),
                    _ => {}
                }
            }
            None => {
                let key = if prefix.is_empty() {
                    suffix.to_string()
                } else {
                    format!("{prefix} {suffix}")
                };
                mat.extra.insert(key, value);
            }
        }
    }

    /// Fail the current material and let scanning continue toward the next
    /// `Material Name:` boundary.
    fn abandon(&mut self, line: usize) {
        let material = self.cur.take().map(|m| m.name).unwrap_or_default();
        warn!("abandoning material '{material}': record truncated near line {line}");
        self.batch.failures.push(RecordFailure {
            material: material.clone(),
            line,
            error: BridgeError::TruncatedRecord { material, line },
        });
        self.prefix.clear();
        self.pending = None;
    }

    fn flush(&mut self) {
        let Some(mut mat) = self.cur.take() else { return };
        if let Some(em) = mat.channels.get(&Channel::Emission) {
            mat.is_emissive = em.enabled == Some(true);
            mat.emission = em.link.as_ref().and_then(|l| l.reconstruct());
        }
        self.batch.materials.push(mat);
    }
}

fn store_link_field(link: &mut LinkedShader, key: &str, value: &str) -> bool {
    match key {
        "Shader Name" => link.name = Some(value.to_string()),
        "Shader Type" => link.type_tag = record::leading_int(value),
        "Image Texture File" => link.image_file = Some(value.to_string()),
        "Color" => link.color = Some(value.to_string()),
        "Gradient Image Path" => link.gradient_image_path = Some(value.to_string()),
        "Gradient Knot Positions" => link.knot_positions = Some(value.to_string()),
        "Gradient Knot Colors" => link.knot_colors = Some(value.to_string()),
        _ => return false,
    }
    true
}
