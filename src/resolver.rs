//! Decides, per channel, which of the captured data sources wins and what
//! construction directive the target graph gets.

use crate::material::{
    BlendMode, Channel, ChannelData, ConstructionDirective, MaterialDescription, MaterialType,
    ShaderKind,
};
use crate::record;

/// Outcome of resolving one material: directives in channel order, plus one
/// informational note per channel that produced no directive.
#[derive(Debug, Default)]
pub struct Resolution {
    pub directives: Vec<ConstructionDirective>,
    pub notes: Vec<String>,
}

pub fn resolve_material(mat: &MaterialDescription) -> Resolution {
    let mut out = Resolution::default();

    // Channels the record never mentioned run the same decision order as
    // present-but-empty ones and land on the no-data note.
    let empty = ChannelData::default();
    for channel in Channel::ALL {
        let data = mat.channels.get(&channel).unwrap_or(&empty);
        resolve_channel(channel, data, &mut out);
    }

    // Specular-class materials are fully specular: whatever transmission data
    // came through the record, the target gets 1.0.
    if mat.material_type == MaterialType::Specular {
        out.directives.retain(|d| {
            !matches!(
                d,
                ConstructionDirective::SetFlatValue(Channel::Transmission, _)
            )
        });
        out.directives
            .push(ConstructionDirective::SetFlatValue(Channel::Transmission, 1.0));
    }

    // Any flat opacity means the target renders alpha-tested.
    let flat_opacity = out.directives.iter().any(|d| {
        matches!(
            d,
            ConstructionDirective::SetFlatValue(Channel::Opacity, _)
                | ConstructionDirective::SetFlatColor(Channel::Opacity, _)
        )
    });
    if flat_opacity {
        out.directives
            .push(ConstructionDirective::SetBlendMode(BlendMode::Hashed));
    }

    out
}

fn resolve_channel(channel: Channel, data: &ChannelData, out: &mut Resolution) {
    let link = data.link.as_ref();

    // An image texture, explicit or captured while unwrapping, beats
    // everything else on the channel.
    if let Some(path) = link
        .and_then(|l| l.image_file.as_deref())
        .filter(|p| !p.is_empty())
    {
        out.directives
            .push(ConstructionDirective::AttachImageTexture(
                channel,
                path.to_string(),
            ));
        return;
    }

    if let Some(link) = link.filter(|l| l.present) {
        match link.kind() {
            ShaderKind::Gradient => {
                if let Some(path) = link
                    .gradient_image_path
                    .as_deref()
                    .filter(|p| !p.is_empty())
                {
                    out.directives
                        .push(ConstructionDirective::AttachGradientAsTexture(
                            channel,
                            path.to_string(),
                        ));
                } else {
                    out.notes.push(format!(
                        "{channel}: gradient link without a rasterized image, skipped"
                    ));
                }
                return;
            }
            ShaderKind::Color | ShaderKind::ColorCorrection => {
                let raw = link.color.as_deref().or(link.color_link.as_deref());
                let comps = raw.map(record::parse_vector).unwrap_or_default();
                if comps.len() >= 3 {
                    out.directives.push(ConstructionDirective::SetFlatColor(
                        channel,
                        [comps[0], comps[1], comps[2]],
                    ));
                } else {
                    out.notes.push(format!(
                        "{channel}: color link without a parsable color, skipped"
                    ));
                }
                return;
            }
            // Other link kinds carry nothing the target can use directly;
            // the flat fallback lines stay in play.
            _ => {}
        }
    }

    if let Some(raw) = data.flat_color.as_deref() {
        let comps = record::parse_vector(raw);
        if comps.len() >= 3 {
            // A zeroed color with a scalar alongside is an unset placeholder
            // masking the meaningful value.
            if comps == [0.0, 0.0, 0.0] {
                if let Some(v) = parse_float(data.flat_float.as_deref()) {
                    out.directives
                        .push(ConstructionDirective::SetFlatValue(channel, v));
                    return;
                }
            }
            out.directives.push(ConstructionDirective::SetFlatColor(
                channel,
                [comps[0], comps[1], comps[2]],
            ));
            return;
        }
        // Fewer than three components cannot make a color; try the scalar.
    }

    if let Some(v) = parse_float(data.flat_float.as_deref()) {
        out.directives
            .push(ConstructionDirective::SetFlatValue(channel, v));
        return;
    }

    out.notes.push(format!("{channel}: no resolvable data"));
}

fn parse_float(raw: Option<&str>) -> Option<f32> {
    raw?.trim().parse::<f32>().ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    use crate::material::LinkedShader;

    fn mat_with(channel: Channel, data: ChannelData) -> MaterialDescription {
        let mut mat = MaterialDescription::new("T");
        mat.channels.insert(channel, data);
        mat
    }

    fn flat(color: Option<&str>, float: Option<&str>) -> ChannelData {
        ChannelData {
            enabled: Some(true),
            flat_color: color.map(str::to_string),
            flat_float: float.map(str::to_string),
            link: None,
        }
    }

    #[test]
    fn image_texture_beats_flat_data() {
        let mut data = flat(Some("Vector(1, 0, 0)"), Some("0.5"));
        data.link = Some(LinkedShader {
            image_file: Some("/tex/a.png".to_string()),
            ..LinkedShader::default()
        });
        let res = resolve_material(&mat_with(Channel::Diffuse, data));
        assert_eq!(
            res.directives,
            vec![ConstructionDirective::AttachImageTexture(
                Channel::Diffuse,
                "/tex/a.png".to_string()
            )]
        );
    }

    #[test]
    fn gradient_link_attaches_its_baked_image() {
        let data = ChannelData {
            link: Some(LinkedShader {
                present: true,
                type_tag: Some(crate::record::TAG_GRADIENT),
                gradient_image_path: Some("/bake/g.png".to_string()),
                ..LinkedShader::default()
            }),
            ..ChannelData::default()
        };
        let res = resolve_material(&mat_with(Channel::Roughness, data));
        assert_eq!(
            res.directives,
            vec![ConstructionDirective::AttachGradientAsTexture(
                Channel::Roughness,
                "/bake/g.png".to_string()
            )]
        );
    }

    #[test]
    fn gradient_link_without_bake_is_noted_not_resolved() {
        let data = ChannelData {
            flat_float: Some("0.5".to_string()),
            link: Some(LinkedShader {
                present: true,
                type_tag: Some(crate::record::TAG_GRADIENT),
                ..LinkedShader::default()
            }),
            ..ChannelData::default()
        };
        let res = resolve_material(&mat_with(Channel::Roughness, data));
        // The gradient consumed the channel; no fallback to the scalar.
        assert!(res.directives.is_empty());
        assert!(
            res.notes
                .iter()
                .any(|n| n.contains("Roughness") && n.contains("gradient"))
        );
    }

    #[test]
    fn color_link_resolves_by_name_alias() {
        let data = ChannelData {
            link: Some(LinkedShader {
                present: true,
                name: Some("颜色".to_string()),
                color: Some("Vector(0.2, 0.4, 0.6)".to_string()),
                ..LinkedShader::default()
            }),
            ..ChannelData::default()
        };
        let res = resolve_material(&mat_with(Channel::Diffuse, data));
        assert_eq!(
            res.directives,
            vec![ConstructionDirective::SetFlatColor(
                Channel::Diffuse,
                [0.2, 0.4, 0.6]
            )]
        );
    }

    #[test]
    fn wrapped_color_capture_resolves_through_color_link() {
        let data = ChannelData {
            link: Some(LinkedShader {
                present: true,
                name: Some("ColorCorrection".to_string()),
                color_link: Some("Vector(0.9, 0.8, 0.7)".to_string()),
                ..LinkedShader::default()
            }),
            ..ChannelData::default()
        };
        let res = resolve_material(&mat_with(Channel::Diffuse, data));
        assert_eq!(
            res.directives,
            vec![ConstructionDirective::SetFlatColor(
                Channel::Diffuse,
                [0.9, 0.8, 0.7]
            )]
        );
    }

    #[test]
    fn unknown_link_kind_falls_back_to_flat_data() {
        let data = ChannelData {
            flat_float: Some("0.33".to_string()),
            link: Some(LinkedShader {
                present: true,
                type_tag: Some(crate::record::TAG_FLOAT_TEXTURE),
                ..LinkedShader::default()
            }),
            ..ChannelData::default()
        };
        let res = resolve_material(&mat_with(Channel::Roughness, data));
        assert_eq!(
            res.directives,
            vec![ConstructionDirective::SetFlatValue(Channel::Roughness, 0.33)]
        );
    }

    #[test]
    fn zero_color_with_scalar_prefers_the_scalar() {
        let res = resolve_material(&mat_with(
            Channel::Roughness,
            flat(Some("Vector(0, 0, 0)"), Some("0.42")),
        ));
        assert_eq!(
            res.directives,
            vec![ConstructionDirective::SetFlatValue(Channel::Roughness, 0.42)]
        );
    }

    #[test]
    fn zero_color_without_scalar_stays_a_color() {
        let res = resolve_material(&mat_with(
            Channel::Diffuse,
            flat(Some("Vector(0, 0, 0)"), None),
        ));
        assert_eq!(
            res.directives,
            vec![ConstructionDirective::SetFlatColor(
                Channel::Diffuse,
                [0.0, 0.0, 0.0]
            )]
        );
    }

    #[test]
    fn short_color_literal_falls_through_to_scalar() {
        let res = resolve_material(&mat_with(
            Channel::Metalness,
            flat(Some("0.7"), Some("0.9")),
        ));
        assert_eq!(
            res.directives,
            vec![ConstructionDirective::SetFlatValue(Channel::Metalness, 0.9)]
        );
    }

    #[test]
    fn dataless_channel_is_noted() {
        let res = resolve_material(&mat_with(
            Channel::Bump,
            ChannelData {
                enabled: Some(true),
                ..ChannelData::default()
            },
        ));
        assert!(res.directives.is_empty());
        assert!(res.notes.contains(&"Bump: no resolvable data".to_string()));
    }

    #[test]
    fn channels_missing_from_the_record_are_noted() {
        let res = resolve_material(&MaterialDescription::new("Bare"));
        assert!(res.directives.is_empty());
        let expected: Vec<String> = Channel::ALL
            .iter()
            .map(|c| format!("{c}: no resolvable data"))
            .collect();
        assert_eq!(res.notes, expected);
    }

    #[test]
    fn specular_material_forces_transmission_to_one() {
        let mut mat = mat_with(
            Channel::Transmission,
            flat(None, Some("0.15")),
        );
        mat.material_type = MaterialType::Specular;
        let res = resolve_material(&mat);
        assert_eq!(
            res.directives,
            vec![ConstructionDirective::SetFlatValue(
                Channel::Transmission,
                1.0
            )]
        );
    }

    #[test]
    fn specular_override_applies_even_without_transmission_data() {
        let mut mat = MaterialDescription::new("S");
        mat.material_type = MaterialType::Specular;
        let res = resolve_material(&mat);
        assert_eq!(
            res.directives,
            vec![ConstructionDirective::SetFlatValue(
                Channel::Transmission,
                1.0
            )]
        );
    }

    #[test]
    fn flat_opacity_switches_blend_mode() {
        let res = resolve_material(&mat_with(
            Channel::Opacity,
            flat(None, Some("0.5")),
        ));
        assert_eq!(
            res.directives,
            vec![
                ConstructionDirective::SetFlatValue(Channel::Opacity, 0.5),
                ConstructionDirective::SetBlendMode(BlendMode::Hashed),
            ]
        );
    }

    #[test]
    fn textured_opacity_does_not_switch_blend_mode() {
        let data = ChannelData {
            link: Some(LinkedShader {
                image_file: Some("/tex/mask.png".to_string()),
                ..LinkedShader::default()
            }),
            ..ChannelData::default()
        };
        let res = resolve_material(&mat_with(Channel::Opacity, data));
        assert_eq!(
            res.directives,
            vec![ConstructionDirective::AttachImageTexture(
                Channel::Opacity,
                "/tex/mask.png".to_string()
            )]
        );
    }
}
