//! Line vocabulary and format constants shared by the serializer and parser.

/// Separator line closing a material/channel/shader section.
pub const SECTION_BREAK: &str = "#####";

/// Lines from a `Shader Name: ColorCorrection` line down to the wrapped
/// node's first payload line. The serializer lays wrapped records out so this
/// holds; the parser jumps by it. Any change here is a format version bump.
pub const UNWRAP_PAYLOAD_OFFSET: usize = 4;

/// Lines from a wrapped `Gradient:` line down to its `Gradient Image Path:`
/// line. The gradient payload keeps its knot lists on single lines so this
/// stays fixed regardless of knot count.
pub const GRADIENT_PATH_OFFSET: usize = 9;

/// Serializer-side bound on `Color Correction` wrapper nesting.
pub const MAX_WRAP_DEPTH: usize = 8;

/// Version stamped into the export header line.
pub const FORMAT_VERSION: u32 = 1;

/// Well-known exchange location under the user's documents directory.
pub const EXCHANGE_DIR_NAME: &str = "material-bridge";
pub const EXCHANGE_FILE_NAME: &str = "material_exchange.txt";

// Numeric shader type tags carried on `Shader Type:` lines.
pub const TAG_COLOR: i64 = 5832;
pub const TAG_GRADIENT: i64 = 1011100;
pub const TAG_RGB_SPECTRUM: i64 = 1029504;
pub const TAG_FLOAT_TEXTURE: i64 = 1029506;
pub const TAG_IMAGE_TEXTURE: i64 = 1029508;
pub const TAG_COLOR_CORRECTION: i64 = 1029512;

/// Split a `Key: Value` line.
///
/// Detection requires a `": "` (colon plus space) somewhere in the line, but
/// the split itself happens at the first `:`. Values containing colons (for
/// example Windows paths) stay intact because only the first one splits.
pub fn kv_split(line: &str) -> Option<(&str, &str)> {
    if !line.contains(": ") {
        return None;
    }
    let (key, value) = line.split_once(':')?;
    Some((key.trim(), value.trim()))
}

/// Value of a line known to start with `prefix` (which ends in `:`).
///
/// Used by the unwrap captures, where legacy lines may lack the space after
/// the colon and therefore fail [`kv_split`].
pub fn value_after(line: &str, prefix: &str) -> Option<String> {
    let rest = line.strip_prefix(prefix)?;
    Some(rest.trim().to_string())
}

/// Free-form vector literal to components.
///
/// Every character that is not a digit, decimal point, or minus sign becomes
/// whitespace, then the remaining tokens parse as floats. Tolerates
/// `Vector(0.1, 0.2, 0.3)` and `[0.1 0.2 0.3]` uniformly; unparseable tokens
/// are dropped rather than failing the whole literal.
pub fn parse_vector(raw: &str) -> Vec<f32> {
    let cleaned: String = raw
        .chars()
        .map(|c| {
            if c.is_ascii_digit() || c == '.' || c == '-' {
                c
            } else {
                ' '
            }
        })
        .collect();
    cleaned
        .split_whitespace()
        .filter_map(|t| t.parse::<f32>().ok())
        .collect()
}

/// Format a scalar for a record line: shortest display form, integral values
/// without a decimal point, non-finite values written as `0`.
pub fn fmt_scalar(v: f32) -> String {
    if v.is_finite() {
        format!("{v}")
    } else {
        "0".to_string()
    }
}

/// Format an rgb triple as the record's `Vector(r, g, b)` literal.
pub fn fmt_vector(rgb: [f32; 3]) -> String {
    format!(
        "Vector({}, {}, {})",
        fmt_scalar(rgb[0]),
        fmt_scalar(rgb[1]),
        fmt_scalar(rgb[2])
    )
}

/// Parse a `Use <Channel>:` style flag value.
pub fn parse_flag(raw: &str) -> Option<bool> {
    match raw.trim() {
        "1" | "True" | "true" => Some(true),
        "0" | "False" | "false" => Some(false),
        _ => None,
    }
}

/// Leading integer of a value such as `2511 (Glossy)` or a bare `5832`.
pub fn leading_int(raw: &str) -> Option<i64> {
    let t = raw.trim();
    let end = t
        .find(|c: char| !c.is_ascii_digit())
        .unwrap_or(t.len());
    if end == 0 {
        return None;
    }
    t[..end].parse().ok()
}
