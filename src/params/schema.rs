use std::fmt;
use std::sync::Arc;

use bytemuck::{Pod, Zeroable};
use serde::Serialize;
use thiserror::Error;

use super::scan::KeyValues;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ParamType {
    Int,
    Int2,
    Int4,
    Float,
    Float2,
    Float3,
    Float4,
}

impl ParamType {
    /// Maps a `type=` value to a type and whether it should be edited as a color.
    pub fn parse(value: &str) -> Option<(ParamType, bool)> {
        let parsed = match value {
            "int" => (ParamType::Int, false),
            "int2" => (ParamType::Int2, false),
            "int4" => (ParamType::Int4, false),
            "float" => (ParamType::Float, false),
            "float2" => (ParamType::Float2, false),
            "float3" => (ParamType::Float3, false),
            "float4" => (ParamType::Float4, false),
            "color3" => (ParamType::Float3, true),
            "color" | "color4" => (ParamType::Float4, true),
            _ => return None,
        };
        Some(parsed)
    }

    pub fn component_count(self) -> usize {
        match self {
            ParamType::Int | ParamType::Float => 1,
            ParamType::Int2 | ParamType::Float2 => 2,
            ParamType::Float3 => 3,
            ParamType::Int4 | ParamType::Float4 => 4,
        }
    }

    /// Bytes occupied by the meaningful components of a value of this type.
    pub fn byte_width(self) -> usize {
        self.component_count() * 4
    }

    pub fn is_int(self) -> bool {
        matches!(self, ParamType::Int | ParamType::Int2 | ParamType::Int4)
    }

    pub fn wgsl_type(self) -> &'static str {
        match self {
            ParamType::Int => "i32",
            ParamType::Int2 => "vec2<i32>",
            ParamType::Int4 => "vec4<i32>",
            ParamType::Float => "f32",
            ParamType::Float2 => "vec2<f32>",
            ParamType::Float3 => "vec3<f32>",
            ParamType::Float4 => "vec4<f32>",
        }
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ParamSource {
    #[default]
    UserEdited,
    ElapsedTime,
    FrameDeltaTime,
    ScreenWidth,
    ScreenHeight,
}

impl ParamSource {
    pub fn parse(value: &str) -> Option<ParamSource> {
        match value {
            "ui" => Some(ParamSource::UserEdited),
            "time" => Some(ParamSource::ElapsedTime),
            "delta_time" => Some(ParamSource::FrameDeltaTime),
            "screen.w" => Some(ParamSource::ScreenWidth),
            "screen.h" => Some(ParamSource::ScreenHeight),
            _ => None,
        }
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ParamTarget {
    #[default]
    Uniform,
    AttributeSlot0,
    AttributeSlot1,
    AttributeSlot2,
    AttributeSlot3,
}

impl ParamTarget {
    pub fn parse(value: &str) -> Option<ParamTarget> {
        match value {
            "uniform" => Some(ParamTarget::Uniform),
            "attribute" | "attribute.x" | "attribute.r" | "attribute.s" | "attribute.u" => {
                Some(ParamTarget::AttributeSlot0)
            }
            "attribute.y" | "attribute.g" | "attribute.t" | "attribute.v" => {
                Some(ParamTarget::AttributeSlot1)
            }
            "attribute.z" | "attribute.b" | "attribute.p" => Some(ParamTarget::AttributeSlot2),
            "attribute.w" | "attribute.a" | "attribute.q" => Some(ParamTarget::AttributeSlot3),
            _ => None,
        }
    }

    /// First attribute slot written by this target, `None` for uniforms.
    pub fn attribute_slot(self) -> Option<usize> {
        match self {
            ParamTarget::Uniform => None,
            ParamTarget::AttributeSlot0 => Some(0),
            ParamTarget::AttributeSlot1 => Some(1),
            ParamTarget::AttributeSlot2 => Some(2),
            ParamTarget::AttributeSlot3 => Some(3),
        }
    }
}

/// Four 32-bit components holding either ints or floats; the descriptor's
/// type decides the reading.
#[repr(C)]
#[derive(Clone, Copy, Default, PartialEq, Eq, Pod, Zeroable)]
pub struct ParamValue {
    words: [u32; 4],
}

impl ParamValue {
    pub fn from_floats(values: [f32; 4]) -> Self {
        Self {
            words: values.map(f32::to_bits),
        }
    }

    pub fn from_ints(values: [i32; 4]) -> Self {
        Self {
            words: values.map(|v| v as u32),
        }
    }

    pub fn float(&self, idx: usize) -> f32 {
        f32::from_bits(self.words[idx])
    }

    pub fn int(&self, idx: usize) -> i32 {
        self.words[idx] as i32
    }

    pub fn set_float(&mut self, idx: usize, value: f32) {
        self.words[idx] = value.to_bits();
    }

    pub fn set_int(&mut self, idx: usize, value: i32) {
        self.words[idx] = value as u32;
    }

    pub fn floats(&self) -> [f32; 4] {
        self.words.map(f32::from_bits)
    }

    pub fn ints(&self) -> [i32; 4] {
        self.words.map(|w| w as i32)
    }

    pub fn as_bytes(&self) -> &[u8] {
        bytemuck::bytes_of(self)
    }
}

impl fmt::Debug for ParamValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ParamValue")
            .field("floats", &self.floats())
            .field("ints", &self.ints())
            .finish()
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct ParameterDescriptor {
    pub name: Arc<str>,
    pub ty: ParamType,
    pub edit_as_color: bool,
    pub target: ParamTarget,
    pub source: ParamSource,
    pub min: f32,
    pub max: f32,
    pub step: f32,
    pub value: ParamValue,
}

impl ParameterDescriptor {
    pub fn new(name: &str, ty: ParamType) -> Self {
        Self {
            name: Arc::from(name),
            ty,
            edit_as_color: false,
            target: ParamTarget::default(),
            source: ParamSource::default(),
            min: 0.0,
            max: 0.0,
            step: 1.0,
            value: ParamValue::default(),
        }
    }

    /// Component values rendered according to the descriptor's type.
    pub fn components(&self) -> Vec<f64> {
        let n = self.ty.component_count();
        if self.ty.is_int() {
            self.value.ints()[..n].iter().map(|&v| v as f64).collect()
        } else {
            self.value.floats()[..n].iter().map(|&v| v as f64).collect()
        }
    }
}

#[derive(Clone, Debug, PartialEq, Error)]
pub enum WarningKind {
    #[error("unknown attribute '{0}'")]
    UnknownKey(String),
    #[error("unrecognized value '{value}' for '{key}'")]
    UnknownValue { key: String, value: String },
    #[error("'{value}' is not a number (key '{key}'), using 0")]
    BadNumber { key: String, value: String },
    #[error("ignored trailing text '{0}'")]
    TrailingFragment(String),
    #[error("declaration has no name")]
    MissingName,
    #[error("parameter '{0}' has no recognized type")]
    MissingType(String),
    #[error("parameter '{0}' declared again, later declaration wins")]
    DuplicateName(String),
    #[error("parameter '{0}' is not a usable shader identifier, left out of the uniform block")]
    InvalidUniformName(String),
}

/// A non-fatal problem found while parsing one declaration line.
#[derive(Clone, Debug, PartialEq)]
pub struct ParseWarning {
    pub line: usize,
    pub kind: WarningKind,
}

impl fmt::Display for ParseWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "line {}: {}", self.line, self.kind)
    }
}

/// Parses the longest numeric prefix of `text`, like C's `strtof` limited to
/// decimal forms plus `inf`, `infinity` and `nan` (any case). Hexadecimal
/// floats are not recognized: `0x1p3` reads as `0`.
/// Returns `None` when there is no numeric prefix at all.
pub fn parse_number_prefix(text: &str) -> Option<f32> {
    let bytes = text.as_bytes();
    let mut end = 0;
    if matches!(bytes.first(), Some(b'+' | b'-')) {
        end += 1;
    }
    let negative = bytes.first() == Some(&b'-');

    let rest = &bytes[end..];
    if starts_with_ignore_case(rest, b"inf") {
        return Some(if negative { f32::NEG_INFINITY } else { f32::INFINITY });
    }
    if starts_with_ignore_case(rest, b"nan") {
        return Some(f32::NAN);
    }

    let int_start = end;
    while end < bytes.len() && bytes[end].is_ascii_digit() {
        end += 1;
    }
    let mut digits = end - int_start;

    if end < bytes.len() && bytes[end] == b'.' {
        let frac_start = end + 1;
        let mut frac_end = frac_start;
        while frac_end < bytes.len() && bytes[frac_end].is_ascii_digit() {
            frac_end += 1;
        }
        digits += frac_end - frac_start;
        if digits > 0 {
            end = frac_end;
        }
    }
    if digits == 0 {
        return None;
    }

    if end < bytes.len() && matches!(bytes[end], b'e' | b'E') {
        let mut exp_end = end + 1;
        if matches!(bytes.get(exp_end), Some(b'+' | b'-')) {
            exp_end += 1;
        }
        let exp_digits_start = exp_end;
        while exp_end < bytes.len() && bytes[exp_end].is_ascii_digit() {
            exp_end += 1;
        }
        if exp_end > exp_digits_start {
            end = exp_end;
        }
    }

    text[..end].parse::<f32>().ok()
}

fn starts_with_ignore_case(bytes: &[u8], prefix: &[u8]) -> bool {
    bytes.len() >= prefix.len() && bytes[..prefix.len()].eq_ignore_ascii_case(prefix)
}

/// Words WGSL keeps as keywords or reserves for future use.
const WGSL_RESERVED: &[&str] = &[
    "NULL", "Self", "abstract", "active", "alias", "alignas", "alignof", "as", "asm",
    "asm_fragment", "async", "attribute", "auto", "await", "become", "binding_array", "break",
    "case", "cast", "catch", "class", "co_await", "co_return", "co_yield", "coherent",
    "column_major", "common", "compile", "compile_fragment", "concept", "const", "const_assert",
    "const_cast", "consteval", "constexpr", "constinit", "continue", "continuing", "crate",
    "debugger", "decltype", "default", "delete", "demote", "demote_to_helper", "diagnostic",
    "discard", "do", "dynamic_cast", "else", "enable", "enum", "explicit", "export", "extends",
    "extern", "external", "fallthrough", "false", "filter", "final", "finally", "fn", "for",
    "friend", "from", "fxgroup", "get", "goto", "groupshared", "highp", "if", "impl",
    "implements", "import", "inline", "instanceof", "interface", "layout", "let", "loop", "lowp",
    "macro", "macro_rules", "match", "mediump", "meta", "mod", "module", "move", "mut",
    "mutable", "namespace", "new", "nil", "noexcept", "noinline", "nointerpolation",
    "non_coherent", "noncoherent", "noperspective", "null", "nullptr", "of", "operator",
    "override", "package", "packoffset", "partition", "pass", "patch", "pixelfragment",
    "precise", "precision", "premerge", "priv", "protected", "pub", "public", "readonly", "ref",
    "regardless", "register", "reinterpret_cast", "require", "requires", "resource", "restrict",
    "return", "self", "set", "shared", "sizeof", "smooth", "snorm", "static", "static_assert",
    "static_cast", "std", "struct", "subroutine", "super", "switch", "target", "template",
    "this", "thread_local", "throw", "trait", "true", "try", "type", "typedef", "typeid",
    "typename", "typeof", "union", "unless", "unorm", "unsafe", "unsized", "use", "using",
    "var", "varying", "virtual", "volatile", "wgsl", "where", "while", "with", "writeonly",
    "yield",
];

/// Member name of the generated uniform struct that holds the vertex attributes.
pub const ATTRIBUTES_MEMBER: &str = "vertex_attributes";

/// True when `name` can be declared as a member of the generated uniform
/// struct: an ASCII WGSL identifier that is not reserved and does not clash
/// with the attributes member.
pub fn is_uniform_member_name(name: &str) -> bool {
    let bytes = name.as_bytes();
    let Some(&first) = bytes.first() else {
        return false;
    };
    if !(first.is_ascii_alphabetic() || first == b'_') {
        return false;
    }
    if !bytes.iter().all(|&b| b.is_ascii_alphanumeric() || b == b'_') {
        return false;
    }
    name != "_"
        && !name.starts_with("__")
        && name != ATTRIBUTES_MEMBER
        && !WGSL_RESERVED.contains(&name)
}

fn default_component(key: &str) -> Option<usize> {
    match key {
        "default" | "default.u" | "default.x" | "default.r" | "default.s" => Some(0),
        "default.v" | "default.y" | "default.g" | "default.t" => Some(1),
        "default.z" | "default.b" | "default.p" => Some(2),
        "default.w" | "default.a" | "default.q" => Some(3),
        _ => None,
    }
}

/// Accumulates the `key=value` pairs of one declaration.
#[derive(Debug)]
pub struct DescriptorBuilder {
    line: usize,
    name: Option<String>,
    ty: Option<ParamType>,
    edit_as_color: bool,
    target: ParamTarget,
    source: ParamSource,
    min: f32,
    max: f32,
    step: f32,
    defaults: [f32; 4],
    warnings: Vec<ParseWarning>,
}

impl DescriptorBuilder {
    pub fn new(line: usize) -> Self {
        Self {
            line,
            name: None,
            ty: None,
            edit_as_color: false,
            target: ParamTarget::default(),
            source: ParamSource::default(),
            min: 0.0,
            max: 0.0,
            step: 1.0,
            defaults: [0.0; 4],
            warnings: Vec::new(),
        }
    }

    fn warn(&mut self, kind: WarningKind) {
        self.warnings.push(ParseWarning {
            line: self.line,
            kind,
        });
    }

    fn unknown_value(&mut self, key: &str, value: &str) {
        self.warn(WarningKind::UnknownValue {
            key: key.to_string(),
            value: value.to_string(),
        });
    }

    fn number(&mut self, key: &str, value: &str) -> f32 {
        parse_number_prefix(value).unwrap_or_else(|| {
            self.warn(WarningKind::BadNumber {
                key: key.to_string(),
                value: value.to_string(),
            });
            0.0
        })
    }

    pub fn apply(&mut self, key: &str, value: &str) {
        match key {
            "name" => self.name = Some(value.to_string()),
            "type" => match ParamType::parse(value) {
                Some((ty, as_color)) => {
                    self.ty = Some(ty);
                    self.edit_as_color |= as_color;
                }
                None => self.unknown_value(key, value),
            },
            "source" => match ParamSource::parse(value) {
                Some(source) => self.source = source,
                None => self.unknown_value(key, value),
            },
            "target" => match ParamTarget::parse(value) {
                Some(target) => self.target = target,
                None => self.unknown_value(key, value),
            },
            "min" => self.min = self.number(key, value),
            "max" => self.max = self.number(key, value),
            "step" => self.step = self.number(key, value),
            _ => match default_component(key) {
                Some(idx) => self.defaults[idx] = self.number(key, value),
                None => self.warn(WarningKind::UnknownKey(key.to_string())),
            },
        }
    }

    /// Builds the descriptor, or `None` when the name or type is missing.
    /// Warnings are appended to `warnings` either way.
    pub fn finish(mut self, warnings: &mut Vec<ParseWarning>) -> Option<ParameterDescriptor> {
        let name = self.name.take().filter(|n| !n.is_empty());
        let result = match (name, self.ty) {
            (None, _) => {
                self.warn(WarningKind::MissingName);
                None
            }
            (Some(name), None) => {
                self.warn(WarningKind::MissingType(name));
                None
            }
            (Some(name), Some(ty)) => {
                let value = if ty.is_int() {
                    ParamValue::from_ints(self.defaults.map(|v| v as i32))
                } else {
                    ParamValue::from_floats(self.defaults)
                };
                Some(ParameterDescriptor {
                    edit_as_color: self.edit_as_color,
                    target: self.target,
                    source: self.source,
                    min: self.min,
                    max: self.max,
                    step: self.step,
                    value,
                    ..ParameterDescriptor::new(&name, ty)
                })
            }
        };
        warnings.append(&mut self.warnings);
        result
    }
}

/// Interprets one declaration payload.
pub fn build_descriptor(
    line: usize,
    payload: &str,
    warnings: &mut Vec<ParseWarning>,
) -> Option<ParameterDescriptor> {
    let mut builder = DescriptorBuilder::new(line);
    let mut pairs = KeyValues::new(payload);
    for (key, value) in pairs.by_ref() {
        builder.apply(key, value);
    }

    let rest = pairs.remainder();
    if !rest.is_empty() {
        builder.warn(WarningKind::TrailingFragment(rest.to_string()));
    }
    builder.finish(warnings)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn build(payload: &str) -> (Option<ParameterDescriptor>, Vec<ParseWarning>) {
        let mut warnings = Vec::new();
        let desc = build_descriptor(1, payload, &mut warnings);
        (desc, warnings)
    }

    #[test]
    fn builds_full_float2_declaration() {
        let (desc, warnings) = build(
            "name=foo type=float2 source=ui default.x=1 default.y=2 min=0 max=5 step=0.1",
        );
        let desc = desc.unwrap();
        assert!(warnings.is_empty());
        assert_eq!(&*desc.name, "foo");
        assert_eq!(desc.ty, ParamType::Float2);
        assert_eq!(desc.source, ParamSource::UserEdited);
        assert_eq!(desc.target, ParamTarget::Uniform);
        assert_eq!(desc.value.float(0), 1.0);
        assert_eq!(desc.value.float(1), 2.0);
        assert_eq!(desc.min, 0.0);
        assert_eq!(desc.max, 5.0);
        assert_eq!(desc.step, 0.1);
        assert!(!desc.edit_as_color);
    }

    #[test]
    fn default_aliases_hit_the_same_component() {
        for key in ["default", "default.x", "default.r", "default.s", "default.u"] {
            let (desc, _) = build(&format!("name=a type=float4 {}=7", key));
            assert_eq!(desc.unwrap().value.floats(), [7.0, 0.0, 0.0, 0.0], "{}", key);
        }
        for (key, idx) in [
            ("default.v", 1),
            ("default.g", 1),
            ("default.p", 2),
            ("default.b", 2),
            ("default.q", 3),
            ("default.a", 3),
        ] {
            let (desc, _) = build(&format!("name=a type=float4 {}=3", key));
            assert_eq!(desc.unwrap().value.float(idx), 3.0, "{}", key);
        }
    }

    #[test]
    fn color_types_set_the_color_hint() {
        let (desc, _) = build("name=tint type=color3");
        let desc = desc.unwrap();
        assert_eq!(desc.ty, ParamType::Float3);
        assert!(desc.edit_as_color);

        for value in ["color", "color4"] {
            let (desc, _) = build(&format!("name=tint type={}", value));
            let desc = desc.unwrap();
            assert_eq!(desc.ty, ParamType::Float4);
            assert!(desc.edit_as_color);
        }
    }

    #[test]
    fn maps_sources_and_targets() {
        let (desc, _) = build("name=t type=float source=screen.h target=attribute.a");
        let desc = desc.unwrap();
        assert_eq!(desc.source, ParamSource::ScreenHeight);
        assert_eq!(desc.target, ParamTarget::AttributeSlot3);

        let (desc, _) = build("name=t type=float target=attribute");
        assert_eq!(desc.unwrap().target, ParamTarget::AttributeSlot0);
    }

    #[test]
    fn integer_defaults_are_stored_as_ints() {
        let (desc, _) = build("name=count default=5.9 default.y=-2 type=int2");
        let desc = desc.unwrap();
        assert_eq!(desc.value.int(0), 5);
        assert_eq!(desc.value.int(1), -2);
        assert_eq!(desc.components(), vec![5.0, -2.0]);
    }

    #[test]
    fn unknown_keys_warn_without_failing() {
        let (desc, warnings) = build("name=a colour=red type=float");
        assert!(desc.is_some());
        assert_eq!(warnings, vec![ParseWarning {
            line: 1,
            kind: WarningKind::UnknownKey("colour".into()),
        }]);
    }

    #[test]
    fn unknown_enum_values_keep_previous_field() {
        let (desc, warnings) = build("name=a type=float type=double source=mouse");
        let desc = desc.unwrap();
        assert_eq!(desc.ty, ParamType::Float);
        assert_eq!(desc.source, ParamSource::UserEdited);
        assert_eq!(warnings.len(), 2);
    }

    #[test]
    fn bad_numbers_degrade_to_zero() {
        let (desc, warnings) = build("name=a type=float default=abc max=2.5px");
        let desc = desc.unwrap();
        assert_eq!(desc.value.float(0), 0.0);
        assert_eq!(desc.max, 2.5);
        assert_eq!(warnings.len(), 1);
        assert!(matches!(warnings[0].kind, WarningKind::BadNumber { .. }));
    }

    #[test]
    fn missing_name_or_type_drops_descriptor() {
        let (desc, warnings) = build("name=");
        assert!(desc.is_none());
        assert!(warnings.contains(&ParseWarning { line: 1, kind: WarningKind::MissingName }));

        let (desc, warnings) = build("name=a type=vec3");
        assert!(desc.is_none());
        assert!(warnings.contains(&ParseWarning {
            line: 1,
            kind: WarningKind::MissingType("a".into()),
        }));
    }

    #[test]
    fn number_prefix_follows_strtof() {
        assert_eq!(parse_number_prefix("1.5"), Some(1.5));
        assert_eq!(parse_number_prefix("-2e3x"), Some(-2000.0));
        assert_eq!(parse_number_prefix(".25"), Some(0.25));
        assert_eq!(parse_number_prefix("3."), Some(3.0));
        assert_eq!(parse_number_prefix("4e"), Some(4.0));
        assert_eq!(parse_number_prefix("+"), None);
        assert_eq!(parse_number_prefix("."), None);
        assert_eq!(parse_number_prefix("x1"), None);
    }

    #[test]
    fn number_prefix_accepts_infinity_and_nan() {
        assert_eq!(parse_number_prefix("inf"), Some(f32::INFINITY));
        assert_eq!(parse_number_prefix("-Infinity"), Some(f32::NEG_INFINITY));
        assert_eq!(parse_number_prefix("+INFx"), Some(f32::INFINITY));
        assert!(parse_number_prefix("NaN").is_some_and(f32::is_nan));
        assert!(parse_number_prefix("-nan(1)").is_some_and(f32::is_nan));
        assert_eq!(parse_number_prefix("in"), None);
        assert_eq!(parse_number_prefix("0x1p3"), Some(0.0));
    }

    #[test]
    fn uniform_member_names_must_be_wgsl_identifiers() {
        for ok in ["speed", "_tint", "scale2", "Speed_X"] {
            assert!(is_uniform_member_name(ok), "{ok}");
        }
        for bad in ["", "my-speed", "2fast", "_", "__hidden", "loop", "let", "vertex_attributes", "tëst"] {
            assert!(!is_uniform_member_name(bad), "{bad}");
        }
    }
}
