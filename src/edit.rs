use serde::Serialize;
use thiserror::Error;

use crate::params::{ParamSource, ParamTarget, ParamType, ParameterDescriptor, ParameterTable};

/// Which editor widget a parameter gets.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case", tag = "kind", content = "components")]
pub enum EditorKind {
    IntSlider(usize),
    FloatDrag(usize),
    ColorPicker(usize),
    /// Computed every frame; not editable.
    Computed,
}

impl EditorKind {
    pub fn for_descriptor(param: &ParameterDescriptor) -> Self {
        if param.source != ParamSource::UserEdited {
            return EditorKind::Computed;
        }
        let n = param.ty.component_count();
        match param.ty {
            ParamType::Int | ParamType::Int2 | ParamType::Int4 => EditorKind::IntSlider(n),
            ParamType::Float3 | ParamType::Float4 if param.edit_as_color => EditorKind::ColorPicker(n),
            _ => EditorKind::FloatDrag(n),
        }
    }
}

#[derive(Debug, Error, PartialEq)]
pub enum EditError {
    #[error("no parameter named '{0}'")]
    UnknownParameter(String),
    #[error("parameter '{0}' is computed each frame and cannot be edited")]
    NotEditable(String),
    #[error("'{value}' is not a valid component for '{name}'")]
    BadComponent { name: String, value: String },
    #[error("'{name}' takes {expected} component(s), got {got}")]
    TooManyComponents { name: String, expected: usize, got: usize },
    #[error("override '{0}' is not of the form name=value")]
    Malformed(String),
}

/// Splits `name=value`.
pub fn split_override(text: &str) -> Result<(&str, &str), EditError> {
    text.split_once('=')
        .map(|(name, value)| (name.trim(), value.trim()))
        .filter(|(name, _)| !name.is_empty())
        .ok_or_else(|| EditError::Malformed(text.to_string()))
}

fn parse_hex_color(text: &str) -> Option<Vec<f32>> {
    let hex = text.strip_prefix('#')?;
    if !(hex.len() == 6 || hex.len() == 8) || !hex.is_ascii() {
        return None;
    }
    (0..hex.len())
        .step_by(2)
        .map(|i| u8::from_str_radix(&hex[i..i + 2], 16).ok().map(|b| b as f32 / 255.0))
        .collect()
}

fn clamp(param: &ParameterDescriptor, v: f32) -> f32 {
    if param.min < param.max {
        v.clamp(param.min, param.max)
    } else {
        v
    }
}

/// Writes an edited value into a user-edited parameter.
///
/// `text` holds comma-separated components; color parameters also accept
/// `#rrggbb` or `#rrggbbaa`. Components not given keep their value.
pub fn apply_edit(table: &mut ParameterTable, name: &str, text: &str) -> Result<(), EditError> {
    let param = table
        .get_mut(name)
        .ok_or_else(|| EditError::UnknownParameter(name.to_string()))?;
    if param.source != ParamSource::UserEdited {
        return Err(EditError::NotEditable(name.to_string()));
    }

    let components = match parse_hex_color(text).filter(|_| param.edit_as_color) {
        Some(components) => components,
        None => text
            .split(',')
            .map(|part| {
                part.trim().parse::<f32>().map_err(|_| EditError::BadComponent {
                    name: name.to_string(),
                    value: part.to_string(),
                })
            })
            .collect::<Result<Vec<_>, _>>()?,
    };

    let expected = param.ty.component_count();
    if components.len() > expected {
        return Err(EditError::TooManyComponents {
            name: name.to_string(),
            expected,
            got: components.len(),
        });
    }

    for (idx, &v) in components.iter().enumerate() {
        let v = clamp(param, v);
        if param.ty.is_int() {
            param.value.set_int(idx, v as i32);
        } else {
            param.value.set_float(idx, v);
        }
    }
    Ok(())
}

/// Serializable view of one parameter, for listings.
#[derive(Debug, Serialize)]
pub struct ParamListing {
    pub name: String,
    #[serde(rename = "type")]
    pub ty: ParamType,
    pub source: ParamSource,
    pub target: ParamTarget,
    pub editor: EditorKind,
    pub min: f32,
    pub max: f32,
    pub step: f32,
    pub value: Vec<f64>,
}

impl From<&ParameterDescriptor> for ParamListing {
    fn from(param: &ParameterDescriptor) -> Self {
        Self {
            name: param.name.to_string(),
            ty: param.ty,
            source: param.source,
            target: param.target,
            editor: EditorKind::for_descriptor(param),
            min: param.min,
            max: param.max,
            step: param.step,
            value: param.components(),
        }
    }
}

pub fn listing(table: &ParameterTable) -> Vec<ParamListing> {
    table.iter().map(ParamListing::from).collect()
}
