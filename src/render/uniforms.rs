use std::collections::HashMap;
use std::fmt::Write;

use crate::eval::{RenderSink, ATTRIBUTE_SLOTS};
use crate::params::{
    is_uniform_member_name, ParamTarget, ParamType, ParameterTable, ATTRIBUTES_MEMBER,
};

/// Every member of the generated uniform struct starts on a 16-byte boundary.
pub const MEMBER_STRIDE: usize = 16;

/// Byte offsets of the uniform-targeted parameters inside `ShaderParams`.
/// Slot 0 always holds the vertex attributes. Parameters whose names cannot
/// be WGSL members are left out; parsing already warned about them.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct UniformLayout {
    members: Vec<(String, ParamType)>,
    offsets: HashMap<String, usize>,
}

impl UniformLayout {
    pub fn for_table(params: &ParameterTable) -> Self {
        let mut layout = Self::default();
        let members = params
            .iter()
            .filter(|p| p.target == ParamTarget::Uniform && is_uniform_member_name(&p.name));
        for param in members {
            let offset = MEMBER_STRIDE * (layout.members.len() + 1);
            layout.offsets.insert(param.name.to_string(), offset);
            layout.members.push((param.name.to_string(), param.ty));
        }
        layout
    }

    pub fn size(&self) -> usize {
        MEMBER_STRIDE * (self.members.len() + 1)
    }

    pub fn offset(&self, name: &str) -> Option<usize> {
        self.offsets.get(name).copied()
    }

    /// WGSL declarations prepended to the user's fragment shader.
    pub fn prelude(&self) -> String {
        let mut src = String::from("// Generated parameters\nstruct ShaderParams {\n");
        let _ = writeln!(src, "    {}: vec4<f32>,", ATTRIBUTES_MEMBER);
        for (name, ty) in &self.members {
            let _ = writeln!(src, "    @align(16) {}: {},", name, ty.wgsl_type());
        }
        src.push_str(
            "}\n\
             @group(0) @binding(0) var<uniform> params: ShaderParams;\n\
             \n\
             struct VertexOutput {\n\
             \x20   @builtin(position) position: vec4<f32>,\n\
             \x20   @location(0) uv: vec2<f32>,\n\
             }\n\
             \n\
             @vertex\n\
             fn vs_main(@builtin(vertex_index) idx: u32) -> VertexOutput {\n\
             \x20   let uv = vec2<f32>(f32((idx << 1u) & 2u), f32(idx & 2u));\n\
             \x20   var out: VertexOutput;\n\
             \x20   out.position = vec4<f32>(uv * 2.0 - 1.0, 0.0, 1.0);\n\
             \x20   out.uv = vec2<f32>(uv.x, 1.0 - uv.y);\n\
             \x20   return out;\n\
             }\n\n",
        );
        src
    }

    /// Number of lines `prelude` adds in front of the user's source.
    pub fn prelude_lines(&self) -> usize {
        self.prelude().lines().count()
    }
}

/// CPU copy of the uniform buffer contents, filled through [`RenderSink`].
#[derive(Debug)]
pub struct UniformBlock {
    layout: UniformLayout,
    data: Vec<u32>,
}

impl UniformBlock {
    pub fn new(layout: UniformLayout) -> Self {
        let data = vec![0; layout.size() / 4];
        Self { layout, data }
    }

    pub fn as_bytes(&self) -> &[u8] {
        bytemuck::cast_slice(&self.data[..])
    }

    fn bytes_mut(&mut self) -> &mut [u8] {
        bytemuck::cast_slice_mut(&mut self.data[..])
    }
}

impl RenderSink for UniformBlock {
    fn set_uniform(&mut self, name: &str, bytes: &[u8], _ty: ParamType) {
        let Some(offset) = self.layout.offset(name) else {
            log::debug!("uniform '{}' is not part of the active layout", name);
            return;
        };
        let len = bytes.len().min(MEMBER_STRIDE);
        self.bytes_mut()[offset..offset + len].copy_from_slice(&bytes[..len]);
    }

    fn push_vertex_attributes(&mut self, attributes: [f32; ATTRIBUTE_SLOTS]) {
        self.bytes_mut()[..MEMBER_STRIDE].copy_from_slice(bytemuck::bytes_of(&attributes));
    }
}
