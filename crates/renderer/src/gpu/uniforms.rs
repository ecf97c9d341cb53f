use std::fmt;

use crate::error::SketchError;

/// Name of the uniform block instance injected into every translated stage.
pub(crate) const BLOCK_INSTANCE: &str = "sketch_ubo";
/// Field prefix that keeps block members from colliding with user identifiers.
pub(crate) const FIELD_PREFIX: &str = "sketch_u_";
/// Bytes reserved at the start of the block for host-managed fields
/// (`sketch_viewport` and `sketch_canvas`, one vec4 each).
pub(crate) const RESERVED_BYTES: usize = 32;

/// GLSL types the sketch accepts as loose uniforms.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UniformKind {
    Float,
    Int,
    Vec2,
    Vec3,
    Vec4,
}

impl UniformKind {
    pub fn from_glsl(name: &str) -> Option<Self> {
        match name {
            "float" => Some(Self::Float),
            "int" => Some(Self::Int),
            "vec2" => Some(Self::Vec2),
            "vec3" => Some(Self::Vec3),
            "vec4" => Some(Self::Vec4),
            _ => None,
        }
    }

    pub fn glsl_name(self) -> &'static str {
        match self {
            Self::Float => "float",
            Self::Int => "int",
            Self::Vec2 => "vec2",
            Self::Vec3 => "vec3",
            Self::Vec4 => "vec4",
        }
    }

    /// std140 base alignment in bytes.
    fn alignment(self) -> usize {
        match self {
            Self::Float | Self::Int => 4,
            Self::Vec2 => 8,
            Self::Vec3 | Self::Vec4 => 16,
        }
    }

    fn size(self) -> usize {
        match self {
            Self::Float | Self::Int => 4,
            Self::Vec2 => 8,
            Self::Vec3 => 12,
            Self::Vec4 => 16,
        }
    }
}

impl fmt::Display for UniformKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.glsl_name())
    }
}

/// A value assigned to a uniform with [`Canvas::set_uniform`](crate::Canvas::set_uniform).
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum UniformValue {
    Float(f32),
    Int(i32),
    Vec2([f32; 2]),
    Vec3([f32; 3]),
    Vec4([f32; 4]),
}

impl UniformValue {
    pub fn kind(&self) -> UniformKind {
        match self {
            Self::Float(_) => UniformKind::Float,
            Self::Int(_) => UniformKind::Int,
            Self::Vec2(_) => UniformKind::Vec2,
            Self::Vec3(_) => UniformKind::Vec3,
            Self::Vec4(_) => UniformKind::Vec4,
        }
    }

    fn write_to(&self, out: &mut [u8]) {
        match self {
            Self::Float(value) => out.copy_from_slice(bytemuck::bytes_of(value)),
            Self::Int(value) => out.copy_from_slice(bytemuck::bytes_of(value)),
            Self::Vec2(value) => out.copy_from_slice(bytemuck::cast_slice(value)),
            Self::Vec3(value) => out.copy_from_slice(bytemuck::cast_slice(value)),
            Self::Vec4(value) => out.copy_from_slice(bytemuck::cast_slice(value)),
        }
    }
}

/// One member of the generated uniform block.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UniformField {
    pub name: String,
    pub kind: UniformKind,
    pub offset: usize,
}

/// std140 layout of the merged uniform block shared by both stages.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UniformLayout {
    fields: Vec<UniformField>,
    size: usize,
}

impl UniformLayout {
    /// Appends `name`, or checks the type if a stage already declared it.
    pub(crate) fn declare(&mut self, name: &str, kind: UniformKind) -> Result<(), SketchError> {
        if let Some(existing) = self.field(name) {
            if existing.kind != kind {
                return Err(SketchError::UniformConflict {
                    name: name.to_string(),
                    declared: existing.kind.glsl_name(),
                    other: kind.glsl_name(),
                });
            }
            return Ok(());
        }

        let end = self
            .fields
            .last()
            .map(|field| field.offset + field.kind.size())
            .unwrap_or(RESERVED_BYTES);
        let offset = align_to(end, kind.alignment());
        self.fields.push(UniformField {
            name: name.to_string(),
            kind,
            offset,
        });
        self.size = align_to(offset + kind.size(), 16);
        Ok(())
    }

    pub fn field(&self, name: &str) -> Option<&UniformField> {
        self.fields.iter().find(|field| field.name == name)
    }

    pub fn fields(&self) -> &[UniformField] {
        &self.fields
    }

    /// Total block size in bytes, a multiple of 16 and never smaller than the
    /// reserved host fields.
    pub fn size(&self) -> usize {
        self.size.max(RESERVED_BYTES)
    }

    /// GLSL declaration of the block plus the aliases for the bare names.
    pub(crate) fn glsl_block(&self) -> String {
        let mut block = String::from(
            "layout(std140, set = 0, binding = 0) uniform SketchUniforms {\n    vec4 sketch_viewport;\n    vec4 sketch_canvas;\n",
        );
        for field in &self.fields {
            block.push_str(&format!(
                "    {} {FIELD_PREFIX}{};\n",
                field.kind.glsl_name(),
                field.name
            ));
        }
        block.push_str(&format!("}} {BLOCK_INSTANCE};\n"));
        for field in &self.fields {
            block.push_str(&format!(
                "#define {name} {BLOCK_INSTANCE}.{FIELD_PREFIX}{name}\n",
                name = field.name
            ));
        }
        block
    }
}

fn align_to(value: usize, alignment: usize) -> usize {
    value.div_ceil(alignment) * alignment
}

/// CPU-side copy of the uniform buffer contents.
#[derive(Debug, Clone)]
pub(crate) struct UniformBlock {
    layout: UniformLayout,
    bytes: Vec<u8>,
}

impl UniformBlock {
    pub(crate) fn new(layout: UniformLayout) -> Self {
        let bytes = vec![0; layout.size()];
        Self { layout, bytes }
    }

    /// Writes `value` into the named field.
    ///
    /// Returns `Ok(false)` when the shaders never declared `name`; assigning
    /// an undeclared uniform is not an error.
    pub(crate) fn set(&mut self, name: &str, value: UniformValue) -> Result<bool, SketchError> {
        let Some(field) = self.layout.field(name) else {
            return Ok(false);
        };
        if field.kind != value.kind() {
            return Err(SketchError::UniformType {
                name: name.to_string(),
                declared: field.kind.glsl_name(),
                assigned: value.kind().glsl_name(),
            });
        }
        let range = field.offset..field.offset + field.kind.size();
        value.write_to(&mut self.bytes[range]);
        Ok(true)
    }

    /// Updates the host-managed presentation rectangle and canvas size.
    pub(crate) fn set_presentation(&mut self, viewport: [f32; 4], canvas: [f32; 2]) {
        self.bytes[0..16].copy_from_slice(bytemuck::cast_slice(&viewport));
        let canvas = [canvas[0], canvas[1], 0.0, 0.0];
        self.bytes[16..32].copy_from_slice(bytemuck::cast_slice(&canvas));
    }

    pub(crate) fn bytes(&self) -> &[u8] {
        &self.bytes
    }
}
