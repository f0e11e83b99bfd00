//! Graphics API seam
//!
//! The shader layer never talks to a driver directly. Everything it needs
//! (program and stage objects, uniform introspection, uniform uploads) goes
//! through [`GraphicsBackend`], whose methods mirror the GL calls one to one
//! and take `&self` the way `glow::HasContext` does.

use std::fmt::Debug;

use crate::descriptor::StageKind;
use crate::value::ValueType;

pub mod headless;

#[cfg(feature = "glow")]
pub mod glow;

pub use headless::HeadlessBackend;

/// GL type enums reported by active-uniform introspection
pub mod gl_types {
    pub const FLOAT: u32 = 0x1406;
    pub const INT: u32 = 0x1404;
    pub const FLOAT_VEC2: u32 = 0x8B50;
    pub const FLOAT_VEC3: u32 = 0x8B51;
    pub const FLOAT_VEC4: u32 = 0x8B52;
    pub const FLOAT_MAT3: u32 = 0x8B5B;
    pub const FLOAT_MAT4: u32 = 0x8B5C;
    pub const SAMPLER_1D: u32 = 0x8B5D;
    pub const SAMPLER_2D: u32 = 0x8B5E;
    pub const SAMPLER_3D: u32 = 0x8B5F;
    pub const SAMPLER_CUBE: u32 = 0x8B60;
    pub const SAMPLER_2D_SHADOW: u32 = 0x8B62;
    pub const SAMPLER_2D_ARRAY: u32 = 0x8DC1;
    pub const BOOL: u32 = 0x8B56;
    pub const DOUBLE: u32 = 0x140A;
}

/// Map a GL uniform type enum to a slot type; `None` for unsupported types
pub fn value_type_for_gl(gl_type: u32) -> Option<ValueType> {
    use gl_types::*;

    match gl_type {
        FLOAT => Some(ValueType::Float),
        INT => Some(ValueType::Int),
        FLOAT_VEC2 => Some(ValueType::Vec2),
        FLOAT_VEC3 => Some(ValueType::Vec3),
        FLOAT_VEC4 => Some(ValueType::Vec4),
        FLOAT_MAT3 => Some(ValueType::Mat3),
        FLOAT_MAT4 => Some(ValueType::Mat4),
        SAMPLER_2D | SAMPLER_3D | SAMPLER_CUBE | SAMPLER_2D_SHADOW | SAMPLER_2D_ARRAY => {
            Some(ValueType::Sampler)
        }
        _ => None,
    }
}

/// GLSL keyword for a GL uniform type enum (used by the headless backend)
pub fn gl_type_for_glsl(keyword: &str) -> Option<u32> {
    use gl_types::*;

    Some(match keyword {
        "float" => FLOAT,
        "int" => INT,
        "bool" => BOOL,
        "double" => DOUBLE,
        "vec2" => FLOAT_VEC2,
        "vec3" => FLOAT_VEC3,
        "vec4" => FLOAT_VEC4,
        "mat3" => FLOAT_MAT3,
        "mat4" => FLOAT_MAT4,
        "sampler1D" => SAMPLER_1D,
        "sampler2D" => SAMPLER_2D,
        "sampler3D" => SAMPLER_3D,
        "samplerCube" => SAMPLER_CUBE,
        "sampler2DShadow" => SAMPLER_2D_SHADOW,
        "sampler2DArray" => SAMPLER_2D_ARRAY,
        _ => return None,
    })
}

/// One entry of a linked program's active uniform list
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActiveUniform {
    /// Name as reported by the driver; arrays usually end in `[0]`
    pub name: String,
    pub gl_type: u32,
    /// Element count, 1 for non-arrays
    pub size: u32,
}

/// Narrow interface to the platform graphics API.
///
/// Errors from object creation come back as plain strings, as in glow;
/// compile and link status are queried separately, as in GL.
pub trait GraphicsBackend {
    type Program: Copy + Debug + PartialEq;
    type Stage: Copy + Debug;

    fn create_program(&self) -> Result<Self::Program, String>;
    fn attach_stage(&self, program: Self::Program, stage: Self::Stage);
    fn detach_stage(&self, program: Self::Program, stage: Self::Stage);
    fn link_program(&self, program: Self::Program);
    fn program_link_status(&self, program: Self::Program) -> bool;
    fn program_info_log(&self, program: Self::Program) -> String;
    fn use_program(&self, program: Option<Self::Program>);
    fn delete_program(&self, program: Self::Program);

    fn create_stage(&self, kind: StageKind) -> Result<Self::Stage, String>;
    /// Source is given as ordered fragments, concatenated by the driver
    fn stage_source(&self, stage: Self::Stage, fragments: &[&str]);
    fn compile_stage(&self, stage: Self::Stage);
    fn stage_compile_status(&self, stage: Self::Stage) -> bool;
    fn stage_info_log(&self, stage: Self::Stage) -> String;
    fn delete_stage(&self, stage: Self::Stage);

    fn active_uniform_count(&self, program: Self::Program) -> u32;
    fn active_uniform(&self, program: Self::Program, index: u32) -> Option<ActiveUniform>;
    fn uniform_location(&self, program: Self::Program, name: &str) -> Option<u32>;

    fn uniform_1_f32(&self, location: u32, x: f32);
    fn uniform_1_i32(&self, location: u32, x: i32);
    fn uniform_2_f32(&self, location: u32, x: f32, y: f32);
    fn uniform_3_f32(&self, location: u32, x: f32, y: f32, z: f32);
    fn uniform_4_f32(&self, location: u32, x: f32, y: f32, z: f32, w: f32);
    fn uniform_matrix_3_f32(&self, location: u32, transpose: bool, data: &[f32; 9]);
    fn uniform_matrix_4_f32(&self, location: u32, transpose: bool, data: &[f32; 16]);
}
