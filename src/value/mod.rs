//! Closed set of slot value types
//!
//! Every uniform and define slot stores a [`Value`]: a tagged variant over
//! the handful of types the shader layer supports. The tag doubles as the
//! runtime type identifier that typed accessors are checked against.

use std::fmt;

use bytemuck::{Pod, Zeroable};
use glam::{Mat3, Mat4, Vec2, Vec3, Vec4};

/// Size in bytes of the largest supported value (`mat4`)
pub const MAX_VALUE_SIZE: usize = 64;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ValueType {
    Float,
    Int,
    Vec2,
    Vec3,
    Vec4,
    Mat3,
    Mat4,
    Sampler,
}

impl ValueType {
    pub const ALL: [ValueType; 8] = [
        ValueType::Float,
        ValueType::Int,
        ValueType::Vec2,
        ValueType::Vec3,
        ValueType::Vec4,
        ValueType::Mat3,
        ValueType::Mat4,
        ValueType::Sampler,
    ];

    /// Size in bytes of a value of this type
    pub const fn size(self) -> usize {
        match self {
            ValueType::Float | ValueType::Int => 4,
            ValueType::Vec2 | ValueType::Sampler => 8,
            ValueType::Vec3 => 12,
            ValueType::Vec4 => 16,
            ValueType::Mat3 => 36,
            ValueType::Mat4 => 64,
        }
    }

    /// GLSL spelling of the type
    pub fn glsl_name(self) -> &'static str {
        match self {
            ValueType::Float => "float",
            ValueType::Int => "int",
            ValueType::Vec2 => "vec2",
            ValueType::Vec3 => "vec3",
            ValueType::Vec4 => "vec4",
            ValueType::Mat3 => "mat3",
            ValueType::Mat4 => "mat4",
            ValueType::Sampler => "sampler",
        }
    }

    pub fn from_glsl_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|ty| ty.glsl_name() == name)
    }

    /// Stable identifier for generic tooling (inspectors, serialized presets)
    pub const fn guid(self) -> TypeGuid {
        TypeGuid(match self {
            ValueType::Float => 0x6b1f_04d2_3c1e_4a7e_9e3b_5f0a_1c2d_0001,
            ValueType::Int => 0x6b1f_04d2_3c1e_4a7e_9e3b_5f0a_1c2d_0002,
            ValueType::Vec2 => 0x6b1f_04d2_3c1e_4a7e_9e3b_5f0a_1c2d_0003,
            ValueType::Vec3 => 0x6b1f_04d2_3c1e_4a7e_9e3b_5f0a_1c2d_0004,
            ValueType::Vec4 => 0x6b1f_04d2_3c1e_4a7e_9e3b_5f0a_1c2d_0005,
            ValueType::Mat3 => 0x6b1f_04d2_3c1e_4a7e_9e3b_5f0a_1c2d_0006,
            ValueType::Mat4 => 0x6b1f_04d2_3c1e_4a7e_9e3b_5f0a_1c2d_0007,
            ValueType::Sampler => 0x6b1f_04d2_3c1e_4a7e_9e3b_5f0a_1c2d_0008,
        })
    }

    pub fn from_guid(guid: TypeGuid) -> Option<Self> {
        Self::ALL.into_iter().find(|ty| ty.guid() == guid)
    }
}

impl fmt::Display for ValueType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.glsl_name())
    }
}

/// 128-bit type identifier, only used at the tooling boundary
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TypeGuid(pub u128);

/// Texture unit plus texture object bound to a sampler uniform.
///
/// The unit is assigned by the shader after every link; callers normally only
/// change the texture (see `Shader::set_texture`).
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Pod, Zeroable)]
pub struct SamplerBinding {
    texture: u32,
    unit: u8,
    _pad: [u8; 3],
}

impl SamplerBinding {
    pub const fn new(unit: u8, texture: u32) -> Self {
        Self {
            texture,
            unit,
            _pad: [0; 3],
        }
    }

    pub fn unit(&self) -> u8 {
        self.unit
    }

    pub fn texture(&self) -> u32 {
        self.texture
    }

    pub fn with_texture(self, texture: u32) -> Self {
        Self::new(self.unit, texture)
    }

    pub fn with_unit(self, unit: u8) -> Self {
        Self::new(unit, self.texture)
    }
}

/// A slot value: type tag and payload in one.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Value {
    Float(f32),
    Int(i32),
    Vec2(Vec2),
    Vec3(Vec3),
    Vec4(Vec4),
    Mat3(Mat3),
    Mat4(Mat4),
    Sampler(SamplerBinding),
}

impl Value {
    /// All-zero value of `ty`
    pub fn zero(ty: ValueType) -> Self {
        match ty {
            ValueType::Float => Value::Float(0.0),
            ValueType::Int => Value::Int(0),
            ValueType::Vec2 => Value::Vec2(Vec2::ZERO),
            ValueType::Vec3 => Value::Vec3(Vec3::ZERO),
            ValueType::Vec4 => Value::Vec4(Vec4::ZERO),
            ValueType::Mat3 => Value::Mat3(Mat3::ZERO),
            ValueType::Mat4 => Value::Mat4(Mat4::ZERO),
            ValueType::Sampler => Value::Sampler(SamplerBinding::default()),
        }
    }

    pub fn value_type(&self) -> ValueType {
        match self {
            Value::Float(_) => ValueType::Float,
            Value::Int(_) => ValueType::Int,
            Value::Vec2(_) => ValueType::Vec2,
            Value::Vec3(_) => ValueType::Vec3,
            Value::Vec4(_) => ValueType::Vec4,
            Value::Mat3(_) => ValueType::Mat3,
            Value::Mat4(_) => ValueType::Mat4,
            Value::Sampler(_) => ValueType::Sampler,
        }
    }

    /// False if any float component is infinite or NaN
    pub fn is_finite(&self) -> bool {
        match self {
            Value::Float(v) => v.is_finite(),
            Value::Int(_) | Value::Sampler(_) => true,
            Value::Vec2(v) => v.is_finite(),
            Value::Vec3(v) => v.is_finite(),
            Value::Vec4(v) => v.is_finite(),
            Value::Mat3(v) => v.is_finite(),
            Value::Mat4(v) => v.is_finite(),
        }
    }

    /// Raw byte view; always `value_type().size()` bytes long
    pub fn as_bytes(&self) -> &[u8] {
        match self {
            Value::Float(v) => bytemuck::bytes_of(v),
            Value::Int(v) => bytemuck::bytes_of(v),
            Value::Vec2(v) => bytemuck::bytes_of(v),
            Value::Vec3(v) => bytemuck::bytes_of(v),
            Value::Vec4(v) => bytemuck::bytes_of(v),
            Value::Mat3(v) => bytemuck::bytes_of(v),
            Value::Mat4(v) => bytemuck::bytes_of(v),
            Value::Sampler(v) => bytemuck::bytes_of(v),
        }
    }

    /// Rebuild a value of `ty` from exactly `ty.size()` bytes
    pub fn from_bytes(ty: ValueType, bytes: &[u8]) -> Option<Self> {
        if bytes.len() != ty.size() {
            return None;
        }

        let value = match ty {
            ValueType::Float => Value::Float(bytemuck::pod_read_unaligned(bytes)),
            ValueType::Int => Value::Int(bytemuck::pod_read_unaligned(bytes)),
            ValueType::Vec2 => Value::Vec2(bytemuck::pod_read_unaligned(bytes)),
            ValueType::Vec3 => Value::Vec3(bytemuck::pod_read_unaligned(bytes)),
            ValueType::Vec4 => Value::Vec4(bytemuck::pod_read_unaligned(bytes)),
            ValueType::Mat3 => Value::Mat3(bytemuck::pod_read_unaligned(bytes)),
            ValueType::Mat4 => Value::Mat4(bytemuck::pod_read_unaligned(bytes)),
            ValueType::Sampler => {
                let raw: SamplerBinding = bytemuck::pod_read_unaligned(bytes);
                Value::Sampler(SamplerBinding::new(raw.unit, raw.texture))
            }
        };
        Some(value)
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Float(v) => write!(f, "{v:?}"),
            Value::Int(v) => write!(f, "{v}"),
            Value::Vec2(v) => write!(f, "vec2({:?}, {:?})", v.x, v.y),
            Value::Vec3(v) => write!(f, "vec3({:?}, {:?}, {:?})", v.x, v.y, v.z),
            Value::Vec4(v) => write!(f, "vec4({:?}, {:?}, {:?}, {:?})", v.x, v.y, v.z, v.w),
            Value::Mat3(v) => write!(f, "mat3({:?})", v.to_cols_array()),
            Value::Mat4(v) => write!(f, "mat4({:?})", v.to_cols_array()),
            Value::Sampler(s) => write!(f, "sampler(unit {}, texture {})", s.unit, s.texture),
        }
    }
}

/// Host types that can be stored in a slot.
///
/// `VALUE_TYPE` is what gets compared against the slot's type before any
/// read or write, so a value is never reinterpreted as another type.
pub trait SlotType: Copy {
    const VALUE_TYPE: ValueType;

    fn into_value(self) -> Value;

    fn from_value(value: &Value) -> Option<Self>;
}

macro_rules! impl_slot_type {
    ($ty:ty, $variant:ident) => {
        impl SlotType for $ty {
            const VALUE_TYPE: ValueType = ValueType::$variant;

            fn into_value(self) -> Value {
                Value::$variant(self)
            }

            fn from_value(value: &Value) -> Option<Self> {
                match value {
                    Value::$variant(v) => Some(*v),
                    _ => None,
                }
            }
        }
    };
}

impl_slot_type!(f32, Float);
impl_slot_type!(i32, Int);
impl_slot_type!(Vec2, Vec2);
impl_slot_type!(Vec3, Vec3);
impl_slot_type!(Vec4, Vec4);
impl_slot_type!(Mat3, Mat3);
impl_slot_type!(Mat4, Mat4);
impl_slot_type!(SamplerBinding, Sampler);

const _: () = assert!(ValueType::Mat4.size() == MAX_VALUE_SIZE);
const _: () = assert!(std::mem::size_of::<SamplerBinding>() == ValueType::Sampler.size());
