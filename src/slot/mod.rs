//! Uniform and define slots
//!
//! A slot is a name plus a typed value. Uniform slots also remember where the
//! driver put them; define slots know how to print themselves as a
//! preprocessor line.

use crate::error::{ShaderError, ShaderResult};
use crate::name::Name;
use crate::value::{Value, ValueType};

/// Anything addressable by name through a handle
pub trait NamedSlot {
    fn name(&self) -> &Name;
}

fn type_mismatch(name: &Name, expected: ValueType, actual: ValueType) -> ShaderError {
    ShaderError::TypeMismatch {
        name: name.to_string(),
        expected,
        actual,
    }
}

/// One active uniform of a linked program (array elements get a slot each)
#[derive(Debug, Clone)]
pub struct ShaderUniform {
    name: Name,
    value: Value,
    location: Option<u32>,
}

impl ShaderUniform {
    /// Fresh zero-valued slot of type `ty`
    pub fn new(name: Name, ty: ValueType, location: Option<u32>) -> Self {
        Self {
            name,
            value: Value::zero(ty),
            location,
        }
    }

    pub fn value(&self) -> &Value {
        &self.value
    }

    pub fn value_type(&self) -> ValueType {
        self.value.value_type()
    }

    /// Driver location; `None` when the driver did not hand one out
    pub fn location(&self) -> Option<u32> {
        self.location
    }

    pub(crate) fn set_location(&mut self, location: Option<u32>) {
        self.location = location;
    }

    /// Texture unit for sampler slots
    pub fn sampler_index(&self) -> Option<u8> {
        match self.value {
            Value::Sampler(binding) => Some(binding.unit()),
            _ => None,
        }
    }

    pub(crate) fn set_sampler_index(&mut self, unit: u8) {
        if let Value::Sampler(binding) = self.value {
            self.value = Value::Sampler(binding.with_unit(unit));
        }
    }

    pub fn ensure_type_match(&self, ty: ValueType) -> ShaderResult<()> {
        if self.value_type() != ty {
            return Err(type_mismatch(&self.name, self.value_type(), ty));
        }
        Ok(())
    }

    /// Overwrite with a value of the slot's own type
    pub fn set_value(&mut self, value: Value) -> ShaderResult<()> {
        self.ensure_type_match(value.value_type())?;
        self.value = value;
        Ok(())
    }

    /// Overwrite from raw bytes; the length must equal the type's size
    pub fn set_bytes(&mut self, bytes: &[u8]) -> ShaderResult<()> {
        let ty = self.value_type();
        self.value = Value::from_bytes(ty, bytes).ok_or_else(|| ShaderError::TypeMismatch {
            name: self.name.to_string(),
            expected: ty,
            actual: bytes_type(bytes.len()).unwrap_or(ty),
        })?;
        Ok(())
    }

    /// Change the declared type, zeroing the value
    pub fn set_type(&mut self, ty: ValueType) {
        self.value = Value::zero(ty);
    }

    pub(crate) fn set_texture(&mut self, texture: u32) -> ShaderResult<()> {
        match self.value {
            Value::Sampler(binding) => {
                self.value = Value::Sampler(binding.with_texture(texture));
                Ok(())
            }
            _ => Err(type_mismatch(&self.name, self.value_type(), ValueType::Sampler)),
        }
    }
}

impl NamedSlot for ShaderUniform {
    fn name(&self) -> &Name {
        &self.name
    }
}

/// Best guess at which type a byte count belongs to, for error messages
fn bytes_type(len: usize) -> Option<ValueType> {
    ValueType::ALL.into_iter().find(|ty| ty.size() == len)
}

/// Preprocessor define injected ahead of every stage's source
#[derive(Debug, Clone)]
pub struct ShaderDefine {
    name: Name,
    value: Value,
}

impl ShaderDefine {
    pub fn new(name: Name, value: Value) -> Self {
        Self { name, value }
    }

    pub fn value(&self) -> &Value {
        &self.value
    }

    pub fn value_type(&self) -> ValueType {
        self.value.value_type()
    }

    pub fn ensure_type_match(&self, ty: ValueType) -> ShaderResult<()> {
        if self.value_type() != ty {
            return Err(type_mismatch(&self.name, self.value_type(), ty));
        }
        Ok(())
    }

    /// Overwrite with a value of the define's own type; infinities and NaN
    /// are refused since they have no GLSL literal
    pub fn set_value(&mut self, value: Value) -> ShaderResult<()> {
        self.ensure_type_match(value.value_type())?;
        if !value.is_finite() {
            return Err(ShaderError::InvalidDefineValue {
                name: self.name.to_string(),
                value: value.to_string(),
            });
        }
        self.value = value;
        Ok(())
    }

    /// Whether values of `ty` can be rendered as a `#define`
    pub fn supports(ty: ValueType) -> bool {
        matches!(
            ty,
            ValueType::Int | ValueType::Float | ValueType::Vec2 | ValueType::Vec3
        )
    }

    /// `#define NAME value` line, or an empty string for unsupported types
    pub fn gen_define(&self) -> String {
        let body = match self.value {
            Value::Int(v) => v.to_string(),
            Value::Float(v) => glsl_float(v),
            Value::Vec2(v) => format!("vec2({}, {})", glsl_float(v.x), glsl_float(v.y)),
            Value::Vec3(v) => format!(
                "vec3({}, {}, {})",
                glsl_float(v.x),
                glsl_float(v.y),
                glsl_float(v.z)
            ),
            _ => return String::new(),
        };
        format!("#define {} {}\n", self.name, body)
    }
}

impl NamedSlot for ShaderDefine {
    fn name(&self) -> &Name {
        &self.name
    }
}

/// GLSL float literal; `{:?}` always keeps a `.` or exponent
fn glsl_float(v: f32) -> String {
    format!("{v:?}")
}
