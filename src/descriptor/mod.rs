//! JSON shader descriptors
//!
//! A descriptor names the GLSL version, the preprocessor defines a shader
//! exposes, and one source file per stage:
//!
//! ```json
//! {
//!     "glsl_version": "330 core",
//!     "definitions": [{ "name": "LIGHT_COUNT", "type": "int", "default": 4 }],
//!     "vertex": "basic.vert",
//!     "fragment": "basic.frag"
//! }
//! ```

use std::collections::HashSet;
use std::fmt;
use std::path::{Path, PathBuf};

use glam::{Vec2, Vec3};
use serde::{Deserialize, Deserializer};
use serde_json::Value as JsonValue;

use crate::error::{invalid_descriptor, IoErrorContext, ShaderError, ShaderResult};
use crate::slot::ShaderDefine;
use crate::value::{Value, ValueType};

/// Pipeline stage, in the order stages are compiled
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum StageKind {
    Vertex,
    TessControl,
    TessEvaluation,
    Geometry,
    Fragment,
    Compute,
}

impl StageKind {
    pub const ALL: [StageKind; 6] = [
        StageKind::Vertex,
        StageKind::TessControl,
        StageKind::TessEvaluation,
        StageKind::Geometry,
        StageKind::Fragment,
        StageKind::Compute,
    ];

    /// Key naming this stage's source file in a descriptor
    pub fn key(self) -> &'static str {
        match self {
            StageKind::Vertex => "vertex",
            StageKind::TessControl => "tess_control",
            StageKind::TessEvaluation => "tess_evaluation",
            StageKind::Geometry => "geometry",
            StageKind::Fragment => "fragment",
            StageKind::Compute => "compute",
        }
    }
}

impl fmt::Display for StageKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.key())
    }
}

/// One entry of the `definitions` array
#[derive(Debug, Clone, Deserialize)]
pub struct DefineDecl {
    pub name: String,
    #[serde(rename = "type")]
    pub ty: String,
    #[serde(default)]
    pub default: Option<JsonValue>,
}

impl DefineDecl {
    pub fn value_type(&self) -> Option<ValueType> {
        ValueType::from_glsl_name(&self.ty).filter(|ty| ShaderDefine::supports(*ty))
    }

    /// Typed default value; the zero value when `default` is absent
    pub fn default_value(&self) -> Result<Value, String> {
        let ty = self
            .value_type()
            .ok_or_else(|| format!("define '{}' has unsupported type '{}'", self.name, self.ty))?;

        let Some(json) = &self.default else {
            return Ok(Value::zero(ty));
        };

        let bad_default = || format!("define '{}' default {} is not a valid {}", self.name, json, ty);
        let value = match ty {
            ValueType::Int => json
                .as_i64()
                .and_then(|v| i32::try_from(v).ok())
                .map(Value::Int)
                .ok_or_else(bad_default),
            ValueType::Float => json.as_f64().map(|v| Value::Float(v as f32)).ok_or_else(bad_default),
            ValueType::Vec2 => float_array::<2>(json)
                .map(|[x, y]| Value::Vec2(Vec2::new(x, y)))
                .ok_or_else(bad_default),
            ValueType::Vec3 => float_array::<3>(json)
                .map(|[x, y, z]| Value::Vec3(Vec3::new(x, y, z)))
                .ok_or_else(bad_default),
            _ => Err(bad_default()),
        }?;

        // 1e300 is valid JSON but overflows f32
        if !value.is_finite() {
            return Err(bad_default());
        }
        Ok(value)
    }
}

fn float_array<const N: usize>(json: &JsonValue) -> Option<[f32; N]> {
    let items = json.as_array()?;
    if items.len() != N {
        return None;
    }
    let mut out = [0.0f32; N];
    for (slot, item) in out.iter_mut().zip(items) {
        *slot = item.as_f64()? as f32;
    }
    Some(out)
}

/// Accept `"450"`, `"330 core"` or a bare `450`
fn version_string<'de, D: Deserializer<'de>>(deserializer: D) -> Result<String, D::Error> {
    match JsonValue::deserialize(deserializer)? {
        JsonValue::String(s) => Ok(s),
        JsonValue::Number(n) => Ok(n.to_string()),
        other => Err(serde::de::Error::custom(format!(
            "glsl_version must be a string or number, got {other}"
        ))),
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct ShaderDescriptor {
    #[serde(deserialize_with = "version_string")]
    pub glsl_version: String,
    #[serde(default)]
    pub definitions: Vec<DefineDecl>,
    #[serde(default)]
    pub vertex: Option<PathBuf>,
    #[serde(default)]
    pub tess_control: Option<PathBuf>,
    #[serde(default)]
    pub tess_evaluation: Option<PathBuf>,
    #[serde(default)]
    pub geometry: Option<PathBuf>,
    #[serde(default)]
    pub fragment: Option<PathBuf>,
    #[serde(default)]
    pub compute: Option<PathBuf>,
}

impl ShaderDescriptor {
    /// Read and validate a descriptor file
    pub fn load(path: &Path) -> ShaderResult<Self> {
        let text = std::fs::read_to_string(path).io_context(path)?;
        Self::parse(&text, path)
    }

    /// Parse descriptor text; `path` is only used in error messages
    pub fn parse(text: &str, path: &Path) -> ShaderResult<Self> {
        let descriptor: ShaderDescriptor =
            serde_json::from_str(text).map_err(|e| ShaderError::JsonParseError {
                path: path.display().to_string(),
                error: e.to_string(),
            })?;

        if descriptor.stages().is_empty() {
            return Err(invalid_descriptor(path, "no shader stage given"));
        }
        if descriptor.glsl_version.trim().is_empty() {
            return Err(invalid_descriptor(path, "empty glsl_version"));
        }

        Ok(descriptor)
    }

    pub fn stage(&self, kind: StageKind) -> Option<&Path> {
        match kind {
            StageKind::Vertex => self.vertex.as_deref(),
            StageKind::TessControl => self.tess_control.as_deref(),
            StageKind::TessEvaluation => self.tess_evaluation.as_deref(),
            StageKind::Geometry => self.geometry.as_deref(),
            StageKind::Fragment => self.fragment.as_deref(),
            StageKind::Compute => self.compute.as_deref(),
        }
    }

    /// Present stages in compile order
    pub fn stages(&self) -> Vec<(StageKind, &Path)> {
        StageKind::ALL
            .into_iter()
            .filter_map(|kind| self.stage(kind).map(|path| (kind, path)))
            .collect()
    }

    /// `#version` line opening every stage
    pub fn version_line(&self) -> String {
        format!("#version {}\n", self.glsl_version.trim())
    }

    /// Validated `(name, default)` pairs in declaration order
    pub fn define_values(&self, path: &Path) -> ShaderResult<Vec<(String, Value)>> {
        let mut seen = HashSet::new();
        let mut out = Vec::with_capacity(self.definitions.len());

        for decl in &self.definitions {
            if decl.name.is_empty() {
                return Err(invalid_descriptor(path, "define with empty name"));
            }
            if !seen.insert(decl.name.as_str()) {
                return Err(invalid_descriptor(
                    path,
                    format!("define '{}' declared twice", decl.name),
                ));
            }
            let value = decl.default_value().map_err(|reason| invalid_descriptor(path, reason))?;
            out.push((decl.name.clone(), value));
        }

        Ok(out)
    }
}
