//! Shader programs with typed uniform and define slots
//!
//! A [`ShaderContext`] owns the graphics backend, the name interner and the
//! configuration. Shaders loaded from it expose their uniforms and
//! preprocessor defines as named, typed slots:
//!
//! ```no_run
//! use glam::Vec3;
//! use hearth_shader::{HeadlessBackend, ShaderConfig, ShaderContext};
//!
//! # fn main() -> hearth_shader::ShaderResult<()> {
//! let ctx = ShaderContext::new(HeadlessBackend::new(), ShaderConfig::with_source_root("shaders"));
//! let mut shader = ctx.load_shader("basic.json")?;
//!
//! let color = shader.uniform_handle("u_color")?;
//! shader.set_uniform(&color, Vec3::new(1.0, 0.0, 0.0))?;
//!
//! shader.use_program()?;
//! shader.send_all()?;
//! # Ok(())
//! # }
//! ```
//!
//! Writes only touch host memory until `send_all`. Recompiling keeps every
//! value whose uniform kept its name and type, and handles taken before a
//! recompile keep working after it.

pub mod backend;
pub mod config;
pub mod context;
pub mod descriptor;
pub mod error;
pub mod handle;
pub mod name;
pub mod program;
pub mod slot;
pub mod value;

#[cfg(feature = "hot-reload")]
pub mod hot_reload;

pub use backend::{ActiveUniform, GraphicsBackend, HeadlessBackend};
pub use config::ShaderConfig;
pub use context::ShaderContext;
pub use descriptor::{ShaderDescriptor, StageKind};
pub use error::{ShaderError, ShaderResult};
pub use handle::{DefineHandle, Handle, UniformHandle};
pub use name::{Name, NameInterner};
pub use program::Shader;
pub use slot::{NamedSlot, ShaderDefine, ShaderUniform};
pub use value::{SamplerBinding, SlotType, TypeGuid, Value, ValueType, MAX_VALUE_SIZE};
