//! Shader programs
//!
//! A [`Shader`] owns one linked program, its define list and its uniform
//! list. Uniform writes only touch host memory; [`Shader::send_all`] pushes
//! them to the driver once the program is bound. Every successful compile
//! rebuilds the uniform list against the new program while keeping values
//! whose name and type survived.

mod compile;
mod reconcile;

#[cfg(test)]
mod tests;

use std::path::{Path, PathBuf};
use std::rc::Rc;

use crate::backend::GraphicsBackend;
use crate::config::ShaderConfig;
use crate::context::ShaderContext;
use crate::descriptor::{ShaderDescriptor, StageKind};
use crate::error::{name_not_found, ShaderError, ShaderResult};
use crate::handle::{self, DefineHandle, Handle, UniformHandle};
use crate::name::NameInterner;
use crate::slot::{ShaderDefine, ShaderUniform};
use crate::value::{SlotType, Value, ValueType};

use compile::canonical;

pub struct Shader<B: GraphicsBackend> {
    backend: Rc<B>,
    names: NameInterner,
    config: ShaderConfig,
    label: String,
    descriptor_path: PathBuf,
    program: Option<B::Program>,
    defines: Vec<ShaderDefine>,
    defines_loaded: bool,
    uniforms: Vec<ShaderUniform>,
    needs_recompile: bool,
    source_files: Vec<PathBuf>,
    generated: Vec<(StageKind, String)>,
}

impl<B: GraphicsBackend> Shader<B> {
    /// Load and compile the shader described by the JSON file at `path`
    /// (relative to the context's source root).
    ///
    /// A shader that fails its first compile is never constructed.
    pub fn new(ctx: &ShaderContext<B>, path: impl AsRef<Path>) -> ShaderResult<Self> {
        let descriptor_path = ctx.config().resolve(path);
        let label = descriptor_path
            .file_stem()
            .map(|stem| stem.to_string_lossy().into_owned())
            .unwrap_or_else(|| descriptor_path.display().to_string());

        let mut shader = Self {
            backend: Rc::clone(ctx.backend()),
            names: ctx.names().clone(),
            config: ctx.config().clone(),
            label,
            source_files: vec![canonical(&descriptor_path)],
            descriptor_path,
            program: None,
            defines: Vec::new(),
            defines_loaded: false,
            uniforms: Vec::new(),
            needs_recompile: false,
            generated: Vec::new(),
        };
        shader.compile()?;
        Ok(shader)
    }

    /// Rebuild the program from the descriptor and current define values.
    ///
    /// The old program is destroyed first. On failure the shader stays
    /// invalid until the next successful compile; the uniform list is kept so
    /// values can still be carried over then.
    pub fn compile(&mut self) -> ShaderResult<()> {
        self.destroy_program();

        let program = match self.build_program() {
            Ok(program) => program,
            Err(err) => {
                log::error!("[shader] '{}': {}", self.label, err);
                return Err(err);
            }
        };

        let previous = std::mem::take(&mut self.uniforms);
        self.uniforms = reconcile::reconcile(
            self.backend.as_ref(),
            program,
            &self.names,
            previous,
            self.config.max_texture_units,
            &self.label,
        );
        self.program = Some(program);
        self.needs_recompile = false;

        log::info!(
            "[shader] '{}' compiled: {} uniforms, {} defines",
            self.label,
            self.uniforms.len(),
            self.defines.len()
        );
        Ok(())
    }

    /// Compile if a define changed or a source file was reported changed.
    /// Returns whether a compile ran.
    pub fn recompile_if_needed(&mut self) -> ShaderResult<bool> {
        if !self.needs_recompile {
            return Ok(false);
        }
        self.compile()?;
        Ok(true)
    }

    fn build_program(&mut self) -> ShaderResult<B::Program> {
        let descriptor = ShaderDescriptor::load(&self.descriptor_path)?;
        self.track_sources(&descriptor);

        if !self.defines_loaded {
            let values = descriptor.define_values(&self.descriptor_path)?;
            self.defines = values
                .into_iter()
                .map(|(name, value)| ShaderDefine::new(self.names.intern(&name), value))
                .collect();
            self.defines_loaded = true;
        }

        let sources = compile::assemble_sources(&descriptor, &self.defines, &self.config)?;
        self.generated = sources
            .iter()
            .map(|source| (source.kind, source.text()))
            .collect();

        compile::compile_and_link(self.backend.as_ref(), &self.label, &sources)
    }

    fn track_sources(&mut self, descriptor: &ShaderDescriptor) {
        let mut files = vec![canonical(&self.descriptor_path)];
        files.extend(
            descriptor
                .stages()
                .into_iter()
                .map(|(_, path)| canonical(&self.config.resolve(path))),
        );
        self.source_files = files;
    }

    fn destroy_program(&mut self) {
        if let Some(program) = self.program.take() {
            self.backend.delete_program(program);
            log::debug!("[shader] '{}': program {:?} destroyed", self.label, program);
        }
    }

    fn valid_program(&self) -> ShaderResult<B::Program> {
        self.program.ok_or_else(|| ShaderError::InvalidProgram {
            shader: self.label.clone(),
        })
    }

    pub fn is_valid(&self) -> bool {
        self.program.is_some()
    }

    pub fn needs_recompile(&self) -> bool {
        self.needs_recompile
    }

    /// Descriptor file stem, used in logs and errors
    pub fn label(&self) -> &str {
        &self.label
    }

    pub fn descriptor_path(&self) -> &Path {
        &self.descriptor_path
    }

    /// The linked program, if the last compile succeeded
    pub fn program(&self) -> Option<B::Program> {
        self.program
    }

    /// Bind the program for drawing and uniform uploads
    pub fn use_program(&self) -> ShaderResult<()> {
        let program = self.valid_program()?;
        self.backend.use_program(Some(program));
        Ok(())
    }

    // Uniforms

    /// Resolved handle to the uniform `name`
    pub fn uniform_handle(&self, name: &str) -> ShaderResult<UniformHandle> {
        let name = self.names.lookup(name).ok_or_else(|| name_not_found(name))?;
        let index = handle::find(&self.uniforms, &name)
            .ok_or_else(|| name_not_found(name.as_str()))?;
        Ok(Handle::with_index(name, index))
    }

    pub fn set_uniform<T: SlotType>(&mut self, handle: &UniformHandle, value: T) -> ShaderResult<()> {
        self.valid_program()?;
        let slot = handle.resolve_mut(&mut self.uniforms)?;
        slot.ensure_type_match(T::VALUE_TYPE)?;
        slot.set_value(value.into_value())
    }

    pub fn uniform<T: SlotType>(&self, handle: &UniformHandle) -> ShaderResult<T> {
        self.valid_program()?;
        let slot = handle.resolve(&self.uniforms)?;
        slot.ensure_type_match(T::VALUE_TYPE)?;
        T::from_value(slot.value()).ok_or_else(|| ShaderError::TypeMismatch {
            name: handle.name().to_string(),
            expected: slot.value_type(),
            actual: T::VALUE_TYPE,
        })
    }

    /// Dynamically typed write; the value's type must match the slot's
    pub fn set_uniform_value(&mut self, handle: &UniformHandle, value: Value) -> ShaderResult<()> {
        self.valid_program()?;
        handle.resolve_mut(&mut self.uniforms)?.set_value(value)
    }

    pub fn uniform_value(&self, handle: &UniformHandle) -> ShaderResult<Value> {
        self.valid_program()?;
        Ok(*handle.resolve(&self.uniforms)?.value())
    }

    /// Raw write; `bytes` must be exactly the slot type's size
    pub fn set_uniform_bytes(&mut self, handle: &UniformHandle, bytes: &[u8]) -> ShaderResult<()> {
        self.valid_program()?;
        handle.resolve_mut(&mut self.uniforms)?.set_bytes(bytes)
    }

    /// Point a sampler at a texture, keeping its unit
    pub fn set_texture(&mut self, handle: &UniformHandle, texture: u32) -> ShaderResult<()> {
        self.valid_program()?;
        handle.resolve_mut(&mut self.uniforms)?.set_texture(texture)
    }

    /// Texture unit assigned to a sampler uniform
    pub fn sampler_index(&self, handle: &UniformHandle) -> ShaderResult<u8> {
        self.valid_program()?;
        let slot = handle.resolve(&self.uniforms)?;
        slot.ensure_type_match(ValueType::Sampler)?;
        slot.sampler_index().ok_or_else(|| ShaderError::TypeMismatch {
            name: handle.name().to_string(),
            expected: slot.value_type(),
            actual: ValueType::Sampler,
        })
    }

    /// Upload every uniform that has a location. The program must be bound.
    pub fn send_all(&self) -> ShaderResult<()> {
        self.valid_program()?;
        for slot in &self.uniforms {
            self.send_slot(slot);
        }
        Ok(())
    }

    /// Upload one uniform; a uniform without a location sends nothing
    pub fn send_one(&self, handle: &UniformHandle) -> ShaderResult<()> {
        self.valid_program()?;
        self.send_slot(handle.resolve(&self.uniforms)?);
        Ok(())
    }

    fn send_slot(&self, slot: &ShaderUniform) {
        if let Some(location) = slot.location() {
            upload(
                self.backend.as_ref(),
                location,
                slot.value(),
                self.config.transpose_matrices,
            );
        }
    }

    // Defines

    pub fn define_handle(&self, name: &str) -> ShaderResult<DefineHandle> {
        let name = self.names.lookup(name).ok_or_else(|| name_not_found(name))?;
        let index = handle::find(&self.defines, &name)
            .ok_or_else(|| name_not_found(name.as_str()))?;
        Ok(Handle::with_index(name, index))
    }

    pub fn define_value<T: SlotType>(&self, handle: &DefineHandle) -> ShaderResult<T> {
        let define = handle.resolve(&self.defines)?;
        define.ensure_type_match(T::VALUE_TYPE)?;
        T::from_value(define.value()).ok_or_else(|| ShaderError::TypeMismatch {
            name: handle.name().to_string(),
            expected: define.value_type(),
            actual: T::VALUE_TYPE,
        })
    }

    /// Change a define; takes effect at the next compile
    pub fn set_define_value<T: SlotType>(&mut self, handle: &DefineHandle, value: T) -> ShaderResult<()> {
        let define = handle.resolve_mut(&mut self.defines)?;
        define.set_value(value.into_value())?;
        self.needs_recompile = true;
        Ok(())
    }

    // Introspection

    pub fn uniforms(&self) -> &[ShaderUniform] {
        &self.uniforms
    }

    pub fn defines(&self) -> &[ShaderDefine] {
        &self.defines
    }

    /// Source last handed to the driver for `stage`, including the
    /// `#version` and `#define` lines
    pub fn generated_source(&self, stage: StageKind) -> Option<&str> {
        self.generated
            .iter()
            .find(|(kind, _)| *kind == stage)
            .map(|(_, source)| source.as_str())
    }

    /// Descriptor and stage files this shader is built from
    pub fn source_files(&self) -> &[PathBuf] {
        &self.source_files
    }

    /// Mark the shader for recompilation if any of `paths` is one of its
    /// source files. Returns whether it was marked.
    pub fn notify_changed(&mut self, paths: &[PathBuf]) -> bool {
        let hit = paths
            .iter()
            .map(|path| canonical(path))
            .any(|path| self.source_files.contains(&path));
        if hit {
            log::debug!("[shader] '{}': source changed on disk", self.label);
            self.needs_recompile = true;
        }
        hit
    }
}

impl<B: GraphicsBackend> Drop for Shader<B> {
    fn drop(&mut self) {
        self.destroy_program();
    }
}

/// One driver upload call for `value`; samplers send their texture unit
fn upload<B: GraphicsBackend>(backend: &B, location: u32, value: &Value, transpose: bool) {
    match *value {
        Value::Float(x) => backend.uniform_1_f32(location, x),
        Value::Int(x) => backend.uniform_1_i32(location, x),
        Value::Vec2(v) => backend.uniform_2_f32(location, v.x, v.y),
        Value::Vec3(v) => backend.uniform_3_f32(location, v.x, v.y, v.z),
        Value::Vec4(v) => backend.uniform_4_f32(location, v.x, v.y, v.z, v.w),
        Value::Mat3(m) => backend.uniform_matrix_3_f32(location, transpose, &m.to_cols_array()),
        Value::Mat4(m) => backend.uniform_matrix_4_f32(location, transpose, &m.to_cols_array()),
        Value::Sampler(binding) => backend.uniform_1_i32(location, i32::from(binding.unit())),
    }
}
