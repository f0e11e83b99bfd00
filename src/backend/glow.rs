//! [`GraphicsBackend`] for a `glow` OpenGL context (cargo feature `glow`)

use ::glow::{HasContext, NativeProgram, NativeShader, NativeUniformLocation};

use super::{ActiveUniform, GraphicsBackend};
use crate::descriptor::StageKind;

fn stage_enum(kind: StageKind) -> u32 {
    match kind {
        StageKind::Vertex => ::glow::VERTEX_SHADER,
        StageKind::TessControl => ::glow::TESS_CONTROL_SHADER,
        StageKind::TessEvaluation => ::glow::TESS_EVALUATION_SHADER,
        StageKind::Geometry => ::glow::GEOMETRY_SHADER,
        StageKind::Fragment => ::glow::FRAGMENT_SHADER,
        StageKind::Compute => ::glow::COMPUTE_SHADER,
    }
}

fn loc(location: u32) -> NativeUniformLocation {
    NativeUniformLocation(location)
}

// All calls below require the context to be current on the calling thread,
// which the shader layer assumes throughout.
impl GraphicsBackend for ::glow::Context {
    type Program = NativeProgram;
    type Stage = NativeShader;

    fn create_program(&self) -> Result<NativeProgram, String> {
        unsafe { HasContext::create_program(self) }
    }

    fn attach_stage(&self, program: NativeProgram, stage: NativeShader) {
        unsafe { self.attach_shader(program, stage) }
    }

    fn detach_stage(&self, program: NativeProgram, stage: NativeShader) {
        unsafe { self.detach_shader(program, stage) }
    }

    fn link_program(&self, program: NativeProgram) {
        unsafe { HasContext::link_program(self, program) }
    }

    fn program_link_status(&self, program: NativeProgram) -> bool {
        unsafe { self.get_program_link_status(program) }
    }

    fn program_info_log(&self, program: NativeProgram) -> String {
        unsafe { self.get_program_info_log(program) }
    }

    fn use_program(&self, program: Option<NativeProgram>) {
        unsafe { HasContext::use_program(self, program) }
    }

    fn delete_program(&self, program: NativeProgram) {
        unsafe { HasContext::delete_program(self, program) }
    }

    fn create_stage(&self, kind: StageKind) -> Result<NativeShader, String> {
        unsafe { self.create_shader(stage_enum(kind)) }
    }

    fn stage_source(&self, stage: NativeShader, fragments: &[&str]) {
        // glow takes a single string; joining here is what glShaderSource
        // would do with the fragment array anyway
        let source = fragments.concat();
        unsafe { self.shader_source(stage, &source) }
    }

    fn compile_stage(&self, stage: NativeShader) {
        unsafe { self.compile_shader(stage) }
    }

    fn stage_compile_status(&self, stage: NativeShader) -> bool {
        unsafe { self.get_shader_compile_status(stage) }
    }

    fn stage_info_log(&self, stage: NativeShader) -> String {
        unsafe { self.get_shader_info_log(stage) }
    }

    fn delete_stage(&self, stage: NativeShader) {
        unsafe { self.delete_shader(stage) }
    }

    fn active_uniform_count(&self, program: NativeProgram) -> u32 {
        unsafe { self.get_active_uniforms(program) }
    }

    fn active_uniform(&self, program: NativeProgram, index: u32) -> Option<ActiveUniform> {
        let uniform = unsafe { self.get_active_uniform(program, index) }?;
        Some(ActiveUniform {
            name: uniform.name,
            gl_type: uniform.utype,
            size: uniform.size.max(1) as u32,
        })
    }

    fn uniform_location(&self, program: NativeProgram, name: &str) -> Option<u32> {
        unsafe { self.get_uniform_location(program, name) }.map(|l| l.0)
    }

    fn uniform_1_f32(&self, location: u32, x: f32) {
        unsafe { HasContext::uniform_1_f32(self, Some(&loc(location)), x) }
    }

    fn uniform_1_i32(&self, location: u32, x: i32) {
        unsafe { HasContext::uniform_1_i32(self, Some(&loc(location)), x) }
    }

    fn uniform_2_f32(&self, location: u32, x: f32, y: f32) {
        unsafe { HasContext::uniform_2_f32(self, Some(&loc(location)), x, y) }
    }

    fn uniform_3_f32(&self, location: u32, x: f32, y: f32, z: f32) {
        unsafe { HasContext::uniform_3_f32(self, Some(&loc(location)), x, y, z) }
    }

    fn uniform_4_f32(&self, location: u32, x: f32, y: f32, z: f32, w: f32) {
        unsafe { HasContext::uniform_4_f32(self, Some(&loc(location)), x, y, z, w) }
    }

    fn uniform_matrix_3_f32(&self, location: u32, transpose: bool, data: &[f32; 9]) {
        unsafe { self.uniform_matrix_3_f32_slice(Some(&loc(location)), transpose, data) }
    }

    fn uniform_matrix_4_f32(&self, location: u32, transpose: bool, data: &[f32; 16]) {
        unsafe { self.uniform_matrix_4_f32_slice(Some(&loc(location)), transpose, data) }
    }
}
