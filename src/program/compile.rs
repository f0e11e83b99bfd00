//! Compilation pipeline: descriptor → per-stage sources → linked program

use std::path::{Path, PathBuf};

use crate::backend::GraphicsBackend;
use crate::config::ShaderConfig;
use crate::descriptor::{ShaderDescriptor, StageKind};
use crate::error::{driver_error, IoErrorContext, ShaderError, ShaderResult};
use crate::slot::ShaderDefine;

/// Assembled source of one stage, kept as the fragments handed to the driver
#[derive(Debug, Clone)]
pub(super) struct StageSource {
    pub kind: StageKind,
    pub fragments: Vec<String>,
}

impl StageSource {
    pub fn text(&self) -> String {
        self.fragments.concat()
    }
}

/// `#version` line, one line per define, then the stage file, for every
/// stage present in the descriptor
pub(super) fn assemble_sources(
    descriptor: &ShaderDescriptor,
    defines: &[ShaderDefine],
    config: &ShaderConfig,
) -> ShaderResult<Vec<StageSource>> {
    let version = descriptor.version_line();
    let define_lines: Vec<String> = defines.iter().map(ShaderDefine::gen_define).collect();

    descriptor
        .stages()
        .into_iter()
        .map(|(kind, relative)| {
            let path = config.resolve(relative);
            let body = std::fs::read_to_string(&path).io_context(&path)?;

            let mut fragments = Vec::with_capacity(define_lines.len() + 2);
            fragments.push(version.clone());
            fragments.extend(define_lines.iter().cloned());
            fragments.push(body);

            Ok(StageSource { kind, fragments })
        })
        .collect()
}

fn release<B: GraphicsBackend>(backend: &B, program: B::Program, stages: &[B::Stage]) {
    for stage in stages {
        backend.delete_stage(*stage);
    }
    backend.delete_program(program);
}

/// Compile every stage and link them into a new program.
///
/// Any failure deletes everything created here; no driver object outlives a
/// failed call.
pub(super) fn compile_and_link<B: GraphicsBackend>(
    backend: &B,
    label: &str,
    sources: &[StageSource],
) -> ShaderResult<B::Program> {
    let program = backend
        .create_program()
        .map_err(|e| driver_error("create_program", e))?;

    let mut stages = Vec::with_capacity(sources.len());
    for source in sources {
        let stage = match backend.create_stage(source.kind) {
            Ok(stage) => stage,
            Err(e) => {
                release(backend, program, &stages);
                return Err(driver_error(&format!("create_stage({})", source.kind), e));
            }
        };
        stages.push(stage);

        let fragments: Vec<&str> = source.fragments.iter().map(String::as_str).collect();
        backend.stage_source(stage, &fragments);
        backend.compile_stage(stage);

        if !backend.stage_compile_status(stage) {
            let log = backend.stage_info_log(stage);
            release(backend, program, &stages);
            return Err(ShaderError::StageCompileError {
                shader: label.to_string(),
                stage: source.kind,
                log,
            });
        }
    }

    for stage in &stages {
        backend.attach_stage(program, *stage);
    }
    backend.link_program(program);
    for stage in &stages {
        backend.detach_stage(program, *stage);
        backend.delete_stage(*stage);
    }

    if !backend.program_link_status(program) {
        let log = backend.program_info_log(program);
        backend.delete_program(program);
        return Err(ShaderError::LinkError {
            shader: label.to_string(),
            log,
        });
    }

    Ok(program)
}

/// Canonical form used to compare watcher paths with source paths
pub(super) fn canonical(path: &Path) -> PathBuf {
    std::fs::canonicalize(path).unwrap_or_else(|_| path.to_path_buf())
}
