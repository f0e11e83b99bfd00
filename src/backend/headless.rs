//! GL-free backend
//!
//! Stands in for a driver where no GL context exists: unit tests, CI, and
//! tools that only want to validate descriptors. It keeps enough state to
//! behave like a driver from the shader layer's point of view:
//!
//! - a stage fails to compile when its source contains an `#error` line;
//! - the active uniform list is read from `uniform <type> <name>;`
//!   declarations (arrays as `name[N]`), in first-seen order;
//! - every upload call is recorded together with the program bound at the
//!   time.
//!
//! Tests can script the next link (a fixed uniform list, a link failure) and
//! hide individual locations to imitate uniforms the driver strips.

use std::cell::RefCell;
use std::collections::{HashMap, HashSet};

use super::{gl_type_for_glsl, ActiveUniform, GraphicsBackend};
use crate::descriptor::StageKind;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct HeadlessProgram(pub u32);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct HeadlessStage(pub u32);

/// Payload of one recorded upload call
#[derive(Debug, Clone, PartialEq)]
pub enum UniformUpload {
    Float(f32),
    Int(i32),
    Vec2([f32; 2]),
    Vec3([f32; 3]),
    Vec4([f32; 4]),
    Mat3 { transpose: bool, data: [f32; 9] },
    Mat4 { transpose: bool, data: [f32; 16] },
}

#[derive(Debug, Clone, PartialEq)]
pub struct UploadCall {
    /// Program bound when the call was made
    pub program: Option<HeadlessProgram>,
    pub location: u32,
    pub upload: UniformUpload,
}

struct StageState {
    kind: StageKind,
    source: String,
    compiled: bool,
    log: String,
}

#[derive(Default)]
struct ProgramState {
    attached: Vec<u32>,
    linked: bool,
    log: String,
    uniforms: Vec<ActiveUniform>,
    locations: HashMap<String, u32>,
}

#[derive(Default)]
struct State {
    next_id: u32,
    stages: HashMap<u32, StageState>,
    programs: HashMap<u32, ProgramState>,
    bound: Option<HeadlessProgram>,
    uploads: Vec<UploadCall>,
    compiled_sources: Vec<(StageKind, String)>,
    deleted_programs: Vec<HeadlessProgram>,
    scripted_uniforms: Option<Vec<ActiveUniform>>,
    fail_next_link: Option<String>,
    hidden_locations: HashSet<String>,
}

impl State {
    fn next_id(&mut self) -> u32 {
        self.next_id += 1;
        self.next_id
    }

    fn record(&mut self, location: u32, upload: UniformUpload) {
        let program = self.bound;
        self.uploads.push(UploadCall {
            program,
            location,
            upload,
        });
    }
}

#[derive(Default)]
pub struct HeadlessBackend {
    state: RefCell<State>,
}

impl HeadlessBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// Use `uniforms` as the active list of every following link instead of
    /// scanning sources; `None` goes back to scanning
    pub fn script_uniforms(&self, uniforms: Option<Vec<ActiveUniform>>) {
        self.state.borrow_mut().scripted_uniforms = uniforms;
    }

    /// Make the next link fail with `log`
    pub fn fail_next_link(&self, log: impl Into<String>) {
        self.state.borrow_mut().fail_next_link = Some(log.into());
    }

    /// Report no location for `name` from now on
    pub fn hide_location(&self, name: impl Into<String>) {
        self.state.borrow_mut().hidden_locations.insert(name.into());
    }

    pub fn uploads(&self) -> Vec<UploadCall> {
        self.state.borrow().uploads.clone()
    }

    pub fn take_uploads(&self) -> Vec<UploadCall> {
        std::mem::take(&mut self.state.borrow_mut().uploads)
    }

    pub fn bound_program(&self) -> Option<HeadlessProgram> {
        self.state.borrow().bound
    }

    /// Programs created and not yet deleted
    pub fn live_programs(&self) -> usize {
        self.state.borrow().programs.len()
    }

    /// Stages created and not yet deleted
    pub fn live_stages(&self) -> usize {
        self.state.borrow().stages.len()
    }

    pub fn deleted_programs(&self) -> Vec<HeadlessProgram> {
        self.state.borrow().deleted_programs.clone()
    }

    /// Every source handed to `compile_stage`, oldest first
    pub fn compiled_sources(&self) -> Vec<(StageKind, String)> {
        self.state.borrow().compiled_sources.clone()
    }

    /// Most recent source compiled for `kind`
    pub fn last_source(&self, kind: StageKind) -> Option<String> {
        self.state
            .borrow()
            .compiled_sources
            .iter()
            .rev()
            .find(|(k, _)| *k == kind)
            .map(|(_, source)| source.clone())
    }
}

/// `#error` lines fail the compile, like a real preprocessor would
fn check_source(source: &str) -> Result<(), String> {
    for (line_no, line) in source.lines().enumerate() {
        if let Some(message) = line.trim().strip_prefix("#error") {
            return Err(format!("ERROR: 0:{}: '#error' : {}", line_no + 1, message.trim()));
        }
    }
    Ok(())
}

/// Uniform declarations of one source, as `(name, gl_type, size)`
fn scan_uniforms(source: &str) -> Vec<ActiveUniform> {
    let mut found = Vec::new();

    for line in source.lines() {
        let line = line.trim();
        let Some(decl) = line.strip_suffix(';') else {
            continue;
        };
        let mut tokens = decl
            .split_whitespace()
            .skip_while(|t| *t != "uniform")
            .skip(1)
            .skip_while(|t| matches!(*t, "highp" | "mediump" | "lowp"));

        let Some(gl_type) = tokens.next().and_then(gl_type_for_glsl) else {
            continue;
        };
        let rest: String = tokens.collect::<Vec<_>>().join(" ");

        for declarator in rest.split(',') {
            let declarator = declarator.trim();
            let (name, size) = match declarator.split_once('[') {
                Some((name, count)) => {
                    let count = count.trim_end_matches(']').trim();
                    (name.trim(), count.parse::<u32>().unwrap_or(1))
                }
                None => (declarator, 1),
            };
            if name.is_empty() {
                continue;
            }
            let name = if size > 1 {
                format!("{name}[0]")
            } else {
                name.to_string()
            };
            found.push(ActiveUniform { name, gl_type, size });
        }
    }

    found
}

/// Location table: arrays take one location per element
fn assign_locations(uniforms: &[ActiveUniform], hidden: &HashSet<String>) -> HashMap<String, u32> {
    let mut locations = HashMap::new();
    let mut next = 0u32;

    for uniform in uniforms {
        let base = uniform.name.strip_suffix("[0]").unwrap_or(&uniform.name);
        if uniform.size > 1 {
            for i in 0..uniform.size {
                let element = format!("{base}[{i}]");
                if !hidden.contains(&element) {
                    locations.insert(element, next);
                }
                next += 1;
            }
            if !hidden.contains(base) {
                locations.insert(base.to_string(), next - uniform.size);
            }
        } else {
            if !hidden.contains(&uniform.name) {
                locations.insert(uniform.name.clone(), next);
            }
            next += 1;
        }
    }

    locations
}

impl GraphicsBackend for HeadlessBackend {
    type Program = HeadlessProgram;
    type Stage = HeadlessStage;

    fn create_program(&self) -> Result<HeadlessProgram, String> {
        let mut state = self.state.borrow_mut();
        let id = state.next_id();
        state.programs.insert(id, ProgramState::default());
        Ok(HeadlessProgram(id))
    }

    fn attach_stage(&self, program: HeadlessProgram, stage: HeadlessStage) {
        if let Some(p) = self.state.borrow_mut().programs.get_mut(&program.0) {
            p.attached.push(stage.0);
        }
    }

    fn detach_stage(&self, program: HeadlessProgram, stage: HeadlessStage) {
        if let Some(p) = self.state.borrow_mut().programs.get_mut(&program.0) {
            p.attached.retain(|s| *s != stage.0);
        }
    }

    fn link_program(&self, program: HeadlessProgram) {
        let mut state = self.state.borrow_mut();
        let state = &mut *state;

        let Some(attached) = state.programs.get(&program.0).map(|p| p.attached.clone()) else {
            return;
        };

        let result = if let Some(log) = state.fail_next_link.take() {
            Err(log)
        } else if attached.is_empty() {
            Err("error: no shaders attached".to_string())
        } else if attached
            .iter()
            .any(|s| !state.stages.get(s).is_some_and(|stage| stage.compiled))
        {
            Err("error: attached shader is not compiled".to_string())
        } else {
            let uniforms = match &state.scripted_uniforms {
                Some(list) => list.clone(),
                None => {
                    let mut seen = HashSet::new();
                    attached
                        .iter()
                        .filter_map(|s| state.stages.get(s))
                        .flat_map(|stage| scan_uniforms(&stage.source))
                        .filter(|u| seen.insert(u.name.clone()))
                        .collect()
                }
            };
            Ok(uniforms)
        };

        let hidden = state.hidden_locations.clone();
        if let Some(p) = state.programs.get_mut(&program.0) {
            match result {
                Ok(uniforms) => {
                    p.locations = assign_locations(&uniforms, &hidden);
                    p.uniforms = uniforms;
                    p.linked = true;
                    p.log.clear();
                }
                Err(log) => {
                    p.uniforms.clear();
                    p.locations.clear();
                    p.linked = false;
                    p.log = log;
                }
            }
        }
    }

    fn program_link_status(&self, program: HeadlessProgram) -> bool {
        self.state
            .borrow()
            .programs
            .get(&program.0)
            .is_some_and(|p| p.linked)
    }

    fn program_info_log(&self, program: HeadlessProgram) -> String {
        self.state
            .borrow()
            .programs
            .get(&program.0)
            .map(|p| p.log.clone())
            .unwrap_or_default()
    }

    fn use_program(&self, program: Option<HeadlessProgram>) {
        self.state.borrow_mut().bound = program;
    }

    fn delete_program(&self, program: HeadlessProgram) {
        let mut state = self.state.borrow_mut();
        if state.programs.remove(&program.0).is_some() {
            state.deleted_programs.push(program);
        }
        if state.bound == Some(program) {
            state.bound = None;
        }
    }

    fn create_stage(&self, kind: StageKind) -> Result<HeadlessStage, String> {
        let mut state = self.state.borrow_mut();
        let id = state.next_id();
        state.stages.insert(
            id,
            StageState {
                kind,
                source: String::new(),
                compiled: false,
                log: String::new(),
            },
        );
        Ok(HeadlessStage(id))
    }

    fn stage_source(&self, stage: HeadlessStage, fragments: &[&str]) {
        if let Some(s) = self.state.borrow_mut().stages.get_mut(&stage.0) {
            s.source = fragments.concat();
        }
    }

    fn compile_stage(&self, stage: HeadlessStage) {
        let mut state = self.state.borrow_mut();
        let Some(s) = state.stages.get_mut(&stage.0) else {
            return;
        };
        match check_source(&s.source) {
            Ok(()) => {
                s.compiled = true;
                s.log.clear();
            }
            Err(log) => {
                s.compiled = false;
                s.log = log;
            }
        }
        let entry = (s.kind, s.source.clone());
        state.compiled_sources.push(entry);
    }

    fn stage_compile_status(&self, stage: HeadlessStage) -> bool {
        self.state
            .borrow()
            .stages
            .get(&stage.0)
            .is_some_and(|s| s.compiled)
    }

    fn stage_info_log(&self, stage: HeadlessStage) -> String {
        self.state
            .borrow()
            .stages
            .get(&stage.0)
            .map(|s| s.log.clone())
            .unwrap_or_default()
    }

    fn delete_stage(&self, stage: HeadlessStage) {
        self.state.borrow_mut().stages.remove(&stage.0);
    }

    fn active_uniform_count(&self, program: HeadlessProgram) -> u32 {
        self.state
            .borrow()
            .programs
            .get(&program.0)
            .map_or(0, |p| p.uniforms.len() as u32)
    }

    fn active_uniform(&self, program: HeadlessProgram, index: u32) -> Option<ActiveUniform> {
        self.state
            .borrow()
            .programs
            .get(&program.0)
            .and_then(|p| p.uniforms.get(index as usize).cloned())
    }

    fn uniform_location(&self, program: HeadlessProgram, name: &str) -> Option<u32> {
        self.state
            .borrow()
            .programs
            .get(&program.0)
            .and_then(|p| p.locations.get(name).copied())
    }

    fn uniform_1_f32(&self, location: u32, x: f32) {
        self.state.borrow_mut().record(location, UniformUpload::Float(x));
    }

    fn uniform_1_i32(&self, location: u32, x: i32) {
        self.state.borrow_mut().record(location, UniformUpload::Int(x));
    }

    fn uniform_2_f32(&self, location: u32, x: f32, y: f32) {
        self.state.borrow_mut().record(location, UniformUpload::Vec2([x, y]));
    }

    fn uniform_3_f32(&self, location: u32, x: f32, y: f32, z: f32) {
        self.state
            .borrow_mut()
            .record(location, UniformUpload::Vec3([x, y, z]));
    }

    fn uniform_4_f32(&self, location: u32, x: f32, y: f32, z: f32, w: f32) {
        self.state
            .borrow_mut()
            .record(location, UniformUpload::Vec4([x, y, z, w]));
    }

    fn uniform_matrix_3_f32(&self, location: u32, transpose: bool, data: &[f32; 9]) {
        self.state.borrow_mut().record(
            location,
            UniformUpload::Mat3 {
                transpose,
                data: *data,
            },
        );
    }

    fn uniform_matrix_4_f32(&self, location: u32, transpose: bool, data: &[f32; 16]) {
        self.state.borrow_mut().record(
            location,
            UniformUpload::Mat4 {
                transpose,
                data: *data,
            },
        );
    }
}
