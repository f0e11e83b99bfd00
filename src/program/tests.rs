use super::*;
use crate::backend::headless::{UniformUpload, UploadCall};
use crate::backend::HeadlessBackend;
use crate::slot::NamedSlot;
use crate::value::SamplerBinding;
use glam::{Mat3, Mat4, Vec2, Vec3, Vec4};
use std::fs;
use tempfile::TempDir;

const BASIC: &str = r#"{"glsl_version": "330 core", "vertex": "basic.vert", "fragment": "basic.frag"}"#;
const VERT: &str = "uniform mat4 u_mvp;\nvoid main() {}\n";

struct Fixture {
    _dir: TempDir,
    ctx: ShaderContext<HeadlessBackend>,
}

impl Fixture {
    fn new() -> Self {
        Self::with_config(|_| {})
    }

    fn with_config(tweak: impl FnOnce(&mut ShaderConfig)) -> Self {
        let _ = env_logger::builder().is_test(true).try_init();
        let dir = TempDir::new().unwrap();
        let mut config = ShaderConfig::with_source_root(dir.path());
        tweak(&mut config);
        Self {
            _dir: dir,
            ctx: ShaderContext::new(HeadlessBackend::new(), config),
        }
    }

    fn write(&self, name: &str, text: &str) {
        fs::write(self.ctx.config().source_root.join(name), text).unwrap();
    }

    /// `basic.json` with the given fragment source
    fn basic(&self, frag: &str) -> Shader<HeadlessBackend> {
        self.write("basic.json", BASIC);
        self.write("basic.vert", VERT);
        self.write("basic.frag", frag);
        self.ctx.load_shader("basic.json").unwrap()
    }

    fn backend(&self) -> &HeadlessBackend {
        self.ctx.backend()
    }
}

fn names(shader: &Shader<HeadlessBackend>) -> Vec<String> {
    shader
        .uniforms()
        .iter()
        .map(|u| u.name().as_str().to_string())
        .collect()
}

#[test]
fn test_first_compile_lists_uniforms_in_driver_order() {
    let fx = Fixture::new();
    let shader = fx.basic("uniform vec3 u_color;\nuniform sampler2D u_albedo;\n");

    assert!(shader.is_valid());
    assert!(!shader.needs_recompile());
    assert_eq!(shader.label(), "basic");
    assert_eq!(names(&shader), vec!["u_mvp", "u_color", "u_albedo"]);

    let locations: Vec<_> = shader.uniforms().iter().map(|u| u.location()).collect();
    assert_eq!(locations, vec![Some(0), Some(1), Some(2)]);
    assert_eq!(shader.uniforms()[2].sampler_index(), Some(0));

    let vert = shader.generated_source(StageKind::Vertex).unwrap();
    assert!(vert.starts_with("#version 330 core\n"));
    assert!(vert.ends_with(VERT));
    assert!(shader.generated_source(StageKind::Geometry).is_none());
    assert_eq!(fx.backend().live_stages(), 0);
}

#[test]
fn test_values_survive_recompile_when_type_is_stable() {
    let fx = Fixture::new();
    let mut shader = fx.basic("uniform vec3 u_color;\n");
    let color = shader.uniform_handle("u_color").unwrap();

    shader.set_uniform(&color, Vec3::new(1.0, 0.0, 0.0)).unwrap();
    shader.compile().unwrap();

    assert_eq!(shader.uniform::<Vec3>(&color).unwrap(), Vec3::new(1.0, 0.0, 0.0));
}

#[test]
fn test_type_change_resets_value() {
    let fx = Fixture::new();
    let mut shader = fx.basic("uniform float u_scale;\n");
    let scale = shader.uniform_handle("u_scale").unwrap();
    shader.set_uniform(&scale, 3.0f32).unwrap();

    fx.write("basic.frag", "uniform int u_scale;\n");
    shader.compile().unwrap();

    assert_eq!(shader.uniform::<i32>(&scale).unwrap(), 0);
    let err = shader.uniform::<f32>(&scale).unwrap_err();
    assert!(matches!(
        err,
        ShaderError::TypeMismatch { expected: ValueType::Int, actual: ValueType::Float, .. }
    ));
}

#[test]
fn test_handles_follow_their_uniform_across_relinks() {
    let fx = Fixture::new();
    let mut shader = fx.basic("uniform float u_a;\nuniform float u_b;\n");
    let b = shader.uniform_handle("u_b").unwrap();
    assert_eq!(b.cached_index(), Some(2));
    shader.set_uniform(&b, 0.5f32).unwrap();

    fx.write(
        "basic.frag",
        "uniform vec2 u_new0;\nuniform vec2 u_new1;\nuniform float u_b;\n",
    );
    shader.compile().unwrap();

    assert_eq!(shader.uniform::<f32>(&b).unwrap(), 0.5);
    assert_eq!(b.cached_index(), Some(3));

    let a = UniformHandle::new(fx.ctx.names().intern("u_a"));
    assert!(matches!(
        shader.uniform::<f32>(&a),
        Err(ShaderError::NameNotFound { .. })
    ));
}

#[test]
fn test_arrays_expand_to_one_slot_per_element() {
    let fx = Fixture::new();
    let mut shader = fx.basic("uniform vec4 u_lights[3];\n");

    assert_eq!(
        names(&shader),
        vec!["u_mvp", "u_lights[0]", "u_lights[1]", "u_lights[2]"]
    );
    let last = shader.uniform_handle("u_lights[2]").unwrap();
    shader.set_uniform(&last, Vec4::ONE).unwrap();
    assert_eq!(shader.uniforms()[3].location(), Some(3));
}

#[test]
fn test_sampler_units_are_stable_across_relinks() {
    let fx = Fixture::new();
    let shader_src = "uniform sampler2D u_a;\nuniform sampler2D u_b;\n";
    let mut shader = fx.basic(shader_src);
    let b = shader.uniform_handle("u_b").unwrap();
    assert_eq!(shader.sampler_index(&b).unwrap(), 1);
    shader.set_texture(&b, 42).unwrap();

    fx.write("basic.frag", "uniform sampler2D u_new;\nuniform sampler2D u_b;\n");
    shader.compile().unwrap();

    assert_eq!(shader.sampler_index(&b).unwrap(), 1);
    let new = shader.uniform_handle("u_new").unwrap();
    assert_eq!(shader.sampler_index(&new).unwrap(), 0);
    assert_eq!(
        shader.uniform::<SamplerBinding>(&b).unwrap(),
        SamplerBinding::new(1, 42)
    );
}

#[test]
fn test_define_change_regenerates_source() {
    let fx = Fixture::new();
    fx.write(
        "lit.json",
        r#"{
            "glsl_version": "450",
            "definitions": [
                {"name": "N", "type": "int", "default": 3},
                {"name": "TINT", "type": "vec3", "default": [1.0, 0.5, 0.0]}
            ],
            "vertex": "basic.vert",
            "fragment": "lit.frag"
        }"#,
    );
    fx.write("basic.vert", VERT);
    fx.write("lit.frag", "uniform float u_x;\n");
    let mut shader = fx.ctx.load_shader("lit.json").unwrap();

    let frag = shader.generated_source(StageKind::Fragment).unwrap();
    assert!(frag.starts_with("#version 450\n#define N 3\n#define TINT vec3(1.0, 0.5, 0.0)\n"));

    let n = shader.define_handle("N").unwrap();
    shader.set_define_value(&n, 7i32).unwrap();
    assert!(shader.needs_recompile());

    let err = shader.set_define_value(&n, 7.0f32).unwrap_err();
    assert!(matches!(err, ShaderError::TypeMismatch { .. }));

    assert!(shader.recompile_if_needed().unwrap());
    assert!(!shader.needs_recompile());
    assert!(!shader.recompile_if_needed().unwrap());

    let last = fx.backend().last_source(StageKind::Fragment).unwrap();
    assert!(last.contains("#define N 7\n"));
    assert!(!last.contains("#define N 3\n"));
    assert_eq!(shader.define_value::<i32>(&n).unwrap(), 7);
    assert_eq!(shader.defines().len(), 2);
}

#[test]
fn test_first_compile_failure_constructs_nothing() {
    let fx = Fixture::new();
    fx.write("basic.json", BASIC);
    fx.write("basic.vert", VERT);
    fx.write("basic.frag", "#error not yet\n");

    let err = fx.ctx.load_shader("basic.json").err().unwrap();
    match err {
        ShaderError::StageCompileError { shader, stage, log } => {
            assert_eq!(shader, "basic");
            assert_eq!(stage, StageKind::Fragment);
            assert!(log.contains("not yet"));
        }
        other => panic!("unexpected error: {other}"),
    }
    assert_eq!(fx.backend().live_programs(), 0);
    assert_eq!(fx.backend().live_stages(), 0);
}

#[test]
fn test_later_compile_failure_invalidates_until_fixed() {
    let fx = Fixture::new();
    let mut shader = fx.basic("uniform float u_time;\n");
    let time = shader.uniform_handle("u_time").unwrap();
    shader.set_uniform(&time, 1.5f32).unwrap();

    fx.write("basic.frag", "uniform float u_time;\n#error typo\n");
    assert!(shader.compile().is_err());
    assert!(!shader.is_valid());
    assert_eq!(fx.backend().live_programs(), 0);

    for result in [
        shader.use_program(),
        shader.send_all(),
        shader.send_one(&time),
        shader.set_uniform(&time, 2.0f32),
    ] {
        assert!(matches!(result, Err(ShaderError::InvalidProgram { .. })));
    }
    assert!(matches!(
        shader.uniform::<f32>(&time),
        Err(ShaderError::InvalidProgram { .. })
    ));

    fx.write("basic.frag", "uniform float u_time;\n");
    shader.compile().unwrap();
    assert!(shader.is_valid());
    assert_eq!(shader.uniform::<f32>(&time).unwrap(), 1.5);
}

#[test]
fn test_link_failure_reports_program_log() {
    let fx = Fixture::new();
    let mut shader = fx.basic("uniform float u_time;\n");

    fx.backend().fail_next_link("varying v_uv not written");
    let err = shader.compile().unwrap_err();
    assert!(matches!(
        err,
        ShaderError::LinkError { ref log, .. } if log == "varying v_uv not written"
    ));
    assert_eq!(fx.backend().live_programs(), 0);
    assert_eq!(fx.backend().live_stages(), 0);
}

#[test]
fn test_send_all_uploads_located_slots_once() {
    let fx = Fixture::new();
    fx.backend().hide_location("u_hidden");
    fx.write("basic.json", BASIC);
    fx.write("basic.vert", "void main() {}\n");
    fx.write("basic.frag", "uniform vec3 u_color;\nuniform float u_hidden;\n");
    let mut shader = fx.ctx.load_shader("basic.json").unwrap();

    let color = shader.uniform_handle("u_color").unwrap();
    let hidden = shader.uniform_handle("u_hidden").unwrap();
    shader.set_uniform(&color, Vec3::new(0.25, 0.5, 1.0)).unwrap();
    shader.set_uniform(&hidden, 8.0f32).unwrap();
    assert!(fx.backend().uploads().is_empty(), "writes are deferred");

    shader.use_program().unwrap();
    shader.send_all().unwrap();

    assert_eq!(
        fx.backend().take_uploads(),
        vec![UploadCall {
            program: shader.program(),
            location: 0,
            upload: UniformUpload::Vec3([0.25, 0.5, 1.0]),
        }]
    );

    shader.send_one(&hidden).unwrap();
    assert!(fx.backend().uploads().is_empty());
}

#[test]
fn test_matrices_and_samplers_upload_by_type() {
    let fx = Fixture::with_config(|c| c.transpose_matrices = true);
    fx.write("basic.json", BASIC);
    fx.write("basic.vert", "void main() {}\n");
    fx.write(
        "basic.frag",
        "uniform mat3 u_normal;\nuniform sampler2D u_a;\nuniform sampler2D u_b;\n",
    );
    let shader = fx.ctx.load_shader("basic.json").unwrap();
    let b = shader.uniform_handle("u_b").unwrap();

    shader.send_one(&b).unwrap();
    shader.send_one(&shader.uniform_handle("u_normal").unwrap()).unwrap();

    let calls: Vec<_> = fx.backend().take_uploads().into_iter().map(|c| c.upload).collect();
    assert_eq!(
        calls,
        vec![
            UniformUpload::Int(1),
            UniformUpload::Mat3 {
                transpose: true,
                data: [0.0; 9],
            },
        ]
    );
}

#[test]
fn test_every_value_type_round_trips() {
    let fx = Fixture::new();
    let mut shader = fx.basic(
        "uniform float u_f;\nuniform int u_i;\nuniform vec2 u_v2;\nuniform vec3 u_v3;\n\
         uniform vec4 u_v4;\nuniform mat3 u_m3;\nuniform sampler2D u_s;\n",
    );
    let h = |name: &str| shader.uniform_handle(name).unwrap();
    let (f, i, v2, v3, v4, m3, m4, s) = (
        h("u_f"),
        h("u_i"),
        h("u_v2"),
        h("u_v3"),
        h("u_v4"),
        h("u_m3"),
        h("u_mvp"),
        h("u_s"),
    );

    let mat3 = Mat3::from_cols_array(&[1.0, 2.0, 3.0, 4.0, 5.0, 6.0, 7.0, 8.0, 9.0]);
    let mat4 = Mat4::from_translation(Vec3::new(1.0, 2.0, 3.0));
    shader.set_uniform(&f, -0.5f32).unwrap();
    shader.set_uniform(&i, -3i32).unwrap();
    shader.set_uniform(&v2, Vec2::new(1.0, 2.0)).unwrap();
    shader.set_uniform(&v3, Vec3::Z).unwrap();
    shader.set_uniform(&v4, Vec4::new(1.0, 2.0, 3.0, 4.0)).unwrap();
    shader.set_uniform(&m3, mat3).unwrap();
    shader.set_uniform(&m4, mat4).unwrap();
    shader.set_uniform(&s, SamplerBinding::new(5, 99)).unwrap();

    assert_eq!(shader.uniform::<f32>(&f).unwrap(), -0.5);
    assert_eq!(shader.uniform::<i32>(&i).unwrap(), -3);
    assert_eq!(shader.uniform::<Vec2>(&v2).unwrap(), Vec2::new(1.0, 2.0));
    assert_eq!(shader.uniform::<Vec3>(&v3).unwrap(), Vec3::Z);
    assert_eq!(shader.uniform::<Vec4>(&v4).unwrap(), Vec4::new(1.0, 2.0, 3.0, 4.0));
    assert_eq!(shader.uniform::<Mat3>(&m3).unwrap(), mat3);
    assert_eq!(shader.uniform::<Mat4>(&m4).unwrap(), mat4);
    assert_eq!(shader.uniform::<SamplerBinding>(&s).unwrap(), SamplerBinding::new(5, 99));
    assert_eq!(shader.sampler_index(&s).unwrap(), 5);
}

#[test]
fn test_wrong_type_is_rejected_and_value_kept() {
    let fx = Fixture::new();
    let mut shader = fx.basic("uniform vec3 u_color;\n");
    let color = shader.uniform_handle("u_color").unwrap();
    shader.set_uniform(&color, Vec3::X).unwrap();

    let err = shader.set_uniform(&color, Vec4::ONE).unwrap_err();
    assert!(matches!(
        err,
        ShaderError::TypeMismatch { expected: ValueType::Vec3, actual: ValueType::Vec4, .. }
    ));
    assert!(shader.set_uniform_value(&color, Value::Float(1.0)).is_err());
    assert!(shader.sampler_index(&color).is_err());
    assert!(shader.set_texture(&color, 3).is_err());
    assert_eq!(shader.uniform::<Vec3>(&color).unwrap(), Vec3::X);
}

#[test]
fn test_dynamic_and_raw_access() {
    let fx = Fixture::new();
    let mut shader = fx.basic("uniform vec2 u_offset;\n");
    let offset = shader.uniform_handle("u_offset").unwrap();

    let value = Value::Vec2(Vec2::new(3.0, 4.0));
    shader.set_uniform_bytes(&offset, value.as_bytes()).unwrap();
    assert_eq!(shader.uniform_value(&offset).unwrap(), value);

    assert!(shader.set_uniform_bytes(&offset, &[0u8; 12]).is_err());
    shader
        .set_uniform_value(&offset, Value::Vec2(Vec2::ONE))
        .unwrap();
    assert_eq!(shader.uniform::<Vec2>(&offset).unwrap(), Vec2::ONE);
}

#[test]
fn test_unknown_names_fail_fast() {
    let fx = Fixture::new();
    let shader = fx.basic("uniform float u_time;\n");

    assert!(matches!(
        shader.uniform_handle("u_missing"),
        Err(ShaderError::NameNotFound { ref name }) if name == "u_missing"
    ));
    assert!(matches!(
        shader.define_handle("u_time"),
        Err(ShaderError::NameNotFound { .. })
    ));
}

#[test]
fn test_missing_stage_file_is_file_not_found() {
    let fx = Fixture::new();
    fx.write("basic.json", BASIC);
    fx.write("basic.vert", VERT);

    let err = fx.ctx.load_shader("basic.json").err().unwrap();
    match err {
        ShaderError::FileNotFound { path } => assert!(path.ends_with("basic.frag")),
        other => panic!("unexpected error: {other}"),
    }
}

#[test]
fn test_bad_definitions_are_rejected() {
    let fx = Fixture::new();
    fx.write("basic.vert", VERT);
    fx.write(
        "bad.json",
        r#"{"glsl_version": "330", "vertex": "basic.vert",
            "definitions": [{"name": "N", "type": "int", "default": [1, 2]}]}"#,
    );
    assert!(matches!(
        fx.ctx.load_shader("bad.json"),
        Err(ShaderError::InvalidDescriptor { .. })
    ));

    fx.write("broken.json", "{ \"glsl_version\": ");
    assert!(matches!(
        fx.ctx.load_shader("broken.json"),
        Err(ShaderError::JsonParseError { .. })
    ));
}

#[test]
fn test_drop_deletes_program_once() {
    let fx = Fixture::new();
    let mut shader = fx.basic("uniform float u_time;\n");
    let first = shader.program().unwrap();
    shader.compile().unwrap();
    let second = shader.program().unwrap();
    assert_ne!(first, second);
    assert_eq!(fx.backend().live_programs(), 1);

    drop(shader);
    assert_eq!(fx.backend().deleted_programs(), vec![first, second]);
    assert_eq!(fx.backend().live_programs(), 0);
}

#[test]
fn test_notify_changed_matches_source_files() {
    let fx = Fixture::new();
    let mut shader = fx.basic("uniform float u_time;\n");
    let root = fx.ctx.config().source_root.clone();

    assert_eq!(shader.source_files().len(), 3);
    assert!(!shader.notify_changed(&[root.join("other.frag")]));
    assert!(!shader.needs_recompile());

    assert!(shader.notify_changed(&[root.join("basic.frag")]));
    assert!(shader.needs_recompile());
    assert!(shader.recompile_if_needed().unwrap());
    assert!(!shader.needs_recompile());
}

#[test]
fn test_unsupported_uniform_types_get_no_slot() {
    let fx = Fixture::new();
    let shader = fx.basic("uniform bool u_flag;\nuniform sampler1D u_lut;\nuniform float u_x;\n");

    assert_eq!(names(&shader), vec!["u_mvp", "u_x"]);
    assert!(matches!(
        shader.uniform_handle("u_flag"),
        Err(ShaderError::NameNotFound { .. })
    ));
    assert!(shader.uniform_handle("u_lut").is_err());
}

#[test]
fn test_array_reported_without_index_suffix() {
    use crate::backend::{gl_types, ActiveUniform};

    let fx = Fixture::new();
    fx.backend().script_uniforms(Some(vec![
        ActiveUniform {
            name: "u_c".to_string(),
            gl_type: gl_types::FLOAT_VEC2,
            size: 2,
        },
        ActiveUniform {
            name: "u_t".to_string(),
            gl_type: gl_types::FLOAT,
            size: 1,
        },
    ]));
    let mut shader = fx.basic("void main() {}\n");

    assert_eq!(names(&shader), vec!["u_c[0]", "u_c[1]", "u_t"]);
    let locations: Vec<_> = shader.uniforms().iter().map(|u| u.location()).collect();
    assert_eq!(locations, vec![Some(0), Some(1), Some(2)]);

    let second = shader.uniform_handle("u_c[1]").unwrap();
    shader.set_uniform(&second, Vec2::new(0.5, 2.0)).unwrap();
    assert_eq!(shader.uniform::<Vec2>(&second).unwrap(), Vec2::new(0.5, 2.0));
}

#[test]
fn test_non_finite_define_is_refused() {
    let fx = Fixture::new();
    fx.write(
        "fog.json",
        r#"{
            "glsl_version": "330",
            "definitions": [{"name": "DENSITY", "type": "float", "default": 0.5}],
            "vertex": "basic.vert"
        }"#,
    );
    fx.write("basic.vert", VERT);
    let mut shader = fx.ctx.load_shader("fog.json").unwrap();
    let density = shader.define_handle("DENSITY").unwrap();

    let err = shader.set_define_value(&density, f32::INFINITY).unwrap_err();
    assert!(matches!(err, ShaderError::InvalidDefineValue { .. }));
    assert!(shader.set_define_value(&density, f32::NAN).is_err());
    assert!(!shader.needs_recompile());
    assert_eq!(shader.define_value::<f32>(&density).unwrap(), 0.5);

    shader.compile().unwrap();
    let vert = shader.generated_source(StageKind::Vertex).unwrap();
    assert!(vert.contains("#define DENSITY 0.5\n"));
}
