//! WGSL programs must parse, validate, and agree with the uniform tables
//! the scene uploads.

use crystalfx::prelude::*;
use crystalfx::scene::{Material, ShaderProgram};
use crystalfx::shader::{mesh_uniforms, Program};

fn composed() -> Experience {
    let sizes = Sizes::new(800, 600, 1.0);
    let renderer = HeadlessRenderer::new(sizes.width, sizes.height, sizes.pixel_ratio);
    let mut experience = Experience::new(SceneConfig::default(), Box::new(renderer), sizes).unwrap();
    experience.step(16.0).unwrap();
    assert!(experience.world().is_composed());
    experience
}

fn validate(program: Program) {
    let source = program.source();
    let module = naga::front::wgsl::parse_str(&source)
        .unwrap_or_else(|e| panic!("{} failed to parse:\n{}", program.label(), e.emit_to_string(&source)));
    naga::valid::Validator::new(
        naga::valid::ValidationFlags::all(),
        naga::valid::Capabilities::all(),
    )
    .validate(&module)
    .unwrap_or_else(|e| panic!("{} failed validation: {:?}", program.label(), e));
}

#[test]
fn test_all_programs_validate() {
    for program in Program::ALL {
        validate(program);
    }
}

#[test]
fn test_programs_declare_entry_points() {
    for program in Program::ALL {
        let source = program.source();
        assert!(source.contains("fn vs_main"), "{}", program.label());
        assert!(source.contains("fn fs_main"), "{}", program.label());
    }
}

#[test]
fn test_point_tables_match_shader_structs() {
    let experience = composed();
    let scene = experience.scene();

    let mut seen = Vec::new();
    for renderable in scene.renderables() {
        let Some(id) = scene.node(renderable.node).material() else {
            continue;
        };
        let Material::Shader(material) = scene.material(id) else {
            continue;
        };
        let source = Program::Points(material.program).source();
        let fields = material.uniforms.to_wgsl_fields();
        assert!(
            source.contains(&fields),
            "{:?} struct does not match its table:\n{}",
            material.program,
            fields
        );
        seen.push(material.program);
    }

    assert!(seen.contains(&ShaderProgram::EnergyField));
    assert!(seen.contains(&ShaderProgram::AmbientParticles));
}

#[test]
fn test_mesh_table_matches_shader_struct() {
    let experience = composed();
    let scene = experience.scene();
    let core = scene.find("Core").unwrap();
    let material = scene.node(core).material().unwrap();
    let Material::Standard(standard) = scene.material(material) else {
        panic!("crystal core should use a standard material");
    };

    let table = mesh_uniforms(standard, &scene.lights());
    assert!(Program::Mesh.source().contains(&table.to_wgsl_fields()));
}

#[test]
fn test_field_table_layout() {
    let experience = composed();
    let field = &experience.world().fields()[0];
    let material = experience.scene().material(field.material()).as_shader().unwrap();

    let names: Vec<_> = material.uniforms.iter().map(|(name, _)| name).collect();
    assert_eq!(
        names,
        vec![
            "uTime",
            "uPixelRatio",
            "uSize",
            "uSeed",
            "uOpacity",
            "uColor",
            "uSpeed",
            "uPerlinMultiplier",
            "uPerlinFrequency",
            "uTimeFrequency",
            "uPointA",
            "uPointB",
            "uControlPoint1",
            "uControlPoint2",
        ]
    );
    assert_eq!(material.uniforms.byte_size(), 128);
}
