use std::borrow::Cow;

use wgpu::naga;

use crate::error::{RenderError, RenderResult, ShaderStage};
use crate::gpu::UNIFORM_NAMES;

/// Sampler uniform name the fragment program reads the source image from.
pub const IMAGE_SAMPLER_NAME: &str = "u_image_texture";

/// Compiles the fixed full-screen quad vertex stage.
pub(crate) fn compile_vertex_shader(device: &wgpu::Device) -> RenderResult<wgpu::ShaderModule> {
    compile_glsl(
        device,
        "liquid quad vertex",
        Cow::Borrowed(VERTEX_SHADER_GLSL),
        ShaderStage::Vertex,
    )
}

/// Wraps the external fragment program with the uniform prelude and compiles it.
pub(crate) fn compile_fragment_shader(
    device: &wgpu::Device,
    source: &str,
) -> RenderResult<wgpu::ShaderModule> {
    let wrapped = wrap_fragment_program(source);
    tracing::trace!(lines = wrapped.lines().count(), "wrapped fragment program");
    compile_glsl(
        device,
        "liquid fragment",
        Cow::Owned(wrapped),
        ShaderStage::Fragment,
    )
}

fn compile_glsl(
    device: &wgpu::Device,
    label: &str,
    source: Cow<'_, str>,
    stage: ShaderStage,
) -> RenderResult<wgpu::ShaderModule> {
    let naga_stage = match stage {
        ShaderStage::Vertex => naga::ShaderStage::Vertex,
        ShaderStage::Fragment => naga::ShaderStage::Fragment,
    };
    device.push_error_scope(wgpu::ErrorFilter::Validation);
    let module = device.create_shader_module(wgpu::ShaderModuleDescriptor {
        label: Some(label),
        source: wgpu::ShaderSource::Glsl {
            shader: source,
            stage: naga_stage,
            defines: &[],
        },
    });
    match pollster::block_on(device.pop_error_scope()) {
        Some(error) => Err(RenderError::ShaderCompileFailed {
            stage,
            diagnostic: error.to_string(),
        }),
        None => Ok(module),
    }
}

/// Produces Vulkan-flavoured GLSL from a GLSL ES 3.00 liquid program.
///
/// 1. `#version`, `precision` and contract `uniform` lines are blanked so
///    line numbers in diagnostics still match the caller's source.
/// 2. [`HEADER`] declares the uniform block and texture bindings and aliases
///    every contract name onto them.
/// 3. Top-level `in`/`out` declarations gain explicit locations.
pub fn wrap_fragment_program(source: &str) -> String {
    let mut body = String::with_capacity(source.len() + 64);
    let mut depth: i32 = 0;
    let mut next_in = 0u32;
    let mut next_out = 0u32;

    for line in source.lines() {
        let trimmed = line.trim_start();
        let top_level = depth == 0;
        depth += line.matches('{').count() as i32 - line.matches('}').count() as i32;

        if top_level && (trimmed.starts_with("#version") || trimmed.starts_with("precision ")) {
            body.push('\n');
            continue;
        }
        if top_level && is_contract_uniform(trimmed) {
            body.push('\n');
            continue;
        }
        if top_level && trimmed.starts_with("in ") {
            body.push_str(&format!("layout(location = {next_in}) {trimmed}\n"));
            next_in += 1;
            continue;
        }
        if top_level && trimmed.starts_with("out ") {
            body.push_str(&format!("layout(location = {next_out}) {trimmed}\n"));
            next_out += 1;
            continue;
        }
        body.push_str(line);
        body.push('\n');
    }

    format!("{HEADER}\n#line 1\n{body}")
}

fn is_contract_uniform(trimmed: &str) -> bool {
    let Some(rest) = trimmed.strip_prefix("uniform ") else {
        return false;
    };
    rest.split(|c: char| !(c.is_ascii_alphanumeric() || c == '_'))
        .any(|token| token == IMAGE_SAMPLER_NAME || UNIFORM_NAMES.iter().any(|name| *name == token))
}

/// Uniform prelude. Field order must match `LiquidUniforms`.
const HEADER: &str = r"#version 450
layout(std140, set = 0, binding = 0) uniform LiquidParams {
    float _u_time;
    float _u_ratio;
    float _u_img_ratio;
    float _u_patternScale;
    float _u_refraction;
    float _u_edge;
    float _u_patternBlur;
    float _u_liquid;
} liquid_params;

#define u_time liquid_params._u_time
#define u_ratio liquid_params._u_ratio
#define u_img_ratio liquid_params._u_img_ratio
#define u_patternScale liquid_params._u_patternScale
#define u_refraction liquid_params._u_refraction
#define u_edge liquid_params._u_edge
#define u_patternBlur liquid_params._u_patternBlur
#define u_liquid liquid_params._u_liquid

layout(set = 1, binding = 0) uniform texture2D liquid_image_texture;
layout(set = 1, binding = 1) uniform sampler liquid_image_sampler;
#define u_image_texture sampler2D(liquid_image_texture, liquid_image_sampler)
";

/// Quad vertex stage: clip-space position in, `0.5 * (position + 1)` UV out.
const VERTEX_SHADER_GLSL: &str = r"#version 450
layout(location = 0) in vec2 a_position;
layout(location = 0) out vec2 vUv;

void main() {
    vUv = 0.5 * (a_position + 1.0);
    gl_Position = vec4(a_position, 0.0, 1.0);
}
";

#[cfg(test)]
mod tests {
    use super::*;

    const SOURCE: &str = "#version 300 es
precision mediump float;

in vec2 vUv;
out vec4 fragColor;

uniform sampler2D u_image_texture;
uniform float u_time;
uniform float u_ratio, u_img_ratio;
uniform float u_myExtra;

void main() {
    vec4 img = texture(u_image_texture, vUv);
    fragColor = img * u_liquid;
}
";

    #[test]
    fn contract_declarations_are_blanked() {
        let wrapped = wrap_fragment_program(SOURCE);
        assert!(!wrapped.contains("#version 300 es"));
        assert!(!wrapped.contains("precision mediump"));
        assert!(!wrapped.contains("uniform sampler2D u_image_texture"));
        assert!(!wrapped.contains("uniform float u_time;"));
        assert!(!wrapped.contains("uniform float u_ratio, u_img_ratio;"));
        assert!(wrapped.contains("uniform float u_myExtra;"));
        assert!(wrapped.starts_with("#version 450"));
    }

    #[test]
    fn line_numbers_are_preserved() {
        let wrapped = wrap_fragment_program(SOURCE);
        let body = wrapped.split("#line 1\n").nth(1).unwrap();
        assert_eq!(body.lines().count(), SOURCE.lines().count());
        let original = SOURCE.lines().position(|l| l.contains("texture(")).unwrap();
        let wrapped_pos = body.lines().position(|l| l.contains("texture(")).unwrap();
        assert_eq!(original, wrapped_pos);
    }

    #[test]
    fn varyings_get_locations() {
        let wrapped = wrap_fragment_program(SOURCE);
        assert!(wrapped.contains("layout(location = 0) in vec2 vUv;"));
        assert!(wrapped.contains("layout(location = 0) out vec4 fragColor;"));
    }

    #[test]
    fn header_aliases_every_contract_name() {
        for name in UNIFORM_NAMES.iter().chain([&IMAGE_SAMPLER_NAME]) {
            assert!(HEADER.contains(&format!("#define {name} ")), "{name}");
        }
    }

    #[test]
    fn nested_declarations_are_untouched() {
        let source = "void main() {\n    out_value = 1.0;\n}\n";
        let wrapped = wrap_fragment_program(source);
        assert!(wrapped.contains("    out_value = 1.0;"));
    }
}
