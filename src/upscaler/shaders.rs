//! WGSL shader sources, held as Rust string constants and concatenated at
//! pipeline-build time, the same pattern `nethercore_zx::graphics::epu::pipelines`
//! uses for its compute shaders (`EPU_COMMON` + per-pass body).

pub(crate) const COMMON: &str = r#"
struct Params {
    in_width: u32,
    in_height: u32,
    out_width: u32,
    out_height: u32,
    half_taps: u32,
    _pad0: u32,
    _pad1: u32,
    _pad2: u32,
};

@group(0) @binding(0) var input_tex: texture_2d<f32>;
@group(0) @binding(1) var output_tex: texture_storage_2d<rgba8unorm, write>;
@group(0) @binding(2) var<uniform> params: Params;
"#;

pub(crate) const NEAREST_MAIN: &str = r#"
@compute @workgroup_size(8, 8, 1)
fn main(@builtin(global_invocation_id) gid: vec3<u32>) {
    if (gid.x >= params.out_width || gid.y >= params.out_height) {
        return;
    }
    let scale_x = f32(params.in_width) / f32(params.out_width);
    let scale_y = f32(params.in_height) / f32(params.out_height);
    let src_x = u32(floor((f32(gid.x) + 0.5) * scale_x));
    let src_y = u32(floor((f32(gid.y) + 0.5) * scale_y));
    let clamped_x = min(src_x, params.in_width - 1u);
    let clamped_y = min(src_y, params.in_height - 1u);
    let color = textureLoad(input_tex, vec2<i32>(i32(clamped_x), i32(clamped_y)), 0);
    textureStore(output_tex, vec2<i32>(i32(gid.x), i32(gid.y)), color);
}
"#;

pub(crate) const BILINEAR_MAIN: &str = r#"
@compute @workgroup_size(8, 8, 1)
fn main(@builtin(global_invocation_id) gid: vec3<u32>) {
    if (gid.x >= params.out_width || gid.y >= params.out_height) {
        return;
    }
    let scale_x = f32(params.in_width) / f32(params.out_width);
    let scale_y = f32(params.in_height) / f32(params.out_height);
    let src_xf = (f32(gid.x) + 0.5) * scale_x - 0.5;
    let src_yf = (f32(gid.y) + 0.5) * scale_y - 0.5;
    let x0 = i32(floor(src_xf));
    let y0 = i32(floor(src_yf));
    let fx = src_xf - f32(x0);
    let fy = src_yf - f32(y0);
    let max_x = i32(params.in_width) - 1;
    let max_y = i32(params.in_height) - 1;
    let x0c = clamp(x0, 0, max_x);
    let x1c = clamp(x0 + 1, 0, max_x);
    let y0c = clamp(y0, 0, max_y);
    let y1c = clamp(y0 + 1, 0, max_y);
    let c00 = textureLoad(input_tex, vec2<i32>(x0c, y0c), 0);
    let c10 = textureLoad(input_tex, vec2<i32>(x1c, y0c), 0);
    let c01 = textureLoad(input_tex, vec2<i32>(x0c, y1c), 0);
    let c11 = textureLoad(input_tex, vec2<i32>(x1c, y1c), 0);
    let top = mix(c00, c10, fx);
    let bottom = mix(c01, c11, fx);
    let color = mix(top, bottom, fy);
    textureStore(output_tex, vec2<i32>(i32(gid.x), i32(gid.y)), color);
}
"#;

pub(crate) const LANCZOS_MAIN: &str = r#"
fn sinc(x: f32) -> f32 {
    if (abs(x) < 0.0001) {
        return 1.0;
    }
    let px = 3.14159265 * x;
    return sin(px) / px;
}

fn lanczos_weight(x: f32, a: f32) -> f32 {
    if (abs(x) >= a) {
        return 0.0;
    }
    return sinc(x) * sinc(x / a);
}

@compute @workgroup_size(8, 8, 1)
fn main(@builtin(global_invocation_id) gid: vec3<u32>) {
    if (gid.x >= params.out_width || gid.y >= params.out_height) {
        return;
    }
    let scale_x = f32(params.in_width) / f32(params.out_width);
    let scale_y = f32(params.in_height) / f32(params.out_height);
    let src_xf = (f32(gid.x) + 0.5) * scale_x - 0.5;
    let src_yf = (f32(gid.y) + 0.5) * scale_y - 0.5;
    let a = f32(params.half_taps);
    let x_center = i32(floor(src_xf));
    let y_center = i32(floor(src_yf));
    let max_x = i32(params.in_width) - 1;
    let max_y = i32(params.in_height) - 1;
    let taps = i32(params.half_taps);

    var sum = vec4<f32>(0.0, 0.0, 0.0, 0.0);
    var weight_sum = 0.0;
    for (var dy = -taps + 1; dy <= taps; dy = dy + 1) {
        let sy = clamp(y_center + dy, 0, max_y);
        let wy = lanczos_weight(src_yf - f32(y_center + dy), a);
        for (var dx = -taps + 1; dx <= taps; dx = dx + 1) {
            let sx = clamp(x_center + dx, 0, max_x);
            let wx = lanczos_weight(src_xf - f32(x_center + dx), a);
            let w = wx * wy;
            sum = sum + textureLoad(input_tex, vec2<i32>(sx, sy), 0) * w;
            weight_sum = weight_sum + w;
        }
    }

    var color = sum;
    if (weight_sum > 0.0001) {
        color = sum / weight_sum;
    }
    color = clamp(color, vec4<f32>(0.0, 0.0, 0.0, 0.0), vec4<f32>(1.0, 1.0, 1.0, 1.0));
    textureStore(output_tex, vec2<i32>(i32(gid.x), i32(gid.y)), color);
}
"#;
