//! Motion-compensated blend compute shader for [`super::FrameInterpolator`].

pub(crate) const MAIN: &str = r#"
struct Params {
    width: u32,
    height: u32,
    t_fixed: u32,
    search_radius: u32,
};

@group(0) @binding(0) var tex_a: texture_2d<f32>;
@group(0) @binding(1) var tex_b: texture_2d<f32>;
@group(0) @binding(2) var tex_out: texture_storage_2d<rgba8unorm, write>;
@group(0) @binding(3) var<uniform> params: Params;

fn luma(c: vec4<f32>) -> f32 {
    return dot(c.rgb, vec3<f32>(0.299, 0.587, 0.114));
}

@compute @workgroup_size(8, 8, 1)
fn main(@builtin(global_invocation_id) gid: vec3<u32>) {
    if (gid.x >= params.width || gid.y >= params.height) {
        return;
    }
    let max_x = i32(params.width) - 1;
    let max_y = i32(params.height) - 1;
    let px = i32(gid.x);
    let py = i32(gid.y);
    let t = f32(params.t_fixed) / 1000.0;

    let a_center = textureLoad(tex_a, vec2<i32>(px, py), 0);

    var best_sad = 1.0e9;
    var best_dx = 0;
    var best_dy = 0;
    let r = i32(params.search_radius);
    for (var dy = -r; dy <= r; dy = dy + 1) {
        for (var dx = -r; dx <= r; dx = dx + 1) {
            let sx = clamp(px + dx, 0, max_x);
            let sy = clamp(py + dy, 0, max_y);
            let b_sample = textureLoad(tex_b, vec2<i32>(sx, sy), 0);
            let sad = abs(luma(b_sample) - luma(a_center));
            if (sad < best_sad) {
                best_sad = sad;
                best_dx = dx;
                best_dy = dy;
            }
        }
    }

    let matched_x = clamp(px + best_dx, 0, max_x);
    let matched_y = clamp(py + best_dy, 0, max_y);
    let b_sample = textureLoad(tex_b, vec2<i32>(matched_x, matched_y), 0);
    let color = mix(a_center, b_sample, t);
    textureStore(tex_out, vec2<i32>(px, py), color);
}
"#;
