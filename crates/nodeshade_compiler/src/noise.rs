// SPDX-License-Identifier: MIT OR Apache-2.0
//! Fixed-seed procedural noise for CPU preview sampling.
//!
//! Permutation-table gradient noise with fractal-sum and cell-distance
//! variants. Preview-only approximations; the GPU renders the real thing.

/// Classic 256-entry reference permutation table (fixed seed by construction)
const PERM: [u8; 256] = [
    151, 160, 137, 91, 90, 15, 131, 13, 201, 95, 96, 53, 194, 233, 7, 225, 140, 36, 103, 30, 69,
    142, 8, 99, 37, 240, 21, 10, 23, 190, 6, 148, 247, 120, 234, 75, 0, 26, 197, 62, 94, 252, 219,
    203, 117, 35, 11, 32, 57, 177, 33, 88, 237, 149, 56, 87, 174, 20, 125, 136, 171, 168, 68, 175,
    74, 165, 71, 134, 139, 48, 27, 166, 77, 146, 158, 231, 83, 111, 229, 122, 60, 211, 133, 230,
    220, 105, 92, 41, 55, 46, 245, 40, 244, 102, 143, 54, 65, 25, 63, 161, 1, 216, 80, 73, 209,
    76, 132, 187, 208, 89, 18, 169, 200, 196, 135, 130, 116, 188, 159, 86, 164, 100, 109, 198,
    173, 186, 3, 64, 52, 217, 226, 250, 124, 123, 5, 202, 38, 147, 118, 126, 255, 82, 85, 212,
    207, 206, 59, 227, 47, 16, 58, 17, 182, 189, 28, 42, 223, 183, 170, 213, 119, 248, 152, 2, 44,
    154, 163, 70, 221, 153, 101, 155, 167, 43, 172, 9, 129, 22, 39, 253, 19, 98, 108, 110, 79,
    113, 224, 232, 178, 185, 112, 104, 218, 246, 97, 228, 251, 34, 242, 193, 238, 210, 144, 12,
    191, 179, 162, 241, 81, 51, 145, 235, 249, 14, 239, 107, 49, 192, 214, 31, 181, 199, 106, 157,
    184, 84, 204, 176, 115, 121, 50, 45, 127, 4, 150, 254, 138, 236, 205, 93, 222, 114, 67, 29,
    24, 72, 243, 141, 128, 195, 78, 66, 215, 61, 156, 180,
];

fn perm(i: i64) -> usize {
    PERM[(i.rem_euclid(256)) as usize] as usize
}

fn fade(t: f32) -> f32 {
    t * t * t * (t * (t * 6.0 - 15.0) + 10.0)
}

fn grad(hash: usize, x: f32, y: f32) -> f32 {
    match hash & 7 {
        0 => x + y,
        1 => x - y,
        2 => -x + y,
        3 => -x - y,
        4 => x,
        5 => -x,
        6 => y,
        _ => -y,
    }
}

/// 2D gradient noise in roughly [-1, 1]
pub fn gradient2(x: f32, y: f32) -> f32 {
    let xi = x.floor() as i64;
    let yi = y.floor() as i64;
    let xf = x - x.floor();
    let yf = y - y.floor();

    let u = fade(xf);
    let v = fade(yf);

    let aa = perm(perm(xi) as i64 + yi);
    let ab = perm(perm(xi) as i64 + yi + 1);
    let ba = perm(perm(xi + 1) as i64 + yi);
    let bb = perm(perm(xi + 1) as i64 + yi + 1);

    let x1 = lerp(grad(aa, xf, yf), grad(ba, xf - 1.0, yf), u);
    let x2 = lerp(grad(ab, xf, yf - 1.0), grad(bb, xf - 1.0, yf - 1.0), u);
    lerp(x1, x2, v)
}

/// Fractal sum of [`gradient2`]: lacunarity 2, gain 0.5
pub fn fractal2(x: f32, y: f32, octaves: u32) -> f32 {
    let octaves = octaves.clamp(1, 8);
    let mut total = 0.0;
    let mut amplitude = 1.0;
    let mut frequency = 1.0;
    let mut norm = 0.0;
    for _ in 0..octaves {
        total += gradient2(x * frequency, y * frequency) * amplitude;
        norm += amplitude;
        amplitude *= 0.5;
        frequency *= 2.0;
    }
    total / norm
}

fn feature_offset(cx: i64, cy: i64, salt: i64) -> f32 {
    let h = perm(perm(cx.wrapping_mul(3) + salt) as i64 + cy);
    h as f32 / 255.0
}

/// Cell (Worley) noise: distance to the nearest feature point over the
/// 3x3 neighborhood
pub fn cell2(x: f32, y: f32) -> f32 {
    let xi = x.floor() as i64;
    let yi = y.floor() as i64;
    let mut best = f32::MAX;
    for dy in -1..=1 {
        for dx in -1..=1 {
            let cx = xi + dx;
            let cy = yi + dy;
            let px = cx as f32 + feature_offset(cx, cy, 0);
            let py = cy as f32 + feature_offset(cx, cy, 89);
            let d = (px - x).hypot(py - y);
            if d < best {
                best = d;
            }
        }
    }
    best
}

fn lerp(a: f32, b: f32, t: f32) -> f32 {
    a + (b - a) * t
}
