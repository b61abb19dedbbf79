//! Pixel primitives over RGBA buffers.
//!
//! Everything here clips to the target buffer and never panics on
//! out-of-range coordinates.

use image::{imageops, Rgba, RgbaImage};

pub const WHITE: Rgba<u8> = Rgba([255, 255, 255, 255]);
pub const TRANSPARENT: Rgba<u8> = Rgba([0, 0, 0, 0]);

/// Source-over compositing of `src` onto `dst`.
pub fn blend(dst: &mut Rgba<u8>, src: Rgba<u8>) {
    let sa = f32::from(src[3]) / 255.0;
    if sa >= 1.0 {
        *dst = src;
        return;
    }
    if sa <= 0.0 {
        return;
    }
    let da = f32::from(dst[3]) / 255.0;
    let out_a = sa + da * (1.0 - sa);
    let mix = |s: u8, d: u8| {
        let v = (f32::from(s) * sa + f32::from(d) * da * (1.0 - sa)) / out_a;
        v.round().clamp(0.0, 255.0) as u8
    };
    *dst = Rgba([
        mix(src[0], dst[0]),
        mix(src[1], dst[1]),
        mix(src[2], dst[2]),
        (out_a * 255.0).round().clamp(0.0, 255.0) as u8,
    ]);
}

fn put(img: &mut RgbaImage, x: i64, y: i64, color: Rgba<u8>) {
    if x < 0 || y < 0 || x >= i64::from(img.width()) || y >= i64::from(img.height()) {
        return;
    }
    blend(img.get_pixel_mut(x as u32, y as u32), color);
}

pub fn fill_rect(img: &mut RgbaImage, x: i32, y: i32, width: u32, height: u32, color: Rgba<u8>) {
    let x0 = i64::from(x).max(0);
    let y0 = i64::from(y).max(0);
    let x1 = (i64::from(x) + i64::from(width)).min(i64::from(img.width()));
    let y1 = (i64::from(y) + i64::from(height)).min(i64::from(img.height()));
    for py in y0..y1 {
        for px in x0..x1 {
            put(img, px, py, color);
        }
    }
}

pub fn stroke_rect(img: &mut RgbaImage, x: i32, y: i32, width: u32, height: u32, line: u32, color: Rgba<u8>) {
    if width == 0 || height == 0 || line == 0 {
        return;
    }
    let line = line.min(width / 2 + 1).min(height / 2 + 1);
    let inner_h = height.saturating_sub(2 * line);
    fill_rect(img, x, y, width, line, color);
    fill_rect(img, x, y + (height - line) as i32, width, line, color);
    fill_rect(img, x, y + line as i32, line, inner_h, color);
    fill_rect(img, x + (width - line) as i32, y + line as i32, line, inner_h, color);
}

/// Straight line of roughly `width` pixels thickness.
pub fn draw_line(img: &mut RgbaImage, from: (f32, f32), to: (f32, f32), width: f32, color: Rgba<u8>) {
    let (dx, dy) = (to.0 - from.0, to.1 - from.1);
    let steps = dx.abs().max(dy.abs()).ceil().max(1.0) as u32;
    let half = (width / 2.0).max(0.5);
    let mut last: Option<(i64, i64)> = None;
    for i in 0..=steps {
        let t = i as f32 / steps as f32;
        let cx = from.0 + dx * t;
        let cy = from.1 + dy * t;
        let key = (cx.round() as i64, cy.round() as i64);
        if last == Some(key) {
            continue;
        }
        last = Some(key);
        let x0 = (cx - half).round() as i64;
        let y0 = (cy - half).round() as i64;
        let size = (half * 2.0).round().max(1.0) as i64;
        for py in y0..y0 + size {
            for px in x0..x0 + size {
                if px < 0 || py < 0 || px >= i64::from(img.width()) || py >= i64::from(img.height()) {
                    continue;
                }
                // Opaque overwrite so overlapping stamps do not accumulate alpha.
                let dst = img.get_pixel_mut(px as u32, py as u32);
                if color[3] == 255 {
                    *dst = color;
                } else if dst[3] < color[3] {
                    blend(dst, color);
                }
            }
        }
    }
}

/// Even-odd scanline fill.
pub fn fill_polygon(img: &mut RgbaImage, points: &[(f32, f32)], color: Rgba<u8>) {
    if points.len() < 3 {
        return;
    }
    let min_y = points.iter().map(|p| p.1).fold(f32::INFINITY, f32::min).floor().max(0.0) as i64;
    let max_y = points
        .iter()
        .map(|p| p.1)
        .fold(f32::NEG_INFINITY, f32::max)
        .ceil()
        .min(img.height() as f32) as i64;
    let mut xs: Vec<f32> = Vec::with_capacity(points.len());
    for y in min_y..max_y {
        let sy = y as f32 + 0.5;
        xs.clear();
        for (i, a) in points.iter().enumerate() {
            let b = points[(i + 1) % points.len()];
            if (a.1 <= sy && b.1 > sy) || (b.1 <= sy && a.1 > sy) {
                xs.push(a.0 + (sy - a.1) / (b.1 - a.1) * (b.0 - a.0));
            }
        }
        xs.sort_by(|l, r| l.total_cmp(r));
        for pair in xs.chunks(2) {
            if let [l, r] = pair {
                let start = l.round() as i64;
                let end = r.round() as i64;
                for x in start..end {
                    put(img, x, y, color);
                }
            }
        }
    }
}

pub fn fill_circle(img: &mut RgbaImage, center: (f32, f32), radius: f32, color: Rgba<u8>) {
    let r2 = radius * radius;
    let x0 = (center.0 - radius).floor() as i64;
    let x1 = (center.0 + radius).ceil() as i64;
    let y0 = (center.1 - radius).floor() as i64;
    let y1 = (center.1 + radius).ceil() as i64;
    for y in y0..=y1 {
        for x in x0..=x1 {
            let dx = x as f32 + 0.5 - center.0;
            let dy = y as f32 + 0.5 - center.1;
            if dx * dx + dy * dy <= r2 {
                put(img, x, y, color);
            }
        }
    }
}

/// Draw `src` scaled into the `width` x `height` box at `(x, y)`.
pub fn blit(img: &mut RgbaImage, src: &RgbaImage, x: i32, y: i32, width: u32, height: u32) {
    if width == 0 || height == 0 || src.width() == 0 || src.height() == 0 {
        return;
    }
    let scaled;
    let src = if src.dimensions() == (width, height) {
        src
    } else {
        scaled = imageops::resize(src, width, height, imageops::FilterType::Triangle);
        &scaled
    };
    for (sx, sy, px) in src.enumerate_pixels() {
        put(img, i64::from(x) + i64::from(sx), i64::from(y) + i64::from(sy), *px);
    }
}

/// Parse the CSS color forms used in inline styles and SVG attributes:
/// `#rgb`, `#rrggbb`, `rgb()`, `rgba()`, and a handful of names.
pub fn css_color(value: &str) -> Option<Rgba<u8>> {
    let v = value.trim().to_ascii_lowercase();
    if let Some(hex) = v.strip_prefix('#') {
        let digits: Vec<u8> = hex
            .chars()
            .map(|c| c.to_digit(16).map(|d| d as u8))
            .collect::<Option<Vec<u8>>>()?;
        return match digits.as_slice() {
            [r, g, b] => Some(Rgba([r * 17, g * 17, b * 17, 255])),
            [r1, r0, g1, g0, b1, b0] => Some(Rgba([r1 * 16 + r0, g1 * 16 + g0, b1 * 16 + b0, 255])),
            _ => None,
        };
    }
    if let Some(args) = v
        .strip_prefix("rgba(")
        .or_else(|| v.strip_prefix("rgb("))
        .and_then(|rest| rest.strip_suffix(')'))
    {
        let parts: Vec<&str> = args.split(',').map(str::trim).collect();
        let channel = |s: &str| s.parse::<f32>().ok().map(|f| f.round().clamp(0.0, 255.0) as u8);
        return match parts.as_slice() {
            [r, g, b] => Some(Rgba([channel(r)?, channel(g)?, channel(b)?, 255])),
            [r, g, b, a] => {
                let alpha = a.parse::<f32>().ok()?.clamp(0.0, 1.0);
                Some(Rgba([channel(r)?, channel(g)?, channel(b)?, (alpha * 255.0).round() as u8]))
            }
            _ => None,
        };
    }
    match v.as_str() {
        "white" => Some(WHITE),
        "black" => Some(Rgba([0, 0, 0, 255])),
        "red" => Some(Rgba([255, 0, 0, 255])),
        "green" => Some(Rgba([0, 128, 0, 255])),
        "blue" => Some(Rgba([0, 0, 255, 255])),
        "gray" | "grey" => Some(Rgba([128, 128, 128, 255])),
        "transparent" => Some(TRANSPARENT),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn blend_half_alpha_over_white() {
        let mut px = WHITE;
        blend(&mut px, Rgba([0, 0, 0, 128]));
        assert_eq!(px[3], 255);
        assert!((126..=128).contains(&px[0]));
    }

    #[test]
    fn fill_rect_clips_to_buffer() {
        let mut img = RgbaImage::from_pixel(10, 10, WHITE);
        fill_rect(&mut img, -5, 8, 100, 100, Rgba([255, 0, 0, 255]));
        assert_eq!(*img.get_pixel(0, 9), Rgba([255, 0, 0, 255]));
        assert_eq!(*img.get_pixel(9, 7), WHITE);
    }

    #[test]
    fn polygon_fill_covers_interior_only() {
        let mut img = RgbaImage::from_pixel(20, 20, TRANSPARENT);
        fill_polygon(&mut img, &[(2.0, 2.0), (18.0, 2.0), (18.0, 18.0), (2.0, 18.0)], WHITE);
        assert_eq!(*img.get_pixel(10, 10), WHITE);
        assert_eq!(*img.get_pixel(0, 0), TRANSPARENT);
        assert_eq!(*img.get_pixel(19, 19), TRANSPARENT);
    }

    #[test]
    fn parses_css_colors() {
        assert_eq!(css_color("#fff"), Some(WHITE));
        assert_eq!(css_color("#e8f0f8"), Some(Rgba([0xe8, 0xf0, 0xf8, 255])));
        assert_eq!(css_color("rgba(76, 175, 80, 0.2)"), Some(Rgba([76, 175, 80, 51])));
        assert_eq!(css_color("rgb(1,2,3)"), Some(Rgba([1, 2, 3, 255])));
        assert_eq!(css_color("bogus"), None);
    }
}
