//! 8-bit CIE L\*a\*b\* planes (D65 white point).
//!
//! The colour maths is `palette`'s; this module only packs the result the
//! usual 8-bit way: `L` is rescaled from 0..100 to 0..255 and `a`/`b` are
//! offset by 128. The luminance plane is what the contrast and deblur
//! stages operate on.

use image::{GrayImage, Luma, Rgb, RgbImage};
use palette::white_point::D65;
use palette::{FromColor, Lab, Srgb};

/// Planar 8-bit Lab image.
#[derive(Debug, Clone, PartialEq)]
pub struct LabPlanes {
    pub l: GrayImage,
    pub a: GrayImage,
    pub b: GrayImage,
}

fn to_u8(v: f32) -> u8 {
    v.round().clamp(0.0, 255.0) as u8
}

fn pack(lab: Lab<D65, f32>) -> [u8; 3] {
    [
        to_u8(lab.l * 255.0 / 100.0),
        to_u8(lab.a + 128.0),
        to_u8(lab.b + 128.0),
    ]
}

fn unpack([l, a, b]: [u8; 3]) -> Lab<D65, f32> {
    Lab::new(l as f32 * 100.0 / 255.0, a as f32 - 128.0, b as f32 - 128.0)
}

pub fn rgb_to_lab(image: &RgbImage) -> LabPlanes {
    let (width, height) = image.dimensions();
    let mut l = GrayImage::new(width, height);
    let mut a = GrayImage::new(width, height);
    let mut b = GrayImage::new(width, height);

    for (x, y, pixel) in image.enumerate_pixels() {
        let [r, g, bl] = pixel.0;
        let srgb = Srgb::new(r, g, bl).into_format::<f32>();
        let [pl, pa, pb] = pack(Lab::<D65, f32>::from_color(srgb));
        l.put_pixel(x, y, Luma([pl]));
        a.put_pixel(x, y, Luma([pa]));
        b.put_pixel(x, y, Luma([pb]));
    }

    LabPlanes { l, a, b }
}

/// Out-of-gamut values are clamped to the sRGB cube.
pub fn lab_to_rgb(planes: &LabPlanes) -> RgbImage {
    let (width, height) = planes.l.dimensions();
    RgbImage::from_fn(width, height, |x, y| {
        let lab = unpack([
            planes.l.get_pixel(x, y)[0],
            planes.a.get_pixel(x, y)[0],
            planes.b.get_pixel(x, y)[0],
        ]);
        let srgb: Srgb<u8> = Srgb::<f32>::from_color(lab).into_format();
        Rgb([srgb.red, srgb.green, srgb.blue])
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn max_round_trip_error(img: &RgbImage) -> (i32, Rgb<u8>) {
        let back = lab_to_rgb(&rgb_to_lab(img));
        img.pixels()
            .zip(back.pixels())
            .map(|(orig, restored)| {
                let diff = (0..3)
                    .map(|c| (orig[c] as i32 - restored[c] as i32).abs())
                    .max()
                    .unwrap_or(0);
                (diff, *orig)
            })
            .max_by_key(|&(diff, _)| diff)
            .unwrap_or((0, Rgb([0, 0, 0])))
    }

    #[test]
    fn black_and_white_hit_the_ends_of_lightness() {
        let mut img = RgbImage::new(2, 1);
        img.put_pixel(0, 0, Rgb([0, 0, 0]));
        img.put_pixel(1, 0, Rgb([255, 255, 255]));

        let lab = rgb_to_lab(&img);
        assert_eq!(lab.l.get_pixel(0, 0)[0], 0);
        assert_eq!(lab.l.get_pixel(1, 0)[0], 255);
        for x in 0..2 {
            assert_eq!(lab.a.get_pixel(x, 0)[0], 128);
            assert_eq!(lab.b.get_pixel(x, 0)[0], 128);
        }
    }

    #[test]
    fn grays_survive_the_round_trip() {
        let img = RgbImage::from_fn(256, 1, |x, _| Rgb([x as u8; 3]));
        let (diff, worst) = max_round_trip_error(&img);
        assert!(diff <= 2, "{:?} drifted by {}", worst, diff);
    }

    // a/b are stored as whole units, so a saturated colour near the edge
    // of the sRGB gamut (e.g. dark red under bright green) can move by
    // more than 10 in one channel. Mid-gamut colours stay within a few
    // units.
    #[test]
    fn mid_gamut_round_trip_stays_close() {
        let levels: Vec<u8> = (48..=208).step_by(16).map(|v| v as u8).collect();
        let n = levels.len() as u32;
        let img = RgbImage::from_fn(n * n, n, |x, y| {
            Rgb([levels[(x / n) as usize], levels[(x % n) as usize], levels[y as usize]])
        });
        let (diff, worst) = max_round_trip_error(&img);
        assert!(diff <= 8, "{:?} drifted by {}", worst, diff);
    }

    #[test]
    fn red_has_positive_a() {
        let img = RgbImage::from_pixel(1, 1, Rgb([255, 0, 0]));
        let lab = rgb_to_lab(&img);
        assert!(lab.a.get_pixel(0, 0)[0] > 200);
    }
}
