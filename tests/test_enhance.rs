mod common;

use common::*;
use platereader::enhance::{MorphOp, enhance};

fn binarize_only() -> EnhancementConfig {
    EnhancementConfig::builder()
        .scale_factor(1.0)
        .contrast_equalization(false)
        .deconvolution(false)
        .morphology(false)
        .build()
        .unwrap()
}

#[test]
fn test_default_output_is_rgb_and_scaled() {
    let region = plate_region(37, 13);
    let out = enhance(&region, &EnhancementConfig::default()).unwrap();
    assert_eq!(out.dimensions(), (74, 26));
    // Binarized, replicated across the three channels.
    assert!(out.pixels().all(|p| p[0] == p[1] && p[1] == p[2]));
    assert!(out.pixels().all(|p| p[0] == 0 || p[0] == 255));
}

#[test]
fn test_fractional_scale_rounds() {
    let config = EnhancementConfig::builder().scale_factor(1.5).build().unwrap();
    let out = enhance(&plate_region(37, 13), &config).unwrap();
    let (w, h) = out.dimensions();
    assert!((w as f32 - 55.5).abs() <= 1.0);
    assert!((h as f32 - 19.5).abs() <= 1.0);
}

#[test]
fn test_every_toggle_combination_returns_rgb() {
    let region = plate_region(24, 10);
    for binarize in [false, true] {
        for clahe in [false, true] {
            for sharpen in [false, true] {
                for morph in [None, Some(MorphOp::Open), Some(MorphOp::Both)] {
                    let mut builder = EnhancementConfig::builder()
                        .binarization(binarize)
                        .contrast_equalization(clahe)
                        .sharpening(sharpen)
                        .morphology(morph.is_some());
                    if let Some(op) = morph {
                        builder = builder.morph_op(op);
                    }
                    let out = enhance(&region, &builder.build().unwrap()).unwrap();
                    assert_eq!(out.dimensions(), (48, 20));
                }
            }
        }
    }
}

#[test]
fn test_enhancement_is_deterministic() {
    let region = plate_region(40, 14);
    let config = EnhancementConfig::builder()
        .sharpening(true)
        .morph_op(MorphOp::Both)
        .build()
        .unwrap();
    let first = enhance(&region, &config).unwrap();
    let second = enhance(&region, &config).unwrap();
    assert_eq!(first.as_raw(), second.as_raw());
}

#[test]
fn test_binarized_output_is_a_fixed_point() {
    let config = binarize_only();
    let once = enhance(&plate_region(30, 12), &config).unwrap();
    let twice = enhance(&once, &config).unwrap();
    assert_eq!(once, twice);
}

#[test]
fn test_invalid_config_is_rejected_before_any_work() {
    let config = EnhancementConfig {
        morph_kernel_size: (0, 3),
        ..EnhancementConfig::default()
    };
    assert!(Enhancer::new(&config).is_err());
    assert!(enhance(&plate_region(8, 8), &config).is_err());
}
