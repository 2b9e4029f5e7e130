//! Quantizer behavior on realistic images.

use image::{Rgba, RgbaImage};
use tagsync::color::Rgb;
use tagsync::quantize::{Quantizer, quantize};

use crate::common::fixtures::{solid, split};
use crate::common::init_test_logging;

fn gradient(width: u32, height: u32) -> RgbaImage {
    RgbaImage::from_fn(width, height, |x, y| {
        Rgba([
            (x * 255 / width.max(1)) as u8,
            (y * 255 / height.max(1)) as u8,
            128,
            255,
        ])
    })
}

#[test]
fn non_empty_and_bounded_for_any_image() {
    init_test_logging();
    let images = [
        solid([1, 2, 3], 1),
        RgbaImage::from_pixel(1, 500, Rgba([9, 9, 9, 255])),
        gradient(640, 640),
        gradient(37, 1000),
    ];
    for image in &images {
        for max in [1, 3, 16, 64] {
            let out = quantize(image, max);
            assert!(!out.is_empty(), "{}x{} gave nothing", image.width(), image.height());
            assert!(out.len() <= max);
        }
    }
}

#[test]
fn sorted_by_descending_weight() {
    let out = quantize(&gradient(300, 300), 32);
    assert!(out.windows(2).all(|w| w[0].weight >= w[1].weight));
}

#[test]
fn solid_image_yields_that_color() {
    for rgb in [[255, 0, 0], [0, 0, 0], [255, 255, 255], [17, 99, 201]] {
        let out = quantize(&solid(rgb, 300), 8);
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].rgb, Rgb::new(rgb[0], rgb[1], rgb[2]));
    }
}

#[test]
fn large_solid_image_weight_is_source_pixel_count() {
    // 400x400 is reduced to 200x200 before bucketing.
    let out = quantize(&solid([10, 200, 10], 400), 4);
    assert_eq!(out.len(), 1);
    assert!((out[0].weight - 160_000.0).abs() < f64::EPSILON);

    let out = quantize(&solid([10, 200, 10], 300), 4);
    assert!((out[0].weight - 90_000.0).abs() < f64::EPSILON);
}

#[test]
fn weights_scale_with_source_area() {
    // 80/20 split at 400px: shares survive the downsample.
    let image = RgbaImage::from_fn(400, 400, |x, _| {
        if x < 320 { Rgba([240, 240, 0, 255]) } else { Rgba([0, 0, 90, 255]) }
    });
    let out = quantize(&image, 4);
    assert!((out[0].weight - 128_000.0).abs() < 1e-6);
    assert!((out[1].weight - 32_000.0).abs() < 1e-6);
}

#[test]
fn majority_color_ranks_first() {
    let out = quantize(&split([240, 240, 0], [0, 0, 90], 0.8), 4);
    assert_eq!(out[0].rgb, Rgb::new(240, 240, 0));
    assert_eq!(out[1].rgb, Rgb::new(0, 0, 90));
}

#[test]
fn coarser_buckets_merge_more() {
    let img = gradient(128, 128);
    let fine = Quantizer::new().bucket_bits(6).quantize(&img, 10_000).len();
    let coarse = Quantizer::new().bucket_bits(2).quantize(&img, 10_000).len();
    assert!(coarse < fine);
    assert!(coarse <= 16);
}
