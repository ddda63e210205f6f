use criterion::{criterion_group, criterion_main, Criterion};
use image::{GrayImage, Luma};
use rand::rngs::StdRng;
use rand::SeedableRng;
use std::hint::black_box;
use template_locator::pipeline::{AlgorithmSelection, LocalizationEngine};
use template_locator::utils::geometry::{Affine2, Point2};
use template_locator::utils::image_conversion::gray_to_mat;
use template_locator::utils::ransac::{estimate_affine_2d, RansacConfig};

fn pattern(width: u32, height: u32) -> GrayImage {
    GrayImage::from_fn(width, height, |x, y| {
        let (bx, by) = (x / 6, y / 6);
        Luma([(((bx * 13) ^ (by * 7) ^ (bx * by)) & 0xFF) as u8])
    })
}

/// Flat scene holding two copies of `template`.
fn scene_with_copies(template: &GrayImage) -> GrayImage {
    let mut scene = GrayImage::from_pixel(800, 600, Luma([96]));
    for (ox, oy) in [(60, 80), (430, 300)] {
        for (x, y, pixel) in template.enumerate_pixels() {
            scene.put_pixel(ox + x, oy + y, *pixel);
        }
    }
    scene
}

fn bench_localize_all(c: &mut Criterion) {
    let template = pattern(160, 120);
    let scene = gray_to_mat(&scene_with_copies(&template)).unwrap();

    let mut engine = LocalizationEngine::new(AlgorithmSelection::default());
    engine.register_template(&gray_to_mat(&template).unwrap());

    c.bench_function("localize_all_orb_two_copies", |b| {
        b.iter(|| black_box(engine.localize_all(&scene, None)));
    });
}

fn bench_ransac(c: &mut Criterion) {
    let transform = Affine2::similarity(1.3, 12.0, 240.0, 110.0);
    let mut src = Vec::new();
    let mut dst = Vec::new();
    for i in 0..400usize {
        let p = Point2::new((i * 37 % 197) as f64, (i * 53 % 151) as f64);
        src.push(p);
        if i % 3 == 0 {
            dst.push(Point2::new((i * 71 % 800) as f64, (i * 29 % 600) as f64));
        } else {
            dst.push(transform.apply(p));
        }
    }
    let config = RansacConfig::default();

    c.bench_function("ransac_affine_400_pairs", |b| {
        b.iter(|| {
            let mut rng = StdRng::seed_from_u64(config.seed);
            black_box(estimate_affine_2d(&src, &dst, &config, &mut rng))
        });
    });
}

criterion_group!(benches, bench_localize_all, bench_ransac);
criterion_main!(benches);
