use criterion::{black_box, criterion_group, criterion_main, Criterion};
use image::{GrayImage, Luma};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use irisgauge::{detect_circles, EyeDetector, Frame, HoughCircleConfig, PreprocessConfig};

fn make_eye_fixture(width: u32, height: u32, seed: u64) -> GrayImage {
    let mut rng = StdRng::seed_from_u64(seed);
    let cx = width as f32 * 0.52;
    let cy = height as f32 * 0.47;
    let pupil_r = 24.0f32;
    let iris_r = 110.0f32;

    let mut img = GrayImage::new(width, height);
    for y in 0..height {
        for x in 0..width {
            let d = ((x as f32 - cx).powi(2) + (y as f32 - cy).powi(2)).sqrt();
            let base = if d < pupil_r {
                35.0
            } else if d < iris_r {
                115.0
            } else {
                215.0
            };
            let v = base + rng.gen_range(-10.0f32..10.0f32);
            img.put_pixel(x, y, Luma([v.clamp(0.0, 255.0) as u8]));
        }
    }
    img
}

fn bench_circle_vote(c: &mut Criterion) {
    let img = irisgauge::preprocess(
        &Frame::from_gray_image(make_eye_fixture(640, 480, 7)),
        &PreprocessConfig::default(),
    )
    .expect("fixture frame is valid");
    let pupil = HoughCircleConfig::pupil();
    let iris = HoughCircleConfig::iris();

    c.bench_function("circle_vote_pupil_640x480", |b| {
        b.iter(|| black_box(detect_circles(black_box(&img), &pupil)))
    });
    c.bench_function("circle_vote_iris_640x480", |b| {
        b.iter(|| black_box(detect_circles(black_box(&img), &iris)))
    });
}

fn bench_full_pass(c: &mut Criterion) {
    let frame = Frame::from_gray_image(make_eye_fixture(640, 480, 11));
    let detector = EyeDetector::new();
    c.bench_function("eye_pass_640x480", |b| {
        b.iter(|| {
            let result = detector
                .detect(black_box(&frame))
                .expect("fixture frame is valid");
            black_box(result)
        })
    });
}

criterion_group!(hotpaths, bench_circle_vote, bench_full_pass);
criterion_main!(hotpaths);
