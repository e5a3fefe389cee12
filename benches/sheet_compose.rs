use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use glam::Vec3;
use image::{Rgba, RgbaImage};
use spritegen::capture::{stage_subject, CaptureParameters};
use spritegen::placement::SourceFormat;
use spritegen::render::{PerspectiveCamera, Rasterizer, SoftwareRasterizer};
use spritegen::scene::{cube_model, normalize::normalize_model};
use spritegen::{compose, Frame};

fn frames(count: usize, resolution: u32) -> Vec<Frame> {
    (0..count)
        .map(|i| {
            let shade = (i * 255 / count) as u8;
            Frame::new(
                i,
                i as f32 * 360.0 / count as f32,
                RgbaImage::from_pixel(resolution, resolution, Rgba([shade, 128, 255 - shade, 255])),
            )
        })
        .collect()
}

/// Benchmark: Composing and encoding sheets of growing frame counts
fn bench_compose(c: &mut Criterion) {
    let mut group = c.benchmark_group("compose");
    for steps in [4, 8, 16, 32] {
        let frames = frames(steps, 128);
        group.bench_with_input(BenchmarkId::from_parameter(steps), &frames, |b, frames| {
            b.iter(|| black_box(compose(black_box(frames), 128)))
        });
    }
    group.finish();
}

/// Benchmark: One software-rendered frame of the built-in cube
fn bench_software_frame(c: &mut Criterion) {
    let subject = normalize_model(cube_model(), 1.0).root;
    let stage = stage_subject(&subject, SourceFormat::Fbx, &CaptureParameters::default());

    let mut group = c.benchmark_group("software_frame");
    for resolution in [64, 256, 512] {
        let mut rasterizer = SoftwareRasterizer::new();
        if rasterizer.prepare(resolution).is_err() {
            continue;
        }
        let mut camera = PerspectiveCamera::new(stage.placement.fov_deg, 1.0, 0.1, 1000.0);
        camera.look_at(stage.placement.camera_position(0.6, 0.0), Vec3::ZERO);

        group.bench_function(BenchmarkId::from_parameter(resolution), |b| {
            b.iter(|| black_box(pollster::block_on(rasterizer.render(&stage.scene, &camera))))
        });
    }
    group.finish();
}

criterion_group!(benches, bench_compose, bench_software_frame);
criterion_main!(benches);
