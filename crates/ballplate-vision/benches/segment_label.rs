use ballplate_core::{PlatformPosition, RgbImageView};
use ballplate_vision::{
    label_components, segment_rgb, LabelParams, PlateDetector, PlateDetectorParams,
};
use criterion::{black_box, criterion_group, criterion_main, Criterion};

const W: usize = 640;
const H: usize = 480;

fn synthetic_frame() -> Vec<u8> {
    let mut data = vec![0u8; W * H * 3];
    // background noise in a hue band the thresholds reject
    for (i, px) in data.chunks_exact_mut(3).enumerate() {
        let n = (i.wrapping_mul(2_654_435_761) >> 24) as u8;
        px.copy_from_slice(&[n, n / 2, n / 3]);
    }
    let mut rect = |x0: usize, y0: usize, w: usize, h: usize| {
        for y in y0..y0 + h {
            for x in x0..x0 + w {
                let i = (y * W + x) * 3;
                data[i..i + 3].copy_from_slice(&[70, 140, 90]);
            }
        }
    };
    rect(4, 450, 20, 20);
    rect(50, 6, 18, 18);
    rect(570, 6, 16, 16);
    rect(610, 452, 14, 14);
    rect(316, 236, 10, 10);
    data
}

fn bench_segment_label(c: &mut Criterion) {
    let data = synthetic_frame();
    let view = RgbImageView {
        width: W,
        height: H,
        data: &data,
    };
    let params = PlateDetectorParams::default();

    c.bench_function("segment_rgb_640x480", |b| {
        b.iter(|| segment_rgb(black_box(&view), &params.thresholds))
    });

    let mask = segment_rgb(&view, &params.thresholds);
    c.bench_function("label_components_640x480", |b| {
        b.iter(|| label_components(black_box(&mask), &LabelParams::default()))
    });

    let detector = PlateDetector::new(params);
    c.bench_function("plate_detector_640x480", |b| {
        b.iter(|| detector.detect(black_box(&view), PlatformPosition::default()))
    });
}

criterion_group!(benches, bench_segment_label);
criterion_main!(benches);
