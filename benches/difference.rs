use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use motion_recorder::detection::{difference, DifferenceMap};
use motion_recorder::media::VideoPicture;

fn picture(width: u32, height: u32, seed: u8) -> VideoPicture {
    let mut picture = VideoPicture::yuv420p(width, height);
    let luma = picture.luma_mut();
    for y in 0..luma.height() {
        for (x, sample) in luma.row_mut(y).iter_mut().enumerate() {
            *sample = ((x * 7 + y * 13) as u8).wrapping_add(seed);
        }
    }
    picture
}

fn bench_difference(c: &mut Criterion) {
    let mut group = c.benchmark_group("difference");

    for (width, height) in [(320, 240), (1280, 720), (1920, 1080)] {
        let previous = picture(width, height, 0);
        let current = picture(width, height, 45);
        let mut map = DifferenceMap::for_picture(&current);

        group.bench_with_input(
            BenchmarkId::new("histogram", format!("{width}x{height}")),
            &(&previous, &current),
            |b, (previous, current)| b.iter(|| difference(black_box(previous), black_box(current), 25, 10, None)),
        );

        group.bench_with_input(
            BenchmarkId::new("with_map", format!("{width}x{height}")),
            &(&previous, &current),
            |b, (previous, current)| {
                b.iter(|| difference(black_box(previous), black_box(current), 25, 10, Some(&mut map)))
            },
        );
    }

    group.finish();
}

criterion_group!(benches, bench_difference);
criterion_main!(benches);
