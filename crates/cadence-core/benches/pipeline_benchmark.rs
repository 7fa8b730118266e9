use cadence_core::{
    smart_split, AudioChunk, AudioFormat, AudioNormalizer, NormalizationOptions, StreamEncoder,
    TextNormalizer, TrimConfig,
};
use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};

const PASSAGE: &str = "Dr. Smith paid $1,234.56 on 3/14/2024 at 10:30 for 2.5kg of item #42. \
    Visit https://example.com/docs or mail support@example.com for help! \
    The 21st century began in 2001, didn't it? [pause:0.5] Mr. Jones said 50% was enough.";

fn bench_text_normalization(c: &mut Criterion) {
    let normalizer = TextNormalizer::new(NormalizationOptions::default());
    let mut group = c.benchmark_group("text_normalization");

    for repeat in [1_usize, 10, 50] {
        let text = vec![PASSAGE; repeat].join("\n");
        group.bench_with_input(BenchmarkId::new("normalize", repeat), &text, |b, text| {
            b.iter(|| black_box(normalizer.normalize(black_box(text))));
        });
    }

    group.finish();
}

fn bench_segmentation(c: &mut Criterion) {
    let mut group = c.benchmark_group("segmentation");
    let text = vec![PASSAGE; 20].join("\n\n");

    for max_len in [100_usize, 300, 1000] {
        group.bench_with_input(BenchmarkId::new("smart_split", max_len), &max_len, |b, &max_len| {
            b.iter(|| black_box(smart_split(black_box(&text), max_len)));
        });
    }

    group.finish();
}

fn bench_trimming(c: &mut Criterion) {
    let mut group = c.benchmark_group("trimming");

    let audio_lengths = vec![("1sec", 24_000), ("5sec", 120_000), ("10sec", 240_000)];

    for (name, length) in audio_lengths {
        // silence either side of a sine burst
        let samples: Vec<f32> = (0..length)
            .map(|i| {
                if i > length / 5 && i < length * 4 / 5 {
                    (i as f32 * 0.05).sin() * 0.5
                } else {
                    0.0
                }
            })
            .collect();

        group.bench_with_input(BenchmarkId::new("trim", name), &samples, |b, samples| {
            b.iter(|| {
                let mut normalizer = AudioNormalizer::new(&TrimConfig::default());
                let mut chunk = AudioChunk::new(samples.clone(), 24_000, "Sentence.");
                normalizer.trim(&mut chunk, 1.0, false).unwrap();
                black_box(chunk.len())
            });
        });
    }

    group.finish();
}

fn bench_encoding(c: &mut Criterion) {
    let mut group = c.benchmark_group("encoding");
    let samples: Vec<i16> = (0..24_000).map(|i| ((i as f32 * 0.05).sin() * 8000.0) as i16).collect();

    for format in [AudioFormat::Pcm, AudioFormat::Wav] {
        group.bench_function(BenchmarkId::new("stream_encode", format.extension()), |b| {
            b.iter(|| {
                let mut encoder = StreamEncoder::new(format, 24_000, 1).unwrap();
                let mut bytes = encoder.write(black_box(&samples)).unwrap();
                bytes.extend(encoder.finalize().unwrap());
                black_box(bytes)
            });
        });
    }

    group.finish();
}

criterion_group!(
    benches,
    bench_text_normalization,
    bench_segmentation,
    bench_trimming,
    bench_encoding
);
criterion_main!(benches);
