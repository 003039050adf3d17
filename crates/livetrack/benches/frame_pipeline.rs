use criterion::{BenchmarkId, Criterion, black_box, criterion_group, criterion_main};
use livetrack::processing::TensorDecoder;
use livetrack::{EngineConfig, FrameDimensions, FramePipeline, RawModelOutput, TrackerState};
use ndarray::{Array, IxDyn};

/// Create mock SSD output with N confident detections spread over the frame
fn create_mock_ssd_output(max_detections: usize, num_detections: usize) -> RawModelOutput {
    let mut box_data = vec![0.0f32; max_detections * 4];
    let mut class_data = vec![0.0f32; max_detections];
    let mut score_data = vec![0.01f32; max_detections];

    for i in 0..num_detections.min(max_detections) {
        let offset = (i % 5) as f32 * 0.18;
        box_data[i * 4] = 0.1;
        box_data[i * 4 + 1] = offset;
        box_data[i * 4 + 2] = 0.4;
        box_data[i * 4 + 3] = offset + 0.15;
        class_data[i] = (1 + i % 3) as f32;
        score_data[i] = 0.9 - i as f32 * 0.01;
    }

    RawModelOutput::new(
        Array::from_shape_vec(IxDyn(&[1, max_detections, 4]), box_data).unwrap(),
        Array::from_shape_vec(IxDyn(&[1, max_detections]), class_data).unwrap(),
        Array::from_shape_vec(IxDyn(&[1, max_detections]), score_data).unwrap(),
        Array::from_shape_vec(IxDyn(&[1]), vec![max_detections as f32]).unwrap(),
    )
}

fn benchmark_decode(c: &mut Criterion) {
    let mut group = c.benchmark_group("decode");
    let decoder = TensorDecoder::new(10);

    for num_detections in [0, 5, 10].iter() {
        let output = create_mock_ssd_output(10, *num_detections);

        group.bench_with_input(
            BenchmarkId::new("tensor_decode", num_detections),
            &output,
            |b, output| b.iter(|| decoder.decode(black_box(output)).unwrap()),
        );
    }

    group.finish();
}

fn benchmark_process(c: &mut Criterion) {
    let mut group = c.benchmark_group("frame_pipeline");
    let pipeline = FramePipeline::new(&EngineConfig::default()).unwrap();
    let dims = FrameDimensions::new(1080, 1920);

    for num_detections in [0, 5, 10].iter() {
        let output = create_mock_ssd_output(10, *num_detections);
        // Warm state so the tracker has tracks to match against
        let (state, _) = pipeline
            .process(&TrackerState::default(), &output, dims)
            .unwrap();

        group.bench_with_input(
            BenchmarkId::new("process", num_detections),
            &(output, state),
            |b, (output, state)| {
                b.iter(|| {
                    pipeline
                        .process(black_box(state), black_box(output), black_box(dims))
                        .unwrap()
                });
            },
        );
    }

    group.finish();
}

criterion_group!(benches, benchmark_decode, benchmark_process);
criterion_main!(benches);
