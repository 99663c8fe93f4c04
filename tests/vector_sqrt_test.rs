use tesela_engine::{Binding, ExecutionGrid, Kernel, Queue, Shape};

#[test]
fn sqrt_of_1024_indices() {
    tesela_engine::set_silent_mode(true);
    let n = 1024;
    let queue = Queue::new();

    let host: Vec<f32> = (0..n).map(|i| i as f32).collect();
    let input = queue.create_buffer(&host, Shape::d1(n)).unwrap();
    let output = queue.create_uninit(Shape::d1(n)).unwrap();

    queue
        .submit(
            Kernel::VectorSqrt,
            ExecutionGrid::new(Shape::d1(n)),
            &[Binding::Read(input), Binding::Write(output)],
        )
        .unwrap();
    queue.wait_all().unwrap();

    let result = queue.take(output).unwrap();
    assert_eq!(result.len(), n);
    assert_eq!(result[0], 0.0);
    assert_eq!(result[1], 1.0);
    assert_eq!(result[144], 12.0);
    let mut max_diff = 0.0f32;
    for (i, &got) in result.iter().enumerate() {
        let diff = (got - (i as f32).sqrt()).abs();
        if diff > max_diff {
            max_diff = diff;
        }
    }
    assert!(max_diff <= 1e-3, "max_diff = {}", max_diff);
    assert!((result[1023] - 31.984371).abs() < 1e-3);
}

#[test]
fn input_buffer_is_untouched() {
    tesela_engine::set_silent_mode(true);
    let n = 64;
    let queue = Queue::new();

    let host: Vec<f32> = (0..n).map(|i| (i * i) as f32).collect();
    let input = queue.create_buffer(&host, Shape::d1(n)).unwrap();
    let output = queue.create_uninit(Shape::d1(n)).unwrap();

    queue
        .submit(
            Kernel::VectorSqrt,
            ExecutionGrid::new(Shape::d1(n)),
            &[Binding::Read(input), Binding::Write(output)],
        )
        .unwrap();
    queue.wait_all().unwrap();

    assert_eq!(queue.take(input).unwrap(), host);
    let result = queue.take(output).unwrap();
    for (i, &got) in result.iter().enumerate() {
        // Squares below 2^24 are exact in f32, so sqrt is exact too.
        assert_eq!(got, i as f32);
    }
}
