use tesela_engine::{Binding, ExecutionGrid, Kernel, Queue, Shape};

// Integer squares and fourth powers below 2^24 are exact in f32 and
// their square roots are exact integers, so chained sqrt submissions
// can be checked with equality instead of tolerances.

#[test]
fn producer_consumer_chain_runs_in_order() {
    tesela_engine::set_silent_mode(true);
    let n = 64;
    let queue = Queue::new();

    let host: Vec<f32> = (0..n).map(|i| (i * i * i * i) as f32).collect();
    let a = queue.create_buffer(&host, Shape::d1(n)).unwrap();
    let b = queue.create_uninit(Shape::d1(n)).unwrap();
    let c = queue.create_uninit(Shape::d1(n)).unwrap();

    let grid = ExecutionGrid::new(Shape::d1(n));

    // b depends on a, c depends on b. Submission order is also the
    // only valid execution order here.
    queue
        .submit(
            Kernel::VectorSqrt,
            grid.clone(),
            &[Binding::Read(a), Binding::Write(b)],
        )
        .unwrap();
    queue
        .submit(
            Kernel::VectorSqrt,
            grid,
            &[Binding::Read(b), Binding::Write(c)],
        )
        .unwrap();
    queue.wait_all().unwrap();

    let result = queue.take(c).unwrap();
    for (i, &got) in result.iter().enumerate() {
        assert_eq!(got, i as f32, "element {}", i);
    }
}

#[test]
fn chain_interleaved_with_unrelated_work() {
    tesela_engine::set_silent_mode(true);
    let n = 64;
    let queue = Queue::new();

    let host: Vec<f32> = (0..n).map(|i| (i * i * i * i) as f32).collect();
    let unrelated_host: Vec<f32> = (0..n).map(|i| (i * i) as f32).collect();

    let a = queue.create_buffer(&host, Shape::d1(n)).unwrap();
    let b = queue.create_uninit(Shape::d1(n)).unwrap();
    let c = queue.create_uninit(Shape::d1(n)).unwrap();
    let x = queue.create_buffer(&unrelated_host, Shape::d1(n)).unwrap();
    let y = queue.create_uninit(Shape::d1(n)).unwrap();

    let grid = ExecutionGrid::new(Shape::d1(n));

    queue
        .submit(
            Kernel::VectorSqrt,
            grid.clone(),
            &[Binding::Read(a), Binding::Write(b)],
        )
        .unwrap();
    // Disjoint buffer set: free to run concurrently with the chain.
    queue
        .submit(
            Kernel::VectorSqrt,
            grid.clone(),
            &[Binding::Read(x), Binding::Write(y)],
        )
        .unwrap();
    queue
        .submit(
            Kernel::VectorSqrt,
            grid,
            &[Binding::Read(b), Binding::Write(c)],
        )
        .unwrap();
    queue.wait_all().unwrap();

    let chain = queue.take(c).unwrap();
    let side = queue.take(y).unwrap();
    for i in 0..n {
        assert_eq!(chain[i], i as f32);
        assert_eq!(side[i], i as f32);
    }
}

#[test]
fn write_after_read_does_not_overtake_the_reader() {
    tesela_engine::set_silent_mode(true);
    let n = 64;
    let queue = Queue::new();

    let old: Vec<f32> = (0..n).map(|i| (i * i) as f32).collect();
    let new: Vec<f32> = (0..n).map(|i| ((i + 1) * (i + 1)) as f32).collect();

    let b = queue.create_buffer(&old, Shape::d1(n)).unwrap();
    let reader_out = queue.create_uninit(Shape::d1(n)).unwrap();
    let new_src = queue.create_buffer(&new, Shape::d1(n)).unwrap();

    let grid = ExecutionGrid::new(Shape::d1(n));

    // S1 reads the old contents of b; S2 overwrites b. The overwrite
    // carries a write-after-read edge on S1 and must not run first.
    queue
        .submit(
            Kernel::VectorSqrt,
            grid.clone(),
            &[Binding::Read(b), Binding::Write(reader_out)],
        )
        .unwrap();
    queue
        .submit(
            Kernel::VectorSqrt,
            grid,
            &[Binding::Read(new_src), Binding::Write(b)],
        )
        .unwrap();
    queue.wait_all().unwrap();

    let reader = queue.take(reader_out).unwrap();
    let overwritten = queue.take(b).unwrap();
    for i in 0..n {
        assert_eq!(reader[i], i as f32, "reader saw the overwrite at {}", i);
        assert_eq!(overwritten[i], (i + 1) as f32);
    }
}

#[test]
fn concurrent_readers_share_a_buffer() {
    tesela_engine::set_silent_mode(true);
    let n = 256;
    let queue = Queue::new();

    let host: Vec<f32> = (0..n).map(|i| (i * i) as f32).collect();
    let b = queue.create_buffer(&host, Shape::d1(n)).unwrap();
    let out1 = queue.create_uninit(Shape::d1(n)).unwrap();
    let out2 = queue.create_uninit(Shape::d1(n)).unwrap();

    let grid = ExecutionGrid::new(Shape::d1(n));
    queue
        .submit(
            Kernel::VectorSqrt,
            grid.clone(),
            &[Binding::Read(b), Binding::Write(out1)],
        )
        .unwrap();
    queue
        .submit(
            Kernel::VectorSqrt,
            grid,
            &[Binding::Read(b), Binding::Write(out2)],
        )
        .unwrap();
    queue.wait_all().unwrap();

    let r1 = queue.take(out1).unwrap();
    let r2 = queue.take(out2).unwrap();
    for i in 0..n {
        assert_eq!(r1[i], i as f32);
        assert_eq!(r2[i], i as f32);
    }
}

#[test]
fn queue_is_reusable_after_wait_all() {
    tesela_engine::set_silent_mode(true);
    let n = 16;
    let queue = Queue::new();

    let host: Vec<f32> = (0..n).map(|i| (i * i) as f32).collect();
    let a = queue.create_buffer(&host, Shape::d1(n)).unwrap();
    let b = queue.create_uninit(Shape::d1(n)).unwrap();

    for _ in 0..3 {
        queue
            .submit(
                Kernel::VectorSqrt,
                ExecutionGrid::new(Shape::d1(n)),
                &[Binding::Read(a), Binding::Write(b)],
            )
            .unwrap();
        queue.wait_all().unwrap();
        let result = queue.take(b).unwrap();
        for (i, &got) in result.iter().enumerate() {
            assert_eq!(got, i as f32);
        }
    }
}
