#[macro_use]
extern crate criterion;

extern crate playhouse_core;

use criterion::Criterion;
use playhouse_core::ring_buffer::RingBuffer;

const CAPACITY: usize = 256 * 1024;

fn write_then_read(c: &mut Criterion) {
    let chunk = vec![7u8; 4096];

    c.bench_function("ring buffer write+read 4KiB", move |b| {
        b.iter_with_setup(
            || RingBuffer::new(CAPACITY),
            |mut buf| {
                buf.write(&chunk).unwrap();
                let mut dest = vec![0u8; chunk.len()];
                buf.read(&mut dest).unwrap();
                buf
            },
        )
    });
}

fn wrap_around_cycle(c: &mut Criterion) {
    let chunk = vec![3u8; 1024];

    c.bench_function("ring buffer wrap-around cycle", move |b| {
        b.iter_with_setup(
            || RingBuffer::new(2048),
            |mut buf| {
                for _ in 0..64 {
                    buf.write(&chunk).unwrap();
                    let mut dest = vec![0u8; chunk.len()];
                    buf.read(&mut dest).unwrap();
                }
                buf
            },
        )
    });
}

criterion_group!(benches, write_then_read, wrap_around_cycle);
criterion_main!(benches);
