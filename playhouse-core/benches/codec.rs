#[macro_use]
extern crate criterion;

extern crate playhouse_core;

use criterion::Criterion;
use playhouse_core::codec::{decode_response, encode_request};
use playhouse_core::packet::Packet;

fn encode_small_request(c: &mut Criterion) {
    c.bench_function("encode small request", move |b| {
        b.iter(|| {
            let packet = Packet::request("EchoRequest", vec![0u8; 64]);
            encode_request(&packet).unwrap()
        })
    });
}

fn decode_small_response(c: &mut Criterion) {
    let mut packet = Packet::request("EchoReply", vec![0u8; 64]);
    packet.msg_seq = 42;
    let frame = build_response_frame(&packet);

    c.bench_function("decode small response", move |b| {
        b.iter(|| decode_response(&frame).unwrap())
    });
}

fn build_response_frame(packet: &Packet) -> Vec<u8> {
    use byteorder::{LittleEndian, WriteBytesExt};

    let msg_id = packet.msg_id.as_bytes();
    let content_size = 1 + msg_id.len() + 2 + 8 + 2 + 4 + packet.payload.len();

    let mut buffer = Vec::with_capacity(4 + content_size);
    buffer.write_u32::<LittleEndian>(content_size as u32).unwrap();
    buffer.write_u8(msg_id.len() as u8).unwrap();
    buffer.extend_from_slice(msg_id);
    buffer.write_u16::<LittleEndian>(packet.msg_seq).unwrap();
    buffer.write_i64::<LittleEndian>(packet.stage_id).unwrap();
    buffer.write_i16::<LittleEndian>(0).unwrap();
    buffer.write_u32::<LittleEndian>(0).unwrap();
    buffer.extend_from_slice(&packet.payload);
    buffer
}

criterion_group!(benches, encode_small_request, decode_small_response);
criterion_main!(benches);
