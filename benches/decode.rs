//! Benchmark: single-record decode vs full pointer-chase over a synthetic
//! linked list. Decode is per-record and lazy, so the chain walk measures
//! one decode plus one pointer dereference per node.

use cfdecode::record::Pointer;
use cfdecode::{parse_grammar, Deserializer, TypeRegistry};
use criterion::{black_box, criterion_group, criterion_main, Criterion};

const GRAMMAR: &str = r#"
<grammar>
  <class name="CFObject">
    <attrib name="ObjectType" type="U16"/>
    <attrib name="Extension" type="U8"/>
    <attrib name="RootType" type="U8"/>
  </class>
  <class name="Node" classid="10">
    <attrib name="base" type="CFObject" ancestor="1"/>
    <attrib name="Next" type="Pointer" ptrtgt="Node"/>
    <attrib name="Value" type="U32"/>
  </class>
</grammar>
"#;

const NODE_SIZE: u32 = 12;
const CHAIN_LEN: u32 = 1024;

/// A chain of `CHAIN_LEN` 12-byte nodes starting at offset 4 (offset 0 would
/// read back as a null address), each pointing at the next.
fn build_chain() -> Vec<u8> {
    let mut data = vec![0u8; 4];
    for index in 0..CHAIN_LEN {
        let next = if index + 1 < CHAIN_LEN {
            4 + NODE_SIZE * (index + 1)
        } else {
            0
        };
        data.extend_from_slice(&10u16.to_le_bytes());
        data.push(0);
        data.push(0);
        data.extend_from_slice(&next.to_le_bytes());
        data.extend_from_slice(&index.to_le_bytes());
    }
    data
}

fn walk_chain(deserializer: &Deserializer<'_>, data: &[u8]) -> u64 {
    let mut offset = 4u32;
    let mut sum = 0u64;
    loop {
        let decoded = deserializer.decode(data, offset).expect("decode");
        let record = decoded.record();
        sum += record.integer("Value").expect("Value") as u64;
        match record.pointer("Next").expect("Next") {
            Pointer::Object(p) if !p.is_null() => offset = p.address,
            _ => return sum,
        }
    }
}

fn bench_decode(c: &mut Criterion) {
    let registry: TypeRegistry = parse_grammar(GRAMMAR).expect("grammar");
    let deserializer = Deserializer::new(&registry);
    let data = build_chain();

    c.bench_function("decode_single_record", |b| {
        b.iter(|| deserializer.decode(black_box(&data), 4).expect("decode"))
    });

    c.bench_function("walk_chain_1024", |b| {
        b.iter(|| black_box(walk_chain(&deserializer, black_box(&data))))
    });
}

criterion_group!(benches, bench_decode);
criterion_main!(benches);
