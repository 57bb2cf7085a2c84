//! Frame throughput benchmark

use criterion::{black_box, criterion_group, criterion_main, Criterion};
use nes_emu::{Config, Console};

/// NROM image spinning in a loop with rendering and NMI enabled
fn demo_rom() -> Vec<u8> {
    let mut prg = vec![0xEA; 0x4000];
    // LDA #$80; STA $2000; LDA #$1E; STA $2001; JMP $800A
    let program = [
        0xA9, 0x80, 0x8D, 0x00, 0x20, 0xA9, 0x1E, 0x8D, 0x01, 0x20, 0x4C, 0x0A, 0x80,
    ];
    prg[..program.len()].copy_from_slice(&program);
    // RTI
    prg[0x0100] = 0x40;
    prg[0x3FFA..0x4000].copy_from_slice(&[0x00, 0x81, 0x00, 0x80, 0x00, 0x81]);

    let mut data = vec![0x4E, 0x45, 0x53, 0x1A, 1, 1, 0, 0];
    data.resize(16, 0);
    data.extend_from_slice(&prg);
    data.extend((0..0x2000).map(|i| (i * 7) as u8));
    data
}

fn bench_frame(c: &mut Criterion) {
    let mut console = Console::new(Config::default());
    if let Err(err) = console.load_rom(&demo_rom()) {
        panic!("demo ROM failed to load: {}", err);
    }

    c.bench_function("run_frame", |b| {
        b.iter(|| {
            black_box(console.run_frame());
            black_box(console.drain_samples());
        })
    });
}

criterion_group!(benches, bench_frame);
criterion_main!(benches);
