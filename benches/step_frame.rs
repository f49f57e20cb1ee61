use criterion::{criterion_group, criterion_main, Criterion};
use famicore::{cart::Cart, console::Console, mem::RamState, ppu::Mirroring};

/// A cart that enables rendering and NMI, then spins.
fn bench_cart() -> Cart {
    #[rustfmt::skip]
    let prg = [
        0xA9, 0x80,       // LDA #$80
        0x8D, 0x00, 0x20, // STA $2000 ; NMI on
        0xA9, 0x1E,       // LDA #$1E
        0x8D, 0x01, 0x20, // STA $2001 ; rendering on
        0x4C, 0x0A, 0x80, // spin: JMP spin
    ];
    let mut prg_rom = vec![0x00; 0x8000];
    prg_rom[..prg.len()].copy_from_slice(&prg);
    prg_rom[0x7FFA] = 0x0A; // NMI -> spin
    prg_rom[0x7FFB] = 0x80;
    prg_rom[0x7FFC] = 0x00;
    prg_rom[0x7FFD] = 0x80;
    Cart::from_parts(prg_rom, vec![], Mirroring::Horizontal, 0, RamState::AllZeros)
        .expect("valid cart")
}

fn bench_step_frame(c: &mut Criterion) {
    c.bench_function("step_frame", |b| {
        let mut console = Console::new();
        console.load_cart(bench_cart());
        b.iter(|| console.step_frame().expect("valid frame"));
    });
}

criterion_group!(benches, bench_step_frame);
criterion_main!(benches);
