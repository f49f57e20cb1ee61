use famicore::{cart::Cart, mem::RamState, ppu::Mirroring};
use std::sync::OnceLock;

/// Initialize test logging once, honoring `RUST_LOG`.
pub fn init() {
    static INIT: OnceLock<()> = OnceLock::new();
    INIT.get_or_init(|| {
        let _ = tracing_subscriber::fmt()
            .compact()
            .with_env_filter(
                std::env::var("RUST_LOG").unwrap_or_else(|_| "warn".to_string()),
            )
            .with_writer(std::io::stderr)
            .try_init();
    });
}

/// Build an NROM cart whose PRG-ROM starts with `prg` at $8000, with the
/// reset vector pointing at $8000.
pub fn nrom_with_prg(prg: &[u8]) -> Cart {
    let mut prg_rom = vec![0x00; 0x8000];
    prg_rom[..prg.len()].copy_from_slice(prg);
    prg_rom[0x7FFC] = 0x00;
    prg_rom[0x7FFD] = 0x80;
    Cart::from_parts(prg_rom, vec![], Mirroring::Horizontal, 0, RamState::AllZeros)
        .expect("valid nrom cart")
}

/// Build an NROM cart with both an entry program and an NMI handler at
/// $8080, with vectors wired up.
pub fn nrom_with_nmi_handler(prg: &[u8], nmi: &[u8]) -> Cart {
    let mut prg_rom = vec![0x00; 0x8000];
    prg_rom[..prg.len()].copy_from_slice(prg);
    prg_rom[0x0080..0x0080 + nmi.len()].copy_from_slice(nmi);
    prg_rom[0x7FFA] = 0x80; // NMI -> $8080
    prg_rom[0x7FFB] = 0x80;
    prg_rom[0x7FFC] = 0x00; // Reset -> $8000
    prg_rom[0x7FFD] = 0x80;
    Cart::from_parts(prg_rom, vec![], Mirroring::Horizontal, 0, RamState::AllZeros)
        .expect("valid nrom cart")
}
