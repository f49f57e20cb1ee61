//! Mapper banking and IRQ scenarios.

use famicore::{
    bus::Bus,
    cart::Cart,
    mapper::{Mapped, MappedRead, Mapper, MemMap},
    mem::RamState,
    ppu::Mirroring,
};

mod common;

/// PRG-ROM where every 16K bank is filled with its own bank number.
fn banked_prg(banks: usize) -> Vec<u8> {
    let mut prg = vec![0x00; banks * 0x4000];
    for (i, chunk) in prg.chunks_mut(0x4000).enumerate() {
        chunk.fill(i as u8);
    }
    prg
}

fn load_bus(cart: Cart) -> Bus {
    let mut bus = Bus::default();
    bus.load_cart(cart);
    bus
}

#[test]
fn nrom_128_mirrors_prg() {
    common::init();
    let mut prg = vec![0x00; 0x4000];
    prg[0x0000] = 0xAA;
    prg[0x3FFF] = 0xBB;
    let cart = Cart::from_parts(prg, vec![], Mirroring::Horizontal, 0, RamState::AllZeros)
        .expect("valid cart");
    let mut bus = load_bus(cart);

    assert_eq!(bus.read(0x8000), 0xAA);
    assert_eq!(bus.read(0xC000), 0xAA, "16K PRG mirrors at $C000");
    assert_eq!(bus.read(0xBFFF), 0xBB);
    assert_eq!(bus.read(0xFFFF), 0xBB);
}

#[test]
fn uxrom_switches_low_bank_and_fixes_last() {
    common::init();
    let cart = Cart::from_parts(
        banked_prg(8),
        vec![],
        Mirroring::Vertical,
        2,
        RamState::AllZeros,
    )
    .expect("valid cart");
    let mut bus = load_bus(cart);

    assert_eq!(bus.read(0xC000), 7, "last bank fixed at $C000");
    for bank in 0..8u8 {
        bus.write(0x8000, bank);
        assert_eq!(bus.read(0x8000), bank, "selected bank {bank}");
        assert_eq!(bus.read(0xC000), 7, "last bank stays fixed");
    }
    // Bank select wraps modulo the PRG-ROM size
    bus.write(0x8000, 9);
    assert_eq!(bus.read(0x8000), 1);
}

/// Write one serial bit to an MMC1 register port, spacing writes apart the
/// way real code does (consecutive-cycle writes are ignored).
fn mmc1_write(bus: &mut Bus, addr: u16, val: u8) {
    bus.write(addr, val);
    bus.tick(2);
}

#[test]
fn mmc1_serial_shift_register() {
    common::init();
    let cart = Cart::from_parts(
        banked_prg(8),
        vec![],
        Mirroring::Horizontal,
        1,
        RamState::AllZeros,
    )
    .expect("valid cart");
    let mut bus = load_bus(cart);

    // Five writes, LSB first: 1,1,1,1,0 -> %01111 latched into the PRG bank
    // register on the fifth write
    for bit in [0x01, 0x01, 0x01, 0x01, 0x00] {
        mmc1_write(&mut bus, 0xE000, bit);
    }
    let Mapper::Mmc1(mmc1) = &bus.ppu.bus.mapper else {
        panic!("expected MMC1");
    };
    assert_eq!(mmc1.prg_bank(), 0x0F);

    // Bit 7 resets the shift register and ORs control with $0C, locking the
    // last bank at $C000
    mmc1_write(&mut bus, 0xE000, 0x80);
    let Mapper::Mmc1(mmc1) = &bus.ppu.bus.mapper else {
        panic!("expected MMC1");
    };
    assert_eq!(mmc1.control() & 0x0C, 0x0C);
    assert_eq!(bus.read(0xC000), 7, "last bank locked at $C000");
}

#[test]
fn mmc1_control_selects_mirroring() {
    common::init();
    let cart = Cart::from_parts(
        banked_prg(2),
        vec![],
        Mirroring::Horizontal,
        1,
        RamState::AllZeros,
    )
    .expect("valid cart");
    let mut bus = load_bus(cart);

    // Control = %00010: vertical mirroring
    for bit in [0x00, 0x01, 0x00, 0x00, 0x00] {
        mmc1_write(&mut bus, 0x8000, bit);
    }
    assert_eq!(bus.ppu.bus.mapper.mirroring(), Mirroring::Vertical);

    // Control = %00000: single screen, lower bank
    for bit in [0x00, 0x00, 0x00, 0x00, 0x00] {
        mmc1_write(&mut bus, 0x8000, bit);
    }
    assert_eq!(bus.ppu.bus.mapper.mirroring(), Mirroring::SingleScreenA);
}

/// 8K-bank PRG for MMC3, each bank filled with its own number.
fn mmc3_cart() -> Cart {
    let mut prg = vec![0x00; 8 * 0x2000];
    for (i, chunk) in prg.chunks_mut(0x2000).enumerate() {
        chunk.fill(i as u8);
    }
    Cart::from_parts(prg, vec![], Mirroring::Horizontal, 4, RamState::AllZeros)
        .expect("valid cart")
}

#[test]
fn mmc3_prg_bank_modes() {
    common::init();
    let mut bus = load_bus(mmc3_cart());

    // Mode 0: $8000 switchable, $C000 fixed to second-to-last
    bus.write(0x8000, 6);
    bus.write(0x8001, 2);
    assert_eq!(bus.read(0x8000), 2);
    assert_eq!(bus.read(0xC000), 6, "second-to-last bank");
    assert_eq!(bus.read(0xE000), 7, "last bank always fixed");

    // Mode 1: the $8000 and $C000 windows swap
    bus.write(0x8000, 0x46);
    assert_eq!(bus.read(0x8000), 6);
    assert_eq!(bus.read(0xC000), 2);
    assert_eq!(bus.read(0xE000), 7);
}

#[test]
fn mmc3_chr_inversion() {
    common::init();
    let mut chr = vec![0x00; 0x2000];
    for (i, chunk) in chr.chunks_mut(0x0400).enumerate() {
        chunk.fill(i as u8);
    }
    let cart = Cart::from_parts(
        banked_prg(2),
        chr,
        Mirroring::Horizontal,
        4,
        RamState::AllZeros,
    )
    .expect("valid cart");
    let mut bus = load_bus(cart);

    // R0 = 2K bank at $0000 (banks 2,3), R2 = 1K bank at $1000 (bank 5)
    bus.write(0x8000, 0);
    bus.write(0x8001, 2);
    bus.write(0x8000, 2);
    bus.write(0x8001, 5);
    assert_eq!(bus.ppu.bus.read_chr(0x0000), 2);
    assert_eq!(bus.ppu.bus.read_chr(0x0400), 3);
    assert_eq!(bus.ppu.bus.read_chr(0x1000), 5);

    // CHR inversion swaps the layouts
    bus.write(0x8000, 0x80);
    assert_eq!(bus.ppu.bus.read_chr(0x1000), 2);
    assert_eq!(bus.ppu.bus.read_chr(0x0000), 5);
}

#[test]
fn mmc3_scanline_irq_counts_down() {
    common::init();
    let mut bus = load_bus(mmc3_cart());

    bus.write(0xC000, 0x03); // latch
    bus.write(0xC001, 0x00); // reload on next clock
    bus.write(0xE001, 0x00); // enable

    let mapper = &mut bus.ppu.bus.mapper;
    mapper.on_scanline(); // reload to 3
    mapper.on_scanline(); // 2
    mapper.on_scanline(); // 1
    assert!(!mapper.irq_pending());
    mapper.on_scanline(); // 0 -> IRQ
    assert!(mapper.irq_pending(), "counter reaching zero raises IRQ");

    bus.write(0xE000, 0x00); // disable + acknowledge
    assert!(!bus.ppu.bus.mapper.irq_pending());
}

#[test]
fn mmc3_mirroring_register() {
    common::init();
    let mut bus = load_bus(mmc3_cart());
    bus.write(0xA000, 0x00);
    assert_eq!(bus.ppu.bus.mapper.mirroring(), Mirroring::Vertical);
    bus.write(0xA000, 0x01);
    assert_eq!(bus.ppu.bus.mapper.mirroring(), Mirroring::Horizontal);
}

#[test]
fn prg_ram_is_readable_and_writable() {
    common::init();
    let mut bus = load_bus(mmc3_cart());
    bus.write(0x6000, 0x5A);
    assert_eq!(bus.read(0x6000), 0x5A);
    assert_eq!(bus.sram()[0], 0x5A, "sram view exposes prg-ram");
}

#[test]
fn unmapped_windows_read_open_bus() {
    common::init();
    let cart = Cart::from_parts(
        banked_prg(1),
        vec![],
        Mirroring::Horizontal,
        2,
        RamState::AllZeros,
    )
    .expect("valid cart");
    let mut bus = load_bus(cart);

    // UxROM doesn't map $4020-$5FFF; reads return the last driven value
    let open = bus.read(0x8000);
    assert_eq!(bus.read(0x5000), open);
    let Mapper::Uxrom(uxrom) = &bus.ppu.bus.mapper else {
        panic!("expected UxROM");
    };
    assert_eq!(uxrom.map_peek(0x5000), MappedRead::Bus);
}
