//! PPU pipeline scenarios: frame timing, VBlank/NMI timing, and
//! sprite-zero-hit through real pattern data.

use famicore::{
    bus::Bus,
    cart::Cart,
    common::Clock,
    mem::RamState,
    ppu::Ppu,
};

mod common;

const DOTS_PER_SCANLINE: u32 = 341;
const SCANLINES_PER_FRAME: u32 = 262;
const DOTS_PER_FRAME: u32 = DOTS_PER_SCANLINE * SCANLINES_PER_FRAME; // 89342

#[test]
fn frame_length_with_rendering_disabled() {
    common::init();
    let mut ppu = Ppu::new(RamState::AllZeros);

    for _ in 0..DOTS_PER_FRAME {
        ppu.clock();
    }
    assert_eq!(ppu.frame_number(), 1);
    assert_eq!((ppu.scanline, ppu.cycle), (0, 0), "back at the origin");

    // Without rendering, odd frames are full length too
    for _ in 0..DOTS_PER_FRAME {
        ppu.clock();
    }
    assert_eq!(ppu.frame_number(), 2);
    assert_eq!((ppu.scanline, ppu.cycle), (0, 0));
}

#[test]
fn odd_rendered_frames_are_one_dot_shorter() {
    common::init();
    let mut bus = Bus::default();
    bus.load_cart(Cart::empty());
    bus.write(0x2001, 0x08); // show background

    let ppu = &mut bus.ppu;
    // The pass leading into odd frame 1 skips dot 0 of its first scanline,
    // so it runs one dot short
    for _ in 0..DOTS_PER_FRAME - 1 {
        ppu.clock();
    }
    assert_eq!(ppu.frame_number(), 1);
    assert_eq!((ppu.scanline, ppu.cycle), (0, 0));

    // The pass into even frame 2 is full length
    for _ in 0..DOTS_PER_FRAME {
        ppu.clock();
    }
    assert_eq!(ppu.frame_number(), 2);
    assert_eq!((ppu.scanline, ppu.cycle), (0, 0));
}

#[test]
fn vblank_starts_at_dot_1_of_scanline_241() {
    common::init();
    let mut ppu = Ppu::new(RamState::AllZeros);
    ppu.write_ctrl(0x80); // NMI enable

    // Clock to scanline 241, dot 0: no NMI yet
    for _ in 0..241 * DOTS_PER_SCANLINE {
        ppu.clock();
    }
    assert_eq!((ppu.scanline, ppu.cycle), (241, 0));
    assert!(!ppu.status.in_vblank);
    assert!(!ppu.take_nmi());

    // One more dot sets the VBlank flag and raises NMI
    ppu.clock();
    assert!(ppu.status.in_vblank);
    assert!(ppu.take_nmi());
    assert!(!ppu.take_nmi(), "latch is consumed");
}

#[test]
fn vblank_flags_clear_on_prerender_line() {
    common::init();
    let mut ppu = Ppu::new(RamState::AllZeros);
    ppu.write_ctrl(0x80);

    for _ in 0..261 * DOTS_PER_SCANLINE + 1 {
        ppu.clock();
    }
    assert_eq!((ppu.scanline, ppu.cycle), (261, 1));
    assert!(!ppu.status.in_vblank, "VBlank cleared at pre-render dot 1");
    assert!(!ppu.status.spr_zero_hit);
    assert!(!ppu.status.spr_overflow);
}

#[test]
fn status_read_clears_vblank_flag() {
    common::init();
    let mut ppu = Ppu::new(RamState::AllZeros);
    for _ in 0..241 * DOTS_PER_SCANLINE + 1 {
        ppu.clock();
    }
    assert!(ppu.status.in_vblank);
    let status = ppu.read_status();
    assert_eq!(status & 0x80, 0x80, "read observes the flag");
    assert!(!ppu.status.in_vblank, "read clears it");
    assert_eq!(ppu.read_status() & 0x80, 0x00);
}

/// Build a bus whose cart has CHR-RAM tile 1 filled solid, the top-left
/// nametable row pointing at tile 1, and sprite 0 overlapping it.
fn sprite_zero_setup() -> Bus {
    let mut bus = Bus::default();
    bus.load_cart(Cart::empty());

    // Tile 1, low plane: 8 rows of $FF = pixel value 1 everywhere
    for row in 0..8 {
        bus.ppu.bus.write(0x0010 + row, 0xFF);
    }
    // Point the first two nametable rows at tile 1
    for tile in 0..64 {
        bus.ppu.bus.write(0x2000 + tile, 0x01);
    }
    // Sprite 0: y=0 (renders on scanlines 1-8), tile 1, no attributes, x=8
    bus.ppu.oam[0] = 0x00;
    bus.ppu.oam[1] = 0x01;
    bus.ppu.oam[2] = 0x00;
    bus.ppu.oam[3] = 0x08;
    bus
}

#[test]
fn sprite_zero_hit_on_opaque_overlap() {
    common::init();
    let mut bus = sprite_zero_setup();
    bus.write(0x2001, 0x1E); // show bg + sprites, no left clip

    for _ in 0..DOTS_PER_FRAME {
        bus.ppu.clock();
        if bus.ppu.status.spr_zero_hit {
            break;
        }
    }
    assert!(bus.ppu.status.spr_zero_hit, "opaque overlap sets the flag");
    assert!(
        bus.ppu.scanline <= 9,
        "hit lands within the sprite's rows, was scanline {}",
        bus.ppu.scanline
    );
}

#[test]
fn sprite_zero_hit_requires_rendering() {
    common::init();
    let mut bus = sprite_zero_setup();
    bus.write(0x2001, 0x00); // rendering disabled

    for _ in 0..DOTS_PER_FRAME {
        bus.ppu.clock();
    }
    assert!(!bus.ppu.status.spr_zero_hit);
}

#[test]
fn sprite_overflow_on_ninth_sprite() {
    common::init();
    let mut bus = Bus::default();
    bus.load_cart(Cart::empty());
    // Park every sprite offscreen, then put nine on scanline 10
    for i in 0..64 {
        bus.ppu.oam[i * 4] = 0xF0;
    }
    for i in 0..9 {
        bus.ppu.oam[i * 4] = 10;
        bus.ppu.oam[i * 4 + 3] = (i * 8) as u8;
    }
    bus.write(0x2001, 0x18);

    for _ in 0..12 * DOTS_PER_SCANLINE {
        bus.ppu.clock();
    }
    assert!(bus.ppu.status.spr_overflow);
}

#[test]
fn oamdata_writes_increment_oamaddr() {
    common::init();
    let mut ppu = Ppu::new(RamState::AllZeros);
    ppu.write_oamaddr(0xFE);
    ppu.write_oamdata(0x1F); // $FE is an attr byte: bits 2-4 read back 0
    ppu.write_oamdata(0x22);
    ppu.write_oamdata(0x33); // wraps to $00
    assert_eq!(ppu.oam[0xFE], 0x1F & 0xE3);
    assert_eq!(ppu.oam[0xFF], 0x22);
    assert_eq!(ppu.oam[0x00], 0x33);
}
