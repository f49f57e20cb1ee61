//! NES PPU (Picture Processing Unit) implementation.
//!
//! <https://wiki.nesdev.org/w/index.php/PPU>

use crate::{
    common::{Clock, Reset, ResetKind},
    mapper::Mapped,
    mem::{Memory, RamState},
    ppu::{
        bus::Bus, ctrl::Ctrl, frame::Frame, mask::Mask, scroll::Scroll, sprite::Sprite,
        status::Status,
    },
};
use serde::{Deserialize, Serialize};
use tracing::trace;

pub mod bus;
pub mod ctrl;
pub mod frame;
pub mod mask;
pub mod scroll;
pub mod sprite;
pub mod status;

/// Nametable mirroring mode.
///
/// <https://wiki.nesdev.org/w/index.php/Mirroring#Nametable_Mirroring>
#[derive(Default, Debug, Copy, Clone, Eq, PartialEq, Serialize, Deserialize)]
#[must_use]
pub enum Mirroring {
    Vertical = 0,
    #[default]
    Horizontal = 1,
    SingleScreenA = 2,
    SingleScreenB = 3,
    FourScreen = 4,
}

/// NES PPU.
///
/// See: <https://wiki.nesdev.org/w/index.php/PPU>
#[derive(Debug, Clone, Serialize, Deserialize)]
#[must_use]
pub struct Ppu {
    /// (0, 340) dots per scanline.
    pub cycle: u32,
    /// (0, 261) scanlines per frame.
    pub scanline: u32,
    /// Double-buffered pixel output.
    pub frame: Frame,

    /// $2000 PPUCTRL (write-only).
    pub ctrl: Ctrl,
    /// $2001 PPUMASK (write-only).
    pub mask: Mask,
    /// $2002 PPUSTATUS (read-only).
    pub status: Status,
    /// $2005 PPUSCROLL and $2006 PPUADDR (write-only).
    pub scroll: Scroll,
    /// PPU memory/data bus.
    pub bus: Bus,

    /// $2003 OAMADDR (write-only).
    pub oamaddr: u8,
    /// $2004 Object Attribute Memory (OAM) data (read/write).
    pub oam: Memory,
    /// Secondary OAM for the sprites on the upcoming scanline.
    pub secondary_oam: Memory,
    /// Up to eight sprite units loaded for the current scanline.
    pub sprites: [Sprite; 8],
    pub spr_count: usize,
    pub spr_zero_visible: bool,

    /// $2007 PPUDATA read buffer.
    pub vram_buffer: u8,
    pub open_bus: u8,
    /// NMI latch consumed by the console once per CPU step.
    pub nmi_pending: bool,

    // Background pipeline
    tile_shift_lo: u16,
    tile_shift_hi: u16,
    tile_lo: u8,
    tile_hi: u8,
    tile_addr: u16,
    prev_palette: u8,
    curr_palette: u8,
    next_palette: u8,
}

impl Default for Ppu {
    fn default() -> Self {
        Self::new(RamState::default())
    }
}

impl Ppu {
    pub const WIDTH: u32 = Frame::WIDTH;
    pub const HEIGHT: u32 = Frame::HEIGHT;

    pub const NT_START: u16 = 0x2000;
    pub const PALETTE_START: u16 = 0x3F00;

    pub const OAM_SIZE: usize = 256; // 64 4-byte sprites per frame
    pub const SECONDARY_OAM_SIZE: usize = 32; // 8 4-byte sprites per scanline

    // Dots
    // https://www.nesdev.org/wiki/PPU_rendering
    pub const VBLANK: u32 = 1; // When the VBlank flag gets set
    pub const VISIBLE_START: u32 = 1; // Tile data fetching starts
    pub const INC_Y: u32 = 256; // Increment Y scroll at the end of the line
    pub const VISIBLE_END: u32 = 256; // 2 dots each for 4 fetches = 32 tiles
    pub const SPR_FETCH_START: u32 = 257; // Sprite fetches for the next scanline
    pub const ON_SCANLINE: u32 = 260; // Mapper scanline notification
    pub const COPY_Y_START: u32 = 280; // Copy Y scroll start
    pub const COPY_Y_END: u32 = 304; // Copy Y scroll stop
    pub const SPR_FETCH_END: u32 = 320; // 8 dots each for 8 sprites
    pub const BG_PREFETCH_START: u32 = 321; // Tile data for the next scanline
    pub const BG_PREFETCH_END: u32 = 336; // 2 dots each for 4 fetches = 2 tiles
    pub const ODD_SKIP: u32 = 339; // Odd rendered frames are one dot shorter
    pub const CYCLE_END: u32 = 340;

    // Scanlines
    pub const VISIBLE_SCANLINE_END: u32 = 239;
    pub const POSTRENDER_SCANLINE: u32 = 240;
    pub const VBLANK_SCANLINE: u32 = 241;
    pub const PRERENDER_SCANLINE: u32 = 261;

    /// The 64-color master palette applied to palette RAM indices.
    #[rustfmt::skip]
    pub const SYSTEM_PALETTE: [(u8, u8, u8); 64] = [
        // 0x00
        (0x54, 0x54, 0x54), (0x00, 0x1E, 0x74), (0x08, 0x10, 0x90), (0x30, 0x00, 0x88), // $00-$03
        (0x44, 0x00, 0x64), (0x5C, 0x00, 0x30), (0x54, 0x04, 0x00), (0x3C, 0x18, 0x00), // $04-$07
        (0x20, 0x2A, 0x00), (0x08, 0x3A, 0x00), (0x00, 0x40, 0x00), (0x00, 0x3C, 0x00), // $08-$0B
        (0x00, 0x32, 0x3C), (0x00, 0x00, 0x00), (0x00, 0x00, 0x00), (0x00, 0x00, 0x00), // $0C-$0F
        // 0x10
        (0x98, 0x96, 0x98), (0x08, 0x4C, 0xC4), (0x30, 0x32, 0xEC), (0x5C, 0x1E, 0xE4), // $10-$13
        (0x88, 0x14, 0xB0), (0xA0, 0x14, 0x64), (0x98, 0x22, 0x20), (0x78, 0x3C, 0x00), // $14-$17
        (0x54, 0x5A, 0x00), (0x28, 0x72, 0x00), (0x08, 0x7C, 0x00), (0x00, 0x76, 0x28), // $18-$1B
        (0x00, 0x66, 0x78), (0x00, 0x00, 0x00), (0x00, 0x00, 0x00), (0x00, 0x00, 0x00), // $1C-$1F
        // 0x20
        (0xEC, 0xEE, 0xEC), (0x4C, 0x9A, 0xEC), (0x78, 0x7C, 0xEC), (0xB0, 0x62, 0xEC), // $20-$23
        (0xE4, 0x54, 0xEC), (0xEC, 0x58, 0xB4), (0xEC, 0x6A, 0x64), (0xD4, 0x88, 0x20), // $24-$27
        (0xA0, 0xAA, 0x00), (0x74, 0xC4, 0x00), (0x4C, 0xD0, 0x20), (0x38, 0xCC, 0x6C), // $28-$2B
        (0x38, 0xB4, 0xCC), (0x3C, 0x3C, 0x3C), (0x00, 0x00, 0x00), (0x00, 0x00, 0x00), // $2C-$2F
        // 0x30
        (0xEC, 0xEE, 0xEC), (0xA8, 0xCC, 0xEC), (0xBC, 0xBC, 0xEC), (0xD4, 0xB2, 0xEC), // $30-$33
        (0xEC, 0xAE, 0xEC), (0xEC, 0xAE, 0xD4), (0xEC, 0xB4, 0xB0), (0xE4, 0xC4, 0x90), // $34-$37
        (0xCC, 0xD2, 0x78), (0xB4, 0xDE, 0x78), (0xA8, 0xE2, 0x90), (0x98, 0xE2, 0xB4), // $38-$3B
        (0xA0, 0xD6, 0xE4), (0xA0, 0xA2, 0xA0), (0x00, 0x00, 0x00), (0x00, 0x00, 0x00), // $3C-$3F
    ];

    pub fn new(ram_state: RamState) -> Self {
        Self {
            cycle: 0,
            scanline: 0,
            frame: Frame::new(),

            ctrl: Ctrl::new(),
            mask: Mask::new(),
            status: Status::new(),
            scroll: Scroll::new(),
            bus: Bus::new(ram_state),

            oamaddr: 0x00,
            oam: Memory::ram(ram_state, Self::OAM_SIZE),
            secondary_oam: Memory::ram(ram_state, Self::SECONDARY_OAM_SIZE),
            sprites: [Sprite::new(); 8],
            spr_count: 0,
            spr_zero_visible: false,

            vram_buffer: 0x00,
            open_bus: 0x00,
            nmi_pending: false,

            tile_shift_lo: 0x0000,
            tile_shift_hi: 0x0000,
            tile_lo: 0x00,
            tile_hi: 0x00,
            tile_addr: 0x0000,
            prev_palette: 0x00,
            curr_palette: 0x00,
            next_palette: 0x00,
        }
    }

    /// The last completed frame: 256x240 `0x00RRGGBB` pixels.
    #[inline]
    #[must_use]
    pub fn frame_buffer(&self) -> &[u32] {
        self.frame.completed_buffer()
    }

    /// The number of completed frames.
    #[inline]
    #[must_use]
    pub const fn frame_number(&self) -> u32 {
        self.frame.number()
    }

    /// The current nametable mirroring mode.
    #[inline]
    pub fn mirroring(&self) -> Mirroring {
        self.bus.mirroring()
    }

    /// Consume the pending NMI latch, if set.
    #[inline]
    #[must_use]
    pub fn take_nmi(&mut self) -> bool {
        std::mem::take(&mut self.nmi_pending)
    }

    // Register file ($2000-$2007, mirrored through $3FFF)

    /// $2000 PPUCTRL (write).
    pub fn write_ctrl(&mut self, val: u8) {
        self.open_bus = val;
        self.ctrl.write(val);
        self.scroll.write_nametable_select(val);

        // By toggling NMI enable during VBlank without reading $2002, /NMI can
        // be pulled low multiple times, generating multiple NMIs per frame
        if !self.ctrl.nmi_enabled {
            self.nmi_pending = false;
        } else if self.status.in_vblank {
            trace!(
                "$2000 NMI during VBL - PPU:{:3},{:3}",
                self.cycle,
                self.scanline
            );
            self.nmi_pending = true;
        }
    }

    /// $2001 PPUMASK (write).
    pub fn write_mask(&mut self, val: u8) {
        self.open_bus = val;
        self.mask.write(val);
    }

    /// $2002 PPUSTATUS (read). Clears the VBlank flag and the write toggle.
    pub fn read_status(&mut self) -> u8 {
        let status = self.peek_status();
        self.nmi_pending = false;
        self.status.reset_in_vblank();
        self.scroll.reset_latch();
        self.open_bus |= status & 0xE0;
        status
    }

    /// $2002 PPUSTATUS without side effects.
    #[must_use]
    pub const fn peek_status(&self) -> u8 {
        // Only the upper 3 bits are driven for this register
        (self.status.read() & 0xE0) | (self.open_bus & 0x1F)
    }

    /// $2003 OAMADDR (write).
    pub fn write_oamaddr(&mut self, val: u8) {
        self.open_bus = val;
        self.oamaddr = val;
    }

    /// $2004 OAMDATA (read).
    pub fn read_oamdata(&mut self) -> u8 {
        let val = self.peek_oamdata();
        self.open_bus = val;
        val
    }

    /// $2004 OAMDATA without side effects.
    #[must_use]
    pub fn peek_oamdata(&self) -> u8 {
        self.oam[self.oamaddr as usize]
    }

    /// $2004 OAMDATA (write). Writes auto-increment OAMADDR.
    pub fn write_oamdata(&mut self, mut val: u8) {
        self.open_bus = val;
        if self.mask.rendering_enabled
            && (self.scanline <= Self::VISIBLE_SCANLINE_END
                || self.scanline == Self::PRERENDER_SCANLINE)
        {
            // Writes during rendering don't modify OAM, but do perform a
            // glitch increment of the high 6 bits of OAMADDR
            self.oamaddr = self.oamaddr.wrapping_add(4);
        } else {
            if self.oamaddr & 0x03 == 0x02 {
                // Bits 2-4 of sprite attributes are unimplemented and read 0
                val &= 0xE3;
            }
            self.oam[self.oamaddr as usize] = val;
            self.oamaddr = self.oamaddr.wrapping_add(1);
        }
    }

    /// $2005 PPUSCROLL (write).
    pub fn write_scroll(&mut self, val: u8) {
        self.open_bus = val;
        self.scroll.write(val);
    }

    /// $2006 PPUADDR (write).
    pub fn write_addr(&mut self, val: u8) {
        self.open_bus = val;
        self.scroll.write_addr(val);
    }

    /// $2007 PPUDATA (read). Reads are buffered except for palette RAM.
    pub fn read_data(&mut self) -> u8 {
        let addr = self.scroll.addr();
        self.increment_vram_addr();

        let val = self.bus.read(addr);
        let val = if addr < Self::PALETTE_START {
            let buffer = self.vram_buffer;
            self.vram_buffer = val;
            buffer
        } else {
            // Palette reads bypass the buffer, but still load it with the
            // mirrored nametable byte beneath
            self.vram_buffer = self.bus.read(addr - 0x1000);
            // Hi 2 bits of palette are open bus
            val | (self.open_bus & 0xC0)
        };

        self.open_bus = val;
        trace!(
            "$2007 read: {val:02X} - PPU:{:3},{:3}",
            self.cycle,
            self.scanline
        );
        val
    }

    /// $2007 PPUDATA without side effects.
    #[must_use]
    pub fn peek_data(&self) -> u8 {
        let addr = self.scroll.addr();
        if addr < Self::PALETTE_START {
            self.vram_buffer
        } else {
            self.bus.peek(addr) | (self.open_bus & 0xC0)
        }
    }

    /// $2007 PPUDATA (write).
    pub fn write_data(&mut self, val: u8) {
        self.open_bus = val;
        let addr = self.scroll.addr();
        self.increment_vram_addr();
        self.bus.write(addr, val);
    }

    /// $4014 OAM DMA sink: one byte per DMA cycle, starting at OAMADDR with
    /// wrap-around.
    pub fn write_dma(&mut self, val: u8) {
        self.oam[self.oamaddr as usize] = val;
        self.oamaddr = self.oamaddr.wrapping_add(1);
    }

    fn increment_vram_addr(&mut self) {
        // During rendering, reads/writes of $2007 glitch-increment coarse X
        // and fine Y simultaneously
        if self.mask.rendering_enabled
            && (self.scanline == Self::PRERENDER_SCANLINE
                || self.scanline <= Self::VISIBLE_SCANLINE_END)
        {
            self.scroll.increment_x();
            self.scroll.increment_y();
        } else {
            self.scroll.increment(self.ctrl.vram_increment);
        }
    }

    fn start_vblank(&mut self) {
        trace!("Start VBL - PPU:{:3},{:3}", self.cycle, self.scanline);
        self.status.set_in_vblank(true);
        if self.ctrl.nmi_enabled {
            self.nmi_pending = true;
            trace!("VBL NMI - PPU:{:3},{:3}", self.cycle, self.scanline);
        }
    }

    fn stop_vblank(&mut self) {
        trace!(
            "Stop VBL, Sprite0 Hit, Overflow - PPU:{:3},{:3}",
            self.cycle,
            self.scanline
        );
        self.status.set_spr_zero_hit(false);
        self.status.set_spr_overflow(false);
        self.status.reset_in_vblank();
        self.nmi_pending = false;
        self.open_bus = 0x00; // Clear open bus every frame
    }

    /// Fetch BG nametable byte.
    ///
    /// See: <https://wiki.nesdev.org/w/index.php/PPU_scrolling#Tile_and_attribute_fetching>
    fn fetch_bg_nt_byte(&mut self) {
        self.prev_palette = self.curr_palette;
        self.curr_palette = self.next_palette;

        self.tile_shift_lo |= u16::from(self.tile_lo);
        self.tile_shift_hi |= u16::from(self.tile_hi);

        let addr = Self::NT_START | (self.scroll.addr() & 0x0FFF);
        let tile_index = u16::from(self.bus.read_ciram(addr));
        self.tile_addr = self.ctrl.bg_select | (tile_index << 4) | self.scroll.fine_y();
    }

    /// Fetch BG attribute byte.
    fn fetch_bg_attr_byte(&mut self) {
        let addr = self.scroll.attr_addr();
        let shift = self.scroll.attr_shift();
        self.next_palette = ((self.bus.read_ciram(addr) >> shift) & 0x03) << 2;
    }

    /// Fetch 4 tile bytes every 8 dots, feeding the two pairs of shift
    /// registers. Each fetch takes 2 dots.
    fn fetch_background(&mut self) {
        match self.cycle & 0x07 {
            0 => {
                // Increment coarse X every 8 dots since tiles are 8x wide
                self.scroll.increment_x();
                // 256, increment fine Y at the end of the visible line
                if self.cycle == Self::INC_Y {
                    self.scroll.increment_y();
                }
            }
            1 => self.fetch_bg_nt_byte(),
            3 => self.fetch_bg_attr_byte(),
            5 => self.tile_lo = self.bus.read_chr(self.tile_addr),
            7 => self.tile_hi = self.bus.read_chr(self.tile_addr + 8),
            _ => (),
        }
    }

    /// Scan OAM for sprites intersecting the current scanline, copying up to
    /// eight into secondary OAM. A ninth in-range sprite sets the overflow
    /// flag. The sprites render on the following scanline.
    fn evaluate_sprites(&mut self) {
        self.secondary_oam.fill(0xFF);
        self.spr_zero_visible = false;

        let height = self.ctrl.spr_height;
        let mut count = 0;
        for i in 0..64 {
            let y = u32::from(self.oam[i * 4]);
            if !(y..y + height).contains(&self.scanline) {
                continue;
            }
            if count < 8 {
                let src = i * 4;
                let dst = count * 4;
                let entry: [u8; 4] = self.oam[src..src + 4].try_into().expect("4-byte sprite");
                self.secondary_oam[dst..dst + 4].copy_from_slice(&entry);
                if i == 0 {
                    self.spr_zero_visible = true;
                }
                count += 1;
            } else {
                self.status.set_spr_overflow(true);
                break;
            }
        }
        self.spr_count = count;
    }

    /// Load one sprite unit from secondary OAM (dots 257-320, one per 8).
    fn load_sprite(&mut self, idx: usize) {
        if idx >= self.spr_count {
            return;
        }
        let o = idx * 4;
        let y = u32::from(self.secondary_oam[o]);
        let tile_index = u16::from(self.secondary_oam[o + 1]);
        let attr = self.secondary_oam[o + 2];
        let x = u32::from(self.secondary_oam[o + 3]);

        let flip_vertical = attr & 0x80 == 0x80;
        let height = self.ctrl.spr_height;
        let mut line_offset = self.scanline.saturating_sub(y);
        if flip_vertical {
            line_offset = height - 1 - line_offset;
        }

        let tile_addr = if height == 16 {
            // Bit 0 of the tile index selects the pattern table
            let spr_select = (tile_index & 0x01) * 0x1000;
            if line_offset >= 8 {
                line_offset += 8;
            }
            spr_select | ((tile_index & 0xFE) << 4) | line_offset as u16
        } else {
            self.ctrl.spr_select | (tile_index << 4) | line_offset as u16
        };

        let tile_lo = self.bus.read_chr(tile_addr);
        let tile_hi = self.bus.read_chr(tile_addr + 8);
        self.sprites[idx] = Sprite {
            x,
            y,
            tile_lo,
            tile_hi,
            palette: ((attr & 0x03) << 2) | 0x10,
            bg_priority: attr & 0x20 == 0x20,
            flip_horizontal: attr & 0x40 == 0x40,
            flip_vertical,
        };
    }

    /// Select the palette index for the current dot from the background shift
    /// registers and the loaded sprite units.
    fn pixel_palette(&mut self) -> u8 {
        let x = self.cycle - 1;

        let bg_color = if self.mask.show_bg() && (self.mask.show_left_bg() || x >= 8) {
            let shift = 15 - self.scroll.fine_x;
            ((((self.tile_shift_hi >> shift) & 0x01) << 1) | ((self.tile_shift_lo >> shift) & 0x01))
                as u8
        } else {
            0
        };

        if self.mask.show_spr() && (self.mask.show_left_spr() || x >= 8) {
            for (i, sprite) in self.sprites.iter().take(self.spr_count).enumerate() {
                let shift = x.wrapping_sub(sprite.x);
                if shift > 7 {
                    continue;
                }

                let shift = if sprite.flip_horizontal {
                    shift
                } else {
                    7 - shift
                };
                let spr_color =
                    (((sprite.tile_hi >> shift) & 0x01) << 1) | ((sprite.tile_lo >> shift) & 0x01);

                if spr_color != 0 {
                    if i == 0
                        && bg_color != 0
                        && x != 255
                        && self.spr_zero_visible
                        && self.mask.rendering_enabled
                        && !self.status.spr_zero_hit
                    {
                        self.status.set_spr_zero_hit(true);
                    }

                    if bg_color == 0 || !sprite.bg_priority {
                        return sprite.palette + spr_color;
                    }
                    break;
                }
            }
        }

        if (self.scroll.fine_x + ((x & 0x07) as u16)) < 8 {
            self.prev_palette + bg_color
        } else {
            self.curr_palette + bg_color
        }
    }

    fn render_pixel(&mut self) {
        let addr = self.scroll.addr();
        // Pixels are drawn even with rendering disabled; that is what blanks
        // the screen (or shows the backdrop color the v address points at)
        let index = if self.mask.rendering_enabled
            || (addr & Self::PALETTE_START) != Self::PALETTE_START
        {
            let palette = u16::from(self.pixel_palette());
            self.bus
                .peek_palette(Self::PALETTE_START | ((palette & 0x03 > 0) as u16 * palette))
        } else {
            self.bus.peek_palette(addr)
        };

        let (r, g, b) = Self::SYSTEM_PALETTE[usize::from(index & self.mask.grayscale())];
        self.frame
            .set_pixel(self.cycle - 1, self.scanline, u32::from_be_bytes([0, r, g, b]));
    }

    fn tick(&mut self) {
        let cycle = self.cycle;
        let scanline = self.scanline;
        let visible_cycle = matches!(cycle, Self::VISIBLE_START..=Self::VISIBLE_END);
        let bg_prefetch_cycle = matches!(cycle, Self::BG_PREFETCH_START..=Self::BG_PREFETCH_END);
        let visible_scanline = scanline <= Self::VISIBLE_SCANLINE_END;

        if self.mask.rendering_enabled {
            let prerender_scanline = scanline == Self::PRERENDER_SCANLINE;
            if prerender_scanline || visible_scanline {
                match cycle {
                    // 1..=256
                    Self::VISIBLE_START..=Self::VISIBLE_END => self.fetch_background(),
                    // 257..=320
                    Self::SPR_FETCH_START..=Self::SPR_FETCH_END => {
                        // 257
                        if cycle == Self::SPR_FETCH_START {
                            // Copy X bits since new x values are about to be
                            // written to t
                            self.scroll.copy_x();
                            if visible_scanline {
                                self.evaluate_sprites();
                            } else {
                                // No evaluation on the pre-render line, so no
                                // sprites ever land on scanline 0
                                self.spr_count = 0;
                                self.spr_zero_visible = false;
                            }
                        }
                        // OAMADDR is reset during sprite fetches
                        self.oamaddr = 0x00;
                        if cycle == Self::ON_SCANLINE && visible_scanline {
                            self.bus.mapper.on_scanline();
                        }
                        if prerender_scanline
                            // 280..=304
                            && matches!(cycle, Self::COPY_Y_START..=Self::COPY_Y_END)
                        {
                            // Y scroll bits reload during this dot range of
                            // the pre-render line
                            self.scroll.copy_y();
                        }
                        if cycle & 0x07 == 0x04 {
                            self.load_sprite(((cycle - Self::SPR_FETCH_START) / 8) as usize);
                        }
                    }
                    // 321..=340
                    Self::BG_PREFETCH_START..=Self::CYCLE_END => {
                        if cycle <= Self::BG_PREFETCH_END {
                            self.fetch_background();
                        } else {
                            // 337..=340, dummy nametable fetches
                            self.fetch_bg_nt_byte();
                        }

                        if prerender_scanline && cycle == Self::ODD_SKIP && self.frame.is_odd() {
                            // Odd frames skip one dot when rendering is
                            // enabled (339 jumps over 340 to 0)
                            trace!(
                                "skipped odd frame dot: {} - PPU:{cycle:3},{scanline:3}",
                                self.frame_number()
                            );
                            self.cycle = Self::CYCLE_END;
                        }
                    }
                    _ => (),
                }
            }
        }

        if visible_scanline && visible_cycle {
            self.render_pixel();
        }
        // Shift registers advance after the pixel is produced
        if visible_cycle || bg_prefetch_cycle {
            self.tile_shift_lo <<= 1;
            self.tile_shift_hi <<= 1;
        }
    }
}

impl Clock for Ppu {
    fn clock(&mut self) -> usize {
        if self.cycle < Self::CYCLE_END {
            self.cycle += 1;
            self.tick();

            if self.cycle == Self::VBLANK {
                if self.scanline == Self::VBLANK_SCANLINE {
                    self.start_vblank();
                } else if self.scanline == Self::PRERENDER_SCANLINE {
                    self.stop_vblank();
                }
            }
        } else {
            self.cycle = 0;
            self.scanline += 1;
            if self.scanline == Self::POSTRENDER_SCANLINE {
                // All visible pixels are drawn; present the frame
                self.frame.increment();
            } else if self.scanline > Self::PRERENDER_SCANLINE {
                self.scanline = 0;
                self.spr_count = 0;
                self.spr_zero_visible = false;
            }
        }

        1
    }
}

impl Reset for Ppu {
    fn reset(&mut self, kind: ResetKind) {
        self.cycle = 0;
        self.scanline = 0;
        self.ctrl.reset(kind);
        self.mask.reset(kind);
        self.status.reset(kind);
        self.scroll.reset(kind);
        self.oamaddr = 0x00;
        self.vram_buffer = 0x00;
        self.open_bus = 0x00;
        self.nmi_pending = false;
        self.spr_count = 0;
        self.spr_zero_visible = false;
        self.tile_shift_lo = 0x0000;
        self.tile_shift_hi = 0x0000;
        self.tile_lo = 0x00;
        self.tile_hi = 0x00;
        self.tile_addr = 0x0000;
        self.prev_palette = 0x00;
        self.curr_palette = 0x00;
        self.next_palette = 0x00;
        if kind == ResetKind::Hard {
            self.oam.fill(0x00);
            self.secondary_oam.fill(0x00);
        }
    }
}
