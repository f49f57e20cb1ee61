//! Console-level scenarios: DMA stalls, NMI cadence, register round-trips,
//! and the controller protocol.

use famicore::{
    console::Console,
    input::{JoypadBtn, Player},
};

mod common;

/// Fill $0200-$02FF with a ramp, then start OAM DMA from page 2.
#[rustfmt::skip]
const OAM_DMA_PRG: &[u8] = &[
    0xA2, 0x00,             // LDX #$00
    0x8A,                   // loop: TXA
    0x9D, 0x00, 0x02,       // STA $0200,X
    0xE8,                   // INX
    0xD0, 0xF9,             // BNE loop
    0xA9, 0x00,             // LDA #$00
    0x8D, 0x03, 0x20,       // STA $2003
    0xA9, 0x02,             // LDA #$02
    0x8D, 0x14, 0x40,       // STA $4014
    0xEA,                   // NOP
];

#[test]
fn oam_dma_copies_a_page_and_stalls() -> anyhow::Result<()> {
    common::init();
    let mut console = Console::new();
    console.load_cart(common::nrom_with_prg(OAM_DMA_PRG));

    // Run the fill loop up to the DMA store at $8010
    while console.cpu().pc != 0x8010 {
        console.step_instr()?;
    }
    let cycle_before = console.cpu().cycle;
    let dma_start = cycle_before + 4; // after the STA $4014 write
    let cycles = console.step_instr()?;
    assert_eq!(
        cycles,
        4 + 513 + (dma_start & 0x01),
        "store plus 513/514 stall cycles"
    );

    for i in 0..256 {
        assert_eq!(
            console.ppu().oam[i],
            console.bus().wram()[0x0200 + i],
            "OAM byte {i} copied from $02{i:02X}"
        );
        assert_eq!(console.ppu().oam[i], i as u8);
    }
    Ok(())
}

/// Enable NMI with rendering off, then spin.
#[rustfmt::skip]
const NMI_PRG: &[u8] = &[
    0xA9, 0x80,             // LDA #$80
    0x8D, 0x00, 0x20,       // STA $2000
    0x4C, 0x05, 0x80,       // spin: JMP spin
];

/// INC $10; RTI
const NMI_HANDLER: &[u8] = &[0xE6, 0x10, 0x40];

#[test]
fn vblank_nmi_fires_once_per_frame() -> anyhow::Result<()> {
    common::init();
    let mut console = Console::new();
    console.load_cart(common::nrom_with_nmi_handler(NMI_PRG, NMI_HANDLER));

    // The frame counter increments at the post-render line (240), one line
    // before VBlank starts, so frame N's NMI lands during the N+1th call
    console.step_frame()?;
    let mut last = console.bus().wram()[0x10];
    assert_eq!(last, 0, "no NMI before the first VBlank");
    for _ in 0..5 {
        console.step_frame()?;
        let count = console.bus().wram()[0x10];
        assert_eq!(count, last + 1, "exactly one NMI per frame");
        last = count;
    }
    Ok(())
}

#[test]
fn ppuaddr_ppudata_round_trip() -> anyhow::Result<()> {
    common::init();
    let mut console = Console::new();
    console.load_cart(common::nrom_with_prg(&[0xEA]));
    let bus = console.bus_mut();

    // Write eight bytes starting at $2100
    bus.write(0x2006, 0x21);
    bus.write(0x2006, 0x00);
    for i in 0..8u8 {
        bus.write(0x2007, 0xA0 | i);
    }

    // Two PPUADDR writes of (hi, lo), a primer read, then eight reads return
    // eight consecutive VRAM bytes
    bus.write(0x2006, 0x21);
    bus.write(0x2006, 0x00);
    bus.read(0x2007); // primer fills the internal buffer
    for i in 0..8u8 {
        assert_eq!(bus.read(0x2007), 0xA0 | i, "buffered read {i}");
    }
    Ok(())
}

#[test]
fn write_toggle_resets_on_status_read() -> anyhow::Result<()> {
    common::init();
    let mut console = Console::new();
    console.load_cart(common::nrom_with_prg(&[0xEA]));
    let bus = console.bus_mut();

    bus.write(0x2005, 0x10);
    assert!(bus.ppu.scroll.write_latch(), "first write sets w");
    bus.write(0x2005, 0x20);
    assert!(!bus.ppu.scroll.write_latch(), "second write clears w");

    bus.write(0x2005, 0x10);
    bus.read(0x2002);
    assert!(!bus.ppu.scroll.write_latch(), "status read resets w");
    Ok(())
}

#[test]
fn controller_shift_register_protocol() -> anyhow::Result<()> {
    common::init();
    let mut console = Console::new();
    console.load_cart(common::nrom_with_prg(&[0xEA]));

    console.set_button(Player::One, JoypadBtn::A, true);
    console.set_button(Player::One, JoypadBtn::Select, true);
    console.set_button(Player::Two, JoypadBtn::Left, true);

    let bus = console.bus_mut();
    bus.write(0x4016, 0x01);
    bus.write(0x4016, 0x00);

    // Port 1: A, B, Select, Start, Up, Down, Left, Right
    let expected = [1, 0, 1, 0, 0, 0, 0, 0];
    for (i, expected) in expected.iter().enumerate() {
        assert_eq!(bus.read(0x4016) & 0x01, *expected, "port 1 bit {i}");
    }
    assert_eq!(bus.read(0x4016) & 0x01, 1, "9th read returns 1");

    // Port 2 shifts independently
    let expected = [0, 0, 0, 0, 0, 0, 1, 0];
    for (i, expected) in expected.iter().enumerate() {
        assert_eq!(bus.read(0x4017) & 0x01, *expected, "port 2 bit {i}");
    }
    Ok(())
}

#[test]
fn save_state_round_trips() -> anyhow::Result<()> {
    common::init();
    let mut console = Console::new();
    console.load_cart(common::nrom_with_prg(&[0xE6, 0x10, 0x4C, 0x00, 0x80])); // INC $10; JMP $8000

    for _ in 0..10 {
        console.step_instr()?;
    }
    let state = console.save_state()?;
    let cycle = console.cpu().cycle;
    let counter = console.bus().wram()[0x10];

    for _ in 0..10 {
        console.step_instr()?;
    }
    assert_ne!(console.cpu().cycle, cycle);

    console.load_state(&state)?;
    assert_eq!(console.cpu().cycle, cycle, "cycle counter restored");
    assert_eq!(console.bus().wram()[0x10], counter, "wram restored");

    // Execution continues normally from the restored state
    console.step_instr()?;
    Ok(())
}

#[test]
fn audio_sink_receives_batches() -> anyhow::Result<()> {
    use std::{cell::RefCell, rc::Rc};

    common::init();
    let mut console = Console::new();
    console.load_cart(common::nrom_with_prg(&[0x4C, 0x00, 0x80])); // JMP $8000

    let received = Rc::new(RefCell::new(0usize));
    let sink_count = Rc::clone(&received);
    console.register_audio_sink(move |samples| {
        *sink_count.borrow_mut() += samples.len();
    });

    console.step_frame()?;
    console.step_frame()?;
    // 48 kHz over two ~16.6ms frames
    let count = *received.borrow();
    assert!((1500..1700).contains(&count), "got {count} samples");
    Ok(())
}

#[test]
fn trace_hook_sees_every_instruction() -> anyhow::Result<()> {
    use std::{cell::RefCell, rc::Rc};

    common::init();
    let mut console = Console::new();
    console.load_cart(common::nrom_with_prg(&[0x4C, 0x00, 0x80])); // JMP $8000

    let traces = Rc::new(RefCell::new(Vec::new()));
    let sink = Rc::clone(&traces);
    console.set_trace_hook(move |trace| sink.borrow_mut().push((trace.pc, trace.opcode)));

    for _ in 0..3 {
        console.step_instr()?;
    }
    assert_eq!(
        traces.borrow().as_slice(),
        &[(0x8000, 0x4C), (0x8000, 0x4C), (0x8000, 0x4C)]
    );
    Ok(())
}
