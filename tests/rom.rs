use ember16_rs::decode::{build_rom_images, decode, write_rom_if_changed, AluOp, PcMode};

#[test]
fn decode_is_total_over_the_word_space() {
    // Every input must produce a result; unknown words flag the reserved
    // PC mode instead of failing.
    let mut reserved = 0usize;
    for word in 0..=u16::MAX {
        let cw = decode(word);
        if cw.pc == PcMode::Reserved {
            reserved += 1;
        }
    }
    assert!(reserved > 0);
    assert!(reserved < 65536);
}

#[test]
fn rom_images_are_exactly_64k_each() {
    let (rom0, rom1) = build_rom_images();
    assert_eq!(rom0.len(), 65536);
    assert_eq!(rom1.len(), 65536);
}

#[test]
fn rom_bytes_match_known_words() {
    let (rom0, rom1) = build_rom_images();

    // nop: everything unused, PC steps.
    assert_eq!(rom0[0x0000], 0x3F);
    assert_eq!(rom1[0x0000], 0x00);

    // halt (j +0): relative jump with an 8-bit immediate source.
    assert_eq!(rom0[0x0009], 0x7B);
    assert_eq!(rom1[0x0009], 0x00);

    // add r0, r0: rd read-write, rs register, flags written, ALU add.
    assert_eq!(rom0[0x1111], 0b00_01_00_00);
    assert_eq!(rom1[0x1111], AluOp::Add as u8 | 0b01 << 6);

    // testi r6, 255 (0xFF7F): rd read, rs imm8, flags written, ALU and.
    assert_eq!(rom0[0xFF7F], 0b00_01_10_10);
    assert_eq!(rom1[0xFF7F], AluOp::And as u8 | 0b01 << 6);

    // An unimplemented pattern decodes to all-ones mode bits.
    assert_eq!(rom0[0x0004], 0xFF);
}

#[test]
fn conditional_branches_hit_the_reserved_mode() {
    let (rom0, _) = build_rom_images();
    // b.eq +0 encodes as 0x0049; this ROM generation has no conditional
    // PC path, so it must read back as reserved.
    assert_eq!(rom0[0x0049] >> 6, 0b11);
}

#[test]
fn rom_writes_are_idempotent() {
    let path = std::env::current_dir().unwrap().join("_test_rom.bin");
    let data = vec![0xA5u8; 256];
    assert!(write_rom_if_changed(&path, &data).unwrap());
    assert!(!write_rom_if_changed(&path, &data).unwrap());
    let changed = vec![0x5Au8; 256];
    assert!(write_rom_if_changed(&path, &changed).unwrap());
    let _ = std::fs::remove_file(&path);
}
