//! End-to-end scenarios exercising the full decode-dispatch-store loop
//! (and, where a scenario is cleanly a single subsystem, that subsystem's
//! public API directly) against a minimal hand-assembled v3 story.

mod common;

use common::{fix_checksum, minimal_v3_story, MockHost, CODE_START};
use zinterp::dictionary;
use zinterp::interpreter::{ExecutionResult, Interpreter};
use zinterp::object::ObjectTable;
use zinterp::text;
use zinterp::vm::VM;

fn interp_at(pc: u16) -> Interpreter<MockHost> {
    let mut mem = minimal_v3_story(pc);
    fix_checksum(&mut mem);
    let vm = VM::new(mem, 80, 24).expect("minimal story should parse");
    Interpreter::new(vm, MockHost::new())
}

/// Pokes `bytes` into memory starting at `addr`, bypassing the
/// static-memory write guard (this is test setup, not game behavior).
fn poke(interp: &mut Interpreter<MockHost>, addr: u16, bytes: &[u8]) {
    for (i, &b) in bytes.iter().enumerate() {
        interp.vm.game.memory.force_write_byte(addr as u32 + i as u32, b);
    }
}

/// S1: a `call` to the null routine (address 0) always "succeeds" with
/// result 0, stored to the stack rather than a local — at top level only
/// the dummy call frame exists, which has no locals to store into.
#[test_log::test]
fn s1_call_null_routine_then_quit() {
    let mut interp = interp_at(CODE_START);
    // call 0 -> store 0 (stack)
    poke(
        &mut interp,
        CODE_START,
        &[0xE0, 0x3F, 0x00, 0x00, 0x00, 0xBA],
    );

    let result = interp.step().unwrap();
    assert_eq!(result, ExecutionResult::Called);
    assert_eq!(interp.read_variable(0).unwrap(), 0);

    let result = interp.step().unwrap();
    assert_eq!(result, ExecutionResult::Quit);
}

/// S2: `push 5; push -7; add; pull` into global 0 yields the expected
/// signed sum, wrapped into sixteen bits.
#[test_log::test]
fn s2_arithmetic_push_add_pull() {
    let mut interp = interp_at(CODE_START);
    poke(
        &mut interp,
        CODE_START,
        &[
            0xE8, 0x7F, 0x05, // push 5
            0xE8, 0x3F, 0xFF, 0xF9, // push -7 (large constant 0xFFF9)
            0x74, 0x00, 0x00, 0x00, // add (stack, stack) -> stack
            0xE9, 0x7F, 0x10, // pull -> variable 16 (global 0)
            0xBA, // quit
        ],
    );

    for expected in [
        ExecutionResult::Continue,
        ExecutionResult::Continue,
        ExecutionResult::Continue,
        ExecutionResult::Continue,
    ] {
        assert_eq!(interp.step().unwrap(), expected);
    }
    assert_eq!(interp.vm.read_global(0), 0xFFFE);
    assert_eq!(interp.step().unwrap(), ExecutionResult::Quit);
}

/// Property 5: signed arithmetic and comparison semantics — `sub` is a
/// plain signed subtraction, `div`/`mod` truncate toward zero (so a
/// negative dividend yields a negative quotient and a negative
/// remainder), and `jl` compares its operands as signed.
#[test_log::test]
fn property5_signed_arithmetic_and_comparison() {
    let mut interp = interp_at(CODE_START);
    poke(
        &mut interp,
        CODE_START,
        &[
            0x15, 0x03, 0x05, 0x00, // sub 3 5 -> stack (3 - 5 = -2)
            0xD7, 0x1F, 0xFF, 0xF9, 0x02, 0x00, // div -7 2 -> stack (-3)
            0xD8, 0x1F, 0xFF, 0xF9, 0x02, 0x00, // mod -7 2 -> stack (-1)
            0xC2, 0x1F, 0xFF, 0xFB, 0x03, 0xC2, // jl -5 3 -> branch (true)
            0xBA, // quit
        ],
    );

    assert_eq!(interp.step().unwrap(), ExecutionResult::Continue);
    assert_eq!(interp.read_variable(0).unwrap(), 0xFFFE);

    assert_eq!(interp.step().unwrap(), ExecutionResult::Continue);
    assert_eq!(interp.read_variable(0).unwrap(), 0xFFFD);

    assert_eq!(interp.step().unwrap(), ExecutionResult::Continue);
    assert_eq!(interp.read_variable(0).unwrap(), 0xFFFF);

    assert_eq!(interp.step().unwrap(), ExecutionResult::Branched);
    assert_eq!(interp.step().unwrap(), ExecutionResult::Quit);
}

/// `je` encoded in variable form with 3-4 operands branches if the first
/// equals *any* of the others, not just the second — and must consume all
/// of them so the branch postamble is read from the right address.
#[test_log::test]
fn je_matches_any_of_up_to_four_operands() {
    let mut interp = interp_at(CODE_START);
    poke(
        &mut interp,
        CODE_START,
        &[
            0xC1, 0x55, 0x07, 0x01, 0x07, 0x02, // je 7 1 7 2 (matches the third)
            0xC2, // branch on true, short form, offset 2 (falls through)
            0xBA, // quit
        ],
    );

    assert_eq!(interp.step().unwrap(), ExecutionResult::Branched);
    assert_eq!(interp.step().unwrap(), ExecutionResult::Quit);
}

/// S3: `insert_obj` reparents an object, unlinking it from its old parent's
/// child chain and prepending it to the new parent's.
#[test_log::test]
fn s3_insert_obj_reparents() {
    let mut interp = interp_at(CODE_START);

    // obj 5 has obj 3 as its only child; obj 2 has no parent yet.
    interp.vm.set_child(5, 3).unwrap();
    interp.vm.set_parent(3, 5).unwrap();

    interp.vm.insert(3, 2).unwrap();

    assert_eq!(interp.vm.get_parent(3).unwrap(), 2);
    assert_eq!(interp.vm.get_child(2).unwrap(), 3);
    assert_eq!(interp.vm.get_sibling(3).unwrap(), 0);
    assert_eq!(interp.vm.get_child(5).unwrap(), 0);
}

/// S4: encoding then decoding a short string round-trips through the
/// standard alphabet (no abbreviations involved).
#[test_log::test]
fn s4_text_round_trip() {
    let encoded = text::encode_text("hello", 6);
    assert_eq!(encoded.len(), 6);

    let mut mem = vec![0u8; encoded.len()];
    mem.copy_from_slice(&encoded);
    let (decoded, len) = text::decode_string(&mem, 0, 0).unwrap();
    assert_eq!(decoded, "hello");
    assert_eq!(len, encoded.len());
}

/// S6: tokenizing a line against a one-entry dictionary finds the known
/// word and reports byte-accurate positions for all of them, including the
/// trailing separator and the unrecognized words.
#[test_log::test]
fn s6_read_parse_tokenize_and_lookup() {
    let entry_key_len = 4usize;
    let entry_len = entry_key_len + 2; // key bytes + flags/unused padding
    let mut dict = vec![0u8; 5 + entry_len];
    dict[0] = 1; // one separator
    dict[1] = b'.';
    dict[2] = entry_len as u8;
    dict[3] = 0;
    dict[4] = 1; // one entry
    let entries_base = 5usize;
    let key = text::encode_text("look", entry_key_len);
    dict[entries_base..entries_base + entry_key_len].copy_from_slice(&key);

    let tokens = dictionary::tokenize("look at door.", &['.']);
    assert_eq!(tokens.len(), 4);
    assert_eq!(tokens[0].text, "look");
    assert_eq!(tokens[0].start, 0);
    assert_eq!(tokens[1].text, "at");
    assert_eq!(tokens[1].start, 5);
    assert_eq!(tokens[2].text, "door");
    assert_eq!(tokens[2].start, 8);
    assert_eq!(tokens[3].text, ".");
    assert_eq!(tokens[3].start, 12);

    assert_eq!(dictionary::lookup(&dict, 0, "look", entry_key_len), Some(entries_base));
    assert_eq!(dictionary::lookup(&dict, 0, "at", entry_key_len), None);
    assert_eq!(dictionary::lookup(&dict, 0, "door", entry_key_len), None);
    assert_eq!(dictionary::lookup(&dict, 0, ".", entry_key_len), None);
}

/// S5: a `save` then `restore` through Quetzal round-trips dynamic memory,
/// the stack, and the resume PC byte-for-byte.
#[test_log::test]
fn s5_save_restore_round_trip() {
    let story = {
        let mut mem = minimal_v3_story(CODE_START);
        let code = &mut mem[CODE_START as usize..];
        code[0] = 0xB5; // save (short form, 0OP)
        code[1] = 0xC2; // branch on true, short form, offset 2 (falls through)
        code[2] = 0xBA; // quit
        fix_checksum(&mut mem);
        mem
    };

    let vm = VM::new(story.clone(), 80, 24).unwrap();
    let mut interp = Interpreter::new(vm, MockHost::new());
    interp.vm.write_global(0, 0x1234).unwrap();

    let result = interp.step().unwrap();
    assert_eq!(result, ExecutionResult::Branched);
    let resume_pc = interp.vm.pc;
    let saved = interp
        .host
        .files
        .get("game.sav")
        .expect("save should have written a file")
        .clone();

    let vm2 = VM::new(story, 80, 24).unwrap();
    let mut host2 = MockHost::with_restore_target("game.sav");
    host2.files.insert("game.sav".to_string(), saved);
    let mut interp2 = Interpreter::new(vm2, host2);

    let restored = zinterp::quetzal::restore(&mut interp2).unwrap();
    assert!(restored);
    assert_eq!(interp2.vm.read_global(0), 0x1234);
    assert_eq!(interp2.vm.pc, resume_pc);

    assert_eq!(interp2.step().unwrap(), ExecutionResult::Quit);
}
