//! Robustness target: arbitrary bytes through the packed decoder must
//! produce decode errors, never panics.

#![no_main]

use std::io::Cursor;

use libfuzzer_sys::fuzz_target;
use treemodem::{Decoder, PackedDecoder, Result, SpaceTable, SpecialSpace, UNKNOWN_ID};

const MAX_DEPTH: usize = 64;

fuzz_target!(|data: &[u8]| {
    let mut spaces = SpaceTable::new();
    spaces.add_basic("ram");
    spaces.add_special("stack", SpecialSpace::Stack);

    // Skip-only pass: walk structure without decoding any values.
    let mut dec = PackedDecoder::new(&spaces);
    if dec.ingest_stream(&mut Cursor::new(data)).is_ok() {
        let _ = walk(&mut dec, false, 0);
    }

    // Reading pass: decode every attribute through some typed read; type
    // mismatches are expected errors on fuzz input, panics are not.
    let mut dec = PackedDecoder::new(&spaces);
    if dec.ingest_stream(&mut Cursor::new(data)).is_ok() {
        let _ = walk(&mut dec, true, 0);
    }
});

fn walk(dec: &mut dyn Decoder, read_values: bool, depth: usize) -> Result<()> {
    if depth > MAX_DEPTH {
        return Ok(());
    }
    let id = dec.open_element()?;
    if id == UNKNOWN_ID {
        return Ok(());
    }
    loop {
        let attr = dec.next_attribute_id()?;
        if attr == UNKNOWN_ID {
            break;
        }
        if read_values {
            match attr % 5 {
                0 => {
                    dec.read_bool()?;
                }
                1 => {
                    dec.read_signed_integer()?;
                }
                2 => {
                    dec.read_unsigned_integer()?;
                }
                3 => {
                    dec.read_string()?;
                }
                _ => {
                    dec.read_space()?;
                }
            }
        }
    }
    while dec.peek_element()? != UNKNOWN_ID {
        walk(dec, read_values, depth + 1)?;
    }
    dec.close_element(id)
}
