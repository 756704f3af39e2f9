//! Driver-side view of the transfer layer: encode a record batch into a
//! zero-framed pipe, then decode it back as the engine would.

use std::io::{BufReader, Write};

use treemodem::{
    initialize, Decoder, Encoder, PackedDecoder, PackedEncoder, SpaceTable, ATTRIB_NAME,
    ATTRIB_OFFSET, ATTRIB_SPACE, ELEM_SCOPE, ELEM_SYMBOL, UNKNOWN_ID,
};

fn main() -> Result<(), Box<dyn std::error::Error>> {
    initialize();
    let mut spaces = SpaceTable::new();
    let ram = spaces.add_basic("ram");

    // Driver side: one scope record, zero-terminated for the transport.
    let mut pipe = Vec::new();
    {
        let mut enc = PackedEncoder::new(&mut pipe, &spaces);
        enc.open_element(&ELEM_SCOPE)?;
        enc.write_string(&ATTRIB_NAME, "main")?;
        for (name, offset) in [("argc", 0x7fff_0008u64), ("argv", 0x7fff_0010)] {
            enc.open_element(&ELEM_SYMBOL)?;
            enc.write_string(&ATTRIB_NAME, name)?;
            enc.write_space(&ATTRIB_SPACE, ram)?;
            enc.write_unsigned_integer(&ATTRIB_OFFSET, offset)?;
            enc.close_element(&ELEM_SYMBOL)?;
        }
        enc.close_element(&ELEM_SCOPE)?;
    }
    pipe.write_all(&[0])?;
    println!("encoded {} bytes", pipe.len());

    // Engine side: ingest up to the frame terminator and walk the tree.
    let mut dec = PackedDecoder::new(&spaces);
    dec.ingest_stream(&mut BufReader::new(&pipe[..]))?;

    let scope = dec.open_element_expect(&ELEM_SCOPE)?;
    println!("scope {}", dec.read_string_for(&ATTRIB_NAME)?);
    while dec.peek_element()? != UNKNOWN_ID {
        let symbol = dec.open_element_expect(&ELEM_SYMBOL)?;
        let name = dec.read_string_for(&ATTRIB_NAME)?;
        let offset = dec.read_unsigned_integer_for(&ATTRIB_OFFSET)?;
        println!("  symbol {name} at 0x{offset:x}");
        dec.close_element(symbol)?;
    }
    dec.close_element(scope)?;
    Ok(())
}
