//! UTF-8 byte-order-mark stripping

use std::io::{self, Cursor, Read};

/// The UTF-8 encoding of U+FEFF
pub const UTF8_BOM: [u8; 3] = [0xEF, 0xBB, 0xBF];

/// Reader returned by [`strip_bom`]: the peeked bytes that were not a BOM,
/// followed by the rest of the input.
pub type BomStripped<R> = io::Chain<Cursor<Vec<u8>>, R>;

/// Peek the first three bytes of `reader` and drop them only if they are
/// exactly the UTF-8 BOM. Any other prefix, including a short input, is
/// handed back untouched in front of the remaining stream.
pub fn strip_bom<R: Read>(mut reader: R) -> io::Result<BomStripped<R>> {
    let mut peeked = [0u8; 3];
    let mut filled = 0;

    // A single read may return fewer bytes than are available.
    while filled < peeked.len() {
        match reader.read(&mut peeked[filled..]) {
            Ok(0) => break,
            Ok(n) => filled += n,
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(e),
        }
    }

    let prefix = if peeked[..filled] == UTF8_BOM {
        Vec::new()
    } else {
        peeked[..filled].to_vec()
    };

    Ok(Cursor::new(prefix).chain(reader))
}
