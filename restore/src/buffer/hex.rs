use std::fmt::Write;

/// Number of bytes rendered per line by [`bytes_as_hex_string`] when no width is given.
pub const DEFAULT_WRAP: usize = 16;

const HEX_CODE: &[u8; 16] = b"0123456789ABCDEF";

/// Renders `bytes` as a hex dump with `wrap` bytes per line.
///
/// Every line starts with the offset of its first byte, followed by the bytes in
/// hex and their printable ASCII representation (`.` for anything else):
///
/// ```text
/// 0x00000000: 68 65 6C 6C 6F          |hello|
/// ```
pub fn bytes_as_hex_string(bytes: &[u8], wrap: usize) -> String {
    let wrap = wrap.max(1);
    let mut output = String::with_capacity(bytes.len() * 4 + 16);

    for (line, chunk) in bytes.chunks(wrap).enumerate() {
        let _ = write!(output, "0x{:08x}: ", line * wrap);

        for index in 0..wrap {
            match chunk.get(index) {
                Some(byte) => {
                    output.push(HEX_CODE[(byte >> 4) as usize] as char);
                    output.push(HEX_CODE[(byte & 0xF) as usize] as char);
                    output.push(' ');
                }
                None => output.push_str("   "),
            }
        }

        output.push('|');
        output.extend(chunk.iter().map(|&byte| printable(byte)));
        output.push_str("|\n");
    }

    output
}

fn printable(byte: u8) -> char {
    if (32..126).contains(&byte) {
        byte as char
    } else {
        '.'
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_input_renders_nothing() {
        assert_eq!(bytes_as_hex_string(&[], DEFAULT_WRAP), "");
    }

    #[test]
    fn short_line_is_padded() {
        let dump = bytes_as_hex_string(b"hi\n", 4);

        assert_eq!(dump, "0x00000000: 68 69 0A    |hi.|\n");
    }

    #[test]
    fn lines_carry_offsets() {
        let dump = bytes_as_hex_string(&[0xAB; 5], 2);
        let lines: Vec<_> = dump.lines().collect();

        assert_eq!(
            lines,
            vec![
                "0x00000000: AB AB |..|",
                "0x00000002: AB AB |..|",
                "0x00000004: AB    |.|",
            ]
        );
    }
}
