use std::fs;
use std::io::{self, BufReader, Read};
use std::path::Path;

/// Byte-for-byte comparison of two files. Different lengths short-circuit.
pub fn files_equal(left: &Path, right: &Path) -> io::Result<bool> {
    if fs::metadata(left)?.len() != fs::metadata(right)?.len() {
        return Ok(false);
    }

    let mut left_reader = BufReader::new(fs::File::open(left)?);
    let mut right_reader = BufReader::new(fs::File::open(right)?);
    let mut left_buffer = [0; 8192];
    let mut right_buffer = [0; 8192];

    loop {
        let count = read_full(&mut left_reader, &mut left_buffer)?;
        let other = read_full(&mut right_reader, &mut right_buffer)?;
        if count != other || left_buffer[..count] != right_buffer[..other] {
            return Ok(false);
        }
        if count == 0 {
            return Ok(true);
        }
    }
}

/// Fill as much of `buffer` as the reader allows, so chunk boundaries line up
fn read_full<R: Read>(reader: &mut R, buffer: &mut [u8]) -> io::Result<usize> {
    let mut filled = 0;
    while filled < buffer.len() {
        let count = reader.read(&mut buffer[filled..])?;
        if count == 0 {
            break;
        }
        filled += count;
    }
    Ok(filled)
}
