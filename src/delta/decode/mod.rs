//! Decoder for delta instruction streams that rebuilds target objects from a
//! base buffer and the instruction stream produced by `delta::encode`
//! (base size + result size + op codes).

use std::io::{ErrorKind, Read};

use super::{errors::DeltaError, utils};

const COPY_INSTRUCTION_FLAG: u8 = 1 << 7; // msb set => copy from base, otherwise inline data
const COPY_OFFSET_BYTES: u8 = 4;
const COPY_SIZE_BYTES: u8 = 3;
const COPY_ZERO_SIZE: usize = 0x10000;

/// Apply a delta stream to `base_info`, returning the reconstructed target
/// bytes. The stream format matches `delta::encode`:
/// - leading base size, then result size (varint)
/// - sequence of ops: data instructions (msb=0, lower 7 bits = literal length)
///   or copy instructions (msb=1, following bytes encode offset/size).
pub fn delta_apply(
    mut stream: &mut impl Read,
    base_info: &[u8],
) -> Result<Vec<u8>, DeltaError> {
    // Declared base size must match the buffer we were handed.
    let base_size = utils::read_size_encoding(&mut stream)
        .map_err(|e| DeltaError::ApplyError(format!("truncated base size: {e}")))?;
    if base_info.len() != base_size {
        return Err(DeltaError::ApplyError(
            "base object len is not equal".to_owned(),
        ));
    }

    let result_size = utils::read_size_encoding(&mut stream)
        .map_err(|e| DeltaError::ApplyError(format!("truncated result size: {e}")))?;
    let mut buffer = Vec::with_capacity(result_size);
    loop {
        // The stream ending is the only legal way out of the op loop.
        let instruction = match utils::read_bytes(stream) {
            Ok([instruction]) => instruction,
            Err(err) if err.kind() == ErrorKind::UnexpectedEof => break,
            Err(err) => {
                return Err(DeltaError::ApplyError(format!(
                    "wrong instruction in delta: {err}"
                )));
            }
        };

        if instruction & COPY_INSTRUCTION_FLAG == 0 {
            // Data instruction; the instruction byte specifies the number of data bytes
            if instruction == 0 {
                // Appending 0 bytes doesn't make sense, so the format disallows it
                return Err(DeltaError::ApplyError(String::from(
                    "invalid data instruction",
                )));
            }

            let mut data = vec![0; instruction as usize];
            stream
                .read_exact(&mut data)
                .map_err(|e| DeltaError::ApplyError(format!("truncated data op: {e}")))?;
            buffer.extend_from_slice(&data);
        } else {
            // Copy instruction
            let mut nonzero_bytes = instruction;
            let offset = utils::read_partial_int(&mut stream, COPY_OFFSET_BYTES, &mut nonzero_bytes)
                .map_err(|e| DeltaError::ApplyError(format!("truncated copy offset: {e}")))?;
            let mut size =
                utils::read_partial_int(&mut stream, COPY_SIZE_BYTES, &mut nonzero_bytes)
                    .map_err(|e| DeltaError::ApplyError(format!("truncated copy size: {e}")))?;
            if size == 0 {
                // Copying 0 bytes doesn't make sense, so the format assumes a different size
                size = COPY_ZERO_SIZE;
            }
            // Copy bytes from the base object
            let base_data = base_info
                .get(offset..(offset + size))
                .ok_or_else(|| DeltaError::ApplyError("invalid copy instruction".to_string()))?;
            buffer.extend_from_slice(base_data);
        }
    }

    if buffer.len() != result_size {
        return Err(DeltaError::ApplyError(format!(
            "expected result of {result_size} bytes, rebuilt {}",
            buffer.len()
        )));
    }
    Ok(buffer)
}

#[cfg(test)]
mod tests {
    use std::io::Cursor;

    use super::delta_apply;
    use crate::delta::{encode::encode_delta, errors::DeltaError};

    /// Delta encode + apply should round-trip to the new buffer.
    #[test]
    fn round_trip_matches_source() {
        let old = b"hello world";
        let new = b"hello rust";
        let delta = encode_delta(old, new);

        let mut cursor = Cursor::new(delta);
        let decoded = delta_apply(&mut cursor, old).expect("apply");
        assert_eq!(decoded, new);
    }

    /// Mismatched base length should return an apply error.
    #[test]
    fn base_size_mismatch_returns_error() {
        let old = b"abcde";
        let new = b"abXYZ";
        let delta = encode_delta(old, new);

        let mut cursor = Cursor::new(delta);
        // Provide a base buffer with a different length to trigger size mismatch.
        let err = delta_apply(&mut cursor, b"xx").unwrap_err();
        assert!(matches!(err, DeltaError::ApplyError(_)));
    }

    /// A zero data instruction is rejected rather than looping forever.
    #[test]
    fn zero_data_instruction_is_invalid() {
        let old = b"base";
        // header: base size 4, result size 1, then an all-zero op byte
        let stream = vec![4u8, 1u8, 0u8];
        let mut cursor = Cursor::new(stream);
        let err = delta_apply(&mut cursor, old).unwrap_err();
        assert!(matches!(err, DeltaError::ApplyError(_)));
    }

    /// Copy ranges outside the base are rejected.
    #[test]
    fn copy_past_base_end_is_invalid() {
        let old = b"base";
        // header: base 4, result 8; copy offset=0 size=8 (0x91 = copy with
        // offset byte 0 absent? offset bits none, size bit 4 set)
        let stream = vec![4u8, 8u8, 0x90, 8u8];
        let mut cursor = Cursor::new(stream);
        let err = delta_apply(&mut cursor, old).unwrap_err();
        assert!(matches!(err, DeltaError::ApplyError(_)));
    }
}
