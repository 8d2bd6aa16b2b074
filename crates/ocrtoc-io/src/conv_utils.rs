/// Utility function to convert 16-bit big-endian `Vec<u8>` to `Vec<u16>`
pub fn convert_buf_u8_u16(buf: &[u8]) -> Vec<u16> {
    buf.chunks_exact(2)
        .map(|chunk| u16::from_be_bytes([chunk[0], chunk[1]]))
        .collect()
}

/// Utility function to convert `&[u16]` to a 16-bit big-endian `Vec<u8>`
pub fn convert_buf_u16_u8(buf: &[u16]) -> Vec<u8> {
    let mut buf_u8: Vec<u8> = Vec::with_capacity(buf.len() * 2);

    for byte in buf {
        buf_u8.extend_from_slice(&byte.to_be_bytes());
    }

    buf_u8
}

#[cfg(test)]
mod tests {
    #[test]
    fn u16_be_conversion() {
        let buf = [1u16, 256, 65535];
        let bytes = super::convert_buf_u16_u8(&buf);
        assert_eq!(bytes, vec![0, 1, 1, 0, 255, 255]);
        assert_eq!(super::convert_buf_u8_u16(&bytes), buf.to_vec());
    }
}
