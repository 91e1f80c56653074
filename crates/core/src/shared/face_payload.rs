/// One cropped face ready for dispatch: encoded PNG bytes plus the
/// epoch-millisecond timestamp of the admission that produced it.
#[derive(Clone, Debug, PartialEq)]
pub struct FacePayload {
    pub png: Vec<u8>,
    pub timestamp_ms: u64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_payload_holds_bytes_and_timestamp() {
        let p = FacePayload {
            png: vec![0x89, 0x50, 0x4e, 0x47],
            timestamp_ms: 1_700_000_000_000,
        };
        assert_eq!(p.png.len(), 4);
        assert_eq!(p.timestamp_ms, 1_700_000_000_000);
    }
}
