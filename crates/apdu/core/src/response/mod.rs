//! APDU response definitions
//!
//! A response is a payload followed by a two-byte status word, as in
//! ISO/IEC 7816-4.

pub mod error;
pub mod status;
pub mod utils;

use bytes::{BufMut, Bytes, BytesMut};
use tracing::trace;

use error::{ResponseError, StatusError};
use status::StatusWord;

/// Basic APDU response structure
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Response {
    /// Response payload data (may be empty)
    payload: Bytes,
    /// Status word
    status: StatusWord,
}

impl Response {
    /// Create a success response
    pub const fn success(payload: Bytes) -> Self {
        Self {
            payload,
            status: status::common::SUCCESS,
        }
    }

    /// Create an error response carrying only a status word
    pub const fn error(status: StatusWord) -> Self {
        Self {
            payload: Bytes::new(),
            status,
        }
    }

    /// Parse response from raw bytes (including status word)
    pub fn from_bytes(data: &[u8]) -> Result<Self, ResponseError> {
        let (status, payload) = utils::split_status(data)?;

        trace!(%status, payload_len = payload.len(), "Parsed APDU response");

        Ok(Self {
            payload: Bytes::copy_from_slice(payload),
            status,
        })
    }

    /// Get the response payload data
    pub const fn payload(&self) -> &Bytes {
        &self.payload
    }

    /// Get the status word
    pub const fn status(&self) -> StatusWord {
        self.status
    }

    /// Check if the response indicates success
    pub const fn is_success(&self) -> bool {
        self.status.is_success()
    }

    /// Convert to the payload, failing on any status other than `90 00`
    pub fn into_payload(self) -> Result<Bytes, StatusError> {
        if self.is_success() {
            Ok(self.payload)
        } else {
            Err(StatusError::from(self.status))
        }
    }

    /// Serialize back to raw bytes, status word last
    pub fn to_bytes(&self) -> Bytes {
        let mut buf = BytesMut::with_capacity(self.payload.len() + 2);
        buf.put_slice(&self.payload);
        buf.put_u8(self.status.sw1);
        buf.put_u8(self.status.sw2);
        buf.freeze()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use hex_literal::hex;

    #[test]
    fn test_response_from_bytes() {
        let resp = Response::from_bytes(&hex!("010203 9000")).unwrap();
        assert_eq!(resp.payload().as_ref(), &[0x01, 0x02, 0x03]);
        assert!(resp.is_success());

        let resp = Response::from_bytes(&hex!("9000")).unwrap();
        assert!(resp.payload().is_empty());
        assert!(resp.is_success());

        let resp = Response::from_bytes(&hex!("6A86")).unwrap();
        assert!(!resp.is_success());
        assert!(resp.status().is_incorrect_p1p2());

        assert!(matches!(
            Response::from_bytes(&[0x01]),
            Err(ResponseError::Incomplete)
        ));
    }

    #[test]
    fn test_response_into_payload() {
        let success = Response::success(Bytes::from_static(&[0x01, 0x02, 0x03]));
        assert_eq!(success.into_payload().unwrap().as_ref(), &[0x01, 0x02, 0x03]);

        let error = Response::error(status::common::WRONG_DATA);
        assert_eq!(
            error.into_payload().unwrap_err().status,
            StatusWord::new(0x6A, 0x80)
        );
    }

    #[test]
    fn test_response_to_bytes() {
        let raw = hex!("AABB 6982");
        let resp = Response::from_bytes(&raw).unwrap();
        assert_eq!(resp.to_bytes().as_ref(), raw);
        assert_eq!(
            Response::error(status::common::CONDITIONS_NOT_SATISFIED)
                .to_bytes()
                .as_ref(),
            hex!("6985")
        );
    }
}
