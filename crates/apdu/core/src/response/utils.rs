//! Utility functions for APDU response handling

use tracing::debug;

use crate::response::error::ResponseError;
use crate::response::status::StatusWord;

/// Split raw response data into its trailing status word and the payload
///
/// # Errors
/// Returns [`ResponseError::Incomplete`] if the data is shorter than a status word.
pub fn split_status(data: &[u8]) -> Result<(StatusWord, &[u8]), ResponseError> {
    match data {
        [payload @ .., sw1, sw2] => Ok((StatusWord::new(*sw1, *sw2), payload)),
        _ => {
            debug!(len = data.len(), "Response too short");
            Err(ResponseError::Incomplete)
        }
    }
}
