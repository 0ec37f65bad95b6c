use std::io;

/// Conditions that end a sweep run with a failure status.
///
/// The `Display` text is the message shown to the user right before exit.
#[derive(Debug, thiserror::Error)]
pub enum RunError {
    /// A required positional input was empty.
    #[error("missing input '{0}'")]
    MissingInput(&'static str),

    /// The credential input is not valid base64.
    #[error("base64 decoding of 'credentials' failed with error: {0}")]
    Decode(#[from] base64::DecodeError),

    /// The decoded credential is not a usable service-account key.
    #[error("fetching JWT credentials failed with error: {0}")]
    Credentials(#[source] gdrive::Error),

    /// The storage quota could not be read.
    #[error("Unable to get quota: {0}")]
    Quota(#[source] gdrive::Error),

    /// A file listing failed.
    #[error("Unable to retrieve files: {0}")]
    Listing(#[source] gdrive::Error),

    /// A marked file could not be deleted.
    #[error("deleting file failed with error: {0}")]
    Delete(#[source] gdrive::Error),

    /// Usage has reached the storage limit.
    #[error("###  Warning: Free up drive space  ###")]
    QuotaExhausted,

    /// Writing to the console failed.
    #[error("writing output failed: {0}")]
    Output(#[from] io::Error),
}
