//! External service integrations.

pub mod scoring_client {
    pub use crate::scoring_client::*;
}

pub mod dataset_download {
    pub use crate::dataset::ensure_downloaded;
}
