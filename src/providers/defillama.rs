//! DefiLlama endpoints

use crate::{
    constants::{DEFILLAMA_PROTOCOLS_ENDPOINT, SOURCE_DEFILLAMA},
    fetcher::FetchRequest,
};

/// Builds the `/protocols` request listing every tracked protocol
pub fn protocols_request(base_url: &str) -> FetchRequest {
    FetchRequest::new(
        format!(
            "{}{}",
            base_url.trim_end_matches('/'),
            DEFILLAMA_PROTOCOLS_ENDPOINT
        ),
        SOURCE_DEFILLAMA,
    )
}
