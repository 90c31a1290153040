pub mod dash_extractor;
pub mod default;
pub mod error;
pub mod factory;
pub mod hls_extractor;
pub mod hoster_extractor;
pub mod hosters;
pub mod utils;

pub use default::{DEFAULT_UA, default_client, no_redirect_client};
pub use factory::{Hoster, HosterFactory};
pub use hoster_extractor::{Extractor, HosterExtractor};
