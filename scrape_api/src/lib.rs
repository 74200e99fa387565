mod context;
mod errors;

pub use context::{build_http, ScrapeContext};
pub use errors::{FetchError, ScrapeError};

pub use nipper;
pub use reqwest;
pub use url;
