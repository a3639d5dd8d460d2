pub mod fixture;
mod fmp;

pub use fixture::{fixture_client, FIXTURE_BASE_URL};
pub use fmp::FmpAdapter;
