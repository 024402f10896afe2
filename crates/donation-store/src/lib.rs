pub mod error;
pub mod filter;
pub mod memory;
pub mod postgres;
pub mod store;

pub use common::{DonationId, PostId, UserId};
pub use error::{Result, StoreError};
pub use filter::{ConfirmedFilter, DonationFilter, Participant};
pub use memory::InMemoryDonationStore;
pub use postgres::PostgresDonationStore;
pub use store::{DonationStore, DonationStoreExt};
