//! Port contracts between the bridge and tool providers.

mod session;

pub use session::{
    ProviderConnector, ProviderSession, ProviderSessionError, ProviderSessionResult,
};
