pub mod mutation;
pub mod services;
pub mod time;

pub use mutation::{
    GatewayError, MutationCoordinator, MutationId, MutationOutcome, MutationRequest, MutationState,
    TransactionGateway, WorkingSet,
};
pub use time::{Clock, FixedClock, SystemClock};
