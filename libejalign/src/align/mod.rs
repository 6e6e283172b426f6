pub mod structs;

mod forward;
pub use forward::forward;

mod backward;
pub use backward::backward;

mod posterior;
pub use posterior::posterior_counts;

mod em;
pub use em::{
    candidate_segments, expectation, init_prior, maximization, train, Expectation,
    InvalidMaxSpanError, IterationStats, TrainOutcome, TrainParams,
};

pub mod naive;
