pub mod fetcher;
pub mod gate;
pub mod rate_limit;

pub use fetcher::{
    FetchOutcome, HandlerFuture, PayloadHandler, PollRequest, RateLimitedFetcher,
    TokioRetryScheduler,
};
pub use gate::FetchGate;
