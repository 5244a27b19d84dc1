pub mod planet_poller;
pub mod war_poller;

use std::future::Future;
use std::time::Duration;

use tokio::time::MissedTickBehavior;

/// Spawns `tick()` as its own task every `period`.
///
/// The first run is immediate unless `skip_first` is set, in which case it waits one full
/// period. A run that outlasts the period does not delay the next spawn.
pub async fn spawn_every<F, Fut>(period: Duration, skip_first: bool, mut tick: F)
where
    F: FnMut() -> Fut,
    Fut: Future<Output = ()> + Send + 'static,
{
    let mut interval = tokio::time::interval(period);
    interval.set_missed_tick_behavior(MissedTickBehavior::Skip);
    if skip_first {
        interval.tick().await;
    }

    loop {
        interval.tick().await;
        tokio::spawn(tick());
    }
}
