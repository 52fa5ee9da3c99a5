use std::time::Duration;

use mongodb::{Client, Database, bson::doc, options::ClientOptions};
use tokio::time::sleep;
use tracing::debug;

use super::error::{MongoDaoError, MongoResult};

/// Bounded exponential backoff used while the first ping has not succeeded.
struct PingBackoff {
    attempts: u32,
    delay: Duration,
}

impl PingBackoff {
    const MAX_ATTEMPTS: u32 = 10;
    const INITIAL_DELAY: Duration = Duration::from_millis(250);
    const MAX_DELAY: Duration = Duration::from_secs(5);

    fn new() -> Self {
        Self {
            attempts: 0,
            delay: Self::INITIAL_DELAY,
        }
    }

    /// Record a failed attempt and return the pause before the next one, or
    /// `None` once the budget is spent.
    fn next_pause(&mut self) -> Option<Duration> {
        self.attempts += 1;
        if self.attempts >= Self::MAX_ATTEMPTS {
            return None;
        }
        let pause = self.delay;
        self.delay = (self.delay * 2).min(Self::MAX_DELAY);
        Some(pause)
    }
}

/// Build a client and wait until the database answers a ping.
pub async fn establish_connection(
    options: &ClientOptions,
    database_name: &str,
) -> MongoResult<(Client, Database)> {
    let client = Client::with_options(options.clone())
        .map_err(|source| MongoDaoError::ClientConstruction { source })?;
    let database = client.database(database_name);
    let mut backoff = PingBackoff::new();

    loop {
        match database.run_command(doc! { "ping": 1 }).await {
            Ok(_) => return Ok((client, database)),
            Err(err) => match backoff.next_pause() {
                Some(pause) => {
                    debug!(error = %err, attempts = backoff.attempts, "MongoDB ping failed; retrying");
                    sleep(pause).await;
                }
                None => {
                    return Err(MongoDaoError::InitialPing {
                        attempts: backoff.attempts,
                        source: err,
                    });
                }
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn backoff_doubles_then_gives_up() {
        let mut backoff = PingBackoff::new();
        let pauses: Vec<_> = std::iter::from_fn(|| backoff.next_pause()).collect();

        assert_eq!(pauses.len() as u32, PingBackoff::MAX_ATTEMPTS - 1);
        assert_eq!(pauses[0], Duration::from_millis(250));
        assert_eq!(pauses[1], Duration::from_millis(500));
        assert!(pauses.iter().all(|pause| *pause <= PingBackoff::MAX_DELAY));
        assert_eq!(backoff.attempts, PingBackoff::MAX_ATTEMPTS);
    }
}
