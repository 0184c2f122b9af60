use std::time::Duration;

use tokio::time::Instant;

/// Kill statistics of one run.
#[derive(Clone, Copy, Debug)]
pub struct Statistics {
    started: Instant,
    kills: u32,
    last_kill: Instant,
    attack_started: Option<Instant>,
    last_search: Duration,
    last_fight: Duration,
}

impl Default for Statistics {
    fn default() -> Self {
        let now = Instant::now();
        Self {
            started: now,
            kills: 0,
            last_kill: now,
            attack_started: None,
            last_search: Duration::ZERO,
            last_fight: Duration::ZERO,
        }
    }
}

impl Statistics {
    /// Marks the start of a fight, closing the current search.
    pub fn start_attack(&mut self) {
        let now = Instant::now();
        self.attack_started = Some(now);
        self.last_search = now.saturating_duration_since(self.last_kill);
    }

    /// Records a kill, closing the current fight.
    pub fn record_kill(&mut self) {
        let now = Instant::now();
        if let Some(started) = self.attack_started.take() {
            self.last_fight = now.saturating_duration_since(started);
        }
        self.kills += 1;
        self.last_kill = now;
    }

    #[inline]
    pub fn kills(&self) -> u32 {
        self.kills
    }

    #[inline]
    pub fn last_search(&self) -> Duration {
        self.last_search
    }

    #[inline]
    pub fn last_fight(&self) -> Duration {
        self.last_fight
    }

    pub fn kills_per_minute(&self) -> f32 {
        self.kills_per(60.0)
    }

    pub fn kills_per_hour(&self) -> f32 {
        self.kills_per(3600.0)
    }

    fn kills_per(&self, secs: f32) -> f32 {
        let elapsed = self.started.elapsed().as_secs_f32();
        if elapsed <= 0.0 {
            return 0.0;
        }
        self.kills as f32 * secs / elapsed
    }
}

#[cfg(test)]
mod tests {
    use tokio::time::advance;

    use super::*;

    #[tokio::test(start_paused = true)]
    async fn search_and_fight_durations() {
        let mut stats = Statistics::default();

        advance(Duration::from_secs(4)).await;
        stats.start_attack();
        advance(Duration::from_secs(6)).await;
        stats.record_kill();

        assert_eq!(stats.kills(), 1);
        assert_eq!(stats.last_search(), Duration::from_secs(4));
        assert_eq!(stats.last_fight(), Duration::from_secs(6));
    }

    #[tokio::test(start_paused = true)]
    async fn kill_rates() {
        let mut stats = Statistics::default();
        assert_eq!(stats.kills_per_minute(), 0.0);

        for _ in 0..3 {
            advance(Duration::from_secs(20)).await;
            stats.start_attack();
            stats.record_kill();
        }

        assert!((stats.kills_per_minute() - 3.0).abs() < 0.01);
        assert!((stats.kills_per_hour() - 180.0).abs() < 0.5);
    }
}
