//! Fixed-step campaign loop

use std::future::Future;

use serde::Serialize;
use tokio::time::{interval, MissedTickBehavior};
use tracing::{debug, info};

use crate::game::{Campaign, GameEvent, InputCommand, Snapshot, SnapshotBuilder};
use crate::util::time::{tick_delta, tick_duration, Timer, SIMULATION_TPS};

use super::files::TranscriptFrame;

/// Why a run ended
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum StopReason {
    TranscriptEnded,
    CampaignFinished,
    MaxTicks,
    Shutdown,
}

/// Final state of a run
#[derive(Debug, Clone, Serialize)]
pub struct RunSummary {
    pub ticks: u64,
    pub stop_reason: StopReason,
    pub total_score: u32,
    pub levels_played: usize,
    pub snapshot: Snapshot,
}

/// Drives a campaign at 60 Hz from a transcript
pub struct Runner {
    campaign: Campaign,
    transcript: Option<Vec<TranscriptFrame>>,
    realtime: bool,
    max_ticks: u64,
    snapshot_builder: SnapshotBuilder,
}

impl Runner {
    /// Without a transcript both combatants stand idle until `max_ticks`
    pub fn new(campaign: Campaign, transcript: Option<Vec<TranscriptFrame>>, realtime: bool, max_ticks: u64) -> Self {
        Self {
            campaign,
            transcript,
            realtime,
            max_ticks,
            snapshot_builder: SnapshotBuilder::new(SIMULATION_TPS),
        }
    }

    fn inputs_for(&self, tick: u64) -> Option<TranscriptFrame> {
        match &self.transcript {
            Some(frames) => frames.get(tick as usize).copied(),
            None => Some([InputCommand::idle(); 2]),
        }
    }

    /// Run until the transcript ends, the campaign finishes, the tick cap is
    /// hit, or `shutdown` resolves.
    pub async fn run<F>(mut self, shutdown: F) -> anyhow::Result<RunSummary>
    where
        F: Future<Output = ()>,
    {
        let dt = tick_delta();
        let timer = Timer::new();
        let mut pacing = self.realtime.then(|| {
            let mut ticker = interval(tick_duration());
            ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
            ticker
        });
        tokio::pin!(shutdown);

        info!(
            match_id = %self.campaign.current().id(),
            realtime = self.realtime,
            max_ticks = self.max_ticks,
            "Runner started"
        );

        let mut ticks: u64 = 0;
        let stop_reason = loop {
            if self.campaign.is_finished() {
                break StopReason::CampaignFinished;
            }
            if ticks >= self.max_ticks {
                break StopReason::MaxTicks;
            }
            let Some(inputs) = self.inputs_for(ticks) else {
                break StopReason::TranscriptEnded;
            };

            let pace = async {
                match pacing.as_mut() {
                    Some(ticker) => {
                        ticker.tick().await;
                    }
                    None => tokio::task::yield_now().await,
                }
            };
            tokio::select! {
                biased;
                _ = &mut shutdown => break StopReason::Shutdown,
                _ = pace => {}
            }

            let events = self.campaign.step(&inputs, dt)?;
            ticks += 1;
            log_events(ticks, &events);

            if self.snapshot_builder.should_send() {
                let level = self.campaign.current();
                debug!(
                    match_id = %level.id(),
                    tick = ticks,
                    phase = ?level.phase(),
                    attacker = level.attacker(),
                    score = level.score(),
                    "Snapshot"
                );
            }
        };

        let snapshot = self.snapshot_builder.build(self.campaign.current());
        info!(
            ticks,
            ?stop_reason,
            total_score = self.campaign.total_score(),
            elapsed_ms = timer.elapsed_ms(),
            "Runner stopped"
        );

        Ok(RunSummary {
            ticks,
            stop_reason,
            total_score: self.campaign.total_score(),
            levels_played: self.campaign.levels_played(),
            snapshot,
        })
    }
}

fn log_events(tick: u64, events: &[GameEvent]) {
    for event in events {
        match event {
            GameEvent::Sound { .. } | GameEvent::Shot { .. } | GameEvent::Hit { .. } => {}
            other => debug!(tick, event = ?other, "Game event"),
        }
    }
}
