use std::time::{Duration, Instant};

use ar_meshing::{
    BindingReport, BufferError, MeshProducer, MeshReconciler, MeshingSettings, PassError,
    PassInfo, RendererBinding,
};
use ar_meshing_port::SnapshotSequence;

use crate::{HeadlessObject, HeadlessSink};

/// Decides when the next reconciliation pass is due, given a target rate.
///
/// Does not consult any clock itself; callers supply the current time.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct PassClock {
    interval: Option<Duration>,
    last_pass: Option<Instant>,
}

impl PassClock {
    /// Constructs a clock which allows one pass per `interval`, or none at all if
    /// `interval` is [`None`].
    pub fn new(interval: Option<Duration>) -> Self {
        Self {
            interval,
            last_pass: None,
        }
    }

    /// Constructs a clock following [`MeshingSettings::target_frame_rate`].
    pub fn from_settings(settings: &MeshingSettings) -> Self {
        Self::new(settings.pass_interval())
    }

    /// Minimum time between passes.
    pub fn interval(&self) -> Option<Duration> {
        self.interval
    }

    /// Returns whether a pass should run at time `now`.
    pub fn is_due(&self, now: Instant) -> bool {
        match (self.interval, self.last_pass) {
            (None, _) => false,
            (Some(_), None) => true,
            (Some(interval), Some(last)) => now.saturating_duration_since(last) >= interval,
        }
    }

    /// Informs the clock that a pass started at time `now`.
    pub fn did_pass(&mut self, now: Instant) {
        self.last_pass = Some(now);
    }

    /// Earliest time at which [`Self::is_due()`] will return true, if a pass has happened
    /// and passes are allowed at all.
    pub fn next_pass_time(&self) -> Option<Instant> {
        Some(self.last_pass? + self.interval?)
    }
}

/// What one [`PlaybackSession::step()`] did.
#[derive(Clone, Debug, PartialEq)]
#[non_exhaustive]
pub struct SessionStep {
    /// Report from the reconciler.
    pub pass: PassInfo,
    /// Report from the renderer binding.
    pub binding: BindingReport,
}

/// Drives a [`MeshReconciler`] from a producer at a fixed target rate, keeping a
/// [`RendererBinding`] with a [`HeadlessSink`] up to date after every pass.
#[derive(Debug)]
pub struct PlaybackSession<P> {
    producer: P,
    reconciler: MeshReconciler,
    binding: RendererBinding<HeadlessObject>,
    sink: HeadlessSink,
    clock: PassClock,
    passes: usize,
}

impl<P: MeshProducer> PlaybackSession<P> {
    /// Constructs a session which has not yet run any passes.
    pub fn new(producer: P, settings: &MeshingSettings) -> Result<Self, BufferError> {
        let reconciler = MeshReconciler::with_settings(settings)?;
        let mut binding = RendererBinding::new(&reconciler, settings.collider_update_throttle);
        let mut sink = HeadlessSink::new();
        binding.set_material(&mut sink, settings.material_mode());
        Ok(Self {
            producer,
            reconciler,
            binding,
            sink,
            clock: PassClock::from_settings(settings),
            passes: 0,
        })
    }

    /// Runs a pass if one is due at time `now`, then brings the headless objects up to
    /// date. Returns [`None`] if no pass was due.
    ///
    /// While paused, a due pass still counts as having happened but does not consult the
    /// producer.
    pub fn step(&mut self, now: Instant) -> Result<Option<SessionStep>, PassError> {
        if !self.clock.is_due(now) {
            return Ok(None);
        }
        self.clock.did_pass(now);
        self.passes += 1;

        let pass = self.reconciler.update(&mut self.producer)?;
        let binding = self.binding.apply(&mut self.reconciler, &mut self.sink);
        if pass.changed() {
            log::debug!("{pass}");
        }
        Ok(Some(SessionStep { pass, binding }))
    }

    #[allow(missing_docs)]
    pub fn is_paused(&self) -> bool {
        self.reconciler.is_paused()
    }

    /// Pauses or resumes block updates. While paused, [`Self::step()`] runs no passes.
    pub fn set_paused(&mut self, paused: bool) {
        self.reconciler.set_paused(paused);
    }

    /// Number of times [`Self::step()`] found a pass due, including failed passes.
    pub fn passes(&self) -> usize {
        self.passes
    }

    #[allow(missing_docs)]
    pub fn clock(&self) -> &PassClock {
        &self.clock
    }

    #[allow(missing_docs)]
    pub fn producer(&self) -> &P {
        &self.producer
    }

    #[allow(missing_docs)]
    pub fn reconciler(&self) -> &MeshReconciler {
        &self.reconciler
    }

    #[allow(missing_docs)]
    pub fn binding(&self) -> &RendererBinding<HeadlessObject> {
        &self.binding
    }

    #[allow(missing_docs)]
    pub fn sink(&self) -> &HeadlessSink {
        &self.sink
    }
}

impl PlaybackSession<SnapshotSequence> {
    /// Steps the session in real time until every snapshot of the sequence has been
    /// offered to the reconciler, calling `on_step` after each pass.
    ///
    /// Failed passes are logged and playback continues with the next snapshot.
    pub fn play_to_end(
        &mut self,
        mut on_step: impl FnMut(&SessionStep),
    ) -> Result<(), anyhow::Error> {
        if self.clock.interval().is_none() {
            anyhow::bail!("target frame rate is zero; no passes would ever run");
        }
        if self.is_paused() {
            anyhow::bail!("block updates are paused; no passes would ever run");
        }
        if self.producer.is_empty() {
            log::warn!("no snapshots to play");
            return Ok(());
        }

        loop {
            let now = Instant::now();
            match self.step(now) {
                Ok(Some(step)) => on_step(&step),
                Ok(None) => {}
                Err(error) => log::error!("mesh pass failed: {error}"),
            }
            if self.passes > 0 && self.producer.is_finished() {
                return Ok(());
            }
            if let Some(next) = self.clock.next_pass_time() {
                std::thread::sleep(next.saturating_duration_since(Instant::now()));
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ar_meshing::testing::{BlockFixture, FixtureProducer};
    use ar_meshing::{MaterialMode, PassOutcome};
    use pretty_assertions::assert_eq;

    #[test]
    fn clock_rate() {
        let start = Instant::now();
        let interval = Duration::from_millis(50);
        let mut clock = PassClock::new(Some(interval));
        assert!(clock.is_due(start));
        assert_eq!(clock.next_pass_time(), None);

        clock.did_pass(start);
        assert!(!clock.is_due(start));
        assert!(!clock.is_due(start + Duration::from_millis(49)));
        assert!(clock.is_due(start + interval));
        assert_eq!(clock.next_pass_time(), Some(start + interval));
    }

    #[test]
    fn clock_zero_rate_never_due() {
        let settings: MeshingSettings =
            serde_json::from_str(r#"{"target_frame_rate": 0}"#).unwrap();
        let clock = PassClock::from_settings(&settings);
        assert!(!clock.is_due(Instant::now()));
    }

    fn fixture_session() -> PlaybackSession<FixtureProducer> {
        let mut producer = FixtureProducer::new(1.0);
        producer.set_state(
            1,
            &[
                BlockFixture::fan([0, 0, 0], 1, 4),
                BlockFixture::fan([0, 1, 0], 1, 5),
            ],
        );
        PlaybackSession::new(producer, &MeshingSettings::default()).unwrap()
    }

    #[test]
    fn step_respects_rate() {
        let mut session = fixture_session();
        let start = Instant::now();

        let step = session.step(start).unwrap().unwrap();
        assert_eq!(step.pass.outcome, PassOutcome::Committed);
        assert_eq!(step.binding.blocks_updated, 2);
        assert_eq!(session.sink().stats().live_objects, 2);
        assert_eq!(session.sink().stats().live_triangles, 2 + 3);

        assert_eq!(session.step(start + Duration::from_millis(10)).unwrap(), None);
        assert_eq!(session.passes(), 1);

        let step = session.step(start + Duration::from_millis(50)).unwrap().unwrap();
        assert_eq!(step.pass.outcome, PassOutcome::Skipped);
        assert_eq!(session.passes(), 2);
    }

    #[test]
    fn paused_session_does_not_consult_producer() {
        let mut session = fixture_session();
        session.set_paused(true);
        let step = session.step(Instant::now()).unwrap().unwrap();
        assert_eq!(step.pass.outcome, PassOutcome::Paused);
        assert_eq!(session.producer().mesh_info_calls, 0);
        assert_eq!(session.binding().object_count(), 0);
    }

    #[test]
    fn invisible_material_from_settings() {
        let settings: MeshingSettings =
            serde_json::from_str(r#"{"use_invisible_material": true}"#).unwrap();
        let mut producer = FixtureProducer::new(1.0);
        producer.set_state(1, &[BlockFixture::fan([2, 0, 0], 1, 3)]);
        let mut session = PlaybackSession::new(producer, &settings).unwrap();

        session.step(Instant::now()).unwrap();
        let object = session.binding().object([2, 0, 0].into()).unwrap();
        assert_eq!(object.material(), MaterialMode::Invisible);
        assert_eq!(object.collider_triangle_count(), Some(1));
    }
}
