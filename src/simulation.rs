//! Simulation driver.
//!
//! The driver is the only thing that advances time: each pass gives every
//! participant one [`Participant::process_one`] call, in creation order.
//! Quiescence is judged after a full pass, never per participant, so a frame
//! sent late in a pass is still seen before the run is declared finished.

use crate::error::DhError;
use crate::group::{DhGroup, GroupSource};
use crate::modexp::MAX_RANDOM_BITS;
use crate::network::{Medium, ParticipantId, SessionId};
use crate::participant::{Participant, Tick};
use crate::security::fingerprint;
use crate::session::SessionState;
use num_bigint::BigUint;
use rand::rngs::StdRng;
use rand::SeedableRng;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;
use std::sync::Arc;
use tracing::{error, info};

/// Largest accepted `id_bytes`
pub const MAX_ID_BYTES: usize = 32;

/// Simulation configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimulationConfig {
    /// Participants created at start
    pub participants: usize,
    /// Where `(generator, prime)` come from
    pub group: GroupSource,
    /// Bit length of private exponents
    pub exponent_bits: u64,
    /// Random bytes per participant id
    pub id_bytes: usize,
    /// Watchdog: passes allowed per `run_until_quiescent`
    pub max_passes: u64,
    /// Seed for a reproducible run; OS entropy when absent
    pub seed: Option<u64>,
    /// Index of the participant that starts the key exchange
    pub initiator: usize,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            participants: 4,
            group: GroupSource::default(),
            exponent_bits: 256,
            id_bytes: 4,
            max_passes: 10_000,
            seed: None,
            initiator: 0,
        }
    }
}

impl SimulationConfig {
    pub fn from_json_file(path: &Path) -> Result<Self, DhError> {
        let text = std::fs::read_to_string(path)?;
        Ok(serde_json::from_str(&text)?)
    }

    pub fn validate(&self) -> Result<(), DhError> {
        if self.participants == 0 {
            return Err(DhError::InvalidParameter(
                "participants must be at least 1".to_string(),
            ));
        }
        if self.exponent_bits == 0 || self.exponent_bits > MAX_RANDOM_BITS {
            return Err(DhError::InvalidParameter(format!(
                "exponent_bits must lie in [1, {}], got {}",
                MAX_RANDOM_BITS, self.exponent_bits
            )));
        }
        if self.id_bytes == 0 || self.id_bytes > MAX_ID_BYTES {
            return Err(DhError::InvalidParameter(format!(
                "id_bytes must lie in [1, {}], got {}",
                MAX_ID_BYTES, self.id_bytes
            )));
        }
        if let Some(space) = self.id_space() {
            if self.participants > space {
                return Err(DhError::InvalidParameter(format!(
                    "{} participants do not fit in {}-byte ids",
                    self.participants, self.id_bytes
                )));
            }
        }
        if self.max_passes == 0 {
            return Err(DhError::InvalidParameter(
                "max_passes must be at least 1".to_string(),
            ));
        }
        if self.initiator >= self.participants {
            return Err(DhError::InvalidParameter(format!(
                "initiator {} out of range for {} participants",
                self.initiator, self.participants
            )));
        }
        Ok(())
    }

    /// Number of distinct ids of `id_bytes` bytes, `None` when it exceeds `usize`
    pub fn id_space(&self) -> Option<usize> {
        u32::try_from(self.id_bytes)
            .ok()
            .and_then(|exp| 256usize.checked_pow(exp))
    }
}

/// Work done by one or more `run_until_quiescent` calls.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RunReport {
    /// Full passes over all participants
    pub passes: u64,
    /// Frames dequeued, handled or discarded
    pub frames: u64,
}

impl RunReport {
    fn absorb(&mut self, other: RunReport) {
        self.passes += other.passes;
        self.frames += other.frames;
    }
}

/// Snapshot of one participant for reporting.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParticipantSummary {
    pub id: ParticipantId,
    pub state: SessionState,
    pub known_hosts: usize,
    pub session_id: Option<SessionId>,
    pub key_fingerprint: Option<String>,
}

impl fmt::Display for ParticipantSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}: {} hosts={} session={} key={}",
            self.id,
            self.state,
            self.known_hosts,
            self.session_id.as_ref().map_or("-", |s| s.as_str()),
            self.key_fingerprint.as_deref().unwrap_or("-"),
        )
    }
}

/// Owns the medium and every participant, and schedules them.
pub struct Simulation {
    config: SimulationConfig,
    medium: Arc<Medium>,
    group: Arc<DhGroup>,
    rng: StdRng,
    participants: Vec<Participant>,
}

impl Simulation {
    /// Builds the simulation with the configured group and joins every
    /// participant.
    pub fn new(config: SimulationConfig) -> Result<Self, DhError> {
        config.validate()?;
        let group = config.group.resolve()?;
        Self::with_group(config, group)
    }

    /// Builds the simulation with an explicit group, ignoring `config.group`.
    ///
    /// All participants register before any of them joins, so every initial
    /// `Ping` reaches every peer.
    ///
    /// # Errors
    /// Fails on an invalid config, or when `exponent_bits` exceeds the bit
    /// length of the prime.
    pub fn with_group(config: SimulationConfig, group: DhGroup) -> Result<Self, DhError> {
        config.validate()?;
        if config.exponent_bits > group.bits() {
            return Err(DhError::InvalidParameter(format!(
                "exponent_bits {} exceeds the {}-bit prime",
                config.exponent_bits,
                group.bits()
            )));
        }
        let rng = match config.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_os_rng(),
        };

        let mut sim = Self {
            medium: Arc::new(Medium::new()),
            group: Arc::new(group),
            rng,
            participants: Vec::with_capacity(config.participants),
            config,
        };

        for _ in 0..sim.config.participants {
            sim.register_participant()?;
        }
        for participant in &mut sim.participants {
            participant.join()?;
        }

        info!(
            participants = sim.participants.len(),
            recipients = sim.medium.recipient_count(),
            group_bits = sim.group.bits(),
            "simulation ready"
        );
        Ok(sim)
    }

    pub fn config(&self) -> &SimulationConfig {
        &self.config
    }

    pub fn medium(&self) -> &Arc<Medium> {
        &self.medium
    }

    pub fn group(&self) -> &DhGroup {
        &self.group
    }

    pub fn participants(&self) -> &[Participant] {
        &self.participants
    }

    pub fn participant(&self, index: usize) -> Option<&Participant> {
        self.participants.get(index)
    }

    pub fn participant_mut(&mut self, index: usize) -> Option<&mut Participant> {
        self.participants.get_mut(index)
    }

    pub fn find(&self, id: &ParticipantId) -> Option<&Participant> {
        self.participants.iter().find(|p| p.id() == id)
    }

    /// Creates and registers a participant without announcing it.
    ///
    /// Peers learn about it only through later discovery traffic.
    ///
    /// # Errors
    /// [`DhError::InvalidParameter`] once every `id_bytes` id is taken.
    pub fn register_participant(&mut self) -> Result<ParticipantId, DhError> {
        if let Some(space) = self.config.id_space() {
            if self.participants.len() >= space {
                return Err(DhError::InvalidParameter(format!(
                    "all {} ids of {} bytes are in use",
                    space, self.config.id_bytes
                )));
            }
        }
        let id = loop {
            let candidate = ParticipantId::random(&mut self.rng, self.config.id_bytes);
            if self.find(&candidate).is_none() {
                break candidate;
            }
        };
        let participant = Participant::new(
            id.clone(),
            Arc::clone(&self.medium),
            Arc::clone(&self.group),
            StdRng::from_rng(&mut self.rng),
            self.config.exponent_bits,
        );
        self.participants.push(participant);
        Ok(id)
    }

    /// Adds a participant mid-run and joins it.
    pub fn add_participant(&mut self) -> Result<ParticipantId, DhError> {
        let id = self.register_participant()?;
        if let Some(participant) = self.participants.last_mut() {
            participant.join()?;
        }
        Ok(id)
    }

    /// Every participant broadcasts its host set; peers missing from it
    /// announce themselves.
    pub fn refresh_discovery(&mut self) -> Result<(), DhError> {
        for participant in &mut self.participants {
            participant.request_hosts()?;
        }
        Ok(())
    }

    /// Starts a key exchange at participant `index`.
    pub fn begin_session(&mut self, index: usize) -> Result<SessionId, DhError> {
        let count = self.participants.len();
        self.participants
            .get_mut(index)
            .ok_or_else(|| {
                DhError::InvalidParameter(format!(
                    "no participant at index {} ({} participants)",
                    index, count
                ))
            })?
            .begin_session()
    }

    /// One pass: every participant processes at most one frame.
    ///
    /// Returns the number of frames dequeued.
    pub fn tick_all(&mut self) -> Result<u64, DhError> {
        let mut frames = 0;
        for participant in &mut self.participants {
            if participant.process_one()? != Tick::Empty {
                frames += 1;
            }
        }
        Ok(frames)
    }

    /// True when every participant's inbound queue is empty
    pub fn is_quiescent(&self) -> bool {
        self.participants.iter().all(Participant::is_drained)
    }

    /// Runs passes until a pass ends with every queue empty.
    ///
    /// # Errors
    /// [`DhError::NonConvergence`] once `max_passes` passes did not drain the
    /// queues; any error from a participant is returned as is.
    pub fn run_until_quiescent(&mut self) -> Result<RunReport, DhError> {
        let mut report = RunReport::default();
        loop {
            report.frames += self.tick_all()?;
            report.passes += 1;

            if self.is_quiescent() {
                return Ok(report);
            }
            if report.passes >= self.config.max_passes {
                let pending: usize = self.participants.iter().map(Participant::pending).sum();
                error!(passes = report.passes, pending, "watchdog: no quiescence");
                return Err(DhError::NonConvergence {
                    passes: report.passes,
                });
            }
        }
    }

    /// Discovery to quiescence, then a key exchange from the configured
    /// initiator to quiescence.
    pub fn run(&mut self) -> Result<RunReport, DhError> {
        let mut report = self.run_until_quiescent()?;
        info!(passes = report.passes, frames = report.frames, "discovery settled");

        let session = self.begin_session(self.config.initiator)?;
        let exchange = self.run_until_quiescent()?;
        info!(
            session = %session,
            passes = exchange.passes,
            frames = exchange.frames,
            sends = self.medium.sends(),
            "key exchange settled"
        );

        report.absorb(exchange);
        Ok(report)
    }

    /// The common session key when every participant is `Complete` with the
    /// same value.
    pub fn agreed_key(&self) -> Option<&BigUint> {
        let mut keys = self.participants.iter().map(Participant::session_key);
        let first = keys.next()??;
        keys.all(|key| key == Some(first)).then_some(first)
    }

    pub fn summary(&self) -> Vec<ParticipantSummary> {
        self.participants
            .iter()
            .map(|p| ParticipantSummary {
                id: p.id().clone(),
                state: p.state(),
                known_hosts: p.known_hosts().len(),
                session_id: p.session_id().cloned(),
                key_fingerprint: p.session_key().map(fingerprint),
            })
            .collect()
    }
}
