//! Ports to the services around the engine: job records and metrics storage.
//!
//! The engine only needs an opaque job id to tag a submission and a sink that
//! accepts the finalized record. Both are best-effort: failures are logged by
//! the caller and never block a run.

use anyhow::{Result, anyhow};
use serde::{Deserialize, Serialize};
use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

use crate::config::Validate;
use crate::error::CollabError;
use crate::simulation::{DrivingSummary, Mode};

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct JobId(pub String);

impl fmt::Display for JobId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JobRequest {
    pub scenario_id: String,
    pub simulation_type: Mode,
    pub duration_seconds: u32,
    pub vehicle_count: u32,
}

impl JobRequest {
    pub const DEFAULT_DURATION_SECONDS: u32 = 60;
    pub const DEFAULT_VEHICLE_COUNT: u32 = 5;

    pub fn new(scenario_id: impl Into<String>, simulation_type: Mode) -> Self {
        Self {
            scenario_id: scenario_id.into(),
            simulation_type,
            duration_seconds: Self::DEFAULT_DURATION_SECONDS,
            vehicle_count: Self::DEFAULT_VEHICLE_COUNT,
        }
    }
}

impl Validate for JobRequest {
    fn validate(&self) -> Result<()> {
        if self.scenario_id.is_empty() {
            return Err(anyhow!("Job scenario id must not be empty"));
        }

        if !(10..=600).contains(&self.duration_seconds) {
            return Err(anyhow!("Job duration {}s is out of range (10-600)", self.duration_seconds));
        }

        if !(1..=20).contains(&self.vehicle_count) {
            return Err(anyhow!("Job vehicle count {} is out of range (1-20)", self.vehicle_count));
        }

        Ok(())
    }
}

/// The record submitted once a manual run stops.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DrivingMetricsRecord {
    pub job_id: JobId,
    pub scenario_id: String,
    pub off_road_count: u32,
    pub red_light_violations: u32,
    pub yellow_light_violations: u32,
    pub turn_smoothness_score: f32,
    pub duration_seconds: f32,
    pub max_speed: f32,
    pub avg_speed: f32,
    pub distance_traveled: f32,
}

impl DrivingMetricsRecord {
    pub fn new(job_id: JobId, scenario_id: impl Into<String>, summary: &DrivingSummary) -> Self {
        Self {
            job_id,
            scenario_id: scenario_id.into(),
            off_road_count: summary.off_road_count,
            red_light_violations: summary.red_light_violations,
            yellow_light_violations: summary.yellow_light_violations,
            turn_smoothness_score: summary.turn_smoothness_score,
            duration_seconds: summary.duration_seconds,
            max_speed: summary.max_speed,
            avg_speed: summary.avg_speed,
            distance_traveled: summary.distance_traveled,
        }
    }
}

pub trait JobService {
    fn create_job(&mut self, request: &JobRequest) -> Result<JobId, CollabError>;
}

pub trait MetricsSink {
    fn submit(&mut self, record: &DrivingMetricsRecord) -> Result<(), CollabError>;
}

/// Hands out sequential local job ids; used when no job backend is attached.
#[derive(Debug, Default)]
pub struct LocalJobService {
    next: u64,
}

impl JobService for LocalJobService {
    fn create_job(&mut self, request: &JobRequest) -> Result<JobId, CollabError> {
        self.next += 1;
        let id = JobId(format!("local-{}", self.next));
        log::debug!("Created {} job {} for scenario {}", request.simulation_type, id, request.scenario_id);
        Ok(id)
    }
}

/// Writes each record to the log as JSON.
#[derive(Debug, Default)]
pub struct LogMetricsSink;

impl MetricsSink for LogMetricsSink {
    fn submit(&mut self, record: &DrivingMetricsRecord) -> Result<(), CollabError> {
        let json = serde_json::to_string(record).map_err(|e| CollabError::Rejected {
            service: "metrics log",
            reason: e.to_string(),
        })?;
        log::info!("Driving metrics: {}", json);
        Ok(())
    }
}

/// Keeps submitted records in memory behind a shared handle.
#[derive(Debug, Default, Clone)]
pub struct MemoryMetricsSink {
    records: Rc<RefCell<Vec<DrivingMetricsRecord>>>,
}

impl MemoryMetricsSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn records(&self) -> Vec<DrivingMetricsRecord> {
        self.records.borrow().clone()
    }
}

impl MetricsSink for MemoryMetricsSink {
    fn submit(&mut self, record: &DrivingMetricsRecord) -> Result<(), CollabError> {
        self.records.borrow_mut().push(record.clone());
        Ok(())
    }
}
