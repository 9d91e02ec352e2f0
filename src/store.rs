//! Persistence query interface
//!
//! The relational store that owns samples, treatments and interventions is
//! external. The pipeline only needs the three queries on [`SessionStore`].
//! [`MemoryStore`] backs tests and the CLI, loaded from a JSON fixture.

use std::collections::HashMap;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::AnalyticsError;
use crate::treatment::types::{Intervention, TreatmentSnapshot};
use crate::types::{Sample, Window};

/// Read-only queries the analytics pipeline issues against the store
#[async_trait]
pub trait SessionStore: Send + Sync {
    /// Samples of `session_id` inside `window`, ordered by timestamp.
    /// Returns an empty vector when nothing matches.
    async fn fetch_samples(
        &self,
        session_id: &str,
        window: &Window,
    ) -> Result<Vec<Sample>, AnalyticsError>;

    /// Interventions of a treatment; empty when it has none
    async fn fetch_interventions(
        &self,
        treatment_id: &str,
    ) -> Result<Vec<Intervention>, AnalyticsError>;

    /// Treatment snapshot; [`AnalyticsError::NotFound`] if the id is unknown
    async fn fetch_treatment(&self, treatment_id: &str)
        -> Result<TreatmentSnapshot, AnalyticsError>;
}

/// On-disk fixture layout for [`MemoryStore`]
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StoreFixture {
    #[serde(default)]
    pub samples: Vec<Sample>,
    #[serde(default)]
    pub treatments: Vec<TreatmentSnapshot>,
    /// Treatment id -> interventions
    #[serde(default)]
    pub interventions: HashMap<String, Vec<Intervention>>,
}

/// In-memory store
#[derive(Debug, Default)]
pub struct MemoryStore {
    samples: HashMap<String, Vec<Sample>>,
    treatments: HashMap<String, TreatmentSnapshot>,
    interventions: HashMap<String, Vec<Intervention>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_fixture(fixture: StoreFixture) -> Self {
        let mut store = Self::new();
        for sample in fixture.samples {
            store.insert_sample(sample);
        }
        for treatment in fixture.treatments {
            store.insert_treatment(treatment);
        }
        for (treatment_id, interventions) in fixture.interventions {
            for intervention in interventions {
                store.insert_intervention(&treatment_id, intervention);
            }
        }
        store
    }

    /// Load a store from fixture JSON
    pub fn from_json(json: &str) -> Result<Self, AnalyticsError> {
        let fixture: StoreFixture = serde_json::from_str(json)?;
        Ok(Self::from_fixture(fixture))
    }

    pub fn insert_sample(&mut self, sample: Sample) {
        self.samples
            .entry(sample.session_id.clone())
            .or_default()
            .push(sample);
    }

    pub fn insert_treatment(&mut self, treatment: TreatmentSnapshot) {
        self.treatments.insert(treatment.id.clone(), treatment);
    }

    pub fn insert_intervention(&mut self, treatment_id: &str, intervention: Intervention) {
        self.interventions
            .entry(treatment_id.to_string())
            .or_default()
            .push(intervention);
    }
}

#[async_trait]
impl SessionStore for MemoryStore {
    async fn fetch_samples(
        &self,
        session_id: &str,
        window: &Window,
    ) -> Result<Vec<Sample>, AnalyticsError> {
        let mut samples: Vec<Sample> = self
            .samples
            .get(session_id)
            .map(|all| {
                all.iter()
                    .filter(|s| window.contains(s.timestamp))
                    .cloned()
                    .collect()
            })
            .unwrap_or_default();
        samples.sort_by_key(|s| s.timestamp);
        Ok(samples)
    }

    async fn fetch_interventions(
        &self,
        treatment_id: &str,
    ) -> Result<Vec<Intervention>, AnalyticsError> {
        Ok(self
            .interventions
            .get(treatment_id)
            .cloned()
            .unwrap_or_default())
    }

    async fn fetch_treatment(
        &self,
        treatment_id: &str,
    ) -> Result<TreatmentSnapshot, AnalyticsError> {
        self.treatments
            .get(treatment_id)
            .cloned()
            .ok_or_else(|| AnalyticsError::NotFound(format!("treatment {treatment_id}")))
    }
}
