//! End-to-end diagnosis: extract, normalize, detect, verify, merge, diagnose.

use std::sync::Arc;
use std::time::Instant;

use chrono::{DateTime, Utc};
use futures::future::join_all;
use rentcheck_core::{
    Conflict, DiagnosisResult, ExtractedFacts, PipelineConfig, RiskWeights, Source,
    VerificationResult, detect_conflicts, diagnose_with, merge, normalize, resolve,
};
use serde::Serialize;
use tracing::{Instrument, info, info_span, warn};

use crate::client::ImagePart;
use crate::error::PipelineError;
use crate::extractor::FactExtractor;

/// A diagnosis plus the audit trail that produced it.
#[derive(Debug, Clone, Serialize)]
pub struct PipelineReport {
    pub diagnosis: DiagnosisResult,
    /// Normalized flyer facts, before verification outcomes were applied.
    pub flyer_facts: ExtractedFacts,
    pub estimate_facts: ExtractedFacts,
    pub conflicts: Vec<Conflict>,
    pub verifications: Vec<VerificationResult>,
    pub model: String,
    pub completed_at: DateTime<Utc>,
}

pub struct Pipeline {
    extractor: Arc<dyn FactExtractor>,
    config: PipelineConfig,
    weights: RiskWeights,
}

impl Pipeline {
    pub fn new(extractor: Arc<dyn FactExtractor>) -> Self {
        Self {
            extractor,
            config: PipelineConfig::default(),
            weights: RiskWeights::default(),
        }
    }

    pub fn with_config(mut self, config: PipelineConfig) -> Self {
        self.config = config;
        self
    }

    pub fn with_weights(mut self, weights: RiskWeights) -> Self {
        self.weights = weights;
        self
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// Run one request. The only failure is running past the deadline, in
    /// which case no partial report is returned.
    pub async fn diagnose(
        &self,
        flyer: &[ImagePart],
        estimate: &[ImagePart],
    ) -> Result<PipelineReport, PipelineError> {
        let deadline = self.config.deadline;
        let span = info_span!(
            "diagnose",
            flyer_images = flyer.len(),
            estimate_images = estimate.len()
        );
        let started = Instant::now();

        let outcome = tokio::time::timeout(deadline, self.run(flyer, estimate))
            .instrument(span)
            .await;
        let elapsed_ms = started.elapsed().as_millis() as u64;
        match outcome {
            Ok(report) => {
                info!(
                    elapsed_ms,
                    items = report.diagnosis.items.len(),
                    risk_score = report.diagnosis.risk_score,
                    "diagnosis complete"
                );
                Ok(report)
            }
            Err(_) => {
                warn!(elapsed_ms, deadline_ms = deadline.as_millis() as u64, "diagnosis timed out");
                Err(PipelineError::DeadlineExceeded { after: deadline })
            }
        }
    }

    async fn run(&self, flyer: &[ImagePart], estimate: &[ImagePart]) -> PipelineReport {
        let (flyer_raw, estimate_raw) = tokio::join!(
            self.extractor.extract(flyer, Source::Flyer),
            self.extractor.extract(estimate, Source::Estimate),
        );
        let flyer_facts = normalize(flyer_raw);
        let estimate_facts = normalize(estimate_raw);

        let conflicts = detect_conflicts(&flyer_facts, &estimate_facts, &self.config);
        info!(
            conflicts = conflicts.len(),
            to_verify = conflicts.iter().filter(|c| c.needs_verification).count(),
            "conflicts detected"
        );

        let verifications = self.verify(flyer, &conflicts).await;
        let merged = merge(flyer_facts.clone(), &verifications);
        let diagnosis = diagnose_with(
            &merged.flyer,
            &estimate_facts,
            &merged.unconfirmed_fields,
            &self.weights,
        );

        PipelineReport {
            diagnosis,
            flyer_facts,
            estimate_facts,
            conflicts,
            verifications,
            model: self.extractor.model().to_string(),
            completed_at: Utc::now(),
        }
    }

    /// Re-read every flagged field from the flyer concurrently. One failed
    /// re-read only affects its own field.
    async fn verify(&self, flyer: &[ImagePart], conflicts: &[Conflict]) -> Vec<VerificationResult> {
        let pending: Vec<&Conflict> = conflicts.iter().filter(|c| c.needs_verification).collect();
        if pending.is_empty() {
            return Vec::new();
        }

        let rereads = if flyer.is_empty() {
            vec![None; pending.len()]
        } else {
            join_all(
                pending
                    .iter()
                    .map(|c| self.extractor.extract_field(flyer, c.field_name)),
            )
            .await
        };

        pending
            .into_iter()
            .zip(rereads)
            .map(|(conflict, reread)| {
                let result = resolve(conflict, reread);
                info!(
                    field = %result.field_name,
                    conflict = conflict.conflict_type.as_str(),
                    status = result.status.as_str(),
                    "field verified"
                );
                result
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::sync::Mutex;
    use std::time::Duration;

    use async_trait::async_trait;
    use rentcheck_core::{EvidencedField, FactField, ItemStatus, VerificationStatus};

    /// Serves fixed facts per source and fixed re-reads per field.
    #[derive(Default)]
    struct StubExtractor {
        flyer: Option<ExtractedFacts>,
        estimate: Option<ExtractedFacts>,
        rereads: HashMap<FactField, Option<EvidencedField<f64>>>,
        delay: Option<Duration>,
        reread_images: Mutex<Vec<usize>>,
    }

    #[async_trait]
    impl FactExtractor for StubExtractor {
        async fn extract(&self, _images: &[ImagePart], source: Source) -> ExtractedFacts {
            if let Some(delay) = self.delay {
                tokio::time::sleep(delay).await;
            }
            let facts = match source {
                Source::Flyer => self.flyer.clone(),
                Source::Estimate => self.estimate.clone(),
            };
            facts.unwrap_or_else(|| ExtractedFacts::empty(source))
        }

        async fn extract_field(
            &self,
            images: &[ImagePart],
            field: FactField,
        ) -> Option<EvidencedField<f64>> {
            self.reread_images.lock().unwrap().push(images.len());
            self.rereads.get(&field).cloned().flatten()
        }

        fn model(&self) -> &str {
            "stub"
        }
    }

    fn ev(value: f64, text: &str, confidence: f64, source: Source) -> EvidencedField<f64> {
        EvidencedField::new(Some(value), Some(text.into()), confidence, source, 0)
    }

    fn image() -> ImagePart {
        ImagePart::new(vec![1, 2, 3], "image/jpeg")
    }

    fn facts() -> (ExtractedFacts, ExtractedFacts) {
        let mut flyer = ExtractedFacts::empty(Source::Flyer);
        let mut estimate = ExtractedFacts::empty(Source::Estimate);
        flyer.rent = ev(100_000.0, "賃料 10万円", 0.95, Source::Flyer);
        estimate.rent = ev(100_000.0, "賃料 100,000円", 0.95, Source::Estimate);
        flyer.management_fee = ev(5_000.0, "管理費 5,000円", 0.95, Source::Flyer);
        estimate.management_fee = ev(5_000.0, "管理費 5,000円", 0.95, Source::Estimate);
        flyer.deposit_months = ev(1.0, "敷1", 0.95, Source::Flyer);
        estimate.deposit_months = ev(1.0, "敷金 1ヶ月", 0.95, Source::Estimate);
        flyer.key_money_months = ev(1.0, "礼1", 0.95, Source::Flyer);
        estimate.key_money_months = ev(1.0, "礼金 1ヶ月", 0.95, Source::Estimate);
        flyer.brokerage_months = ev(0.5, "仲介手数料0.5ヶ月", 0.95, Source::Flyer);
        estimate.brokerage_months = ev(0.5, "仲介手数料 0.5ヶ月", 0.95, Source::Estimate);
        (flyer, estimate)
    }

    #[tokio::test]
    async fn promised_zero_key_money_is_cut() {
        let (mut flyer, estimate) = facts();
        flyer.key_money_months = ev(0.0, "礼金なし", 0.95, Source::Flyer);
        let stub = StubExtractor {
            flyer: Some(flyer),
            estimate: Some(estimate),
            ..Default::default()
        };
        let pipeline = Pipeline::new(Arc::new(stub));

        let report = pipeline.diagnose(&[image()], &[image()]).await.unwrap();
        assert_eq!(report.conflicts.len(), 1);
        assert!(!report.conflicts[0].needs_verification);
        assert!(report.verifications.is_empty());
        let key = report
            .diagnosis
            .items
            .iter()
            .find(|i| i.name == "Key money")
            .unwrap();
        assert_eq!(key.status, ItemStatus::Cut);
        assert_eq!(key.price_fair, 0);
        assert_eq!(report.model, "stub");
    }

    #[tokio::test]
    async fn flyer_silence_is_verified_from_flyer_images_only() {
        let (mut flyer, estimate) = facts();
        flyer.key_money_months = EvidencedField::missing(Source::Flyer);
        let stub = Arc::new(StubExtractor {
            flyer: Some(flyer),
            estimate: Some(estimate),
            rereads: HashMap::from([(
                FactField::KeyMoneyMonths,
                Some(ev(1.0, "礼1", 0.8, Source::Flyer)),
            )]),
            ..Default::default()
        });
        let pipeline = Pipeline::new(stub.clone());

        let report = pipeline
            .diagnose(&[image(), image()], &[image(), image(), image()])
            .await
            .unwrap();
        assert_eq!(*stub.reread_images.lock().unwrap(), vec![2]);
        assert_eq!(report.verifications.len(), 1);
        assert_eq!(report.verifications[0].status, VerificationStatus::Confirmed);
        assert!(!report.diagnosis.has_unconfirmed_items);
        assert!(report.flyer_facts.key_money_months.is_null());
    }

    #[tokio::test]
    async fn failed_reread_only_affects_its_field() {
        let (mut flyer, estimate) = facts();
        flyer.deposit_months = EvidencedField::missing(Source::Flyer);
        flyer.key_money_months = EvidencedField::missing(Source::Flyer);
        let stub = StubExtractor {
            flyer: Some(flyer),
            estimate: Some(estimate),
            rereads: HashMap::from([
                (FactField::KeyMoneyMonths, Some(ev(1.0, "礼1", 0.8, Source::Flyer))),
                (FactField::DepositMonths, None),
            ]),
            ..Default::default()
        };
        let pipeline = Pipeline::new(Arc::new(stub));

        let report = pipeline.diagnose(&[image()], &[image()]).await.unwrap();
        let status = |field: FactField| {
            report
                .verifications
                .iter()
                .find(|v| v.field_name == field)
                .map(|v| v.status)
        };
        assert_eq!(status(FactField::KeyMoneyMonths), Some(VerificationStatus::Confirmed));
        assert_eq!(status(FactField::DepositMonths), Some(VerificationStatus::Unconfirmed));
        assert_eq!(
            report.diagnosis.unconfirmed_item_names,
            vec!["deposit_months".to_string()]
        );
        let deposit = report
            .diagnosis
            .items
            .iter()
            .find(|i| i.name == "Deposit")
            .unwrap();
        assert_eq!(deposit.status, ItemStatus::RequiresConfirmation);
    }

    #[tokio::test]
    async fn unreadable_documents_ask_for_confirmation() {
        let stub = Arc::new(StubExtractor::default());
        let pipeline = Pipeline::new(stub.clone());
        let report = pipeline.diagnose(&[], &[]).await.unwrap();

        // Nothing to re-read from, so no verification calls are made.
        assert!(stub.reread_images.lock().unwrap().is_empty());
        assert!(
            report
                .verifications
                .iter()
                .all(|v| v.status == VerificationStatus::RequiresManualCheck)
        );
        let diagnosis = &report.diagnosis;
        assert!(diagnosis.has_unconfirmed_items);
        assert_eq!(diagnosis.items.len(), 5);
        assert!(
            diagnosis
                .items
                .iter()
                .all(|i| i.status == ItemStatus::RequiresConfirmation && i.price_original == 0)
        );
        assert_eq!(diagnosis.total_original, 0);
        assert_eq!(diagnosis.risk_score, 0);
        assert_eq!(diagnosis.extraction_quality.as_str(), "low");
    }

    #[tokio::test]
    async fn deadline_exceeded_returns_no_report() {
        let stub = StubExtractor {
            delay: Some(Duration::from_secs(5)),
            ..Default::default()
        };
        let config = PipelineConfig {
            deadline: Duration::from_millis(20),
            ..PipelineConfig::default()
        };
        let pipeline = Pipeline::new(Arc::new(stub)).with_config(config);

        let err = pipeline.diagnose(&[image()], &[image()]).await.unwrap_err();
        let PipelineError::DeadlineExceeded { after } = err;
        assert_eq!(after, Duration::from_millis(20));
    }

    #[tokio::test]
    async fn report_serializes() {
        let (flyer, estimate) = facts();
        let stub = StubExtractor {
            flyer: Some(flyer),
            estimate: Some(estimate),
            ..Default::default()
        };
        let report = Pipeline::new(Arc::new(stub))
            .diagnose(&[image()], &[image()])
            .await
            .unwrap();
        let json = serde_json::to_value(&report).unwrap();
        assert_eq!(json["diagnosis"]["extraction_quality"], "high");
        assert_eq!(json["diagnosis"]["items"][0]["status"], "fair");
        assert_eq!(json["flyer_facts"]["source"], "flyer");
    }
}
