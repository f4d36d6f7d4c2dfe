use async_trait::async_trait;
use serde::Serialize;
use sha2::{Digest, Sha256};
use std::sync::Mutex;
use thiserror::Error;

use crate::subscription::SubscriptionRequest;

/// Failure reported by the on-chain submission collaborator.
#[derive(Debug, Error)]
pub enum SubmitError {
    /// The wallet or user declined to sign.
    #[error("Submission rejected: {0}")]
    Rejected(String),

    /// The transaction was sent but never confirmed.
    #[error("Transaction not confirmed: {0}")]
    Unconfirmed(String),

    #[error("Submission failed: {0}")]
    Failed(String),
}

#[derive(Debug, Error)]
pub enum SubscribeError {
    /// The feed validator refused the URL; nothing was submitted.
    #[error("Feed rejected: {reason}")]
    Rejected { reason: String },

    /// Validation passed but the submission failed; safe to retry.
    #[error(transparent)]
    Submission(#[from] SubmitError),
}

/// Proof that a subscription was handed off (a transaction hash or similar).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubmissionReceipt {
    pub reference: String,
    /// The write is on chain. False when it still needs an external signer.
    pub confirmed: bool,
}

/// Registers a validated subscription, typically as an `addFeed(fid, feedUrl)`
/// contract call.
#[async_trait]
pub trait SubscriptionSubmitter: Send + Sync {
    async fn submit(&self, request: &SubscriptionRequest) -> Result<SubmissionReceipt, SubmitError>;
}

/// An `addFeed` call ready to be signed by an external wallet.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AddFeedCall {
    pub contract_address: Option<String>,
    pub chain_id: u64,
    pub function: &'static str,
    pub fid: String,
    pub feed_url: String,
}

impl AddFeedCall {
    pub fn new(contract_address: Option<String>, chain_id: u64, request: &SubscriptionRequest) -> Self {
        Self {
            contract_address,
            chain_id,
            function: "addFeed",
            fid: request.owner_id.to_string(),
            feed_url: request.feed_url.clone(),
        }
    }
}

/// Submitter that signs nothing: it records each `addFeed` call for an
/// external wallet and returns an unconfirmed receipt holding a digest of
/// the call.
pub struct CallRecorder {
    contract_address: Option<String>,
    chain_id: u64,
    calls: Mutex<Vec<AddFeedCall>>,
}

impl CallRecorder {
    pub fn new(contract_address: Option<String>, chain_id: u64) -> Self {
        Self {
            contract_address,
            chain_id,
            calls: Mutex::new(Vec::new()),
        }
    }

    pub fn calls(&self) -> Vec<AddFeedCall> {
        match self.calls.lock() {
            Ok(calls) => calls.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }
}

#[async_trait]
impl SubscriptionSubmitter for CallRecorder {
    async fn submit(&self, request: &SubscriptionRequest) -> Result<SubmissionReceipt, SubmitError> {
        let call = AddFeedCall::new(self.contract_address.clone(), self.chain_id, request);
        let encoded = serde_json::to_vec(&call).map_err(|e| SubmitError::Failed(e.to_string()))?;
        let reference = format!("{:x}", Sha256::digest(&encoded));

        tracing::info!(fid = %call.fid, feed_url = %call.feed_url, reference = %reference, "Recorded addFeed call");
        match self.calls.lock() {
            Ok(mut calls) => calls.push(call),
            Err(poisoned) => poisoned.into_inner().push(call),
        }

        Ok(SubmissionReceipt {
            reference,
            confirmed: false,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_recorder_captures_add_feed_call() {
        let recorder = CallRecorder::new(Some("0xabc".to_string()), 8453);
        let request = SubscriptionRequest::parse("12", "https://x.example.com/rss").unwrap();

        let receipt = recorder.submit(&request).await.unwrap();
        assert_eq!(receipt.reference.len(), 64);
        assert!(!receipt.confirmed);

        let calls = recorder.calls();
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].function, "addFeed");
        assert_eq!(calls[0].fid, "12");
        assert_eq!(calls[0].feed_url, "https://x.example.com/rss");
    }

    #[test]
    fn test_call_serializes_for_wallets() {
        let request = SubscriptionRequest::parse("12", "https://x.example.com/rss").unwrap();
        let call = AddFeedCall::new(None, 8453, &request);
        let json = serde_json::to_value(&call).unwrap();
        assert_eq!(json["chainId"], 8453);
        assert_eq!(json["feedUrl"], "https://x.example.com/rss");
        assert_eq!(json["fid"], "12");
    }
}
