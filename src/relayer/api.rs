//! JSON bodies exchanged with the relayer, shared by the server and the client.

use ethers::types::{Address, H256};
use serde::{Deserialize, Serialize};

use crate::forwarder::SerializedForwardRequest;
use crate::prelude::*;
use crate::relayer::ReceiptSummary;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HealthResponse {
    pub status: String,
    pub message: String,
    pub relayer_address: Address,
    pub forwarder_address: Address,
    pub social_core_address: Address,
    pub chain_id: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NonceResponse {
    pub nonce: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RelayBody {
    pub request: SerializedForwardRequest,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RelayResponse {
    pub success: bool,
    pub hash: H256,
    pub receipt: ReceiptSummary,
}

/// Error payload returned with every non-2xx relayer response.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RelayErrorBody {
    pub error: String,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub code: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub specific_error: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub explanation: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub possible_causes: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub transaction_hash: Option<H256>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub request_id: Option<String>,
}

impl RelayErrorBody {
    pub fn new(error: impl Into<String>, message: impl Into<String>) -> Self {
        RelayErrorBody {
            error: error.into(),
            message: message.into(),
            code: None,
            specific_error: None,
            explanation: None,
            possible_causes: Vec::new(),
            transaction_hash: None,
            request_id: None,
        }
    }

    pub fn with_request_id(mut self, request_id: impl Into<String>) -> Self {
        self.request_id = Some(request_id.into());
        self
    }
}

impl From<&Error> for RelayErrorBody {
    fn from(err: &Error) -> Self {
        let title = match err {
            Error::MissingFields(_) => "Missing required fields",
            Error::Validation(_) | Error::JsonParse(_) => "Invalid request",
            Error::UntrustedForwarder { .. } => "Forwarder not trusted",
            Error::ExpiredRequest { .. } => "Request expired",
            Error::Network(_) => "Chain unavailable",
            _ => "Failed to relay transaction",
        };
        let mut body = RelayErrorBody::new(title, err.to_string());
        body.code = Some(err.code().to_string());

        match err {
            Error::ExecutionReverted(failure) => {
                body.message = failure.message.clone();
                body.transaction_hash = failure.transaction_hash;
                if let Some(revert) = &failure.revert {
                    body.specific_error = Some(revert.name().to_string());
                    body.explanation = Some(revert.explanation());
                    body.possible_causes = revert
                        .possible_causes()
                        .into_iter()
                        .map(str::to_string)
                        .collect();
                }
            }
            Error::Unconfirmed { hash, .. } => {
                body.transaction_hash = Some(*hash);
                body.explanation = Some(
                    "The transaction may still be mined. Check the hash before signing a new request."
                        .to_string(),
                );
            }
            _ => {}
        }
        body
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::forwarder::{ExecutionFailure, ForwarderRevert};

    #[test]
    fn reverted_execution_is_fully_diagnosed() {
        let err = Error::ExecutionReverted(ExecutionFailure {
            revert: Some(ForwarderRevert::InvalidSigner {
                signer: Address::repeat_byte(0x11),
                from: Address::repeat_byte(0x22),
            }),
            message: "execution reverted".to_string(),
            transaction_hash: None,
        });
        let json = serde_json::to_value(RelayErrorBody::from(&err)).unwrap();

        assert_eq!(json["error"], "Failed to relay transaction");
        assert_eq!(json["code"], "ExecutionRevertedError");
        assert_eq!(json["specificError"], "ERC2771ForwarderInvalidSigner");
        assert_eq!(json["possibleCauses"].as_array().unwrap().len(), 4);
        assert!(json.get("transactionHash").is_none());
    }

    #[test]
    fn validation_error_has_no_diagnostics() {
        let err = Error::MissingFields("request must include non-empty data".to_string());
        let body = RelayErrorBody::from(&err).with_request_id("abc");
        let json = serde_json::to_value(&body).unwrap();

        assert_eq!(json["error"], "Missing required fields");
        assert_eq!(json["code"], "ValidationError");
        assert_eq!(json["requestId"], "abc");
        assert!(json.get("possibleCauses").is_none());
        assert_eq!(serde_json::from_value::<RelayErrorBody>(json).unwrap(), body);
    }

    #[test]
    fn malformed_values_are_not_reported_as_missing() {
        for err in [
            Error::Validation("gas must be a non-negative decimal string, got \"-1\"".to_string()),
            Error::JsonParse("expected value at line 1 column 2".to_string()),
        ] {
            let body = RelayErrorBody::from(&err);
            assert_eq!(body.error, "Invalid request");
            assert_eq!(body.code.as_deref(), Some("ValidationError"));
        }
    }
}
