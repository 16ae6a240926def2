use ethers::types::{Address, Bytes, Log, TransactionReceipt, H256, U256, U64};
use serde::{Deserialize, Serialize};

/// JSON-safe view of a transaction receipt: every integer is a decimal string.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReceiptSummary {
    pub transaction_hash: H256,
    pub status: ReceiptStatus,
    #[serde(default)]
    pub block_hash: Option<H256>,
    #[serde(default)]
    pub block_number: Option<String>,
    pub from: Address,
    #[serde(default)]
    pub to: Option<Address>,
    #[serde(default)]
    pub gas_used: Option<String>,
    pub cumulative_gas_used: String,
    #[serde(default)]
    pub effective_gas_price: Option<String>,
    #[serde(default)]
    pub logs: Vec<LogSummary>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReceiptStatus {
    Success,
    Reverted,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LogSummary {
    pub address: Address,
    pub topics: Vec<H256>,
    pub data: Bytes,
    #[serde(default)]
    pub log_index: Option<String>,
    #[serde(default)]
    pub transaction_index: Option<String>,
    #[serde(default)]
    pub block_number: Option<String>,
}

fn u64_string(value: Option<U64>) -> Option<String> {
    value.map(|v| v.to_string())
}

fn u256_string(value: Option<U256>) -> Option<String> {
    value.map(|v| v.to_string())
}

impl From<&Log> for LogSummary {
    fn from(log: &Log) -> Self {
        LogSummary {
            address: log.address,
            topics: log.topics.clone(),
            data: log.data.clone(),
            log_index: u256_string(log.log_index),
            transaction_index: u64_string(log.transaction_index),
            block_number: u64_string(log.block_number),
        }
    }
}

impl From<&TransactionReceipt> for ReceiptSummary {
    fn from(receipt: &TransactionReceipt) -> Self {
        let status = match receipt.status {
            Some(status) if status.is_zero() => ReceiptStatus::Reverted,
            _ => ReceiptStatus::Success,
        };
        ReceiptSummary {
            transaction_hash: receipt.transaction_hash,
            status,
            block_hash: receipt.block_hash,
            block_number: u64_string(receipt.block_number),
            from: receipt.from,
            to: receipt.to,
            gas_used: u256_string(receipt.gas_used),
            cumulative_gas_used: receipt.cumulative_gas_used.to_string(),
            effective_gas_price: u256_string(receipt.effective_gas_price),
            logs: receipt.logs.iter().map(LogSummary::from).collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn integers_become_decimal_strings() {
        let receipt = TransactionReceipt {
            transaction_hash: H256::repeat_byte(0x01),
            block_number: Some(U64::from(1_234_567u64)),
            gas_used: Some(U256::from(84_211u64)),
            cumulative_gas_used: U256::from(90_000u64),
            effective_gas_price: Some(U256::exp10(9)),
            status: Some(U64::one()),
            logs: vec![Log {
                address: Address::repeat_byte(0xbb),
                topics: vec![H256::repeat_byte(0x02)],
                data: Bytes::from(vec![0x2a]),
                log_index: Some(U256::from(3)),
                ..Default::default()
            }],
            ..Default::default()
        };

        let summary = ReceiptSummary::from(&receipt);
        let json = serde_json::to_value(&summary).unwrap();

        assert_eq!(json["status"], "success");
        assert_eq!(json["blockNumber"], "1234567");
        assert_eq!(json["gasUsed"], "84211");
        assert_eq!(json["cumulativeGasUsed"], "90000");
        assert_eq!(json["effectiveGasPrice"], "1000000000");
        assert_eq!(json["logs"][0]["logIndex"], "3");
        assert_eq!(json["logs"][0]["data"], "0x2a");
        assert_eq!(serde_json::from_value::<ReceiptSummary>(json).unwrap(), summary);
    }

    #[test]
    fn zero_status_is_reverted() {
        let receipt = TransactionReceipt {
            status: Some(U64::zero()),
            ..Default::default()
        };
        assert_eq!(ReceiptSummary::from(&receipt).status, ReceiptStatus::Reverted);
    }
}
