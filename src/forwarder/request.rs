use ethers::types::transaction::eip712::Eip712;
use ethers::types::{Address, Bytes, Signature, H256, U256};
use serde::{Deserialize, Serialize};

use crate::consts::MAX_DEADLINE;
use crate::forwarder::{ForwarderDomain, TypedForwardRequest};
use crate::helpers::{parse_decimal_u256, parse_decimal_u64};
use crate::prelude::*;

/// The message a sender signs: everything the forwarder checks, nonce included.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ForwardRequest {
    pub from: Address,
    pub to: Address,
    pub value: U256,
    pub gas: U256,
    pub nonce: U256,
    /// UNIX seconds, `uint48` on-chain.
    pub deadline: u64,
    pub data: Bytes,
}

impl ForwardRequest {
    pub fn digest(&self, domain: &ForwarderDomain) -> H256 {
        match TypedForwardRequest::new(self, domain).encode_eip712() {
            Ok(digest) => H256::from(digest),
            Err(never) => match never {},
        }
    }

    /// Address that produced `signature` over this request, if any.
    pub fn recover_signer(&self, domain: &ForwarderDomain, signature: &Signature) -> Option<Address> {
        signature.recover(self.digest(domain)).ok()
    }
}

/// A request together with its signature. Fields are read-only so a signed
/// request cannot be altered after the fact.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignedForwardRequest {
    request: ForwardRequest,
    signature: Signature,
}

impl SignedForwardRequest {
    pub(crate) fn new(request: ForwardRequest, signature: Signature) -> Self {
        SignedForwardRequest { request, signature }
    }

    pub fn request(&self) -> &ForwardRequest {
        &self.request
    }

    pub fn signature(&self) -> &Signature {
        &self.signature
    }

    pub fn to_request_data(&self) -> ForwardRequestData {
        ForwardRequestData {
            from: self.request.from,
            to: self.request.to,
            value: self.request.value,
            gas: self.request.gas,
            deadline: self.request.deadline,
            data: self.request.data.clone(),
            signature: Bytes::from(self.signature.to_vec()),
        }
    }

    pub fn to_serialized(&self) -> SerializedForwardRequest {
        let request = &self.request;
        SerializedForwardRequest {
            from: request.from,
            to: request.to,
            value: request.value.to_string(),
            gas: request.gas.to_string(),
            deadline: request.deadline.to_string(),
            nonce: Some(request.nonce.to_string()),
            data: Some(request.data.clone()),
            signature: Some(Bytes::from(self.signature.to_vec())),
        }
    }
}

/// The tuple `execute` takes. The forwarder supplies the nonce itself.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ForwardRequestData {
    pub from: Address,
    pub to: Address,
    pub value: U256,
    pub gas: U256,
    pub deadline: u64,
    pub data: Bytes,
    pub signature: Bytes,
}

impl ForwardRequestData {
    /// Rebuilds the signed message under a given nonce.
    pub fn with_nonce(&self, nonce: U256) -> ForwardRequest {
        ForwardRequest {
            from: self.from,
            to: self.to,
            value: self.value,
            gas: self.gas,
            nonce,
            deadline: self.deadline,
            data: self.data.clone(),
        }
    }

    pub fn parsed_signature(&self) -> Option<Signature> {
        Signature::try_from(self.signature.as_ref()).ok()
    }
}

/// Wire form of a signed request: integers as decimal strings so they survive
/// JSON number precision, byte fields as `0x` hex.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SerializedForwardRequest {
    pub from: Address,
    pub to: Address,
    pub value: String,
    pub gas: String,
    pub deadline: String,
    /// Nonce the client signed with. Diagnostic only.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub nonce: Option<String>,
    #[serde(default)]
    pub data: Option<Bytes>,
    #[serde(default)]
    pub signature: Option<Bytes>,
}

impl SerializedForwardRequest {
    /// Structural validation followed by decimal parsing.
    pub fn into_request_data(self) -> Result<(ForwardRequestData, Option<U256>)> {
        let data = self
            .data
            .filter(|data| !data.is_empty())
            .ok_or_else(|| Error::MissingFields("request must include non-empty data".to_string()))?;
        let signature = self.signature.filter(|sig| !sig.is_empty()).ok_or_else(|| {
            Error::MissingFields("request must include a non-empty signature".to_string())
        })?;

        let deadline = parse_decimal_u64("deadline", &self.deadline)?;
        if deadline > MAX_DEADLINE {
            return Err(Error::Validation(format!(
                "deadline {deadline} does not fit in uint48"
            )));
        }
        let claimed_nonce = self
            .nonce
            .as_deref()
            .map(|nonce| parse_decimal_u256("nonce", nonce))
            .transpose()?;

        Ok((
            ForwardRequestData {
                from: self.from,
                to: self.to,
                value: parse_decimal_u256("value", &self.value)?,
                gas: parse_decimal_u256("gas", &self.gas)?,
                deadline,
                data,
                signature,
            },
            claimed_nonce,
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn wire() -> serde_json::Value {
        json!({
            "from": "0xaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaa1",
            "to": "0xbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbb2",
            "value": "0",
            "gas": "3000000",
            "deadline": "1900000000",
            "data": "0xdeadbeef",
            "signature": format!("0x{}", "11".repeat(65)),
        })
    }

    #[test]
    fn parses_decimal_strings() {
        let serialized: SerializedForwardRequest = serde_json::from_value(wire()).unwrap();
        let (data, nonce) = serialized.into_request_data().unwrap();
        assert_eq!(data.gas, U256::from(3_000_000u64));
        assert_eq!(data.value, U256::zero());
        assert_eq!(data.deadline, 1_900_000_000);
        assert_eq!(data.signature.len(), 65);
        assert_eq!(nonce, None);
    }

    #[test]
    fn missing_or_empty_data_is_rejected() {
        let mut body = wire();
        body.as_object_mut().unwrap().remove("data");
        let serialized: SerializedForwardRequest = serde_json::from_value(body).unwrap();
        assert!(matches!(
            serialized.into_request_data(),
            Err(Error::MissingFields(msg)) if msg.contains("data")
        ));

        let mut body = wire();
        body["signature"] = json!("0x");
        let serialized: SerializedForwardRequest = serde_json::from_value(body).unwrap();
        assert!(matches!(
            serialized.into_request_data(),
            Err(Error::MissingFields(msg)) if msg.contains("signature")
        ));
    }

    #[test]
    fn deadline_must_fit_uint48() {
        let mut body = wire();
        body["deadline"] = json!("281474976710656");
        let serialized: SerializedForwardRequest = serde_json::from_value(body).unwrap();
        assert!(matches!(
            serialized.into_request_data(),
            Err(Error::Validation(msg)) if msg.contains("uint48")
        ));
    }

    #[test]
    fn serialized_form_uses_decimal_strings() {
        let request = ForwardRequest {
            from: Address::repeat_byte(0xaa),
            to: Address::repeat_byte(0xbb),
            value: U256::exp10(20),
            gas: U256::from(3_000_000u64),
            nonce: U256::from(4),
            deadline: 1_900_000_000,
            data: Bytes::from(vec![1, 2, 3]),
        };
        let signature = Signature {
            r: U256::one(),
            s: U256::from(2),
            v: 27,
        };
        let signed = SignedForwardRequest::new(request, signature);
        let value = serde_json::to_value(signed.to_serialized()).unwrap();

        assert_eq!(value["value"], "100000000000000000000");
        assert_eq!(value["gas"], "3000000");
        assert_eq!(value["deadline"], "1900000000");
        assert_eq!(value["nonce"], "4");
        assert_eq!(value["data"], "0x010203");

        let (data, nonce) = serde_json::from_value::<SerializedForwardRequest>(value)
            .unwrap()
            .into_request_data()
            .unwrap();
        assert_eq!(data, signed.to_request_data());
        assert_eq!(nonce, Some(U256::from(4)));
        assert_eq!(data.parsed_signature(), Some(signature));
    }
}
