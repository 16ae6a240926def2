use log::debug;
use reqwest::{Client, Response};

use crate::prelude::*;
use crate::relayer::api::RelayErrorBody;

#[derive(Debug, Clone)]
pub struct HttpClient {
    pub client: Client,
    pub base_url: String,
}

async fn parse_response(response: Response) -> Result<String> {
    let status_code = response.status().as_u16();
    let text = response
        .text()
        .await
        .map_err(|e| Error::Network(e.to_string()))?;

    if status_code < 400 {
        return Ok(text);
    }

    let body = match serde_json::from_str::<RelayErrorBody>(&text) {
        Ok(body) => body,
        Err(_) => RelayErrorBody::new(format!("HTTP {status_code}"), text),
    };
    Err(Error::RelayRejected {
        status_code,
        body: Box::new(body),
    })
}

fn transport_error(e: reqwest::Error) -> Error {
    if e.is_builder() {
        Error::GenericRequest(e.to_string())
    } else {
        Error::Network(e.to_string())
    }
}

impl HttpClient {
    pub async fn post(&self, url_path: &str, data: String) -> Result<String> {
        let full_url = format!("{}{url_path}", self.base_url);
        debug!("POST {full_url}");
        let request = self
            .client
            .post(full_url)
            .header("Content-Type", "application/json")
            .body(data)
            .build()
            .map_err(|e| Error::GenericRequest(e.to_string()))?;
        let result = self
            .client
            .execute(request)
            .await
            .map_err(transport_error)?;
        parse_response(result).await
    }

    pub async fn get(&self, url_path: &str) -> Result<String> {
        let full_url = format!("{}{url_path}", self.base_url);
        debug!("GET {full_url}");
        let result = self
            .client
            .get(full_url)
            .send()
            .await
            .map_err(transport_error)?;
        parse_response(result).await
    }
}
