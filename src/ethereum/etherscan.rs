use anyhow::{anyhow, Context, Result};
use reqwest::Client;
use serde::Deserialize;
use serde_json::Value;
use std::time::Duration;

use super::VerifiedSource;

/// Etherscan-compatible explorer client for verified source and bytecode
pub struct EtherscanClient {
    api_url: String,
    api_key: Option<String>,
    client: Client,
}

#[derive(Debug, Deserialize)]
struct EtherscanResponse {
    #[serde(default)]
    status: Option<String>,
    #[serde(default)]
    message: Option<String>,
    result: Value,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct SourceEntry {
    #[serde(default)]
    source_code: String,
    #[serde(default)]
    contract_name: String,
    #[serde(default)]
    compiler_version: String,
}

impl EtherscanClient {
    /// Create a new explorer client
    pub fn new(api_url: &str, api_key: Option<String>, timeout: Duration) -> Result<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .context("Failed to create HTTP client")?;

        Ok(Self {
            api_url: api_url.to_string(),
            api_key,
            client,
        })
    }

    async fn query(&self, params: &[(&str, &str)]) -> Result<String> {
        let mut request = self.client.get(&self.api_url).query(params);
        if let Some(key) = &self.api_key {
            request = request.query(&[("apikey", key.as_str())]);
        }

        let response = request.send().await?;
        if !response.status().is_success() {
            return Err(anyhow!("Explorer API request failed: {}", response.status()));
        }
        Ok(response.text().await?)
    }

    /// Fetch verified source. `None` when the contract is not verified.
    pub async fn get_source_code(&self, address: &str) -> Result<Option<VerifiedSource>> {
        let text = self
            .query(&[("module", "contract"), ("action", "getsourcecode"), ("address", address)])
            .await?;
        parse_source_response(&text)
    }

    /// Fetch deployed bytecode as `0x`-prefixed hex
    pub async fn get_contract_bytecode(&self, address: &str) -> Result<String> {
        let text = self
            .query(&[("module", "proxy"), ("action", "eth_getCode"), ("address", address), ("tag", "latest")])
            .await?;
        parse_bytecode_response(&text)
    }
}

fn parse_source_response(text: &str) -> Result<Option<VerifiedSource>> {
    let response: EtherscanResponse =
        serde_json::from_str(text).with_context(|| format!("Failed to parse explorer response: {}", text))?;

    let entries = match response.result {
        Value::Array(entries) => entries,
        // Errors come back as a string result with status 0
        Value::String(message) => {
            return Err(anyhow!(
                "Explorer API error: {} ({})",
                message,
                response.message.unwrap_or_default()
            ))
        }
        other => return Err(anyhow!("Unexpected explorer result: {}", other)),
    };

    let Some(first) = entries.into_iter().next() else {
        return Ok(None);
    };
    let entry: SourceEntry = serde_json::from_value(first)?;
    if entry.source_code.trim().is_empty() {
        return Ok(None);
    }

    Ok(Some(VerifiedSource {
        code: entry.source_code,
        compiler_version: entry.compiler_version,
        contract_name: entry.contract_name,
    }))
}

fn parse_bytecode_response(text: &str) -> Result<String> {
    let response: EtherscanResponse =
        serde_json::from_str(text).with_context(|| format!("Failed to parse explorer response: {}", text))?;

    match response.result {
        Value::String(code) if code.starts_with("0x") => {
            hex::decode(code.trim_start_matches("0x")).context("Explorer returned malformed bytecode")?;
            Ok(code)
        }
        Value::String(message) => Err(anyhow!(
            "Explorer API error: {} (status {})",
            message,
            response.status.unwrap_or_default()
        )),
        other => Err(anyhow!("Unexpected explorer result: {}", other)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_verified_source() {
        let text = r#"{"status":"1","message":"OK","result":[{"SourceCode":"contract A {}","ABI":"[]","ContractName":"A","CompilerVersion":"v0.8.20+commit.a1b79de6"}]}"#;
        let source = parse_source_response(text).unwrap().unwrap();
        assert_eq!(source.code, "contract A {}");
        assert_eq!(source.contract_name, "A");
        assert_eq!(source.compiler_version, "v0.8.20+commit.a1b79de6");
    }

    #[test]
    fn test_parse_unverified_source() {
        let text = r#"{"status":"1","message":"OK","result":[{"SourceCode":"","ABI":"Contract source code not verified","ContractName":"","CompilerVersion":""}]}"#;
        assert!(parse_source_response(text).unwrap().is_none());
    }

    #[test]
    fn test_parse_source_error() {
        let text = r#"{"status":"0","message":"NOTOK","result":"Invalid API Key"}"#;
        let err = parse_source_response(text).unwrap_err();
        assert!(err.to_string().contains("Invalid API Key"));
    }

    #[test]
    fn test_parse_bytecode() {
        let text = r#"{"jsonrpc":"2.0","id":1,"result":"0x6080604052"}"#;
        assert_eq!(parse_bytecode_response(text).unwrap(), "0x6080604052");

        let empty = r#"{"jsonrpc":"2.0","id":1,"result":"0x"}"#;
        assert_eq!(parse_bytecode_response(empty).unwrap(), "0x");

        let error = r#"{"status":"0","message":"NOTOK","result":"Max rate limit reached"}"#;
        assert!(parse_bytecode_response(error).is_err());
    }
}
