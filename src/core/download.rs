use crate::utils::error::{BrokerError, Result};
use crate::utils::validation::validate_url;
use reqwest::Client;
use std::time::Duration;
use tempfile::NamedTempFile;

/// 下載合約原始碼到唯一命名的暫存檔
///
/// The returned file is deleted when dropped, so the caller owns its lifetime
/// for exactly as long as it keeps the handle.
pub async fn download_contract(
    client: &Client,
    url: &str,
    timeout: Duration,
) -> Result<NamedTempFile> {
    let failed = |reason: String| BrokerError::ContractDownloadFailed {
        url: url.to_string(),
        reason,
    };

    validate_url("contract_url", url).map_err(|e| failed(e.to_string()))?;

    let file = tempfile::Builder::new()
        .prefix("contract-")
        .suffix(".sol")
        .tempfile()?;

    tracing::debug!(url, path = %file.path().display(), "Downloading contract");
    let response = client
        .get(url)
        .timeout(timeout)
        .send()
        .await
        .map_err(|e| failed(e.to_string()))?;

    let status = response.status();
    if !status.is_success() {
        return Err(failed(format!("server responded with {}", status)));
    }

    let body = response.bytes().await.map_err(|e| failed(e.to_string()))?;
    tokio::fs::write(file.path(), &body).await?;

    tracing::debug!(bytes = body.len(), "Contract downloaded");
    Ok(file)
}
