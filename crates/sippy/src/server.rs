use callgate_config::Config;

use crate::{
    cdr::{self, CDR_METHOD, CdrPage, CdrQuery},
    client::SippyClient,
    error::{Result, RpcError},
    value::Value,
};

/// Sippy gateway state shared by the route handlers
///
/// A missing or invalid configuration does not stop the gateway from
/// starting; every call fails with `MISCONFIG` instead.
pub struct Server {
    client: std::result::Result<SippyClient, String>,
    test_method: String,
}

impl Server {
    pub fn client(&self) -> Result<&SippyClient> {
        self.client
            .as_ref()
            .map_err(|message| RpcError::Misconfig(message.clone()))
    }

    /// Method used by the connection test and health check
    pub fn test_method(&self) -> &str {
        &self.test_method
    }

    /// Call an arbitrary method with JSON parameters
    pub async fn call(&self, method: &str, params: &[serde_json::Value]) -> Result<Value> {
        let client = self.client()?;
        let params: Vec<Value> = params.iter().map(Value::from_json_param).collect();

        client.call(method, &params).await
    }

    /// Fetch account CDRs and return the requested page
    pub async fn fetch_cdrs(&self, query: &CdrQuery) -> Result<CdrPage> {
        let client = self.client()?;
        let result = client.call(CDR_METHOD, &[query.to_param()]).await?;

        let now = jiff::Timestamp::now().to_string();
        let page = cdr::paginate(cdr::extract_cdrs(&result), query, &now);

        tracing::debug!(total = page.total, returned = page.records.len(), "fetched sippy call records");

        Ok(page)
    }
}

/// Builder for the Sippy server from configuration
pub struct SippyServerBuilder<'a> {
    config: &'a Config,
}

impl<'a> SippyServerBuilder<'a> {
    pub const fn new(config: &'a Config) -> Self {
        Self { config }
    }

    pub fn build(self) -> Server {
        let config = &self.config.sippy;

        let client = SippyClient::from_config(config).map_err(|error| {
            tracing::warn!(%error, "sippy routes disabled until configured");
            error.to_string()
        });

        Server {
            client,
            test_method: config.test_method.clone(),
        }
    }
}
