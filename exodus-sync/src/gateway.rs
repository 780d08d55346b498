//! Gateway transport: JSON over HTTPS to the publish/flush service.
//!
//! [`Gateway`] is the seam the protocol layers are written against;
//! [`HttpGateway`] is the `ureq` implementation. Resource locators handed
//! back by the server (`links.self`, `links.commit`) are resolved against the
//! base URL as-is; they are never rebuilt from ids.

use std::sync::Arc;

use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::Value;
use url::Url;

use exodus_core::{
    error::io_err, EnvName, FlushRecord, ItemRecord, Links, Publish, Settings, Task,
};

use crate::error::SyncError;

/// Operations the protocol needs from the gateway.
pub trait Gateway {
    /// `POST {base}/{env}/publish`
    fn create_publish(&self, env: &EnvName) -> Result<Publish, SyncError>;

    /// `PUT {publish.links.self}` with a one-element item list.
    fn add_item(&self, publish: &Publish, item: &ItemRecord) -> Result<(), SyncError>;

    /// `POST {publish.links.commit}`
    fn commit_publish(&self, publish: &Publish, deadline: Option<&str>)
        -> Result<Task, SyncError>;

    /// `GET {link}` where `link` is a task's `self` locator.
    fn get_task(&self, link: &str) -> Result<Task, SyncError>;

    /// `POST {base}/{env}/cdn-flush`
    fn flush_cache(&self, env: &EnvName, paths: &[FlushRecord]) -> Result<Task, SyncError>;

    /// `GET {base}/whoami`
    fn whoami(&self) -> Result<Value, SyncError>;
}

impl<G: Gateway + ?Sized> Gateway for &G {
    fn create_publish(&self, env: &EnvName) -> Result<Publish, SyncError> {
        (**self).create_publish(env)
    }

    fn add_item(&self, publish: &Publish, item: &ItemRecord) -> Result<(), SyncError> {
        (**self).add_item(publish, item)
    }

    fn commit_publish(
        &self,
        publish: &Publish,
        deadline: Option<&str>,
    ) -> Result<Task, SyncError> {
        (**self).commit_publish(publish, deadline)
    }

    fn get_task(&self, link: &str) -> Result<Task, SyncError> {
        (**self).get_task(link)
    }

    fn flush_cache(&self, env: &EnvName, paths: &[FlushRecord]) -> Result<Task, SyncError> {
        (**self).flush_cache(env, paths)
    }

    fn whoami(&self) -> Result<Value, SyncError> {
        (**self).whoami()
    }
}

/// Look up a link relation, failing with [`SyncError::MissingLink`].
pub fn require_link<'a>(
    links: &'a Links,
    object: &'static str,
    id: &str,
    rel: &'static str,
) -> Result<&'a str, SyncError> {
    links.get(rel).ok_or_else(|| SyncError::MissingLink {
        object,
        id: id.to_string(),
        rel,
    })
}

// ---------------------------------------------------------------------------
// HTTP implementation
// ---------------------------------------------------------------------------

/// `ureq`-backed gateway and blob store client.
#[derive(Clone)]
pub struct HttpGateway {
    pub(crate) agent: ureq::Agent,
    base: Url,
    gw_url: String,
    pub(crate) upload_url: String,
}

impl std::fmt::Debug for HttpGateway {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HttpGateway")
            .field("gw_url", &self.gw_url)
            .field("upload_url", &self.upload_url)
            .finish()
    }
}

impl HttpGateway {
    /// Build a client from resolved settings, loading TLS material eagerly so
    /// bad credentials fail before any request is made.
    pub fn new(settings: &Settings) -> Result<Self, SyncError> {
        let base = Url::parse(&format!("{}/", settings.gw_url)).map_err(|source| {
            SyncError::InvalidLink {
                link: settings.gw_url.clone(),
                source,
            }
        })?;
        let agent = ureq::AgentBuilder::new()
            .timeout(settings.timeout)
            .user_agent(concat!("exodus/", env!("CARGO_PKG_VERSION")))
            .tls_connector(Arc::new(tls_connector(settings)?))
            .build();
        Ok(Self {
            agent,
            base,
            gw_url: settings.gw_url.clone(),
            upload_url: settings.upload_url.clone(),
        })
    }

    /// Resolve a server-provided locator against the gateway base.
    pub fn resolve(&self, link: &str) -> Result<String, SyncError> {
        self.base
            .join(link)
            .map(String::from)
            .map_err(|source| SyncError::InvalidLink {
                link: link.to_string(),
                source,
            })
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}/{}", self.gw_url, path.trim_start_matches('/'))
    }

    fn post_json<T: DeserializeOwned>(
        &self,
        url: &str,
        body: Option<Value>,
    ) -> Result<T, SyncError> {
        let request = self.agent.post(url);
        let response = match body {
            Some(body) => request.send_json(body),
            None => request.call(),
        };
        decode(url, response.map_err(|e| map_error(url, e))?)
    }
}

impl Gateway for HttpGateway {
    fn create_publish(&self, env: &EnvName) -> Result<Publish, SyncError> {
        let url = self.endpoint(&format!("{env}/publish"));
        tracing::debug!(%url, "POST");
        self.post_json(&url, None)
    }

    fn add_item(&self, publish: &Publish, item: &ItemRecord) -> Result<(), SyncError> {
        let link = require_link(&publish.links, "publish", &publish.id.0, "self")?;
        let url = self.resolve(link)?;
        tracing::debug!(%url, web_uri = %item.web_uri, "PUT");
        let body = serde_json::to_value([item])?;
        self.agent
            .put(&url)
            .send_json(body)
            .map_err(|e| map_error(&url, e))?;
        Ok(())
    }

    fn commit_publish(
        &self,
        publish: &Publish,
        deadline: Option<&str>,
    ) -> Result<Task, SyncError> {
        let link = require_link(&publish.links, "publish", &publish.id.0, "commit")?;
        let url = self.resolve(link)?;
        tracing::debug!(%url, "POST");
        let mut request = self.agent.post(&url);
        if let Some(deadline) = deadline {
            request = request.query("deadline", deadline);
        }
        decode(&url, request.call().map_err(|e| map_error(&url, e))?)
    }

    fn get_task(&self, link: &str) -> Result<Task, SyncError> {
        let url = self.resolve(link)?;
        tracing::debug!(%url, "GET");
        decode(&url, self.agent.get(&url).call().map_err(|e| map_error(&url, e))?)
    }

    fn flush_cache(&self, env: &EnvName, paths: &[FlushRecord]) -> Result<Task, SyncError> {
        let url = self.endpoint(&format!("{env}/cdn-flush"));
        tracing::debug!(%url, paths = paths.len(), "POST");
        self.post_json(&url, Some(serde_json::to_value(paths)?))
    }

    fn whoami(&self) -> Result<Value, SyncError> {
        let url = self.endpoint("whoami");
        decode(&url, self.agent.get(&url).call().map_err(|e| map_error(&url, e))?)
    }
}

// ---------------------------------------------------------------------------
// Response handling
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
struct ErrorBody {
    detail: Value,
}

/// Extract the gateway's `{"detail": ...}` message from an error body.
pub(crate) fn error_detail(body: &str) -> Option<String> {
    let parsed: ErrorBody = serde_json::from_str(body).ok()?;
    Some(match parsed.detail {
        Value::String(s) => s,
        other => other.to_string(),
    })
}

pub(crate) fn map_error(url: &str, err: ureq::Error) -> SyncError {
    match err {
        ureq::Error::Status(status, response) => {
            let detail = response.into_string().ok().and_then(|b| error_detail(&b));
            if let Some(detail) = &detail {
                tracing::error!(%url, status, %detail, "gateway error");
            }
            SyncError::Status {
                url: url.to_string(),
                status,
                detail,
            }
        }
        ureq::Error::Transport(transport) => SyncError::Transport {
            url: url.to_string(),
            message: transport.to_string(),
        },
    }
}

fn decode<T: DeserializeOwned>(url: &str, response: ureq::Response) -> Result<T, SyncError> {
    response.into_json().map_err(|source| SyncError::Decode {
        url: url.to_string(),
        source,
    })
}

fn tls_connector(settings: &Settings) -> Result<native_tls::TlsConnector, SyncError> {
    let mut builder = native_tls::TlsConnector::builder();
    if let (Some(cert), Some(key)) = (&settings.cert, &settings.key) {
        let cert_pem = std::fs::read(cert).map_err(|e| io_err(cert, e))?;
        let key_pem = std::fs::read(key).map_err(|e| io_err(key, e))?;
        let identity = native_tls::Identity::from_pkcs8(&cert_pem, &key_pem)
            .map_err(|e| SyncError::Tls(format!("{}: {e}", cert.display())))?;
        builder.identity(identity);
    }
    if let Some(ca) = &settings.ca_bundle {
        let pem = std::fs::read(ca).map_err(|e| io_err(ca, e))?;
        let root = native_tls::Certificate::from_pem(&pem)
            .map_err(|e| SyncError::Tls(format!("{}: {e}", ca.display())))?;
        builder.add_root_certificate(root);
    }
    builder.build().map_err(|e| SyncError::Tls(e.to_string()))
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;

    fn settings(gw_url: &str) -> Settings {
        Settings {
            env: EnvName::from("live"),
            gw_url: gw_url.to_string(),
            upload_url: format!("{gw_url}/upload"),
            cert: None,
            key: None,
            ca_bundle: None,
            poll_interval: Duration::ZERO,
            fetch_retries: 0,
            timeout: Duration::from_secs(5),
        }
    }

    #[test]
    fn rooted_links_resolve_against_origin() {
        let gw = HttpGateway::new(&settings("https://gw.example.com")).unwrap();
        assert_eq!(
            gw.resolve("/live/publish/abc").unwrap(),
            "https://gw.example.com/live/publish/abc"
        );
    }

    #[test]
    fn absolute_links_are_kept_verbatim() {
        let gw = HttpGateway::new(&settings("https://gw.example.com")).unwrap();
        assert_eq!(
            gw.resolve("https://other.example.com/task/1").unwrap(),
            "https://other.example.com/task/1"
        );
    }

    #[test]
    fn endpoints_keep_base_path_prefix() {
        let gw = HttpGateway::new(&settings("https://example.com/gw")).unwrap();
        assert_eq!(gw.endpoint("live/publish"), "https://example.com/gw/live/publish");
    }

    #[test]
    fn detail_extraction() {
        assert_eq!(
            error_detail(r#"{"detail":"No publish found"}"#).as_deref(),
            Some("No publish found")
        );
        assert_eq!(
            error_detail(r#"{"detail":[{"loc":["body"],"msg":"bad"}]}"#).as_deref(),
            Some(r#"[{"loc":["body"],"msg":"bad"}]"#)
        );
        assert!(error_detail("<html>502</html>").is_none());
    }

    #[test]
    fn missing_link_is_reported() {
        let publish = Publish {
            id: "p1".into(),
            links: Links::default(),
            env: None,
            state: None,
        };
        let err = require_link(&publish.links, "publish", "p1", "commit").unwrap_err();
        assert!(err.to_string().contains("'commit'"));
    }
}
