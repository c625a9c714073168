use crate::config::RemoteSettings;
use serde_json::Value;
use std::fmt;
use std::time::Duration;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Method {
    Head,
    Get,
    Post,
    Put,
    Patch,
    Delete,
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Method::Head => "HEAD",
            Method::Get => "GET",
            Method::Post => "POST",
            Method::Put => "PUT",
            Method::Patch => "PATCH",
            Method::Delete => "DELETE",
        })
    }
}

/// Any of these means "server unavailable" to the data client.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum RemoteError {
    #[error("{method} {path}: server unreachable: {reason}")]
    Unreachable {
        method: Method,
        path: String,
        reason: String,
    },

    #[error("{method} {path} failed with status {status}")]
    Status {
        method: Method,
        path: String,
        status: u16,
    },

    #[error("{method} {path}: invalid response body: {reason}")]
    InvalidBody {
        method: Method,
        path: String,
        reason: String,
    },
}

/// Transport to the mock REST backend. `body` is sent as JSON when present.
/// Bodiless responses (HEAD, DELETE, empty 2xx) come back as `Value::Null`.
pub trait Remote {
    fn request(&self, method: Method, path: &str, body: Option<&Value>)
        -> Result<Value, RemoteError>;
}

pub struct HttpRemote {
    base: String,
    client: reqwest::blocking::Client,
}

impl HttpRemote {
    pub fn new(settings: &RemoteSettings) -> anyhow::Result<Self> {
        let client = reqwest::blocking::Client::builder()
            .timeout(Duration::from_millis(settings.timeout_ms))
            .build()
            .map_err(|e| anyhow::anyhow!("failed to create HTTP client: {}", e))?;
        Ok(Self {
            base: settings.api_base.trim_end_matches('/').to_string(),
            client,
        })
    }
}

impl Remote for HttpRemote {
    fn request(
        &self,
        method: Method,
        path: &str,
        body: Option<&Value>,
    ) -> Result<Value, RemoteError> {
        let url = format!("{}{}", self.base, path);
        tracing::debug!("{} {}", method, url);

        let mut builder = match method {
            Method::Head => self.client.head(&url),
            Method::Get => self.client.get(&url),
            Method::Post => self.client.post(&url),
            Method::Put => self.client.put(&url),
            Method::Patch => self.client.patch(&url),
            Method::Delete => self.client.delete(&url),
        };
        if let Some(b) = body {
            builder = builder.json(b);
        }

        let resp = builder.send().map_err(|e| RemoteError::Unreachable {
            method,
            path: path.to_string(),
            reason: e.to_string(),
        })?;

        let status = resp.status();
        if !status.is_success() {
            return Err(RemoteError::Status {
                method,
                path: path.to_string(),
                status: status.as_u16(),
            });
        }
        if matches!(method, Method::Head | Method::Delete) {
            return Ok(Value::Null);
        }

        let text = resp.text().map_err(|e| RemoteError::InvalidBody {
            method,
            path: path.to_string(),
            reason: e.to_string(),
        })?;
        if text.trim().is_empty() {
            return Ok(Value::Null);
        }
        serde_json::from_str(&text).map_err(|e| RemoteError::InvalidBody {
            method,
            path: path.to_string(),
            reason: e.to_string(),
        })
    }
}

/// Remote used when the workspace is configured offline: every call fails
/// without touching the network, so the client always takes the cache path.
pub struct OfflineRemote;

impl Remote for OfflineRemote {
    fn request(
        &self,
        method: Method,
        path: &str,
        _body: Option<&Value>,
    ) -> Result<Value, RemoteError> {
        Err(RemoteError::Unreachable {
            method,
            path: path.to_string(),
            reason: "offline mode".to_string(),
        })
    }
}

pub fn build_remote(settings: &RemoteSettings) -> anyhow::Result<Box<dyn Remote>> {
    if settings.offline {
        return Ok(Box::new(OfflineRemote));
    }
    Ok(Box::new(HttpRemote::new(settings)?))
}



/// Lets tests keep a handle on a fake after handing it to the client.
#[cfg(test)]
impl<T: Remote> Remote for std::rc::Rc<T> {
    fn request(
        &self,
        method: Method,
        path: &str,
        body: Option<&Value>,
    ) -> Result<Value, RemoteError> {
        (**self).request(method, path, body)
    }
}
