//! Health probes
//!
//! A probe has exactly one handler and optional timing. Durations are
//! converted to whole seconds when the probe is emitted.

use std::time::Duration;

use crate::k8s::{ExecAction, HttpGetAction, HttpHeader, ProbeSpec, TcpSocketAction};

/// Probe handler
#[derive(Clone, Debug, PartialEq)]
pub enum ProbeHandler {
    /// HTTP GET against a container port
    HttpGet {
        /// Request path
        path: String,
        /// Container port
        port: u16,
        /// HTTP or HTTPS
        scheme: Option<String>,
        /// Extra request headers
        headers: Vec<(String, String)>,
    },
    /// Command executed inside the container
    Exec {
        /// Command and arguments
        command: Vec<String>,
    },
    /// TCP connect to a container port
    TcpSocket {
        /// Container port
        port: u16,
    },
}

/// Liveness, readiness or startup probe
#[derive(Clone, Debug, PartialEq)]
pub struct Probe {
    handler: ProbeHandler,
    initial_delay: Option<Duration>,
    period: Option<Duration>,
    timeout: Option<Duration>,
    failure_threshold: Option<i32>,
    success_threshold: Option<i32>,
}

impl Probe {
    fn with_handler(handler: ProbeHandler) -> Self {
        Self {
            handler,
            initial_delay: None,
            period: None,
            timeout: None,
            failure_threshold: None,
            success_threshold: None,
        }
    }

    /// HTTP GET probe
    pub fn http_get(path: impl Into<String>, port: u16) -> Self {
        Self::with_handler(ProbeHandler::HttpGet {
            path: path.into(),
            port,
            scheme: None,
            headers: Vec::new(),
        })
    }

    /// Exec probe
    pub fn exec<I, S>(command: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::with_handler(ProbeHandler::Exec {
            command: command.into_iter().map(Into::into).collect(),
        })
    }

    /// TCP socket probe
    pub fn tcp_socket(port: u16) -> Self {
        Self::with_handler(ProbeHandler::TcpSocket { port })
    }

    /// Scheme for HTTP probes; ignored for other handlers
    pub fn with_scheme(mut self, scheme: impl Into<String>) -> Self {
        if let ProbeHandler::HttpGet { scheme: s, .. } = &mut self.handler {
            *s = Some(scheme.into());
        }
        self
    }

    /// Header for HTTP probes; ignored for other handlers
    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        if let ProbeHandler::HttpGet { headers, .. } = &mut self.handler {
            headers.push((name.into(), value.into()));
        }
        self
    }

    /// Delay before the first probe
    pub fn with_initial_delay(mut self, delay: Duration) -> Self {
        self.initial_delay = Some(delay);
        self
    }

    /// Interval between probes
    pub fn with_period(mut self, period: Duration) -> Self {
        self.period = Some(period);
        self
    }

    /// Per-attempt timeout
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Consecutive failures before the probe is considered failed
    pub fn with_failure_threshold(mut self, threshold: i32) -> Self {
        self.failure_threshold = Some(threshold);
        self
    }

    /// Consecutive successes before the probe is considered passing
    pub fn with_success_threshold(mut self, threshold: i32) -> Self {
        self.success_threshold = Some(threshold);
        self
    }

    /// Probe handler
    pub fn handler(&self) -> &ProbeHandler {
        &self.handler
    }

    pub(crate) fn to_spec(&self) -> ProbeSpec {
        let mut spec = ProbeSpec {
            initial_delay_seconds: self.initial_delay.map(whole_seconds),
            period_seconds: self.period.map(whole_seconds),
            timeout_seconds: self.timeout.map(whole_seconds),
            failure_threshold: self.failure_threshold,
            success_threshold: self.success_threshold,
            ..Default::default()
        };

        match &self.handler {
            ProbeHandler::HttpGet {
                path,
                port,
                scheme,
                headers,
            } => {
                spec.http_get = Some(HttpGetAction {
                    path: path.clone(),
                    port: *port,
                    scheme: scheme.clone(),
                    http_headers: (!headers.is_empty()).then(|| {
                        headers
                            .iter()
                            .map(|(name, value)| HttpHeader {
                                name: name.clone(),
                                value: value.clone(),
                            })
                            .collect()
                    }),
                });
            }
            ProbeHandler::Exec { command } => {
                spec.exec = Some(ExecAction {
                    command: command.clone(),
                });
            }
            ProbeHandler::TcpSocket { port } => {
                spec.tcp_socket = Some(TcpSocketAction { port: *port });
            }
        }

        spec
    }
}

/// Whole seconds, saturating at `i32::MAX`
pub(crate) fn whole_seconds(duration: Duration) -> i32 {
    i32::try_from(duration.as_secs()).unwrap_or(i32::MAX)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn http_probe_with_timing() {
        let spec = Probe::http_get("/healthz", 8080)
            .with_scheme("HTTPS")
            .with_header("X-Probe", "1")
            .with_initial_delay(Duration::from_secs(5))
            .with_period(Duration::from_secs(10))
            .with_timeout(Duration::from_millis(1500))
            .with_failure_threshold(3)
            .to_spec();

        let http = spec.http_get.as_ref().unwrap();
        assert_eq!(http.path, "/healthz");
        assert_eq!(http.port, 8080);
        assert_eq!(http.scheme.as_deref(), Some("HTTPS"));
        assert_eq!(http.http_headers.as_ref().unwrap()[0].name, "X-Probe");
        assert_eq!(spec.initial_delay_seconds, Some(5));
        assert_eq!(spec.period_seconds, Some(10));
        assert_eq!(spec.timeout_seconds, Some(1));
        assert_eq!(spec.failure_threshold, Some(3));
        assert!(spec.success_threshold.is_none());
        assert!(spec.exec.is_none());
    }

    #[test]
    fn exec_and_tcp_handlers() {
        let exec = Probe::exec(["cat", "/tmp/ready"]).to_spec();
        assert_eq!(exec.exec.unwrap().command, vec!["cat", "/tmp/ready"]);

        let tcp = Probe::tcp_socket(5432).with_scheme("HTTPS").to_spec();
        assert_eq!(tcp.tcp_socket.unwrap().port, 5432);
        assert!(tcp.http_get.is_none());
    }

    #[test]
    fn http_probe_without_headers_omits_them() {
        let json = serde_json::to_value(Probe::http_get("/", 80).to_spec()).unwrap();
        assert_eq!(json, serde_json::json!({"httpGet": {"path": "/", "port": 80}}));
    }
}
