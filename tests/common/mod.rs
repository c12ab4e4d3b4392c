//! Shared utilities for integration and load testing.

#![allow(dead_code)]

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use boondock::config::GatewayConfig;
use boondock::discovery::{ServiceAddress, StaticBackend};
use boondock::lifecycle::{Gateway, Shutdown};
use boondock::routing::{Reloader, SharedRouteTable};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;

/// Start a mock upstream that answers `"<name> <host> <request-target>"`.
pub async fn start_echo_backend(name: &'static str) -> SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    tokio::spawn(async move {
        loop {
            match listener.accept().await {
                Ok((mut socket, _)) => {
                    tokio::spawn(async move {
                        let mut head = Vec::new();
                        let mut chunk = [0u8; 1024];
                        while !head.windows(4).any(|w| w == b"\r\n\r\n") {
                            match socket.read(&mut chunk).await {
                                Ok(0) | Err(_) => return,
                                Ok(n) => head.extend_from_slice(&chunk[..n]),
                            }
                        }

                        let head = String::from_utf8_lossy(&head);
                        let mut lines = head.lines();
                        let target = lines
                            .next()
                            .and_then(|line| line.split_whitespace().nth(1))
                            .unwrap_or("")
                            .to_string();
                        let host = lines
                            .find_map(|line| {
                                let (name, value) = line.split_once(':')?;
                                name.trim()
                                    .eq_ignore_ascii_case("host")
                                    .then(|| value.trim().to_string())
                            })
                            .unwrap_or_default();

                        let body = format!("{} {} {}", name, host, target);
                        let response = format!(
                            "HTTP/1.1 200 OK\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
                            body.len(),
                            body
                        );
                        let _ = socket.write_all(response.as_bytes()).await;
                        let _ = socket.shutdown().await;
                    });
                }
                Err(_) => break,
            }
        }
    });

    addr
}

/// An address nothing listens on.
pub async fn closed_port() -> SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    listener.local_addr().unwrap()
}

pub fn service(addr: SocketAddr) -> ServiceAddress {
    ServiceAddress::new(addr.ip().to_string(), addr.port())
}

/// Config suited to tests: no background refresh, no admin, no metrics.
pub fn test_config() -> GatewayConfig {
    let mut config = GatewayConfig::default();
    config.routing.refresh_interval_secs = 0;
    config
}

/// A gateway running on an ephemeral port.
pub struct TestGateway {
    pub addr: SocketAddr,
    pub table: Arc<SharedRouteTable>,
    pub reloader: Arc<Reloader>,
    pub shutdown: Shutdown,
}

impl TestGateway {
    pub async fn start(config: GatewayConfig, backend: Arc<StaticBackend>) -> Self {
        Self::start_gateway(Gateway::with_backend(config, backend)).await
    }

    pub async fn start_gateway(gateway: Gateway) -> Self {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let table = gateway.table().clone();
        let reloader = gateway.reloader().clone();
        let shutdown = Shutdown::new();

        let runner = shutdown.clone();
        tokio::spawn(async move {
            let _ = gateway.run(listener, &runner).await;
        });

        // The initial build happens before the first request is accepted.
        tokio::time::timeout(Duration::from_secs(5), async {
            while table.version() == 0 {
                tokio::time::sleep(Duration::from_millis(10)).await;
            }
        })
        .await
        .expect("initial route build did not publish");

        Self {
            addr,
            table,
            reloader,
            shutdown,
        }
    }

    pub fn url(&self, path: &str) -> String {
        format!("http://{}{}", self.addr, path)
    }

    /// GET `path` with `host` as the Host header; returns status and body.
    pub async fn get(&self, client: &reqwest::Client, host: &str, path: &str) -> (u16, String) {
        let res = client
            .get(self.url(path))
            .header("host", host)
            .send()
            .await
            .expect("gateway unreachable");
        let status = res.status().as_u16();
        (status, res.text().await.unwrap())
    }
}

impl Drop for TestGateway {
    fn drop(&mut self) {
        self.shutdown.trigger();
    }
}

pub fn client() -> reqwest::Client {
    reqwest::Client::builder()
        .pool_max_idle_per_host(0)
        .no_proxy()
        .build()
        .unwrap()
}
