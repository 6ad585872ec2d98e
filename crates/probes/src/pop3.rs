//! POP3 handshake probe
//!
//! Connects to the target's POP3 port and checks that the server
//! greets with a `+OK` banner.
//!
//! Invoked via input like:
//!
//! ```text
//! mail.example.com must run pop3
//! mail.example.com must run pop3 with port 1100
//! ```

use std::collections::HashMap;

use async_trait::async_trait;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::net::TcpStream;
use tokio::time::timeout;
use tracing::debug;

use crate::{Check, Probe, ProbeError, ProbeOptions};

const DEFAULT_PORT: u16 = 110;

pub struct Pop3Probe;

#[async_trait]
impl Probe for Pop3Probe {
    fn arguments(&self) -> HashMap<&'static str, &'static str> {
        HashMap::from([("port", "^[0-9]+$")])
    }

    fn example(&self) -> &'static str {
        r#"
POP3 Tester
-----------
The POP3 tester connects to a remote mail host and verifies that the
server presents a valid +OK greeting banner.

This test is invoked via input like so:

   mail.example.com must run pop3

To change the port from the default of 110:

   mail.example.com must run pop3 with port 1100
"#
    }

    async fn run(
        &self,
        check: &Check,
        target: &str,
        options: &ProbeOptions,
    ) -> Result<(), ProbeError> {
        let port = match check.argument("port") {
            Some(value) => value
                .parse::<u16>()
                .map_err(|_| ProbeError::InvalidArgument {
                    name: "port".to_string(),
                    value: value.to_string(),
                })?,
            None => DEFAULT_PORT,
        };

        // IPv6 targets need bracketing in the address
        let address = if target.contains(':') {
            format!("[{}]:{}", target, port)
        } else {
            format!("{}:{}", target, port)
        };
        debug!(address, "pop3 probe connecting");

        let banner = timeout(options.timeout, async {
            let stream = TcpStream::connect(&address).await?;
            let mut reader = BufReader::new(stream);
            let mut banner = String::new();
            reader.read_line(&mut banner).await?;
            Ok::<String, std::io::Error>(banner)
        })
        .await
        .map_err(|_| ProbeError::Timeout(options.timeout))??;

        if !banner.contains("+OK") {
            return Err(ProbeError::Failed(format!(
                "banner doesn't look like a POP3 greeting: {}",
                banner.trim_end()
            )));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::io::AsyncWriteExt;
    use tokio::net::TcpListener;

    async fn serve_banner(banner: &'static str) -> u16 {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();
        tokio::spawn(async move {
            if let Ok((mut socket, _)) = listener.accept().await {
                let _ = socket.write_all(banner.as_bytes()).await;
            }
        });
        port
    }

    fn check_on_port(port: u16) -> Check {
        let mut check = Check::new("127.0.0.1", "pop3");
        check
            .arguments
            .insert("port".to_string(), port.to_string());
        check
    }

    #[tokio::test]
    async fn test_accepts_ok_banner() {
        let port = serve_banner("+OK ready\r\n").await;
        let check = check_on_port(port);
        let outcome = Pop3Probe
            .run(&check, "127.0.0.1", &ProbeOptions::default())
            .await;
        assert!(outcome.is_ok());
    }

    #[tokio::test]
    async fn test_rejects_non_pop3_banner() {
        let port = serve_banner("220 smtp.example.com ESMTP\r\n").await;
        let check = check_on_port(port);
        let outcome = Pop3Probe
            .run(&check, "127.0.0.1", &ProbeOptions::default())
            .await;
        assert!(matches!(outcome, Err(ProbeError::Failed(_))));
    }

    #[tokio::test]
    async fn test_connection_refused() {
        // bind and drop to get a port that refuses connections
        let port = {
            let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
            listener.local_addr().unwrap().port()
        };
        let check = check_on_port(port);
        let outcome = Pop3Probe
            .run(&check, "127.0.0.1", &ProbeOptions::default())
            .await;
        assert!(matches!(outcome, Err(ProbeError::Io(_))));
    }
}
