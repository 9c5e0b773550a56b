use std::time::Duration;

use tokio::net::TcpStream;
use tokio::process::Command;

use devscope_core::probe::ListeningPort;

const DIAL_TIMEOUT: Duration = Duration::from_millis(100);

/// Discovers TCP sockets in a listening state. Primary strategy shells out
/// to `lsof`; when that is unavailable or comes back empty, falls back to
/// bounded-timeout dials against a fixed candidate set.
#[derive(Clone, Debug)]
pub struct PortProbe {
    candidates: Vec<u16>,
}

impl PortProbe {
    pub fn new(candidates: Vec<u16>) -> Self {
        Self { candidates }
    }

    pub async fn listening_ports(&self) -> Vec<ListeningPort> {
        match self.scan_with_lsof().await {
            Ok(ports) if !ports.is_empty() => ports,
            _ => self.scan_with_dial().await,
        }
    }

    async fn scan_with_lsof(&self) -> Result<Vec<ListeningPort>, std::io::Error> {
        let output = Command::new("lsof")
            .args(["-i", "-P", "-n", "-sTCP:LISTEN"])
            .output()
            .await?;

        if !output.status.success() {
            return Ok(vec![]);
        }

        Ok(parse_lsof(&String::from_utf8_lossy(&output.stdout)))
    }

    /// Fallback: a successful connect means "listening, identity unknown".
    async fn scan_with_dial(&self) -> Vec<ListeningPort> {
        let mut ports = Vec::new();
        for &port in &self.candidates {
            let dial = TcpStream::connect(("127.0.0.1", port));
            if let Ok(Ok(_)) = tokio::time::timeout(DIAL_TIMEOUT, dial).await {
                ports.push(ListeningPort {
                    port,
                    process: String::new(),
                    pid: None,
                });
            }
        }
        ports
    }
}

/// Parses `lsof -i -P -n -sTCP:LISTEN` output into (port, process, pid)
/// triples. Malformed rows and IPv6-style addresses with embedded colons
/// are skipped.
pub fn parse_lsof(output: &str) -> Vec<ListeningPort> {
    let mut ports = Vec::new();

    for (i, line) in output.lines().enumerate() {
        if i == 0 || line.is_empty() {
            continue;
        }

        let fields: Vec<&str> = line.split_whitespace().collect();
        if fields.len() < 9 {
            continue;
        }

        let name = fields[8];
        let parts: Vec<&str> = name.split(':').collect();
        if parts.len() != 2 {
            continue;
        }

        let Ok(port) = parts[1].parse::<u16>() else {
            continue;
        };

        ports.push(ListeningPort {
            port,
            process: fields[0].to_string(),
            pid: fields[1].parse().ok(),
        });
    }

    ports
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = "\
COMMAND   PID USER   FD   TYPE             DEVICE SIZE/OFF NODE NAME
node     1234 dev    23u  IPv4 0x1234567890      0t0  TCP *:3000 (LISTEN)
postgres  567 dev     7u  IPv4 0x2345678901      0t0  TCP 127.0.0.1:5432 (LISTEN)
weird     890 dev     3u  IPv6 0x3456789012      0t0  TCP [::1]:8080 (LISTEN)
short 1";

    #[test]
    fn test_parse_lsof_extracts_ports() {
        let ports = parse_lsof(SAMPLE);

        assert_eq!(ports.len(), 2);
        assert_eq!(
            ports[0],
            ListeningPort {
                port: 3000,
                process: "node".into(),
                pid: Some(1234),
            }
        );
        assert_eq!(ports[1].port, 5432);
        assert_eq!(ports[1].process, "postgres");
    }

    #[test]
    fn test_parse_lsof_skips_header_and_malformed() {
        // Header, the bracketed IPv6 name and the truncated row all drop out.
        let ports = parse_lsof(SAMPLE);
        assert!(ports.iter().all(|p| p.port != 8080));
    }

    #[test]
    fn test_parse_lsof_empty_input() {
        assert!(parse_lsof("").is_empty());
        assert!(parse_lsof("COMMAND PID\n").is_empty());
    }
}
