use sysinfo::{ProcessesToUpdate, System};

use devscope_core::probe::ProcessRecord;

/// Enumerates OS processes and keeps those whose command name contains one
/// of the configured runtime keywords.
#[derive(Clone, Debug)]
pub struct ProcessProbe {
    keywords: Vec<String>,
}

impl ProcessProbe {
    pub fn new(keywords: Vec<String>) -> Self {
        let keywords = keywords.into_iter().map(|k| k.to_lowercase()).collect();
        Self { keywords }
    }

    pub fn find(&self) -> Vec<ProcessRecord> {
        let mut sys = System::new();
        sys.refresh_processes(ProcessesToUpdate::All, true);

        let mut found = Vec::new();
        for (pid, process) in sys.processes() {
            let name = process.name().to_string_lossy();
            if !matches_keywords(&name, &self.keywords) {
                continue;
            }

            let command: String = process
                .cmd()
                .iter()
                .map(|part| part.to_string_lossy())
                .collect::<Vec<_>>()
                .join(" ");

            found.push(ProcessRecord {
                pid: pid.as_u32(),
                command: if command.is_empty() {
                    name.to_string()
                } else {
                    command
                },
            });
        }

        found
    }
}

/// Case-insensitive substring match against the keyword set. Keywords are
/// stored lowercased.
fn matches_keywords(name: &str, keywords: &[String]) -> bool {
    let lower = name.to_lowercase();
    keywords.iter().any(|k| lower.contains(k.as_str()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_matches_keywords_case_insensitive() {
        let keywords = vec!["node".to_string(), "python".to_string()];

        assert!(matches_keywords("node", &keywords));
        assert!(matches_keywords("Node", &keywords));
        assert!(matches_keywords("Python3.12", &keywords));
        assert!(matches_keywords("next-node-server", &keywords));
        assert!(!matches_keywords("nginx", &keywords));
        assert!(!matches_keywords("", &keywords));
    }

    #[test]
    fn test_probe_lowercases_configured_keywords() {
        let probe = ProcessProbe::new(vec!["NODE".to_string()]);
        assert!(matches_keywords("node", &probe.keywords));
    }
}
