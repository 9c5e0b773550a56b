/// Command-entry input parsed into a closed action set. Target resolution
/// against the registry happens in the controller; this layer only decides
/// shape and verb.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum CommandInput {
    Start(String),
    Stop(String),
    Restart(String),
    Remove(String),
    Kill(String),
    Scan,
    Quit,
}

pub fn parse_command(input: &str) -> Result<CommandInput, String> {
    let parts: Vec<&str> = input.split_whitespace().collect();
    if parts.is_empty() {
        return Err("Empty command".into());
    }

    let verb = parts[0].to_lowercase();
    let target = parts.get(1).copied();

    let need_target = |t: Option<&str>| -> Result<String, String> {
        t.map(|s| s.to_string())
            .ok_or_else(|| "Missing target (service name or id)".into())
    };

    match verb.as_str() {
        "start" | "up" => Ok(CommandInput::Start(need_target(target)?)),
        "stop" | "down" => Ok(CommandInput::Stop(need_target(target)?)),
        "restart" | "rs" => Ok(CommandInput::Restart(need_target(target)?)),
        "rm" | "delete" => Ok(CommandInput::Remove(need_target(target)?)),
        "kill" | "k" => Ok(CommandInput::Kill(need_target(target)?)),
        "scan" | "refresh" => Ok(CommandInput::Scan),
        "q" | "quit" => Ok(CommandInput::Quit),
        _ => Err(format!(
            "Unknown command: {verb}\nTry: start/stop/restart/rm/kill/scan/quit"
        )),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_verbs_and_aliases() {
        assert_eq!(parse_command("start api").unwrap(), CommandInput::Start("api".into()));
        assert_eq!(parse_command("up api").unwrap(), CommandInput::Start("api".into()));
        assert_eq!(parse_command("down pg").unwrap(), CommandInput::Stop("pg".into()));
        assert_eq!(parse_command("rs pg").unwrap(), CommandInput::Restart("pg".into()));
        assert_eq!(parse_command("rm abc123").unwrap(), CommandInput::Remove("abc123".into()));
        assert_eq!(parse_command("kill 4242").unwrap(), CommandInput::Kill("4242".into()));
        assert_eq!(parse_command("scan").unwrap(), CommandInput::Scan);
        assert_eq!(parse_command("quit").unwrap(), CommandInput::Quit);
    }

    #[test]
    fn test_parse_is_case_insensitive_on_verb() {
        assert_eq!(parse_command("STOP api").unwrap(), CommandInput::Stop("api".into()));
    }

    #[test]
    fn test_parse_missing_target() {
        assert!(parse_command("start").is_err());
        assert!(parse_command("kill").is_err());
    }

    #[test]
    fn test_parse_unknown_and_empty() {
        assert!(parse_command("").is_err());
        assert!(parse_command("   ").is_err());
        assert!(parse_command("dance api").is_err());
    }
}
