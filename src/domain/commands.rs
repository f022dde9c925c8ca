use anyhow::{anyhow, Result};

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum SlashCommand {
    Play,
    Pause,
    Toggle,
    /// Percentage of the duration.
    Seek(f64),
    /// Relative move in seconds.
    Skip(f64),
    /// Level in `0.0..=1.0`.
    Volume(f64),
    Mute,
    Rate(f64),
    Restart,
    Fullscreen,
    Help,
    Quit,
}

impl SlashCommand {
    pub fn parse(input: &str) -> Result<Self> {
        let trimmed = input.trim();
        if !trimmed.starts_with('/') {
            return Err(anyhow!("slash commands must start with '/'"));
        }

        let mut parts = trimmed[1..].split_whitespace();
        let cmd = parts.next().ok_or_else(|| anyhow!("empty command"))?;
        let arg = parts.next();
        if parts.next().is_some() {
            return Err(anyhow!("too many arguments for /{cmd}"));
        }

        let no_arg = |command: Self| match arg {
            None => Ok(command),
            Some(_) => Err(anyhow!("/{cmd} takes no arguments")),
        };

        match cmd {
            "play" => no_arg(Self::Play),
            "pause" => no_arg(Self::Pause),
            "toggle" | "pp" => no_arg(Self::Toggle),
            "seek" => {
                let value = arg.ok_or_else(|| anyhow!("usage: /seek <percent>"))?;
                let percent = parse_number(value.trim_end_matches('%'), "seek percent")?;
                Ok(Self::Seek(percent))
            }
            "skip" => {
                let value = arg.ok_or_else(|| anyhow!("usage: /skip <+/-seconds>"))?;
                let seconds = parse_number(
                    value.trim_start_matches('+').trim_end_matches('s'),
                    "skip seconds",
                )?;
                Ok(Self::Skip(seconds))
            }
            "volume" | "vol" => {
                let value = arg.ok_or_else(|| anyhow!("usage: /volume <0..1 | 0%..100%>"))?;
                let level = match value.strip_suffix('%') {
                    Some(percent) => parse_number(percent, "volume")? / 100.0,
                    None => parse_number(value, "volume")?,
                };
                Ok(Self::Volume(level))
            }
            "mute" => no_arg(Self::Mute),
            "rate" | "speed" => {
                let value = arg.ok_or_else(|| anyhow!("usage: /rate <multiplier>"))?;
                let rate = parse_number(value.trim_end_matches('x'), "rate")?;
                Ok(Self::Rate(rate))
            }
            "restart" => no_arg(Self::Restart),
            "fullscreen" | "fs" => no_arg(Self::Fullscreen),
            "help" => no_arg(Self::Help),
            "quit" | "q" => no_arg(Self::Quit),
            _ => Err(anyhow!("unknown command: {cmd}")),
        }
    }
}

fn parse_number(value: &str, what: &str) -> Result<f64> {
    let number = value
        .parse::<f64>()
        .map_err(|_| anyhow!("{what} must be a number (got '{value}')"))?;
    if !number.is_finite() {
        return Err(anyhow!("{what} must be finite"));
    }
    Ok(number)
}
