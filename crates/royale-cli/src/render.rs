use std::io::{self, Write};

use royale_config::{ConfigurationProblem, Configurator, InfoRequest};

/// Problems one per line, errors and warnings alike.
pub fn write_problems<W: Write>(out: &mut W, problems: &[ConfigurationProblem]) -> io::Result<()> {
    for problem in problems {
        writeln!(out, "{}", problem)?;
    }
    Ok(())
}

pub fn write_report_json<W: Write>(out: &mut W, configurator: &Configurator) -> anyhow::Result<()> {
    serde_json::to_writer_pretty(&mut *out, &configurator.report())?;
    writeln!(out)?;
    Ok(())
}

/// Answer `-version` or `-help [keywords]`.
pub fn write_info<W: Write>(out: &mut W, configurator: &Configurator, request: &InfoRequest) -> io::Result<()> {
    match request {
        InfoRequest::Version => writeln!(out, "royalec {}", configurator.settings().tool_version),
        InfoRequest::Help(keywords) => {
            let advanced = keywords.iter().any(|k| k == "advanced" || k == "list");
            writeln!(out, "Usage: royalec [options] [file]")?;
            writeln!(out)?;
            write!(out, "{}", configurator.registry().usage(advanced))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use royale_config::{ConfigError, Origin};

    #[test]
    fn test_problem_lines() {
        let problems = vec![ConfigurationProblem::from(ConfigError::UnknownVariable {
            var: "bogus".to_string(),
            origin: Origin::new("command line", Some(1)),
        })];
        let mut out = Vec::new();
        write_problems(&mut out, &problems).unwrap();
        assert_eq!(
            String::from_utf8(out).unwrap(),
            "command line(1): Error: unknown configuration variable 'bogus'\n"
        );
    }

    #[test]
    fn test_help_lists_options() {
        let configurator = Configurator::new().unwrap();
        let mut out = Vec::new();
        write_info(&mut out, &configurator, &InfoRequest::Help(Vec::new())).unwrap();
        let text = String::from_utf8(out).unwrap();
        assert!(text.contains("-output <filename>  alias -o"));
        assert!(!text.contains("-compiler.define"));

        let mut out = Vec::new();
        write_info(&mut out, &configurator, &InfoRequest::Help(vec!["advanced".to_string()])).unwrap();
        assert!(String::from_utf8(out).unwrap().contains("-compiler.define <name> <value>  (advanced)"));
    }
}
