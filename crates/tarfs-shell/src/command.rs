//! Command-line parsing for shell input

/// A parsed shell command
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Command {
    Ls(Option<String>),
    Cd(String),
    Cp { source: String, destination: String },
    Tac(String),
    Cat(String),
    Chmod { mode: String, path: String },
    Pwd,
    Exit,
}

#[derive(thiserror::Error, Clone, Debug, PartialEq, Eq)]
pub enum CommandError {
    #[error("{command}: missing {operand}")]
    MissingOperand {
        command: &'static str,
        operand: &'static str,
    },
    #[error("{0}: command not found")]
    NotFound(String),
}

fn missing(command: &'static str, operand: &'static str) -> CommandError {
    CommandError::MissingOperand { command, operand }
}

impl Command {
    /// Parse one line of input. Blank lines parse to `None`; extra
    /// arguments are ignored.
    pub fn parse(line: &str) -> Result<Option<Command>, CommandError> {
        let mut words = line.split_whitespace();
        let Some(name) = words.next() else {
            return Ok(None);
        };
        let mut args = words.map(str::to_string);

        let command = match name {
            "ls" => Command::Ls(args.next()),
            "cd" => Command::Cd(args.next().unwrap_or_else(|| "/".to_string())),
            "cp" => match (args.next(), args.next()) {
                (Some(source), Some(destination)) => Command::Cp {
                    source,
                    destination,
                },
                _ => return Err(missing("cp", "destination file operand after source")),
            },
            "tac" => Command::Tac(args.next().ok_or_else(|| missing("tac", "file operand"))?),
            "cat" => Command::Cat(args.next().ok_or_else(|| missing("cat", "file operand"))?),
            "chmod" => match (args.next(), args.next()) {
                (Some(mode), Some(path)) => Command::Chmod { mode, path },
                _ => return Err(missing("chmod", "operand")),
            },
            "pwd" => Command::Pwd,
            "exit" => Command::Exit,
            other => return Err(CommandError::NotFound(other.to_string())),
        };
        Ok(Some(command))
    }
}
