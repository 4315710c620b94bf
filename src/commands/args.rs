use std::fmt;

/// One token of an external tool command line
#[derive(Debug, Clone, PartialEq, Eq)]
enum Token {
    /// Passed and shown verbatim (subcommands, flags, modifiers)
    Bare(String),
    /// Always shown in double quotes (paths, snapshot names)
    Quoted(String),
    /// `-name="value"` style option
    Option { name: String, value: String },
}

/// Argument list for vmrun / vmware-vdiskmanager.
///
/// The child process receives the plain argument vector from [`ToolArgs::to_argv`];
/// the [`fmt::Display`] form is the quoted command line as it would be typed into
/// a Windows shell, used for logging and for asserting what was issued.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ToolArgs {
    tokens: Vec<Token>,
}

impl ToolArgs {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a bare token, even when empty
    pub fn arg(mut self, value: impl Into<String>) -> Self {
        self.tokens.push(Token::Bare(value.into()));
        self
    }

    /// Append a bare token unless it is empty (optional modifiers)
    pub fn optional(self, value: impl Into<String>) -> Self {
        let value = value.into();
        if value.is_empty() {
            return self;
        }
        self.arg(value)
    }

    /// Append a token that is always rendered quoted
    pub fn quoted(mut self, value: impl Into<String>) -> Self {
        self.tokens.push(Token::Quoted(value.into()));
        self
    }

    /// Append `-name="value"`
    pub fn option(mut self, name: &str, value: impl Into<String>) -> Self {
        self.tokens.push(Token::Option {
            name: name.to_string(),
            value: value.into(),
        });
        self
    }

    /// Arguments as handed to the child process, without shell quoting
    pub fn to_argv(&self) -> Vec<String> {
        self.tokens
            .iter()
            .map(|token| match token {
                Token::Bare(v) | Token::Quoted(v) => v.clone(),
                Token::Option { name, value } => format!("-{}={}", name, value),
            })
            .collect()
    }
}

impl fmt::Display for ToolArgs {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, token) in self.tokens.iter().enumerate() {
            if i > 0 {
                f.write_str(" ")?;
            }
            match token {
                Token::Bare(v) if v.is_empty() => f.write_str("\"\"")?,
                Token::Bare(v) => write!(f, "{}", v)?,
                Token::Quoted(v) => write!(f, "\"{}\"", v)?,
                Token::Option { name, value } => write!(f, "-{}=\"{}\"", name, value)?,
            }
        }
        Ok(())
    }
}
