use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use serde_json::Value;
use smtp_mailer::config::{sender_info, LogConfig};
use smtp_mailer::mailer::{self, Mailer};
use smtp_mailer::{connect_to_smtp_server, MessageData, STANDARD_MESSAGE};
use std::fs;
use std::path::PathBuf;
use tracing::info;

/// Send templated e-mail through the SMTP server configured in the environment
#[derive(Debug, Parser)]
#[command(name = "smtp-mailer", version, about)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Render a template file and send it
    Send {
        #[command(flatten)]
        template: TemplateArgs,
        /// Recipient address (repeatable)
        #[arg(long = "to", required = true)]
        recipients: Vec<String>,
    },
    /// Send a plain message with From/To/Subject headers
    Standard {
        #[arg(long)]
        subject: String,
        #[arg(long)]
        body: String,
        /// Recipient address (repeatable)
        #[arg(long = "to", required = true)]
        recipients: Vec<String>,
    },
    /// Render a template file to stdout without sending
    Render {
        #[command(flatten)]
        template: TemplateArgs,
    },
    /// Connect and authenticate without sending
    Check,
}

#[derive(Debug, Args)]
struct TemplateArgs {
    /// Template file
    #[arg(long)]
    template: PathBuf,
    /// Context as a JSON object
    #[arg(long, conflicts_with = "context_file")]
    context: Option<String>,
    /// File holding the context as JSON
    #[arg(long)]
    context_file: Option<PathBuf>,
    /// Extra string variable as KEY=VALUE (repeatable)
    #[arg(long = "var", value_parser = parse_var)]
    vars: Vec<(String, String)>,
}

impl TemplateArgs {
    fn source(&self) -> Result<String> {
        fs::read_to_string(&self.template)
            .with_context(|| format!("Failed to read template {}", self.template.display()))
    }

    fn context(&self) -> Result<Value> {
        let mut context = match (&self.context, &self.context_file) {
            (Some(json), _) => serde_json::from_str(json).context("Invalid --context JSON")?,
            (None, Some(path)) => {
                let raw = fs::read_to_string(path)
                    .with_context(|| format!("Failed to read context {}", path.display()))?;
                serde_json::from_str(&raw).context("Invalid context file JSON")?
            }
            (None, None) => Value::Object(Default::default()),
        };

        if !self.vars.is_empty() {
            let Value::Object(map) = &mut context else {
                anyhow::bail!("--var can only be combined with a JSON object context");
            };
            map.extend(
                self.vars
                    .iter()
                    .map(|(key, value)| (key.clone(), Value::String(value.clone()))),
            );
        }

        Ok(context)
    }
}

fn parse_var(raw: &str) -> std::result::Result<(String, String), String> {
    raw.split_once('=')
        .map(|(k, v)| (k.trim().to_string(), v.to_string()))
        .filter(|(k, _)| !k.is_empty())
        .ok_or_else(|| format!("expected KEY=VALUE, got `{}`", raw))
}

fn main() -> Result<()> {
    // Load configuration
    dotenvy::dotenv().ok();
    let log_config = LogConfig::from_env()?;
    smtp_mailer::telemetry::init(&log_config);

    let cli = Cli::parse();
    let creds = sender_info();

    match cli.command {
        Command::Send {
            template,
            recipients,
        } => {
            let source = template.source()?;
            let context = template.context()?;
            let auth = connect_to_smtp_server(creds);

            info!(server = %creds.address(), recipients = recipients.len(), "Sending mail");
            mailer::send_mail(&auth, &source, &context, &recipients)?;
        }
        Command::Standard {
            subject,
            body,
            recipients,
        } => {
            let data = MessageData::new(creds.username.clone(), &recipients, &subject, body);
            let auth = connect_to_smtp_server(creds);

            info!(server = %creds.address(), recipients = recipients.len(), "Sending mail");
            mailer::send_mail(&auth, STANDARD_MESSAGE, &data, &recipients)?;
        }
        Command::Render { template } => {
            let rendered = mailer::render(&template.source()?, &template.context()?)?;
            print!("{}", rendered);
        }
        Command::Check => {
            Mailer::new(creds.clone()).test_connection()?;
            info!(server = %creds.address(), "SMTP connection OK");
        }
    }

    Ok(())
}
