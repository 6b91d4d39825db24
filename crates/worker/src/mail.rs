use anyhow::Context;
use chrono::NaiveDate;
use fince_core::config::Settings;
use fince_core::time::report_day::korean_long_date;
use lettre::message::header::ContentType;
use lettre::message::Mailbox;
use lettre::transport::smtp::authentication::Credentials;
use lettre::{Message, SmtpTransport, Transport};

/// SMTP delivery of rendered reports. Built once per run.
#[derive(Clone)]
pub struct Mailer {
    transport: SmtpTransport,
    from: Mailbox,
    to: Vec<Mailbox>,
}

impl Mailer {
    pub fn from_settings(settings: &Settings) -> anyhow::Result<Self> {
        let host = settings.require_smtp_host()?;
        let mut builder = SmtpTransport::relay(host)
            .with_context(|| format!("invalid SMTP relay {host}"))?;
        if let (Some(user), Some(pass)) = (&settings.smtp_username, &settings.smtp_password) {
            builder = builder.credentials(Credentials::new(user.clone(), pass.clone()));
        }

        let from = settings
            .require_mail_from()?
            .parse::<Mailbox>()
            .context("MAIL_FROM is not a valid address")?;
        let to = settings
            .require_mail_to()?
            .iter()
            .map(|addr| {
                addr.parse::<Mailbox>()
                    .with_context(|| format!("MAIL_TO entry {addr:?} is not a valid address"))
            })
            .collect::<anyhow::Result<Vec<_>>>()?;

        Ok(Self {
            transport: builder.build(),
            from,
            to,
        })
    }

    pub async fn send_report(&self, subject: String, html: String) -> anyhow::Result<()> {
        let message = build_message(&self.from, &self.to, &subject, html)?;
        let transport = self.transport.clone();

        tokio::task::spawn_blocking(move || transport.send(&message))
            .await
            .context("smtp task panicked")?
            .context("smtp send failed")?;
        Ok(())
    }
}

/// "[아시아 증시 브리핑] 2024년 6월 7일"
pub fn subject(title: &str, previous_business_day: NaiveDate) -> String {
    format!("[{title}] {}", korean_long_date(previous_business_day))
}

fn build_message(
    from: &Mailbox,
    to: &[Mailbox],
    subject: &str,
    html: String,
) -> anyhow::Result<Message> {
    anyhow::ensure!(!to.is_empty(), "no recipients");

    let mut builder = Message::builder()
        .from(from.clone())
        .subject(subject)
        .header(ContentType::TEXT_HTML);
    for mailbox in to {
        builder = builder.to(mailbox.clone());
    }
    builder.body(html).context("build report email failed")
}
