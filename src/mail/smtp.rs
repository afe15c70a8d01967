use async_trait::async_trait;
use lettre::{
    message::{header::ContentType, Mailbox, MultiPart, SinglePart},
    transport::smtp::{
        authentication::Credentials,
        client::{Tls, TlsParameters},
    },
    AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor,
};

use super::{MailError, Mailer, VerificationEmail};
use crate::config::MailConfig;

pub struct SmtpMailer {
    transport: AsyncSmtpTransport<Tokio1Executor>,
    from: Mailbox,
}

impl SmtpMailer {
    pub fn new(cfg: &MailConfig) -> Result<Self, MailError> {
        let mut builder = if cfg.use_tls {
            let tls = TlsParameters::new(cfg.server.clone())
                .map_err(|e| MailError::InvalidConfig(format!("tls parameters: {e}")))?;
            // 465 is implicit TLS, everything else negotiates STARTTLS
            if cfg.port == 465 {
                AsyncSmtpTransport::<Tokio1Executor>::relay(&cfg.server)
                    .map_err(|e| MailError::InvalidConfig(format!("smtp relay: {e}")))?
                    .port(cfg.port)
                    .tls(Tls::Wrapper(tls))
            } else {
                AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(&cfg.server)
                    .map_err(|e| MailError::InvalidConfig(format!("smtp relay: {e}")))?
                    .port(cfg.port)
                    .tls(Tls::Required(tls))
            }
        } else {
            AsyncSmtpTransport::<Tokio1Executor>::builder_dangerous(&cfg.server).port(cfg.port)
        };

        if let (Some(user), Some(pass)) = (&cfg.username, &cfg.password) {
            builder = builder.credentials(Credentials::new(user.clone(), pass.clone()));
        }

        let from = format!("{} <{}>", cfg.from_name, cfg.from)
            .parse::<Mailbox>()
            .map_err(|e| MailError::InvalidConfig(format!("from address: {e}")))?;

        Ok(Self {
            transport: builder.build(),
            from,
        })
    }
}

#[async_trait]
impl Mailer for SmtpMailer {
    async fn send_verification(&self, to: &str, link: &str) -> Result<(), MailError> {
        let content = VerificationEmail::new(link);
        let to = to
            .parse::<Mailbox>()
            .map_err(|e| MailError::SendFailed(format!("recipient address: {e}")))?;

        let message = Message::builder()
            .from(self.from.clone())
            .to(to)
            .subject(content.subject)
            .multipart(
                MultiPart::alternative()
                    .singlepart(
                        SinglePart::builder()
                            .header(ContentType::TEXT_PLAIN)
                            .body(content.text),
                    )
                    .singlepart(
                        SinglePart::builder()
                            .header(ContentType::TEXT_HTML)
                            .body(content.html),
                    ),
            )
            .map_err(|e| MailError::SendFailed(format!("build message: {e}")))?;

        self.transport
            .send(message)
            .await
            .map_err(|e| MailError::SendFailed(e.to_string()))?;
        Ok(())
    }
}
