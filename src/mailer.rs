//! Outbound email.
//!
//! [`Mailer`] is the seam the dispatcher sends through. [`SmtpMailer`] is the
//! production transport; [`DisabledMailer`] backs dry runs, where nothing may
//! leave the process.

use lettre::message::Mailbox;
use lettre::message::header::ContentType;
use lettre::transport::smtp::authentication::Credentials;
use lettre::transport::smtp::client::{Certificate, Tls, TlsParameters};
use lettre::{Address, AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor};
use tracing::debug;

use crate::config::SmtpConfig;
use crate::constants::SENDER_NAME;
use crate::core::MailError;

/// Sends a single email.
#[allow(async_fn_in_trait)]
pub trait Mailer {
    /// Deliver `body` as a plain-text message to `recipient`.
    ///
    /// # Errors
    ///
    /// Returns [`MailError`] if the message cannot be built or delivered.
    async fn send_email(
        &self,
        recipient: &str,
        subject: &str,
        body: &[u8],
    ) -> Result<(), MailError>;
}

/// SMTP delivery through lettre's tokio transport.
pub struct SmtpMailer {
    transport: AsyncSmtpTransport<Tokio1Executor>,
    from: Mailbox,
}

impl SmtpMailer {
    /// Configure the transport.
    ///
    /// With a PEM certificate configured the connection uses implicit TLS and
    /// trusts that certificate; without one, STARTTLS is used when offered.
    ///
    /// # Errors
    ///
    /// Returns [`MailError::Address`] for an invalid sender and
    /// [`MailError::Tls`] if TLS parameters cannot be built.
    pub fn new(config: &SmtpConfig) -> Result<Self, MailError> {
        let from = parse_address(&config.from)?;

        let tls = match &config.cert {
            Some(pem) => {
                let certificate = Certificate::from_pem(pem.as_bytes()).map_err(MailError::Tls)?;
                let parameters = TlsParameters::builder(config.host.clone())
                    .add_root_certificate(certificate)
                    .build()
                    .map_err(MailError::Tls)?;
                Tls::Wrapper(parameters)
            }
            None => Tls::Opportunistic(
                TlsParameters::new(config.host.clone()).map_err(MailError::Tls)?,
            ),
        };

        let mut builder = AsyncSmtpTransport::<Tokio1Executor>::builder_dangerous(&config.host)
            .port(config.port)
            .tls(tls);
        if let Some(user) = &config.user {
            builder = builder.credentials(Credentials::new(
                user.clone(),
                config.password.clone().unwrap_or_default(),
            ));
        }

        Ok(Self {
            transport: builder.build(),
            from: Mailbox::new(Some(SENDER_NAME.to_string()), from),
        })
    }
}

impl Mailer for SmtpMailer {
    async fn send_email(
        &self,
        recipient: &str,
        subject: &str,
        body: &[u8],
    ) -> Result<(), MailError> {
        let to = Mailbox::new(None, parse_address(recipient)?);
        let message = Message::builder()
            .from(self.from.clone())
            .to(to)
            .subject(subject)
            .header(ContentType::TEXT_PLAIN)
            .body(body.to_vec())
            .map_err(MailError::Build)?;

        self.transport.send(message).await.map_err(MailError::Transport)?;
        debug!(recipient = %recipient, "email accepted by SMTP server");
        Ok(())
    }
}

/// Mailer that refuses every send.
#[derive(Debug, Default, Clone, Copy)]
pub struct DisabledMailer;

impl Mailer for DisabledMailer {
    async fn send_email(
        &self,
        _recipient: &str,
        _subject: &str,
        _body: &[u8],
    ) -> Result<(), MailError> {
        Err(MailError::Disabled)
    }
}

fn parse_address(address: &str) -> Result<Address, MailError> {
    address.parse().map_err(|source| MailError::Address {
        address: address.to_string(),
        source,
    })
}
