//! IMAP-backed mailbox session over TLS.

use std::net::TcpStream;

use imap_proto::types::{BodyContentCommon, BodyStructure, ContentEncoding, SectionPath};
use native_tls::{TlsConnector, TlsStream};
use tracing::{debug, info, warn};

use crate::config::MailboxConfig;
use crate::error::{ExtractError, Result};
use crate::model::structure::{BodyPart, MessageStructure, PartPath, PrimaryType, TransferEncoding};

use super::MailboxSession;

type Connection = ::imap::Session<TlsStream<TcpStream>>;

/// A logged-in IMAP session with one mailbox selected.
///
/// The connection is logged out by [`close`](MailboxSession::close), or on
/// drop if the caller never closed it.
pub struct ImapSession {
    host: String,
    connection: Option<Connection>,
    uids: Vec<u32>,
    count: u32,
}

impl ImapSession {
    /// Connect, log in and select `config.mailbox`.
    ///
    /// Every failure along the way is reported as
    /// [`ExtractError::Connection`].
    pub fn open(config: &MailboxConfig, password: &str) -> Result<Self> {
        let host = config.host.clone();
        let fail = |reason: String| ExtractError::Connection {
            host: host.clone(),
            reason,
        };

        let tls = TlsConnector::builder()
            .build()
            .map_err(|e| fail(format!("TLS setup failed: {e}")))?;
        let client = ::imap::connect((config.host.as_str(), config.port), &config.host, &tls)
            .map_err(|e| fail(e.to_string()))?;
        info!(host = %config.host, port = config.port, "Connected");

        let mut connection = client
            .login(&config.username, password)
            .map_err(|(e, _client)| fail(format!("login failed: {e}")))?;
        info!(user = %config.username, "Logged in");

        let mailbox = connection
            .select(&config.mailbox)
            .map_err(|e| fail(format!("cannot select '{}': {e}", config.mailbox)))?;

        let mut uids: Vec<u32> = connection
            .uid_search("ALL")
            .map_err(|e| fail(format!("UID SEARCH failed: {e}")))?
            .into_iter()
            .collect();
        uids.sort_unstable();

        if uids.len() != mailbox.exists as usize {
            warn!(
                exists = mailbox.exists,
                uids = uids.len(),
                "UID list does not match message count"
            );
        }
        info!(mailbox = %config.mailbox, messages = mailbox.exists, "Mailbox selected");

        Ok(Self {
            host,
            connection: Some(connection),
            uids,
            count: mailbox.exists,
        })
    }

    fn connection(&mut self) -> Result<&mut Connection> {
        self.connection.as_mut().ok_or(ExtractError::SessionClosed)
    }
}

impl MailboxSession for ImapSession {
    fn message_count(&self) -> Result<u32> {
        if self.connection.is_none() {
            return Err(ExtractError::SessionClosed);
        }
        Ok(self.count)
    }

    fn uid(&self, index: u32) -> Option<u32> {
        let i = index.checked_sub(1)?;
        self.uids.get(i as usize).copied()
    }

    fn fetch_structure(&mut self, index: u32) -> Result<MessageStructure> {
        let fetches = self
            .connection()?
            .fetch(index.to_string(), "BODYSTRUCTURE")
            .map_err(|e| ExtractError::fetch(index, e))?;
        let structure = fetches
            .iter()
            .find_map(|fetch| fetch.bodystructure())
            .ok_or_else(|| ExtractError::fetch(index, "server returned no BODYSTRUCTURE"))?;
        Ok(MessageStructure::new(convert_body(structure)))
    }

    fn fetch_part_body(&mut self, index: u32, section: &PartPath) -> Result<Vec<u8>> {
        let query = format!("BODY.PEEK[{section}]");
        let fetches = self
            .connection()?
            .fetch(index.to_string(), &query)
            .map_err(|e| ExtractError::fetch(index, e))?;
        let path = SectionPath::Part(section.segments().to_vec(), None);
        let body = fetches
            .iter()
            .find_map(|fetch| fetch.section(&path))
            .ok_or_else(|| ExtractError::fetch(index, format!("no body for section {section}")))?;
        debug!(index, section = %section, bytes = body.len(), "Fetched part body");
        Ok(body.to_vec())
    }

    fn delete_message(&mut self, index: u32) -> Result<()> {
        self.connection()?
            .store(index.to_string(), "+FLAGS (\\Deleted)")
            .map_err(|e| ExtractError::mailbox("STORE \\Deleted", e))?;
        Ok(())
    }

    fn expunge(&mut self) -> Result<()> {
        self.connection()?
            .expunge()
            .map_err(|e| ExtractError::mailbox("EXPUNGE", e))?;
        Ok(())
    }

    fn close(&mut self) -> Result<()> {
        if let Some(mut connection) = self.connection.take() {
            connection.logout().map_err(|e| ExtractError::Connection {
                host: self.host.clone(),
                reason: format!("LOGOUT failed: {e}"),
            })?;
            info!(host = %self.host, "Logged out");
        }
        Ok(())
    }

    fn is_closed(&self) -> bool {
        self.connection.is_none()
    }
}

impl Drop for ImapSession {
    fn drop(&mut self) {
        if let Err(e) = self.close() {
            debug!(error = %e, "Logout on drop failed");
        }
    }
}

/// Convert the server's BODYSTRUCTURE into our part tree.
///
/// Section paths are assigned afterwards by [`MessageStructure::new`].
fn convert_body(structure: &BodyStructure<'_>) -> BodyPart {
    match structure {
        BodyStructure::Multipart { common, bodies, .. } => {
            let mut part = part_from_common(common, TransferEncoding::SevenBit);
            part.primary_type = PrimaryType::Multipart;
            part.children = bodies.iter().map(convert_body).collect();
            part
        }
        BodyStructure::Basic { common, other, .. }
        | BodyStructure::Text { common, other, .. }
        | BodyStructure::Message { common, other, .. } => {
            part_from_common(common, convert_encoding(&other.transfer_encoding))
        }
    }
}

fn part_from_common(common: &BodyContentCommon<'_>, encoding: TransferEncoding) -> BodyPart {
    let (disposition, disposition_params) = match &common.disposition {
        Some(disposition) => (
            disposition.ty.to_string(),
            disposition
                .params
                .iter()
                .flatten()
                .map(|(name, value)| (name.to_string(), value.to_string()))
                .collect(),
        ),
        None => (String::new(), Vec::new()),
    };

    BodyPart {
        primary_type: PrimaryType::from_name(&common.ty.ty),
        subtype: common.ty.subtype.to_string(),
        disposition,
        encoding,
        disposition_params,
        section: PartPath::single(1),
        children: Vec::new(),
    }
}

fn convert_encoding(encoding: &ContentEncoding<'_>) -> TransferEncoding {
    match encoding {
        ContentEncoding::SevenBit => TransferEncoding::SevenBit,
        ContentEncoding::EightBit => TransferEncoding::EightBit,
        ContentEncoding::Binary => TransferEncoding::Binary,
        ContentEncoding::Base64 => TransferEncoding::Base64,
        ContentEncoding::QuotedPrintable => TransferEncoding::QuotedPrintable,
        ContentEncoding::Other(name) => TransferEncoding::from_name(name),
    }
}
