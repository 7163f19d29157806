//! End-to-end extraction against an in-memory mailbox.

use assert_fs::prelude::*;
use assert_fs::TempDir;
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use predicates::prelude::*;

use mailsnatch::export::attachment::{extract_attachments, run, ExtractOptions};
use mailsnatch::export::report::FailureKind;
use mailsnatch::model::structure::{
    BodyPart, MessageStructure, PartPath, PrimaryType, TransferEncoding,
};
use mailsnatch::session::memory::{MemoryMailbox, MemoryMessage};
use mailsnatch::session::MailboxSession;

const JPEG_BYTES: &[u8] = &[0xFF, 0xD8, 0xFF, 0xE0, 0x00, 0x10, b'J', b'F', b'I', b'F', 0x00];

fn keep_going(_: usize, _: usize) -> bool {
    true
}

/// base64 body wrapped at 76 columns, the way mailers send it.
fn base64_body(data: &[u8]) -> Vec<u8> {
    STANDARD
        .encode(data)
        .as_bytes()
        .chunks(76)
        .collect::<Vec<_>>()
        .join(&b"\r\n"[..])
}

/// `multipart/mixed` with a plain-text body and one JPEG in section 2.
fn photo_message(uid: u32, disposition: &str) -> MemoryMessage {
    let structure = MessageStructure::multipart(
        "mixed",
        vec![
            BodyPart::leaf(PrimaryType::Text, "plain"),
            BodyPart::leaf(PrimaryType::Image, "jpeg")
                .with_disposition(disposition)
                .with_encoding(TransferEncoding::Base64)
                .with_param("filename", "IMG_0001.JPG"),
        ],
    );
    MemoryMessage::new(uid, structure)
        .with_body(PartPath::single(1), b"See attached.".to_vec())
        .with_body(PartPath::single(2), base64_body(JPEG_BYTES))
}

// ─── Scenario A: one attachment, deleted and expunged ───────────────

#[test]
fn test_single_attachment_written_and_message_deleted() {
    let temp = TempDir::new().unwrap();
    let mut mailbox = MemoryMailbox::new().with_message(photo_message(101, "attachment"));

    let report =
        extract_attachments(&mut mailbox, &ExtractOptions::new(temp.path()), &keep_going)
            .unwrap();

    assert_eq!(report.written.len(), 1);
    temp.child("101-2.jpg").assert(predicate::path::exists());
    temp.child("101-2.jpg").assert(JPEG_BYTES);
    assert_eq!(std::fs::read_dir(temp.path()).unwrap().count(), 1);

    assert_eq!(report.messages_deleted, 1);
    assert!(report.expunged);
    assert_eq!(mailbox.expunge_count(), 1);
    assert!(mailbox.uids().is_empty());
    assert!(report.is_clean());
}

// ─── Scenario B: inline part skipped, message still deleted ─────────

#[test]
fn test_inline_excluded_but_message_deleted() {
    let temp = TempDir::new().unwrap();
    let mut mailbox = MemoryMailbox::new().with_message(photo_message(102, "inline"));

    let options = ExtractOptions::new(temp.path()).include_inline(false);
    let report = extract_attachments(&mut mailbox, &options, &keep_going).unwrap();

    assert!(report.written.is_empty());
    temp.child("102-2.jpg").assert(predicate::path::missing());
    assert_eq!(report.messages_deleted, 1);
    assert!(report.expunged);
    assert!(mailbox.uids().is_empty());
}

#[test]
fn test_inline_included_by_default() {
    let temp = TempDir::new().unwrap();
    let mut mailbox = MemoryMailbox::new().with_message(photo_message(103, "INLINE"));

    let report =
        extract_attachments(&mut mailbox, &ExtractOptions::new(temp.path()), &keep_going)
            .unwrap();

    assert_eq!(report.written.len(), 1);
    temp.child("103-2.jpg").assert(JPEG_BYTES);
}

// ─── Scenario C: one structure fetch fails ──────────────────────────

#[test]
fn test_structure_failure_isolated_to_one_message() {
    let temp = TempDir::new().unwrap();
    let mut mailbox = MemoryMailbox::new()
        .with_message(photo_message(1, "attachment"))
        .with_message(photo_message(2, "attachment").structure_unavailable())
        .with_message(photo_message(3, "attachment"));

    let report =
        extract_attachments(&mut mailbox, &ExtractOptions::new(temp.path()), &keep_going)
            .unwrap();

    assert_eq!(report.messages_total, 3);
    assert_eq!(report.messages_processed, 2);
    assert_eq!(report.failures.len(), 1);
    assert_eq!(report.count(FailureKind::Fetch), 1);
    assert_eq!(report.failures[0].message.uid, 2);
    assert!(report.failures[0].section.is_none());

    temp.child("1-2.jpg").assert(JPEG_BYTES);
    temp.child("2-2.jpg").assert(predicate::path::missing());
    temp.child("3-2.jpg").assert(JPEG_BYTES);

    assert_eq!(report.messages_deleted, 2);
    assert!(report.expunged);
    assert_eq!(mailbox.uids(), vec![2]);
}

// ─── Idempotence ────────────────────────────────────────────────────

#[test]
fn test_rerun_without_delete_is_byte_identical() {
    let temp = TempDir::new().unwrap();
    let mut mailbox = MemoryMailbox::new()
        .with_message(photo_message(7, "attachment"))
        .with_message(photo_message(8, "inline"));
    let options = ExtractOptions::new(temp.path()).delete_after(false);

    let first = extract_attachments(&mut mailbox, &options, &keep_going).unwrap();
    let first_bytes: Vec<Vec<u8>> = first
        .written
        .iter()
        .map(|f| std::fs::read(&f.path).unwrap())
        .collect();

    let second = extract_attachments(&mut mailbox, &options, &keep_going).unwrap();
    let second_bytes: Vec<Vec<u8>> = second
        .written
        .iter()
        .map(|f| std::fs::read(&f.path).unwrap())
        .collect();

    assert_eq!(first.written.len(), 2);
    let first_paths: Vec<_> = first.written.iter().map(|f| f.path.clone()).collect();
    let second_paths: Vec<_> = second.written.iter().map(|f| f.path.clone()).collect();
    assert_eq!(first_paths, second_paths);
    assert_eq!(first_bytes, second_bytes);

    assert_eq!(mailbox.uids(), vec![7, 8]);
    assert_eq!(mailbox.expunge_count(), 0);
    assert!(mailbox.deleted_uids().is_empty());
}

// ─── Mixed real-world structures ────────────────────────────────────

#[test]
fn test_mobile_client_subtype_and_encodings() {
    let temp = TempDir::new().unwrap();
    let structure = MessageStructure::multipart(
        "mixed",
        vec![
            BodyPart::leaf(PrimaryType::Text, "plain"),
            // Phone clients send a generic subtype; the filename carries the type.
            BodyPart::leaf(PrimaryType::Application, "octet-stream")
                .with_disposition("attachment")
                .with_encoding(TransferEncoding::Base64)
                .with_param("filename", "photo.HEIC"),
            BodyPart::leaf(PrimaryType::Text, "csv")
                .with_disposition("attachment")
                .with_encoding(TransferEncoding::QuotedPrintable)
                .with_param("filename", "prices.csv"),
        ],
    );
    let mut mailbox = MemoryMailbox::new().with_message(
        MemoryMessage::new(55, structure)
            .with_body(PartPath::single(2), base64_body(b"ftypheic"))
            .with_body(
                PartPath::single(3),
                b"item;price=0D=0Acaf=C3=A9;2=\r\n.50".to_vec(),
            ),
    );

    let report =
        extract_attachments(&mut mailbox, &ExtractOptions::new(temp.path()), &keep_going)
            .unwrap();

    assert!(report.is_clean());
    temp.child("55-2.heic").assert(&b"ftypheic"[..]);
    temp.child("55-3.csv").assert("item;price\r\ncafé;2.50".as_bytes());
}

#[test]
fn test_missing_filename_keeps_message() {
    let temp = TempDir::new().unwrap();
    let structure = MessageStructure::multipart(
        "mixed",
        vec![
            BodyPart::leaf(PrimaryType::Text, "plain"),
            BodyPart::leaf(PrimaryType::Application, "octet-stream").with_disposition("attachment"),
        ],
    );
    let mut mailbox = MemoryMailbox::new()
        .with_message(MemoryMessage::new(9, structure))
        .with_message(photo_message(10, "attachment"));

    let report =
        extract_attachments(&mut mailbox, &ExtractOptions::new(temp.path()), &keep_going)
            .unwrap();

    assert_eq!(report.count(FailureKind::Resolution), 1);
    assert_eq!(report.failures[0].section.as_deref(), Some("2"));
    temp.child("10-2.jpg").assert(JPEG_BYTES);
    // The unnamed attachment is still on the server.
    assert_eq!(mailbox.uids(), vec![9]);
}

#[test]
fn test_missing_body_is_part_failure() {
    let temp = TempDir::new().unwrap();
    let structure = MessageStructure::multipart(
        "mixed",
        vec![
            BodyPart::leaf(PrimaryType::Text, "plain"),
            BodyPart::leaf(PrimaryType::Image, "png").with_disposition("attachment"),
            BodyPart::leaf(PrimaryType::Image, "gif").with_disposition("attachment"),
        ],
    );
    let mut mailbox = MemoryMailbox::new().with_message(
        MemoryMessage::new(11, structure).with_body(PartPath::single(3), b"GIF89a".to_vec()),
    );

    let options = ExtractOptions::new(temp.path()).delete_after(false);
    let report = extract_attachments(&mut mailbox, &options, &keep_going).unwrap();

    assert_eq!(report.count(FailureKind::Fetch), 1);
    temp.child("11-2.png").assert(predicate::path::missing());
    temp.child("11-3.gif").assert(&b"GIF89a"[..]);
}

#[test]
fn test_invalid_base64_not_written() {
    let temp = TempDir::new().unwrap();
    let structure = MessageStructure::multipart(
        "mixed",
        vec![
            BodyPart::leaf(PrimaryType::Text, "plain"),
            BodyPart::leaf(PrimaryType::Image, "png")
                .with_disposition("attachment")
                .with_encoding(TransferEncoding::Base64),
        ],
    );
    let mut mailbox = MemoryMailbox::new().with_message(
        MemoryMessage::new(12, structure).with_body(PartPath::single(2), b"@@not base64@@".to_vec()),
    );

    let report =
        extract_attachments(&mut mailbox, &ExtractOptions::new(temp.path()), &keep_going)
            .unwrap();

    assert_eq!(report.count(FailureKind::Decode), 1);
    temp.child("12-2.png").assert(predicate::path::missing());
    assert_eq!(report.messages_deleted, 0);
}

#[test]
fn test_nested_attachment_missed_by_default() {
    let temp = TempDir::new().unwrap();
    let mut related = BodyPart::leaf(PrimaryType::Multipart, "related");
    related.children = vec![
        BodyPart::leaf(PrimaryType::Text, "html"),
        BodyPart::leaf(PrimaryType::Image, "png").with_disposition("inline"),
    ];
    let structure = MessageStructure::multipart("mixed", vec![related]);
    let mut mailbox = MemoryMailbox::new().with_message(MemoryMessage::new(13, structure));

    let report =
        extract_attachments(&mut mailbox, &ExtractOptions::new(temp.path()), &keep_going)
            .unwrap();

    assert!(report.written.is_empty());
    assert!(report.failures.is_empty());
    assert_eq!(report.messages_deleted, 1);
}

#[test]
fn test_run_closes_mailbox() {
    let temp = TempDir::new().unwrap();
    let mut mailbox = MemoryMailbox::new().with_message(photo_message(20, "attachment"));

    let report = run(&mut mailbox, &ExtractOptions::new(temp.path()), &keep_going).unwrap();

    assert_eq!(report.written.len(), 1);
    assert!(mailbox.is_closed());
}
